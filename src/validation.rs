//! Input validation and schedule verification.
//!
//! Checks structural integrity of a catalog snapshot before any constraint
//! is compiled. Detects:
//! - Duplicate course IDs and duplicate term slots
//! - Circular dependencies among active courses (DAG validation)
//! - Active courses with no available term part or zero difficulty
//! - An empty term list
//!
//! Also provides the editor-side cycle guard ([`would_create_cycle`],
//! [`dependency_candidates`]) and the legality check of a solved
//! schedule ([`validate_schedule`]).
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.2 (BFS), 22.4 (Topological Sort)

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use crate::config::CapacityPolicy;
use crate::models::{Course, CourseId, Schedule, Term, Violation};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two courses share the same ID.
    DuplicateId,
    /// Two terms share the same (year, part) slot.
    DuplicateTerm,
    /// Dependency graph among active courses contains a cycle.
    CyclicDependency,
    /// An active course has no available term part.
    EmptyAvailability,
    /// No terms were given.
    EmptyTermList,
    /// An active course has zero difficulty.
    InvalidDifficulty,
}

impl ValidationError {
    /// Creates a validation error.
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Validates a (courses, terms) snapshot before solving.
///
/// Checks:
/// 1. No duplicate course IDs
/// 2. At least one term, and no duplicate term slots
/// 3. Every active course has at least one available term part
/// 4. Every active course has a positive difficulty
/// 5. No circular dependencies among active courses
///
/// Dependencies on inactive or unknown courses are ignored.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(courses: &[Course], terms: &[Term]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut course_ids = HashSet::new();
    for course in courses {
        if !course_ids.insert(&course.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate course ID: {}", course.id),
            ));
        }
    }

    if terms.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyTermList,
            "No terms to schedule into",
        ));
    }
    for (i, term) in terms.iter().enumerate() {
        if terms[..i].iter().any(|t| t.same_slot(term)) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateTerm,
                format!("Duplicate term: {}", term.label()),
            ));
        }
    }

    for course in courses.iter().filter(|c| c.active) {
        if course.available_parts.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyAvailability,
                format!("Course '{}' is not available in any term part", course.label()),
            ));
        }
        if course.difficulty == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidDifficulty,
                format!("Course '{}' has zero difficulty", course.label()),
            ));
        }
    }

    if let Some(cycle_err) = detect_cycles(courses) {
        errors.push(cycle_err);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Detects cycles in the dependency graph of active courses using DFS.
///
/// # Algorithm
/// Topological sort via DFS. If a back-edge is found (visiting a node
/// currently in the recursion stack), a cycle exists.
fn detect_cycles(courses: &[Course]) -> Option<ValidationError> {
    let active: HashSet<&str> = courses
        .iter()
        .filter(|c| c.active)
        .map(|c| c.id.as_str())
        .collect();

    // dependency → dependents, active endpoints only
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    for course in courses.iter().filter(|c| c.active) {
        for dep in &course.dependencies {
            if active.contains(dep.as_str()) {
                adj.entry(dep.as_str()).or_default().push(course.id.as_str());
            }
        }
    }

    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    for course in courses.iter().filter(|c| c.active) {
        let node = course.id.as_str();
        if !visited.contains(node) && has_cycle_dfs(node, &adj, &mut visited, &mut in_stack) {
            return Some(ValidationError::new(
                ValidationErrorKind::CyclicDependency,
                format!("Circular dependency detected involving course '{}'", course.label()),
            ));
        }
    }

    None
}

fn has_cycle_dfs<'a>(
    node: &'a str,
    adj: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    in_stack: &mut HashSet<&'a str>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(node) {
        for &next in neighbors {
            if in_stack.contains(next) {
                return true;
            }
            if !visited.contains(next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(node);
    false
}

/// Whether adding the edge `course → required` would close a cycle.
///
/// Breadth-first reachability from `required` along dependency edges;
/// the edge is forbidden if the traversal reaches `course`. A
/// self-dependency always counts as a cycle. Edges through inactive
/// courses are followed too, so reactivating a course can never expose a
/// cycle that was accepted while it was inactive.
///
/// Runs in time proportional to the reachable dependency closure.
pub fn would_create_cycle(courses: &[Course], course: &CourseId, required: &CourseId) -> bool {
    if course == required {
        return true;
    }

    let by_id: HashMap<&CourseId, &Course> = courses.iter().map(|c| (&c.id, c)).collect();
    let mut seen: HashSet<&CourseId> = HashSet::new();
    let mut queue: VecDeque<&CourseId> = VecDeque::new();
    seen.insert(required);
    queue.push_back(required);

    while let Some(current) = queue.pop_front() {
        let Some(node) = by_id.get(current) else {
            continue;
        };
        for dep in &node.dependencies {
            if dep == course {
                return true;
            }
            if seen.insert(dep) {
                queue.push_back(dep);
            }
        }
    }

    false
}

/// Courses that may be offered as prerequisites of `course_id`.
///
/// Excludes the course itself and every course whose selection would
/// create a cycle. Catalog order is preserved.
pub fn dependency_candidates<'a>(courses: &'a [Course], course_id: &CourseId) -> Vec<&'a Course> {
    courses
        .iter()
        .filter(|c| !would_create_cycle(courses, course_id, &c.id))
        .collect()
}

/// Checks a schedule for legality under the default capacity policy.
///
/// See [`validate_schedule_with`].
pub fn validate_schedule(
    schedule: &Schedule,
    courses: &[Course],
    terms: &[Term],
) -> Vec<Violation> {
    validate_schedule_with(schedule, courses, terms, &CapacityPolicy::default())
}

/// Checks a schedule for legality.
///
/// Reports placements of unknown or inactive courses and out-of-range
/// term indices, placements in unavailable term parts, dependency pairs
/// not in strictly increasing term order, capacity overruns under
/// `policy`, and active courses left unplaced.
pub fn validate_schedule_with(
    schedule: &Schedule,
    courses: &[Course],
    terms: &[Term],
    policy: &CapacityPolicy,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let by_id: HashMap<&CourseId, &Course> = courses.iter().map(|c| (&c.id, c)).collect();

    for placement in &schedule.placements {
        let course = match by_id.get(&placement.course_id) {
            Some(course) if course.active => course,
            _ => {
                violations.push(Violation::unknown_reference(
                    placement.course_id.as_str(),
                    format!("'{}' is not an active course", placement.course_id),
                ));
                continue;
            }
        };
        let Some(term) = terms.get(placement.term_index) else {
            violations.push(Violation::unknown_reference(
                course.id.as_str(),
                format!(
                    "'{}' placed in term #{} of {}",
                    course.label(),
                    placement.term_index,
                    terms.len()
                ),
            ));
            continue;
        };
        if !course.is_available_in(term.part) {
            violations.push(Violation::unavailable(
                course.id.as_str(),
                format!("'{}' is not offered in {}", course.label(), term.label()),
            ));
        }
    }

    for course in courses.iter().filter(|c| c.active) {
        let Some(course_term) = schedule.term_of(&course.id) else {
            violations.push(Violation::unscheduled(
                course.id.as_str(),
                format!("'{}' is not placed", course.label()),
            ));
            continue;
        };
        for dep in &course.dependencies {
            let dep_active = by_id.get(dep).is_some_and(|d| d.active);
            if !dep_active {
                continue;
            }
            if let Some(dep_term) = schedule.term_of(dep) {
                if dep_term >= course_term {
                    violations.push(Violation::precedence_violation(
                        course.id.as_str(),
                        format!(
                            "'{}' in term #{} does not follow prerequisite '{}' in term #{}",
                            course.label(),
                            course_term,
                            dep,
                            dep_term
                        ),
                    ));
                }
            }
        }
    }

    for (index, term) in terms.iter().enumerate() {
        if policy.caps_difficulty() {
            let load = schedule.term_load(index);
            if load > term.max_difficulty {
                violations.push(Violation::capacity_exceeded(
                    term.label(),
                    format!(
                        "load {} exceeds cap {} in {}",
                        load,
                        term.max_difficulty,
                        term.label()
                    ),
                ));
            }
        }
        if let Some(max_courses) = policy.max_courses() {
            let count = schedule.placements_in(index).len();
            if count > max_courses {
                violations.push(Violation::course_count_exceeded(
                    term.label(),
                    format!("{} courses exceed limit {} in {}", count, max_courses, term.label()),
                ));
            }
        }
    }

    violations
}
