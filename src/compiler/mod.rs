//! Constraint compiler.
//!
//! Translates a (courses, terms) snapshot into constraints and a makespan
//! objective over one term-index variable per active course.
//!
//! The course → variable mapping ([`CourseVars`]) belongs to a single
//! solve; it is created against a session and discarded with it. Domain
//! entities never carry engine handles.
//!
//! # Formulation
//!
//! | Family | Constraint |
//! |--------|------------|
//! | Term membership | `OR(x_c == t)` over candidate terms offering `c` |
//! | Dependency ordering | `x_c > x_d` for active `d` in `deps(c)` |
//! | Difficulty cap | `SUM(ite(x_c == t, diff_c, 0)) <= cap_t` per candidate `t` |
//! | Course-count cap | `AT_MOST(k, x_c == t)` per candidate `t` |
//! | Objective | `min max(x_c)` |
//!
//! When optimizing, each enforced cap also yields the implied bound
//! `SUM(ite(t <= max(x_c), cap_t, 0)) >= demand`, which lets the engine
//! prove a makespan too small without enumerating placements.
//!
//! # Reference
//! - Marriott & Stuckey (1998), "Programming with Constraints"
//! - Schaerf (1999), "A Survey of Automated Timetabling"

mod constraints;
mod objective;

pub use constraints::{
    candidate_terms, course_count_cap, dependency_ordering, difficulty_cap,
    makespan_capacity_bound, min_active_difficulty, term_membership,
};
pub use objective::makespan;

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SolverConfig;
use crate::cp::{BoolExpr, IntExpr, IntVar, SolverSession};
use crate::models::{Course, CourseId, Term};

/// Independent groups of compiled constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConstraintFamily {
    /// Each course lands in a term offering it.
    TermMembership,
    /// Prerequisites come strictly earlier.
    DependencyOrdering,
    /// Summed difficulty per term within the cap.
    DifficultyCap,
    /// Course count per term within the limit.
    CourseCountCap,
}

impl ConstraintFamily {
    /// All families, in compilation order.
    pub const ALL: [ConstraintFamily; 4] = [
        ConstraintFamily::TermMembership,
        ConstraintFamily::DependencyOrdering,
        ConstraintFamily::DifficultyCap,
        ConstraintFamily::CourseCountCap,
    ];

    /// Short name for logs and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintFamily::TermMembership => "term_membership",
            ConstraintFamily::DependencyOrdering => "dependency_ordering",
            ConstraintFamily::DifficultyCap => "difficulty_cap",
            ConstraintFamily::CourseCountCap => "course_count_cap",
        }
    }
}

/// Course → term-index variable mapping of one solve, in catalog order.
#[derive(Debug, Clone, Default)]
pub struct CourseVars {
    entries: Vec<(CourseId, IntVar)>,
    index: HashMap<CourseId, IntVar>,
}

impl CourseVars {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mapping. A repeated ID keeps its first variable.
    pub fn insert(&mut self, course_id: CourseId, var: IntVar) {
        if !self.index.contains_key(&course_id) {
            self.index.insert(course_id.clone(), var);
            self.entries.push((course_id, var));
        }
    }

    /// Variable of a course, if it participates.
    pub fn get(&self, course_id: &CourseId) -> Option<IntVar> {
        self.index.get(course_id).copied()
    }

    /// (course, variable) pairs in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (&CourseId, IntVar)> + '_ {
        self.entries.iter().map(|(id, var)| (id, *var))
    }

    /// Variables in catalog order.
    pub fn vars(&self) -> Vec<IntVar> {
        self.entries.iter().map(|(_, var)| *var).collect()
    }

    /// Number of mapped courses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no course is mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(CourseId, IntVar)> for CourseVars {
    fn from_iter<I: IntoIterator<Item = (CourseId, IntVar)>>(iter: I) -> Self {
        let mut vars = CourseVars::new();
        for (id, var) in iter {
            vars.insert(id, var);
        }
        vars
    }
}

/// Constraints of a snapshot, grouped by family.
#[derive(Debug, Clone, Default)]
pub struct CompiledConstraints {
    families: Vec<(ConstraintFamily, Vec<BoolExpr>)>,
}

impl CompiledConstraints {
    fn push(&mut self, family: ConstraintFamily, constraints: Vec<BoolExpr>) {
        self.families.push((family, constraints));
    }

    /// Constraints of one family (empty if not compiled).
    pub fn family(&self, family: ConstraintFamily) -> &[BoolExpr] {
        self.families
            .iter()
            .find(|(f, _)| *f == family)
            .map(|(_, c)| c.as_slice())
            .unwrap_or(&[])
    }

    /// Compiled families with their constraint counts.
    pub fn family_sizes(&self) -> Vec<(ConstraintFamily, usize)> {
        self.families.iter().map(|(f, c)| (*f, c.len())).collect()
    }

    /// Total number of constraints.
    pub fn len(&self) -> usize {
        self.families.iter().map(|(_, c)| c.len()).sum()
    }

    /// Whether nothing was compiled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All constraints, family by family.
    pub fn into_constraints(self) -> impl Iterator<Item = BoolExpr> {
        self.families.into_iter().flat_map(|(_, c)| c)
    }
}

/// Builds the constraint model of a catalog snapshot.
///
/// Only active courses participate. Families can be switched off
/// individually, which is how infeasibility is diagnosed.
///
/// # Example
/// ```
/// use u_curriculum::compiler::CurriculumModelBuilder;
/// use u_curriculum::cp::{BranchAndBoundEngine, SolverEngine, SolverSession};
/// use u_curriculum::models::{Course, Term, TermPart};
///
/// let courses = vec![Course::new("c1", "100", "Intro").with_difficulty(6)];
/// let terms = vec![Term::new(2027, TermPart::A)];
///
/// let builder = CurriculumModelBuilder::new(&courses, &terms);
/// let mut session = BranchAndBoundEngine::new().open_session().unwrap();
/// let vars = builder.build(&mut session);
/// assert_eq!(vars.len(), 1);
/// assert!(session.check().unwrap().is_sat());
/// ```
pub struct CurriculumModelBuilder<'a> {
    courses: Vec<&'a Course>,
    terms: &'a [Term],
    config: SolverConfig,
    disabled: BTreeSet<ConstraintFamily>,
    optimize: bool,
}

impl<'a> CurriculumModelBuilder<'a> {
    /// Creates a builder over the active courses of `courses`.
    pub fn new(courses: &'a [Course], terms: &'a [Term]) -> Self {
        Self {
            courses: courses.iter().filter(|c| c.active).collect(),
            terms,
            config: SolverConfig::default(),
            disabled: BTreeSet::new(),
            optimize: true,
        }
    }

    /// Sets the solver configuration.
    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Leaves a constraint family out of the model.
    pub fn without_family(mut self, family: ConstraintFamily) -> Self {
        self.disabled.insert(family);
        self
    }

    /// Skips the makespan objective; any feasible assignment will do.
    pub fn feasibility_only(mut self) -> Self {
        self.optimize = false;
        self
    }

    /// Participating courses, in catalog order.
    pub fn active_courses(&self) -> &[&'a Course] {
        &self.courses
    }

    /// Term sequence.
    pub fn terms(&self) -> &'a [Term] {
        self.terms
    }

    /// Whether a family would be compiled.
    pub fn is_enabled(&self, family: ConstraintFamily) -> bool {
        if self.disabled.contains(&family) {
            return false;
        }
        match family {
            ConstraintFamily::TermMembership | ConstraintFamily::DependencyOrdering => true,
            ConstraintFamily::DifficultyCap => self.config.capacity_policy.caps_difficulty(),
            ConstraintFamily::CourseCountCap => self.config.capacity_policy.max_courses().is_some(),
        }
    }

    /// Allocates one term-index variable per active course.
    pub fn allocate_vars<S: SolverSession>(&self, session: &mut S) -> CourseVars {
        let last = self.terms.len() as i64 - 1;
        self.courses
            .iter()
            .map(|course| {
                let var = session.new_int_var(&format!("term[{}]", course.id), 0..=last);
                (course.id.clone(), var)
            })
            .collect()
    }

    /// Term indices eligible for placement.
    pub fn candidate_terms(&self) -> Vec<usize> {
        let min_difficulty = if self.config.prune_small_terms {
            min_active_difficulty(&self.courses)
        } else {
            None
        };
        candidate_terms(self.terms, min_difficulty)
    }

    /// Compiles every enabled family against `vars`.
    pub fn compile(&self, vars: &CourseVars) -> CompiledConstraints {
        let candidates = self.candidate_terms();
        let mut compiled = CompiledConstraints::default();

        if self.is_enabled(ConstraintFamily::TermMembership) {
            let constraints = self
                .courses
                .iter()
                .filter_map(|course| {
                    let var = vars.get(&course.id)?;
                    Some(term_membership(course, var, self.terms, &candidates))
                })
                .collect();
            compiled.push(ConstraintFamily::TermMembership, constraints);
        }

        if self.is_enabled(ConstraintFamily::DependencyOrdering) {
            let constraints = self
                .courses
                .iter()
                .filter_map(|course| Some(dependency_ordering(course, vars.get(&course.id)?, vars)))
                .flatten()
                .collect();
            compiled.push(ConstraintFamily::DependencyOrdering, constraints);
        }

        if self.is_enabled(ConstraintFamily::DifficultyCap) {
            let constraints = candidates
                .iter()
                .map(|&t| difficulty_cap(t, &self.terms[t], &self.courses, vars))
                .collect();
            compiled.push(ConstraintFamily::DifficultyCap, constraints);
        }

        if let Some(max_courses) = self.config.capacity_policy.max_courses() {
            if self.is_enabled(ConstraintFamily::CourseCountCap) {
                let constraints = candidates
                    .iter()
                    .map(|&t| course_count_cap(t, max_courses, vars))
                    .collect();
                compiled.push(ConstraintFamily::CourseCountCap, constraints);
            }
        }

        compiled
    }

    /// Makespan objective over `vars`. `None` without courses.
    pub fn objective(&self, vars: &CourseVars) -> Option<IntExpr> {
        makespan(&vars.vars())
    }

    /// Capacity bounds on `objective` implied by the enabled families.
    ///
    /// Empty unless term membership is enforced, since only then is every
    /// course confined to capacity-bounded terms.
    pub fn implied_bounds(&self, objective: &IntExpr) -> Vec<BoolExpr> {
        if !self.is_enabled(ConstraintFamily::TermMembership) {
            return Vec::new();
        }
        let candidates = self.candidate_terms();
        let capacities = |per_term: &dyn Fn(&Term) -> i64| -> Vec<i64> {
            let mut capacities = vec![0; self.terms.len()];
            for &t in &candidates {
                capacities[t] = per_term(&self.terms[t]);
            }
            capacities
        };

        let mut bounds = Vec::new();
        if self.is_enabled(ConstraintFamily::DifficultyCap) {
            let demand = self.courses.iter().map(|c| i64::from(c.difficulty)).sum();
            let caps = capacities(&|term| i64::from(term.max_difficulty));
            bounds.push(makespan_capacity_bound(objective, &caps, demand));
        }
        if let Some(max_courses) = self.config.capacity_policy.max_courses() {
            if self.is_enabled(ConstraintFamily::CourseCountCap) {
                let demand = self.courses.len() as i64;
                let caps = capacities(&|_| max_courses as i64);
                bounds.push(makespan_capacity_bound(objective, &caps, demand));
            }
        }
        bounds
    }

    /// Allocates variables, asserts every enabled family and, unless
    /// [`feasibility_only`](Self::feasibility_only) was set, the objective
    /// with its implied bounds.
    pub fn build<S: SolverSession>(&self, session: &mut S) -> CourseVars {
        let vars = self.allocate_vars(session);
        let compiled = self.compile(&vars);

        for (family, count) in compiled.family_sizes() {
            debug!(family = family.name(), constraints = count, "compiled constraint family");
        }

        for constraint in compiled.into_constraints() {
            session.assert(constraint);
        }
        if self.optimize {
            if let Some(objective) = self.objective(&vars) {
                let bounds = self.implied_bounds(&objective);
                debug!(bounds = bounds.len(), "asserting implied makespan bounds");
                session.assert_all(bounds);
                session.minimize(objective);
            }
        }
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CapacityPolicy;
    use crate::cp::{BranchAndBoundEngine, CheckResult, Model, SolverEngine};
    use crate::models::{terms, TermPart};

    fn catalog() -> (Vec<Course>, Vec<Term>) {
        let courses = vec![
            Course::new("c1", "100", "Intro").with_difficulty(6),
            Course::new("c2", "200", "Advanced")
                .with_difficulty(6)
                .with_dependency("c1"),
            Course::new("c3", "300", "Retired")
                .with_difficulty(2)
                .with_dependency("c1")
                .with_active(false),
        ];
        let terms = terms::consecutive(Term::new(2027, TermPart::A), 3);
        (courses, terms)
    }

    #[test]
    fn test_inactive_courses_get_no_variable() {
        let (courses, terms) = catalog();
        let builder = CurriculumModelBuilder::new(&courses, &terms);
        let mut session = BranchAndBoundEngine::new().open_session().unwrap();
        let vars = builder.allocate_vars(&mut session);
        assert_eq!(vars.len(), 2);
        assert!(vars.get(&CourseId::new("c3")).is_none());
    }

    #[test]
    fn test_family_sizes() {
        let (courses, terms) = catalog();
        let builder = CurriculumModelBuilder::new(&courses, &terms);
        let mut session = BranchAndBoundEngine::new().open_session().unwrap();
        let vars = builder.allocate_vars(&mut session);
        let compiled = builder.compile(&vars);

        assert_eq!(compiled.family(ConstraintFamily::TermMembership).len(), 2);
        assert_eq!(compiled.family(ConstraintFamily::DependencyOrdering).len(), 1);
        assert_eq!(compiled.family(ConstraintFamily::DifficultyCap).len(), 3);
        assert!(compiled.family(ConstraintFamily::CourseCountCap).is_empty());
        assert_eq!(compiled.len(), 6);
    }

    #[test]
    fn test_prefilter_drops_small_terms() {
        let (courses, mut terms) = catalog();
        terms[1] = terms[1].clone().with_max_difficulty(5);

        let builder = CurriculumModelBuilder::new(&courses, &terms);
        assert_eq!(builder.candidate_terms(), vec![0, 2]);

        let builder = CurriculumModelBuilder::new(&courses, &terms)
            .with_config(SolverConfig::default().with_prune_small_terms(false));
        assert_eq!(builder.candidate_terms(), vec![0, 1, 2]);
    }

    #[test]
    fn test_policy_selects_families() {
        let (courses, terms) = catalog();
        let count_only = SolverConfig::default()
            .with_capacity_policy(CapacityPolicy::CourseCount { max_courses: 1 });
        let builder = CurriculumModelBuilder::new(&courses, &terms).with_config(count_only);
        assert!(!builder.is_enabled(ConstraintFamily::DifficultyCap));
        assert!(builder.is_enabled(ConstraintFamily::CourseCountCap));

        let builder = CurriculumModelBuilder::new(&courses, &terms)
            .without_family(ConstraintFamily::DependencyOrdering);
        assert!(!builder.is_enabled(ConstraintFamily::DependencyOrdering));
        assert!(!builder.is_enabled(ConstraintFamily::CourseCountCap));
    }

    #[test]
    fn test_build_and_solve() {
        let (courses, terms) = catalog();
        let builder = CurriculumModelBuilder::new(&courses, &terms);
        let mut session = BranchAndBoundEngine::new().open_session().unwrap();
        let vars = builder.build(&mut session);

        let CheckResult::Sat(model) = session.check().unwrap() else {
            panic!("expected sat");
        };
        let c1 = model.value(vars.get(&CourseId::new("c1")).unwrap()).unwrap();
        let c2 = model.value(vars.get(&CourseId::new("c2")).unwrap()).unwrap();
        assert_eq!((c1, c2), (0, 1));
        assert_eq!(model.objective_value(), Some(1));
    }

    #[test]
    fn test_implied_bounds_follow_policy() {
        let (courses, terms) = catalog();
        let objective = IntExpr::var(IntVar::from_index(0));

        let builder = CurriculumModelBuilder::new(&courses, &terms);
        assert_eq!(builder.implied_bounds(&objective).len(), 1);

        let both = SolverConfig::default()
            .with_capacity_policy(CapacityPolicy::DifficultyAndCourseCount { max_courses: 2 });
        let builder = CurriculumModelBuilder::new(&courses, &terms).with_config(both);
        assert_eq!(builder.implied_bounds(&objective).len(), 2);

        let builder = CurriculumModelBuilder::new(&courses, &terms)
            .without_family(ConstraintFamily::TermMembership);
        assert!(builder.implied_bounds(&objective).is_empty());
    }

    #[test]
    fn test_implied_bound_excludes_short_makespan() {
        // 6 + 6 of demand against caps of 10 needs two terms.
        let (courses, terms) = catalog();
        let builder = CurriculumModelBuilder::new(&courses, &terms);
        let m = IntVar::from_index(0);
        let bound = builder.implied_bounds(&IntExpr::var(m)).remove(0);
        let at = |t: i64| -> Model { [(m, t)].into_iter().collect() };
        assert_eq!(bound.eval(&at(0)), Some(false));
        assert_eq!(bound.eval(&at(1)), Some(true));
    }

    #[test]
    fn test_course_vars_keep_first_mapping() {
        let vars: CourseVars = [
            (CourseId::new("a"), IntVar::from_index(0)),
            (CourseId::new("a"), IntVar::from_index(1)),
        ]
        .into_iter()
        .collect();
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get(&CourseId::new("a")), Some(IntVar::from_index(0)));
    }
}
