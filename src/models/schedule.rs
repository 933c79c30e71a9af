//! Schedule (solution) model.
//!
//! A schedule places every active course into exactly one term of the
//! term sequence it was solved against. Terms are referred to by their
//! zero-based index in that sequence.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{CourseId, Difficulty};

/// Result of a solve that reached the engine (or skipped it for an
/// empty catalog).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchedulingOutcome {
    /// A minimal-makespan schedule exists.
    Satisfiable(Schedule),
    /// No schedule satisfies the constraints.
    Unsatisfiable,
}

impl SchedulingOutcome {
    /// Whether a schedule was found.
    pub fn is_satisfiable(&self) -> bool {
        matches!(self, SchedulingOutcome::Satisfiable(_))
    }

    /// The schedule, if one was found.
    pub fn schedule(&self) -> Option<&Schedule> {
        match self {
            SchedulingOutcome::Satisfiable(schedule) => Some(schedule),
            SchedulingOutcome::Unsatisfiable => None,
        }
    }

    /// Consumes the outcome and returns the schedule, if any.
    pub fn into_schedule(self) -> Option<Schedule> {
        match self {
            SchedulingOutcome::Satisfiable(schedule) => Some(schedule),
            SchedulingOutcome::Unsatisfiable => None,
        }
    }
}

/// A course placed in a term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Placed course.
    pub course_id: CourseId,
    /// Catalog code (denormalized for display).
    pub code: String,
    /// Course difficulty (denormalized for load queries).
    pub difficulty: Difficulty,
    /// Index of the term in the solved sequence.
    pub term_index: usize,
}

impl Placement {
    /// Creates a new placement.
    pub fn new(
        course_id: impl Into<CourseId>,
        code: impl Into<String>,
        difficulty: Difficulty,
        term_index: usize,
    ) -> Self {
        Self {
            course_id: course_id.into(),
            code: code.into(),
            difficulty,
            term_index,
        }
    }
}

/// A complete term assignment.
///
/// Placements are kept in catalog order. Terms without placements are
/// absent from [`Schedule::by_term`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Course placements, in catalog order.
    pub placements: Vec<Placement>,
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a placement.
    pub fn add_placement(&mut self, placement: Placement) {
        self.placements.push(placement);
    }

    /// Whether no course is placed.
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Number of placed courses.
    pub fn placement_count(&self) -> usize {
        self.placements.len()
    }

    /// Term index assigned to a course.
    pub fn term_of(&self, course_id: &CourseId) -> Option<usize> {
        self.placements
            .iter()
            .find(|p| &p.course_id == course_id)
            .map(|p| p.term_index)
    }

    /// Placements in a given term, in catalog order.
    pub fn placements_in(&self, term_index: usize) -> Vec<&Placement> {
        self.placements
            .iter()
            .filter(|p| p.term_index == term_index)
            .collect()
    }

    /// Term index → course IDs placed there. Empty terms are omitted.
    pub fn by_term(&self) -> BTreeMap<usize, Vec<CourseId>> {
        let mut map: BTreeMap<usize, Vec<CourseId>> = BTreeMap::new();
        for p in &self.placements {
            map.entry(p.term_index).or_default().push(p.course_id.clone());
        }
        map
    }

    /// Summed difficulty placed in a term.
    pub fn term_load(&self, term_index: usize) -> Difficulty {
        self.placements
            .iter()
            .filter(|p| p.term_index == term_index)
            .map(|p| p.difficulty)
            .sum()
    }

    /// Highest term index in use. `None` for an empty schedule.
    pub fn makespan(&self) -> Option<usize> {
        self.placements.iter().map(|p| p.term_index).max()
    }

    /// Returns a copy with placements sorted by (term, course ID).
    pub fn normalized(&self) -> Self {
        let mut placements = self.placements.clone();
        placements.sort_by(|a, b| {
            a.term_index
                .cmp(&b.term_index)
                .then_with(|| a.course_id.cmp(&b.course_id))
        });
        Self { placements }
    }
}

/// A legality violation found in a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related entity (course ID or term label).
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
}

/// Classification of schedule violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Course placed in a term part it is not offered in.
    Unavailable,
    /// Course placed in the same or an earlier term than a prerequisite.
    PrecedenceViolation,
    /// Term difficulty sum exceeds its cap.
    CapacityExceeded,
    /// Term holds more courses than the configured count cap.
    CourseCountExceeded,
    /// Active course missing from the schedule.
    Unscheduled,
    /// Placement refers to a term outside the sequence, or to an unknown
    /// or inactive course.
    UnknownReference,
}

impl Violation {
    fn with_type(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }

    /// Creates an availability violation.
    pub fn unavailable(course_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_type(ViolationType::Unavailable, course_id, message)
    }

    /// Creates a precedence violation.
    pub fn precedence_violation(course_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_type(ViolationType::PrecedenceViolation, course_id, message)
    }

    /// Creates a capacity violation.
    pub fn capacity_exceeded(term: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_type(ViolationType::CapacityExceeded, term, message)
    }

    /// Creates a course-count violation.
    pub fn course_count_exceeded(term: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_type(ViolationType::CourseCountExceeded, term, message)
    }

    /// Creates a missing-placement violation.
    pub fn unscheduled(course_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_type(ViolationType::Unscheduled, course_id, message)
    }

    /// Creates a dangling-reference violation.
    pub fn unknown_reference(entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_type(ViolationType::UnknownReference, entity_id, message)
    }
}
