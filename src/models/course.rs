//! Course model.
//!
//! A course is the unit being scheduled: it carries a workload weight
//! (difficulty), the term parts in which it is offered, and the set of
//! prerequisite courses that must be completed in a strictly earlier term.
//!
//! Courses are immutable values. Updates go through the `with_*` builders,
//! which consume a copy and return the updated record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::TermPart;

/// Workload weight of a course.
pub type Difficulty = u32;

/// Opaque, stable course identifier.
///
/// Unique within a catalog and never reused after the course is deleted.
/// Distinct from the human-facing catalog `code`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(String);

impl CourseId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CourseId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CourseId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A course in the catalog.
///
/// # Scheduling semantics
/// - Only `active` courses take part in a solve.
/// - A course may only be placed in a term whose part is in `available_parts`.
/// - Every active dependency must be placed in a strictly earlier term.
///   Dependencies that are inactive or missing from the catalog are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Stable identifier.
    pub id: CourseId,
    /// Catalog number shown to users (not required to be unique).
    pub code: String,
    /// Display name.
    pub name: String,
    /// Workload weight counted against term caps.
    pub difficulty: Difficulty,
    /// Term parts in which the course is offered.
    pub available_parts: BTreeSet<TermPart>,
    /// Identifiers of prerequisite courses.
    pub dependencies: BTreeSet<CourseId>,
    /// Whether the course participates in scheduling.
    pub active: bool,
}

impl Course {
    /// Default difficulty for a newly created course.
    pub const DEFAULT_DIFFICULTY: Difficulty = 1;

    /// Creates an active course offered in every term part, with no
    /// dependencies.
    pub fn new(id: impl Into<CourseId>, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            name: name.into(),
            difficulty: Self::DEFAULT_DIFFICULTY,
            available_parts: TermPart::ALL.into_iter().collect(),
            dependencies: BTreeSet::new(),
            active: true,
        }
    }

    /// Creates a blank course with a freshly generated identifier.
    pub fn blank() -> Self {
        Self::new(CourseId::generate(), "", "")
    }

    /// Sets the catalog code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the difficulty.
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Replaces the set of available term parts.
    pub fn with_available_parts(mut self, parts: impl IntoIterator<Item = TermPart>) -> Self {
        self.available_parts = parts.into_iter().collect();
        self
    }

    /// Adds one available term part.
    pub fn available_in(mut self, part: TermPart) -> Self {
        self.available_parts.insert(part);
        self
    }

    /// Removes one available term part.
    pub fn unavailable_in(mut self, part: TermPart) -> Self {
        self.available_parts.remove(&part);
        self
    }

    /// Adds a prerequisite.
    pub fn with_dependency(mut self, dependency: impl Into<CourseId>) -> Self {
        self.dependencies.insert(dependency.into());
        self
    }

    /// Replaces the set of prerequisites.
    pub fn with_dependencies<I, D>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<CourseId>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Removes a prerequisite (used when the referenced course is deleted).
    pub fn without_dependency(mut self, dependency: &CourseId) -> Self {
        self.dependencies.remove(dependency);
        self
    }

    /// Sets whether the course participates in scheduling.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Whether the course is offered in the given term part.
    #[inline]
    pub fn is_available_in(&self, part: TermPart) -> bool {
        self.available_parts.contains(&part)
    }

    /// Whether `other` is a direct prerequisite of this course.
    #[inline]
    pub fn depends_on(&self, other: &CourseId) -> bool {
        self.dependencies.contains(other)
    }

    /// Display label: `"<code> - <name>"`.
    pub fn label(&self) -> String {
        format!("{} - {}", self.code, self.name)
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.code, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_builder() {
        let course = Course::new("c1", "20476", "Discrete Mathematics")
            .with_difficulty(6)
            .with_available_parts([TermPart::A])
            .available_in(TermPart::B)
            .with_dependency("c0");

        assert_eq!(course.id.as_str(), "c1");
        assert_eq!(course.difficulty, 6);
        assert!(course.is_available_in(TermPart::A));
        assert!(!course.is_available_in(TermPart::C));
        assert!(course.depends_on(&CourseId::from("c0")));
        assert!(course.active);
    }

    #[test]
    fn test_new_course_is_offered_everywhere() {
        let course = Course::new("c1", "20441", "Intro to CS");
        assert!(TermPart::ALL.iter().all(|&p| course.is_available_in(p)));

        let course = course.unavailable_in(TermPart::B);
        assert!(!course.is_available_in(TermPart::B));
        assert_eq!(course.available_parts.len(), 2);
    }

    #[test]
    fn test_copy_on_write_update() {
        let original = Course::new("c1", "20441", "Intro to CS").unavailable_in(TermPart::C);
        let updated = original.clone().with_name("Introduction to Computer Science");

        assert_eq!(original.name, "Intro to CS");
        assert_eq!(updated.name, "Introduction to Computer Science");
        assert_eq!(original.id, updated.id);
        assert_ne!(original, updated);
    }

    #[test]
    fn test_dependencies_are_a_set() {
        let course = Course::new("c2", "20407", "Data Structures")
            .with_dependency("c1")
            .with_dependency("c1");
        assert_eq!(course.dependencies.len(), 1);

        let course = course.without_dependency(&CourseId::from("c1"));
        assert!(course.dependencies.is_empty());
    }

    #[test]
    fn test_label() {
        let course = Course::new("c1", "20476", "Discrete Mathematics");
        assert_eq!(course.label(), "20476 - Discrete Mathematics");
        assert_eq!(course.to_string(), course.label());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = Course::blank();
        let b = Course::blank();
        assert_ne!(a.id, b.id);
        assert_eq!(a.difficulty, Course::DEFAULT_DIFFICULTY);
    }

    #[test]
    fn test_course_id_serde_transparent() {
        let id = CourseId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
