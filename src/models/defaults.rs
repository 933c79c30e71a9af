//! Default catalog and term sequence.
//!
//! A computer-science degree plan used to seed new catalogs. Dependencies
//! are declared by catalog code and resolved to generated course IDs.

use std::collections::HashMap;

use super::{terms, Course, CourseId, Difficulty, Term, TermPart};

/// Number of terms in the default sequence.
pub const DEFAULT_TERM_COUNT: usize = 11;

const ALL_PARTS: &[TermPart] = &[TermPart::A, TermPart::B, TermPart::C];
const AB: &[TermPart] = &[TermPart::A, TermPart::B];
const AC: &[TermPart] = &[TermPart::A, TermPart::C];
const B_ONLY: &[TermPart] = &[TermPart::B];

type CatalogEntry = (
    &'static str,
    &'static str,
    Difficulty,
    &'static [TermPart],
    &'static [&'static str],
);

const CATALOG: &[CatalogEntry] = &[
    ("20476", "Discrete Mathematics", 6, ALL_PARTS, &[]),
    ("20109", "Linear Algebra 1", 8, ALL_PARTS, &[]),
    ("20474", "Calculus 1", 7, ALL_PARTS, &[]),
    ("20475", "Calculus 2", 9, ALL_PARTS, &["20474"]),
    ("20425", "Probability and Statistics for CS", 4, ALL_PARTS, &[]),
    ("20441", "Introduction to Computer Science in Java", 6, AB, &[]),
    ("20407", "Data Structures and Introduction to Algorithms", 7, AB, &["20441"]),
    ("20417", "Algorithms", 7, AB, &["20407"]),
    ("20465", "Systems Programming Laboratory", 6, AB, &["20441"]),
    ("20604", "Computational Models", 3, AB, &["20407"]),
    ("20471", "Computer Organization", 6, AC, &["20441"]),
    ("20466", "Logic for Computer Science", 1, AB, &["20476"]),
    ("20594", "Operating Systems", 7, AB, &["20465", "20407"]),
    ("20905", "Programming Languages", 3, B_ONLY, &["20407", "20604", "20417", "20465"]),
];

/// The default course catalog, with freshly generated IDs.
pub fn default_courses() -> Vec<Course> {
    let ids: HashMap<&str, CourseId> = CATALOG
        .iter()
        .map(|(code, ..)| (*code, CourseId::generate()))
        .collect();

    CATALOG
        .iter()
        .map(|(code, name, difficulty, parts, deps)| {
            Course::new(ids[code].clone(), *code, *name)
                .with_difficulty(*difficulty)
                .with_available_parts(parts.iter().copied())
                .with_dependencies(deps.iter().filter_map(|dep| ids.get(dep).cloned()))
        })
        .collect()
}

/// The default term sequence: [`DEFAULT_TERM_COUNT`] consecutive terms
/// starting at part A of `first_year`.
pub fn default_terms(first_year: i32) -> Vec<Term> {
    terms::consecutive(Term::new(first_year, TermPart::A), DEFAULT_TERM_COUNT)
}
