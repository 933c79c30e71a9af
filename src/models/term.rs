//! Academic term model.
//!
//! A term is a scheduling slot identified by its year and its part within
//! the year. The solver only relies on the position of a term in the
//! sequence it is given; `year`/`part` drive availability filtering and
//! display.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Difficulty;

/// Part of an academic year.
///
/// Three parts per year; `C` is followed by `A` of the next year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TermPart {
    A,
    B,
    C,
}

impl TermPart {
    /// All parts in chronological order.
    pub const ALL: [TermPart; 3] = [TermPart::A, TermPart::B, TermPart::C];

    /// Single-letter label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TermPart::A => "A",
            TermPart::B => "B",
            TermPart::C => "C",
        }
    }
}

impl fmt::Display for TermPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A term with a difficulty budget.
///
/// Ordered by `(year, part)`, ties broken by `max_difficulty`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// Academic year.
    pub year: i32,
    /// Part within the year.
    pub part: TermPart,
    /// Cap on the summed difficulty of courses placed in this term.
    pub max_difficulty: Difficulty,
}

impl Term {
    /// Cap applied to newly created terms.
    pub const DEFAULT_MAX_DIFFICULTY: Difficulty = 10;

    /// Creates a term with the default difficulty cap.
    pub fn new(year: i32, part: TermPart) -> Self {
        Self {
            year,
            part,
            max_difficulty: Self::DEFAULT_MAX_DIFFICULTY,
        }
    }

    /// Sets the difficulty cap.
    pub fn with_max_difficulty(mut self, max_difficulty: Difficulty) -> Self {
        self.max_difficulty = max_difficulty;
        self
    }

    /// The following term (default cap).
    pub fn next(&self) -> Self {
        match self.part {
            TermPart::A => Self::new(self.year, TermPart::B),
            TermPart::B => Self::new(self.year, TermPart::C),
            TermPart::C => Self::new(self.year + 1, TermPart::A),
        }
    }

    /// The preceding term (default cap).
    pub fn previous(&self) -> Self {
        match self.part {
            TermPart::A => Self::new(self.year - 1, TermPart::C),
            TermPart::B => Self::new(self.year, TermPart::A),
            TermPart::C => Self::new(self.year, TermPart::B),
        }
    }

    /// Display label, e.g. `"2027A"`.
    pub fn label(&self) -> String {
        format!("{}{}", self.year, self.part)
    }

    /// Whether both terms denote the same slot (ignores the cap).
    #[inline]
    pub fn same_slot(&self, other: &Self) -> bool {
        self.year == other.year && self.part == other.part
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.year, self.part)
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Chronological by `(year, part)`. Two terms of the same slot with
/// different caps compare by cap, keeping `Ord` consistent with `Eq`; use
/// [`Term::same_slot`] to compare slots alone.
impl Ord for Term {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.year, self.part)
            .cmp(&(other.year, other.part))
            .then(self.max_difficulty.cmp(&other.max_difficulty))
    }
}

/// Builds `count` consecutive terms starting at `first`.
///
/// Every generated term after the first uses the default cap.
pub fn consecutive(first: Term, count: usize) -> Vec<Term> {
    let mut terms = Vec::with_capacity(count);
    if count == 0 {
        return terms;
    }
    let mut current = first;
    for _ in 1..count {
        let next = current.next();
        terms.push(current);
        current = next;
    }
    terms.push(current);
    terms
}
