//! Curriculum domain models.
//!
//! Provides the value types consumed and produced by the solver:
//! courses, terms, and the resulting schedule. All types are plain
//! immutable values with structural equality; the solver never stores
//! engine handles on them.
//!
//! # Domain Mappings
//!
//! | u-curriculum | University | Training program |
//! |--------------|------------|------------------|
//! | Course | Catalog course | Module |
//! | Term | Semester | Cohort block |
//! | Difficulty | Credit load | Effort points |
//! | Schedule | Degree plan | Training plan |

mod course;
pub mod defaults;
mod schedule;
mod term;

pub use course::{Course, CourseId, Difficulty};
pub use schedule::{Placement, Schedule, SchedulingOutcome, Violation, ViolationType};
pub use term::{Term, TermPart};

/// Term sequence helpers.
pub mod terms {
    pub use super::term::consecutive;
}
