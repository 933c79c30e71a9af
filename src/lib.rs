//! Curriculum scheduling for the U-Engine ecosystem.
//!
//! Assigns courses to an ordered sequence of terms subject to
//! prerequisite ordering, per-course availability and per-term workload
//! caps, minimizing the number of terms used.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Course`, `Term`, `Schedule`, `SchedulingOutcome`
//! - **`validation`**: Input integrity checks (duplicate IDs, DAG cycles),
//!   the editor-side cycle guard, and schedule legality checks
//! - **`cp`**: Constraint engine interface, the Z3 backend (feature `z3`, on by
//!   default) and the bundled branch-and-bound engine
//! - **`compiler`**: Constraint families and the makespan objective
//! - **`solver`**: Solve orchestration, model decoding, async coordination
//! - **`kpi`**: Plan quality metrics
//! - **`config`**, **`error`**, **`logging`**: Ambient plumbing
//!
//! # Example
//!
//! ```
//! use u_curriculum::models::defaults::{default_courses, default_terms};
//! use u_curriculum::solver::ScheduleSolver;
//!
//! let courses = default_courses();
//! let terms = default_terms(2027);
//! let outcome = ScheduleSolver::default().solve(&courses, &terms).unwrap();
//! assert!(outcome.is_satisfiable());
//! ```
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

pub mod compiler;
pub mod config;
pub mod cp;
pub mod error;
pub mod kpi;
pub mod logging;
pub mod models;
pub mod solver;
pub mod validation;

pub use error::{EngineError, ScheduleError};
