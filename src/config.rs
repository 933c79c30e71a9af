//! Solver configuration.
//!
//! # Example
//! ```
//! use u_curriculum::config::{CapacityPolicy, SolverConfig};
//!
//! let config = SolverConfig::default()
//!     .with_capacity_policy(CapacityPolicy::CourseCount { max_courses: 3 })
//!     .with_node_limit(Some(100_000));
//! assert_eq!(config.capacity_policy.max_courses(), Some(3));
//! assert!(!config.capacity_policy.caps_difficulty());
//! ```

use serde::{Deserialize, Serialize};

/// How per-term capacity is enforced.
///
/// The difficulty-sum cap is the default. The course-count cap is an
/// alternative; combining both is only done when asked for explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CapacityPolicy {
    /// Summed difficulty per term must not exceed the term's cap.
    #[default]
    DifficultySum,
    /// At most `max_courses` courses per term.
    CourseCount { max_courses: usize },
    /// Both caps at once.
    DifficultyAndCourseCount { max_courses: usize },
}

impl CapacityPolicy {
    /// Whether the difficulty-sum cap is enforced.
    pub fn caps_difficulty(&self) -> bool {
        matches!(
            self,
            CapacityPolicy::DifficultySum | CapacityPolicy::DifficultyAndCourseCount { .. }
        )
    }

    /// Course-count cap, if enforced.
    pub fn max_courses(&self) -> Option<usize> {
        match self {
            CapacityPolicy::DifficultySum => None,
            CapacityPolicy::CourseCount { max_courses }
            | CapacityPolicy::DifficultyAndCourseCount { max_courses } => Some(*max_courses),
        }
    }
}

/// Configuration of [`ScheduleSolver`](crate::solver::ScheduleSolver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Per-term capacity policy.
    pub capacity_policy: CapacityPolicy,
    /// Exclude terms whose cap is below the smallest active difficulty.
    pub prune_small_terms: bool,
    /// Search node budget of the bundled engine. `None` is unlimited.
    pub node_limit: Option<u64>,
    /// Per-check time budget of the Z3 engine in milliseconds. `None` is
    /// unlimited.
    pub timeout_ms: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            capacity_policy: CapacityPolicy::DifficultySum,
            prune_small_terms: true,
            node_limit: None,
            timeout_ms: None,
        }
    }
}

impl SolverConfig {
    /// Sets the capacity policy.
    pub fn with_capacity_policy(mut self, policy: CapacityPolicy) -> Self {
        self.capacity_policy = policy;
        self
    }

    /// Enables or disables the small-term prefilter.
    pub fn with_prune_small_terms(mut self, prune: bool) -> Self {
        self.prune_small_terms = prune;
        self
    }

    /// Sets the search node budget.
    pub fn with_node_limit(mut self, node_limit: Option<u64>) -> Self {
        self.node_limit = node_limit;
        self
    }

    /// Sets the per-check time budget.
    pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}
