//! Constraint-solving engine interface.
//!
//! The curriculum solver talks to its optimizing constraint engine only
//! through [`SolverEngine`] and [`SolverSession`]. An engine is a factory
//! of sessions; a session is the scope of exactly one solve: it owns the
//! variables allocated in it, accumulates assertions, accepts a single
//! minimization objective, and answers one `check()`. Dropping the
//! session releases everything it allocated.
//!
//! [`Z3Engine`] (feature `z3`, on by default) translates the
//! [`BoolExpr`]/[`IntExpr`] trees into a Z3 `Optimize` instance.
//! [`BranchAndBoundEngine`] is a dependency-free fallback for small
//! catalogs. [`DefaultEngine`] names whichever of the two the build uses.
//!
//! # Reference
//! - Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"
//! - Barrett et al. (2009), "Satisfiability Modulo Theories", Handbook of Satisfiability

mod expr;
mod search;
#[cfg(feature = "z3")]
mod smt;

pub use expr::{BoolExpr, IntExpr, IntVar, Model};
pub use search::{BranchAndBoundEngine, SearchSession, SearchStats};
#[cfg(feature = "z3")]
pub use smt::{Z3Engine, Z3Session};

/// Engine used by [`ScheduleSolver::default`](crate::solver::ScheduleSolver).
#[cfg(feature = "z3")]
pub type DefaultEngine = Z3Engine;

/// Engine used by [`ScheduleSolver::default`](crate::solver::ScheduleSolver).
#[cfg(not(feature = "z3"))]
pub type DefaultEngine = BranchAndBoundEngine;

use std::ops::RangeInclusive;

use crate::error::EngineError;

/// Result of a satisfiability check.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    /// Satisfiable; the model is optimal when an objective was set.
    Sat(Model),
    /// No valuation satisfies the assertions.
    Unsat,
}

impl CheckResult {
    /// Whether the check found a model.
    pub fn is_sat(&self) -> bool {
        matches!(self, CheckResult::Sat(_))
    }
}

/// A factory of independent solving sessions.
pub trait SolverEngine: Send + Sync {
    /// Session type produced by this engine.
    type Session: SolverSession;

    /// Engine name (for logging).
    fn name(&self) -> &'static str;

    /// Opens a fresh session with no variables and no assertions.
    ///
    /// Fails with [`EngineError::Unavailable`] when the engine cannot be
    /// started.
    fn open_session(&self) -> Result<Self::Session, EngineError>;
}

/// One solve context.
pub trait SolverSession {
    /// Allocates a named integer variable with the given inclusive bounds.
    fn new_int_var(&mut self, name: &str, bounds: RangeInclusive<i64>) -> IntVar;

    /// Asserts a boolean constraint.
    fn assert(&mut self, constraint: BoolExpr);

    /// Asserts every constraint of a batch.
    fn assert_all<I>(&mut self, constraints: I)
    where
        I: IntoIterator<Item = BoolExpr>,
        Self: Sized,
    {
        for constraint in constraints {
            self.assert(constraint);
        }
    }

    /// Sets the expression to minimize, replacing any previous objective.
    fn minimize(&mut self, objective: IntExpr);

    /// Checks satisfiability of everything asserted so far.
    ///
    /// With an objective set, a `Sat` model is a proven minimum.
    fn check(&mut self) -> Result<CheckResult, EngineError>;
}
