//! Solver orchestration.
//!
//! [`ScheduleSolver`] owns the solve lifecycle of one snapshot:
//!
//! 1. Short-circuit the empty catalog (satisfiable, engine untouched).
//! 2. Validate the snapshot; invalid input never reaches the engine.
//! 3. Open a fresh engine session, compile constraints and objective
//!    into it, and run one check. The session is dropped afterwards.
//! 4. Decode the model into a [`Schedule`] and verify its legality.
//!
//! An unsatisfiable instance is a normal [`SchedulingOutcome`]; input
//! rejection and engine failure are distinct [`ScheduleError`] variants.
//!
//! [`ScheduleCoordinator`] adds the asynchronous "latest submission wins"
//! discipline on top.

mod coordinator;
mod extract;

pub use coordinator::{ScheduleCoordinator, ScheduleStatus};
pub use extract::extract_schedule;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::compiler::{ConstraintFamily, CurriculumModelBuilder};
use crate::config::SolverConfig;
use crate::cp::{CheckResult, DefaultEngine, SolverEngine, SolverSession};
use crate::error::{EngineError, Result, ScheduleError, ValidationErrors};
use crate::models::{Course, Schedule, SchedulingOutcome, Term};
use crate::validation::{validate_input, validate_schedule_with};

/// Lifecycle state of the current schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolveState {
    /// Nothing submitted yet.
    Idle,
    /// A solve is in flight.
    Solving,
    /// The last solve found a schedule.
    Satisfied,
    /// The last solve proved that no schedule exists.
    Unsatisfied,
    /// The last solve was rejected or the engine failed.
    Failed,
}

impl SolveState {
    /// Terminal state reached by a finished solve.
    pub fn of(result: &Result<SchedulingOutcome>) -> Self {
        match result {
            Ok(SchedulingOutcome::Satisfiable(_)) => SolveState::Satisfied,
            Ok(SchedulingOutcome::Unsatisfiable) => SolveState::Unsatisfied,
            Err(_) => SolveState::Failed,
        }
    }

    /// Whether no solve is in flight.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SolveState::Solving)
    }
}

/// Effect of disabling one constraint family on an unsatisfiable instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyDiagnosis {
    /// The disabled family.
    pub family: ConstraintFamily,
    /// Whether the instance becomes satisfiable without it.
    pub restores_feasibility: bool,
}

/// Curriculum solver over a constraint engine.
///
/// # Example
/// ```
/// use u_curriculum::models::{Course, Term, TermPart};
/// use u_curriculum::solver::ScheduleSolver;
///
/// let courses = vec![
///     Course::new("c1", "100", "Intro").with_difficulty(6),
///     Course::new("c2", "200", "Advanced").with_difficulty(6).with_dependency("c1"),
/// ];
/// let terms = vec![Term::new(2027, TermPart::A), Term::new(2027, TermPart::B)];
///
/// let outcome = ScheduleSolver::default().solve(&courses, &terms).unwrap();
/// let schedule = outcome.schedule().unwrap();
/// assert_eq!(schedule.makespan(), Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct ScheduleSolver<E = DefaultEngine> {
    engine: E,
    config: SolverConfig,
}

impl ScheduleSolver<DefaultEngine> {
    /// Creates a solver on the default engine, configured from `config`.
    pub fn from_config(config: SolverConfig) -> Self {
        let engine = DefaultEngine::from_config(&config);
        Self { engine, config }
    }
}

impl Default for ScheduleSolver<DefaultEngine> {
    fn default() -> Self {
        Self::from_config(SolverConfig::default())
    }
}

impl<E: SolverEngine> ScheduleSolver<E> {
    /// Creates a solver on the given engine with the default configuration.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            config: SolverConfig::default(),
        }
    }

    /// Sets the configuration.
    ///
    /// Node limit and timeout are engine settings; they only take effect
    /// through [`ScheduleSolver::from_config`] or the engine's own
    /// `from_config`.
    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// The configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// The engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Computes a minimum-makespan schedule for the active courses.
    ///
    /// # Errors
    /// - [`ScheduleError::Invalid`] when the snapshot fails validation.
    /// - [`ScheduleError::Engine`] when the engine cannot be run or
    ///   returns an unusable model.
    pub fn solve(&self, courses: &[Course], terms: &[Term]) -> Result<SchedulingOutcome> {
        let active = courses.iter().filter(|c| c.active).count();
        if active == 0 {
            info!(terms = terms.len(), "empty catalog, nothing to schedule");
            return Ok(SchedulingOutcome::Satisfiable(Schedule::new()));
        }

        self.validate(courses, terms)?;

        info!(
            courses = active,
            terms = terms.len(),
            engine = self.engine.name(),
            "solving curriculum"
        );
        let builder = CurriculumModelBuilder::new(courses, terms).with_config(self.config.clone());
        let outcome = self.run(&builder, courses, true).map_err(|e| {
            warn!(error = %e, "engine failure");
            ScheduleError::from(e)
        })?;

        match &outcome {
            SchedulingOutcome::Satisfiable(schedule) => info!(
                makespan = schedule.makespan(),
                placements = schedule.placement_count(),
                "schedule found"
            ),
            SchedulingOutcome::Unsatisfiable => info!("no schedule exists"),
        }
        Ok(outcome)
    }

    /// Reports which constraint family blocks an unsatisfiable instance.
    ///
    /// Re-solves with each enabled family disabled in turn. Returns an
    /// empty list when the instance is satisfiable as given.
    pub fn diagnose(&self, courses: &[Course], terms: &[Term]) -> Result<Vec<FamilyDiagnosis>> {
        if courses.iter().all(|c| !c.active) {
            return Ok(Vec::new());
        }
        self.validate(courses, terms)?;

        let base = CurriculumModelBuilder::new(courses, terms)
            .with_config(self.config.clone())
            .feasibility_only();
        if self.run(&base, courses, false)?.is_satisfiable() {
            return Ok(Vec::new());
        }

        let mut diagnoses = Vec::new();
        for family in ConstraintFamily::ALL {
            if !base.is_enabled(family) {
                continue;
            }
            let relaxed = CurriculumModelBuilder::new(courses, terms)
                .with_config(self.config.clone())
                .feasibility_only()
                .without_family(family);
            let restores_feasibility = self.run(&relaxed, courses, false)?.is_satisfiable();
            debug!(family = family.name(), restores_feasibility, "diagnosed family");
            diagnoses.push(FamilyDiagnosis {
                family,
                restores_feasibility,
            });
        }
        Ok(diagnoses)
    }

    fn validate(&self, courses: &[Course], terms: &[Term]) -> Result<()> {
        validate_input(courses, terms).map_err(|errors| {
            warn!(count = errors.len(), "input rejected");
            ScheduleError::Invalid(ValidationErrors::from(errors))
        })
    }

    /// One engine session: compile, check, decode.
    ///
    /// With `verify`, the decoded schedule is checked against `courses`
    /// under the configured capacity policy.
    fn run(
        &self,
        builder: &CurriculumModelBuilder<'_>,
        courses: &[Course],
        verify: bool,
    ) -> std::result::Result<SchedulingOutcome, EngineError> {
        let mut session = self.engine.open_session()?;
        let vars = builder.build(&mut session);
        let model = match session.check()? {
            CheckResult::Unsat => return Ok(SchedulingOutcome::Unsatisfiable),
            CheckResult::Sat(model) => model,
        };
        drop(session);

        let terms = builder.terms();
        let schedule = extract_schedule(&model, builder.active_courses(), &vars, terms.len())?;

        if verify {
            let violations =
                validate_schedule_with(&schedule, courses, terms, &self.config.capacity_policy);
            if let Some(first) = violations.first() {
                return Err(EngineError::Execution(format!(
                    "engine returned an illegal assignment ({} violation(s), first: {})",
                    violations.len(),
                    first.message
                )));
            }
        }

        Ok(SchedulingOutcome::Satisfiable(schedule))
    }
}
