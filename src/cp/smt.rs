//! Z3-backed engine.
//!
//! A [`Z3Session`] records variables, assertions and the objective as
//! engine-agnostic expressions. `check()` opens a Z3 context, translates
//! everything into one `Optimize` instance, runs it, and reads the model
//! back. The context lives only for the duration of the check.
//!
//! Translation maps the expression vocabulary one to one: `Eq`/`Gt`/`Le`
//! to the integer relations, `Ite` to `Bool::ite`, `Sum` to `Int::add`,
//! `AtMost` to a pseudo-boolean `pb_le`. `Max` has no Z3 primitive and is
//! lowered to the fold `m = if x > m then x else m`; Z3 terms are
//! reference counted, so the fold stays linear in size.
//!
//! # Reference
//! - de Moura & Bjørner (2008), "Z3: An Efficient SMT Solver"
//! - Bjørner, Phan & Fleckenstein (2015), "νZ - An Optimizing SMT Solver"

use std::ops::RangeInclusive;
use std::time::Duration;

use tracing::debug;
use z3::ast::{Ast, Bool, Int};
use z3::{Config, Context, Optimize, SatResult};

use super::expr::{BoolExpr, IntExpr, IntVar, Model};
use super::{CheckResult, SolverEngine, SolverSession};
use crate::config::SolverConfig;
use crate::error::EngineError;

/// Optimizing SMT engine on top of Z3.
///
/// # Example
/// ```
/// use u_curriculum::cp::{CheckResult, IntExpr, SolverEngine, SolverSession, Z3Engine};
///
/// let mut session = Z3Engine::new().open_session().unwrap();
/// let x = session.new_int_var("x", 0..=5);
/// let y = session.new_int_var("y", 0..=5);
/// session.assert(IntExpr::var(y).gt(x));
/// session.minimize(IntExpr::var(y));
///
/// match session.check().unwrap() {
///     CheckResult::Sat(model) => assert_eq!(model.value(y), Some(1)),
///     CheckResult::Unsat => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Z3Engine {
    timeout: Option<Duration>,
}

impl Z3Engine {
    /// Creates an engine without a timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine honoring `config.timeout_ms`.
    pub fn from_config(config: &SolverConfig) -> Self {
        Self::new().with_timeout(config.timeout_ms.map(Duration::from_millis))
    }

    /// Bounds the time of each check.
    ///
    /// A check that runs out of time yields [`EngineError::Inconclusive`].
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl SolverEngine for Z3Engine {
    type Session = Z3Session;

    fn name(&self) -> &'static str {
        "z3"
    }

    fn open_session(&self) -> Result<Self::Session, EngineError> {
        Ok(Z3Session {
            vars: Vec::new(),
            assertions: Vec::new(),
            objective: None,
            timeout: self.timeout,
        })
    }
}

/// One solve context of [`Z3Engine`].
#[derive(Debug)]
pub struct Z3Session {
    vars: Vec<(String, RangeInclusive<i64>)>,
    assertions: Vec<BoolExpr>,
    objective: Option<IntExpr>,
    timeout: Option<Duration>,
}

impl Z3Session {
    /// Number of variables allocated.
    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// Number of asserted constraints.
    pub fn constraint_count(&self) -> usize {
        self.assertions.len()
    }
}

impl SolverSession for Z3Session {
    fn new_int_var(&mut self, name: &str, bounds: RangeInclusive<i64>) -> IntVar {
        self.vars.push((name.to_string(), bounds));
        IntVar::from_index(self.vars.len() - 1)
    }

    fn assert(&mut self, constraint: BoolExpr) {
        self.assertions.push(constraint);
    }

    fn minimize(&mut self, objective: IntExpr) {
        self.objective = Some(objective);
    }

    fn check(&mut self) -> Result<CheckResult, EngineError> {
        let mut config = Config::new();
        if let Some(timeout) = self.timeout {
            config.set_timeout_msec(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        }
        let ctx = Context::new(&config);
        let optimize = Optimize::new(&ctx);

        let translator = Translator::new(&ctx, &self.vars);
        for (var, (_, bounds)) in translator.ints.iter().zip(&self.vars) {
            optimize.assert(&var.ge(&Int::from_i64(&ctx, *bounds.start())));
            optimize.assert(&var.le(&Int::from_i64(&ctx, *bounds.end())));
        }
        for assertion in &self.assertions {
            optimize.assert(&translator.boolean(assertion)?);
        }
        let objective = match &self.objective {
            Some(expr) => {
                let objective = translator.int(expr)?;
                optimize.minimize(&objective);
                Some(objective)
            }
            None => None,
        };

        let result = optimize.check(&[]);
        debug!(
            vars = self.vars.len(),
            constraints = self.assertions.len(),
            ?result,
            "z3 check finished"
        );

        match result {
            SatResult::Unsat => Ok(CheckResult::Unsat),
            SatResult::Unknown => Err(EngineError::Inconclusive(
                "z3 gave up (timeout or resource limit)".into(),
            )),
            SatResult::Sat => {
                let z3_model = optimize.get_model().ok_or_else(|| {
                    EngineError::Execution("z3 reported sat without a model".into())
                })?;
                let mut model = Model::new();
                for (i, var) in translator.ints.iter().enumerate() {
                    let value = z3_model
                        .eval(var, true)
                        .and_then(|v| v.as_i64())
                        .ok_or_else(|| {
                            EngineError::MalformedModel(format!(
                                "no integer value for '{}'",
                                self.vars[i].0
                            ))
                        })?;
                    model.set(IntVar::from_index(i), value);
                }
                let objective_value = objective
                    .as_ref()
                    .and_then(|o| z3_model.eval(o, true))
                    .and_then(|v| v.as_i64());
                Ok(CheckResult::Sat(model.with_objective(objective_value)))
            }
        }
    }
}

/// Expression translation into one Z3 context.
struct Translator<'ctx> {
    ctx: &'ctx Context,
    ints: Vec<Int<'ctx>>,
}

impl<'ctx> Translator<'ctx> {
    fn new(ctx: &'ctx Context, vars: &[(String, RangeInclusive<i64>)]) -> Self {
        let ints = vars
            .iter()
            .enumerate()
            .map(|(i, (name, _))| Int::new_const(ctx, format!("{name}#{i}")))
            .collect();
        Self { ctx, ints }
    }

    fn var(&self, var: IntVar) -> Result<&Int<'ctx>, EngineError> {
        self.ints.get(var.index()).ok_or_else(|| {
            EngineError::Execution(format!(
                "variable #{} was not allocated in this session",
                var.index()
            ))
        })
    }

    fn int(&self, expr: &IntExpr) -> Result<Int<'ctx>, EngineError> {
        Ok(match expr {
            IntExpr::Const(c) => Int::from_i64(self.ctx, *c),
            IntExpr::Var(v) => self.var(*v)?.clone(),
            IntExpr::Ite(cond, a, b) => self.boolean(cond)?.ite(&self.int(a)?, &self.int(b)?),
            IntExpr::Sum(terms) => {
                let terms = terms
                    .iter()
                    .map(|t| self.int(t))
                    .collect::<Result<Vec<_>, _>>()?;
                if terms.is_empty() {
                    Int::from_i64(self.ctx, 0)
                } else {
                    let refs: Vec<&Int<'ctx>> = terms.iter().collect();
                    Int::add(self.ctx, &refs)
                }
            }
            IntExpr::Max(terms) => {
                let mut terms = terms.iter();
                let first = terms.next().ok_or_else(|| {
                    EngineError::Execution("maximum over no terms".into())
                })?;
                let mut max = self.int(first)?;
                for term in terms {
                    let x = self.int(term)?;
                    max = x.gt(&max).ite(&x, &max);
                }
                max
            }
        })
    }

    fn boolean(&self, expr: &BoolExpr) -> Result<Bool<'ctx>, EngineError> {
        Ok(match expr {
            BoolExpr::Const(b) => Bool::from_bool(self.ctx, *b),
            BoolExpr::Eq(a, b) => self.int(a)?._eq(&self.int(b)?),
            BoolExpr::Gt(a, b) => self.int(a)?.gt(&self.int(b)?),
            BoolExpr::Le(a, b) => self.int(a)?.le(&self.int(b)?),
            BoolExpr::And(clauses) => {
                let clauses = self.booleans(clauses)?;
                let refs: Vec<&Bool<'ctx>> = clauses.iter().collect();
                Bool::and(self.ctx, &refs)
            }
            BoolExpr::Or(clauses) => {
                let clauses = self.booleans(clauses)?;
                if clauses.is_empty() {
                    Bool::from_bool(self.ctx, false)
                } else {
                    let refs: Vec<&Bool<'ctx>> = clauses.iter().collect();
                    Bool::or(self.ctx, &refs)
                }
            }
            BoolExpr::Not(inner) => self.boolean(inner)?.not(),
            BoolExpr::AtMost(k, clauses) => {
                let clauses = self.booleans(clauses)?;
                if clauses.len() <= *k {
                    Bool::from_bool(self.ctx, true)
                } else {
                    let weighted: Vec<(&Bool<'ctx>, i32)> =
                        clauses.iter().map(|c| (c, 1)).collect();
                    let k = i32::try_from(*k).unwrap_or(i32::MAX);
                    Bool::pb_le(self.ctx, &weighted, k)
                }
            }
        })
    }

    fn booleans(&self, exprs: &[BoolExpr]) -> Result<Vec<Bool<'ctx>>, EngineError> {
        exprs.iter().map(|e| self.boolean(e)).collect()
    }
}
