//! Bundled finite-domain engine.
//!
//! # Algorithm
//!
//! 1. Every variable gets the explicit domain of its declared bounds.
//! 2. Asserted expressions are lowered into an internal form; nested
//!    maxima are flattened into one n-ary `Max`.
//! 3. Depth-first search with forward checking: before branching, each
//!    value of each domain is tried tentatively and dropped when some
//!    constraint watching that variable evaluates to false under interval
//!    reasoning. Filtering repeats until a fixpoint.
//! 4. Branch on the smallest open domain (MRV), ascending values.
//! 5. Branch-and-bound: every improving solution tightens the bound
//!    `objective <= best - 1`, which is filtered like a constraint. After
//!    each improvement the root is filtered again under the new bound; a
//!    wipe-out there proves the incumbent optimal. Otherwise the search
//!    ends when the tree is exhausted or the root lower bound of the
//!    objective is reached.
//!
//! The engine has no learning or symmetry breaking; it suits small
//! catalogs and models whose implied bounds close the search early.
//!
//! Interval evaluation is a sound over-approximation, so filtering never
//! removes a value that belongs to a solution; with all variables fixed it
//! is exact.
//!
//! # Reference
//! - Haralick & Elliott (1980), "Increasing Tree Search Efficiency for
//!   Constraint Satisfaction Problems"
//! - Land & Doig (1960), "An Automatic Method of Solving Discrete
//!   Programming Problems"

use std::ops::RangeInclusive;

use tracing::debug;

use super::expr::{BoolExpr, IntExpr, IntVar, Model};
use super::{CheckResult, SolverEngine, SolverSession};
use crate::config::SolverConfig;
use crate::error::EngineError;

/// Largest domain the engine will enumerate for one variable.
pub const MAX_DOMAIN_SIZE: i64 = 1 << 16;

/// Search statistics of the last `check()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Search nodes visited.
    pub nodes: u64,
    /// Improving solutions found.
    pub solutions: u64,
}

/// Branch-and-bound engine over small integer domains.
///
/// # Example
/// ```
/// use u_curriculum::cp::{BranchAndBoundEngine, CheckResult, IntExpr, SolverEngine, SolverSession};
///
/// let engine = BranchAndBoundEngine::new();
/// let mut session = engine.open_session().unwrap();
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
pub struct BranchAndBoundEngine {
    node_limit: Option<u64>,
}

impl BranchAndBoundEngine {
    /// Creates an engine without a node limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine honoring `config.node_limit`.
    pub fn from_config(config: &SolverConfig) -> Self {
        Self::new().with_node_limit(config.node_limit)
    }

    /// Caps the number of search nodes per check.
    ///
    /// Exhausting the budget yields [`EngineError::SearchLimit`].
    pub fn with_node_limit(mut self, node_limit: Option<u64>) -> Self {
        self.node_limit = node_limit;
        self
    }
}

impl SolverEngine for BranchAndBoundEngine {
    type Session = SearchSession;

    fn name(&self) -> &'static str {
        "branch-and-bound"
    }

    fn open_session(&self) -> Result<Self::Session, EngineError> {
        Ok(SearchSession::new(self.node_limit))
    }
}

/// One solve context of [`BranchAndBoundEngine`].
#[derive(Debug)]
pub struct SearchSession {
    domains: Vec<Vec<i64>>,
    constraints: Vec<(Cond, Vec<usize>)>,
    objective: Option<(Term, Vec<usize>)>,
    node_limit: Option<u64>,
    setup_error: Option<String>,
    stats: SearchStats,
}

impl SearchSession {
    fn new(node_limit: Option<u64>) -> Self {
        Self {
            domains: Vec::new(),
            constraints: Vec::new(),
            objective: None,
            node_limit,
            setup_error: None,
            stats: SearchStats::default(),
        }
    }

    /// Statistics of the last check.
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Number of variables allocated.
    pub fn var_count(&self) -> usize {
        self.domains.len()
    }

    /// Number of asserted constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    fn var_indices(&mut self, vars: impl IntoIterator<Item = IntVar>) -> Vec<usize> {
        let mut indices = Vec::new();
        for var in vars {
            if var.index() >= self.domains.len() {
                self.setup_error.get_or_insert_with(|| {
                    format!("variable #{} was not allocated in this session", var.index())
                });
            } else {
                indices.push(var.index());
            }
        }
        indices
    }
}

impl SolverSession for SearchSession {
    fn new_int_var(&mut self, name: &str, bounds: RangeInclusive<i64>) -> IntVar {
        let (lo, hi) = (*bounds.start(), *bounds.end());
        let domain = if hi < lo {
            Vec::new()
        } else if hi.saturating_sub(lo) >= MAX_DOMAIN_SIZE {
            self.setup_error.get_or_insert_with(|| {
                format!("domain of '{name}' exceeds {MAX_DOMAIN_SIZE} values")
            });
            Vec::new()
        } else {
            (lo..=hi).collect()
        };
        self.domains.push(domain);
        IntVar::from_index(self.domains.len() - 1)
    }

    fn assert(&mut self, constraint: BoolExpr) {
        let vars = self.var_indices(constraint.vars());
        self.constraints.push((lower_bool(&constraint), vars));
    }

    fn minimize(&mut self, objective: IntExpr) {
        let mut collected = std::collections::BTreeSet::new();
        objective.collect_vars(&mut collected);
        let vars = self.var_indices(collected);
        self.objective = Some((lower_int(&objective), vars));
    }

    fn check(&mut self) -> Result<CheckResult, EngineError> {
        self.stats = SearchStats::default();
        if let Some(message) = &self.setup_error {
            return Err(EngineError::Execution(message.clone()));
        }

        let root = self.domains.clone();
        if root.iter().any(Vec::is_empty) {
            return Ok(CheckResult::Unsat);
        }
        let ground_false = self
            .constraints
            .iter()
            .any(|(cond, vars)| vars.is_empty() && truth(cond, &root) == Truth::False);
        if ground_false {
            return Ok(CheckResult::Unsat);
        }

        let mut search = Search::new(self);
        let result = search.run(root);
        let stats = SearchStats {
            nodes: search.nodes,
            solutions: search.solutions,
        };
        let best = search.best.take();
        self.stats = stats;
        debug!(
            vars = self.domains.len(),
            constraints = self.constraints.len(),
            nodes = stats.nodes,
            solutions = stats.solutions,
            "search finished"
        );
        result?;

        Ok(match best {
            Some(model) => CheckResult::Sat(model),
            None => CheckResult::Unsat,
        })
    }
}

// ----------------------------------------------------------------------
// Search
// ----------------------------------------------------------------------

struct Search<'a> {
    session: &'a SearchSession,
    root: Vec<Vec<i64>>,
    watchers: Vec<Vec<usize>>,
    in_objective: Vec<bool>,
    bound: Option<i64>,
    root_lower: Option<i64>,
    best: Option<Model>,
    finished: bool,
    nodes: u64,
    solutions: u64,
}

impl<'a> Search<'a> {
    fn new(session: &'a SearchSession) -> Self {
        let n = session.domains.len();
        let mut watchers = vec![Vec::new(); n];
        for (ci, (_, vars)) in session.constraints.iter().enumerate() {
            for &v in vars {
                watchers[v].push(ci);
            }
        }
        let mut in_objective = vec![false; n];
        if let Some((_, vars)) = &session.objective {
            for &v in vars {
                in_objective[v] = true;
            }
        }
        Self {
            session,
            root: Vec::new(),
            watchers,
            in_objective,
            bound: None,
            root_lower: None,
            best: None,
            finished: false,
            nodes: 0,
            solutions: 0,
        }
    }

    fn run(&mut self, mut root: Vec<Vec<i64>>) -> Result<(), EngineError> {
        self.nodes += 1;
        if !self.propagate(&mut root) {
            return Ok(());
        }
        if let Some((objective, _)) = &self.session.objective {
            self.root_lower = Some(bounds(objective, &root).lo);
        }
        self.root = root.clone();
        self.branch(root)
    }

    fn explore(&mut self, mut domains: Vec<Vec<i64>>) -> Result<(), EngineError> {
        self.nodes += 1;
        if let Some(limit) = self.session.node_limit {
            if self.nodes > limit {
                return Err(EngineError::SearchLimit { nodes: limit });
            }
        }
        if !self.propagate(&mut domains) {
            return Ok(());
        }
        self.branch(domains)
    }

    fn branch(&mut self, domains: Vec<Vec<i64>>) -> Result<(), EngineError> {
        let Some(var) = select_var(&domains) else {
            self.record(&domains);
            return Ok(());
        };
        for &value in &domains[var] {
            let mut child = domains.clone();
            child[var] = vec![value];
            self.explore(child)?;
            if self.finished {
                break;
            }
        }
        Ok(())
    }

    /// Records a fully fixed assignment that survived propagation.
    fn record(&mut self, domains: &[Vec<i64>]) {
        let model: Model = domains
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.first().map(|&v| (IntVar::from_index(i), v)))
            .collect();

        let Some((objective, _)) = &self.session.objective else {
            self.solutions += 1;
            self.best = Some(model);
            self.finished = true;
            return;
        };

        let value = bounds(objective, domains).lo;
        if self.bound.map_or(true, |b| value < b) {
            self.solutions += 1;
            self.bound = Some(value);
            self.best = Some(model.with_objective(Some(value)));
            if self.root_lower.is_some_and(|lower| value <= lower) {
                self.finished = true;
                return;
            }
            let mut root = self.root.clone();
            if !self.propagate(&mut root) {
                debug!(objective = value, "incumbent proven optimal at root");
                self.finished = true;
            }
        }
    }

    /// Forward-checking filter to fixpoint. Returns `false` on a wipe-out.
    fn propagate(&self, domains: &mut [Vec<i64>]) -> bool {
        loop {
            let mut changed = false;
            for var in 0..domains.len() {
                if self.watchers[var].is_empty() && !self.in_objective[var] {
                    continue;
                }
                let original = std::mem::take(&mut domains[var]);
                let mut kept = Vec::with_capacity(original.len());
                for &value in &original {
                    domains[var].clear();
                    domains[var].push(value);
                    if self.consistent(var, domains) {
                        kept.push(value);
                    }
                }
                if kept.is_empty() {
                    domains[var] = original;
                    return false;
                }
                changed |= kept.len() != original.len();
                domains[var] = kept;
            }
            if !changed {
                return true;
            }
        }
    }

    fn consistent(&self, var: usize, domains: &[Vec<i64>]) -> bool {
        let constraints = &self.session.constraints;
        if self.watchers[var]
            .iter()
            .any(|&ci| truth(&constraints[ci].0, domains) == Truth::False)
        {
            return false;
        }
        match (&self.session.objective, self.bound) {
            (Some((objective, _)), Some(bound)) if self.in_objective[var] => {
                bounds(objective, domains).lo < bound
            }
            _ => true,
        }
    }
}

/// Smallest domain with more than one value; ties go to the lowest index.
fn select_var(domains: &[Vec<i64>]) -> Option<usize> {
    domains
        .iter()
        .enumerate()
        .filter(|(_, d)| d.len() > 1)
        .min_by_key(|(i, d)| (d.len(), *i))
        .map(|(i, _)| i)
}

// ----------------------------------------------------------------------
// Internal expression form and interval evaluation
// ----------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Term {
    Const(i64),
    Var(usize),
    Ite(Box<Cond>, Box<Term>, Box<Term>),
    Sum(Vec<Term>),
    Max(Vec<Term>),
}

#[derive(Debug, Clone)]
enum Cond {
    Const(bool),
    Eq(Term, Term),
    Gt(Term, Term),
    Le(Term, Term),
    And(Vec<Cond>),
    Or(Vec<Cond>),
    Not(Box<Cond>),
    AtMost(usize, Vec<Cond>),
}

fn lower_int(expr: &IntExpr) -> Term {
    match expr {
        IntExpr::Const(c) => Term::Const(*c),
        IntExpr::Var(v) => Term::Var(v.index()),
        IntExpr::Ite(cond, a, b) => Term::Ite(
            Box::new(lower_bool(cond)),
            Box::new(lower_int(a)),
            Box::new(lower_int(b)),
        ),
        IntExpr::Sum(terms) => Term::Sum(terms.iter().map(lower_int).collect()),
        IntExpr::Max(terms) => {
            let mut items = Vec::with_capacity(terms.len());
            for term in terms {
                push_max(&mut items, lower_int(term));
            }
            Term::Max(items)
        }
    }
}

fn push_max(items: &mut Vec<Term>, term: Term) {
    match term {
        Term::Max(inner) => items.extend(inner),
        other => items.push(other),
    }
}

fn lower_bool(expr: &BoolExpr) -> Cond {
    match expr {
        BoolExpr::Const(b) => Cond::Const(*b),
        BoolExpr::Eq(a, b) => Cond::Eq(lower_int(a), lower_int(b)),
        BoolExpr::Gt(a, b) => Cond::Gt(lower_int(a), lower_int(b)),
        BoolExpr::Le(a, b) => Cond::Le(lower_int(a), lower_int(b)),
        BoolExpr::And(cs) => Cond::And(cs.iter().map(lower_bool).collect()),
        BoolExpr::Or(cs) => Cond::Or(cs.iter().map(lower_bool).collect()),
        BoolExpr::Not(inner) => Cond::Not(Box::new(lower_bool(inner))),
        BoolExpr::AtMost(k, cs) => Cond::AtMost(*k, cs.iter().map(lower_bool).collect()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    fn from_bool(b: bool) -> Self {
        if b {
            Truth::True
        } else {
            Truth::False
        }
    }

    fn negate(self) -> Self {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    lo: i64,
    hi: i64,
}

impl Bounds {
    fn point(v: i64) -> Self {
        Self { lo: v, hi: v }
    }

    fn is_point(&self) -> bool {
        self.lo == self.hi
    }

    fn hull(self, other: Self) -> Self {
        Self {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }
}

fn bounds(term: &Term, domains: &[Vec<i64>]) -> Bounds {
    match term {
        Term::Const(c) => Bounds::point(*c),
        Term::Var(i) => match (domains[*i].first(), domains[*i].last()) {
            (Some(&lo), Some(&hi)) => Bounds { lo, hi },
            // Wiped-out domains never reach evaluation.
            _ => Bounds { lo: 0, hi: 0 },
        },
        Term::Ite(cond, a, b) => match truth(cond, domains) {
            Truth::True => bounds(a, domains),
            Truth::False => bounds(b, domains),
            Truth::Unknown => bounds(a, domains).hull(bounds(b, domains)),
        },
        Term::Sum(terms) => terms.iter().fold(Bounds::point(0), |acc, t| {
            let b = bounds(t, domains);
            Bounds {
                lo: acc.lo.saturating_add(b.lo),
                hi: acc.hi.saturating_add(b.hi),
            }
        }),
        Term::Max(terms) => terms
            .iter()
            .map(|t| bounds(t, domains))
            .reduce(|acc, b| Bounds {
                lo: acc.lo.max(b.lo),
                hi: acc.hi.max(b.hi),
            })
            .unwrap_or(Bounds::point(i64::MIN)),
    }
}

fn truth(cond: &Cond, domains: &[Vec<i64>]) -> Truth {
    match cond {
        Cond::Const(b) => Truth::from_bool(*b),
        Cond::Eq(Term::Var(i), Term::Const(c)) | Cond::Eq(Term::Const(c), Term::Var(i)) => {
            let domain = &domains[*i];
            if domain.binary_search(c).is_err() {
                Truth::False
            } else if domain.len() == 1 {
                Truth::True
            } else {
                Truth::Unknown
            }
        }
        Cond::Eq(a, b) => {
            let (a, b) = (bounds(a, domains), bounds(b, domains));
            if a.hi < b.lo || b.hi < a.lo {
                Truth::False
            } else if a.is_point() && b.is_point() {
                Truth::True
            } else {
                Truth::Unknown
            }
        }
        Cond::Gt(a, b) => {
            let (a, b) = (bounds(a, domains), bounds(b, domains));
            if a.lo > b.hi {
                Truth::True
            } else if a.hi <= b.lo {
                Truth::False
            } else {
                Truth::Unknown
            }
        }
        Cond::Le(a, b) => {
            let (a, b) = (bounds(a, domains), bounds(b, domains));
            if a.hi <= b.lo {
                Truth::True
            } else if a.lo > b.hi {
                Truth::False
            } else {
                Truth::Unknown
            }
        }
        Cond::And(cs) => {
            let mut result = Truth::True;
            for c in cs {
                match truth(c, domains) {
                    Truth::False => return Truth::False,
                    Truth::Unknown => result = Truth::Unknown,
                    Truth::True => {}
                }
            }
            result
        }
        Cond::Or(cs) => {
            let mut result = Truth::False;
            for c in cs {
                match truth(c, domains) {
                    Truth::True => return Truth::True,
                    Truth::Unknown => result = Truth::Unknown,
                    Truth::False => {}
                }
            }
            result
        }
        Cond::Not(inner) => truth(inner, domains).negate(),
        Cond::AtMost(k, cs) => {
            let (mut sure, mut open) = (0usize, 0usize);
            for c in cs {
                match truth(c, domains) {
                    Truth::True => sure += 1,
                    Truth::Unknown => open += 1,
                    Truth::False => {}
                }
            }
            if sure > *k {
                Truth::False
            } else if sure + open <= *k {
                Truth::True
            } else {
                Truth::Unknown
            }
        }
    }
}
