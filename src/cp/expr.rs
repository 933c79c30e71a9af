//! Engine-agnostic constraint expressions.
//!
//! Integer and boolean expression trees built by the constraint compiler
//! and handed to a [`SolverSession`](super::SolverSession). Variables are
//! opaque handles allocated by the session that owns them; a handle is
//! meaningless outside that session.

use std::collections::{BTreeSet, HashMap};
use std::ops::Not;

/// Handle to an integer decision variable within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntVar(usize);

impl IntVar {
    /// Creates a handle from a session-local index.
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Session-local index.
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Integer-valued expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntExpr {
    /// Integer literal.
    Const(i64),
    /// Decision variable.
    Var(IntVar),
    /// `if cond then a else b`.
    Ite(Box<BoolExpr>, Box<IntExpr>, Box<IntExpr>),
    /// N-ary sum. The empty sum is zero.
    Sum(Vec<IntExpr>),
    /// N-ary maximum. The empty maximum is undefined.
    Max(Vec<IntExpr>),
}

/// Boolean-valued expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoolExpr {
    /// Boolean literal.
    Const(bool),
    /// `a == b`.
    Eq(Box<IntExpr>, Box<IntExpr>),
    /// `a > b`.
    Gt(Box<IntExpr>, Box<IntExpr>),
    /// `a <= b`.
    Le(Box<IntExpr>, Box<IntExpr>),
    /// Conjunction. The empty conjunction is true.
    And(Vec<BoolExpr>),
    /// Disjunction. The empty disjunction is false.
    Or(Vec<BoolExpr>),
    /// Negation.
    Not(Box<BoolExpr>),
    /// At most `k` of the clauses hold.
    AtMost(usize, Vec<BoolExpr>),
}

impl IntExpr {
    /// Integer literal.
    pub fn constant(value: i64) -> Self {
        IntExpr::Const(value)
    }

    /// Variable reference.
    pub fn var(var: IntVar) -> Self {
        IntExpr::Var(var)
    }

    /// `if cond then then_expr else else_expr`.
    pub fn ite(
        cond: BoolExpr,
        then_expr: impl Into<IntExpr>,
        else_expr: impl Into<IntExpr>,
    ) -> Self {
        IntExpr::Ite(
            Box::new(cond),
            Box::new(then_expr.into()),
            Box::new(else_expr.into()),
        )
    }

    /// Sum of the given terms.
    pub fn sum(terms: impl IntoIterator<Item = IntExpr>) -> Self {
        IntExpr::Sum(terms.into_iter().collect())
    }

    /// Largest of the given terms.
    ///
    /// Engines without a native maximum realise it as the pairwise fold
    /// `m = if x > m then x else m`.
    pub fn max(terms: impl IntoIterator<Item = IntExpr>) -> Self {
        IntExpr::Max(terms.into_iter().collect())
    }

    /// `self == other`.
    pub fn equals(self, other: impl Into<IntExpr>) -> BoolExpr {
        BoolExpr::Eq(Box::new(self), Box::new(other.into()))
    }

    /// `self > other`.
    pub fn gt(self, other: impl Into<IntExpr>) -> BoolExpr {
        BoolExpr::Gt(Box::new(self), Box::new(other.into()))
    }

    /// `self <= other`.
    pub fn le(self, other: impl Into<IntExpr>) -> BoolExpr {
        BoolExpr::Le(Box::new(self), Box::new(other.into()))
    }

    /// Evaluates under a complete valuation. `None` if a variable is unbound.
    pub fn eval(&self, model: &Model) -> Option<i64> {
        match self {
            IntExpr::Const(c) => Some(*c),
            IntExpr::Var(v) => model.value(*v),
            IntExpr::Ite(cond, a, b) => {
                if cond.eval(model)? {
                    a.eval(model)
                } else {
                    b.eval(model)
                }
            }
            IntExpr::Sum(terms) => terms
                .iter()
                .try_fold(0i64, |acc, t| Some(acc.saturating_add(t.eval(model)?))),
            IntExpr::Max(terms) => terms.iter().try_fold(None, |acc: Option<i64>, t| {
                let value = t.eval(model)?;
                Some(Some(acc.map_or(value, |m| m.max(value))))
            })?,
        }
    }

    /// Collects the variables referenced by this expression.
    pub fn collect_vars(&self, out: &mut BTreeSet<IntVar>) {
        match self {
            IntExpr::Const(_) => {}
            IntExpr::Var(v) => {
                out.insert(*v);
            }
            IntExpr::Ite(cond, a, b) => {
                cond.collect_vars(out);
                a.collect_vars(out);
                b.collect_vars(out);
            }
            IntExpr::Sum(terms) | IntExpr::Max(terms) => {
                terms.iter().for_each(|t| t.collect_vars(out))
            }
        }
    }
}

impl From<IntVar> for IntExpr {
    fn from(var: IntVar) -> Self {
        IntExpr::Var(var)
    }
}

impl From<i64> for IntExpr {
    fn from(value: i64) -> Self {
        IntExpr::Const(value)
    }
}

impl BoolExpr {
    /// Boolean literal.
    pub fn constant(value: bool) -> Self {
        BoolExpr::Const(value)
    }

    /// Conjunction of the given clauses.
    pub fn and(clauses: impl IntoIterator<Item = BoolExpr>) -> Self {
        BoolExpr::And(clauses.into_iter().collect())
    }

    /// Disjunction of the given clauses.
    pub fn or(clauses: impl IntoIterator<Item = BoolExpr>) -> Self {
        BoolExpr::Or(clauses.into_iter().collect())
    }

    /// At most `k` of the given clauses hold.
    pub fn at_most(k: usize, clauses: impl IntoIterator<Item = BoolExpr>) -> Self {
        BoolExpr::AtMost(k, clauses.into_iter().collect())
    }

    /// Evaluates under a complete valuation. `None` if a variable is unbound.
    pub fn eval(&self, model: &Model) -> Option<bool> {
        match self {
            BoolExpr::Const(b) => Some(*b),
            BoolExpr::Eq(a, b) => Some(a.eval(model)? == b.eval(model)?),
            BoolExpr::Gt(a, b) => Some(a.eval(model)? > b.eval(model)?),
            BoolExpr::Le(a, b) => Some(a.eval(model)? <= b.eval(model)?),
            BoolExpr::And(clauses) => {
                for c in clauses {
                    if !c.eval(model)? {
                        return Some(false);
                    }
                }
                Some(true)
            }
            BoolExpr::Or(clauses) => {
                for c in clauses {
                    if c.eval(model)? {
                        return Some(true);
                    }
                }
                Some(false)
            }
            BoolExpr::Not(inner) => inner.eval(model).map(|b| !b),
            BoolExpr::AtMost(k, clauses) => {
                let mut count = 0usize;
                for c in clauses {
                    if c.eval(model)? {
                        count += 1;
                    }
                }
                Some(count <= *k)
            }
        }
    }

    /// Collects the variables referenced by this expression.
    pub fn collect_vars(&self, out: &mut BTreeSet<IntVar>) {
        match self {
            BoolExpr::Const(_) => {}
            BoolExpr::Eq(a, b) | BoolExpr::Gt(a, b) | BoolExpr::Le(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
            BoolExpr::And(clauses) | BoolExpr::Or(clauses) | BoolExpr::AtMost(_, clauses) => {
                clauses.iter().for_each(|c| c.collect_vars(out));
            }
            BoolExpr::Not(inner) => inner.collect_vars(out),
        }
    }

    /// Variables referenced by this expression, ordered by index.
    pub fn vars(&self) -> BTreeSet<IntVar> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }
}

impl Not for BoolExpr {
    type Output = BoolExpr;

    fn not(self) -> Self::Output {
        BoolExpr::Not(Box::new(self))
    }
}

/// A variable valuation returned with a satisfiable check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    values: HashMap<IntVar, i64>,
    objective: Option<i64>,
}

impl Model {
    /// Creates an empty valuation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a variable.
    pub fn set(&mut self, var: IntVar, value: i64) {
        self.values.insert(var, value);
    }

    /// Records the objective value reached by this valuation.
    pub fn with_objective(mut self, objective: Option<i64>) -> Self {
        self.objective = objective;
        self
    }

    /// Value of a variable, if bound.
    pub fn value(&self, var: IntVar) -> Option<i64> {
        self.values.get(&var).copied()
    }

    /// Objective value, if the session had an objective.
    pub fn objective_value(&self) -> Option<i64> {
        self.objective
    }

    /// Number of bound variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no variable is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(IntVar, i64)> for Model {
    fn from_iter<I: IntoIterator<Item = (IntVar, i64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
            objective: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: usize) -> IntVar {
        IntVar::from_index(i)
    }

    #[test]
    fn test_eval_relations() {
        let model: Model = [(v(0), 2), (v(1), 5)].into_iter().collect();
        assert_eq!(IntExpr::var(v(0)).gt(v(1)).eval(&model), Some(false));
        assert_eq!(IntExpr::var(v(1)).gt(v(0)).eval(&model), Some(true));
        assert_eq!(IntExpr::var(v(0)).le(2i64).eval(&model), Some(true));
        assert_eq!(IntExpr::var(v(0)).equals(3i64).eval(&model), Some(false));
    }

    #[test]
    fn test_eval_conditional_sum() {
        let model: Model = [(v(0), 1), (v(1), 0)].into_iter().collect();
        let load = IntExpr::sum([
            IntExpr::ite(IntExpr::var(v(0)).equals(1i64), 6i64, 0i64),
            IntExpr::ite(IntExpr::var(v(1)).equals(1i64), 4i64, 0i64),
        ]);
        assert_eq!(load.eval(&model), Some(6));
        assert_eq!(IntExpr::sum([]).eval(&model), Some(0));
    }

    #[test]
    fn test_eval_max() {
        let model: Model = [(v(0), 4), (v(1), 9), (v(2), 1)].into_iter().collect();
        let max = IntExpr::max((0..3).map(|i| IntExpr::var(v(i))));
        assert_eq!(max.eval(&model), Some(9));
        assert_eq!(IntExpr::max([]).eval(&model), None);
        let mut vars = BTreeSet::new();
        max.collect_vars(&mut vars);
        assert_eq!(vars.len(), 3);
    }

    #[test]
    fn test_empty_connectives() {
        let model = Model::new();
        assert_eq!(BoolExpr::or([]).eval(&model), Some(false));
        assert_eq!(BoolExpr::and([]).eval(&model), Some(true));
        assert_eq!((!BoolExpr::constant(false)).eval(&model), Some(true));
    }

    #[test]
    fn test_at_most() {
        let model: Model = [(v(0), 1), (v(1), 1), (v(2), 0)].into_iter().collect();
        let clauses = || (0..3).map(|i| IntExpr::var(v(i)).equals(1i64));
        assert_eq!(BoolExpr::at_most(2, clauses()).eval(&model), Some(true));
        assert_eq!(BoolExpr::at_most(1, clauses()).eval(&model), Some(false));
    }

    #[test]
    fn test_unbound_variable() {
        let model = Model::new();
        assert_eq!(IntExpr::var(v(0)).equals(0i64).eval(&model), None);
    }

    #[test]
    fn test_collect_vars() {
        let expr = BoolExpr::or([
            IntExpr::var(v(3)).equals(0i64),
            IntExpr::var(v(1)).gt(v(3)),
        ]);
        let vars: Vec<_> = expr.vars().into_iter().map(|v| v.index()).collect();
        assert_eq!(vars, vec![1, 3]);
    }
}
