//! Makespan objective.

use crate::cp::{IntExpr, IntVar};

/// The largest of the given term-index variables.
///
/// A single n-ary maximum, so the expression grows linearly with the
/// catalog. Engines lower it to `m = if x > m then x else m` over shared
/// terms when they lack a native maximum. `None` when there are no
/// variables.
pub fn makespan(vars: &[IntVar]) -> Option<IntExpr> {
    match vars {
        [] => None,
        [only] => Some(IntExpr::var(*only)),
        _ => Some(IntExpr::max(vars.iter().map(|&v| IntExpr::var(v)))),
    }
}
