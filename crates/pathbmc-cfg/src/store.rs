//! Symbolic stores: symbol → SSA incarnation, one store per cut point.

use pathbmc_expr::{Expr, ExprPool};
use pathbmc_smt::Model;

/// Evaluator mapping symbolic names to their renamed incarnations at a
/// program point.
///
/// `eval` substitutes through operators but does not descend into the name of
/// a tuple constant; callers that need to resolve an edge predicate rebuild
/// it from the evaluated endpoints.
#[derive(Debug, Clone)]
pub struct SymStore {
    bindings: Model,
}

impl SymStore {
    pub fn new(pool: ExprPool) -> Self {
        Self {
            bindings: Model::new(pool),
        }
    }

    pub fn define(&mut self, sym: Expr, incarnation: Expr) {
        self.bindings.bind(sym, incarnation);
    }

    pub fn is_defined(&self, e: &Expr) -> bool {
        self.bindings.get(e).is_some()
    }

    /// Resolve `e`; returns `e` itself when nothing in it is defined here.
    pub fn eval(&self, e: &Expr) -> Expr {
        self.bindings.eval(e)
    }
}
