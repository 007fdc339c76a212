//! The solver-facing contract: tri-valued results, models, contexts.

use hashbrown::HashMap;
use pathbmc_expr::{Expr, ExprKind, ExprPool, Sort};
use std::fmt;

/// Tri-valued outcome of a solver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveResult {
    Sat,
    Unsat,
    Unknown,
}

impl fmt::Display for SolveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveResult::Sat => write!(f, "sat"),
            SolveResult::Unsat => write!(f, "unsat"),
            SolveResult::Unknown => write!(f, "unknown"),
        }
    }
}

/// A satisfying assignment: bindings from constants to value expressions.
///
/// Evaluation is partial: subterms with no binding are left intact, so
/// `eval` doubles as a substitution.
#[derive(Debug, Clone)]
pub struct Model {
    pool: ExprPool,
    bindings: HashMap<Expr, Expr>,
}

impl Model {
    pub fn new(pool: ExprPool) -> Self {
        Self {
            pool,
            bindings: HashMap::new(),
        }
    }

    pub fn bind(&mut self, sym: Expr, value: Expr) {
        self.bindings.insert(sym, value);
    }

    pub fn get(&self, e: &Expr) -> Option<&Expr> {
        self.bindings.get(e)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Expr, &Expr)> {
        self.bindings.iter()
    }

    /// Evaluate under the bindings, folding ground subterms.
    ///
    /// Tuple constants are atoms: they are looked up but never descended into.
    pub fn eval(&self, e: &Expr) -> Expr {
        if let Some(v) = self.bindings.get(e) {
            return v.clone();
        }
        if e.children().is_empty() || e.is_tuple_sym() {
            return e.clone();
        }
        let children: Vec<Expr> = e.children().iter().map(|c| self.eval(c)).collect();
        self.apply(e, children)
    }

    pub fn is_true(&self, e: &Expr) -> bool {
        self.eval(e).is_true()
    }

    fn apply(&self, e: &Expr, cs: Vec<Expr>) -> Expr {
        let p = &self.pool;
        match e.kind() {
            ExprKind::Not => p.not(cs[0].clone()),
            ExprKind::And => p.and(cs[0].clone(), cs[1].clone()),
            ExprKind::Or => p.or(cs[0].clone(), cs[1].clone()),
            ExprKind::Implies => {
                if cs[0].is_false() || cs[1].is_true() {
                    p.bool_true()
                } else if cs[0].is_true() {
                    cs[1].clone()
                } else if cs[1].is_false() {
                    p.not(cs[0].clone())
                } else {
                    p.implies(cs[0].clone(), cs[1].clone())
                }
            }
            ExprKind::Iff => match (bool_value(&cs[0]), bool_value(&cs[1])) {
                (Some(a), Some(b)) => p.bool_const(a == b),
                _ => p.iff(cs[0].clone(), cs[1].clone()),
            },
            ExprKind::Ite => {
                if cs[0].is_true() {
                    cs[1].clone()
                } else if cs[0].is_false() {
                    cs[2].clone()
                } else {
                    p.ite(cs[0].clone(), cs[1].clone(), cs[2].clone())
                }
            }
            ExprKind::Eq => match ground_cmp(&cs[0], &cs[1]) {
                Some(ord) => p.bool_const(ord == std::cmp::Ordering::Equal),
                None if cs[0] == cs[1] => p.bool_true(),
                None => p.eq(cs[0].clone(), cs[1].clone()),
            },
            ExprKind::Ne => match ground_cmp(&cs[0], &cs[1]) {
                Some(ord) => p.bool_const(ord != std::cmp::Ordering::Equal),
                None if cs[0] == cs[1] => p.bool_false(),
                None => p.ne(cs[0].clone(), cs[1].clone()),
            },
            ExprKind::Lt => fold_cmp(p, &cs, |o| o == std::cmp::Ordering::Less, ExprPool::lt),
            ExprKind::Le => fold_cmp(p, &cs, |o| o != std::cmp::Ordering::Greater, ExprPool::le),
            ExprKind::Gt => fold_cmp(p, &cs, |o| o == std::cmp::Ordering::Greater, ExprPool::gt),
            ExprKind::Ge => fold_cmp(p, &cs, |o| o != std::cmp::Ordering::Less, ExprPool::ge),
            ExprKind::Add => fold_arith(p, &cs, i64::wrapping_add, ExprPool::add),
            ExprKind::Sub => fold_arith(p, &cs, i64::wrapping_sub, ExprPool::sub),
            ExprKind::Mul => fold_arith(p, &cs, i64::wrapping_mul, ExprPool::mul),
            ExprKind::Xor => p.xor(cs[0].clone(), cs[1].clone()),
            ExprKind::Select => p.select(cs[0].clone(), cs[1].clone()),
            ExprKind::Store => p.store(cs[0].clone(), cs[1].clone(), cs[2].clone()),
            // leaves were handled in eval
            _ => e.clone(),
        }
    }

    pub fn pool(&self) -> &ExprPool {
        &self.pool
    }
}

fn bool_value(e: &Expr) -> Option<bool> {
    if e.is_true() {
        Some(true)
    } else if e.is_false() {
        Some(false)
    } else {
        None
    }
}

fn int_value(e: &Expr) -> Option<i64> {
    match e.kind() {
        ExprKind::Int(v) => Some(*v),
        _ => None,
    }
}

fn ground_cmp(a: &Expr, b: &Expr) -> Option<std::cmp::Ordering> {
    match (a.kind(), b.kind()) {
        (ExprKind::Int(x), ExprKind::Int(y)) => Some(x.cmp(y)),
        (ExprKind::True, ExprKind::True) | (ExprKind::False, ExprKind::False) => {
            Some(std::cmp::Ordering::Equal)
        }
        (ExprKind::True, ExprKind::False) => Some(std::cmp::Ordering::Greater),
        (ExprKind::False, ExprKind::True) => Some(std::cmp::Ordering::Less),
        _ => None,
    }
}

fn fold_cmp(
    p: &ExprPool,
    cs: &[Expr],
    pred: impl Fn(std::cmp::Ordering) -> bool,
    rebuild: impl Fn(&ExprPool, Expr, Expr) -> Expr,
) -> Expr {
    match ground_cmp(&cs[0], &cs[1]) {
        Some(ord) => p.bool_const(pred(ord)),
        None => rebuild(p, cs[0].clone(), cs[1].clone()),
    }
}

fn fold_arith(
    p: &ExprPool,
    cs: &[Expr],
    op: impl Fn(i64, i64) -> i64,
    rebuild: impl Fn(&ExprPool, Expr, Expr) -> Expr,
) -> Expr {
    match (int_value(&cs[0]), int_value(&cs[1])) {
        (Some(x), Some(y)) => p.int(op(x, y)),
        _ => rebuild(p, cs[0].clone(), cs[1].clone()),
    }
}

/// A solver context as the engine sees it.
///
/// Contexts are stateful: assertions accumulate until `reset`. The engine
/// owns two of them, a primary context holding the boolean abstraction plus
/// the growing blocking set, and an auxiliary context that is reset at the
/// start of every refinement.
pub trait SmtContext {
    fn reset(&mut self);

    fn assert_expr(&mut self, e: &Expr);

    fn solve(&mut self) -> SolveResult;

    /// The model of the last `Sat` answer, if any.
    fn model(&self) -> Option<Model>;

    /// Native unsat core of `f` (minimality not required of the backend).
    ///
    /// `None` means the facility is unavailable or was inconclusive.
    fn unsat_core(&mut self, f: &[Expr]) -> Option<Vec<Expr>> {
        let _ = f;
        None
    }
}

/// Helper used by solver implementations to detect boolean sort.
pub(crate) fn is_bool_sorted(e: &Expr) -> bool {
    *e.sort() == Sort::Bool
}
