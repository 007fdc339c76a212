//! Negation normal form and boolean abstraction.
//!
//! The abstraction keeps only boolean literals, `and`/`or`/`not` structure and
//! equalities between boolean literals; every other subformula becomes `true`.
//! Since the boolean constants of a verification condition name block and edge
//! reachability, the satisfying assignments of the abstraction are exactly the
//! candidate control-flow paths.

use crate::expr::{Expr, ExprKind, ExprPool, Sort};
use hashbrown::HashMap;
use thiserror::Error;

/// Errors raised by the expression rewrites.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("xor is not supported in verification conditions")]
    UnsupportedXor,
}

/// Eliminate `=>`, boolean `ite` and `iff` bottom-up over the DAG.
///
/// `xor` has no rewrite here and is rejected.
pub fn pre_nnf(pool: &ExprPool, e: &Expr) -> Result<Expr, ExprError> {
    let mut memo = HashMap::new();
    pre_nnf_rec(pool, e, &mut memo)
}

fn pre_nnf_rec(
    pool: &ExprPool,
    e: &Expr,
    memo: &mut HashMap<u64, Expr>,
) -> Result<Expr, ExprError> {
    if let Some(done) = memo.get(&e.id()) {
        return Ok(done.clone());
    }
    let children = e
        .children()
        .iter()
        .map(|c| pre_nnf_rec(pool, c, memo))
        .collect::<Result<Vec<_>, _>>()?;
    let rebuilt = if children.is_empty() {
        e.clone()
    } else {
        pool.rebuild(e.kind(), children, e.sort())
    };
    let out = match rebuilt.kind() {
        ExprKind::Xor => return Err(ExprError::UnsupportedXor),
        ExprKind::Implies => {
            let a = rebuilt.children()[0].clone();
            let b = rebuilt.children()[1].clone();
            pool.or(pool.not(a), b)
        }
        ExprKind::Iff => {
            let a = rebuilt.children()[0].clone();
            let b = rebuilt.children()[1].clone();
            pool.and(
                pool.or(pool.not(a.clone()), b.clone()),
                pool.or(pool.not(b), a),
            )
        }
        ExprKind::Ite if *rebuilt.sort() == Sort::Bool => {
            let c = rebuilt.children()[0].clone();
            let t = rebuilt.children()[1].clone();
            let f = rebuilt.children()[2].clone();
            pool.or(
                pool.and(c.clone(), t),
                pool.and(pool.not(c), f),
            )
        }
        _ => rebuilt,
    };
    memo.insert(e.id(), out.clone());
    Ok(out)
}

/// Negation normal form: negations pushed down to boolean atoms.
pub fn nnf(pool: &ExprPool, e: &Expr) -> Result<Expr, ExprError> {
    let e = pre_nnf(pool, e)?;
    let mut memo = HashMap::new();
    Ok(push_neg(pool, &e, false, &mut memo))
}

fn push_neg(
    pool: &ExprPool,
    e: &Expr,
    negated: bool,
    memo: &mut HashMap<(u64, bool), Expr>,
) -> Expr {
    if let Some(done) = memo.get(&(e.id(), negated)) {
        return done.clone();
    }
    let out = match e.kind() {
        ExprKind::Not => push_neg(pool, &e.children()[0], !negated, memo),
        ExprKind::And | ExprKind::Or => {
            let flip = matches!(e.kind(), ExprKind::And) == negated;
            let children: Vec<_> = e
                .children()
                .iter()
                .map(|c| push_neg(pool, c, negated, memo))
                .collect();
            if flip {
                pool.or_all(&children)
            } else {
                pool.and_all(&children)
            }
        }
        ExprKind::True => pool.bool_const(!negated),
        ExprKind::False => pool.bool_const(negated),
        _ => {
            // atoms (boolean constants, theory formulas): negation stays here
            if negated {
                pool.not(e.clone())
            } else {
                e.clone()
            }
        }
    };
    memo.insert((e.id(), negated), out.clone());
    out
}

/// Boolean abstraction of a single formula: skeleton extraction.
///
/// The result is a sound over-approximation: every model of `e` induces a
/// model of the abstraction. Boolean literals are fixed points, so the
/// abstraction is idempotent.
pub fn bool_abstraction(pool: &ExprPool, e: &Expr) -> Result<Expr, ExprError> {
    let e = nnf(pool, e)?;
    let mut memo = HashMap::new();
    Ok(skeleton(pool, &e, &mut memo))
}

fn skeleton(pool: &ExprPool, e: &Expr, memo: &mut HashMap<u64, Expr>) -> Expr {
    if let Some(done) = memo.get(&e.id()) {
        return done.clone();
    }
    let out = if e.is_pos_bool_lit() {
        e.clone()
    } else {
        match e.kind() {
            ExprKind::Not => {
                if e.children()[0].is_pos_bool_lit() {
                    e.clone()
                } else {
                    pool.bool_true()
                }
            }
            ExprKind::And | ExprKind::Or => {
                let children: Vec<_> = e
                    .children()
                    .iter()
                    .map(|c| skeleton(pool, c, memo))
                    .collect();
                // fold through the simplifying constructors so abstracted-away
                // subformulas disappear instead of leaving `true` leaves behind
                if matches!(e.kind(), ExprKind::And) {
                    pool.and_all(&children)
                } else {
                    pool.or_all(&children)
                }
            }
            ExprKind::Eq
                if e.children()[0].is_bool_lit() && e.children()[1].is_bool_lit() =>
            {
                e.clone()
            }
            // everything else abstracted to true
            _ => pool.bool_true(),
        }
    };
    memo.insert(e.id(), out.clone());
    out
}

/// Abstract a clause sequence, dropping clauses that abstract to `true`.
///
/// Order of the surviving clauses is preserved.
pub fn abstract_side(pool: &ExprPool, side: &[Expr]) -> Result<Vec<Expr>, ExprError> {
    let mut out = Vec::with_capacity(side.len());
    for clause in side {
        let abs = bool_abstraction(pool, clause)?;
        if !abs.is_true() {
            out.push(abs);
        }
    }
    Ok(out)
}
