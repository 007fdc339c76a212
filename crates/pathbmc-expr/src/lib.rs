//! Hash-consed expression kernel for the pathbmc verification engine.
//!
//! Expressions are immutable DAG nodes interned in an [`ExprPool`]; building
//! the same node twice yields the identical handle, so equality, hashing and
//! ordering are O(1) on interner ids. The engine never mutates an expression,
//! it substitutes by rebuilding.
//!
//! Besides the kernel itself, this crate implements the two rewrites the
//! path enumeration depends on:
//!
//! - [`nnf`]: negation normal form (with a pre-pass that eliminates `=>`,
//!   boolean `ite` and `iff`; `xor` is rejected as unsupported), and
//! - [`bool_abstraction`]: extraction of the propositional skeleton over
//!   boolean constants, abstracting every theory subformula to `true`.

mod expr;
mod nnf;

pub use expr::{Expr, ExprKind, ExprPool, Sort};
pub use nnf::{abstract_side, bool_abstraction, nnf, pre_nnf, ExprError};
