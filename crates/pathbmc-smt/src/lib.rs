//! SMT layer of the pathbmc engine.
//!
//! The engine only ever talks to a solver through the [`SmtContext`] trait:
//! assert expressions, solve, read a model back, and (optionally) ask the
//! backend for an unsat core of a clause list. [`StructuralSolver`] is the
//! built-in reference backend; it decides the propositional + linear-integer
//! fragment the engine's own tests live in and reports `Unknown` outside it.
//!
//! Minimal unsat cores are computed by [`MucExtractor`], which implements the
//! three interchangeable strategies selected by [`MucMethod`].

mod context;
mod muc;
mod structural;

pub use context::{Model, SmtContext, SolveResult};
pub use muc::{MucExtractor, MucMethod};
pub use structural::StructuralSolver;
