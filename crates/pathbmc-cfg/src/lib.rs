//! Control-flow model and verification-condition interface for pathbmc.
//!
//! The engine enumerates paths through a CFG whose reachability is named by
//! *control predicates*, one boolean constant per basic block; edges get a
//! predicate of their own, whose shape depends on whether the edge is
//! critical. This crate owns that vocabulary, the symbolic stores used to
//! resolve predicates into their SSA incarnations, the [`VcGen`] interface
//! the engine drives, and trace reconstruction from a model.

mod graph;
mod store;
mod trace;
mod vcgen;

pub use graph::{
    edge_predicate, ArithOp, BasicBlock, BlockId, Cfg, CmpPred, Constraint, Operand, PhiNode,
    Statement,
};
pub use store::SymStore;
pub use trace::Trace;
pub use vcgen::{model_implicant, BlockVcGen, VcGen};
