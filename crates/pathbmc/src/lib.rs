//! Path-based bounded model checking.
//!
//! The engine decides whether any finite execution of a control-flow graph
//! can reach a designated error state, by counterexample-guided enumeration
//! of candidate paths:
//!
//! 1. the precise verification condition is abstracted to its boolean
//!    skeleton over block-reachability predicates and asserted into a
//!    primary solver context;
//! 2. each model of the abstraction names a candidate path, refined first
//!    (optionally) by an abstract interpreter and then by a precise SMT
//!    check in an auxiliary context;
//! 3. an infeasible path yields a minimal unsat core, projected back onto
//!    control predicates and asserted as a blocking clause, so the same
//!    path is never enumerated twice.
//!
//! A satisfiable refinement is a real counterexample; an unsatisfiable
//! abstraction means the error state is unreachable within the bound.
//!
//! ```no_run
//! use pathbmc::{EngineConfig, PathBmcEngine, Verdict};
//! use pathbmc::cfg::{BlockVcGen, Cfg};
//! use pathbmc::expr::ExprPool;
//! use pathbmc::smt::StructuralSolver;
//! use std::sync::Arc;
//!
//! let pool = ExprPool::new();
//! let mut cfg = Cfg::new();
//! let _entry = cfg.add_block("entry");
//! let cfg = Arc::new(cfg);
//! let vcgen = BlockVcGen::new(pool.clone(), cfg.clone());
//! let mut engine = PathBmcEngine::new(
//!     pool.clone(),
//!     cfg,
//!     vcgen,
//!     Box::new(StructuralSolver::new(pool.clone())),
//!     Box::new(StructuralSolver::new(pool)),
//!     EngineConfig::default(),
//! );
//! assert_eq!(engine.solve().unwrap(), Verdict::Sat);
//! ```

pub use pathbmc_ai as ai;
pub use pathbmc_cfg as cfg;
pub use pathbmc_expr as expr;
pub use pathbmc_smt as smt;

mod config;
mod engine;
mod error;
mod refine_ai;
mod refine_smt;
mod stats;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use engine::{PathBmcEngine, Verdict};
pub use error::EngineError;
pub use stats::EngineStats;
