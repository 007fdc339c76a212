//! Run statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters accumulated over one `solve()` run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineStats {
    /// Symbolic paths enumerated.
    pub paths: u64,
    /// Paths discharged by the abstract-interpretation refiner.
    pub paths_refuted_by_ai: u64,
    /// Paths discharged by the SMT refiner.
    pub paths_refuted_by_smt: u64,
    /// Solver calls spent in core extraction.
    pub muc_solver_calls: u64,
    /// Blocking clauses currently asserted.
    pub blocking_clauses: u64,
}

impl fmt::Display for EngineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} paths ({} refuted by AI, {} by SMT), {} blocking clauses, {} MUC solver calls",
            self.paths,
            self.paths_refuted_by_ai,
            self.paths_refuted_by_smt,
            self.blocking_clauses,
            self.muc_solver_calls
        )
    }
}
