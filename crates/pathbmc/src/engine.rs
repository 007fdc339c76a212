//! The enumeration loop.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::refine_ai::{self, AiOutcome};
use crate::refine_smt::{self, Refinement};
use crate::stats::EngineStats;
use hashbrown::{HashMap, HashSet};
use pathbmc_ai::PathAnalyzer;
use pathbmc_cfg::{BlockId, Cfg, Trace, VcGen};
use pathbmc_expr::{abstract_side, Expr, ExprPool};
use pathbmc_smt::{Model, SmtContext, SolveResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tri-valued engine verdict.
///
/// `Sat` means a real counterexample was found; `Unsat` that no bounded
/// execution reaches the error state; `Unknown` that a backend gave up or
/// refinement stopped making progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Sat,
    Unsat,
    Unknown,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Sat => write!(f, "sat"),
            Verdict::Unsat => write!(f, "unsat"),
            Verdict::Unknown => write!(f, "unknown"),
        }
    }
}

/// Optional per-block formulas a caller may provide to strengthen blocking.
///
/// Treated strictly as hints; the engine never asserts them as truths.
pub(crate) type InvariantHints = HashMap<BlockId, Vec<Expr>>;

/// The path-based bounded model checking engine.
///
/// Owns a primary solver context (boolean abstraction plus blocking clauses,
/// never reset after initialization) and an auxiliary context (reset at the
/// start of every refinement).
pub struct PathBmcEngine<V: VcGen> {
    pool: ExprPool,
    cfg: Arc<Cfg>,
    vcgen: V,
    solver: Box<dyn SmtContext>,
    aux: Box<dyn SmtContext>,
    analyzer: Option<Box<dyn PathAnalyzer>>,
    config: EngineConfig,
    stats: EngineStats,
    side: Vec<Expr>,
    blocking: HashSet<Expr>,
    model: Option<Model>,
    result: Option<Verdict>,
}

impl<V: VcGen> PathBmcEngine<V> {
    pub fn new(
        pool: ExprPool,
        cfg: Arc<Cfg>,
        vcgen: V,
        solver: Box<dyn SmtContext>,
        aux: Box<dyn SmtContext>,
        config: EngineConfig,
    ) -> Self {
        Self {
            pool,
            cfg,
            vcgen,
            solver,
            aux,
            analyzer: None,
            config,
            stats: EngineStats::default(),
            side: Vec::new(),
            blocking: HashSet::new(),
            model: None,
            result: None,
        }
    }

    /// Attach an abstract-interpretation backend (used when the
    /// configuration enables `path_ai`).
    pub fn with_analyzer(mut self, analyzer: Box<dyn PathAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Path-based engines encode lazily inside [`solve`](Self::solve).
    pub fn encode(&mut self) {}

    /// Run the enumeration loop.
    pub fn solve(&mut self) -> Result<Verdict, EngineError> {
        info!("starting path-based bounded model checking");

        self.side = self.vcgen.encode();
        debug!(clauses = self.side.len(), "precise encoding ready");
        let abs_side = abstract_side(&self.pool, &self.side)?;
        self.solver.reset();
        for clause in &abs_side {
            debug!(clause = %clause, "asserting abstraction clause");
            self.solver.assert_expr(clause);
        }
        self.aux.reset();
        self.blocking.clear();
        self.stats = EngineStats::default();
        self.model = None;
        self.result = None;

        let hints = InvariantHints::new();
        let mut iters: u64 = 0;
        loop {
            match self.solver.solve() {
                SolveResult::Unsat => {
                    if iters == 0 {
                        info!("trivially unsat: the initial boolean abstraction was enough");
                    }
                    return Ok(self.finish(Verdict::Unsat));
                }
                SolveResult::Unknown => return Ok(self.finish(Verdict::Unknown)),
                SolveResult::Sat => {}
            }
            iters += 1;
            self.stats.paths = iters;
            debug!(iteration = iters, "symbolic path enumerated");

            let Some(model) = self.solver.model() else {
                warn!("primary context answered sat without a model");
                return Ok(self.finish(Verdict::Unknown));
            };

            if self.config.path_ai {
                if let Some(analyzer) = self.analyzer.as_mut() {
                    let trace = Trace::reconstruct(&self.cfg, &self.vcgen, &model);
                    let outcome = refine_ai::refine(
                        &self.pool,
                        &self.cfg,
                        &self.vcgen,
                        analyzer.as_mut(),
                        &self.config.analysis,
                        trace.blocks(),
                    );
                    if let AiOutcome::Refuted(active) = outcome {
                        self.stats.paths_refuted_by_ai += 1;
                        if !self.add_blocking_clause(&active) {
                            return Ok(self.finish(Verdict::Unknown));
                        }
                        continue;
                    }
                }
            }

            match refine_smt::refine(
                &self.vcgen,
                self.aux.as_mut(),
                self.config.muc,
                &self.side,
                &model,
                &hints,
                &mut self.stats,
            ) {
                Refinement::Sat(precise) => {
                    info!(iterations = iters, "counterexample found");
                    self.model = Some(precise);
                    return Ok(self.finish(Verdict::Sat));
                }
                Refinement::Unknown => return Ok(self.finish(Verdict::Unknown)),
                Refinement::Unsat(active) => {
                    self.stats.paths_refuted_by_smt += 1;
                    if !self.add_blocking_clause(&active) {
                        return Ok(self.finish(Verdict::Unknown));
                    }
                }
            }
        }
    }

    /// Counterexample trace; requires a previous satisfiable `solve()`.
    pub fn trace(&self) -> Result<Trace, EngineError> {
        match (&self.result, &self.model) {
            (Some(Verdict::Sat), Some(model)) => {
                Ok(Trace::reconstruct(&self.cfg, &self.vcgen, model))
            }
            _ => Err(EngineError::NoCounterexample),
        }
    }

    /// Debug only: the blocking clauses accumulated by the last run.
    ///
    /// There is no canonical unsat core for a path-based engine; the
    /// blocking set is the persistent artifact of the refutation.
    pub fn unsat_core(&self) -> Vec<Expr> {
        let mut out: Vec<Expr> = self.blocking.iter().cloned().collect();
        out.sort();
        out
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn precise_model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    fn finish(&mut self, verdict: Verdict) -> Verdict {
        info!(%verdict, stats = %self.stats, "path-based bmc finished");
        self.result = Some(verdict);
        verdict
    }

    /// Negate the active conjunction and assert it into the primary context.
    ///
    /// Returns false when the clause was already present: refinement failed
    /// to eliminate the current model and the loop must stop.
    fn add_blocking_clause(&mut self, active: &[Expr]) -> bool {
        let bc = if active.is_empty() {
            warn!("no active boolean literals, path is trivially infeasible");
            self.pool.bool_false()
        } else {
            self.pool.not(self.pool.and_all(active))
        };
        debug!(clause = %bc, "adding blocking clause");
        self.solver.assert_expr(&bc);
        let inserted = self.blocking.insert(bc);
        self.stats.blocking_clauses = self.blocking.len() as u64;
        if !inserted {
            warn!("same blocking clause again: refinement made no progress");
        }
        inserted
    }
}

/// Canonical order for an active set: plain predicates first, edge tuples
/// last, both by expression identity; duplicates removed.
pub(crate) fn canonical_active_set(mut lits: Vec<Expr>) -> Vec<Expr> {
    lits.sort_by(|a, b| {
        (a.is_tuple_sym(), a).cmp(&(b.is_tuple_sym(), b))
    });
    lits.dedup();
    lits
}
