//! SMT-based path refinement.
//!
//! Builds the implicant of the precise encoding under the abstract model,
//! checks it in the auxiliary context, and on unsatisfiability projects a
//! minimal core back onto control predicates.

use crate::engine::{canonical_active_set, InvariantHints};
use crate::stats::EngineStats;
use pathbmc_cfg::VcGen;
use pathbmc_expr::Expr;
use pathbmc_smt::{Model, MucExtractor, MucMethod, SmtContext, SolveResult};
use tracing::{debug, warn};

pub(crate) enum Refinement {
    /// The path is real: a precise model exists.
    Sat(Model),
    /// The path is infeasible; these control literals witness it.
    Unsat(Vec<Expr>),
    Unknown,
}

pub(crate) fn refine<V: VcGen>(
    vcgen: &V,
    aux: &mut dyn SmtContext,
    muc_method: MucMethod,
    side: &[Expr],
    model: &Model,
    // constraints inferred for the current path; hints only, currently unused
    _path_hints: &InvariantHints,
    stats: &mut EngineStats,
) -> Refinement {
    let (mut path_formula, lit_map) = vcgen.model_implicant(side, model);
    // remove redundant literals
    path_formula.sort();
    path_formula.dedup();
    debug!(clauses = path_formula.len(), "path formula extracted");

    aux.reset();
    for clause in &path_formula {
        aux.assert_expr(clause);
    }
    match aux.solve() {
        SolveResult::Sat => match aux.model() {
            Some(precise) => Refinement::Sat(precise),
            None => {
                warn!("auxiliary context answered sat without a model");
                Refinement::Unknown
            }
        },
        SolveResult::Unknown => Refinement::Unknown,
        SolveResult::Unsat => {
            let mut muc = MucExtractor::new(aux, muc_method);
            let core = muc.run(&path_formula);
            stats.muc_solver_calls += muc.num_solver_calls() as u64;
            let Some(core) = core else {
                return Refinement::Unknown;
            };
            debug!(core = core.len(), "unsat core of the path formula");
            // an implicant clause with no active boolean is possible (e.g.
            // a single-block program); it simply contributes nothing
            let active: Vec<Expr> = core
                .iter()
                .filter_map(|clause| lit_map.get(clause).cloned())
                .collect();
            Refinement::Unsat(canonical_active_set(active))
        }
    }
}
