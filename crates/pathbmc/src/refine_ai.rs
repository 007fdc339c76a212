//! Abstract-interpretation-based path refinement.
//!
//! Runs the path analyzer on the enumerated block sequence. When the
//! abstract semantics of the path is bottom, the relevant statements are
//! translated into control literals:
//!
//! - a statement inside a block charges the block's predicate;
//! - an assumption on a CFG edge charges the source block and the edge
//!   predicate (tuple form when the edge is critical);
//! - a phi-originated copy charges the incoming block and the incoming →
//!   join edge.
//!
//! The literals are then resolved in the symbolic stores. Every recovery
//! path degrades to `Feasible`, handing the query to the SMT refiner.

use crate::engine::canonical_active_set;
use pathbmc_ai::{AnalysisParams, Location, PathAnalysis, PathAnalyzer};
use pathbmc_cfg::{edge_predicate, BlockId, Cfg, Statement, VcGen};
use pathbmc_expr::{Expr, ExprPool};
use tracing::{debug, warn};

pub(crate) enum AiOutcome {
    /// The abstraction could not refute the path.
    Feasible,
    /// The path is infeasible; these (store-resolved) literals witness it.
    Refuted(Vec<Expr>),
}

pub(crate) fn refine<V: VcGen>(
    pool: &ExprPool,
    cfg: &Cfg,
    vcgen: &V,
    analyzer: &mut dyn PathAnalyzer,
    params: &AnalysisParams,
    blocks: &[BlockId],
) -> AiOutcome {
    let relevant = match analyzer.path_analyze(params, blocks) {
        PathAnalysis::Feasible => return AiOutcome::Feasible,
        PathAnalysis::Infeasible(relevant) => relevant,
    };
    debug!(
        path = blocks.len(),
        relevant = relevant.len(),
        "abstract interpretation refuted the path"
    );

    let mut raw: Vec<Expr> = Vec::new();
    for rs in &relevant {
        match &rs.stmt {
            Statement::BinOp { .. }
            | Statement::Cast { .. }
            | Statement::Select { .. }
            | Statement::BoolBinOp { .. }
            | Statement::BoolAssignConstraint { .. }
            | Statement::ArrayRead { .. }
            | Statement::ArrayWrite { .. }
            | Statement::ArrayAssume { .. }
            | Statement::ArrayAssign { .. } => {
                raw.push(vcgen.block_predicate(owning_block(&rs.loc)));
            }
            Statement::Assume(_) | Statement::BoolAssume { .. } => match rs.loc {
                Location::Edge(src, dst) => {
                    push_edge(pool, cfg, vcgen, src, dst, &mut raw);
                }
                Location::Block(bb) => raw.push(vcgen.block_predicate(bb)),
            },
            Statement::Assign { dst, .. } => {
                // a copy defined by a phi charges the incoming edge
                if let Some(join) = cfg.phi_parent(dst) {
                    let src = owning_block(&rs.loc);
                    push_edge(pool, cfg, vcgen, src, join, &mut raw);
                } else {
                    raw.push(vcgen.block_predicate(owning_block(&rs.loc)));
                }
            }
            Statement::Opaque { description } => {
                // pretend the query was satisfiable so the SMT refiner runs
                warn!(
                    statement = %description,
                    "cannot infer active literals for statement, deferring to the precise check"
                );
                return AiOutcome::Feasible;
            }
        }
    }
    let raw = canonical_active_set(raw);

    // resolve every literal in the store that defines it
    let stores = vcgen.stores();
    let mut active = Vec::with_capacity(raw.len());
    for lit in &raw {
        let mut resolved = None;
        for store in stores {
            let v = store.eval(lit);
            if v != *lit {
                resolved = Some(v);
                break;
            }
            if let Some((src, dst)) = lit.tuple_parts() {
                // eval does not descend into tuple names
                if store.is_defined(&src) && store.is_defined(&dst) {
                    resolved = Some(pool.tuple_sym(store.eval(&src), store.eval(&dst)));
                    break;
                }
            }
        }
        match resolved {
            Some(v) => active.push(v),
            None => {
                warn!(
                    literal = %lit,
                    "active literal is not defined in any store, deferring to the precise check"
                );
                return AiOutcome::Feasible;
            }
        }
    }
    AiOutcome::Refuted(canonical_active_set(active))
}

fn owning_block(loc: &Location) -> BlockId {
    match loc {
        Location::Block(b) => *b,
        Location::Edge(src, _) => *src,
    }
}

fn push_edge<V: VcGen>(
    pool: &ExprPool,
    cfg: &Cfg,
    vcgen: &V,
    src: BlockId,
    dst: BlockId,
    raw: &mut Vec<Expr>,
) {
    let s = vcgen.block_predicate(src);
    let d = vcgen.block_predicate(dst);
    let edge = edge_predicate(pool, &s, &d, cfg.is_critical_edge(src, dst));
    raw.push(s);
    raw.push(edge);
}
