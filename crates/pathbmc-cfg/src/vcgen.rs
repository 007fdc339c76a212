//! The verification-condition generator interface and a block-level
//! reference implementation.

use crate::graph::{BlockId, Cfg};
use crate::store::SymStore;
use hashbrown::HashMap;
use pathbmc_expr::{Expr, ExprKind, ExprPool};
use pathbmc_smt::Model;
use std::sync::Arc;
use tracing::debug;

/// Producer of the precise encoding the engine refines against.
///
/// `encode` yields the ordered clause sequence (semantics: conjunction).
/// `block_predicate` names a block's reachability; stores and cut points are
/// aligned sequences used to resolve predicates into their incarnations.
pub trait VcGen {
    fn encode(&mut self) -> Vec<Expr>;

    fn block_predicate(&self, bb: BlockId) -> Expr;

    fn cut_points(&self) -> &[BlockId];

    fn stores(&self) -> &[SymStore];

    /// Path implicant of `side` under `model`, with the literal → control
    /// predicate map for the clauses a block gated.
    fn model_implicant(&self, side: &[Expr], model: &Model) -> (Vec<Expr>, HashMap<Expr, Expr>) {
        model_implicant(side, model)
    }
}

/// Default implicant extraction.
///
/// Picks, clause by clause, the parts forced by the model: a true guard
/// selects the consequent (each conjunct mapped to the guard), a false guard
/// selects its negation, bare literals select themselves. Clauses with no
/// recognizable boolean skeleton are passed through whole and unmapped,
/// which is always sound.
pub fn model_implicant(side: &[Expr], model: &Model) -> (Vec<Expr>, HashMap<Expr, Expr>) {
    let mut implicant = Vec::with_capacity(side.len());
    let mut map = HashMap::new();
    for clause in side {
        pick(clause, model, &mut implicant, &mut map);
    }
    (implicant, map)
}

fn push_lit(lit: &Expr, out: &mut Vec<Expr>, map: &mut HashMap<Expr, Expr>) {
    out.push(lit.clone());
    map.insert(lit.clone(), lit.clone());
}

fn push_gated(e: &Expr, guard: Option<&Expr>, out: &mut Vec<Expr>, map: &mut HashMap<Expr, Expr>) {
    out.push(e.clone());
    if let Some(g) = guard {
        map.insert(e.clone(), g.clone());
    }
}

fn pick(clause: &Expr, model: &Model, out: &mut Vec<Expr>, map: &mut HashMap<Expr, Expr>) {
    if clause.is_bool_lit() {
        push_lit(clause, out, map);
        return;
    }
    match clause.kind() {
        ExprKind::Implies => {
            let guard = &clause.children()[0];
            let body = &clause.children()[1];
            if !guard.is_bool_lit() {
                push_gated(clause, None, out, map);
            } else if model.is_true(guard) {
                descend(body, Some(guard), model, out, map);
            } else {
                push_lit(&model.pool().not(guard.clone()), out, map);
            }
        }
        ExprKind::Or => {
            // `or(¬g, body)` is an implication in disguise
            if let Some((guard, body)) = implication_shape(clause) {
                if model.is_true(&guard) {
                    descend(body, Some(&guard), model, out, map);
                } else {
                    push_lit(&model.pool().not(guard), out, map);
                }
                return;
            }
            match clause
                .children()
                .iter()
                .find(|c| c.is_bool_lit() && model.is_true(c))
            {
                Some(lit) => push_lit(lit, out, map),
                None => push_gated(clause, None, out, map),
            }
        }
        ExprKind::And => {
            for c in clause.children() {
                pick(c, model, out, map);
            }
        }
        _ => push_gated(clause, None, out, map),
    }
}

/// `or(not(g), body)` with a literal guard.
fn implication_shape(clause: &Expr) -> Option<(Expr, &Expr)> {
    if clause.children().len() != 2 {
        return None;
    }
    let (a, b) = (&clause.children()[0], &clause.children()[1]);
    if let Some(g) = a.as_not() {
        if g.is_pos_bool_lit() {
            return Some((g.clone(), b));
        }
    }
    if let Some(g) = b.as_not() {
        if g.is_pos_bool_lit() {
            return Some((g.clone(), a));
        }
    }
    None
}

fn descend(
    body: &Expr,
    guard: Option<&Expr>,
    model: &Model,
    out: &mut Vec<Expr>,
    map: &mut HashMap<Expr, Expr>,
) {
    if body.is_bool_lit() {
        push_lit(body, out, map);
        return;
    }
    match body.kind() {
        ExprKind::And => {
            for c in body.children() {
                descend(c, guard, model, out, map);
            }
        }
        ExprKind::Or => {
            match body
                .children()
                .iter()
                .find(|c| c.is_bool_lit() && model.is_true(c))
            {
                Some(lit) => push_lit(lit, out, map),
                None => push_gated(body, guard, out, map),
            }
        }
        _ => push_gated(body, guard, out, map),
    }
}

/// Block-level VC generator over a [`Cfg`].
///
/// One control predicate per block plus an SSA incarnation of it; a single
/// cut point at the entry whose store maps each base predicate to its
/// incarnation. Callers attach per-block theory constraints (already over
/// incarnation-level symbols) with [`BlockVcGen::add_constraint`].
pub struct BlockVcGen {
    pool: ExprPool,
    cfg: Arc<Cfg>,
    base: Vec<Expr>,
    inst: Vec<Expr>,
    stores: Vec<SymStore>,
    cps: Vec<BlockId>,
    constraints: HashMap<BlockId, Vec<Expr>>,
    required: Vec<BlockId>,
}

impl BlockVcGen {
    pub fn new(pool: ExprPool, cfg: Arc<Cfg>) -> Self {
        let mut base = Vec::with_capacity(cfg.block_count());
        let mut inst = Vec::with_capacity(cfg.block_count());
        let mut store = SymStore::new(pool.clone());
        for b in cfg.blocks() {
            let bp = pool.bool_sym(format!("bp_{}", b.name));
            let bp0 = pool.bool_sym(format!("bp_{}!0", b.name));
            store.define(bp.clone(), bp0.clone());
            base.push(bp);
            inst.push(bp0);
        }
        let cps = vec![cfg.entry()];
        Self {
            pool,
            cfg,
            base,
            inst,
            stores: vec![store],
            cps,
            constraints: HashMap::new(),
            required: Vec::new(),
        }
    }

    /// Attach a theory constraint to a block (over incarnation symbols).
    pub fn add_constraint(&mut self, bb: BlockId, e: Expr) {
        self.constraints.entry(bb).or_default().push(e);
    }

    /// Require that a block executes (typically the error block).
    pub fn require_block(&mut self, bb: BlockId) {
        self.required.push(bb);
    }

    /// The incarnation of a block predicate, as it appears in the encoding.
    pub fn instance_predicate(&self, bb: BlockId) -> Expr {
        self.inst[bb.0].clone()
    }

    /// The incarnation-level edge predicate for a critical edge.
    pub fn instance_edge_tuple(&self, src: BlockId, dst: BlockId) -> Expr {
        self.pool
            .tuple_sym(self.inst[src.0].clone(), self.inst[dst.0].clone())
    }
}

impl VcGen for BlockVcGen {
    fn encode(&mut self) -> Vec<Expr> {
        let cfg = self.cfg.clone();
        let mut side = Vec::new();
        // the entry executes, and so does every required block
        side.push(self.inst[cfg.entry().0].clone());
        for bb in &self.required {
            side.push(self.inst[bb.0].clone());
        }
        for b in cfg.blocks() {
            let id = b.id;
            if id != cfg.entry() {
                // a reached block was entered through one of its edges
                let preds = cfg.predecessors(id);
                if preds.is_empty() {
                    side.push(self.pool.not(self.inst[id.0].clone()));
                    continue;
                }
                let choices: Vec<Expr> = preds
                    .iter()
                    .map(|p| {
                        if cfg.is_critical_edge(*p, id) {
                            self.instance_edge_tuple(*p, id)
                        } else {
                            self.pool
                                .and(self.inst[p.0].clone(), self.inst[id.0].clone())
                        }
                    })
                    .collect();
                side.push(
                    self.pool
                        .implies(self.inst[id.0].clone(), self.pool.or_all(&choices)),
                );
            }
            // a taken critical edge implies both endpoints
            for s in cfg.successors(id) {
                if cfg.is_critical_edge(id, *s) {
                    let tuple = self.instance_edge_tuple(id, *s);
                    side.push(self.pool.implies(
                        tuple,
                        self.pool
                            .and(self.inst[id.0].clone(), self.inst[s.0].clone()),
                    ));
                }
            }
        }
        for b in cfg.blocks() {
            if let Some(cs) = self.constraints.get(&b.id) {
                for c in cs {
                    side.push(self.pool.implies(self.inst[b.id.0].clone(), c.clone()));
                }
            }
        }
        debug!(clauses = side.len(), "encoded verification condition");
        side
    }

    fn block_predicate(&self, bb: BlockId) -> Expr {
        self.base[bb.0].clone()
    }

    fn cut_points(&self) -> &[BlockId] {
        &self.cps
    }

    fn stores(&self) -> &[SymStore] {
        &self.stores
    }
}
