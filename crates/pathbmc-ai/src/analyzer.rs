//! Path analysis: prove a block sequence infeasible, or hand it back.

use crate::interval::Interval;
use crate::lattice::Lattice;
use hashbrown::HashMap;
use pathbmc_cfg::{ArithOp, BlockId, Cfg, Constraint, Operand, Statement};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Abstract domain selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Domain {
    #[default]
    Interval,
}

/// Parameters of a path analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisParams {
    pub domain: Domain,
}

/// Where a statement lives: inside a block, or on a CFG edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Block(BlockId),
    Edge(BlockId, BlockId),
}

/// A statement relevant to an infeasibility proof.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevantStmt {
    pub loc: Location,
    pub stmt: Statement,
}

/// Outcome of analyzing one path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathAnalysis {
    /// The abstraction cannot refute the path.
    Feasible,
    /// The forward abstract semantics of these statements is bottom.
    Infeasible(Vec<RelevantStmt>),
}

/// Analyzes the CFG slice restricted to a block sequence.
pub trait PathAnalyzer {
    fn path_analyze(&mut self, params: &AnalysisParams, blocks: &[BlockId]) -> PathAnalysis;
}

/// Interval-domain path analyzer.
///
/// Executes the path's statements forward (phi nodes lowered onto their
/// incoming edge); on bottom, greedily minimizes the statement list so the
/// reported set still implies bottom.
pub struct IntervalPathAnalyzer {
    cfg: Arc<Cfg>,
}

impl IntervalPathAnalyzer {
    pub fn new(cfg: Arc<Cfg>) -> Self {
        Self { cfg }
    }
}

impl PathAnalyzer for IntervalPathAnalyzer {
    fn path_analyze(&mut self, params: &AnalysisParams, blocks: &[BlockId]) -> PathAnalysis {
        debug_assert!(matches!(params.domain, Domain::Interval));
        let stmts = lower_path(&self.cfg, blocks);
        if !runs_to_bottom(&stmts) {
            return PathAnalysis::Feasible;
        }
        // delete-one minimization: drop statements whose removal keeps bottom
        let mut kept = stmts;
        let mut i = 0;
        while i < kept.len() {
            let mut trial = kept.clone();
            trial.remove(i);
            if runs_to_bottom(&trial) {
                kept = trial;
            } else {
                i += 1;
            }
        }
        debug!(relevant = kept.len(), "path refuted by interval analysis");
        PathAnalysis::Infeasible(kept)
    }
}

/// Statements of the path in execution order.
///
/// Branch assumptions are attached to their edge; each phi of the following
/// block becomes a copy owned by the incoming block.
fn lower_path(cfg: &Cfg, blocks: &[BlockId]) -> Vec<RelevantStmt> {
    let mut out = Vec::new();
    for (k, &b) in blocks.iter().enumerate() {
        for stmt in &cfg.block(b).stmts {
            out.push(RelevantStmt {
                loc: Location::Block(b),
                stmt: stmt.clone(),
            });
        }
        if let Some(&next) = blocks.get(k + 1) {
            for c in cfg.edge_assumes(b, next) {
                out.push(RelevantStmt {
                    loc: Location::Edge(b, next),
                    stmt: Statement::Assume(c.clone()),
                });
            }
            for phi in &cfg.block(next).phis {
                if let Some((_, value)) = phi.incomings.iter().find(|(src, _)| *src == b) {
                    out.push(RelevantStmt {
                        loc: Location::Block(b),
                        stmt: Statement::Assign {
                            dst: phi.dst.clone(),
                            src: value.clone(),
                        },
                    });
                }
            }
        }
    }
    out
}

/// Forward interval execution; true when the state reaches bottom.
fn runs_to_bottom(stmts: &[RelevantStmt]) -> bool {
    let mut env: HashMap<String, Interval> = HashMap::new();
    let read = |env: &HashMap<String, Interval>, op: &Operand| -> Interval {
        match op {
            Operand::Const(c) => Interval::constant(*c),
            Operand::Var(v) => env.get(v).copied().unwrap_or_else(Interval::top),
        }
    };
    for rs in stmts {
        match &rs.stmt {
            Statement::Assign { dst, src } | Statement::Cast { dst, src } => {
                let v = read(&env, src);
                env.insert(dst.clone(), v);
            }
            Statement::BinOp { dst, op, lhs, rhs } => {
                let a = read(&env, lhs);
                let b = read(&env, rhs);
                let v = match op {
                    ArithOp::Add => a.add(&b),
                    ArithOp::Sub => a.sub(&b),
                    ArithOp::Mul => a.mul(&b),
                };
                if v.is_bottom() {
                    return true;
                }
                env.insert(dst.clone(), v);
            }
            Statement::Select {
                dst,
                on_true,
                on_false,
                ..
            } => {
                // condition-insensitive: both arms possible
                let v = read(&env, on_true).join(&read(&env, on_false));
                env.insert(dst.clone(), v);
            }
            Statement::Assume(c) => {
                if !apply_assume(&mut env, c) {
                    return true;
                }
            }
            Statement::ArrayRead { dst, .. } | Statement::ArrayAssign { dst, .. } => {
                env.insert(dst.clone(), Interval::top());
            }
            // untracked effects
            Statement::BoolBinOp { .. }
            | Statement::BoolAssignConstraint { .. }
            | Statement::BoolAssume { .. }
            | Statement::ArrayWrite { .. }
            | Statement::ArrayAssume { .. }
            | Statement::Opaque { .. } => {}
        }
    }
    false
}

/// Refine the environment under a comparison; false when infeasible.
fn apply_assume(env: &mut HashMap<String, Interval>, c: &Constraint) -> bool {
    let value = |env: &HashMap<String, Interval>, op: &Operand| match op {
        Operand::Const(k) => Interval::constant(*k),
        Operand::Var(v) => env.get(v).copied().unwrap_or_else(Interval::top),
    };
    let lhs = value(env, &c.lhs);
    let rhs = value(env, &c.rhs);
    match Interval::refine_cmp(&lhs, c.pred, &rhs) {
        None => false,
        Some((l, r)) => {
            if let Operand::Var(v) = &c.lhs {
                env.insert(v.clone(), l);
            }
            if let Operand::Var(v) = &c.rhs {
                env.insert(v.clone(), r);
            }
            true
        }
    }
}
