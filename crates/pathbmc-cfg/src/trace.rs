//! Counterexample traces reconstructed from a model.

use crate::graph::{BlockId, Cfg};
use crate::vcgen::VcGen;
use pathbmc_expr::Expr;
use pathbmc_smt::Model;

/// A block sequence witnessed by a model, starting at the CFG entry.
#[derive(Debug, Clone)]
pub struct Trace {
    blocks: Vec<BlockId>,
    model: Model,
}

impl Trace {
    /// Walk the CFG from the entry, at each step following the successor
    /// whose (store-resolved) control predicate is true in the model.
    pub fn reconstruct(cfg: &Cfg, vcgen: &dyn VcGen, model: &Model) -> Trace {
        let store = vcgen.stores().first();
        let mut blocks = vec![cfg.entry()];
        let mut cur = cfg.entry();
        // the block count bounds any loop-free path
        while blocks.len() <= cfg.block_count() {
            let next = cfg.successors(cur).iter().copied().find(|s| {
                let bp = vcgen.block_predicate(*s);
                let resolved = store.map(|st| st.eval(&bp)).unwrap_or(bp);
                model.is_true(&resolved)
            });
            match next {
                Some(n) => {
                    blocks.push(n);
                    cur = n;
                }
                None => break,
            }
        }
        Trace {
            blocks,
            model: model.clone(),
        }
    }

    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, i: usize) -> BlockId {
        self.blocks[i]
    }

    /// Model value of an expression along this trace.
    pub fn value(&self, e: &Expr) -> Expr {
        self.model.eval(e)
    }

    pub fn model(&self) -> &Model {
        &self.model
    }
}
