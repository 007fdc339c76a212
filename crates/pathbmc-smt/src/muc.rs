//! Minimal unsatisfiable cores.
//!
//! Contract: given a context and a clause list `f` whose conjunction is
//! unsatisfiable, return `core ⊆ f` such that the core is unsatisfiable and
//! every proper subset is satisfiable. The three strategies are
//! interchangeable up to the choice of minimal core.
//!
//! Every check resets the context and re-asserts from scratch; strategies
//! must not assume previous assertions persist. Each extractor counts its own
//! solver calls for diagnostics.

use crate::context::{SmtContext, SolveResult};
use hashbrown::HashMap;
use pathbmc_expr::Expr;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Minimum slice size for which binary search is worthwhile.
const BINARY_THRESHOLD: usize = 10;

/// Core-extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MucMethod {
    /// Delegate to the backend's native unsat-core facility.
    #[default]
    Assumptions,
    /// Quadratic deletion loop.
    Naive,
    /// Divide and conquer with cross-assumption minimization.
    BinarySearch,
}

impl MucMethod {
    pub fn name(self) -> &'static str {
        match self {
            MucMethod::Assumptions => "assumptions",
            MucMethod::Naive => "naive",
            MucMethod::BinarySearch => "binary-search",
        }
    }
}

/// Runs one core extraction over a borrowed context.
pub struct MucExtractor<'a> {
    ctx: &'a mut dyn SmtContext,
    method: MucMethod,
    num_solver_calls: usize,
}

impl<'a> MucExtractor<'a> {
    pub fn new(ctx: &'a mut dyn SmtContext, method: MucMethod) -> Self {
        Self {
            ctx,
            method,
            num_solver_calls: 0,
        }
    }

    pub fn num_solver_calls(&self) -> usize {
        self.num_solver_calls
    }

    /// Extract a core of `f`; `None` when the backend was inconclusive.
    pub fn run(&mut self, f: &[Expr]) -> Option<Vec<Expr>> {
        let core = match self.method {
            MucMethod::Assumptions => {
                self.num_solver_calls += 1;
                self.ctx.unsat_core(f)?
            }
            MucMethod::Naive => self.naive(f, &[])?,
            MucMethod::BinarySearch => {
                let mut core = Vec::new();
                let mut assumptions = Vec::new();
                self.binary(f, &mut assumptions, &mut core)?;
                core
            }
        };
        debug!(
            method = self.method.name(),
            input = f.len(),
            core = core.len(),
            solver_calls = self.num_solver_calls,
            "unsat core extracted"
        );
        Some(core)
    }

    fn check(&mut self, assumptions: &[Expr], clauses: &[Expr]) -> SolveResult {
        self.ctx.reset();
        for e in assumptions {
            self.ctx.assert_expr(e);
        }
        for e in clauses {
            self.ctx.assert_expr(e);
        }
        self.num_solver_calls += 1;
        self.ctx.solve()
    }

    /// Deletion loop: move the last clause into slot `i`, test without the
    /// tail; satisfiable means clause `i` was essential and is restored.
    fn naive(&mut self, f: &[Expr], assumptions: &[Expr]) -> Option<Vec<Expr>> {
        let mut out: Vec<Expr> = f.to_vec();
        let mut i = 0;
        while i < out.len() {
            let saved = out[i].clone();
            out[i] = out[out.len() - 1].clone();
            match self.check(assumptions, &out[..out.len() - 1]) {
                SolveResult::Sat => {
                    out[i] = saved;
                    i += 1;
                }
                SolveResult::Unsat => {
                    out.pop();
                }
                SolveResult::Unknown => return None,
            }
        }
        // the swap trick reorders survivors; restore the input order
        let position: HashMap<u64, usize> = f
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id(), i))
            .collect();
        out.sort_by_key(|e| position[&e.id()]);
        Some(out)
    }

    fn binary(
        &mut self,
        f: &[Expr],
        assumptions: &mut Vec<Expr>,
        core: &mut Vec<Expr>,
    ) -> Option<()> {
        if f.len() <= BINARY_THRESHOLD {
            match f.len() {
                0 => {}
                1 => core.push(f[0].clone()),
                _ => {
                    let sub = self.naive(f, assumptions)?;
                    core.extend(sub);
                }
            }
            return Some(());
        }

        let (a, b) = f.split_at(f.len() / 2);
        match self.check(assumptions, a) {
            SolveResult::Unsat => return self.binary(a, assumptions, core),
            SolveResult::Unknown => return None,
            SolveResult::Sat => {}
        }
        match self.check(assumptions, b) {
            SolveResult::Unsat => return self.binary(b, assumptions, core),
            SolveResult::Unknown => return None,
            SolveResult::Sat => {}
        }

        // both halves satisfiable on their own, the conflict crosses the cut:
        // minimize A under B, then B under the core found so far
        let base = assumptions.len();
        assumptions.extend_from_slice(b);
        self.binary(a, assumptions, core)?;
        assumptions.truncate(base);
        assumptions.extend_from_slice(core);
        self.binary(b, assumptions, core)?;
        assumptions.truncate(base);
        Some(())
    }
}
