//! Basic blocks, edges, phi nodes and statements.

use hashbrown::HashMap;
use pathbmc_expr::{Expr, ExprPool};
use std::fmt;

/// Index of a basic block within its CFG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Const(i64),
    Var(String),
}

impl Operand {
    pub fn var(name: impl Into<String>) -> Self {
        Operand::Var(name.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpPred {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A comparison between two operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub lhs: Operand,
    pub pred: CmpPred,
    pub rhs: Operand,
}

impl Constraint {
    pub fn new(lhs: Operand, pred: CmpPred, rhs: Operand) -> Self {
        Self { lhs, pred, rhs }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
}

/// Statements at the granularity the path refiners reason about.
///
/// The interval analyzer executes the arithmetic subset; the remaining kinds
/// exist so refinement can classify them (interior vs edge-located) and so
/// analyses can treat them conservatively.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assign {
        dst: String,
        src: Operand,
    },
    BinOp {
        dst: String,
        op: ArithOp,
        lhs: Operand,
        rhs: Operand,
    },
    Cast {
        dst: String,
        src: Operand,
    },
    Select {
        dst: String,
        cond: Constraint,
        on_true: Operand,
        on_false: Operand,
    },
    /// Boolean combination of two boolean variables.
    BoolBinOp {
        dst: String,
        lhs: String,
        rhs: String,
    },
    /// Boolean variable defined by a comparison.
    BoolAssignConstraint {
        dst: String,
        cond: Constraint,
    },
    /// Assumption over a boolean variable, not tied to a branch.
    BoolAssume {
        var: String,
    },
    /// Assumption over a comparison; edge-located when it comes from a branch.
    Assume(Constraint),
    ArrayRead {
        dst: String,
        array: String,
        index: Operand,
    },
    ArrayWrite {
        array: String,
        index: Operand,
        value: Operand,
    },
    ArrayAssume {
        array: String,
    },
    ArrayAssign {
        dst: String,
        src: String,
    },
    /// A statement the engine has no interpretation for.
    Opaque {
        description: String,
    },
}

/// A phi node of a join block.
#[derive(Debug, Clone, PartialEq)]
pub struct PhiNode {
    /// Variable the phi defines.
    pub dst: String,
    /// Incoming value per predecessor block.
    pub incomings: Vec<(BlockId, Operand)>,
}

#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: BlockId,
    pub name: String,
    pub phis: Vec<PhiNode>,
    pub stmts: Vec<Statement>,
}

/// A control-flow graph.
#[derive(Debug, Clone, Default)]
pub struct Cfg {
    blocks: Vec<BasicBlock>,
    entry: Option<BlockId>,
    succs: Vec<Vec<BlockId>>,
    preds: Vec<Vec<BlockId>>,
    edge_assumes: HashMap<(usize, usize), Vec<Constraint>>,
}

impl Cfg {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block; the first block added becomes the entry.
    pub fn add_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock {
            id,
            name: name.into(),
            phis: Vec::new(),
            stmts: Vec::new(),
        });
        self.succs.push(Vec::new());
        self.preds.push(Vec::new());
        if self.entry.is_none() {
            self.entry = Some(id);
        }
        id
    }

    pub fn add_edge(&mut self, src: BlockId, dst: BlockId) {
        if !self.succs[src.0].contains(&dst) {
            self.succs[src.0].push(dst);
            self.preds[dst.0].push(src);
        }
    }

    /// Attach a branch assumption to an edge (the edge is created if needed).
    pub fn add_edge_assume(&mut self, src: BlockId, dst: BlockId, c: Constraint) {
        self.add_edge(src, dst);
        self.edge_assumes.entry((src.0, dst.0)).or_default().push(c);
    }

    pub fn push_stmt(&mut self, bb: BlockId, stmt: Statement) {
        self.blocks[bb.0].stmts.push(stmt);
    }

    pub fn add_phi(&mut self, bb: BlockId, phi: PhiNode) {
        self.blocks[bb.0].phis.push(phi);
    }

    pub fn entry(&self) -> BlockId {
        self.entry.expect("empty control-flow graph")
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn successors(&self, id: BlockId) -> &[BlockId] {
        &self.succs[id.0]
    }

    pub fn predecessors(&self, id: BlockId) -> &[BlockId] {
        &self.preds[id.0]
    }

    pub fn edge_assumes(&self, src: BlockId, dst: BlockId) -> &[Constraint] {
        self.edge_assumes
            .get(&(src.0, dst.0))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// An edge is critical iff its source has another successor and its
    /// destination has another predecessor.
    pub fn is_critical_edge(&self, src: BlockId, dst: BlockId) -> bool {
        let not_only_leaving = self.succs[src.0].iter().any(|s| *s != dst);
        let not_only_entering = self.preds[dst.0].iter().any(|p| *p != src);
        not_only_leaving && not_only_entering
    }

    /// The join block whose phi nodes define `var`, if any.
    pub fn phi_parent(&self, var: &str) -> Option<BlockId> {
        self.blocks
            .iter()
            .find(|b| b.phis.iter().any(|phi| phi.dst == var))
            .map(|b| b.id)
    }
}

/// Predicate identifying a CFG edge.
///
/// For a non-critical edge `src ∧ dst` is exact. For a critical edge it is
/// not: both endpoints can be reached through other paths, so blocking on the
/// conjunction would block those too. Critical edges therefore get a fresh
/// boolean constant named by the ordered pair.
pub fn edge_predicate(pool: &ExprPool, src: &Expr, dst: &Expr, critical: bool) -> Expr {
    if critical {
        pool.tuple_sym(src.clone(), dst.clone())
    } else {
        pool.and(src.clone(), dst.clone())
    }
}
