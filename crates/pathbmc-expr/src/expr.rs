//! Expression nodes, sorts and the interning pool.

use hashbrown::HashMap;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

/// Sort (type) of an expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sort {
    Bool,
    Int,
    BitVec(u32),
    /// Array sort: (Array index element)
    Array(Box<Sort>, Box<Sort>),
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::BitVec(w) => write!(f, "(_ BitVec {w})"),
            Sort::Array(k, v) => write!(f, "(Array {k} {v})"),
        }
    }
}

/// Operator or payload of an expression node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprKind {
    True,
    False,
    /// Named 0-arity constant.
    Sym(String),
    /// Boolean constant named by an ordered pair of expressions.
    ///
    /// The pair is carried as the node's two children; interning guarantees
    /// that the same `(src, dst)` always yields the same constant.
    TupleSym,
    Int(i64),

    Not,
    And,
    Or,
    Implies,
    Iff,
    Xor,
    Ite,

    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    Add,
    Sub,
    Mul,

    Select,
    Store,
}

struct ExprNode {
    id: u64,
    kind: ExprKind,
    children: Vec<Expr>,
    sort: Sort,
}

/// Immutable handle to an interned expression node.
///
/// Equality, hashing and ordering are by interner id. Ids are assigned in
/// creation order, which makes sorting by `Expr` deterministic for a fixed
/// construction sequence.
#[derive(Clone)]
pub struct Expr(Arc<ExprNode>);

impl Expr {
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    pub fn children(&self) -> &[Expr] {
        &self.0.children
    }

    pub fn sort(&self) -> &Sort {
        &self.0.sort
    }

    pub fn is_true(&self) -> bool {
        matches!(self.0.kind, ExprKind::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self.0.kind, ExprKind::False)
    }

    /// Named constant (0-arity symbol), tuple constants excluded.
    pub fn is_sym(&self) -> bool {
        matches!(self.0.kind, ExprKind::Sym(_))
    }

    pub fn sym_name(&self) -> Option<&str> {
        match &self.0.kind {
            ExprKind::Sym(name) => Some(name),
            _ => None,
        }
    }

    /// Boolean constant named by an ordered pair (an edge predicate).
    pub fn is_tuple_sym(&self) -> bool {
        matches!(self.0.kind, ExprKind::TupleSym)
    }

    /// The `(src, dst)` pair naming a tuple constant.
    pub fn tuple_parts(&self) -> Option<(Expr, Expr)> {
        if self.is_tuple_sym() {
            Some((self.0.children[0].clone(), self.0.children[1].clone()))
        } else {
            None
        }
    }

    /// `true`, `false`, or a boolean constant (named or tuple).
    pub fn is_pos_bool_lit(&self) -> bool {
        match &self.0.kind {
            ExprKind::True | ExprKind::False => true,
            ExprKind::Sym(_) => self.0.sort == Sort::Bool,
            ExprKind::TupleSym => true,
            _ => false,
        }
    }

    /// Negation of a positive boolean literal.
    pub fn is_neg_bool_lit(&self) -> bool {
        matches!(self.0.kind, ExprKind::Not) && self.0.children[0].is_pos_bool_lit()
    }

    pub fn is_bool_lit(&self) -> bool {
        self.is_pos_bool_lit() || self.is_neg_bool_lit()
    }

    /// The operand of a negation, if this is one.
    pub fn as_not(&self) -> Option<&Expr> {
        match self.0.kind {
            ExprKind::Not => Some(&self.0.children[0]),
            _ => None,
        }
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl PartialOrd for Expr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Expr {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.id.cmp(&other.0.id)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            ExprKind::True => write!(f, "true"),
            ExprKind::False => write!(f, "false"),
            ExprKind::Sym(name) => write!(f, "{name}"),
            ExprKind::Int(v) => write!(f, "{v}"),
            ExprKind::TupleSym => {
                write!(f, "(tuple {} {})", self.0.children[0], self.0.children[1])
            }
            kind => {
                let op = match kind {
                    ExprKind::Not => "not",
                    ExprKind::And => "and",
                    ExprKind::Or => "or",
                    ExprKind::Implies => "=>",
                    ExprKind::Iff => "iff",
                    ExprKind::Xor => "xor",
                    ExprKind::Ite => "ite",
                    ExprKind::Eq => "=",
                    ExprKind::Ne => "distinct",
                    ExprKind::Lt => "<",
                    ExprKind::Le => "<=",
                    ExprKind::Gt => ">",
                    ExprKind::Ge => ">=",
                    ExprKind::Add => "+",
                    ExprKind::Sub => "-",
                    ExprKind::Mul => "*",
                    ExprKind::Select => "select",
                    ExprKind::Store => "store",
                    _ => unreachable!(),
                };
                write!(f, "({op}")?;
                for c in &self.0.children {
                    write!(f, " {c}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Debug, Default)]
struct PoolInner {
    table: HashMap<(ExprKind, Vec<u64>, Sort), Expr>,
    next_id: u64,
}

/// Interning factory for expressions.
///
/// Cheap to clone; clones share the same interner, so handles from any clone
/// compare correctly against each other.
#[derive(Debug, Clone, Default)]
pub struct ExprPool {
    inner: Arc<Mutex<PoolInner>>,
}

impl ExprPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&self, kind: ExprKind, children: Vec<Expr>, sort: Sort) -> Expr {
        let key = (
            kind.clone(),
            children.iter().map(Expr::id).collect::<Vec<_>>(),
            sort.clone(),
        );
        let mut inner = self.inner.lock().expect("expression pool poisoned");
        if let Some(e) = inner.table.get(&key) {
            return e.clone();
        }
        let id = inner.next_id;
        inner.next_id += 1;
        let e = Expr(Arc::new(ExprNode {
            id,
            kind,
            children,
            sort,
        }));
        inner.table.insert(key, e.clone());
        e
    }

    /// Rebuild a node with the same operator and sort but new children.
    ///
    /// Skips the constructor-level simplifications on purpose: rewrites that
    /// use it must stay structure-preserving.
    pub(crate) fn rebuild(&self, kind: &ExprKind, children: Vec<Expr>, sort: &Sort) -> Expr {
        self.intern(kind.clone(), children, sort.clone())
    }

    pub fn bool_true(&self) -> Expr {
        self.intern(ExprKind::True, vec![], Sort::Bool)
    }

    pub fn bool_false(&self) -> Expr {
        self.intern(ExprKind::False, vec![], Sort::Bool)
    }

    pub fn bool_const(&self, b: bool) -> Expr {
        if b {
            self.bool_true()
        } else {
            self.bool_false()
        }
    }

    /// Named 0-arity constant of the given sort.
    pub fn sym(&self, name: impl Into<String>, sort: Sort) -> Expr {
        self.intern(ExprKind::Sym(name.into()), vec![], sort)
    }

    pub fn bool_sym(&self, name: impl Into<String>) -> Expr {
        self.sym(name, Sort::Bool)
    }

    pub fn int_sym(&self, name: impl Into<String>) -> Expr {
        self.sym(name, Sort::Int)
    }

    pub fn int(&self, v: i64) -> Expr {
        self.intern(ExprKind::Int(v), vec![], Sort::Int)
    }

    /// Boolean constant named by the ordered pair `(src, dst)`.
    pub fn tuple_sym(&self, src: Expr, dst: Expr) -> Expr {
        self.intern(ExprKind::TupleSym, vec![src, dst], Sort::Bool)
    }

    pub fn not(&self, e: Expr) -> Expr {
        match e.kind() {
            ExprKind::True => self.bool_false(),
            ExprKind::False => self.bool_true(),
            ExprKind::Not => e.children()[0].clone(),
            _ => self.intern(ExprKind::Not, vec![e], Sort::Bool),
        }
    }

    pub fn and(&self, a: Expr, b: Expr) -> Expr {
        if a.is_false() || b.is_false() {
            return self.bool_false();
        }
        if a.is_true() {
            return b;
        }
        if b.is_true() {
            return a;
        }
        self.intern(ExprKind::And, vec![a, b], Sort::Bool)
    }

    pub fn or(&self, a: Expr, b: Expr) -> Expr {
        if a.is_true() || b.is_true() {
            return self.bool_true();
        }
        if a.is_false() {
            return b;
        }
        if b.is_false() {
            return a;
        }
        self.intern(ExprKind::Or, vec![a, b], Sort::Bool)
    }

    /// Left-folded conjunction; `true` for the empty slice.
    pub fn and_all(&self, es: &[Expr]) -> Expr {
        match es {
            [] => self.bool_true(),
            [e] => e.clone(),
            [first, rest @ ..] => rest
                .iter()
                .fold(first.clone(), |acc, e| self.and(acc, e.clone())),
        }
    }

    /// Left-folded disjunction; `false` for the empty slice.
    pub fn or_all(&self, es: &[Expr]) -> Expr {
        match es {
            [] => self.bool_false(),
            [e] => e.clone(),
            [first, rest @ ..] => rest
                .iter()
                .fold(first.clone(), |acc, e| self.or(acc, e.clone())),
        }
    }

    pub fn implies(&self, a: Expr, b: Expr) -> Expr {
        self.intern(ExprKind::Implies, vec![a, b], Sort::Bool)
    }

    pub fn iff(&self, a: Expr, b: Expr) -> Expr {
        self.intern(ExprKind::Iff, vec![a, b], Sort::Bool)
    }

    pub fn xor(&self, a: Expr, b: Expr) -> Expr {
        self.intern(ExprKind::Xor, vec![a, b], Sort::Bool)
    }

    pub fn ite(&self, c: Expr, t: Expr, e: Expr) -> Expr {
        let sort = t.sort().clone();
        self.intern(ExprKind::Ite, vec![c, t, e], sort)
    }

    pub fn eq(&self, a: Expr, b: Expr) -> Expr {
        self.intern(ExprKind::Eq, vec![a, b], Sort::Bool)
    }

    pub fn ne(&self, a: Expr, b: Expr) -> Expr {
        self.intern(ExprKind::Ne, vec![a, b], Sort::Bool)
    }

    pub fn lt(&self, a: Expr, b: Expr) -> Expr {
        self.intern(ExprKind::Lt, vec![a, b], Sort::Bool)
    }

    pub fn le(&self, a: Expr, b: Expr) -> Expr {
        self.intern(ExprKind::Le, vec![a, b], Sort::Bool)
    }

    pub fn gt(&self, a: Expr, b: Expr) -> Expr {
        self.intern(ExprKind::Gt, vec![a, b], Sort::Bool)
    }

    pub fn ge(&self, a: Expr, b: Expr) -> Expr {
        self.intern(ExprKind::Ge, vec![a, b], Sort::Bool)
    }

    pub fn add(&self, a: Expr, b: Expr) -> Expr {
        let sort = a.sort().clone();
        self.intern(ExprKind::Add, vec![a, b], sort)
    }

    pub fn sub(&self, a: Expr, b: Expr) -> Expr {
        let sort = a.sort().clone();
        self.intern(ExprKind::Sub, vec![a, b], sort)
    }

    pub fn mul(&self, a: Expr, b: Expr) -> Expr {
        let sort = a.sort().clone();
        self.intern(ExprKind::Mul, vec![a, b], sort)
    }

    /// Array read.
    pub fn select(&self, arr: Expr, idx: Expr) -> Expr {
        let sort = match arr.sort() {
            Sort::Array(_, v) => (**v).clone(),
            other => other.clone(),
        };
        self.intern(ExprKind::Select, vec![arr, idx], sort)
    }

    /// Array write.
    pub fn store(&self, arr: Expr, idx: Expr, val: Expr) -> Expr {
        let sort = arr.sort().clone();
        self.intern(ExprKind::Store, vec![arr, idx, val], sort)
    }
}
