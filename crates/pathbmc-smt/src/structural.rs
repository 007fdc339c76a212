//! Built-in structural solver.
//!
//! Decides conjunctions over the fragment the engine exercises internally:
//! propositional structure over boolean constants, plus integer atoms of the
//! shapes `x ⋈ c`, `x = y`, `x ≠ y` (union-find over equalities, interval and
//! disequality constraints per class). Anything outside the fragment yields
//! `Unknown` rather than a wrong answer.
//!
//! Enumeration is over atom assignments, capped by an atom limit; the cap
//! keeps the solver honest about its scale, it is a reference backend for
//! tests and small problems, not a production solver.

use crate::context::{is_bool_sorted, Model, SmtContext, SolveResult};
use hashbrown::{HashMap, HashSet};
use pathbmc_expr::{Expr, ExprKind, ExprPool, Sort};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Var(String),
    Const(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn negate(self) -> Self {
        match self {
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
        }
    }

    /// Mirror the operator so the sides can be swapped.
    fn flip(self) -> Self {
        match self {
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::Ne => CmpOp::Ne,
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
        }
    }

    fn eval(self, a: i64, b: i64) -> bool {
        match self {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        }
    }
}

#[derive(Debug, Clone)]
struct TheoryAtom {
    op: CmpOp,
    lhs: Term,
    rhs: Term,
}

/// An atom of the enumeration: a boolean constant or a parsed theory atom.
#[derive(Debug, Clone)]
enum Atom {
    Prop,
    Theory(TheoryAtom),
}

pub struct StructuralSolver {
    pool: ExprPool,
    assertions: Vec<Expr>,
    model: Option<Model>,
    num_solver_calls: usize,
    atom_limit: usize,
}

impl StructuralSolver {
    pub fn new(pool: ExprPool) -> Self {
        Self {
            pool,
            assertions: Vec::new(),
            model: None,
            num_solver_calls: 0,
            atom_limit: 18,
        }
    }

    /// Cap on the number of distinct atoms enumerated over.
    pub fn with_atom_limit(mut self, limit: usize) -> Self {
        self.atom_limit = limit.min(62);
        self
    }

    pub fn num_solver_calls(&self) -> usize {
        self.num_solver_calls
    }

    pub fn assertions(&self) -> &[Expr] {
        &self.assertions
    }

    fn probe(&mut self, clauses: &[Expr]) -> SolveResult {
        self.num_solver_calls += 1;
        solve_clauses(&self.pool, clauses, self.atom_limit).0
    }
}

impl SmtContext for StructuralSolver {
    fn reset(&mut self) {
        self.assertions.clear();
        self.model = None;
    }

    fn assert_expr(&mut self, e: &Expr) {
        self.assertions.push(e.clone());
    }

    fn solve(&mut self) -> SolveResult {
        self.num_solver_calls += 1;
        let (res, model) = solve_clauses(&self.pool, &self.assertions, self.atom_limit);
        self.model = model;
        res
    }

    fn model(&self) -> Option<Model> {
        self.model.clone()
    }

    /// Deletion-based core over `f`, independent of the current assertions.
    ///
    /// Single-clause removals are exhausted, so the returned core is minimal.
    fn unsat_core(&mut self, f: &[Expr]) -> Option<Vec<Expr>> {
        match self.probe(f) {
            SolveResult::Unsat => {}
            _ => return None,
        }
        let mut core = f.to_vec();
        let mut i = 0;
        while i < core.len() {
            let mut trial = core.clone();
            trial.remove(i);
            match self.probe(&trial) {
                SolveResult::Unsat => core = trial,
                SolveResult::Sat => i += 1,
                SolveResult::Unknown => return None,
            }
        }
        Some(core)
    }
}

fn solve_clauses(
    pool: &ExprPool,
    clauses: &[Expr],
    atom_limit: usize,
) -> (SolveResult, Option<Model>) {
    // atom discovery, in first-occurrence order for determinism
    let mut atoms: Vec<(Expr, Atom)> = Vec::new();
    let mut seen: HashSet<u64> = HashSet::new();
    for clause in clauses {
        if !collect_atoms(clause, &mut atoms, &mut seen) {
            debug!(clause = %clause, "formula outside the structural fragment");
            return (SolveResult::Unknown, None);
        }
    }
    if atoms.len() > atom_limit {
        debug!(
            atoms = atoms.len(),
            limit = atom_limit,
            "atom limit exceeded"
        );
        return (SolveResult::Unknown, None);
    }

    let index: HashMap<u64, usize> = atoms
        .iter()
        .enumerate()
        .map(|(i, (e, _))| (e.id(), i))
        .collect();

    for mask in 0u64..(1u64 << atoms.len()) {
        let truth = |i: usize| mask >> i & 1 == 1;
        if !clauses.iter().all(|c| eval_bool(c, &index, mask)) {
            continue;
        }
        if let Some(values) = theory_witness(&atoms, &truth) {
            let mut model = Model::new(pool.clone());
            for (i, (e, atom)) in atoms.iter().enumerate() {
                if matches!(atom, Atom::Prop) {
                    model.bind(e.clone(), pool.bool_const(truth(i)));
                }
            }
            for (name, v) in values {
                model.bind(pool.int_sym(name), pool.int(v));
            }
            return (SolveResult::Sat, Some(model));
        }
    }
    (SolveResult::Unsat, None)
}

/// Walk the boolean structure of a clause, registering atoms.
///
/// Returns false when the clause leaves the supported fragment.
fn collect_atoms(e: &Expr, atoms: &mut Vec<(Expr, Atom)>, seen: &mut HashSet<u64>) -> bool {
    match e.kind() {
        ExprKind::True | ExprKind::False => true,
        ExprKind::Sym(_) if is_bool_sorted(e) => {
            if seen.insert(e.id()) {
                atoms.push((e.clone(), Atom::Prop));
            }
            true
        }
        ExprKind::TupleSym => {
            if seen.insert(e.id()) {
                atoms.push((e.clone(), Atom::Prop));
            }
            true
        }
        ExprKind::Not | ExprKind::And | ExprKind::Or | ExprKind::Implies | ExprKind::Iff => e
            .children()
            .iter()
            .all(|c| collect_atoms(c, atoms, seen)),
        ExprKind::Ite if is_bool_sorted(e) => e
            .children()
            .iter()
            .all(|c| collect_atoms(c, atoms, seen)),
        ExprKind::Eq | ExprKind::Ne if e.children().iter().all(is_bool_sorted) => e
            .children()
            .iter()
            .all(|c| collect_atoms(c, atoms, seen)),
        ExprKind::Eq | ExprKind::Ne | ExprKind::Lt | ExprKind::Le | ExprKind::Gt | ExprKind::Ge => {
            match parse_theory_atom(e) {
                Some(atom) => {
                    if seen.insert(e.id()) {
                        atoms.push((e.clone(), Atom::Theory(atom)));
                    }
                    true
                }
                None => false,
            }
        }
        _ => false,
    }
}

fn parse_term(e: &Expr) -> Option<Term> {
    match e.kind() {
        ExprKind::Int(v) => Some(Term::Const(*v)),
        ExprKind::Sym(name) if *e.sort() == Sort::Int => Some(Term::Var(name.clone())),
        _ => None,
    }
}

fn parse_theory_atom(e: &Expr) -> Option<TheoryAtom> {
    let op = match e.kind() {
        ExprKind::Eq => CmpOp::Eq,
        ExprKind::Ne => CmpOp::Ne,
        ExprKind::Lt => CmpOp::Lt,
        ExprKind::Le => CmpOp::Le,
        ExprKind::Gt => CmpOp::Gt,
        ExprKind::Ge => CmpOp::Ge,
        _ => return None,
    };
    let lhs = parse_term(&e.children()[0])?;
    let rhs = parse_term(&e.children()[1])?;
    // orderings between two variables are outside the fragment
    if !matches!(op, CmpOp::Eq | CmpOp::Ne)
        && matches!((&lhs, &rhs), (Term::Var(_), Term::Var(_)))
    {
        return None;
    }
    Some(TheoryAtom { op, lhs, rhs })
}

fn eval_bool(e: &Expr, index: &HashMap<u64, usize>, mask: u64) -> bool {
    if let Some(&i) = index.get(&e.id()) {
        return mask >> i & 1 == 1;
    }
    match e.kind() {
        ExprKind::True => true,
        ExprKind::False => false,
        ExprKind::Not => !eval_bool(&e.children()[0], index, mask),
        ExprKind::And => e.children().iter().all(|c| eval_bool(c, index, mask)),
        ExprKind::Or => e.children().iter().any(|c| eval_bool(c, index, mask)),
        ExprKind::Implies => {
            !eval_bool(&e.children()[0], index, mask) || eval_bool(&e.children()[1], index, mask)
        }
        ExprKind::Iff | ExprKind::Eq => {
            eval_bool(&e.children()[0], index, mask) == eval_bool(&e.children()[1], index, mask)
        }
        ExprKind::Ne => {
            eval_bool(&e.children()[0], index, mask) != eval_bool(&e.children()[1], index, mask)
        }
        ExprKind::Ite => {
            if eval_bool(&e.children()[0], index, mask) {
                eval_bool(&e.children()[1], index, mask)
            } else {
                eval_bool(&e.children()[2], index, mask)
            }
        }
        // collect_atoms guarantees everything else was registered
        _ => unreachable!("unregistered atom in structural evaluation"),
    }
}

/// Check the theory atoms under the given polarity, producing a witness.
fn theory_witness(
    atoms: &[(Expr, Atom)],
    truth: &dyn Fn(usize) -> bool,
) -> Option<HashMap<String, i64>> {
    // union-find over variable names
    let mut parent: HashMap<String, String> = HashMap::new();
    fn find(parent: &mut HashMap<String, String>, x: &str) -> String {
        let p = parent.get(x).cloned();
        match p {
            None => {
                parent.insert(x.to_string(), x.to_string());
                x.to_string()
            }
            Some(p) if p == x => p,
            Some(p) => {
                let root = find(parent, &p);
                parent.insert(x.to_string(), root.clone());
                root
            }
        }
    }

    // normalized constraints, variables on the left
    let mut normalized: Vec<(CmpOp, Term, Term)> = Vec::new();
    for (i, (_, atom)) in atoms.iter().enumerate() {
        let Atom::Theory(t) = atom else { continue };
        let op = if truth(i) { t.op } else { t.op.negate() };
        let (op, lhs, rhs) = match (&t.lhs, &t.rhs) {
            (Term::Const(_), Term::Var(_)) => (op.flip(), t.rhs.clone(), t.lhs.clone()),
            _ => (op, t.lhs.clone(), t.rhs.clone()),
        };
        match (&lhs, &rhs) {
            (Term::Const(a), Term::Const(b)) => {
                if !op.eval(*a, *b) {
                    return None;
                }
            }
            (Term::Var(x), Term::Var(y)) if op == CmpOp::Eq => {
                let rx = find(&mut parent, x);
                let ry = find(&mut parent, y);
                parent.insert(rx, ry);
            }
            _ => normalized.push((op, lhs, rhs)),
        }
    }

    // per-class constraints
    let mut value: HashMap<String, i64> = HashMap::new();
    let mut lo: HashMap<String, i64> = HashMap::new();
    let mut hi: HashMap<String, i64> = HashMap::new();
    let mut neq: HashMap<String, HashSet<i64>> = HashMap::new();
    let mut diseq: Vec<(String, String)> = Vec::new();
    let mut vars: Vec<String> = Vec::new();

    for (op, lhs, rhs) in &normalized {
        let Term::Var(x) = lhs else { unreachable!() };
        let root = find(&mut parent, x);
        if !vars.contains(x) {
            vars.push(x.clone());
        }
        match (op, rhs) {
            (CmpOp::Eq, Term::Const(c)) => match value.get(&root) {
                Some(v) if v != c => return None,
                _ => {
                    value.insert(root, *c);
                }
            },
            (CmpOp::Ne, Term::Const(c)) => {
                neq.entry(root).or_default().insert(*c);
            }
            (CmpOp::Ne, Term::Var(y)) => {
                let ry = find(&mut parent, y);
                if ry == root {
                    return None;
                }
                if !vars.contains(y) {
                    vars.push(y.clone());
                }
                diseq.push((root, ry));
            }
            (CmpOp::Lt, Term::Const(c)) => tighten_hi(&mut hi, &root, c - 1),
            (CmpOp::Le, Term::Const(c)) => tighten_hi(&mut hi, &root, *c),
            (CmpOp::Gt, Term::Const(c)) => tighten_lo(&mut lo, &root, c + 1),
            (CmpOp::Ge, Term::Const(c)) => tighten_lo(&mut lo, &root, *c),
            _ => unreachable!("variable orderings were rejected at parse time"),
        }
    }

    // classes with pinned values first
    let mut assigned: HashMap<String, i64> = HashMap::new();
    let mut roots: Vec<String> = vars.iter().map(|v| find(&mut parent, v)).collect();
    roots.sort();
    roots.dedup();
    for root in &roots {
        if let Some(&v) = value.get(root) {
            if !in_bounds(v, lo.get(root), hi.get(root)) {
                return None;
            }
            if neq.get(root).is_some_and(|s| s.contains(&v)) {
                return None;
            }
            assigned.insert(root.clone(), v);
        }
    }
    for (a, b) in &diseq {
        if let (Some(va), Some(vb)) = (assigned.get(a), assigned.get(b)) {
            if va == vb {
                return None;
            }
        }
    }
    // free classes: pick the smallest admissible witness
    for root in &roots {
        if assigned.contains_key(root) {
            continue;
        }
        let mut candidate = match (lo.get(root), hi.get(root)) {
            (Some(&l), _) => l,
            (None, Some(&h)) => h.min(0),
            (None, None) => 0,
        };
        loop {
            if let Some(&h) = hi.get(root) {
                if candidate > h {
                    return None;
                }
            }
            let clash = neq.get(root).is_some_and(|s| s.contains(&candidate))
                || diseq.iter().any(|(a, b)| {
                    let partner = if a == root {
                        Some(b)
                    } else if b == root {
                        Some(a)
                    } else {
                        None
                    };
                    partner
                        .and_then(|p| assigned.get(p))
                        .is_some_and(|&v| v == candidate)
                });
            if !clash {
                break;
            }
            candidate += 1;
        }
        assigned.insert(root.clone(), candidate);
    }

    let mut out = HashMap::new();
    for v in vars {
        let root = find(&mut parent, &v);
        out.insert(v, assigned[&root]);
    }
    Some(out)
}

fn in_bounds(v: i64, lo: Option<&i64>, hi: Option<&i64>) -> bool {
    lo.map_or(true, |&l| v >= l) && hi.map_or(true, |&h| v <= h)
}

fn tighten_lo(lo: &mut HashMap<String, i64>, root: &str, bound: i64) {
    lo.entry(root.to_string())
        .and_modify(|l| *l = (*l).max(bound))
        .or_insert(bound);
}

fn tighten_hi(hi: &mut HashMap<String, i64>, root: &str, bound: i64) {
    hi.entry(root.to_string())
        .and_modify(|h| *h = (*h).min(bound))
        .or_insert(bound);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solver() -> (ExprPool, StructuralSolver) {
        let pool = ExprPool::new();
        let s = StructuralSolver::new(pool.clone());
        (pool, s)
    }

    #[test]
    fn empty_context_is_sat_with_empty_model() {
        let (_, mut s) = solver();
        assert_eq!(s.solve(), SolveResult::Sat);
        assert!(s.model().unwrap().is_empty());
    }

    #[test]
    fn propositional_sat_and_unsat() {
        let (pool, mut s) = solver();
        let p = pool.bool_sym("p");
        let q = pool.bool_sym("q");
        s.assert_expr(&p);
        s.assert_expr(&pool.or(pool.not(p.clone()), q.clone()));
        assert_eq!(s.solve(), SolveResult::Sat);
        let m = s.model().unwrap();
        assert!(m.is_true(&p));
        assert!(m.is_true(&q));

        s.assert_expr(&pool.not(q));
        assert_eq!(s.solve(), SolveResult::Unsat);
        assert!(s.model().is_none());
    }

    #[test]
    fn reset_clears_assertions() {
        let (pool, mut s) = solver();
        let p = pool.bool_sym("p");
        s.assert_expr(&p);
        s.assert_expr(&pool.not(p));
        assert_eq!(s.solve(), SolveResult::Unsat);
        s.reset();
        assert_eq!(s.solve(), SolveResult::Sat);
    }

    #[test]
    fn conflicting_constant_equalities_are_unsat() {
        let (pool, mut s) = solver();
        let x = pool.int_sym("x");
        s.assert_expr(&pool.eq(x.clone(), pool.int(1)));
        s.assert_expr(&pool.eq(x, pool.int(2)));
        assert_eq!(s.solve(), SolveResult::Unsat);
    }

    #[test]
    fn equality_classes_propagate() {
        let (pool, mut s) = solver();
        let x = pool.int_sym("x");
        let y = pool.int_sym("y");
        s.assert_expr(&pool.eq(x.clone(), y.clone()));
        s.assert_expr(&pool.eq(x.clone(), pool.int(1)));
        s.assert_expr(&pool.eq(y.clone(), pool.int(2)));
        assert_eq!(s.solve(), SolveResult::Unsat);

        s.reset();
        s.assert_expr(&pool.eq(x.clone(), pool.int(4)));
        s.assert_expr(&pool.ne(x.clone(), y.clone()));
        assert_eq!(s.solve(), SolveResult::Sat);
        let m = s.model().unwrap();
        assert_eq!(m.eval(&x), pool.int(4));
        assert_ne!(m.eval(&y), pool.int(4));
    }

    #[test]
    fn interval_constraints() {
        let (pool, mut s) = solver();
        let x = pool.int_sym("x");
        s.assert_expr(&pool.gt(x.clone(), pool.int(5)));
        s.assert_expr(&pool.lt(x.clone(), pool.int(3)));
        assert_eq!(s.solve(), SolveResult::Unsat);

        s.reset();
        s.assert_expr(&pool.gt(x.clone(), pool.int(5)));
        s.assert_expr(&pool.lt(x.clone(), pool.int(10)));
        assert_eq!(s.solve(), SolveResult::Sat);
        let m = s.model().unwrap();
        assert_eq!(m.eval(&x), pool.int(6));
    }

    #[test]
    fn guards_select_theory_atoms() {
        let (pool, mut s) = solver();
        let p = pool.bool_sym("p");
        let x = pool.int_sym("x");
        // p => x = 1, !p => x = 2: both branches individually fine
        s.assert_expr(&pool.implies(p.clone(), pool.eq(x.clone(), pool.int(1))));
        s.assert_expr(&pool.implies(pool.not(p.clone()), pool.eq(x.clone(), pool.int(2))));
        s.assert_expr(&pool.eq(x, pool.int(2)));
        assert_eq!(s.solve(), SolveResult::Sat);
        let m = s.model().unwrap();
        assert!(m.eval(&p).is_false());
    }

    #[test]
    fn nonlinear_atoms_are_unknown() {
        let (pool, mut s) = solver();
        let x = pool.int_sym("x");
        let y = pool.int_sym("y");
        s.assert_expr(&pool.eq(pool.mul(x, y), pool.int(6)));
        assert_eq!(s.solve(), SolveResult::Unknown);
    }

    #[test]
    fn variable_orderings_are_unknown() {
        let (pool, mut s) = solver();
        let x = pool.int_sym("x");
        let y = pool.int_sym("y");
        s.assert_expr(&pool.lt(x, y));
        assert_eq!(s.solve(), SolveResult::Unknown);
    }

    #[test]
    fn atom_limit_yields_unknown() {
        let (pool, _) = solver();
        let mut s = StructuralSolver::new(pool.clone()).with_atom_limit(2);
        for name in ["a", "b", "c"] {
            s.assert_expr(&pool.bool_sym(name));
        }
        assert_eq!(s.solve(), SolveResult::Unknown);
    }

    #[test]
    fn tuple_constants_are_plain_atoms() {
        let (pool, mut s) = solver();
        let t = pool.tuple_sym(pool.bool_sym("b1"), pool.bool_sym("b3"));
        s.assert_expr(&pool.not(t.clone()));
        assert_eq!(s.solve(), SolveResult::Sat);
        assert!(s.model().unwrap().eval(&t).is_false());
    }

    #[test]
    fn native_core_is_minimal_and_ordered() {
        let (pool, mut s) = solver();
        let p = pool.bool_sym("p");
        let q = pool.bool_sym("q");
        let f = vec![q.clone(), p.clone(), pool.not(p.clone())];
        let core = s.unsat_core(&f).unwrap();
        assert_eq!(core, vec![p.clone(), pool.not(p)]);
        assert!(s.num_solver_calls() > 0);
    }

    #[test]
    fn native_core_on_sat_input_is_none() {
        let (pool, mut s) = solver();
        assert!(s.unsat_core(&[pool.bool_sym("p")]).is_none());
    }

    #[test]
    fn deterministic_models() {
        let (pool, mut s) = solver();
        let p = pool.bool_sym("p");
        let q = pool.bool_sym("q");
        s.assert_expr(&pool.or(p.clone(), q.clone()));
        assert_eq!(s.solve(), SolveResult::Sat);
        let first = s.model().unwrap();
        for _ in 0..3 {
            assert_eq!(s.solve(), SolveResult::Sat);
            let again = s.model().unwrap();
            assert_eq!(again.eval(&p), first.eval(&p));
            assert_eq!(again.eval(&q), first.eval(&q));
        }
    }
}
