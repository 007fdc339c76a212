//! End-to-end scenarios for the enumeration loop.

use pathbmc::ai::{AnalysisParams, Location, PathAnalysis, PathAnalyzer, RelevantStmt};
use pathbmc::cfg::{
    BlockId, BlockVcGen, Cfg, CmpPred, Constraint, Operand, Statement, SymStore, VcGen,
};
use pathbmc::expr::{Expr, ExprPool};
use pathbmc::smt::{MucMethod, SmtContext, StructuralSolver};
use pathbmc::{EngineConfig, EngineConfigBuilder, EngineError, PathBmcEngine, Verdict};
use std::collections::HashMap;
use std::sync::Arc;

/// A VC generator with a fixed clause list, for driving the loop directly.
struct FixedVcGen {
    side: Vec<Expr>,
    preds: HashMap<usize, Expr>,
    stores: Vec<SymStore>,
    cps: Vec<BlockId>,
}

impl FixedVcGen {
    fn new(side: Vec<Expr>) -> Self {
        Self {
            side,
            preds: HashMap::new(),
            stores: Vec::new(),
            cps: Vec::new(),
        }
    }

    fn with_predicate(mut self, bb: BlockId, pred: Expr) -> Self {
        self.preds.insert(bb.0, pred);
        self
    }
}

impl VcGen for FixedVcGen {
    fn encode(&mut self) -> Vec<Expr> {
        self.side.clone()
    }

    fn block_predicate(&self, bb: BlockId) -> Expr {
        self.preds[&bb.0].clone()
    }

    fn cut_points(&self) -> &[BlockId] {
        &self.cps
    }

    fn stores(&self) -> &[SymStore] {
        &self.stores
    }
}

/// Oracle refuting every path that takes one specific edge.
struct EdgeRefuter {
    src: BlockId,
    dst: BlockId,
}

impl PathAnalyzer for EdgeRefuter {
    fn path_analyze(&mut self, _params: &AnalysisParams, blocks: &[BlockId]) -> PathAnalysis {
        let takes_edge = blocks
            .windows(2)
            .any(|w| w[0] == self.src && w[1] == self.dst);
        if takes_edge {
            PathAnalysis::Infeasible(vec![RelevantStmt {
                loc: Location::Edge(self.src, self.dst),
                stmt: Statement::Assume(Constraint::new(
                    Operand::var("x"),
                    CmpPred::Lt,
                    Operand::Const(0),
                )),
            }])
        } else {
            PathAnalysis::Feasible
        }
    }
}

/// Oracle with a scripted (possibly faulty) relevant set.
struct ScriptedOracle {
    relevant: Vec<RelevantStmt>,
}

impl PathAnalyzer for ScriptedOracle {
    fn path_analyze(&mut self, _params: &AnalysisParams, _blocks: &[BlockId]) -> PathAnalysis {
        PathAnalysis::Infeasible(self.relevant.clone())
    }
}

fn solvers(pool: &ExprPool) -> (Box<dyn SmtContext>, Box<dyn SmtContext>) {
    (
        Box::new(StructuralSolver::new(pool.clone())),
        Box::new(StructuralSolver::new(pool.clone())),
    )
}

fn single_block_cfg() -> (Arc<Cfg>, BlockId) {
    let mut cfg = Cfg::new();
    let b0 = cfg.add_block("b0");
    (Arc::new(cfg), b0)
}

#[test]
fn trivially_unsat_terminates_at_iteration_zero() {
    let pool = ExprPool::new();
    let (cfg, b0) = single_block_cfg();
    let p = pool.bool_sym("p");
    let vcgen =
        FixedVcGen::new(vec![p.clone(), pool.not(p.clone())]).with_predicate(b0, p);
    let (primary, aux) = solvers(&pool);
    let mut engine =
        PathBmcEngine::new(pool, cfg, vcgen, primary, aux, EngineConfig::default());
    assert_eq!(engine.solve().unwrap(), Verdict::Unsat);
    // the initial abstraction sufficed: no path was ever enumerated
    assert_eq!(engine.stats().paths, 0);
    assert_eq!(engine.stats().blocking_clauses, 0);
}

#[test]
fn trivially_sat_yields_the_empty_model() {
    let pool = ExprPool::new();
    let (cfg, b0) = single_block_cfg();
    let vcgen = FixedVcGen::new(vec![pool.bool_true()])
        .with_predicate(b0, pool.bool_sym("p"));
    let (primary, aux) = solvers(&pool);
    let mut engine =
        PathBmcEngine::new(pool, cfg, vcgen, primary, aux, EngineConfig::default());
    assert_eq!(engine.solve().unwrap(), Verdict::Sat);
    assert_eq!(engine.stats().paths, 1);
    assert!(engine.precise_model().unwrap().is_empty());
}

#[test]
fn single_path_refinement_blocks_the_failing_block() {
    let pool = ExprPool::new();
    let mut cfg = Cfg::new();
    let b0 = cfg.add_block("b0");
    let b1 = cfg.add_block("b1");
    cfg.add_edge(b0, b1);
    let cfg = Arc::new(cfg);

    let bp0 = pool.bool_sym("bp_b0");
    let bp1 = pool.bool_sym("bp_b1");
    let x = pool.int_sym("x");
    let side = vec![
        bp0.clone(),
        pool.implies(bp0.clone(), bp1.clone()),
        pool.implies(
            bp1.clone(),
            pool.and(
                pool.eq(x.clone(), pool.int(1)),
                pool.eq(x.clone(), pool.int(2)),
            ),
        ),
    ];
    let vcgen = FixedVcGen::new(side)
        .with_predicate(b0, bp0)
        .with_predicate(b1, bp1.clone());
    let (primary, aux) = solvers(&pool);
    let mut engine = PathBmcEngine::new(
        pool.clone(),
        cfg,
        vcgen,
        primary,
        aux,
        EngineConfig::default(),
    );

    assert_eq!(engine.solve().unwrap(), Verdict::Unsat);
    // the sole path was enumerated once, refuted by SMT, and blocked on
    // exactly the block whose constraints were contradictory
    assert_eq!(engine.stats().paths, 1);
    assert_eq!(engine.stats().paths_refuted_by_smt, 1);
    assert_eq!(engine.unsat_core(), vec![pool.not(bp1)]);
}

/// b0 → {b1, b2}, b1 → {b3, b4}, b2 → b3; the edge (b1, b3) is critical.
///
/// Block order makes the b0 → b1 → b3 path enumerate first.
fn critical_diamond() -> (Arc<Cfg>, [BlockId; 5]) {
    let mut cfg = Cfg::new();
    let b0 = cfg.add_block("b0");
    let b1 = cfg.add_block("b1");
    let b3 = cfg.add_block("b3");
    let b4 = cfg.add_block("b4");
    let b2 = cfg.add_block("b2");
    cfg.add_edge(b0, b1);
    cfg.add_edge(b0, b2);
    cfg.add_edge(b1, b3);
    cfg.add_edge(b1, b4);
    cfg.add_edge(b2, b3);
    (Arc::new(cfg), [b0, b1, b2, b3, b4])
}

#[test]
fn critical_edge_blocking_preserves_the_sibling_path() {
    let pool = ExprPool::new();
    let (cfg, [_, b1, _, b3, _]) = critical_diamond();
    assert!(cfg.is_critical_edge(b1, b3));

    let mut vcgen = BlockVcGen::new(pool.clone(), cfg.clone());
    // the error block must execute
    vcgen.require_block(b3);
    let reach_b3 = vcgen.instance_predicate(b3);
    let bp1 = vcgen.instance_predicate(b1);
    let tuple = vcgen.instance_edge_tuple(b1, b3);

    let (primary, aux) = solvers(&pool);
    let config = EngineConfigBuilder::new().path_ai(true).build();
    let mut engine = PathBmcEngine::new(pool.clone(), cfg, vcgen, primary, aux, config)
        .with_analyzer(Box::new(EdgeRefuter { src: b1, dst: b3 }));

    // the sibling path b0 → b2 → b3 survives the blocking clause
    assert_eq!(engine.solve().unwrap(), Verdict::Sat);
    assert!(engine.stats().paths_refuted_by_ai >= 1);

    // the infeasible path was blocked through the edge tuple, not through
    // the over-blocking conjunction of its endpoints
    let expected = pool.not(pool.and(bp1.clone(), tuple));
    let over_blocking = pool.not(pool.and(bp1, reach_b3));
    let core = engine.unsat_core();
    assert!(core.contains(&expected));
    assert!(!core.contains(&over_blocking));

    // and the counterexample indeed goes through the sibling
    let trace = engine.trace().unwrap();
    assert!(trace.blocks().windows(2).any(|w| w[1] == b3 && w[0] != b1));
}

#[test]
fn empty_relevant_set_forces_unsat_with_a_warning() {
    let pool = ExprPool::new();
    let (cfg, b0) = single_block_cfg();
    let bp0 = pool.bool_sym("bp_b0");
    let vcgen = FixedVcGen::new(vec![bp0.clone()]).with_predicate(b0, bp0);
    let (primary, aux) = solvers(&pool);
    let config = EngineConfigBuilder::new().path_ai(true).build();
    let mut engine = PathBmcEngine::new(pool, cfg, vcgen, primary, aux, config)
        .with_analyzer(Box::new(ScriptedOracle { relevant: vec![] }));

    // a faulty oracle with an empty relevant set: the engine emits `false`
    // and the next abstract solve settles the run
    assert_eq!(engine.solve().unwrap(), Verdict::Unsat);
    assert_eq!(engine.stats().paths, 1);
    assert_eq!(engine.stats().paths_refuted_by_ai, 1);
}

#[test]
fn non_progress_is_detected_as_unknown() {
    let pool = ExprPool::new();
    let mut cfg = Cfg::new();
    let b0 = cfg.add_block("b0");
    let b1 = cfg.add_block("b1");
    cfg.add_edge(b0, b1);
    let cfg = Arc::new(cfg);

    let vcgen = BlockVcGen::new(pool.clone(), cfg.clone());
    // an oracle that keeps blaming a block the model never takes: the same
    // blocking clause comes back and the duplicate detector must fire
    let oracle = ScriptedOracle {
        relevant: vec![RelevantStmt {
            loc: Location::Block(b1),
            stmt: Statement::BinOp {
                dst: "x".into(),
                op: pathbmc::cfg::ArithOp::Add,
                lhs: Operand::Const(1),
                rhs: Operand::Const(1),
            },
        }],
    };
    let (primary, aux) = solvers(&pool);
    let config = EngineConfigBuilder::new().path_ai(true).build();
    let mut engine = PathBmcEngine::new(pool, cfg, vcgen, primary, aux, config)
        .with_analyzer(Box::new(oracle));

    assert_eq!(engine.solve().unwrap(), Verdict::Unknown);
    assert_eq!(engine.stats().blocking_clauses, 1);
    assert!(engine.stats().paths >= 2);
}

#[test]
fn muc_strategies_agree_end_to_end() {
    let mut cores = Vec::new();
    for method in [
        MucMethod::Assumptions,
        MucMethod::Naive,
        MucMethod::BinarySearch,
    ] {
        let pool = ExprPool::new();
        let mut cfg = Cfg::new();
        let b0 = cfg.add_block("b0");
        let b1 = cfg.add_block("b1");
        cfg.add_edge(b0, b1);
        let cfg = Arc::new(cfg);

        let bp0 = pool.bool_sym("bp_b0");
        let bp1 = pool.bool_sym("bp_b1");
        let x = pool.int_sym("x");
        let side = vec![
            bp0.clone(),
            pool.implies(bp0.clone(), bp1.clone()),
            pool.implies(
                bp1.clone(),
                pool.and(
                    pool.eq(x.clone(), pool.int(1)),
                    pool.eq(x.clone(), pool.int(2)),
                ),
            ),
        ];
        let vcgen = FixedVcGen::new(side)
            .with_predicate(b0, bp0)
            .with_predicate(b1, bp1);
        let (primary, aux) = solvers(&pool);
        let config = EngineConfigBuilder::new().muc(method).build();
        let mut engine = PathBmcEngine::new(pool, cfg, vcgen, primary, aux, config);
        assert_eq!(engine.solve().unwrap(), Verdict::Unsat);
        assert!(engine.stats().muc_solver_calls > 0);
        cores.push(
            engine
                .unsat_core()
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>(),
        );
    }
    assert_eq!(cores[0], cores[1]);
    assert_eq!(cores[1], cores[2]);
}

#[test]
fn xor_in_the_encoding_is_fatal() {
    let pool = ExprPool::new();
    let (cfg, b0) = single_block_cfg();
    let clause = pool.xor(pool.bool_sym("a"), pool.bool_sym("b"));
    let vcgen = FixedVcGen::new(vec![clause]).with_predicate(b0, pool.bool_sym("a"));
    let (primary, aux) = solvers(&pool);
    let mut engine =
        PathBmcEngine::new(pool, cfg, vcgen, primary, aux, EngineConfig::default());
    assert!(matches!(
        engine.solve(),
        Err(EngineError::Unsupported(_))
    ));
}

#[test]
fn solver_unknown_bubbles_up() {
    let pool = ExprPool::new();
    let (cfg, b0) = single_block_cfg();
    let bp0 = pool.bool_sym("bp_b0");
    let x = pool.int_sym("x");
    let y = pool.int_sym("y");
    // the precise side carries an atom outside the auxiliary backend's
    // fragment, so path refinement comes back unknown
    let side = vec![
        bp0.clone(),
        pool.implies(bp0.clone(), pool.eq(pool.mul(x, y), pool.int(6))),
    ];
    let vcgen = FixedVcGen::new(side).with_predicate(b0, bp0);
    let (primary, aux) = solvers(&pool);
    let mut engine =
        PathBmcEngine::new(pool, cfg, vcgen, primary, aux, EngineConfig::default());
    assert_eq!(engine.solve().unwrap(), Verdict::Unknown);
}

#[test]
fn trace_requires_a_sat_verdict() {
    let pool = ExprPool::new();
    let (cfg, b0) = single_block_cfg();
    let bp0 = pool.bool_sym("bp_b0");
    let x = pool.int_sym("x");
    let side = vec![
        bp0.clone(),
        pool.implies(bp0.clone(), pool.eq(x.clone(), pool.int(3))),
    ];
    let vcgen = FixedVcGen::new(side).with_predicate(b0, bp0.clone());
    let (primary, aux) = solvers(&pool);
    let mut engine = PathBmcEngine::new(
        pool.clone(),
        cfg,
        vcgen,
        primary,
        aux,
        EngineConfig::default(),
    );

    assert!(matches!(engine.trace(), Err(EngineError::NoCounterexample)));
    assert_eq!(engine.solve().unwrap(), Verdict::Sat);
    let trace = engine.trace().unwrap();
    assert_eq!(trace.blocks(), &[b0]);
    assert_eq!(trace.value(&x), pool.int(3));
}

#[test]
fn blocking_set_grows_once_per_refuted_path() {
    let pool = ExprPool::new();
    // diamond with a shared exit: b5 is reached via b3 or b4, and both
    // carry contradictory constraints, so every path must be refuted
    let mut cfg = Cfg::new();
    let b0 = cfg.add_block("b0");
    let b1 = cfg.add_block("b1");
    let b2 = cfg.add_block("b2");
    let b3 = cfg.add_block("b3");
    let b4 = cfg.add_block("b4");
    let b5 = cfg.add_block("b5");
    cfg.add_edge(b0, b1);
    cfg.add_edge(b0, b2);
    cfg.add_edge(b1, b3);
    cfg.add_edge(b1, b4);
    cfg.add_edge(b2, b3);
    cfg.add_edge(b3, b5);
    cfg.add_edge(b4, b5);
    let cfg = Arc::new(cfg);

    let mut vcgen = BlockVcGen::new(pool.clone(), cfg.clone());
    vcgen.require_block(b5);
    let x = pool.int_sym("x!0");
    let y = pool.int_sym("y!0");
    vcgen.add_constraint(b3, pool.eq(x.clone(), pool.int(1)));
    vcgen.add_constraint(b3, pool.eq(x, pool.int(2)));
    vcgen.add_constraint(b4, pool.eq(y.clone(), pool.int(1)));
    vcgen.add_constraint(b4, pool.eq(y, pool.int(2)));

    let (primary, aux) = solvers(&pool);
    let mut engine = PathBmcEngine::new(
        pool,
        cfg,
        vcgen,
        primary,
        aux,
        EngineConfig::default(),
    );
    assert_eq!(engine.solve().unwrap(), Verdict::Unsat);
    // every refuted path contributed a fresh blocking clause
    assert!(engine.stats().paths >= 2);
    assert_eq!(
        engine.stats().paths_refuted_by_smt,
        engine.stats().blocking_clauses
    );
    assert_eq!(engine.stats().paths, engine.stats().paths_refuted_by_smt);
}

#[test]
fn repeated_runs_are_deterministic() {
    let run = || {
        let pool = ExprPool::new();
        let (cfg, [_, b1, _, b3, _]) = critical_diamond();
        let mut vcgen = BlockVcGen::new(pool.clone(), cfg.clone());
        vcgen.require_block(b3);
        let (primary, aux) = solvers(&pool);
        let config = EngineConfigBuilder::new().path_ai(true).build();
        let mut engine = PathBmcEngine::new(pool, cfg, vcgen, primary, aux, config)
            .with_analyzer(Box::new(EdgeRefuter { src: b1, dst: b3 }));
        let verdict = engine.solve().unwrap();
        let core: Vec<String> = engine.unsat_core().iter().map(|e| e.to_string()).collect();
        (verdict, engine.stats().paths, core)
    };
    assert_eq!(run(), run());
}
