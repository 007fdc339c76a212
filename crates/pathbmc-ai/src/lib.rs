//! Abstract-interpretation layer of pathbmc.
//!
//! The engine can hand a candidate path to a [`PathAnalyzer`] before paying
//! for a precise SMT check. The analyzer either proves the path infeasible,
//! returning a minimal set of statements whose forward abstract semantics is
//! bottom, or reports it (abstractly) feasible so the SMT refiner takes over.
//!
//! [`IntervalPathAnalyzer`] is the built-in implementation, running the
//! classic interval domain over the path's statements.

mod analyzer;
mod interval;
mod lattice;

pub use analyzer::{
    AnalysisParams, Domain, IntervalPathAnalyzer, Location, PathAnalysis, PathAnalyzer,
    RelevantStmt,
};
pub use interval::Interval;
pub use lattice::Lattice;
