//! Engine-level errors.

use pathbmc_expr::ExprError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The verification condition contains an operator the boolean
    /// abstraction cannot handle.
    #[error(transparent)]
    Unsupported(#[from] ExprError),

    /// `trace()` was called without a preceding satisfiable `solve()`.
    #[error("no counterexample is available: solve() has not returned sat")]
    NoCounterexample,
}
