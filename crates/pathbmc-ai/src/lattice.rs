//! Lattice operations for abstract domains.

/// A lattice element with join, meet and ordering.
///
/// Bottom represents unreachable states (no information), top represents all
/// possible values.
pub trait Lattice: Clone + PartialEq + Sized {
    fn bottom() -> Self;

    fn top() -> Self;

    fn is_bottom(&self) -> bool;

    fn is_top(&self) -> bool;

    /// Least upper bound; merging control-flow paths.
    fn join(&self, other: &Self) -> Self;

    /// Greatest lower bound; intersecting constraints.
    fn meet(&self, other: &Self) -> Self;

    /// `self ⊑ other`.
    fn leq(&self, other: &Self) -> bool;

    /// Widening for infinite ascending chains; join is a sound default for
    /// finite analyses such as single-path runs.
    #[inline]
    fn widen(&self, other: &Self) -> Self {
        self.join(other)
    }
}
