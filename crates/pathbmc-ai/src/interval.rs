//! The interval domain over machine integers.

use crate::lattice::Lattice;
use pathbmc_cfg::CmpPred;

/// An integer interval; `None` bounds are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Bottom,
    Range {
        lo: Option<i64>,
        hi: Option<i64>,
    },
}

impl Interval {
    /// `[lo, hi]`, collapsing to bottom when empty.
    pub fn new(lo: Option<i64>, hi: Option<i64>) -> Self {
        match (lo, hi) {
            (Some(l), Some(h)) if l > h => Interval::Bottom,
            _ => Interval::Range { lo, hi },
        }
    }

    pub fn constant(c: i64) -> Self {
        Interval::Range {
            lo: Some(c),
            hi: Some(c),
        }
    }

    pub fn at_least(lo: i64) -> Self {
        Interval::Range {
            lo: Some(lo),
            hi: None,
        }
    }

    pub fn at_most(hi: i64) -> Self {
        Interval::Range {
            lo: None,
            hi: Some(hi),
        }
    }

    pub fn as_constant(&self) -> Option<i64> {
        match self {
            Interval::Range {
                lo: Some(l),
                hi: Some(h),
            } if l == h => Some(*l),
            _ => None,
        }
    }

    fn bounds(&self) -> Option<(Option<i64>, Option<i64>)> {
        match self {
            Interval::Bottom => None,
            Interval::Range { lo, hi } => Some((*lo, *hi)),
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        let (Some((al, ah)), Some((bl, bh))) = (self.bounds(), other.bounds()) else {
            return Interval::Bottom;
        };
        Interval::new(
            al.zip(bl).map(|(a, b)| a.saturating_add(b)),
            ah.zip(bh).map(|(a, b)| a.saturating_add(b)),
        )
    }

    pub fn sub(&self, other: &Self) -> Self {
        let (Some((al, ah)), Some((bl, bh))) = (self.bounds(), other.bounds()) else {
            return Interval::Bottom;
        };
        Interval::new(
            al.zip(bh).map(|(a, b)| a.saturating_sub(b)),
            ah.zip(bl).map(|(a, b)| a.saturating_sub(b)),
        )
    }

    /// Precise only for constant operands; anything else goes to top.
    pub fn mul(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Interval::Bottom;
        }
        match (self.as_constant(), other.as_constant()) {
            (Some(a), Some(b)) => Interval::constant(a.saturating_mul(b)),
            _ => Interval::top(),
        }
    }

    /// Refine a pair of intervals under `lhs pred rhs`; `None` when the
    /// comparison is infeasible.
    pub fn refine_cmp(lhs: &Self, pred: CmpPred, rhs: &Self) -> Option<(Self, Self)> {
        let (ll, lh) = lhs.bounds()?;
        let (rl, rh) = rhs.bounds()?;
        let pair = match pred {
            CmpPred::Eq => {
                let m = lhs.meet(rhs);
                (m, m)
            }
            CmpPred::Ne => {
                // only singleton-vs-singleton detects a definite conflict
                match (lhs.as_constant(), rhs.as_constant()) {
                    (Some(a), Some(b)) if a == b => Interval::Bottom.into_pair(),
                    _ => (*lhs, *rhs),
                }
            }
            CmpPred::Lt => (
                Interval::new(ll, min_opt(lh, rh.map(|h| h - 1))),
                Interval::new(max_opt(rl, ll.map(|l| l + 1)), rh),
            ),
            CmpPred::Le => (
                Interval::new(ll, min_opt(lh, rh)),
                Interval::new(max_opt(rl, ll), rh),
            ),
            CmpPred::Gt => (
                Interval::new(max_opt(ll, rl.map(|l| l + 1)), lh),
                Interval::new(rl, min_opt(rh, lh.map(|h| h - 1))),
            ),
            CmpPred::Ge => (
                Interval::new(max_opt(ll, rl), lh),
                Interval::new(rl, min_opt(rh, lh)),
            ),
        };
        if pair.0.is_bottom() || pair.1.is_bottom() {
            None
        } else {
            Some(pair)
        }
    }

    fn into_pair(self) -> (Self, Self) {
        (self, self)
    }
}

fn min_opt(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (x, None) | (None, x) => x,
    }
}

fn max_opt(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (x, None) | (None, x) => x,
    }
}

impl Lattice for Interval {
    fn bottom() -> Self {
        Interval::Bottom
    }

    fn top() -> Self {
        Interval::Range { lo: None, hi: None }
    }

    fn is_bottom(&self) -> bool {
        matches!(self, Interval::Bottom)
    }

    fn is_top(&self) -> bool {
        matches!(self, Interval::Range { lo: None, hi: None })
    }

    fn join(&self, other: &Self) -> Self {
        match (self.bounds(), other.bounds()) {
            (None, _) => *other,
            (_, None) => *self,
            (Some((al, ah)), Some((bl, bh))) => Interval::new(
                al.zip(bl).map(|(a, b)| a.min(b)),
                ah.zip(bh).map(|(a, b)| a.max(b)),
            ),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self.bounds(), other.bounds()) {
            (None, _) | (_, None) => Interval::Bottom,
            (Some((al, ah)), Some((bl, bh))) => {
                Interval::new(max_opt(al, bl), min_opt(ah, bh))
            }
        }
    }

    fn leq(&self, other: &Self) -> bool {
        self.meet(other) == *self
    }
}
