//! Abstract domains: [`Lattice`] trait plus the [`Interval`], [`Nullability`],
//! and [`Combined`] implementations consumed by the worklist solver.

use std::cmp::Ordering;

/// A finite- or infinite-height abstract domain. `widen`/`narrow` only
/// matter for infinite-ascending-chain domains like [`Interval`]; domains
/// with finite height (like [`Nullability`]) can implement them as plain
/// `join`/adopt-new.
pub trait Lattice: Clone + PartialEq {
    fn bottom() -> Self;
    fn top() -> Self;
    fn join(&self, other: &Self) -> Self;
    fn meet(&self, other: &Self) -> Self;
    fn widen(&self, new: &Self) -> Self;
    fn narrow(&self, new: &Self) -> Self;
}

/// An endpoint of an [`Interval`]: a finite integer or one of the two
/// infinities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    NegInf,
    Finite(i64),
    PosInf,
}

impl Bound {
    fn min(self, other: Bound) -> Bound {
        if self.cmp_bound(&other) == Ordering::Less { self } else { other }
    }

    fn max(self, other: Bound) -> Bound {
        if self.cmp_bound(&other) == Ordering::Greater { self } else { other }
    }

    fn cmp_bound(&self, other: &Bound) -> Ordering {
        fn rank(b: &Bound) -> i128 {
            match b {
                Bound::NegInf => i128::MIN,
                Bound::Finite(v) => *v as i128,
                Bound::PosInf => i128::MAX,
            }
        }
        rank(self).cmp(&rank(other))
    }
}

/// `{⊥} ∪ {[lo, hi] : lo, hi ∈ ℤ ∪ {±∞}, lo ≤ hi}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Interval {
    Bottom,
    Range(Bound, Bound),
}

impl Interval {
    pub fn exact(v: i64) -> Self {
        Interval::Range(Bound::Finite(v), Bound::Finite(v))
    }

    pub fn of_literal(v: i64) -> Self {
        Self::exact(v)
    }

    pub fn contains_zero(&self) -> bool {
        matches!(self, Interval::Range(lo, hi) if lo.cmp_bound(&Bound::Finite(0)) != Ordering::Greater && hi.cmp_bound(&Bound::Finite(0)) != Ordering::Less)
    }

    pub fn add(&self, other: &Interval) -> Interval {
        match (self, other) {
            (Interval::Bottom, _) | (_, Interval::Bottom) => Interval::Bottom,
            (Interval::Range(lo1, hi1), Interval::Range(lo2, hi2)) => {
                Interval::Range(add_bound(*lo1, *lo2), add_bound(*hi1, *hi2))
            }
        }
    }

    pub fn subtract(&self, other: &Interval) -> Interval {
        match (self, other) {
            (Interval::Bottom, _) | (_, Interval::Bottom) => Interval::Bottom,
            (Interval::Range(lo1, hi1), Interval::Range(lo2, hi2)) => {
                Interval::Range(sub_bound(*lo1, *hi2), sub_bound(*hi1, *lo2))
            }
        }
    }

    pub fn multiply(&self, other: &Interval) -> Interval {
        match (self, other) {
            (Interval::Bottom, _) | (_, Interval::Bottom) => Interval::Bottom,
            (Interval::Range(lo1, hi1), Interval::Range(lo2, hi2)) => {
                let candidates = [mul_bound(*lo1, *lo2), mul_bound(*lo1, *hi2), mul_bound(*hi1, *lo2), mul_bound(*hi1, *hi2)];
                let lo = candidates.iter().copied().reduce(Bound::min).unwrap();
                let hi = candidates.iter().copied().reduce(Bound::max).unwrap();
                Interval::Range(lo, hi)
            }
        }
    }

    pub fn divide(&self, other: &Interval) -> Interval {
        if other.contains_zero() {
            return Interval::top();
        }
        match (self, other) {
            (Interval::Bottom, _) | (_, Interval::Bottom) => Interval::Bottom,
            (Interval::Range(lo1, hi1), Interval::Range(lo2, hi2)) => {
                let candidates = [div_bound(*lo1, *lo2), div_bound(*lo1, *hi2), div_bound(*hi1, *lo2), div_bound(*hi1, *hi2)];
                let lo = candidates.iter().copied().reduce(Bound::min).unwrap();
                let hi = candidates.iter().copied().reduce(Bound::max).unwrap();
                Interval::Range(lo, hi)
            }
        }
    }

    pub fn modulo(&self, other: &Interval) -> Interval {
        if other.contains_zero() {
            return Interval::top();
        }
        let bound = match other {
            Interval::Range(lo, hi) => {
                let abs_lo = abs_bound(*lo);
                let abs_hi = abs_bound(*hi);
                abs_lo.max(abs_hi)
            }
            Interval::Bottom => return Interval::Bottom,
        };
        match bound {
            Bound::Finite(d) if d > 0 => Interval::Range(Bound::Finite(0), Bound::Finite(d - 1)),
            _ => Interval::top(),
        }
    }
}

fn add_bound(a: Bound, b: Bound) -> Bound {
    match (a, b) {
        (Bound::NegInf, Bound::PosInf) | (Bound::PosInf, Bound::NegInf) => Bound::PosInf, // saturate rather than produce an undefined ∞−∞
        (Bound::NegInf, _) | (_, Bound::NegInf) => Bound::NegInf,
        (Bound::PosInf, _) | (_, Bound::PosInf) => Bound::PosInf,
        (Bound::Finite(x), Bound::Finite(y)) => x.checked_add(y).map(Bound::Finite).unwrap_or(if x > 0 { Bound::PosInf } else { Bound::NegInf }),
    }
}

fn sub_bound(a: Bound, b: Bound) -> Bound {
    add_bound(a, negate_bound(b))
}

fn negate_bound(b: Bound) -> Bound {
    match b {
        Bound::NegInf => Bound::PosInf,
        Bound::PosInf => Bound::NegInf,
        Bound::Finite(v) => Bound::Finite(-v),
    }
}

fn abs_bound(b: Bound) -> Bound {
    match b {
        Bound::NegInf | Bound::PosInf => Bound::PosInf,
        Bound::Finite(v) => Bound::Finite(v.abs()),
    }
}

fn mul_bound(a: Bound, b: Bound) -> Bound {
    match (a, b) {
        (Bound::Finite(0), _) | (_, Bound::Finite(0)) => Bound::Finite(0),
        (Bound::Finite(x), Bound::Finite(y)) => x.checked_mul(y).map(Bound::Finite).unwrap_or(if (x > 0) == (y > 0) { Bound::PosInf } else { Bound::NegInf }),
        _ => {
            let positive = (sign(a) >= 0) == (sign(b) >= 0);
            if positive { Bound::PosInf } else { Bound::NegInf }
        }
    }
}

fn div_bound(a: Bound, b: Bound) -> Bound {
    match (a, b) {
        (_, Bound::Finite(0)) => Bound::PosInf,
        (Bound::Finite(x), Bound::Finite(y)) => Bound::Finite(x / y),
        _ => {
            let positive = (sign(a) >= 0) == (sign(b) >= 0);
            if positive { Bound::PosInf } else { Bound::NegInf }
        }
    }
}

fn sign(b: Bound) -> i64 {
    match b {
        Bound::NegInf => -1,
        Bound::PosInf => 1,
        Bound::Finite(v) => v.signum(),
    }
}

impl Lattice for Interval {
    fn bottom() -> Self {
        Interval::Bottom
    }

    fn top() -> Self {
        Interval::Range(Bound::NegInf, Bound::PosInf)
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Interval::Bottom, x) | (x, Interval::Bottom) => x.clone(),
            (Interval::Range(lo1, hi1), Interval::Range(lo2, hi2)) => Interval::Range(lo1.min(*lo2), hi1.max(*hi2)),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Interval::Bottom, _) | (_, Interval::Bottom) => Interval::Bottom,
            (Interval::Range(lo1, hi1), Interval::Range(lo2, hi2)) => {
                let lo = lo1.max(*lo2);
                let hi = hi1.min(*hi2);
                if lo.cmp_bound(&hi) == Ordering::Greater { Interval::Bottom } else { Interval::Range(lo, hi) }
            }
        }
    }

    /// Classic Cousot widening: once the new bound exceeds the old one in
    /// the growth direction, jump straight to infinity in that direction.
    fn widen(&self, new: &Self) -> Self {
        match (self, new) {
            (Interval::Bottom, x) => x.clone(),
            (x, Interval::Bottom) => x.clone(),
            (Interval::Range(lo1, hi1), Interval::Range(lo2, hi2)) => {
                let lo = if lo2.cmp_bound(lo1) == Ordering::Less { Bound::NegInf } else { *lo1 };
                let hi = if hi2.cmp_bound(hi1) == Ordering::Greater { Bound::PosInf } else { *hi1 };
                Interval::Range(lo, hi)
            }
        }
    }

    fn narrow(&self, new: &Self) -> Self {
        match (self, new) {
            (Interval::Bottom, _) | (_, Interval::Bottom) => Interval::Bottom,
            (Interval::Range(lo1, hi1), Interval::Range(lo2, hi2)) => {
                let lo = if *lo1 == Bound::NegInf { *lo2 } else { *lo1 };
                let hi = if *hi1 == Bound::PosInf { *hi2 } else { *hi1 };
                Interval::Range(lo, hi)
            }
        }
    }
}

/// `{⊥, definitelyNull, definitelyNonNull, ⊤}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    Bottom,
    DefinitelyNull,
    DefinitelyNonNull,
    Top,
}

impl Nullability {
    /// `applyNonNullConstraint(⊤) = definitelyNonNull`;
    /// `applyNonNullConstraint(definitelyNull) = ⊥`.
    pub fn apply_non_null_constraint(&self) -> Nullability {
        match self {
            Nullability::DefinitelyNull => Nullability::Bottom,
            Nullability::DefinitelyNonNull => Nullability::DefinitelyNonNull,
            Nullability::Top | Nullability::Bottom => Nullability::DefinitelyNonNull,
        }
    }
}

impl Lattice for Nullability {
    fn bottom() -> Self {
        Nullability::Bottom
    }

    fn top() -> Self {
        Nullability::Top
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Nullability::Bottom, x) | (x, Nullability::Bottom) => *x,
            (a, b) if a == b => *a,
            _ => Nullability::Top,
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Nullability::Top, x) | (x, Nullability::Top) => *x,
            (a, b) if a == b => *a,
            _ => Nullability::Bottom,
        }
    }

    fn widen(&self, new: &Self) -> Self {
        self.join(new)
    }

    fn narrow(&self, new: &Self) -> Self {
        self.meet(new)
    }
}

/// Product of [`Interval`] and [`Nullability`]; every operation is
/// pointwise over the two components.
#[derive(Debug, Clone, PartialEq)]
pub struct Combined {
    pub interval: Interval,
    pub nullability: Nullability,
}

impl Combined {
    pub fn new(interval: Interval, nullability: Nullability) -> Self {
        Combined { interval, nullability }
    }
}

impl Lattice for Combined {
    fn bottom() -> Self {
        Combined::new(Interval::bottom(), Nullability::bottom())
    }

    fn top() -> Self {
        Combined::new(Interval::top(), Nullability::top())
    }

    fn join(&self, other: &Self) -> Self {
        Combined::new(self.interval.join(&other.interval), self.nullability.join(&other.nullability))
    }

    fn meet(&self, other: &Self) -> Self {
        Combined::new(self.interval.meet(&other.interval), self.nullability.meet(&other.nullability))
    }

    fn widen(&self, new: &Self) -> Self {
        Combined::new(self.interval.widen(&new.interval), self.nullability.widen(&new.nullability))
    }

    fn narrow(&self, new: &Self) -> Self {
        Combined::new(self.interval.narrow(&new.interval), self.nullability.narrow(&new.nullability))
    }
}
