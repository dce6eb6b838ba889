//! Consumers of the abstract-interpretation results: [`BoundsChecker`] and
//! [`NullVerifier`] classify individual sites rather than re-running the
//! solver themselves.

use std::collections::HashMap;

use super::lattice::{Bound, Combined, Interval, Nullability};
use super::AnalysisState;
use crate::ir::Variable;

/// Classification for an array/list index access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsVerdict {
    Safe,
    DefinitelyUnsafe,
    Unknown,
}

/// Registers known container lengths by name and classifies index accesses
/// against `[0, len-1]`.
#[derive(Debug, Default)]
pub struct BoundsChecker {
    lengths: HashMap<String, i64>,
}

impl BoundsChecker {
    pub fn new() -> Self {
        BoundsChecker::default()
    }

    pub fn register_length(&mut self, container: impl Into<String>, len: i64) {
        self.lengths.insert(container.into(), len);
    }

    /// Classify `state[index_var]` against the registered length of
    /// `container`. `Unknown` covers both "length never registered" and
    /// "interval straddles the boundary".
    pub fn classify(&self, container: &str, index_var: &Variable, state: &AnalysisState<Combined>) -> BoundsVerdict {
        let Some(&len) = self.lengths.get(container) else { return BoundsVerdict::Unknown };
        let valid_range = Interval::Range(Bound::Finite(0), Bound::Finite(len - 1));
        let index_interval = state.get(index_var).interval;

        match &index_interval {
            Interval::Bottom => BoundsVerdict::Unknown,
            Interval::Range(lo, hi) => {
                let fully_inside = valid_range.meet(&index_interval) == index_interval;
                if fully_inside {
                    return BoundsVerdict::Safe;
                }
                let fully_outside = matches!(valid_range.meet(&index_interval), Interval::Bottom);
                if fully_outside {
                    return BoundsVerdict::DefinitelyUnsafe;
                }
                let _ = (lo, hi);
                BoundsVerdict::Unknown
            }
        }
    }
}

/// Classification for a dereference site (call with receiver, field
/// access, index access).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullVerdict {
    Safe,
    DefinitelyNull,
    Unknown,
}

/// Classifies a receiver's nullability at a dereference site.
#[derive(Debug, Default)]
pub struct NullVerifier;

impl NullVerifier {
    pub fn new() -> Self {
        NullVerifier
    }

    pub fn classify(&self, receiver: &Variable, state: &AnalysisState<Combined>) -> NullVerdict {
        match state.get(receiver).nullability {
            Nullability::DefinitelyNonNull => NullVerdict::Safe,
            Nullability::DefinitelyNull => NullVerdict::DefinitelyNull,
            Nullability::Top | Nullability::Bottom => NullVerdict::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::absint::lattice::Lattice;

    fn state_with(var: &str, interval: Interval, nullability: Nullability) -> AnalysisState<Combined> {
        let mut state = AnalysisState::empty();
        state.set(Variable::unversioned(var), Combined::new(interval, nullability));
        state
    }

    #[test]
    fn index_within_registered_length_is_safe() {
        let mut checker = BoundsChecker::new();
        checker.register_length("items", 10);
        let state = state_with("i", Interval::exact(3), Nullability::top());
        assert_eq!(checker.classify("items", &Variable::unversioned("i"), &state), BoundsVerdict::Safe);
    }

    #[test]
    fn index_past_registered_length_is_unsafe() {
        let mut checker = BoundsChecker::new();
        checker.register_length("items", 10);
        let state = state_with("i", Interval::exact(10), Nullability::top());
        assert_eq!(checker.classify("items", &Variable::unversioned("i"), &state), BoundsVerdict::DefinitelyUnsafe);
    }

    #[test]
    fn unregistered_container_is_unknown() {
        let checker = BoundsChecker::new();
        let state = state_with("i", Interval::exact(0), Nullability::top());
        assert_eq!(checker.classify("items", &Variable::unversioned("i"), &state), BoundsVerdict::Unknown);
    }

    #[test]
    fn definitely_null_receiver_is_flagged() {
        let verifier = NullVerifier::new();
        let state = state_with("x", Interval::top(), Nullability::DefinitelyNull);
        assert_eq!(verifier.classify(&Variable::unversioned("x"), &state), NullVerdict::DefinitelyNull);
    }

    #[test]
    fn definitely_non_null_receiver_is_safe() {
        let verifier = NullVerifier::new();
        let state = state_with("x", Interval::top(), Nullability::DefinitelyNonNull);
        assert_eq!(verifier.classify(&Variable::unversioned("x"), &state), NullVerdict::Safe);
    }
}
