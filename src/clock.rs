/// Vector clocks and causal contexts.
///
/// A vector clock maps node ids to monotonic counters and induces the
/// happens-before partial order between writes. Every stored value carries
/// one inside its [`Context`]; the coordinator advances its own component on
/// each client `put`, and clients resolve sibling conflicts by combining the
/// clocks of the versions they have read.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Vector clock for causal ordering between replicas.
///
/// An absent node id is equivalent to a counter of zero for [`increment`]
/// and [`combine`]. Comparison is deliberately asymmetric: see
/// [`less_than`] for the exact rule.
///
/// [`increment`]: VectorClock::increment
/// [`combine`]: VectorClock::combine
/// [`less_than`]: VectorClock::less_than
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorClock {
    /// Node id -> logical counter mapping.
    counters: HashMap<String, u64>,
}

impl VectorClock {
    /// Create a new empty vector clock.
    pub fn new() -> Self {
        Self {
            counters: HashMap::new(),
        }
    }

    /// Advance the counter for `node_id`, creating it at zero first if absent.
    pub fn increment(&mut self, node_id: &str) {
        let counter = self.counters.entry(node_id.to_string()).or_insert(0);
        *counter += 1;
    }

    /// True iff `other` is causally descended from this clock.
    ///
    /// The rule is asymmetric on purpose: every id in `self` must exist in
    /// `other` with a counter at least as large, while ids present only in
    /// `other` do not block the comparison. Clocks produced by the system's
    /// own increment/combine discipline accumulate a union of ids over time,
    /// for which this coincides with the textbook partial order. Callers
    /// comparing clocks with disjoint id sets should [`combine`] first.
    ///
    /// [`combine`]: VectorClock::combine
    pub fn less_than(&self, other: &VectorClock) -> bool {
        if self == other {
            return false;
        }

        self.counters.iter().all(|(node_id, counter)| {
            other
                .counters
                .get(node_id)
                .is_some_and(|other_counter| counter <= other_counter)
        })
    }

    /// True iff the clocks are causally unordered.
    ///
    /// Equal clocks are not concurrent: concurrency requires that the clocks
    /// differ and that neither is descended from the other.
    pub fn concurrent(&self, other: &VectorClock) -> bool {
        self != other && !self.less_than(other) && !other.less_than(self)
    }

    /// Make this clock causally descended from every clock in `others` by
    /// taking the pointwise maximum of each counter.
    pub fn combine<'a>(&mut self, others: impl IntoIterator<Item = &'a VectorClock>) {
        for other in others {
            for (node_id, counter) in &other.counters {
                let own = self.counters.entry(node_id.clone()).or_insert(0);
                *own = (*own).max(*counter);
            }
        }
    }

    /// Read the counter for `node_id` (zero if absent).
    pub fn counter(&self, node_id: &str) -> u64 {
        self.counters.get(node_id).copied().unwrap_or(0)
    }

    /// Number of node ids with an explicit counter.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// True if no node id has an explicit counter.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for VectorClock {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self {
            counters: iter.into_iter().map(|(id, c)| (id.into(), c)).collect(),
        }
    }
}

/// Causal context attached to every value and every `Put`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// The vector clock carried by the value.
    pub clock: VectorClock,
}

impl Context {
    /// Wrap a vector clock in a context.
    pub fn new(clock: VectorClock) -> Self {
        Self { clock }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn clock(entries: &[(&str, u64)]) -> VectorClock {
        entries.iter().map(|&(id, c)| (id, c)).collect()
    }

    #[test]
    fn empty_clocks_are_equal_and_not_concurrent() {
        let a = VectorClock::new();
        let b = VectorClock::new();

        assert_eq!(a, b);
        assert!(!a.less_than(&b));
        assert!(!a.concurrent(&b));
    }

    #[test]
    fn clock_is_not_ordered_against_itself() {
        let mut v = VectorClock::new();
        v.increment("n0");
        v.increment("n1");

        assert_eq!(v, v.clone());
        assert!(!v.less_than(&v.clone()));
        assert!(!v.concurrent(&v.clone()));
    }

    #[test]
    fn increment_creates_strict_descendant() {
        let empty = VectorClock::new();
        let mut v = VectorClock::new();
        v.increment("n0");

        assert_eq!(v.counter("n0"), 1);
        assert!(empty.less_than(&v));
        assert!(!v.less_than(&empty));
        assert!(!empty.concurrent(&v));
    }

    #[test]
    fn increment_twice_counts_up() {
        let mut v = VectorClock::new();
        v.increment("n0");
        v.increment("n0");

        assert_eq!(v.counter("n0"), 2);
        assert!(clock(&[("n0", 1)]).less_than(&v));
    }

    #[test]
    fn less_than_requires_every_own_id_in_other() {
        // "n1" is missing from `b`, so `a` is not less than `b` even though
        // the shared component is smaller.
        let a = clock(&[("n0", 1), ("n1", 1)]);
        let b = clock(&[("n0", 2)]);

        assert!(!a.less_than(&b));
        // The reverse direction only inspects `b`'s ids.
        assert!(b.less_than(&clock(&[("n0", 2), ("n1", 1)])));
    }

    #[test]
    fn ids_only_in_other_do_not_block_less_than() {
        let a = clock(&[("n0", 1)]);
        let b = clock(&[("n0", 1), ("n1", 3)]);

        assert!(a.less_than(&b));
        assert!(!b.less_than(&a));
        assert!(!a.concurrent(&b));
    }

    #[test]
    fn disjoint_ids_are_concurrent() {
        let a = clock(&[("n0", 1)]);
        let b = clock(&[("n1", 1)]);

        assert!(!a.less_than(&b));
        assert!(!b.less_than(&a));
        assert!(a.concurrent(&b));
    }

    #[test]
    fn crossed_counters_are_concurrent() {
        let a = clock(&[("n0", 2), ("n1", 1)]);
        let b = clock(&[("n0", 1), ("n1", 2)]);

        assert!(a.concurrent(&b));
        assert!(b.concurrent(&a));
    }

    #[test]
    fn combine_takes_pointwise_max() {
        let mut combined = VectorClock::new();
        combined.combine([&clock(&[("n0", 2), ("n1", 1)]), &clock(&[("n1", 4), ("n2", 1)])]);

        assert_eq!(combined, clock(&[("n0", 2), ("n1", 4), ("n2", 1)]));
    }

    #[test]
    fn combine_makes_inputs_ancestors() {
        let a = clock(&[("n0", 1)]);
        let b = clock(&[("n1", 2)]);

        let mut combined = VectorClock::new();
        combined.combine([&a, &b]);

        // Inputs with distinct id domains become strict ancestors.
        assert!(a.less_than(&combined));
        assert!(b.less_than(&combined));
        assert!(!a.concurrent(&combined));
        assert!(!b.concurrent(&combined));
    }

    proptest! {
        #[test]
        fn combined_clock_dominates_every_input(
            a in proptest::collection::hash_map("[a-d]", 0u64..8, 0..4),
            b in proptest::collection::hash_map("[a-d]", 0u64..8, 0..4),
        ) {
            let a: VectorClock = a.into_iter().collect();
            let b: VectorClock = b.into_iter().collect();

            let mut combined = a.clone();
            combined.combine([&b]);

            // Neither input may be concurrent with the combined clock.
            prop_assert!(!a.concurrent(&combined));
            prop_assert!(!b.concurrent(&combined));
            // And each input is either equal to it or a strict ancestor.
            prop_assert!(a == combined || a.less_than(&combined));
            prop_assert!(b == combined || b.less_than(&combined));
        }
    }
}
