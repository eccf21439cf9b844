//! Indexed priority order over factor sets
//!
//! The order maps every observed defeated set to the reason sets known to be
//! at least as strong as it. The transitive closure is materialized eagerly on
//! insertion, so consistency queries only have to look up supersets of the
//! candidate reason through the inverted factor index.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::reasoning::case::Case;
use crate::reasoning::factor::{Factor, FactorSet};

/// A recorded dominance: `reason` is at least as strong as `defeated`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderPair {
    pub reason: FactorSet,
    pub defeated: FactorSet,
}

impl OrderPair {
    pub fn new(reason: FactorSet, defeated: FactorSet) -> Self {
        Self { reason, defeated }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PriorityOrder {
    /// defeated set -> reasons dominating it
    order: HashMap<FactorSet, BTreeSet<FactorSet>>,
    /// factor -> every indexed defeated set containing it
    defeated_factor_index: HashMap<Factor, HashSet<FactorSet>>,
}

impl PriorityOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded (reason, defeated) pairs
    pub fn len(&self) -> usize {
        self.order.values().map(|reasons| reasons.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Reasons recorded as dominating `defeated`
    pub fn reasons_for(&self, defeated: &FactorSet) -> Option<&BTreeSet<FactorSet>> {
        self.order.get(defeated)
    }

    /// Iterate every defeated set with its dominating reasons
    pub fn entries(&self) -> impl Iterator<Item = (&FactorSet, &BTreeSet<FactorSet>)> {
        self.order.iter()
    }

    /// All recorded pairs, sorted
    pub fn pairs(&self) -> Vec<OrderPair> {
        let mut pairs: Vec<OrderPair> = self
            .order
            .iter()
            .flat_map(|(defeated, reasons)| {
                reasons
                    .iter()
                    .map(move |reason| OrderPair::new(reason.clone(), defeated.clone()))
            })
            .collect();
        pairs.sort();
        pairs
    }

    /// Record `reason` as dominating `defeated` and index the defeated set
    /// under each of its factors. Empty sides carry no information and are dropped.
    pub fn add_order_with_subsets(&mut self, reason: &FactorSet, defeated: &FactorSet) {
        if reason.is_empty() || defeated.is_empty() {
            return;
        }

        self.order
            .entry(defeated.clone())
            .or_default()
            .insert(reason.clone());

        for factor in defeated {
            self.defeated_factor_index
                .entry(factor.clone())
                .or_default()
                .insert(defeated.clone());
        }
    }

    /// Indexed defeated sets that are supersets of `factor_set`
    pub fn get_stronger_defeats(&self, factor_set: &FactorSet) -> HashSet<FactorSet> {
        if factor_set.is_empty() {
            return HashSet::new();
        }

        let mut buckets = Vec::with_capacity(factor_set.len());
        for factor in factor_set {
            match self.defeated_factor_index.get(factor) {
                Some(bucket) => buckets.push(bucket),
                // some factor was never defeated, so no superset exists
                None => return HashSet::new(),
            }
        }

        // intersect smallest buckets first
        buckets.sort_by_key(|bucket| bucket.len());
        let (first, rest) = match buckets.split_first() {
            Some(split) => split,
            None => return HashSet::new(),
        };

        first
            .iter()
            .filter(|candidate| rest.iter().all(|bucket| bucket.contains(*candidate)))
            .cloned()
            .collect()
    }

    /// Indexed defeated sets that are subsets of `factor_set`.
    ///
    /// There is no index shortcut for subsets; every bucket touched by the
    /// set is scanned and filtered.
    pub fn get_weaker_defeats(&self, factor_set: &FactorSet) -> HashSet<FactorSet> {
        let mut weaker = HashSet::new();

        for factor in factor_set {
            if let Some(bucket) = self.defeated_factor_index.get(factor) {
                for candidate in bucket {
                    if candidate.is_subset(factor_set) {
                        weaker.insert(candidate.clone());
                    }
                }
            }
        }

        weaker
    }

    /// Record the subset relation between two reasons, the larger set dominating.
    pub fn add_pair_as_appropriate(&mut self, r1: &FactorSet, r2: &FactorSet) {
        if r1 == r2 {
            return;
        }
        if r1.is_subset(r2) {
            self.add_order_with_subsets(r2, r1);
        } else if r2.is_subset(r1) {
            self.add_order_with_subsets(r1, r2);
        }
    }

    /// Insert a case without any consistency check, then relate its reason to
    /// every set already in the order.
    pub fn unsafe_add_case(&mut self, case: &Case) {
        let reason = case.reason();
        self.add_order_with_subsets(reason, case.defeated());

        // pairs derived below must only be compared against the order as it
        // stood before this insertion
        let snapshot: Vec<(FactorSet, Vec<FactorSet>)> = self
            .order
            .iter()
            .map(|(defeated, reasons)| (defeated.clone(), reasons.iter().cloned().collect()))
            .collect();

        for (defeated, reasons) in &snapshot {
            self.add_pair_as_appropriate(reason, defeated);
            for other_reason in reasons {
                self.add_pair_as_appropriate(reason, other_reason);
            }
        }

        tracing::debug!(
            reason = %reason,
            defeated = %case.defeated(),
            pairs = self.len(),
            "Added case to priority order"
        );
    }

    /// False when something the new reason would defeat is already known to be
    /// at least as strong as it.
    pub fn is_consistent(&self, new_reason: &FactorSet, new_defeated: &FactorSet) -> bool {
        !self
            .get_stronger_defeats(new_reason)
            .iter()
            .filter_map(|superset| self.order.get(superset))
            .any(|reasons| reasons.iter().any(|reason| reason.is_subset(new_defeated)))
    }

    /// True when every recorded pair is consistent with the rest of the order
    pub fn is_cb_consistent(&self) -> bool {
        self.order.iter().all(|(defeated, reasons)| {
            reasons
                .iter()
                .all(|reason| self.is_consistent(reason, defeated))
        })
    }

    /// True when a recorded pair already claims something at least as strong:
    /// a defeated set at least as large beaten by a reason no larger.
    pub fn is_existing_claim(&self, new_reason: &FactorSet, new_defeated: &FactorSet) -> bool {
        self.get_stronger_defeats(new_defeated)
            .iter()
            .filter_map(|superset| self.order.get(superset))
            .any(|reasons| reasons.iter().any(|reason| new_reason.is_superset(reason)))
    }

    /// Every recorded pair that conflicts with the candidate
    pub fn get_incons_pairs_with_case(
        &self,
        new_reason: &FactorSet,
        new_defeated: &FactorSet,
    ) -> Vec<OrderPair> {
        let mut pairs = Vec::new();

        for superset in self.get_stronger_defeats(new_reason) {
            if let Some(reasons) = self.order.get(&superset) {
                for reason in reasons {
                    if reason.is_subset(new_defeated) {
                        pairs.push(OrderPair::new(reason.clone(), superset.clone()));
                    }
                }
            }
        }

        pairs.sort();
        pairs
    }

    /// Recorded pairs with the same reason beating a superset of `new_defeated`
    pub fn get_dominated_pairs(
        &self,
        new_reason: &FactorSet,
        new_defeated: &FactorSet,
    ) -> Vec<OrderPair> {
        self.pairs_with_reason(new_reason, self.get_stronger_defeats(new_defeated))
    }

    /// Recorded pairs with the same reason beating a subset of `new_defeated`
    pub fn get_dominating_pairs(
        &self,
        new_reason: &FactorSet,
        new_defeated: &FactorSet,
    ) -> Vec<OrderPair> {
        self.pairs_with_reason(new_reason, self.get_weaker_defeats(new_defeated))
    }

    fn pairs_with_reason(
        &self,
        reason: &FactorSet,
        defeats: HashSet<FactorSet>,
    ) -> Vec<OrderPair> {
        let mut pairs: Vec<OrderPair> = defeats
            .into_iter()
            .filter(|defeated| {
                self.order
                    .get(defeated)
                    .map(|reasons| reasons.contains(reason))
                    .unwrap_or(false)
            })
            .map(|defeated| OrderPair::new(reason.clone(), defeated))
            .collect();
        pairs.sort();
        pairs
    }

    /// True when the exact pair is recorded
    pub fn contains_pair(&self, reason: &FactorSet, defeated: &FactorSet) -> bool {
        self.order
            .get(defeated)
            .map(|reasons| reasons.contains(reason))
            .unwrap_or(false)
    }
}

impl fmt::Display for PriorityOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Priority Order:")?;
        let mut defeated_sets: Vec<&FactorSet> = self.order.keys().collect();
        defeated_sets.sort();
        for defeated in defeated_sets {
            let reasons: Vec<String> = self.order[defeated]
                .iter()
                .map(|reason| reason.to_string())
                .collect();
            writeln!(f, "Defeated: {}, Reasons: [{}]", defeated, reasons.join(", "))?;
        }
        Ok(())
    }
}
