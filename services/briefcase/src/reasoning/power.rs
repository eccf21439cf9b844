//! Combinatorial power of cases and case bases
//!
//! Power counts how many (reason, defeated) dominance pairs a case or a whole
//! order implies once every superset of a reason and every non-empty subset of
//! a defeated set are taken into account.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::reasoning::case::Case;
use crate::reasoning::factor::{Factor, FactorSet, Polarity};
use crate::reasoning::priority_order::PriorityOrder;

/// Factors observed so far, split by polarity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactorUniverse {
    pi: BTreeSet<Factor>,
    delta: BTreeSet<Factor>,
}

impl FactorUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a case's reason under its decision and its defeated factors under
    /// the opposite polarity
    pub fn absorb(&mut self, case: &Case) {
        let reason_polarity = case.decision();
        let defeated_polarity = reason_polarity.opposite();

        for factor in case.reason() {
            if let Some(bucket) = self.bucket_mut(reason_polarity) {
                bucket.insert(factor.clone());
            }
        }
        for factor in case.defeated() {
            if let Some(bucket) = self.bucket_mut(defeated_polarity) {
                bucket.insert(factor.clone());
            }
        }
    }

    pub fn factors(&self, polarity: Polarity) -> Option<&BTreeSet<Factor>> {
        match polarity {
            Polarity::Pi => Some(&self.pi),
            Polarity::Delta => Some(&self.delta),
            Polarity::Un => None,
        }
    }

    pub fn count(&self, polarity: Polarity) -> usize {
        self.factors(polarity).map(|f| f.len()).unwrap_or(0)
    }

    fn bucket_mut(&mut self, polarity: Polarity) -> Option<&mut BTreeSet<Factor>> {
        match polarity {
            Polarity::Pi => Some(&mut self.pi),
            Polarity::Delta => Some(&mut self.delta),
            Polarity::Un => None,
        }
    }
}

/// Theoretical ceiling on dominance pairs per winning polarity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerCeiling {
    pub pi: u64,
    pub delta: u64,
}

impl PowerCeiling {
    pub fn for_decision(&self, decision: Polarity) -> u64 {
        match decision {
            Polarity::Pi => self.pi,
            Polarity::Delta => self.delta,
            Polarity::Un => 0,
        }
    }
}

fn pow2(exp: usize) -> u64 {
    u32::try_from(exp)
        .ok()
        .map(|e| 2u64.saturating_pow(e))
        .unwrap_or(u64::MAX)
}

/// Ways to extend a reason of `reason_len` factors within a universe of
/// `universe_size` factors of the same polarity. Zero for an empty reason.
pub fn supersets_count(universe_size: usize, reason_len: usize) -> u64 {
    if reason_len == 0 {
        return 0;
    }
    pow2(universe_size.saturating_sub(reason_len))
}

/// Non-empty subsets of a defeated set of `defeated_len` factors
pub fn subsets_count(defeated_len: usize) -> u64 {
    pow2(defeated_len).saturating_sub(1)
}

/// Ceiling for a universe: `2^(|pi|-1) * (2^|delta| - 1)` for pi, symmetric for delta.
/// A polarity with no observed factors has a ceiling of zero.
pub fn max_edges(universe: &FactorUniverse) -> PowerCeiling {
    let p = universe.count(Polarity::Pi);
    let d = universe.count(Polarity::Delta);

    let ceiling = |winning: usize, losing: usize| -> u64 {
        if winning == 0 {
            return 0;
        }
        pow2(winning - 1).saturating_mul(subsets_count(losing))
    };

    PowerCeiling {
        pi: ceiling(p, d),
        delta: ceiling(d, p),
    }
}

/// Power of a single case against `universe` extended by the case's own factors.
/// The universe itself is left untouched.
pub fn case_power(universe: &FactorUniverse, case: &Case) -> u64 {
    let decision = case.decision();
    let reason = case.reason();

    let known = universe.factors(decision);
    let unseen = reason
        .iter()
        .filter(|factor| known.map(|k| !k.contains(*factor)).unwrap_or(true))
        .count();
    let universe_size = universe.count(decision) + unseen;

    supersets_count(universe_size, reason.len()).saturating_mul(subsets_count(case.defeated().len()))
}

/// Every non-empty subset of `set`
fn non_proper_subsets(set: &FactorSet) -> Vec<FactorSet> {
    let mut subsets: Vec<Vec<Factor>> = vec![Vec::new()];
    for factor in set {
        let extended: Vec<Vec<Factor>> = subsets
            .iter()
            .map(|subset| {
                let mut next = subset.clone();
                next.push(factor.clone());
                next
            })
            .collect();
        subsets.extend(extended);
    }

    subsets
        .into_iter()
        .filter(|subset| !subset.is_empty())
        .map(|subset| subset.into_iter().collect())
        .collect()
}

/// `reason ∪ S` for every non-empty `S` drawn from the universe of the
/// reason's polarity. Yields `2^(|universe| - |reason|)` sets.
fn non_proper_supersets(universe: &FactorUniverse, reason: &FactorSet) -> Vec<FactorSet> {
    let known = match reason.polarity().and_then(|p| universe.factors(p)) {
        Some(known) if !known.is_empty() => known,
        _ => return Vec::new(),
    };

    let overlaps = known.iter().any(|factor| reason.contains(factor));
    let outside: Vec<&Factor> = known.iter().filter(|f| !reason.contains(f)).collect();

    let mut extensions: Vec<Vec<&Factor>> = vec![Vec::new()];
    for factor in outside {
        let extended: Vec<Vec<&Factor>> = extensions
            .iter()
            .map(|ext| {
                let mut next = ext.clone();
                next.push(factor);
                next
            })
            .collect();
        extensions.extend(extended);
    }

    extensions
        .into_iter()
        // the reason alone is only reachable through a factor it already holds
        .filter(|ext| overlaps || !ext.is_empty())
        .map(|ext| reason.iter().chain(ext).cloned().collect())
        .collect()
}

/// Power of the whole order: distinct (weaker defeated, stronger reason) pairs
/// obtained by expanding every recorded pair.
///
/// Cost is exponential in the number of observed factors per polarity and in
/// the size of each defeated set; only practical for small factor universes.
pub fn cb_power(universe: &FactorUniverse, order: &PriorityOrder) -> u64 {
    let mut edges: HashMap<FactorSet, HashSet<FactorSet>> = HashMap::new();

    for (defeated, reasons) in order.entries() {
        let supersets: HashSet<FactorSet> = reasons
            .iter()
            .flat_map(|reason| non_proper_supersets(universe, reason))
            .collect();

        for subset in non_proper_subsets(defeated) {
            edges.entry(subset).or_default().extend(supersets.iter().cloned());
        }
    }

    edges.values().map(|reasons| reasons.len() as u64).sum()
}

/// Tracks the factor universe of a case base and answers power queries
#[derive(Debug, Clone, Default)]
pub struct PowerDetector {
    universe: FactorUniverse,
}

impl PowerDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, case: &Case) {
        self.universe.absorb(case);
    }

    pub fn universe(&self) -> &FactorUniverse {
        &self.universe
    }

    pub fn max_edges(&self) -> PowerCeiling {
        max_edges(&self.universe)
    }

    pub fn case_power(&self, case: &Case) -> u64 {
        case_power(&self.universe, case)
    }

    pub fn cb_power(&self, order: &PriorityOrder) -> u64 {
        cb_power(&self.universe, order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::case::CaseRecord;

    fn make_case(pi: &[&str], delta: &[&str], reason: &[&str], decision: &str) -> Case {
        Case::from_record(&CaseRecord::new(pi, delta, reason, decision)).unwrap()
    }

    fn detector_with(cases: &[Case]) -> (PowerDetector, PriorityOrder) {
        let mut detector = PowerDetector::new();
        let mut order = PriorityOrder::new();
        for case in cases {
            order.unsafe_add_case(case);
            detector.absorb(case);
        }
        (detector, order)
    }

    #[test]
    fn test_absorb_splits_by_polarity() {
        let (detector, _) = detector_with(&[
            make_case(&["p1", "p2"], &["d1"], &["p1"], "pi"),
            make_case(&["p3"], &["d2"], &["d2"], "delta"),
        ]);

        let universe = detector.universe();
        // p2 is never cited nor defeated
        assert_eq!(universe.count(Polarity::Pi), 2);
        assert_eq!(universe.count(Polarity::Delta), 2);
        assert!(universe.factors(Polarity::Pi).unwrap().contains(&Factor::pi("p3")));
    }

    #[test]
    fn test_max_edges() {
        let (detector, _) = detector_with(&[
            make_case(&["p1"], &["d1"], &["p1"], "pi"),
            make_case(&["p2"], &["d1"], &["p2"], "pi"),
        ]);

        // 2 pi factors, 1 delta factor
        let ceiling = detector.max_edges();
        assert_eq!(ceiling.pi, 2);
        assert_eq!(ceiling.delta, 3);
        assert_eq!(PowerDetector::new().max_edges(), PowerCeiling::default());
    }

    #[test]
    fn test_case_power_counts() {
        let (detector, _) = detector_with(&[make_case(&["p1", "p2", "p3"], &["d1"], &["p1", "p2", "p3"], "pi")]);

        // reason {p1} in a universe of 3 pi factors, defeated {d1, d2}
        let case = make_case(&["p1"], &["d1", "d2"], &["p1"], "pi");
        assert_eq!(detector.case_power(&case), 4 * 3);

        // an unseen reason factor counts toward the universe for this call only
        let case = make_case(&["p4"], &["d1"], &["p4"], "pi");
        assert_eq!(detector.case_power(&case), 8);
        assert_eq!(detector.universe().count(Polarity::Pi), 3);
    }

    #[test]
    fn test_empty_reason_has_no_power() {
        let case = make_case(&["p1"], &["d1"], &[], "pi");
        assert_eq!(case_power(&FactorUniverse::new(), &case), 0);
        assert_eq!(supersets_count(5, 0), 0);
        assert_eq!(subsets_count(0), 0);
    }

    #[test]
    fn test_case_power_within_ceiling() {
        let cases = vec![
            make_case(&["p1", "p2"], &["d1", "d2"], &["p1"], "pi"),
            make_case(&["p1", "p3"], &["d2", "d3"], &["d2", "d3"], "delta"),
            make_case(&["p2", "p3"], &["d1"], &["p2", "p3"], "pi"),
        ];
        let (detector, _) = detector_with(&cases);
        let ceiling = detector.max_edges();

        for case in &cases {
            assert!(detector.case_power(case) <= ceiling.for_decision(case.decision()));
        }
    }

    #[test]
    fn test_singleton_cb_power_matches_case_power() {
        let cases = vec![
            make_case(&["p1"], &["d1"], &["p1"], "pi"),
            make_case(&["p1", "p2"], &["d1", "d2", "d3"], &["p1", "p2"], "pi"),
            make_case(&["p1"], &["d1", "d2"], &["d2"], "delta"),
        ];

        for case in cases {
            let empty = PowerDetector::new();
            let expected = empty.case_power(&case);

            let (detector, order) = detector_with(&[case]);
            assert_eq!(detector.cb_power(&order), expected);
        }
    }

    #[test]
    fn test_cb_power_accumulates() {
        let (detector, order) = detector_with(&[make_case(&["p1"], &["d1"], &["p1"], "pi")]);
        assert_eq!(detector.cb_power(&order), 1);

        // second case adds {p2} > {d1}, and {p1} vs {p2} are incomparable
        let (detector, order) = detector_with(&[
            make_case(&["p1"], &["d1"], &["p1"], "pi"),
            make_case(&["p2"], &["d1"], &["p2"], "pi"),
        ]);
        // supersets over {p1, p2}: {p1}, {p2}, {p1, p2} all beat {d1}
        assert_eq!(detector.cb_power(&order), 3);
    }

    #[test]
    fn test_subset_enumeration() {
        let set: FactorSet = ["a", "b", "c"].iter().map(|n| Factor::delta(n)).collect();
        assert_eq!(non_proper_subsets(&set).len(), 7);
        assert!(non_proper_subsets(&FactorSet::new()).is_empty());
    }
}
