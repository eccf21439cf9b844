//! Case base: admitted precedents with their priority order and power tracking

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::reasoning::admissibility::{classify, Policy, Tolerance, Verdict};
use crate::reasoning::case::Case;
use crate::reasoning::error::BriefcaseError;
use crate::reasoning::power::{PowerCeiling, PowerDetector};
use crate::reasoning::priority_order::PriorityOrder;

/// Case base behaviour switches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseBaseConfig {
    /// Admit cases with an empty reason or defeated side without indexing
    /// them. When false such cases are rejected.
    #[serde(default = "default_allow_empty_side")]
    pub allow_empty_side: bool,
}

fn default_allow_empty_side() -> bool {
    true
}

impl Default for CaseBaseConfig {
    fn default() -> Self {
        Self {
            allow_empty_side: default_allow_empty_side(),
        }
    }
}

/// How an admitted case related to the order when it went in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionKind {
    /// Inserted without any check
    Unchecked,
    Consistent,
    /// Conflicting, but already implied by the order
    ExistingClaim,
    /// Conflicting and let in by a permissive policy
    Tolerated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerStats {
    pub cb_power: u64,
    pub max_edges: PowerCeiling,
}

/// Summary of a case base
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseBaseMetrics {
    pub size: usize,
    pub tainted: usize,
    pub power: PowerStats,
    pub admissions: BTreeMap<AdmissionKind, usize>,
}

/// Result of admitting cases in order until one is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionRun {
    pub admitted: usize,
    /// Index of the first refused case, if any was refused
    pub rejected_at: Option<usize>,
    pub power: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CaseBase {
    config: CaseBaseConfig,
    cases: Vec<Case>,
    order: PriorityOrder,
    power: PowerDetector,
    admissions: BTreeMap<AdmissionKind, usize>,
}

impl CaseBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CaseBaseConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Build a case base from a list, inserting every case without checks
    pub fn from_cases<I: IntoIterator<Item = Case>>(cases: I) -> Self {
        let mut case_base = Self::new();
        for case in cases {
            case_base.unsafe_add_case(case);
        }
        case_base
    }

    /// Build a case base from a list without admissibility checks. Cases
    /// with an empty side are skipped unless the config allows them.
    pub fn from_cases_with_config<I: IntoIterator<Item = Case>>(config: CaseBaseConfig, cases: I) -> Self {
        let mut case_base = Self::with_config(config);
        for case in cases {
            if case.has_empty_side() && !case_base.config.allow_empty_side {
                tracing::warn!(case = %case, "Skipping case with an empty reason or defeated side");
                continue;
            }
            case_base.unsafe_add_case(case);
        }
        case_base
    }

    pub fn config(&self) -> &CaseBaseConfig {
        &self.config
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn order(&self) -> &PriorityOrder {
        &self.order
    }

    pub fn power(&self) -> &PowerDetector {
        &self.power
    }

    /// Append a case and index it with no admissibility check
    pub fn unsafe_add_case(&mut self, case: Case) {
        self.commit(case, AdmissionKind::Unchecked);
    }

    /// Admit `case` if `policy` allows it. Returns whether it was admitted;
    /// a refused case leaves the case base untouched. A case with an empty
    /// side still goes through the policy but is never indexed.
    pub fn add_case(&mut self, case: Case, policy: Policy) -> bool {
        if case.has_empty_side() && !self.config.allow_empty_side {
            tracing::warn!(case = %case, "Rejected case with an empty reason or defeated side");
            return false;
        }

        if !policy.admits(&self.order, &self.cases, &case) {
            tracing::debug!(policy = %policy, case = %case, "Case refused");
            return false;
        }

        let kind = if self.order.is_consistent(case.reason(), case.defeated()) {
            AdmissionKind::Consistent
        } else if self.order.is_existing_claim(case.reason(), case.defeated()) {
            AdmissionKind::ExistingClaim
        } else {
            AdmissionKind::Tolerated
        };

        tracing::debug!(policy = %policy, kind = ?kind, case = %case, "Case admitted");
        self.commit(case, kind);
        true
    }

    /// Admit under a policy given by name
    pub fn add_case_named(&mut self, case: Case, policy: &str) -> Result<bool, BriefcaseError> {
        let policy: Policy = policy.parse()?;
        Ok(self.add_case(case, policy))
    }

    /// Offer every case under `policy`, returning how many were admitted
    pub fn add_cases<I: IntoIterator<Item = Case>>(&mut self, cases: I, policy: Policy) -> usize {
        let mut admitted = 0;
        for case in cases {
            if self.add_case(case, policy) {
                admitted += 1;
            }
        }
        admitted
    }

    /// Admit cases in order, stopping at the first refusal. The reported
    /// power is a full `cb_power` computation.
    pub fn admit_until_rejected<I: IntoIterator<Item = Case>>(
        &mut self,
        cases: I,
        policy: Policy,
    ) -> AdmissionRun {
        let mut admitted = 0;
        let mut rejected_at = None;

        for (index, case) in cases.into_iter().enumerate() {
            if !self.add_case(case, policy) {
                rejected_at = Some(index);
                break;
            }
            admitted += 1;
        }

        let run = AdmissionRun {
            admitted,
            rejected_at,
            power: self.power.cb_power(&self.order),
        };
        tracing::debug!(admitted = run.admitted, rejected_at = ?run.rejected_at, "Admission run finished");
        run
    }

    fn commit(&mut self, case: Case, kind: AdmissionKind) {
        if case.has_empty_side() {
            tracing::debug!(case = %case, "Case has an empty side, not indexed");
        } else {
            self.order.unsafe_add_case(&case);
            self.power.absorb(&case);
        }
        *self.admissions.entry(kind).or_insert(0) += 1;
        self.cases.push(case);
    }

    /// Whether the whole order is free of conflicts
    pub fn is_consistent(&self) -> bool {
        self.order.is_cb_consistent()
    }

    /// Whether `case` could be added without conflicting with the order
    pub fn is_consistent_with(&self, case: &Case) -> bool {
        self.order.is_consistent(case.reason(), case.defeated())
    }

    /// Tag `case` against the order under an inconsistency tolerance
    pub fn classify(&self, case: &Case, tolerance: Tolerance) -> Verdict {
        classify(&self.order, case, tolerance)
    }

    /// Admitted cases whose own pair is inconsistent with the current order
    pub fn count_tainted_cases(&self) -> usize {
        self.cases
            .iter()
            .filter(|case| !case.has_empty_side())
            .filter(|case| !self.is_consistent_with(case))
            .count()
    }

    /// Size, tainted count and power. Computes `cb_power`, which grows
    /// exponentially with the factor universe.
    pub fn metrics(&self) -> CaseBaseMetrics {
        CaseBaseMetrics {
            size: self.cases.len(),
            tainted: self.count_tainted_cases(),
            power: PowerStats {
                cb_power: self.power.cb_power(&self.order),
                max_edges: self.power.max_edges(),
            },
            admissions: self.admissions.clone(),
        }
    }
}

impl fmt::Display for CaseBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cases: Vec<String> = self.cases.iter().map(|case| case.to_string()).collect();
        write!(f, "CaseBase:\n{}", cases.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::case::CaseRecord;
    use crate::reasoning::factor::Polarity;

    fn make_case(pi: &[&str], delta: &[&str], reason: &[&str], decision: &str) -> Case {
        Case::from_record(&CaseRecord::new(pi, delta, reason, decision)).unwrap()
    }

    #[test]
    fn test_rejects_cycle_under_no() {
        let mut cb = CaseBase::new();
        assert!(cb.is_consistent());

        assert!(cb.add_case(make_case(&["p1"], &["d1"], &["p1"], "pi"), Policy::No));
        assert!(cb.is_consistent());

        let conflicting = make_case(&["p1"], &["d1"], &["d1"], "delta");
        assert!(!cb.add_case(conflicting, Policy::No));
        assert!(cb.is_consistent());
        assert_eq!(cb.len(), 1);
        assert_eq!(cb.order().len(), 1);
    }

    #[test]
    fn test_incomparable_reasons_stay_consistent() {
        // {p1, p2} > {d1} and {d1} > {p1} do not clash: {p1} does not cover {p1, p2}
        let mut cb = CaseBase::new();
        assert!(cb.add_case(make_case(&["p1", "p2"], &["d1"], &["p1", "p2"], "pi"), Policy::All));
        assert!(cb.add_case(make_case(&["p1"], &["d1"], &["d1"], "delta"), Policy::All));

        assert!(cb.is_consistent());
        assert_eq!(cb.count_tainted_cases(), 0);
    }

    #[test]
    fn test_all_policy_admits_conflict_and_taints() {
        let mut cb = CaseBase::new();
        assert!(cb.add_case(make_case(&["p1", "p2"], &["d1"], &["p1", "p2"], "pi"), Policy::All));
        assert!(cb.add_case(make_case(&["p1", "p2"], &["d1"], &["d1"], "delta"), Policy::All));

        assert!(!cb.is_consistent());
        assert_eq!(cb.count_tainted_cases(), 2);

        let metrics = cb.metrics();
        assert_eq!(metrics.size, 2);
        assert_eq!(metrics.tainted, 2);
        assert_eq!(metrics.admissions.get(&AdmissionKind::Consistent), Some(&1));
        assert_eq!(metrics.admissions.get(&AdmissionKind::Tolerated), Some(&1));
    }

    #[test]
    fn test_max_edges_ceiling() {
        let cb = CaseBase::from_cases(vec![
            make_case(&["p1"], &["d1"], &["p1"], "pi"),
            make_case(&["p2"], &["d1"], &["p2"], "pi"),
        ]);

        let ceiling = cb.metrics().power.max_edges;
        assert_eq!(ceiling.pi, 2);
        assert_eq!(ceiling.for_decision(Polarity::Pi), 2);
    }

    #[test]
    fn test_no_new_admits_only_implied_claims() {
        let case = make_case(&["p1"], &["d1", "d2"], &["p1"], "pi");

        // an empty base holds no claims
        let mut cb = CaseBase::new();
        assert!(!cb.add_case(case.clone(), Policy::NoNew));

        let mut cb = CaseBase::from_cases(vec![case]);
        // {p1, p2} over {d1} is implied by {p1} over {d1, d2}
        let implied = make_case(&["p1", "p2"], &["d1"], &["p1", "p2"], "pi");
        assert!(cb.add_case(implied, Policy::NoNew));

        let novel = make_case(&["p3"], &["d3"], &["p3"], "pi");
        assert!(!cb.add_case(novel, Policy::NoNew));
        assert_eq!(cb.len(), 2);
    }

    #[test]
    fn test_restating_a_case_keeps_power() {
        let case = make_case(&["p1"], &["d1", "d2"], &["p1"], "pi");
        let mut cb = CaseBase::from_cases(vec![case.clone()]);
        let before = cb.metrics().power.cb_power;

        assert!(cb.add_case(case, Policy::NoNew));
        assert_eq!(cb.metrics().power.cb_power, before);
        assert_eq!(cb.metrics().admissions.get(&AdmissionKind::Consistent), Some(&1));
    }

    #[test]
    fn test_no_policy_keeps_order_sound() {
        let cases = vec![
            make_case(&["p1"], &["d1"], &["p1"], "pi"),
            make_case(&["p1", "p2"], &["d2"], &["p1", "p2"], "pi"),
            make_case(&["p3"], &["d1", "d3"], &["d3"], "delta"),
            make_case(&["p1"], &["d1"], &["d1"], "delta"),
            make_case(&["p4"], &["d4"], &["p4"], "pi"),
        ];

        let mut cb = CaseBase::new();
        let admitted = cb.add_cases(cases, Policy::No);

        assert_eq!(admitted, 4);
        assert!(cb.is_consistent());
        assert_eq!(cb.count_tainted_cases(), 0);
    }

    #[test]
    fn test_admit_until_rejected() {
        let cases = vec![
            make_case(&["p1"], &["d1"], &["p1"], "pi"),
            make_case(&["p2"], &["d2"], &["p2"], "pi"),
            make_case(&["p1"], &["d1"], &["d1"], "delta"),
            make_case(&["p3"], &["d3"], &["p3"], "pi"),
        ];

        let mut cb = CaseBase::new();
        let run = cb.admit_until_rejected(cases, Policy::NoInvolvement);

        assert_eq!(run.admitted, 2);
        assert_eq!(run.rejected_at, Some(2));
        assert_eq!(run.power, cb.metrics().power.cb_power);
        assert_eq!(cb.len(), 2);
    }

    #[test]
    fn test_add_case_named() {
        let mut cb = CaseBase::new();
        let case = make_case(&["p1"], &["d1"], &["p1"], "pi");

        assert_eq!(cb.add_case_named(case.clone(), "no_involvement"), Ok(true));
        assert_eq!(
            cb.add_case_named(case, "LENIENT"),
            Err(BriefcaseError::UnknownPolicy("LENIENT".to_string()))
        );
        assert_eq!(cb.len(), 1);
    }

    #[test]
    fn test_empty_side_handling() {
        let degenerate = make_case(&[], &["d1"], &[], "pi");

        let mut cb = CaseBase::new();
        assert!(cb.add_case(degenerate.clone(), Policy::No));
        assert_eq!(cb.len(), 1);
        assert!(cb.order().is_empty());
        assert_eq!(cb.count_tainted_cases(), 0);

        let mut strict = CaseBase::with_config(CaseBaseConfig {
            allow_empty_side: false,
        });
        assert!(!strict.add_case(degenerate, Policy::All));
        assert!(strict.is_empty());
    }

    #[test]
    fn test_empty_side_still_checked_by_policy() {
        let one_sided = make_case(&["p5"], &[], &["p5"], "pi");

        // nothing in an empty base can already claim it
        let mut cb = CaseBase::new();
        assert!(!cb.add_case(one_sided.clone(), Policy::NoNew));
        assert!(cb.is_empty());

        let mut cb = CaseBase::new();
        assert!(cb.add_case(make_case(&["p1"], &["d1"], &["p1"], "pi"), Policy::All));
        assert!(cb.add_case(make_case(&["p1"], &["d1"], &["d1"], "delta"), Policy::All));
        assert!(!cb.is_consistent());

        // an inconsistent order refuses everything under NO
        assert!(!cb.add_case(one_sided.clone(), Policy::No));
        assert_eq!(cb.len(), 2);

        assert!(cb.add_case(one_sided, Policy::NoInvolvement));
        assert_eq!(cb.len(), 3);
        assert_eq!(cb.order().len(), 2);
    }

    #[test]
    fn test_from_cases_with_config() {
        let cases = vec![
            make_case(&["p1"], &["d1"], &["p1"], "pi"),
            make_case(&[], &["d1"], &[], "pi"),
        ];

        let cb = CaseBase::from_cases_with_config(CaseBaseConfig::default(), cases.clone());
        assert_eq!(cb.len(), 2);

        let cb = CaseBase::from_cases_with_config(
            CaseBaseConfig {
                allow_empty_side: false,
            },
            cases,
        );
        assert_eq!(cb.len(), 1);
        assert!(!cb.config().allow_empty_side);
    }

    #[test]
    fn test_classify_through_case_base() {
        let cb = CaseBase::from_cases(vec![make_case(&["p1"], &["d1"], &["p1"], "pi")]);
        let conflicting = make_case(&["p1"], &["d1"], &["d1"], "delta");

        assert!(!cb.is_consistent_with(&conflicting));
        assert_eq!(cb.classify(&conflicting, Tolerance::Strict), Verdict::Inconsistent);
        assert_eq!(
            cb.classify(&conflicting, Tolerance::All),
            Verdict::Tolerated(Tolerance::All)
        );
        assert_eq!(
            cb.metrics().admissions.get(&AdmissionKind::Unchecked),
            Some(&1)
        );
    }

    #[test]
    fn test_mrd_through_case_base() {
        let mut cb = CaseBase::new();
        assert!(cb.add_case(make_case(&["p1", "p2"], &["d1"], &["p1", "p2"], "pi"), Policy::Mrd));

        // closest precedent went the same way
        let similar = make_case(&["p1", "p2"], &["d1"], &["p1", "p2"], "pi");
        assert!(cb.add_case(similar, Policy::Mrd));

        // identical facts decided for delta
        let flipped = make_case(&["p1", "p2"], &["d1"], &["d1"], "delta");
        assert!(!cb.add_case(flipped, Policy::Mrd));
    }

    #[test]
    fn test_display() {
        let cb = CaseBase::from_cases(vec![make_case(&["p1"], &["d1"], &["p1"], "pi")]);
        let text = cb.to_string();
        assert!(text.starts_with("CaseBase:\n"));
        assert!(text.contains("reason: {pi:p1}"));
    }
}
