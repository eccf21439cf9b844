//! Precedent decisions and the raw records they are built from

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::reasoning::error::BriefcaseError;
use crate::reasoning::factor::{factor_set, FactorSet, Polarity};

/// Raw case record as it arrives from a dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    #[serde(default)]
    pub pi: Vec<String>,
    #[serde(default)]
    pub delta: Vec<String>,
    #[serde(default)]
    pub reason: Vec<String>,
    pub decision: String,
}

impl CaseRecord {
    pub fn new(pi: &[&str], delta: &[&str], reason: &[&str], decision: &str) -> Self {
        Self {
            pi: pi.iter().map(|s| s.to_string()).collect(),
            delta: delta.iter().map(|s| s.to_string()).collect(),
            reason: reason.iter().map(|s| s.to_string()).collect(),
            decision: decision.to_string(),
        }
    }

    /// Short sha256 id of the record, independent of factor ordering
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (label, names) in [("pi", &self.pi), ("delta", &self.delta), ("reason", &self.reason)] {
            let mut sorted: Vec<&String> = names.iter().collect();
            sorted.sort();
            sorted.dedup();
            hasher.update(label.as_bytes());
            for name in sorted {
                hasher.update(b"\x1f");
                hasher.update(name.as_bytes());
            }
            hasher.update(b"\x1e");
        }
        hasher.update(self.decision.as_bytes());
        format!("{:x}", hasher.finalize())[..16].to_string()
    }
}

/// A decided precedent: both sides' factors, the outcome and the cited reason.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Case {
    pi_factors: FactorSet,
    delta_factors: FactorSet,
    decision: Polarity,
    reason: FactorSet,
}

impl Case {
    /// Build a case, checking the decision is decided and the reason is drawn
    /// from the winning side.
    pub fn new(
        pi_factors: FactorSet,
        delta_factors: FactorSet,
        decision: Polarity,
        reason: FactorSet,
    ) -> Result<Self, BriefcaseError> {
        let winning = match decision {
            Polarity::Pi => &pi_factors,
            Polarity::Delta => &delta_factors,
            Polarity::Un => {
                return Err(BriefcaseError::InvalidDecision(decision.to_string()));
            }
        };

        if !reason.is_subset(winning) {
            return Err(BriefcaseError::InvalidReason {
                decision: decision.to_string(),
                missing: reason.difference(winning).names(),
            });
        }

        Ok(Self {
            pi_factors,
            delta_factors,
            decision,
            reason,
        })
    }

    /// Build a case from a raw record. Reason names take the decision's polarity.
    pub fn from_record(record: &CaseRecord) -> Result<Self, BriefcaseError> {
        let decision: Polarity = record.decision.parse()?;
        Self::new(
            factor_set(&record.pi, Polarity::Pi),
            factor_set(&record.delta, Polarity::Delta),
            decision,
            factor_set(&record.reason, decision),
        )
    }

    pub fn to_record(&self) -> CaseRecord {
        CaseRecord {
            pi: self.pi_factors.names(),
            delta: self.delta_factors.names(),
            reason: self.reason.names(),
            decision: self.decision.to_string(),
        }
    }

    pub fn pi_factors(&self) -> &FactorSet {
        &self.pi_factors
    }

    pub fn delta_factors(&self) -> &FactorSet {
        &self.delta_factors
    }

    pub fn decision(&self) -> Polarity {
        self.decision
    }

    pub fn reason(&self) -> &FactorSet {
        &self.reason
    }

    /// Factors overridden by the decision: the losing side
    pub fn defeated(&self) -> &FactorSet {
        match self.decision {
            Polarity::Pi => &self.delta_factors,
            _ => &self.pi_factors,
        }
    }

    /// True when either the reason or the defeated side is empty
    pub fn has_empty_side(&self) -> bool {
        self.reason.is_empty() || self.defeated().is_empty()
    }

    /// Factors that separate `other` from this case for minimal relevant
    /// difference reasoning.
    ///
    /// Same outcome: reasons `other` cites that this case lacks, plus factors
    /// this case had to defeat that `other` did not. Different outcome:
    /// reasons of `other` this case did not defeat, plus reasons of this case
    /// `other` did not defeat.
    pub fn relevant_diff_from(&self, other: &Case) -> FactorSet {
        if self.decision == other.decision {
            let reasons = other.reason.difference(&self.reason);
            let defeated = self.defeated().difference(other.defeated());
            reasons.union(&defeated)
        } else {
            let reasons = other.reason.difference(self.defeated());
            let defeated = self.reason.difference(other.defeated());
            reasons.union(&defeated)
        }
    }

    /// The case reduced to its claim: the reason stands in for the whole
    /// winning side, the defeated side is unchanged.
    pub fn as_claim(&self) -> Case {
        let (pi_factors, delta_factors) = match self.decision {
            Polarity::Pi => (self.reason.clone(), self.delta_factors.clone()),
            _ => (self.pi_factors.clone(), self.reason.clone()),
        };
        Case {
            pi_factors,
            delta_factors,
            decision: self.decision,
            reason: self.reason.clone(),
        }
    }

    /// Same factors, decided the other way with the whole opposing side as reason.
    pub fn polar_opposite(&self) -> Case {
        let (decision, reason) = match self.decision {
            Polarity::Pi => (Polarity::Delta, self.delta_factors.clone()),
            _ => (Polarity::Pi, self.pi_factors.clone()),
        };
        Case {
            pi_factors: self.pi_factors.clone(),
            delta_factors: self.delta_factors.clone(),
            decision,
            reason,
        }
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Case(pi: {}, delta: {}, decision: {}, reason: {})",
            self.pi_factors, self.delta_factors, self.decision, self.reason
        )
    }
}
