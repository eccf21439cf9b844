//! Admissibility policies deciding whether a candidate case may join the order

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::reasoning::case::Case;
use crate::reasoning::error::BriefcaseError;
use crate::reasoning::priority_order::PriorityOrder;

/// Admissibility constraint applied when adding a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Policy {
    /// Order is consistent and stays consistent
    No,
    /// Candidate conflicts with nothing; prior conflicts are tolerated
    NoInvolvement,
    /// Candidate changes nothing
    NoNew,
    /// `NoInvolvement` or `NoNew`
    Horty,
    /// Candidate only conflicts with pairs that are already tainted
    NoCorruption,
    /// Nearest precedent by relevant difference shares the candidate's decision
    Mrd,
    All,
}

impl Policy {
    pub const ALL_POLICIES: [Policy; 7] = [
        Policy::No,
        Policy::NoInvolvement,
        Policy::NoNew,
        Policy::Horty,
        Policy::NoCorruption,
        Policy::Mrd,
        Policy::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::No => "NO",
            Policy::NoInvolvement => "NO_INVOLVEMENT",
            Policy::NoNew => "NO_NEW",
            Policy::Horty => "HORTY",
            Policy::NoCorruption => "NO_CORRUPTION",
            Policy::Mrd => "MRD",
            Policy::All => "ALL",
        }
    }

    /// Whether `candidate` may be inserted into `order`.
    ///
    /// `precedents` are the cases already admitted, consulted only by `Mrd`.
    pub fn admits(&self, order: &PriorityOrder, precedents: &[Case], candidate: &Case) -> bool {
        let reason = candidate.reason();
        let defeated = candidate.defeated();

        match self {
            Policy::No => order.is_cb_consistent() && order.is_consistent(reason, defeated),
            Policy::NoInvolvement => order.is_consistent(reason, defeated),
            Policy::NoNew => order.is_existing_claim(reason, defeated),
            Policy::Horty => {
                order.is_consistent(reason, defeated) || order.is_existing_claim(reason, defeated)
            }
            Policy::NoCorruption => order
                .get_incons_pairs_with_case(reason, defeated)
                .iter()
                .all(|pair| !order.is_consistent(&pair.reason, &pair.defeated)),
            Policy::Mrd => nearest_precedent_agrees(precedents, candidate),
            Policy::All => true,
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Policy::All
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = BriefcaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Policy::ALL_POLICIES
            .iter()
            .find(|policy| policy.as_str() == upper)
            .copied()
            .ok_or_else(|| BriefcaseError::UnknownPolicy(s.to_string()))
    }
}

/// Minimal relevant difference check.
///
/// Only the candidate's (reason, defeated) claim is compared. Finds the
/// precedent with the fewest relevant differences from the claim (or from its
/// polar opposite when the precedent went the other way) and admits iff that
/// precedent has the candidate's decision. On a tie the current best is kept
/// when it already matches the candidate's decision, otherwise the later
/// precedent replaces it. With no precedents the candidate is admitted.
fn nearest_precedent_agrees(precedents: &[Case], candidate: &Case) -> bool {
    let claim = candidate.as_claim();
    let opposite = claim.polar_opposite();
    let mut best_diffs: Option<usize> = None;
    let mut best_decision = candidate.decision();

    for precedent in precedents {
        let diffs = if precedent.decision() == candidate.decision() {
            claim.relevant_diff_from(precedent).len()
        } else {
            opposite.relevant_diff_from(precedent).len()
        };

        let replace = match best_diffs {
            None => true,
            Some(best) if diffs < best => true,
            Some(best) if diffs == best => best_decision != candidate.decision(),
            Some(_) => false,
        };

        if replace {
            best_diffs = Some(diffs);
            best_decision = precedent.decision();
        }
    }

    tracing::debug!(
        candidate = %candidate,
        best_diffs = ?best_diffs,
        best_decision = %best_decision,
        "Minimal relevant difference check"
    );

    best_decision == candidate.decision()
}

/// How much inconsistency a consistency check is willing to accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tolerance {
    Strict,
    /// The exact pair is already recorded
    Equal,
    /// Same reason already beats a superset of the defeated factors
    Dominated,
    /// Same reason already beats a subset of the defeated factors
    Dominating,
    /// Dominated or dominating
    Horty,
    /// Every conflicting pair is itself already inconsistent
    Tainted,
    All,
}

impl Tolerance {
    pub const ALL_TOLERANCES: [Tolerance; 7] = [
        Tolerance::Strict,
        Tolerance::Equal,
        Tolerance::Dominated,
        Tolerance::Dominating,
        Tolerance::Horty,
        Tolerance::Tainted,
        Tolerance::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tolerance::Strict => "STRICT",
            Tolerance::Equal => "EQUAL",
            Tolerance::Dominated => "DOMINATED",
            Tolerance::Dominating => "DOMINATING",
            Tolerance::Horty => "HORTY",
            Tolerance::Tainted => "TAINTED",
            Tolerance::All => "ALL",
        }
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance::Strict
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tolerance {
    type Err = BriefcaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Tolerance::ALL_TOLERANCES
            .iter()
            .find(|tolerance| tolerance.as_str() == upper)
            .copied()
            .ok_or_else(|| BriefcaseError::UnknownTolerance(s.to_string()))
    }
}

/// Outcome of checking a candidate against the order under a tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Candidate conflicts with nothing
    ConsistentCase,
    /// Candidate conflicts and the tolerance does not cover it
    Inconsistent,
    /// Candidate conflicts but the tolerance accepts it
    Tolerated(Tolerance),
}

impl Verdict {
    /// True unless the verdict is `Inconsistent`
    pub fn is_acceptable(&self) -> bool {
        !matches!(self, Verdict::Inconsistent)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::ConsistentCase => f.write_str("CONSISTENT-CASE"),
            Verdict::Inconsistent => f.write_str("INCONSISTENT"),
            Verdict::Tolerated(tolerance) => write!(f, "{}", tolerance),
        }
    }
}

/// Classify a candidate against the order under `tolerance`
pub fn classify(order: &PriorityOrder, candidate: &Case, tolerance: Tolerance) -> Verdict {
    let reason = candidate.reason();
    let defeated = candidate.defeated();

    let conflicts = order.get_incons_pairs_with_case(reason, defeated);
    if conflicts.is_empty() {
        return Verdict::ConsistentCase;
    }

    let tolerated = match tolerance {
        Tolerance::Strict => false,
        Tolerance::Equal => order.contains_pair(reason, defeated),
        Tolerance::Dominated => !order.get_dominated_pairs(reason, defeated).is_empty(),
        Tolerance::Dominating => !order.get_dominating_pairs(reason, defeated).is_empty(),
        Tolerance::Horty => {
            !order.get_dominated_pairs(reason, defeated).is_empty()
                || !order.get_dominating_pairs(reason, defeated).is_empty()
        }
        Tolerance::Tainted => conflicts
            .iter()
            .all(|pair| !order.is_consistent(&pair.reason, &pair.defeated)),
        Tolerance::All => true,
    };

    if tolerated {
        Verdict::Tolerated(tolerance)
    } else {
        Verdict::Inconsistent
    }
}
