//! Factors and the value-typed factor sets the priority order is keyed by

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::reasoning::error::BriefcaseError;

/// Side of a dispute. Doubles as a decision outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Pi,
    Delta,
    Un,
}

impl Polarity {
    /// The other side of the dispute. `Un` has no opposite.
    pub fn opposite(&self) -> Polarity {
        match self {
            Polarity::Pi => Polarity::Delta,
            Polarity::Delta => Polarity::Pi,
            Polarity::Un => Polarity::Un,
        }
    }

    /// Returns true for `Pi` and `Delta`
    pub fn is_decided(&self) -> bool {
        matches!(self, Polarity::Pi | Polarity::Delta)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Pi => "pi",
            Polarity::Delta => "delta",
            Polarity::Un => "un",
        }
    }
}

impl Default for Polarity {
    fn default() -> Self {
        Self::Un
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Polarity {
    type Err = BriefcaseError;

    /// Parses a decision value. Only `pi` and `delta` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pi" => Ok(Polarity::Pi),
            "delta" => Ok(Polarity::Delta),
            other => Err(BriefcaseError::InvalidDecision(other.to_string())),
        }
    }
}

/// A named fact with a polarity. Same name, different polarity is a different factor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub polarity: Polarity,
}

impl Factor {
    pub fn new(name: &str, polarity: Polarity) -> Self {
        Self {
            name: name.to_string(),
            polarity,
        }
    }

    pub fn pi(name: &str) -> Self {
        Self::new(name, Polarity::Pi)
    }

    pub fn delta(name: &str) -> Self {
        Self::new(name, Polarity::Delta)
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.polarity, self.name)
    }
}

/// Immutable, cheaply cloned set of factors with structural equality and hashing.
///
/// Used as the key type of the priority order index: two handles built from
/// the same factors compare and hash equal regardless of where they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FactorSet(Arc<BTreeSet<Factor>>);

impl FactorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, factor: &Factor) -> bool {
        self.0.contains(factor)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Factor> {
        self.0.iter()
    }

    pub fn is_subset(&self, other: &FactorSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_superset(&self, other: &FactorSet) -> bool {
        self.0.is_superset(&other.0)
    }

    /// Factors in `self` but not in `other`
    pub fn difference(&self, other: &FactorSet) -> FactorSet {
        self.0.difference(&other.0).cloned().collect()
    }

    pub fn union(&self, other: &FactorSet) -> FactorSet {
        self.0.union(&other.0).cloned().collect()
    }

    /// Polarity of the set, taken from its first factor
    pub fn polarity(&self) -> Option<Polarity> {
        self.0.iter().next().map(|f| f.polarity)
    }

    /// Factor names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|f| f.name.clone()).collect()
    }
}

impl FromIterator<Factor> for FactorSet {
    fn from_iter<I: IntoIterator<Item = Factor>>(iter: I) -> Self {
        FactorSet(Arc::new(iter.into_iter().collect()))
    }
}

impl<'a> IntoIterator for &'a FactorSet {
    type Item = &'a Factor;
    type IntoIter = std::collections::btree_set::Iter<'a, Factor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for FactorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.0.iter().map(|factor| factor.to_string()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Build a set of factors of one polarity from names
pub fn factor_set<S: AsRef<str>>(names: &[S], polarity: Polarity) -> FactorSet {
    names
        .iter()
        .map(|n| Factor::new(n.as_ref(), polarity))
        .collect()
}
