//! Errors raised at the case-construction and policy-dispatch boundary

/// Error types for case construction and admission dispatch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BriefcaseError {
    /// Decision value is not one of `pi` / `delta`
    #[error("Invalid decision '{0}': expected 'pi' or 'delta'")]
    InvalidDecision(String),

    /// Reason cites factors missing from the winning side
    #[error("Invalid reason for decision {decision}: {missing:?} not among the winning factors")]
    InvalidReason {
        decision: String,
        missing: Vec<String>,
    },

    /// Admissibility policy name does not resolve
    #[error("Unknown admissibility policy '{0}' (expected NO, NO_NEW, NO_INVOLVEMENT, HORTY, NO_CORRUPTION, MRD or ALL)")]
    UnknownPolicy(String),

    /// Inconsistency tolerance name does not resolve
    #[error("Unknown inconsistency tolerance '{0}' (expected STRICT, EQUAL, DOMINATED, DOMINATING, HORTY, TAINTED or ALL)")]
    UnknownTolerance(String),
}
