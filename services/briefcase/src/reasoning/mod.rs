pub mod admissibility;
pub mod case;
pub mod case_base;
pub mod error;
pub mod factor;
pub mod power;
pub mod priority_order;

pub use admissibility::{classify, Policy, Tolerance, Verdict};
pub use case::{Case, CaseRecord};
pub use case_base::{AdmissionKind, AdmissionRun, CaseBase, CaseBaseConfig, CaseBaseMetrics, PowerStats};
pub use error::BriefcaseError;
pub use factor::{factor_set, Factor, FactorSet, Polarity};
pub use power::{FactorUniverse, PowerCeiling, PowerDetector};
pub use priority_order::{OrderPair, PriorityOrder};
