//! K-anonymity
//!
//! Two halves that must not be confused:
//!
//! - the per-node pass ([`generalize()`]) coarsens one record's
//!   quasi-identifiers and never certifies anything;
//! - the batch pass ([`KAnonymityValidator`], [`RiskAssessor`]) groups a whole
//!   release into equivalence classes and decides whether it is k-anonymous.

pub mod generalize;
pub mod risk;
pub mod settings;
pub mod validator;

pub use generalize::generalize;
pub use risk::{RiskAssessor, RiskLevel, RiskReport};
pub use settings::{GeneralizationStrategy, KAnonymitySetting, SuppressionStrategy};
pub use validator::{
    equivalence_classes, EquivalenceClass, KAnonymityValidator, QuasiIdentifierKey,
    ValidationReport,
};
