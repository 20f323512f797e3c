//! Differential privacy
//!
//! Calibrated noise for numeric leaves plus the per-context epsilon ledger
//! that bounds the cumulative privacy loss of a release.
//!
//! - [`settings`] - validated per-rule parameters and the organisation policy
//! - [`mechanisms`] - Laplace and Gaussian samplers over cryptographic RNGs
//! - [`budget`] - thread-safe [`PrivacyBudgetTracker`]
//! - [`naming`] - optional budget context naming policy

pub mod budget;
pub mod mechanisms;
pub mod naming;
pub mod settings;

pub use budget::{BudgetAuditEntry, BudgetOperation, BudgetSnapshot, PrivacyBudgetTracker};
pub use mechanisms::{gaussian_sigma, laplace_scale, sample_noise};
pub use naming::validate_context_name;
pub use settings::{DifferentialPrivacySetting, NoiseMechanism, PrivacyPolicy};
