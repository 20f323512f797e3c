//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod anonymize;
pub mod certify;
pub mod input;
pub mod validate;
