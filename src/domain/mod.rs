//! Domain models and types for Medcloak.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Document tree** ([`Document`], [`DocumentNode`], [`NodeId`])
//! - **JSON boundary adapter** ([`JsonDocumentReader`], [`write_document`])
//! - **Error types** ([`AnonymizerError`], [`PrivacyError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, AnonymizerError>`]:
//!
//! ```rust
//! use medcloak::domain::{JsonDocumentReader, Result};
//!
//! fn example() -> Result<()> {
//!     let doc = JsonDocumentReader::new().read_str(r#"{"resourceType": "Patient"}"#)?;
//!     assert_eq!(doc.root_type(), "Patient");
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod errors;
pub mod json;
pub mod node;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{AnonymizerError, PrivacyError};
pub use json::{write_document, JsonDocumentReader, TypeHints};
pub use node::{Document, DocumentNode, NodeId};
pub use result::Result;
