//! Record identifiers and sharded-path utilities.
//!
//! Every census and mortality archive document is keyed by an opaque identifier allocated by
//! the document store. The same identifier follows a record when it is archived, so both
//! collections share keys for traceability.
//!
//! The canonical identifier form is **32 lowercase hexadecimal characters** (no hyphens),
//! the same value you would get from `Uuid::new_v4().simple().to_string()`. Externally
//! supplied identifiers (CLI arguments, REST path segments) must already be canonical; use
//! [`RecordId::parse`] to validate them.
//!
//! ## Sharded layout
//! For a canonical id `u`, the file-backed store keeps the document at:
//! `collection_dir/<u[0..2]>/<u[2..4]>/<u>.yaml`
//!
//! Example:
//! `ward_data/patients/55/0e/550e8400e29b41d4a716446655440000.yaml`
//!
//! Sharding keeps any single directory small even after years of admissions.

mod id;

pub use id::RecordId;

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;
