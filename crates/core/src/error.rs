use crate::context::Role;
use crate::record::{PatientStatus, Unit};
use crate::store::StoreError;
use crate::validation::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum CensusError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("role {role} may not {action} records")]
    PermissionDenied { role: Role, action: &'static str },
    #[error("record {id} belongs to unit {record_unit}, not {context_unit}")]
    UnitMismatch {
        id: String,
        record_unit: Unit,
        context_unit: Unit,
    },
    #[error("cannot {action} a record with status {status}")]
    InvalidTransition {
        status: PatientStatus,
        action: &'static str,
    },
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),
    #[error(
        "record {id} was written to the mortality archive but could not be removed from the live census: {source}"
    )]
    PartialArchive {
        id: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to encode record: {0}")]
    Serialization(serde_json::Error),
    #[error("malformed record document: {0}")]
    Deserialization(serde_json::Error),
}

pub type CensusResult<T> = std::result::Result<T, CensusError>;
