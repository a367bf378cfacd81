//! # Ward Core
//!
//! Core business logic for the ward census.
//!
//! This crate owns the lifecycle of an admission episode:
//! - Serial allocation and length-of-stay computation
//! - Admission form validation with field-level errors
//! - The Active / Discharged / Deceased state machine, including the move into the
//!   mortality archive
//! - The persistence collaborator ([`DocumentStore`]) with in-memory and file-backed stores
//! - Live working sets, filtered views and the export projection
//!
//! **No API concerns**: HTTP servers, authentication headers and command-line parsing belong
//! in `api-rest` and `cli`.

#[macro_use]
mod macros;

pub mod clock;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod export;
pub mod length_of_stay;
pub mod lifecycle;
pub mod record;
pub mod serial;
pub mod store;
pub mod validation;
pub mod view;
pub mod watcher;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CoreConfig;
pub use context::{OperationContext, Role};
pub use error::{CensusError, CensusResult};
pub use lifecycle::CensusService;
pub use record::{
    Category, CodeStatus, Collection, Gender, PatientRecord, PatientStatus, Unit, UnknownVariant,
};
pub use store::{
    Document, DocumentStore, FileStore, MemoryStore, Query, StoreError, StoreResult, Subscription,
};
pub use validation::{AdmissionForm, Field, ValidationErrors};
pub use watcher::{CensusWatcher, WorkingSet};
