//! Patient lifecycle and archival state machine.
//!
//! [`CensusService`] owns every mutating transition of an admission episode:
//!
//! | From | To | Operation |
//! |---|---|---|
//! | (none) | Active | [`CensusService::admit`] |
//! | Active / Discharged | Active / Discharged | [`CensusService::update`] |
//! | Active / Discharged | Deceased | [`CensusService::archive`] |
//! | Deceased | Deceased | [`CensusService::update_archived`] |
//! | any | (removed) | [`CensusService::delete`] |
//!
//! Every operation checks the actor's permission and validates input before it makes any
//! persistence call. A refused operation leaves the store untouched.
//!
//! # Archive
//!
//! Archiving writes the archive copy under the live record's id first and only then removes
//! the live record. There is no transaction across the two writes and no rollback: if the
//! removal fails the record exists in both collections and the caller receives
//! [`CensusError::PartialArchive`]. Re-running the archive with the same record overwrites
//! the archive copy and retries the removal.

use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::constants::UNIT_FIELD;
use crate::context::OperationContext;
use crate::error::{CensusError, CensusResult};
use crate::length_of_stay::{length_of_stay_days, saved_length_of_stay};
use crate::record::{Collection, PatientRecord, PatientStatus, Unit};
use crate::store::{DocumentStore, Query, Subscription};
use crate::validation::{
    validate_admission, validate_mortality_entry, AdmissionForm, Field, ValidAdmission,
    ValidationErrors,
};
use crate::watcher::WorkingSet;
use chrono::NaiveDate;
use std::sync::Arc;

/// Drives admission records through their lifecycle against a [`DocumentStore`].
#[derive(Clone, Debug)]
pub struct CensusService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl CensusService {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { cfg, store, clock }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// The calendar date used for every length-of-stay computation.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn collection_name(&self, collection: Collection) -> &str {
        self.cfg.collection_name(collection)
    }

    fn unit_query(&self, collection: Collection, unit: Unit) -> Query {
        Query::collection(self.collection_name(collection)).where_eq(UNIT_FIELD, unit.as_str())
    }

    /// Admits a new patient into the live census of `ctx.unit`.
    ///
    /// The serial is allocated from the unit's current census; the record starts `Active` with
    /// length of stay counted to today.
    ///
    /// # Errors
    ///
    /// - [`CensusError::PermissionDenied`] if the role cannot manage records.
    /// - [`CensusError::Validation`] if the form fails validation or carries a discharge date.
    /// - [`CensusError::Store`] if reading the census or writing the record fails.
    pub async fn admit(
        &self,
        ctx: &OperationContext,
        form: &AdmissionForm,
    ) -> CensusResult<PatientRecord> {
        ctx.authorise_mutation("create")?;
        let today = self.today();
        let valid = validate_admission(form, today).map_err(CensusError::Validation)?;
        if valid.discharge_date.is_some() {
            let mut errors = ValidationErrors::new();
            errors.insert(
                Field::DischargeDate,
                "Discharge date cannot be set on admission.",
            );
            return Err(CensusError::Validation(errors));
        }

        let census = self.working_set(Collection::Census, ctx.unit).await?;
        let serial_number = census.next_serial();

        let mut record = build_record(
            String::new(),
            ctx.unit,
            serial_number,
            valid,
            PatientStatus::Active,
            today,
        );
        let document = record.to_document().map_err(CensusError::Serialization)?;

        let collection = self.collection_name(Collection::Census);
        record.id = self.store.create(collection, document).await.map_err(|e| {
            tracing::error!("failed to admit patient to {}: {}", collection, e);
            CensusError::Store(e)
        })?;

        tracing::info!(
            "admitted {} serial {} to {} census",
            record.id,
            record.serial_number,
            record.unit
        );
        Ok(record)
    }

    /// Saves an edited admission form over a live census record.
    ///
    /// A discharge date moves the record to `Discharged`; clearing it moves the record back to
    /// `Active`. Either way the record stays in the live census under the same id and serial,
    /// and the complete record is written.
    ///
    /// # Errors
    ///
    /// Returns [`CensusError::InvalidTransition`] for archived records, which are edited with
    /// [`CensusService::update_archived`], plus the errors of [`CensusService::admit`] and
    /// [`CensusError::UnitMismatch`].
    pub async fn update(
        &self,
        ctx: &OperationContext,
        record: &PatientRecord,
        form: &AdmissionForm,
    ) -> CensusResult<PatientRecord> {
        ctx.authorise_mutation("update")?;
        ctx.authorise_unit(record)?;
        if record.is_archived() {
            return Err(CensusError::InvalidTransition {
                status: record.status,
                action: "update",
            });
        }
        require_id(record)?;

        let today = self.today();
        let valid = validate_admission(form, today).map_err(CensusError::Validation)?;
        let status = if valid.discharge_date.is_some() {
            PatientStatus::Discharged
        } else {
            PatientStatus::Active
        };

        let updated = build_record(
            record.id.clone(),
            record.unit,
            record.serial_number.clone(),
            valid,
            status,
            today,
        );
        let document = updated.to_document().map_err(CensusError::Serialization)?;

        let collection = self.collection_name(Collection::Census);
        self.store
            .update(collection, &updated.id, document)
            .await
            .map_err(|e| {
                tracing::error!("failed to update {}/{}: {}", collection, updated.id, e);
                CensusError::Store(e)
            })?;

        tracing::info!(
            "updated {} serial {} ({} -> {})",
            updated.id,
            updated.serial_number,
            record.status,
            updated.status
        );
        Ok(updated)
    }

    /// Moves a live census record into the mortality archive.
    ///
    /// The date of death is `expiry` if given, else the record's discharge date, else today.
    /// The archive copy keeps the record's id, serial and fields, with `status = Deceased`
    /// and length of stay counted to the date of death.
    ///
    /// # Errors
    ///
    /// - [`CensusError::Validation`] if the date of death precedes admission.
    /// - [`CensusError::Store`] if the archive write fails; the live record is untouched.
    /// - [`CensusError::PartialArchive`] if the archive write succeeded but removing the live
    ///   record failed.
    pub async fn archive(
        &self,
        ctx: &OperationContext,
        record: &PatientRecord,
        expiry: Option<NaiveDate>,
    ) -> CensusResult<PatientRecord> {
        ctx.authorise_mutation("archive")?;
        ctx.authorise_unit(record)?;
        if record.is_archived() {
            return Err(CensusError::InvalidTransition {
                status: record.status,
                action: "archive",
            });
        }
        require_id(record)?;

        let date_of_death = expiry
            .or(record.discharge_date)
            .unwrap_or_else(|| self.today());
        if date_of_death < record.admission_date {
            let mut errors = ValidationErrors::new();
            errors.insert(Field::DischargeDate, "Discharge cannot be before admission.");
            return Err(CensusError::Validation(errors));
        }

        let mut archived = record.clone();
        archived.status = PatientStatus::Deceased;
        archived.discharge_date = Some(date_of_death);
        archived.length_of_stay = length_of_stay_days(record.admission_date, date_of_death);
        let document = archived.to_document().map_err(CensusError::Serialization)?;

        let mortality = self.collection_name(Collection::Mortality);
        self.store
            .create_with_id(mortality, &archived.id, document)
            .await
            .map_err(|e| {
                tracing::error!("failed to write archive copy {}/{}: {}", mortality, archived.id, e);
                CensusError::Store(e)
            })?;

        let census = self.collection_name(Collection::Census);
        if let Err(e) = self.store.delete(census, &archived.id).await {
            tracing::error!(
                "archived {} but failed to remove it from {}: {}",
                archived.id,
                census,
                e
            );
            return Err(CensusError::PartialArchive {
                id: archived.id,
                source: e,
            });
        }

        tracing::info!(
            "archived {} serial {} (date of death {}, {} days)",
            archived.id,
            archived.serial_number,
            date_of_death,
            archived.length_of_stay
        );
        Ok(archived)
    }

    /// Saves an edited form over a mortality archive record.
    ///
    /// The date of death is required. The complete archive document is rewritten under the
    /// same id, keeping its serial and `Deceased` status.
    pub async fn update_archived(
        &self,
        ctx: &OperationContext,
        record: &PatientRecord,
        form: &AdmissionForm,
    ) -> CensusResult<PatientRecord> {
        ctx.authorise_mutation("update")?;
        ctx.authorise_unit(record)?;
        if !record.is_archived() {
            return Err(CensusError::InvalidTransition {
                status: record.status,
                action: "edit as archived",
            });
        }
        require_id(record)?;

        let today = self.today();
        let valid = validate_mortality_entry(form, today).map_err(CensusError::Validation)?;
        let updated = build_record(
            record.id.clone(),
            record.unit,
            record.serial_number.clone(),
            valid,
            PatientStatus::Deceased,
            today,
        );
        let document = updated.to_document().map_err(CensusError::Serialization)?;

        let mortality = self.collection_name(Collection::Mortality);
        self.store
            .create_with_id(mortality, &updated.id, document)
            .await
            .map_err(|e| {
                tracing::error!("failed to update {}/{}: {}", mortality, updated.id, e);
                CensusError::Store(e)
            })?;

        tracing::info!("updated archive record {} serial {}", updated.id, updated.serial_number);
        Ok(updated)
    }

    /// Permanently removes a record from whichever collection holds it.
    pub async fn delete(&self, ctx: &OperationContext, record: &PatientRecord) -> CensusResult<()> {
        ctx.authorise_mutation("delete")?;
        ctx.authorise_unit(record)?;
        require_id(record)?;

        let collection = self.collection_name(record.collection());
        self.store
            .delete(collection, &record.id)
            .await
            .map_err(|e| {
                tracing::error!("failed to delete {}/{}: {}", collection, record.id, e);
                CensusError::Store(e)
            })?;

        tracing::info!("deleted {} serial {} from {}", record.id, record.serial_number, collection);
        Ok(())
    }

    /// Loads one record.
    ///
    /// # Errors
    ///
    /// Returns [`CensusError::NotFound`] if `collection` holds no record with this id.
    pub async fn find(&self, collection: Collection, id: &str) -> CensusResult<PatientRecord> {
        let name = self.collection_name(collection);
        let document = self
            .store
            .get(name, id)
            .await?
            .ok_or_else(|| CensusError::NotFound(format!("{name}/{id}")))?;
        PatientRecord::from_document(document).map_err(CensusError::Deserialization)
    }

    /// One-shot read of a unit's records in `collection`.
    pub async fn working_set(&self, collection: Collection, unit: Unit) -> CensusResult<WorkingSet> {
        let documents = self.store.query(&self.unit_query(collection, unit)).await?;
        Ok(WorkingSet::from_snapshot(collection, documents, None))
    }

    /// Live read of a unit's records in `collection`.
    pub async fn subscribe(&self, collection: Collection, unit: Unit) -> CensusResult<Subscription> {
        Ok(self.store.subscribe(self.unit_query(collection, unit)).await?)
    }

    /// The serial the next record in `collection` for `unit` would receive.
    pub async fn next_serial(&self, collection: Collection, unit: Unit) -> CensusResult<String> {
        Ok(self.working_set(collection, unit).await?.next_serial())
    }
}

fn require_id(record: &PatientRecord) -> CensusResult<()> {
    if record.id.is_empty() {
        return Err(CensusError::InvalidInput(
            "record has not been saved yet".into(),
        ));
    }
    Ok(())
}

fn build_record(
    id: String,
    unit: Unit,
    serial_number: String,
    valid: ValidAdmission,
    status: PatientStatus,
    today: NaiveDate,
) -> PatientRecord {
    let length_of_stay = saved_length_of_stay(valid.admission_date, valid.discharge_date, today);
    PatientRecord {
        id,
        unit,
        serial_number,
        registration_number: valid.registration_number.into_string(),
        name: valid.name.into_string(),
        gender: valid.gender,
        category: valid.category,
        location: valid.location.into_string(),
        code_status: valid.code_status,
        consultant: valid.consultant.into_string(),
        admission_date: valid.admission_date,
        discharge_date: valid.discharge_date,
        length_of_stay,
        status,
    }
}
