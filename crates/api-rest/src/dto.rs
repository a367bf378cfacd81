//! Request and response bodies.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use ward_core::constants::{KNOWN_CONSULTANTS, KNOWN_LOCATIONS};
use ward_core::length_of_stay::display_length_of_stay;
use ward_core::{AdmissionForm, Category, CodeStatus, Gender, PatientRecord, Unit};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Admission form as submitted. Dates are `YYYY-MM-DD`.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AdmissionReq {
    pub reg_no: String,
    pub name: String,
    pub gender: String,
    pub category: String,
    pub location: String,
    pub code_status: String,
    pub consultant: String,
    pub admission_date: String,
    /// Discharge date, or date of death for archive edits. Empty when not set.
    pub discharge_date: String,
}

impl From<AdmissionReq> for AdmissionForm {
    fn from(req: AdmissionReq) -> Self {
        AdmissionForm {
            registration_number: req.reg_no,
            name: req.name,
            gender: req.gender,
            category: req.category,
            location: req.location,
            code_status: req.code_status,
            consultant: req.consultant,
            admission_date: req.admission_date,
            discharge_date: req.discharge_date,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchiveReq {
    /// `YYYY-MM-DD`. Defaults to the discharge date, then today.
    pub date_of_death: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordRes {
    pub id: String,
    pub unit: String,
    pub serial_no: String,
    pub reg_no: String,
    pub name: String,
    pub gender: String,
    pub category: String,
    pub location: String,
    pub code_status: String,
    pub consultant: String,
    pub admission_date: String,
    pub discharge_date: Option<String>,
    /// Days, recomputed for active records.
    pub length_of_stay: u32,
    pub status: String,
}

impl RecordRes {
    pub fn from_record(record: &PatientRecord, today: NaiveDate) -> Self {
        Self {
            id: record.id.clone(),
            unit: record.unit.to_string(),
            serial_no: record.serial_number.clone(),
            reg_no: record.registration_number.clone(),
            name: record.name.clone(),
            gender: record.gender.to_string(),
            category: record.category.to_string(),
            location: record.location.clone(),
            code_status: record.code_status.to_string(),
            consultant: record.consultant.clone(),
            admission_date: record.admission_date.to_string(),
            discharge_date: record.discharge_date.map(|d| d.to_string()),
            length_of_stay: display_length_of_stay(record, today),
            status: record.status.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordListRes {
    pub unit: String,
    pub title: String,
    /// Serial the next record would receive.
    pub next_serial: String,
    /// Records in the unit before search and date filtering.
    pub total: usize,
    pub records: Vec<RecordRes>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NextSerialRes {
    pub serial_no: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnitOption {
    pub code: String,
    pub label: String,
}

/// Choices offered by the admission form.
///
/// Gender, category and code status are closed lists. Locations and consultants are
/// suggestions; other values are accepted.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptionsRes {
    pub units: Vec<UnitOption>,
    pub genders: Vec<String>,
    pub categories: Vec<String>,
    pub code_statuses: Vec<String>,
    pub locations: Vec<String>,
    pub consultants: Vec<String>,
}

impl OptionsRes {
    pub fn current() -> Self {
        fn names<T: ToString>(values: &[T]) -> Vec<String> {
            values.iter().map(ToString::to_string).collect()
        }

        Self {
            units: Unit::ALL
                .iter()
                .map(|unit| UnitOption {
                    code: unit.to_string(),
                    label: unit.label().to_string(),
                })
                .collect(),
            genders: names(Gender::ALL),
            categories: names(Category::ALL),
            code_statuses: names(CodeStatus::ALL),
            locations: names(KNOWN_LOCATIONS),
            consultants: names(KNOWN_CONSULTANTS),
        }
    }
}

/// Search and date-window parameters for list endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Whitespace-separated terms; every term must match.
    pub search: Option<String>,
    /// Inclusive start date, `YYYY-MM-DD`.
    pub from: Option<String>,
    /// Inclusive end date, `YYYY-MM-DD`.
    pub to: Option<String>,
}
