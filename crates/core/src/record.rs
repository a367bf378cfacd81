//! Patient admission records and their classification fields.
//!
//! A [`PatientRecord`] is one admission episode. The same structure is stored in the live
//! census collection and, once archived, in the mortality archive collection; which one holds
//! it follows from [`PatientRecord::status`].

use crate::constants::ID_FIELD;
use crate::store::Document;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Returned when a string does not name a value of one of the closed enumerations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

wire_enum! {
    /// Clinical unit scoping records.
    pub enum Unit ("unit") {
        Hdu => "HDU",
        Icu => "ICU",
        Transplant => "TRANSPLANT",
        FourthWard => "4th-WARD",
        Ward5 => "WARD5",
    }
}

impl Unit {
    /// Human-facing unit name.
    pub fn label(self) -> &'static str {
        match self {
            Unit::Hdu => "High Dependency",
            Unit::Icu => "Intensive Care",
            Unit::Transplant => "Transplant Bay",
            Unit::FourthWard => "Ward",
            Unit::Ward5 => "5th Floor Ward",
        }
    }
}

wire_enum! {
    pub enum Gender ("gender") {
        Male => "Male",
        Female => "Female",
    }
}

wire_enum! {
    /// Admitting specialty.
    pub enum Category ("category") {
        Medicine => "Medicine",
        Surgery => "Surgery",
        Urology => "Urology",
        Nephrology => "Nephrology",
        Cardiology => "Cardiology",
        Others => "Others",
    }
}

wire_enum! {
    /// Resuscitation status.
    pub enum CodeStatus ("code status") {
        FullCode => "Full Code",
        Dnr => "DNR",
        Dni => "DNI",
    }
}

wire_enum! {
    /// Lifecycle state of an admission episode.
    ///
    /// `Deceased` records live only in the mortality archive; the other two only in the live
    /// census.
    pub enum PatientStatus ("status") {
        Active => "Active",
        Discharged => "Discharged",
        Deceased => "Deceased",
    }
}

impl Default for PatientStatus {
    fn default() -> Self {
        PatientStatus::Active
    }
}

/// The two logically disjoint record collections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Currently tracked admissions (Active or Discharged).
    Census,
    /// Deceased patients, populated by the archive transition.
    Mortality,
}

/// One admission episode.
///
/// Field names on the stored document follow the dashboard's established keys
/// (`serialNo`, `regNo`, `admissionDate`, ...). `dischargeDate` is always written, as `null`
/// when unset, so that a full-record update clears it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    /// Opaque identifier assigned by the document store.
    #[serde(default)]
    pub id: String,
    pub unit: Unit,
    /// Unit-scoped display serial (`001`). Archived records keep the serial they were admitted
    /// under.
    #[serde(rename = "serialNo", default)]
    pub serial_number: String,
    /// External medical record number, uppercase.
    #[serde(rename = "regNo")]
    pub registration_number: String,
    /// Patient name, uppercase.
    pub name: String,
    pub gender: Gender,
    pub category: Category,
    pub location: String,
    pub code_status: CodeStatus,
    pub consultant: String,
    pub admission_date: NaiveDate,
    /// Discharge date, or date of death for archived records.
    #[serde(default)]
    pub discharge_date: Option<NaiveDate>,
    /// Whole days, cached at save time.
    #[serde(default)]
    pub length_of_stay: u32,
    #[serde(default)]
    pub status: PatientStatus,
}

impl PatientRecord {
    /// The collection that holds a record in this state.
    pub fn collection(&self) -> Collection {
        match self.status {
            PatientStatus::Deceased => Collection::Mortality,
            PatientStatus::Active | PatientStatus::Discharged => Collection::Census,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.status == PatientStatus::Deceased
    }

    /// Encodes the record as a store document.
    ///
    /// The `id` field is left out when the record has not been persisted yet; the store
    /// fills it in on create.
    pub fn to_document(&self) -> Result<Document, serde_json::Error> {
        let value = serde_json::to_value(self)?;
        let mut document = match value {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(serde::ser::Error::custom(format!(
                    "patient record encoded as non-object: {other}"
                )))
            }
        };
        if self.id.is_empty() {
            document.remove(ID_FIELD);
        }
        Ok(document)
    }

    /// Decodes a store document.
    pub fn from_document(document: Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> PatientRecord {
        PatientRecord {
            id: "550e8400e29b41d4a716446655440000".into(),
            unit: Unit::FourthWard,
            serial_number: "007".into(),
            registration_number: "MR-1001".into(),
            name: "AYESHA KHAN".into(),
            gender: Gender::Female,
            category: Category::Nephrology,
            location: "Pvt Ward".into(),
            code_status: CodeStatus::FullCode,
            consultant: "Dr. Raheela".into(),
            admission_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            discharge_date: None,
            length_of_stay: 4,
            status: PatientStatus::Active,
        }
    }

    #[test]
    fn test_document_uses_dashboard_keys() {
        let document = sample().to_document().unwrap();

        assert_eq!(document["serialNo"], json!("007"));
        assert_eq!(document["regNo"], json!("MR-1001"));
        assert_eq!(document["unit"], json!("4th-WARD"));
        assert_eq!(document["codeStatus"], json!("Full Code"));
        assert_eq!(document["admissionDate"], json!("2025-03-01"));
        assert_eq!(document["dischargeDate"], serde_json::Value::Null);
        assert_eq!(document["lengthOfStay"], json!(4));
        assert_eq!(document["status"], json!("Active"));
    }

    #[test]
    fn test_unsaved_record_omits_id() {
        let mut record = sample();
        record.id.clear();
        let document = record.to_document().unwrap();
        assert!(!document.contains_key("id"));
    }

    #[test]
    fn test_from_document_defaults_missing_status() {
        let mut document = sample().to_document().unwrap();
        document.remove("status");
        document.remove("dischargeDate");

        let record = PatientRecord::from_document(document).unwrap();
        assert_eq!(record.status, PatientStatus::Active);
        assert_eq!(record.discharge_date, None);
    }

    #[test]
    fn test_from_document_rejects_unknown_unit() {
        let mut document = sample().to_document().unwrap();
        document.insert("unit".into(), json!("CCU"));
        assert!(PatientRecord::from_document(document).is_err());
    }

    #[test]
    fn test_collection_follows_status() {
        let mut record = sample();
        assert_eq!(record.collection(), Collection::Census);
        record.status = PatientStatus::Discharged;
        assert_eq!(record.collection(), Collection::Census);
        record.status = PatientStatus::Deceased;
        assert_eq!(record.collection(), Collection::Mortality);
        assert!(record.is_archived());
    }

    #[test]
    fn test_enum_parsing_is_case_insensitive() {
        assert_eq!("full code".parse::<CodeStatus>().unwrap(), CodeStatus::FullCode);
        assert_eq!(" icu ".parse::<Unit>().unwrap(), Unit::Icu);
        assert_eq!("4TH-WARD".parse::<Unit>().unwrap(), Unit::FourthWard);

        let err = "Pediatrics".parse::<Category>().unwrap_err();
        assert_eq!(err.kind, "category");
        assert_eq!(err.to_string(), "unknown category: 'Pediatrics'");
    }
}
