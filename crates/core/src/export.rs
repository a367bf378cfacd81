//! Export projection of a view.
//!
//! Turns the records currently on screen into fixed-column rows. Rendering the rows as CSV,
//! PDF or anything else is left to the caller.

use crate::constants::EXPORT_HEADERS;
use crate::length_of_stay::display_length_of_stay;
use crate::record::{Collection, PatientRecord, Unit};
use chrono::NaiveDate;
use serde::Serialize;

/// Placeholder for an empty out-date.
pub const NOT_APPLICABLE: &str = "N/A";

/// One exported record, columns in [`EXPORT_HEADERS`] order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub serial_number: String,
    pub registration_number: String,
    pub name: String,
    pub gender: String,
    pub category: String,
    pub code_status: String,
    pub consultant: String,
    pub admission_date: String,
    pub discharge_date: String,
    pub length_of_stay: u32,
}

impl ExportRow {
    pub fn from_record(record: &PatientRecord, today: NaiveDate) -> Self {
        Self {
            serial_number: record.serial_number.clone(),
            registration_number: record.registration_number.clone(),
            name: record.name.clone(),
            gender: record.gender.to_string(),
            category: record.category.to_string(),
            code_status: record.code_status.to_string(),
            consultant: record.consultant.clone(),
            admission_date: record.admission_date.to_string(),
            discharge_date: record
                .discharge_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
            length_of_stay: display_length_of_stay(record, today),
        }
    }

    /// Cell values as text, in header order.
    pub fn cells(&self) -> [String; EXPORT_HEADERS.len()] {
        [
            self.serial_number.clone(),
            self.registration_number.clone(),
            self.name.clone(),
            self.gender.clone(),
            self.category.clone(),
            self.code_status.clone(),
            self.consultant.clone(),
            self.admission_date.clone(),
            self.discharge_date.clone(),
            self.length_of_stay.to_string(),
        ]
    }
}

/// Report title for a unit's census or archive.
pub fn export_title(unit: Unit, collection: Collection) -> String {
    match collection {
        Collection::Census => format!("{unit} Clinical Census"),
        Collection::Mortality => format!("{unit} Mortality Archive"),
    }
}

/// Projects a view, keeping its order.
pub fn export_rows<'a, I>(records: I, today: NaiveDate) -> Vec<ExportRow>
where
    I: IntoIterator<Item = &'a PatientRecord>,
{
    records
        .into_iter()
        .map(|record| ExportRow::from_record(record, today))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Category, CodeStatus, Gender, PatientStatus};

    fn record() -> PatientRecord {
        PatientRecord {
            id: "x".into(),
            unit: Unit::Transplant,
            serial_number: "004".into(),
            registration_number: "MR-77".into(),
            name: "NADIA KHAN".into(),
            gender: Gender::Female,
            category: Category::Nephrology,
            location: "Pvt Ward".into(),
            code_status: CodeStatus::FullCode,
            consultant: "Dr. Zohaib".into(),
            admission_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            discharge_date: None,
            length_of_stay: 0,
            status: PatientStatus::Active,
        }
    }

    #[test]
    fn test_active_row_has_na_out_date_and_live_los() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        let row = ExportRow::from_record(&record(), today);
        assert_eq!(
            row.cells(),
            [
                "004",
                "MR-77",
                "NADIA KHAN",
                "Female",
                "Nephrology",
                "Full Code",
                "Dr. Zohaib",
                "2025-03-01",
                "N/A",
                "10"
            ]
            .map(String::from)
        );
    }

    #[test]
    fn test_archived_row_uses_date_of_death() {
        let mut archived = record();
        archived.status = PatientStatus::Deceased;
        archived.discharge_date = NaiveDate::from_ymd_opt(2025, 3, 4);
        archived.length_of_stay = 3;

        let rows = export_rows([&archived], NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(rows[0].discharge_date, "2025-03-04");
        assert_eq!(rows[0].length_of_stay, 3);
    }

    #[test]
    fn test_titles() {
        assert_eq!(export_title(Unit::Transplant, Collection::Census), "TRANSPLANT Clinical Census");
        assert_eq!(export_title(Unit::FourthWard, Collection::Mortality), "4th-WARD Mortality Archive");
        assert_eq!(EXPORT_HEADERS[9], "LOS");
    }
}
