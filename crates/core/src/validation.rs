//! Admission form validation.
//!
//! Raw form input is checked field by field before anything reaches the store. Failures are
//! collected into [`ValidationErrors`], keyed by the field that caused them, so a caller can
//! show each message next to its input. Valid input is normalised (trimmed, names and
//! registration numbers uppercased) into a [`ValidAdmission`].

use crate::record::{Category, CodeStatus, Gender, PatientRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use ward_types::NonEmptyText;

const DATE_FORMAT: &str = "%Y-%m-%d";
const MIN_NAME_LEN: usize = 3;

/// Form fields that can carry a validation error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    RegNo,
    Gender,
    Category,
    Location,
    CodeStatus,
    Consultant,
    AdmissionDate,
    DischargeDate,
}

impl Field {
    /// Stable identifier used by the presentation layer.
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::RegNo => "regNo",
            Field::Gender => "gender",
            Field::Category => "category",
            Field::Location => "location",
            Field::CodeStatus => "codeStatus",
            Field::Consultant => "consultant",
            Field::AdmissionDate => "admissionDate",
            Field::DischargeDate => "dischargeDate",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Field {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Field-level validation failures. At most one message per field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<Field, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message for `field`, replacing any earlier one.
    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Raw admission form input, as typed.
///
/// Dates are `YYYY-MM-DD`; an empty discharge date means "not discharged".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdmissionForm {
    #[serde(rename = "regNo")]
    pub registration_number: String,
    pub name: String,
    pub gender: String,
    pub category: String,
    pub location: String,
    pub code_status: String,
    pub consultant: String,
    pub admission_date: String,
    pub discharge_date: String,
}

impl AdmissionForm {
    /// Pre-fills the form from an existing record, for editing.
    pub fn from_record(record: &PatientRecord) -> Self {
        Self {
            registration_number: record.registration_number.clone(),
            name: record.name.clone(),
            gender: record.gender.to_string(),
            category: record.category.to_string(),
            location: record.location.clone(),
            code_status: record.code_status.to_string(),
            consultant: record.consultant.clone(),
            admission_date: record.admission_date.format(DATE_FORMAT).to_string(),
            discharge_date: record
                .discharge_date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }
}

/// Admission input that passed validation, normalised for storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidAdmission {
    pub registration_number: NonEmptyText,
    pub name: NonEmptyText,
    pub gender: Gender,
    pub category: Category,
    pub location: NonEmptyText,
    pub code_status: CodeStatus,
    pub consultant: NonEmptyText,
    pub admission_date: NaiveDate,
    pub discharge_date: Option<NaiveDate>,
}

/// Validates a census admission form.
///
/// `today` bounds the admission date: admissions may be back-dated but not future-dated.
pub fn validate_admission(
    form: &AdmissionForm,
    today: NaiveDate,
) -> Result<ValidAdmission, ValidationErrors> {
    validate_form(form, today, false)
}

/// Validates a mortality archive entry, where the date of death is mandatory.
pub fn validate_mortality_entry(
    form: &AdmissionForm,
    today: NaiveDate,
) -> Result<ValidAdmission, ValidationErrors> {
    validate_form(form, today, true)
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).ok()
}

fn validate_form(
    form: &AdmissionForm,
    today: NaiveDate,
    discharge_required: bool,
) -> Result<ValidAdmission, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = validate_name(&form.name, &mut errors);
    let registration_number = validate_registration_number(&form.registration_number, &mut errors);
    let gender = parse_selection::<Gender>(&form.gender, Field::Gender, &mut errors);
    let category = parse_selection::<Category>(&form.category, Field::Category, &mut errors);
    let code_status = parse_selection::<CodeStatus>(&form.code_status, Field::CodeStatus, &mut errors);

    let location = NonEmptyText::new(&form.location).ok();
    if location.is_none() {
        errors.insert(Field::Location, "Selection required.");
    }

    let consultant = NonEmptyText::new(&form.consultant).ok();
    if consultant.is_none() {
        errors.insert(Field::Consultant, "Consultant required.");
    }

    let admission_date = if form.admission_date.trim().is_empty() {
        errors.insert(Field::AdmissionDate, "Admission date required.");
        None
    } else {
        match parse_date(&form.admission_date) {
            Some(date) if date > today => {
                errors.insert(Field::AdmissionDate, "Admission cannot be in future.");
                None
            }
            Some(date) => Some(date),
            None => {
                errors.insert(Field::AdmissionDate, "Invalid date.");
                None
            }
        }
    };

    let discharge_date = if form.discharge_date.trim().is_empty() {
        if discharge_required {
            errors.insert(Field::DischargeDate, "Date of death required.");
        }
        None
    } else {
        match parse_date(&form.discharge_date) {
            Some(date) => {
                if admission_date.is_some_and(|admitted| date < admitted) {
                    errors.insert(Field::DischargeDate, "Discharge cannot be before admission.");
                }
                Some(date)
            }
            None => {
                errors.insert(Field::DischargeDate, "Invalid date.");
                None
            }
        }
    };

    match (
        name,
        registration_number,
        gender,
        category,
        location,
        code_status,
        consultant,
        admission_date,
    ) {
        (
            Some(name),
            Some(registration_number),
            Some(gender),
            Some(category),
            Some(location),
            Some(code_status),
            Some(consultant),
            Some(admission_date),
        ) if errors.is_empty() => Ok(ValidAdmission {
            registration_number,
            name,
            gender,
            category,
            location,
            code_status,
            consultant,
            admission_date,
            discharge_date,
        }),
        _ => Err(errors),
    }
}

fn validate_name(input: &str, errors: &mut ValidationErrors) -> Option<NonEmptyText> {
    let trimmed = input.trim();
    if trimmed.chars().count() < MIN_NAME_LEN {
        errors.insert(Field::Name, "Name must be at least 3 characters.");
    }
    let letters_only = trimmed
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || c == '.' || c == '-');
    if !trimmed.is_empty() && !letters_only {
        errors.insert(Field::Name, "Name should only contain letters.");
    }
    if errors.contains(Field::Name) {
        return None;
    }
    NonEmptyText::new_uppercase(trimmed).ok()
}

fn validate_registration_number(
    input: &str,
    errors: &mut ValidationErrors,
) -> Option<NonEmptyText> {
    let Ok(text) = NonEmptyText::new_uppercase(input) else {
        errors.insert(Field::RegNo, "MR Number is required.");
        return None;
    };
    let well_formed = text
        .as_str()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !well_formed {
        errors.insert(Field::RegNo, "Invalid format.");
        return None;
    }
    Some(text)
}

fn parse_selection<T>(input: &str, field: Field, errors: &mut ValidationErrors) -> Option<T>
where
    T: std::str::FromStr,
{
    if input.trim().is_empty() {
        errors.insert(field, "Selection required.");
        return None;
    }
    match input.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.insert(field, "Invalid selection.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
    }

    fn valid_form() -> AdmissionForm {
        AdmissionForm {
            registration_number: " mr-4521 ".into(),
            name: "  zainab  bibi ".into(),
            gender: "Female".into(),
            category: "Cardiology".into(),
            location: "ICU".into(),
            code_status: "DNR".into(),
            consultant: "Dr. Aysha".into(),
            admission_date: "2025-03-01".into(),
            discharge_date: String::new(),
        }
    }

    #[test]
    fn test_valid_form_is_normalised() {
        let valid = validate_admission(&valid_form(), today()).unwrap();

        assert_eq!(valid.name.as_str(), "ZAINAB  BIBI");
        assert_eq!(valid.registration_number.as_str(), "MR-4521");
        assert_eq!(valid.gender, Gender::Female);
        assert_eq!(valid.code_status, CodeStatus::Dnr);
        assert_eq!(valid.admission_date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(valid.discharge_date, None);
    }

    #[test]
    fn test_empty_form_reports_every_required_field() {
        let errors = validate_admission(&AdmissionForm::default(), today()).unwrap_err();

        assert_eq!(errors.get(Field::Name), Some("Name must be at least 3 characters."));
        assert_eq!(errors.get(Field::RegNo), Some("MR Number is required."));
        assert_eq!(errors.get(Field::Gender), Some("Selection required."));
        assert_eq!(errors.get(Field::Category), Some("Selection required."));
        assert_eq!(errors.get(Field::Location), Some("Selection required."));
        assert_eq!(errors.get(Field::CodeStatus), Some("Selection required."));
        assert_eq!(errors.get(Field::Consultant), Some("Consultant required."));
        assert_eq!(errors.get(Field::AdmissionDate), Some("Admission date required."));
        assert!(!errors.contains(Field::DischargeDate));
        assert_eq!(errors.len(), 8);
    }

    #[test]
    fn test_name_rules() {
        let mut form = valid_form();
        form.name = "Al".into();
        let errors = validate_admission(&form, today()).unwrap_err();
        assert_eq!(errors.get(Field::Name), Some("Name must be at least 3 characters."));

        form.name = "R2D2 Unit".into();
        let errors = validate_admission(&form, today()).unwrap_err();
        assert_eq!(errors.get(Field::Name), Some("Name should only contain letters."));

        form.name = "Mary-Jane O.".into();
        assert!(validate_admission(&form, today()).is_ok());
    }

    #[test]
    fn test_registration_number_format() {
        let mut form = valid_form();
        form.registration_number = "MR 45/21".into();
        let errors = validate_admission(&form, today()).unwrap_err();
        assert_eq!(errors.get(Field::RegNo), Some("Invalid format."));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_unknown_selection_is_invalid() {
        let mut form = valid_form();
        form.category = "Dermatology".into();
        let errors = validate_admission(&form, today()).unwrap_err();
        assert_eq!(errors.get(Field::Category), Some("Invalid selection."));
    }

    #[test]
    fn test_admission_cannot_be_in_future() {
        let mut form = valid_form();
        form.admission_date = "2025-03-16".into();
        let errors = validate_admission(&form, today()).unwrap_err();
        assert_eq!(errors.get(Field::AdmissionDate), Some("Admission cannot be in future."));

        form.admission_date = "2025-03-15".into();
        assert!(validate_admission(&form, today()).is_ok());
    }

    #[test]
    fn test_discharge_cannot_precede_admission() {
        let mut form = valid_form();
        form.discharge_date = "2025-02-28".into();
        let errors = validate_admission(&form, today()).unwrap_err();
        assert_eq!(
            errors.get(Field::DischargeDate),
            Some("Discharge cannot be before admission.")
        );

        form.discharge_date = "2025-03-01".into();
        let valid = validate_admission(&form, today()).unwrap();
        assert_eq!(valid.discharge_date, Some(valid.admission_date));
    }

    #[test]
    fn test_malformed_dates() {
        let mut form = valid_form();
        form.admission_date = "01/03/2025".into();
        form.discharge_date = "soon".into();
        let errors = validate_admission(&form, today()).unwrap_err();
        assert_eq!(errors.get(Field::AdmissionDate), Some("Invalid date."));
        assert_eq!(errors.get(Field::DischargeDate), Some("Invalid date."));
    }

    #[test]
    fn test_mortality_entry_requires_date_of_death() {
        let errors = validate_mortality_entry(&valid_form(), today()).unwrap_err();
        assert_eq!(errors.get(Field::DischargeDate), Some("Date of death required."));

        let mut form = valid_form();
        form.discharge_date = "2025-03-10".into();
        assert!(validate_mortality_entry(&form, today()).is_ok());
    }

    #[test]
    fn test_errors_serialise_by_field_name() {
        let mut errors = ValidationErrors::new();
        errors.insert(Field::CodeStatus, "Selection required.");
        errors.insert(Field::RegNo, "Invalid format.");

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["codeStatus"], "Selection required.");
        assert_eq!(json["regNo"], "Invalid format.");
        assert_eq!(
            errors.to_string(),
            "regNo: Invalid format.; codeStatus: Selection required."
        );
    }

    #[test]
    fn test_form_round_trips_from_record() {
        let valid = validate_admission(&valid_form(), today()).unwrap();
        let record = PatientRecord {
            id: String::new(),
            unit: crate::record::Unit::Icu,
            serial_number: "001".into(),
            registration_number: valid.registration_number.to_string(),
            name: valid.name.to_string(),
            gender: valid.gender,
            category: valid.category,
            location: valid.location.to_string(),
            code_status: valid.code_status,
            consultant: valid.consultant.to_string(),
            admission_date: valid.admission_date,
            discharge_date: None,
            length_of_stay: 14,
            status: crate::record::PatientStatus::Active,
        };

        let form = AdmissionForm::from_record(&record);
        assert_eq!(form.admission_date, "2025-03-01");
        assert_eq!(form.discharge_date, "");
        assert_eq!(form.code_status, "DNR");
        assert!(validate_admission(&form, today()).is_ok());
    }
}
