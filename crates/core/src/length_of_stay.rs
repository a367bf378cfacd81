//! Length-of-stay calculation.
//!
//! One calculation backs both the value cached on a record at save time and the value shown
//! for records that are still in the unit (where "today" keeps moving). Dates are compared as
//! calendar days, so the time of day never shifts the count.

use crate::record::{PatientRecord, PatientStatus};
use chrono::NaiveDate;

/// Whole days from `admission` to `reference`, clamped at zero.
pub fn length_of_stay_days(admission: NaiveDate, reference: NaiveDate) -> u32 {
    let days = reference.signed_duration_since(admission).num_days().max(0);
    u32::try_from(days).unwrap_or(u32::MAX)
}

/// The date a stay is measured up to: the discharge (or death) date when set, else today.
pub fn reference_date(discharge: Option<NaiveDate>, today: NaiveDate) -> NaiveDate {
    discharge.unwrap_or(today)
}

/// Value persisted on the record when it is saved.
pub fn saved_length_of_stay(
    admission: NaiveDate,
    discharge: Option<NaiveDate>,
    today: NaiveDate,
) -> u32 {
    length_of_stay_days(admission, reference_date(discharge, today))
}

/// Value to show for a record right now.
///
/// Active records are recomputed against `today`. Discharged and archived records are
/// measured to their discharge date; the cached value is only used if that date is missing
/// on a record that is no longer active.
pub fn display_length_of_stay(record: &PatientRecord, today: NaiveDate) -> u32 {
    match (record.status, record.discharge_date) {
        (PatientStatus::Active, discharge) => {
            saved_length_of_stay(record.admission_date, discharge, today)
        }
        (_, Some(discharge)) => length_of_stay_days(record.admission_date, discharge),
        (_, None) => record.length_of_stay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Category, CodeStatus, Gender, Unit};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(status: PatientStatus, discharge: Option<NaiveDate>, cached: u32) -> PatientRecord {
        PatientRecord {
            id: "00112233445566778899aabbccddeeff".into(),
            unit: Unit::Hdu,
            serial_number: "001".into(),
            registration_number: "MR1".into(),
            name: "ALI RAZA".into(),
            gender: Gender::Male,
            category: Category::Medicine,
            location: "WARD".into(),
            code_status: CodeStatus::Dnr,
            consultant: "Dr. Bilal".into(),
            admission_date: date(2024, 1, 10),
            discharge_date: discharge,
            length_of_stay: cached,
            status,
        }
    }

    #[test]
    fn test_same_day_is_zero() {
        assert_eq!(length_of_stay_days(date(2024, 1, 10), date(2024, 1, 10)), 0);
    }

    #[test]
    fn test_counts_whole_days() {
        assert_eq!(length_of_stay_days(date(2024, 1, 10), date(2024, 1, 15)), 5);
        assert_eq!(length_of_stay_days(date(2024, 2, 28), date(2024, 3, 1)), 2);
    }

    #[test]
    fn test_reference_before_admission_clamps_to_zero() {
        assert_eq!(length_of_stay_days(date(2024, 1, 15), date(2024, 1, 10)), 0);
    }

    #[test]
    fn test_display_recomputes_active_records_against_today() {
        let active = record(PatientStatus::Active, None, 1);
        assert_eq!(display_length_of_stay(&active, date(2024, 1, 20)), 10);
    }

    #[test]
    fn test_display_and_save_agree_for_discharged_records() {
        let discharge = Some(date(2024, 1, 19));
        let discharged = record(PatientStatus::Discharged, discharge, 9);
        let today = date(2024, 6, 1);

        assert_eq!(display_length_of_stay(&discharged, today), 9);
        assert_eq!(saved_length_of_stay(date(2024, 1, 10), discharge, today), 9);
    }

    #[test]
    fn test_display_falls_back_to_cache_without_discharge_date() {
        let legacy = record(PatientStatus::Deceased, None, 3);
        assert_eq!(display_length_of_stay(&legacy, date(2024, 6, 1)), 3);
    }
}
