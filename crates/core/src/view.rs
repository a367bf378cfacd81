//! Filtered and sorted views over a working set.
//!
//! This is the presentation side of the read path: the lifecycle core never filters beyond
//! the unit, so free-text search, date windows and column sorting are applied here to an
//! already loaded set of records.

use crate::error::{CensusError, CensusResult};
use crate::length_of_stay::display_length_of_stay;
use crate::record::PatientRecord;
use crate::serial::SerialScheme;
use chrono::NaiveDate;
use std::cmp::Ordering;

/// Inclusive calendar window. Either end may be open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DateRange {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateRange {
    /// # Errors
    ///
    /// Returns [`CensusError::InvalidInput`] if both ends are given and `end` precedes `start`.
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> CensusResult<Self> {
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(CensusError::InvalidInput(format!(
                    "date range ends ({end}) before it starts ({start})"
                )));
            }
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }
}

/// Sortable columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    Serial,
    RegNo,
    Name,
    Category,
    Location,
    CodeStatus,
    Consultant,
    AdmissionDate,
    DischargeDate,
    LengthOfStay,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Search, date window and ordering applied to a working set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CensusFilter {
    tokens: Vec<String>,
    range: DateRange,
    sort: Option<(SortKey, SortDirection)>,
}

impl CensusFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every whitespace-separated token must appear, case-insensitively, in at least one of
    /// the searchable fields.
    pub fn search(mut self, text: &str) -> Self {
        self.tokens = text.split_whitespace().map(str::to_lowercase).collect();
        self
    }

    /// Restricts by admission date for live records and by date of death for archived ones.
    pub fn within(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    pub fn sort_by(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort = Some((key, direction));
        self
    }

    pub fn matches(&self, record: &PatientRecord) -> bool {
        self.matches_search(record) && self.matches_range(record)
    }

    fn matches_search(&self, record: &PatientRecord) -> bool {
        let fields = [
            record.name.to_lowercase(),
            record.registration_number.to_lowercase(),
            record.consultant.to_lowercase(),
            record.code_status.as_str().to_lowercase(),
            record.category.as_str().to_lowercase(),
            record.location.to_lowercase(),
            record.serial_number.to_lowercase(),
            record.status.as_str().to_lowercase(),
        ];
        self.tokens
            .iter()
            .all(|token| fields.iter().any(|field| field.contains(token.as_str())))
    }

    fn matches_range(&self, record: &PatientRecord) -> bool {
        if self.range.is_open() {
            return true;
        }
        let date = if record.is_archived() {
            record.discharge_date
        } else {
            Some(record.admission_date)
        };
        date.is_some_and(|d| self.range.contains(d))
    }

    /// Filters `records` and, if a sort is set, orders the result. Without a sort the input
    /// order is kept.
    ///
    /// `today` is used for length-of-stay ordering of active records.
    pub fn apply<'a>(&self, records: &'a [PatientRecord], today: NaiveDate) -> Vec<&'a PatientRecord> {
        let mut view: Vec<&PatientRecord> = records.iter().filter(|r| self.matches(r)).collect();
        if let Some((key, direction)) = self.sort {
            view.sort_by(|a, b| compare(a, b, key, direction, today));
        }
        view
    }
}

/// Orders two records by `key`. Missing values sort last in either direction.
fn compare(
    a: &PatientRecord,
    b: &PatientRecord,
    key: SortKey,
    direction: SortDirection,
    today: NaiveDate,
) -> Ordering {
    let directed = |ordering: Ordering| match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    };
    let text = |x: &str, y: &str| directed(x.to_lowercase().cmp(&y.to_lowercase()));

    match key {
        SortKey::Serial => {
            let value = |r: &PatientRecord| {
                SerialScheme::for_collection(r.collection())
                    .numeric_value(&r.serial_number)
                    .unwrap_or(0)
            };
            directed(value(a).cmp(&value(b)))
        }
        SortKey::RegNo => text(&a.registration_number, &b.registration_number),
        SortKey::Name => text(&a.name, &b.name),
        SortKey::Category => text(a.category.as_str(), b.category.as_str()),
        SortKey::Location => text(&a.location, &b.location),
        SortKey::CodeStatus => text(a.code_status.as_str(), b.code_status.as_str()),
        SortKey::Consultant => text(&a.consultant, &b.consultant),
        SortKey::AdmissionDate => directed(a.admission_date.cmp(&b.admission_date)),
        SortKey::DischargeDate => match (a.discharge_date, b.discharge_date) {
            (Some(x), Some(y)) => directed(x.cmp(&y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::LengthOfStay => directed(
            display_length_of_stay(a, today).cmp(&display_length_of_stay(b, today)),
        ),
    }
}
