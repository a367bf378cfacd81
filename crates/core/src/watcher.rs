//! Live working sets.
//!
//! A [`CensusWatcher`] follows one unit's records in one collection. Every store snapshot
//! replaces the [`WorkingSet`] wholesale; nothing is patched incrementally, so counts,
//! ordering and serial previews are always derived from the latest complete result set.

use crate::error::{CensusError, CensusResult};
use crate::lifecycle::CensusService;
use crate::record::{Collection, PatientRecord, Unit};
use crate::serial::{next_serial_for, SerialScheme};
use crate::store::{Document, StoreError, Subscription};
use std::cmp::Reverse;
use std::collections::BTreeSet;

/// One snapshot of a unit's records, ordered by serial number, highest first.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkingSet {
    collection: Collection,
    records: Vec<PatientRecord>,
    newly_added: BTreeSet<String>,
}

impl WorkingSet {
    pub fn empty(collection: Collection) -> Self {
        Self {
            collection,
            records: Vec::new(),
            newly_added: BTreeSet::new(),
        }
    }

    /// Builds a working set from a store snapshot.
    ///
    /// Documents that do not decode as records are logged and left out. Ids absent from
    /// `previous` are reported by [`WorkingSet::newly_added`]; with no previous snapshot
    /// nothing counts as new.
    pub fn from_snapshot(
        collection: Collection,
        documents: Vec<Document>,
        previous: Option<&WorkingSet>,
    ) -> Self {
        let mut records: Vec<PatientRecord> = documents
            .into_iter()
            .filter_map(|document| {
                let id = document
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("<unknown>")
                    .to_string();
                match PatientRecord::from_document(document) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::warn!("skipping malformed record {}: {}", id, e);
                        None
                    }
                }
            })
            .collect();

        let scheme = SerialScheme::for_collection(collection);
        records.sort_by_key(|r| Reverse(scheme.numeric_value(&r.serial_number).unwrap_or(0)));

        let newly_added = match previous {
            Some(previous) => records
                .iter()
                .filter(|r| previous.get(&r.id).is_none())
                .map(|r| r.id.clone())
                .collect(),
            None => BTreeSet::new(),
        };

        Self {
            collection,
            records,
            newly_added,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn records(&self) -> &[PatientRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&PatientRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Ids that appeared since the previous snapshot.
    pub fn newly_added(&self) -> &BTreeSet<String> {
        &self.newly_added
    }

    /// The serial the next record in this collection would receive.
    pub fn next_serial(&self) -> String {
        next_serial_for(SerialScheme::for_collection(self.collection), &self.records)
    }
}

/// Follows a unit's records in one collection.
#[derive(Debug)]
pub struct CensusWatcher {
    unit: Unit,
    subscription: Subscription,
    current: WorkingSet,
}

impl CensusWatcher {
    /// Subscribes and waits for the first snapshot.
    pub async fn open(
        service: &CensusService,
        collection: Collection,
        unit: Unit,
    ) -> CensusResult<Self> {
        let mut subscription = service.subscribe(collection, unit).await?;
        let documents = subscription.next_snapshot().await.ok_or_else(|| {
            CensusError::Store(StoreError::Unavailable("subscription closed".into()))
        })?;
        Ok(Self {
            unit,
            subscription,
            current: WorkingSet::from_snapshot(collection, documents, None),
        })
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn current(&self) -> &WorkingSet {
        &self.current
    }

    /// Waits for the next snapshot and makes it current.
    ///
    /// Returns `None` once the store has dropped the subscription.
    pub async fn changed(&mut self) -> Option<&WorkingSet> {
        let documents = self.subscription.next_snapshot().await?;
        self.current =
            WorkingSet::from_snapshot(self.current.collection, documents, Some(&self.current));
        Some(&self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::CoreConfig;
    use crate::context::{OperationContext, Role};
    use crate::record::PatientStatus;
    use crate::store::MemoryStore;
    use crate::validation::AdmissionForm;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn service() -> CensusService {
        let cfg = Arc::new(CoreConfig::with_defaults(PathBuf::from("unused")).unwrap());
        let today = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        CensusService::new(cfg, Arc::new(MemoryStore::new()), Arc::new(FixedClock(today)))
    }

    fn form(name: &str) -> AdmissionForm {
        AdmissionForm {
            registration_number: "MR-1".into(),
            name: name.into(),
            gender: "Female".into(),
            category: "Surgery".into(),
            location: "OT".into(),
            code_status: "DNI".into(),
            consultant: "Dr. Ruqaya".into(),
            admission_date: "2025-03-18".into(),
            discharge_date: String::new(),
        }
    }

    fn document(id: &str, serial: &str) -> Document {
        let value = json!({
            "id": id,
            "unit": "HDU",
            "serialNo": serial,
            "regNo": "MR-1",
            "name": "NAME",
            "gender": "Male",
            "category": "Medicine",
            "location": "WARD",
            "codeStatus": "Full Code",
            "consultant": "Dr. Bilal",
            "admissionDate": "2025-03-01",
            "dischargeDate": null,
            "lengthOfStay": 0,
            "status": "Active"
        });
        match value {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_snapshot_sorted_by_serial_descending() {
        let set = WorkingSet::from_snapshot(
            Collection::Census,
            vec![document("a", "003"), document("b", "010"), document("c", "001")],
            None,
        );
        let serials: Vec<_> = set.records().iter().map(|r| r.serial_number.as_str()).collect();
        assert_eq!(serials, vec!["010", "003", "001"]);
        assert_eq!(set.next_serial(), "011");
        assert!(set.newly_added().is_empty());
    }

    #[test]
    fn test_malformed_documents_are_skipped() {
        let mut broken = document("b", "002");
        broken.insert("codeStatus".into(), json!("Maybe"));

        let set = WorkingSet::from_snapshot(
            Collection::Census,
            vec![document("a", "001"), broken],
            None,
        );
        assert_eq!(set.len(), 1);
        assert!(set.get("a").is_some());
        assert!(set.get("b").is_none());
    }

    #[test]
    fn test_newly_added_relative_to_previous() {
        let first = WorkingSet::from_snapshot(Collection::Census, vec![document("a", "001")], None);
        let second = WorkingSet::from_snapshot(
            Collection::Census,
            vec![document("a", "001"), document("b", "002")],
            Some(&first),
        );
        assert_eq!(
            second.newly_added().iter().cloned().collect::<Vec<_>>(),
            vec!["b".to_string()]
        );
    }

    #[test]
    fn test_mortality_set_previews_prefixed_serial() {
        let set = WorkingSet::from_snapshot(
            Collection::Mortality,
            vec![document("a", "M-004"), document("b", "007")],
            None,
        );
        assert_eq!(set.records()[0].serial_number, "007");
        assert_eq!(set.next_serial(), "M-008");
        assert_eq!(WorkingSet::empty(Collection::Mortality).next_serial(), "M-001");
    }

    #[tokio::test]
    async fn test_watcher_follows_admissions_and_archives() {
        let service = service();
        let ctx = OperationContext::new(Unit::Icu, Role::Consultant);

        let mut census = CensusWatcher::open(&service, Collection::Census, Unit::Icu)
            .await
            .unwrap();
        let mut mortality = CensusWatcher::open(&service, Collection::Mortality, Unit::Icu)
            .await
            .unwrap();
        assert!(census.current().is_empty());
        assert_eq!(census.unit(), Unit::Icu);

        let record = service.admit(&ctx, &form("hina shah")).await.unwrap();
        let set = census.changed().await.unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.newly_added().contains(&record.id));
        assert_eq!(set.next_serial(), "002");

        service.archive(&ctx, &record, None).await.unwrap();

        let archive = mortality.changed().await.unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.records()[0].status, PatientStatus::Deceased);

        assert!(census.changed().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_watcher_ignores_other_units() {
        let service = service();
        let mut hdu = CensusWatcher::open(&service, Collection::Census, Unit::Hdu)
            .await
            .unwrap();

        service
            .admit(&OperationContext::new(Unit::Icu, Role::Admin), &form("hina shah"))
            .await
            .unwrap();

        let set = hdu.changed().await.unwrap();
        assert!(set.is_empty());
    }
}
