use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use leadflow_common::{BackendError, LeadBackend, LeadId, LeadStatus, RawLeadRecord};

/// Authoritative in-process backend.
///
/// Moves are applied the way a server would: the lead is removed from its
/// column, inserted at the clamped position of the target column, and both
/// columns are renumbered densely. Useful for tests and `--demo` runs.
#[derive(Default)]
pub struct InMemoryLeadBackend {
    records: Mutex<Vec<RawLeadRecord>>,
    reject_moves: AtomicBool,
    fail_fetches: AtomicBool,
    move_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl InMemoryLeadBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<RawLeadRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// A small seeded pipeline spread over every status.
    pub fn demo() -> Self {
        let base = Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).single().unwrap_or_else(Utc::now);
        let layout: [(LeadStatus, &[&str]); 6] = [
            (LeadStatus::New, &["lead-101", "lead-102", "lead-103"]),
            (LeadStatus::Contacted, &["lead-201", "lead-202"]),
            (LeadStatus::InspectionScheduled, &["lead-301"]),
            (LeadStatus::QuoteSent, &["lead-401", "lead-402"]),
            (LeadStatus::Won, &["lead-501"]),
            (LeadStatus::Lost, &[]),
        ];
        let mut records = Vec::new();
        for (status, ids) in layout {
            for (i, id) in ids.iter().enumerate() {
                records.push(RawLeadRecord {
                    id: LeadId::from(*id),
                    status: status.as_str().to_string(),
                    position: i as i64,
                    created_at: base + Duration::hours(records.len() as i64),
                });
            }
        }
        Self::with_records(records)
    }

    /// Make every move fail with a 409 until switched off.
    pub fn reject_moves(&self, reject: bool) {
        self.reject_moves.store(reject, Ordering::SeqCst);
    }

    /// Make every fetch fail until switched off.
    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn move_calls(&self) -> usize {
        self.move_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Replace the stored records, e.g. to simulate another user's edit.
    pub fn set_records(&self, records: Vec<RawLeadRecord>) {
        *self.lock() = records;
    }

    pub fn records(&self) -> Vec<RawLeadRecord> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RawLeadRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Indices into `records` for one status, in column order.
fn column_indices(records: &[RawLeadRecord], status: &str, skip: &LeadId) -> Vec<usize> {
    let mut indices: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.status == status && &r.id != skip)
        .map(|(i, _)| i)
        .collect();
    indices.sort_by(|a, b| {
        let (ra, rb) = (&records[*a], &records[*b]);
        ra.position
            .cmp(&rb.position)
            .then(ra.created_at.cmp(&rb.created_at))
            .then(ra.id.cmp(&rb.id))
    });
    indices
}

#[async_trait]
impl LeadBackend for InMemoryLeadBackend {
    async fn fetch_collection(&self) -> Result<Vec<RawLeadRecord>, BackendError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("fetches disabled".to_string()));
        }
        Ok(self.records())
    }

    async fn set_status_and_position(
        &self,
        id: &LeadId,
        status: LeadStatus,
        position: usize,
    ) -> Result<RawLeadRecord, BackendError> {
        self.move_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_moves.load(Ordering::SeqCst) {
            return Err(BackendError::Rejected {
                status: 409,
                message: format!("move of {} rejected", id),
            });
        }

        let mut records = self.lock();
        let moved = records
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| BackendError::NotFound { id: id.clone() })?;
        let old_status = records[moved].status.clone();

        let source = column_indices(&records, &old_status, id);
        for (rank, index) in source.into_iter().enumerate() {
            records[index].position = rank as i64;
        }

        let mut target = column_indices(&records, status.as_str(), id);
        target.insert(position.min(target.len()), moved);
        records[moved].status = status.as_str().to_string();
        for (rank, index) in target.into_iter().enumerate() {
            records[index].position = rank as i64;
        }

        Ok(records[moved].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::snapshot::fixtures::{ids, raw};
    use crate::board::snapshot::load;

    #[tokio::test]
    async fn test_move_renumbers_both_columns() {
        let backend = InMemoryLeadBackend::with_records(vec![
            raw("a", "NEW", 0),
            raw("b", "NEW", 1),
            raw("c", "NEW", 2),
            raw("d", "WON", 0),
        ]);
        let record = backend
            .set_status_and_position(&LeadId::from("b"), LeadStatus::Won, 0)
            .await
            .unwrap();
        assert_eq!(record.status, "WON");
        assert_eq!(record.position, 0);

        let snapshot = load(&backend.fetch_collection().await.unwrap());
        assert_eq!(ids(&snapshot, LeadStatus::New), vec!["a", "c"]);
        assert_eq!(ids(&snapshot, LeadStatus::Won), vec!["b", "d"]);
        let positions: Vec<i64> = backend
            .records()
            .iter()
            .filter(|r| r.status == "NEW")
            .map(|r| r.position)
            .collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_move_within_column_clamps_position() {
        let backend = InMemoryLeadBackend::with_records(vec![
            raw("a", "NEW", 0),
            raw("b", "NEW", 1),
        ]);
        backend
            .set_status_and_position(&LeadId::from("a"), LeadStatus::New, 40)
            .await
            .unwrap();
        let snapshot = load(&backend.fetch_collection().await.unwrap());
        assert_eq!(ids(&snapshot, LeadStatus::New), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_move_unknown_lead_is_not_found() {
        let backend = InMemoryLeadBackend::new();
        let err = backend
            .set_status_and_position(&LeadId::from("nope"), LeadStatus::New, 0)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BackendError::NotFound {
                id: LeadId::from("nope")
            }
        );
    }

    #[tokio::test]
    async fn test_failure_switches() {
        let backend = InMemoryLeadBackend::with_records(vec![raw("a", "NEW", 0)]);
        backend.fail_fetches(true);
        assert!(backend.fetch_collection().await.is_err());
        backend.fail_fetches(false);
        assert_eq!(backend.fetch_collection().await.unwrap().len(), 1);
        assert_eq!(backend.fetch_calls(), 2);

        backend.reject_moves(true);
        let err = backend
            .set_status_and_position(&LeadId::from("a"), LeadStatus::Won, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected { status: 409, .. }));
        assert_eq!(backend.records()[0].status, "NEW");
    }

    #[tokio::test]
    async fn test_demo_seed_loads_densely() {
        let backend = InMemoryLeadBackend::demo();
        let snapshot = load(&backend.fetch_collection().await.unwrap());
        assert_eq!(snapshot.len(), 10);
        assert!(snapshot.is_dense());
        assert_eq!(
            ids(&snapshot, LeadStatus::New),
            vec!["lead-101", "lead-102", "lead-103"]
        );
    }
}
