use std::collections::HashSet;
use std::sync::Arc;

use leadflow_common::{LeadId, LeadRecord, LeadStatus, RawLeadRecord};

use crate::errors::BoardError;

/// One ordered status column. Shared between snapshots that did not touch it.
pub type Column = Arc<Vec<LeadRecord>>;

/// Immutable view of every status column at one instant.
///
/// Invariants upheld by every constructor in this crate:
/// - each column's positions are exactly `0..n-1` in sequence order
/// - each lead id appears in exactly one column, and that column matches
///   the record's `status`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    columns: [Column; 6],
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn column(&self, status: LeadStatus) -> &Column {
        &self.columns[status.index()]
    }

    /// Columns in board order.
    pub fn columns(&self) -> impl Iterator<Item = (LeadStatus, &Column)> {
        LeadStatus::ALL
            .iter()
            .map(move |status| (*status, &self.columns[status.index()]))
    }

    /// Status and index of `id`, if present.
    pub fn locate(&self, id: &LeadId) -> Option<(LeadStatus, usize)> {
        self.columns().find_map(|(status, column)| {
            column
                .iter()
                .position(|r| &r.id == id)
                .map(|index| (status, index))
        })
    }

    pub fn get(&self, id: &LeadId) -> Option<&LeadRecord> {
        self.locate(id)
            .map(|(status, index)| &self.columns[status.index()][index])
    }

    pub fn contains(&self, id: &LeadId) -> bool {
        self.locate(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when every column is numbered `0..n-1`.
    pub fn is_dense(&self) -> bool {
        self.columns
            .iter()
            .all(|column| column.iter().enumerate().all(|(i, r)| r.position == i))
    }

    /// True when no id repeats and every record sits in its own status column.
    pub fn owners_are_unique(&self) -> bool {
        let mut seen = HashSet::new();
        self.columns().all(|(status, column)| {
            column
                .iter()
                .all(|r| r.status == status && seen.insert(r.id.clone()))
        })
    }

    /// Copy of this snapshot with one column swapped out; the others are shared.
    pub(crate) fn with_column(&self, status: LeadStatus, records: Vec<LeadRecord>) -> Self {
        let mut columns = self.columns.clone();
        columns[status.index()] = Arc::new(records);
        Self { columns }
    }
}

/// Rewrite positions so they follow sequence order.
pub(crate) fn renumber(records: &mut [LeadRecord]) {
    for (index, record) in records.iter_mut().enumerate() {
        record.position = index;
    }
}

/// Group backend records into ordered columns.
///
/// Each column is sorted by backend position, then creation time, then id, and
/// renumbered densely. Records with an unknown status or a repeated id are
/// left out and logged; loading itself never fails.
pub fn load(records: &[RawLeadRecord]) -> Snapshot {
    let (snapshot, rejected) = load_with_report(records);
    for err in &rejected {
        tracing::warn!(error = %err, "lead excluded from pipeline board");
    }
    snapshot
}

/// Like [`load`], but hands back the rejected records instead of logging them.
pub fn load_with_report(records: &[RawLeadRecord]) -> (Snapshot, Vec<BoardError>) {
    let mut grouped: [Vec<(i64, LeadRecord)>; 6] = Default::default();
    let mut seen = HashSet::new();
    let mut rejected = Vec::new();

    for raw in records {
        let record = match LeadRecord::from_raw(raw) {
            Ok(record) => record,
            Err(_) => {
                rejected.push(BoardError::UnknownStatus {
                    lead: raw.id.clone(),
                    status: raw.status.clone(),
                });
                continue;
            }
        };
        if !seen.insert(raw.id.clone()) {
            rejected.push(BoardError::DuplicateLead { id: raw.id.clone() });
            continue;
        }
        grouped[record.status.index()].push((raw.position, record));
    }

    let mut snapshot = Snapshot::empty();
    for (slot, mut entries) in grouped.into_iter().enumerate() {
        entries.sort_by(|(pa, a), (pb, b)| {
            pa.cmp(pb)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        let mut column: Vec<LeadRecord> = entries.into_iter().map(|(_, r)| r).collect();
        renumber(&mut column);
        snapshot.columns[slot] = Arc::new(column);
    }

    (snapshot, rejected)
}

/// Restore a pre-mutation snapshot exactly as it was stored.
pub fn revert(prior: Snapshot) -> Snapshot {
    prior
}
