use super::command::ReorderCommand;
use super::snapshot::{Snapshot, renumber};

/// Result of applying a command optimistically.
#[derive(Debug, Clone)]
pub struct Applied {
    /// Snapshot to display until the commit settles.
    pub next: Snapshot,
    /// The exact input, kept for rollback.
    pub prior: Snapshot,
}

impl Applied {
    /// True when the command did not change anything (e.g. the lead vanished).
    pub fn is_unchanged(&self) -> bool {
        self.next == self.prior
    }
}

/// Apply `command` to `snapshot` without touching the backend.
///
/// Only the source and destination columns are rebuilt; every other column is
/// shared with the input. A lead that is no longer present leaves the
/// snapshot as it is.
pub fn apply(snapshot: &Snapshot, command: &ReorderCommand) -> Applied {
    let prior = snapshot.clone();
    let Some((old_status, old_index)) = snapshot.locate(&command.lead_id) else {
        tracing::debug!(lead = %command.lead_id, "reorder target vanished; leaving snapshot unchanged");
        return Applied {
            next: prior.clone(),
            prior,
        };
    };

    let mut source = snapshot.column(old_status).to_vec();
    let mut record = source.remove(old_index);

    let next = if old_status == command.target_status {
        let index = command.target_index.min(source.len());
        source.insert(index, record);
        renumber(&mut source);
        snapshot.with_column(old_status, source)
    } else {
        renumber(&mut source);
        let mut destination = snapshot.column(command.target_status).to_vec();
        let index = command.target_index.min(destination.len());
        record.status = command.target_status;
        destination.insert(index, record);
        renumber(&mut destination);
        snapshot
            .with_column(old_status, source)
            .with_column(command.target_status, destination)
    };

    Applied { next, prior }
}
