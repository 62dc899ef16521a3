//! Undo collaborator interface.
//!
//! Snapshot storage lives outside the model. The model only tells the
//! collaborator when a snapshot is due and what each mutation left in its
//! context flags.

use crate::execute::MutationFlags;

pub trait UndoCollaborator {
    /// Capture the current state now, before an edit the model cannot see
    /// coming (typing into a delimiter, for example).
    fn take_snapshot(&mut self);

    /// Report the flags a mutation produced.
    fn record_mutation(&mut self, flags: MutationFlags);
}

impl<T: UndoCollaborator + ?Sized> UndoCollaborator for &mut T {
    fn take_snapshot(&mut self) {
        (**self).take_snapshot()
    }

    fn record_mutation(&mut self, flags: MutationFlags) {
        (**self).record_mutation(flags)
    }
}

/// Collaborator that counts requested snapshots and records mutation flags.
#[derive(Debug, Default, Clone)]
pub struct SnapshotLog {
    pub snapshots: usize,
    pub mutations: Vec<MutationFlags>,
}

impl SnapshotLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots requested explicitly plus mutations that did not opt out.
    pub fn effective_snapshots(&self) -> usize {
        self.snapshots
            + self
                .mutations
                .iter()
                .filter(|m| !m.skip_undo_snapshot)
                .count()
    }
}

impl UndoCollaborator for SnapshotLog {
    fn take_snapshot(&mut self) {
        self.snapshots += 1;
    }

    fn record_mutation(&mut self, flags: MutationFlags) {
        self.mutations.push(flags);
    }
}
