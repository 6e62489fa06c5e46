//! Selection of the proxy currently shown in the viewer.
//!
//! `select` never checks existence. Existence is enforced after the fact by
//! [`SelectionController::reconcile`], which runs after every snapshot
//! replacement and is the only way a selection heals after a record
//! disappears (deleted here or by another client).

use crate::registry::{ProxyId, RegistrySnapshot};

/// Result of reconciling a selection against a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Selection was empty or still valid.
    Unchanged,
    /// Selection pointed at a missing record and was cleared.
    Cleared(ProxyId),
}

/// Owns the single active proxy id, if any.
#[derive(Debug, Default, Clone)]
pub struct SelectionController {
    selected: Option<ProxyId>,
}

impl SelectionController {
    /// Create with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected id.
    pub fn selected(&self) -> Option<&ProxyId> {
        self.selected.as_ref()
    }

    /// Select `id` unconditionally. Returns the previous selection.
    pub fn select(&mut self, id: ProxyId) -> Option<ProxyId> {
        self.selected.replace(id)
    }

    /// Clear the selection. Returns what was selected.
    pub fn clear(&mut self) -> Option<ProxyId> {
        self.selected.take()
    }

    /// Drop the selection if `snapshot` no longer contains it.
    ///
    /// Afterwards the selection is either empty or an id present in
    /// `snapshot`.
    pub fn reconcile(&mut self, snapshot: &RegistrySnapshot) -> ReconcileOutcome {
        match &self.selected {
            Some(id) if !snapshot.contains(id) => {
                log::info!("Selected proxy {} no longer exists; clearing selection", id);
                self.selected
                    .take()
                    .map_or(ReconcileOutcome::Unchanged, ReconcileOutcome::Cleared)
            }
            _ => ReconcileOutcome::Unchanged,
        }
    }
}
