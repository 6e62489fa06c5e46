//! The client's mirror of the remote registry.
//!
//! A [`RegistrySnapshot`] is what the presentation reads: the ordered
//! records from the last successful fetch, whether a fetch is in flight, and
//! the banner-level error from the last failed fetch. [`RegistryPhase`] folds
//! those into the state machine view:
//!
//! ```text
//!            list()                 ok
//!   Loading ───────► (in flight) ─────────► Ready(records)
//!      ▲                  │ err                  │ list()
//!      │                  ▼                      ▼
//!      │        Error(records?, message) ──► Loading ...
//!      │
//!   dispose() from any state ──► Idle
//! ```

use super::types::{ProxyId, ProxyRecord};

/// Point-in-time view of the registry mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySnapshot {
    records: Vec<ProxyRecord>,
    loading: bool,
    error: Option<String>,
    loaded: bool,
    disposed: bool,
}

impl Default for RegistrySnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrySnapshot {
    /// Empty snapshot, loading.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            loading: true,
            error: None,
            loaded: false,
            disposed: false,
        }
    }

    /// Records in store order.
    pub fn records(&self) -> &[ProxyRecord] {
        &self.records
    }

    /// True while a fetch is outstanding (and before the first one settles).
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Message of the last failed fetch, cleared by the next success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True once any fetch has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Look up a record by id.
    pub fn get(&self, id: &ProxyId) -> Option<&ProxyRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// True if a record with `id` is present.
    pub fn contains(&self, id: &ProxyId) -> bool {
        self.get(id).is_some()
    }

    /// Ids in store order.
    pub fn ids(&self) -> impl Iterator<Item = &ProxyId> {
        self.records.iter().map(|r| &r.id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// State machine view of this snapshot.
    pub fn phase(&self) -> RegistryPhase<'_> {
        if self.disposed {
            RegistryPhase::Idle
        } else if self.loading {
            RegistryPhase::Loading
        } else if let Some(message) = &self.error {
            RegistryPhase::Error {
                records: self.loaded.then_some(self.records.as_slice()),
                message,
            }
        } else {
            RegistryPhase::Ready(&self.records)
        }
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub(crate) fn apply_records(&mut self, records: Vec<ProxyRecord>) {
        self.records = records;
        self.error = None;
        self.loaded = true;
    }

    pub(crate) fn apply_error(&mut self, message: String) {
        self.error = Some(message);
    }

    pub(crate) fn mark_disposed(&mut self) {
        self.disposed = true;
        self.loading = false;
    }
}

/// State machine view of a [`RegistrySnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryPhase<'a> {
    /// Session disposed; no further updates.
    Idle,
    /// A fetch is in flight. Previous records remain readable on the snapshot.
    Loading,
    /// Last fetch succeeded.
    Ready(&'a [ProxyRecord]),
    /// Last fetch failed. Carries the last good records, if any.
    Error {
        /// Records from the last successful fetch.
        records: Option<&'a [ProxyRecord]>,
        /// Banner message.
        message: &'a str,
    },
}

impl RegistryPhase<'_> {
    /// Short name for logs.
    pub fn display_name(&self) -> &'static str {
        match self {
            RegistryPhase::Idle => "Idle",
            RegistryPhase::Loading => "Loading",
            RegistryPhase::Ready(_) => "Ready",
            RegistryPhase::Error { .. } => "Error",
        }
    }
}
