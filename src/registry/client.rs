//! Registry client: the authoritative local mirror of the proxy set.
//!
//! [`RegistryClient`] owns the [`RegistrySnapshot`]. Everything else reads
//! it through [`RegistryClient::snapshot`] or a [`watch`] subscription and
//! never mutates it.
//!
//! # Consistency
//!
//! Mutations never patch the mirror locally. After a successful create,
//! update or delete the client re-fetches the whole list, so server-assigned
//! fields (normalized ids, defaults) always come from the store.
//!
//! # Ordering
//!
//! Each fetch takes a ticket before its request goes out. A response is
//! applied only if its ticket is newer than the last applied one, so a slow
//! response can never overwrite a newer snapshot.
//!
//! # Teardown
//!
//! [`RegistryClient::dispose`] cancels pending requests. They resolve to
//! [`Error::Disposed`] and leave the snapshot alone.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::snapshot::RegistrySnapshot;
use super::transport::RegistryTransport;
use super::types::{NewProxy, ProxyId, ProxyRecord, ProxyUpdate};
use crate::error::{Error, RemoteError, Result};

/// Fetch bookkeeping guarded by the client's mutex.
#[derive(Debug)]
struct FetchState {
    snapshot: RegistrySnapshot,
    /// Last ticket handed out.
    issued: u64,
    /// Ticket of the response currently reflected in `snapshot`.
    applied: u64,
    /// Fetches started but not yet settled.
    in_flight: usize,
    /// Bumped every time a response replaces the records.
    generation: u64,
}

/// An outstanding fetch.
///
/// Dropping it before `finish_fetch` runs (the caller gave up
/// on the future) still releases its share of `loading`.
struct FetchTicket<'a> {
    client: &'a RegistryClient,
    number: u64,
    settled: bool,
}

impl Drop for FetchTicket<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let mut state = self.client.state();
        state.in_flight = state.in_flight.saturating_sub(1);
        if self.client.cancel.is_cancelled() {
            return;
        }
        let loading = state.in_flight > 0;
        state.snapshot.set_loading(loading);
        self.client.updates.send_replace(state.snapshot.clone());
        log::debug!("Fetch #{} abandoned before it settled", self.number);
    }
}

/// Mirror of the remote proxy registry.
pub struct RegistryClient {
    transport: Arc<dyn RegistryTransport>,
    state: Mutex<FetchState>,
    updates: watch::Sender<RegistrySnapshot>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("RegistryClient")
            .field("records", &state.snapshot.len())
            .field("in_flight", &state.in_flight)
            .field("disposed", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl RegistryClient {
    /// Create a client with an empty, loading snapshot.
    pub fn new(transport: Arc<dyn RegistryTransport>) -> Self {
        let snapshot = RegistrySnapshot::new();
        let (updates, _) = watch::channel(snapshot.clone());
        Self {
            transport,
            state: Mutex::new(FetchState {
                snapshot,
                issued: 0,
                applied: 0,
                in_flight: 0,
                generation: 0,
            }),
            updates,
            cancel: CancellationToken::new(),
        }
    }

    /// Current snapshot (pull interface).
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.state().snapshot.clone()
    }

    /// Receive every snapshot change (push interface).
    pub fn subscribe(&self) -> watch::Receiver<RegistrySnapshot> {
        self.updates.subscribe()
    }

    /// Number of times the records have been replaced by a successful fetch.
    ///
    /// Callers compare it across an operation to tell whether the snapshot
    /// was actually refreshed.
    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    /// True once [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fetch the full proxy set and replace the snapshot.
    ///
    /// On success the records are replaced wholesale and the error cleared.
    /// On failure the previous records stay and the error is set. `loading`
    /// drops back to false once no fetch is outstanding, either way.
    ///
    /// Returns the snapshot as it stands after this fetch settled. If a
    /// newer fetch already landed, that newer snapshot is returned.
    pub async fn list(&self) -> Result<RegistrySnapshot> {
        let ticket = self.begin_fetch()?;
        let result = self.guarded(self.transport.list()).await?;
        self.finish_fetch(ticket, result)
    }

    /// Validate and submit a new proxy, then re-sync the list.
    ///
    /// Returns the record the store created. It is not appended locally;
    /// it shows up through the re-sync.
    pub async fn create(&self, proxy: NewProxy) -> Result<ProxyRecord> {
        proxy.validate()?;
        self.ensure_active()?;

        let created = self.guarded(self.transport.create(&proxy)).await??;
        log::info!("Created proxy {} ({})", created.id, created.name);

        self.resync().await?;
        Ok(created)
    }

    /// Validate and submit a partial update, then re-sync the list.
    pub async fn update(&self, id: &ProxyId, update: ProxyUpdate) -> Result<ProxyRecord> {
        update.validate()?;
        self.ensure_active()?;

        let updated = self.guarded(self.transport.update(id, &update)).await??;
        log::info!("Updated proxy {}", updated.id);

        self.resync().await?;
        Ok(updated)
    }

    /// Delete a proxy, then re-sync the list.
    ///
    /// On failure the record stays in the snapshot.
    pub async fn delete(&self, id: &ProxyId) -> Result<()> {
        self.ensure_active()?;

        self.guarded(self.transport.delete(id)).await??;
        log::info!("Deleted proxy {}", id);

        self.resync().await
    }

    /// Cancel pending requests and stop all further state changes.
    pub fn dispose(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();

        let mut state = self.state();
        state.snapshot.mark_disposed();
        self.updates.send_replace(state.snapshot.clone());
        log::debug!("Registry client disposed with {} fetch(es) in flight", state.in_flight);
    }

    fn state(&self) -> MutexGuard<'_, FetchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    /// Run `fut` unless the client is disposed first.
    async fn guarded<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Disposed),
            value = fut => Ok(value),
        }
    }

    /// Re-fetch after a mutation.
    ///
    /// A failed re-sync is already recorded as the snapshot error, so it
    /// does not fail the mutation that triggered it.
    async fn resync(&self) -> Result<()> {
        match self.list().await {
            Ok(_) => Ok(()),
            Err(Error::Disposed) => Err(Error::Disposed),
            Err(e) => {
                log::warn!("Re-sync after mutation failed: {}", e);
                Ok(())
            }
        }
    }

    fn begin_fetch(&self) -> Result<FetchTicket<'_>> {
        self.ensure_active()?;

        let mut state = self.state();
        state.issued += 1;
        state.in_flight += 1;
        state.snapshot.set_loading(true);
        self.updates.send_replace(state.snapshot.clone());

        log::debug!("Fetch #{} started", state.issued);
        Ok(FetchTicket {
            client: self,
            number: state.issued,
            settled: false,
        })
    }

    fn finish_fetch(
        &self,
        mut ticket: FetchTicket<'_>,
        result: std::result::Result<Vec<ProxyRecord>, RemoteError>,
    ) -> Result<RegistrySnapshot> {
        ticket.settled = true;
        let ticket = ticket.number;

        let mut state = self.state();
        state.in_flight = state.in_flight.saturating_sub(1);
        if self.cancel.is_cancelled() {
            return Err(Error::Disposed);
        }

        let current = ticket > state.applied;
        if current {
            state.applied = ticket;
        }

        let outcome = match result {
            Ok(records) if current => {
                log::info!("Fetch #{} applied: {} proxies", ticket, records.len());
                state.snapshot.apply_records(records);
                state.generation += 1;
                Ok(())
            }
            Ok(_) => {
                log::warn!(
                    "Fetch #{} discarded: superseded by #{}",
                    ticket,
                    state.applied
                );
                Ok(())
            }
            Err(e) if current => {
                log::warn!("Fetch #{} failed: {}", ticket, e);
                state.snapshot.apply_error(e.message.clone());
                Err(e)
            }
            Err(e) => {
                log::warn!(
                    "Fetch #{} failed after being superseded by #{}: {}",
                    ticket,
                    state.applied,
                    e
                );
                Err(e)
            }
        };

        let loading = state.in_flight > 0;
        state.snapshot.set_loading(loading);
        self.updates.send_replace(state.snapshot.clone());

        outcome?;
        Ok(state.snapshot.clone())
    }
}

impl Drop for RegistryClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a fixed list; counts calls.
    #[derive(Default)]
    struct FixedTransport {
        records: Mutex<Vec<ProxyRecord>>,
        fail_list: Mutex<bool>,
        hang_list: Mutex<bool>,
        calls: AtomicUsize,
    }

    fn record(id: &str) -> ProxyRecord {
        ProxyRecord {
            id: ProxyId::new(id),
            name: id.to_string(),
            target_url: format!("http://{}.lan", id),
            description: None,
            enabled: true,
        }
    }

    #[async_trait]
    impl RegistryTransport for FixedTransport {
        async fn list(&self) -> std::result::Result<Vec<ProxyRecord>, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let hang = *self.hang_list.lock().unwrap();
            if hang {
                std::future::pending::<()>().await;
            }
            if *self.fail_list.lock().unwrap() {
                return Err(RemoteError::transport("Failed to fetch proxies: timed out"));
            }
            Ok(self.records.lock().unwrap().clone())
        }

        async fn create(&self, proxy: &NewProxy) -> std::result::Result<ProxyRecord, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let created = record(&proxy.name.to_lowercase());
            self.records.lock().unwrap().push(created.clone());
            Ok(created)
        }

        async fn update(
            &self,
            id: &ProxyId,
            _update: &ProxyUpdate,
        ) -> std::result::Result<ProxyRecord, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(record(id.as_str()))
        }

        async fn delete(&self, id: &ProxyId) -> std::result::Result<(), RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.records.lock().unwrap().retain(|r| &r.id != id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_list_replaces_snapshot() {
        let transport = Arc::new(FixedTransport::default());
        *transport.records.lock().unwrap() = vec![record("b"), record("a")];
        let client = RegistryClient::new(transport.clone());

        assert!(client.snapshot().loading());
        let snapshot = client.list().await.unwrap();

        assert!(!snapshot.loading());
        assert_eq!(
            snapshot.ids().map(ProxyId::as_str).collect::<Vec<_>>(),
            vec!["b", "a"]
        );
    }

    #[tokio::test]
    async fn test_create_resyncs_instead_of_appending() {
        let transport = Arc::new(FixedTransport::default());
        let client = RegistryClient::new(transport.clone());
        client.list().await.unwrap();

        let created = client.create(NewProxy::new("Cam", "http://cam.lan")).await.unwrap();

        assert_eq!(created.id.as_str(), "cam");
        // list + create + list
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
        assert!(client.snapshot().contains(&ProxyId::new("cam")));
    }

    #[tokio::test]
    async fn test_create_validation_makes_no_request() {
        let transport = Arc::new(FixedTransport::default());
        let client = RegistryClient::new(transport.clone());

        let err = client.create(NewProxy::new("", "http://x")).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_resync_does_not_fail_mutation() {
        let transport = Arc::new(FixedTransport::default());
        *transport.records.lock().unwrap() = vec![record("a")];
        let client = RegistryClient::new(transport.clone());
        client.list().await.unwrap();

        *transport.fail_list.lock().unwrap() = true;
        client.delete(&ProxyId::new("a")).await.unwrap();

        let snapshot = client.snapshot();
        assert!(snapshot.contains(&ProxyId::new("a")));
        assert!(snapshot.error().is_some());
        assert!(!snapshot.loading());
    }

    #[tokio::test]
    async fn test_abandoned_fetch_releases_loading() {
        let transport = Arc::new(FixedTransport::default());
        *transport.records.lock().unwrap() = vec![record("a")];
        *transport.hang_list.lock().unwrap() = true;
        let client = RegistryClient::new(transport.clone());

        let abandoned =
            tokio::time::timeout(std::time::Duration::from_millis(20), client.list()).await;
        assert!(abandoned.is_err());
        assert!(!client.snapshot().loading());
        assert_eq!(client.generation(), 0);

        *transport.hang_list.lock().unwrap() = false;
        let snapshot = client.list().await.unwrap();

        assert!(!snapshot.loading());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(client.generation(), 1);
    }

    #[tokio::test]
    async fn test_disposed_client_rejects_operations() {
        let transport = Arc::new(FixedTransport::default());
        let client = RegistryClient::new(transport.clone());
        let mut updates = client.subscribe();

        client.dispose();

        assert_eq!(client.list().await.unwrap_err(), Error::Disposed);
        assert_eq!(
            client.delete(&ProxyId::new("a")).await.unwrap_err(),
            Error::Disposed
        );
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert!(updates.has_changed().unwrap());
        assert!(!updates.borrow_and_update().loading());
    }
}
