//! Shared fixtures for dashboard integration tests.
//!
//! `ScriptedTransport` is an in-memory registry store. Its `list()` answers
//! from the store unless a scripted reply is queued; gated replies let a
//! test decide exactly when a response arrives.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use proxy_dashboard::{
    DashboardController, EmbeddingResolver, NewProxy, ProxyId, ProxyRecord, ProxyUpdate,
    RegistryClient, RegistryTransport, RemoteError, Surface, SurfaceHost, SurfaceId,
};
use reqwest::Url;
use tokio::sync::oneshot;

/// Outcome of a list call.
pub type ListReply = Result<Vec<ProxyRecord>, RemoteError>;

/// A queued answer for the next `list()`.
pub enum Scripted {
    /// Answer immediately.
    Now(ListReply),
    /// Answer when the sender fires.
    Gate(oneshot::Receiver<ListReply>),
}

/// In-memory registry store with scriptable list replies.
#[derive(Default)]
pub struct ScriptedTransport {
    store: Mutex<Vec<ProxyRecord>>,
    script: Mutex<VecDeque<Scripted>>,
    fail_delete: Mutex<Option<RemoteError>>,
    fail_create: Mutex<Option<RemoteError>>,
    list_calls: AtomicUsize,
    mutation_calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn with_records(records: Vec<ProxyRecord>) -> Arc<Self> {
        let transport = Arc::new(Self::default());
        *transport.store.lock().unwrap() = records;
        transport
    }

    /// Replace the store contents, as another client would.
    pub fn set_store(&self, records: Vec<ProxyRecord>) {
        *self.store.lock().unwrap() = records;
    }

    pub fn push(&self, reply: Scripted) {
        self.script.lock().unwrap().push_back(reply);
    }

    /// Queue a gated reply and return its trigger.
    pub fn push_gate(&self) -> oneshot::Sender<ListReply> {
        let (tx, rx) = oneshot::channel();
        self.push(Scripted::Gate(rx));
        tx
    }

    pub fn fail_next_delete(&self, error: RemoteError) {
        *self.fail_delete.lock().unwrap() = Some(error);
    }

    pub fn fail_next_create(&self, error: RemoteError) {
        *self.fail_create.lock().unwrap() = Some(error);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn mutation_calls(&self) -> usize {
        self.mutation_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryTransport for ScriptedTransport {
    async fn list(&self) -> ListReply {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(Scripted::Now(reply)) => reply,
            Some(Scripted::Gate(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(RemoteError::transport("gate dropped"))),
            None => Ok(self.store.lock().unwrap().clone()),
        }
    }

    async fn create(&self, proxy: &NewProxy) -> Result<ProxyRecord, RemoteError> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_create.lock().unwrap().take() {
            return Err(err);
        }
        let record = ProxyRecord {
            id: proxy
                .id
                .clone()
                .unwrap_or_else(|| ProxyId::new(proxy.name.to_lowercase().replace(' ', "-"))),
            name: proxy.name.clone(),
            target_url: proxy.target_url.clone(),
            description: Some(proxy.description.clone()),
            enabled: proxy.enabled,
        };
        self.store.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &ProxyId, update: &ProxyUpdate) -> Result<ProxyRecord, RemoteError> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        let mut store = self.store.lock().unwrap();
        let record = store
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| RemoteError::status("Failed to update proxy: 404 Not Found", 404))?;
        if let Some(name) = &update.name {
            record.name = name.clone();
        }
        if let Some(target_url) = &update.target_url {
            record.target_url = target_url.clone();
        }
        if let Some(description) = &update.description {
            record.description = Some(description.clone());
        }
        if let Some(enabled) = update.enabled {
            record.enabled = enabled;
        }
        Ok(record.clone())
    }

    async fn delete(&self, id: &ProxyId) -> Result<(), RemoteError> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_delete.lock().unwrap().take() {
            return Err(err);
        }
        self.store.lock().unwrap().retain(|r| &r.id != id);
        Ok(())
    }
}

/// Surface lifecycle events, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Mount(SurfaceId, String),
    Discard(SurfaceId, String),
}

/// Records mount/discard calls.
#[derive(Debug, Default, Clone)]
pub struct RecordingHost {
    pub events: Arc<Mutex<Vec<HostEvent>>>,
}

impl RecordingHost {
    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl SurfaceHost for RecordingHost {
    fn mount(&mut self, surface: &Surface) {
        self.events.lock().unwrap().push(HostEvent::Mount(
            surface.id,
            surface.session.frame_path().to_string(),
        ));
    }

    fn discard(&mut self, surface: &Surface) {
        self.events.lock().unwrap().push(HostEvent::Discard(
            surface.id,
            surface.session.frame_path().to_string(),
        ));
    }
}

pub fn record(id: &str, name: &str) -> ProxyRecord {
    ProxyRecord {
        id: ProxyId::new(id),
        name: name.to_string(),
        target_url: format!("http://{}.lan:8080", id),
        description: None,
        enabled: true,
    }
}

pub fn ids(records: &[ProxyRecord]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

/// Dashboard over a scripted store with a recording host.
pub fn dashboard(
    records: Vec<ProxyRecord>,
) -> (Arc<DashboardController>, Arc<ScriptedTransport>, RecordingHost) {
    let transport = ScriptedTransport::with_records(records);
    let host = RecordingHost::default();
    let dashboard = DashboardController::new(
        RegistryClient::new(transport.clone()),
        EmbeddingResolver::new(Url::parse("http://dashboard.lan:8000").unwrap()).unwrap(),
        Box::new(host.clone()),
    );
    (Arc::new(dashboard), transport, host)
}

/// Yield until `condition` holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached");
}
