//! Dashboard controller: composes registry, selection and embedding.
//!
//! # Data flow
//!
//! ```text
//! queries:    RegistryClient ──► DashboardController::view() ──► presentation
//! mutations:  presentation ──► request_* ──► RegistryClient ──► store
//!                                   │                              │
//!                                   ◄──── re-sync list() ◄─────────┘
//!                                   │
//!                                   └──► SelectionController::reconcile
//! ```
//!
//! Whenever an operation ends with the snapshot replaced by a successful
//! fetch, the selection is reconciled, so a selection that points at a
//! vanished record is dropped and its surface torn down. Operations that
//! left the records alone (validation failures, rejected mutations, failed
//! fetches) never touch the selection. Errors are returned once to the caller
//! and never retried.

use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use tokio::sync::watch;

use crate::config::Config;
use crate::embedding::{EmbeddingResolver, HeadlessHost, Surface, SurfaceHost, SurfaceId, ViewSession};
use crate::error::{Error, Result};
use crate::registry::{
    HttpTransport, NewProxy, ProxyId, ProxyRecord, ProxyUpdate, RegistryClient, RegistrySnapshot,
};
use crate::selection::{ReconcileOutcome, SelectionController};

/// Everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    /// Registry mirror, including loading flag and banner error.
    pub snapshot: RegistrySnapshot,
    /// Selected id, if any.
    pub selected: Option<ProxyId>,
    /// Record for the selected id, when the snapshot has it.
    pub selected_record: Option<ProxyRecord>,
    /// View session of the mounted surface. Present iff something is selected.
    pub session: Option<ViewSession>,
    /// Id of the mounted surface.
    pub surface: Option<SurfaceId>,
}

impl DashboardView {
    /// Records in store order.
    pub fn records(&self) -> &[ProxyRecord] {
        self.snapshot.records()
    }

    /// True while a fetch is in flight.
    pub fn loading(&self) -> bool {
        self.snapshot.loading()
    }

    /// Banner-level error from the last failed fetch.
    pub fn error(&self) -> Option<&str> {
        self.snapshot.error()
    }
}

/// Host calls owed after a view transition, applied discard first.
#[derive(Debug, Default)]
struct SurfaceChange {
    discard: Option<Surface>,
    mount: Option<Surface>,
}

/// Selection plus the surface it is rendered on.
struct ViewState {
    selection: SelectionController,
    mounted: Option<Surface>,
    next_surface: u64,
}

impl ViewState {
    /// Bring the mounted surface in line with the selection.
    ///
    /// Nothing changes if the selected id did not change.
    fn sync_surface(&mut self, resolver: &EmbeddingResolver) -> SurfaceChange {
        let wanted = self.selection.selected().cloned();
        let current = self.mounted.as_ref().map(|s| s.session.id().clone());
        if wanted == current {
            return SurfaceChange::default();
        }

        let discard = self.mounted.take();
        let mount = wanted.map(|id| {
            self.next_surface += 1;
            Surface {
                id: SurfaceId(self.next_surface),
                session: resolver.resolve(&id),
            }
        });
        self.mounted.clone_from(&mount);

        SurfaceChange { discard, mount }
    }

    fn teardown(&mut self) -> SurfaceChange {
        SurfaceChange {
            discard: self.mounted.take(),
            mount: None,
        }
    }
}

/// Orchestrates the registry mirror, the selection and the embedded view.
pub struct DashboardController {
    registry: RegistryClient,
    resolver: EmbeddingResolver,
    view: Mutex<ViewState>,
    /// Always locked before `view`.
    host: Mutex<Box<dyn SurfaceHost>>,
}

impl std::fmt::Debug for DashboardController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let view = self.view_state();
        f.debug_struct("DashboardController")
            .field("registry", &self.registry)
            .field("origin", &self.resolver.origin().as_str())
            .field("selected", &view.selection.selected())
            .field("surface", &view.mounted.as_ref().map(|s| s.id))
            .finish_non_exhaustive()
    }
}

impl DashboardController {
    /// Compose a controller. Call [`start`](Self::start) to load the list.
    pub fn new(
        registry: RegistryClient,
        resolver: EmbeddingResolver,
        host: Box<dyn SurfaceHost>,
    ) -> Self {
        Self {
            registry,
            resolver,
            view: Mutex::new(ViewState {
                selection: SelectionController::new(),
                mounted: None,
                next_surface: 0,
            }),
            host: Mutex::new(host),
        }
    }

    /// Build a headless controller talking HTTP to the configured origin.
    ///
    /// # Errors
    ///
    /// Returns an error if the origin is invalid or the HTTP client cannot
    /// be built.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let origin = config.origin_url()?;
        let transport = HttpTransport::new(origin.clone(), config.request_timeout())
            .context("Failed to create registry transport")?;
        let resolver = EmbeddingResolver::new(origin)?;

        Ok(Self::new(
            RegistryClient::new(std::sync::Arc::new(transport)),
            resolver,
            Box::new(HeadlessHost),
        ))
    }

    /// Initial load. Equivalent to [`refresh`](Self::refresh).
    pub async fn start(&self) -> Result<RegistrySnapshot> {
        log::info!("Dashboard starting against {}", self.resolver.origin());
        self.refresh().await
    }

    /// Re-fetch the list, then reconcile the selection.
    pub async fn refresh(&self) -> Result<RegistrySnapshot> {
        let generation = self.registry.generation();
        let result = self.registry.list().await;
        self.settle(generation, result)
    }

    /// Current state for rendering.
    pub fn view(&self) -> DashboardView {
        let snapshot = self.registry.snapshot();
        let view = self.view_state();
        let selected = view.selection.selected().cloned();
        let selected_record = selected.as_ref().and_then(|id| snapshot.get(id).cloned());

        DashboardView {
            snapshot,
            selected,
            selected_record,
            session: view.mounted.as_ref().map(|s| s.session.clone()),
            surface: view.mounted.as_ref().map(|s| s.id),
        }
    }

    /// Snapshot change notifications.
    pub fn subscribe(&self) -> watch::Receiver<RegistrySnapshot> {
        self.registry.subscribe()
    }

    /// Make `id` the active proxy and mount its view.
    pub fn request_select(&self, id: ProxyId) -> Result<ViewSession> {
        if self.registry.is_disposed() {
            return Err(Error::Disposed);
        }

        self.transition(|view| {
            view.selection.select(id.clone());
            ((), view.sync_surface(&self.resolver))
        });
        log::debug!("Selected proxy {}", id);

        Ok(self.resolver.resolve(&id))
    }

    /// Clear the selection and discard the view.
    pub fn request_clear(&self) {
        if self.registry.is_disposed() {
            return;
        }

        self.transition(|view| {
            view.selection.clear();
            ((), view.sync_surface(&self.resolver))
        });
    }

    /// Create a proxy. Validation and remote errors go straight back to the
    /// caller, who decides whether to re-prompt.
    pub async fn request_create(&self, fields: NewProxy) -> Result<ProxyRecord> {
        let generation = self.registry.generation();
        let result = self.registry.create(fields).await;
        self.settle(generation, result)
    }

    /// Update a proxy.
    pub async fn request_update(&self, id: &ProxyId, update: ProxyUpdate) -> Result<ProxyRecord> {
        let generation = self.registry.generation();
        let result = self.registry.update(id, update).await;
        self.settle(generation, result)
    }

    /// Delete a proxy. Once the triggered refresh has landed, a selection on
    /// the deleted record is cleared.
    pub async fn request_delete(&self, id: &ProxyId) -> Result<()> {
        let generation = self.registry.generation();
        let result = self.registry.delete(id).await;
        self.settle(generation, result)
    }

    /// Tear down: cancel pending requests and discard the surface.
    pub fn dispose(&self) {
        self.registry.dispose();
        self.transition(|view| ((), view.teardown()));
        log::info!("Dashboard disposed");
    }

    fn view_state(&self) -> MutexGuard<'_, ViewState> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reconcile if the records were replaced since `generation`.
    fn settle<T>(&self, generation: u64, result: Result<T>) -> Result<T> {
        if self.registry.generation() != generation {
            self.reconcile();
        }
        result
    }

    fn reconcile(&self) -> ReconcileOutcome {
        if self.registry.is_disposed() {
            return ReconcileOutcome::Unchanged;
        }

        let snapshot = self.registry.snapshot();
        if !snapshot.is_loaded() {
            return ReconcileOutcome::Unchanged;
        }

        self.transition(|view| {
            let outcome = view.selection.reconcile(&snapshot);
            (outcome, view.sync_surface(&self.resolver))
        })
    }

    /// Run `update` on the view state, then replay its surface change on
    /// the host once the view lock is released.
    ///
    /// The host lock is held across both steps, so host calls arrive in
    /// transition order and a host may call [`view`](Self::view) from
    /// inside `mount` or `discard`.
    fn transition<R>(&self, update: impl FnOnce(&mut ViewState) -> (R, SurfaceChange)) -> R {
        let mut host = self.host.lock().unwrap_or_else(PoisonError::into_inner);
        let (result, change) = {
            let mut view = self.view_state();
            update(&mut *view)
        };

        if let Some(old) = change.discard {
            host.discard(&old);
        }
        if let Some(new) = change.mount {
            host.mount(&new);
        }
        result
    }
}
