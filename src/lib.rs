//! Proxy Dashboard - session model for a local-network reverse proxy.
//!
//! Users register HTTP endpoints ("proxy targets"), see them in a list and
//! view one embedded in the dashboard. This crate is the client-side core
//! behind that: it keeps a local mirror of the registry in sync with the
//! remote store, tracks which proxy is selected, and turns a selection into
//! a sandboxed view of `/proxy/{id}/`.
//!
//! # Architecture
//!
//! - **RegistryClient** - Owns the mirror, performs list/create/update/delete
//! - **SelectionController** - Owns the selected id, heals it on refresh
//! - **EmbeddingResolver** - Maps an id to its view URL and sandbox
//! - **DashboardController** - Composes the three for the presentation layer
//!
//! # Modules
//!
//! - [`registry`] - Registry types, transport, snapshot and client
//! - [`selection`] - Selection state and reconciliation
//! - [`embedding`] - View sessions and surface lifecycle
//! - [`dashboard`] - The composed controller
//! - [`config`] - Configuration loading/saving
//! - [`error`] - Error types

pub mod config;
pub mod constants;
pub mod dashboard;
pub mod embedding;
pub mod error;
pub mod registry;
pub mod selection;

// Re-export commonly used types
pub use config::Config;
pub use dashboard::{DashboardController, DashboardView};
pub use embedding::{EmbeddingResolver, SandboxCapability, Surface, SurfaceHost, SurfaceId, ViewSession};
pub use error::{Error, RemoteError, RequiredField, Result, ValidationError};
pub use registry::{
    HttpTransport, NewProxy, ProxyId, ProxyRecord, ProxyUpdate, RegistryClient, RegistryPhase,
    RegistrySnapshot, RegistryTransport,
};
pub use selection::{ReconcileOutcome, SelectionController};
