//! Proxy registry: remote store access and the local mirror.
//!
//! - [`types`] - Records and request payloads
//! - [`transport`] - `RegistryTransport` trait and the HTTP implementation
//! - [`snapshot`] - The mirror and its state machine view
//! - [`client`] - `RegistryClient`, the owner of the mirror

pub mod client;
pub mod snapshot;
pub mod transport;
pub mod types;

pub use client::RegistryClient;
pub use snapshot::{RegistryPhase, RegistrySnapshot};
pub use transport::{HttpTransport, RegistryTransport};
pub use types::{NewProxy, ProxyId, ProxyRecord, ProxyUpdate};
