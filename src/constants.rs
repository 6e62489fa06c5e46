//! Application-wide constants for the proxy dashboard.
//!
//! Centralizes the REST contract paths, the embedding URL scheme and the
//! sandbox capability tokens so the wire contract lives in one place.
//!
//! # Categories
//!
//! - **Timeouts**: Network timeouts
//! - **REST**: Registry API paths
//! - **Embedding**: View path prefix and sandbox tokens

use std::time::Duration;

// ============================================================================
// Timeouts
// ============================================================================

/// Default HTTP request timeout for registry API calls.
///
/// Timeouts belong to the transport; a timed-out request surfaces as an
/// ordinary `RemoteError`.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// REST
// ============================================================================

/// Path segments of the registry collection, relative to the origin.
///
/// `GET` lists, `POST` creates, `/{id}` with `PUT`/`DELETE` updates or removes.
pub const REGISTRY_PATH_SEGMENTS: &[&str] = &["_rproxy", "proxies"];

/// Human-readable form of the registry collection path.
pub const REGISTRY_PATH: &str = "/_rproxy/proxies";

// ============================================================================
// Embedding
// ============================================================================

/// First path segment of an embedded view (`/proxy/{id}/`).
pub const VIEW_PATH_PREFIX: &str = "proxy";

/// Default application origin used when nothing is configured.
///
/// Matches the port the registry backend listens on out of the box.
pub const DEFAULT_ORIGIN: &str = "http://localhost:8000";
