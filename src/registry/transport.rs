//! Transport to the remote proxy store.
//!
//! [`RegistryTransport`] is the seam between the registry mirror and the
//! network. [`HttpTransport`] speaks the REST contract:
//!
//! | Operation | Method | Path |
//! |---|---|---|
//! | list | GET | `/_rproxy/proxies` |
//! | create | POST | `/_rproxy/proxies` |
//! | update | PUT | `/_rproxy/proxies/{id}` |
//! | delete | DELETE | `/_rproxy/proxies/{id}` |
//!
//! Any non-2xx answer or transport failure becomes a [`RemoteError`].

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;

use super::types::{NewProxy, ProxyId, ProxyRecord, ProxyUpdate};
use crate::constants;
use crate::error::RemoteError;

/// Remote store operations used by [`RegistryClient`](super::RegistryClient).
///
/// Implementations must not retry; every failure is returned as-is.
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// Fetch the full proxy set, in store order.
    async fn list(&self) -> Result<Vec<ProxyRecord>, RemoteError>;

    /// Submit a new proxy; returns the record as the store saved it.
    async fn create(&self, proxy: &NewProxy) -> Result<ProxyRecord, RemoteError>;

    /// Apply a partial update; returns the updated record.
    async fn update(&self, id: &ProxyId, update: &ProxyUpdate) -> Result<ProxyRecord, RemoteError>;

    /// Delete the proxy with `id`.
    async fn delete(&self, id: &ProxyId) -> Result<(), RemoteError>;
}

/// Error body returned by the registry backend.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl ErrorBody {
    fn into_text(self) -> String {
        match self.detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        }
    }
}

/// HTTP implementation of [`RegistryTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    origin: Url,
    collection: Url,
}

impl HttpTransport {
    /// Creates a transport rooted at `origin`.
    ///
    /// # Errors
    ///
    /// Returns an error if `origin` cannot carry a path or the HTTP client
    /// cannot be built.
    pub fn new(origin: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Self::with_client(client, origin)
    }

    /// Creates a transport with a pre-configured HTTP client.
    ///
    /// Useful for testing or when custom client configuration is needed.
    pub fn with_client(client: Client, origin: Url) -> Result<Self> {
        let mut collection = origin.clone();
        collection.set_query(None);
        collection.set_fragment(None);
        collection
            .path_segments_mut()
            .map_err(|()| anyhow::anyhow!("Origin {} cannot be a base URL", origin))?
            .clear()
            .extend(constants::REGISTRY_PATH_SEGMENTS);

        Ok(Self {
            client,
            origin,
            collection,
        })
    }

    /// Returns the application origin.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Returns the registry collection URL.
    pub fn collection_url(&self) -> &Url {
        &self.collection
    }

    /// URL of a single record; the id is one escaped path segment.
    pub fn record_url(&self, id: &ProxyId) -> Url {
        let mut url = self.collection.clone();
        // The collection URL was validated as a base URL at construction.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(id.as_str());
        }
        url
    }

    async fn check(response: Response, action: &str) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(detail) => format!("{}: {} - {}", action, status, detail.into_text()),
            Err(_) => format!("{}: {}", action, status),
        };
        log::warn!("{}", message);
        Err(RemoteError::status(message, status.as_u16()))
    }

    async fn send(request: reqwest::RequestBuilder, action: &str) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(|e| {
            log::warn!("{}: {}", action, e);
            RemoteError::transport(format!("{}: {}", action, e))
        })?;
        Self::check(response, action).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: Response,
        action: &str,
    ) -> Result<T, RemoteError> {
        response.json::<T>().await.map_err(|e| {
            log::warn!("{}: undecodable response: {}", action, e);
            RemoteError::transport(format!("{}: invalid response body: {}", action, e))
        })
    }
}

#[async_trait]
impl RegistryTransport for HttpTransport {
    async fn list(&self) -> Result<Vec<ProxyRecord>, RemoteError> {
        const ACTION: &str = "Failed to fetch proxies";
        log::debug!("GET {}", self.collection);

        let request = self
            .client
            .get(self.collection.clone())
            .header("Accept", "application/json");
        let response = Self::send(request, ACTION).await?;
        Self::decode(response, ACTION).await
    }

    async fn create(&self, proxy: &NewProxy) -> Result<ProxyRecord, RemoteError> {
        const ACTION: &str = "Failed to add proxy";
        log::debug!("POST {} name={:?}", self.collection, proxy.name);

        let request = self.client.post(self.collection.clone()).json(proxy);
        let response = Self::send(request, ACTION).await?;
        Self::decode(response, ACTION).await
    }

    async fn update(&self, id: &ProxyId, update: &ProxyUpdate) -> Result<ProxyRecord, RemoteError> {
        const ACTION: &str = "Failed to update proxy";
        let url = self.record_url(id);
        log::debug!("PUT {}", url);

        let request = self.client.put(url).json(update);
        let response = Self::send(request, ACTION).await?;
        Self::decode(response, ACTION).await
    }

    async fn delete(&self, id: &ProxyId) -> Result<(), RemoteError> {
        const ACTION: &str = "Failed to delete proxy";
        let url = self.record_url(id);
        log::debug!("DELETE {}", url);

        Self::send(self.client.delete(url), ACTION).await?;
        Ok(())
    }
}
