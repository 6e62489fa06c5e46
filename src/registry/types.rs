//! Registry data types.
//!
//! This module defines the records exchanged with the registry API and the
//! request payloads for create and update.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{RequiredField, ValidationError};

/// Opaque identifier assigned by the remote store.
///
/// Ids are never interpreted. The store may send them as JSON strings or
/// numbers; both are kept as their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProxyId(String);

impl ProxyId {
    /// Wrap an id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ProxyId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => ProxyId(s),
            RawId::Number(n) => ProxyId(n.to_string()),
        })
    }
}

impl std::fmt::Display for ProxyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProxyId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProxyId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

fn default_enabled() -> bool {
    true
}

/// A registered proxy target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRecord {
    /// Store-assigned identifier, immutable.
    pub id: ProxyId,
    /// Display label.
    pub name: String,
    /// Absolute URL of the internal service.
    pub target_url: String,
    /// Optional free text.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the proxy is active.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Request body for creating a proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProxy {
    /// Display label (required).
    pub name: String,
    /// Target service URL (required).
    pub target_url: String,
    /// Free text, sent as an empty string when absent.
    pub description: String,
    /// Whether the proxy starts enabled.
    pub enabled: bool,
    /// Explicit id; when absent the store derives one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ProxyId>,
}

impl NewProxy {
    /// Create a request for the two required fields.
    pub fn new(name: impl Into<String>, target_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_url: target_url.into(),
            description: String::new(),
            enabled: true,
            id: None,
        }
    }

    /// Add a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Request a specific id.
    pub fn with_id(mut self, id: impl Into<ProxyId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the initial enabled flag.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Check required fields before anything goes on the wire.
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::require(RequiredField::Name, &self.name)?;
        ValidationError::require(RequiredField::TargetUrl, &self.target_url)
    }
}

/// Partial update of an existing proxy. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProxyUpdate {
    /// New display label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New target URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New enabled flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl ProxyUpdate {
    /// True if the update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.target_url.is_none()
            && self.description.is_none()
            && self.enabled.is_none()
    }

    /// Provided required fields must still be non-empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            ValidationError::require(RequiredField::Name, name)?;
        }
        if let Some(target_url) = &self.target_url {
            ValidationError::require(RequiredField::TargetUrl, target_url)?;
        }
        Ok(())
    }
}
