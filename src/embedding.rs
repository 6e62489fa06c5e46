//! Embedded views of proxy targets.
//!
//! A selected proxy is shown by loading `/proxy/{id}/` from the dashboard's
//! own origin inside a sandboxed rendering surface. [`EmbeddingResolver`]
//! derives the [`ViewSession`] for an id; it is a pure function of the
//! origin and the id.
//!
//! The presentation layer implements [`SurfaceHost`]. The dashboard calls
//! [`SurfaceHost::discard`] on the old surface before it calls
//! [`SurfaceHost::mount`] on the new one, so a previous target's session
//! or storage context never lingers under the next target's path.

use anyhow::Result;
use reqwest::Url;

use crate::constants;
use crate::registry::ProxyId;

/// A permission granted to the embedded view's sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SandboxCapability {
    /// Treat content as same-origin.
    SameOrigin,
    /// Run scripts.
    Scripts,
    /// Submit forms.
    Forms,
    /// Open popups.
    Popups,
    /// Show modal dialogs.
    Modals,
}

impl SandboxCapability {
    /// Sandbox token for this capability.
    pub fn as_str(self) -> &'static str {
        match self {
            SandboxCapability::SameOrigin => "allow-same-origin",
            SandboxCapability::Scripts => "allow-scripts",
            SandboxCapability::Forms => "allow-forms",
            SandboxCapability::Popups => "allow-popups",
            SandboxCapability::Modals => "allow-modals",
        }
    }
}

impl std::fmt::Display for SandboxCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed capability set granted to every embedded view.
///
/// No top navigation, downloads, pointer lock or anything else.
pub const SANDBOX_CAPABILITIES: &[SandboxCapability] = &[
    SandboxCapability::SameOrigin,
    SandboxCapability::Scripts,
    SandboxCapability::Forms,
    SandboxCapability::Popups,
    SandboxCapability::Modals,
];

/// Everything needed to render one proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSession {
    id: ProxyId,
    frame_url: Url,
}

impl ViewSession {
    /// The proxy being viewed.
    pub fn id(&self) -> &ProxyId {
        &self.id
    }

    /// Absolute URL loaded into the surface.
    pub fn frame_url(&self) -> &Url {
        &self.frame_url
    }

    /// Origin-relative path, `/proxy/{id}/`.
    pub fn frame_path(&self) -> &str {
        self.frame_url.path()
    }

    /// URL for opening the view outside the sandbox. Same URL, unmodified.
    pub fn external_url(&self) -> &Url {
        &self.frame_url
    }

    /// Capabilities of the surface.
    pub fn sandbox(&self) -> &'static [SandboxCapability] {
        SANDBOX_CAPABILITIES
    }

    /// Capabilities as a space-separated sandbox attribute.
    pub fn sandbox_attribute(&self) -> String {
        self.sandbox()
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Derives view sessions from proxy ids.
#[derive(Debug, Clone)]
pub struct EmbeddingResolver {
    origin: Url,
}

impl EmbeddingResolver {
    /// Create a resolver rooted at the application origin.
    ///
    /// # Errors
    ///
    /// Returns an error if `origin` cannot carry a path.
    pub fn new(origin: Url) -> Result<Self> {
        if origin.cannot_be_a_base() {
            anyhow::bail!("Origin {} cannot be a base URL", origin);
        }
        Ok(Self { origin })
    }

    /// The application origin.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Absolute view URL for `id`. The id is one escaped path segment.
    pub fn view_url(&self, id: &ProxyId) -> Url {
        let mut url = self.origin.clone();
        url.set_query(None);
        url.set_fragment(None);
        // Checked in `new`.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .clear()
                .push(constants::VIEW_PATH_PREFIX)
                .push(id.as_str())
                .push("");
        }
        url
    }

    /// Derive the view session for `id`.
    pub fn resolve(&self, id: &ProxyId) -> ViewSession {
        ViewSession {
            id: id.clone(),
            frame_url: self.view_url(id),
        }
    }
}

/// Identifier of one mounted rendering surface.
///
/// Every mount gets a fresh id, even when the same proxy is shown again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// A rendering surface showing one view session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    /// Unique surface id.
    pub id: SurfaceId,
    /// What the surface shows.
    pub session: ViewSession,
}

/// Presentation-side owner of rendering surfaces.
///
/// Calls arrive with no dashboard state locked, so an implementation may
/// read `DashboardController::view` while mounting. It must not change the
/// selection from inside these calls.
pub trait SurfaceHost: Send {
    /// Create a surface and load its session.
    fn mount(&mut self, surface: &Surface);

    /// Tear a surface down completely.
    fn discard(&mut self, surface: &Surface);
}

/// Host that renders nothing. Used by headless callers such as the CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessHost;

impl SurfaceHost for HeadlessHost {
    fn mount(&mut self, surface: &Surface) {
        log::debug!("Surface {} -> {}", surface.id.0, surface.session.frame_url());
    }

    fn discard(&mut self, surface: &Surface) {
        log::debug!("Surface {} discarded", surface.id.0);
    }
}
