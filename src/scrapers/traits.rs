use crate::error::SessionError;
use crate::models::RoomVerdict;
use async_trait::async_trait;
use std::time::Duration;

/// Reference to an element that was present when it was queried.
///
/// Handles are re-resolved from their path on every use, so they stay valid
/// across the blocking/async boundary but can go stale if the page changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    path: String,
}

impl ElementHandle {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path of a node reached from this one along `axis_step`
    pub fn relative(&self, axis_step: &str) -> String {
        format!("{}/{}", self.path, axis_step)
    }
}

/// One page/tab of an isolated browser instance, owned by a single request
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Load a URL and wait for the page to settle
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), SessionError>;

    async fn current_url(&self) -> Result<String, SessionError>;

    /// Wait for an in-flight navigation to finish loading
    async fn wait_for_load(&self, timeout: Duration) -> Result<(), SessionError>;

    /// Query once; `None` when nothing matches right now
    async fn find(&self, path: &str) -> Result<Option<ElementHandle>, SessionError>;

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError>;

    async fn text(&self, element: &ElementHandle) -> Result<String, SessionError>;

    /// Native mouse click
    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError>;

    /// Click a descendant link if there is one, else dispatch a synthetic click
    async fn script_click(&self, element: &ElementHandle) -> Result<(), SessionError>;

    async fn page_html(&self) -> Result<String, SessionError>;

    async fn screenshot(&self) -> Result<Vec<u8>, SessionError>;

    /// Tear down the page and its browser
    async fn release(&self) -> Result<(), SessionError>;
}

/// Creates a fresh session per request
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn PageSession>, SessionError>;
}

/// Decides whether an image shows an empty interior room.
///
/// Implementations never fail: transport or service errors come back as
/// `RoomVerdict::Unknown`.
#[async_trait]
pub trait RoomClassifier: Send + Sync {
    async fn classify(&self, image_url: &str) -> RoomVerdict;
}
