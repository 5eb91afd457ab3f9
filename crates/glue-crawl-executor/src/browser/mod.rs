//! Browser abstraction for scripted page loading.
//!
//! Defines the `BrowserLauncher` and `BrowserSession` traits that abstract
//! over the browser engine (Chromium via chromiumoxide).

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub use chromium::{find_chromium, ChromiumLauncher};

/// Options applied when a browser process is started.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchOptions {
    /// Browser binary; located automatically when `None`.
    pub executable: Option<PathBuf>,
    /// Upstream proxy for all traffic.
    pub proxy: Option<String>,
    /// Accept invalid TLS certificates.
    pub accept_insecure_certs: bool,
    pub user_agent: Option<String>,
}

/// Session timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// How long element lookups keep retrying.
    pub implicit_wait: Duration,
    pub page_load: Duration,
    pub script: Duration,
}

impl Timeouts {
    /// All three timeouts set to the same value.
    pub fn uniform(millis: u64) -> Self {
        let d = Duration::from_millis(millis);
        Self {
            implicit_wait: d,
            page_load: d,
            script: d,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            implicit_wait: Duration::ZERO,
            page_load: Duration::from_secs(30),
            script: Duration::from_secs(30),
        }
    }
}

/// Starts browser processes.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Start a browser and open a session on a blank page.
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>>;
}

/// One live browser process, driven sequentially.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate to a URL, bounded by the page-load timeout.
    async fn navigate(&mut self, url: &str) -> Result<()>;
    /// Add cookies to the current page's domain.
    async fn add_cookies(&mut self, cookies: &BTreeMap<String, String>) -> Result<()>;
    fn set_timeouts(&mut self, timeouts: Timeouts);
    fn timeouts(&self) -> Timeouts;
    /// Click the first element matching a CSS selector, waiting up to the
    /// implicit wait for it to appear.
    async fn click(&mut self, selector: &str) -> Result<()>;
    /// Full rendered HTML, or `None` when the page has no document.
    async fn page_source(&mut self) -> Result<Option<String>>;
    /// URL of the current page.
    async fn current_url(&mut self) -> Result<String>;
    /// Shut the browser down.
    async fn quit(self: Box<Self>) -> Result<()>;
}
