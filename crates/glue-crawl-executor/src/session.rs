//! Scripted browser sessions: launch, navigate, interact, read, tear down.

use crate::browser::{BrowserLauncher, BrowserSession, LaunchOptions, Timeouts};
use crate::error::ExecutorError;
use async_trait::async_trait;
use futures::FutureExt;
use glue_crawl::{Document, PageRequest};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// A script run against the loaded page before its source is read.
#[async_trait]
pub trait Interaction: Send + Sync {
    async fn interact(&self, session: &mut dyn BrowserSession) -> Result<(), ExecutorError>;
}

/// The empty script.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInteraction;

#[async_trait]
impl Interaction for NoInteraction {
    async fn interact(&self, _session: &mut dyn BrowserSession) -> Result<(), ExecutorError> {
        Ok(())
    }
}

/// Check that a URL is absolute http, https or ftp with a host.
pub fn validate_url(raw: &str) -> Result<Url, ExecutorError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ExecutorError::InvalidParameter(format!("invalid url '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https" | "ftp") {
        return Err(ExecutorError::InvalidParameter(format!(
            "unsupported url scheme '{}' in '{raw}'",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ExecutorError::InvalidParameter(format!(
            "url '{raw}' has no host"
        )));
    }
    Ok(url)
}

/// Loads pages through a fresh browser process per call.
#[derive(Clone)]
pub struct ScriptedSession {
    launcher: Arc<dyn BrowserLauncher>,
    executable: Option<PathBuf>,
}

impl ScriptedSession {
    pub fn new(launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            launcher,
            executable: None,
        }
    }

    /// Use a specific browser binary.
    pub fn with_executable(mut self, executable: Option<PathBuf>) -> Self {
        self.executable = executable;
        self
    }

    /// Load `request.url`, run `interaction`, and return the rendered page.
    ///
    /// Returns `None` for an invalid URL (no browser is started) and for any
    /// failure after launch; failures are logged, never raised. The browser
    /// is shut down exactly once on every path after a successful launch,
    /// including a panicking interaction.
    pub async fn load(
        &self,
        request: &PageRequest,
        interaction: &dyn Interaction,
    ) -> Option<Document> {
        if let Err(e) = validate_url(&request.url) {
            tracing::warn!("not loading page: {e}");
            return None;
        }
        let ignored = request.unsupported_by_browser();
        if !ignored.is_empty() {
            tracing::warn!(
                "browser loader ignores request {} for {}",
                ignored.join(", "),
                request.url
            );
        }

        let options = LaunchOptions {
            executable: self.executable.clone(),
            proxy: request.proxy.clone(),
            accept_insecure_certs: !request.validate_tls,
            user_agent: request.user_agent.clone(),
        };
        let mut session = match self.launcher.launch(&options).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("failed to start browser for {}: {e:#}", request.url);
                return None;
            }
        };

        let outcome = AssertUnwindSafe(drive(session.as_mut(), request, interaction))
            .catch_unwind()
            .await;

        if let Err(e) = session.quit().await {
            tracing::warn!("browser teardown for {} failed: {e:#}", request.url);
        }

        match outcome {
            Ok(Ok(document)) => document,
            Ok(Err(e)) => {
                tracing::error!("loading {} failed: {e:#}", request.url);
                None
            }
            Err(panic) => {
                tracing::error!(
                    "loading {} panicked: {}",
                    request.url,
                    panic_message(panic.as_ref())
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for ScriptedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedSession")
            .field("executable", &self.executable)
            .finish()
    }
}

async fn drive(
    session: &mut dyn BrowserSession,
    request: &PageRequest,
    interaction: &dyn Interaction,
) -> anyhow::Result<Option<Document>> {
    // Cookies are bound to the current domain, so navigate first.
    session.navigate(&request.url).await?;
    session.add_cookies(&request.cookies).await?;
    session.set_timeouts(Timeouts::uniform(request.timeout_millis));

    interaction.interact(session).await?;

    let Some(source) = session.page_source().await? else {
        tracing::warn!("{} has no document", request.url);
        return Ok(None);
    };
    let url = match session.current_url().await {
        Ok(u) if !u.is_empty() => u,
        _ => request.url.clone(),
    };
    Ok(Some(Document::new(url, source)))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
