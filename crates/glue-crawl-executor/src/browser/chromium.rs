//! Chromium-based browser sessions using chromiumoxide.

use super::{BrowserLauncher, BrowserSession, LaunchOptions, Timeouts};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Environment variable overriding the browser binary location.
pub const CHROMIUM_PATH_ENV: &str = "GLUE_CRAWL_CHROMIUM_PATH";

const CLICK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. GLUE_CRAWL_CHROMIUM_PATH env
    if let Ok(p) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser", "chrome"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. ~/.cache/glue-crawl/chromium/
    if let Some(cache) = dirs::cache_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![cache.join("glue-crawl/chromium/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing")]
        } else {
            vec![
                cache.join("glue-crawl/chromium/chrome-linux64/chrome"),
                cache.join("glue-crawl/chromium/chrome"),
            ]
        };
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return Some(found);
        }
    }

    // 4. Common macOS locations
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches one headless Chromium process per session.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    /// Binary used when the launch options do not name one.
    default_executable: Option<PathBuf>,
}

impl ChromiumLauncher {
    pub fn new(default_executable: Option<PathBuf>) -> Self {
        Self { default_executable }
    }

    fn resolve_executable(&self, options: &LaunchOptions) -> Result<PathBuf> {
        options
            .executable
            .clone()
            .or_else(|| self.default_executable.clone())
            .or_else(find_chromium)
            .with_context(|| {
                format!("Chromium not found. Install Chrome or set {CHROMIUM_PATH_ENV}.")
            })
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>> {
        let chrome_path = self.resolve_executable(options)?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking");
        if let Some(proxy) = &options.proxy {
            builder = builder.arg(format!("--proxy-server={proxy}"));
        }
        if let Some(ua) = &options.user_agent {
            builder = builder.arg(format!("--user-agent={ua}"));
        }
        if options.accept_insecure_certs {
            builder = builder.arg("--ignore-certificate-errors");
        } else {
            builder = builder.respect_https_errors();
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .with_context(|| format!("failed to launch Chromium at {}", chrome_path.display()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("chromium handler event error: {e}");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let session = ChromiumSession {
                    browser,
                    page: None,
                    handler_task,
                    timeouts: Timeouts::default(),
                };
                if let Err(quit_err) = Box::new(session).quit().await {
                    tracing::warn!("failed to close Chromium after launch error: {quit_err:#}");
                }
                return Err(anyhow!(e).context("failed to create new page"));
            }
        };

        tracing::debug!("launched Chromium {}", chrome_path.display());
        Ok(Box::new(ChromiumSession {
            browser,
            page: Some(page),
            handler_task,
            timeouts: Timeouts::default(),
        }))
    }
}

/// A Chromium process with a single page.
pub struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
    timeouts: Timeouts,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page> {
        self.page.as_ref().context("browser has no open page")
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let timeout = self.timeouts.page_load;
        let page = self.page()?;
        match tokio::time::timeout(timeout, page.goto(url)).await {
            // goto resolves once the navigation has committed.
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => bail!("navigation to {url} failed: {e}"),
            Err(_) => bail!(
                "navigation to {url} timed out after {}ms",
                timeout.as_millis()
            ),
        }
    }

    async fn add_cookies(&mut self, cookies: &BTreeMap<String, String>) -> Result<()> {
        if cookies.is_empty() {
            return Ok(());
        }
        let params: Vec<CookieParam> = cookies
            .iter()
            .map(|(name, value)| CookieParam::new(name.clone(), value.clone()))
            .collect();
        self.page()?
            .set_cookies(params)
            .await
            .context("failed to set cookies")?;
        Ok(())
    }

    fn set_timeouts(&mut self, timeouts: Timeouts) {
        self.timeouts = timeouts;
    }

    fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        let deadline = Instant::now() + self.timeouts.implicit_wait;
        let page = self.page()?;
        let element = loop {
            match page.find_element(selector).await {
                Ok(el) => break el,
                Err(e) if Instant::now() >= deadline => {
                    bail!("no element matches \"{selector}\": {e}")
                }
                Err(_) => tokio::time::sleep(CLICK_POLL_INTERVAL).await,
            }
        };
        element
            .click()
            .await
            .with_context(|| format!("failed to click \"{selector}\""))?;
        Ok(())
    }

    async fn page_source(&mut self) -> Result<Option<String>> {
        let timeout = self.timeouts.script;
        let page = self.page()?;
        let eval = page.evaluate(
            "document.documentElement ? document.documentElement.outerHTML : null",
        );
        let result = tokio::time::timeout(timeout, eval)
            .await
            .map_err(|_| anyhow!("reading page source timed out after {}ms", timeout.as_millis()))?
            .context("failed to get HTML")?;

        result
            .into_value::<Option<String>>()
            .map_err(|e| anyhow!("failed to convert HTML result: {e:?}"))
    }

    async fn current_url(&mut self) -> Result<String> {
        let url = self
            .page()?
            .url()
            .await
            .context("failed to get URL")?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn quit(mut self: Box<Self>) -> Result<()> {
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
        let closed = self.browser.close().await;
        let waited = self.browser.wait().await;
        self.handler_task.abort();
        closed.context("failed to close Chromium")?;
        waited.context("failed to wait for Chromium to exit")?;
        Ok(())
    }
}
