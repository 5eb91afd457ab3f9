//! Page request configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default page timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MILLIS: u64 = 5_000;

/// HTTP method of a page request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

/// Mutable configuration for a single page fetch.
///
/// Parsers may adjust it in `pre_parse` before the page is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Target URL.
    pub url: String,
    /// Page load, script and implicit-wait timeout.
    pub timeout_millis: u64,
    /// Cookies set after navigation. Keys are unique.
    pub cookies: BTreeMap<String, String>,
    /// Upstream proxy server (e.g. `http://127.0.0.1:8080`).
    pub proxy: Option<String>,
    /// Whether TLS certificates are validated.
    pub validate_tls: bool,
    /// User agent override.
    pub user_agent: Option<String>,
    /// Declared for plain HTTP loaders; browser loaders ignore it.
    pub method: HttpMethod,
    /// Declared for plain HTTP loaders; browser loaders ignore it.
    pub headers: BTreeMap<String, String>,
}

impl PageRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_millis: DEFAULT_TIMEOUT_MILLIS,
            cookies: BTreeMap::new(),
            proxy: None,
            validate_tls: true,
            user_agent: None,
            method: HttpMethod::Get,
            headers: BTreeMap::new(),
        }
    }

    /// Settings a browser-driven loader cannot honour.
    pub fn unsupported_by_browser(&self) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        if self.method != HttpMethod::Get {
            ignored.push("method");
        }
        if !self.headers.is_empty() {
            ignored.push("headers");
        }
        ignored
    }
}
