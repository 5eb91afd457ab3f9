//! `httpJobHandler`: one plain HTTP request described by the job parameter.
//!
//! Parameter format, one key per line:
//!
//! ```text
//! url: http://www.example.com
//! method: get
//! data: {"k": "v"}
//! ```

use super::context::JobContext;
use super::JobHandler;
use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A parsed HTTP job parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpJobParam {
    pub url: String,
    pub method: Method,
    pub data: Option<String>,
}

impl HttpJobParam {
    /// Parse `url:`/`method:`/`data:` lines. Later lines win.
    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw.trim().is_empty() {
            return Err(format!("param[{raw}] invalid."));
        }

        let mut url = None;
        let mut method = None;
        let mut data = None;
        for line in raw.lines() {
            if let Some(v) = line.strip_prefix("url:") {
                url = Some(v.trim().to_string());
            } else if let Some(v) = line.strip_prefix("method:") {
                method = Some(v.trim().to_uppercase());
            } else if let Some(v) = line.strip_prefix("data:") {
                data = Some(v.trim().to_string());
            }
        }

        let url = match url {
            Some(u) if !u.is_empty() => u,
            other => return Err(format!("url[{}] invalid.", other.unwrap_or_default())),
        };
        let method = match method.as_deref() {
            Some("GET") => Method::GET,
            Some("POST") => Method::POST,
            other => return Err(format!("method[{}] invalid.", other.unwrap_or_default())),
        };
        Ok(Self {
            url,
            method,
            data: data.filter(|d| !d.is_empty()),
        })
    }
}

/// `httpJobHandler`.
#[derive(Debug, Clone)]
pub struct HttpJobHandler {
    client: Client,
}

impl HttpJobHandler {
    pub const NAME: &'static str = "httpJobHandler";

    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl JobHandler for HttpJobHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn execute(&self, ctx: &mut JobContext) -> anyhow::Result<()> {
        let param = match HttpJobParam::parse(ctx.param()) {
            Ok(p) => p,
            Err(msg) => {
                ctx.log(msg.clone());
                ctx.handle_fail(Some(msg));
                return Ok(());
            }
        };

        let mut request = self
            .client
            .request(param.method.clone(), &param.url)
            .header(header::CONTENT_TYPE, "application/json;charset=UTF-8")
            .header(header::ACCEPT_CHARSET, "application/json;charset=UTF-8");
        if param.method == Method::POST {
            if let Some(data) = &param.data {
                request = request.body(data.clone());
            }
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("{} {} failed", param.method, param.url))?;
        let status = response.status();
        if status != StatusCode::OK {
            bail!("Http Request StatusCode({}) Invalid.", status.as_u16());
        }
        let body = response
            .text()
            .await
            .context("failed to read response body")?;
        ctx.log(body);
        Ok(())
    }
}
