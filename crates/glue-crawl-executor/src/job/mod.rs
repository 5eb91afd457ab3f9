//! Job handlers and their registration and dispatch.

pub mod command;
pub mod context;
pub mod crawler;
pub mod http;
pub mod param;

pub use command::CommandJobHandler;
pub use context::{JobContext, JobResult, LogLine};
pub use crawler::{CrawlOutcome, CrawlerJob, CrawlerJobHandler};
pub use http::{HttpJobHandler, HttpJobParam};
pub use param::CrawlJobParameter;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A named job triggered with one string parameter.
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run the job. An `Err` marks the job failed; so does
    /// [`JobContext::handle_fail`].
    async fn execute(&self, ctx: &mut JobContext) -> anyhow::Result<()>;
}

/// Job handlers by name.
#[derive(Clone, Default)]
pub struct JobRegistry {
    handlers: BTreeMap<&'static str, Arc<dyn JobHandler>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own name, replacing any previous one.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) -> &mut Self {
        self.handlers.insert(handler.name(), handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }

    /// Run the named handler with `param` and return its finished context.
    pub async fn run(&self, name: &str, param: &str) -> anyhow::Result<JobContext> {
        let handler = self.get(name).ok_or_else(|| {
            anyhow::anyhow!(
                "unknown job handler '{name}' (available: {})",
                self.names().join(", ")
            )
        })?;

        let mut ctx = JobContext::new(name, param);
        tracing::info!(job = %ctx.id(), "starting {name}");
        if let Err(e) = handler.execute(&mut ctx).await {
            ctx.log(format!("{e:#}"));
            ctx.handle_fail(Some(e.to_string()));
        }
        tracing::info!(
            job = %ctx.id(),
            "{name} finished: {}",
            if ctx.is_success() { "success" } else { "failed" }
        );
        Ok(ctx)
    }
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}
