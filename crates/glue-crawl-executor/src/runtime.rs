//! The shared executor runtime: handler cache, factory and job registry.

use crate::browser::{BrowserLauncher, ChromiumLauncher};
use crate::config::ExecutorConfig;
use crate::job::{CommandJobHandler, CrawlerJob, CrawlerJobHandler, HttpJobHandler, JobRegistry};
use crate::session::ScriptedSession;
use crate::sink::JsonlSink;
use anyhow::{Context, Result};
use glue_crawl::{factory_for, HandlerCache, HandlerFactory, LogSink, ServiceRegistry};
use std::sync::Arc;

/// Everything jobs share within one process.
pub struct Executor {
    config: ExecutorConfig,
    cache: Arc<HandlerCache>,
    factory: Arc<dyn HandlerFactory>,
    registry: JobRegistry,
}

impl Executor {
    /// Build a runtime that drives Chromium.
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        let launcher = Arc::new(ChromiumLauncher::new(config.driver_path.clone()));
        Self::with_launcher(config, launcher)
    }

    /// Build a runtime over any browser launcher.
    pub fn with_launcher(config: ExecutorConfig, launcher: Arc<dyn BrowserLauncher>) -> Result<Self> {
        let mut cache = HandlerCache::new();
        if let Some(capacity) = config.cache_capacity {
            cache = cache.with_capacity_limit(capacity);
        }
        let cache = Arc::new(cache);

        let mut services = ServiceRegistry::new();
        services.register_sink(Arc::new(LogSink::default()));
        if let Some(path) = &config.output {
            let sink = JsonlSink::open("jsonl", path)
                .with_context(|| format!("failed to open output {}", path.display()))?;
            services.register_sink(Arc::new(sink));
        }

        let factory = factory_for(config.glue_mode, Arc::clone(&cache), services);
        let session = ScriptedSession::new(launcher).with_executable(config.driver_path.clone());
        let crawler = CrawlerJob::new(Arc::clone(&factory), session)
            .with_default_timeout(config.timeout_millis);

        let mut registry = JobRegistry::new();
        registry
            .register(Arc::new(CrawlerJobHandler::new(crawler)))
            .register(Arc::new(HttpJobHandler::new()?))
            .register(Arc::new(CommandJobHandler));

        tracing::debug!(
            "executor ready: {} mode, handlers [{}]",
            config.glue_mode,
            registry.names().join(", ")
        );
        Ok(Self {
            config,
            cache,
            factory,
            registry,
        })
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<HandlerCache> {
        &self.cache
    }

    pub fn factory(&self) -> &Arc<dyn HandlerFactory> {
        &self.factory
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Register an additional job handler.
    pub fn registry_mut(&mut self) -> &mut JobRegistry {
        &mut self.registry
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .field("registry", &self.registry)
            .finish()
    }
}
