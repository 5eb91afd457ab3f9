//! Handler factories: source text in, fresh parser instance out.

use crate::cache::HandlerCache;
use crate::error::{GlueError, GlueResult};
use crate::handler::PageParser;
use crate::sink::ServiceRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Construction strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlueMode {
    /// Construct only.
    #[default]
    Plain = 0,
    /// Construct, then bind named services.
    Injected = 1,
}

impl GlueMode {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(GlueMode::Plain),
            1 => Some(GlueMode::Injected),
            _ => None,
        }
    }
}

impl fmt::Display for GlueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlueMode::Plain => f.write_str("plain"),
            GlueMode::Injected => f.write_str("injected"),
        }
    }
}

impl FromStr for GlueMode {
    type Err = GlueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "0" => Ok(GlueMode::Plain),
            "injected" | "1" => Ok(GlueMode::Injected),
            other => Err(GlueError::InvalidArgument(format!(
                "unknown glue mode '{other}' (expected plain or injected)"
            ))),
        }
    }
}

/// Creates parser instances from source programs.
pub trait HandlerFactory: Send + Sync {
    fn mode(&self) -> GlueMode;

    /// Compile (or fetch from cache) `source` and construct a new parser
    /// bound to `redirect_target`. Every call returns a distinct instance.
    fn create(&self, source: &str, redirect_target: &str) -> GlueResult<Box<dyn PageParser>>;
}

fn construct(
    cache: &HandlerCache,
    source: &str,
    redirect_target: &str,
) -> GlueResult<Box<dyn PageParser>> {
    if source.trim().is_empty() {
        return Err(GlueError::InvalidArgument(
            "parser source is blank".to_string(),
        ));
    }
    let handler = cache.get_or_compile(source)?;
    Ok(Box::new(handler.instantiate(redirect_target)?))
}

/// Constructs parsers without binding services.
#[derive(Debug, Clone)]
pub struct PlainFactory {
    cache: Arc<HandlerCache>,
}

impl PlainFactory {
    pub fn new(cache: Arc<HandlerCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<HandlerCache> {
        &self.cache
    }
}

impl HandlerFactory for PlainFactory {
    fn mode(&self) -> GlueMode {
        GlueMode::Plain
    }

    fn create(&self, source: &str, redirect_target: &str) -> GlueResult<Box<dyn PageParser>> {
        construct(&self.cache, source, redirect_target)
    }
}

/// Constructs parsers and binds the services they declare.
#[derive(Debug, Clone)]
pub struct InjectingFactory {
    cache: Arc<HandlerCache>,
    services: ServiceRegistry,
}

impl InjectingFactory {
    pub fn new(cache: Arc<HandlerCache>, services: ServiceRegistry) -> Self {
        Self { cache, services }
    }

    pub fn cache(&self) -> &Arc<HandlerCache> {
        &self.cache
    }

    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }
}

impl HandlerFactory for InjectingFactory {
    fn mode(&self) -> GlueMode {
        GlueMode::Injected
    }

    fn create(&self, source: &str, redirect_target: &str) -> GlueResult<Box<dyn PageParser>> {
        let mut parser = construct(&self.cache, source, redirect_target)?;
        parser.inject(&self.services);
        Ok(parser)
    }
}

/// Select a factory strategy.
pub fn factory_for(
    mode: GlueMode,
    cache: Arc<HandlerCache>,
    services: ServiceRegistry,
) -> Arc<dyn HandlerFactory> {
    match mode {
        GlueMode::Plain => Arc::new(PlainFactory::new(cache)),
        GlueMode::Injected => Arc::new(InjectingFactory::new(cache, services)),
    }
}
