//! glue-crawl — dynamically supplied page parsers for crawl jobs.
//!
//! Source programs in the glue language are fingerprinted, compiled once into
//! shareable descriptors and instantiated as fresh parsers per job.

pub mod cache;
pub mod compiler;
pub mod document;
pub mod error;
pub mod factory;
pub mod fingerprint;
pub mod glue;
pub mod handler;
pub mod request;
pub mod sink;

pub use cache::{CacheStats, HandlerCache};
pub use compiler::{CompiledHandler, GlueCompiler, HandlerCompiler, HandlerKind};
pub use document::Document;
pub use error::{GlueError, GlueResult, SinkError};
pub use factory::{factory_for, GlueMode, HandlerFactory, InjectingFactory, PlainFactory};
pub use fingerprint::Fingerprint;
pub use handler::{GlueParser, PageParser, ParseOutcome, Record};
pub use request::{HttpMethod, PageRequest, DEFAULT_TIMEOUT_MILLIS};
pub use sink::{LogSink, MemorySink, RecordSink, ServiceRegistry};
