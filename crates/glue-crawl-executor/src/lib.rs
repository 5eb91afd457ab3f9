//! glue-crawl executor — scheduled crawl jobs over a headless browser.
//!
//! Jobs load a page through a scripted Chromium session, run a click path,
//! and hand the rendered document to a glue parser supplied with the job.

pub mod browser;
pub mod cli;
pub mod click_path;
pub mod config;
pub mod error;
pub mod job;
pub mod runtime;
pub mod session;
pub mod sink;

pub use browser::{BrowserLauncher, BrowserSession, ChromiumLauncher, LaunchOptions, Timeouts};
pub use click_path::{ClickPath, ClickStep};
pub use config::{ConfigOverrides, ExecutorConfig};
pub use error::{ExecutorError, ExecutorResult};
pub use job::{
    CrawlJobParameter, CrawlOutcome, CrawlerJob, JobContext, JobHandler, JobRegistry, JobResult,
};
pub use runtime::Executor;
pub use session::{Interaction, NoInteraction, ScriptedSession};
pub use sink::JsonlSink;
