//! The crawl job: load a parser, load the page through a click path, parse.

use super::context::JobContext;
use super::param::CrawlJobParameter;
use super::JobHandler;
use crate::error::ExecutorError;
use crate::session::ScriptedSession;
use async_trait::async_trait;
use glue_crawl::{HandlerFactory, ParseOutcome, DEFAULT_TIMEOUT_MILLIS};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What one crawl job run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlOutcome {
    pub url: String,
    /// Type name of the parser that ran.
    pub parser: String,
    /// `None` when no document could be loaded.
    pub parsed: Option<ParseOutcome>,
    /// Whitelisted links found on the page. Reported, never followed.
    pub discovered: Vec<String>,
}

impl CrawlOutcome {
    /// A document was loaded and the parser reported failure.
    pub fn parse_failed(&self) -> bool {
        matches!(&self.parsed, Some(p) if !p.success)
    }
}

/// Runs crawl jobs with a fixed factory and browser session.
#[derive(Clone)]
pub struct CrawlerJob {
    factory: Arc<dyn HandlerFactory>,
    session: ScriptedSession,
    default_timeout_millis: u64,
}

impl CrawlerJob {
    pub fn new(factory: Arc<dyn HandlerFactory>, session: ScriptedSession) -> Self {
        Self {
            factory,
            session,
            default_timeout_millis: DEFAULT_TIMEOUT_MILLIS,
        }
    }

    /// Page timeout for parameters that do not set one.
    pub fn with_default_timeout(mut self, millis: u64) -> Self {
        self.default_timeout_millis = millis;
        self
    }

    pub fn factory(&self) -> &Arc<dyn HandlerFactory> {
        &self.factory
    }

    /// Run one crawl. Parameter, compile and type errors are returned before
    /// any browser is started.
    pub async fn run(&self, raw_param: &str) -> Result<CrawlOutcome, ExecutorError> {
        let param = CrawlJobParameter::parse(raw_param)?;
        let whitelist = param.whitelist()?;

        let mut parser = self
            .factory
            .create(&param.page_parser_code_source, &param.url)?;
        let parser_name = parser.type_name().to_string();

        let mut request = param.page_request(self.default_timeout_millis);
        parser.pre_parse(&mut request);
        tracing::info!(
            "crawling {} with {parser_name} ({} mode)",
            request.url,
            self.factory.mode()
        );

        let click_path = param.click_path();
        let Some(document) = self.session.load(&request, &click_path).await else {
            tracing::warn!("no document loaded from {}", request.url);
            return Ok(CrawlOutcome {
                url: request.url,
                parser: parser_name,
                parsed: None,
                discovered: Vec::new(),
            });
        };

        let discovered: Vec<String> = document
            .links()
            .into_iter()
            .filter(|link| whitelist.is_empty() || whitelist.iter().any(|re| re.is_match(link)))
            .collect();
        let url = document.url().to_string();
        let parsed = parser.parse(document);
        tracing::info!(
            "{parser_name} parsed {} item(s) from {url}, success={}, {} whitelisted link(s)",
            parsed.items.len(),
            parsed.success,
            discovered.len()
        );

        Ok(CrawlOutcome {
            url,
            parser: parser_name,
            parsed: Some(parsed),
            discovered,
        })
    }
}

impl std::fmt::Debug for CrawlerJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlerJob")
            .field("mode", &self.factory.mode())
            .field("default_timeout_millis", &self.default_timeout_millis)
            .field("session", &self.session)
            .finish()
    }
}

/// `crawlerJob`: runs a crawl and maps its outcome onto the job result.
#[derive(Debug, Clone)]
pub struct CrawlerJobHandler {
    job: CrawlerJob,
}

impl CrawlerJobHandler {
    pub const NAME: &'static str = "crawlerJob";

    pub fn new(job: CrawlerJob) -> Self {
        Self { job }
    }
}

#[async_trait]
impl JobHandler for CrawlerJobHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn execute(&self, ctx: &mut JobContext) -> anyhow::Result<()> {
        let outcome = self.job.run(ctx.param()).await?;
        ctx.log(format!(
            "crawled {} with {}, {} whitelisted link(s)",
            outcome.url,
            outcome.parser,
            outcome.discovered.len()
        ));
        for link in &outcome.discovered {
            ctx.log(format!("discovered {link}"));
        }

        match &outcome.parsed {
            None => ctx.log("no document was loaded; nothing parsed"),
            Some(parsed) => {
                ctx.log(format!(
                    "parse result: {} ({} item(s))",
                    parsed.success,
                    parsed.items.len()
                ));
                if outcome.parse_failed() {
                    ctx.handle_fail(Some(format!(
                        "parser {} reported failure for {}",
                        outcome.parser, outcome.url
                    )));
                }
            }
        }
        Ok(())
    }
}
