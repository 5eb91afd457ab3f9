//! The page parser capability and the glue-backed parser.

use crate::document::Document;
use crate::glue::{Extract, OutcomeRule, ParserProgram, RecordProgram};
use crate::request::PageRequest;
use crate::sink::{RecordSink, ServiceRegistry};
use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// One extracted item: field name to string value or `null`.
pub type Record = serde_json::Map<String, Value>;

/// Result of parsing a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub success: bool,
    pub items: Vec<Record>,
}

/// A page parser: adjusts the page request, then parses the loaded document.
///
/// Instances are created per job invocation and never shared.
pub trait PageParser: Send {
    /// Name of the parser type.
    fn type_name(&self) -> &str;

    /// Adjust the request before the page is loaded.
    fn pre_parse(&self, request: &mut PageRequest);

    /// Parse the document and report the outcome.
    fn parse(&mut self, document: Document) -> ParseOutcome;

    /// Bind named services. Only called by injecting factories.
    fn inject(&mut self, _services: &ServiceRegistry) {}
}

/// A parser instance backed by a compiled glue program.
pub struct GlueParser {
    program: Arc<ParserProgram>,
    redirect_target: String,
    sinks: Vec<Arc<dyn RecordSink>>,
}

impl GlueParser {
    pub fn new(program: Arc<ParserProgram>, redirect_target: &str) -> Self {
        Self {
            program,
            redirect_target: redirect_target.to_string(),
            sinks: Vec::new(),
        }
    }

    pub fn redirect_target(&self) -> &str {
        &self.redirect_target
    }

    /// Names of the sinks currently bound.
    pub fn bound_sinks(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Extract one record per selected element.
    pub fn extract(&self, document: &Document) -> Vec<Record> {
        let html = document.html();
        let base = Url::parse(&self.redirect_target)
            .or_else(|_| Url::parse(document.url()))
            .ok();
        let record = &self.program.record;

        let roots: Vec<ElementRef<'_>> = match &record.select {
            Some(selector) => html.select(selector).collect(),
            None => vec![html.root_element()],
        };

        roots
            .into_iter()
            .map(|root| extract_record(root, record, base.as_ref()))
            .collect()
    }
}

impl PageParser for GlueParser {
    fn type_name(&self) -> &str {
        &self.program.name
    }

    fn pre_parse(&self, request: &mut PageRequest) {
        // Login is not supported: declared cookies replace the set, never merge.
        if !self.program.cookies.is_empty() {
            request.cookies = self.program.cookies.clone();
        }
        if let Some(validate) = self.program.validate_tls {
            request.validate_tls = validate;
        }
        if let Some(ms) = self.program.timeout_millis {
            request.timeout_millis = ms;
        }
        if let Some(ua) = &self.program.user_agent {
            request.user_agent = Some(ua.clone());
        }
    }

    fn parse(&mut self, document: Document) -> ParseOutcome {
        let items = self.extract(&document);
        let success = evaluate(&self.program.outcome, &items);

        for sink in &self.sinks {
            for item in &items {
                if let Err(e) = sink.accept(&self.program.name, item) {
                    tracing::warn!(
                        "sink '{}' rejected a record from {}: {e}",
                        sink.name(),
                        self.program.name
                    );
                }
            }
        }

        tracing::debug!(
            "{} extracted {} item(s) from {}, outcome {success}",
            self.program.name,
            items.len(),
            document.url()
        );
        ParseOutcome { success, items }
    }

    fn inject(&mut self, services: &ServiceRegistry) {
        for name in &self.program.sinks {
            match services.sink(name) {
                Some(sink) => self.sinks.push(sink),
                None => tracing::warn!(
                    "{} declares sink '{name}' but no such sink is registered",
                    self.program.name
                ),
            }
        }
    }
}

fn extract_record(root: ElementRef<'_>, record: &RecordProgram, base: Option<&Url>) -> Record {
    let mut out = Record::new();
    for field in &record.fields {
        let value = root
            .select(&field.selector)
            .next()
            .and_then(|el| extract_value(el, &field.extract, base));
        out.insert(
            field.name.clone(),
            value.map(Value::String).unwrap_or(Value::Null),
        );
    }
    out
}

fn extract_value(el: ElementRef<'_>, extract: &Extract, base: Option<&Url>) -> Option<String> {
    match extract {
        Extract::Text => Some(normalize_whitespace(&el.text().collect::<String>())),
        Extract::Html => Some(el.inner_html()),
        Extract::Attr(name) => {
            let raw = el.value().attr(name)?;
            if matches!(name.as_str(), "href" | "src") {
                if let Some(resolved) = base.and_then(|b| b.join(raw.trim()).ok()) {
                    return Some(resolved.to_string());
                }
            }
            Some(raw.to_string())
        }
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(item: &Record, field: &str) -> bool {
    matches!(item.get(field), Some(Value::String(s)) if !s.is_empty())
}

fn evaluate(rule: &OutcomeRule, items: &[Record]) -> bool {
    match rule {
        OutcomeRule::Always(b) => *b,
        OutcomeRule::Count(op, n) => op.apply(items.len(), *n),
        OutcomeRule::Every(field) => !items.is_empty() && items.iter().all(|i| non_empty(i, field)),
        OutcomeRule::Any(field) => items.iter().any(|i| non_empty(i, field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{GlueCompiler, HandlerCompiler};
    use crate::sink::MemorySink;

    const PAGE: &str = r#"
        <html><head><title>Projects</title></head><body>
        <ul id="search-projects-ulist">
            <li class="project">
                <a class="repository" href="/xuxueli0323/xxl-job">  xxl-job
                </a>
                <p class="description">A distributed <b>task</b> scheduler</p>
            </li>
            <li class="project">
                <a class="repository" href="https://other.test/xxl-crawler">xxl-crawler</a>
            </li>
        </ul>
        </body></html>
    "#;

    fn parser(src: &str, target: &str) -> GlueParser {
        GlueCompiler::new()
            .compile(src)
            .unwrap()
            .instantiate(target)
            .unwrap()
    }

    fn doc() -> Document {
        Document::new("https://gitee.test/xuxueli0323/projects?page=1", PAGE)
    }

    const PROJECTS: &str = r##"
        parser ProjectParser for Project { outcome = every repository; sink "mem"; }
        record Project select "#search-projects-ulist .project" {
            repository = ".repository";
            description = ".description";
            link = ".repository" @href;
            markup = ".description" @html;
        }
    "##;

    #[test]
    fn test_extracts_one_record_per_item() {
        let mut p = parser(PROJECTS, "https://gitee.test/");
        let outcome = p.parse(doc());
        assert!(outcome.success);
        assert_eq!(outcome.items.len(), 2);

        let first = &outcome.items[0];
        assert_eq!(first["repository"], "xxl-job");
        assert_eq!(first["description"], "A distributed task scheduler");
        assert_eq!(first["link"], "https://gitee.test/xuxueli0323/xxl-job");
        assert_eq!(first["markup"], "A distributed <b>task</b> scheduler");

        let second = &outcome.items[1];
        assert_eq!(second["description"], Value::Null);
        assert_eq!(second["link"], "https://other.test/xxl-crawler");
    }

    #[test]
    fn test_outcome_rules() {
        let count = |rule: &str| {
            let src = format!(
                r#"parser P for Project {{ outcome = {rule}; }}
                   record Project select ".project" {{ description = ".description"; }}"#
            );
            parser(&src, "https://gitee.test/").parse(doc()).success
        };
        assert!(count("items == 2"));
        assert!(!count("items > 2"));
        assert!(count("any description"));
        assert!(!count("every description"));
        assert!(!count("false"));
    }

    #[test]
    fn test_every_requires_items() {
        let mut p = parser(
            r#"parser P for R { outcome = every t; } record R select ".none" { t = "h1"; }"#,
            "https://gitee.test/",
        );
        let outcome = p.parse(doc());
        assert!(outcome.items.is_empty());
        assert!(!outcome.success);
    }

    #[test]
    fn test_root_record_without_select() {
        let mut p = parser(
            r#"parser P for Page {} record Page { title = "title"; }"#,
            "https://gitee.test/",
        );
        let outcome = p.parse(doc());
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0]["title"], "Projects");
    }

    #[test]
    fn test_pre_parse_replaces_cookies_and_tls() {
        let p = parser(
            r#"parser P for R { cookie "sid" = "42"; timeout = 9000; user_agent = "bot/1"; }
               record R {}"#,
            "https://gitee.test/",
        );
        let mut req = PageRequest::new("https://gitee.test/");
        req.cookies.insert("stale".into(), "x".into());
        p.pre_parse(&mut req);

        assert_eq!(req.cookies.len(), 1);
        assert_eq!(req.cookies.get("sid").map(String::as_str), Some("42"));
        assert!(req.validate_tls);
        assert_eq!(req.timeout_millis, 9000);
        assert_eq!(req.user_agent.as_deref(), Some("bot/1"));
    }

    #[test]
    fn test_pre_parse_keeps_job_settings_when_undeclared() {
        let mut req = PageRequest::new("https://gitee.test/");
        req.cookies.insert("sid".into(), "1".into());
        req.validate_tls = false;

        parser(r#"parser P for R {} record R {}"#, "https://gitee.test/").pre_parse(&mut req);
        assert_eq!(req.cookies.get("sid").map(String::as_str), Some("1"));
        assert!(!req.validate_tls);

        parser(r#"parser P for R { validate_tls = true; } record R {}"#, "https://gitee.test/")
            .pre_parse(&mut req);
        assert!(req.validate_tls);
        assert_eq!(req.cookies.len(), 1);
    }

    #[test]
    fn test_sinks_only_receive_after_injection() {
        let mem = Arc::new(MemorySink::new("mem"));
        let services = ServiceRegistry::new().with_sink(mem.clone());

        let mut plain = parser(PROJECTS, "https://gitee.test/");
        plain.parse(doc());
        assert!(mem.is_empty());

        let mut injected = parser(PROJECTS, "https://gitee.test/");
        injected.inject(&services);
        assert_eq!(injected.bound_sinks(), vec!["mem"]);
        injected.parse(doc());
        assert_eq!(mem.len(), 2);
        assert_eq!(mem.records()[0].0, "ProjectParser");
    }
}
