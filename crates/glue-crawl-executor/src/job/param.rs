//! The crawl job parameter.

use crate::click_path::{ClickPath, ClickStep};
use crate::error::ExecutorError;
use glue_crawl::PageRequest;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_URL: &str = "https://gitee.com/xuxueli0323/projects?page=1";
pub const DEFAULT_WHITE_URL_REGEXS: &str = r"https://gitee\.com/xuxueli0323/projects\?page=\d+";

/// Parser used when a job does not supply one: logs every project card.
pub const DEFAULT_PARSER_SOURCE: &str = r##"parser TestPageParser for TestPageVo {
    outcome = true;
    sink "log";
}

record TestPageVo select "#search-projects-ulist .project" {
    repository = ".repository";
    description = ".description";
}
"##;

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_white_url_regexs() -> String {
    DEFAULT_WHITE_URL_REGEXS.to_string()
}

fn default_click_path() -> Vec<ClickStep> {
    vec![ClickStep::default()]
}

fn default_parser_source() -> String {
    DEFAULT_PARSER_SOURCE.to_string()
}

fn default_true() -> bool {
    true
}

/// JSON parameter of a crawl job. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlJobParameter {
    #[serde(default = "default_url")]
    pub url: String,
    /// Whitelist patterns for discovered links, one per line.
    #[serde(default = "default_white_url_regexs")]
    pub white_url_regexs: String,
    #[serde(default = "default_click_path")]
    pub crawler_job_click_path_list: Vec<ClickStep>,
    #[serde(default = "default_parser_source")]
    pub page_parser_code_source: String,
    /// Page timeout; the executor default applies when absent.
    #[serde(default)]
    pub timeout_millis: Option<u64>,
    #[serde(default)]
    pub cookie_map: BTreeMap<String, String>,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default = "default_true", rename = "validateTLSCertificates")]
    pub validate_tls_certificates: bool,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for CrawlJobParameter {
    fn default() -> Self {
        Self {
            url: default_url(),
            white_url_regexs: default_white_url_regexs(),
            crawler_job_click_path_list: default_click_path(),
            page_parser_code_source: default_parser_source(),
            timeout_millis: None,
            cookie_map: BTreeMap::new(),
            proxy: None,
            validate_tls_certificates: true,
            user_agent: None,
        }
    }
}

impl CrawlJobParameter {
    /// Parse a job parameter. A blank string means all defaults.
    pub fn parse(raw: &str) -> Result<Self, ExecutorError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
            .map_err(|e| ExecutorError::InvalidParameter(format!("malformed job parameter: {e}")))
    }

    /// Compile the link whitelist. An empty list accepts every link.
    pub fn whitelist(&self) -> Result<Vec<Regex>, ExecutorError> {
        self.white_url_regexs
            .lines()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    ExecutorError::InvalidParameter(format!("invalid whitelist regex '{p}': {e}"))
                })
            })
            .collect()
    }

    /// The page request before the parser adjusts it.
    pub fn page_request(&self, default_timeout_millis: u64) -> PageRequest {
        let mut request = PageRequest::new(self.url.clone());
        request.timeout_millis = self.timeout_millis.unwrap_or(default_timeout_millis);
        request.cookies = self.cookie_map.clone();
        request.proxy = self.proxy.clone();
        request.validate_tls = self.validate_tls_certificates;
        request.user_agent = self.user_agent.clone();
        request
    }

    pub fn click_path(&self) -> ClickPath {
        ClickPath::new(self.crawler_job_click_path_list.clone())
    }
}
