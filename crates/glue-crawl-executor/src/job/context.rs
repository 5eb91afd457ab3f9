//! Per-invocation job context: parameter, execution log and result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of a job's execution log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Final state of a job invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobResult {
    Success { message: Option<String> },
    Failed { message: Option<String> },
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            JobResult::Success { message } | JobResult::Failed { message } => message.as_deref(),
        }
    }
}

/// Context handed to a job handler. Jobs succeed unless they say otherwise.
#[derive(Debug, Clone, Serialize)]
pub struct JobContext {
    id: Uuid,
    handler: String,
    param: String,
    started_at: DateTime<Utc>,
    logs: Vec<LogLine>,
    result: JobResult,
}

impl JobContext {
    pub fn new(handler: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            handler: handler.into(),
            param: param.into(),
            started_at: Utc::now(),
            logs: Vec::new(),
            result: JobResult::Success { message: None },
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// The raw job parameter.
    pub fn param(&self) -> &str {
        &self.param
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Append to the execution log.
    pub fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(job = %self.id, handler = %self.handler, "{message}");
        self.logs.push(LogLine {
            at: Utc::now(),
            message,
        });
    }

    pub fn logs(&self) -> &[LogLine] {
        &self.logs
    }

    pub fn handle_success(&mut self, message: Option<String>) {
        self.result = JobResult::Success { message };
    }

    pub fn handle_fail(&mut self, message: Option<String>) {
        if let Some(m) = &message {
            tracing::warn!(job = %self.id, handler = %self.handler, "job failed: {m}");
        }
        self.result = JobResult::Failed { message };
    }

    pub fn result(&self) -> &JobResult {
        &self.result
    }

    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_success() {
        let ctx = JobContext::new("demo", "");
        assert!(ctx.is_success());
        assert!(ctx.logs().is_empty());
        assert_eq!(ctx.result().message(), None);
    }

    #[test]
    fn test_fail_then_log() {
        let mut ctx = JobContext::new("demo", "x");
        ctx.log("beat at:0");
        ctx.handle_fail(Some("boom".into()));
        assert!(!ctx.is_success());
        assert_eq!(ctx.result().message(), Some("boom"));
        assert_eq!(ctx.logs()[0].message, "beat at:0");
    }

    #[test]
    fn test_result_serializes_with_status_tag() {
        let json = serde_json::to_value(JobResult::Failed {
            message: Some("x".into()),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["message"], "x");
    }
}
