//! Click paths: ordered click steps with delays, run before the page is read.

use crate::browser::BrowserSession;
use crate::error::ExecutorError;
use crate::session::Interaction;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Selector used when a step does not name one.
pub const DEFAULT_STEP_SELECTOR: &str = "#search-projects-ulist";
/// Delay used when a step does not name one, in milliseconds.
pub const DEFAULT_STEP_DELAY_MILLIS: i64 = 300;

fn default_selector() -> Option<String> {
    Some(DEFAULT_STEP_SELECTOR.to_string())
}

fn default_delay() -> Option<i64> {
    Some(DEFAULT_STEP_DELAY_MILLIS)
}

fn default_sorting() -> i32 {
    1
}

/// One step of a click path.
///
/// A blank or null selector makes the step delay-only. Non-positive delays
/// are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickStep {
    #[serde(default = "default_selector")]
    pub css_selector: Option<String>,
    #[serde(default = "default_delay")]
    pub delaying_before: Option<i64>,
    #[serde(default = "default_delay")]
    pub delaying_after: Option<i64>,
    /// Ascending execution order; ties keep their list order.
    #[serde(default = "default_sorting")]
    pub sorting: i32,
}

impl Default for ClickStep {
    fn default() -> Self {
        Self {
            css_selector: default_selector(),
            delaying_before: default_delay(),
            delaying_after: default_delay(),
            sorting: default_sorting(),
        }
    }
}

impl ClickStep {
    pub fn click(selector: impl Into<String>, sorting: i32) -> Self {
        Self {
            css_selector: Some(selector.into()),
            delaying_before: None,
            delaying_after: None,
            sorting,
        }
    }

    pub fn delay(millis: i64, sorting: i32) -> Self {
        Self {
            css_selector: None,
            delaying_before: Some(millis),
            delaying_after: None,
            sorting,
        }
    }

    /// The selector to click, if the step clicks at all.
    pub fn selector(&self) -> Option<&str> {
        self.css_selector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Click steps in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickPath {
    steps: Vec<ClickStep>,
}

impl ClickPath {
    /// Stable-sort `steps` by `sorting`.
    pub fn new(mut steps: Vec<ClickStep>) -> Self {
        steps.sort_by_key(|s| s.sorting);
        Self { steps }
    }

    pub fn steps(&self) -> &[ClickStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

async fn pause(millis: Option<i64>) {
    if let Some(ms) = millis.filter(|ms| *ms > 0) {
        tokio::time::sleep(Duration::from_millis(ms as u64)).await;
    }
}

#[async_trait]
impl Interaction for ClickPath {
    async fn interact(&self, session: &mut dyn BrowserSession) -> Result<(), ExecutorError> {
        for (index, step) in self.steps.iter().enumerate() {
            pause(step.delaying_before).await;
            if let Some(selector) = step.selector() {
                tracing::debug!("click step {index}: {selector}");
                session
                    .click(selector)
                    .await
                    .map_err(|e| ExecutorError::Interaction {
                        step: index,
                        selector: selector.to_string(),
                        message: format!("{e:#}"),
                    })?;
            }
            pause(step.delaying_after).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_defaults() {
        let step: ClickStep = serde_json::from_str("{}").unwrap();
        assert_eq!(step, ClickStep::default());
        assert_eq!(step.selector(), Some(DEFAULT_STEP_SELECTOR));

        let step: ClickStep =
            serde_json::from_str(r#"{"cssSelector": null, "delayingBefore": 50, "sorting": 3}"#)
                .unwrap();
        assert_eq!(step.selector(), None);
        assert_eq!(step.delaying_before, Some(50));
        assert_eq!(step.delaying_after, Some(DEFAULT_STEP_DELAY_MILLIS));
        assert_eq!(step.sorting, 3);
    }

    #[test]
    fn test_blank_selector_is_delay_only() {
        let step = ClickStep {
            css_selector: Some("   ".into()),
            ..ClickStep::default()
        };
        assert_eq!(step.selector(), None);
    }

    #[test]
    fn test_stable_sort() {
        let path = ClickPath::new(vec![
            ClickStep::click("#c", 2),
            ClickStep::click("#a", 1),
            ClickStep::click("#d", 2),
            ClickStep::click("#b", 1),
        ]);
        let order: Vec<_> = path.steps().iter().filter_map(|s| s.selector()).collect();
        assert_eq!(order, vec!["#a", "#b", "#c", "#d"]);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(ClickStep::click("#x", 4)).unwrap();
        assert_eq!(json["cssSelector"], "#x");
        assert_eq!(json["sorting"], 4);
        assert!(json["delayingBefore"].is_null());
    }
}
