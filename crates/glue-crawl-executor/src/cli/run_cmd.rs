//! CLI handler for `glue-crawl run <handler>`.

use crate::job::JobContext;
use crate::runtime::Executor;
use anyhow::{bail, Context, Result};
use std::path::Path;

/// Resolve the job parameter from `--param` or `--param-file`.
pub fn read_param(param: Option<String>, param_file: Option<&Path>) -> Result<String> {
    match (param, param_file) {
        (Some(_), Some(_)) => bail!("--param and --param-file are mutually exclusive"),
        (Some(p), None) => Ok(p),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        (None, None) => Ok(String::new()),
    }
}

/// Run `handler` `repeat` times in parallel. Returns whether every run succeeded.
pub async fn run(
    executor: &Executor,
    handler: &str,
    param: &str,
    repeat: usize,
    json: bool,
) -> Result<bool> {
    if executor.registry().get(handler).is_none() {
        bail!(
            "unknown job handler '{handler}' (available: {})",
            executor.registry().names().join(", ")
        );
    }

    let mut tasks = Vec::with_capacity(repeat.max(1));
    for _ in 0..repeat.max(1) {
        let registry = executor.registry().clone();
        let handler = handler.to_string();
        let param = param.to_string();
        tasks.push(tokio::spawn(async move {
            registry.run(&handler, &param).await
        }));
    }

    let mut contexts = Vec::with_capacity(tasks.len());
    for task in tasks {
        contexts.push(task.await.context("job task panicked")??);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&contexts)?);
    } else {
        for ctx in &contexts {
            print_context(ctx);
        }
        let stats = executor.cache().stats();
        println!(
            "  Handler cache: {} entr{}, {} hit(s), {} compilation(s)",
            executor.cache().len(),
            if executor.cache().len() == 1 { "y" } else { "ies" },
            stats.hits,
            stats.compilations
        );
    }

    Ok(contexts.iter().all(JobContext::is_success))
}

fn print_context(ctx: &JobContext) {
    let status = if ctx.is_success() { "SUCCESS" } else { "FAILED" };
    println!("  {} [{}] {status}", ctx.handler(), ctx.id());
    for line in ctx.logs() {
        println!("    {} {}", line.at.format("%H:%M:%S%.3f"), line.message);
    }
    if let Some(message) = ctx.result().message() {
        println!("    => {message}");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_param() {
        assert_eq!(read_param(None, None).unwrap(), "");
        assert_eq!(read_param(Some("x".into()), None).unwrap(), "x");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("param.json");
        std::fs::write(&path, r#"{"url": "https://example.test/"}"#).unwrap();
        assert!(read_param(None, Some(path.as_path())).unwrap().contains("example.test"));
        assert!(read_param(Some("x".into()), Some(path.as_path())).is_err());
        assert!(read_param(None, Some(dir.path().join("missing").as_path())).is_err());
    }
}
