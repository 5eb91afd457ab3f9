//! Environment readiness check.

use crate::browser::{chromium::CHROMIUM_PATH_ENV, find_chromium};
use crate::config::ExecutorConfig;
use anyhow::Result;
use serde_json::json;

/// Report browser availability and the resolved configuration.
/// Returns whether crawl jobs can run.
pub fn run(config: &ExecutorConfig, json: bool) -> Result<bool> {
    let chromium = config
        .driver_path
        .clone()
        .filter(|p| p.exists())
        .or_else(find_chromium);
    let ready = chromium.is_some();

    if json {
        let report = json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "chromium": chromium.as_ref().map(|p| p.display().to_string()),
            "config": config,
            "ready": ready,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(ready);
    }

    println!("glue-crawl doctor");
    println!("=================");
    println!();
    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    if let Some(path) = &config.driver_path {
        if !path.exists() {
            println!("[!!] Configured driver path does not exist: {}", path.display());
        }
    }
    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Install Chrome/Chromium or set {CHROMIUM_PATH_ENV}."
        ),
    }
    println!("[OK] Glue mode: {}", config.glue_mode);
    println!("[OK] Default page timeout: {}ms", config.timeout_millis);
    match config.cache_capacity {
        Some(n) => println!("[OK] Handler cache bounded to {n} entries"),
        None => println!("[OK] Handler cache unbounded"),
    }
    if let Some(out) = &config.output {
        println!("[OK] Records appended to {}", out.display());
    }

    println!();
    if ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY (crawlerJob unavailable; httpJobHandler and commandJobHandler still work)");
    }
    Ok(ready)
}
