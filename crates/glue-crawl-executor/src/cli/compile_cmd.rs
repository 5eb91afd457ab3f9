//! CLI handler for `glue-crawl compile [PATH]`.

use anyhow::{Context, Result};
use glue_crawl::{CompiledHandler, GlueCompiler, HandlerCompiler, HandlerKind};
use serde_json::json;
use std::io::Read;
use std::path::Path;

/// Compile a glue source from `path`, or stdin when `None`.
pub fn run(path: Option<&Path>, json: bool) -> Result<()> {
    let source = match path {
        Some(p) => std::fs::read_to_string(p)
            .with_context(|| format!("failed to read {}", p.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let handler = GlueCompiler::new().compile(&source)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&describe(&handler))?);
    } else {
        print_summary(&handler);
    }
    Ok(())
}

/// Machine-readable description of a compiled handler.
pub fn describe(handler: &CompiledHandler) -> serde_json::Value {
    let mut out = json!({
        "fingerprint": handler.fingerprint().to_hex(),
        "type": handler.type_name(),
        "kind": handler.kind().label(),
    });
    match handler.kind() {
        HandlerKind::Parser(p) => {
            out["record"] = json!(p.record.name);
            out["select"] = json!(p.record.select_text);
            out["fields"] = json!(p.record.fields.iter().map(|f| &f.name).collect::<Vec<_>>());
            out["sinks"] = json!(p.sinks);
            out["validate_tls"] = json!(p.validate_tls);
        }
        HandlerKind::Record(r) => {
            out["select"] = json!(r.select_text);
            out["fields"] = json!(r.fields.iter().map(|f| &f.name).collect::<Vec<_>>());
        }
    }
    out
}

fn print_summary(handler: &CompiledHandler) {
    println!("  Fingerprint: {}", handler.fingerprint());
    println!("  Primary:     {} {}", handler.kind().label(), handler.type_name());
    match handler.kind() {
        HandlerKind::Parser(p) => {
            println!(
                "  Record:      {} ({} field(s), select {})",
                p.record.name,
                p.record.fields.len(),
                p.record.select_text.as_deref().unwrap_or("<document>")
            );
            if !p.sinks.is_empty() {
                println!("  Sinks:       {}", p.sinks.join(", "));
            }
        }
        HandlerKind::Record(_) => {
            println!("  Note:        a record primary type cannot be instantiated as a parser");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_parser() {
        let handler = GlueCompiler::new()
            .compile(r#"parser P for R { sink "log"; } record R select "li" { a = "a"; b = "b"; }"#)
            .unwrap();
        let d = describe(&handler);
        assert_eq!(d["type"], "P");
        assert_eq!(d["kind"], "parser");
        assert_eq!(d["fields"], json!(["a", "b"]));
        assert_eq!(d["sinks"], json!(["log"]));
        assert_eq!(d["fingerprint"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_compile_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.glue");
        std::fs::write(&good, "record R {}").unwrap();
        assert!(run(Some(good.as_path()), true).is_ok());

        let bad = dir.path().join("bad.glue");
        std::fs::write(&bad, "record {").unwrap();
        assert!(run(Some(bad.as_path()), true).is_err());
    }
}
