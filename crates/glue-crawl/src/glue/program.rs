//! Compiled glue programs.
//!
//! A program is the checked, executable form of a glue declaration:
//! selectors are parsed once here and reused by every parser instance.

use super::lexer::{CmpOp, Pos};
use super::parser::{FieldDecl, Item, OutcomeExpr, ParserDecl, ParserStmt, RecordDecl, SourceAst};
use crate::error::{GlueError, GlueResult};
use scraper::Selector;
use std::collections::{BTreeMap, HashMap, HashSet};

/// How a field value is taken from its matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extract {
    /// Whitespace-normalised text content.
    Text,
    /// Inner HTML.
    Html,
    /// An attribute value.
    Attr(String),
}

#[derive(Debug, Clone)]
pub struct FieldProgram {
    pub name: String,
    pub selector: Selector,
    pub selector_text: String,
    pub extract: Extract,
}

/// Executable form of a `record` declaration.
#[derive(Debug, Clone)]
pub struct RecordProgram {
    pub name: String,
    /// Item selector; `None` selects the document root once.
    pub select: Option<Selector>,
    pub select_text: Option<String>,
    pub fields: Vec<FieldProgram>,
}

/// Rule deciding a parser's boolean outcome from its extracted items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeRule {
    Always(bool),
    Count(CmpOp, usize),
    Every(String),
    Any(String),
}

/// Executable form of a `parser` declaration.
#[derive(Debug, Clone)]
pub struct ParserProgram {
    pub name: String,
    pub record: RecordProgram,
    pub outcome: OutcomeRule,
    /// Declared cookies; when empty the job's cookies are kept.
    pub cookies: BTreeMap<String, String>,
    /// `None` keeps the job's setting.
    pub validate_tls: Option<bool>,
    pub timeout_millis: Option<u64>,
    pub user_agent: Option<String>,
    pub sinks: Vec<String>,
}

/// The primary declaration of a source, checked and ready to instantiate.
#[derive(Debug, Clone)]
pub enum Program {
    Parser(ParserProgram),
    Record(RecordProgram),
}

/// Check an AST and build the program for its primary (first) item.
///
/// Every item is checked, not only the primary one, so a broken secondary
/// declaration is reported at compile time.
pub fn build(ast: &SourceAst) -> GlueResult<Program> {
    let mut records: HashMap<&str, &RecordDecl> = HashMap::new();
    let mut parsers: HashSet<&str> = HashSet::new();

    for item in &ast.items {
        let name = item.name();
        if records.contains_key(name) || parsers.contains(name) {
            return Err(err_at(item.pos(), format!("duplicate type '{name}'")));
        }
        match item {
            Item::Record(r) => {
                records.insert(name, r);
            }
            Item::Parser(_) => {
                parsers.insert(name);
            }
        }
    }

    let mut primary = None;
    for item in &ast.items {
        let program = match item {
            Item::Record(r) => Program::Record(build_record(r)?),
            Item::Parser(p) => Program::Parser(build_parser(p, &records, &parsers)?),
        };
        if primary.is_none() {
            primary = Some(program);
        }
    }

    primary.ok_or_else(|| GlueError::compile(1, 1, "source declares no parser or record"))
}

fn build_record(decl: &RecordDecl) -> GlueResult<RecordProgram> {
    let (select, select_text) = match &decl.select {
        Some((text, pos)) => (Some(parse_selector(text, *pos)?), Some(text.clone())),
        None => (None, None),
    };

    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(decl.fields.len());
    for field in &decl.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(err_at(
                field.pos,
                format!("duplicate field '{}' in record '{}'", field.name, decl.name),
            ));
        }
        fields.push(build_field(field)?);
    }

    Ok(RecordProgram {
        name: decl.name.clone(),
        select,
        select_text,
        fields,
    })
}

fn build_field(decl: &FieldDecl) -> GlueResult<FieldProgram> {
    let extract = match decl.extract.as_deref() {
        None | Some("text") => Extract::Text,
        Some("html") => Extract::Html,
        Some(attr) => Extract::Attr(attr.to_string()),
    };
    Ok(FieldProgram {
        name: decl.name.clone(),
        selector: parse_selector(&decl.selector, decl.selector_pos)?,
        selector_text: decl.selector.clone(),
        extract,
    })
}

fn build_parser(
    decl: &ParserDecl,
    records: &HashMap<&str, &RecordDecl>,
    parsers: &HashSet<&str>,
) -> GlueResult<ParserProgram> {
    let record_decl = match records.get(decl.record.as_str()) {
        Some(r) => *r,
        None if parsers.contains(decl.record.as_str()) => {
            return Err(err_at(
                decl.record_pos,
                format!(
                    "parser '{}' must be bound to a record, '{}' is a parser",
                    decl.name, decl.record
                ),
            ))
        }
        None => {
            return Err(err_at(
                decl.record_pos,
                format!("unknown record '{}'", decl.record),
            ))
        }
    };
    let record = build_record(record_decl)?;

    let mut outcome = None;
    let mut cookies = BTreeMap::new();
    let mut validate_tls = None;
    let mut timeout_millis = None;
    let mut user_agent = None;
    let mut sinks: Vec<String> = Vec::new();

    for (stmt, pos) in &decl.stmts {
        match stmt {
            ParserStmt::Outcome(expr) => {
                if outcome.is_some() {
                    return Err(err_at(*pos, "outcome declared more than once"));
                }
                outcome = Some(build_outcome(expr, &record, *pos)?);
            }
            ParserStmt::Cookie(k, v) => {
                cookies.insert(k.clone(), v.clone());
            }
            ParserStmt::ValidateTls(v) => validate_tls = Some(*v),
            ParserStmt::Timeout(ms) => {
                if *ms == 0 {
                    return Err(err_at(*pos, "timeout must be positive"));
                }
                timeout_millis = Some(*ms);
            }
            ParserStmt::UserAgent(ua) => user_agent = Some(ua.clone()),
            ParserStmt::Sink(name) => {
                if !sinks.contains(name) {
                    sinks.push(name.clone());
                }
            }
        }
    }

    Ok(ParserProgram {
        name: decl.name.clone(),
        record,
        outcome: outcome.unwrap_or(OutcomeRule::Always(true)),
        cookies,
        validate_tls,
        timeout_millis,
        user_agent,
        sinks,
    })
}

fn build_outcome(expr: &OutcomeExpr, record: &RecordProgram, pos: Pos) -> GlueResult<OutcomeRule> {
    let has_field = |f: &str| record.fields.iter().any(|field| field.name == f);
    match expr {
        OutcomeExpr::Always(b) => Ok(OutcomeRule::Always(*b)),
        OutcomeExpr::Count(op, n) => Ok(OutcomeRule::Count(*op, *n as usize)),
        OutcomeExpr::Every(f) | OutcomeExpr::Any(f) if !has_field(f) => Err(err_at(
            pos,
            format!("record '{}' has no field '{f}'", record.name),
        )),
        OutcomeExpr::Every(f) => Ok(OutcomeRule::Every(f.clone())),
        OutcomeExpr::Any(f) => Ok(OutcomeRule::Any(f.clone())),
    }
}

fn parse_selector(text: &str, pos: Pos) -> GlueResult<Selector> {
    Selector::parse(text).map_err(|e| err_at(pos, format!("invalid CSS selector \"{text}\": {e}")))
}

fn err_at(pos: Pos, message: impl Into<String>) -> GlueError {
    GlueError::compile(pos.line, pos.column, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glue::parser::parse;

    fn compile(src: &str) -> GlueResult<Program> {
        build(&parse(src)?)
    }

    #[test]
    fn test_primary_parser_program() {
        let program = compile(
            r#"
            parser P for R { outcome = every title; cookie "a" = "1"; sink "log"; sink "log"; }
            record R select "li" { title = "h2"; body = ".body" @html; link = "a" @href; }
            "#,
        )
        .unwrap();
        let Program::Parser(p) = program else {
            panic!("expected parser program");
        };
        assert_eq!(p.name, "P");
        assert_eq!(p.outcome, OutcomeRule::Every("title".into()));
        assert_eq!(p.cookies.get("a").map(String::as_str), Some("1"));
        assert_eq!(p.validate_tls, None);
        assert_eq!(p.sinks, vec!["log".to_string()]);
        assert_eq!(p.record.fields[1].extract, Extract::Html);
        assert_eq!(p.record.fields[2].extract, Extract::Attr("href".into()));
    }

    #[test]
    fn test_primary_record_program() {
        let program = compile(r#"record R { x = ".x"; } parser P for R {}"#).unwrap();
        assert!(matches!(program, Program::Record(r) if r.name == "R"));
    }

    #[test]
    fn test_default_outcome_is_true() {
        let Program::Parser(p) = compile(r#"parser P for R {} record R {}"#).unwrap() else {
            panic!("expected parser program");
        };
        assert_eq!(p.outcome, OutcomeRule::Always(true));
    }

    #[test]
    fn test_unknown_record() {
        let err = compile("parser P for Missing {}").unwrap_err();
        assert_eq!(
            err,
            GlueError::Compile {
                line: 1,
                column: 14,
                message: "unknown record 'Missing'".into()
            }
        );
    }

    #[test]
    fn test_parser_bound_to_parser() {
        let err = compile("parser P for Q {} parser Q for R {} record R {}").unwrap_err();
        assert!(err.to_string().contains("'Q' is a parser"));
    }

    #[test]
    fn test_invalid_selector() {
        let err = compile(r#"record R { x = "div[["; }"#).unwrap_err();
        assert!(err.to_string().contains("invalid CSS selector"));
    }

    #[test]
    fn test_duplicate_names() {
        assert!(compile("record R {} record R {}")
            .unwrap_err()
            .to_string()
            .contains("duplicate type 'R'"));
        assert!(compile(r#"record R { x = "a"; x = "b"; }"#)
            .unwrap_err()
            .to_string()
            .contains("duplicate field 'x'"));
    }

    #[test]
    fn test_outcome_field_must_exist() {
        let err = compile(r#"parser P for R { outcome = any price; } record R { title = "h1"; }"#)
            .unwrap_err();
        assert!(err.to_string().contains("has no field 'price'"));
    }

    #[test]
    fn test_outcome_declared_twice() {
        let err = compile("parser P for R { outcome = true; outcome = false; } record R {}")
            .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_broken_secondary_item_reported() {
        let err = compile(r#"parser P for R {} record R {} record S { x = ":::"; }"#).unwrap_err();
        assert!(matches!(err, GlueError::Compile { .. }));
    }
}
