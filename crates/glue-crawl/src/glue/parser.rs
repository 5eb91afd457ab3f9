//! Recursive-descent parser over the token stream.
//!
//! Grammar:
//! ```text
//! source      := item+
//! item        := parser_decl | record_decl
//! parser_decl := 'parser' IDENT 'for' IDENT '{' parser_stmt* '}'
//! parser_stmt := 'outcome' '=' outcome ';'
//!              | 'cookie' STRING '=' STRING ';'
//!              | 'validate_tls' '=' BOOL ';'
//!              | 'timeout' '=' NUMBER ';'
//!              | 'user_agent' '=' STRING ';'
//!              | 'sink' STRING ';'
//! record_decl := 'record' IDENT ['select' STRING] '{' field* '}'
//! field       := IDENT '=' STRING ['@' IDENT] ';'
//! outcome     := 'true' | 'false' | 'items' CMP NUMBER | 'every' IDENT | 'any' IDENT
//! ```

use super::lexer::{tokenize, CmpOp, Pos, Spanned, Token};
use crate::error::{GlueError, GlueResult};

/// A parsed glue source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAst {
    pub items: Vec<Item>,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Parser(ParserDecl),
    Record(RecordDecl),
}

impl Item {
    pub fn name(&self) -> &str {
        match self {
            Item::Parser(p) => &p.name,
            Item::Record(r) => &r.name,
        }
    }

    pub fn pos(&self) -> Pos {
        match self {
            Item::Parser(p) => p.pos,
            Item::Record(r) => r.pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParserDecl {
    pub name: String,
    pub record: String,
    pub record_pos: Pos,
    pub stmts: Vec<(ParserStmt, Pos)>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParserStmt {
    Outcome(OutcomeExpr),
    Cookie(String, String),
    ValidateTls(bool),
    Timeout(u64),
    UserAgent(String),
    Sink(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeExpr {
    Always(bool),
    Count(CmpOp, u64),
    Every(String),
    Any(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordDecl {
    pub name: String,
    pub select: Option<(String, Pos)>,
    pub fields: Vec<FieldDecl>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub selector: String,
    pub extract: Option<String>,
    pub pos: Pos,
    pub selector_pos: Pos,
}

/// Parse a glue source into an AST.
pub fn parse(source: &str) -> GlueResult<SourceAst> {
    let tokens = tokenize(source)?;
    let mut p = TokenStream { tokens, pos: 0 };

    let mut items = Vec::new();
    while !p.at_eof() {
        let (word, pos) = p.expect_ident("'parser' or 'record'")?;
        match word.as_str() {
            "parser" => items.push(Item::Parser(parse_parser(&mut p, pos)?)),
            "record" => items.push(Item::Record(parse_record(&mut p, pos)?)),
            other => {
                return Err(GlueError::compile(
                    pos.line,
                    pos.column,
                    format!("expected 'parser' or 'record', found '{other}'"),
                ))
            }
        }
    }

    if items.is_empty() {
        let pos = p.current_pos();
        return Err(GlueError::compile(
            pos.line,
            pos.column,
            "source declares no parser or record",
        ));
    }

    Ok(SourceAst { items })
}

struct TokenStream {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl TokenStream {
    fn peek(&self) -> &Token {
        // tokenize always ends with Eof, and we never advance past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)].token
    }

    fn current_pos(&self) -> Pos {
        self.tokens[self.pos.min(self.tokens.len() - 1)].pos
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn advance(&mut self) -> (Token, Pos) {
        let idx = self.pos.min(self.tokens.len() - 1);
        let spanned = self.tokens[idx].clone();
        if !matches!(spanned.token, Token::Eof) {
            self.pos += 1;
        }
        (spanned.token, spanned.pos)
    }

    fn error(&self, expected: &str) -> GlueError {
        let pos = self.current_pos();
        GlueError::compile(
            pos.line,
            pos.column,
            format!("expected {expected}, found {}", describe(self.peek())),
        )
    }

    fn expect(&mut self, want: Token, expected: &str) -> GlueResult<Pos> {
        if *self.peek() == want {
            Ok(self.advance().1)
        } else {
            Err(self.error(expected))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> GlueResult<(String, Pos)> {
        match self.peek() {
            Token::Ident(_) => match self.advance() {
                (Token::Ident(word), pos) => Ok((word, pos)),
                _ => Err(self.error(expected)),
            },
            _ => Err(self.error(expected)),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> GlueResult<Pos> {
        match self.peek() {
            Token::Ident(w) if w == keyword => Ok(self.advance().1),
            _ => Err(self.error(&format!("'{keyword}'"))),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Ident(w) if w == keyword)
    }

    fn expect_string(&mut self, expected: &str) -> GlueResult<(String, Pos)> {
        match self.peek() {
            Token::Str(_) => match self.advance() {
                (Token::Str(s), pos) => Ok((s, pos)),
                _ => Err(self.error(expected)),
            },
            _ => Err(self.error(expected)),
        }
    }

    fn expect_number(&mut self, expected: &str) -> GlueResult<u64> {
        match self.peek() {
            Token::Number(n) => {
                let n = *n;
                self.advance();
                Ok(n)
            }
            _ => Err(self.error(expected)),
        }
    }

    fn expect_bool(&mut self) -> GlueResult<bool> {
        match self.peek() {
            Token::Ident(w) if w == "true" => {
                self.advance();
                Ok(true)
            }
            Token::Ident(w) if w == "false" => {
                self.advance();
                Ok(false)
            }
            _ => Err(self.error("'true' or 'false'")),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Ident(w) => format!("'{w}'"),
        Token::Str(s) => format!("string \"{s}\""),
        Token::Number(n) => format!("number {n}"),
        Token::Cmp(op) => format!("operator {op:?}"),
        Token::Assign => "'='".to_string(),
        Token::LBrace => "'{'".to_string(),
        Token::RBrace => "'}'".to_string(),
        Token::Semi => "';'".to_string(),
        Token::At => "'@'".to_string(),
        Token::Eof => "end of source".to_string(),
    }
}

fn parse_parser(p: &mut TokenStream, pos: Pos) -> GlueResult<ParserDecl> {
    let (name, _) = p.expect_ident("parser name")?;
    p.expect_keyword("for")?;
    let (record, record_pos) = p.expect_ident("record name")?;
    p.expect(Token::LBrace, "'{'")?;

    let mut stmts = Vec::new();
    while !matches!(p.peek(), Token::RBrace) {
        let (word, stmt_pos) = p.expect_ident("parser statement or '}'")?;
        let stmt = match word.as_str() {
            "outcome" => {
                p.expect(Token::Assign, "'='")?;
                ParserStmt::Outcome(parse_outcome(p)?)
            }
            "cookie" => {
                let (key, _) = p.expect_string("cookie name")?;
                p.expect(Token::Assign, "'='")?;
                let (value, _) = p.expect_string("cookie value")?;
                ParserStmt::Cookie(key, value)
            }
            "validate_tls" => {
                p.expect(Token::Assign, "'='")?;
                ParserStmt::ValidateTls(p.expect_bool()?)
            }
            "timeout" => {
                p.expect(Token::Assign, "'='")?;
                ParserStmt::Timeout(p.expect_number("timeout in milliseconds")?)
            }
            "user_agent" => {
                p.expect(Token::Assign, "'='")?;
                ParserStmt::UserAgent(p.expect_string("user agent")?.0)
            }
            "sink" => ParserStmt::Sink(p.expect_string("sink name")?.0),
            other => {
                return Err(GlueError::compile(
                    stmt_pos.line,
                    stmt_pos.column,
                    format!("unknown parser statement '{other}'"),
                ))
            }
        };
        p.expect(Token::Semi, "';'")?;
        stmts.push((stmt, stmt_pos));
    }
    p.expect(Token::RBrace, "'}'")?;

    Ok(ParserDecl {
        name,
        record,
        record_pos,
        stmts,
        pos,
    })
}

fn parse_outcome(p: &mut TokenStream) -> GlueResult<OutcomeExpr> {
    let (word, pos) = p.expect_ident("outcome rule")?;
    match word.as_str() {
        "true" => Ok(OutcomeExpr::Always(true)),
        "false" => Ok(OutcomeExpr::Always(false)),
        "items" => {
            let op = match p.peek() {
                Token::Cmp(op) => *op,
                _ => return Err(p.error("comparison operator")),
            };
            p.advance();
            let n = p.expect_number("item count")?;
            Ok(OutcomeExpr::Count(op, n))
        }
        "every" => Ok(OutcomeExpr::Every(p.expect_ident("field name")?.0)),
        "any" => Ok(OutcomeExpr::Any(p.expect_ident("field name")?.0)),
        other => Err(GlueError::compile(
            pos.line,
            pos.column,
            format!("unknown outcome rule '{other}'"),
        )),
    }
}

fn parse_record(p: &mut TokenStream, pos: Pos) -> GlueResult<RecordDecl> {
    let (name, _) = p.expect_ident("record name")?;

    let select = if p.peek_keyword("select") {
        p.advance();
        Some(p.expect_string("CSS selector")?)
    } else {
        None
    };

    p.expect(Token::LBrace, "'{'")?;
    let mut fields = Vec::new();
    while !matches!(p.peek(), Token::RBrace) {
        let (field, field_pos) = p.expect_ident("field name or '}'")?;
        p.expect(Token::Assign, "'='")?;
        let (selector, selector_pos) = p.expect_string("CSS selector")?;
        let extract = if matches!(p.peek(), Token::At) {
            p.advance();
            Some(p.expect_ident("attribute name")?.0)
        } else {
            None
        };
        p.expect(Token::Semi, "';'")?;
        fields.push(FieldDecl {
            name: field,
            selector,
            extract,
            pos: field_pos,
            selector_pos,
        });
    }
    p.expect(Token::RBrace, "'}'")?;

    Ok(RecordDecl {
        name,
        select,
        fields,
        pos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
        parser TestPageParser for TestPageVo {
            outcome = items >= 1;
            cookie "session" = "abc";
            validate_tls = false;
            timeout = 8000;
            sink "log";
        }

        record TestPageVo select "#search-projects-ulist .project" {
            repository = ".repository";
            link = "a" @href;
        }
    "##;

    #[test]
    fn test_parse_parser_and_record() {
        let ast = parse(SAMPLE).unwrap();
        assert_eq!(ast.items.len(), 2);
        assert_eq!(ast.items[0].name(), "TestPageParser");

        let Item::Parser(parser) = &ast.items[0] else {
            panic!("expected parser first");
        };
        assert_eq!(parser.record, "TestPageVo");
        assert_eq!(parser.stmts.len(), 5);
        assert_eq!(
            parser.stmts[0].0,
            ParserStmt::Outcome(OutcomeExpr::Count(CmpOp::Gte, 1))
        );
        assert_eq!(parser.stmts[3].0, ParserStmt::Timeout(8000));

        let Item::Record(record) = &ast.items[1] else {
            panic!("expected record second");
        };
        assert_eq!(
            record.select.as_ref().map(|(s, _)| s.as_str()),
            Some("#search-projects-ulist .project")
        );
        assert_eq!(record.fields[1].extract.as_deref(), Some("href"));
    }

    #[test]
    fn test_record_without_select() {
        let ast = parse(r#"record Page { title = "title"; }"#).unwrap();
        let Item::Record(record) = &ast.items[0] else {
            panic!("expected record");
        };
        assert!(record.select.is_none());
    }

    #[test]
    fn test_missing_semicolon() {
        let err = parse("record Page {\n  title = \"title\"\n}").unwrap_err();
        match err {
            GlueError::Compile {
                line,
                column,
                message,
            } => {
                assert_eq!((line, column), (3, 1));
                assert!(message.contains("expected ';'"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_top_level_word() {
        let err = parse("public class TestPageParser {}").unwrap_err();
        assert!(err.to_string().contains("expected 'parser' or 'record'"));
    }

    #[test]
    fn test_empty_source_rejected() {
        let err = parse("  // nothing here\n").unwrap_err();
        assert!(err.to_string().contains("no parser or record"));
    }

    #[test]
    fn test_unknown_outcome_rule() {
        let err = parse("parser P for R { outcome = maybe; }").unwrap_err();
        assert!(err.to_string().contains("unknown outcome rule 'maybe'"));
    }
}
