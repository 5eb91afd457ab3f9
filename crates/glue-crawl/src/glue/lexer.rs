//! Tokenizer for glue sources.

use crate::error::{GlueError, GlueResult};

/// Line/column of a token, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

/// Comparison operator in an `outcome = items ...` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CmpOp {
    pub fn apply(self, left: usize, right: usize) -> bool {
        match self {
            CmpOp::Eq => left == right,
            CmpOp::Neq => left != right,
            CmpOp::Lt => left < right,
            CmpOp::Lte => left <= right,
            CmpOp::Gt => left > right,
            CmpOp::Gte => left >= right,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Number(u64),
    Cmp(CmpOp),
    Assign,
    LBrace,
    RBrace,
    Semi,
    At,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: Pos,
}

struct Cursor {
    chars: Vec<char>,
    i: usize,
    line: usize,
    column: usize,
}

impl Cursor {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            i: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.i).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.i + 1).copied()
    }

    fn pos(&self) -> Pos {
        Pos {
            line: self.line,
            column: self.column,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.i).copied()?;
        self.i += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }
}

/// Split a glue source into tokens, ending with [`Token::Eof`].
pub fn tokenize(input: &str) -> GlueResult<Vec<Spanned>> {
    let mut cur = Cursor::new(input);
    let mut tokens = Vec::new();

    while let Some(c) = cur.peek() {
        if c.is_whitespace() {
            cur.bump();
            continue;
        }

        // Comments
        if c == '/' && cur.peek_next() == Some('/') {
            while let Some(c) = cur.peek() {
                if c == '\n' {
                    break;
                }
                cur.bump();
            }
            continue;
        }
        if c == '/' && cur.peek_next() == Some('*') {
            let start = cur.pos();
            cur.bump();
            cur.bump();
            loop {
                match cur.bump() {
                    Some('*') if cur.peek() == Some('/') => {
                        cur.bump();
                        break;
                    }
                    Some(_) => {}
                    None => {
                        return Err(GlueError::compile(
                            start.line,
                            start.column,
                            "unterminated block comment",
                        ))
                    }
                }
            }
            continue;
        }

        let pos = cur.pos();

        if c == '"' {
            cur.bump();
            let mut s = String::new();
            loop {
                match cur.bump() {
                    Some('"') => break,
                    Some('\\') => {
                        let escaped = match cur.bump() {
                            Some('"') => '"',
                            Some('\\') => '\\',
                            Some('n') => '\n',
                            Some('t') => '\t',
                            Some(other) => {
                                return Err(GlueError::compile(
                                    pos.line,
                                    pos.column,
                                    format!("unknown escape '\\{other}' in string literal"),
                                ))
                            }
                            None => {
                                return Err(GlueError::compile(
                                    pos.line,
                                    pos.column,
                                    "unterminated string literal",
                                ))
                            }
                        };
                        s.push(escaped);
                    }
                    Some('\n') | None => {
                        return Err(GlueError::compile(
                            pos.line,
                            pos.column,
                            "unterminated string literal",
                        ))
                    }
                    Some(other) => s.push(other),
                }
            }
            tokens.push(Spanned {
                token: Token::Str(s),
                pos,
            });
            continue;
        }

        if c.is_ascii_digit() {
            let mut digits = String::new();
            while let Some(d) = cur.peek().filter(|d| d.is_ascii_digit()) {
                digits.push(d);
                cur.bump();
            }
            let n: u64 = digits.parse().map_err(|_| {
                GlueError::compile(pos.line, pos.column, format!("number out of range: {digits}"))
            })?;
            tokens.push(Spanned {
                token: Token::Number(n),
                pos,
            });
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let mut word = String::new();
            while let Some(w) = cur.peek().filter(|w| w.is_alphanumeric() || *w == '_') {
                word.push(w);
                cur.bump();
            }
            tokens.push(Spanned {
                token: Token::Ident(word),
                pos,
            });
            continue;
        }

        let token = match c {
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ';' => Token::Semi,
            '@' => Token::At,
            '=' if cur.peek_next() == Some('=') => {
                cur.bump();
                Token::Cmp(CmpOp::Eq)
            }
            '=' => Token::Assign,
            '!' if cur.peek_next() == Some('=') => {
                cur.bump();
                Token::Cmp(CmpOp::Neq)
            }
            '<' if cur.peek_next() == Some('=') => {
                cur.bump();
                Token::Cmp(CmpOp::Lte)
            }
            '<' => Token::Cmp(CmpOp::Lt),
            '>' if cur.peek_next() == Some('=') => {
                cur.bump();
                Token::Cmp(CmpOp::Gte)
            }
            '>' => Token::Cmp(CmpOp::Gt),
            other => {
                return Err(GlueError::compile(
                    pos.line,
                    pos.column,
                    format!("unexpected character '{other}'"),
                ))
            }
        };
        cur.bump();
        tokens.push(Spanned { token, pos });
    }

    tokens.push(Spanned {
        token: Token::Eof,
        pos: cur.pos(),
    });
    Ok(tokens)
}
