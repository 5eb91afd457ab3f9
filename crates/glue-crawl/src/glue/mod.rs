//! The glue language: declarative page parsers supplied as job input.
//!
//! A source declares `parser` and `record` items. The first item is the
//! source's primary type; only a primary `parser` can be instantiated.

pub mod lexer;
pub mod parser;
pub mod program;

pub use lexer::CmpOp;
pub use program::{Extract, FieldProgram, OutcomeRule, ParserProgram, Program, RecordProgram};

use crate::error::GlueResult;

/// Parse and check a glue source.
pub fn compile(source: &str) -> GlueResult<Program> {
    let ast = parser::parse(source)?;
    program::build(&ast)
}
