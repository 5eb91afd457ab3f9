//! Dynamic handler compiler and compiled handler descriptors.

use crate::error::{GlueError, GlueResult};
use crate::fingerprint::Fingerprint;
use crate::glue::{self, ParserProgram, Program, RecordProgram};
use crate::handler::GlueParser;
use std::sync::Arc;

/// Turns source text into a compiled handler descriptor.
pub trait HandlerCompiler: Send + Sync {
    fn compile(&self, source: &str) -> GlueResult<CompiledHandler>;
}

/// What a compiled primary type is, tagged by capability.
#[derive(Debug, Clone)]
pub enum HandlerKind {
    /// Satisfies the page parser capability.
    Parser(Arc<ParserProgram>),
    /// A plain data type; cannot be instantiated as a parser.
    Record(Arc<RecordProgram>),
}

impl HandlerKind {
    pub fn label(&self) -> &'static str {
        match self {
            HandlerKind::Parser(_) => "parser",
            HandlerKind::Record(_) => "record",
        }
    }
}

/// A compiled, shareable handler descriptor.
///
/// Owns the checked program only; the source text is not retained.
#[derive(Debug, Clone)]
pub struct CompiledHandler {
    fingerprint: Fingerprint,
    type_name: String,
    kind: HandlerKind,
}

impl CompiledHandler {
    pub fn new(fingerprint: Fingerprint, kind: HandlerKind) -> Self {
        let type_name = match &kind {
            HandlerKind::Parser(p) => p.name.clone(),
            HandlerKind::Record(r) => r.name.clone(),
        };
        Self {
            fingerprint,
            type_name,
            kind,
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Name of the primary type.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn kind(&self) -> &HandlerKind {
        &self.kind
    }

    /// Construct a fresh parser bound to `redirect_target`.
    pub fn instantiate(&self, redirect_target: &str) -> GlueResult<GlueParser> {
        match &self.kind {
            HandlerKind::Parser(program) => {
                Ok(GlueParser::new(Arc::clone(program), redirect_target))
            }
            HandlerKind::Record(_) => Err(GlueError::TypeMismatch {
                type_name: self.type_name.clone(),
            }),
        }
    }
}

/// Compiler for the glue language.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlueCompiler;

impl GlueCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl HandlerCompiler for GlueCompiler {
    fn compile(&self, source: &str) -> GlueResult<CompiledHandler> {
        let fingerprint = Fingerprint::of(source);
        let kind = match glue::compile(source)? {
            Program::Parser(p) => HandlerKind::Parser(Arc::new(p)),
            Program::Record(r) => HandlerKind::Record(Arc::new(r)),
        };
        let handler = CompiledHandler::new(fingerprint, kind);
        tracing::debug!(
            "compiled {} '{}' ({})",
            handler.kind().label(),
            handler.type_name(),
            fingerprint.short()
        );
        Ok(handler)
    }
}
