use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use thiserror::Error;

/// What went wrong while compiling a block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    #[error("{what} requires {expected} parameters, encountered {found}")]
    Arity {
        what: String,
        expected: &'static str,
        found: usize,
    },

    #[error("{what} must be {expected}, found {found}")]
    Type {
        what: String,
        expected: String,
        found: String,
    },

    #[error("{what} out of range {min}..{max}, encountered {value}")]
    Range {
        what: String,
        min: i64,
        max: i64,
        value: i64,
    },

    #[error("unresolved sprite-group reference '{name}'")]
    UnresolvedReference { name: String },

    #[error("'{name}' is not a valid sprite replacement type")]
    UnknownReplacementType { name: String },

    #[error(
        "invalid sprite count for sprite replacement type '{name}', expected {expected}, got {found}"
    )]
    SpriteCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("no image file specified for real sprite")]
    MissingSource,

    #[error("{what} contains no sprites")]
    EmptyBlock { what: String },

    #[error("unknown template '{name}'")]
    UnknownTemplate { name: String },

    #[error("template '{name}' expects {expected} argument(s), got {found}")]
    TemplateArity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("template expansion exceeds the limit of {limit} {what}")]
    ExpansionLimit { limit: usize, what: &'static str },

    #[error("template '{name}' expands into itself")]
    RecursiveTemplate { name: String },

    #[error("'{name}' is already defined")]
    DuplicateName { name: String },

    #[error("'{name}' is reserved and cannot be defined")]
    ReservedName { name: String },

    #[error("{0}")]
    Arithmetic(String),
}

/// A compile error enriched with source location information, when it has
/// one. Errors about configuration carry no span.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub span: Option<Range<usize>>,
    pub file_id: usize,
    pub notes: Vec<String>,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, span: Range<usize>) -> Self {
        CompileError {
            kind,
            span: Some(span),
            file_id: 0,
            notes: Vec::new(),
        }
    }

    /// An error with no place in the source.
    pub fn unlocated(kind: CompileErrorKind) -> Self {
        CompileError {
            kind,
            span: None,
            file_id: 0,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Attach the file the span refers to.
    pub fn in_file(mut self, file_id: usize) -> Self {
        self.file_id = file_id;
        self
    }

    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        let labels = self
            .span
            .iter()
            .map(|span| Label::primary(self.file_id, span.clone()))
            .collect();
        Diagnostic::error()
            .with_message(self.kind.to_string())
            .with_labels(labels)
            .with_notes(self.notes.clone())
    }
}

/// A non-fatal finding; compilation continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileWarning {
    pub message: String,
    pub span: Range<usize>,
    pub file_id: usize,
}

impl CompileWarning {
    pub fn new(message: impl Into<String>, span: Range<usize>) -> Self {
        CompileWarning {
            message: message.into(),
            span,
            file_id: 0,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::warning()
            .with_message(&self.message)
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
    }
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
