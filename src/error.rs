use thiserror::Error;
use std::fmt;

use crate::semantic::Diagnostics;

#[derive(Error, Debug, Clone)]
pub enum DecafError {
    #[error("Lexer error at line {line}, column {column}: {message}")]
    Lexer { line: usize, column: usize, message: String },

    #[error("Parser error at line {line}, column {column}: {message}")]
    Parser { line: usize, column: usize, message: String },

    #[error("Semantic analysis failed:\n{0}")]
    Check(Diagnostics),

    #[error("Code generation error: {0}")]
    CodeGen(String),

    #[error("IO error: {0}")]
    Io(String),
}

pub type DecafResult<T> = Result<T, DecafError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

pub fn lexer_error(line: usize, column: usize, message: impl Into<String>) -> DecafError {
    DecafError::Lexer {
        line,
        column,
        message: message.into(),
    }
}

pub fn parser_error(line: usize, column: usize, message: impl Into<String>) -> DecafError {
    DecafError::Parser {
        line,
        column,
        message: message.into(),
    }
}

pub fn codegen_error(message: impl Into<String>) -> DecafError {
    DecafError::CodeGen(message.into())
}
