//! 语义诊断

use std::fmt;
use thiserror::Error;

use crate::error::SourceLocation;
use crate::types::Type;

/// 未找到声明时正在查找的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookingFor {
    Type,
    Class,
    Interface,
    Variable,
    Function,
}

impl fmt::Display for LookingFor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookingFor::Type => write!(f, "type"),
            LookingFor::Class => write!(f, "class"),
            LookingFor::Interface => write!(f, "interface"),
            LookingFor::Variable => write!(f, "variable"),
            LookingFor::Function => write!(f, "function"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Diagnostic {
    #[error("*** Declaration of '{name}' here conflicts with declaration on line {}", .existing.line)]
    DeclConflict {
        name: String,
        loc: SourceLocation,
        existing: SourceLocation,
    },

    #[error("*** Method '{name}' must match inherited type signature")]
    OverrideMismatch { name: String, loc: SourceLocation },

    #[error("*** No declaration found for {looking_for} '{name}'")]
    IdentifierNotDeclared {
        name: String,
        loc: SourceLocation,
        looking_for: LookingFor,
    },

    #[error("*** Class '{class}' does not implement entire interface '{interface}'")]
    InterfaceNotImplemented {
        class: String,
        interface: String,
        loc: SourceLocation,
    },

    #[error("*** Class '{class}' has a cyclic inheritance chain")]
    CyclicInheritance { class: String, loc: SourceLocation },

    #[error("*** Incompatible operands: {lhs} {op} {rhs}")]
    IncompatibleOperands {
        op: String,
        lhs: Type,
        rhs: Type,
        loc: SourceLocation,
    },

    #[error("*** Incompatible operand: {op} {operand}")]
    IncompatibleOperand {
        op: String,
        operand: Type,
        loc: SourceLocation,
    },

    #[error("*** 'this' is only valid within class scope")]
    ThisOutsideClassScope { loc: SourceLocation },

    #[error("*** [] can only be applied to arrays")]
    BracketsOnNonArray { loc: SourceLocation },

    #[error("*** Array subscript must be an integer")]
    SubscriptNotInteger { loc: SourceLocation },

    #[error("*** Size for NewArray must be an integer")]
    NewArraySizeNotInteger { loc: SourceLocation },

    #[error("*** {base} has no such field '{field}'")]
    FieldNotFoundInBase {
        field: String,
        base: Type,
        loc: SourceLocation,
    },

    #[error("*** {base} field '{field}' only accessible within class scope")]
    InaccessibleField {
        field: String,
        base: Type,
        loc: SourceLocation,
    },

    #[error("*** Function '{name}' expects {expected} arguments but {given} given")]
    NumArgsMismatch {
        name: String,
        expected: usize,
        given: usize,
        loc: SourceLocation,
    },

    #[error("*** Incompatible argument {index}: {given} given, {expected} expected")]
    ArgMismatch {
        index: usize,
        given: Type,
        expected: Type,
        loc: SourceLocation,
    },

    #[error("*** Incompatible return: {given} given, {expected} expected")]
    ReturnMismatch {
        given: Type,
        expected: Type,
        loc: SourceLocation,
    },

    #[error("*** Test expression must have boolean type")]
    TestNotBoolean { loc: SourceLocation },

    #[error("*** break is only allowed inside a loop")]
    BreakOutsideLoop { loc: SourceLocation },

    #[error("*** Incompatible argument {index}: {given} given, int/bool/string expected")]
    PrintArgMismatch {
        index: usize,
        given: Type,
        loc: SourceLocation,
    },
}

impl Diagnostic {
    pub fn loc(&self) -> SourceLocation {
        match self {
            Diagnostic::DeclConflict { loc, .. }
            | Diagnostic::OverrideMismatch { loc, .. }
            | Diagnostic::IdentifierNotDeclared { loc, .. }
            | Diagnostic::InterfaceNotImplemented { loc, .. }
            | Diagnostic::CyclicInheritance { loc, .. }
            | Diagnostic::IncompatibleOperands { loc, .. }
            | Diagnostic::IncompatibleOperand { loc, .. }
            | Diagnostic::ThisOutsideClassScope { loc }
            | Diagnostic::BracketsOnNonArray { loc }
            | Diagnostic::SubscriptNotInteger { loc }
            | Diagnostic::NewArraySizeNotInteger { loc }
            | Diagnostic::FieldNotFoundInBase { loc, .. }
            | Diagnostic::InaccessibleField { loc, .. }
            | Diagnostic::NumArgsMismatch { loc, .. }
            | Diagnostic::ArgMismatch { loc, .. }
            | Diagnostic::ReturnMismatch { loc, .. }
            | Diagnostic::TestNotBoolean { loc }
            | Diagnostic::BreakOutsideLoop { loc }
            | Diagnostic::PrintArgMismatch { loc, .. } => *loc,
        }
    }
}

/// 按报告顺序收集的诊断
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(%diagnostic, loc = %diagnostic.loc(), "reported");
        self.0.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.0
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'d> IntoIterator for &'d Diagnostics {
    type Item = &'d Diagnostic;
    type IntoIter = std::slice::Iter<'d, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let loc = diagnostic.loc();
            write!(f, "*** Error line {}, column {}.\n{}", loc.line, loc.column, diagnostic)?;
        }
        Ok(())
    }
}
