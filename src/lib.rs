pub mod error;
pub mod types;
pub mod ast;
pub mod lexer;
pub mod parser;
pub mod semantic;
pub mod codegen;
pub mod config;

use codegen::TacBuilder;
use config::CodegenOptions;
use error::{DecafError, DecafResult};
use semantic::Diagnostics;

/// 编译驱动：词法分析、语法分析、语义检查，检查通过后生成三地址码
pub struct Compiler {
    options: CodegenOptions,
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_options(CodegenOptions::default())
    }

    pub fn with_options(options: CodegenOptions) -> Self {
        Self { options }
    }

    /// 只做检查，返回全部诊断（可能为空）
    pub fn check(&self, source: &str) -> DecafResult<Diagnostics> {
        let tokens = lexer::lex(source)?;
        let ast = parser::parse(tokens)?;
        Ok(semantic::check(&ast).diagnostics)
    }

    /// 编译为三地址码文本；检查失败时返回 [`DecafError::Check`]
    pub fn compile(&self, source: &str) -> DecafResult<String> {
        let tokens = lexer::lex(source)?;
        let ast = parser::parse(tokens)?;

        let checked = semantic::check(&ast).into_checked().map_err(DecafError::Check)?;

        let mut tac = TacBuilder::with_word_size(self.options.word_size);
        checked.emit(&mut tac, &self.options)?;
        Ok(tac.to_string())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_rejects_semantic_errors() {
        let result = Compiler::new().compile("void main() { int x; x = true; }");
        match result {
            Err(DecafError::Check(diagnostics)) => assert_eq!(diagnostics.len(), 1),
            other => panic!("expected check failure, got {:?}", other),
        }
    }

    #[test]
    fn test_check_reports_parse_errors_as_errors() {
        assert!(matches!(
            Compiler::new().check("class { }"),
            Err(DecafError::Parser { .. })
        ));
    }
}
