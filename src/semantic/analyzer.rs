//! 语义分析器核心实现

use crate::ast::*;
use super::{CheckOutcome, Diagnostic, Diagnostics, SemanticModel};

/// 语义分析器
pub struct SemanticAnalyzer<'a> {
    pub(super) model: SemanticModel<'a>,
    pub(super) diagnostics: Diagnostics,
    pub(super) current_function: Option<&'a FnDecl>,
    pub(super) loop_depth: usize,
}

impl<'a> SemanticAnalyzer<'a> {
    pub fn new() -> Self {
        Self {
            model: SemanticModel::new(),
            diagnostics: Diagnostics::new(),
            current_function: None,
            loop_depth: 0,
        }
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn analyze(mut self, program: &'a Program) -> CheckOutcome<'a> {
        // 第一遍：声明，建立作用域
        let declared = self.declare_program(program);

        // 第二遍：继承关系与接口义务
        let resolved = self.resolve_hierarchy(program);

        // 第三遍：类型与覆盖检查
        let checked = self.check_program(program);

        let success = declared && resolved && checked && self.diagnostics.is_empty();
        tracing::debug!(
            declared,
            resolved,
            checked,
            errors = self.diagnostics.len(),
            "semantic analysis finished"
        );

        CheckOutcome {
            program,
            model: self.model,
            diagnostics: self.diagnostics,
            success,
        }
    }

    pub(super) fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

impl Default for SemanticAnalyzer<'_> {
    fn default() -> Self {
        Self::new()
    }
}
