//! 语义分析
//!
//! 三遍检查：声明（建立作用域、发现重名）、继承解析（父类链接与接口义务）、
//! 类型与覆盖检查。检查结果保存在 [`SemanticModel`] 中，
//! 只有检查成功后得到的 [`CheckedProgram`] 才能进入代码生成。

mod analyzer;
mod class_analysis;
mod declare;
mod diagnostics;
mod symbol_table;
mod typeck;

use std::collections::HashMap;

use crate::ast::*;
use crate::codegen::{ClassLayouts, CodeGenerator, InstructionSink};
use crate::config::CodegenOptions;
use crate::error::DecafResult;
use crate::types::Type;

pub use analyzer::SemanticAnalyzer;
pub use diagnostics::{Diagnostic, Diagnostics, LookingFor};
pub use symbol_table::{Conflict, DeclRef, Scope, ScopeId, ScopeKind, Symbol, SymbolKind, SymbolTable};

/// 接口义务：类必须实现的方法原型及引入它的接口
#[derive(Debug, Clone)]
pub struct VirtualFunction<'a> {
    pub prototype: &'a FnDecl,
    pub interface: &'a Identifier,
    pub implemented: bool,
}

/// 继承解析后的类信息
#[derive(Debug, Clone, Default)]
pub struct ClassInfo<'a> {
    pub parent: Option<&'a ClassDecl>,
    pub obligations: Vec<VirtualFunction<'a>>,
}

/// 变量引用：声明及其所在作用域
#[derive(Debug, Clone, Copy)]
pub struct VarRef<'a> {
    pub decl: &'a VarDecl,
    pub scope: ScopeId,
}

/// 调用表达式的目标
#[derive(Debug, Clone, Copy)]
pub enum CallTarget<'a> {
    Function(&'a FnDecl),
    Method {
        class: &'a ClassDecl,
        method: &'a FnDecl,
    },
    InterfaceMethod {
        interface: &'a InterfaceDecl,
        method: &'a FnDecl,
    },
    ArrayLength,
}

/// 语义分析产生的全部附加信息，以节点编号为键
#[derive(Debug, Default)]
pub struct SemanticModel<'a> {
    pub table: SymbolTable<'a>,
    /// 类、接口、函数与语句块打开的作用域
    scopes_by_node: HashMap<NodeId, ScopeId>,
    classes: HashMap<NodeId, ClassInfo<'a>>,
    expr_types: HashMap<NodeId, Type>,
    var_refs: HashMap<NodeId, VarRef<'a>>,
    call_targets: HashMap<NodeId, CallTarget<'a>>,
}

impl<'a> SemanticModel<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.scopes_by_node.get(&node).copied()
    }

    pub fn class_info(&self, class: NodeId) -> Option<&ClassInfo<'a>> {
        self.classes.get(&class)
    }

    pub fn expr_type(&self, expr: NodeId) -> Option<&Type> {
        self.expr_types.get(&expr)
    }

    pub fn var_ref(&self, expr: NodeId) -> Option<VarRef<'a>> {
        self.var_refs.get(&expr).copied()
    }

    pub fn call_target(&self, expr: NodeId) -> Option<CallTarget<'a>> {
        self.call_targets.get(&expr).copied()
    }

    /// 在全局作用域中按名字查找类
    pub fn find_class(&self, name: &str) -> Option<&'a ClassDecl> {
        match self.table.lookup_local(self.table.global(), name)?.decl {
            DeclRef::Class(class) => Some(class),
            _ => None,
        }
    }

    /// 在全局作用域中按名字查找接口
    pub fn find_interface(&self, name: &str) -> Option<&'a InterfaceDecl> {
        match self.table.lookup_local(self.table.global(), name)?.decl {
            DeclRef::Interface(interface) => Some(interface),
            _ => None,
        }
    }
}

/// 检查结果：模型与诊断总是一起返回
#[derive(Debug)]
pub struct CheckOutcome<'a> {
    pub program: &'a Program,
    /// 只读；检查失败的模型不能交给代码生成
    model: SemanticModel<'a>,
    pub diagnostics: Diagnostics,
    pub success: bool,
}

impl<'a> CheckOutcome<'a> {
    pub fn model(&self) -> &SemanticModel<'a> {
        &self.model
    }

    /// 检查成功时得到可生成代码的程序，否则返回全部诊断
    pub fn into_checked(self) -> Result<CheckedProgram<'a>, Diagnostics> {
        if self.success {
            Ok(CheckedProgram {
                program: self.program,
                model: self.model,
            })
        } else {
            Err(self.diagnostics)
        }
    }
}

/// 通过检查的程序；代码生成的唯一入口
#[derive(Debug)]
pub struct CheckedProgram<'a> {
    program: &'a Program,
    model: SemanticModel<'a>,
}

impl<'a> CheckedProgram<'a> {
    pub fn program(&self) -> &'a Program {
        self.program
    }

    pub fn model(&self) -> &SemanticModel<'a> {
        &self.model
    }

    /// 生成中间代码与虚表，返回各类的最终布局
    pub fn emit<S: InstructionSink>(self, sink: &mut S, options: &CodegenOptions) -> DecafResult<ClassLayouts<'a>> {
        let mut generator = CodeGenerator::new(self.model, sink, options.clone());
        generator.generate(self.program)
    }
}

/// 对整个程序执行语义检查
pub fn check(program: &Program) -> CheckOutcome<'_> {
    SemanticAnalyzer::new().analyze(program)
}
