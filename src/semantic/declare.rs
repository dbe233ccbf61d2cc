//! 第一遍：按词法顺序声明所有名字并建立作用域

use crate::ast::*;
use super::analyzer::SemanticAnalyzer;
use super::{DeclRef, Diagnostic, ScopeId, ScopeKind};

impl<'a> SemanticAnalyzer<'a> {
    #[tracing::instrument(level = "debug", skip_all)]
    pub(super) fn declare_program(&mut self, program: &'a Program) -> bool {
        let global = self.model.table.global();
        let mut ok = true;
        for decl in &program.decls {
            ok &= self.declare(global, DeclRef::from(decl));
        }
        ok
    }

    /// 在作用域中声明一个名字，并为类、接口、函数打开子作用域后递归。
    /// 重名的声明仍然会打开（未登记的）作用域，使其成员照常被检查。
    fn declare(&mut self, scope: ScopeId, decl: DeclRef<'a>) -> bool {
        let mut ok = match self.model.table.declare_local(scope, decl) {
            Ok(()) => true,
            Err(conflict) => {
                self.report(Diagnostic::DeclConflict {
                    name: decl.name().to_string(),
                    loc: decl.loc(),
                    existing: conflict.existing.loc(),
                });
                false
            }
        };

        match decl {
            DeclRef::Var(_) => {}
            DeclRef::Class(class) => {
                let class_scope = self.model.table.open_scope(scope, Some(decl), ScopeKind::Class);
                self.model.scopes_by_node.insert(class.id, class_scope);
                for member in &class.members {
                    ok &= self.declare(class_scope, DeclRef::from(member));
                }
            }
            DeclRef::Interface(interface) => {
                let interface_scope = self.model.table.open_scope(scope, Some(decl), ScopeKind::Interface);
                self.model.scopes_by_node.insert(interface.id, interface_scope);
                for prototype in &interface.members {
                    ok &= self.declare(interface_scope, DeclRef::Fn(prototype));
                }
            }
            DeclRef::Fn(function) => {
                let fn_scope = self.model.table.open_scope(scope, Some(decl), ScopeKind::Function);
                self.model.scopes_by_node.insert(function.id, fn_scope);
                for formal in &function.formals {
                    ok &= self.declare(fn_scope, DeclRef::Var(formal));
                }
                // 函数体与形参共享同一个作用域
                if let Some(body) = &function.body {
                    self.model.scopes_by_node.insert(body.id, fn_scope);
                    ok &= self.declare_block(fn_scope, body);
                }
            }
        }

        ok
    }

    fn declare_block(&mut self, scope: ScopeId, block: &'a Block) -> bool {
        let mut ok = true;
        for var in &block.decls {
            ok &= self.declare(scope, DeclRef::Var(var));
        }
        for stmt in &block.statements {
            ok &= self.declare_stmt(scope, stmt);
        }
        ok
    }

    fn declare_stmt(&mut self, scope: ScopeId, stmt: &'a Stmt) -> bool {
        match stmt {
            Stmt::Block(block) => {
                let block_scope = self.model.table.open_scope(scope, None, ScopeKind::Block);
                self.model.scopes_by_node.insert(block.id, block_scope);
                self.declare_block(block_scope, block)
            }
            Stmt::If(if_stmt) => {
                let mut ok = self.declare_stmt(scope, &if_stmt.then_branch);
                if let Some(else_branch) = &if_stmt.else_branch {
                    ok &= self.declare_stmt(scope, else_branch);
                }
                ok
            }
            Stmt::While(while_stmt) => self.declare_stmt(scope, &while_stmt.body),
            Stmt::For(for_stmt) => self.declare_stmt(scope, &for_stmt.body),
            Stmt::Expr(_) | Stmt::Empty | Stmt::Break(_) | Stmt::Return(_) | Stmt::Print(_) => true,
        }
    }
}
