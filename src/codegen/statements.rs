//! 语句代码生成

use crate::ast::*;
use crate::error::{DecafResult, codegen_error};
use crate::types::Type;
use super::context::CodeGenerator;
use super::runtime::Builtin;
use super::sink::InstructionSink;

impl<'a, 's, S: InstructionSink> CodeGenerator<'a, 's, S> {
    /// 语句块：先为局部变量分配位置，再依次生成语句
    pub(super) fn emit_block(&mut self, block: &'a Block) -> DecafResult<()> {
        let scope = self
            .model
            .scope_of(block.id)
            .ok_or_else(|| codegen_error("block has no scope"))?;

        for var in &block.decls {
            let location = self.frame.allocate(var.name(), var.ty.ty.size_in_bytes());
            self.model.table.set_location(scope, var.name(), location);
        }

        for stmt in &block.statements {
            self.emit_stmt(stmt)?;
        }
        Ok(())
    }

    pub(super) fn emit_stmt(&mut self, stmt: &'a Stmt) -> DecafResult<()> {
        match stmt {
            Stmt::Expr(expr) => {
                self.emit_expr(expr)?;
            }
            Stmt::Empty => {}
            Stmt::Block(block) => self.emit_block(block)?,
            Stmt::If(if_stmt) => self.emit_if(if_stmt)?,
            Stmt::While(while_stmt) => self.emit_while(while_stmt)?,
            Stmt::For(for_stmt) => self.emit_for(for_stmt)?,
            Stmt::Break(_) => {
                let exit = self.current_loop_exit()?;
                self.sink.gen_goto(&exit);
            }
            Stmt::Return(ret) => match &ret.value {
                Some(value) => {
                    let value = self.emit_value(value)?;
                    self.sink.gen_return(Some(&value));
                }
                None => self.sink.gen_return(None),
            },
            Stmt::Print(print) => self.emit_print(print)?,
        }
        Ok(())
    }

    fn emit_if(&mut self, if_stmt: &'a IfStmt) -> DecafResult<()> {
        let test = self.emit_value(&if_stmt.condition)?;
        let else_label = self.sink.new_label();
        self.sink.gen_ifz(&test, &else_label);

        self.emit_stmt(&if_stmt.then_branch)?;

        match &if_stmt.else_branch {
            Some(else_branch) => {
                let end_label = self.sink.new_label();
                self.sink.gen_goto(&end_label);
                self.sink.gen_label(&else_label);
                self.emit_stmt(else_branch)?;
                self.sink.gen_label(&end_label);
            }
            None => self.sink.gen_label(&else_label),
        }
        Ok(())
    }

    fn emit_while(&mut self, while_stmt: &'a WhileStmt) -> DecafResult<()> {
        let top = self.sink.new_label();
        let exit = self.sink.new_label();

        self.sink.gen_label(&top);
        let test = self.emit_value(&while_stmt.condition)?;
        self.sink.gen_ifz(&test, &exit);

        self.enter_loop(exit.clone());
        self.emit_stmt(&while_stmt.body)?;
        self.exit_loop();

        self.sink.gen_goto(&top);
        self.sink.gen_label(&exit);
        Ok(())
    }

    fn emit_for(&mut self, for_stmt: &'a ForStmt) -> DecafResult<()> {
        if let Some(init) = &for_stmt.init {
            self.emit_expr(init)?;
        }

        let top = self.sink.new_label();
        let exit = self.sink.new_label();

        self.sink.gen_label(&top);
        let test = self.emit_value(&for_stmt.condition)?;
        self.sink.gen_ifz(&test, &exit);

        self.enter_loop(exit.clone());
        self.emit_stmt(&for_stmt.body)?;
        self.exit_loop();

        if let Some(update) = &for_stmt.update {
            self.emit_expr(update)?;
        }
        self.sink.gen_goto(&top);
        self.sink.gen_label(&exit);
        Ok(())
    }

    /// 按实参类型选择打印例程
    fn emit_print(&mut self, print: &'a PrintStmt) -> DecafResult<()> {
        for arg in &print.args {
            let builtin = match self.model.expr_type(arg.id) {
                Some(Type::Int) => Builtin::PrintInt,
                Some(Type::Bool) => Builtin::PrintBool,
                Some(Type::String) => Builtin::PrintString,
                other => {
                    return Err(codegen_error(format!(
                        "cannot print a value of type {}",
                        other.map_or_else(|| "<unknown>".to_string(), |ty| ty.to_string())
                    )));
                }
            };
            let value = self.emit_value(arg)?;
            self.call_builtin(builtin, &[&value])?;
        }
        Ok(())
    }
}
