//! 表达式代码生成

use crate::ast::*;
use crate::error::{DecafResult, codegen_error};
use crate::semantic::CallTarget;
use crate::types::Type;
use super::context::CodeGenerator;
use super::frame::{Location, Segment};
use super::runtime::{ARRAY_SIZE_ERROR, Builtin, SUBSCRIPT_ERROR};
use super::sink::{Constant, InstructionSink, TacOp};

/// 可赋值的位置
#[derive(Debug, Clone)]
pub(super) enum LValue {
    /// 变量本身所在的帧位置
    Direct(Location),
    /// 内存中 `base + offset` 处的字
    Memory { base: Location, offset: i32 },
}

impl<'a, 's, S: InstructionSink> CodeGenerator<'a, 's, S> {
    /// 生成表达式；无返回值的调用得到 `None`
    pub(super) fn emit_expr(&mut self, expr: &'a Expr) -> DecafResult<Option<Location>> {
        let value = match &expr.kind {
            ExprKind::Literal(literal) => self.emit_literal(literal)?,
            ExprKind::This => self.this_location()?,
            ExprKind::Binary(binary) => self.emit_binary(binary)?,
            ExprKind::Unary(unary) => {
                let operand = self.emit_value(&unary.operand)?;
                let zero = self.int_constant(0);
                match unary.op {
                    UnaryOp::Neg => self.sink.gen_binary(&mut self.frame, TacOp::Sub, &zero, &operand),
                    UnaryOp::Not => self.sink.gen_binary(&mut self.frame, TacOp::Eq, &operand, &zero),
                }
            }
            ExprKind::Postfix(postfix) => {
                let target = self.lvalue(&postfix.operand)?;
                let current = self.load(&target);
                let old = self.sink.gen_temp(&mut self.frame);
                self.sink.gen_assign(&old, &current);

                let one = self.int_constant(1);
                let op = match postfix.op {
                    PostfixOp::Inc => TacOp::Add,
                    PostfixOp::Dec => TacOp::Sub,
                };
                let updated = self.sink.gen_binary(&mut self.frame, op, &current, &one);
                self.store(&target, &updated);
                old
            }
            ExprKind::Assignment(assign) => {
                let target = self.lvalue(&assign.target)?;
                let value = self.emit_value(&assign.value)?;
                self.store(&target, &value);
                value
            }
            ExprKind::FieldAccess(_) | ExprKind::ArrayAccess(_) => {
                let target = self.lvalue(expr)?;
                self.load(&target)
            }
            ExprKind::Call(call) => return self.emit_call(expr, call),
            ExprKind::New(class) => self.emit_new(class)?,
            ExprKind::NewArray(new_array) => self.emit_new_array(new_array)?,
            ExprKind::ReadInteger => self.call_builtin_value(Builtin::ReadInteger, &[])?,
            ExprKind::ReadLine => self.call_builtin_value(Builtin::ReadLine, &[])?,
        };
        Ok(Some(value))
    }

    /// 生成必须产生值的表达式
    pub(super) fn emit_value(&mut self, expr: &'a Expr) -> DecafResult<Location> {
        self.emit_expr(expr)?
            .ok_or_else(|| codegen_error(format!("expression at {} has no value", expr.loc)))
    }

    fn emit_literal(&mut self, literal: &LiteralValue) -> DecafResult<Location> {
        let constant = match literal {
            LiteralValue::Int(value) => Constant::Int(*value),
            LiteralValue::Bool(value) => Constant::Bool(*value),
            LiteralValue::String(value) => Constant::Str(value.clone()),
            LiteralValue::Null => Constant::Int(0),
            LiteralValue::Double(value) => {
                return Err(codegen_error(format!("double constant {} cannot be emitted", value)));
            }
        };
        Ok(self.sink.gen_load_constant(&mut self.frame, constant))
    }

    /// 关系运算只用 `<` 与 `==` 组合；字符串相等交给运行时
    fn emit_binary(&mut self, binary: &'a BinaryExpr) -> DecafResult<Location> {
        let lhs = self.emit_value(&binary.left)?;
        let rhs = self.emit_value(&binary.right)?;

        let result = match binary.op {
            BinaryOp::Add => self.sink.gen_binary(&mut self.frame, TacOp::Add, &lhs, &rhs),
            BinaryOp::Sub => self.sink.gen_binary(&mut self.frame, TacOp::Sub, &lhs, &rhs),
            BinaryOp::Mul => self.sink.gen_binary(&mut self.frame, TacOp::Mul, &lhs, &rhs),
            BinaryOp::Div => self.sink.gen_binary(&mut self.frame, TacOp::Div, &lhs, &rhs),
            BinaryOp::Mod => self.sink.gen_binary(&mut self.frame, TacOp::Mod, &lhs, &rhs),
            BinaryOp::And => self.sink.gen_binary(&mut self.frame, TacOp::And, &lhs, &rhs),
            BinaryOp::Or => self.sink.gen_binary(&mut self.frame, TacOp::Or, &lhs, &rhs),
            BinaryOp::Lt => self.sink.gen_binary(&mut self.frame, TacOp::Less, &lhs, &rhs),
            BinaryOp::Gt => self.sink.gen_binary(&mut self.frame, TacOp::Less, &rhs, &lhs),
            BinaryOp::Le => self.less_or_equal(&lhs, &rhs),
            BinaryOp::Ge => self.less_or_equal(&rhs, &lhs),
            BinaryOp::Eq => self.equal(binary, &lhs, &rhs)?,
            BinaryOp::Ne => {
                let equal = self.equal(binary, &lhs, &rhs)?;
                let zero = self.int_constant(0);
                self.sink.gen_binary(&mut self.frame, TacOp::Eq, &equal, &zero)
            }
        };
        Ok(result)
    }

    fn less_or_equal(&mut self, lhs: &Location, rhs: &Location) -> Location {
        let less = self.sink.gen_binary(&mut self.frame, TacOp::Less, lhs, rhs);
        let equal = self.sink.gen_binary(&mut self.frame, TacOp::Eq, lhs, rhs);
        self.sink.gen_binary(&mut self.frame, TacOp::Or, &less, &equal)
    }

    fn equal(&mut self, binary: &BinaryExpr, lhs: &Location, rhs: &Location) -> DecafResult<Location> {
        if self.model.expr_type(binary.left.id) == Some(&Type::String) {
            return self.call_builtin_value(Builtin::StringEqual, &[lhs, rhs]);
        }
        Ok(self.sink.gen_binary(&mut self.frame, TacOp::Eq, lhs, rhs))
    }

    /// 变量、字段或数组元素的位置
    pub(super) fn lvalue(&mut self, expr: &'a Expr) -> DecafResult<LValue> {
        match &expr.kind {
            ExprKind::FieldAccess(access) => {
                let var = self
                    .model
                    .var_ref(expr.id)
                    .ok_or_else(|| codegen_error(format!("unresolved name '{}'", access.field.name)))?;
                let location = self.variable_location(var)?;
                if location.segment != Segment::Field {
                    return Ok(LValue::Direct(location));
                }

                let base = match &access.base {
                    Some(base) => self.emit_value(base)?,
                    None => self.this_location()?,
                };
                Ok(LValue::Memory {
                    base,
                    offset: location.offset,
                })
            }
            ExprKind::ArrayAccess(access) => {
                let base = self.emit_value(&access.base)?;
                let index = self.emit_value(&access.subscript)?;
                if self.options.bounds_checks {
                    self.check_bounds(&base, &index)?;
                }

                let word = self.int_constant(self.word());
                let scaled = self.sink.gen_binary(&mut self.frame, TacOp::Mul, &index, &word);
                let address = self.sink.gen_binary(&mut self.frame, TacOp::Add, &base, &scaled);
                Ok(LValue::Memory {
                    base: address,
                    offset: 0,
                })
            }
            _ => Err(codegen_error(format!("expression at {} is not assignable", expr.loc))),
        }
    }

    pub(super) fn load(&mut self, target: &LValue) -> Location {
        match target {
            LValue::Direct(location) => location.clone(),
            LValue::Memory { base, offset } => self.sink.gen_load(&mut self.frame, base, *offset),
        }
    }

    pub(super) fn store(&mut self, target: &LValue, value: &Location) {
        match target {
            LValue::Direct(location) => self.sink.gen_assign(location, value),
            LValue::Memory { base, offset } => self.sink.gen_store(base, value, *offset),
        }
    }

    /// 下标必须落在 `[0, length)` 内
    fn check_bounds(&mut self, array: &Location, index: &Location) -> DecafResult<()> {
        let zero = self.int_constant(0);
        let negative = self.sink.gen_binary(&mut self.frame, TacOp::Less, index, &zero);
        let length = self.sink.gen_load(&mut self.frame, array, -self.options.word_size);
        let below = self.sink.gen_binary(&mut self.frame, TacOp::Less, index, &length);
        let past_end = self.sink.gen_binary(&mut self.frame, TacOp::Eq, &below, &zero);
        let failed = self.sink.gen_binary(&mut self.frame, TacOp::Or, &negative, &past_end);
        self.halt_if(&failed, SUBSCRIPT_ERROR)
    }

    /// 分配对象并写入虚表地址
    fn emit_new(&mut self, class: &Identifier) -> DecafResult<Location> {
        let (label, size) = match self.layouts.by_name(&class.name) {
            Some(layout) => (layout.label.clone(), layout.instance_size()),
            None => return Err(codegen_error(format!("no layout for class '{}'", class.name))),
        };

        let size = self.int_constant(size);
        let object = self.call_builtin_value(Builtin::Alloc, &[&size])?;
        let vtable = self.sink.gen_load_label(&mut self.frame, &label);
        self.sink.gen_store(&object, &vtable, 0);
        Ok(object)
    }

    /// 数组前一个字存放长度，结果指向第一个元素
    fn emit_new_array(&mut self, new_array: &'a NewArrayExpr) -> DecafResult<Location> {
        let size = self.emit_value(&new_array.size)?;
        let one = self.int_constant(1);
        let too_small = self.sink.gen_binary(&mut self.frame, TacOp::Less, &size, &one);
        self.halt_if(&too_small, ARRAY_SIZE_ERROR)?;

        let slots = self.sink.gen_binary(&mut self.frame, TacOp::Add, &size, &one);
        let word = self.int_constant(self.word());
        let bytes = self.sink.gen_binary(&mut self.frame, TacOp::Mul, &slots, &word);
        let memory = self.call_builtin_value(Builtin::Alloc, &[&bytes])?;
        self.sink.gen_store(&memory, &size, 0);
        Ok(self.sink.gen_binary(&mut self.frame, TacOp::Add, &memory, &word))
    }

    fn emit_call(&mut self, expr: &'a Expr, call: &'a CallExpr) -> DecafResult<Option<Location>> {
        let target = self
            .model
            .call_target(expr.id)
            .ok_or_else(|| codegen_error(format!("unresolved call to '{}'", call.field.name)))?;
        let word = self.word();

        match target {
            CallTarget::ArrayLength => {
                let base = match &call.base {
                    Some(base) => self.emit_value(base)?,
                    None => return Err(codegen_error("length() needs an array")),
                };
                Ok(Some(self.sink.gen_load(&mut self.frame, &base, -word)))
            }
            CallTarget::Function(function) => {
                let label = self
                    .function_labels
                    .get(&function.id)
                    .cloned()
                    .ok_or_else(|| codegen_error(format!("no label for function '{}'", function.name())))?;
                let args = self.emit_args(&call.args)?;
                for arg in args.iter().rev() {
                    self.sink.gen_push_param(arg);
                }
                let result = self.sink.gen_lcall(&mut self.frame, &label, has_return(function));
                self.sink.gen_pop_params(args.len() as i32 * word);
                Ok(result)
            }
            CallTarget::Method { class, method } => {
                let receiver = match &call.base {
                    Some(base) => self.emit_value(base)?,
                    None => self.this_location()?,
                };
                let slot = self
                    .layouts
                    .get(class.id)
                    .and_then(|layout| layout.slot_index(method.name()))
                    .ok_or_else(|| codegen_error(format!("no dispatch slot for '{}.{}'", class.name(), method.name())))?;

                let args = self.emit_args(&call.args)?;
                for arg in args.iter().rev() {
                    self.sink.gen_push_param(arg);
                }
                self.sink.gen_push_param(&receiver);

                let vtable = self.sink.gen_load(&mut self.frame, &receiver, 0);
                let entry = self.sink.gen_load(&mut self.frame, &vtable, slot as i32 * word);
                let result = self.sink.gen_acall(&mut self.frame, &entry, has_return(method));
                self.sink.gen_pop_params((args.len() as i32 + 1) * word);
                Ok(result)
            }
            CallTarget::InterfaceMethod { interface, method } => Err(codegen_error(format!(
                "cannot dispatch '{}' through interface '{}'",
                method.name(),
                interface.name()
            ))),
        }
    }

    fn emit_args(&mut self, args: &'a [Expr]) -> DecafResult<Vec<Location>> {
        args.iter().map(|arg| self.emit_value(arg)).collect()
    }
}

fn has_return(function: &FnDecl) -> bool {
    function.return_type.ty != Type::Void
}
