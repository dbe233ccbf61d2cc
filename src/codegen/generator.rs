//! 代码生成主流程
//!
//! 第一阶段分配全局变量、函数标签和类布局；第二阶段按程序顺序发出函数体与虚表。

use crate::ast::*;
use crate::error::{DecafResult, codegen_error};
use super::classes::{ClassLayout, ClassLayouts, FieldSlot, SlotDecision, merge_method};
use super::context::CodeGenerator;
use super::frame::{Direction, FrameAllocator, Segment};
use super::sink::InstructionSink;

impl<'a, 's, S: InstructionSink> CodeGenerator<'a, 's, S> {
    /// 主入口：发出整个程序，返回各类的最终布局
    #[tracing::instrument(level = "debug", skip_all)]
    pub(crate) fn generate(&mut self, program: &'a Program) -> DecafResult<ClassLayouts<'a>> {
        let global = self.model.table.global();

        for decl in &program.decls {
            match decl {
                Decl::Var(var) => {
                    let location = self.globals.allocate(var.name(), var.ty.ty.size_in_bytes());
                    self.model.table.set_location(global, var.name(), location);
                }
                Decl::Fn(function) => {
                    let label = self.sink.new_function_label(function.name());
                    self.function_labels.insert(function.id, label);
                }
                Decl::Class(class) => self.layout_class(class)?,
                Decl::Interface(_) => {}
            }
        }

        for decl in &program.decls {
            match decl {
                Decl::Fn(function) => {
                    let label = self
                        .function_labels
                        .get(&function.id)
                        .cloned()
                        .ok_or_else(|| codegen_error(format!("no label for function '{}'", function.name())))?;
                    self.emit_function(function, &label, false)?;
                }
                Decl::Class(class) => self.emit_class(class)?,
                Decl::Var(_) | Decl::Interface(_) => {}
            }
        }

        Ok(std::mem::take(&mut self.layouts))
    }

    /// 计算类布局；父类先于子类，每个类只计算一次
    fn layout_class(&mut self, class: &'a ClassDecl) -> DecafResult<()> {
        if self.layouts.contains(class.id) {
            return Ok(());
        }

        let parent = self.model.class_info(class.id).and_then(|info| info.parent);
        if let Some(parent) = parent {
            self.layout_class(parent)?;
        }

        let label = self.sink.new_class_label(class.name());
        let mut layout = match parent {
            Some(parent) => {
                let parent_layout = self
                    .layouts
                    .get(parent.id)
                    .ok_or_else(|| codegen_error(format!("no layout for class '{}'", parent.name())))?;
                ClassLayout::inherit(label, parent_layout)
            }
            None => ClassLayout::new(
                label,
                FrameAllocator::with_base(Segment::Field, Direction::Up, self.options.field_base),
            ),
        };

        let class_scope = self
            .model
            .scope_of(class.id)
            .ok_or_else(|| codegen_error(format!("no scope for class '{}'", class.name())))?;

        for field in class.fields() {
            let location = layout.falloc.allocate(field.name(), field.ty.ty.size_in_bytes());
            self.model.table.set_location(class_scope, field.name(), location.clone());
            layout.fields.push(FieldSlot { decl: field, location });
        }

        for method in class.methods() {
            if let SlotDecision::Rejected(slot) = merge_method(&mut layout.vtable, &layout.label, method) {
                tracing::warn!(
                    class = class.name(),
                    method = method.name(),
                    slot,
                    kept = %layout.vtable[slot].label,
                    "override signature differs, keeping inherited slot"
                );
            }
        }

        tracing::debug!(
            class = class.name(),
            slots = layout.vtable.len(),
            size = layout.instance_size(),
            "laid out class"
        );
        self.layouts.insert(class.id, class.name(), layout);
        Ok(())
    }

    fn emit_class(&mut self, class: &'a ClassDecl) -> DecafResult<()> {
        let layout = self
            .layouts
            .get(class.id)
            .ok_or_else(|| codegen_error(format!("no layout for class '{}'", class.name())))?;
        let label = layout.label.clone();
        let method_labels = layout.method_labels();
        let methods = class
            .methods()
            .map(|method| match layout.method_label(method.id) {
                Some(method_label) => Ok((method, method_label.to_string())),
                None => Err(codegen_error(format!("no dispatch slot for '{}.{}'", class.name(), method.name()))),
            })
            .collect::<DecafResult<Vec<_>>>()?;

        for (method, method_label) in methods {
            self.emit_function(method, &method_label, true)?;
        }

        self.sink.gen_vtable(&label, &method_labels);
        Ok(())
    }

    /// 发出一个函数或方法；方法的第一个参数是接收者
    fn emit_function(&mut self, function: &'a FnDecl, label: &str, is_method: bool) -> DecafResult<()> {
        let scope = self
            .model
            .scope_of(function.id)
            .ok_or_else(|| codegen_error(format!("no scope for function '{}'", function.name())))?;

        self.sink.gen_label(label);

        let mut params = FrameAllocator::with_base(Segment::Param, Direction::Up, self.options.param_base);
        self.this_location = if is_method {
            Some(params.allocate("this", self.word()))
        } else {
            None
        };
        for formal in &function.formals {
            let location = params.allocate(formal.name(), formal.ty.ty.size_in_bytes());
            self.model.table.set_location(scope, formal.name(), location);
        }

        self.frame = FrameAllocator::with_base(Segment::Local, Direction::Down, self.options.local_base);
        let handle = self.sink.gen_begin_func();
        if let Some(body) = &function.body {
            self.emit_block(body)?;
        }
        self.sink.set_frame_size(handle, self.frame.size());
        self.sink.gen_end_func();

        self.this_location = None;
        self.loop_exits.clear();
        Ok(())
    }
}
