//! 代码生成上下文和状态管理

use std::collections::HashMap;

use crate::ast::NodeId;
use crate::config::CodegenOptions;
use crate::error::{DecafResult, codegen_error};
use crate::semantic::{SemanticModel, VarRef};
use super::classes::ClassLayouts;
use super::frame::{Direction, FrameAllocator, Location, Segment};
use super::sink::{Constant, InstructionSink};

/// 代码生成器：持有检查后的语义模型，向指令输出器发出请求
pub(crate) struct CodeGenerator<'a, 's, S: InstructionSink> {
    pub(super) model: SemanticModel<'a>,
    pub(super) sink: &'s mut S,
    pub(super) options: CodegenOptions,
    pub(super) layouts: ClassLayouts<'a>,
    /// 全局函数的入口标签
    pub(super) function_labels: HashMap<NodeId, String>,
    pub(super) globals: FrameAllocator,
    /// 当前函数的局部帧
    pub(super) frame: FrameAllocator,
    /// 当前方法的接收者
    pub(super) this_location: Option<Location>,
    /// break 跳转目标
    pub(super) loop_exits: Vec<String>,
}

impl<'a, 's, S: InstructionSink> CodeGenerator<'a, 's, S> {
    pub(crate) fn new(model: SemanticModel<'a>, sink: &'s mut S, options: CodegenOptions) -> Self {
        let globals = FrameAllocator::with_base(Segment::Global, Direction::Up, options.global_base);
        let frame = FrameAllocator::with_base(Segment::Local, Direction::Down, options.local_base);
        Self {
            model,
            sink,
            options,
            layouts: ClassLayouts::new(),
            function_labels: HashMap::new(),
            globals,
            frame,
            this_location: None,
            loop_exits: Vec::new(),
        }
    }

    pub(super) fn word(&self) -> i32 {
        self.options.word_size
    }

    pub(super) fn int_constant(&mut self, value: i32) -> Location {
        self.sink.gen_load_constant(&mut self.frame, Constant::Int(value))
    }

    pub(super) fn this_location(&self) -> DecafResult<Location> {
        self.this_location
            .clone()
            .ok_or_else(|| codegen_error("'this' used outside of a method"))
    }

    /// 变量声明在代码生成阶段分配到的位置
    pub(super) fn variable_location(&self, var: VarRef<'a>) -> DecafResult<Location> {
        self.model
            .table
            .lookup_local(var.scope, var.decl.name())
            .filter(|symbol| symbol.decl.id() == var.decl.id)
            .and_then(|symbol| symbol.location.clone())
            .ok_or_else(|| codegen_error(format!("no frame location for '{}'", var.decl.name())))
    }

    pub(super) fn enter_loop(&mut self, exit_label: String) {
        self.loop_exits.push(exit_label);
    }

    pub(super) fn exit_loop(&mut self) {
        self.loop_exits.pop();
    }

    pub(super) fn current_loop_exit(&self) -> DecafResult<String> {
        self.loop_exits
            .last()
            .cloned()
            .ok_or_else(|| codegen_error("break outside of a loop"))
    }
}
