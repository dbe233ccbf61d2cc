//! 指令输出接口
//!
//! 代码生成器只通过这个 trait 发出结构化的请求，产物的具体格式由实现者决定。

use std::fmt;

use super::frame::{FrameAllocator, Location};

/// 可装入帧位置的常量
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    Int(i32),
    Bool(bool),
    Str(String),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(value) => write!(f, "{}", value),
            Constant::Bool(value) => write!(f, "{}", i32::from(*value)),
            Constant::Str(value) => write!(f, "\"{}\"", value),
        }
    }
}

/// 三地址码支持的二元运算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TacOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Less,
    And,
    Or,
}

impl fmt::Display for TacOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            TacOp::Add => "+",
            TacOp::Sub => "-",
            TacOp::Mul => "*",
            TacOp::Div => "/",
            TacOp::Mod => "%",
            TacOp::Eq => "==",
            TacOp::Less => "<",
            TacOp::And => "&&",
            TacOp::Or => "||",
        };
        write!(f, "{}", symbol)
    }
}

/// `BeginFunc` 标记的句柄，用于事后回填帧大小
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuncHandle(pub usize);

pub trait InstructionSink {
    /// 由类名生成类标签
    fn new_class_label(&mut self, class_name: &str) -> String;
    /// 由函数名生成入口标签
    fn new_function_label(&mut self, name: &str) -> String;
    /// 生成控制流标签
    fn new_label(&mut self) -> String;

    fn gen_label(&mut self, label: &str);
    fn gen_begin_func(&mut self) -> FuncHandle;
    fn set_frame_size(&mut self, func: FuncHandle, size: i32);
    fn gen_end_func(&mut self);

    /// 在局部帧中分配一个临时变量
    fn gen_temp(&mut self, frame: &mut FrameAllocator) -> Location;
    fn gen_load_constant(&mut self, frame: &mut FrameAllocator, value: Constant) -> Location;
    fn gen_load_label(&mut self, frame: &mut FrameAllocator, label: &str) -> Location;
    fn gen_assign(&mut self, dst: &Location, src: &Location);
    fn gen_load(&mut self, frame: &mut FrameAllocator, base: &Location, offset: i32) -> Location;
    fn gen_store(&mut self, base: &Location, value: &Location, offset: i32);
    fn gen_binary(&mut self, frame: &mut FrameAllocator, op: TacOp, lhs: &Location, rhs: &Location) -> Location;

    fn gen_goto(&mut self, label: &str);
    fn gen_ifz(&mut self, test: &Location, label: &str);
    fn gen_return(&mut self, value: Option<&Location>);

    fn gen_push_param(&mut self, param: &Location);
    fn gen_pop_params(&mut self, bytes: i32);
    /// 直接调用标签
    fn gen_lcall(&mut self, frame: &mut FrameAllocator, label: &str, has_return: bool) -> Option<Location>;
    /// 通过地址间接调用
    fn gen_acall(&mut self, frame: &mut FrameAllocator, target: &Location, has_return: bool) -> Option<Location>;

    /// 登记类的虚表，方法标签按槽位顺序排列
    fn gen_vtable(&mut self, class_label: &str, method_labels: &[String]);
}
