//! 代码生成
//!
//! 只接受通过语义检查的程序。先为全局变量、全局函数和所有类计算布局，
//! 再按程序顺序发出函数体与虚表。
//!
//! 生成器本身不对外公开，唯一入口是 [`CheckedProgram::emit`](crate::semantic::CheckedProgram::emit)：
//!
//! ```compile_fail
//! use decafc::codegen::CodeGenerator;
//! ```

pub mod classes;
pub mod frame;
pub mod sink;
pub mod tac;

mod context;
mod expressions;
mod generator;
mod runtime;
mod statements;

pub use classes::{ClassLayout, ClassLayouts, FieldSlot, MethodSlot, SlotDecision, merge_method};
pub(crate) use context::CodeGenerator;
pub use frame::{Direction, FrameAllocator, Location, Segment};
pub use runtime::Builtin;
pub use sink::{Constant, FuncHandle, InstructionSink, TacOp};
pub use tac::{Instr, TacBuilder};
