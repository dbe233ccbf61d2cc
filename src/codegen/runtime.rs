//! 运行时支持函数调用

use crate::error::{DecafResult, codegen_error};
use super::context::CodeGenerator;
use super::frame::Location;
use super::sink::{Constant, InstructionSink};

/// 运行时库提供的例程
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Alloc,
    ReadLine,
    ReadInteger,
    StringEqual,
    PrintInt,
    PrintString,
    PrintBool,
    Halt,
}

impl Builtin {
    pub fn label(self) -> &'static str {
        match self {
            Builtin::Alloc => "_Alloc",
            Builtin::ReadLine => "_ReadLine",
            Builtin::ReadInteger => "_ReadInteger",
            Builtin::StringEqual => "_StringEqual",
            Builtin::PrintInt => "_PrintInt",
            Builtin::PrintString => "_PrintString",
            Builtin::PrintBool => "_PrintBool",
            Builtin::Halt => "_Halt",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Builtin::ReadLine | Builtin::ReadInteger | Builtin::Halt => 0,
            Builtin::StringEqual => 2,
            Builtin::Alloc | Builtin::PrintInt | Builtin::PrintString | Builtin::PrintBool => 1,
        }
    }

    pub fn has_return(self) -> bool {
        matches!(
            self,
            Builtin::Alloc | Builtin::ReadLine | Builtin::ReadInteger | Builtin::StringEqual
        )
    }
}

pub(super) const ARRAY_SIZE_ERROR: &str = "Decaf runtime error: Array size is <= 0\\n";
pub(super) const SUBSCRIPT_ERROR: &str = "Decaf runtime error: Array subscript out of bounds\\n";

impl<'a, 's, S: InstructionSink> CodeGenerator<'a, 's, S> {
    /// 调用运行时例程；参数按从右到左的顺序压栈
    pub(super) fn call_builtin(&mut self, builtin: Builtin, args: &[&Location]) -> DecafResult<Option<Location>> {
        if args.len() != builtin.arity() {
            return Err(codegen_error(format!(
                "{} expects {} argument(s), got {}",
                builtin.label(),
                builtin.arity(),
                args.len()
            )));
        }

        for arg in args.iter().rev() {
            self.sink.gen_push_param(arg);
        }
        let result = self.sink.gen_lcall(&mut self.frame, builtin.label(), builtin.has_return());
        self.sink.gen_pop_params(args.len() as i32 * self.word());
        Ok(result)
    }

    /// 调用有返回值的运行时例程
    pub(super) fn call_builtin_value(&mut self, builtin: Builtin, args: &[&Location]) -> DecafResult<Location> {
        self.call_builtin(builtin, args)?
            .ok_or_else(|| codegen_error(format!("{} has no result", builtin.label())))
    }

    /// 打印运行时错误信息后停机
    pub(super) fn runtime_error(&mut self, message: &str) -> DecafResult<()> {
        let text = self
            .sink
            .gen_load_constant(&mut self.frame, Constant::Str(message.to_string()));
        self.call_builtin(Builtin::PrintString, &[&text])?;
        self.call_builtin(Builtin::Halt, &[])?;
        Ok(())
    }

    /// `failed` 非零时打印错误并停机
    pub(super) fn halt_if(&mut self, failed: &Location, message: &str) -> DecafResult<()> {
        let ok = self.sink.new_label();
        self.sink.gen_ifz(failed, &ok);
        self.runtime_error(message)?;
        self.sink.gen_label(&ok);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_signatures() {
        assert_eq!(Builtin::Alloc.label(), "_Alloc");
        assert_eq!(Builtin::StringEqual.arity(), 2);
        assert!(Builtin::ReadLine.has_return());
        assert!(!Builtin::PrintBool.has_return());
        assert!(!Builtin::Halt.has_return());
    }
}
