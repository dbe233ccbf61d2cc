//! 三地址码输出
//!
//! [`TacBuilder`] 把指令请求记录为 [`Instr`] 列表，并以文本形式输出。

use std::fmt;

use super::frame::{FrameAllocator, Location};
use super::sink::{Constant, FuncHandle, InstructionSink, TacOp};

/// 一条三地址码指令；操作数保留帧位置，渲染时带出地址空间与偏移
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    Label(String),
    BeginFunc { frame_size: i32 },
    EndFunc,
    LoadConstant { dst: Location, value: Constant },
    LoadLabel { dst: Location, label: String },
    Assign { dst: Location, src: Location },
    Load { dst: Location, base: Location, offset: i32 },
    Store { base: Location, offset: i32, src: Location },
    Binary { dst: Location, op: TacOp, lhs: Location, rhs: Location },
    Goto(String),
    IfZ { test: Location, label: String },
    Return(Option<Location>),
    PushParam(Location),
    PopParams(i32),
    LCall { dst: Option<Location>, label: String },
    ACall { dst: Option<Location>, target: Location },
    VTable { class_label: String, methods: Vec<String> },
}

fn address(base: &Location, offset: i32) -> String {
    if offset == 0 {
        format!("*({})", base)
    } else {
        format!("*({} + {})", base, offset)
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Label(label) => write!(f, "{}:", label),
            Instr::BeginFunc { frame_size } => write!(f, "\tBeginFunc {} ;", frame_size),
            Instr::EndFunc => write!(f, "\tEndFunc ;"),
            Instr::LoadConstant { dst, value } => write!(f, "\t{} = {} ;", dst, value),
            Instr::LoadLabel { dst, label } => write!(f, "\t{} = {} ;", dst, label),
            Instr::Assign { dst, src } => write!(f, "\t{} = {} ;", dst, src),
            Instr::Load { dst, base, offset } => write!(f, "\t{} = {} ;", dst, address(base, *offset)),
            Instr::Store { base, offset, src } => write!(f, "\t{} = {} ;", address(base, *offset), src),
            Instr::Binary { dst, op, lhs, rhs } => write!(f, "\t{} = {} {} {} ;", dst, lhs, op, rhs),
            Instr::Goto(label) => write!(f, "\tGoto {} ;", label),
            Instr::IfZ { test, label } => write!(f, "\tIfZ {} Goto {} ;", test, label),
            Instr::Return(Some(value)) => write!(f, "\tReturn {} ;", value),
            Instr::Return(None) => write!(f, "\tReturn ;"),
            Instr::PushParam(param) => write!(f, "\tPushParam {} ;", param),
            Instr::PopParams(bytes) => write!(f, "\tPopParams {} ;", bytes),
            Instr::LCall { dst: Some(dst), label } => write!(f, "\t{} = LCall {} ;", dst, label),
            Instr::LCall { dst: None, label } => write!(f, "\tLCall {} ;", label),
            Instr::ACall { dst: Some(dst), target } => write!(f, "\t{} = ACall {} ;", dst, target),
            Instr::ACall { dst: None, target } => write!(f, "\tACall {} ;", target),
            Instr::VTable { class_label, methods } => {
                writeln!(f, "VTable {} =", class_label)?;
                for method in methods {
                    writeln!(f, "\t{},", method)?;
                }
                write!(f, ";")
            }
        }
    }
}

/// 记录三地址码的指令输出器
#[derive(Debug)]
pub struct TacBuilder {
    instrs: Vec<Instr>,
    word_size: i32,
    temp_count: usize,
    label_count: usize,
}

impl TacBuilder {
    pub fn new() -> Self {
        Self::with_word_size(4)
    }

    pub fn with_word_size(word_size: i32) -> Self {
        Self {
            instrs: Vec::new(),
            word_size,
            temp_count: 0,
            label_count: 0,
        }
    }

    pub fn instructions(&self) -> &[Instr] {
        &self.instrs
    }

    /// 查找某个类标签登记的虚表
    pub fn vtable(&self, class_label: &str) -> Option<&[String]> {
        self.instrs.iter().find_map(|instr| match instr {
            Instr::VTable { class_label: label, methods } if label == class_label => Some(methods.as_slice()),
            _ => None,
        })
    }

    fn push(&mut self, instr: Instr) {
        self.instrs.push(instr);
    }

    fn result(&mut self, frame: &mut FrameAllocator, has_return: bool) -> Option<Location> {
        if has_return {
            Some(self.gen_temp(frame))
        } else {
            None
        }
    }
}

impl Default for TacBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TacBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in &self.instrs {
            writeln!(f, "{}", instr)?;
        }
        Ok(())
    }
}

impl InstructionSink for TacBuilder {
    fn new_class_label(&mut self, class_name: &str) -> String {
        class_name.to_string()
    }

    fn new_function_label(&mut self, name: &str) -> String {
        if name == "main" {
            name.to_string()
        } else {
            format!("_{}", name)
        }
    }

    fn new_label(&mut self) -> String {
        let label = format!("_L{}", self.label_count);
        self.label_count += 1;
        label
    }

    fn gen_label(&mut self, label: &str) {
        self.push(Instr::Label(label.to_string()));
    }

    fn gen_begin_func(&mut self) -> FuncHandle {
        self.push(Instr::BeginFunc { frame_size: 0 });
        FuncHandle(self.instrs.len() - 1)
    }

    fn set_frame_size(&mut self, func: FuncHandle, size: i32) {
        if let Some(Instr::BeginFunc { frame_size }) = self.instrs.get_mut(func.0) {
            *frame_size = size;
        }
    }

    fn gen_end_func(&mut self) {
        self.push(Instr::EndFunc);
    }

    fn gen_temp(&mut self, frame: &mut FrameAllocator) -> Location {
        let name = format!("_tmp{}", self.temp_count);
        self.temp_count += 1;
        frame.allocate(&name, self.word_size)
    }

    fn gen_load_constant(&mut self, frame: &mut FrameAllocator, value: Constant) -> Location {
        let dst = self.gen_temp(frame);
        self.push(Instr::LoadConstant { dst: dst.clone(), value });
        dst
    }

    fn gen_load_label(&mut self, frame: &mut FrameAllocator, label: &str) -> Location {
        let dst = self.gen_temp(frame);
        self.push(Instr::LoadLabel {
            dst: dst.clone(),
            label: label.to_string(),
        });
        dst
    }

    fn gen_assign(&mut self, dst: &Location, src: &Location) {
        self.push(Instr::Assign {
            dst: dst.clone(),
            src: src.clone(),
        });
    }

    fn gen_load(&mut self, frame: &mut FrameAllocator, base: &Location, offset: i32) -> Location {
        let dst = self.gen_temp(frame);
        self.push(Instr::Load {
            dst: dst.clone(),
            base: base.clone(),
            offset,
        });
        dst
    }

    fn gen_store(&mut self, base: &Location, value: &Location, offset: i32) {
        self.push(Instr::Store {
            base: base.clone(),
            offset,
            src: value.clone(),
        });
    }

    fn gen_binary(&mut self, frame: &mut FrameAllocator, op: TacOp, lhs: &Location, rhs: &Location) -> Location {
        let dst = self.gen_temp(frame);
        self.push(Instr::Binary {
            dst: dst.clone(),
            op,
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        });
        dst
    }

    fn gen_goto(&mut self, label: &str) {
        self.push(Instr::Goto(label.to_string()));
    }

    fn gen_ifz(&mut self, test: &Location, label: &str) {
        self.push(Instr::IfZ {
            test: test.clone(),
            label: label.to_string(),
        });
    }

    fn gen_return(&mut self, value: Option<&Location>) {
        self.push(Instr::Return(value.cloned()));
    }

    fn gen_push_param(&mut self, param: &Location) {
        self.push(Instr::PushParam(param.clone()));
    }

    fn gen_pop_params(&mut self, bytes: i32) {
        if bytes > 0 {
            self.push(Instr::PopParams(bytes));
        }
    }

    fn gen_lcall(&mut self, frame: &mut FrameAllocator, label: &str, has_return: bool) -> Option<Location> {
        let dst = self.result(frame, has_return);
        self.push(Instr::LCall {
            dst: dst.clone(),
            label: label.to_string(),
        });
        dst
    }

    fn gen_acall(&mut self, frame: &mut FrameAllocator, target: &Location, has_return: bool) -> Option<Location> {
        let dst = self.result(frame, has_return);
        self.push(Instr::ACall {
            dst: dst.clone(),
            target: target.clone(),
        });
        dst
    }

    fn gen_vtable(&mut self, class_label: &str, method_labels: &[String]) {
        self.push(Instr::VTable {
            class_label: class_label.to_string(),
            methods: method_labels.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::frame::{Direction, Segment};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_begin_func_is_patched_with_frame_size() {
        let mut tac = TacBuilder::new();
        let mut frame = FrameAllocator::new(Segment::Local, Direction::Down);

        tac.gen_label("_f");
        let handle = tac.gen_begin_func();
        let five = tac.gen_load_constant(&mut frame, Constant::Int(5));
        tac.gen_return(Some(&five));
        tac.set_frame_size(handle, frame.size());
        tac.gen_end_func();

        assert_eq!(
            tac.to_string(),
            "_f:\n\tBeginFunc 4 ;\n\t_tmp0(fp-8) = 5 ;\n\tReturn _tmp0(fp-8) ;\n\tEndFunc ;\n"
        );
        assert_eq!(five.offset, -8);
    }

    #[test]
    fn test_memory_and_calls_render() {
        let mut tac = TacBuilder::new();
        let mut frame = FrameAllocator::new(Segment::Local, Direction::Down);
        let this = Location::new("this", Segment::Param, 4);

        let vtable = tac.gen_load(&mut frame, &this, 0);
        let method = tac.gen_load(&mut frame, &vtable, 8);
        tac.gen_push_param(&this);
        let result = tac.gen_acall(&mut frame, &method, true);
        tac.gen_pop_params(4);
        tac.gen_store(&this, &result.unwrap(), 4);
        tac.gen_vtable("A", &["A.f".to_string(), "A.g".to_string()]);

        assert_eq!(
            tac.to_string(),
            "\t_tmp0(fp-8) = *(this(fp+4)) ;\n\
             \t_tmp1(fp-12) = *(_tmp0(fp-8) + 8) ;\n\
             \tPushParam this(fp+4) ;\n\
             \t_tmp2(fp-16) = ACall _tmp1(fp-12) ;\n\
             \tPopParams 4 ;\n\
             \t*(this(fp+4) + 4) = _tmp2(fp-16) ;\n\
             VTable A =\n\tA.f,\n\tA.g,\n;\n"
        );
        assert_eq!(tac.vtable("A"), Some(&["A.f".to_string(), "A.g".to_string()][..]));
    }

    #[test]
    fn test_boolean_constants_load_as_words() {
        let mut tac = TacBuilder::new();
        let mut frame = FrameAllocator::new(Segment::Local, Direction::Down);
        let yes = tac.gen_load_constant(&mut frame, Constant::Bool(true));
        tac.gen_load_constant(&mut frame, Constant::Bool(false));

        assert_eq!(
            tac.instructions()[0],
            Instr::LoadConstant {
                dst: yes,
                value: Constant::Bool(true),
            }
        );
        assert_eq!(tac.to_string(), "\t_tmp0(fp-8) = 1 ;\n\t_tmp1(fp-12) = 0 ;\n");
    }

    #[test]
    fn test_labels() {
        let mut tac = TacBuilder::new();
        assert_eq!(tac.new_function_label("main"), "main");
        assert_eq!(tac.new_function_label("fib"), "_fib");
        assert_eq!(tac.new_label(), "_L0");
        assert_eq!(tac.new_label(), "_L1");
        assert_eq!(tac.new_class_label("Shape"), "Shape");
    }
}
