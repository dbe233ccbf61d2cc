//! 代码生成配置

/// 代码生成选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    /// 字长（字节）
    pub word_size: i32,
    /// 第一个参数相对帧指针的偏移
    pub param_base: i32,
    /// 第一个局部变量相对帧指针的偏移
    pub local_base: i32,
    /// 第一个字段相对对象起始的偏移，偏移 0 存放虚表指针
    pub field_base: i32,
    /// 第一个全局变量的偏移
    pub global_base: i32,
    /// 是否生成数组越界检查
    pub bounds_checks: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            word_size: 4,
            param_base: 4,
            local_base: -8,
            field_base: 4,
            global_base: 0,
            bounds_checks: true,
        }
    }
}

impl CodegenOptions {
    pub fn without_bounds_checks(mut self) -> Self {
        self.bounds_checks = false;
        self
    }
}
