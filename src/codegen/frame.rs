//! 帧位置分配

use std::fmt;

use crate::config::CodegenOptions;

/// 地址空间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    /// 参数区，相对帧指针向调用者方向增长
    Param,
    /// 局部变量区，相对帧指针向远离调用者方向增长
    Local,
    /// 相对对象起始地址的字段区
    Field,
    /// 全局区
    Global,
}

impl Segment {
    /// 各地址空间的默认起始偏移
    pub fn default_base(self, options: &CodegenOptions) -> i32 {
        match self {
            Segment::Param => options.param_base,
            Segment::Local => options.local_base,
            Segment::Field => options.field_base,
            Segment::Global => options.global_base,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Param | Segment::Local => write!(f, "fp"),
            Segment::Field => write!(f, "this"),
            Segment::Global => write!(f, "gp"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// 帧位置：名字、地址空间与偏移
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub name: String,
    pub segment: Segment,
    pub offset: i32,
}

impl Location {
    pub fn new(name: impl Into<String>, segment: Segment, offset: i32) -> Self {
        Self {
            name: name.into(),
            segment,
            offset,
        }
    }
}

/// 以 `名字(基址±偏移)` 形式输出，同名变量的不同位置可以区分
impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}{:+})", self.name, self.segment, self.offset)
    }
}

/// 单调分配器：返回当前游标后按方向前进，从不复用偏移
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameAllocator {
    segment: Segment,
    direction: Direction,
    base: i32,
    cursor: i32,
}

impl FrameAllocator {
    pub fn new(segment: Segment, direction: Direction) -> Self {
        Self::with_base(segment, direction, segment.default_base(&CodegenOptions::default()))
    }

    pub fn with_base(segment: Segment, direction: Direction, base: i32) -> Self {
        Self {
            segment,
            direction,
            base,
            cursor: base,
        }
    }

    pub fn allocate(&mut self, name: &str, size: i32) -> Location {
        let location = Location::new(name, self.segment, self.cursor);
        match self.direction {
            Direction::Up => self.cursor += size,
            Direction::Down => self.cursor -= size,
        }
        tracing::trace!(name, segment = ?self.segment, offset = location.offset, "allocated frame slot");
        location
    }

    /// 已分配的字节数
    pub fn size(&self) -> i32 {
        (self.cursor - self.base).abs()
    }

    pub fn cursor(&self) -> i32 {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_param_offsets_grow_up() {
        let mut params = FrameAllocator::new(Segment::Param, Direction::Up);
        let offsets: Vec<i32> = (0..4).map(|i| params.allocate(&format!("p{}", i), 4).offset).collect();
        assert_eq!(offsets, vec![4, 8, 12, 16]);
        assert_eq!(params.size(), 16);
    }

    #[test]
    fn test_local_offsets_grow_down() {
        let mut locals = FrameAllocator::new(Segment::Local, Direction::Down);
        let offsets: Vec<i32> = (0..3).map(|i| locals.allocate(&format!("l{}", i), 4).offset).collect();
        assert_eq!(offsets, vec![-8, -12, -16]);
        assert_eq!(locals.size(), 12);
    }

    #[test]
    fn test_offsets_are_never_reused() {
        let mut alloc = FrameAllocator::with_base(Segment::Global, Direction::Up, 0);
        let first = alloc.allocate("x", 4);
        let second = alloc.allocate("x", 4);
        assert_ne!(first.offset, second.offset);
        assert_eq!(second.segment, Segment::Global);
    }

    #[test]
    fn test_location_renders_segment_and_offset() {
        assert_eq!(Location::new("a", Segment::Local, -8).to_string(), "a(fp-8)");
        assert_eq!(Location::new("this", Segment::Param, 4).to_string(), "this(fp+4)");
        assert_eq!(Location::new("g", Segment::Global, 0).to_string(), "g(gp+0)");
    }

    #[test]
    fn test_clone_continues_from_parent_cursor() {
        let mut parent = FrameAllocator::new(Segment::Field, Direction::Up);
        parent.allocate("x", 4);
        let mut child = parent.clone();
        assert_eq!(child.cursor(), parent.cursor());
        assert_eq!(child.allocate("y", 4).offset, 8);
        assert_eq!(parent.cursor(), 8);
    }
}
