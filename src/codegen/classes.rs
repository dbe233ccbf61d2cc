//! 类布局：虚表槽位、字段列表与字段分配器

use std::collections::HashMap;

use crate::ast::{FnDecl, NodeId, VarDecl};
use super::frame::{FrameAllocator, Location};

/// 虚表中的一个槽位
#[derive(Debug, Clone)]
pub struct MethodSlot<'a> {
    pub name: String,
    pub label: String,
    pub decl: &'a FnDecl,
}

/// 字段及其相对对象起始的位置
#[derive(Debug, Clone)]
pub struct FieldSlot<'a> {
    pub decl: &'a VarDecl,
    pub location: Location,
}

/// 一个类最终的布局；子类从父类的布局复制后继续扩展
#[derive(Debug, Clone)]
pub struct ClassLayout<'a> {
    pub label: String,
    pub vtable: Vec<MethodSlot<'a>>,
    pub fields: Vec<FieldSlot<'a>>,
    pub falloc: FrameAllocator,
}

impl<'a> ClassLayout<'a> {
    pub fn new(label: String, falloc: FrameAllocator) -> Self {
        Self {
            label,
            vtable: Vec::new(),
            fields: Vec::new(),
            falloc,
        }
    }

    /// 继承父类布局：虚表、字段列表与分配器游标原样延续
    pub fn inherit(label: String, parent: &ClassLayout<'a>) -> Self {
        Self {
            label,
            vtable: parent.vtable.clone(),
            fields: parent.fields.clone(),
            falloc: parent.falloc.clone(),
        }
    }

    pub fn slot_index(&self, method: &str) -> Option<usize> {
        self.vtable.iter().position(|slot| slot.name == method)
    }

    /// 方法声明所在槽位的标签
    pub fn method_label(&self, method: NodeId) -> Option<&str> {
        self.vtable
            .iter()
            .find(|slot| slot.decl.id == method)
            .map(|slot| slot.label.as_str())
    }

    pub fn method_labels(&self) -> Vec<String> {
        self.vtable.iter().map(|slot| slot.label.clone()).collect()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.decl.name()).collect()
    }

    pub fn field_location(&self, name: &str) -> Option<&Location> {
        self.fields
            .iter()
            .find(|field| field.decl.name() == name)
            .map(|field| &field.location)
    }

    /// 对象大小：虚表指针加全部字段
    pub fn instance_size(&self) -> i32 {
        self.falloc.cursor()
    }
}

/// 方法合入虚表的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotDecision {
    /// 签名一致，原位替换
    Overridden(usize),
    /// 同名但签名不一致，保留继承的槽位
    Rejected(usize),
    /// 新方法，追加在末尾
    Appended(usize),
}

/// 按名字查找继承的槽位，决定覆盖、拒绝或追加
pub fn merge_method<'a>(vtable: &mut Vec<MethodSlot<'a>>, class_label: &str, method: &'a FnDecl) -> SlotDecision {
    let label = format!("{}.{}", class_label, method.name());

    let decision = match vtable.iter().position(|slot| slot.name == method.name()) {
        Some(index) if vtable[index].decl.type_equal(method) => {
            vtable[index] = MethodSlot {
                name: method.name().to_string(),
                label,
                decl: method,
            };
            SlotDecision::Overridden(index)
        }
        Some(index) => SlotDecision::Rejected(index),
        None => {
            vtable.push(MethodSlot {
                name: method.name().to_string(),
                label,
                decl: method,
            });
            SlotDecision::Appended(vtable.len() - 1)
        }
    };

    tracing::trace!(class = class_label, method = method.name(), ?decision, "dispatch slot");
    decision
}

/// 按类节点编号记忆的布局集合；同时可按类名查询
#[derive(Debug, Default)]
pub struct ClassLayouts<'a> {
    layouts: HashMap<NodeId, ClassLayout<'a>>,
    by_name: HashMap<String, NodeId>,
}

impl<'a> ClassLayouts<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, class: NodeId) -> bool {
        self.layouts.contains_key(&class)
    }

    pub fn get(&self, class: NodeId) -> Option<&ClassLayout<'a>> {
        self.layouts.get(&class)
    }

    pub fn by_name(&self, name: &str) -> Option<&ClassLayout<'a>> {
        self.by_name.get(name).and_then(|id| self.layouts.get(id))
    }

    pub fn insert(&mut self, class: NodeId, name: &str, layout: ClassLayout<'a>) {
        self.by_name.insert(name.to_string(), class);
        self.layouts.insert(class, layout);
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Identifier, TypeRef};
    use crate::codegen::frame::{Direction, Segment};
    use crate::error::SourceLocation;
    use crate::types::Type;
    use pretty_assertions::assert_eq;

    fn method(id: u32, name: &str, formals: &[Type]) -> FnDecl {
        let loc = SourceLocation::default();
        FnDecl {
            id: NodeId(id),
            ident: Identifier::new(name, loc),
            return_type: TypeRef::new(Type::Int, loc),
            formals: formals
                .iter()
                .enumerate()
                .map(|(i, ty)| VarDecl {
                    id: NodeId(id * 10 + i as u32),
                    ident: Identifier::new(format!("p{}", i), loc),
                    ty: TypeRef::new(ty.clone(), loc),
                })
                .collect(),
            body: None,
        }
    }

    #[test]
    fn test_override_keeps_index_and_new_method_appends() {
        let p_f = method(1, "f", &[Type::Int]);
        let p_g = method(2, "g", &[]);
        let q_g = method(3, "g", &[]);
        let q_h = method(4, "h", &[]);

        let mut vtable = Vec::new();
        assert_eq!(merge_method(&mut vtable, "P", &p_f), SlotDecision::Appended(0));
        assert_eq!(merge_method(&mut vtable, "P", &p_g), SlotDecision::Appended(1));

        assert_eq!(merge_method(&mut vtable, "Q", &q_g), SlotDecision::Overridden(1));
        assert_eq!(merge_method(&mut vtable, "Q", &q_h), SlotDecision::Appended(2));

        let labels: Vec<&str> = vtable.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["P.f", "Q.g", "Q.h"]);
    }

    #[test]
    fn test_mismatched_override_keeps_original_slot() {
        let p_f = method(1, "f", &[Type::Int]);
        let q_f = method(2, "f", &[Type::Int, Type::Int]);

        let mut vtable = Vec::new();
        merge_method(&mut vtable, "P", &p_f);
        assert_eq!(merge_method(&mut vtable, "Q", &q_f), SlotDecision::Rejected(0));

        assert_eq!(vtable.len(), 1);
        assert_eq!(vtable[0].label, "P.f");
        assert_eq!(vtable[0].decl.id, NodeId(1));
    }

    #[test]
    fn test_inherit_continues_parent_layout() {
        let p_f = method(1, "f", &[]);
        let mut parent = ClassLayout::new("P".into(), FrameAllocator::new(Segment::Field, Direction::Up));
        merge_method(&mut parent.vtable, "P", &p_f);
        parent.falloc.allocate("x", 4);

        let child = ClassLayout::inherit("Q".into(), &parent);
        assert_eq!(child.method_labels(), parent.method_labels());
        assert_eq!(child.method_label(NodeId(1)), Some("P.f"));
        assert_eq!(child.method_label(NodeId(2)), None);
        assert_eq!(child.falloc.cursor(), parent.falloc.cursor());
        assert_eq!(child.instance_size(), 8);
    }
}
