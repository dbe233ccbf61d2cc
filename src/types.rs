use std::fmt;

/// Decaf 的静态类型
///
/// `Error` 是哨兵类型：无法解析的类型名会被替换为它，
/// 它与任何类型等价，从而避免一个错误引发一连串的后续错误。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Int,
    Double,
    Bool,
    String,
    Null,
    Error,
    Named(String),
    Array(Box<Type>),
}

impl Type {
    /// 每个值在栈帧或对象中占用的字节数（Decaf 中所有值都是一个字）
    pub fn size_in_bytes(&self) -> i32 {
        match self {
            Type::Void => 0,
            _ => 4,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Double)
    }

    /// 最内层的具名类型名（`Foo[][]` -> `Foo`）
    pub fn base_name(&self) -> Option<&str> {
        match self {
            Type::Named(name) => Some(name),
            Type::Array(elem) => elem.base_name(),
            _ => None,
        }
    }

    /// 结构等价：同名具名类型、同元素类型的数组、同一基本类型。
    /// 错误类型与任何类型等价。
    pub fn is_equivalent_to(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Error, _) | (_, Type::Error) => true,
            (Type::Array(a), Type::Array(b)) => a.is_equivalent_to(b),
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int => write!(f, "int"),
            Type::Double => write!(f, "double"),
            Type::Bool => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::Null => write!(f, "null"),
            Type::Error => write!(f, "error"),
            Type::Named(name) => write!(f, "{}", name),
            Type::Array(inner) => write!(f, "{}[]", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_is_equivalent_to_everything() {
        assert!(Type::Error.is_equivalent_to(&Type::Int));
        assert!(Type::Named("A".into()).is_equivalent_to(&Type::Error));
        assert!(Type::Array(Box::new(Type::Error)).is_equivalent_to(&Type::Array(Box::new(Type::Bool))));
    }

    #[test]
    fn test_named_types_compare_by_name() {
        assert!(Type::Named("A".into()).is_equivalent_to(&Type::Named("A".into())));
        assert!(!Type::Named("A".into()).is_equivalent_to(&Type::Named("B".into())));
        assert!(!Type::Int.is_equivalent_to(&Type::Double));
    }

    #[test]
    fn test_display_and_base_name() {
        let ty = Type::Array(Box::new(Type::Array(Box::new(Type::Named("Foo".into())))));
        assert_eq!(ty.to_string(), "Foo[][]");
        assert_eq!(ty.base_name(), Some("Foo"));
        assert_eq!(Type::Int.base_name(), None);
    }
}
