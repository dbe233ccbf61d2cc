use crate::types::Type;
use crate::error::SourceLocation;

/// AST 节点编号，由语法分析器分配，在一个程序内唯一。
/// 语义分析通过它把作用域、类型等附加信息挂到节点上。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub loc: SourceLocation,
}

impl Identifier {
    pub fn new(name: impl Into<String>, loc: SourceLocation) -> Self {
        Self { name: name.into(), loc }
    }
}

/// 源码中出现的类型，带有位置信息以便报告未声明的类型名
#[derive(Debug, Clone)]
pub struct TypeRef {
    pub ty: Type,
    pub loc: SourceLocation,
}

impl TypeRef {
    pub fn new(ty: Type, loc: SourceLocation) -> Self {
        Self { ty, loc }
    }
}

#[derive(Debug, Clone)]
pub struct Program {
    pub decls: Vec<Decl>,
}

/// 顶层声明
#[derive(Debug, Clone)]
pub enum Decl {
    Var(VarDecl),
    Class(ClassDecl),
    Interface(InterfaceDecl),
    Fn(FnDecl),
}

impl Decl {
    pub fn ident(&self) -> &Identifier {
        match self {
            Decl::Var(v) => &v.ident,
            Decl::Class(c) => &c.ident,
            Decl::Interface(i) => &i.ident,
            Decl::Fn(f) => &f.ident,
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            Decl::Var(v) => v.id,
            Decl::Class(c) => c.id,
            Decl::Interface(i) => i.id,
            Decl::Fn(f) => f.id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub id: NodeId,
    pub ident: Identifier,
    pub ty: TypeRef,
}

impl VarDecl {
    pub fn name(&self) -> &str {
        &self.ident.name
    }
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub id: NodeId,
    pub ident: Identifier,
    pub extends: Option<Identifier>,
    pub implements: Vec<Identifier>,
    pub members: Vec<ClassMember>,
}

impl ClassDecl {
    pub fn name(&self) -> &str {
        &self.ident.name
    }

    pub fn implements_interface(&self, name: &str) -> bool {
        self.implements.iter().any(|i| i.name == name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &FnDecl> {
        self.members.iter().filter_map(|m| match m {
            ClassMember::Method(method) => Some(method),
            ClassMember::Field(_) => None,
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &VarDecl> {
        self.members.iter().filter_map(|m| match m {
            ClassMember::Field(field) => Some(field),
            ClassMember::Method(_) => None,
        })
    }
}

#[derive(Debug, Clone)]
pub enum ClassMember {
    Method(FnDecl),
    Field(VarDecl),
}

#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub id: NodeId,
    pub ident: Identifier,
    pub members: Vec<FnDecl>,
}

impl InterfaceDecl {
    pub fn name(&self) -> &str {
        &self.ident.name
    }
}

#[derive(Debug, Clone)]
pub struct FnDecl {
    pub id: NodeId,
    pub ident: Identifier,
    pub return_type: TypeRef,
    pub formals: Vec<VarDecl>,
    /// 接口中的原型没有函数体
    pub body: Option<Block>,
}

impl FnDecl {
    pub fn name(&self) -> &str {
        &self.ident.name
    }

    /// 签名相等：返回类型等价、参数个数相同、参数类型逐一等价
    pub fn type_equal(&self, other: &FnDecl) -> bool {
        if !self.return_type.ty.is_equivalent_to(&other.return_type.ty) {
            return false;
        }

        if self.formals.len() != other.formals.len() {
            return false;
        }

        self.formals
            .iter()
            .zip(other.formals.iter())
            .all(|(a, b)| a.ty.ty.is_equivalent_to(&b.ty.ty))
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: NodeId,
    pub decls: Vec<VarDecl>,
    pub statements: Vec<Stmt>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    Empty,
    Block(Block),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Break(SourceLocation),
    Return(ReturnStmt),
    Print(PrintStmt),
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Box<Stmt>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub init: Option<Expr>,
    pub condition: Expr,
    pub update: Option<Expr>,
    pub body: Box<Stmt>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct PrintStmt {
    pub args: Vec<Expr>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(LiteralValue),
    This,
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Postfix(PostfixExpr),
    Assignment(AssignmentExpr),
    /// 带或不带显式基对象的字段访问；不带基对象时可能是变量或隐式 this 字段
    FieldAccess(FieldAccessExpr),
    ArrayAccess(ArrayAccessExpr),
    Call(CallExpr),
    New(Identifier),
    NewArray(NewArrayExpr),
    ReadInteger,
    ReadLine,
}

#[derive(Debug, Clone)]
pub enum LiteralValue {
    Int(i32),
    Double(f64),
    Bool(bool),
    String(String),
    Null,
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: BinaryOp,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod)
    }

    pub fn is_relational(&self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostfixExpr {
    pub op: PostfixOp,
    pub operand: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Inc,
    Dec,
}

impl PostfixOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            PostfixOp::Inc => "++",
            PostfixOp::Dec => "--",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssignmentExpr {
    pub target: Box<Expr>,
    pub value: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct FieldAccessExpr {
    pub base: Option<Box<Expr>>,
    pub field: Identifier,
}

#[derive(Debug, Clone)]
pub struct ArrayAccessExpr {
    pub base: Box<Expr>,
    pub subscript: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub base: Option<Box<Expr>>,
    pub field: Identifier,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct NewArrayExpr {
    pub size: Box<Expr>,
    pub elem_type: TypeRef,
}

impl Expr {
    pub fn is_lvalue(&self) -> bool {
        matches!(self.kind, ExprKind::FieldAccess(_) | ExprKind::ArrayAccess(_))
    }
}

impl Program {
    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.decls.iter().filter_map(|d| match d {
            Decl::Class(class) => Some(class),
            _ => None,
        })
    }

    pub fn find_class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes().find(|c| c.name() == name)
    }
}
