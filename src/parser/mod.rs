//! Decaf 语法分析器
//!
//! 本模块将词法分析器生成的令牌流解析为抽象语法树 (AST)。
//! 每个声明、语句块和表达式都会分配一个唯一的 [`NodeId`]。

mod classes;
mod types;
mod statements;
mod expressions;
mod utils;

use crate::lexer::{Token, TokenWithLocation};
use crate::ast::{NodeId, Program};
use crate::error::{DecafError, DecafResult, SourceLocation};

/// 语法分析器
pub struct Parser {
    /// 令牌流
    pub tokens: Vec<TokenWithLocation>,
    /// 当前解析位置
    pub pos: usize,
    /// 下一个节点编号
    next_id: u32,
}

impl Parser {
    /// 创建新的语法分析器
    pub fn new(tokens: Vec<TokenWithLocation>) -> Self {
        Self { tokens, pos: 0, next_id: 0 }
    }

    /// 解析整个程序
    pub fn parse(&mut self) -> DecafResult<Program> {
        let mut decls = Vec::new();

        while !self.is_at_end() {
            decls.push(classes::parse_decl(self)?);
        }

        if decls.is_empty() {
            return Err(self.error("Program must contain at least one declaration"));
        }

        Ok(Program { decls })
    }

    /// 分配新的节点编号
    pub fn next_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    // 辅助方法
    fn is_at_end(&self) -> bool {
        utils::is_at_end(self)
    }

    fn current_token(&self) -> &Token {
        utils::current_token(self)
    }

    fn peek_token(&self, offset: usize) -> &Token {
        utils::peek_token(self, offset)
    }

    fn current_loc(&self) -> SourceLocation {
        utils::current_loc(self)
    }

    fn advance(&mut self) -> &Token {
        utils::advance(self)
    }

    fn check(&self, token: &Token) -> bool {
        utils::check(self, token)
    }

    fn match_token(&mut self, token: &Token) -> bool {
        utils::match_token(self, token)
    }

    fn consume(&mut self, token: &Token, message: &str) -> DecafResult<&Token> {
        utils::consume(self, token, message)
    }

    fn consume_identifier(&mut self, message: &str) -> DecafResult<crate::ast::Identifier> {
        utils::consume_identifier(self, message)
    }

    fn error(&self, message: &str) -> DecafError {
        utils::error(self, message)
    }
}

/// 解析令牌流生成 AST
pub fn parse(tokens: Vec<TokenWithLocation>) -> DecafResult<Program> {
    let mut parser = Parser::new(tokens);
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use crate::lexer::lex;
    use crate::types::Type;

    fn parse_source(source: &str) -> Program {
        parse(lex(source).unwrap()).unwrap()
    }

    #[test]
    fn test_parse_class_with_extends_and_implements() {
        let program = parse_source(
            "class B extends A implements I, J { int x; int f(int a, bool b) { return a; } }",
        );
        let Decl::Class(class) = &program.decls[0] else {
            panic!("expected class");
        };
        assert_eq!(class.name(), "B");
        assert_eq!(class.extends.as_ref().map(|e| e.name.as_str()), Some("A"));
        let names: Vec<_> = class.implements.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["I", "J"]);
        assert_eq!(class.fields().count(), 1);
        let method = class.methods().next().unwrap();
        assert_eq!(method.formals.len(), 2);
        assert_eq!(method.formals[1].ty.ty, Type::Bool);
        assert!(method.body.is_some());
    }

    #[test]
    fn test_parse_interface_prototypes() {
        let program = parse_source("interface I { int f(); void g(string[] s); }");
        let Decl::Interface(interface) = &program.decls[0] else {
            panic!("expected interface");
        };
        assert_eq!(interface.members.len(), 2);
        assert!(interface.members.iter().all(|m| m.body.is_none()));
        assert_eq!(
            interface.members[1].formals[0].ty.ty,
            Type::Array(Box::new(Type::String))
        );
    }

    #[test]
    fn test_block_separates_decls_from_statements() {
        let program = parse_source(
            "void main() { Foo[] a; int i; a[i] = new Foo; i++; Print(i, \"x\"); }",
        );
        let Decl::Fn(main) = &program.decls[0] else {
            panic!("expected function");
        };
        let body = main.body.as_ref().unwrap();
        assert_eq!(body.decls.len(), 2);
        assert_eq!(body.decls[0].ty.ty, Type::Array(Box::new(Type::Named("Foo".into()))));
        assert_eq!(body.statements.len(), 3);
        assert!(matches!(body.statements[2], Stmt::Print(_)));
    }

    #[test]
    fn test_precedence_and_assignment() {
        let program = parse_source("void f() { x = 1 + 2 * 3 < 4 && !b; }");
        let Decl::Fn(f) = &program.decls[0] else {
            panic!("expected function");
        };
        let Stmt::Expr(expr) = &f.body.as_ref().unwrap().statements[0] else {
            panic!("expected expression statement");
        };
        let ExprKind::Assignment(assign) = &expr.kind else {
            panic!("expected assignment");
        };
        let ExprKind::Binary(and) = &assign.value.kind else {
            panic!("expected &&");
        };
        assert_eq!(and.op, BinaryOp::And);
        let ExprKind::Binary(lt) = &and.left.kind else {
            panic!("expected <");
        };
        assert_eq!(lt.op, BinaryOp::Lt);
        let ExprKind::Binary(add) = &lt.left.kind else {
            panic!("expected +");
        };
        assert_eq!(add.op, BinaryOp::Add);
        assert!(matches!(add.right.kind, ExprKind::Binary(BinaryExpr { op: BinaryOp::Mul, .. })));
    }

    #[test]
    fn test_node_ids_are_unique() {
        let program = parse_source("int a; class C { int f() { return 1 + 2; } } void g() {}");
        let mut ids = vec![program.decls[0].id(), program.decls[1].id(), program.decls[2].id()];
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(parse(lex("class { }").unwrap()), Err(DecafError::Parser { .. })));
        assert!(matches!(parse(lex("void f() { 1 = 2; }").unwrap()), Err(DecafError::Parser { .. })));
        assert!(matches!(parse(lex("interface I { int f() { } }").unwrap()), Err(DecafError::Parser { .. })));
        assert!(matches!(parse(lex("").unwrap()), Err(DecafError::Parser { .. })));
    }
}
