//! 声明解析：变量、函数、类与接口

use crate::ast::*;
use crate::error::DecafResult;
use crate::lexer::Token;
use super::Parser;
use super::types::{parse_type, parse_return_type};
use super::statements::parse_block;

/// 解析顶层声明
pub fn parse_decl(parser: &mut Parser) -> DecafResult<Decl> {
    match parser.current_token() {
        Token::Class => Ok(Decl::Class(parse_class(parser)?)),
        Token::Interface => Ok(Decl::Interface(parse_interface(parser)?)),
        Token::Void => Ok(Decl::Fn(parse_function(parser)?)),
        _ => {
            // 类型 标识符 之后：'(' 为函数，否则为变量
            let checkpoint = parser.pos;
            parse_type(parser)?;
            parser.consume_identifier("Expected identifier after type")?;
            let is_function = parser.check(&Token::LParen);
            parser.pos = checkpoint;

            if is_function {
                Ok(Decl::Fn(parse_function(parser)?))
            } else {
                Ok(Decl::Var(parse_var_decl(parser)?))
            }
        }
    }
}

/// 解析 `Type ident`
pub fn parse_variable(parser: &mut Parser) -> DecafResult<VarDecl> {
    let id = parser.next_node_id();
    let ty = parse_type(parser)?;
    let ident = parser.consume_identifier("Expected variable name")?;
    Ok(VarDecl { id, ident, ty })
}

/// 解析 `Type ident ;`
pub fn parse_var_decl(parser: &mut Parser) -> DecafResult<VarDecl> {
    let var = parse_variable(parser)?;
    parser.consume(&Token::Semicolon, "Expected ';' after variable declaration")?;
    Ok(var)
}

/// 解析形参列表（不含括号）
pub fn parse_formals(parser: &mut Parser) -> DecafResult<Vec<VarDecl>> {
    let mut formals = Vec::new();

    if !parser.check(&Token::RParen) {
        loop {
            formals.push(parse_variable(parser)?);
            if !parser.match_token(&Token::Comma) {
                break;
            }
        }
    }

    Ok(formals)
}

/// 解析函数签名，函数体由调用者决定
fn parse_signature(parser: &mut Parser) -> DecafResult<FnDecl> {
    let id = parser.next_node_id();
    let return_type = parse_return_type(parser)?;
    let ident = parser.consume_identifier("Expected function name")?;

    parser.consume(&Token::LParen, "Expected '(' after function name")?;
    let formals = parse_formals(parser)?;
    parser.consume(&Token::RParen, "Expected ')' after formals")?;

    Ok(FnDecl {
        id,
        ident,
        return_type,
        formals,
        body: None,
    })
}

/// 解析带函数体的函数声明
pub fn parse_function(parser: &mut Parser) -> DecafResult<FnDecl> {
    let mut function = parse_signature(parser)?;
    if !parser.check(&Token::LBrace) {
        return Err(parser.error("Expected '{' to begin function body"));
    }
    function.body = Some(parse_block(parser)?);
    Ok(function)
}

/// 解析接口中的函数原型
pub fn parse_prototype(parser: &mut Parser) -> DecafResult<FnDecl> {
    let prototype = parse_signature(parser)?;
    parser.consume(&Token::Semicolon, "Expected ';' after prototype")?;
    Ok(prototype)
}

/// 解析类声明
pub fn parse_class(parser: &mut Parser) -> DecafResult<ClassDecl> {
    let id = parser.next_node_id();
    parser.consume(&Token::Class, "Expected 'class' keyword")?;

    let ident = parser.consume_identifier("Expected class name")?;

    let extends = if parser.match_token(&Token::Extends) {
        Some(parser.consume_identifier("Expected parent class name")?)
    } else {
        None
    };

    let mut implements = Vec::new();
    if parser.match_token(&Token::Implements) {
        loop {
            implements.push(parser.consume_identifier("Expected interface name")?);
            if !parser.match_token(&Token::Comma) {
                break;
            }
        }
    }

    parser.consume(&Token::LBrace, "Expected '{' after class declaration")?;

    let mut members = Vec::new();
    while !parser.check(&Token::RBrace) && !parser.is_at_end() {
        members.push(parse_class_member(parser)?);
    }

    parser.consume(&Token::RBrace, "Expected '}' after class body")?;

    Ok(ClassDecl {
        id,
        ident,
        extends,
        implements,
        members,
    })
}

/// 解析类成员（字段或方法）
pub fn parse_class_member(parser: &mut Parser) -> DecafResult<ClassMember> {
    match parse_decl(parser)? {
        Decl::Var(field) => Ok(ClassMember::Field(field)),
        Decl::Fn(method) => Ok(ClassMember::Method(method)),
        Decl::Class(_) | Decl::Interface(_) => {
            Err(parser.error("Expected field or method declaration"))
        }
    }
}

/// 解析接口声明
pub fn parse_interface(parser: &mut Parser) -> DecafResult<InterfaceDecl> {
    let id = parser.next_node_id();
    parser.consume(&Token::Interface, "Expected 'interface' keyword")?;

    let ident = parser.consume_identifier("Expected interface name")?;

    parser.consume(&Token::LBrace, "Expected '{' after interface declaration")?;

    let mut members = Vec::new();
    while !parser.check(&Token::RBrace) && !parser.is_at_end() {
        members.push(parse_prototype(parser)?);
    }

    parser.consume(&Token::RBrace, "Expected '}' after interface body")?;

    Ok(InterfaceDecl { id, ident, members })
}
