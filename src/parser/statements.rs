//! 语句解析

use crate::ast::*;
use crate::error::DecafResult;
use crate::lexer::Token;
use super::Parser;
use super::classes::parse_var_decl;
use super::types::starts_var_decl;
use super::expressions::parse_expression;

/// 解析语句块：先是变量声明，然后是语句
pub fn parse_block(parser: &mut Parser) -> DecafResult<Block> {
    let id = parser.next_node_id();
    let loc = parser.current_loc();
    parser.consume(&Token::LBrace, "Expected '{' to begin block")?;

    let mut decls = Vec::new();
    while starts_var_decl(parser) {
        decls.push(parse_var_decl(parser)?);
    }

    let mut statements = Vec::new();
    while !parser.check(&Token::RBrace) && !parser.is_at_end() {
        statements.push(parse_statement(parser)?);
    }

    parser.consume(&Token::RBrace, "Expected '}' after block")?;

    Ok(Block {
        id,
        decls,
        statements,
        loc,
    })
}

/// 解析单条语句
pub fn parse_statement(parser: &mut Parser) -> DecafResult<Stmt> {
    match parser.current_token() {
        Token::LBrace => Ok(Stmt::Block(parse_block(parser)?)),
        Token::If => parse_if_statement(parser),
        Token::While => parse_while_statement(parser),
        Token::For => parse_for_statement(parser),
        Token::Break => {
            let loc = parser.current_loc();
            parser.advance();
            parser.consume(&Token::Semicolon, "Expected ';' after 'break'")?;
            Ok(Stmt::Break(loc))
        }
        Token::Return => parse_return_statement(parser),
        Token::Print => parse_print_statement(parser),
        Token::Semicolon => {
            parser.advance();
            Ok(Stmt::Empty)
        }
        _ => {
            if starts_var_decl(parser) {
                return Err(parser.error("Variable declarations must precede statements in a block"));
            }
            let expr = parse_expression(parser)?;
            parser.consume(&Token::Semicolon, "Expected ';' after expression")?;
            Ok(Stmt::Expr(expr))
        }
    }
}

/// 解析 if 语句
fn parse_if_statement(parser: &mut Parser) -> DecafResult<Stmt> {
    let loc = parser.current_loc();
    parser.consume(&Token::If, "Expected 'if'")?;
    parser.consume(&Token::LParen, "Expected '(' after 'if'")?;
    let condition = parse_expression(parser)?;
    parser.consume(&Token::RParen, "Expected ')' after if condition")?;

    let then_branch = Box::new(parse_statement(parser)?);
    // else 与最近的 if 匹配
    let else_branch = if parser.match_token(&Token::Else) {
        Some(Box::new(parse_statement(parser)?))
    } else {
        None
    };

    Ok(Stmt::If(IfStmt {
        condition,
        then_branch,
        else_branch,
        loc,
    }))
}

/// 解析 while 语句
fn parse_while_statement(parser: &mut Parser) -> DecafResult<Stmt> {
    let loc = parser.current_loc();
    parser.consume(&Token::While, "Expected 'while'")?;
    parser.consume(&Token::LParen, "Expected '(' after 'while'")?;
    let condition = parse_expression(parser)?;
    parser.consume(&Token::RParen, "Expected ')' after while condition")?;
    let body = Box::new(parse_statement(parser)?);

    Ok(Stmt::While(WhileStmt { condition, body, loc }))
}

/// 解析 for 语句：`for (init; cond; update) body`，init 与 update 可省略
fn parse_for_statement(parser: &mut Parser) -> DecafResult<Stmt> {
    let loc = parser.current_loc();
    parser.consume(&Token::For, "Expected 'for'")?;
    parser.consume(&Token::LParen, "Expected '(' after 'for'")?;

    let init = if parser.check(&Token::Semicolon) {
        None
    } else {
        Some(parse_expression(parser)?)
    };
    parser.consume(&Token::Semicolon, "Expected ';' after for initializer")?;

    let condition = parse_expression(parser)?;
    parser.consume(&Token::Semicolon, "Expected ';' after for condition")?;

    let update = if parser.check(&Token::RParen) {
        None
    } else {
        Some(parse_expression(parser)?)
    };
    parser.consume(&Token::RParen, "Expected ')' after for clauses")?;

    let body = Box::new(parse_statement(parser)?);

    Ok(Stmt::For(ForStmt {
        init,
        condition,
        update,
        body,
        loc,
    }))
}

/// 解析 return 语句
fn parse_return_statement(parser: &mut Parser) -> DecafResult<Stmt> {
    let loc = parser.current_loc();
    parser.consume(&Token::Return, "Expected 'return'")?;

    let value = if parser.check(&Token::Semicolon) {
        None
    } else {
        Some(parse_expression(parser)?)
    };
    parser.consume(&Token::Semicolon, "Expected ';' after return")?;

    Ok(Stmt::Return(ReturnStmt { value, loc }))
}

/// 解析 Print 语句，至少一个参数
fn parse_print_statement(parser: &mut Parser) -> DecafResult<Stmt> {
    let loc = parser.current_loc();
    parser.consume(&Token::Print, "Expected 'Print'")?;
    parser.consume(&Token::LParen, "Expected '(' after 'Print'")?;

    let mut args = vec![parse_expression(parser)?];
    while parser.match_token(&Token::Comma) {
        args.push(parse_expression(parser)?);
    }

    parser.consume(&Token::RParen, "Expected ')' after Print arguments")?;
    parser.consume(&Token::Semicolon, "Expected ';' after Print")?;

    Ok(Stmt::Print(PrintStmt { args, loc }))
}
