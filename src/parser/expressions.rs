//! 表达式解析
//!
//! 优先级从低到高：赋值、`||`、`&&`、相等、关系、加减、乘除模、一元、后缀、基本表达式。

use crate::ast::*;
use crate::error::DecafResult;
use crate::error::SourceLocation;
use crate::lexer::Token;
use super::Parser;
use super::types::parse_type;

/// 解析表达式（入口点）
pub fn parse_expression(parser: &mut Parser) -> DecafResult<Expr> {
    parse_assignment(parser)
}

fn make_expr(parser: &mut Parser, kind: ExprKind, loc: SourceLocation) -> Expr {
    Expr {
        id: parser.next_node_id(),
        kind,
        loc,
    }
}

fn make_binary(parser: &mut Parser, left: Expr, op: BinaryOp, right: Expr, loc: SourceLocation) -> Expr {
    let kind = ExprKind::Binary(BinaryExpr {
        left: Box::new(left),
        op,
        right: Box::new(right),
    });
    make_expr(parser, kind, loc)
}

/// 解析赋值表达式（右结合）
pub fn parse_assignment(parser: &mut Parser) -> DecafResult<Expr> {
    let target = parse_or(parser)?;

    let loc = parser.current_loc();
    if parser.match_token(&Token::Assign) {
        if !target.is_lvalue() {
            return Err(parser.error("Invalid assignment target"));
        }
        let value = parse_assignment(parser)?;
        let kind = ExprKind::Assignment(AssignmentExpr {
            target: Box::new(target),
            value: Box::new(value),
        });
        return Ok(make_expr(parser, kind, loc));
    }

    Ok(target)
}

/// 解析逻辑或表达式
pub fn parse_or(parser: &mut Parser) -> DecafResult<Expr> {
    let mut left = parse_and(parser)?;

    loop {
        let loc = parser.current_loc();
        if !parser.match_token(&Token::OrOr) {
            break;
        }
        let right = parse_and(parser)?;
        left = make_binary(parser, left, BinaryOp::Or, right, loc);
    }

    Ok(left)
}

/// 解析逻辑与表达式
pub fn parse_and(parser: &mut Parser) -> DecafResult<Expr> {
    let mut left = parse_equality(parser)?;

    loop {
        let loc = parser.current_loc();
        if !parser.match_token(&Token::AndAnd) {
            break;
        }
        let right = parse_equality(parser)?;
        left = make_binary(parser, left, BinaryOp::And, right, loc);
    }

    Ok(left)
}

/// 解析相等性表达式（不可结合）
pub fn parse_equality(parser: &mut Parser) -> DecafResult<Expr> {
    let left = parse_relational(parser)?;

    let loc = parser.current_loc();
    let op = match parser.current_token() {
        Token::EqEq => BinaryOp::Eq,
        Token::NotEq => BinaryOp::Ne,
        _ => return Ok(left),
    };
    parser.advance();

    let right = parse_relational(parser)?;
    Ok(make_binary(parser, left, op, right, loc))
}

/// 解析关系表达式（不可结合）
pub fn parse_relational(parser: &mut Parser) -> DecafResult<Expr> {
    let left = parse_additive(parser)?;

    let loc = parser.current_loc();
    let op = match parser.current_token() {
        Token::Lt => BinaryOp::Lt,
        Token::Le => BinaryOp::Le,
        Token::Gt => BinaryOp::Gt,
        Token::Ge => BinaryOp::Ge,
        _ => return Ok(left),
    };
    parser.advance();

    let right = parse_additive(parser)?;
    Ok(make_binary(parser, left, op, right, loc))
}

/// 解析加减表达式
pub fn parse_additive(parser: &mut Parser) -> DecafResult<Expr> {
    let mut left = parse_multiplicative(parser)?;

    loop {
        let loc = parser.current_loc();
        let op = match parser.current_token() {
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Sub,
            _ => break,
        };
        parser.advance();
        let right = parse_multiplicative(parser)?;
        left = make_binary(parser, left, op, right, loc);
    }

    Ok(left)
}

/// 解析乘除模表达式
pub fn parse_multiplicative(parser: &mut Parser) -> DecafResult<Expr> {
    let mut left = parse_unary(parser)?;

    loop {
        let loc = parser.current_loc();
        let op = match parser.current_token() {
            Token::Star => BinaryOp::Mul,
            Token::Slash => BinaryOp::Div,
            Token::Percent => BinaryOp::Mod,
            _ => break,
        };
        parser.advance();
        let right = parse_unary(parser)?;
        left = make_binary(parser, left, op, right, loc);
    }

    Ok(left)
}

/// 解析一元表达式：`-e`、`!e`
pub fn parse_unary(parser: &mut Parser) -> DecafResult<Expr> {
    let loc = parser.current_loc();
    let op = match parser.current_token() {
        Token::Minus => UnaryOp::Neg,
        Token::Bang => UnaryOp::Not,
        _ => return parse_postfix(parser),
    };
    parser.advance();

    let operand = parse_unary(parser)?;
    let kind = ExprKind::Unary(UnaryExpr {
        op,
        operand: Box::new(operand),
    });
    Ok(make_expr(parser, kind, loc))
}

/// 解析后缀表达式：成员访问、方法调用、数组下标、`++`/`--`
pub fn parse_postfix(parser: &mut Parser) -> DecafResult<Expr> {
    let mut expr = parse_primary(parser)?;

    loop {
        let loc = parser.current_loc();
        if parser.match_token(&Token::Dot) {
            let field = parser.consume_identifier("Expected member name after '.'")?;
            let kind = if parser.match_token(&Token::LParen) {
                let args = parse_arguments(parser)?;
                parser.consume(&Token::RParen, "Expected ')' after arguments")?;
                ExprKind::Call(CallExpr {
                    base: Some(Box::new(expr)),
                    field,
                    args,
                })
            } else {
                ExprKind::FieldAccess(FieldAccessExpr {
                    base: Some(Box::new(expr)),
                    field,
                })
            };
            expr = make_expr(parser, kind, loc);
        } else if parser.match_token(&Token::LBracket) {
            let subscript = parse_expression(parser)?;
            parser.consume(&Token::RBracket, "Expected ']' after subscript")?;
            let kind = ExprKind::ArrayAccess(ArrayAccessExpr {
                base: Box::new(expr),
                subscript: Box::new(subscript),
            });
            expr = make_expr(parser, kind, loc);
        } else if parser.check(&Token::Inc) || parser.check(&Token::Dec) {
            if !expr.is_lvalue() {
                return Err(parser.error("Operand of postfix operator must be assignable"));
            }
            let op = if parser.match_token(&Token::Inc) {
                PostfixOp::Inc
            } else {
                parser.advance();
                PostfixOp::Dec
            };
            let kind = ExprKind::Postfix(PostfixExpr {
                op,
                operand: Box::new(expr),
            });
            expr = make_expr(parser, kind, loc);
        } else {
            break;
        }
    }

    Ok(expr)
}

/// 解析实参列表（不含括号）
pub fn parse_arguments(parser: &mut Parser) -> DecafResult<Vec<Expr>> {
    let mut args = Vec::new();

    if !parser.check(&Token::RParen) {
        loop {
            args.push(parse_expression(parser)?);
            if !parser.match_token(&Token::Comma) {
                break;
            }
        }
    }

    Ok(args)
}

/// 解析基本表达式
pub fn parse_primary(parser: &mut Parser) -> DecafResult<Expr> {
    let loc = parser.current_loc();

    let kind = match parser.current_token().clone() {
        Token::IntConstant(value) => {
            parser.advance();
            ExprKind::Literal(LiteralValue::Int(value))
        }
        Token::DoubleConstant(value) => {
            parser.advance();
            ExprKind::Literal(LiteralValue::Double(value))
        }
        Token::StringConstant(value) => {
            parser.advance();
            ExprKind::Literal(LiteralValue::String(value))
        }
        Token::True => {
            parser.advance();
            ExprKind::Literal(LiteralValue::Bool(true))
        }
        Token::False => {
            parser.advance();
            ExprKind::Literal(LiteralValue::Bool(false))
        }
        Token::Null => {
            parser.advance();
            ExprKind::Literal(LiteralValue::Null)
        }
        Token::This => {
            parser.advance();
            ExprKind::This
        }
        Token::LParen => {
            parser.advance();
            let expr = parse_expression(parser)?;
            parser.consume(&Token::RParen, "Expected ')' after expression")?;
            return Ok(expr);
        }
        Token::ReadInteger => {
            parser.advance();
            parser.consume(&Token::LParen, "Expected '(' after 'ReadInteger'")?;
            parser.consume(&Token::RParen, "Expected ')' after 'ReadInteger('")?;
            ExprKind::ReadInteger
        }
        Token::ReadLine => {
            parser.advance();
            parser.consume(&Token::LParen, "Expected '(' after 'ReadLine'")?;
            parser.consume(&Token::RParen, "Expected ')' after 'ReadLine('")?;
            ExprKind::ReadLine
        }
        Token::New => {
            parser.advance();
            let class = parser.consume_identifier("Expected class name after 'new'")?;
            ExprKind::New(class)
        }
        Token::NewArray => {
            parser.advance();
            parser.consume(&Token::LParen, "Expected '(' after 'NewArray'")?;
            let size = parse_expression(parser)?;
            parser.consume(&Token::Comma, "Expected ',' after array size")?;
            let elem_type = parse_type(parser)?;
            parser.consume(&Token::RParen, "Expected ')' after element type")?;
            ExprKind::NewArray(NewArrayExpr {
                size: Box::new(size),
                elem_type,
            })
        }
        Token::Identifier(_) => {
            let field = parser.consume_identifier("Expected identifier")?;
            if parser.match_token(&Token::LParen) {
                let args = parse_arguments(parser)?;
                parser.consume(&Token::RParen, "Expected ')' after arguments")?;
                ExprKind::Call(CallExpr {
                    base: None,
                    field,
                    args,
                })
            } else {
                ExprKind::FieldAccess(FieldAccessExpr { base: None, field })
            }
        }
        _ => return Err(parser.error("Expected expression")),
    };

    Ok(make_expr(parser, kind, loc))
}
