//! 类型解析

use crate::ast::TypeRef;
use crate::error::DecafResult;
use crate::lexer::Token;
use crate::types::Type;
use super::Parser;

/// 解析类型：基本类型或类名，后接任意个 `[]`
pub fn parse_type(parser: &mut Parser) -> DecafResult<TypeRef> {
    let loc = parser.current_loc();

    let mut ty = match parser.current_token() {
        Token::Int => Type::Int,
        Token::Double => Type::Double,
        Token::Bool => Type::Bool,
        Token::String => Type::String,
        Token::Identifier(name) => Type::Named(name.clone()),
        _ => return Err(parser.error("Expected type")),
    };
    parser.advance();

    while parser.check(&Token::LBracket) && matches!(parser.peek_token(1), Token::RBracket) {
        parser.advance();
        parser.advance();
        ty = Type::Array(Box::new(ty));
    }

    Ok(TypeRef::new(ty, loc))
}

/// 解析返回类型（允许 void）
pub fn parse_return_type(parser: &mut Parser) -> DecafResult<TypeRef> {
    let loc = parser.current_loc();
    if parser.match_token(&Token::Void) {
        Ok(TypeRef::new(Type::Void, loc))
    } else {
        parse_type(parser)
    }
}

/// 是否是基本类型关键字
pub fn is_primitive_type_token(parser: &Parser) -> bool {
    matches!(
        parser.current_token(),
        Token::Int | Token::Double | Token::Bool | Token::String
    )
}

/// 语句块中判断当前位置是否开始一个变量声明：
/// `int x`、`Foo x`、`Foo[] x`、`int[][] x`
pub fn starts_var_decl(parser: &Parser) -> bool {
    if is_primitive_type_token(parser) {
        return true;
    }

    if !matches!(parser.current_token(), Token::Identifier(_)) {
        return false;
    }

    match parser.peek_token(1) {
        Token::Identifier(_) => true,
        Token::LBracket => matches!(parser.peek_token(2), Token::RBracket),
        _ => false,
    }
}
