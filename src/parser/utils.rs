//! 解析器辅助函数

use crate::ast::Identifier;
use crate::error::{DecafError, DecafResult, SourceLocation, parser_error};
use crate::lexer::Token;
use super::Parser;

static EOF_TOKEN: Token = Token::Eof;

pub fn is_at_end(parser: &Parser) -> bool {
    matches!(current_token(parser), Token::Eof)
}

pub fn current_token(parser: &Parser) -> &Token {
    peek_token(parser, 0)
}

/// 向前看 offset 个令牌；越界时返回末尾的 Eof
pub fn peek_token(parser: &Parser, offset: usize) -> &Token {
    let index = (parser.pos + offset).min(parser.tokens.len().saturating_sub(1));
    parser
        .tokens
        .get(index)
        .map(|t| &t.token)
        .unwrap_or(&EOF_TOKEN)
}

pub fn current_loc(parser: &Parser) -> SourceLocation {
    let index = parser.pos.min(parser.tokens.len().saturating_sub(1));
    parser.tokens.get(index).map(|t| t.loc).unwrap_or_default()
}

pub fn advance(parser: &mut Parser) -> &Token {
    if is_at_end(parser) {
        return current_token(parser);
    }
    parser.pos += 1;
    &parser.tokens[parser.pos - 1].token
}

pub fn check(parser: &Parser, token: &Token) -> bool {
    std::mem::discriminant(current_token(parser)) == std::mem::discriminant(token)
}

pub fn match_token(parser: &mut Parser, token: &Token) -> bool {
    if check(parser, token) {
        advance(parser);
        true
    } else {
        false
    }
}

pub fn consume<'p>(parser: &'p mut Parser, token: &Token, message: &str) -> DecafResult<&'p Token> {
    if check(parser, token) {
        Ok(advance(parser))
    } else {
        Err(error(parser, message))
    }
}

pub fn consume_identifier(parser: &mut Parser, message: &str) -> DecafResult<Identifier> {
    let loc = current_loc(parser);
    if let Token::Identifier(name) = current_token(parser) {
        let name = name.clone();
        advance(parser);
        Ok(Identifier::new(name, loc))
    } else {
        Err(error(parser, message))
    }
}

pub fn error(parser: &Parser, message: &str) -> DecafError {
    let loc = current_loc(parser);
    parser_error(
        loc.line,
        loc.column,
        format!("{} (found {:?})", message, current_token(parser)),
    )
}
