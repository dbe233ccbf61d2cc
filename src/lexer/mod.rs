use logos::Logos;
use crate::error::{DecafResult, SourceLocation, lexer_error};

/// 标识符最大长度
pub const MAX_IDENT_LEN: usize = 31;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token {
    // 关键字
    #[token("void")]
    Void,
    #[token("int")]
    Int,
    #[token("double")]
    Double,
    #[token("bool")]
    Bool,
    #[token("string")]
    String,
    #[token("class")]
    Class,
    #[token("interface")]
    Interface,
    #[token("extends")]
    Extends,
    #[token("implements")]
    Implements,
    #[token("null")]
    Null,
    #[token("this")]
    This,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("return")]
    Return,
    #[token("break")]
    Break,
    #[token("new")]
    New,
    #[token("NewArray")]
    NewArray,
    #[token("Print")]
    Print,
    #[token("ReadInteger")]
    ReadInteger,
    #[token("ReadLine")]
    ReadLine,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // 标识符
    #[regex(r"[a-zA-Z][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // 字面量
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| u32::from_str_radix(&lex.slice()[2..], 16).ok().map(|v| v as i32))]
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i32>().ok())]
    IntConstant(i32),

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    DoubleConstant(f64),

    #[regex(r#""[^"\n]*""#, |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    StringConstant(String),

    // 运算符
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,
    #[token("=")]
    Assign,
    #[token("++")]
    Inc,
    #[token("--")]
    Dec,

    // 分隔符
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    /// 输入结束标记，由 [`Lexer::tokenize`] 追加
    Eof,
}

#[derive(Debug, Clone)]
pub struct TokenWithLocation {
    pub token: Token,
    pub loc: SourceLocation,
}

pub struct Lexer<'a> {
    source: &'a str,
    inner: logos::Lexer<'a, Token>,
    /// 每一行起始处的字节偏移
    line_starts: Vec<usize>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        Self {
            source,
            inner: Token::lexer(source),
            line_starts,
        }
    }

    fn location(&self, offset: usize) -> SourceLocation {
        let line_index = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        let column = self.source[self.line_starts[line_index]..offset].chars().count() + 1;
        SourceLocation::new(line_index + 1, column)
    }

    pub fn tokenize(&mut self) -> DecafResult<Vec<TokenWithLocation>> {
        let mut tokens = Vec::new();

        while let Some(token_result) = self.inner.next() {
            let span = self.inner.span();
            let loc = self.location(span.start);

            match token_result {
                Ok(Token::Identifier(name)) if name.len() > MAX_IDENT_LEN => {
                    return Err(lexer_error(
                        loc.line,
                        loc.column,
                        format!("Identifier too long: \"{}\"", name)
                    ));
                }
                Ok(token) => tokens.push(TokenWithLocation { token, loc }),
                Err(_) => {
                    let error_text = &self.source[span];
                    let message = if error_text.starts_with('"') {
                        format!("Unterminated string constant: {}", error_text)
                    } else if error_text.starts_with(|c: char| c.is_ascii_digit()) {
                        format!("Integer constant out of range: {}", error_text)
                    } else {
                        format!("Unrecognized char: '{}'", error_text)
                    };
                    return Err(lexer_error(loc.line, loc.column, message));
                }
            }
        }

        let eof = self.location(self.source.len());
        tokens.push(TokenWithLocation { token: Token::Eof, loc: eof });

        Ok(tokens)
    }
}

pub fn lex(source: &str) -> DecafResult<Vec<TokenWithLocation>> {
    let mut lexer = Lexer::new(source);
    lexer.tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecafError;

    fn kinds(source: &str) -> Vec<Token> {
        lex(source).unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("class Foo extends Bar implements Baz"),
            vec![
                Token::Class,
                Token::Identifier("Foo".into()),
                Token::Extends,
                Token::Identifier("Bar".into()),
                Token::Implements,
                Token::Identifier("Baz".into()),
                Token::Eof,
            ]
        );
        assert_eq!(kinds("NewArray NewArrays"), vec![
            Token::NewArray,
            Token::Identifier("NewArrays".into()),
            Token::Eof,
        ]);
    }

    #[test]
    fn test_constants() {
        assert_eq!(
            kinds("42 0x1F 3.5 1.5E2 \"hi\" true"),
            vec![
                Token::IntConstant(42),
                Token::IntConstant(31),
                Token::DoubleConstant(3.5),
                Token::DoubleConstant(150.0),
                Token::StringConstant("hi".into()),
                Token::True,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_locations_skip_comments() {
        let tokens = lex("int a;\n/* two\nlines */ bool b; // tail\n  x").unwrap();
        let b = tokens.iter().find(|t| t.token == Token::Identifier("b".into())).unwrap();
        assert_eq!(b.loc, SourceLocation::new(3, 15));
        let x = tokens.iter().find(|t| t.token == Token::Identifier("x".into())).unwrap();
        assert_eq!(x.loc, SourceLocation::new(4, 3));
    }

    #[test]
    fn test_operators_prefer_longest_match() {
        assert_eq!(
            kinds("<= == != ++ -- && ||"),
            vec![
                Token::Le,
                Token::EqEq,
                Token::NotEq,
                Token::Inc,
                Token::Dec,
                Token::AndAnd,
                Token::OrOr,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_errors() {
        assert!(matches!(lex("int @;"), Err(DecafError::Lexer { line: 1, column: 5, .. })));
        assert!(matches!(lex("\"open"), Err(DecafError::Lexer { .. })));
        let long = "a".repeat(MAX_IDENT_LEN + 1);
        assert!(matches!(lex(&long), Err(DecafError::Lexer { .. })));
    }
}
