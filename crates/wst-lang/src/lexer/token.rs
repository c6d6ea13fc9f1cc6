use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;

use crate::number::Number;
use crate::range::Range;

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Token {
    pub range: Range,
    pub kind: TokenKind,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum TokenKind {
    And,
    Bang,
    BoolLiteral(bool),
    Colon,
    ColonColon,
    Comma,
    Def,
    Dot,
    Else,
    Eof,
    EqEq,
    FloatLiteral(Number),
    Gt,
    Gte,
    Ident(SmolStr),
    If,
    IntLiteral(i64),
    LBrace,
    LBracket,
    LParen,
    Lt,
    Lte,
    Minus,
    NeEq,
    Or,
    Plus,
    Question,
    RBrace,
    RBracket,
    RParen,
    SemiColon,
    Slash,
    Star,
    StringLiteral(String),
    Then,
    Var,
    Variable(SmolStr),
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.kind)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match &self {
            TokenKind::And => write!(f, "and"),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::BoolLiteral(b) => write!(f, "{}", b),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::ColonColon => write!(f, "::"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Def => write!(f, "def"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Else => write!(f, "else"),
            TokenKind::Eof => write!(f, ""),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::FloatLiteral(n) => write!(f, "{}", n),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Gte => write!(f, ">="),
            TokenKind::Ident(ident) => write!(f, "{}", ident),
            TokenKind::If => write!(f, "if"),
            TokenKind::IntLiteral(i) => write!(f, "{}", i),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::LParen => write!(f, "("),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Lte => write!(f, "<="),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::NeEq => write!(f, "!="),
            TokenKind::Or => write!(f, "or"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Question => write!(f, "?"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::SemiColon => write!(f, ";"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::StringLiteral(s) => write!(f, "{:?}", s),
            TokenKind::Then => write!(f, "then"),
            TokenKind::Var => write!(f, "var"),
            TokenKind::Variable(name) => write!(f, "{}", name),
        }
    }
}
