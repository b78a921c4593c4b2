//! Token definitions for the verification language lexer

use crate::common::Span;
use logos::Logos;
use serde::{Deserialize, Serialize};

/// A token with its kind, span, and text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

/// Token kinds recognized by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Logos, Serialize, Deserialize)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
pub enum TokenKind {
    // Keywords
    #[token("def")]
    Def,
    #[token("show")]
    Show,
    #[token("save")]
    Save,
    #[token("setting")]
    Setting,
    #[token("load")]
    Load,
    #[token("proof")]
    Proof,
    #[token("scope")]
    Scope,
    #[token("skip")]
    Skip,
    #[token("abort")]
    Abort,
    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("end")]
    End,
    #[token("inv")]
    Inv,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // Punctuation
    #[token(":=")]
    ColonEq,
    #[token("*=")]
    StarEq,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token("#")]
    Hash,
    #[token(".")]
    Dot,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,

    // Literals
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?|[0-9]+[eE][+-]?[0-9]+")]
    FloatLit,
    #[regex(r"[0-9]+")]
    IntLit,
    #[regex(r#""[^"]*""#)]
    StringLit,

    Eof,
}

impl TokenKind {
    /// Human-readable description used in parser error messages
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Def => "`def`",
            TokenKind::Show => "`show`",
            TokenKind::Save => "`save`",
            TokenKind::Setting => "`setting`",
            TokenKind::Load => "`load`",
            TokenKind::Proof => "`proof`",
            TokenKind::Scope => "`scope`",
            TokenKind::Skip => "`skip`",
            TokenKind::Abort => "`abort`",
            TokenKind::If => "`if`",
            TokenKind::Then => "`then`",
            TokenKind::Else => "`else`",
            TokenKind::While => "`while`",
            TokenKind::Do => "`do`",
            TokenKind::End => "`end`",
            TokenKind::Inv => "`inv`",
            TokenKind::True => "`true`",
            TokenKind::False => "`false`",
            TokenKind::ColonEq => "`:=`",
            TokenKind::StarEq => "`*=`",
            TokenKind::Colon => "`:`",
            TokenKind::Semi => "`;`",
            TokenKind::Hash => "`#`",
            TokenKind::Dot => "`.`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::Ident => "identifier",
            TokenKind::FloatLit => "float literal",
            TokenKind::IntLit => "integer literal",
            TokenKind::StringLit => "string literal",
            TokenKind::Eof => "end of input",
        }
    }
}
