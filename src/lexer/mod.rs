//! Lexer for the verification language
//!
//! Tokenizes source code into a stream of tokens using the Logos library.

pub mod tokens;

pub use tokens::{Token, TokenKind};

use crate::common::Span;
use logos::Logos;
use miette::Result;

/// Lex source code into tokens
pub fn lex(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let kind = match result {
            Ok(kind) => kind,
            Err(_) => {
                return Err(miette::miette!(
                    "Unexpected character at position {}: {:?}",
                    span.start,
                    &source[span.clone()]
                ));
            }
        };

        tokens.push(Token {
            kind,
            span: Span::new(span.start, span.end),
            text: source[span].to_string(),
        });
    }

    // Add EOF token
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(source.len(), source.len()),
        text: String::new(),
    });

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_def() {
        let tokens = lex("def pf := proof [q] :").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Def);
        assert_eq!(tokens[1].kind, TokenKind::Ident);
        assert_eq!(tokens[1].text, "pf");
        assert_eq!(tokens[2].kind, TokenKind::ColonEq);
        assert_eq!(tokens[3].kind, TokenKind::Proof);
        assert_eq!(tokens[4].kind, TokenKind::LBracket);
        assert_eq!(tokens[5].kind, TokenKind::Ident);
        assert_eq!(tokens[6].kind, TokenKind::RBracket);
        assert_eq!(tokens[7].kind, TokenKind::Colon);
        assert_eq!(tokens[8].kind, TokenKind::Eof);
    }

    #[test]
    fn test_lex_statements() {
        let tokens = lex("[q q1] :=0; q *= H; skip").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::LBracket);
        assert_eq!(tokens[3].kind, TokenKind::RBracket);
        assert_eq!(tokens[4].kind, TokenKind::ColonEq);
        assert_eq!(tokens[5].kind, TokenKind::IntLit);
        assert_eq!(tokens[5].text, "0");
        assert_eq!(tokens[6].kind, TokenKind::Semi);
        assert_eq!(tokens[8].kind, TokenKind::StarEq);
        assert_eq!(tokens[11].kind, TokenKind::Skip);
    }

    #[test]
    fn test_lex_keywords_vs_idents() {
        // Keywords embedded in longer names stay identifiers
        let tokens = lex("ifx while0 endq inv").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[1].kind, TokenKind::Ident);
        assert_eq!(tokens[2].kind, TokenKind::Ident);
        assert_eq!(tokens[3].kind, TokenKind::Inv);
    }

    #[test]
    fn test_lex_setting_values() {
        let tokens = lex("setting EPS := 1e-7 end").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Setting);
        assert_eq!(tokens[2].kind, TokenKind::ColonEq);
        assert_eq!(tokens[3].kind, TokenKind::FloatLit);
        assert_eq!(tokens[3].text, "1e-7");
        assert_eq!(tokens[4].kind, TokenKind::End);
    }

    #[test]
    fn test_lex_string_and_comment() {
        let tokens = lex("load \"CX.json\" // oracle\nend").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Load);
        assert_eq!(tokens[1].kind, TokenKind::StringLit);
        assert_eq!(tokens[1].text, "\"CX.json\"");
        assert_eq!(tokens[2].kind, TokenKind::End);
    }

    #[test]
    fn test_lex_nondet() {
        let tokens = lex("( skip # q *= X )").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::LParen);
        assert_eq!(tokens[2].kind, TokenKind::Hash);
        assert_eq!(tokens[6].kind, TokenKind::RParen);
    }
}
