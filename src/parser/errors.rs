//! Parser error diagnostics

use crate::common::Span;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// A parser error with source context
#[derive(Debug, Error, Diagnostic)]
pub enum ParserError {
    #[error("Expected {expected}, found {found}")]
    #[diagnostic(code(nqpv::parse::unexpected))]
    UnexpectedToken {
        #[label("{context}")]
        span: SourceSpan,
        expected: String,
        found: String,
        context: String,
    },

    #[error("Unexpected end of input: expected {expected}")]
    #[diagnostic(code(nqpv::parse::eof))]
    UnexpectedEof { expected: String },

    #[error("A qubit initialization must assign the literal 0")]
    #[diagnostic(code(nqpv::parse::init), help("write `[q1 q2] := 0`"))]
    BadInit {
        #[label("expected `0` here")]
        span: SourceSpan,
    },

    #[error("A proof term must open with a precondition and close with a postcondition")]
    #[diagnostic(code(nqpv::parse::proof), help("write `proof [q] : {{ P[q] }}; <body>; {{ Q[q] }}`"))]
    MalformedProof {
        #[label("in this proof")]
        span: SourceSpan,
    },

    #[error("A nondeterministic choice needs at least two branches")]
    #[diagnostic(code(nqpv::parse::choice))]
    SingleBranchChoice {
        #[label("only one branch")]
        span: SourceSpan,
    },

    #[error("Invalid setting value `{text}`")]
    #[diagnostic(code(nqpv::parse::setting), help("settings take a number or `true`/`false`"))]
    BadSettingValue {
        #[label("here")]
        span: SourceSpan,
        text: String,
    },
}

impl ParserError {
    pub fn unexpected(expected: impl Into<String>, found: &str, span: Span, context: impl Into<String>) -> Self {
        ParserError::UnexpectedToken {
            span: span.source_span(),
            expected: expected.into(),
            found: format!("`{}`", found),
            context: context.into(),
        }
    }
}
