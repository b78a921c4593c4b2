//! Surface abstract syntax for the verification language
//!
//! Produced by the parser; names are unresolved identifier paths. The
//! resolver in `crate::program` turns proof expressions into typed statement
//! trees with operator values attached.

use crate::common::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An identifier with its source span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ident {
    pub text: String,
    pub span: Span,
}

/// A dotted path, e.g. `lib.P0`
pub type IdentPath = Vec<Ident>;

/// Render a path as written
pub fn path_text(path: &[Ident]) -> String {
    path.iter()
        .map(|i| i.text.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

/// Span covering a whole path
pub fn path_span(path: &[Ident]) -> Span {
    let first = path.first().map(|i| i.span).unwrap_or_default();
    let last = path.last().map(|i| i.span).unwrap_or_default();
    first.join(last)
}

/// A parsed source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAst {
    pub commands: Vec<Command>,
}

/// A top-level command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Def {
        name: Ident,
        expr: Expr,
    },
    Show {
        path: IdentPath,
        span: Span,
    },
    Save {
        path: IdentPath,
        file: String,
        span: Span,
    },
    Setting {
        key: Ident,
        value: SettingLit,
        span: Span,
    },
}

/// Literal value in a `setting` command
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SettingLit {
    Float(f64),
    Bool(bool),
}

/// Right-hand side of a definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Load { file: String, span: Span },
    Proof(Box<ProofExpr>),
    Predicate(Vec<PredItem>),
    Scope(Vec<Command>),
}

/// A proof term: register, precondition, body, postcondition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofExpr {
    pub register: Vec<Ident>,
    pub pre: Vec<PredItem>,
    pub body: Vec<StmtAst>,
    pub post: Vec<PredItem>,
    pub span: Span,
}

/// One placed operator reference inside an assertion, `H[q1 q2]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredItem {
    pub op: IdentPath,
    pub qubits: Vec<Ident>,
}

/// A surface statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtAst {
    Skip {
        span: Span,
    },
    Abort {
        span: Span,
    },
    Init {
        qubits: Vec<Ident>,
        span: Span,
    },
    Unitary {
        qubits: Vec<Ident>,
        op: IdentPath,
        span: Span,
    },
    If {
        meas: IdentPath,
        meas_qubits: Vec<Ident>,
        then_body: Vec<StmtAst>,
        else_body: Vec<StmtAst>,
        span: Span,
    },
    While {
        inv: Vec<PredItem>,
        meas: IdentPath,
        meas_qubits: Vec<Ident>,
        body: Vec<StmtAst>,
        span: Span,
    },
    Choice {
        branches: Vec<Vec<StmtAst>>,
        span: Span,
    },
    Assert {
        items: Vec<PredItem>,
        span: Span,
    },
}

impl StmtAst {
    pub fn span(&self) -> Span {
        match self {
            StmtAst::Skip { span }
            | StmtAst::Abort { span }
            | StmtAst::Init { span, .. }
            | StmtAst::Unitary { span, .. }
            | StmtAst::If { span, .. }
            | StmtAst::While { span, .. }
            | StmtAst::Choice { span, .. }
            | StmtAst::Assert { span, .. } => *span,
        }
    }
}

impl fmt::Display for PredItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]",
            path_text(&self.op),
            self.qubits
                .iter()
                .map(|q| q.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        )
    }
}
