//! Resolved programs and proof terms
//!
//! The resolver turns surface proof expressions into typed statement trees:
//! every operator reference is replaced by an operator value plus a
//! placement, every qubit name is checked against the enclosing register,
//! and role requirements (unitary, Hermitian predicate, measurement pair)
//! are validated.

use crate::ast::{self, Ident, PredItem, ProofExpr, StmtAst};
use crate::common::{StmtId, StmtIds};
use crate::operators::{Operator, OperatorError};
use crate::predicate::format_label;
use crate::scope::{Binding, Scope, ScopeError};
use miette::{Diagnostic, SourceSpan};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Semantic analysis error
#[derive(Error, Debug, Diagnostic)]
pub enum SemanticError {
    #[error("Undefined name '{name}'")]
    #[diagnostic(code(nqpv::semantic::undefined))]
    Undefined {
        name: String,
        #[label("not found in scope")]
        span: SourceSpan,
    },

    #[error("'{name}' is bound to a {found}, but a {expected} is required here")]
    #[diagnostic(code(nqpv::semantic::kind))]
    WrongKind {
        name: String,
        expected: &'static str,
        found: &'static str,
        #[label("used here")]
        span: SourceSpan,
    },

    #[error("Duplicate qubit '{qubit}' in a placement")]
    #[diagnostic(code(nqpv::semantic::duplicate_qubit))]
    DuplicateQubit {
        qubit: String,
        #[label("repeated here")]
        span: SourceSpan,
    },

    #[error("Qubit '{qubit}' does not appear in the proof register")]
    #[diagnostic(code(nqpv::semantic::unknown_qubit))]
    QubitNotInRegister {
        qubit: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("Operator '{op}' acts on {expected} qubit(s), but {found} were given")]
    #[diagnostic(code(nqpv::semantic::arity))]
    QubitCountMismatch {
        op: String,
        expected: usize,
        found: usize,
        #[label("placement here")]
        span: SourceSpan,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] OperatorError),
}

impl SemanticError {
    fn from_scope(err: ScopeError, span: SourceSpan) -> Self {
        match err {
            ScopeError::Undefined { name } => SemanticError::Undefined { name, span },
            ScopeError::NotAScope { name } => SemanticError::WrongKind {
                name,
                expected: "scope",
                found: "value",
                span,
            },
            other => SemanticError::Undefined {
                name: other.to_string(),
                span,
            },
        }
    }
}

/// A resolved operator reference at a placement, as written in the program
#[derive(Clone)]
pub struct OpRef {
    pub name: String,
    pub op: Rc<Operator>,
    pub qubits: Vec<String>,
}

impl OpRef {
    pub fn label(&self) -> String {
        format_label(&self.name, &self.qubits)
    }
}

/// A resolved element of an assertion, `H[q1 q2]`
#[derive(Clone)]
pub struct PredicateItem {
    pub name: String,
    pub op: Rc<Operator>,
    pub qubits: Vec<String>,
}

impl PredicateItem {
    pub fn label(&self) -> String {
        format_label(&self.name, &self.qubits)
    }
}

/// A predicate bound by `def P := { ... } end`
pub struct NamedPredicate {
    pub items: Vec<PredicateItem>,
}

impl fmt::Display for NamedPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for item in &self.items {
            write!(f, "{} ", item.label())?;
        }
        write!(f, "}}")
    }
}

/// A resolved statement
pub struct Stmt {
    pub id: StmtId,
    pub kind: StmtKind,
}

/// Statement forms; measurement outcome 0 guards the `then` branch of an
/// `if` and the body (continue) of a `while`
pub enum StmtKind {
    Skip,
    Abort,
    Init { qubits: Vec<String> },
    Unitary { op: OpRef },
    If {
        meas: OpRef,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    While {
        inv: Vec<PredicateItem>,
        meas: OpRef,
        body: Vec<Stmt>,
    },
    Choice { branches: Vec<Vec<Stmt>> },
    Assert { items: Vec<PredicateItem> },
}

impl Stmt {
    /// One-line rendering for proof outlines
    pub fn summary(&self) -> String {
        match &self.kind {
            StmtKind::Skip => "skip".to_string(),
            StmtKind::Abort => "abort".to_string(),
            StmtKind::Init { qubits } => format!("[{}] :=0", qubits.join(" ")),
            StmtKind::Unitary { op } => format!("[{}] *= {}", op.qubits.join(" "), op.name),
            StmtKind::If { meas, .. } => format!("if {} then ... else ... end", meas.label()),
            StmtKind::While { meas, .. } => format!("while {} do ... end", meas.label()),
            StmtKind::Choice { branches } => {
                let inner = vec!["..."; branches.len()].join(" # ");
                format!("( {} )", inner)
            }
            StmtKind::Assert { items } => {
                let inner = items
                    .iter()
                    .map(|i| i.label())
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{{ {} }}", inner)
            }
        }
    }
}

/// Does the sequence contain a while loop anywhere?
pub fn contains_while(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|s| match &s.kind {
        StmtKind::While { .. } => true,
        StmtKind::If {
            then_body,
            else_body,
            ..
        } => contains_while(then_body) || contains_while(else_body),
        StmtKind::Choice { branches } => branches.iter().any(|b| contains_while(b)),
        _ => false,
    })
}

/// A resolved proof term
pub struct ProofTerm {
    pub register: Vec<String>,
    pub pre: Vec<PredicateItem>,
    pub body: Vec<Stmt>,
    pub post: Vec<PredicateItem>,
}

/// Resolve a surface proof expression against a scope
pub fn resolve_proof(expr: &ProofExpr, scope: &Scope) -> Result<ProofTerm, SemanticError> {
    let register = resolve_register(&expr.register)?;
    let mut ids = StmtIds::new();
    let pre = resolve_predicate(&expr.pre, Some(&register), scope)?;
    let post = resolve_predicate(&expr.post, Some(&register), scope)?;
    let body = resolve_body(&expr.body, &register, scope, &mut ids)?;
    Ok(ProofTerm {
        register,
        pre,
        body,
        post,
    })
}

/// Resolve the elements of an assertion. When a register is given,
/// placements must stay inside it.
pub fn resolve_predicate(
    items: &[PredItem],
    register: Option<&[String]>,
    scope: &Scope,
) -> Result<Vec<PredicateItem>, SemanticError> {
    let eps = scope.settings().eps;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let (name, op) = lookup_operator(&item.op, scope)?;
        let qubits = resolve_placement(&item.qubits, register)?;
        let span = ast::path_span(&item.op).source_span();
        check_arity(&name, &op, qubits.len(), span)?;
        op.ensure_hermitian_predicate(&name, eps)?;
        out.push(PredicateItem { name, op, qubits });
    }
    Ok(out)
}

fn resolve_register(idents: &[Ident]) -> Result<Vec<String>, SemanticError> {
    let mut names: Vec<String> = Vec::with_capacity(idents.len());
    for id in idents {
        if names.contains(&id.text) {
            return Err(SemanticError::DuplicateQubit {
                qubit: id.text.clone(),
                span: id.span.source_span(),
            });
        }
        names.push(id.text.clone());
    }
    Ok(names)
}

fn resolve_placement(
    idents: &[Ident],
    register: Option<&[String]>,
) -> Result<Vec<String>, SemanticError> {
    let mut names: Vec<String> = Vec::with_capacity(idents.len());
    for id in idents {
        if names.contains(&id.text) {
            return Err(SemanticError::DuplicateQubit {
                qubit: id.text.clone(),
                span: id.span.source_span(),
            });
        }
        if let Some(register) = register {
            if !register.contains(&id.text) {
                return Err(SemanticError::QubitNotInRegister {
                    qubit: id.text.clone(),
                    span: id.span.source_span(),
                });
            }
        }
        names.push(id.text.clone());
    }
    Ok(names)
}

fn lookup_operator(
    path: &[Ident],
    scope: &Scope,
) -> Result<(String, Rc<Operator>), SemanticError> {
    let name = ast::path_text(path);
    let span = ast::path_span(path).source_span();
    let segments: Vec<String> = path.iter().map(|i| i.text.clone()).collect();
    let binding = scope
        .resolve_path(&segments)
        .map_err(|e| SemanticError::from_scope(e, span))?;
    match binding {
        Binding::Operator(op) => Ok((name, op)),
        other => Err(SemanticError::WrongKind {
            name,
            expected: "operator",
            found: other.kind(),
            span,
        }),
    }
}

fn check_arity(
    name: &str,
    op: &Operator,
    found: usize,
    span: SourceSpan,
) -> Result<(), SemanticError> {
    let expected = op.qubits();
    if expected != found {
        return Err(SemanticError::QubitCountMismatch {
            op: name.to_string(),
            expected,
            found,
            span,
        });
    }
    Ok(())
}

fn resolve_body(
    stmts: &[StmtAst],
    register: &[String],
    scope: &Scope,
    ids: &mut StmtIds,
) -> Result<Vec<Stmt>, SemanticError> {
    stmts
        .iter()
        .map(|s| resolve_stmt(s, register, scope, ids))
        .collect()
}

fn resolve_stmt(
    stmt: &StmtAst,
    register: &[String],
    scope: &Scope,
    ids: &mut StmtIds,
) -> Result<Stmt, SemanticError> {
    let eps = scope.settings().eps;
    let id = ids.fresh();
    let kind = match stmt {
        StmtAst::Skip { .. } => StmtKind::Skip,
        StmtAst::Abort { .. } => StmtKind::Abort,
        StmtAst::Init { qubits, .. } => StmtKind::Init {
            qubits: resolve_placement(qubits, Some(register))?,
        },
        StmtAst::Unitary { qubits, op, .. } => {
            let (name, value) = lookup_operator(op, scope)?;
            let qubits = resolve_placement(qubits, Some(register))?;
            let span = ast::path_span(op).source_span();
            check_arity(&name, &value, qubits.len(), span)?;
            value.ensure_unitary(&name, eps)?;
            StmtKind::Unitary {
                op: OpRef {
                    name,
                    op: value,
                    qubits,
                },
            }
        }
        StmtAst::If {
            meas,
            meas_qubits,
            then_body,
            else_body,
            ..
        } => {
            let meas = resolve_measurement(meas, meas_qubits, register, scope)?;
            StmtKind::If {
                meas,
                then_body: resolve_body(then_body, register, scope, ids)?,
                else_body: resolve_body(else_body, register, scope, ids)?,
            }
        }
        StmtAst::While {
            inv,
            meas,
            meas_qubits,
            body,
            ..
        } => {
            let meas = resolve_measurement(meas, meas_qubits, register, scope)?;
            StmtKind::While {
                inv: resolve_predicate(inv, Some(register), scope)?,
                meas,
                body: resolve_body(body, register, scope, ids)?,
            }
        }
        StmtAst::Choice { branches, .. } => StmtKind::Choice {
            branches: branches
                .iter()
                .map(|b| resolve_body(b, register, scope, ids))
                .collect::<Result<_, _>>()?,
        },
        StmtAst::Assert { items, .. } => StmtKind::Assert {
            items: resolve_predicate(items, Some(register), scope)?,
        },
    };
    Ok(Stmt { id, kind })
}

fn resolve_measurement(
    path: &[Ident],
    qubits: &[Ident],
    register: &[String],
    scope: &Scope,
) -> Result<OpRef, SemanticError> {
    let (name, op) = lookup_operator(path, scope)?;
    let qubits = resolve_placement(qubits, Some(register))?;
    let span = ast::path_span(path).source_span();
    check_arity(&name, &op, qubits.len(), span)?;
    op.ensure_measurement(&name)?;
    Ok(OpRef { name, op, qubits })
}
