//! Backward predicate transformer
//!
//! Walks a resolved statement tree backwards, computing the weakest liberal
//! precondition of each statement with respect to a postcondition set. Every
//! new Hermitian is offered to the enclosing scope for naming, and every
//! computed set is clipped and deduplicated before it travels further.
//!
//! Measurement pairing: outcome operator 0 guards the `then` branch of an
//! `if` and the continue branch of a `while`; outcome operator 1 guards the
//! `else` branch and the loop exit.

use crate::common::StmtId;
use crate::linalg::{self, C64};
use crate::predicate::{format_label, PredicateError, PredicateSet};
use crate::program::{PredicateItem, Stmt, StmtKind};
use crate::scope::Scope;
use miette::Diagnostic;
use nalgebra::DMatrix;
use std::collections::HashMap;
use thiserror::Error;

/// Terminal failure during the backward walk
#[derive(Error, Debug, Diagnostic)]
pub enum WpFailure {
    #[error("The loop invariant is not preserved: '{uncovered}' is not entailed by the invariant")]
    #[diagnostic(
        code(nqpv::wp::invariant),
        help("the invariant must stay below the guarded combination of itself and the postcondition")
    )]
    InvariantNotPreserved { site: String, uncovered: String },

    #[error("The loop invariant does not secure the exit: '{uncovered}' is not covered on the exit branch")]
    #[diagnostic(code(nqpv::wp::invariant_exit))]
    InvariantExitFails { site: String, uncovered: String },

    #[error("The intermediate assertion does not entail the following precondition: '{uncovered}' is uncovered")]
    #[diagnostic(code(nqpv::wp::assertion))]
    AssertionNotEntailed { site: String, uncovered: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    IllFormed(#[from] PredicateError),
}

impl WpFailure {
    /// The statement where the proof failed
    pub fn site(&self) -> String {
        match self {
            WpFailure::InvariantNotPreserved { site, .. }
            | WpFailure::InvariantExitFails { site, .. }
            | WpFailure::AssertionNotEntailed { site, .. } => site.clone(),
            WpFailure::IllFormed(e) => e.to_string(),
        }
    }
}

/// Pre/post pair recorded for one statement
#[derive(Clone)]
pub struct StmtAnnotation {
    pub pre: PredicateSet,
    pub post: PredicateSet,
}

/// The backward walker. Stateless apart from the naming side effects on the
/// scope and the recorded annotations.
pub struct Transformer {
    scope: Scope,
    register: Vec<String>,
    /// computed pre/post per statement, for the proof outline
    pub annotations: HashMap<StmtId, StmtAnnotation>,
    /// names of intermediates bound during this run
    pub created_names: Vec<String>,
}

impl Transformer {
    pub fn new(scope: Scope, register: Vec<String>) -> Self {
        Self {
            scope,
            register,
            annotations: HashMap::new(),
            created_names: Vec::new(),
        }
    }

    fn eps(&self) -> f64 {
        self.scope.settings().eps
    }

    fn precision(&self) -> f64 {
        self.scope.settings().sdp_precision
    }

    /// Offer a computed Hermitian to the scope and return its display label
    fn offer(&mut self, mat: DMatrix<C64>) -> (String, DMatrix<C64>) {
        let (name, created) = self.scope.offer_operator(mat.clone());
        if created {
            self.created_names.push(name.clone());
        }
        (format_label(&name, &self.register), mat)
    }

    /// Canonicalize resolved assertion items over the register
    pub fn lift(&self, items: &[PredicateItem]) -> PredicateSet {
        PredicateSet::from_placed(
            &self.register,
            items.iter().map(|item| {
                let mat = item
                    .op
                    .ensure_hermitian_predicate(&item.name, self.scope.settings().eps)
                    .expect("predicate roles are validated during resolution")
                    .clone();
                (item.name.clone(), mat, item.qubits.clone())
            }),
            self.eps(),
        )
    }

    /// `wp` of a statement sequence: right fold over the statements
    pub fn wp_seq(&mut self, stmts: &[Stmt], post: PredicateSet) -> Result<PredicateSet, WpFailure> {
        let mut cur = post;
        for stmt in stmts.iter().rev() {
            cur = self.wp_stmt(stmt, cur)?;
        }
        Ok(cur)
    }

    fn wp_stmt(&mut self, stmt: &Stmt, post: PredicateSet) -> Result<PredicateSet, WpFailure> {
        let pre = self.apply_rule(stmt, &post)?;
        pre.clip(self.eps())?;
        self.annotations.insert(
            stmt.id,
            StmtAnnotation {
                pre: pre.clone(),
                post,
            },
        );
        Ok(pre)
    }

    fn apply_rule(&mut self, stmt: &Stmt, post: &PredicateSet) -> Result<PredicateSet, WpFailure> {
        let eps = self.eps();
        match &stmt.kind {
            StmtKind::Skip => Ok(post.clone()),

            StmtKind::Abort => {
                let eye = linalg::eye(self.register.len());
                let mut set = PredicateSet::empty(self.register.clone());
                let (label, mat) = self.offer(eye);
                set.push(label, mat, eps);
                Ok(set)
            }

            StmtKind::Init { qubits } => {
                let kraus: Vec<(DMatrix<C64>, DMatrix<C64>)> = qubits
                    .iter()
                    .map(|q| {
                        let place = vec![q.clone()];
                        (
                            linalg::extend(&linalg::ket0_proj(), &place, &self.register),
                            linalg::extend(&linalg::ket0_bra1(), &place, &self.register),
                        )
                    })
                    .collect();
                let mut set = PredicateSet::empty(self.register.clone());
                for e in post.iter() {
                    let mut mat = e.mat.clone();
                    for (k0, k1) in &kraus {
                        mat = linalg::sandwich(k0, &mat) + linalg::sandwich(k1, &mat);
                    }
                    let (label, mat) = self.offer(mat);
                    set.push(label, mat, eps);
                }
                Ok(set)
            }

            StmtKind::Unitary { op } => {
                let u = op
                    .op
                    .ensure_unitary(&op.name, eps)
                    .expect("unitary roles are validated during resolution");
                let u_ext = linalg::extend(u, &op.qubits, &self.register);
                let mut set = PredicateSet::empty(self.register.clone());
                for e in post.iter() {
                    let (label, mat) = self.offer(linalg::sandwich(&u_ext, &e.mat));
                    set.push(label, mat, eps);
                }
                Ok(set)
            }

            StmtKind::If {
                meas,
                then_body,
                else_body,
            } => {
                let (m0, m1) = self.extended_measurement(meas);
                let wp_then = self.wp_seq(then_body, post.clone())?;
                let wp_else = self.wp_seq(else_body, post.clone())?;
                let mut set = PredicateSet::empty(self.register.clone());
                for h0 in wp_then.iter() {
                    for h1 in wp_else.iter() {
                        let mat =
                            linalg::sandwich(&m0, &h0.mat) + linalg::sandwich(&m1, &h1.mat);
                        let (label, mat) = self.offer(mat);
                        set.push(label, mat, eps);
                    }
                }
                Ok(set)
            }

            StmtKind::While { inv, meas, body } => {
                let site = stmt.summary();
                let (m0, m1) = self.extended_measurement(meas);
                let j = self.lift(inv);

                // state one: the weakest precondition of the body
                let bwp = self.wp_seq(body, j.clone())?;

                // state two: preservation
                let mut combo = PredicateSet::empty(self.register.clone());
                for jp in bwp.iter() {
                    for q in post.iter() {
                        let mat =
                            linalg::sandwich(&m0, &jp.mat) + linalg::sandwich(&m1, &q.mat);
                        let (label, mat) = self.offer(mat);
                        combo.push(label, mat, eps);
                    }
                }
                combo.clip(eps)?;
                if let Err(uncovered) = j.entails(&combo, self.precision()) {
                    return Err(WpFailure::InvariantNotPreserved { site, uncovered });
                }

                // state three: the exit branch must reach the postcondition
                let mut exit = PredicateSet::empty(self.register.clone());
                for q in post.iter() {
                    let (label, mat) = self.offer(linalg::sandwich(&m1, &q.mat));
                    exit.push(label, mat, eps);
                }
                if let Err(uncovered) = exit.entails(&j, self.precision()) {
                    return Err(WpFailure::InvariantExitFails { site, uncovered });
                }

                Ok(j)
            }

            StmtKind::Choice { branches } => {
                let mut acc: Option<PredicateSet> = None;
                for branch in branches {
                    let wp = self.wp_seq(branch, post.clone())?;
                    acc = Some(match acc {
                        None => wp,
                        Some(prev) => prev.meet(&wp, eps),
                    });
                }
                Ok(acc.expect("choice statements have at least two branches"))
            }

            StmtKind::Assert { items } => {
                let site = stmt.summary();
                let r = self.lift(items);
                if let Err(uncovered) = r.entails(post, self.precision()) {
                    return Err(WpFailure::AssertionNotEntailed { site, uncovered });
                }
                Ok(r)
            }
        }
    }

    fn extended_measurement(&self, meas: &crate::program::OpRef) -> (DMatrix<C64>, DMatrix<C64>) {
        let (m0, m1) = meas
            .op
            .ensure_measurement(&meas.name)
            .expect("measurement roles are validated during resolution");
        (
            linalg::extend(m0, &meas.qubits, &self.register),
            linalg::extend(m1, &meas.qubits, &self.register),
        )
    }
}
