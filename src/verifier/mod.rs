//! Verification driver
//!
//! Drives the backward transformer over a proof term, collates the
//! intermediate predicates into a proof outline, and produces the final
//! verdict. Failures on loop-free programs are definitive; once a `while`
//! is involved the result may only be inconclusive.

use crate::common::StmtId;
use crate::predicate::PredicateSet;
use crate::program::{contains_while, ProofTerm, Stmt, StmtKind};
use crate::scope::Scope;
use crate::transformer::{StmtAnnotation, Transformer, WpFailure};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// The outcome of one verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Holds,
    DoesNotHold,
    Undetermined,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Holds => write!(f, "Property holds."),
            Verdict::DoesNotHold => write!(f, "Property does not hold."),
            Verdict::Undetermined => write!(
                f,
                "Property cannot be determined. A more suitable loop invariant may help."
            ),
        }
    }
}

/// What kind of failure ended the proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    InvariantFailure,
    AssertionFailure,
    EntailmentFailure,
    IllFormedPredicate,
}

/// The first failure site and its kind
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub kind: FailureKind,
    pub site: String,
    pub detail: String,
}

/// One `(statement, precondition, postcondition)` triple in program order
#[derive(Debug, Clone, Serialize)]
pub struct OutlineEntry {
    pub statement: String,
    pub pre: Vec<String>,
    pub post: Vec<String>,
}

/// Structured verification result
#[derive(Clone)]
pub struct VerificationResult {
    pub verdict: Verdict,
    pub outline: Vec<OutlineEntry>,
    pub diagnostics: Option<Diagnostics>,
    /// human-readable proof outline
    pub rendered: String,
}

/// A completed proof bound in a scope
pub struct ProofRecord {
    pub register: Vec<String>,
    pub result: VerificationResult,
}

/// Verify a resolved proof term against a scope
pub fn verify(proof: &ProofTerm, scope: &Scope) -> VerificationResult {
    let settings = scope.settings();
    if !settings.silent {
        tracing::info!("verification starts, computing weakest preconditions");
    }

    let mut tf = Transformer::new(scope.clone(), proof.register.clone());
    let pre = tf.lift(&proof.pre);
    let post = tf.lift(&proof.post);
    let looping = contains_while(&proof.body);

    let (verdict, diagnostics) = match tf.wp_seq(&proof.body, post.clone()) {
        Ok(computed) => match pre.entails(&computed, settings.sdp_precision) {
            Ok(()) => (Verdict::Holds, None),
            Err(uncovered) => {
                let verdict = if looping {
                    Verdict::Undetermined
                } else {
                    Verdict::DoesNotHold
                };
                (
                    verdict,
                    Some(Diagnostics {
                        kind: FailureKind::EntailmentFailure,
                        site: "proof precondition".to_string(),
                        detail: format!(
                            "'{}' is not entailed by the stated precondition {}",
                            uncovered, pre
                        ),
                    }),
                )
            }
        },
        Err(failure) => {
            let kind = match &failure {
                WpFailure::InvariantNotPreserved { .. } | WpFailure::InvariantExitFails { .. } => {
                    FailureKind::InvariantFailure
                }
                WpFailure::AssertionNotEntailed { .. } => FailureKind::AssertionFailure,
                WpFailure::IllFormed(_) => FailureKind::IllFormedPredicate,
            };
            let verdict = if looping {
                Verdict::Undetermined
            } else {
                Verdict::DoesNotHold
            };
            (
                verdict,
                Some(Diagnostics {
                    kind,
                    site: failure.site(),
                    detail: failure.to_string(),
                }),
            )
        }
    };

    let outline = collect_entries(proof, &tf.annotations, &pre, &post);
    let rendered = render_outline(proof, &tf.annotations, &pre, &post);

    // intermediates stay in the scope only when requested
    if !settings.opt_preserving {
        for name in &tf.created_names {
            scope.remove(name);
        }
    }

    if !settings.silent {
        tracing::info!(%verdict, "verification finished");
    }

    VerificationResult {
        verdict,
        outline,
        diagnostics,
        rendered,
    }
}

fn labels(set: &PredicateSet) -> Vec<String> {
    set.labels()
}

fn collect_entries(
    proof: &ProofTerm,
    ann: &HashMap<StmtId, StmtAnnotation>,
    pre: &PredicateSet,
    post: &PredicateSet,
) -> Vec<OutlineEntry> {
    let mut out = vec![OutlineEntry {
        statement: "proof".to_string(),
        pre: labels(pre),
        post: labels(post),
    }];
    collect_body(&proof.body, ann, &mut out);
    out
}

fn collect_body(
    stmts: &[Stmt],
    ann: &HashMap<StmtId, StmtAnnotation>,
    out: &mut Vec<OutlineEntry>,
) {
    for stmt in stmts {
        let (pre, post) = match ann.get(&stmt.id) {
            Some(a) => (labels(&a.pre), labels(&a.post)),
            None => (Vec::new(), Vec::new()),
        };
        out.push(OutlineEntry {
            statement: stmt.summary(),
            pre,
            post,
        });
        match &stmt.kind {
            StmtKind::If {
                then_body,
                else_body,
                ..
            } => {
                collect_body(then_body, ann, out);
                collect_body(else_body, ann, out);
            }
            StmtKind::While { body, .. } => collect_body(body, ann, out),
            StmtKind::Choice { branches } => {
                for b in branches {
                    collect_body(b, ann, out);
                }
            }
            _ => {}
        }
    }
}

/// Render the program interleaved with its computed preconditions
fn render_outline(
    proof: &ProofTerm,
    ann: &HashMap<StmtId, StmtAnnotation>,
    pre: &PredicateSet,
    post: &PredicateSet,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("proof [{}] :\n", proof.register.join(" ")));
    out.push_str(&format!("    {} ;\n\n", pre));
    render_body(&proof.body, ann, 1, &mut out);
    out.push_str(&format!("\n    {}\n", post));
    out
}

fn indent_str(depth: usize) -> String {
    "    ".repeat(depth)
}

fn render_body(
    stmts: &[Stmt],
    ann: &HashMap<StmtId, StmtAnnotation>,
    depth: usize,
    out: &mut String,
) {
    let ind = indent_str(depth);
    for (i, stmt) in stmts.iter().enumerate() {
        if let Some(a) = ann.get(&stmt.id) {
            out.push_str(&format!("{}{} ;\n", ind, a.pre));
        }
        match &stmt.kind {
            StmtKind::If {
                meas,
                then_body,
                else_body,
            } => {
                out.push_str(&format!("{}if {} then\n", ind, meas.label()));
                render_body(then_body, ann, depth + 1, out);
                out.push_str(&format!("{}else\n", ind));
                render_body(else_body, ann, depth + 1, out);
                out.push_str(&format!("{}end", ind));
            }
            StmtKind::While { inv, meas, body } => {
                let inv_text = inv
                    .iter()
                    .map(|i| i.label())
                    .collect::<Vec<_>>()
                    .join(" ");
                out.push_str(&format!("{}{{ inv: {} }} ;\n", ind, inv_text));
                out.push_str(&format!("{}while {} do\n", ind, meas.label()));
                render_body(body, ann, depth + 1, out);
                out.push_str(&format!("{}end", ind));
            }
            StmtKind::Choice { branches } => {
                out.push_str(&format!("{}(\n", ind));
                for (bi, b) in branches.iter().enumerate() {
                    if bi > 0 {
                        out.push_str(&format!("{}#\n", ind));
                    }
                    render_body(b, ann, depth + 1, out);
                }
                out.push_str(&format!("{})", ind));
            }
            _ => out.push_str(&format!("{}{}", ind, stmt.summary())),
        }
        if i + 1 < stmts.len() {
            out.push_str(" ;\n");
        } else {
            out.push('\n');
        }
    }
}
