//! NQPV: a verifier for nondeterministic quantum programs
//!
//! Checks partial-correctness Hoare judgements for a small quantum
//! programming language with nondeterministic choice. Assertions are finite
//! sets of Hermitian operators bounded by the identity; programs are
//! verified by computing weakest liberal preconditions backwards and
//! deciding Loewner-order entailments through a semidefinite feasibility
//! query.
//!
//! # Architecture
//!
//! ```text
//! Source -> Lexer -> Parser -> AST -> Resolver -> Backward transformer -> Verdict
//! ```
//!
//! # Example
//!
//! ```text
//! def pf := proof [q] :
//!     { P0[q] };
//!     q *= X;
//!     { P1[q] }
//! end
//! ```

pub mod ast;
pub mod common;
pub mod lexer;
pub mod library;
pub mod linalg;
pub mod operators;
pub mod order;
pub mod parser;
pub mod predicate;
pub mod program;
pub mod scope;
pub mod session;
pub mod transformer;
pub mod verifier;

pub use session::{CommandOutcome, Session};
pub use verifier::{Verdict, VerificationResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a verification source string in a fresh session rooted at the
/// current directory
pub fn run_source(source: &str) -> miette::Result<Vec<CommandOutcome>> {
    let mut session = Session::new(std::env::current_dir().unwrap_or_default());
    session.run(source)
}
