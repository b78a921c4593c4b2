//! Assertion sets: finite sets of placed Hermitian predicates
//!
//! A predicate set denotes the meet of its members after cylindrical
//! extension to the enclosing register. Sets are kept canonical: every
//! element is stored extended over the full register, and structural
//! duplicates (equal matrices up to `EPS` in Frobenius norm) are removed.

use crate::linalg::{self, C64};
use crate::order;
use miette::Diagnostic;
use nalgebra::DMatrix;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum PredicateError {
    #[error("Predicate '{label}' is ill-formed: not Hermitian or outside [0, I] (eigenvalues in [{lo:.3e}, {hi:.3e}])")]
    #[diagnostic(code(nqpv::predicate::ill_formed))]
    IllFormed { label: String, lo: f64, hi: f64 },
}

/// One placed Hermitian, extended over the register of its owning set
#[derive(Debug, Clone)]
pub struct PredicateElement {
    /// Display label, e.g. `P0[q]` or `VAR3[q q1]`
    pub label: String,
    /// Matrix over the full register
    pub mat: DMatrix<C64>,
}

/// A canonical assertion set over a register
#[derive(Debug, Clone)]
pub struct PredicateSet {
    pub register: Vec<String>,
    elems: Vec<PredicateElement>,
}

/// Render `name[q1 q2 ...]`
pub fn format_label(name: &str, qubits: &[String]) -> String {
    format!("{}[{}]", name, qubits.join(" "))
}

impl PredicateSet {
    pub fn empty(register: Vec<String>) -> Self {
        Self {
            register,
            elems: Vec::new(),
        }
    }

    /// Build from named operators at their placements, extending each to the
    /// register and deduplicating
    pub fn from_placed(
        register: &[String],
        items: impl IntoIterator<Item = (String, DMatrix<C64>, Vec<String>)>,
        eps: f64,
    ) -> Self {
        let mut set = Self::empty(register.to_vec());
        for (name, mat, qubits) in items {
            let label = format_label(&name, &qubits);
            let ext = linalg::extend(&mat, &qubits, register);
            set.push(label, ext, eps);
        }
        set
    }

    /// Insert an already-extended element unless a structural duplicate exists
    pub fn push(&mut self, label: String, mat: DMatrix<C64>, eps: f64) {
        if !self
            .elems
            .iter()
            .any(|e| linalg::approx_eq(&e.mat, &mat, eps))
        {
            self.elems.push(PredicateElement { label, mat });
        }
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PredicateElement> {
        self.elems.iter()
    }

    pub fn labels(&self) -> Vec<String> {
        self.elems.iter().map(|e| e.label.clone()).collect()
    }

    /// Union viewed as conjunction
    pub fn meet(&self, other: &PredicateSet, eps: f64) -> PredicateSet {
        debug_assert_eq!(self.register, other.register);
        let mut out = self.clone();
        for e in &other.elems {
            out.push(e.label.clone(), e.mat.clone(), eps);
        }
        out
    }

    /// Pointwise application of a Hermitian-preserving map; labels are
    /// assigned by the caller
    pub fn map(
        &self,
        mut f: impl FnMut(&DMatrix<C64>) -> (String, DMatrix<C64>),
        eps: f64,
    ) -> PredicateSet {
        let mut out = Self::empty(self.register.clone());
        for e in &self.elems {
            let (label, mat) = f(&e.mat);
            out.push(label, mat, eps);
        }
        out
    }

    /// Verify every element is a Hermitian predicate in `[0, I]` within `eps`
    pub fn clip(&self, eps: f64) -> Result<(), PredicateError> {
        for e in &self.elems {
            let herm_defect = (&e.mat - e.mat.adjoint()).norm();
            let (lo, hi) = linalg::hermitian_bounds(&e.mat);
            if herm_defect > eps || lo < -eps || hi > 1.0 + eps {
                return Err(PredicateError::IllFormed {
                    label: e.label.clone(),
                    lo,
                    hi,
                });
            }
        }
        Ok(())
    }

    /// Pointwise entailment: for every element of `other` some element of
    /// `self` lies below it in the Loewner order. Sound but incomplete.
    /// On failure, returns the label of the first uncovered element.
    pub fn entails(&self, other: &PredicateSet, precision: f64) -> Result<(), String> {
        debug_assert_eq!(self.register, other.register);
        for h in &other.elems {
            let covered = self
                .elems
                .iter()
                .any(|g| order::lowner_le(&g.mat, &h.mat, precision));
            if !covered {
                return Err(h.label.clone());
            }
        }
        Ok(())
    }

    /// Predicate-set equality up to tolerance: mutual entailment
    pub fn equiv(&self, other: &PredicateSet, precision: f64) -> bool {
        self.entails(other, precision).is_ok() && other.entails(self, precision).is_ok()
    }
}

impl fmt::Display for PredicateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for e in &self.elems {
            write!(f, "{} ", e.label)?;
        }
        write!(f, "}}")
    }
}
