//! Operator values and their classification
//!
//! An operator is a dense complex tensor on a number of qubits. Values come
//! in two shapes: a single square matrix (candidate unitary or Hermitian
//! predicate) and a measurement pair. Role requirements are checked at the
//! site of use, since one matrix may legitimately serve several roles (the
//! identity is both a gate and the weakest predicate).

pub mod io;

use crate::linalg::{self, C64};
use miette::Diagnostic;
use nalgebra::DMatrix;
use thiserror::Error;

/// Operator validation error
#[derive(Error, Debug, Diagnostic)]
pub enum OperatorError {
    #[error("Operator '{name}' has invalid shape: {rows}x{cols} is not a square power of two")]
    #[diagnostic(code(nqpv::operator::shape))]
    BadShape { name: String, rows: usize, cols: usize },

    #[error("Operator '{name}' is not unitary")]
    #[diagnostic(code(nqpv::operator::unitary))]
    NotUnitary { name: String },

    #[error("Operator '{name}' is not Hermitian")]
    #[diagnostic(code(nqpv::operator::hermitian))]
    NotHermitian { name: String },

    #[error("Operator '{name}' violates 0 <= H <= I (eigenvalues in [{lo:.3e}, {hi:.3e}])")]
    #[diagnostic(
        code(nqpv::operator::bounds),
        help("Hermitian predicates must lie between the zero operator and the identity")
    )]
    OutOfBounds { name: String, lo: f64, hi: f64 },

    #[error("Operator '{name}' does not satisfy the measurement normalization M0'M0 + M1'M1 = I")]
    #[diagnostic(code(nqpv::operator::measurement))]
    NotMeasurement { name: String },

    #[error("Operator '{name}' is a measurement pair, but a square operator is required here")]
    #[diagnostic(code(nqpv::operator::role))]
    MeasurementInSquareRole { name: String },

    #[error("Operator '{name}' is not a measurement pair")]
    #[diagnostic(code(nqpv::operator::role))]
    SquareInMeasurementRole { name: String },

    #[error("Cannot read operator file '{path}': {reason}")]
    #[diagnostic(code(nqpv::operator::file))]
    File { path: String, reason: String },
}

/// An operator value, tagged by shape
#[derive(Debug, Clone)]
pub enum Operator {
    /// A square matrix on n qubits
    Single(DMatrix<C64>),
    /// A two-outcome measurement, rank 2n+1 on disk: outcome 0 first
    Measurement { m0: DMatrix<C64>, m1: DMatrix<C64> },
}

fn qubits_of(m: &DMatrix<C64>) -> Option<usize> {
    let d = m.nrows();
    if d == 0 || m.ncols() != d || !d.is_power_of_two() {
        return None;
    }
    Some(d.trailing_zeros() as usize)
}

impl Operator {
    /// Build a square operator, checking only the shape
    pub fn single(name: &str, m: DMatrix<C64>) -> Result<Self, OperatorError> {
        match qubits_of(&m) {
            Some(_) => Ok(Operator::Single(m)),
            None => Err(OperatorError::BadShape {
                name: name.to_string(),
                rows: m.nrows(),
                cols: m.ncols(),
            }),
        }
    }

    /// Build a measurement pair, checking shape and normalization
    pub fn measurement(
        name: &str,
        m0: DMatrix<C64>,
        m1: DMatrix<C64>,
        eps: f64,
    ) -> Result<Self, OperatorError> {
        let q0 = qubits_of(&m0);
        let q1 = qubits_of(&m1);
        if q0.is_none() || q0 != q1 {
            return Err(OperatorError::BadShape {
                name: name.to_string(),
                rows: m0.nrows(),
                cols: m1.nrows(),
            });
        }
        let norm = m0.adjoint() * &m0 + m1.adjoint() * &m1;
        let d = m0.nrows();
        if !linalg::approx_eq(&norm, &DMatrix::identity(d, d), eps) {
            return Err(OperatorError::NotMeasurement {
                name: name.to_string(),
            });
        }
        Ok(Operator::Measurement { m0, m1 })
    }

    /// Build an already-validated Hermitian predicate
    pub fn hermitian(name: &str, m: DMatrix<C64>, eps: f64) -> Result<Self, OperatorError> {
        let op = Operator::single(name, m)?;
        op.ensure_hermitian_predicate(name, eps)?;
        Ok(op)
    }

    /// Number of qubits the operator acts on
    pub fn qubits(&self) -> usize {
        match self {
            Operator::Single(m) => qubits_of(m).expect("validated on construction"),
            Operator::Measurement { m0, .. } => qubits_of(m0).expect("validated on construction"),
        }
    }

    /// The matrix, for roles that need a square operator
    pub fn ensure_square(&self, name: &str) -> Result<&DMatrix<C64>, OperatorError> {
        match self {
            Operator::Single(m) => Ok(m),
            Operator::Measurement { .. } => Err(OperatorError::MeasurementInSquareRole {
                name: name.to_string(),
            }),
        }
    }

    /// Check `U' U = I` within `eps` and return the matrix
    pub fn ensure_unitary(&self, name: &str, eps: f64) -> Result<&DMatrix<C64>, OperatorError> {
        let m = self.ensure_square(name)?;
        let d = m.nrows();
        if !linalg::approx_eq(&(m.adjoint() * m), &DMatrix::identity(d, d), eps) {
            return Err(OperatorError::NotUnitary {
                name: name.to_string(),
            });
        }
        Ok(m)
    }

    /// Check `H = H'` and `0 <= H <= I` within `eps` and return the matrix
    pub fn ensure_hermitian_predicate(
        &self,
        name: &str,
        eps: f64,
    ) -> Result<&DMatrix<C64>, OperatorError> {
        let m = self.ensure_square(name)?;
        if !linalg::approx_eq(m, &m.adjoint(), eps) {
            return Err(OperatorError::NotHermitian {
                name: name.to_string(),
            });
        }
        let (lo, hi) = linalg::hermitian_bounds(m);
        if lo < -eps || hi > 1.0 + eps {
            return Err(OperatorError::OutOfBounds {
                name: name.to_string(),
                lo,
                hi,
            });
        }
        Ok(m)
    }

    /// The two outcome operators of a measurement pair
    pub fn ensure_measurement(
        &self,
        name: &str,
    ) -> Result<(&DMatrix<C64>, &DMatrix<C64>), OperatorError> {
        match self {
            Operator::Measurement { m0, m1 } => Ok((m0, m1)),
            Operator::Single(_) => Err(OperatorError::SquareInMeasurementRole {
                name: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::c;

    const EPS: f64 = 1e-7;

    fn hadamard() -> DMatrix<C64> {
        let s = 1.0 / 2.0_f64.sqrt();
        DMatrix::from_row_slice(2, 2, &[c(s), c(s), c(s), c(-s)])
    }

    #[test]
    fn test_hadamard_is_unitary_and_not_a_predicate() {
        let op = Operator::single("H", hadamard()).unwrap();
        assert!(op.ensure_unitary("H", EPS).is_ok());
        // eigenvalues of H are +-1, outside [0, 1]
        assert!(op.ensure_hermitian_predicate("H", EPS).is_err());
    }

    #[test]
    fn test_identity_serves_both_roles() {
        let op = Operator::single("I", DMatrix::identity(2, 2)).unwrap();
        assert!(op.ensure_unitary("I", EPS).is_ok());
        assert!(op.ensure_hermitian_predicate("I", EPS).is_ok());
    }

    #[test]
    fn test_measurement_normalization() {
        let p0 = linalg::ket0_proj();
        let p1 = DMatrix::from_row_slice(2, 2, &[c(0.0), c(0.0), c(0.0), c(1.0)]);
        assert!(Operator::measurement("M01", p0.clone(), p1, EPS).is_ok());
        // p0 twice does not resolve the identity
        let bad = Operator::measurement("bad", p0.clone(), p0, EPS);
        assert!(bad.is_err());
    }

    #[test]
    fn test_bad_shape_rejected() {
        let m = DMatrix::from_row_slice(2, 3, &[c(0.0); 6]);
        assert!(Operator::single("bad", m).is_err());
        let m3 = DMatrix::from_row_slice(3, 3, &[c(0.0); 9]);
        assert!(Operator::single("bad3", m3).is_err());
    }

    #[test]
    fn test_scaled_projector_is_a_predicate() {
        let half = linalg::scale(&linalg::ket0_proj(), c(0.5));
        let op = Operator::hermitian("P0div2", half, EPS).unwrap();
        assert_eq!(op.qubits(), 1);
    }
}
