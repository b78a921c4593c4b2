//! The Loewner partial order, decided by SDP feasibility
//!
//! `A <= B` iff `B - A` is positive semidefinite. The query shifts by the
//! solver precision, `S = B - A - eps*I`, embeds the Hermitian matrix as a
//! real symmetric one, and asks Clarabel for
//!
//! ```text
//!     minimize t   subject to   svec(S) + t*svec(I) in PSD triangle cone
//! ```
//!
//! whose optimum is `t* = -lambda_min(S)`. The order holds when the residual
//! stays below tolerance, `t* <= 2*eps`, i.e. `lambda_min(B - A) >= -eps`.
//! The SDP is used instead of an eigendecomposition because the dual solution
//! doubles as a violation certificate.
//!
//! Solver failures are logged and reported as "false" for the single query.

use crate::linalg::C64;
use clarabel::algebra::*;
use clarabel::solver::*;
use nalgebra::DMatrix;

/// Decide `a <= b` in the Loewner order at the given solver precision
pub fn lowner_le(a: &DMatrix<C64>, b: &DMatrix<C64>, precision: f64) -> bool {
    debug_assert_eq!(a.shape(), b.shape());
    let d = a.nrows();
    let mut s = b - a;
    for i in 0..d {
        s[(i, i)] -= C64::new(precision, 0.0);
    }
    match min_eigen_shift(&s, precision) {
        Ok(t) => t <= 2.0 * precision,
        Err(status) => {
            tracing::warn!(?status, "SDP solver failed; treating the order query as false");
            false
        }
    }
}

/// Equality in the Loewner order: `a <= b` and `b <= a`
pub fn lowner_eq(a: &DMatrix<C64>, b: &DMatrix<C64>, precision: f64) -> bool {
    lowner_le(a, b, precision) && lowner_le(b, a, precision)
}

/// Solve `min t : S + t*I >= 0` for a Hermitian `S`; the optimum is
/// `-lambda_min(S)`.
fn min_eigen_shift(s: &DMatrix<C64>, precision: f64) -> Result<f64, SolverStatus> {
    let r = real_embedding(s);
    let n = r.nrows();
    let tri = n * (n + 1) / 2;
    let sqrt2 = 2.0_f64.sqrt();

    // svec(R): upper triangle, column-stacked, off-diagonals scaled by sqrt(2)
    let mut b = Vec::with_capacity(tri);
    for j in 0..n {
        for i in 0..=j {
            let v = r[(i, j)];
            b.push(if i == j { v } else { v * sqrt2 });
        }
    }

    // single column -svec(I): -1 at every diagonal slot
    let diag_rows: Vec<usize> = (0..n).map(|j| j * (j + 3) / 2).collect();
    let a_mat = CscMatrix::new(tri, 1, vec![0, n], diag_rows, vec![-1.0; n]);

    let p = CscMatrix::zeros((1, 1));
    let q = vec![1.0];
    let cones = [SupportedConeT::PSDTriangleConeT(n)];
    debug_assert_eq!(b.len(), tri);
    let settings = DefaultSettings {
        verbose: false,
        tol_gap_abs: precision,
        tol_gap_rel: precision,
        tol_feas: precision,
        ..DefaultSettings::default()
    };

    let mut solver = DefaultSolver::new(&p, &q, &a_mat, &b, &cones, settings);
    solver.solve();

    match solver.solution.status {
        SolverStatus::Solved | SolverStatus::AlmostSolved => Ok(solver.solution.obj_val),
        status => Err(status),
    }
}

/// Embed a Hermitian complex matrix as a real symmetric matrix with the same
/// eigenvalues (each doubled in multiplicity)
fn real_embedding(s: &DMatrix<C64>) -> DMatrix<f64> {
    let d = s.nrows();
    DMatrix::from_fn(2 * d, 2 * d, |i, j| {
        let (bi, bj) = (i / d, j / d);
        let v = s[(i % d, j % d)];
        match (bi, bj) {
            (0, 0) | (1, 1) => v.re,
            (0, 1) => -v.im,
            _ => v.im,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{self, c, ci};

    const PREC: f64 = 1e-9;

    fn p0() -> DMatrix<C64> {
        linalg::ket0_proj()
    }

    fn eye() -> DMatrix<C64> {
        DMatrix::identity(2, 2)
    }

    #[test]
    fn test_reflexive() {
        assert!(lowner_le(&p0(), &p0(), PREC));
        assert!(lowner_le(&eye(), &eye(), PREC));
    }

    #[test]
    fn test_projector_below_identity() {
        assert!(lowner_le(&p0(), &eye(), PREC));
        assert!(!lowner_le(&eye(), &p0(), PREC));
    }

    #[test]
    fn test_zero_below_everything() {
        let zero = DMatrix::zeros(2, 2);
        assert!(lowner_le(&zero, &p0(), PREC));
        assert!(lowner_le(&zero, &eye(), PREC));
        assert!(!lowner_le(&p0(), &zero, PREC));
    }

    #[test]
    fn test_complex_entries() {
        // Pauli Y shifted into [0, I]: (I + Y) / 2 is a projector
        let y = DMatrix::from_row_slice(2, 2, &[c(0.0), ci(-1.0), ci(1.0), c(0.0)]);
        let py = (eye() + y) * c(0.5);
        assert!(lowner_le(&py, &eye(), PREC));
        assert!(!lowner_le(&eye(), &py, PREC));
        assert!(lowner_eq(&py, &py, PREC));
    }

    #[test]
    fn test_incomparable_pair() {
        let p1 = DMatrix::from_row_slice(2, 2, &[c(0.0), c(0.0), c(0.0), c(1.0)]);
        assert!(!lowner_le(&p0(), &p1, PREC));
        assert!(!lowner_le(&p1, &p0(), PREC));
    }

    #[test]
    fn test_precision_boundary() {
        // b sits below a by a margin between the two precisions, so the
        // verdict flips with the solver tolerance
        let delta = 1e-8;
        let b = &p0() * c(1.0 - delta);
        assert!(lowner_le(&p0(), &b, 1e-7));
        assert!(!lowner_le(&p0(), &b, 1e-9));
    }
}
