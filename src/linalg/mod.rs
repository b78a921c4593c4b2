//! Dense complex linear algebra for placed qubit operators
//!
//! Operators live on named qubit registers. A register of n qubits is an
//! ordered list of distinct names; the matrix of an operator on it is a
//! `2^n x 2^n` dense complex matrix whose row/column indices read the
//! register qubits as bits, first qubit most significant.
//!
//! Everything here is purely functional: inputs are never mutated.

use nalgebra::DMatrix;
use num_complex::Complex64;

pub type C64 = Complex64;

/// Matrix dimension for an n-qubit operator
pub fn dim(qubits: usize) -> usize {
    1 << qubits
}

/// Identity on n qubits
pub fn eye(qubits: usize) -> DMatrix<C64> {
    let d = dim(qubits);
    DMatrix::identity(d, d)
}

/// Conjugate transpose
pub fn dagger(m: &DMatrix<C64>) -> DMatrix<C64> {
    m.adjoint()
}

/// Equality up to `eps` in Frobenius norm
pub fn approx_eq(a: &DMatrix<C64>, b: &DMatrix<C64>, eps: f64) -> bool {
    a.shape() == b.shape() && (a - b).norm() <= eps
}

/// `K^dagger . H . K`
pub fn sandwich(k: &DMatrix<C64>, h: &DMatrix<C64>) -> DMatrix<C64> {
    k.adjoint() * h * k
}

/// Sum of a non-empty family of equally-shaped matrices
pub fn sum<'a, I>(mut ops: I) -> DMatrix<C64>
where
    I: Iterator<Item = &'a DMatrix<C64>>,
{
    let first = ops.next().expect("sum of an empty operator family").clone();
    ops.fold(first, |acc, m| acc + m)
}

/// Scale by a complex factor
pub fn scale(m: &DMatrix<C64>, alpha: C64) -> DMatrix<C64> {
    m.clone() * alpha
}

/// Cylindrical extension: tensor `m` (placed on `from`) with identity on the
/// qubits of `to` missing from `from`, permuted so qubit ordering matches
/// `to` on both ket and bra sides.
///
/// `from` must be duplicate-free and a subset of `to`. Extension on the
/// empty placement is the identity on `to`.
pub fn extend(m: &DMatrix<C64>, from: &[String], to: &[String]) -> DMatrix<C64> {
    if from == to {
        return m.clone();
    }
    let n = to.len();
    let d = dim(n);
    // bit index (from the least significant end) of each `from` qubit in `to`
    let bits: Vec<usize> = from
        .iter()
        .map(|q| {
            let p = to
                .iter()
                .position(|t| t == q)
                .expect("placement qubit missing from register");
            n - 1 - p
        })
        .collect();
    let mut mask = 0usize;
    for &b in &bits {
        mask |= 1 << b;
    }

    let mut out = DMatrix::zeros(d, d);
    for i in 0..d {
        for j in 0..d {
            // identity on the qubits outside the placement
            if (i & !mask) != (j & !mask) {
                continue;
            }
            let mut a = 0usize;
            let mut b = 0usize;
            for &bit in &bits {
                a = (a << 1) | ((i >> bit) & 1);
                b = (b << 1) | ((j >> bit) & 1);
            }
            out[(i, j)] = m[(a, b)];
        }
    }
    out
}

/// Matrix product `A . B` with both operands first extended to `register`
pub fn compose(
    a: &DMatrix<C64>,
    a_qubits: &[String],
    b: &DMatrix<C64>,
    b_qubits: &[String],
    register: &[String],
) -> DMatrix<C64> {
    extend(a, a_qubits, register) * extend(b, b_qubits, register)
}

/// Real eigenvalue range of a Hermitian matrix
pub fn hermitian_bounds(m: &DMatrix<C64>) -> (f64, f64) {
    let evs = m.symmetric_eigenvalues();
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in evs.iter() {
        lo = lo.min(*v);
        hi = hi.max(*v);
    }
    (lo, hi)
}

/// `|0><0|` on one qubit
pub fn ket0_proj() -> DMatrix<C64> {
    DMatrix::from_row_slice(2, 2, &[c(1.0), c(0.0), c(0.0), c(0.0)])
}

/// `|0><1|` on one qubit
pub fn ket0_bra1() -> DMatrix<C64> {
    DMatrix::from_row_slice(2, 2, &[c(0.0), c(1.0), c(0.0), c(0.0)])
}

/// Real-valued complex entry
pub fn c(re: f64) -> C64 {
    C64::new(re, 0.0)
}

/// Imaginary-valued complex entry
pub fn ci(im: f64) -> C64 {
    C64::new(0.0, im)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn pauli_x() -> DMatrix<C64> {
        DMatrix::from_row_slice(2, 2, &[c(0.0), c(1.0), c(1.0), c(0.0)])
    }

    #[test]
    fn test_extend_identity_on_same_register() {
        let x = pauli_x();
        let ext = extend(&x, &q(&["a"]), &q(&["a"]));
        assert!(approx_eq(&ext, &x, 1e-12));
    }

    #[test]
    fn test_extend_adds_identity_factor() {
        // X on qubit a, extended to [a b], must be X (x) I
        let x = pauli_x();
        let ext = extend(&x, &q(&["a"]), &q(&["a", "b"]));
        assert_eq!(ext.nrows(), 4);
        // |00> -> |10>, i.e. entry (2, 0) = 1
        assert!((ext[(2, 0)].re - 1.0).abs() < 1e-12);
        assert!((ext[(0, 2)].re - 1.0).abs() < 1e-12);
        assert!((ext[(3, 1)].re - 1.0).abs() < 1e-12);
        assert!(ext[(1, 0)].norm() < 1e-12);
    }

    #[test]
    fn test_extend_permutes_qubit_order() {
        // X on qubit b, extended to [a b]: I (x) X
        let x = pauli_x();
        let ext = extend(&x, &q(&["b"]), &q(&["a", "b"]));
        assert!((ext[(1, 0)].re - 1.0).abs() < 1e-12);
        assert!((ext[(3, 2)].re - 1.0).abs() < 1e-12);
        assert!(ext[(2, 0)].norm() < 1e-12);
    }

    #[test]
    fn test_extend_round_trip() {
        // Extending and projecting the added qubit onto |0> recovers the input
        let x = pauli_x();
        let ext = extend(&x, &q(&["a"]), &q(&["a", "b"]));
        let mut back = DMatrix::zeros(2, 2);
        for i in 0..2 {
            for j in 0..2 {
                back[(i, j)] = ext[(2 * i, 2 * j)];
            }
        }
        assert!(approx_eq(&back, &x, 1e-12));
    }

    #[test]
    fn test_sandwich_unitary_conjugation() {
        // X^dagger . P0 . X = P1
        let x = pauli_x();
        let p0 = ket0_proj();
        let got = sandwich(&x, &p0);
        let p1 = DMatrix::from_row_slice(2, 2, &[c(0.0), c(0.0), c(0.0), c(1.0)]);
        assert!(approx_eq(&got, &p1, 1e-12));
    }

    #[test]
    fn test_compose_extends_both_sides() {
        let x = pauli_x();
        let prod = compose(&x, &q(&["a"]), &x, &q(&["b"]), &q(&["a", "b"]));
        // (X (x) I) . (I (x) X) = X (x) X, which maps |00> to |11>
        assert!((prod[(3, 0)].re - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_hermitian_bounds() {
        let p0 = ket0_proj();
        let (lo, hi) = hermitian_bounds(&p0);
        assert!(lo.abs() < 1e-12);
        assert!((hi - 1.0).abs() < 1e-12);
    }
}
