//! The preloaded operator library
//!
//! A read-only root scope shared by all verifications: the usual gates, the
//! projector predicates with their half-scaled variants, and the two-outcome
//! computational and diagonal-basis measurements.

use crate::linalg::{c, ci, C64};
use crate::operators::Operator;
use crate::scope::{Binding, Scope};
use nalgebra::DMatrix;
use std::rc::Rc;

const EPS: f64 = 1e-7;

fn m1(entries: [f64; 4]) -> DMatrix<C64> {
    DMatrix::from_row_slice(2, 2, &entries.map(c))
}

fn m2(entries: [f64; 16]) -> DMatrix<C64> {
    DMatrix::from_row_slice(4, 4, &entries.map(c))
}

fn diag(values: &[f64]) -> DMatrix<C64> {
    let d = values.len();
    DMatrix::from_fn(d, d, |i, j| if i == j { c(values[i]) } else { c(0.0) })
}

fn bind_single(scope: &Scope, name: &str, mat: DMatrix<C64>) {
    scope
        .bind(name, Binding::Operator(Rc::new(Operator::Single(mat))))
        .expect("library names are bound once");
}

fn bind_measurement(scope: &Scope, name: &str, m0: DMatrix<C64>, m1: DMatrix<C64>) {
    let op = Operator::measurement(name, m0, m1, EPS).expect("library measurements are normalized");
    scope
        .bind(name, Binding::Operator(Rc::new(op)))
        .expect("library names are bound once");
}

/// Build the global scope with the preloaded operator library
pub fn global_scope() -> Scope {
    let scope = Scope::root("global");
    let s = 1.0 / 2.0_f64.sqrt();

    // single-qubit gates
    bind_single(&scope, "I", m1([1.0, 0.0, 0.0, 1.0]));
    bind_single(&scope, "X", m1([0.0, 1.0, 1.0, 0.0]));
    bind_single(
        &scope,
        "Y",
        DMatrix::from_row_slice(2, 2, &[c(0.0), ci(-1.0), ci(1.0), c(0.0)]),
    );
    bind_single(&scope, "Z", m1([1.0, 0.0, 0.0, -1.0]));
    bind_single(&scope, "H", m1([s, s, s, -s]));

    // two-qubit gates
    bind_single(
        &scope,
        "CX",
        m2([
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, //
            0.0, 0.0, 1.0, 0.0,
        ]),
    );
    bind_single(
        &scope,
        "CH",
        m2([
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, s, s, //
            0.0, 0.0, s, -s,
        ]),
    );
    bind_single(
        &scope,
        "SWAP",
        m2([
            1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]),
    );

    // three-qubit Toffoli: controls first, target last
    let mut ccx = DMatrix::identity(8, 8);
    ccx[(6, 6)] = c(0.0);
    ccx[(7, 7)] = c(0.0);
    ccx[(6, 7)] = c(1.0);
    ccx[(7, 6)] = c(1.0);
    bind_single(&scope, "CCX", ccx);

    // Hermitian predicates
    let p0 = m1([1.0, 0.0, 0.0, 0.0]);
    let p1 = m1([0.0, 0.0, 0.0, 1.0]);
    let pp = m1([0.5, 0.5, 0.5, 0.5]);
    let pm = m1([0.5, -0.5, -0.5, 0.5]);
    let eq2 = diag(&[1.0, 0.0, 0.0, 1.0]);
    let neq2 = diag(&[0.0, 1.0, 1.0, 0.0]);
    let eq3 = diag(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);

    bind_single(&scope, "Zero", m1([0.0, 0.0, 0.0, 0.0]));
    bind_single(&scope, "P0", p0.clone());
    bind_single(&scope, "P1", p1.clone());
    bind_single(&scope, "Pp", pp.clone());
    bind_single(&scope, "Pm", pm.clone());
    bind_single(&scope, "Eq01_2", eq2.clone());
    bind_single(&scope, "Neq01_2", neq2.clone());
    bind_single(&scope, "Eq01_3", eq3.clone());

    // half-scaled variants
    let half = c(0.5);
    bind_single(&scope, "Idiv2", m1([0.5, 0.0, 0.0, 0.5]));
    bind_single(&scope, "P0div2", p0.clone() * half);
    bind_single(&scope, "P1div2", p1.clone() * half);
    bind_single(&scope, "Ppdiv2", pp.clone() * half);
    bind_single(&scope, "Pmdiv2", pm.clone() * half);
    bind_single(&scope, "Eq01_2div2", eq2.clone() * half);
    bind_single(&scope, "Neq01_2div2", neq2.clone() * half);
    bind_single(&scope, "Eq01_3div2", eq3.clone() * half);

    // measurements: outcome 0 first
    bind_measurement(&scope, "M01", p0.clone(), p1.clone());
    bind_measurement(&scope, "M10", p1, p0);
    bind_measurement(&scope, "Mpm", pp.clone(), pm.clone());
    bind_measurement(&scope, "Mmp", pm, pp);
    bind_measurement(&scope, "MEq01_2", neq2.clone(), eq2.clone());
    bind_measurement(&scope, "MEq10_2", eq2, neq2);

    scope
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg;

    #[test]
    fn test_required_names_present() {
        let scope = global_scope();
        for name in [
            "I", "X", "Y", "Z", "H", "CX", "CH", "SWAP", "CCX", "Zero", "P0", "P1", "Pp", "Pm",
            "Eq01_2", "Neq01_2", "Eq01_3", "Idiv2", "P0div2", "P1div2", "Ppdiv2", "Pmdiv2", "M01",
            "M10", "Mpm", "Mmp", "MEq01_2", "MEq10_2",
        ] {
            assert!(scope.contains(name), "library must preload {name}");
        }
    }

    #[test]
    fn test_gates_are_unitary() {
        let scope = global_scope();
        for name in ["I", "X", "Y", "Z", "H", "CX", "CH", "SWAP", "CCX"] {
            match scope.get(name) {
                Some(Binding::Operator(op)) => {
                    op.ensure_unitary(name, EPS).expect("library gate is unitary");
                }
                _ => panic!("{name} missing"),
            }
        }
    }

    #[test]
    fn test_predicates_are_in_bounds() {
        let scope = global_scope();
        for name in [
            "Zero", "P0", "P1", "Pp", "Pm", "Eq01_2", "Neq01_2", "Eq01_3", "Idiv2", "P0div2",
            "P1div2", "Ppdiv2", "Pmdiv2", "Eq01_2div2", "Neq01_2div2", "Eq01_3div2",
        ] {
            match scope.get(name) {
                Some(Binding::Operator(op)) => {
                    op.ensure_hermitian_predicate(name, EPS)
                        .expect("library predicate lies in [0, I]");
                }
                _ => panic!("{name} missing"),
            }
        }
    }

    #[test]
    fn test_ccx_flips_target_on_full_controls() {
        let scope = global_scope();
        let ccx = match scope.get("CCX") {
            Some(Binding::Operator(op)) => op,
            _ => panic!("CCX missing"),
        };
        let m = ccx.ensure_square("CCX").unwrap();
        // |110> -> |111>
        assert!((m[(7, 6)].re - 1.0).abs() < 1e-12);
        // |100> stays
        assert!((m[(4, 4)].re - 1.0).abs() < 1e-12);
        assert!(linalg::approx_eq(&(m * m), &linalg::eye(3), 1e-12));
    }
}
