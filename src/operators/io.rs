//! Operator files on disk
//!
//! A tensor file is a JSON document holding a dense complex array, row-major,
//! high-order qubit first:
//!
//! ```json
//! { "qubits": 2, "measurement": false, "re": [ ... ], "im": [ ... ] }
//! ```
//!
//! Square operators carry `4^n` entries; measurement pairs carry `2 * 4^n`,
//! outcome 0 first.

use super::{Operator, OperatorError};
use crate::linalg::C64;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct TensorFile {
    qubits: usize,
    #[serde(default)]
    measurement: bool,
    re: Vec<f64>,
    im: Vec<f64>,
}

fn file_err(path: &Path, reason: impl Into<String>) -> OperatorError {
    OperatorError::File {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

fn matrix_from_slice(d: usize, re: &[f64], im: &[f64]) -> DMatrix<C64> {
    DMatrix::from_fn(d, d, |i, j| C64::new(re[i * d + j], im[i * d + j]))
}

/// Load an operator from a tensor file
pub fn load_operator(path: &Path, name: &str, eps: f64) -> Result<Operator, OperatorError> {
    let text = std::fs::read_to_string(path).map_err(|e| file_err(path, e.to_string()))?;
    let file: TensorFile =
        serde_json::from_str(&text).map_err(|e| file_err(path, e.to_string()))?;

    let d = 1usize << file.qubits;
    let expected = if file.measurement { 2 * d * d } else { d * d };
    if file.re.len() != expected || file.im.len() != expected {
        return Err(file_err(
            path,
            format!(
                "expected {} entries for {} qubits, found {}",
                expected,
                file.qubits,
                file.re.len()
            ),
        ));
    }

    if file.measurement {
        let m0 = matrix_from_slice(d, &file.re[..d * d], &file.im[..d * d]);
        let m1 = matrix_from_slice(d, &file.re[d * d..], &file.im[d * d..]);
        Operator::measurement(name, m0, m1, eps)
    } else {
        let m = matrix_from_slice(d, &file.re, &file.im);
        Operator::single(name, m)
    }
}

/// Write an operator back to a tensor file
pub fn save_operator(path: &Path, op: &Operator) -> Result<(), OperatorError> {
    let (measurement, mats) = match op {
        Operator::Single(m) => (false, vec![m]),
        Operator::Measurement { m0, m1 } => (true, vec![m0, m1]),
    };
    let mut re = Vec::new();
    let mut im = Vec::new();
    for m in mats {
        let d = m.nrows();
        for i in 0..d {
            for j in 0..d {
                re.push(m[(i, j)].re);
                im.push(m[(i, j)].im);
            }
        }
    }
    let file = TensorFile {
        qubits: op.qubits(),
        measurement,
        re,
        im,
    };
    let text = serde_json::to_string_pretty(&file).map_err(|e| file_err(path, e.to_string()))?;
    std::fs::write(path, text).map_err(|e| file_err(path, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = std::env::temp_dir().join("nqpv-io-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("p0.json");

        let op = Operator::single("P0", linalg::ket0_proj()).unwrap();
        save_operator(&path, &op).unwrap();
        let back = load_operator(&path, "P0", 1e-7).unwrap();
        let m = back.ensure_square("P0").unwrap();
        assert!(linalg::approx_eq(m, &linalg::ket0_proj(), 1e-12));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let dir = std::env::temp_dir().join("nqpv-io-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        std::fs::write(&path, r#"{"qubits": 1, "re": [1.0], "im": [0.0]}"#).unwrap();
        assert!(load_operator(&path, "bad", 1e-7).is_err());
    }
}
