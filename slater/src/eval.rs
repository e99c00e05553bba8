use nalgebra::{DMatrix, Vector3};
use tracing::warn;

use crate::set::{SlaterError, SlaterSet};
use crate::slater::{is_small, Slater};

/// Tolerance for the `S * S^-1/2 * S^-1/2 = I` smoke test.
const IDENTITY_EPS: f64 = 1e-6;

/// The normalized, unit-converted form of a [`SlaterSet`].
///
/// Self-contained snapshot: evaluation tasks run against it without
/// touching the raw inputs, so a basis set can be repopulated while an
/// evaluator built from its previous contents is still in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct SlaterEvaluator {
    atom_pos: Vec<Vector3<f64>>,
    functions: Vec<Slater>,
    coefficients: DMatrix<f64>,
    density: DMatrix<f64>,
}

impl SlaterEvaluator {
    /// Validate the raw inputs and derive the normalized state.
    ///
    /// The molecular-orbital coefficients are orthonormalized through the
    /// overlap matrix: `S = P diag(lambda) P^T`, `X = P diag(1/sqrt(lambda)) P^T`,
    /// and the stored coefficients are `X * C`. A failed identity check on
    /// `S * X * X` is logged and tolerated; it signals degraded numerical
    /// precision, not a hard failure.
    pub(crate) fn build(set: &SlaterSet) -> Result<Self, SlaterError> {
        validate(set)?;

        let n = set.basis_size();
        let coefficients = if n == 0 {
            DMatrix::zeros(0, 0)
        } else {
            let eig = set.overlap().clone().symmetric_eigen();
            let inv_sqrt =
                DMatrix::from_diagonal(&eig.eigenvalues.map(|l| 1.0 / l.sqrt()));
            let x = &eig.eigenvectors * inv_sqrt * eig.eigenvectors.transpose();
            if !(set.overlap() * &x * &x).is_identity(IDENTITY_EPS) {
                warn!(
                    "overlap orthonormalization self-check failed, S * S^-1/2 * S^-1/2 \
                     deviates from identity; continuing with degraded precision"
                );
            }
            &x * set.eigen_vectors()
        };

        let functions = (0..n)
            .map(|i| {
                Slater::new(
                    set.slater_indices()[i],
                    set.slater_types()[i],
                    set.zetas()[i],
                    set.pqns()[i],
                )
            })
            .collect();

        Ok(SlaterEvaluator {
            atom_pos: set.atom_pos().to_vec(),
            functions,
            coefficients,
            density: set.density().clone(),
        })
    }

    pub fn basis_size(&self) -> usize {
        self.functions.len()
    }

    pub fn num_mos(&self) -> usize {
        self.coefficients.ncols()
    }

    pub fn functions(&self) -> &[Slater] {
        &self.functions
    }

    /// Orthonormalized molecular-orbital coefficients, one column per MO.
    pub fn coefficients(&self) -> &DMatrix<f64> {
        &self.coefficients
    }

    /// Contribution of one basis function to one molecular orbital at a
    /// point, given the delta to the function's atom and the distance.
    ///
    /// A coefficient below 1e-15 in magnitude short-circuits to exactly
    /// zero before any radial work; that is a sparsity cut, not an error.
    pub fn orbital_term(&self, delta: &Vector3<f64>, r: f64, basis: usize, mo: usize) -> f64 {
        let coeff = self.coefficients[(basis, mo)];
        if is_small(coeff) {
            return 0.0;
        }
        coeff * self.functions[basis].value(delta, r)
    }

    /// Amplitude of molecular orbital `mo` (0-based column) at a point.
    pub fn orbital(&self, pos: &Vector3<f64>, mo: usize) -> f64 {
        debug_assert!(mo < self.num_mos());
        let (deltas, drs) = self.deltas(pos);

        let mut value = 0.0;
        for (i, func) in self.functions.iter().enumerate() {
            value += self.orbital_term(&deltas[func.atom], drs[func.atom], i, mo);
        }
        value
    }

    /// Total electron density at a point: the density-matrix weighted
    /// quadratic form over basis-function pairs.
    ///
    /// Off-diagonal pairs with a negligible density entry are skipped.
    /// Each basis value and each exponential is computed once per point
    /// and shared across all pairs it appears in.
    pub fn density(&self, pos: &Vector3<f64>) -> f64 {
        let size = self.density.nrows();
        if size == 0 {
            return 0.0;
        }
        let (deltas, drs) = self.deltas(pos);

        let values: Vec<f64> = self
            .functions
            .iter()
            .map(|func| {
                let r = drs[func.atom];
                func.value_with_exp(&deltas[func.atom], r, (-func.zeta * r).exp())
            })
            .collect();

        let mut rho = 0.0;
        for i in 0..size {
            for j in 0..i {
                let d = self.density[(i, j)];
                if is_small(d) {
                    continue;
                }
                rho += 2.0 * d * values[i] * values[j];
            }
            rho += self.density[(i, i)] * values[i] * values[i];
        }
        rho
    }

    fn deltas(&self, pos: &Vector3<f64>) -> (Vec<Vector3<f64>>, Vec<f64>) {
        let deltas: Vec<Vector3<f64>> =
            self.atom_pos.iter().map(|atom| pos - atom).collect();
        let drs = deltas.iter().map(|d| d.norm()).collect();
        (deltas, drs)
    }
}

fn validate(set: &SlaterSet) -> Result<(), SlaterError> {
    let n = set.basis_size();

    for (name, found) in [
        ("slater index array", set.slater_indices().len()),
        ("slater type array", set.slater_types().len()),
        ("principal quantum number array", set.pqns().len()),
    ] {
        if found != n {
            return Err(SlaterError::MismatchedArrays {
                name,
                expected: n,
                found,
            });
        }
    }

    for (basis, &atom) in set.slater_indices().iter().enumerate() {
        if atom >= set.num_atoms() {
            return Err(SlaterError::AtomIndexOutOfRange {
                basis,
                atom,
                atoms: set.num_atoms(),
            });
        }
    }

    let overlap = set.overlap();
    if overlap.nrows() != n || overlap.ncols() != n {
        return Err(SlaterError::MatrixShape {
            name: "overlap",
            rows: overlap.nrows(),
            cols: overlap.ncols(),
            basis_size: n,
        });
    }

    let eigen_vectors = set.eigen_vectors();
    if eigen_vectors.nrows() != n {
        return Err(SlaterError::MatrixShape {
            name: "eigenvector",
            rows: eigen_vectors.nrows(),
            cols: eigen_vectors.ncols(),
            basis_size: n,
        });
    }

    let density = set.density();
    if !density.is_empty() && (density.nrows() != n || density.ncols() != n) {
        return Err(SlaterError::MatrixShape {
            name: "density",
            rows: density.nrows(),
            cols: density.ncols(),
            basis_size: n,
        });
    }

    Ok(())
}
