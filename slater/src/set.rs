use std::error::Error;
use std::fmt;

use nalgebra::{DMatrix, Vector3};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::eval::SlaterEvaluator;
use crate::slater::SlaterType;

/// Rejections raised while turning raw basis-set inputs into an evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlaterError {
    /// A raw orbital-type code outside the known enumeration.
    UnsupportedSlaterType(i32),
    /// One of the per-function arrays disagrees with the basis size.
    MismatchedArrays {
        name: &'static str,
        expected: usize,
        found: usize,
    },
    /// A basis function refers to an atom that was never supplied.
    AtomIndexOutOfRange {
        basis: usize,
        atom: usize,
        atoms: usize,
    },
    /// A matrix does not have the shape the basis size dictates.
    MatrixShape {
        name: &'static str,
        rows: usize,
        cols: usize,
        basis_size: usize,
    },
}

impl fmt::Display for SlaterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlaterError::UnsupportedSlaterType(code) => {
                write!(f, "unsupported Slater orbital type code {}", code)
            }
            SlaterError::MismatchedArrays {
                name,
                expected,
                found,
            } => write!(
                f,
                "{} has length {}, expected {} entries to match the zeta array",
                name, found, expected
            ),
            SlaterError::AtomIndexOutOfRange { basis, atom, atoms } => write!(
                f,
                "basis function {} is centered on atom {}, but only {} atom positions were supplied",
                basis, atom, atoms
            ),
            SlaterError::MatrixShape {
                name,
                rows,
                cols,
                basis_size,
            } => write!(
                f,
                "{} matrix is {}x{}, inconsistent with basis size {}",
                name, rows, cols, basis_size
            ),
        }
    }
}

impl Error for SlaterError {}

/// A Slater basis set as an external loader supplies it.
///
/// The four per-function arrays are index-aligned: entry `i` of the
/// indices, types, zetas and pqns arrays together describe basis function
/// `i`. Each `add_*` operation replaces its array wholesale and discards
/// the derived evaluator; there is no partial-mutation path.
#[derive(Debug, Serialize, Deserialize)]
pub struct SlaterSet {
    atom_pos: Vec<Vector3<f64>>,
    slater_indices: Vec<usize>,
    slater_types: Vec<SlaterType>,
    zetas: Vec<f64>,
    pqns: Vec<i32>,
    electrons: f64,
    overlap: DMatrix<f64>,
    eigen_vectors: DMatrix<f64>,
    density: DMatrix<f64>,
    #[serde(skip)]
    evaluator: OnceCell<SlaterEvaluator>,
}

impl SlaterSet {
    pub fn new() -> Self {
        SlaterSet {
            atom_pos: Vec::new(),
            slater_indices: Vec::new(),
            slater_types: Vec::new(),
            zetas: Vec::new(),
            pqns: Vec::new(),
            electrons: 0.0,
            overlap: DMatrix::zeros(0, 0),
            eigen_vectors: DMatrix::zeros(0, 0),
            density: DMatrix::zeros(0, 0),
            evaluator: OnceCell::new(),
        }
    }

    pub fn add_atoms(&mut self, pos: Vec<Vector3<f64>>) {
        self.atom_pos = pos;
        self.evaluator = OnceCell::new();
    }

    /// Per-function atom indices, 0-based into the atom position array.
    pub fn add_slater_indices(&mut self, indices: Vec<usize>) {
        self.slater_indices = indices;
        self.evaluator = OnceCell::new();
    }

    pub fn add_slater_types(&mut self, types: Vec<SlaterType>) {
        self.slater_types = types;
        self.evaluator = OnceCell::new();
    }

    pub fn add_zetas(&mut self, zetas: Vec<f64>) {
        self.zetas = zetas;
        self.evaluator = OnceCell::new();
    }

    pub fn add_pqns(&mut self, pqns: Vec<i32>) {
        self.pqns = pqns;
        self.evaluator = OnceCell::new();
    }

    /// Electron count is carried for downstream consumers; it does not
    /// enter the normalization.
    pub fn set_num_electrons(&mut self, electrons: f64) {
        self.electrons = electrons;
    }

    pub fn add_overlap_matrix(&mut self, m: DMatrix<f64>) {
        self.overlap = m;
        self.evaluator = OnceCell::new();
    }

    pub fn add_eigen_vectors(&mut self, e: DMatrix<f64>) {
        self.eigen_vectors = e;
        self.evaluator = OnceCell::new();
    }

    pub fn add_density_matrix(&mut self, d: DMatrix<f64>) {
        self.density = d;
        self.evaluator = OnceCell::new();
    }

    pub fn basis_size(&self) -> usize {
        self.zetas.len()
    }

    pub fn num_atoms(&self) -> usize {
        self.atom_pos.len()
    }

    pub fn num_mos(&self) -> usize {
        self.overlap.ncols()
    }

    pub fn num_electrons(&self) -> f64 {
        self.electrons
    }

    /// The normalized view of this basis, computed on first use and cached
    /// until an input array is replaced.
    pub fn evaluator(&self) -> Result<&SlaterEvaluator, SlaterError> {
        self.evaluator.get_or_try_init(|| SlaterEvaluator::build(self))
    }

    pub(crate) fn atom_pos(&self) -> &[Vector3<f64>] {
        &self.atom_pos
    }

    pub(crate) fn slater_indices(&self) -> &[usize] {
        &self.slater_indices
    }

    pub(crate) fn slater_types(&self) -> &[SlaterType] {
        &self.slater_types
    }

    pub(crate) fn zetas(&self) -> &[f64] {
        &self.zetas
    }

    pub(crate) fn pqns(&self) -> &[i32] {
        &self.pqns
    }

    pub(crate) fn overlap(&self) -> &DMatrix<f64> {
        &self.overlap
    }

    pub(crate) fn eigen_vectors(&self) -> &DMatrix<f64> {
        &self.eigen_vectors
    }

    pub(crate) fn density(&self) -> &DMatrix<f64> {
        &self.density
    }
}

impl Default for SlaterSet {
    fn default() -> Self {
        Self::new()
    }
}
