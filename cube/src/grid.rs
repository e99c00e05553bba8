use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use itertools::iproduct;
use nalgebra::Vector3;

/// A regular 3D lattice of scalar samples.
///
/// Values live behind an [`RwLock`]: an evaluation pass holds the write
/// half for its whole duration, so readers never observe a partially
/// written field. Cells are indexed with x varying slowest and z fastest.
#[derive(Debug)]
pub struct Cube {
    origin: Vector3<f64>,
    spacing: Vector3<f64>,
    points: [usize; 3],
    data: RwLock<Vec<f64>>,
}

impl Cube {
    /// A lattice of `points` cells per axis, starting at `origin` with the
    /// given per-axis step, initialized to zero.
    pub fn new(origin: Vector3<f64>, spacing: Vector3<f64>, points: [usize; 3]) -> Self {
        let len = points[0] * points[1] * points[2];
        Cube {
            origin,
            spacing,
            points,
            data: RwLock::new(vec![0.0; len]),
        }
    }

    pub fn len(&self) -> usize {
        self.points[0] * self.points[1] * self.points[2]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn points(&self) -> [usize; 3] {
        self.points
    }

    pub fn origin(&self) -> Vector3<f64> {
        self.origin
    }

    pub fn spacing(&self) -> Vector3<f64> {
        self.spacing
    }

    /// Position of cell `index`.
    pub fn position(&self, index: usize) -> Vector3<f64> {
        let [_, ny, nz] = self.points;
        let i = index / (ny * nz);
        let j = (index / nz) % ny;
        let k = index % nz;
        self.lattice_point(i, j, k)
    }

    /// All cell positions in index order.
    pub fn positions(&self) -> impl Iterator<Item = Vector3<f64>> + '_ {
        let [nx, ny, nz] = self.points;
        iproduct!(0..nx, 0..ny, 0..nz).map(move |(i, j, k)| self.lattice_point(i, j, k))
    }

    fn lattice_point(&self, i: usize, j: usize, k: usize) -> Vector3<f64> {
        self.origin
            + Vector3::new(
                i as f64 * self.spacing.x,
                j as f64 * self.spacing.y,
                k as f64 * self.spacing.z,
            )
    }

    /// The lock guarding the scalar field. Evaluation passes take the
    /// write half; everything else goes through the read half.
    pub fn lock(&self) -> &RwLock<Vec<f64>> {
        &self.data
    }

    /// Read access to the whole field, blocking while a pass is writing.
    pub fn values(&self) -> RwLockReadGuard<'_, Vec<f64>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Single cell value, blocking while a pass is writing.
    pub fn value(&self, index: usize) -> f64 {
        self.values()[index]
    }

    /// Overwrite a single cell, blocking while a pass is writing.
    pub fn set_value(&self, index: usize, value: f64) {
        self.data.write().unwrap_or_else(PoisonError::into_inner)[index] = value;
    }
}
