//! Cube-grid evaluation engine for Slater basis sets.
//!
//! Pairs a [`slater::SlaterSet`] with a [`Cube`] grid and fills the grid
//! with molecular-orbital amplitudes ([`compute_orbital`]) or total
//! electron density ([`compute_density`]). A pass runs one task per grid
//! cell on a bounded worker pool, holds the cube's write lock for its
//! whole duration, and signals completion exactly once, after every task
//! has finished.

pub mod engine;
pub mod grid;


pub use engine::{compute_density, compute_orbital, CubeError, PassHandle, PassSummary};
pub use grid::Cube;
