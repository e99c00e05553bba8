//! Slater-type-orbital basis sets and their point-wise evaluation.
//!
//! A [`SlaterSet`] collects the raw output of a quantum-chemistry parser
//! (Slater exponents, quantum numbers, overlap/eigenvector/density
//! matrices) and lazily derives a [`SlaterEvaluator`], the normalized and
//! unit-converted form that computes molecular-orbital amplitudes and
//! electron density at arbitrary points in space.

pub mod eval;
pub mod set;
pub mod slater;


pub use eval::SlaterEvaluator;
pub use set::{SlaterError, SlaterSet};
pub use slater::{Slater, SlaterType, ANGSTROM_TO_BOHR, BOHR_TO_ANGSTROM};
