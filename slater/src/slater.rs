use std::f64::consts::PI;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::set::SlaterError;

pub const BOHR_TO_ANGSTROM: f64 = 0.529177249;
pub const ANGSTROM_TO_BOHR: f64 = 1.0 / BOHR_TO_ANGSTROM;

/// Values below this magnitude are treated as structural zeros when
/// scanning coefficient and density matrices.
pub(crate) const ZERO_CUTOFF: f64 = 1e-15;

pub(crate) fn is_small(val: f64) -> bool {
    val.abs() < ZERO_CUTOFF
}

fn factorial(n: i32) -> f64 {
    (1..=n).fold(1.0, |acc, x| acc * x as f64)
}

/// Real Slater orbital types: one s function, the three p components and
/// the five d components, in the order external loaders emit their codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlaterType {
    S,
    PX,
    PY,
    PZ,
    X2,
    XZ,
    Z2,
    YZ,
    XY,
}

impl TryFrom<i32> for SlaterType {
    type Error = SlaterError;

    /// Map a raw orbital-type code onto the enumeration. Codes outside the
    /// known set are rejected at this boundary.
    fn try_from(code: i32) -> Result<Self, SlaterError> {
        match code {
            0 => Ok(SlaterType::S),
            1 => Ok(SlaterType::PX),
            2 => Ok(SlaterType::PY),
            3 => Ok(SlaterType::PZ),
            4 => Ok(SlaterType::X2),
            5 => Ok(SlaterType::XZ),
            6 => Ok(SlaterType::Z2),
            7 => Ok(SlaterType::YZ),
            8 => Ok(SlaterType::XY),
            _ => Err(SlaterError::UnsupportedSlaterType(code)),
        }
    }
}

impl SlaterType {
    /// Angular-momentum contribution removed from the principal quantum
    /// number to obtain the effective radial power.
    fn pqn_shift(self) -> i32 {
        match self {
            SlaterType::S => 1,
            SlaterType::PX | SlaterType::PY | SlaterType::PZ => 2,
            _ => 3,
        }
    }

    fn angular_norm(self) -> f64 {
        match self {
            SlaterType::S => 1.0,
            SlaterType::PX | SlaterType::PY | SlaterType::PZ => 3.0,
            _ => 15.0,
        }
    }

    fn norm_scale(self) -> f64 {
        match self {
            SlaterType::X2 => 0.5,
            SlaterType::Z2 => 0.5 / 3.0_f64.sqrt(),
            _ => 1.0,
        }
    }

    /// Angular part of the real spherical harmonic, up to the constant
    /// folded into the normalization factor.
    pub fn angular(self, delta: &Vector3<f64>) -> f64 {
        match self {
            SlaterType::S => 1.0,
            SlaterType::PX => delta.x,
            SlaterType::PY => delta.y,
            SlaterType::PZ => delta.z,
            // (x^2 - y^2) r^n
            SlaterType::X2 => delta.x * delta.x - delta.y * delta.y,
            // xz r^n
            SlaterType::XZ => delta.x * delta.z,
            // (2z^2 - x^2 - y^2) r^n
            SlaterType::Z2 => {
                2.0 * delta.z * delta.z - delta.x * delta.x - delta.y * delta.y
            }
            // yz r^n
            SlaterType::YZ => delta.y * delta.z,
            // xy r^n
            SlaterType::XY => delta.x * delta.y,
        }
    }
}

/// A single normalized Slater basis function, ready for grid evaluation.
///
/// The exponent is converted to be consistent with untransformed position
/// deltas, and the radial power carries the effective principal quantum
/// number with the angular contribution removed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slater {
    /// Index of the atom this function is centered on.
    pub atom: usize,
    pub typ: SlaterType,
    pub zeta: f64,
    pub rpow: i32,
    pub norm: f64,
}

impl Slater {
    /// Build a normalized function from the raw basis parameters.
    ///
    /// The normalization factor is computed from the zeta as supplied:
    /// `(2 zeta)^(n + 1/2) * sqrt(k / (4 pi) / (2n)!)` with k = 1, 3 or 15
    /// for s, p and d functions (the x2-y2 and z2 functions carry an extra
    /// 1/2 and 1/(2 sqrt(3))). The stored exponent is unit-converted
    /// afterwards.
    pub fn new(atom: usize, typ: SlaterType, zeta: f64, pqn: i32) -> Self {
        let norm = typ.norm_scale()
            * (2.0 * zeta).powf(pqn as f64 + 0.5)
            * (typ.angular_norm() / (4.0 * PI) / factorial(2 * pqn)).sqrt();
        Slater {
            atom,
            typ,
            zeta: zeta / BOHR_TO_ANGSTROM,
            rpow: pqn - typ.pqn_shift(),
            norm,
        }
    }

    fn radial(&self, r: f64) -> f64 {
        if self.rpow > 0 {
            r.powi(self.rpow)
        } else {
            1.0
        }
    }

    /// Value of the bare basis function at a point, given the delta to its
    /// atom and the distance `r = |delta|`.
    pub fn value(&self, delta: &Vector3<f64>, r: f64) -> f64 {
        self.value_with_exp(delta, r, (-self.zeta * r).exp())
    }

    /// Same as [`Slater::value`] with `exp(-zeta * r)` supplied by the
    /// caller, so a density pass can share one exponential per basis
    /// function per point.
    pub fn value_with_exp(&self, delta: &Vector3<f64>, r: f64, exp_zr: f64) -> f64 {
        self.norm * exp_zr * self.radial(r) * self.typ.angular(delta)
    }
}
