use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected coordinates for a sphere position.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("position {coords:?} cannot be projected onto the unit sphere")]
pub struct InvalidPosition {
    /// Offending coordinates.
    pub coords: [f64; 4],
}

/// Point on the unit 3-sphere (a unit vector in R⁴).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 4]", try_from = "[f64; 4]")]
pub struct Position([f64; 4]);

impl Position {
    /// Normalizes `coords` onto the sphere. Zero-length or non-finite input
    /// is rejected.
    pub fn new(coords: [f64; 4]) -> Result<Self, InvalidPosition> {
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(InvalidPosition { coords });
        }
        let norm = coords.iter().map(|c| c * c).sum::<f64>().sqrt();
        if norm < 1e-12 {
            return Err(InvalidPosition { coords });
        }
        Ok(Self(coords.map(|c| c / norm)))
    }

    /// Position from hyperspherical angles. Always on the sphere.
    #[must_use]
    pub fn from_angles(psi: f64, theta: f64, phi: f64) -> Self {
        Self([
            psi.cos(),
            psi.sin() * theta.cos(),
            psi.sin() * theta.sin() * phi.cos(),
            psi.sin() * theta.sin() * phi.sin(),
        ])
    }

    /// Coordinates in R⁴.
    #[must_use]
    pub const fn coords(&self) -> [f64; 4] {
        self.0
    }

    /// Euclidean dot product.
    #[must_use]
    pub fn dot(&self, other: &Self) -> f64 {
        self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum()
    }

    /// Great-circle angle to `other`, in radians within `[0, π]`.
    #[must_use]
    pub fn geodesic(&self, other: &Self) -> f64 {
        geodesic_distance(self, other)
    }
}

impl From<Position> for [f64; 4] {
    fn from(position: Position) -> Self {
        position.0
    }
}

impl TryFrom<[f64; 4]> for Position {
    type Error = InvalidPosition;

    fn try_from(coords: [f64; 4]) -> Result<Self, Self::Error> {
        Self::new(coords)
    }
}

/// `arccos(clamp(a·b, -1, 1))`.
#[must_use]
pub fn geodesic_distance(a: &Position, b: &Position) -> f64 {
    a.dot(b).clamp(-1.0, 1.0).acos()
}
