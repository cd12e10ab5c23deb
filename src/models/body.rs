use crate::models::Vector3;
use crate::utils::NBodyError;

/// A point mass. The index of a body is its position in the arrays handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Vector3,
    pub velocity: Vector3,
    pub mass: f64,
}

impl Body {
    /// Creates a new body.
    ///
    /// # Errors
    ///
    /// Returns an error if `mass` is not strictly positive and finite.
    ///
    /// # Examples
    ///
    /// ```
    /// use rs_nbody::models::{Body, Vector3};
    ///
    /// let body = Body::new(Vector3::ZERO, Vector3::new(0.0, 1.0, 0.0), 2.0).unwrap();
    /// assert_eq!(body.momentum(), Vector3::new(0.0, 2.0, 0.0));
    /// assert!(Body::new(Vector3::ZERO, Vector3::ZERO, 0.0).is_err());
    /// ```
    pub fn new(position: Vector3, velocity: Vector3, mass: f64) -> Result<Self, NBodyError> {
        if !mass.is_finite() || mass <= 0.0 {
            return Err(NBodyError::InvalidMass { index: 0, value: mass });
        }
        Ok(Body { position, velocity, mass })
    }

    pub fn momentum(&self) -> Vector3 {
        self.velocity * self.mass
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.norm_squared()
    }
}

/// Position, velocity and mass arrays in body-index order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyArrays {
    pub positions: Vec<Vector3>,
    pub velocities: Vec<Vector3>,
    pub masses: Vec<f64>,
}

impl BodyArrays {
    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    /// Zips the arrays back into bodies.
    pub fn to_bodies(&self) -> Vec<Body> {
        self.positions.iter()
            .zip(self.velocities.iter())
            .zip(self.masses.iter())
            .map(|((&position, &velocity), &mass)| Body { position, velocity, mass })
            .collect()
    }
}

impl From<&[Body]> for BodyArrays {
    fn from(bodies: &[Body]) -> Self {
        BodyArrays {
            positions: bodies.iter().map(|b| b.position).collect(),
            velocities: bodies.iter().map(|b| b.velocity).collect(),
            masses: bodies.iter().map(|b| b.mass).collect(),
        }
    }
}

/// Checks that every mass is strictly positive and finite.
pub fn validate_masses(masses: &[f64]) -> Result<(), NBodyError> {
    if masses.is_empty() {
        return Err(NBodyError::EmptySystem);
    }
    for (index, &value) in masses.iter().enumerate() {
        if !value.is_finite() || value <= 0.0 {
            return Err(NBodyError::InvalidMass { index, value });
        }
    }
    Ok(())
}
