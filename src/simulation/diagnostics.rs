// src/simulation/diagnostics.rs

use crate::models::Vector3;
use crate::utils::GravityConstants;

/// Returns the total linear momentum `Σ m v`.
pub fn total_momentum(masses: &[f64], velocities: &[Vector3]) -> Vector3 {
    masses.iter().zip(velocities.iter()).map(|(&m, &v)| v * m).sum()
}

/// Returns the total kinetic energy `Σ m |v|² / 2`.
pub fn kinetic_energy(masses: &[f64], velocities: &[Vector3]) -> f64 {
    masses.iter()
        .zip(velocities.iter())
        .map(|(&m, v)| 0.5 * m * v.norm_squared())
        .sum()
}

/// Potential energy of one pair at distance `distance`.
///
/// Outside the softening length `s` this is `-G m_i m_j / d`. Inside, the force
/// magnitude is held at `G m_i m_j / s²`, whose potential is
/// `G m_i m_j (d / s² - 2 / s)`. Both forms give `-G m_i m_j / s` at `d = s`.
///
/// # Example
/// ```
/// use rs_nbody::simulation::pair_potential;
///
/// assert_eq!(pair_potential(2.0, 1.0, 3.0, 1.0, 0.1), -1.5);
/// let s = 0.1;
/// assert!((pair_potential(s, 1.0, 1.0, 1.0, s) + 1.0 / s).abs() < 1e-12);
/// ```
pub fn pair_potential(distance: f64, mass_i: f64, mass_j: f64, gravitational_constant: f64, softening_length: f64) -> f64 {
    let gmm = gravitational_constant * mass_i * mass_j;
    if distance < softening_length {
        gmm * (distance / (softening_length * softening_length) - 2.0 / softening_length)
    } else {
        -gmm / distance
    }
}

/// Returns the total potential energy, summed over every unordered pair.
pub fn potential_energy(masses: &[f64], positions: &[Vector3], constants: &GravityConstants) -> f64 {
    let mut energy = 0.0;
    for i in 1..positions.len() {
        for j in 0..i {
            let d = positions[i].distance(&positions[j]);
            energy += pair_potential(
                d,
                masses[i],
                masses[j],
                constants.gravitational_constant,
                constants.softening_length,
            );
        }
    }
    energy
}

pub fn total_energy(masses: &[f64], positions: &[Vector3], velocities: &[Vector3], constants: &GravityConstants) -> f64 {
    kinetic_energy(masses, velocities) + potential_energy(masses, positions, constants)
}

/// Returns the mass-weighted mean position. An empty system has its center at the origin.
pub fn center_of_mass(masses: &[f64], positions: &[Vector3]) -> Vector3 {
    let total: f64 = masses.iter().sum();
    if total == 0.0 {
        return Vector3::ZERO;
    }
    let weighted: Vector3 = masses.iter().zip(positions.iter()).map(|(&m, &p)| p * m).sum();
    weighted / total
}

/// A snapshot of the conserved quantities of a state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemDiagnostics {
    pub momentum: Vector3,
    pub kinetic_energy: f64,
    pub potential_energy: f64,
    pub total_energy: f64,
    pub center_of_mass: Vector3,
}

impl SystemDiagnostics {
    pub fn measure(
        masses: &[f64],
        positions: &[Vector3],
        velocities: &[Vector3],
        constants: &GravityConstants,
    ) -> Self {
        let kinetic = kinetic_energy(masses, velocities);
        let potential = potential_energy(masses, positions, constants);
        SystemDiagnostics {
            momentum: total_momentum(masses, velocities),
            kinetic_energy: kinetic,
            potential_energy: potential,
            total_energy: kinetic + potential,
            center_of_mass: center_of_mass(masses, positions),
        }
    }

    /// Relative change of total energy with respect to `reference`.
    pub fn energy_drift(&self, reference: &SystemDiagnostics) -> f64 {
        if reference.total_energy == 0.0 {
            return (self.total_energy - reference.total_energy).abs();
        }
        ((self.total_energy - reference.total_energy) / reference.total_energy).abs()
    }
}
