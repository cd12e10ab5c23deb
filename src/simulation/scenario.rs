// src/simulation/scenario.rs

use log::debug;
use rand::Rng;
use crate::models::{BodyArrays, Bounds3D, Vector3};
use crate::utils::NBodyError;

/// Spawns `count` bodies of equal `mass` with uniform random positions and velocities.
///
/// Each position coordinate is drawn uniformly from the bounds on that axis and
/// then multiplied by `init_scale`, which pulls the cloud towards the origin for
/// scales below one. Each velocity component is drawn from `[-max_speed, max_speed]`.
///
/// # Example
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use rs_nbody::models::{Bounds3D, Vector3};
/// use rs_nbody::simulation::random_cloud;
///
/// let bounds = Bounds3D::new(Vector3::splat(-4.0), Vector3::splat(4.0)).unwrap();
/// let mut rng = StdRng::seed_from_u64(7);
/// let cloud = random_cloud(150, &bounds, 1000.0, 0.001, 0.5, &mut rng).unwrap();
///
/// assert_eq!(cloud.len(), 150);
/// assert!(cloud.positions.iter().all(|p| p.max_abs() <= 2.0));
/// ```
pub fn random_cloud<R: Rng + ?Sized>(
    count: usize,
    bounds: &Bounds3D,
    mass: f64,
    max_speed: f64,
    init_scale: f64,
    rng: &mut R,
) -> Result<BodyArrays, NBodyError> {
    if count == 0 {
        return Err(NBodyError::EmptySystem);
    }
    if !mass.is_finite() || mass <= 0.0 {
        return Err(NBodyError::InvalidMass { index: 0, value: mass });
    }
    if !max_speed.is_finite() || max_speed < 0.0 {
        return Err(NBodyError::CalculationError(format!("Invalid maximum speed: {}", max_speed)));
    }
    if !init_scale.is_finite() {
        return Err(NBodyError::CalculationError(format!("Invalid spawn scale: {}", init_scale)));
    }
    let bounds = Bounds3D::new(bounds.min, bounds.max)?;

    let mut cloud = BodyArrays {
        positions: Vec::with_capacity(count),
        velocities: Vec::with_capacity(count),
        masses: vec![mass; count],
    };
    for _ in 0..count {
        let position = Vector3::new(
            rng.random_range(bounds.min.x..=bounds.max.x),
            rng.random_range(bounds.min.y..=bounds.max.y),
            rng.random_range(bounds.min.z..=bounds.max.z),
        ) * init_scale;
        let velocity = Vector3::new(
            rng.random_range(-max_speed..=max_speed),
            rng.random_range(-max_speed..=max_speed),
            rng.random_range(-max_speed..=max_speed),
        );
        cloud.positions.push(position);
        cloud.velocities.push(velocity);
    }

    debug!("Spawned a cloud of {} bodies inside {:?} scaled by {}", count, bounds, init_scale);
    Ok(cloud)
}

/// Two bodies on a circular orbit about their common center of mass, which sits at the origin at rest.
///
/// The bodies start on the x axis, `separation` apart, and orbit counter-clockwise
/// about +z with relative speed `sqrt(G (m1 + m2) / separation)`.
///
/// # Returns
/// The body arrays and the orbital period `2π sqrt(separation³ / (G (m1 + m2)))`.
pub fn circular_binary(
    primary_mass: f64,
    secondary_mass: f64,
    separation: f64,
    gravitational_constant: f64,
) -> Result<(BodyArrays, f64), NBodyError> {
    for (index, &value) in [primary_mass, secondary_mass].iter().enumerate() {
        if !value.is_finite() || value <= 0.0 {
            return Err(NBodyError::InvalidMass { index, value });
        }
    }
    if !gravitational_constant.is_finite() || gravitational_constant <= 0.0 {
        return Err(NBodyError::InvalidGravitationalConstant(gravitational_constant));
    }
    if !separation.is_finite() || separation <= 0.0 {
        return Err(NBodyError::CalculationError(format!("Invalid separation: {}", separation)));
    }

    let total = primary_mass + secondary_mass;
    let relative_speed = (gravitational_constant * total / separation).sqrt();
    let primary_share = secondary_mass / total;
    let secondary_share = primary_mass / total;

    let arrays = BodyArrays {
        positions: vec![
            Vector3::new(-primary_share * separation, 0.0, 0.0),
            Vector3::new(secondary_share * separation, 0.0, 0.0),
        ],
        velocities: vec![
            Vector3::new(0.0, -primary_share * relative_speed, 0.0),
            Vector3::new(0.0, secondary_share * relative_speed, 0.0),
        ],
        masses: vec![primary_mass, secondary_mass],
    };
    let period = 2.0 * std::f64::consts::PI * (separation.powi(3) / (gravitational_constant * total)).sqrt();
    Ok((arrays, period))
}
