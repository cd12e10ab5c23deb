// demos/cloud_collapse.rs
//
// Spawns a cloud of equal-mass bodies in a box, lets it collapse under gravity
// and bounces bodies off the walls. Usage:
//
//     cargo run --example cloud_collapse -- [scheme] [frames]

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rs_nbody::integrators::IntegrationScheme;
use rs_nbody::models::{Bounds3D, Vector3};
use rs_nbody::simulation::{random_cloud, Engine, EngineConfig};
use rs_nbody::utils::NBodyError;

const BODY_COUNT: usize = 150;
const BODY_MASS: f64 = 1000.0;
const BODY_RADIUS: f64 = 0.05;
const MAX_SPEED: f64 = 0.001;
const FRAME_TIME: f64 = 1.0 / 60.0;

/// Reflects bodies that crossed a wall back inside and points their velocity inwards.
fn bounce(positions: &mut [Vector3], velocities: &mut [Vector3], bounds: &Bounds3D, radius: f64) -> usize {
    let mut bounces = 0;
    for (p, v) in positions.iter_mut().zip(velocities.iter_mut()) {
        let axes = [
            (&mut p.x, &mut v.x, bounds.min.x, bounds.max.x),
            (&mut p.y, &mut v.y, bounds.min.y, bounds.max.y),
            (&mut p.z, &mut v.z, bounds.min.z, bounds.max.z),
        ];
        for (position, velocity, min, max) in axes {
            if *position - radius < min {
                *velocity = velocity.abs();
                *position = 2.0 * (min + radius) - *position;
                bounces += 1;
            } else if *position + radius > max {
                *velocity = -velocity.abs();
                *position = 2.0 * (max - radius) - *position;
                bounces += 1;
            }
        }
    }
    bounces
}

fn main() -> Result<(), NBodyError> {
    env_logger::builder().filter_level(log::LevelFilter::Info).init();

    let mut args = std::env::args().skip(1);
    let scheme: IntegrationScheme = match args.next() {
        Some(name) => name.parse()?,
        None => IntegrationScheme::DormandPrince,
    };
    let frames: usize = args.next().and_then(|f| f.parse().ok()).unwrap_or(600);

    let bounds = Bounds3D::new(Vector3::new(-8.0, -4.5, -4.5), Vector3::new(8.0, 4.5, 4.5))?;
    let config = EngineConfig::default();
    let mut rng = StdRng::seed_from_u64(1);
    let cloud = random_cloud(BODY_COUNT, &bounds, BODY_MASS, MAX_SPEED, config.constants.init_scale, &mut rng)?;

    let mut positions = cloud.positions;
    let mut velocities = cloud.velocities;
    let mut engine = Engine::new(cloud.masses, &positions, bounds, config)?;
    let start = engine.diagnostics(&positions, &velocities);

    println!("Initial state:");
    println!("{} bodies, scheme {}, G = {}", engine.body_count(), scheme, config.constants.gravitational_constant);
    println!("Total energy: {:.6e}", start.total_energy);

    let mut total_bounces = 0;
    for frame in 1..=frames {
        engine.step(&mut positions, &mut velocities, FRAME_TIME, scheme)?;
        total_bounces += bounce(&mut positions, &mut velocities, &bounds, BODY_RADIUS);

        if frame % 100 == 0 {
            let d = engine.diagnostics(&positions, &velocities);
            info!(
                "frame {}: E = {:.6e}, KE = {:.6e}, bounces = {}",
                frame, d.total_energy, d.kinetic_energy, total_bounces
            );
        }
    }

    let end = engine.diagnostics(&positions, &velocities);
    println!("\nAfter {} frames:", frames);
    println!("Total energy: {:.6e} (drift {:.3e})", end.total_energy, end.energy_drift(&start));
    println!("Center of mass: {:?}", end.center_of_mass);
    println!("Wall bounces: {}", total_bounces);
    if let Some(estimate) = engine.last_error_estimate() {
        println!("Last local error estimate: {:.3e}", estimate.max());
    }

    Ok(())
}
