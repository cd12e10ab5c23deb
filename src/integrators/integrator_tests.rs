use std::f64::consts::PI;
use approx::{assert_abs_diff_eq, assert_relative_eq};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::forces::{accumulate_direct, AccelerationSource, Gravity};
use crate::integrators::{
    advance_adaptive, runge_kutta_step, step_size_factor, IntegrationScheme, RungeKuttaWorkspace,
    DORMAND_PRINCE,
};
use crate::models::{Bounds3D, Vector3};
use crate::utils::{GravityConstants, NBodyError};

fn unit_bounds() -> Bounds3D {
    Bounds3D::new(Vector3::splat(-1.0), Vector3::splat(1.0)).unwrap()
}

fn unit_gravity(masses: Vec<f64>) -> Gravity {
    Gravity::new(masses, GravityConstants::new(Some(1.0), Some(1e-3), None), unit_bounds())
}

/// Two bodies of mass 0.5 at unit separation with G = 1, circling the origin at angular velocity 1.
fn equal_mass_binary() -> (Vec<f64>, Vec<Vector3>, Vec<Vector3>) {
    let masses = vec![0.5, 0.5];
    let positions = vec![Vector3::new(-0.5, 0.0, 0.0), Vector3::new(0.5, 0.0, 0.0)];
    let velocities = vec![Vector3::new(0.0, -0.5, 0.0), Vector3::new(0.0, 0.5, 0.0)];
    (masses, positions, velocities)
}

fn equal_mass_binary_at(t: f64) -> Vector3 {
    Vector3::new(0.5 * t.cos(), 0.5 * t.sin(), 0.0)
}

fn binary_global_error(scheme: IntegrationScheme, dt: f64, t_end: f64) -> f64 {
    let (masses, mut positions, mut velocities) = equal_mass_binary();
    let mut gravity = unit_gravity(masses);
    let mut workspace = RungeKuttaWorkspace::default();
    let steps = (t_end / dt).round() as usize;
    for _ in 0..steps {
        runge_kutta_step(&mut gravity, scheme.tableau(), &mut positions, &mut velocities, dt, &mut workspace)
            .unwrap();
    }
    (positions[1] - equal_mass_binary_at(t_end)).norm()
}

fn random_cloud(count: usize, seed: u64) -> (Vec<f64>, Vec<Vector3>, Vec<Vector3>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sample = |range: f64| Vector3::new(
        rng.random_range(-range..range),
        rng.random_range(-range..range),
        rng.random_range(-range..range),
    );
    let positions: Vec<Vector3> = (0..count).map(|_| sample(1.0)).collect();
    let velocities: Vec<Vector3> = (0..count).map(|_| sample(0.1)).collect();
    let masses = (0..count).map(|i| 0.5 + (i % 7) as f64 * 0.25).collect();
    (masses, positions, velocities)
}

/// Zero-force source that records the positions it is asked to evaluate.
struct RecordingSource {
    body_count: usize,
    seen: Vec<Vec<Vector3>>,
}

impl AccelerationSource for RecordingSource {
    fn body_count(&self) -> usize {
        self.body_count
    }

    fn accelerations(&mut self, positions: &[Vector3], out: &mut [Vector3]) -> Result<(), NBodyError> {
        self.seen.push(positions.to_vec());
        for a in out.iter_mut() {
            *a = Vector3::ZERO;
        }
        Ok(())
    }
}

struct ExplodingSource;

impl AccelerationSource for ExplodingSource {
    fn body_count(&self) -> usize {
        1
    }

    fn accelerations(&mut self, _positions: &[Vector3], out: &mut [Vector3]) -> Result<(), NBodyError> {
        out[0] = Vector3::splat(f64::NAN);
        Ok(())
    }
}

/// Force-free until its evaluation budget runs out, then non-finite.
struct ExhaustibleSource {
    evaluations_left: usize,
}

impl AccelerationSource for ExhaustibleSource {
    fn body_count(&self) -> usize {
        1
    }

    fn accelerations(&mut self, _positions: &[Vector3], out: &mut [Vector3]) -> Result<(), NBodyError> {
        let value = if self.evaluations_left == 0 { f64::NAN } else { 0.0 };
        self.evaluations_left = self.evaluations_left.saturating_sub(1);
        out[0] = Vector3::splat(value);
        Ok(())
    }
}

#[test]
fn test_scheme_identifiers() {
    assert_eq!("euler".parse::<IntegrationScheme>(), Ok(IntegrationScheme::Euler));
    assert_eq!("rk4".parse::<IntegrationScheme>(), Ok(IntegrationScheme::RungeKutta4));
    assert_eq!(" Dormand_Prince ".parse::<IntegrationScheme>(), Ok(IntegrationScheme::DormandPrince));
    assert_eq!("dp".parse::<IntegrationScheme>(), Ok(IntegrationScheme::DormandPrince));
    assert_eq!(
        "verlet".parse::<IntegrationScheme>(),
        Err(NBodyError::UnknownScheme("verlet".to_string()))
    );
    for scheme in IntegrationScheme::ALL {
        assert_eq!(scheme.to_string().parse::<IntegrationScheme>(), Ok(scheme));
    }
}

#[test]
fn test_stage_counts() {
    assert_eq!(IntegrationScheme::Euler.stages(), 1);
    assert_eq!(IntegrationScheme::RungeKutta4.stages(), 4);
    assert_eq!(IntegrationScheme::DormandPrince.stages(), 7);
}

#[test]
fn test_tableaux_are_consistent() {
    for scheme in IntegrationScheme::ALL {
        let tableau = scheme.tableau();
        assert_eq!(tableau.a.len(), tableau.stages());
        assert_eq!(tableau.c.len(), tableau.stages());
        assert_abs_diff_eq!(tableau.b.iter().sum::<f64>(), 1.0, epsilon = 1e-14);
        for (s, row) in tableau.a.iter().enumerate() {
            assert_eq!(row.len(), s);
            assert_abs_diff_eq!(row.iter().sum::<f64>(), tableau.c[s], epsilon = 1e-14);
        }
        if let Some(b_low) = tableau.b_embedded {
            assert_eq!(b_low.len(), tableau.stages());
            assert_abs_diff_eq!(b_low.iter().sum::<f64>(), 1.0, epsilon = 1e-14);
        }
    }
    assert_eq!(DORMAND_PRINCE.b[0], 35.0 / 384.0);
    assert_eq!(DORMAND_PRINCE.b[4], -2187.0 / 6784.0);
}

#[test]
fn test_euler_step_matches_hand_update() {
    let (masses, mut positions, mut velocities) = equal_mass_binary();
    let constants = GravityConstants::new(Some(1.0), Some(1e-3), None);
    let mut expected_a = vec![Vector3::ZERO; 2];
    accumulate_direct(&positions, &masses, &constants, &mut expected_a);
    let dt = 0.01;
    let expected_x: Vec<Vector3> = positions.iter().zip(&velocities).map(|(x, v)| *x + *v * dt).collect();
    let expected_v: Vec<Vector3> = velocities.iter().zip(&expected_a).map(|(v, a)| *v + *a * dt).collect();

    let mut gravity = unit_gravity(masses);
    let mut workspace = RungeKuttaWorkspace::default();
    let outcome = runge_kutta_step(
        &mut gravity,
        IntegrationScheme::Euler.tableau(),
        &mut positions,
        &mut velocities,
        dt,
        &mut workspace,
    )
    .unwrap();

    assert_eq!(outcome.force_evaluations, 1);
    assert!(outcome.error_estimate.is_none());
    assert_eq!(positions, expected_x);
    assert_eq!(velocities, expected_v);
}

#[test]
fn test_stages_start_from_the_pre_step_state() {
    let positions0 = vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(-1.0, 0.0, 0.5)];
    let velocities0 = vec![Vector3::new(0.5, 0.0, -1.0), Vector3::new(0.0, 2.0, 0.0)];
    let dt = 0.1;

    for scheme in [IntegrationScheme::RungeKutta4, IntegrationScheme::DormandPrince] {
        let mut positions = positions0.clone();
        let mut velocities = velocities0.clone();
        let mut source = RecordingSource { body_count: 2, seen: Vec::new() };
        let mut workspace = RungeKuttaWorkspace::default();
        runge_kutta_step(&mut source, scheme.tableau(), &mut positions, &mut velocities, dt, &mut workspace)
            .unwrap();

        let tableau = scheme.tableau();
        assert_eq!(source.seen.len(), tableau.stages());
        for (s, trial) in source.seen.iter().enumerate() {
            for i in 0..2 {
                let expected = positions0[i] + velocities0[i] * (tableau.c[s] * dt);
                assert_relative_eq!(trial[i], expected, epsilon = 1e-14);
            }
        }
        for i in 0..2 {
            assert_relative_eq!(positions[i], positions0[i] + velocities0[i] * dt, epsilon = 1e-14);
            assert_eq!(velocities[i], velocities0[i]);
        }
    }
}

#[test]
fn test_non_finite_result_leaves_state_untouched() {
    let mut positions = vec![Vector3::new(1.0, 0.0, 0.0)];
    let mut velocities = vec![Vector3::new(0.0, 1.0, 0.0)];
    let mut workspace = RungeKuttaWorkspace::default();
    for scheme in IntegrationScheme::ALL {
        let result = runge_kutta_step(
            &mut ExplodingSource,
            scheme.tableau(),
            &mut positions,
            &mut velocities,
            0.1,
            &mut workspace,
        );
        assert!(matches!(result, Err(NBodyError::CalculationError(_))));
        assert_eq!(positions, vec![Vector3::new(1.0, 0.0, 0.0)]);
        assert_eq!(velocities, vec![Vector3::new(0.0, 1.0, 0.0)]);
    }
}

#[test]
fn test_length_mismatch_is_rejected() {
    let mut gravity = unit_gravity(vec![1.0, 1.0]);
    let mut positions = vec![Vector3::ZERO];
    let mut velocities = vec![Vector3::ZERO];
    let mut workspace = RungeKuttaWorkspace::default();
    let result = runge_kutta_step(
        &mut gravity,
        IntegrationScheme::Euler.tableau(),
        &mut positions,
        &mut velocities,
        0.1,
        &mut workspace,
    );
    assert_eq!(result, Err(NBodyError::LengthMismatch { expected: 2, found: 1 }));
    assert_eq!(gravity.evaluations(), 0);
}

#[test]
fn test_every_scheme_conserves_momentum() {
    for scheme in IntegrationScheme::ALL {
        let (masses, mut positions, mut velocities) = random_cloud(30, 99);
        let before = velocities.clone();
        let mut gravity = unit_gravity(masses.clone());
        let mut workspace = RungeKuttaWorkspace::default();
        runge_kutta_step(&mut gravity, scheme.tableau(), &mut positions, &mut velocities, 0.01, &mut workspace)
            .unwrap();

        let mut net = Vector3::ZERO;
        let mut scale = 0.0;
        for i in 0..masses.len() {
            let dp = (velocities[i] - before[i]) * masses[i];
            net += dp;
            scale += dp.norm();
        }
        assert!(net.norm() <= 1e-12 * scale, "{}: net momentum change {:?}", scheme, net);
    }
}

#[test]
fn test_kepler_orbit_returns_after_one_period() {
    let constants = GravityConstants::default();
    let g = constants.gravitational_constant;
    let (central, orbiter, r) = (1.0, 1e-3, 1.0);
    let total = central + orbiter;
    let v_rel = (g * total / r).sqrt();
    let period = 2.0 * PI * (r * r * r / (g * total)).sqrt();
    assert_relative_eq!(period, 36.7, max_relative = 0.01);

    let masses = vec![central, orbiter];
    let mut positions = vec![Vector3::new(-orbiter / total * r, 0.0, 0.0), Vector3::new(central / total * r, 0.0, 0.0)];
    let mut velocities = vec![
        Vector3::new(0.0, -orbiter / total * v_rel, 0.0),
        Vector3::new(0.0, central / total * v_rel, 0.0),
    ];
    let start = positions[1] - positions[0];

    let mut gravity = Gravity::new(masses, constants, unit_bounds());
    let mut workspace = RungeKuttaWorkspace::default();
    let steps = 400;
    let dt = period / steps as f64;
    let mut max_error: f64 = 0.0;
    for _ in 0..steps {
        let outcome = runge_kutta_step(
            &mut gravity,
            IntegrationScheme::DormandPrince.tableau(),
            &mut positions,
            &mut velocities,
            dt,
            &mut workspace,
        )
        .unwrap();
        max_error = max_error.max(outcome.error_estimate.unwrap().max());
    }

    let end = positions[1] - positions[0];
    assert!((end - start).norm() < 0.01 * r, "drift {:?}", end - start);
    assert!(max_error < 1e-6);
}

#[test]
fn test_euler_converges_at_first_order() {
    let coarse = binary_global_error(IntegrationScheme::Euler, 0.01, 1.0);
    let fine = binary_global_error(IntegrationScheme::Euler, 0.005, 1.0);
    let ratio = coarse / fine;
    assert!(ratio > 1.8 && ratio < 2.2, "Euler error ratio {}", ratio);
}

#[test]
fn test_rk4_converges_at_fourth_order() {
    let coarse = binary_global_error(IntegrationScheme::RungeKutta4, 0.05, 2.0);
    let fine = binary_global_error(IntegrationScheme::RungeKutta4, 0.025, 2.0);
    let ratio = coarse / fine;
    assert!(ratio > 13.0 && ratio < 19.0, "RK4 error ratio {}", ratio);
}

#[test]
fn test_dormand_prince_beats_rk4() {
    let rk4 = binary_global_error(IntegrationScheme::RungeKutta4, 0.1, 2.0);
    let dp = binary_global_error(IntegrationScheme::DormandPrince, 0.1, 2.0);
    assert!(dp < rk4, "dp {} vs rk4 {}", dp, rk4);
}

#[test]
fn test_error_estimate_shrinks_with_step() {
    let estimate = |dt: f64| {
        let (masses, mut positions, mut velocities) = equal_mass_binary();
        let mut gravity = unit_gravity(masses);
        let mut workspace = RungeKuttaWorkspace::default();
        runge_kutta_step(
            &mut gravity,
            IntegrationScheme::DormandPrince.tableau(),
            &mut positions,
            &mut velocities,
            dt,
            &mut workspace,
        )
        .unwrap()
        .error_estimate
        .unwrap()
        .max()
    };
    let ratio = estimate(0.2) / estimate(0.1);
    assert!(ratio > 16.0, "error estimate ratio {}", ratio);
}

#[test]
fn test_step_size_controller_is_clamped() {
    assert_eq!(step_size_factor(0.0, 1e-8), 5.0);
    assert_eq!(step_size_factor(1e-20, 1e-8), 5.0);
    assert_eq!(step_size_factor(1.0, 1e-8), 0.2);
    assert_relative_eq!(step_size_factor(32.0, 1.0), 0.45, max_relative = 1e-12);
    assert_eq!(step_size_factor(f64::NAN, 1e-8), 0.2);
    assert_eq!(step_size_factor(f64::INFINITY, 1e-8), 0.2);
}

#[test]
fn test_adaptive_orbit_closes() {
    let (masses, mut positions, mut velocities) = equal_mass_binary();
    let mut gravity = unit_gravity(masses);
    let mut workspace = RungeKuttaWorkspace::default();
    let report = advance_adaptive(
        &mut gravity,
        &mut positions,
        &mut velocities,
        2.0 * PI,
        1e-9,
        1.0,
        &mut workspace,
    )
    .unwrap();

    assert!(report.accepted > 0);
    assert!(report.rejected > 0);
    assert!(report.last_dt > 0.0);
    assert!((positions[1] - equal_mass_binary_at(2.0 * PI)).norm() < 1e-5);
    assert_eq!(
        gravity.evaluations(),
        7 * (report.accepted + report.rejected) as u64
    );
}

#[test]
fn test_adaptive_rejects_bad_requests() {
    let (masses, mut positions, mut velocities) = equal_mass_binary();
    let mut gravity = unit_gravity(masses);
    let mut workspace = RungeKuttaWorkspace::default();
    let before = positions.clone();

    let mut run = |duration: f64, tolerance: f64, dt: f64| {
        advance_adaptive(&mut gravity, &mut positions, &mut velocities, duration, tolerance, dt, &mut workspace)
    };
    assert_eq!(run(1.0, 0.0, 0.1), Err(NBodyError::InvalidTolerance(0.0)));
    assert_eq!(run(-1.0, 1e-6, 0.1), Err(NBodyError::InvalidTimeStep(-1.0)));
    assert_eq!(run(1.0, 1e-6, 0.0), Err(NBodyError::InvalidTimeStep(0.0)));
    assert!(matches!(run(f64::NAN, 1e-6, 0.1), Err(NBodyError::InvalidTimeStep(_))));
    assert_eq!(run(0.0, 1e-6, 0.1).map(|r| r.accepted), Ok(0));

    assert_eq!(positions, before);
}

#[test]
fn test_failed_adaptive_advance_rolls_back_accepted_steps() {
    // Two accepted Dormand-Prince steps (seven evaluations each), then a blow-up.
    let mut source = ExhaustibleSource { evaluations_left: 14 };
    let mut positions = vec![Vector3::ZERO];
    let mut velocities = vec![Vector3::new(1.0, 0.0, 0.0)];
    let mut workspace = RungeKuttaWorkspace::default();
    let result = advance_adaptive(
        &mut source,
        &mut positions,
        &mut velocities,
        10.0,
        1e-6,
        0.01,
        &mut workspace,
    );
    assert!(matches!(result, Err(NBodyError::CalculationError(_))));
    assert_eq!(source.evaluations_left, 0);
    assert_eq!(positions, vec![Vector3::ZERO]);
    assert_eq!(velocities, vec![Vector3::new(1.0, 0.0, 0.0)]);
}

#[test]
fn test_adaptive_underflow_rolls_back_state() {
    let (masses, mut positions, mut velocities) = equal_mass_binary();
    let mut gravity = unit_gravity(masses);
    let mut workspace = RungeKuttaWorkspace::default();
    let before = (positions.clone(), velocities.clone());

    let result = advance_adaptive(
        &mut gravity,
        &mut positions,
        &mut velocities,
        1.0,
        1e-300,
        0.01,
        &mut workspace,
    );
    assert!(matches!(result, Err(NBodyError::CalculationError(_))));
    assert_eq!((positions, velocities), before);
}
