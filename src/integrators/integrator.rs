// src/integrators/integrator.rs

use std::fmt;
use std::str::FromStr;
use log::{debug, error, warn};
use crate::forces::AccelerationSource;
use crate::integrators::{ButcherTableau, DORMAND_PRINCE, EULER, RUNGE_KUTTA_4};
use crate::models::Vector3;
use crate::utils::NBodyError;

/// Safety factor applied to the optimal step size estimate.
pub const STEP_SAFETY_FACTOR: f64 = 0.9;
/// Smallest factor by which the adaptive controller shrinks a step.
pub const MIN_STEP_FACTOR: f64 = 0.2;
/// Largest factor by which the adaptive controller grows a step.
pub const MAX_STEP_FACTOR: f64 = 5.0;

const REJECTION_WARN_THRESHOLD: usize = 10;

/// The time-stepping schemes the engine can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IntegrationScheme {
    #[default]
    Euler,
    RungeKutta4,
    DormandPrince,
}

impl IntegrationScheme {
    pub const ALL: [IntegrationScheme; 3] = [
        IntegrationScheme::Euler,
        IntegrationScheme::RungeKutta4,
        IntegrationScheme::DormandPrince,
    ];

    pub fn tableau(&self) -> &'static ButcherTableau {
        match self {
            IntegrationScheme::Euler => &EULER,
            IntegrationScheme::RungeKutta4 => &RUNGE_KUTTA_4,
            IntegrationScheme::DormandPrince => &DORMAND_PRINCE,
        }
    }

    /// Number of force evaluations per step.
    pub fn stages(&self) -> usize {
        self.tableau().stages()
    }

    pub fn order(&self) -> u32 {
        self.tableau().order
    }

    pub fn name(&self) -> &'static str {
        self.tableau().name
    }
}

impl fmt::Display for IntegrationScheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for IntegrationScheme {
    type Err = NBodyError;

    /// Parses a scheme identifier, ignoring case and surrounding whitespace.
    ///
    /// # Example
    /// ```
    /// use rs_nbody::integrators::IntegrationScheme;
    ///
    /// assert_eq!("RK4".parse::<IntegrationScheme>().unwrap(), IntegrationScheme::RungeKutta4);
    /// assert_eq!("rk45".parse::<IntegrationScheme>().unwrap(), IntegrationScheme::DormandPrince);
    /// assert!("leapfrog".parse::<IntegrationScheme>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euler" => Ok(IntegrationScheme::Euler),
            "rk4" | "runge_kutta_4" => Ok(IntegrationScheme::RungeKutta4),
            "dormand_prince" | "dp" | "rk45" => Ok(IntegrationScheme::DormandPrince),
            _ => Err(NBodyError::UnknownScheme(s.to_string())),
        }
    }
}

/// Local error estimate of an embedded step: the largest norm, over all bodies,
/// of the difference between the high- and low-order updates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ErrorEstimate {
    pub position: f64,
    pub velocity: f64,
}

impl ErrorEstimate {
    pub fn max(&self) -> f64 {
        self.position.max(self.velocity)
    }
}

/// Result of a single committed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub force_evaluations: usize,
    pub error_estimate: Option<ErrorEstimate>,
}

/// Result of [`advance_adaptive`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveReport {
    pub accepted: usize,
    pub rejected: usize,
    /// Size of the last accepted step.
    pub last_dt: f64,
}

/// Scratch buffers for Runge-Kutta stepping.
///
/// The stage evaluations only ever see the trial buffers; the caller's
/// positions and velocities are written once, after the whole step succeeded.
#[derive(Debug, Clone, Default)]
pub struct RungeKuttaWorkspace {
    trial_positions: Vec<Vector3>,
    trial_velocities: Vec<Vector3>,
    accelerations: Vec<Vector3>,
    stage_dx: Vec<Vec<Vector3>>,
    stage_dv: Vec<Vec<Vector3>>,
    next_positions: Vec<Vector3>,
    next_velocities: Vec<Vector3>,
}

impl RungeKuttaWorkspace {
    pub fn new(body_count: usize, stages: usize) -> Self {
        let mut workspace = RungeKuttaWorkspace::default();
        workspace.prepare(body_count, stages);
        workspace
    }

    fn prepare(&mut self, body_count: usize, stages: usize) {
        self.trial_positions.resize(body_count, Vector3::ZERO);
        self.trial_velocities.resize(body_count, Vector3::ZERO);
        self.accelerations.resize(body_count, Vector3::ZERO);
        self.next_positions.resize(body_count, Vector3::ZERO);
        self.next_velocities.resize(body_count, Vector3::ZERO);
        if self.stage_dx.len() < stages {
            self.stage_dx.resize(stages, Vec::new());
            self.stage_dv.resize(stages, Vec::new());
        }
        for (dx, dv) in self.stage_dx.iter_mut().zip(self.stage_dv.iter_mut()) {
            dx.resize(body_count, Vector3::ZERO);
            dv.resize(body_count, Vector3::ZERO);
        }
    }

    /// Runs every stage of `tableau` from the given state and leaves the
    /// combined result in the workspace. Nothing outside the workspace changes.
    ///
    /// Stage `s` evaluates the forces at `x + Σ a[s][j] dx_j` with velocity
    /// `v + Σ a[s][j] dv_j`, always measured from the pre-step state, and stores
    /// `dx_s = v_s dt`, `dv_s = a(x_s) dt`.
    fn integrate<S: AccelerationSource>(
        &mut self,
        source: &mut S,
        tableau: &ButcherTableau,
        positions: &[Vector3],
        velocities: &[Vector3],
        dt: f64,
    ) -> Result<Option<ErrorEstimate>, NBodyError> {
        let n = positions.len();
        let stages = tableau.stages();
        self.prepare(n, stages);

        for s in 0..stages {
            let row = tableau.a[s];
            for i in 0..n {
                let mut x = positions[i];
                let mut v = velocities[i];
                for (j, &weight) in row.iter().enumerate() {
                    if weight != 0.0 {
                        x += self.stage_dx[j][i] * weight;
                        v += self.stage_dv[j][i] * weight;
                    }
                }
                self.trial_positions[i] = x;
                self.trial_velocities[i] = v;
            }

            source.accelerations(&self.trial_positions, &mut self.accelerations)?;

            for i in 0..n {
                self.stage_dx[s][i] = self.trial_velocities[i] * dt;
                self.stage_dv[s][i] = self.accelerations[i] * dt;
            }
        }

        for i in 0..n {
            let mut dx = Vector3::ZERO;
            let mut dv = Vector3::ZERO;
            for (s, &weight) in tableau.b.iter().enumerate() {
                if weight != 0.0 {
                    dx += self.stage_dx[s][i] * weight;
                    dv += self.stage_dv[s][i] * weight;
                }
            }
            let x = positions[i] + dx;
            let v = velocities[i] + dv;
            if !x.is_finite() || !v.is_finite() {
                return Err(NBodyError::CalculationError(format!(
                    "{} step of size {} produced a non-finite state for body {}",
                    tableau.name, dt, i
                )));
            }
            self.next_positions[i] = x;
            self.next_velocities[i] = v;
        }

        Ok(tableau.b_embedded.map(|b_low| self.error_estimate(tableau.b, b_low, n)))
    }

    fn error_estimate(&self, b_high: &[f64], b_low: &[f64], n: usize) -> ErrorEstimate {
        let mut estimate = ErrorEstimate::default();
        for i in 0..n {
            let mut ex = Vector3::ZERO;
            let mut ev = Vector3::ZERO;
            for (s, (high, low)) in b_high.iter().zip(b_low.iter()).enumerate() {
                let weight = high - low;
                ex += self.stage_dx[s][i] * weight;
                ev += self.stage_dv[s][i] * weight;
            }
            estimate.position = estimate.position.max(ex.norm());
            estimate.velocity = estimate.velocity.max(ev.norm());
        }
        estimate
    }

    fn commit(&self, positions: &mut [Vector3], velocities: &mut [Vector3]) {
        let n = positions.len();
        positions.copy_from_slice(&self.next_positions[..n]);
        velocities.copy_from_slice(&self.next_velocities[..n]);
    }
}

/// Advances `positions` and `velocities` by `dt` with an explicit Runge-Kutta method.
///
/// Either the full step is applied or, when the result is not finite, an error
/// is returned and both slices are left untouched.
///
/// # Arguments
/// * `source` - Evaluator called once per stage with the trial positions.
/// * `tableau` - The method coefficients.
/// * `positions`, `velocities` - The state, one entry per body.
/// * `dt` - The time step; any finite value.
/// * `workspace` - Reusable scratch buffers.
///
/// # Returns
/// The number of force evaluations and, for embedded methods, the local error estimate.
pub fn runge_kutta_step<S: AccelerationSource>(
    source: &mut S,
    tableau: &ButcherTableau,
    positions: &mut [Vector3],
    velocities: &mut [Vector3],
    dt: f64,
    workspace: &mut RungeKuttaWorkspace,
) -> Result<StepOutcome, NBodyError> {
    check_lengths(source.body_count(), positions, velocities)?;
    let error_estimate = workspace.integrate(source, tableau, positions, velocities, dt)?;
    workspace.commit(positions, velocities);
    Ok(StepOutcome { force_evaluations: tableau.stages(), error_estimate })
}

/// Scale factor for the next step size given the error of the current one.
///
/// # Example
/// ```
/// use rs_nbody::integrators::step_size_factor;
///
/// assert_eq!(step_size_factor(1e-6, 1e-6), 0.9);
/// assert_eq!(step_size_factor(0.0, 1e-6), 5.0);
/// assert_eq!(step_size_factor(1.0, 1e-6), 0.2);
/// assert_eq!(step_size_factor(f64::NAN, 1e-6), 0.2);
/// ```
pub fn step_size_factor(error: f64, tolerance: f64) -> f64 {
    // A non-finite error shrinks the step as far as allowed.
    if !error.is_finite() {
        return MIN_STEP_FACTOR;
    }
    if error <= 0.0 {
        return MAX_STEP_FACTOR;
    }
    let factor = STEP_SAFETY_FACTOR * (tolerance / error).powf(1.0 / 5.0);
    factor.clamp(MIN_STEP_FACTOR, MAX_STEP_FACTOR)
}

/// Integrates over `duration` with Dormand-Prince, resizing the step so the
/// local error estimate stays at or below `tolerance`.
///
/// Rejected trial steps leave the state untouched. The final step is shortened
/// so the integration ends exactly at `duration`. On error, `positions` and
/// `velocities` are put back to their values on entry, even when some steps
/// had already been accepted.
pub fn advance_adaptive<S: AccelerationSource>(
    source: &mut S,
    positions: &mut [Vector3],
    velocities: &mut [Vector3],
    duration: f64,
    tolerance: f64,
    initial_dt: f64,
    workspace: &mut RungeKuttaWorkspace,
) -> Result<AdaptiveReport, NBodyError> {
    if !duration.is_finite() || duration < 0.0 {
        error!("Rejected adaptive duration {}", duration);
        return Err(NBodyError::InvalidTimeStep(duration));
    }
    if !initial_dt.is_finite() || initial_dt <= 0.0 {
        error!("Rejected adaptive initial step {}", initial_dt);
        return Err(NBodyError::InvalidTimeStep(initial_dt));
    }
    if !tolerance.is_finite() || tolerance <= 0.0 {
        error!("Rejected adaptive tolerance {}", tolerance);
        return Err(NBodyError::InvalidTolerance(tolerance));
    }
    check_lengths(source.body_count(), positions, velocities)?;

    let initial_positions = positions.to_vec();
    let initial_velocities = velocities.to_vec();
    let result = adaptive_steps(source, positions, velocities, duration, tolerance, initial_dt, workspace);
    if result.is_err() {
        positions.copy_from_slice(&initial_positions);
        velocities.copy_from_slice(&initial_velocities);
    }
    result
}

fn adaptive_steps<S: AccelerationSource>(
    source: &mut S,
    positions: &mut [Vector3],
    velocities: &mut [Vector3],
    duration: f64,
    tolerance: f64,
    initial_dt: f64,
    workspace: &mut RungeKuttaWorkspace,
) -> Result<AdaptiveReport, NBodyError> {
    let tableau = &DORMAND_PRINCE;
    let min_dt = duration * f64::EPSILON * 16.0;
    let mut report = AdaptiveReport { accepted: 0, rejected: 0, last_dt: 0.0 };
    let mut remaining = duration;
    let mut dt = initial_dt;
    let mut consecutive_rejections = 0;

    while remaining > 0.0 {
        let h = dt.min(remaining);
        let estimate = workspace
            .integrate(source, tableau, positions, velocities, h)?
            .unwrap_or_default();
        let err = estimate.max();

        dt = h * step_size_factor(err, tolerance);

        if err <= tolerance {
            workspace.commit(positions, velocities);
            remaining -= h;
            if remaining <= min_dt {
                remaining = 0.0;
            }
            report.accepted += 1;
            report.last_dt = h;
            consecutive_rejections = 0;
        } else {
            report.rejected += 1;
            consecutive_rejections += 1;
            if consecutive_rejections == REJECTION_WARN_THRESHOLD {
                warn!("{} consecutive adaptive rejections, step size now {}", consecutive_rejections, dt);
            }
            if dt < min_dt {
                error!("Adaptive step size {} underflowed with {} of {} remaining", dt, remaining, duration);
                return Err(NBodyError::CalculationError(format!(
                    "adaptive step size underflow at dt = {}", dt
                )));
            }
        }
    }

    debug!(
        "Adaptive integration over {}: {} accepted, {} rejected, last dt {}",
        duration, report.accepted, report.rejected, report.last_dt
    );
    Ok(report)
}

fn check_lengths(expected: usize, positions: &[Vector3], velocities: &[Vector3]) -> Result<(), NBodyError> {
    if positions.len() != expected {
        return Err(NBodyError::LengthMismatch { expected, found: positions.len() });
    }
    if velocities.len() != expected {
        return Err(NBodyError::LengthMismatch { expected, found: velocities.len() });
    }
    Ok(())
}
