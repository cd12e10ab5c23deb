// src/simulation/engine.rs

use log::{debug, error, info};
use crate::forces::{AccelerationState, ForceMode, Gravity};
use crate::integrators::{
    advance_adaptive, runge_kutta_step, AdaptiveReport, ErrorEstimate, IntegrationScheme, RungeKuttaWorkspace,
};
use crate::models::{validate_masses, Bounds3D, Vector3};
use crate::octree::{Octree, DEFAULT_MAX_DEPTH};
use crate::simulation::SystemDiagnostics;
use crate::utils::{GravityConstants, NBodyError};

/// Engine-wide settings, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub constants: GravityConstants,
    pub force_mode: ForceMode,
    /// Spread force evaluation over the rayon pool. Ignored without the `parallel` feature.
    pub parallel: bool,
    pub max_tree_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            constants: GravityConstants::default(),
            force_mode: ForceMode::Direct,
            parallel: false,
            max_tree_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration, using the default for every `None`.
    ///
    /// # Example
    /// ```
    /// use rs_nbody::forces::ForceMode;
    /// use rs_nbody::simulation::EngineConfig;
    ///
    /// let config = EngineConfig::new(None, Some(ForceMode::barnes_hut()), None, None);
    /// assert_eq!(config.force_mode, ForceMode::BarnesHut { theta: 0.5 });
    /// assert!(!config.parallel);
    /// assert_eq!(config.max_tree_depth, 32);
    /// ```
    pub fn new(
        constants: Option<GravityConstants>,
        force_mode: Option<ForceMode>,
        parallel: Option<bool>,
        max_tree_depth: Option<usize>,
    ) -> Self {
        let default = EngineConfig::default();
        EngineConfig {
            constants: constants.unwrap_or(default.constants),
            force_mode: force_mode.unwrap_or(default.force_mode),
            parallel: parallel.unwrap_or(default.parallel),
            max_tree_depth: max_tree_depth.unwrap_or(default.max_tree_depth),
        }
    }

    pub fn validate(&self) -> Result<(), NBodyError> {
        self.constants.validate()?;
        self.force_mode.validate()
    }
}

/// What a call to [`Engine::step`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub scheme: IntegrationScheme,
    pub force_evaluations: usize,
    /// Local error estimate, only produced by Dormand-Prince.
    pub error_estimate: Option<ErrorEstimate>,
}

/// The N-body engine: owns the masses, the force evaluator and the integrator scratch space.
///
/// Positions and velocities stay with the caller and are passed to every call.
/// A step either applies completely or fails without touching them.
///
/// # Example
/// ```
/// use rs_nbody::integrators::IntegrationScheme;
/// use rs_nbody::models::{Bounds3D, Vector3};
/// use rs_nbody::simulation::{Engine, EngineConfig};
///
/// let mut positions = vec![Vector3::new(-0.5, 0.0, 0.0), Vector3::new(0.5, 0.0, 0.0)];
/// let mut velocities = vec![Vector3::ZERO; 2];
/// let bounds = Bounds3D::new(Vector3::splat(-1.0), Vector3::splat(1.0)).unwrap();
///
/// let mut engine = Engine::new(vec![1.0, 1.0], &positions, bounds, EngineConfig::default()).unwrap();
/// let report = engine.step(&mut positions, &mut velocities, 0.1, IntegrationScheme::RungeKutta4).unwrap();
///
/// assert_eq!(report.force_evaluations, 4);
/// assert!(positions[0].x > -0.5);
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    gravity: Gravity,
    workspace: RungeKuttaWorkspace,
    last_error_estimate: Option<ErrorEstimate>,
    steps: u64,
}

impl Engine {
    /// Validates the system, computes the initial accelerations and builds the initial octree.
    ///
    /// # Arguments
    /// * `masses` - One strictly positive mass per body; at least one body.
    /// * `positions` - Initial positions, one per body.
    /// * `bounds` - The harness box, `min <= max` on every axis.
    /// * `config` - Constants and evaluation settings.
    ///
    /// # Returns
    /// The engine, or the first configuration error found.
    pub fn new(
        masses: Vec<f64>,
        positions: &[Vector3],
        bounds: Bounds3D,
        config: EngineConfig,
    ) -> Result<Self, NBodyError> {
        let checked = config
            .validate()
            .and_then(|_| validate_masses(&masses))
            .and_then(|_| Bounds3D::new(bounds.min, bounds.max))
            .and_then(|_| check_finite(masses.len(), positions));
        if let Err(e) = checked {
            error!("Rejected engine construction: {}", e);
            return Err(e);
        }

        let mut gravity = Gravity::new(masses, config.constants, bounds)
            .with_mode(config.force_mode)
            .with_parallel(config.parallel)
            .with_max_tree_depth(config.max_tree_depth);
        gravity.evaluate(positions)?;
        if gravity.tree().is_none() {
            gravity.build_tree(positions);
        }

        info!(
            "Engine ready: {} bodies, {:?}, G = {}, softening = {}",
            gravity.masses().len(),
            config.force_mode,
            config.constants.gravitational_constant,
            config.constants.softening_length
        );

        let body_count = gravity.masses().len();
        Ok(Engine {
            config,
            gravity,
            workspace: RungeKuttaWorkspace::new(body_count, IntegrationScheme::DormandPrince.stages()),
            last_error_estimate: None,
            steps: 0,
        })
    }

    /// Advances the state by `dt` with the chosen scheme.
    ///
    /// `dt == 0` is a no-op that performs no force evaluation. Negative finite
    /// steps integrate backwards in time.
    ///
    /// # Errors
    /// `InvalidTimeStep` for a non-finite `dt`, `LengthMismatch` or
    /// `NonFiniteState` for malformed state, `CalculationError` when the step
    /// would produce a non-finite state. On error the positions, velocities,
    /// accelerations and evaluation count are as they were before the call.
    pub fn step(
        &mut self,
        positions: &mut [Vector3],
        velocities: &mut [Vector3],
        dt: f64,
        scheme: IntegrationScheme,
    ) -> Result<StepReport, NBodyError> {
        if let Err(e) = self.check_step_request(positions, velocities, dt) {
            error!("Rejected {} step: {}", scheme, e);
            return Err(e);
        }

        if dt == 0.0 {
            return Ok(StepReport { scheme, force_evaluations: 0, error_estimate: None });
        }

        let checkpoint = self.gravity.checkpoint();
        let outcome = runge_kutta_step(
            &mut self.gravity,
            scheme.tableau(),
            positions,
            velocities,
            dt,
            &mut self.workspace,
        )
        .map_err(|e| {
            error!("{} step of size {} failed: {}", scheme, dt, e);
            self.gravity.restore(checkpoint);
            e
        })?;

        self.steps += 1;
        if outcome.error_estimate.is_some() {
            self.last_error_estimate = outcome.error_estimate;
        }
        debug!(
            "Step {} ({}, dt = {}): {} evaluations, error estimate {:?}",
            self.steps, scheme, dt, outcome.force_evaluations, outcome.error_estimate
        );

        Ok(StepReport {
            scheme,
            force_evaluations: outcome.force_evaluations,
            error_estimate: outcome.error_estimate,
        })
    }

    /// Same as [`Engine::step`] with the scheme given by name (`euler`, `rk4`, `dormand_prince`).
    pub fn step_with(
        &mut self,
        positions: &mut [Vector3],
        velocities: &mut [Vector3],
        dt: f64,
        scheme: &str,
    ) -> Result<StepReport, NBodyError> {
        let scheme = scheme.parse::<IntegrationScheme>().map_err(|e| {
            error!("Rejected step request: {}", e);
            e
        })?;
        self.step(positions, velocities, dt, scheme)
    }

    /// Integrates over `duration` with adaptive Dormand-Prince steps.
    ///
    /// A failed integration, including a step size underflow part way through,
    /// leaves the positions, velocities and accelerations as they were on entry.
    pub fn advance_adaptive(
        &mut self,
        positions: &mut [Vector3],
        velocities: &mut [Vector3],
        duration: f64,
        tolerance: f64,
        initial_dt: f64,
    ) -> Result<AdaptiveReport, NBodyError> {
        if let Err(e) = check_finite(self.body_count(), positions).and_then(|_| check_finite(self.body_count(), velocities)) {
            error!("Rejected adaptive integration: {}", e);
            return Err(e);
        }
        let checkpoint = self.gravity.checkpoint();
        let report = advance_adaptive(
            &mut self.gravity,
            positions,
            velocities,
            duration,
            tolerance,
            initial_dt,
            &mut self.workspace,
        )
        .map_err(|e| {
            self.gravity.restore(checkpoint);
            e
        })?;
        self.steps += report.accepted as u64;
        Ok(report)
    }

    /// Accelerations from the latest force evaluation.
    pub fn accelerations(&self) -> &[Vector3] {
        self.gravity.state().current()
    }

    /// Accelerations from the evaluation before the latest one.
    pub fn previous_accelerations(&self) -> &[Vector3] {
        self.gravity.state().previous()
    }

    /// Current and lagged accelerations, in that order.
    pub fn read_accelerations(&self) -> (&[Vector3], &[Vector3]) {
        (self.accelerations(), self.previous_accelerations())
    }

    pub fn acceleration_state(&self) -> &AccelerationState {
        self.gravity.state()
    }

    /// The most recently built octree.
    pub fn spatial_index(&self) -> Option<&Octree> {
        self.gravity.tree()
    }

    /// Rebuilds the octree over `positions`.
    pub fn rebuild_spatial_index(&mut self, positions: &[Vector3]) -> Result<&Octree, NBodyError> {
        check_finite(self.body_count(), positions)?;
        Ok(self.gravity.build_tree(positions))
    }

    pub fn bounds(&self) -> Bounds3D {
        self.gravity.bounds()
    }

    /// Replaces the harness box used for tree builds.
    pub fn set_bounds(&mut self, bounds: Bounds3D) -> Result<(), NBodyError> {
        let bounds = Bounds3D::new(bounds.min, bounds.max)?;
        self.gravity.set_bounds(bounds);
        Ok(())
    }

    /// Momentum, energy and center of mass of the given state.
    pub fn diagnostics(&self, positions: &[Vector3], velocities: &[Vector3]) -> SystemDiagnostics {
        SystemDiagnostics::measure(self.masses(), positions, velocities, &self.config.constants)
    }

    pub fn body_count(&self) -> usize {
        self.gravity.masses().len()
    }

    pub fn masses(&self) -> &[f64] {
        self.gravity.masses()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Error estimate of the latest Dormand-Prince step.
    pub fn last_error_estimate(&self) -> Option<ErrorEstimate> {
        self.last_error_estimate
    }

    /// Force evaluations since construction, the initial one included.
    pub fn force_evaluations(&self) -> u64 {
        self.gravity.evaluations()
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps
    }

    fn check_step_request(&self, positions: &[Vector3], velocities: &[Vector3], dt: f64) -> Result<(), NBodyError> {
        if !dt.is_finite() {
            return Err(NBodyError::InvalidTimeStep(dt));
        }
        check_finite(self.body_count(), positions)?;
        check_finite(self.body_count(), velocities)
    }
}

fn check_finite(expected: usize, values: &[Vector3]) -> Result<(), NBodyError> {
    if values.len() != expected {
        return Err(NBodyError::LengthMismatch { expected, found: values.len() });
    }
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(NBodyError::NonFiniteState { index }),
        None => Ok(()),
    }
}
