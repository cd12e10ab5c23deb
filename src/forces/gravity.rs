// src/forces/gravity.rs

use log::trace;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use crate::forces::{accumulate_barnes_hut, DEFAULT_OPENING_ANGLE};
#[cfg(feature = "parallel")]
use crate::forces::accumulate_barnes_hut_parallel;
use crate::models::{Bounds3D, Vector3};
use crate::octree::{Octree, DEFAULT_MAX_DEPTH};
use crate::utils::{GravityConstants, NBodyError};

/// How the evaluator sums the contributions of the other bodies.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ForceMode {
    /// Every unordered pair, O(N²).
    #[default]
    Direct,
    /// Octree walk that treats a node as one mass when `size / distance < theta`.
    BarnesHut { theta: f64 },
}

impl ForceMode {
    /// Barnes-Hut with the default opening angle.
    pub fn barnes_hut() -> Self {
        ForceMode::BarnesHut { theta: DEFAULT_OPENING_ANGLE }
    }

    pub fn validate(&self) -> Result<(), NBodyError> {
        match *self {
            ForceMode::Direct => Ok(()),
            ForceMode::BarnesHut { theta } => {
                if !theta.is_finite() || theta <= 0.0 {
                    return Err(NBodyError::InvalidOpeningAngle(theta));
                }
                Ok(())
            }
        }
    }
}

/// Scalar factor `k` such that the acceleration on a body from a mass `m` at
/// displacement `r` (distance `d`) is `G * m * k * r`.
///
/// Outside the softening length this is the inverse-square law `1 / d³`.
/// Inside it the factor becomes `1 / (s² d)`, which keeps the acceleration
/// magnitude at `G m / s²` while still pointing along `r`. The two branches agree
/// at `d = s`. Coincident points (`d = 0`) have no defined direction and
/// contribute nothing.
///
/// # Example
/// ```
/// use rs_nbody::forces::softened_kernel;
///
/// assert_eq!(softened_kernel(2.0, 0.1), 1.0 / 8.0);
/// assert_eq!(softened_kernel(0.05, 0.1), 1.0 / (0.1 * 0.1 * 0.05));
/// assert_eq!(softened_kernel(0.0, 0.1), 0.0);
/// ```
#[inline]
pub fn softened_kernel(distance: f64, softening_length: f64) -> f64 {
    if distance < softening_length {
        if distance == 0.0 {
            return 0.0;
        }
        1.0 / (softening_length * softening_length) / distance
    } else {
        1.0 / (distance * distance * distance)
    }
}

/// Acceleration of a body at `position` caused by mass `other_mass` at `other_position`.
#[inline]
pub fn pair_acceleration(
    position: Vector3,
    other_position: Vector3,
    other_mass: f64,
    constants: &GravityConstants,
) -> Vector3 {
    let r = other_position - position;
    let k = softened_kernel(r.norm(), constants.softening_length);
    r * (constants.gravitational_constant * other_mass * k)
}

/// Force on body `i` exerted by body `j`.
///
/// Swapping the arguments yields the exact negation: the displacement flips sign,
/// the distance and kernel are unchanged and the mass product is commutative.
///
/// # Example
/// ```
/// use rs_nbody::forces::pair_force;
/// use rs_nbody::models::Vector3;
/// use rs_nbody::utils::GravityConstants;
///
/// let constants = GravityConstants::new(Some(1.0), None, None);
/// let a = Vector3::new(0.1, 0.2, 0.3);
/// let b = Vector3::new(-1.0, 0.7, 2.0);
/// assert_eq!(pair_force(a, 2.0, b, 5.0, &constants), -pair_force(b, 5.0, a, 2.0, &constants));
/// ```
#[inline]
pub fn pair_force(
    position_i: Vector3,
    mass_i: f64,
    position_j: Vector3,
    mass_j: f64,
    constants: &GravityConstants,
) -> Vector3 {
    let r = position_j - position_i;
    let k = softened_kernel(r.norm(), constants.softening_length);
    r * (constants.gravitational_constant * (mass_i * mass_j) * k)
}

/// Direct pairwise summation into `out`.
///
/// Visits `i` from 1 to N-1 and `j` from 0 to i-1, so each unordered pair is
/// evaluated once and applied to both bodies with opposite sign.
pub fn accumulate_direct(
    positions: &[Vector3],
    masses: &[f64],
    constants: &GravityConstants,
    out: &mut [Vector3],
) {
    let g = constants.gravitational_constant;
    let softening = constants.softening_length;
    let n = positions.len();

    for a in out.iter_mut() {
        *a = Vector3::ZERO;
    }

    for i in 1..n {
        for j in 0..i {
            let r = positions[j] - positions[i];
            let k = g * softened_kernel(r.norm(), softening);
            out[i] += r * (masses[j] * k);
            out[j] -= r * (masses[i] * k);
        }
    }
}

/// Parallel direct summation: every body gathers the pull of every other body.
///
/// Each pair term is computed twice (once per participant) instead of being
/// scattered with opposite signs, so the result matches [`accumulate_direct`]
/// up to rounding.
#[cfg(feature = "parallel")]
pub fn accumulate_direct_parallel(
    positions: &[Vector3],
    masses: &[f64],
    constants: &GravityConstants,
    out: &mut [Vector3],
) {
    out.par_iter_mut().enumerate().for_each(|(i, a)| {
        let mut sum = Vector3::ZERO;
        for (j, (&p, &m)) in positions.iter().zip(masses.iter()).enumerate() {
            if i != j {
                sum += pair_acceleration(positions[i], p, m, constants);
            }
        }
        *a = sum;
    });
}

/// Per-body accelerations from the latest evaluation and the one before it.
#[derive(Debug, Clone, PartialEq)]
pub struct AccelerationState {
    current: Vec<Vector3>,
    previous: Vec<Vector3>,
}

impl AccelerationState {
    pub fn new(body_count: usize) -> Self {
        AccelerationState {
            current: vec![Vector3::ZERO; body_count],
            previous: vec![Vector3::ZERO; body_count],
        }
    }

    pub fn current(&self) -> &[Vector3] {
        &self.current
    }

    /// The accelerations computed by the evaluation before the latest one.
    pub fn previous(&self) -> &[Vector3] {
        &self.previous
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Moves `current` into `previous` and hands out `current` for recomputation.
    fn rotate(&mut self) -> &mut [Vector3] {
        self.previous.copy_from_slice(&self.current);
        &mut self.current
    }
}

/// Anything that can turn a set of trial positions into per-body accelerations.
pub trait AccelerationSource {
    fn body_count(&self) -> usize;

    /// Writes the acceleration of every body at `positions` into `out`.
    fn accelerations(&mut self, positions: &[Vector3], out: &mut [Vector3]) -> Result<(), NBodyError>;
}

/// Saved evaluator state, used to undo the evaluations of a rejected step.
#[derive(Debug, Clone)]
pub struct GravityCheckpoint {
    state: AccelerationState,
    tree: Option<Octree>,
    evaluations: u64,
}

/// The force evaluator: owns the masses, the constants and the acceleration state.
///
/// Positions are never stored; every call receives the positions to evaluate,
/// so integrators can hand in trial states without touching the true ones.
#[derive(Debug, Clone)]
pub struct Gravity {
    masses: Vec<f64>,
    constants: GravityConstants,
    mode: ForceMode,
    parallel: bool,
    max_tree_depth: usize,
    bounds: Bounds3D,
    state: AccelerationState,
    tree: Option<Octree>,
    evaluations: u64,
}

impl Gravity {
    /// Creates an evaluator in direct mode. Inputs are assumed to be validated.
    pub fn new(masses: Vec<f64>, constants: GravityConstants, bounds: Bounds3D) -> Self {
        let n = masses.len();
        Gravity {
            masses,
            constants,
            mode: ForceMode::Direct,
            parallel: false,
            max_tree_depth: DEFAULT_MAX_DEPTH,
            bounds,
            state: AccelerationState::new(n),
            tree: None,
            evaluations: 0,
        }
    }

    pub fn with_mode(mut self, mode: ForceMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_max_tree_depth(mut self, max_tree_depth: usize) -> Self {
        self.max_tree_depth = max_tree_depth;
        self
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn constants(&self) -> &GravityConstants {
        &self.constants
    }

    pub fn mode(&self) -> ForceMode {
        self.mode
    }

    pub fn bounds(&self) -> Bounds3D {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Bounds3D) {
        self.bounds = bounds;
    }

    pub fn state(&self) -> &AccelerationState {
        &self.state
    }

    /// Number of force evaluations performed so far.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// The most recently built octree, if any.
    pub fn tree(&self) -> Option<&Octree> {
        self.tree.as_ref()
    }

    /// Rebuilds the octree over `positions`, growing the configured bounds to enclose every body.
    pub fn build_tree(&mut self, positions: &[Vector3]) -> &Octree {
        let bounds = self.bounds.expanded_to_include(positions);
        let tree = Octree::build_with_max_depth(positions, &self.masses, bounds, self.max_tree_depth);
        self.tree.insert(tree)
    }

    /// Recomputes every body's acceleration at `positions`.
    ///
    /// The previous result is kept as the lagged acceleration before the new one
    /// is written. A position slice of the wrong length is rejected before
    /// anything changes.
    pub fn evaluate(&mut self, positions: &[Vector3]) -> Result<(), NBodyError> {
        if positions.len() != self.masses.len() {
            return Err(NBodyError::LengthMismatch { expected: self.masses.len(), found: positions.len() });
        }
        self.evaluations += 1;
        trace!("Force evaluation #{} ({:?})", self.evaluations, self.mode);

        match self.mode {
            ForceMode::Direct => {
                let current = self.state.rotate();
                if self.parallel {
                    direct_parallel_or_sequential(positions, &self.masses, &self.constants, current);
                } else {
                    accumulate_direct(positions, &self.masses, &self.constants, current);
                }
            }
            ForceMode::BarnesHut { theta } => {
                self.build_tree(positions);
                let current = self.state.rotate();
                if let Some(tree) = self.tree.as_ref() {
                    if self.parallel {
                        barnes_hut_parallel_or_sequential(tree, positions, &self.masses, &self.constants, theta, current);
                    } else {
                        accumulate_barnes_hut(tree, positions, &self.masses, &self.constants, theta, current);
                    }
                }
            }
        }
        Ok(())
    }

    /// Captures the acceleration state, the evaluation count and, in Barnes-Hut
    /// mode, the last tree.
    pub fn checkpoint(&self) -> GravityCheckpoint {
        let tree = match self.mode {
            ForceMode::BarnesHut { .. } => self.tree.clone(),
            ForceMode::Direct => None,
        };
        GravityCheckpoint { state: self.state.clone(), tree, evaluations: self.evaluations }
    }

    /// Puts back what [`Gravity::checkpoint`] captured.
    pub fn restore(&mut self, checkpoint: GravityCheckpoint) {
        self.state = checkpoint.state;
        self.evaluations = checkpoint.evaluations;
        if let ForceMode::BarnesHut { .. } = self.mode {
            self.tree = checkpoint.tree;
        }
    }
}

impl AccelerationSource for Gravity {
    fn body_count(&self) -> usize {
        self.masses.len()
    }

    fn accelerations(&mut self, positions: &[Vector3], out: &mut [Vector3]) -> Result<(), NBodyError> {
        if out.len() != self.masses.len() {
            return Err(NBodyError::LengthMismatch { expected: self.masses.len(), found: out.len() });
        }
        self.evaluate(positions)?;
        out.copy_from_slice(self.state.current());
        Ok(())
    }
}

#[cfg(feature = "parallel")]
fn direct_parallel_or_sequential(positions: &[Vector3], masses: &[f64], constants: &GravityConstants, out: &mut [Vector3]) {
    accumulate_direct_parallel(positions, masses, constants, out);
}

#[cfg(not(feature = "parallel"))]
fn direct_parallel_or_sequential(positions: &[Vector3], masses: &[f64], constants: &GravityConstants, out: &mut [Vector3]) {
    accumulate_direct(positions, masses, constants, out);
}

#[cfg(feature = "parallel")]
fn barnes_hut_parallel_or_sequential(tree: &Octree, positions: &[Vector3], masses: &[f64], constants: &GravityConstants, theta: f64, out: &mut [Vector3]) {
    accumulate_barnes_hut_parallel(tree, positions, masses, constants, theta, out);
}

#[cfg(not(feature = "parallel"))]
fn barnes_hut_parallel_or_sequential(tree: &Octree, positions: &[Vector3], masses: &[f64], constants: &GravityConstants, theta: f64, out: &mut [Vector3]) {
    accumulate_barnes_hut(tree, positions, masses, constants, theta, out);
}
