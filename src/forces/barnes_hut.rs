//! Barnes-Hut approximation of the gravitational field over an [`Octree`].
//!
//! For each query body the tree is walked from the root. A node is replaced by
//! a single mass at its center of mass when it is far enough away:
//! `size / distance < theta`, where `size` is the longest edge of the node box
//! and `distance` runs from the query body to the node's center of mass. A node
//! whose box contains the query body is always opened, so a body never feels an
//! aggregate that includes itself. Leaves contribute their bodies exactly.
//!
//! The accepted nodes are first collected into a worklist and then summed with
//! the same softened kernel used by the direct evaluator.
//!
//! Unlike the direct pairwise loop, the approximation does not apply equal and
//! opposite forces, so total momentum is only conserved to the accuracy of the
//! approximation.
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use crate::forces::softened_kernel;
use crate::models::Vector3;
use crate::octree::{Octree, OctreeNode};
use crate::utils::GravityConstants;

/// Opening angle used by [`crate::forces::ForceMode::barnes_hut`].
pub const DEFAULT_OPENING_ANGLE: f64 = 0.5;

/// A point mass the query body interacts with: a single body or an accepted node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproxNode {
    pub mass: f64,
    pub center: Vector3,
}

/// Collects the interactions for body `index` into `worklist`.
///
/// Leaf bodies are pushed with their own position and mass, so bodies sharing a
/// leaf (coincident or depth-capped) are still summed exactly.
///
/// # Example
/// ```
/// use rs_nbody::forces::collect_approx_nodes;
/// use rs_nbody::models::{Bounds3D, Vector3};
/// use rs_nbody::octree::Octree;
///
/// let positions = vec![
///     Vector3::new(-0.9, -0.9, -0.9),
///     Vector3::new(0.8, 0.8, 0.8),
///     Vector3::new(0.9, 0.9, 0.9),
/// ];
/// let masses = vec![1.0, 1.0, 1.0];
/// let bounds = Bounds3D::new(Vector3::splat(-1.0), Vector3::splat(1.0)).unwrap();
/// let tree = Octree::build(&positions, &masses, bounds);
///
/// let mut worklist = Vec::new();
/// collect_approx_nodes(tree.root(), 0, &positions, &masses, 1.0, &mut worklist);
/// // The far pair is merged into one aggregate.
/// assert_eq!(worklist.len(), 1);
/// assert_eq!(worklist[0].mass, 2.0);
/// ```
pub fn collect_approx_nodes(
    node: &OctreeNode,
    index: usize,
    positions: &[Vector3],
    masses: &[f64],
    theta: f64,
    worklist: &mut Vec<ApproxNode>,
) {
    if node.total_mass == 0.0 {
        return;
    }

    if node.is_leaf() {
        for &j in &node.bodies {
            if j != index {
                worklist.push(ApproxNode { mass: masses[j], center: positions[j] });
            }
        }
        return;
    }

    let position = positions[index];
    if !node.bounds.contains(&position) {
        let distance = node.center_of_mass.distance(&position);
        if distance > 0.0 && node.bounds.longest_edge() / distance < theta {
            worklist.push(ApproxNode { mass: node.total_mass, center: node.center_of_mass });
            return;
        }
    }

    for child in node.child_nodes() {
        collect_approx_nodes(child, index, positions, masses, theta, worklist);
    }
}

/// Sums the softened pull of every worklist entry on a body at `position`.
pub fn sum_worklist(position: Vector3, worklist: &[ApproxNode], constants: &GravityConstants) -> Vector3 {
    let g = constants.gravitational_constant;
    let softening = constants.softening_length;
    worklist.iter().fold(Vector3::ZERO, |acc, node| {
        let r = node.center - position;
        let k = softened_kernel(r.norm(), softening);
        acc + r * (g * node.mass * k)
    })
}

/// Barnes-Hut acceleration on body `index`.
pub fn barnes_hut_acceleration(
    tree: &Octree,
    index: usize,
    positions: &[Vector3],
    masses: &[f64],
    constants: &GravityConstants,
    theta: f64,
) -> Vector3 {
    let mut worklist = Vec::with_capacity(64);
    collect_approx_nodes(tree.root(), index, positions, masses, theta, &mut worklist);
    sum_worklist(positions[index], &worklist, constants)
}

/// Barnes-Hut accelerations for every body into `out`.
///
/// The tree bounds must enclose every position, otherwise a node may be accepted
/// as an aggregate that includes the query body. [`crate::forces::Gravity::build_tree`]
/// grows the bounds as needed.
pub fn accumulate_barnes_hut(
    tree: &Octree,
    positions: &[Vector3],
    masses: &[f64],
    constants: &GravityConstants,
    theta: f64,
    out: &mut [Vector3],
) {
    let mut worklist = Vec::with_capacity(64);
    for (i, a) in out.iter_mut().enumerate() {
        worklist.clear();
        collect_approx_nodes(tree.root(), i, positions, masses, theta, &mut worklist);
        *a = sum_worklist(positions[i], &worklist, constants);
    }
}

/// Same as [`accumulate_barnes_hut`] with the per-body tree walks spread over the rayon pool.
#[cfg(feature = "parallel")]
pub fn accumulate_barnes_hut_parallel(
    tree: &Octree,
    positions: &[Vector3],
    masses: &[f64],
    constants: &GravityConstants,
    theta: f64,
    out: &mut [Vector3],
) {
    out.par_iter_mut().enumerate().for_each_init(
        || Vec::with_capacity(64),
        |worklist, (i, a)| {
            worklist.clear();
            collect_approx_nodes(tree.root(), i, positions, masses, theta, worklist);
            *a = sum_worklist(positions[i], worklist, constants);
        },
    );
}
