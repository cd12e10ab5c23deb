//! Recursive space subdivision over point masses.
//!
//! Each node covers an axis-aligned box and stores the total mass and the
//! mass-weighted center of mass of every body below it. Boxes are split at
//! their midpoint into eight octants using the encoding documented on
//! [`Bounds3D`]; empty octants get no child. The tree is rebuilt from scratch
//! whenever positions change and is never updated incrementally.
//!
//! # Example
//!
//! ```
//! use rs_nbody::models::{Bounds3D, Vector3};
//! use rs_nbody::octree::Octree;
//!
//! let positions = vec![
//!     Vector3::new(-0.5, -0.5, -0.5),
//!     Vector3::new(0.5, 0.5, 0.5),
//!     Vector3::new(0.5, -0.5, 0.5),
//! ];
//! let masses = vec![1.0, 2.0, 1.0];
//! let bounds = Bounds3D::new(Vector3::splat(-1.0), Vector3::splat(1.0)).unwrap();
//!
//! let tree = Octree::build(&positions, &masses, bounds);
//! assert_eq!(tree.root().total_mass, 4.0);
//! assert_eq!(tree.leaf_count(), 3);
//! ```
use log::{debug, warn};
use crate::models::{Bounds3D, Vector3};

/// Depth at which subdivision stops and the remaining bodies share a leaf.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// One box of the octree.
#[derive(Debug, Clone)]
pub struct OctreeNode {
    pub bounds: Bounds3D,
    pub center_of_mass: Vector3,
    pub total_mass: f64,
    /// Children indexed by octant code. `None` for empty octants.
    pub children: [Option<Box<OctreeNode>>; 8],
    /// Body indices stored at this node. Only leaves hold bodies.
    pub bodies: Vec<usize>,
}

impl OctreeNode {
    fn empty(bounds: Bounds3D) -> Self {
        OctreeNode {
            bounds,
            center_of_mass: bounds.center(),
            total_mass: 0.0,
            children: Default::default(),
            bodies: Vec::new(),
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(|c| c.is_none())
    }

    /// Non-empty children in octant order.
    pub fn child_nodes(&self) -> impl Iterator<Item = &OctreeNode> {
        self.children.iter().flatten().map(|c| &**c)
    }

    /// Returns the child for the given octant code, if that octant holds any bodies.
    pub fn child(&self, octant: usize) -> Option<&OctreeNode> {
        self.children.get(octant).and_then(|c| c.as_deref())
    }
}

/// An octree built over a set of positions and masses.
#[derive(Debug, Clone)]
pub struct Octree {
    root: OctreeNode,
    max_depth: usize,
    depth: usize,
    node_count: usize,
    body_count: usize,
}

#[derive(Default)]
struct BuildStats {
    depth: usize,
    node_count: usize,
    grouped_leaves: usize,
}

impl Octree {
    /// Builds a tree with the default depth bound.
    pub fn build(positions: &[Vector3], masses: &[f64], bounds: Bounds3D) -> Self {
        Self::build_with_max_depth(positions, masses, bounds, DEFAULT_MAX_DEPTH)
    }

    /// Builds a tree over `positions`/`masses` inside `bounds`.
    ///
    /// Bodies are assigned to octants by comparing against the split point, so a
    /// body lying outside `bounds` is still stored exactly once. Once `max_depth`
    /// is reached, or when every remaining body sits at the same position, the
    /// remaining bodies are grouped into a single leaf.
    ///
    /// `positions` and `masses` must have the same length.
    pub fn build_with_max_depth(
        positions: &[Vector3],
        masses: &[f64],
        bounds: Bounds3D,
        max_depth: usize,
    ) -> Self {
        debug_assert_eq!(positions.len(), masses.len());
        let body_count = positions.len().min(masses.len());
        let mut stats = BuildStats::default();

        let root = if body_count == 0 {
            stats.node_count = 1;
            OctreeNode::empty(bounds)
        } else {
            let indices: Vec<usize> = (0..body_count).collect();
            build_node(positions, masses, indices, bounds, 0, max_depth, &mut stats)
        };

        if stats.grouped_leaves > 0 {
            warn!(
                "Octree grouped unseparable bodies into {} shared leaves (max depth {})",
                stats.grouped_leaves, max_depth
            );
        }
        debug!(
            "Built octree over {} bodies: {} nodes, depth {}",
            body_count, stats.node_count, stats.depth
        );

        Octree {
            root,
            max_depth,
            depth: stats.depth,
            node_count: stats.node_count,
            body_count,
        }
    }

    pub fn root(&self) -> &OctreeNode {
        &self.root
    }

    pub fn bounds(&self) -> Bounds3D {
        self.root.bounds
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Depth of the deepest node; a lone root has depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn body_count(&self) -> usize {
        self.body_count
    }

    pub fn total_mass(&self) -> f64 {
        self.root.total_mass
    }

    pub fn center_of_mass(&self) -> Vector3 {
        self.root.center_of_mass
    }

    /// All leaves holding at least one body, depth first in octant order.
    pub fn leaves(&self) -> Vec<&OctreeNode> {
        let mut leaves = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            if node.is_leaf() {
                if !node.bodies.is_empty() {
                    leaves.push(node);
                }
                continue;
            }
            // Reverse so octant 0 is visited first.
            for child in node.children.iter().rev().flatten() {
                stack.push(&**child);
            }
        }
        leaves
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    /// Every stored body index, in leaf order.
    pub fn body_indices(&self) -> Vec<usize> {
        self.leaves()
            .into_iter()
            .flat_map(|leaf| leaf.bodies.iter().copied())
            .collect()
    }
}

fn build_node(
    positions: &[Vector3],
    masses: &[f64],
    indices: Vec<usize>,
    bounds: Bounds3D,
    depth: usize,
    max_depth: usize,
    stats: &mut BuildStats,
) -> OctreeNode {
    stats.node_count += 1;
    stats.depth = stats.depth.max(depth);

    let (total_mass, center_of_mass) = mass_and_center(positions, masses, &indices);
    let mut node = OctreeNode {
        bounds,
        center_of_mass,
        total_mass,
        children: Default::default(),
        bodies: Vec::new(),
    };

    if indices.len() == 1 {
        node.bodies = indices;
        return node;
    }

    let first = positions[indices[0]];
    let coincident = indices.iter().all(|&i| positions[i] == first);
    if coincident || depth >= max_depth {
        stats.grouped_leaves += 1;
        node.bodies = indices;
        return node;
    }

    let mut octants: [Vec<usize>; 8] = Default::default();
    for &i in &indices {
        octants[bounds.octant_of(&positions[i])].push(i);
    }

    for (code, members) in octants.into_iter().enumerate() {
        if members.is_empty() {
            continue;
        }
        let child = build_node(positions, masses, members, bounds.octant(code), depth + 1, max_depth, stats);
        node.children[code] = Some(Box::new(child));
    }

    node
}

/// Total mass and mass-weighted center of the given bodies, summed in index order.
fn mass_and_center(positions: &[Vector3], masses: &[f64], indices: &[usize]) -> (f64, Vector3) {
    let mut total_mass = 0.0;
    let mut weighted = Vector3::ZERO;
    for &i in indices {
        total_mass += masses[i];
        weighted += positions[i] * masses[i];
    }
    let center = if total_mass > 0.0 { weighted / total_mass } else { Vector3::ZERO };
    (total_mass, center)
}
