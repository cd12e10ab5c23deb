use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::models::{Bounds3D, Vector3};
use crate::octree::{Octree, OctreeNode};

fn unit_bounds() -> Bounds3D {
    Bounds3D::new(Vector3::splat(-1.0), Vector3::splat(1.0)).unwrap()
}

fn random_bodies(count: usize, seed: u64) -> (Vec<Vector3>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let positions = (0..count)
        .map(|_| Vector3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        ))
        .collect();
    let masses = (0..count).map(|_| rng.random_range(0.1..10.0)).collect();
    (positions, masses)
}

fn check_node_invariants(node: &OctreeNode, positions: &[Vector3], masses: &[f64]) {
    if node.is_leaf() {
        assert!(!node.bodies.is_empty());
        let mass: f64 = node.bodies.iter().map(|&i| masses[i]).sum();
        assert_relative_eq!(node.total_mass, mass, max_relative = 1e-12);
        return;
    }
    assert!(node.bodies.is_empty(), "internal nodes must not hold bodies");
    let mut mass = 0.0;
    let mut weighted = Vector3::ZERO;
    for (code, child) in node.children.iter().enumerate() {
        if let Some(child) = child {
            assert_eq!(child.bounds, node.bounds.octant(code));
            mass += child.total_mass;
            weighted += child.center_of_mass * child.total_mass;
            check_node_invariants(child, positions, masses);
        }
    }
    assert_relative_eq!(node.total_mass, mass, max_relative = 1e-12);
    assert_relative_eq!(node.center_of_mass, weighted / mass, epsilon = 1e-12, max_relative = 1e-10);
}

#[test]
fn test_root_mass_matches_input() {
    let (positions, masses) = random_bodies(500, 7);
    let tree = Octree::build(&positions, &masses, unit_bounds());

    let total: f64 = masses.iter().sum();
    let com = positions.iter().zip(masses.iter())
        .fold(Vector3::ZERO, |acc, (p, m)| acc + *p * *m) / total;

    assert_eq!(tree.total_mass(), total);
    assert_relative_eq!(tree.center_of_mass(), com, epsilon = 1e-14);
}

#[test]
fn test_every_body_stored_once() {
    let (positions, masses) = random_bodies(300, 11);
    let tree = Octree::build(&positions, &masses, unit_bounds());
    let mut indices = tree.body_indices();
    indices.sort_unstable();
    assert_eq!(indices, (0..300).collect::<Vec<_>>());
    assert_eq!(tree.body_count(), 300);
    // Random points are distinct, so every leaf holds exactly one body.
    assert_eq!(tree.leaf_count(), 300);
}

#[test]
fn test_internal_nodes_aggregate_children() {
    let (positions, masses) = random_bodies(200, 3);
    let tree = Octree::build(&positions, &masses, unit_bounds());
    check_node_invariants(tree.root(), &positions, &masses);
}

#[test]
fn test_leaves_contain_their_bodies() {
    let (positions, masses) = random_bodies(100, 5);
    let tree = Octree::build(&positions, &masses, unit_bounds());
    for leaf in tree.leaves() {
        for &i in &leaf.bodies {
            assert!(leaf.bounds.contains(&positions[i]), "body {} outside its leaf", i);
        }
    }
}

#[test]
fn test_single_body_is_leaf_root() {
    let tree = Octree::build(&[Vector3::new(0.25, 0.0, 0.0)], &[3.0], unit_bounds());
    assert!(tree.root().is_leaf());
    assert_eq!(tree.root().bodies, vec![0]);
    assert_eq!(tree.root().center_of_mass, Vector3::new(0.25, 0.0, 0.0));
    assert_eq!(tree.total_mass(), 3.0);
    assert_eq!(tree.depth(), 0);
    assert_eq!(tree.node_count(), 1);
}

#[test]
fn test_empty_tree() {
    let tree = Octree::build(&[], &[], unit_bounds());
    assert_eq!(tree.total_mass(), 0.0);
    assert_eq!(tree.leaf_count(), 0);
    assert!(tree.body_indices().is_empty());
}

#[test]
fn test_coincident_bodies_grouped() {
    let p = Vector3::new(0.25, 0.25, 0.25);
    let positions = vec![p, p, p, Vector3::new(-0.5, -0.5, -0.5)];
    let masses = vec![1.0, 1.0, 1.0, 1.0];
    let tree = Octree::build(&positions, &masses, unit_bounds());

    let leaves = tree.leaves();
    assert_eq!(leaves.len(), 2);
    let shared = leaves.iter().find(|l| l.bodies.len() == 3).expect("shared leaf");
    assert_eq!(shared.bodies, vec![0, 1, 2]);
    assert_eq!(shared.total_mass, 3.0);
    assert_eq!(shared.center_of_mass, p);
    assert_eq!(tree.depth(), 1);
}

#[test]
fn test_depth_bound_groups_near_coincident_bodies() {
    let positions = vec![Vector3::new(0.1, 0.1, 0.1), Vector3::new(0.1 + 1e-12, 0.1, 0.1)];
    let masses = vec![1.0, 2.0];
    let tree = Octree::build_with_max_depth(&positions, &masses, unit_bounds(), 4);
    assert_eq!(tree.depth(), 4);
    assert_eq!(tree.leaf_count(), 1);
    assert_eq!(tree.leaves()[0].bodies, vec![0, 1]);
    assert_eq!(tree.total_mass(), 3.0);
}

#[test]
fn test_bodies_outside_bounds_still_covered() {
    let positions = vec![Vector3::new(5.0, 0.0, 0.0), Vector3::new(-5.0, 0.5, 0.0), Vector3::ZERO];
    let masses = vec![1.0, 1.0, 1.0];
    let tree = Octree::build(&positions, &masses, unit_bounds());
    let mut indices = tree.body_indices();
    indices.sort_unstable();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(tree.total_mass(), 3.0);
}

#[test]
fn test_child_octant_follows_encoding() {
    let positions = vec![Vector3::new(0.5, -0.5, -0.5), Vector3::new(-0.5, 0.5, 0.5)];
    let masses = vec![1.0, 1.0];
    let tree = Octree::build(&positions, &masses, unit_bounds());
    assert_eq!(tree.root().child(0b001).unwrap().bodies, vec![0]);
    assert_eq!(tree.root().child(0b110).unwrap().bodies, vec![1]);
    assert_eq!(tree.root().child_nodes().count(), 2);
}
