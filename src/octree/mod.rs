mod octree;

pub use octree::*;

#[cfg(test)]
mod octree_tests;
