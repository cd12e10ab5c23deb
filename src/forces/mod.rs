mod gravity;
mod barnes_hut;

pub use gravity::*;
pub use barnes_hut::*;
