mod objects;
mod vector_3d;
mod bounds_3d;
mod body;

pub use objects::*;
pub use vector_3d::*;
pub use bounds_3d::*;
pub use body::*;
