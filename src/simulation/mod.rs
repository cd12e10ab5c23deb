mod engine;
mod diagnostics;
mod scenario;

pub use engine::*;
pub use diagnostics::*;
pub use scenario::*;
