pub mod errors;
mod constants;
mod constants_config;
mod unit_system;

pub use constants::*;
pub use constants_config::*;
pub use unit_system::*;
pub use errors::NBodyError;
