mod butcher_tableau;
mod integrator;

pub use butcher_tableau::*;
pub use integrator::*;

#[cfg(test)]
mod integrator_tests;
