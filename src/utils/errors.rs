use std::fmt;
use std::error::Error;

/// Represents errors that can occur while configuring or stepping an N-body system.
///
/// Construction problems (units, masses, bounds, constants) and malformed step
/// requests are reported here. Near-coincident bodies are never an error: the
/// softened force law handles them locally.
#[derive(Debug, Clone, PartialEq)]
pub enum NBodyError {
    /// A base unit of the unit system is zero, negative or not finite.
    InvalidUnit { quantity: &'static str, value: f64 },
    /// A body mass is zero, negative or not finite.
    InvalidMass { index: usize, value: f64 },
    /// The bounding box is inverted or has non-finite corners.
    InvalidBounds,
    /// The softening length is zero, negative or not finite.
    InvalidSoftening(f64),
    /// The gravitational constant is negative or not finite.
    InvalidGravitationalConstant(f64),
    /// The Barnes-Hut opening angle is not a positive finite number.
    InvalidOpeningAngle(f64),
    /// The system contains no bodies.
    EmptySystem,
    /// A per-body array does not have one entry per body.
    LengthMismatch { expected: usize, found: usize },
    /// The requested time step is not finite.
    InvalidTimeStep(f64),
    /// The integration scheme identifier is not recognised.
    UnknownScheme(String),
    /// A position or velocity handed to the engine is not finite.
    NonFiniteState { index: usize },
    /// The adaptive tolerance is not a positive finite number.
    InvalidTolerance(f64),
    /// A general error for calculations that produce invalid results.
    CalculationError(String),
}

impl NBodyError {
    /// Returns true for errors raised while validating a configuration.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            NBodyError::InvalidUnit { .. }
                | NBodyError::InvalidMass { .. }
                | NBodyError::InvalidBounds
                | NBodyError::InvalidSoftening(_)
                | NBodyError::InvalidGravitationalConstant(_)
                | NBodyError::InvalidOpeningAngle(_)
                | NBodyError::EmptySystem
        )
    }
}

impl fmt::Display for NBodyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NBodyError::InvalidUnit { quantity, value } => write!(f, "Invalid {} unit: {}", quantity, value),
            NBodyError::InvalidMass { index, value } => write!(f, "Invalid mass {} for body {}", value, index),
            NBodyError::InvalidBounds => write!(f, "Invalid bounds: minimum must not exceed maximum"),
            NBodyError::InvalidSoftening(value) => write!(f, "Invalid softening length: {}", value),
            NBodyError::InvalidGravitationalConstant(value) => write!(f, "Invalid gravitational constant: {}", value),
            NBodyError::InvalidOpeningAngle(value) => write!(f, "Invalid opening angle: {}", value),
            NBodyError::EmptySystem => write!(f, "System must contain at least one body"),
            NBodyError::LengthMismatch { expected, found } => write!(f, "Expected {} entries, found {}", expected, found),
            NBodyError::InvalidTimeStep(dt) => write!(f, "Invalid time step: {}", dt),
            NBodyError::UnknownScheme(name) => write!(f, "Unknown integration scheme: {}", name),
            NBodyError::NonFiniteState { index } => write!(f, "Non-finite position or velocity for body {}", index),
            NBodyError::InvalidTolerance(value) => write!(f, "Invalid tolerance: {}", value),
            NBodyError::CalculationError(msg) => write!(f, "Calculation error: {}", msg),
        }
    }
}

impl Error for NBodyError {}
