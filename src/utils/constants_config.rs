// src/utils/constants_config.rs
use crate::utils::{
    UnitSystem,
    DEFAULT_INIT_SCALE,
    DEFAULT_SOFTENING_LENGTH,
    errors::NBodyError
};

/// Read-only physical parameters handed to the engine at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityConstants {
    pub gravitational_constant: f64,
    pub softening_length: f64,
    pub init_scale: f64,
}

impl Default for GravityConstants {
    fn default() -> Self {
        Self::from_units(&UnitSystem::default())
    }
}

impl GravityConstants {
    /// Creates a set of constants, falling back to the defaults for anything left as `None`.
    ///
    /// # Example
    /// ```
    /// use rs_nbody::utils::GravityConstants;
    ///
    /// let constants = GravityConstants::new(Some(1.0), None, None);
    /// assert_eq!(constants.gravitational_constant, 1.0);
    /// assert_eq!(constants.softening_length, 0.001);
    /// ```
    pub fn new(
        gravitational_constant: Option<f64>,
        softening_length: Option<f64>,
        init_scale: Option<f64>,
    ) -> Self {
        let default = GravityConstants::default();
        Self {
            gravitational_constant: gravitational_constant.unwrap_or(default.gravitational_constant),
            softening_length: softening_length.unwrap_or(default.softening_length),
            init_scale: init_scale.unwrap_or(default.init_scale),
        }
    }

    /// Derives `G` from the given unit system and uses the default softening and spawn scale.
    pub fn from_units(units: &UnitSystem) -> Self {
        Self {
            gravitational_constant: units.gravitational_constant(),
            softening_length: DEFAULT_SOFTENING_LENGTH,
            init_scale: DEFAULT_INIT_SCALE,
        }
    }

    /// Same as [`GravityConstants::from_units`] but rejects invalid base units first.
    pub fn try_from_units(units: &UnitSystem) -> Result<Self, NBodyError> {
        units.validate()?;
        Ok(Self::from_units(units))
    }

    pub fn with_softening_length(mut self, softening_length: f64) -> Self {
        self.softening_length = softening_length;
        self
    }

    pub fn validate(&self) -> Result<(), NBodyError> {
        if !self.gravitational_constant.is_finite() || self.gravitational_constant < 0.0 {
            return Err(NBodyError::InvalidGravitationalConstant(self.gravitational_constant));
        }
        if !self.softening_length.is_finite() || self.softening_length <= 0.0 {
            return Err(NBodyError::InvalidSoftening(self.softening_length));
        }
        Ok(())
    }
}
