use crate::utils::{
    GRAVITATIONAL_CONSTANT_CGS,
    DEFAULT_UNIT_SYSTEM,
    errors::NBodyError
};

/// The three base units (mass, length, time) expressed in CGS.
///
/// Picking units close to the simulated scale keeps `G` and the resulting
/// accelerations well away from the extremes of `f64`.
///
/// # Example
/// ```
/// use rs_nbody::utils::UnitSystem;
///
/// let cgs = UnitSystem::try_new(1.0, 1.0, 1.0).unwrap();
/// assert_eq!(cgs.gravitational_constant(), rs_nbody::utils::GRAVITATIONAL_CONSTANT_CGS);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitSystem {
    pub mass_cgs: f64,
    pub length_cgs: f64,
    pub time_cgs: f64,
}

impl Default for UnitSystem {
    fn default() -> Self {
        DEFAULT_UNIT_SYSTEM
    }
}

impl UnitSystem {
    /// Creates a unit system, rejecting zero, negative or non-finite base units.
    pub fn try_new(mass_cgs: f64, length_cgs: f64, time_cgs: f64) -> Result<Self, NBodyError> {
        let units = UnitSystem { mass_cgs, length_cgs, time_cgs };
        units.validate()?;
        Ok(units)
    }

    pub fn validate(&self) -> Result<(), NBodyError> {
        check_unit("mass", self.mass_cgs)?;
        check_unit("length", self.length_cgs)?;
        check_unit("time", self.time_cgs)?;
        Ok(())
    }

    /// Derives `G` in this unit basis: `G_cgs * L^-3 * T^2 * M`.
    ///
    /// # Example
    /// ```
    /// use rs_nbody::utils::UnitSystem;
    ///
    /// let g = UnitSystem::default().gravitational_constant();
    /// assert!(g > 0.02 && g < 0.04);
    /// ```
    pub fn gravitational_constant(&self) -> f64 {
        GRAVITATIONAL_CONSTANT_CGS
            / self.length_cgs / self.length_cgs / self.length_cgs
            * self.time_cgs * self.time_cgs
            * self.mass_cgs
    }
}

fn check_unit(quantity: &'static str, value: f64) -> Result<(), NBodyError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(NBodyError::InvalidUnit { quantity, value });
    }
    Ok(())
}
