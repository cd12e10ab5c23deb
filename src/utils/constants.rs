use crate::utils;

/// Newtonian gravitational constant in cm^3 g^-1 s^-2.
pub const GRAVITATIONAL_CONSTANT_CGS: f64 = 6.674_30e-8;

/// One solar mass in grams.
pub const SOLAR_MASS_CGS: f64 = 2.0e33;

/// One astronomical unit in centimetres.
pub const ASTRONOMICAL_UNIT_CGS: f64 = 1.5e13;

/// Ten days in seconds.
pub const TEN_DAYS_CGS: f64 = 3.14e7 / 36.50;

pub const DEFAULT_SOFTENING_LENGTH: f64 = 0.001;

/// Spawn-spread factor used by the harness helpers; the force law never reads it.
pub const DEFAULT_INIT_SCALE: f64 = 0.5;

pub const DEFAULT_UNIT_SYSTEM: utils::UnitSystem = utils::UnitSystem {
    mass_cgs: SOLAR_MASS_CGS,
    length_cgs: ASTRONOMICAL_UNIT_CGS,
    time_cgs: TEN_DAYS_CGS,
};
