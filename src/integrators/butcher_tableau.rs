// src/integrators/butcher_tableau.rs

/// Coefficients of an explicit Runge-Kutta method.
///
/// `a` is the strictly lower-triangular stage matrix stored row by row: row `s`
/// holds the weights of stages `0..s` used to build the trial state of stage `s`.
/// `b` combines the stage derivatives into the final update. Embedded methods
/// carry a second set of weights `b_embedded` of lower order; the difference of
/// the two updates estimates the local error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButcherTableau {
    pub name: &'static str,
    pub order: u32,
    pub a: &'static [&'static [f64]],
    pub b: &'static [f64],
    pub b_embedded: Option<&'static [f64]>,
    pub c: &'static [f64],
}

impl ButcherTableau {
    pub fn stages(&self) -> usize {
        self.b.len()
    }

    pub fn is_embedded(&self) -> bool {
        self.b_embedded.is_some()
    }
}

/// Forward Euler.
pub const EULER: ButcherTableau = ButcherTableau {
    name: "euler",
    order: 1,
    a: &[&[]],
    b: &[1.0],
    b_embedded: None,
    c: &[0.0],
};

/// The classical fourth-order method, `(k1 + 2 k2 + 2 k3 + k4) / 6`.
pub const RUNGE_KUTTA_4: ButcherTableau = ButcherTableau {
    name: "rk4",
    order: 4,
    a: &[
        &[],
        &[0.5],
        &[0.0, 0.5],
        &[0.0, 0.0, 1.0],
    ],
    b: &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
    b_embedded: None,
    c: &[0.0, 0.5, 0.5, 1.0],
};

/// Dormand-Prince 5(4). The update uses the fifth-order weights; the
/// fourth-order weights are only used for the error estimate.
pub const DORMAND_PRINCE: ButcherTableau = ButcherTableau {
    name: "dormand_prince",
    order: 5,
    a: &[
        &[],
        &[1.0 / 5.0],
        &[3.0 / 40.0, 9.0 / 40.0],
        &[44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0],
        &[19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0],
        &[9017.0 / 3168.0, -355.0 / 33.0, 46732.0 / 5247.0, 49.0 / 176.0, -5103.0 / 18656.0],
        &[35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0],
    ],
    b: &[35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0, 0.0],
    b_embedded: Some(&[
        5179.0 / 57600.0,
        0.0,
        7571.0 / 16695.0,
        393.0 / 640.0,
        -92097.0 / 339200.0,
        187.0 / 2100.0,
        1.0 / 40.0,
    ]),
    c: &[0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0],
};
