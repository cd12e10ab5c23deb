// rs_nbody_wasm/src/lib.rs
// This is the public API for the wasm wrapper of the N-body engine.

use wasm_bindgen::prelude::*;
use rs_nbody::forces::ForceMode;
use rs_nbody::integrators::IntegrationScheme;
use rs_nbody::models::{flatten_coordinates, unflatten_coordinates, Bounds3D, Vector3};
use rs_nbody::simulation::{Engine, EngineConfig};
use rs_nbody::utils::{GravityConstants, NBodyError};

fn to_js(e: NBodyError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn vectors(name: &str, flat: &[f64]) -> Result<Vec<Vector3>, JsValue> {
    unflatten_coordinates(flat)
        .ok_or_else(|| JsValue::from_str(&format!("{} must hold 3 values per body, got {}", name, flat.len())))
}

fn corner(name: &str, flat: &[f64]) -> Result<Vector3, JsValue> {
    match flat {
        [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
        _ => Err(JsValue::from_str(&format!("{} must hold exactly 3 values", name))),
    }
}

/// Engine handle for a JavaScript harness. Positions and velocities are kept
/// here and exchanged with JavaScript as flat `[x0, y0, z0, x1, ...]` arrays.
#[wasm_bindgen]
pub struct WasmEngine {
    engine: Engine,
    positions: Vec<Vector3>,
    velocities: Vec<Vector3>,
    scheme: IntegrationScheme,
}

#[wasm_bindgen]
impl WasmEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(
        masses: Vec<f64>,
        positions: Vec<f64>,
        velocities: Vec<f64>,
        bounds_min: Vec<f64>,
        bounds_max: Vec<f64>,
        gravitational_constant: Option<f64>,
        softening_length: Option<f64>,
        barnes_hut_theta: Option<f64>,
    ) -> Result<WasmEngine, JsValue> {
        let positions = vectors("positions", &positions)?;
        let velocities = vectors("velocities", &velocities)?;
        if velocities.len() != positions.len() {
            return Err(to_js(NBodyError::LengthMismatch { expected: positions.len(), found: velocities.len() }));
        }
        let bounds = Bounds3D::new(corner("bounds_min", &bounds_min)?, corner("bounds_max", &bounds_max)?)
            .map_err(to_js)?;

        let constants = GravityConstants::new(gravitational_constant, softening_length, None);
        let force_mode = barnes_hut_theta.map(|theta| ForceMode::BarnesHut { theta });
        let config = EngineConfig::new(Some(constants), force_mode, None, None);

        let engine = Engine::new(masses, &positions, bounds, config).map_err(to_js)?;
        Ok(Self { engine, positions, velocities, scheme: IntegrationScheme::DormandPrince })
    }

    /// Selects the scheme used by `step`: `euler`, `rk4` or `dormand_prince`.
    #[wasm_bindgen]
    pub fn set_scheme(&mut self, name: &str) -> Result<(), JsValue> {
        self.scheme = name.parse().map_err(to_js)?;
        Ok(())
    }

    #[wasm_bindgen(getter)]
    pub fn scheme(&self) -> String {
        self.scheme.to_string()
    }

    #[wasm_bindgen]
    pub fn step(&mut self, dt: f64) -> Result<(), JsValue> {
        self.engine
            .step(&mut self.positions, &mut self.velocities, dt, self.scheme)
            .map(|_| ())
            .map_err(to_js)
    }

    /// Replaces positions and velocities, e.g. after the harness bounced bodies off a wall.
    #[wasm_bindgen]
    pub fn set_state(&mut self, positions: Vec<f64>, velocities: Vec<f64>) -> Result<(), JsValue> {
        let positions = vectors("positions", &positions)?;
        let velocities = vectors("velocities", &velocities)?;
        let expected = self.engine.body_count();
        for found in [positions.len(), velocities.len()] {
            if found != expected {
                return Err(to_js(NBodyError::LengthMismatch { expected, found }));
            }
        }
        self.positions = positions;
        self.velocities = velocities;
        Ok(())
    }

    #[wasm_bindgen(getter)]
    pub fn body_count(&self) -> usize {
        self.engine.body_count()
    }

    #[wasm_bindgen]
    pub fn positions(&self) -> Vec<f64> {
        flatten_coordinates(&self.positions)
    }

    #[wasm_bindgen]
    pub fn velocities(&self) -> Vec<f64> {
        flatten_coordinates(&self.velocities)
    }

    #[wasm_bindgen]
    pub fn accelerations(&self) -> Vec<f64> {
        flatten_coordinates(self.engine.accelerations())
    }

    #[wasm_bindgen]
    pub fn previous_accelerations(&self) -> Vec<f64> {
        flatten_coordinates(self.engine.previous_accelerations())
    }

    #[wasm_bindgen]
    pub fn total_energy(&self) -> f64 {
        self.engine.diagnostics(&self.positions, &self.velocities).total_energy
    }

    /// Writes the body count, energy and momentum to the browser console.
    #[wasm_bindgen]
    pub fn log_summary(&self) {
        let d = self.engine.diagnostics(&self.positions, &self.velocities);
        let message = format!(
            "{} bodies, {} steps, E = {:.6e}, p = ({:.3e}, {:.3e}, {:.3e})",
            self.engine.body_count(),
            self.engine.steps_taken(),
            d.total_energy,
            d.momentum.x,
            d.momentum.y,
            d.momentum.z
        );
        web_sys::console::log_1(&JsValue::from_str(&message));
    }
}
