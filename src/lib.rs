pub mod controls;
pub mod dsp;
pub mod error;
pub mod preset;

use crate::controls::ControlTargets;
use crate::dsp::processor::PhaserProcessor;
use crate::preset::PhaserPreset;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the phaser-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed phaser instance for an AudioWorklet.
///
/// All setters only publish new targets; they take effect at the start of
/// the next `process_*` call.
#[wasm_bindgen]
pub struct PhaserNode {
    processor: PhaserProcessor,
}

#[wasm_bindgen]
impl PhaserNode {
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: f64, max_block_size: usize) -> Result<PhaserNode, JsValue> {
        let processor = PhaserProcessor::new(sample_rate, max_block_size)
            .map_err(|e| JsValue::from_str(&format!("{e}")))?;
        Ok(PhaserNode { processor })
    }

    /// Process one mono block in place.
    pub fn process_mono(&mut self, samples: &mut [f32]) {
        self.processor.process_mono(samples);
    }

    /// Process one stereo block in place.
    pub fn process_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.processor.process_stereo(left, right);
    }

    /// Select the modulation source by id (1 = sine … 10 = Lorenz).
    pub fn set_oscillator_type(&self, id: i32) -> Result<(), JsValue> {
        self.processor
            .set_oscillator_type(id)
            .map(|_| ())
            .map_err(|e| JsValue::from_str(&format!("{e}")))
    }

    /// Id of the modulation source currently running.
    pub fn oscillator_type(&self) -> i32 {
        self.processor.oscillator_kind().id()
    }

    /// Set targets from a `{ rate, depth, width, centerFrequency, mix,
    /// stages, power }` object. Missing fields take their defaults.
    pub fn set_controls(&self, controls: JsValue) -> Result<(), JsValue> {
        let targets: ControlTargets = serde_wasm_bindgen::from_value(controls)
            .map_err(|e| JsValue::from_str(&format!("{e}")))?;
        self.processor.set_control_targets(&targets);
        Ok(())
    }

    /// Current targets as a plain object.
    pub fn controls(&self) -> Result<JsValue, JsValue> {
        let targets = self.processor.controls().load();
        serde_wasm_bindgen::to_value(&targets).map_err(|e| JsValue::from_str(&format!("{e}")))
    }

    pub fn set_power(&self, on: bool) {
        self.processor.controls().set_power(on);
    }

    /// Restart the chaotic source from `(ic0, ic1, ic2)`.
    pub fn reset_initial_conditions(&self, ic0: f64, ic1: f64, ic2: f64) {
        self.processor.reset_initial_conditions(ic0, ic1, ic2);
    }

    /// Load a JSON preset (see [`PhaserPreset`]).
    pub fn load_preset(&self, json: &str) -> Result<(), JsValue> {
        let preset = PhaserPreset::from_json(json).map_err(|e| JsValue::from_str(&format!("{e}")))?;
        self.processor.apply_preset(&preset);
        Ok(())
    }

    /// Re-prepare for a new sample rate or block size.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<(), JsValue> {
        self.processor
            .prepare(sample_rate, max_block_size)
            .map_err(|e| JsValue::from_str(&format!("{e}")))
    }

    /// Clear filter history and land every control on its target.
    pub fn reset(&mut self) {
        self.processor.reset();
    }
}

/// WASM-exposed: run a JSON preset over mono samples and return a WAV
/// byte array.
#[wasm_bindgen]
pub fn render_phaser_wav(samples: &[f32], sample_rate: u32, preset_json: &str) -> Result<Vec<u8>, JsValue> {
    let preset = PhaserPreset::from_json(preset_json).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    dsp::renderer::render_wav(samples, sample_rate, &preset).map_err(|e| JsValue::from_str(&format!("{e}")))
}
