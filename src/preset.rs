//! Phaser presets.
//!
//! A preset is a named snapshot of everything a host can set: the
//! modulation source, the control targets and, for the chaotic sources, an
//! optional initial-condition vector. Presets are stored as JSON:
//!
//! ```json
//! {
//!   "name": "Slow Lorenz",
//!   "oscillator": "lorenz",
//!   "controls": { "depth": 0.9, "mix": 0.7, "stages": 8 },
//!   "initialConditions": [0.9, -0.4, -0.6]
//! }
//! ```

use log::warn;
use serde::{Deserialize, Serialize};

use crate::controls::ControlTargets;
use crate::dsp::oscillator::OscillatorKind;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaserPreset {
    pub name: String,
    #[serde(default)]
    pub oscillator: OscillatorKind,
    #[serde(default)]
    pub controls: ControlTargets,
    /// Starting state for the chaotic sources. Ignored by the others.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_conditions: Option<[f64; 3]>,
}

impl PhaserPreset {
    /// A preset on the default controls and the sine source.
    pub fn new(name: impl Into<String>) -> Self {
        PhaserPreset {
            name: name.into(),
            oscillator: OscillatorKind::default(),
            controls: ControlTargets::default(),
            initial_conditions: None,
        }
    }

    /// Parse a preset. Out-of-range controls are pulled into range rather
    /// than rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut preset: PhaserPreset = serde_json::from_str(json)?;
        let clamped = preset.controls.clamped();
        if clamped != preset.controls {
            warn!("preset '{}' had out-of-range controls; clamped", preset.name);
            preset.controls = clamped;
        }
        Ok(preset)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for PhaserPreset {
    fn default() -> Self {
        Self::new("Init")
    }
}
