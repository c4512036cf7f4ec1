//! Phaser engine: per-sample modulation of an all-pass chain.
//!
//! For every sample the engine steps the control smoothers, advances the
//! modulation oscillator, derives one set of all-pass coefficients from the
//! oscillator output and runs each channel through its own cascade. The wet
//! signal is added to the dry input scaled by `mix`:
//!
//! ```text
//! BW  = centre / 3 · width
//! Re  = −2 · depth · cos(Ω · (centre + BW · m))      Ω = 2π / fs
//! out = dry + allpass⁴ˢ(dry) · mix
//! ```
//!
//! No value is clamped here; range validation lives with the controls.

use std::f64::consts::TAU;

use crate::controls::ControlTargets;

use super::allpass::{AllpassCascade, AllpassCoefficients};
use super::oscillator::OscillatorBank;
use super::smoother::{DEFAULT_RAMP_SECONDS, SmoothedValue};

/// Smoothed control values in effect for one sample.
///
/// Power is not among them: it switches whole blocks in `PhaserProcessor`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineControls {
    pub rate: f64,
    pub depth: f64,
    pub width: f64,
    pub center_frequency: f64,
    pub mix: f64,
    pub stages: usize,
}

impl EngineControls {
    /// All-pass coefficients for modulation value `m` at `sample_rate`.
    #[inline]
    pub fn coefficients(&self, modulation: f64, sample_rate: f64) -> AllpassCoefficients {
        let omega = TAU / sample_rate;
        let bandwidth = self.center_frequency / 3.0 * self.width;
        let re = -2.0 * self.depth * (omega * (self.center_frequency + bandwidth * modulation)).cos();
        AllpassCoefficients::new(self.depth, re)
    }
}

/// One smoother per control.
#[derive(Debug, Clone)]
struct ControlSmoothers {
    rate: SmoothedValue,
    depth: SmoothedValue,
    width: SmoothedValue,
    center_frequency: SmoothedValue,
    mix: SmoothedValue,
    /// Zero-length ramp: in-between stage counts are not supported values.
    stages: SmoothedValue,
}

impl ControlSmoothers {
    fn new(t: &ControlTargets, sample_rate: f64) -> Self {
        let ramp = |v: f64| SmoothedValue::new(v, sample_rate, DEFAULT_RAMP_SECONDS);
        ControlSmoothers {
            rate: ramp(t.rate),
            depth: ramp(t.depth),
            width: ramp(t.width),
            center_frequency: ramp(t.center_frequency),
            mix: ramp(t.mix),
            stages: SmoothedValue::immediate(f64::from(t.stages)),
        }
    }

    fn continuous_mut(&mut self) -> [&mut SmoothedValue; 5] {
        [
            &mut self.rate,
            &mut self.depth,
            &mut self.width,
            &mut self.center_frequency,
            &mut self.mix,
        ]
    }

    fn set_targets(&mut self, t: &ControlTargets) {
        self.rate.set_target(t.rate);
        self.depth.set_target(t.depth);
        self.width.set_target(t.width);
        self.center_frequency.set_target(t.center_frequency);
        self.mix.set_target(t.mix);
        self.stages.set_target(f64::from(t.stages));
    }

    fn snap(&mut self, t: &ControlTargets) {
        self.rate.set_current_and_target(t.rate);
        self.depth.set_current_and_target(t.depth);
        self.width.set_current_and_target(t.width);
        self.center_frequency.set_current_and_target(t.center_frequency);
        self.mix.set_current_and_target(t.mix);
        self.stages.set_current_and_target(f64::from(t.stages));
    }

    #[inline]
    fn next(&mut self) -> EngineControls {
        EngineControls {
            rate: self.rate.next_value(),
            depth: self.depth.next_value(),
            width: self.width.next_value(),
            center_frequency: self.center_frequency.next_value(),
            mix: self.mix.next_value(),
            stages: self.stages.next_value().round().max(0.0) as usize,
        }
    }
}

/// The phaser's per-sample processing core.
#[derive(Debug, Clone)]
pub struct PhaserEngine {
    sample_rate: f64,
    oscillator: OscillatorBank,
    smoothers: ControlSmoothers,
    left: AllpassCascade,
    right: AllpassCascade,
}

impl PhaserEngine {
    /// An engine at rest on `targets`, modulated by the sine generator.
    pub fn new(sample_rate: f64, targets: &ControlTargets) -> Self {
        PhaserEngine {
            sample_rate,
            oscillator: OscillatorBank::new(sample_rate),
            smoothers: ControlSmoothers::new(targets, sample_rate),
            left: AllpassCascade::new(),
            right: AllpassCascade::new(),
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Change the sample rate. Smoother ramps are re-timed and any ramp in
    /// flight lands on its target.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.oscillator.set_sample_rate(sample_rate);
        for s in self.smoothers.continuous_mut() {
            s.reset(sample_rate, DEFAULT_RAMP_SECONDS);
        }
    }

    /// Start ramping every control toward `targets`.
    pub fn set_targets(&mut self, targets: &ControlTargets) {
        self.smoothers.set_targets(targets);
    }

    /// Jump every control to `targets` without ramping.
    pub fn snap_to_targets(&mut self, targets: &ControlTargets) {
        self.smoothers.snap(targets);
    }

    pub fn oscillator(&self) -> &OscillatorBank {
        &self.oscillator
    }

    pub fn oscillator_mut(&mut self) -> &mut OscillatorBank {
        &mut self.oscillator
    }

    /// Clear both all-pass histories.
    pub fn clear_filters(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    /// Process one frame. `right` is `None` for mono.
    #[inline]
    pub fn process_sample(&mut self, left: f32, right: Option<f32>) -> (f32, Option<f32>) {
        let controls = self.smoothers.next();
        let [modulation, _, _] = self.oscillator.advance(controls.rate, 0.0);
        let coeffs = controls.coefficients(modulation, self.sample_rate);

        let dry_l = f64::from(left);
        let wet_l = self.left.process(&coeffs, dry_l, controls.stages);
        let out_l = (dry_l + wet_l * controls.mix) as f32;

        let out_r = right.map(|r| {
            let dry_r = f64::from(r);
            let wet_r = self.right.process(&coeffs, dry_r, controls.stages);
            (dry_r + wet_r * controls.mix) as f32
        });
        (out_l, out_r)
    }

    /// Process a block in place, strictly in sample order.
    pub fn process_block(&mut self, left: &mut [f32], right: Option<&mut [f32]>) {
        match right {
            Some(right) => {
                for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                    let (out_l, out_r) = self.process_sample(*l, Some(*r));
                    *l = out_l;
                    *r = out_r.unwrap_or(*r);
                }
            }
            None => {
                for l in left.iter_mut() {
                    *l = self.process_sample(*l, None).0;
                }
            }
        }
    }
}
