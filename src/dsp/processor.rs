//! Host-facing phaser processor.
//!
//! Owns the engine and the bypass crossfader, and is the only place where
//! control-side requests (oscillator switches, initial-condition resets,
//! new targets) are applied: once, at the start of every block.

use std::sync::Arc;

use log::{debug, warn};

use crate::controls::{ControlTargets, SharedControls};
use crate::error::{PhaserError, Result};
use crate::preset::PhaserPreset;

use super::bypass::BypassCrossfader;
use super::oscillator::{CHAOS_SEED, OscillatorKind};
use super::phaser::PhaserEngine;

/// Largest magnitude written to the host buffer.
pub const OUTPUT_LIMIT: f32 = 4.0;

/// Last-resort guard before a sample reaches the host: non-finite samples
/// become silence, finite ones are limited to ±`OUTPUT_LIMIT`.
#[inline]
pub fn guard_sample(x: f32) -> f32 {
    if x.is_finite() {
        x.clamp(-OUTPUT_LIMIT, OUTPUT_LIMIT)
    } else {
        0.0
    }
}

pub struct PhaserProcessor {
    sample_rate: f64,
    max_block_size: usize,
    engine: PhaserEngine,
    crossfader: BypassCrossfader,
    controls: Arc<SharedControls>,
    /// Power state the previous block was rendered with.
    power: bool,
}

impl PhaserProcessor {
    /// A processor ready for blocks of up to `max_block_size` samples.
    pub fn new(sample_rate: f64, max_block_size: usize) -> Result<Self> {
        validate(sample_rate, max_block_size)?;
        let controls = Arc::new(SharedControls::default());
        let targets = controls.load();
        Ok(PhaserProcessor {
            sample_rate,
            max_block_size,
            engine: PhaserEngine::new(sample_rate, &targets),
            crossfader: BypassCrossfader::new(max_block_size),
            controls,
            power: targets.power,
        })
    }

    /// Re-size buffers for a new stream configuration. Must not be called
    /// from the audio callback.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        validate(sample_rate, max_block_size)?;
        debug!("phaser prepared at {sample_rate} Hz, blocks of {max_block_size}");
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.engine.set_sample_rate(sample_rate);
        self.crossfader.resize(max_block_size);
        self.reset();
        Ok(())
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) -> Result<()> {
        self.prepare(sample_rate, self.max_block_size)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    /// Handle for writing targets from another thread.
    pub fn controls(&self) -> Arc<SharedControls> {
        Arc::clone(&self.controls)
    }

    pub fn engine(&self) -> &PhaserEngine {
        &self.engine
    }

    pub fn oscillator_kind(&self) -> OscillatorKind {
        self.engine.oscillator().kind()
    }

    /// Select the modulation source by host id (1..=10). Takes effect at
    /// the next block. Unknown ids are rejected and the current source
    /// stays active.
    pub fn set_oscillator_type(&self, id: i32) -> Result<OscillatorKind> {
        let Some(kind) = OscillatorKind::from_id(id) else {
            warn!("ignoring unknown oscillator id {id}");
            return Err(PhaserError::UnknownOscillator(id));
        };
        debug!("oscillator switch to {} requested", kind.name());
        self.controls.request_oscillator(kind);
        Ok(kind)
    }

    pub fn set_control_targets(&self, targets: &ControlTargets) {
        self.controls.store(targets);
    }

    /// Queue new initial conditions for a chaotic source, applied at the
    /// next block. The origin is a fixed point of the attractors, so an
    /// all-zero vector is replaced with the default seed.
    pub fn reset_initial_conditions(&self, ic0: f64, ic1: f64, ic2: f64) {
        let mut ic = [ic0, ic1, ic2];
        if ic.iter().any(|v| !v.is_finite()) || ic.iter().all(|&v| v == 0.0) {
            warn!("degenerate initial conditions {ic:?}, using default seed");
            ic = CHAOS_SEED;
        }
        self.controls.request_initial_conditions(ic);
    }

    /// Load a preset's source, targets and initial conditions.
    pub fn apply_preset(&self, preset: &PhaserPreset) {
        debug!("applying preset '{}'", preset.name);
        self.controls.request_oscillator(preset.oscillator);
        self.set_control_targets(&preset.controls);
        if let Some([a, b, c]) = preset.initial_conditions {
            self.reset_initial_conditions(a, b, c);
        }
    }

    /// Clear filter history and the crossfade buffer, apply pending
    /// requests and land every control on its target with no ramp.
    pub fn reset(&mut self) {
        self.apply_requests();
        let targets = self.controls.load();
        self.engine.snap_to_targets(&targets);
        self.engine.clear_filters();
        self.crossfader.clear();
        self.power = targets.power;
    }

    /// Process one host buffer in place. One channel is mono, two or more
    /// is stereo on the first pair; further channels are left untouched.
    /// Buffers longer than the prepared block size are handled as
    /// consecutive sub-blocks.
    pub fn process(&mut self, channels: &mut [&mut [f32]]) {
        let Some((first, rest)) = channels.split_first_mut() else {
            return;
        };
        let left: &mut [f32] = first;
        let mut right: Option<&mut [f32]> = rest.first_mut().map(|r| &mut **r);
        let len = match right.as_deref() {
            Some(r) => left.len().min(r.len()),
            None => left.len(),
        };

        let mut start = 0;
        while start < len {
            let end = (start + self.max_block_size).min(len);
            let r = right.as_deref_mut().map(|r| &mut r[start..end]);
            self.process_block(&mut left[start..end], r);
            start = end;
        }
    }

    /// Stereo convenience wrapper around [`process`](Self::process).
    pub fn process_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.process(&mut [left, right]);
    }

    pub fn process_mono(&mut self, samples: &mut [f32]) {
        self.process(&mut [samples]);
    }

    fn apply_requests(&mut self) {
        if let Some(kind) = self.controls.take_oscillator_request() {
            self.engine.oscillator_mut().set_kind(kind);
        }
        if let Some(ic) = self.controls.take_initial_conditions() {
            self.engine.oscillator_mut().inject_initial_conditions(ic);
        }
    }

    fn process_block(&mut self, left: &mut [f32], mut right: Option<&mut [f32]>) {
        self.apply_requests();
        let targets = self.controls.load();
        self.engine.set_targets(&targets);

        let toggled = targets.power != self.power;
        self.power = targets.power;

        if targets.power {
            self.engine.process_block(left, right.as_deref_mut());
        }
        self.crossfader.process(left, right.as_deref_mut(), toggled);

        for s in left.iter_mut() {
            *s = guard_sample(*s);
        }
        if let Some(right) = right {
            for s in right.iter_mut() {
                *s = guard_sample(*s);
            }
        }
    }
}

fn validate(sample_rate: f64, max_block_size: usize) -> Result<()> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(PhaserError::InvalidSampleRate(sample_rate));
    }
    if max_block_size == 0 {
        return Err(PhaserError::InvalidBlockSize(max_block_size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    const SR: f64 = 48000.0;
    const BLOCK: usize = 480;

    /// A 100 Hz tone: exactly one period per 480-sample block at 48 kHz.
    fn tone(len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| ((TAU * 100.0 * n as f64 / SR).sin() * 0.5) as f32)
            .collect()
    }

    fn wet() -> ControlTargets {
        ControlTargets {
            mix: 1.0,
            ..ControlTargets::default()
        }
    }

    fn wet_processor() -> PhaserProcessor {
        let mut p = PhaserProcessor::new(SR, BLOCK).unwrap();
        p.set_control_targets(&wet());
        p.reset();
        p
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(matches!(
            PhaserProcessor::new(0.0, 512),
            Err(PhaserError::InvalidSampleRate(_))
        ));
        assert!(matches!(
            PhaserProcessor::new(f64::NAN, 512),
            Err(PhaserError::InvalidSampleRate(_))
        ));
        assert!(matches!(
            PhaserProcessor::new(SR, 0),
            Err(PhaserError::InvalidBlockSize(0))
        ));
        let mut p = PhaserProcessor::new(SR, 512).unwrap();
        assert!(p.set_sample_rate(-1.0).is_err());
        assert_eq!(p.sample_rate(), SR);
    }

    #[test]
    fn unknown_oscillator_keeps_current() {
        let mut p = PhaserProcessor::new(SR, BLOCK).unwrap();
        p.set_oscillator_type(10).unwrap();
        p.process_mono(&mut vec![0.0; BLOCK]);
        assert_eq!(p.oscillator_kind(), OscillatorKind::Lorenz);

        assert!(matches!(
            p.set_oscillator_type(42),
            Err(PhaserError::UnknownOscillator(42))
        ));
        p.process_mono(&mut vec![0.0; BLOCK]);
        assert_eq!(p.oscillator_kind(), OscillatorKind::Lorenz);
    }

    #[test]
    fn oscillator_switch_waits_for_block_boundary() {
        let mut p = PhaserProcessor::new(SR, BLOCK).unwrap();
        p.set_oscillator_type(9).unwrap();
        assert_eq!(p.oscillator_kind(), OscillatorKind::Sine);
        p.process_mono(&mut vec![0.0; 16]);
        assert_eq!(p.oscillator_kind(), OscillatorKind::Chua);
    }

    #[test]
    fn zero_mix_reproduces_input() {
        let mut p = PhaserProcessor::new(SR, BLOCK).unwrap();
        p.set_oscillator_type(10).unwrap();
        let input = tone(BLOCK * 8);
        let mut left = input.clone();
        let mut right = input.clone();
        p.process_stereo(&mut left, &mut right);
        assert_eq!(left, input);
        assert_eq!(right, input);
    }

    #[test]
    fn extra_channels_untouched() {
        let mut p = wet_processor();
        let input = tone(BLOCK);
        let mut a = input.clone();
        let mut b = input.clone();
        let mut c = input.clone();
        p.process(&mut [&mut a, &mut b, &mut c]);
        assert_ne!(a, input);
        assert_eq!(c, input);
    }

    #[test]
    fn long_buffers_are_split() {
        let input = tone(BLOCK * 3 + 17);
        let mut whole = wet_processor();
        let mut out_whole = input.clone();
        whole.process_mono(&mut out_whole);

        let mut chunked = wet_processor();
        let mut out_chunked = input.clone();
        for chunk in out_chunked.chunks_mut(BLOCK) {
            chunked.process_mono(chunk);
        }
        assert_eq!(out_whole, out_chunked);
    }

    #[test]
    fn power_off_passes_dry() {
        let mut p = wet_processor();
        p.controls().set_power(false);
        p.reset();
        let input = tone(BLOCK);
        let mut out = input.clone();
        p.process_mono(&mut out);
        assert_eq!(out, input);
    }

    #[test]
    fn power_toggle_crossfades() {
        let input = tone(BLOCK);

        let mut p = wet_processor();
        p.controls().set_power(false);
        p.reset();
        let mut off_block = input.clone();
        p.process_mono(&mut off_block);

        p.controls().set_power(true);
        let mut faded = input.clone();
        p.process_mono(&mut faded);

        // Reference: the same engine state, switched on from the start.
        let mut reference = wet_processor();
        let mut steady = input.clone();
        reference.process_mono(&mut steady);

        assert!((faded[0] - off_block[0]).abs() < 1e-6, "fade starts on the old signal");
        assert!(
            (faded[BLOCK - 1] - steady[BLOCK - 1]).abs() < 1e-6,
            "fade ends on the new signal"
        );

        let max_jump = |b: &[f32]| {
            b.windows(2)
                .map(|w| (w[1] - w[0]).abs())
                .fold(0.0_f32, f32::max)
        };
        let limit = max_jump(&off_block).max(max_jump(&steady)) + 0.01;
        assert!(
            max_jump(&faded) <= limit,
            "crossfade introduced a step: {} > {limit}",
            max_jump(&faded)
        );
        assert!(
            (faded[0] - off_block[BLOCK - 1]).abs() <= limit,
            "block boundary clicked"
        );
    }

    #[test]
    fn toggle_after_short_tail_block_is_smooth() {
        let mut p = wet_processor();
        p.controls().set_power(false);
        p.reset();
        // 480 + 20: the remembered block is the 20-sample tail.
        let mut off = vec![0.5_f32; 500];
        p.process_mono(&mut off);

        p.controls().set_power(true);
        let mut on = vec![0.5_f32; BLOCK];
        p.process_mono(&mut on);

        assert_eq!(on[0], off[499], "fade starts on the held tail");
        let (at, step) = on
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .enumerate()
            .fold((0, 0.0_f32), |best, (i, s)| if s > best.1 { (i, s) } else { best });
        assert!(step < 0.01, "click of {step} at sample {at}: {:?}", &on[..8]);
    }

    #[test]
    fn toggling_back_and_forth_before_a_block_is_no_edge() {
        let input = tone(BLOCK);
        let mut p = wet_processor();
        let mut first = input.clone();
        p.process_mono(&mut first);

        p.controls().set_power(false);
        p.controls().set_power(true);
        let mut second = input.clone();
        p.process_mono(&mut second);

        let mut reference = wet_processor();
        let mut expected = input.clone();
        reference.process_mono(&mut expected);
        let mut expected2 = input.clone();
        reference.process_mono(&mut expected2);
        assert_eq!(second, expected2);
    }

    #[test]
    fn initial_conditions_apply_to_chaotic_source() {
        let mut p = PhaserProcessor::new(SR, BLOCK).unwrap();
        p.set_oscillator_type(10).unwrap();
        p.reset_initial_conditions(0.5, 0.25, -0.5);
        p.reset();
        assert_eq!(p.engine().oscillator().state().registers(), [0.5, 0.25, -0.5]);
    }

    #[test]
    fn degenerate_initial_conditions_use_seed() {
        let mut p = PhaserProcessor::new(SR, BLOCK).unwrap();
        p.set_oscillator_type(10).unwrap();
        p.reset_initial_conditions(0.0, 0.0, 0.0);
        p.reset();
        assert_eq!(p.engine().oscillator().state().registers(), CHAOS_SEED);
    }

    #[test]
    fn output_is_always_finite() {
        let mut p = wet_processor();
        let mut buf = vec![f32::NAN, f32::INFINITY, 100.0, -100.0, 0.5];
        p.process_mono(&mut buf);
        assert!(buf.iter().all(|s| s.is_finite() && s.abs() <= OUTPUT_LIMIT), "{buf:?}");
    }

    #[test]
    fn full_pipeline_is_deterministic() {
        let input = tone(BLOCK * 20);
        let run = || {
            let mut p = wet_processor();
            p.set_oscillator_type(9).unwrap();
            p.controls().set_rate(3.0);
            p.controls().set_stages(12);
            let mut l = input.clone();
            let mut r = input.clone();
            p.process_stereo(&mut l, &mut r);
            (l, r)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn controls_handle_is_shared() {
        let p = PhaserProcessor::new(SR, BLOCK).unwrap();
        let handle = p.controls();
        handle.set_center_frequency(2500.0);
        assert_eq!(p.controls().load().center_frequency, 2500.0);
    }
}
