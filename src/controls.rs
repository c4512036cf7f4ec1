//! Control targets and their lock-free hand-off to the audio thread.
//!
//! The UI/host side writes plain numeric targets; the audio thread reads
//! them once per block and feeds them to the smoothers. Continuous values
//! are single 32-bit words, so a racing read sees either the old or the new
//! value, never a mix. Oscillator switches and initial-condition resets are
//! requests that the audio thread consumes at a block boundary.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::OscillatorKind;

/// Supported stage counts, as offered by the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageCount(u32);

impl StageCount {
    pub const SUPPORTED: [u32; 5] = [1, 4, 8, 12, 16];

    /// Snap `n` to the closest supported count. Ties round up.
    pub fn nearest(n: i64) -> Self {
        let best = Self::SUPPORTED
            .iter()
            .rev()
            .min_by_key(|&&s| i64::from(s).abs_diff(n))
            .copied()
            .unwrap_or(4);
        StageCount(best)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for StageCount {
    fn default() -> Self {
        StageCount(4)
    }
}

/// Raw control values written by the host, before smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlTargets {
    /// LFO rate in Hz (0.001–20).
    pub rate: f64,
    /// All-pass pole radius (0.3–0.99).
    pub depth: f64,
    /// Sweep width as a fraction of a third of the centre frequency (0.1–0.9).
    pub width: f64,
    /// Sweep centre in Hz (100–4000).
    pub center_frequency: f64,
    /// Wet gain added to the dry signal (−1..1). Negative values invert the
    /// wet path and move the notches.
    pub mix: f64,
    /// One of 1, 4, 8, 12, 16.
    pub stages: u32,
    pub power: bool,
}

impl Default for ControlTargets {
    fn default() -> Self {
        ControlTargets {
            rate: 0.5,
            depth: 0.8,
            width: 0.5,
            center_frequency: 1000.0,
            mix: 0.0,
            stages: 4,
            power: true,
        }
    }
}

impl ControlTargets {
    pub const RATE_RANGE: (f64, f64) = (0.001, 20.0);
    pub const DEPTH_RANGE: (f64, f64) = (0.3, 0.99);
    pub const WIDTH_RANGE: (f64, f64) = (0.1, 0.9);
    pub const CENTER_RANGE: (f64, f64) = (100.0, 4000.0);
    pub const MIX_RANGE: (f64, f64) = (-1.0, 1.0);

    /// Bring every value into its documented range. Non-finite values fall
    /// back to the default.
    pub fn clamped(&self) -> Self {
        let d = ControlTargets::default();
        ControlTargets {
            rate: clamp_or(self.rate, Self::RATE_RANGE, d.rate),
            depth: clamp_or(self.depth, Self::DEPTH_RANGE, d.depth),
            width: clamp_or(self.width, Self::WIDTH_RANGE, d.width),
            center_frequency: clamp_or(self.center_frequency, Self::CENTER_RANGE, d.center_frequency),
            mix: clamp_or(self.mix, Self::MIX_RANGE, d.mix),
            stages: StageCount::nearest(i64::from(self.stages)).get(),
            power: self.power,
        }
    }
}

fn clamp_or(v: f64, (lo, hi): (f64, f64), fallback: f64) -> f64 {
    if v.is_finite() { v.clamp(lo, hi) } else { fallback }
}

/// An `f32` stored as its bit pattern.
#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(v: f64) -> Self {
        AtomicF32(AtomicU32::new((v as f32).to_bits()))
    }

    #[inline]
    fn load(&self) -> f64 {
        f64::from(f32::from_bits(self.0.load(Ordering::Relaxed)))
    }

    #[inline]
    fn store(&self, v: f64) {
        self.0.store((v as f32).to_bits(), Ordering::Relaxed);
    }
}

const NO_REQUEST: i32 = 0;

/// Control state shared between the host/UI side and the audio thread.
///
/// Every setter range-clamps its input, so this is the parameter layer's
/// validation point; the engine itself never clamps.
#[derive(Debug)]
pub struct SharedControls {
    rate: AtomicF32,
    depth: AtomicF32,
    width: AtomicF32,
    center_frequency: AtomicF32,
    mix: AtomicF32,
    stages: AtomicU32,
    power: AtomicBool,
    /// Requested oscillator id, or `NO_REQUEST`.
    pending_oscillator: AtomicI32,
    initial_conditions: [AtomicU64; 3],
    initial_conditions_pending: AtomicBool,
}

impl SharedControls {
    pub fn new(targets: &ControlTargets) -> Self {
        let t = targets.clamped();
        SharedControls {
            rate: AtomicF32::new(t.rate),
            depth: AtomicF32::new(t.depth),
            width: AtomicF32::new(t.width),
            center_frequency: AtomicF32::new(t.center_frequency),
            mix: AtomicF32::new(t.mix),
            stages: AtomicU32::new(t.stages),
            power: AtomicBool::new(t.power),
            pending_oscillator: AtomicI32::new(NO_REQUEST),
            initial_conditions: [AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0)],
            initial_conditions_pending: AtomicBool::new(false),
        }
    }

    /// Write every target at once.
    pub fn store(&self, targets: &ControlTargets) {
        let t = targets.clamped();
        self.rate.store(t.rate);
        self.depth.store(t.depth);
        self.width.store(t.width);
        self.center_frequency.store(t.center_frequency);
        self.mix.store(t.mix);
        self.stages.store(t.stages, Ordering::Relaxed);
        self.power.store(t.power, Ordering::Relaxed);
    }

    /// Snapshot of the current targets.
    pub fn load(&self) -> ControlTargets {
        ControlTargets {
            rate: self.rate.load(),
            depth: self.depth.load(),
            width: self.width.load(),
            center_frequency: self.center_frequency.load(),
            mix: self.mix.load(),
            stages: self.stages.load(Ordering::Relaxed),
            power: self.power.load(Ordering::Relaxed),
        }
    }

    pub fn set_rate(&self, hz: f64) {
        self.rate.store(clamp_or(hz, ControlTargets::RATE_RANGE, self.rate.load()));
    }

    pub fn set_depth(&self, depth: f64) {
        self.depth.store(clamp_or(depth, ControlTargets::DEPTH_RANGE, self.depth.load()));
    }

    pub fn set_width(&self, width: f64) {
        self.width.store(clamp_or(width, ControlTargets::WIDTH_RANGE, self.width.load()));
    }

    pub fn set_center_frequency(&self, hz: f64) {
        self.center_frequency.store(clamp_or(
            hz,
            ControlTargets::CENTER_RANGE,
            self.center_frequency.load(),
        ));
    }

    pub fn set_mix(&self, mix: f64) {
        self.mix.store(clamp_or(mix, ControlTargets::MIX_RANGE, self.mix.load()));
    }

    pub fn set_stages(&self, stages: i64) {
        self.stages.store(StageCount::nearest(stages).get(), Ordering::Relaxed);
    }

    pub fn set_power(&self, on: bool) {
        self.power.store(on, Ordering::Relaxed);
    }

    pub fn power(&self) -> bool {
        self.power.load(Ordering::Relaxed)
    }

    /// Ask the audio thread to switch oscillator at its next block.
    /// A later request before that block replaces this one.
    pub fn request_oscillator(&self, kind: OscillatorKind) {
        self.pending_oscillator.store(kind.id(), Ordering::Release);
    }

    /// Consume a pending oscillator switch.
    pub fn take_oscillator_request(&self) -> Option<OscillatorKind> {
        let id = self.pending_oscillator.swap(NO_REQUEST, Ordering::Acquire);
        OscillatorKind::from_id(id)
    }

    /// Publish a new initial-condition vector for the next block.
    pub fn request_initial_conditions(&self, ic: [f64; 3]) {
        for (slot, v) in self.initial_conditions.iter().zip(ic) {
            slot.store(v.to_bits(), Ordering::Relaxed);
        }
        self.initial_conditions_pending.store(true, Ordering::Release);
    }

    /// Consume a pending initial-condition vector.
    pub fn take_initial_conditions(&self) -> Option<[f64; 3]> {
        if !self.initial_conditions_pending.swap(false, Ordering::Acquire) {
            return None;
        }
        Some(
            self.initial_conditions
                .each_ref()
                .map(|slot| f64::from_bits(slot.load(Ordering::Relaxed))),
        )
    }
}

impl Default for SharedControls {
    fn default() -> Self {
        Self::new(&ControlTargets::default())
    }
}
