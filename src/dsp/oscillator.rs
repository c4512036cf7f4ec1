//! Modulation oscillators: classic LFO shapes and chaotic dynamical systems.
//!
//! Every generator is a difference equation advanced by exactly one sample
//! per call. The phase-based shapes (triangle, square, saw and their
//! anti-aliased variants) share a sample counter; the others integrate their
//! ODEs with explicit Euler steps of `dt = 1 / sample_rate`.
//!
//! The "sine" generator is a forward-integrated harmonic pair. Its
//! frequency drifts slightly and it loses stability above a few kHz, so it
//! is only meant for sub-audio rates.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

/// Register seed for the chaotic attractors. The origin is a fixed point
/// of both Chua and Lorenz, so they need a non-degenerate start.
pub const CHAOS_SEED: [f64; 3] = [0.9, -0.4, -0.6];

/// Register seed for every other generator.
pub const DEFAULT_SEED: [f64; 3] = [0.1, 0.1, 0.1];

/// Lowest frequency the bank will integrate at.
pub const MIN_FREQUENCY: f64 = 1e-3;

const MIN_SAMPLE_RATE: f64 = 1.0;

// Duffing: x'' = c·x' − α·x − β·x³, with α driven by the rate.
const DUFFING_STIFFNESS: f64 = 5.0;
const DUFFING_DAMPING: f64 = 0.02;

// Chua circuit with a piecewise-linear diode.
const CHUA_ALPHA: f64 = 4.0;
const CHUA_BETA: f64 = 100.0 / 7.0;
const CHUA_M0: f64 = 8.0 / 7.0;
const CHUA_M1: f64 = 5.0 / 7.0;

const LORENZ_SIGMA: f64 = 10.0;
const LORENZ_BETA: f64 = 8.0 / 3.0;
const LORENZ_RHO: f64 = 28.0;

/// The ten selectable modulation sources, numbered as the host sees them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OscillatorKind {
    #[default]
    Sine,
    Triangle,
    Square,
    Saw,
    AaSquare,
    AaSaw,
    Vanderpol,
    Duffing,
    Chua,
    Lorenz,
}

impl OscillatorKind {
    pub const ALL: [OscillatorKind; 10] = [
        OscillatorKind::Sine,
        OscillatorKind::Triangle,
        OscillatorKind::Square,
        OscillatorKind::Saw,
        OscillatorKind::AaSquare,
        OscillatorKind::AaSaw,
        OscillatorKind::Vanderpol,
        OscillatorKind::Duffing,
        OscillatorKind::Chua,
        OscillatorKind::Lorenz,
    ];

    /// Map a host type id (1..=10) to a kind.
    pub fn from_id(id: i32) -> Option<Self> {
        if (1..=10).contains(&id) {
            Some(Self::ALL[(id - 1) as usize])
        } else {
            None
        }
    }

    /// Host type id (1..=10).
    pub fn id(self) -> i32 {
        Self::ALL.iter().position(|&k| k == self).map_or(1, |i| i as i32 + 1)
    }

    pub fn name(self) -> &'static str {
        match self {
            OscillatorKind::Sine => "Sine",
            OscillatorKind::Triangle => "Triangle",
            OscillatorKind::Square => "Square",
            OscillatorKind::Saw => "Saw",
            OscillatorKind::AaSquare => "AA Square",
            OscillatorKind::AaSaw => "AA Saw",
            OscillatorKind::Vanderpol => "Vanderpol",
            OscillatorKind::Duffing => "Duffing",
            OscillatorKind::Chua => "Chua",
            OscillatorKind::Lorenz => "Lorenz",
        }
    }

    /// Dynamical systems that accept injected initial conditions.
    pub fn is_chaotic(self) -> bool {
        matches!(
            self,
            OscillatorKind::Vanderpol
                | OscillatorKind::Duffing
                | OscillatorKind::Chua
                | OscillatorKind::Lorenz
        )
    }

    /// Whether the rate control has any effect on this generator.
    /// Chua and Lorenz run at their own time scale.
    pub fn uses_rate(self) -> bool {
        !matches!(self, OscillatorKind::Chua | OscillatorKind::Lorenz)
    }

    fn seed(self) -> [f64; 3] {
        match self {
            OscillatorKind::Chua | OscillatorKind::Lorenz => CHAOS_SEED,
            _ => DEFAULT_SEED,
        }
    }
}

/// Sample counter shared by the phase-based shapes. Never negative; the
/// position inside a period is taken modulo the period on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhaseCounter(f64);

impl PhaseCounter {
    #[inline]
    fn tick(&mut self) -> f64 {
        self.0 += 1.0;
        self.0
    }

    pub fn count(&self) -> f64 {
        self.0
    }
}

/// Per-sample integration context.
#[derive(Debug, Clone, Copy)]
struct Step {
    /// Angular frequency `2π·f`.
    w: f64,
    dt: f64,
    /// Period in samples, `sample_rate / f`.
    period: f64,
    input: f64,
}

/// Generator state. Each variant carries exactly the registers it uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Oscillator {
    Sine { x: f64, y: f64 },
    Triangle(PhaseCounter),
    Square(PhaseCounter),
    Saw(PhaseCounter),
    AaSquare(PhaseCounter),
    AaSaw {
        phase: PhaseCounter,
        /// Set by the wrap sample; the following sample jumps to −1.
        full_reset_pending: bool,
    },
    Vanderpol { x: f64, y: f64 },
    Duffing { x: f64, y: f64 },
    Chua { x: f64, y: f64, z: f64 },
    Lorenz { x: f64, y: f64, z: f64 },
}

impl Oscillator {
    /// Freshly reset state for `kind`.
    pub fn initial(kind: OscillatorKind) -> Self {
        let [x, y, z] = kind.seed();
        let phase = PhaseCounter::default();
        match kind {
            OscillatorKind::Sine => Oscillator::Sine { x, y },
            OscillatorKind::Triangle => Oscillator::Triangle(phase),
            OscillatorKind::Square => Oscillator::Square(phase),
            OscillatorKind::Saw => Oscillator::Saw(phase),
            OscillatorKind::AaSquare => Oscillator::AaSquare(phase),
            OscillatorKind::AaSaw => Oscillator::AaSaw {
                phase,
                full_reset_pending: false,
            },
            OscillatorKind::Vanderpol => Oscillator::Vanderpol { x, y },
            OscillatorKind::Duffing => Oscillator::Duffing { x, y },
            OscillatorKind::Chua => Oscillator::Chua { x, y, z },
            OscillatorKind::Lorenz => Oscillator::Lorenz { x, y, z },
        }
    }

    /// Type-switch transition. Selecting a type always starts it from its
    /// own reset state, including re-selecting the current type; nothing of
    /// the old trajectory survives.
    pub fn transition(self, kind: OscillatorKind) -> Self {
        Self::initial(kind)
    }

    /// Replace the registers of a dynamical system with `ic`. Phase-based
    /// shapes have no initial conditions and are returned unchanged.
    /// Two-register systems ignore `ic[2]`.
    pub fn with_initial_conditions(self, ic: [f64; 3]) -> Self {
        let [x, y, z] = ic;
        match self {
            Oscillator::Vanderpol { .. } => Oscillator::Vanderpol { x, y },
            Oscillator::Duffing { .. } => Oscillator::Duffing { x, y },
            Oscillator::Chua { .. } => Oscillator::Chua { x, y, z },
            Oscillator::Lorenz { .. } => Oscillator::Lorenz { x, y, z },
            other => other,
        }
    }

    pub fn kind(&self) -> OscillatorKind {
        match self {
            Oscillator::Sine { .. } => OscillatorKind::Sine,
            Oscillator::Triangle(_) => OscillatorKind::Triangle,
            Oscillator::Square(_) => OscillatorKind::Square,
            Oscillator::Saw(_) => OscillatorKind::Saw,
            Oscillator::AaSquare(_) => OscillatorKind::AaSquare,
            Oscillator::AaSaw { .. } => OscillatorKind::AaSaw,
            Oscillator::Vanderpol { .. } => OscillatorKind::Vanderpol,
            Oscillator::Duffing { .. } => OscillatorKind::Duffing,
            Oscillator::Chua { .. } => OscillatorKind::Chua,
            Oscillator::Lorenz { .. } => OscillatorKind::Lorenz,
        }
    }

    /// Delay registers `(d1, d2, d3)`; unused slots read as zero.
    pub fn registers(&self) -> [f64; 3] {
        match *self {
            Oscillator::Sine { x, y }
            | Oscillator::Vanderpol { x, y }
            | Oscillator::Duffing { x, y } => [x, y, 0.0],
            Oscillator::Chua { x, y, z } | Oscillator::Lorenz { x, y, z } => [x, y, z],
            _ => [0.0; 3],
        }
    }

    fn advance(&mut self, s: Step) -> [f64; 3] {
        match self {
            Oscillator::Sine { x, y } => {
                let x1 = *x + s.w * s.w * s.dt * *y;
                let y1 = *y - s.dt * x1 + s.input;
                *x = x1;
                *y = y1;
                [x1, y1, 0.0]
            }
            Oscillator::Triangle(phase) => {
                let t = phase.tick() % s.period / s.period;
                let v = if t > 0.5 { 4.0 * t - 3.0 } else { 1.0 - 4.0 * t };
                [v + s.input, 0.0, 0.0]
            }
            Oscillator::Square(phase) => {
                let t = phase.tick() % s.period;
                let v = if t > s.period / 2.0 { 1.0 } else { -1.0 };
                [v + s.input, 0.0, 0.0]
            }
            Oscillator::Saw(phase) => {
                let t = phase.tick() % s.period;
                [2.0 * (t / s.period - 0.5) + s.input, 0.0, 0.0]
            }
            Oscillator::AaSquare(phase) => {
                let n = phase.tick();
                let half = s.period / 2.0;
                let sign = if n % s.period > half { 1.0 } else { -1.0 };
                // Zero on the first sample of every half period.
                let gate = if (n % half).trunc() == 0.0 { 0.0 } else { 1.0 };
                [sign * gate + s.input, 0.0, 0.0]
            }
            Oscillator::AaSaw {
                phase,
                full_reset_pending,
            } => {
                let t = phase.tick() % s.period;
                let v = if t.trunc() == 0.0 {
                    *full_reset_pending = true;
                    0.0
                } else if *full_reset_pending {
                    *full_reset_pending = false;
                    -1.0
                } else {
                    2.0 * (t / s.period - 0.5)
                };
                [v + s.input, 0.0, 0.0]
            }
            Oscillator::Vanderpol { x, y } => {
                let x1 = *x + s.w * s.w * s.dt * *y;
                let y1 = *y + s.dt * ((1.0 - *y * *y) - x1) + s.input;
                *x = x1;
                *y = y1;
                [x1, y1, 0.0]
            }
            Oscillator::Duffing { x, y } => {
                let alpha = -1.0 - 10.0 * s.w;
                let (x0, y0) = (*x, *y);
                let x1 = x0 + s.dt * y0 + s.input;
                let y1 = y0
                    + s.dt
                        * (DUFFING_DAMPING * y0 - alpha * x0 - DUFFING_STIFFNESS * x0 * x0 * x0);
                *x = x1;
                *y = y1;
                [x1, y1, 0.0]
            }
            Oscillator::Chua { x, y, z } => {
                let (x0, y0, z0) = (*x, *y, *z);
                *x = x0 + s.dt * CHUA_ALPHA * (y0 - x0 - chua_diode(x0)) + s.input;
                *y = y0 + s.dt * (x0 - y0 + z0);
                *z = z0 - s.dt * CHUA_BETA * y0;
                [*x, *y, *z]
            }
            Oscillator::Lorenz { x, y, z } => {
                let (x0, y0, z0) = (*x, *y, *z);
                *x = x0 + s.dt * LORENZ_SIGMA * (y0 - x0) + s.input;
                *y = y0 + s.dt * (x0 * (LORENZ_RHO - z0) - y0);
                *z = z0 + s.dt * (x0 * y0 - LORENZ_BETA * z0);
                [*x, *y, *z]
            }
        }
    }
}

/// Chua's piecewise-linear nonlinearity.
#[inline]
fn chua_diode(x: f64) -> f64 {
    -CHUA_M1 * x - 0.5 * (CHUA_M0 - CHUA_M1) * ((x + 1.0).abs() - (x - 1.0).abs())
}

/// Holds whichever generator is active and advances it one sample at a time.
#[derive(Debug, Clone)]
pub struct OscillatorBank {
    sample_rate: f64,
    sample_time: f64,
    /// Angular frequency used by the most recent step.
    angular: f64,
    state: Oscillator,
}

impl OscillatorBank {
    /// A bank running the sine generator.
    pub fn new(sample_rate: f64) -> Self {
        let sample_rate = sample_rate.max(MIN_SAMPLE_RATE);
        OscillatorBank {
            sample_rate,
            sample_time: 1.0 / sample_rate,
            angular: 0.0,
            state: Oscillator::initial(OscillatorKind::Sine),
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate.max(MIN_SAMPLE_RATE);
        self.sample_time = 1.0 / self.sample_rate;
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn kind(&self) -> OscillatorKind {
        self.state.kind()
    }

    pub fn state(&self) -> &Oscillator {
        &self.state
    }

    /// Angular frequency (rad/s) of the last `advance` call.
    pub fn angular_frequency(&self) -> f64 {
        self.angular
    }

    /// Switch generator. Registers and phase restart from the new type's seed.
    pub fn set_kind(&mut self, kind: OscillatorKind) {
        self.state = self.state.transition(kind);
    }

    /// Restart the current generator from its seed.
    pub fn reset(&mut self) {
        self.state = Oscillator::initial(self.state.kind());
    }

    /// Inject initial conditions into a dynamical system. Returns `false`
    /// when the active generator has none.
    pub fn inject_initial_conditions(&mut self, ic: [f64; 3]) -> bool {
        if !self.state.kind().is_chaotic() {
            return false;
        }
        self.state = self.state.with_initial_conditions(ic);
        true
    }

    /// Advance one sample at `frequency` Hz, adding `input` into the first
    /// state equation. Returns up to three output channels.
    pub fn advance(&mut self, frequency: f64, input: f64) -> [f64; 3] {
        let nyquist = self.sample_rate / 2.0;
        let frequency = if frequency.is_finite() {
            frequency.clamp(MIN_FREQUENCY, nyquist.max(MIN_FREQUENCY))
        } else {
            MIN_FREQUENCY
        };
        self.angular = TAU * frequency;
        let step = Step {
            w: self.angular,
            dt: self.sample_time,
            period: self.sample_rate / frequency,
            input,
        };
        self.state.advance(step)
    }
}
