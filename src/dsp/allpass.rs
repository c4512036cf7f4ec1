//! Second-order all-pass sections for the phaser.
//!
//! A section with pole radius `r` and `Re = −2·r·cos(θ)` has the transfer
//! function
//!
//! ```text
//!         r² + Re·z⁻¹ + z⁻²
//! H(z) = -------------------
//!         1 + Re·z⁻¹ + r²·z⁻²
//! ```
//!
//! whose numerator is the mirror of its denominator, so |H| = 1 everywhere
//! and only the phase moves. Sweeping θ sweeps the phase-shift centre.

/// Number of second-order sections run per user-facing "stage".
pub const SECTIONS_PER_STAGE: usize = 4;

/// Coefficients of one biquad section, in `(a0, a1, a2, b0, b1, b2)` form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllpassCoefficients {
    pub a0: f64,
    pub a1: f64,
    pub a2: f64,
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
}

impl AllpassCoefficients {
    /// All-pass with pole radius `depth` and linear term `re`.
    #[inline]
    pub fn new(depth: f64, re: f64) -> Self {
        let z2 = depth * depth;
        AllpassCoefficients {
            a0: 1.0,
            a1: re,
            a2: z2,
            b0: z2,
            b1: re,
            b2: 1.0,
        }
    }

    /// The same filter with every coefficient divided by `a0`.
    #[inline]
    pub fn normalized(&self) -> Self {
        let inv_a0 = 1.0 / self.a0;
        AllpassCoefficients {
            a0: 1.0,
            a1: self.a1 * inv_a0,
            a2: self.a2 * inv_a0,
            b0: self.b0 * inv_a0,
            b1: self.b1 * inv_a0,
            b2: self.b2 * inv_a0,
        }
    }

    /// All-pass centred on `frequency` Hz: `Re = −2·depth·cos(2π·f/fs)`.
    pub fn centred(depth: f64, frequency: f64, sample_rate: f64) -> Self {
        let omega = std::f64::consts::TAU / sample_rate;
        Self::new(depth, -2.0 * depth * (omega * frequency).cos())
    }
}

impl Default for AllpassCoefficients {
    /// Identity: passes the input straight through.
    fn default() -> Self {
        AllpassCoefficients {
            a0: 1.0,
            a1: 0.0,
            a2: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
        }
    }
}

/// Two-sample history of a biquad (Direct Form II Transposed).
#[derive(Debug, Clone, Default)]
pub struct AllpassSection {
    z1: f64,
    z2: f64,
}

impl AllpassSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter one sample through coefficients `c`, which must already be
    /// normalised (`a0 == 1`).
    #[inline]
    pub fn apply_stage(&mut self, c: &AllpassCoefficients, input: f64) -> f64 {
        let output = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * output + self.z2;
        self.z2 = c.b2 * input - c.a2 * output;
        output
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    pub fn is_finite(&self) -> bool {
        self.z1.is_finite() && self.z2.is_finite()
    }
}

/// One channel's all-pass chain.
///
/// The chain is a single section applied `4 × stages` times per sample with
/// one shared history, which carries over from sample to sample. Every pass
/// within a sample uses the same coefficients.
#[derive(Debug, Clone, Default)]
pub struct AllpassCascade {
    section: AllpassSection,
}

impl AllpassCascade {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `stages` stages (`4 × stages` section passes) over one sample.
    #[inline]
    pub fn process(&mut self, c: &AllpassCoefficients, input: f64, stages: usize) -> f64 {
        let c = c.normalized();
        let mut out = input;
        for _ in 0..stages * SECTIONS_PER_STAGE {
            out = self.section.apply_stage(&c, out);
        }
        if !self.section.is_finite() {
            self.section.reset();
        }
        out
    }

    pub fn reset(&mut self) {
        self.section.reset();
    }
}
