//! Linear parameter smoothing.
//!
//! A step change in a control value becomes a straight ramp over a fixed
//! number of samples, so sweeping a knob never produces a click.

/// Ramp length used for the continuous phaser controls, in seconds.
pub const DEFAULT_RAMP_SECONDS: f64 = 0.1;

/// A value that glides linearly toward its target, one step per sample.
///
/// The ramp lands exactly on the target, so the value never overshoots and
/// moves monotonically between retargets.
#[derive(Debug, Clone)]
pub struct SmoothedValue {
    current: f64,
    target: f64,
    step: f64,
    ramp_samples: usize,
    remaining: usize,
}

impl SmoothedValue {
    /// A smoother resting at `initial`, with a ramp of `ramp_seconds`.
    pub fn new(initial: f64, sample_rate: f64, ramp_seconds: f64) -> Self {
        SmoothedValue {
            current: initial,
            target: initial,
            step: 0.0,
            ramp_samples: ramp_length(sample_rate, ramp_seconds),
            remaining: 0,
        }
    }

    /// A smoother that jumps straight to every new target.
    pub fn immediate(initial: f64) -> Self {
        Self::new(initial, 1.0, 0.0)
    }

    /// Change the ramp length. Any ramp in flight snaps to its target.
    pub fn reset(&mut self, sample_rate: f64, ramp_seconds: f64) {
        self.ramp_samples = ramp_length(sample_rate, ramp_seconds);
        self.set_current_and_target(self.target);
    }

    /// Start a ramp from the current value to `target`. Re-sending the
    /// same target leaves a ramp in flight untouched.
    pub fn set_target(&mut self, target: f64) {
        if target == self.target {
            return;
        }
        self.target = target;
        if self.ramp_samples == 0 {
            self.current = target;
            self.remaining = 0;
            return;
        }
        self.remaining = self.ramp_samples;
        self.step = (target - self.current) / self.ramp_samples as f64;
    }

    /// Jump to `value` with no ramp.
    pub fn set_current_and_target(&mut self, value: f64) {
        self.current = value;
        self.target = value;
        self.remaining = 0;
    }

    /// Advance one sample and return the new value.
    #[inline]
    pub fn next_value(&mut self) -> f64 {
        if self.remaining == 0 {
            return self.target;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            self.current = self.target;
        } else {
            self.current += self.step;
        }
        self.current
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn is_smoothing(&self) -> bool {
        self.remaining > 0
    }
}

fn ramp_length(sample_rate: f64, ramp_seconds: f64) -> usize {
    let samples = (sample_rate * ramp_seconds).floor();
    if samples.is_finite() && samples > 0.0 {
        samples as usize
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramps_linearly_to_target() {
        let mut s = SmoothedValue::new(0.0, 1000.0, 0.01);
        s.set_target(1.0);
        let ramp: Vec<f64> = (0..10).map(|_| s.next_value()).collect();
        assert!((ramp[0] - 0.1).abs() < 1e-12, "first step {}", ramp[0]);
        assert!((ramp[4] - 0.5).abs() < 1e-12, "midpoint {}", ramp[4]);
        assert_eq!(ramp[9], 1.0);
        assert!(!s.is_smoothing());
        assert_eq!(s.next_value(), 1.0);
    }

    #[test]
    fn never_overshoots() {
        let mut s = SmoothedValue::new(0.3, 44100.0, DEFAULT_RAMP_SECONDS);
        s.set_target(0.99);
        let mut prev = s.current();
        for _ in 0..10_000 {
            let v = s.next_value();
            assert!(v >= prev, "ramp went backwards: {prev} -> {v}");
            assert!(v <= 0.99, "ramp overshot: {v}");
            prev = v;
        }
        assert_eq!(prev, 0.99);

        s.set_target(0.3);
        for _ in 0..10_000 {
            let v = s.next_value();
            assert!(v <= prev && v >= 0.3, "downward ramp misbehaved: {v}");
            prev = v;
        }
        assert_eq!(prev, 0.3);
    }

    #[test]
    fn retarget_mid_ramp_starts_from_current() {
        let mut s = SmoothedValue::new(0.0, 100.0, 0.1);
        s.set_target(10.0);
        for _ in 0..5 {
            s.next_value();
        }
        let mid = s.current();
        assert!((mid - 5.0).abs() < 1e-9, "got {mid}");
        s.set_target(0.0);
        let next = s.next_value();
        assert!((next - 4.5).abs() < 1e-9, "got {next}");
    }

    #[test]
    fn same_target_keeps_ramp() {
        let mut s = SmoothedValue::new(0.0, 100.0, 0.1);
        s.set_target(1.0);
        s.next_value();
        s.set_target(1.0);
        assert!(s.is_smoothing());
        assert!((s.next_value() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn immediate_jumps() {
        let mut s = SmoothedValue::immediate(4.0);
        s.set_target(16.0);
        assert_eq!(s.next_value(), 16.0);
        assert!(!s.is_smoothing());
    }
}
