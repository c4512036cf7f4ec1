//! Click-free power switching.
//!
//! Every block that leaves the processor is remembered. When the power
//! state flips, the next block is blended sample by sample with the
//! remembered one: the old output fades 1→0 while the new output fades 0→1,
//! reaching the new signal exactly on the block's last sample. When the
//! remembered block is shorter than the new one, its last sample is held
//! for the rest of the fade.

/// Channels the crossfade buffer holds.
pub const CROSSFADE_CHANNELS: usize = 2;

#[derive(Debug, Clone)]
pub struct BypassCrossfader {
    previous: [Vec<f32>; CROSSFADE_CHANNELS],
    /// Valid samples in `previous` (the last block's length).
    previous_len: usize,
}

impl BypassCrossfader {
    /// Pre-size the history for blocks of up to `max_block_size` samples.
    pub fn new(max_block_size: usize) -> Self {
        BypassCrossfader {
            previous: [vec![0.0; max_block_size], vec![0.0; max_block_size]],
            previous_len: 0,
        }
    }

    /// Re-size the history. Only call this outside the audio callback.
    pub fn resize(&mut self, max_block_size: usize) {
        for ch in &mut self.previous {
            ch.clear();
            ch.resize(max_block_size, 0.0);
        }
        self.previous_len = 0;
    }

    pub fn capacity(&self) -> usize {
        self.previous[0].len()
    }

    /// Forget the previous block.
    pub fn clear(&mut self) {
        for ch in &mut self.previous {
            ch.fill(0.0);
        }
        self.previous_len = 0;
    }

    /// Finish a processed block: blend it with the previous one when
    /// `toggled`, then remember it. Blocks longer than the capacity must be
    /// split by the caller.
    pub fn process(&mut self, left: &mut [f32], right: Option<&mut [f32]>, toggled: bool) {
        let len = left.len().min(self.capacity());
        let [prev_l, prev_r] = &mut self.previous;

        if toggled {
            crossfade(&mut left[..len], &prev_l[..self.previous_len.min(len)]);
        }
        prev_l[..len].copy_from_slice(&left[..len]);

        if let Some(right) = right {
            let len = len.min(right.len());
            if toggled {
                crossfade(&mut right[..len], &prev_r[..self.previous_len.min(len)]);
            }
            prev_r[..len].copy_from_slice(&right[..len]);
        }
        self.previous_len = len;
    }
}

/// Blend `old` into `new` in place with a linear ramp over the whole of
/// `new`. Past the end of `old` its last sample stands in for it.
fn crossfade(new: &mut [f32], old: &[f32]) {
    let Some(&held) = old.last() else {
        return;
    };
    let n = new.len();
    let span = n.saturating_sub(1).max(1) as f32;
    for (i, out) in new.iter_mut().enumerate() {
        let prev = old.get(i).copied().unwrap_or(held);
        let w = if n > 1 { i as f32 / span } else { 1.0 };
        *out = *out * w + prev * (1.0 - w);
    }
}
