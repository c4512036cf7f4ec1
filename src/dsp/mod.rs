//! Phaser DSP: modulation sources, all-pass chain and block processing.
//!
//! Everything here runs on f64 internally and exchanges f32 audio with the
//! host. The same code serves the AudioWorklet (via WASM) and the offline
//! WAV renderer.

pub mod allpass;
pub mod bypass;
pub mod oscillator;
pub mod phaser;
pub mod processor;
pub mod renderer;
pub mod smoother;
