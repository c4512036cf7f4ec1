//! Offline renderer — runs a preset over a mono buffer and encodes WAV.

use crate::error::Result;
use crate::preset::PhaserPreset;

use super::processor::PhaserProcessor;

/// Block size used for offline rendering, matching a WebAudio render quantum.
pub const RENDER_BLOCK_SIZE: usize = 128;

/// Process `input` through a fresh phaser configured by `preset`.
pub fn render_samples(input: &[f32], sample_rate: u32, preset: &PhaserPreset) -> Result<Vec<f32>> {
    let mut processor = PhaserProcessor::new(f64::from(sample_rate), RENDER_BLOCK_SIZE)?;
    processor.apply_preset(preset);
    processor.reset();

    let mut output = input.to_vec();
    for block in output.chunks_mut(RENDER_BLOCK_SIZE) {
        processor.process_mono(block);
    }
    Ok(output)
}

/// Render `input` through `preset` to a WAV file as bytes (16-bit mono PCM).
pub fn render_wav(input: &[f32], sample_rate: u32, preset: &PhaserPreset) -> Result<Vec<u8>> {
    let rendered = render_samples(input, sample_rate, preset)?;
    let pcm: Vec<i16> = rendered
        .iter()
        .map(|&s| (f64::from(s) * 32767.0).round().clamp(-32768.0, 32767.0) as i16)
        .collect();
    Ok(encode_wav(&pcm, sample_rate, 1))
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::OscillatorKind;
    use crate::error::PhaserError;

    fn tone(len: usize, sample_rate: u32) -> Vec<f32> {
        (0..len)
            .map(|n| (std::f64::consts::TAU * 440.0 * n as f64 / f64::from(sample_rate)).sin() as f32 * 0.5)
            .collect()
    }

    #[test]
    fn wav_header_valid() {
        let wav = render_wav(&tone(1000, 44100), 44100, &PhaserPreset::default()).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");

        let sr = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
        assert_eq!(sr, 44100);
        let ch = u16::from_le_bytes([wav[22], wav[23]]);
        assert_eq!(ch, 1);

        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size, 2000);
        assert_eq!(wav.len(), 44 + 2000);
    }

    #[test]
    fn dry_preset_passes_input() {
        let input = tone(1000, 48000);
        let out = render_samples(&input, 48000, &PhaserPreset::default()).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn wet_chaotic_preset_renders() {
        let mut preset = PhaserPreset::new("Chua");
        preset.oscillator = OscillatorKind::Chua;
        preset.controls.mix = 1.0;
        preset.controls.stages = 12;
        let input = tone(48000, 48000);
        let out = render_samples(&input, 48000, &preset).unwrap();
        assert_eq!(out.len(), input.len());
        assert!(out.iter().all(|s| s.is_finite()));
        assert_ne!(out, input);
    }

    #[test]
    fn zero_sample_rate_is_an_error() {
        let err = render_wav(&[0.0; 16], 0, &PhaserPreset::default()).unwrap_err();
        assert!(matches!(err, PhaserError::InvalidSampleRate(_)));
    }
}
