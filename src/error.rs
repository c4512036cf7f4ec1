use thiserror::Error;

/// Errors reported by the phaser core to its host.
///
/// Nothing on the per-sample path can fail; these only come out of
/// configuration calls (prepare, type selection, preset loading).
#[derive(Debug, Error)]
pub enum PhaserError {
    #[error("sample rate must be finite and positive, got {0}")]
    InvalidSampleRate(f64),

    #[error("block size must be at least one sample, got {0}")]
    InvalidBlockSize(usize),

    #[error("unknown oscillator type id {0} (expected 1..=10)")]
    UnknownOscillator(i32),

    #[error("preset error: {0}")]
    Preset(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PhaserError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e = PhaserError::InvalidSampleRate(0.0);
        assert_eq!(e.to_string(), "sample rate must be finite and positive, got 0");

        let e = PhaserError::UnknownOscillator(11);
        assert!(e.to_string().contains("11"), "got {e}");
    }

    #[test]
    fn json_errors_convert() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: PhaserError = err.into();
        assert!(matches!(e, PhaserError::Preset(_)));
    }
}
