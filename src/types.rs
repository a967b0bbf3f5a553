//! Core types shared by the tone classification pipeline

use anyhow::{ensure, Result};

/// Sample rate every clip is brought to before pitch tracking.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Raw audio data representation (mono, f32 samples)
#[derive(Debug, Clone, Default)]
pub struct AudioData {
    /// Audio samples, normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g., 16000)
    pub sample_rate: u32,
}

impl AudioData {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value, 0.0 for an empty clip.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0, |peak, s| peak.max(s.abs()))
    }
}

/// Tone label as stored in manifests and feature sets (1-based).
pub type ToneLabel = u8;

/// Convert a stored 1-based tone into the model's 0-based class index.
pub fn class_index(tone: ToneLabel) -> Result<usize> {
    ensure!(tone >= 1, "tone labels are 1-based, got {}", tone);
    Ok(tone as usize - 1)
}
