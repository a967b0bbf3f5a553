//! Pitch-contour features shared by training and inference
//!
//! A clip is tracked with pYIN, unvoiced frames are bridged by linear
//! interpolation, and the dense contour is resampled to a fixed length. Silent,
//! empty, or barely voiced clips degrade to an all-zero vector instead of failing,
//! so batch extraction and the bot never stop on noise-only input.

mod contour;

use std::path::Path;

use anyhow::{ensure, Context, Result};
use ndarray::Array1;
use tracing::debug;

use crate::audio::{load_audio, resample::linear_resample};
use crate::types::{AudioData, TARGET_SAMPLE_RATE};

pub use contour::{contour_from_track, resample_contour, PitchTrack};

/// Fixed-length pitch contour in Hz, the sole model input.
pub type FeatureVector = Array1<f32>;

pub const DEFAULT_FMIN: f64 = 80.0;
pub const DEFAULT_FMAX: f64 = 450.0;
pub const DEFAULT_FEATURE_LEN: usize = 100;
const WINDOW_MS: usize = 25;
/// Clips whose peak stays below this are treated as digital silence.
const SILENCE_FLOOR: f32 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct PitchConfig {
    pub fmin: f64,
    pub fmax: f64,
    pub feature_len: usize,
    /// Analysis frame length in samples at [`TARGET_SAMPLE_RATE`].
    pub frame_length: usize,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            fmin: DEFAULT_FMIN,
            fmax: DEFAULT_FMAX,
            feature_len: DEFAULT_FEATURE_LEN,
            frame_length: (TARGET_SAMPLE_RATE as usize * WINDOW_MS) / 1000,
        }
    }
}

impl PitchConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.fmin > 0.0 && self.fmax > self.fmin,
            "pitch bounds must satisfy 0 < fmin < fmax (got {}..{})",
            self.fmin,
            self.fmax
        );
        ensure!(self.feature_len > 0, "feature length must be positive");
        ensure!(self.frame_length > 1, "frame length must exceed one sample");
        Ok(())
    }
}

/// Turns audio clips into fixed-length pitch feature vectors.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: PitchConfig,
}

impl FeatureExtractor {
    pub fn new(config: PitchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PitchConfig {
        &self.config
    }

    pub fn zero_vector(&self) -> FeatureVector {
        Array1::zeros(self.config.feature_len)
    }

    /// Decode `path` at 16 kHz and extract its feature vector.
    pub fn extract_file(&self, path: &Path) -> Result<FeatureVector> {
        let audio = load_audio(path, TARGET_SAMPLE_RATE)
            .with_context(|| format!("failed to load audio from {}", path.display()))?;
        self.extract(&audio)
    }

    pub fn extract(&self, audio: &AudioData) -> Result<FeatureVector> {
        let samples = ensure_sample_rate(audio)?;
        if samples.is_empty() {
            debug!("empty clip; returning zero feature vector");
            return Ok(self.zero_vector());
        }
        if samples.iter().all(|s| s.abs() < SILENCE_FLOOR) {
            debug!(samples = samples.len(), "silent clip; returning zero feature vector");
            return Ok(self.zero_vector());
        }
        if samples.len() < self.config.frame_length {
            debug!(
                samples = samples.len(),
                frame_length = self.config.frame_length,
                "clip shorter than one analysis frame; returning zero feature vector"
            );
            return Ok(self.zero_vector());
        }

        let track = contour::track_pitch(&samples, TARGET_SAMPLE_RATE, &self.config);
        Ok(self.vector_from_track(&track))
    }

    /// Build the feature vector from an existing pitch track.
    pub fn vector_from_track(&self, track: &PitchTrack) -> FeatureVector {
        match contour_from_track(&track.pitches, &track.voiced) {
            Some(dense) => Array1::from(resample_contour(&dense, self.config.feature_len)),
            None => {
                debug!(
                    frames = track.frame_count(),
                    voiced = track.voiced_frame_count(),
                    "fewer than two voiced frames; returning zero feature vector"
                );
                self.zero_vector()
            }
        }
    }
}

fn ensure_sample_rate(audio: &AudioData) -> Result<Vec<f32>> {
    if audio.sample_rate == TARGET_SAMPLE_RATE {
        Ok(audio.samples.clone())
    } else {
        linear_resample(&audio.samples, audio.sample_rate, TARGET_SAMPLE_RATE).with_context(
            || {
                format!(
                    "failed to resample audio from {} Hz to {} Hz",
                    audio.sample_rate, TARGET_SAMPLE_RATE
                )
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_training_setup() {
        let config = PitchConfig::default();
        assert_eq!(config.fmin, 80.0);
        assert_eq!(config.fmax, 450.0);
        assert_eq!(config.feature_len, 100);
        assert_eq!(config.frame_length, 400);
    }

    #[test]
    fn rejects_inverted_bounds() {
        let config = PitchConfig {
            fmin: 450.0,
            fmax: 80.0,
            ..PitchConfig::default()
        };
        assert!(FeatureExtractor::new(config).is_err());
    }

    #[test]
    fn empty_clip_yields_zero_vector() {
        let extractor = FeatureExtractor::default();
        let features = extractor.extract(&AudioData::new(Vec::new(), 16_000)).unwrap();
        assert_eq!(features.len(), 100);
        assert!(features.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn zero_rate_is_an_error() {
        let extractor = FeatureExtractor::default();
        assert!(extractor.extract(&AudioData::new(vec![0.1; 10], 0)).is_err());
    }

    #[test]
    fn from_track_honours_configured_length() {
        let extractor = FeatureExtractor::new(PitchConfig {
            feature_len: 64,
            ..PitchConfig::default()
        })
        .unwrap();
        let track = PitchTrack {
            pitches: vec![120.0, f64::NAN, 180.0, 200.0],
            voiced: vec![true, false, true, true],
        };
        let features = extractor.vector_from_track(&track);
        assert_eq!(features.len(), 64);
        assert_eq!(features[0], 120.0);
        assert_eq!(features[63], 200.0);
    }

    #[test]
    fn from_track_with_one_voiced_frame_is_zero() {
        let extractor = FeatureExtractor::default();
        let track = PitchTrack {
            pitches: vec![f64::NAN, 150.0, f64::NAN],
            voiced: vec![false, true, false],
        };
        let features = extractor.vector_from_track(&track);
        assert_eq!(features.len(), 100);
        assert!(features.iter().all(|&v| v == 0.0));
    }
}
