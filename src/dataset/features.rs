//! Batch feature extraction into a persisted matrix of pitch contours.

use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::Manifest;
use crate::features::FeatureExtractor;
use crate::types::{class_index, ToneLabel};

/// Feature matrix `(samples, feature_len)` with 1-based tone labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub features: Array2<f32>,
    pub labels: Vec<ToneLabel>,
}

impl FeatureSet {
    pub fn new(features: Array2<f32>, labels: Vec<ToneLabel>) -> Result<Self> {
        let set = Self { features, labels };
        set.validate()?;
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn feature_len(&self) -> usize {
        self.features.len_of(Axis(1))
    }

    pub fn row(&self, idx: usize) -> ArrayView1<'_, f32> {
        self.features.row(idx)
    }

    /// Labels shifted to the model's 0-based class indices.
    pub fn class_indices(&self) -> Result<Vec<usize>> {
        self.labels.iter().map(|&tone| class_index(tone)).collect()
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.features.len_of(Axis(0)) == self.labels.len(),
            "feature set has {} rows but {} labels",
            self.features.len_of(Axis(0)),
            self.labels.len()
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read feature set {}", path.display()))?;
        let set: FeatureSet = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse feature set {}", path.display()))?;
        set.validate()?;
        Ok(set)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self).context("Failed to serialize feature set")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write feature set {}", path.display()))
    }
}

/// Extract one feature row per manifest entry.
///
/// Clips that cannot be decoded contribute an all-zero row so the row count
/// always matches the manifest.
pub fn build_feature_set(manifest: &Manifest, extractor: &FeatureExtractor) -> Result<FeatureSet> {
    let feature_len = extractor.config().feature_len;
    let mut features = Array2::<f32>::zeros((manifest.len(), feature_len));
    let mut labels = Vec::with_capacity(manifest.len());
    let mut failures = 0usize;

    for (idx, entry) in manifest.entries.iter().enumerate() {
        let vector = extractor.extract_file(&entry.path).unwrap_or_else(|err| {
            warn!(
                path = %entry.path.display(),
                error = %err,
                "feature extraction failed; using zero vector"
            );
            failures += 1;
            extractor.zero_vector()
        });
        features.row_mut(idx).assign(&vector);
        labels.push(entry.tone);
        if (idx + 1) % 100 == 0 {
            info!(processed = idx + 1, total = manifest.len(), "extracting features");
        }
    }

    info!(
        samples = labels.len(),
        feature_len, failures, "feature extraction complete"
    );
    FeatureSet::new(features, labels)
}
