//! Dataset manifests: which clip carries which syllable and tone

pub mod augment;
pub mod features;
pub mod scan;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::ToneLabel;

pub use augment::{augment_manifest, AugmentSettings};
pub use features::{build_feature_set, FeatureSet};
pub use scan::scan_directory;

/// One labelled clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub path: PathBuf,
    pub pinyin: String,
    /// 1-based tone number
    pub tone: ToneLabel,
}

/// Ordered list of labelled clips persisted as JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub entries: Vec<DatasetEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<DatasetEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let manifest: Manifest = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse manifest {}", path.display()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize manifest")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write manifest {}", path.display()))
    }

    /// Concatenate manifests in order; duplicates are kept.
    pub fn merge<I>(manifests: I) -> Self
    where
        I: IntoIterator<Item = Manifest>,
    {
        Self {
            entries: manifests
                .into_iter()
                .flat_map(|manifest| manifest.entries)
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (idx, entry) in self.entries.iter().enumerate() {
            ensure!(
                entry.tone >= 1,
                "manifest entry {} ({}) has tone 0; tones are 1-based",
                idx,
                entry.path.display()
            );
        }
        Ok(())
    }
}
