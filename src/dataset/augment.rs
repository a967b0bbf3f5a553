//! Grow a manifest with noisy, stretched, and pitch-shifted copies of each clip.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::Rng;
use tracing::{info, warn};

use super::{DatasetEntry, Manifest};
use crate::audio::augment::{add_noise, pitch_shift, random_rate, time_stretch};
use crate::audio::{load_audio, write_wav};
use crate::types::{AudioData, TARGET_SAMPLE_RATE};

#[derive(Debug, Clone, PartialEq)]
pub struct AugmentSettings {
    pub noise_factor: f32,
    pub stretch_min: f32,
    pub stretch_max: f32,
    pub pitch_semitones: f32,
    pub sample_rate: u32,
}

impl Default for AugmentSettings {
    fn default() -> Self {
        Self {
            noise_factor: 0.001,
            stretch_min: 0.95,
            stretch_max: 1.05,
            pitch_semitones: 1.0,
            sample_rate: TARGET_SAMPLE_RATE,
        }
    }
}

/// Write augmented clips into `output_dir` and return the expanded manifest.
///
/// Originals are kept by path. Clips that fail to load or decode to nothing
/// keep only their original entry.
pub fn augment_manifest<R: Rng + ?Sized>(
    manifest: &Manifest,
    output_dir: &Path,
    settings: &AugmentSettings,
    rng: &mut R,
) -> Result<Manifest> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let mut entries = Vec::with_capacity(manifest.len() * 4);
    for (idx, entry) in manifest.entries.iter().enumerate() {
        entries.push(entry.clone());

        let audio = match load_audio(&entry.path, settings.sample_rate) {
            Ok(audio) => audio,
            Err(err) => {
                warn!(
                    path = %entry.path.display(),
                    error = %err,
                    "failed to load clip; skipping augmentations"
                );
                continue;
            }
        };
        if audio.is_empty() {
            warn!(path = %entry.path.display(), "empty clip; skipping augmentations");
            continue;
        }

        match augment_entry(entry, &audio, output_dir, settings, rng) {
            Ok(mut generated) => entries.append(&mut generated),
            Err(err) => warn!(
                path = %entry.path.display(),
                error = %err,
                "augmentation failed; keeping original only"
            ),
        }
        if (idx + 1) % 100 == 0 {
            info!(processed = idx + 1, total = manifest.len(), "augmenting dataset");
        }
    }

    info!(
        original = manifest.len(),
        augmented = entries.len(),
        "augmentation complete"
    );
    Ok(Manifest::new(entries))
}

fn augment_entry<R: Rng + ?Sized>(
    entry: &DatasetEntry,
    audio: &AudioData,
    output_dir: &Path,
    settings: &AugmentSettings,
    rng: &mut R,
) -> Result<Vec<DatasetEntry>> {
    let stem = entry
        .path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("clip path {} has no file name", entry.path.display()))?;

    let noisy = add_noise(audio, settings.noise_factor, rng);
    let rate = random_rate(rng, settings.stretch_min, settings.stretch_max);
    let stretched = time_stretch(audio, rate)?;
    let shifted = pitch_shift(audio, settings.pitch_semitones)?;

    [("noise", noisy), ("stretch", stretched), ("pitch", shifted)]
        .into_iter()
        .map(|(suffix, clip)| -> Result<DatasetEntry> {
            let path = output_dir.join(format!("{stem}_{suffix}.wav"));
            write_wav(&clip, &path)?;
            Ok(derived_entry(entry, path))
        })
        .collect()
}

fn derived_entry(source: &DatasetEntry, path: PathBuf) -> DatasetEntry {
    DatasetEntry {
        path,
        pinyin: source.pinyin.clone(),
        tone: source.tone,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn write_sine(path: &Path, frequency: f32) {
        let samples = (0..8_000)
            .map(|i| {
                let t = i as f32 / 16_000.0;
                (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.5
            })
            .collect();
        write_wav(&AudioData::new(samples, 16_000), path).unwrap();
    }

    #[test]
    fn writes_three_variants_per_clip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("ma3_FV1.wav");
        write_sine(&source, 180.0);
        let manifest = Manifest::new(vec![DatasetEntry {
            path: source.clone(),
            pinyin: "ma".into(),
            tone: 3,
        }]);

        let out = dir.path().join("augmented");
        let mut rng = StdRng::seed_from_u64(42);
        let expanded =
            augment_manifest(&manifest, &out, &AugmentSettings::default(), &mut rng).unwrap();

        assert_eq!(expanded.len(), 4);
        assert_eq!(expanded.entries[0].path, source);
        for suffix in ["noise", "stretch", "pitch"] {
            let path = out.join(format!("ma3_FV1_{suffix}.wav"));
            assert!(path.is_file(), "missing {}", path.display());
            assert!(expanded.entries.iter().any(|e| e.path == path && e.tone == 3));
        }
    }

    #[test]
    fn unreadable_clip_keeps_original_only() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::new(vec![DatasetEntry {
            path: dir.path().join("missing1.wav"),
            pinyin: "missing".into(),
            tone: 1,
        }]);
        let mut rng = StdRng::seed_from_u64(1);
        let expanded = augment_manifest(
            &manifest,
            &dir.path().join("out"),
            &AugmentSettings::default(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(expanded, manifest);
    }
}
