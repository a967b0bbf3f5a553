use std::path::PathBuf;

use anyhow::{ensure, Result};
use clap::{Args, Parser, Subcommand};

use crate::dataset::AugmentSettings;
use crate::features::{PitchConfig, DEFAULT_FEATURE_LEN, DEFAULT_FMAX, DEFAULT_FMIN};
use crate::types::TARGET_SAMPLE_RATE;

#[derive(Parser, Debug)]
#[command(
    name = "tonalyzer",
    version,
    about = "Dataset, feature, and evaluation tooling for lexical tone classification"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Map a directory of tone-labelled recordings into a manifest.
    Scan(ScanArgs),
    /// Concatenate several manifests into one.
    Merge(MergeArgs),
    /// Write noisy, stretched, and pitch-shifted copies of every clip.
    Augment(AugmentArgs),
    /// Print the pitch feature vector of a single clip as JSON.
    Extract(ExtractArgs),
    /// Extract features for every clip in a manifest.
    Features(FeaturesArgs),
    /// Classify a single clip with an ONNX model.
    Classify(ClassifyArgs),
    /// Confusion matrix and classification report over a feature set.
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PitchArgs {
    /// Lowest pitch considered voiced, in Hz.
    #[arg(long, default_value_t = DEFAULT_FMIN)]
    pub fmin: f64,
    /// Highest pitch considered voiced, in Hz.
    #[arg(long, default_value_t = DEFAULT_FMAX)]
    pub fmax: f64,
    /// Length of the resampled feature vector.
    #[arg(long = "feature-len", default_value_t = DEFAULT_FEATURE_LEN)]
    pub feature_len: usize,
}

impl PitchArgs {
    pub fn pitch_config(&self) -> Result<PitchConfig> {
        let config = PitchConfig {
            fmin: self.fmin,
            fmax: self.fmax,
            feature_len: self.feature_len,
            ..PitchConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Directory holding the recordings.
    pub dataset_dir: PathBuf,
    /// Manifest to write.
    #[arg(long, short, default_value = "dataset_map.json")]
    pub output: PathBuf,
    /// File extension to pick up.
    #[arg(long, default_value = "mp3")]
    pub extension: String,
}

#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    /// Manifests to concatenate, in order.
    #[arg(required = true, num_args = 2..)]
    pub inputs: Vec<PathBuf>,
    #[arg(long, short, default_value = "dataset_map_combined.json")]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct AugmentArgs {
    pub manifest: PathBuf,
    /// Directory for generated WAV files.
    #[arg(long = "audio-dir", default_value = "dataset_augmented")]
    pub audio_dir: PathBuf,
    #[arg(long, short, default_value = "dataset_map_augmented.json")]
    pub output: PathBuf,
    /// Scale of the added gaussian noise.
    #[arg(long = "noise-factor", default_value_t = 0.001)]
    pub noise_factor: f32,
    #[arg(long = "stretch-min", default_value_t = 0.95)]
    pub stretch_min: f32,
    #[arg(long = "stretch-max", default_value_t = 1.05)]
    pub stretch_max: f32,
    /// Pitch shift applied to the third copy, in semitones.
    #[arg(long = "pitch-steps", default_value_t = 1.0)]
    pub pitch_steps: f32,
    /// Seed for reproducible runs.
    #[arg(long)]
    pub seed: Option<u64>,
}

impl AugmentArgs {
    pub fn settings(&self) -> Result<AugmentSettings> {
        ensure!(self.noise_factor >= 0.0, "noise factor must be non-negative");
        ensure!(
            self.stretch_min > 0.0 && self.stretch_max >= self.stretch_min,
            "stretch range must satisfy 0 < min <= max"
        );
        Ok(AugmentSettings {
            noise_factor: self.noise_factor,
            stretch_min: self.stretch_min,
            stretch_max: self.stretch_max,
            pitch_semitones: self.pitch_steps,
            sample_rate: TARGET_SAMPLE_RATE,
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    pub audio: PathBuf,
    #[command(flatten)]
    pub pitch: PitchArgs,
}

#[derive(Args, Debug, Clone)]
pub struct FeaturesArgs {
    pub manifest: PathBuf,
    #[arg(long, short, default_value = "features.json")]
    pub output: PathBuf,
    #[command(flatten)]
    pub pitch: PitchArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// ONNX model exported from training.
    #[arg(long)]
    pub model: PathBuf,
    /// Class names in model output order.
    #[arg(
        long = "class-names",
        value_delimiter = ',',
        default_value = "Tone 1,Tone 2,Tone 3,Tone 4"
    )]
    pub class_names: Vec<String>,
}

impl ModelArgs {
    pub fn class_names(&self) -> Vec<String> {
        self.class_names
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect()
    }
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    pub audio: PathBuf,
    #[command(flatten)]
    pub model: ModelArgs,
    #[command(flatten)]
    pub pitch: PitchArgs,
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// Feature set written by `features`.
    pub features: PathBuf,
    #[command(flatten)]
    pub model: ModelArgs,
    /// Also write the report as JSON.
    #[arg(long = "report-json")]
    pub report_json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn extract_defaults_match_training_setup() {
        let cli = Cli::try_parse_from(["tonalyzer", "extract", "clip.wav"]).unwrap();
        let Command::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        let config = args.pitch.pitch_config().unwrap();
        assert_eq!((config.fmin, config.fmax, config.feature_len), (80.0, 450.0, 100));
    }

    #[test]
    fn rejects_inverted_pitch_bounds() {
        let cli = Cli::try_parse_from([
            "tonalyzer", "extract", "clip.wav", "--fmin", "500", "--fmax", "100",
        ])
        .unwrap();
        let Command::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        assert!(args.pitch.pitch_config().is_err());
    }

    #[test]
    fn class_names_split_on_commas() {
        let cli = Cli::try_parse_from([
            "tonalyzer",
            "classify",
            "clip.wav",
            "--model",
            "tones.onnx",
            "--class-names",
            "T1, T2,T3",
        ])
        .unwrap();
        let Command::Classify(args) = cli.command else {
            panic!("expected classify");
        };
        assert_eq!(args.model.class_names(), vec!["T1", "T2", "T3"]);
    }

    #[test]
    fn merge_needs_two_inputs() {
        assert!(Cli::try_parse_from(["tonalyzer", "merge", "a.json"]).is_err());
        assert!(Cli::try_parse_from(["tonalyzer", "merge", "a.json", "b.json"]).is_ok());
    }

    #[test]
    fn augment_settings_follow_flags() {
        let cli = Cli::try_parse_from([
            "tonalyzer",
            "augment",
            "map.json",
            "--stretch-min",
            "0.9",
            "--pitch-steps",
            "0.5",
        ])
        .unwrap();
        let Command::Augment(args) = cli.command else {
            panic!("expected augment");
        };
        let settings = args.settings().unwrap();
        assert_eq!(settings.stretch_min, 0.9);
        assert_eq!(settings.stretch_max, 1.05);
        assert_eq!(settings.pitch_semitones, 0.5);
    }
}
