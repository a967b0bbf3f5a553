use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tonalyzer::cli::{
    AugmentArgs, ClassifyArgs, Cli, Command, EvaluateArgs, ExtractArgs, FeaturesArgs, MergeArgs,
    ModelArgs, ScanArgs,
};
use tonalyzer::dataset::{augment_manifest, build_feature_set, scan_directory, FeatureSet, Manifest};
use tonalyzer::evaluation::{ClassificationReport, ConfusionMatrix};
use tonalyzer::features::FeatureExtractor;
use tonalyzer::model::{predict, OnnxToneModel};

fn main() -> Result<()> {
    // Logs go to stderr so `extract` output stays machine-readable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tonalyzer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Scan(args) => run_scan(&args),
        Command::Merge(args) => run_merge(&args),
        Command::Augment(args) => run_augment(&args),
        Command::Extract(args) => run_extract(&args),
        Command::Features(args) => run_features(&args),
        Command::Classify(args) => run_classify(&args),
        Command::Evaluate(args) => run_evaluate(&args),
    }
}

fn run_scan(args: &ScanArgs) -> Result<()> {
    ensure!(
        args.dataset_dir.is_dir(),
        "Dataset directory does not exist: {}",
        args.dataset_dir.display()
    );
    let manifest = scan_directory(&args.dataset_dir, &args.extension)
        .with_context(|| format!("Failed to scan {}", args.dataset_dir.display()))?;
    manifest.save(&args.output)?;
    println!(
        "Mapped {} files to {}",
        manifest.len(),
        args.output.display()
    );
    Ok(())
}

fn run_merge(args: &MergeArgs) -> Result<()> {
    let manifests = args
        .inputs
        .iter()
        .map(|path| Manifest::load(path))
        .collect::<Result<Vec<_>>>()?;
    let merged = Manifest::merge(manifests);
    merged.save(&args.output)?;
    println!(
        "Combined {} manifests ({} entries) into {}",
        args.inputs.len(),
        merged.len(),
        args.output.display()
    );
    Ok(())
}

fn run_augment(args: &AugmentArgs) -> Result<()> {
    let settings = args.settings()?;
    let manifest = Manifest::load(&args.manifest)?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let augmented = augment_manifest(&manifest, &args.audio_dir, &settings, &mut rng)
        .context("Failed to augment dataset")?;
    augmented.save(&args.output)?;
    println!(
        "Augmented {} clips into {} entries; manifest at {}",
        manifest.len(),
        augmented.len(),
        args.output.display()
    );
    Ok(())
}

fn run_extract(args: &ExtractArgs) -> Result<()> {
    let extractor = FeatureExtractor::new(args.pitch.pitch_config()?)?;
    let vector = extractor
        .extract_file(&args.audio)
        .with_context(|| format!("Failed to extract features from {}", args.audio.display()))?;
    println!("{}", serde_json::to_string(&vector.to_vec())?);
    Ok(())
}

fn run_features(args: &FeaturesArgs) -> Result<()> {
    let extractor = FeatureExtractor::new(args.pitch.pitch_config()?)?;
    let manifest = Manifest::load(&args.manifest)?;
    let feature_set = build_feature_set(&manifest, &extractor)?;
    feature_set.save(&args.output)?;
    println!(
        "Wrote {} feature vectors of length {} to {}",
        feature_set.len(),
        feature_set.feature_len(),
        args.output.display()
    );
    Ok(())
}

fn run_classify(args: &ClassifyArgs) -> Result<()> {
    let (model, class_names) = load_model(&args.model)?;
    let extractor = FeatureExtractor::new(args.pitch.pitch_config()?)?;
    let features = extractor
        .extract_file(&args.audio)
        .with_context(|| format!("Failed to extract features from {}", args.audio.display()))?;
    let prediction = predict(&model, &features.to_vec(), &class_names)?;
    println!(
        "{}: {} ({:.2}% confidence)",
        args.audio.display(),
        prediction.label,
        prediction.confidence
    );
    Ok(())
}

fn run_evaluate(args: &EvaluateArgs) -> Result<()> {
    let (model, class_names) = load_model(&args.model)?;
    let feature_set = FeatureSet::load(&args.features)?;
    ensure!(!feature_set.is_empty(), "Feature set is empty");

    let truth = feature_set.class_indices()?;
    let predicted = (0..feature_set.len())
        .map(|idx| {
            let row = feature_set.row(idx).to_vec();
            predict(&model, &row, &class_names)
                .map(|prediction| prediction.class_index)
                .with_context(|| format!("Inference failed on sample {idx}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let matrix = ConfusionMatrix::from_labels(&truth, &predicted, class_names.len())?;
    let report = ClassificationReport::from_matrix(&matrix, &class_names);
    info!(samples = matrix.total(), accuracy = report.accuracy, "evaluation complete");

    println!("Confusion matrix (rows = actual, columns = predicted)\n");
    println!("{}", matrix.render(&class_names));
    println!("{}", report.render());

    if let Some(path) = &args.report_json {
        write_json(path, &report)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn load_model(args: &ModelArgs) -> Result<(OnnxToneModel, Vec<String>)> {
    let class_names = args.class_names();
    ensure!(!class_names.is_empty(), "At least one class name is required");
    let model = OnnxToneModel::load(&args.model)
        .with_context(|| format!("Failed to load model {}", args.model.display()))?;
    Ok((model, class_names))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
