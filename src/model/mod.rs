//! Tone classifiers and the single-vector inference path

mod onnx;

use thiserror::Error;

pub use onnx::OnnxToneModel;

/// Result alias for the model boundary.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Failures raised while loading or running a classifier.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Model file missing on disk
    #[error("model file not found: {0}")]
    NotFound(String),

    /// ONNX Runtime failure during load or forward pass
    #[error(transparent)]
    Runtime(#[from] ort::Error),

    /// Tensor shape mismatch
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    /// Model produced no output tensor
    #[error("model produced no output")]
    MissingOutput,

    /// Model returned more classes than there are configured names
    #[error("model returned {got} class scores but only {expected} class names are configured")]
    ClassCountMismatch { expected: usize, got: usize },

    /// Scores contained NaN or were empty
    #[error("model returned invalid class scores")]
    InvalidScores,

    /// A previous inference panicked while holding the session
    #[error("model session is poisoned")]
    Poisoned,
}

/// Anything that maps a pitch feature vector to per-class probabilities.
pub trait ToneClassifier: Send + Sync {
    fn probabilities(&self, features: &[f32]) -> Result<Vec<f32>>;
}

/// Outcome of classifying one feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// 0-based index of the winning class
    pub class_index: usize,
    pub label: String,
    /// Winning probability as a percentage in [0, 100]
    pub confidence: f32,
}

/// Run `classifier` on `features` and pick the arg-max class.
pub fn predict(
    classifier: &dyn ToneClassifier,
    features: &[f32],
    class_names: &[String],
) -> Result<Prediction> {
    let scores = classifier.probabilities(features)?;
    // Extra names are allowed; fewer would leave the arg-max without a label.
    if scores.len() > class_names.len() {
        return Err(ModelError::ClassCountMismatch {
            expected: class_names.len(),
            got: scores.len(),
        });
    }
    let (class_index, best) = argmax(&scores).ok_or(ModelError::InvalidScores)?;
    Ok(Prediction {
        class_index,
        label: class_names[class_index].clone(),
        confidence: (best * 100.0).clamp(0.0, 100.0),
    })
}

/// Index and value of the largest score; the first wins on ties.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    if scores.iter().any(|s| s.is_nan()) {
        return None;
    }
    scores
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (idx, score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((idx, score)),
        })
}
