//! ONNX Runtime backed classifier.

use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array3, ArrayD, Ix2};
use ort::session::Session;
use ort::{inputs, value::Tensor};
use tracing::info;

use super::{ModelError, Result, ToneClassifier};

/// Classifier exported from the training run as an ONNX graph taking
/// `(batch, feature_len, 1)` and returning `(batch, classes)` probabilities.
pub struct OnnxToneModel {
    session: Mutex<Session>,
}

impl OnnxToneModel {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ModelError::NotFound(path.display().to_string()));
        }
        let session = Session::builder()?.commit_from_file(path)?;
        info!(model = %path.display(), "loaded tone classifier");
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl ToneClassifier for OnnxToneModel {
    fn probabilities(&self, features: &[f32]) -> Result<Vec<f32>> {
        let input = Tensor::from_array(input_tensor(features)?)?;

        let mut session = self.session.lock().map_err(|_| ModelError::Poisoned)?;
        let outputs = session.run(inputs![input])?;
        let (_, output) = outputs.iter().next().ok_or(ModelError::MissingOutput)?;
        let scores = output.try_extract_array::<f32>()?.to_owned();
        first_row(scores)
    }
}

/// One feature vector as a `(batch = 1, steps, channels = 1)` array.
fn input_tensor(features: &[f32]) -> Result<Array3<f32>> {
    Ok(Array3::from_shape_vec((1, features.len(), 1), features.to_vec())?)
}

/// Class scores of the single batch row in a `(1, classes)` output.
fn first_row(scores: ArrayD<f32>) -> Result<Vec<f32>> {
    let scores = scores.into_dimensionality::<Ix2>()?;
    if scores.nrows() == 0 {
        return Err(ModelError::MissingOutput);
    }
    Ok(scores.row(0).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, IxDyn};

    #[test]
    fn missing_model_file_is_not_found() {
        let result = OnnxToneModel::load(Path::new("/no/such/model.onnx"));
        assert!(matches!(result, Err(ModelError::NotFound(_))));
    }

    #[test]
    fn input_has_single_batch_and_channel() {
        let features: Vec<f32> = (0..100).map(|i| 100.0 + i as f32).collect();
        let input = input_tensor(&features).unwrap();
        assert_eq!(input.shape(), &[1, 100, 1]);
        assert_eq!(input[[0, 0, 0]], 100.0);
        assert_eq!(input[[0, 99, 0]], 199.0);
    }

    #[test]
    fn scores_come_from_first_batch_row() {
        let output = array![[0.1f32, 0.2, 0.3, 0.4]].into_dyn();
        assert_eq!(first_row(output).unwrap(), vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn non_matrix_output_is_a_shape_error() {
        let output = ArrayD::<f32>::zeros(IxDyn(&[1, 4, 1]));
        assert!(matches!(first_row(output), Err(ModelError::Shape(_))));
    }

    #[test]
    fn empty_batch_is_missing_output() {
        let output = ArrayD::<f32>::zeros(IxDyn(&[0, 4]));
        assert!(matches!(first_row(output), Err(ModelError::MissingOutput)));
    }
}
