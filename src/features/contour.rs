use aus::analysis;

use super::PitchConfig;

/// Raw per-frame output of the pitch tracker.
#[derive(Debug, Clone, Default)]
pub struct PitchTrack {
    pub pitches: Vec<f64>,
    pub voiced: Vec<bool>,
}

impl PitchTrack {
    pub fn frame_count(&self) -> usize {
        self.pitches.len()
    }

    pub fn voiced_frame_count(&self) -> usize {
        self.pitches
            .iter()
            .zip(self.voiced.iter())
            .filter(|(pitch, flag)| is_defined(**pitch, **flag))
            .count()
    }
}

pub(super) fn track_pitch(samples: &[f32], sample_rate: u32, config: &PitchConfig) -> PitchTrack {
    let audio: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
    let (_timestamps, pitches, voiced, _confidence) = analysis::pyin_pitch_estimator(
        &audio,
        sample_rate,
        config.fmin,
        config.fmax,
        config.frame_length,
    );
    PitchTrack { pitches, voiced }
}

fn is_defined(pitch: f64, voiced: bool) -> bool {
    voiced && pitch.is_finite() && pitch > 0.0
}

/// Fill unvoiced frames by linear interpolation between voiced neighbours.
///
/// Frames before the first voiced frame take its value, frames after the last
/// voiced frame take the last value. Returns `None` when fewer than two frames
/// are voiced.
pub fn contour_from_track(pitches: &[f64], voiced: &[bool]) -> Option<Vec<f32>> {
    let anchors: Vec<(usize, f64)> = pitches
        .iter()
        .zip(voiced.iter())
        .enumerate()
        .filter_map(|(idx, (&pitch, &flag))| is_defined(pitch, flag).then_some((idx, pitch)))
        .collect();
    if anchors.len() < 2 {
        return None;
    }

    let (first_idx, first_pitch) = anchors[0];
    let (last_idx, last_pitch) = anchors[anchors.len() - 1];
    let mut contour = Vec::with_capacity(pitches.len());
    let mut segment = 0;
    for idx in 0..pitches.len() {
        let value = if idx <= first_idx {
            first_pitch
        } else if idx >= last_idx {
            last_pitch
        } else {
            while anchors[segment + 1].0 < idx {
                segment += 1;
            }
            let (left_idx, left) = anchors[segment];
            let (right_idx, right) = anchors[segment + 1];
            let weight = (idx - left_idx) as f64 / (right_idx - left_idx) as f64;
            left + (right - left) * weight
        };
        contour.push(value as f32);
    }
    Some(contour)
}

/// Resample a contour onto `target_len` evenly spaced points of a [0, 1] axis.
pub fn resample_contour(series: &[f32], target_len: usize) -> Vec<f32> {
    match (target_len, series.len()) {
        (0, _) => Vec::new(),
        (_, 0) => vec![0.0; target_len],
        (_, 1) => vec![series[0]; target_len],
        (count, len) if count == len => series.to_vec(),
        (count, len) => interpolate(series, count, len),
    }
}

fn interpolate(series: &[f32], target_len: usize, len: usize) -> Vec<f32> {
    let denom = (target_len - 1).max(1) as f64;
    (0..target_len)
        .map(|frame| {
            let position = frame as f64 * (len - 1) as f64 / denom;
            let lower = (position.floor() as usize).min(len - 1);
            let upper = (lower + 1).min(len - 1);
            let weight = (position - lower as f64) as f32;
            if lower == upper || weight == 0.0 {
                series[lower]
            } else {
                series[lower] * (1.0 - weight) + series[upper] * weight
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn fills_interior_gaps_linearly() {
        let pitches = [f64::NAN, 100.0, f64::NAN, f64::NAN, 160.0, f64::NAN];
        let voiced = [false, true, false, false, true, false];
        let contour = contour_from_track(&pitches, &voiced).unwrap();
        assert_eq!(contour, vec![100.0, 100.0, 120.0, 140.0, 160.0, 160.0]);
    }

    #[test]
    fn unvoiced_flag_overrides_pitch_value() {
        let pitches = [100.0, 500.0, 200.0];
        let voiced = [true, false, true];
        let contour = contour_from_track(&pitches, &voiced).unwrap();
        assert_eq!(contour, vec![100.0, 150.0, 200.0]);
    }

    #[test]
    fn single_voiced_frame_is_insufficient() {
        let pitches = [f64::NAN, 180.0, f64::NAN];
        let voiced = [false, true, false];
        assert!(contour_from_track(&pitches, &voiced).is_none());
        assert!(contour_from_track(&[], &[]).is_none());
    }

    #[test]
    fn zero_and_negative_pitches_count_as_unvoiced() {
        let pitches = [0.0, -3.0, 150.0];
        let voiced = [true, true, true];
        assert!(contour_from_track(&pitches, &voiced).is_none());
    }

    #[test]
    fn resampling_to_own_length_is_identity() {
        let series: Vec<f32> = (0..37).map(|i| 100.0 + (i as f32 * 0.7).sin() * 20.0).collect();
        let resampled = resample_contour(&series, series.len());
        assert_eq!(resampled, series);
    }

    #[test]
    fn resampling_keeps_endpoints_and_linear_shape() {
        let series = [100.0, 200.0];
        let resampled = resample_contour(&series, 5);
        let expected = [100.0, 125.0, 150.0, 175.0, 200.0];
        for (got, want) in resampled.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-4);
        }
    }

    #[test]
    fn resampling_downsamples_long_contours() {
        let series: Vec<f32> = (0..301).map(|i| i as f32).collect();
        let resampled = resample_contour(&series, 101);
        assert_eq!(resampled.len(), 101);
        assert_abs_diff_eq!(resampled[50], 150.0, epsilon = 1e-3);
        assert_abs_diff_eq!(resampled[100], 300.0, epsilon = 1e-3);
    }

    #[test]
    fn degenerate_lengths() {
        assert!(resample_contour(&[1.0, 2.0], 0).is_empty());
        assert_eq!(resample_contour(&[], 3), vec![0.0; 3]);
        assert_eq!(resample_contour(&[7.0], 3), vec![7.0; 3]);
    }
}
