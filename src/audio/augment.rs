//! Waveform perturbations used to grow the training set
//!
//! Each function takes a clip and returns a new one; nothing is mutated in place.
//! Time-domain changes go through ssstretch (Signalsmith Stretch) so pitch and
//! duration can be changed independently.

use anyhow::{ensure, Result};
use rand::Rng;
use rand_distr::StandardNormal;
use ssstretch::Stretch;

use crate::audio::resample::linear_resample;
use crate::types::AudioData;

/// Add clipped gaussian white noise scaled by `noise_factor`.
pub fn add_noise<R: Rng + ?Sized>(audio: &AudioData, noise_factor: f32, rng: &mut R) -> AudioData {
    let samples = audio
        .samples
        .iter()
        .map(|&s| {
            let noise: f32 = rng.sample(StandardNormal);
            (s + noise_factor * noise).clamp(-1.0, 1.0)
        })
        .collect();
    AudioData::new(samples, audio.sample_rate)
}

/// Change playback rate without changing pitch.
///
/// `rate > 1.0` shortens the clip, `rate < 1.0` lengthens it.
pub fn time_stretch(audio: &AudioData, rate: f32) -> Result<AudioData> {
    ensure!(rate > 0.0, "stretch rate must be positive, got {}", rate);
    if audio.is_empty() || (rate - 1.0).abs() < 1e-6 {
        return Ok(audio.clone());
    }
    let target_len = ((audio.samples.len() as f64) / rate as f64).ceil().max(1.0) as usize;
    let samples = stretch_to_length(&audio.samples, audio.sample_rate, target_len);
    Ok(AudioData::new(samples, audio.sample_rate))
}

/// Shift pitch by `semitones` while keeping the clip length.
///
/// The clip is first stretched by the pitch ratio, then resampled back to the
/// original length, which scales every frequency by that ratio.
pub fn pitch_shift(audio: &AudioData, semitones: f32) -> Result<AudioData> {
    ensure!(audio.sample_rate > 0, "sample rate must be positive");
    if audio.is_empty() || semitones.abs() < 1e-6 {
        return Ok(audio.clone());
    }
    let ratio = 2f64.powf(semitones as f64 / 12.0);
    let stretched_len = ((audio.samples.len() as f64) * ratio).round().max(1.0) as usize;
    let stretched = stretch_to_length(&audio.samples, audio.sample_rate, stretched_len);

    let virtual_rate = ((audio.sample_rate as f64) * ratio).round() as u32;
    let mut samples = linear_resample(&stretched, virtual_rate, audio.sample_rate)?;
    samples.resize(audio.samples.len(), 0.0);
    Ok(AudioData::new(samples, audio.sample_rate))
}

/// Draw a uniform stretch rate from `[low, high]`.
pub fn random_rate<R: Rng + ?Sized>(rng: &mut R, low: f32, high: f32) -> f32 {
    if high <= low {
        return low;
    }
    rng.gen_range(low..=high)
}

fn stretch_to_length(input: &[f32], sample_rate: u32, target_len: usize) -> Vec<f32> {
    let mut stretch = Stretch::new();
    stretch.preset_default(1, sample_rate as f32);
    let latency = stretch.output_latency().max(0) as usize;

    let inputs = vec![input.to_vec()];
    let mut outputs = vec![Vec::new()];
    stretch.process_vec(
        &inputs,
        input.len() as i32,
        &mut outputs,
        (target_len + latency) as i32,
    );
    let mut samples = outputs.into_iter().next().unwrap_or_default();

    let mut tail = vec![Vec::new()];
    stretch.flush_vec(&mut tail, latency as i32);
    if let Some(mut channel) = tail.into_iter().next() {
        samples.append(&mut channel);
    }

    // Drop the processing latency at the head so the output lines up with the input.
    let skip = latency.min(samples.len().saturating_sub(target_len));
    let mut aligned: Vec<f32> = samples.into_iter().skip(skip).take(target_len).collect();
    aligned.resize(target_len, 0.0);
    aligned
}
