mod common;

use tonalyzer::audio::{decode_audio, load_audio};
use tonalyzer::features::FeatureExtractor;

#[test]
fn ogg_opus_voice_note_decodes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voice.ogg");
    std::fs::write(&path, common::silent_voice_note(50)).unwrap();

    let decoded = decode_audio(&path).expect("decode voice note");
    assert_eq!(decoded.sample_rate, 48_000);
    let seconds = decoded.duration_secs();
    assert!(
        (0.9..=1.001).contains(&seconds),
        "expected about one second of audio, got {seconds}"
    );
    assert!(decoded.samples.iter().all(|s| s.abs() < 1e-3));
}

#[test]
fn voice_note_reaches_feature_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voice.ogg");
    std::fs::write(&path, common::silent_voice_note(25)).unwrap();

    let resampled = load_audio(&path, 16_000).expect("load voice note");
    assert_eq!(resampled.sample_rate, 16_000);
    assert!(!resampled.is_empty());

    let features = FeatureExtractor::default()
        .extract_file(&path)
        .expect("extract from voice note");
    assert_eq!(features.len(), 100);
    assert!(features.iter().all(|&v| v == 0.0));
}
