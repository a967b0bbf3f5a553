use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tonalyzer::audio::write_wav;
use tonalyzer::dataset::Manifest;
use tonalyzer::types::AudioData;

fn tonalyzer() -> Command {
    Command::cargo_bin("tonalyzer").expect("binary built")
}

#[test]
fn scan_writes_manifest_sorted_by_path() {
    let data = tempfile::tempdir().unwrap();
    for name in ["zhong4_FV1_MP3.mp3", "ma1_MV2_MP3.mp3", "notes.txt", "noise.mp3"] {
        fs::write(data.path().join(name), b"").unwrap();
    }
    let output = data.path().join("out").join("map.json");

    tonalyzer()
        .arg("scan")
        .arg(data.path())
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Mapped 2 files"));

    let manifest = Manifest::load(&output).unwrap();
    let labels: Vec<_> = manifest
        .entries
        .iter()
        .map(|entry| (entry.pinyin.as_str(), entry.tone))
        .collect();
    assert_eq!(labels, vec![("ma", 1), ("zhong", 4)]);
}

#[test]
fn extract_prints_fixed_length_vector() {
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("tone.wav");
    let samples = (0..16_000)
        .map(|i| (2.0 * std::f32::consts::PI * 180.0 * i as f32 / 16_000.0).sin() * 0.4)
        .collect();
    write_wav(&AudioData::new(samples, 16_000), &clip).unwrap();

    let assert = tonalyzer().arg("extract").arg(&clip).assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let vector: Vec<f32> = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(vector.len(), 100);
    assert!(vector.iter().all(|v| v.is_finite()));
}

#[test]
fn extract_honours_feature_length() {
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("silence.wav");
    write_wav(&AudioData::new(vec![0.0; 8_000], 16_000), &clip).unwrap();

    let assert = tonalyzer()
        .args(["extract", "--feature-len", "32"])
        .arg(&clip)
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let vector: Vec<f32> = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(vector, vec![0.0; 32]);
}

#[test]
fn classify_reports_missing_model() {
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("tone.wav");
    write_wav(&AudioData::new(vec![0.0; 1_600], 16_000), &clip).unwrap();

    tonalyzer()
        .arg("classify")
        .arg(&clip)
        .arg("--model")
        .arg(dir.path().join("missing.onnx"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("model file not found"));
}

#[test]
fn scan_rejects_missing_directory() {
    tonalyzer()
        .args(["scan", "/definitely/not/here"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
