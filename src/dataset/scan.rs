//! Build a manifest from a directory of tone-labelled recordings.
//!
//! File names follow the Tone Perfect convention: `<pinyin><tone>[_speaker[_tag]].<ext>`,
//! e.g. `zhong4_FV1_MP3.mp3` or `a1.wav`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::{DatasetEntry, Manifest};
use crate::types::ToneLabel;

/// Collect every file with `extension` whose name carries a tone digit.
pub fn scan_directory(dir: &Path, extension: &str) -> Result<Manifest> {
    let wanted = extension.trim_start_matches('.');
    let mut entries = Vec::new();
    let listing = fs::read_dir(dir)
        .with_context(|| format!("Failed to list dataset directory {}", dir.display()))?;
    for item in listing {
        let item = item.with_context(|| format!("Failed to read entry in {}", dir.display()))?;
        let path = item.path();
        if !path.is_file() {
            continue;
        }
        let matches_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(wanted));
        if !matches_extension {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match parse_label(stem) {
            Some((pinyin, tone)) => entries.push(DatasetEntry {
                path: path.clone(),
                pinyin,
                tone,
            }),
            None => warn!(path = %path.display(), "no tone digit in file name; skipping"),
        }
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    info!(
        dir = %dir.display(),
        extension = wanted,
        entries = entries.len(),
        "scanned dataset directory"
    );
    Ok(Manifest::new(entries))
}

/// Split `zhong4_FV1_MP3` into `("zhong", 4)`.
pub fn parse_label(stem: &str) -> Option<(String, ToneLabel)> {
    let syllable = stem.split('_').next()?;
    let tone_char = syllable.chars().last()?;
    let tone = tone_char.to_digit(10)?;
    if tone == 0 {
        return None;
    }
    let pinyin = &syllable[..syllable.len() - tone_char.len_utf8()];
    if pinyin.is_empty() {
        return None;
    }
    Some((pinyin.to_string(), tone as ToneLabel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tone_perfect_names() {
        assert_eq!(parse_label("zhong4_FV1_MP3"), Some(("zhong".into(), 4)));
        assert_eq!(parse_label("a1"), Some(("a".into(), 1)));
        assert_eq!(parse_label("lü3_MV2"), Some(("lü".into(), 3)));
    }

    #[test]
    fn rejects_names_without_tone() {
        assert_eq!(parse_label("recording"), None);
        assert_eq!(parse_label("ma0"), None);
        assert_eq!(parse_label("4"), None);
        assert_eq!(parse_label(""), None);
    }

    #[test]
    fn scans_matching_files_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["ma2_FV1_MP3.mp3", "ba1.mp3", "notes.txt", "noise.mp3"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let manifest = scan_directory(dir.path(), "mp3").unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.entries[0].pinyin, "ba");
        assert_eq!(manifest.entries[0].tone, 1);
        assert_eq!(manifest.entries[1].pinyin, "ma");
        assert_eq!(manifest.entries[1].tone, 2);
    }
}
