use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

/// Uniquely named download target, removed when dropped.
#[derive(Debug)]
pub struct TempAudioFile {
    path: PathBuf,
}

impl TempAudioFile {
    pub fn new(dir: &Path, extension: &str) -> Self {
        let extension = extension.trim_start_matches('.');
        let name = if extension.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            format!("{}.{}", Uuid::new_v4(), extension)
        };
        Self {
            path: dir.join(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempAudioFile {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed temporary audio"),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to remove temporary audio")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_keep_extension() {
        let dir = Path::new("/tmp");
        let first = TempAudioFile::new(dir, "ogg");
        let second = TempAudioFile::new(dir, ".ogg");
        assert_ne!(first.path(), second.path());
        assert_eq!(first.path().extension().unwrap(), "ogg");
        assert_eq!(second.path().extension().unwrap(), "ogg");
    }

    #[test]
    fn removes_file_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let temp = TempAudioFile::new(dir.path(), "wav");
            std::fs::write(temp.path(), b"data").unwrap();
            assert!(temp.path().exists());
            temp.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn drop_without_file_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let temp = TempAudioFile::new(dir.path(), "ogg");
        drop(temp);
    }
}
