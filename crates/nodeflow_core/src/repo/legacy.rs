//! One-shot import from the pre-SQLite JSON format.
//!
//! # Invariants
//! - A legacy source is consumed at most once: after a successful parse the
//!   source is removed.
//! - Unreadable or malformed legacy data is logged and ignored; it never
//!   blocks startup.

use crate::model::snapshot::WorkspaceSnapshot;
use log::{info, warn};
use std::io::ErrorKind;
use std::path::PathBuf;

/// Startup fallback consulted when the local store holds no workspace.
pub trait LegacySource {
    /// Returns the migrated snapshot and retires the source.
    fn take(&self) -> Option<WorkspaceSnapshot>;
}

/// Legacy workspace stored as one JSON document on disk.
#[derive(Debug, Clone)]
pub struct LegacyJsonFile {
    path: PathBuf,
}

impl LegacyJsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LegacySource for LegacyJsonFile {
    fn take(&self) -> Option<WorkspaceSnapshot> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                warn!("event=legacy_import module=repo status=error error_code=read_failed error={err}");
                return None;
            }
        };

        let snapshot: WorkspaceSnapshot = match serde_json::from_str(&text) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("event=legacy_import module=repo status=error error_code=parse_failed error={err}");
                return None;
            }
        };

        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!("event=legacy_import module=repo status=error error_code=cleanup_failed error={err}");
        }
        info!(
            "event=legacy_import module=repo status=ok pages={}",
            snapshot.pages.len()
        );
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::{LegacyJsonFile, LegacySource};

    #[test]
    fn missing_file_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let source = LegacyJsonFile::new(dir.path().join("absent.json"));
        assert!(source.take().is_none());
    }

    #[test]
    fn valid_file_is_imported_once_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodeflow-v2.json");
        std::fs::write(
            &path,
            r#"{"pages":[{"id":1,"name":"Old","nodes":[{"id":1,"label":"Old","isRoot":true}],"edges":[]}],"activePageId":1,"nextNodeId":2,"nextPageId":2}"#,
        )
        .unwrap();

        let source = LegacyJsonFile::new(&path);
        let snapshot = source.take().expect("legacy file should import");
        assert_eq!(snapshot.pages[0].name, "Old");
        assert!(!path.exists());
        assert!(source.take().is_none());
    }

    #[test]
    fn malformed_file_is_left_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(LegacyJsonFile::new(&path).take().is_none());
        assert!(path.exists());
    }
}
