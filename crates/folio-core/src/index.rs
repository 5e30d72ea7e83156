//! The content index: one entry per file under the served root.
//!
//! Built by a full scan at startup, then kept current by upserting single files
//! after every write that goes through the serving path. Files changed or removed
//! outside that path are not noticed; their entries stay as they were until the
//! next restart.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::document;
use crate::matcher::{self, Kind};
use crate::route;
use crate::search::{self, SearchHit};

/// One indexed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Absolute filesystem path (unique key).
    pub path: PathBuf,
    /// Path relative to the served root, e.g. `/docs/guide.md`.
    pub route: String,
    pub title: String,
    /// Plain text used for matching. Empty for images and other non-text kinds.
    pub searchable_text: String,
    pub kind: Kind,
    /// When this entry was last derived.
    pub modified_at: SystemTime,
}

/// Mapping from absolute path to entry.
#[derive(Debug, Default, Clone)]
pub struct Index {
    entries: HashMap<PathBuf, IndexEntry>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for its path.
    pub fn upsert(&mut self, entry: IndexEntry) {
        self.entries.insert(entry.path.clone(), entry);
    }

    pub fn remove(&mut self, path: &Path) -> Option<IndexEntry> {
        self.entries.remove(path)
    }

    pub fn get(&self, path: &Path) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by route, for listings.
    pub fn sorted(&self) -> Vec<&IndexEntry> {
        let mut v: Vec<&IndexEntry> = self.entries.values().collect();
        v.sort_by(|a, b| a.route.cmp(&b.route));
        v
    }
}

/// Result of re-deriving a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The entry was inserted or replaced.
    Indexed,
    /// The file could not be read; any previous entry for it was dropped.
    Skipped,
}

/// Owns the index for one served root. Cheap to share behind an `Arc`.
///
/// Readers take the lock only for the duration of a search; writers only for a
/// single upsert, never across an await.
#[derive(Debug)]
pub struct Indexer {
    root: PathBuf,
    index: RwLock<Index>,
}

impl Indexer {
    pub fn new(root: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            root: root.into(),
            index: RwLock::new(Index::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the whole root and replace the index. Unreadable files are skipped.
    pub async fn index_files(&self) -> Result<usize, IndexError> {
        let root = self.root.clone();
        let index = tokio::task::spawn_blocking(move || scan_tree(&root))
            .await
            .map_err(|e| IndexError::Join(e.to_string()))??;
        let count = index.len();
        *self.write_index() = index;
        tracing::info!(root = %self.root.display(), files = count, "index built");
        Ok(count)
    }

    /// Re-derive and upsert the entry for exactly one path.
    ///
    /// Never fails from the caller's point of view: unreadable files are logged
    /// and dropped from the index.
    pub async fn update_index_for_file(&self, path: &Path) -> UpdateOutcome {
        match read_entry(&self.root, path).await {
            Ok(entry) => {
                tracing::debug!(route = %entry.route, "index entry updated");
                self.write_index().upsert(entry);
                UpdateOutcome::Indexed
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                self.write_index().remove(path);
                UpdateOutcome::Skipped
            }
        }
    }

    /// Ranked matches for `query` against the current index.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        search::search(&self.read_index(), query)
    }

    /// Read access to the current index.
    pub fn read_index(&self) -> RwLockReadGuard<'_, Index> {
        // Upserts replace whole entries, so a poisoned lock still guards a consistent index.
        self.index.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_index(&self) -> std::sync::RwLockWriteGuard<'_, Index> {
        self.index.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Walk `root` and derive an entry for every regular file we can read.
/// Hidden files and directories are skipped; symlinks are not followed.
pub fn scan_tree(root: &Path) -> Result<Index, IndexError> {
    if !root.is_dir() {
        return Err(IndexError::NotADirectory(root.to_path_buf()));
    }
    let mut index = Index::new();
    let mut skipped = 0usize;
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                skipped += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let kind = matcher::classify(path);
        let content = if kind.is_text() {
            match std::fs::read(path) {
                Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                    skipped += 1;
                    continue;
                }
            }
        } else {
            None
        };
        index.upsert(make_entry(root, path, kind, content.as_deref()));
    }
    if skipped > 0 {
        tracing::info!(skipped, "some files were not indexed");
    }
    Ok(index)
}

async fn read_entry(root: &Path, path: &Path) -> Result<IndexEntry, std::io::Error> {
    let meta = tokio::fs::metadata(path).await?;
    if !meta.is_file() {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"));
    }
    let kind = matcher::classify(path);
    let content = if kind.is_text() {
        let bytes = tokio::fs::read(path).await?;
        Some(String::from_utf8_lossy(&bytes).into_owned())
    } else {
        None
    };
    Ok(make_entry(root, path, kind, content.as_deref()))
}

fn make_entry(root: &Path, path: &Path, kind: Kind, content: Option<&str>) -> IndexEntry {
    let derived = document::derive(path, kind, content);
    IndexEntry {
        path: path.to_path_buf(),
        route: route::route_for_path(root, path),
        title: derived.title,
        searchable_text: derived.text,
        kind,
        modified_at: SystemTime::now(),
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("index task failed: {0}")]
    Join(String),
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn scan_builds_one_entry_per_file() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs/img")).unwrap();
        fs::write(dir.path().join("index.md"), "# Home\n\nWelcome.").unwrap();
        fs::write(dir.path().join("docs/guide.md"), "# Guide\n\nSteps.").unwrap();
        fs::write(dir.path().join("docs/img/logo.png"), [0x89u8, 0x50, 0x4e, 0x47]).unwrap();
        fs::write(dir.path().join("docs/main.rs"), "fn main() {}").unwrap();

        let index = scan_tree(dir.path()).unwrap();
        let routes: Vec<&str> = index.sorted().iter().map(|e| e.route.as_str()).collect();
        assert_eq!(routes, vec!["/docs/guide.md", "/docs/img/logo.png", "/docs/main.rs", "/index.md"]);

        let logo = index.get(&dir.path().join("docs/img/logo.png")).unwrap();
        assert_eq!(logo.kind, Kind::Image);
        assert!(logo.searchable_text.is_empty());

        let home = index.get(&dir.path().join("index.md")).unwrap();
        assert_eq!(home.title, "Home");
        assert_eq!(home.kind, Kind::Markdown);
    }

    #[test]
    fn scan_skips_hidden() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
        fs::write(dir.path().join(".hidden.md"), "secret").unwrap();
        fs::write(dir.path().join("shown.md"), "visible").unwrap();
        let index = scan_tree(dir.path()).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn scan_continues_past_unreadable_entries() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked_dir = dir.path().join("locked");
        fs::create_dir_all(&locked_dir).unwrap();
        fs::write(locked_dir.join("inside.md"), "hidden away").unwrap();
        let locked_file = dir.path().join("sealed.md");
        fs::write(&locked_file, "sealed").unwrap();
        fs::write(dir.path().join("open.md"), "# Open").unwrap();

        fs::set_permissions(&locked_dir, fs::Permissions::from_mode(0o000)).unwrap();
        fs::set_permissions(&locked_file, fs::Permissions::from_mode(0o000)).unwrap();
        // Permission bits do not bind a privileged user; nothing to observe then.
        let privileged = fs::read_dir(&locked_dir).is_ok() || fs::read(&locked_file).is_ok();

        let result = scan_tree(dir.path());

        fs::set_permissions(&locked_dir, fs::Permissions::from_mode(0o755)).unwrap();
        fs::set_permissions(&locked_file, fs::Permissions::from_mode(0o644)).unwrap();
        if privileged {
            return;
        }

        let index = result.unwrap();
        let routes: Vec<&str> = index.sorted().iter().map(|e| e.route.as_str()).collect();
        assert_eq!(routes, vec!["/open.md"]);
    }

    #[test]
    fn scan_rejects_missing_root() {
        let dir = tempdir().unwrap();
        let err = scan_tree(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, IndexError::NotADirectory(_)));
    }

    #[tokio::test]
    async fn update_inserts_replaces_and_drops() {
        let dir = tempdir().unwrap();
        let indexer = Indexer::new(dir.path());
        indexer.index_files().await.unwrap();
        assert!(indexer.read_index().is_empty());

        let path = dir.path().join("new.md");
        fs::write(&path, "# First").unwrap();
        assert_eq!(indexer.update_index_for_file(&path).await, UpdateOutcome::Indexed);
        assert_eq!(indexer.read_index().get(&path).unwrap().title, "First");

        fs::write(&path, "# Second").unwrap();
        indexer.update_index_for_file(&path).await;
        assert_eq!(indexer.read_index().len(), 1);
        assert_eq!(indexer.read_index().get(&path).unwrap().title, "Second");

        fs::remove_file(&path).unwrap();
        assert_eq!(indexer.update_index_for_file(&path).await, UpdateOutcome::Skipped);
        assert!(indexer.read_index().get(&path).is_none());
    }

    #[tokio::test]
    async fn update_on_directory_is_skipped() {
        let dir = tempdir().unwrap();
        let indexer = Indexer::new(dir.path());
        assert_eq!(indexer.update_index_for_file(dir.path()).await, UpdateOutcome::Skipped);
    }
}
