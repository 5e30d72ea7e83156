//! Resolves a request path to a concrete file.
//!
//! A directory falls back through [`ROOT_FILES`] in order; a miss either creates the
//! file (when asked to) or falls back to an error page rendered against the root.
//! The walk is an explicit state loop with a hard bound on transitions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::index::{Indexer, UpdateOutcome};
use crate::matcher::{self, Kind};
use crate::route;

/// Files tried, in order, when a directory is requested.
pub const ROOT_FILES: [&str; 3] = ["index.md", "README.md", "readme.md"];

/// Title of search result pages.
pub const SEARCH_RESULTS_TITLE: &str = "Search results";

pub const NOT_FOUND_TITLE: &str = "404 Error";
pub const ERROR_TITLE: &str = "Error";
pub const NOT_FOUND_MESSAGE: &str = "## File not found\n> *Nothing lives at this address (yet).*";

// Longest legal walk: directory, three root-file misses, error re-resolution, serve.
const MAX_TRANSITIONS: usize = 16;

/// What the request asked for, read once from the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Intent {
    pub search: Option<String>,
    pub create: bool,
    /// Implied by `create`.
    pub edit: bool,
    pub raw: bool,
}

impl Intent {
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        let create = route::has_query_option(query, "create");
        Self {
            search: query
                .get("search")
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            create,
            edit: create || route::has_query_option(query, "edit"),
            raw: route::has_query_option(query, "raw"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    CreateFailure,
}

/// What to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Markdown-formatted error message.
    Error { kind: ErrorKind, message: String },
    Search { term: String },
    Markdown { path: PathBuf },
    Image { route: String },
    SourceCode { path: PathBuf, language: String },
}

/// A renderable page: content plus the frame around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub route: String,
    /// Show the editor instead of the rendered view.
    pub edit: bool,
    pub search: Option<String>,
    pub content: Content,
}

impl Page {
    pub fn is_not_found(&self) -> bool {
        matches!(self.content, Content::Error { kind: ErrorKind::NotFound, .. })
    }
}

/// Terminal state of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Page(Page),
    /// Send the client elsewhere (URL path with query).
    Redirect(String),
    /// Stream the file verbatim.
    Raw(PathBuf),
    /// Nothing here for us; the caller's own not-found handling applies.
    NotHandled,
}

/// Outcome of a write through the serving path.
#[derive(Debug)]
pub struct WriteOutcome {
    pub resolution: Resolution,
    /// Whether the file was overwritten.
    pub written: bool,
    /// The index update started after the write. Callers need not wait for it.
    pub index_update: JoinHandle<UpdateOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootFileCursor {
    Unset,
    Attempted(usize),
    Exhausted,
}

impl RootFileCursor {
    /// Next candidate after a directory hit.
    fn advance(&mut self) -> Option<&'static str> {
        let next = match *self {
            RootFileCursor::Unset => 0,
            RootFileCursor::Attempted(i) => i + 1,
            RootFileCursor::Exhausted => ROOT_FILES.len(),
        };
        if next < ROOT_FILES.len() {
            *self = RootFileCursor::Attempted(next);
            Some(ROOT_FILES[next])
        } else {
            *self = RootFileCursor::Exhausted;
            None
        }
    }

    /// Next candidate after a miss; only applies while a candidate was being tried.
    fn advance_after_miss(&mut self) -> Option<&'static str> {
        match *self {
            RootFileCursor::Attempted(_) => self.advance(),
            _ => None,
        }
    }
}

/// Per-request state. Never shared.
#[derive(Debug)]
struct ResolutionState {
    route: String,
    root_file_cursor: RootFileCursor,
    intent: Intent,
    error: Option<(ErrorKind, String)>,
    title: Option<String>,
    create_attempted: bool,
}

impl ResolutionState {
    fn fail(&mut self, kind: ErrorKind, title: &str, message: String) {
        self.error = Some((kind, message));
        self.title = Some(title.to_string());
        self.route = "/".to_string();
    }
}

enum Step {
    Stat,
    Miss,
    Serve(PathBuf),
}

pub struct Resolver {
    indexer: Arc<Indexer>,
}

impl Resolver {
    pub fn new(indexer: Arc<Indexer>) -> Self {
        Self { indexer }
    }

    pub fn root(&self) -> &Path {
        self.indexer.root()
    }

    pub fn indexer(&self) -> &Arc<Indexer> {
        &self.indexer
    }

    /// Resolve a GET of `request_path`.
    pub async fn resolve(&self, request_path: &str, intent: Intent) -> Resolution {
        let mut st = ResolutionState {
            route: route::extract_route(request_path),
            root_file_cursor: RootFileCursor::Unset,
            intent,
            error: None,
            title: None,
            create_attempted: false,
        };
        let mut step = Step::Stat;

        for _ in 0..MAX_TRANSITIONS {
            step = match step {
                Step::Stat => self.stat(&mut st).await,
                Step::Miss => match self.handle_miss(&mut st).await {
                    Ok(next) => next,
                    Err(terminal) => return terminal,
                },
                Step::Serve(path) => return serve(st, path),
            };
        }
        tracing::error!(route = %st.route, "resolution did not settle");
        Resolution::NotHandled
    }

    async fn stat(&self, st: &mut ResolutionState) -> Step {
        let path = route::fs_path(self.root(), &st.route);
        let meta = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(_) => return Step::Miss,
        };
        if meta.is_dir() && st.intent.search.is_none() && st.error.is_none() {
            if st.intent.create {
                let message = format!("Cannot create file `{}`", path.display());
                st.fail(ErrorKind::CreateFailure, ERROR_TITLE, message);
                return Step::Serve(path);
            }
            return match st.root_file_cursor.advance() {
                Some(name) => {
                    st.route = route::join_route(&st.route, name);
                    Step::Stat
                }
                None => {
                    st.fail(ErrorKind::NotFound, NOT_FOUND_TITLE, NOT_FOUND_MESSAGE.to_string());
                    Step::Stat
                }
            };
        }
        Step::Serve(path)
    }

    /// `Err` carries a terminal resolution that ends the walk.
    async fn handle_miss(&self, st: &mut ResolutionState) -> Result<Step, Resolution> {
        if st.error.is_some() {
            // Already re-resolving against the root and it is gone too.
            tracing::error!(root = %self.root().display(), "served root is missing");
            return Err(Resolution::NotHandled);
        }
        if st.intent.create {
            let fixed = route::ensure_markdown_extension(&st.route);
            if fixed != st.route {
                return Err(Resolution::Redirect(format!("{}?create=1", route::encode_route(&fixed))));
            }
            let path = route::fs_path(self.root(), &st.route);
            if st.create_attempted {
                // Created once and it still is not there.
                let message = format!("Cannot create file `{}`", path.display());
                st.fail(ErrorKind::CreateFailure, ERROR_TITLE, message);
                return Ok(Step::Stat);
            }
            st.create_attempted = true;
            match create_empty_file(&path).await {
                Ok(()) => {
                    tracing::info!(route = %st.route, "created file");
                    self.indexer.update_index_for_file(&path).await;
                    st.error = None;
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "cannot create file");
                    let message = format!("Cannot create file `{}`", path.display());
                    st.fail(ErrorKind::CreateFailure, ERROR_TITLE, message);
                }
            }
            return Ok(Step::Stat);
        }
        if let Some(name) = st.root_file_cursor.advance_after_miss() {
            st.route = route::join_route(&route::parent_route(&st.route), name);
            return Ok(Step::Stat);
        }
        st.fail(ErrorKind::NotFound, NOT_FOUND_TITLE, NOT_FOUND_MESSAGE.to_string());
        Ok(Step::Stat)
    }

    /// Handle a POST of `content` to `request_path`.
    ///
    /// Overwrites the file only if it exists and `content` is non-empty. The index
    /// update for the path is started in every case, including when nothing was written.
    /// The file is then shown through the file view regardless of its kind.
    pub async fn write(&self, request_path: &str, content: Option<String>) -> WriteOutcome {
        let route = route::extract_route(request_path);
        let path = route::fs_path(self.root(), &route);

        let stat = tokio::fs::metadata(&path).await;
        let mut failed = stat.is_err();
        let mut written = false;
        if let (Ok(meta), Some(content)) = (&stat, content.filter(|c| !c.is_empty())) {
            if meta.is_file() {
                match tokio::fs::write(&path, content).await {
                    Ok(()) => written = true,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "write failed");
                        failed = true;
                    }
                }
            }
        }

        let indexer = Arc::clone(&self.indexer);
        let update_path = path.clone();
        let index_update = tokio::spawn(async move { indexer.update_index_for_file(&update_path).await });

        let is_file = stat.map(|m| m.is_file()).unwrap_or(false);
        // Whatever its kind, a written file is shown through the file view.
        let resolution = if failed || !is_file {
            Resolution::NotHandled
        } else {
            Resolution::Page(Page {
                title: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| route.clone()),
                route,
                edit: false,
                search: None,
                content: Content::Markdown { path },
            })
        };
        WriteOutcome {
            resolution,
            written,
            index_update,
        }
    }
}

fn serve(st: ResolutionState, path: PathBuf) -> Resolution {
    let ResolutionState {
        route,
        intent,
        error,
        title,
        ..
    } = st;
    let default_title = || {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| route.clone())
    };

    if let Some((kind, message)) = error {
        return Resolution::Page(Page {
            title: title.unwrap_or_else(|| ERROR_TITLE.to_string()),
            route,
            edit: false,
            search: intent.search,
            content: Content::Error { kind, message },
        });
    }
    if let Some(term) = intent.search {
        return Resolution::Page(Page {
            title: title.unwrap_or_else(|| SEARCH_RESULTS_TITLE.to_string()),
            route,
            edit: intent.edit,
            search: Some(term.clone()),
            content: Content::Search { term },
        });
    }
    if intent.raw {
        return Resolution::Raw(path);
    }
    let content = match matcher::classify(&path) {
        Kind::Markdown => Content::Markdown { path: path.clone() },
        Kind::Image => Content::Image { route: route.clone() },
        Kind::SourceCode => Content::SourceCode {
            language: matcher::language_hint(&path).unwrap_or_default(),
            path: path.clone(),
        },
        Kind::Other => return Resolution::NotHandled,
    };
    Resolution::Page(Page {
        title: title.unwrap_or_else(default_title),
        route,
        edit: intent.edit,
        search: None,
        content,
    })
}

async fn create_empty_file(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};

    use super::*;

    async fn setup(files: &[(&str, &str)]) -> (TempDir, Resolver) {
        let dir = tempdir().unwrap();
        for (rel, body) in files {
            let p = dir.path().join(rel);
            fs::create_dir_all(p.parent().unwrap()).unwrap();
            fs::write(p, body).unwrap();
        }
        let indexer = Indexer::new(dir.path());
        indexer.index_files().await.unwrap();
        (dir, Resolver::new(indexer))
    }

    fn query(pairs: &[(&str, &str)]) -> Intent {
        let q: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Intent::from_query(&q)
    }

    fn page(res: Resolution) -> Page {
        match res {
            Resolution::Page(p) => p,
            other => panic!("expected a page, got {other:?}"),
        }
    }

    #[test]
    fn intent_from_query() {
        let i = query(&[("create", "1"), ("search", "  rust  ")]);
        assert!(i.create && i.edit && !i.raw);
        assert_eq!(i.search.as_deref(), Some("rust"));
        assert_eq!(query(&[("search", "   ")]).search, None);
    }

    #[tokio::test]
    async fn serves_markdown_file() {
        let (dir, r) = setup(&[("docs/guide.md", "# Guide")]).await;
        let p = page(r.resolve("/docs/guide.md", Intent::default()).await);
        assert_eq!(p.title, "guide.md");
        assert_eq!(p.route, "/docs/guide.md");
        assert_eq!(p.content, Content::Markdown { path: dir.path().join("docs/guide.md") });
        assert!(!p.edit);
    }

    #[tokio::test]
    async fn directory_prefers_index_md() {
        let (dir, r) = setup(&[("docs/index.md", "i"), ("docs/README.md", "R")]).await;
        let p = page(r.resolve("/docs", Intent::default()).await);
        assert_eq!(p.route, "/docs/index.md");
        assert_eq!(p.content, Content::Markdown { path: dir.path().join("docs/index.md") });
    }

    #[tokio::test]
    async fn directory_falls_back_to_lowercase_readme() {
        let (_dir, r) = setup(&[("docs/readme.md", "r")]).await;
        let p = page(r.resolve("/docs/", Intent::default()).await);
        assert_eq!(p.route, "/docs/readme.md");
    }

    #[tokio::test]
    async fn root_directory_uses_readme() {
        let (_dir, r) = setup(&[("README.md", "# Hello")]).await;
        let p = page(r.resolve("/", Intent::default()).await);
        assert_eq!(p.route, "/README.md");
        assert_eq!(p.title, "README.md");
    }

    #[tokio::test]
    async fn directory_without_root_files_is_not_found() {
        let (_dir, r) = setup(&[("docs/other.md", "x")]).await;
        let p = page(r.resolve("/docs", Intent::default()).await);
        assert!(p.is_not_found());
        assert_eq!(p.title, NOT_FOUND_TITLE);
        assert_eq!(p.route, "/");
    }

    #[tokio::test]
    async fn missing_file_renders_not_found() {
        let (_dir, r) = setup(&[]).await;
        let p = page(r.resolve("/nope.md", Intent::default()).await);
        assert_eq!(
            p.content,
            Content::Error {
                kind: ErrorKind::NotFound,
                message: NOT_FOUND_MESSAGE.to_string()
            }
        );
        assert!(!p.edit);
    }

    #[tokio::test]
    async fn create_makes_empty_indexed_file() {
        let (dir, r) = setup(&[]).await;
        let res = r.resolve("/notes/today.md", query(&[("create", "1")])).await;
        let path = dir.path().join("notes/today.md");
        let p = page(res);
        assert_eq!(p.content, Content::Markdown { path: path.clone() });
        assert!(p.edit);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
        assert!(r.indexer().read_index().get(&path).is_some());
    }

    #[tokio::test]
    async fn create_without_markdown_extension_redirects() {
        let (dir, r) = setup(&[]).await;
        let res = r.resolve("/notes", query(&[("create", "1")])).await;
        assert_eq!(res, Resolution::Redirect("/notes.md?create=1".to_string()));
        assert!(!dir.path().join("notes").exists());
    }

    #[tokio::test]
    async fn create_on_existing_directory_is_an_error() {
        let (_dir, r) = setup(&[("docs/index.md", "x")]).await;
        let p = page(r.resolve("/docs", query(&[("create", "")])).await);
        assert_eq!(p.title, ERROR_TITLE);
        assert_eq!(p.route, "/");
        assert!(matches!(p.content, Content::Error { kind: ErrorKind::CreateFailure, .. }));
        assert!(!p.edit);
    }

    #[tokio::test]
    async fn create_failure_renders_error() {
        // A file where a parent directory is needed.
        let (_dir, r) = setup(&[("blocker", "x")]).await;
        let p = page(r.resolve("/blocker/child.md", query(&[("create", "1")])).await);
        assert_eq!(p.title, ERROR_TITLE);
        assert!(matches!(p.content, Content::Error { kind: ErrorKind::CreateFailure, .. }));
    }

    #[tokio::test]
    async fn search_wins_over_directory_fallback() {
        let (_dir, r) = setup(&[("docs/index.md", "x")]).await;
        let p = page(r.resolve("/docs", query(&[("search", "x")])).await);
        assert_eq!(p.title, SEARCH_RESULTS_TITLE);
        assert_eq!(p.content, Content::Search { term: "x".to_string() });
    }

    #[tokio::test]
    async fn raw_and_kinds() {
        let (dir, r) = setup(&[("a.png", "png"), ("b.rs", "fn x() {}"), ("c.bin", "?")]).await;
        assert_eq!(
            r.resolve("/b.rs", query(&[("raw", "1")])).await,
            Resolution::Raw(dir.path().join("b.rs"))
        );
        assert_eq!(
            page(r.resolve("/a.png", Intent::default()).await).content,
            Content::Image { route: "/a.png".to_string() }
        );
        assert_eq!(
            page(r.resolve("/b.rs", Intent::default()).await).content,
            Content::SourceCode {
                path: dir.path().join("b.rs"),
                language: "rs".to_string()
            }
        );
        assert_eq!(r.resolve("/c.bin", Intent::default()).await, Resolution::NotHandled);
    }

    #[tokio::test]
    async fn missing_root_is_not_handled() {
        let dir = tempdir().unwrap();
        let r = Resolver::new(Indexer::new(dir.path().join("gone")));
        assert_eq!(r.resolve("/x.md", Intent::default()).await, Resolution::NotHandled);
    }

    #[tokio::test]
    async fn write_overwrites_and_reindexes() {
        let (dir, r) = setup(&[("page.md", "old words")]).await;
        let out = r.write("/page.md", Some("fresh words".to_string())).await;
        assert!(out.written);
        assert_eq!(out.index_update.await.unwrap(), UpdateOutcome::Indexed);
        assert_eq!(fs::read_to_string(dir.path().join("page.md")).unwrap(), "fresh words");
        assert!(matches!(out.resolution, Resolution::Page(_)));
        assert_eq!(r.indexer().search("fresh").len(), 1);
        assert!(r.indexer().search("old").is_empty());
    }

    #[tokio::test]
    async fn write_without_content_still_updates_index() {
        let (dir, r) = setup(&[]).await;
        let path = dir.path().join("late.md");
        // Created behind the index's back, so only an update can pick it up.
        fs::write(&path, "unseen").unwrap();
        assert!(r.indexer().search("unseen").is_empty());

        let out = r.write("/late.md", None).await;
        assert!(!out.written);
        assert_eq!(out.index_update.await.unwrap(), UpdateOutcome::Indexed);
        assert_eq!(fs::read_to_string(&path).unwrap(), "unseen");
        assert_eq!(r.indexer().search("unseen").len(), 1);
    }

    #[tokio::test]
    async fn write_shows_files_of_any_kind() {
        let (dir, r) = setup(&[("LICENSE", "old terms")]).await;
        let out = r.write("/LICENSE", Some("new terms".to_string())).await;
        assert!(out.written);
        let p = page(out.resolution);
        assert_eq!(p.title, "LICENSE");
        assert_eq!(p.route, "/LICENSE");
        assert!(!p.edit);
        assert_eq!(p.content, Content::Markdown { path: dir.path().join("LICENSE") });
        assert_eq!(fs::read_to_string(dir.path().join("LICENSE")).unwrap(), "new terms");
    }

    #[tokio::test]
    async fn write_to_directory_is_not_handled() {
        let (_dir, r) = setup(&[("docs/index.md", "x")]).await;
        let out = r.write("/docs", Some("y".to_string())).await;
        assert!(!out.written);
        assert_eq!(out.resolution, Resolution::NotHandled);
        assert_eq!(out.index_update.await.unwrap(), UpdateOutcome::Skipped);
    }

    #[tokio::test]
    async fn write_to_missing_file_is_not_handled() {
        let (dir, r) = setup(&[]).await;
        let out = r.write("/ghost.md", Some("boo".to_string())).await;
        assert!(!out.written);
        assert_eq!(out.resolution, Resolution::NotHandled);
        assert_eq!(out.index_update.await.unwrap(), UpdateOutcome::Skipped);
        assert!(!dir.path().join("ghost.md").exists());
    }
}
