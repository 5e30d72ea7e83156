//! Routes: request paths relative to the served root, always starting with `/`.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::matcher;

/// Extension appended by [`ensure_markdown_extension`].
pub const MARKDOWN_EXTENSION: &str = ".md";

/// Turn a raw request path into a route: percent-decoded, `.` and empty segments
/// dropped, `..` resolved without ever climbing above the root.
pub fn extract_route(request_path: &str) -> String {
    let decoded = urlencoding::decode(request_path)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| request_path.to_string());
    let mut segments: Vec<&str> = Vec::new();
    for seg in decoded.split(['/', '\\']) {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    let mut route = format!("/{}", segments.join("/"));
    if decoded.ends_with('/') && route.len() > 1 {
        route.push('/');
    }
    route
}

/// Whether a boolean query option is present and not explicitly switched off.
/// `?create`, `?create=1` and `?create=yes` all count; `?create=0` and `?create=false` do not.
pub fn has_query_option(query: &HashMap<String, String>, name: &str) -> bool {
    match query.get(name) {
        Some(v) => !matches!(v.trim(), "0" | "false"),
        None => false,
    }
}

/// Append `.md` unless the route already has a markdown extension. Idempotent.
pub fn ensure_markdown_extension(route: &str) -> String {
    if matcher::is_markdown(route) {
        route.to_string()
    } else {
        format!("{}{}", route.trim_end_matches('/'), MARKDOWN_EXTENSION)
    }
}

/// Append a file name to a route.
pub fn join_route(route: &str, name: &str) -> String {
    if route.ends_with('/') {
        format!("{route}{name}")
    } else {
        format!("{route}/{name}")
    }
}

/// Route of the directory containing `route`'s last segment.
pub fn parent_route(route: &str) -> String {
    let trimmed = route.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => trimmed[..i].to_string(),
    }
}

/// Filesystem path a route maps to under `root`.
pub fn fs_path(root: &Path, route: &str) -> PathBuf {
    let rel = route.trim_start_matches('/');
    if rel.is_empty() {
        root.to_path_buf()
    } else {
        root.join(rel)
    }
}

/// Route of a filesystem path under `root`. Paths outside `root` map to `/`.
pub fn route_for_path(root: &Path, path: &Path) -> String {
    let Ok(rel) = path.strip_prefix(root) else {
        return "/".to_string();
    };
    let segments: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    format!("/{}", segments.join("/"))
}

/// Percent-encode each segment of a route for use in a URL.
pub fn encode_route(route: &str) -> String {
    route
        .split('/')
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
