//! The rendering seam. Turning markdown into HTML is someone else's job; this
//! module only fixes the calls a page needs and picks exactly one of them.

use std::future::Future;
use std::io;
use std::path::Path;

use crate::resolver::{Content, Page};

/// Produces HTML fragments for page content.
pub trait Renderer: Send + Sync {
    fn render_markdown(&self, text: &str) -> String;

    /// Rendered view of a markdown file.
    fn render_file(&self, path: &Path) -> impl Future<Output = io::Result<String>> + Send;

    /// Editable source of a file.
    fn render_raw(&self, path: &Path) -> impl Future<Output = io::Result<String>> + Send;

    fn render_image_file(&self, route: &str) -> impl Future<Output = io::Result<String>> + Send;

    fn render_source_code(&self, path: &Path, language: &str) -> impl Future<Output = io::Result<String>> + Send;

    /// Results page for `term`, usually backed by [`crate::Indexer::search`].
    fn render_search(&self, term: &str) -> impl Future<Output = io::Result<String>> + Send;
}

/// Render the content of `page` with `renderer`.
pub async fn render_content<R: Renderer>(renderer: &R, page: &Page) -> io::Result<String> {
    match &page.content {
        Content::Error { message, .. } => Ok(renderer.render_markdown(message)),
        Content::Search { term } => renderer.render_search(term).await,
        Content::Markdown { path } if page.edit => renderer.render_raw(path).await,
        Content::Markdown { path } => renderer.render_file(path).await,
        Content::Image { route } => renderer.render_image_file(route).await,
        Content::SourceCode { path, language } => renderer.render_source_code(path, language).await,
    }
}
