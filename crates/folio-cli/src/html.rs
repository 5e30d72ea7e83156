//! HTML for pages: the [`Renderer`] implementation and the surrounding layout.

use std::fmt::Write as _;
use std::io;
use std::path::Path;
use std::sync::Arc;

use folio_core::resolver::Content;
use folio_core::route::encode_route;
use folio_core::{Indexer, Page, Renderer, SearchHit};
use pulldown_cmark::{html, Options, Parser};

/// Hits shown on one results page.
const MAX_SEARCH_RESULTS: usize = 50;

const STYLE: &str = "body{font-family:-apple-system,Segoe UI,Helvetica,Arial,sans-serif;max-width:60em;margin:0 auto;padding:1em 2em;color:#24292e}\
header{display:flex;gap:1em;align-items:center;border-bottom:1px solid #eaecef;padding-bottom:.5em}\
header h1{font-size:1.2em;flex:1;margin:0}\
pre{background:#f6f8fa;padding:1em;overflow:auto}\
textarea{width:100%;min-height:30em;font-family:monospace}\
mark{background:#fff5b1}\
.hits li{margin-bottom:1em}";

pub struct HtmlRenderer {
    indexer: Arc<Indexer>,
}

impl HtmlRenderer {
    pub fn new(indexer: Arc<Indexer>) -> Self {
        Self { indexer }
    }
}

impl Renderer for HtmlRenderer {
    fn render_markdown(&self, text: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);
        let mut out = String::new();
        html::push_html(&mut out, Parser::new_ext(text, options));
        out
    }

    async fn render_file(&self, path: &Path) -> io::Result<String> {
        let text = tokio::fs::read_to_string(path).await?;
        Ok(self.render_markdown(&text))
    }

    async fn render_raw(&self, path: &Path) -> io::Result<String> {
        let text = tokio::fs::read_to_string(path).await?;
        Ok(format!(
            "<form method=\"post\"><textarea name=\"content\">{}</textarea>\
             <p><button type=\"submit\">Save</button></p></form>",
            escape_html(&text)
        ))
    }

    async fn render_image_file(&self, route: &str) -> io::Result<String> {
        Ok(format!(
            "<p><img src=\"{}?raw=1\" alt=\"{}\"></p>",
            escape_html(&encode_route(route)),
            escape_html(route)
        ))
    }

    async fn render_source_code(&self, path: &Path, language: &str) -> io::Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(format!(
            "<pre><code class=\"language-{}\">{}</code></pre>",
            escape_html(language),
            escape_html(&text)
        ))
    }

    async fn render_search(&self, term: &str) -> io::Result<String> {
        Ok(search_results(term, &self.indexer.search(term)))
    }
}

fn search_results(term: &str, hits: &[SearchHit]) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<p>{} result(s) for <strong>{}</strong></p><ul class=\"hits\">",
        hits.len(),
        escape_html(term)
    );
    for hit in hits.iter().take(MAX_SEARCH_RESULTS) {
        let _ = write!(
            out,
            "<li><a href=\"{}\">{}</a> <small>{}</small><br>{}</li>",
            escape_html(&encode_route(&hit.route)),
            escape_html(&hit.title),
            escape_html(&hit.route),
            highlighted(hit)
        );
    }
    out.push_str("</ul>");
    out
}

fn highlighted(hit: &SearchHit) -> String {
    let s = &hit.snippet;
    let mut out = String::new();
    if s.truncated_start {
        out.push('…');
    }
    let mut pos = 0;
    for r in &s.highlights {
        out.push_str(&escape_html(&s.text[pos..r.start]));
        out.push_str("<mark>");
        out.push_str(&escape_html(&s.text[r.clone()]));
        out.push_str("</mark>");
        pos = r.end;
    }
    out.push_str(&escape_html(&s.text[pos..]));
    if s.truncated_end {
        out.push('…');
    }
    out
}

/// Full HTML document for `page` around its rendered `content`.
pub fn layout(page: &Page, content: &str) -> String {
    let route = escape_html(&encode_route(&page.route));
    let toggle = match (&page.content, page.edit) {
        (Content::Error { .. } | Content::Search { .. }, _) => String::new(),
        (_, true) => format!("<a href=\"{route}\">View</a>"),
        (_, false) => format!("<a href=\"{route}?edit=1\">Edit</a>"),
    };
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title><style>{STYLE}</style></head>\
         <body><header><h1>{icon} {title}</h1>{toggle}\
         <form method=\"get\" action=\"/\"><input type=\"search\" name=\"search\" value=\"{search}\" placeholder=\"Search\"></form>\
         </header><main>{content}</main></body></html>",
        title = escape_html(&page.title),
        icon = icon(&page.content),
        search = escape_html(page.search.as_deref().unwrap_or("")),
    )
}

fn icon(content: &Content) -> &'static str {
    match content {
        Content::Error { .. } => "⚠",
        Content::Search { .. } => "🔍",
        Content::Markdown { .. } => "📄",
        Content::Image { .. } => "🖼",
        Content::SourceCode { .. } => "📝",
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
