//! Derives the indexable view of a file: title and plain searchable text.
//!
//! Markdown is parsed so that only the words a reader sees end up in the index.

use std::path::Path;

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use serde::Deserialize;

use crate::matcher::Kind;

/// Title and searchable text derived from one file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derived {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    title: Option<String>,
}

/// Derive title and text for a file of `kind`. `content` is `None` for kinds we do not read.
pub fn derive(path: &Path, kind: Kind, content: Option<&str>) -> Derived {
    let file_name = file_name(path);
    match (kind, content) {
        (Kind::Markdown, Some(raw)) => {
            let (front, body) = split_frontmatter(raw);
            let (heading, text) = markdown_text(body);
            let title = front
                .and_then(|f| f.title)
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .or(heading)
                .unwrap_or(file_name);
            Derived { title, text }
        }
        (Kind::SourceCode, Some(raw)) => Derived {
            title: file_name,
            text: raw.to_string(),
        },
        _ => Derived {
            title: file_name,
            text: String::new(),
        },
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Splits optional YAML frontmatter (lines between first --- and second ---) from the body.
fn split_frontmatter(content: &str) -> (Option<FrontMatter>, &str) {
    let s = content.trim_start();
    let Some(after_first) = s.strip_prefix("---") else {
        return (None, content);
    };
    let Some(end) = after_first.find("\n---") else {
        return (None, content);
    };
    let yaml = &after_first[..end];
    let rest = &after_first[end + 4..];
    // Drop the remainder of the closing fence line.
    let body = rest.split_once('\n').map_or("", |(_, b)| b);
    let front = serde_yaml::from_str::<FrontMatter>(yaml).ok();
    (front, body.trim_start())
}

/// Plain text of a markdown body plus its first heading, if any.
fn markdown_text(body: &str) -> (Option<String>, String) {
    let mut text = String::new();
    let mut first_heading: Option<String> = None;
    let mut heading_buf: Option<String> = None;

    for event in Parser::new(body) {
        match event {
            Event::Start(Tag::Heading { .. }) if first_heading.is_none() => {
                heading_buf = Some(String::new());
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(h) = heading_buf.take() {
                    let h = h.trim().to_string();
                    if !h.is_empty() {
                        first_heading = Some(h);
                    }
                }
                text.push('\n');
            }
            Event::Text(t) | Event::Code(t) => {
                if let Some(h) = heading_buf.as_mut() {
                    h.push_str(&t);
                }
                text.push_str(&t);
            }
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(TagEnd::Paragraph | TagEnd::Item | TagEnd::CodeBlock | TagEnd::TableRow) => {
                text.push('\n');
            }
            _ => {}
        }
    }
    (first_heading, text.trim().to_string())
}
