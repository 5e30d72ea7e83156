//! Classifies files by extension: markdown, image, source code or anything else.

use std::path::Path;

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdown", "mdwn", "mkd", "mkdn", "mdtxt", "mdtext"];

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "bmp", "webp", "ico", "tif", "tiff"];

const SOURCE_CODE_EXTENSIONS: &[&str] = &[
    "rs", "c", "h", "cc", "cpp", "hpp", "cs", "go", "java", "kt", "scala", "swift", "m", "js", "jsx", "mjs",
    "ts", "tsx", "py", "rb", "php", "pl", "lua", "r", "sh", "bash", "zsh", "fish", "ps1", "bat", "sql",
    "html", "htm", "xml", "css", "scss", "less", "json", "yaml", "yml", "toml", "ini", "cfg", "conf",
    "dockerfile", "makefile", "cmake", "gradle", "txt", "log", "csv", "diff", "patch",
];

/// What a file is, as far as serving and indexing are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Markdown,
    Image,
    SourceCode,
    Other,
}

impl Kind {
    /// Kinds whose content is read and made searchable.
    pub fn is_text(self) -> bool {
        matches!(self, Kind::Markdown | Kind::SourceCode)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Markdown => "markdown",
            Kind::Image => "image",
            Kind::SourceCode => "source-code",
            Kind::Other => "other",
        }
    }
}

/// Classify `path` by its extension (case-insensitive). Paths without one are `Other`.
pub fn classify(path: impl AsRef<Path>) -> Kind {
    let Some(ext) = extension(path.as_ref()) else {
        return Kind::Other;
    };
    let ext = ext.as_str();
    if MARKDOWN_EXTENSIONS.contains(&ext) {
        Kind::Markdown
    } else if IMAGE_EXTENSIONS.contains(&ext) {
        Kind::Image
    } else if SOURCE_CODE_EXTENSIONS.contains(&ext) {
        Kind::SourceCode
    } else {
        Kind::Other
    }
}

pub fn is_markdown(path: impl AsRef<Path>) -> bool {
    classify(path) == Kind::Markdown
}

pub fn is_image(path: impl AsRef<Path>) -> bool {
    classify(path) == Kind::Image
}

pub fn is_source_code(path: impl AsRef<Path>) -> bool {
    classify(path) == Kind::SourceCode
}

/// Language hint for the highlighter: the lowercase extension of a source-code path.
pub fn language_hint(path: impl AsRef<Path>) -> Option<String> {
    let path = path.as_ref();
    if is_source_code(path) {
        extension(path)
    } else {
        None
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_ascii_lowercase())
}
