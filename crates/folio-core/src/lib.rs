//! Everything behind the `folio` server that is not HTTP or HTML.
//!
//! The served directory is indexed once at startup ([Indexer]) and kept current by
//! the writes that go through [Resolver]. Folio stores only its config in its own
//! app data directory (see [app_data]).

pub mod app_data;
pub mod config;
pub mod document;
pub mod index;
pub mod matcher;
pub mod render;
pub mod resolver;
pub mod route;
pub mod search;

pub use app_data::app_data_dir;
pub use config::{load_config, set_default_root, Config, ConfigError, ServeSettings};
pub use index::{scan_tree, Index, IndexEntry, IndexError, Indexer, UpdateOutcome};
pub use matcher::{classify, is_image, is_markdown, is_source_code, Kind};
pub use render::{render_content, Renderer};
pub use resolver::{Content, ErrorKind, Intent, Page, Resolution, Resolver, WriteOutcome, ROOT_FILES};
pub use route::{ensure_markdown_extension, extract_route, has_query_option};
pub use search::{SearchHit, Snippet};
