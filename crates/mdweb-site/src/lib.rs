//! Request resolution and document rendering for mdweb.
//!
//! This crate turns request paths into rendered markdown documents:
//!
//! - [`FolderRegistry`]: ordered [`FolderRule`]s naming the folders served as
//!   markdown
//! - [`RequestResolver`]: maps a request path to a markdown file and its rule
//! - [`extract_metadata`]: title, front matter and `basePath`
//! - [`Markdown`]: the shared render service (engines, extensions, sanitizer,
//!   remote documents)
//! - [`Document`]: a rendered page handed to the view layer
//!
//! # Example
//!
//! ```no_run
//! use mdweb_site::{
//!     Document, FolderRegistry, FolderRule, Markdown, MarkdownConfig, RequestResolver,
//! };
//!
//! let markdown = Markdown::new(MarkdownConfig::default()).unwrap();
//! let resolver = RequestResolver::new(
//!     "wwwroot",
//!     FolderRegistry::new().with(FolderRule::new("/docs/")),
//! );
//!
//! if let Some(resolution) = resolver.resolve("/docs/intro") {
//!     let document = Document::load(&markdown, &resolution, "/docs/intro").unwrap();
//!     println!("{}", document.rendered_html);
//! }
//! ```

mod document;
mod error;
mod folders;
mod front_matter;
mod markdown;
mod remote;
mod resolver;

pub use document::Document;
pub use error::{DocumentError, LoadError, RenderError};
pub use folders::{
    DEFAULT_VIEW_TEMPLATE, FolderRegistry, FolderRule, PreProcessHook, RequestContext,
    normalize_folder_path,
};
pub use front_matter::{FrontMatter, extract_metadata};
pub use markdown::{EngineFactory, Markdown, MarkdownConfig, ParseOptions, dedent};
pub use remote::{FetchError, Fetcher, HttpFetcher, fixup_relative_paths, normalize_markdown_url};
pub use resolver::{RequestResolver, Resolution};
