//! `PlantUML` diagrams for mdweb.
//!
//! Diagrams are not rendered locally. Fenced `plantuml` blocks are encoded
//! into the server URL format ([`encode_diagram`]) and replaced with an image
//! pointing at a `PlantUML` server by [`PlantUmlExtension`], a render extension
//! running before markdown rendering.
//!
//! # Example
//!
//! ```
//! use mdweb_diagrams::PlantUmlExtension;
//!
//! let extension = PlantUmlExtension::new("https://uml.example.com/svg/");
//! let html = extension.diagram_html("Bob -> Alice : hello").unwrap();
//! assert!(html.starts_with(r#"<img src="https://uml.example.com/svg/"#));
//! ```

mod consts;
mod encoding;
mod plantuml;

pub use consts::DEFAULT_SERVER_URL;
pub use encoding::{encode64, encode_diagram};
pub use plantuml::PlantUmlExtension;
