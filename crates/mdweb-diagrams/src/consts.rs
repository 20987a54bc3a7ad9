//! Constants for diagram embedding.

/// Default `PlantUML` server endpoint, rendering PNG images.
pub const DEFAULT_SERVER_URL: &str = "http://www.plantuml.com/plantuml/png/";

/// Host of the public `PlantUML` server, which also serves the online editor.
pub(crate) const PUBLIC_HOST: &str = "plantuml.com";

/// Image format segments replaced with the editor segment in editor links.
pub(crate) const FORMAT_SEGMENTS: [&str; 3] = ["/png/", "/svg/", "/txt/"];

pub(crate) const EDITOR_SEGMENT: &str = "/uml/";
