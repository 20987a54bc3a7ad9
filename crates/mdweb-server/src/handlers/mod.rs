//! HTTP request handlers.

pub(crate) mod pages;

use percent_encoding::percent_decode_str;

/// Percent-decode a request path.
///
/// Invalid UTF-8 sequences become U+FFFD.
pub(crate) fn decode_path(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}
