//! Utility functions shared by the feed pipeline and the renderer.
//!
//! - **URL validation**: syntactic checks for configured feed URLs, with an
//!   optional policy that rejects loopback and private-network hosts
//! - **Text processing**: control-character stripping and HTML-to-text
//! - **Time**: cutoff parsing for the command line
//!
//! # Examples
//!
//! ```
//! use rss_digest::util::{html_to_text, validate_url};
//!
//! let url = validate_url("https://example.com/feed.xml").unwrap();
//! assert_eq!(url.host_str(), Some("example.com"));
//!
//! assert_eq!(html_to_text("<em>hi</em>"), "hi");
//! ```

mod text;
mod time;
mod url_validator;

pub use text::{html_to_text, strip_control_chars};
pub use time::{parse_cutoff, parse_cutoff_at};
pub use url_validator::{validate_public_url, validate_url, UrlValidationError};
