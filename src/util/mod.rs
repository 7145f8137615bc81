//! Utility functions for common operations.
//!
//! This module provides reusable utilities for:
//!
//! - **Text processing**: HTML stripping, whitespace collapsing, truncation
//!   and headline normalization for feed-supplied text
//! - **URL handling**: endpoint validation and host extraction for the
//!   credibility lookup
//!
//! # Examples
//!
//! ```
//! use headline::util::{host_of, normalize_title, strip_html};
//!
//! let text = strip_html("<p>Hello <b>world</b></p>");
//! assert_eq!(text, "Hello world");
//!
//! assert_eq!(host_of("https://www.example.com/a").as_deref(), Some("example.com"));
//! assert_eq!(normalize_title("Hello, World!"), "hello world");
//! ```

mod text;
mod urls;

pub use self::text::{
    collapse_whitespace, decode_entities, normalize_title, strip_html, truncate_chars,
};
pub use self::urls::{domain_suffixes, host_of, validate_endpoint, UrlError};
