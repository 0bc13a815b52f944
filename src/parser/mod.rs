//! Shared extraction helpers used by every source adapter.
//!
//! - [`html`]: scraper-backed document queries with "first non-empty" fallbacks
//! - [`jsonp`]: recovers JSON from JSONP callbacks and embedded script tags
//! - [`bbcode`]: converts rich-text markup into the BBCode dialect

pub mod bbcode;
pub mod html;
pub mod jsonp;

pub use bbcode::html_to_bbcode;
pub use html::Document;
pub use jsonp::{as_text, parse_embedded_json, parse_jsonp};
