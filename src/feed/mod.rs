//! Fetching, parsing, and normalization of RSS documents.
//!
//! The three submodules mirror the three stages a feed passes through on
//! its way into the store:
//!
//! - [`fetcher`] - bounded HTTP retrieval of the raw document
//! - [`parser`] - strict structural decode into [`parser::RawFeedDocument`]
//! - [`normalize`] - per-item cleanup into a storable candidate post
//!
//! The parser deliberately leaves text interpretation (HTML entities,
//! timestamp parsing) to the normalizer, so malformed content in one item
//! never fails the whole document.

mod fetcher;
mod normalize;
mod parser;

pub use fetcher::{fetch_document, http_client, FetchError, USER_AGENT};
pub use normalize::normalize;
pub use parser::{parse_document, ParseError, RawFeedDocument, RawItem};
