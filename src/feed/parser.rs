use serde::Deserialize;
use thiserror::Error;

/// Errors from decoding a feed document
#[derive(Debug, Error)]
pub enum ParseError {
    /// The bytes did not decode as the expected RSS structure
    #[error("invalid feed document: {0}")]
    Invalid(#[from] quick_xml::DeError),
}

/// One fetched and decoded RSS document.
///
/// Transient: lives only for the duration of a single tick. Text fields are
/// XML-decoded but otherwise uninterpreted; HTML entities and the `pubDate`
/// string are resolved later by the normalizer.
#[derive(Debug, Deserialize)]
#[serde(rename = "rss")]
pub struct RawFeedDocument {
    pub channel: RawChannel,
}

#[derive(Debug, Deserialize)]
pub struct RawChannel {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "item", default)]
    pub items: Vec<RawItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
    /// Kept as text; parsed by the normalizer
    #[serde(rename = "pubDate", default)]
    pub pub_date: String,
}

/// Decode a raw feed document.
///
/// Strict structural decode of the `rss > channel > item*` schema. Malformed
/// structure fails the whole document; there is no partial recovery.
pub fn parse_document(bytes: &[u8]) -> Result<RawFeedDocument, ParseError> {
    let document: RawFeedDocument = quick_xml::de::from_reader(bytes)?;
    Ok(document)
}
