use chrono::{DateTime, Utc};
use htmlescape::decode_html;

use crate::storage::CandidatePost;

use super::parser::RawItem;

/// RFC 1123 with a numeric zone, e.g. `Mon, 02 Jan 2006 15:04:05 -0700`
const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Turn one raw item into a storable candidate post.
///
/// This step never fails. Title and description are HTML-unescaped and, like
/// the link, become absent when empty. An unparseable `pubDate` degrades to
/// the current wall-clock time rather than rejecting the item; losing the
/// original publish time is preferred over losing the post.
pub fn normalize(item: RawItem, feed_id: i64) -> CandidatePost {
    let published_at = parse_pub_date(&item.pub_date).unwrap_or_else(Utc::now);

    CandidatePost {
        feed_id,
        title: unescaped_or_absent(&item.title),
        url: non_empty(item.link),
        description: unescaped_or_absent(&item.description),
        published_at,
    }
}

fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, PUB_DATE_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Longest named HTML entity is 31 characters plus the delimiters
const MAX_ENTITY_SPAN: usize = 33;

fn unescaped_or_absent(raw: &str) -> Option<String> {
    non_empty(lenient_decode(raw))
}

/// Decode HTML entities, keeping anything undecodable verbatim.
///
/// `decode_html` rejects the whole input on the first stray ampersand, which
/// would leave every well-formed entity in the text escaped. When that
/// happens, re-scan the text and decode each `&...;` span on its own; spans
/// that still fail to decode, and bare ampersands, pass through untouched.
fn lenient_decode(raw: &str) -> String {
    match decode_html(raw) {
        Ok(decoded) => decoded,
        Err(_) => {
            let mut out = String::with_capacity(raw.len());
            let mut rest = raw;
            while let Some(amp) = rest.find('&') {
                out.push_str(&rest[..amp]);
                rest = &rest[amp..];
                let span = rest[1..]
                    .find(';')
                    .filter(|&semi| semi + 2 <= MAX_ENTITY_SPAN)
                    .map(|semi| semi + 2);
                let decoded =
                    span.and_then(|len| decode_html(&rest[..len]).ok().map(|text| (len, text)));
                match decoded {
                    Some((len, text)) => {
                        out.push_str(&text);
                        rest = &rest[len..];
                    }
                    None => {
                        out.push('&');
                        rest = &rest[1..];
                    }
                }
            }
            out.push_str(rest);
            out
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
