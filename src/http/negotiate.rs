//! Content-encoding negotiation and ETag matching.
//!
//! Selection rule for `Accept-Encoding`:
//!
//! 1. Only `gzip`, `identity` and `*` are recognized; other tokens are ignored.
//! 2. Among recognized tokens with a positive quality, the highest quality
//!    wins. Equal qualities resolve by preference `gzip`, then `identity`,
//!    then `*`. A winning `*` is served as `identity`, unless `identity`
//!    is listed with `q=0`; then it is served as `gzip`, or 406 when `gzip`
//!    is refused too.
//! 3. With no positive token, `identity` is still served unless the client
//!    excluded it, either with `identity;q=0` or with `*;q=0` while not
//!    listing `identity`. An excluded `identity` means 406.
//!
//! A missing or empty header selects `identity`. A `q` value that does not
//! parse counts as `1.0`.

use std::cmp::Ordering;

/// A transformation the server can apply to a resource body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCoding {
    Gzip,
    Identity,
}

impl ContentCoding {
    /// The `Content-Encoding` header value, if any.
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            ContentCoding::Gzip => Some("gzip"),
            ContentCoding::Identity => None,
        }
    }
}

/// Nothing the client accepts can be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotAcceptable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Gzip,
    Identity,
    Any,
}

impl Token {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gzip" => Some(Token::Gzip),
            "identity" => Some(Token::Identity),
            "*" => Some(Token::Any),
            _ => None,
        }
    }

    // Higher is preferred on equal quality.
    fn preference(&self) -> u8 {
        match self {
            Token::Gzip => 2,
            Token::Identity => 1,
            Token::Any => 0,
        }
    }
}

/// Splits an `Accept-Encoding` value into `(token, quality)` pairs,
/// keeping only recognized tokens.
fn accepted_tokens(header: &str) -> Vec<(Token, f32)> {
    header
        .split(',')
        .filter_map(|item| {
            let mut params = item.split(';');
            let token = Token::parse(params.next()?.trim())?;
            let quality = params
                .find_map(|p| p.trim().strip_prefix("q="))
                .map(|q| q.trim().parse::<f32>().unwrap_or(1.0))
                .unwrap_or(1.0);
            Some((token, quality))
        })
        .collect()
}

/// Picks the coding to serve for the given `Accept-Encoding` header.
pub fn negotiate_encoding(header: Option<&str>) -> Result<ContentCoding, NotAcceptable> {
    let header = header.map(str::trim).unwrap_or("");
    if header.is_empty() {
        return Ok(ContentCoding::Identity);
    }

    let tokens = accepted_tokens(header);

    let best = tokens
        .iter()
        .filter(|(_, q)| *q > 0.0)
        .max_by(|(ta, qa), (tb, qb)| {
            qa.partial_cmp(qb)
                .unwrap_or(Ordering::Equal)
                .then(ta.preference().cmp(&tb.preference()))
        });

    let quality_of = |wanted: Token| {
        tokens
            .iter()
            .find(|(t, _)| *t == wanted)
            .map(|(_, q)| *q)
    };
    let refused = |wanted: Token| quality_of(wanted).is_some_and(|q| q <= 0.0);

    if let Some((token, _)) = best {
        return match token {
            Token::Gzip => Ok(ContentCoding::Gzip),
            Token::Identity => Ok(ContentCoding::Identity),
            Token::Any if !refused(Token::Identity) => Ok(ContentCoding::Identity),
            Token::Any if !refused(Token::Gzip) => Ok(ContentCoding::Gzip),
            Token::Any => Err(NotAcceptable),
        };
    }

    let identity_excluded = match quality_of(Token::Identity) {
        Some(q) => q <= 0.0,
        None => quality_of(Token::Any).is_some_and(|q| q <= 0.0),
    };

    if identity_excluded {
        Err(NotAcceptable)
    } else {
        Ok(ContentCoding::Identity)
    }
}

/// Whether an `If-None-Match` value matches the resource's ETag.
///
/// Entries are comma separated; quotes and weak `W/` markers are ignored on
/// both sides and `*` matches any ETag.
pub fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    let ours = strip_etag(etag);
    if_none_match.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || (!candidate.is_empty() && strip_etag(candidate) == ours)
    })
}

fn strip_etag(tag: &str) -> &str {
    let tag = tag.trim();
    let tag = tag.strip_prefix("W/").unwrap_or(tag);
    tag.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsable_quality_defaults_to_one() {
        let tokens = accepted_tokens("gzip;q=abc, identity;q=0.2");
        assert_eq!(tokens, vec![(Token::Gzip, 1.0), (Token::Identity, 0.2)]);
    }

    #[test]
    fn unknown_tokens_are_dropped() {
        let tokens = accepted_tokens("br, deflate;q=0.9, gzip");
        assert_eq!(tokens, vec![(Token::Gzip, 1.0)]);
    }

    #[test]
    fn weak_and_quoted_tags_compare_equal() {
        assert!(etag_matches("W/\"abc\"", "\"abc\""));
        assert!(etag_matches("abc", "\"abc\""));
        assert!(!etag_matches("\"abd\"", "\"abc\""));
    }
}
