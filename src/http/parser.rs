use thiserror::Error;

use crate::http::headers::Headers;
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};

const HEADERS_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("request line must be `METHOD TARGET VERSION`")]
    InvalidRequestLine,
    #[error("malformed status line")]
    InvalidStatusLine,
    #[error("status {0} is not in the registry")]
    UnknownStatus(u16),
    #[error("header block is not valid UTF-8")]
    InvalidEncoding,
    #[error("invalid Content-Length")]
    InvalidContentLength,
    #[error("incomplete message")]
    Incomplete,
}

/// Units extracted from one buffer.
///
/// `requests` holds one entry per complete unit, in arrival order; a unit
/// that failed to decode is kept as its error so the caller can log it.
/// `consumed` counts the bytes up to the last delimiter seen; anything after
/// it is a partial unit that must stay buffered.
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub requests: Vec<Result<Request, ParseError>>,
    pub consumed: usize,
}

/// Splits a buffer into pipelined request units and decodes each one.
///
/// A unit ends at the first blank line. Empty units (consecutive
/// delimiters) are discarded and leading whitespace is trimmed. Bytes after
/// a blank line are treated as the start of the next unit.
pub fn parse_requests(buf: &[u8]) -> ParsedBatch {
    let mut batch = ParsedBatch::default();

    while let Some(end) = find_headers_end(&buf[batch.consumed..]) {
        let unit = trim_leading_whitespace(&buf[batch.consumed..batch.consumed + end]);
        batch.consumed += end + HEADERS_END.len();

        if unit.is_empty() {
            continue;
        }
        batch.requests.push(parse_request(unit));
    }

    // Whitespace-only leftovers are not the start of a request.
    if trim_leading_whitespace(&buf[batch.consumed..]).is_empty() {
        batch.consumed = buf.len();
    }

    batch
}

/// Decodes one request unit (without its terminating blank line).
pub fn parse_request(unit: &[u8]) -> Result<Request, ParseError> {
    let head = std::str::from_utf8(unit).map_err(|_| ParseError::InvalidEncoding)?;
    let mut lines = head.split("\r\n");

    let request_line = lines.next().ok_or(ParseError::InvalidRequestLine)?;
    let parts: Vec<&str> = request_line.split(' ').collect();
    let [method, target, version] = parts[..] else {
        return Err(ParseError::InvalidRequestLine);
    };
    if method.is_empty() || target.is_empty() || version.is_empty() {
        return Err(ParseError::InvalidRequestLine);
    }

    Ok(Request {
        method: method.to_string(),
        target: target.to_string(),
        version: version.to_string(),
        headers: parse_header_lines(lines),
        body: Vec::new(),
    })
}

/// Parses a response, framing the body by `Content-Length`.
///
/// Returns the response and the number of bytes it occupied.
pub fn parse_response(buf: &[u8]) -> Result<(Response, usize), ParseError> {
    let headers_end = find_headers_end(buf).ok_or(ParseError::Incomplete)?;
    let head = std::str::from_utf8(&buf[..headers_end]).map_err(|_| ParseError::InvalidEncoding)?;
    let mut lines = head.split("\r\n");

    let status_line = lines.next().ok_or(ParseError::InvalidStatusLine)?;
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().ok_or(ParseError::InvalidStatusLine)?;
    let code: u16 = parts
        .next()
        .and_then(|c| c.parse().ok())
        .ok_or(ParseError::InvalidStatusLine)?;
    let status = StatusCode::from_u16(code).ok_or(ParseError::UnknownStatus(code))?;

    let headers = parse_header_lines(lines);

    let content_length = headers
        .get("Content-Length")
        .map(|v| v.parse::<usize>().map_err(|_| ParseError::InvalidContentLength))
        .transpose()?
        .unwrap_or(0);

    let body_start = headers_end + HEADERS_END.len();
    if buf.len() < body_start + content_length {
        return Err(ParseError::Incomplete);
    }

    let response = Response {
        version: version.to_string(),
        status,
        headers,
        body: buf[body_start..body_start + content_length].to_vec(),
    };

    Ok((response, body_start + content_length))
}

/// `name: value` lines. A line without the `: ` separator (or with an empty
/// name) is skipped.
fn parse_header_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Headers {
    let mut headers = Headers::new();

    for line in lines {
        match line.split_once(": ") {
            Some((name, value)) if !name.is_empty() => headers.set(name, value.trim()),
            _ => {
                if !line.is_empty() {
                    tracing::debug!(line, "Skipping malformed header line");
                }
            }
        }
    }

    headers
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADERS_END.len()).position(|w| w == HEADERS_END)
}

fn trim_leading_whitespace(buf: &[u8]) -> &[u8] {
    let start = buf
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(buf.len());
    &buf[start..]
}
