use crate::http::headers::{Headers, Message};
use crate::http::request::HTTP_1_1;

/// HTTP status codes the server can produce.
///
/// The set is closed: a status outside this registry can never be composed.
/// - `Ok` (200): resource served
/// - `NotModified` (304): conditional GET matched the current ETag
/// - `Forbidden` (403): resource exists but cannot be read
/// - `NotFound` (404): resource does not exist
/// - `NotAcceptable` (406): no acceptable content encoding
/// - `RequestTimeout` (408): connection idle for too long
/// - `InternalServerError` (500): unexpected fault while serving
/// - `HttpVersionNotSupported` (505): request was not HTTP/1.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    NotModified,
    Forbidden,
    NotFound,
    NotAcceptable,
    RequestTimeout,
    InternalServerError,
    HttpVersionNotSupported,
}

impl StatusCode {
    pub const ALL: [StatusCode; 8] = [
        StatusCode::Ok,
        StatusCode::NotModified,
        StatusCode::Forbidden,
        StatusCode::NotFound,
        StatusCode::NotAcceptable,
        StatusCode::RequestTimeout,
        StatusCode::InternalServerError,
        StatusCode::HttpVersionNotSupported,
    ];

    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use lantern::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NotModified => 304,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::NotAcceptable => 406,
            StatusCode::RequestTimeout => 408,
            StatusCode::InternalServerError => 500,
            StatusCode::HttpVersionNotSupported => 505,
        }
    }

    /// Looks up a numeric code in the registry.
    ///
    /// ```
    /// # use lantern::http::response::StatusCode;
    /// assert_eq!(StatusCode::from_u16(304), Some(StatusCode::NotModified));
    /// assert_eq!(StatusCode::from_u16(418), None);
    /// ```
    pub fn from_u16(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_u16() == code)
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NotModified => "Not Modified",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::NotAcceptable => "Not Acceptable",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::HttpVersionNotSupported => "HTTP Version Not Supported",
        }
    }
}

/// Represents a complete HTTP response ready to be sent to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub version: String,
    pub status: StatusCode,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "text/html")
///     .body(b"<p>hi</p>".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(key, value);
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response.
    ///
    /// A non-empty body gets a `Content-Length` header unless one was set
    /// explicitly. Empty bodies are left alone so a 304 carries no length.
    pub fn build(mut self) -> Response {
        if !self.body.is_empty() && !self.headers.contains("Content-Length") {
            self.headers.set("Content-Length", self.body.len().to_string());
        }

        Response {
            version: HTTP_1_1.to_string(),
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        ResponseBuilder::new(status).build()
    }

    /// Whether the server announced it will close the connection.
    pub fn closes_connection(&self) -> bool {
        self.header("Connection") == Some("close")
    }
}

impl Message for Response {
    fn version(&self) -> &str {
        &self.version
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    fn body(&self) -> &[u8] {
        &self.body
    }
}
