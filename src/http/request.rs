use crate::http::headers::{Headers, Message};

pub const HTTP_1_1: &str = "HTTP/1.1";

/// Represents a parsed HTTP request from a client.
///
/// Contains everything extracted from the request line and headers. The
/// body is never framed by the parser and stays empty for parsed requests;
/// it is only populated when a request is built locally for sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Method token as received (e.g. "GET")
    pub method: String,
    /// Request-target (e.g. "/index.html?lang=en")
    pub target: String,
    /// HTTP version (typically "HTTP/1.1")
    pub version: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// Builder for constructing Request objects.
#[derive(Default)]
pub struct RequestBuilder {
    method: Option<String>,
    target: Option<String>,
    version: Option<String>,
    headers: Headers,
    body: Vec<u8>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(key, value);
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method.unwrap_or_else(|| "GET".to_string()),
            target: self.target.ok_or("target missing")?,
            version: self.version.unwrap_or_else(|| HTTP_1_1.to_string()),
            headers: self.headers,
            body: self.body,
        })
    }
}

impl Request {
    /// Whether this request explicitly asks to keep the connection open.
    ///
    /// Only the exact value `keep-alive` counts; a missing header or any
    /// other value means the client is done after this exchange.
    pub fn wants_keep_alive(&self) -> bool {
        self.header("Connection") == Some("keep-alive")
    }
}

impl Message for Request {
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
