//! Response composition.
//!
//! Maps a parsed [`Request`] to a [`Response`] using a [`Resolver`]. The only
//! state that survives between requests is the connection's [`Session`],
//! which the caller owns and passes in.

use std::sync::Arc;
use std::time::SystemTime;

use crate::http::headers::Message;
use crate::http::negotiate::{etag_matches, negotiate_encoding};
use crate::http::request::{HTTP_1_1, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::resource::{Resolution, Resolver, Resource};

/// Per-connection persistence state.
///
/// Starts persistent; once a request does not ask for `keep-alive` the
/// flag is cleared for the rest of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    persistent: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self { persistent: true }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn observe(&mut self, request: &Request) {
        if !request.wants_keep_alive() {
            self.persistent = false;
        }
    }
}

#[derive(Clone)]
pub struct Composer {
    resolver: Arc<dyn Resolver>,
}

impl Composer {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self { resolver }
    }

    /// Composes the response to one request and updates `session`.
    pub fn compose(&self, session: &mut Session, request: &Request) -> Response {
        session.observe(request);

        let mut response = if request.version != HTTP_1_1 {
            self.compose_error(StatusCode::HttpVersionNotSupported, true, false)
        } else {
            match self.serve(request) {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(
                        path = %request.target,
                        error = %e,
                        "Internal fault while serving request"
                    );
                    self.compose_error(StatusCode::InternalServerError, true, false)
                }
            }
        };

        if !session.is_persistent() {
            response.set_header("Connection", "close");
        }

        tracing::debug!(
            method = %request.method,
            path = %request.target,
            status = response.status.as_u16(),
            "Composed response"
        );

        response
    }

    fn serve(&self, request: &Request) -> anyhow::Result<Response> {
        let resource = match self.resolver.resolve(&request.target)? {
            Resolution::Found(resource) => resource,
            Resolution::NotFound => return Ok(self.compose_error(StatusCode::NotFound, true, false)),
            Resolution::Forbidden => return Ok(self.compose_error(StatusCode::Forbidden, true, false)),
        };

        if let Some(if_none_match) = request.header("If-None-Match") {
            if etag_matches(if_none_match, &resource.etag) {
                let mut response = self.compose_common(StatusCode::NotModified);
                response.set_header("ETag", resource.etag);
                return Ok(response);
            }
        }

        let Ok(coding) = negotiate_encoding(request.header("Accept-Encoding")) else {
            return Ok(self.compose_error(StatusCode::NotAcceptable, true, false));
        };

        let resource = self.resolver.encode(resource, coding)?;
        Ok(self.compose_found(resource))
    }

    fn compose_found(&self, resource: Resource) -> Response {
        let mut response = self.compose_common(StatusCode::Ok);
        response.set_header("ETag", resource.etag);
        response.set_header("Content-Type", resource.content_type);
        response.set_header("Content-Length", resource.content.len().to_string());
        if let Some(encoding) = resource.content_encoding {
            response.set_header("Content-Encoding", encoding);
        }
        response.body = resource.content;
        response
    }

    /// A response carrying only the status and a `Date` header.
    pub fn compose_common(&self, status: StatusCode) -> Response {
        ResponseBuilder::new(status)
            .header("Date", http_date())
            .build()
    }

    /// A minimal response for `status`.
    ///
    /// With `include_body` the body is `<b>{code}</b> {reason}` as HTML. With
    /// `force_close` the response announces `Connection: close` whatever the
    /// session says.
    pub fn compose_error(&self, status: StatusCode, include_body: bool, force_close: bool) -> Response {
        let mut response = self.compose_common(status);

        if include_body {
            let body = format!("<b>{}</b> {}", status.as_u16(), status.reason_phrase());
            response.set_header("Content-Type", "text/html");
            response.set_header("Content-Length", body.len().to_string());
            response.body = body.into_bytes();
        }
        if force_close {
            response.set_header("Connection", "close");
        }

        response
    }
}

/// Current time in IMF-fixdate form, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date() -> String {
    httpdate::fmt_http_date(SystemTime::now())
}
