//! Resource resolution
//!
//! Maps request-targets to content. The composer only talks to the
//! [`Resolver`] trait; [`FileResolver`] is the filesystem-backed store.

pub mod fs;

pub use fs::FileResolver;

use crate::http::negotiate::ContentCoding;

/// Content resolved for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Opaque version tag, already quoted (e.g. `"1a-5f3c"`)
    pub etag: String,
    pub content_type: String,
    /// Set once the content has been transformed, e.g. `gzip`
    pub content_encoding: Option<String>,
    pub content: Vec<u8>,
}

impl Resource {
    pub fn content_length(&self) -> usize {
        self.content.len()
    }
}

/// Outcome of looking up a request-target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(Resource),
    NotFound,
    /// Exists but cannot be read
    Forbidden,
}

/// Read-only store of resources.
///
/// `Err` from either method is an unexpected fault and is reported to the
/// client as a 500.
pub trait Resolver: Send + Sync {
    fn resolve(&self, target: &str) -> anyhow::Result<Resolution>;

    /// Produces a variant of `resource` transformed by `coding`.
    fn encode(&self, resource: Resource, coding: ContentCoding) -> anyhow::Result<Resource>;
}
