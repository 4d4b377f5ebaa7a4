//! Filesystem-backed resource store
//!
//! Serves files below a content root. Directories resolve to their
//! `index.html`. gzip variants are produced in memory per request and never
//! written back to disk.

use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::Context;
use flate2::Compression;
use flate2::read::GzEncoder;
use url::Url;

use crate::http::mime;
use crate::http::negotiate::ContentCoding;
use crate::resource::{Resolution, Resolver, Resource};

const INDEX_FILE: &str = "index.html";

#[derive(Debug, Clone)]
pub struct FileResolver {
    root: PathBuf,
}

/// Where a request-target points below the root.
enum Location {
    Path(PathBuf),
    NotFound,
    Forbidden,
}

impl FileResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Turns a request-target into a path under the root.
    ///
    /// Query and fragment are dropped and dot-segments are normalised by
    /// `url`. Segments are percent-decoded; a decoded segment that could
    /// step outside the root is refused.
    fn locate(&self, target: &str) -> Location {
        let Ok(base) = Url::parse("http://localhost/") else {
            return Location::NotFound;
        };
        let url = match base.join(target) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(request_target = target, error = %e, "Unparsable request-target");
                return Location::NotFound;
            }
        };

        let mut path = self.root.clone();
        for segment in url.path_segments().into_iter().flatten() {
            if segment.is_empty() {
                continue;
            }
            let Ok(decoded) = urlencoding::decode(segment) else {
                return Location::NotFound;
            };
            if decoded == ".." || decoded == "." || decoded.contains(['/', '\\', '\0']) {
                return Location::Forbidden;
            }
            path.push(&*decoded);
        }

        if path.is_dir() {
            path.push(INDEX_FILE);
        }
        Location::Path(path)
    }
}

impl Resolver for FileResolver {
    fn resolve(&self, target: &str) -> anyhow::Result<Resolution> {
        let path = match self.locate(target) {
            Location::Path(path) => path,
            Location::NotFound => return Ok(Resolution::NotFound),
            Location::Forbidden => return Ok(Resolution::Forbidden),
        };

        let metadata = match std::fs::metadata(&path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Ok(Resolution::NotFound),
            Err(e) => return classify(e, &path),
        };

        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) => return classify(e, &path),
        };

        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        tracing::trace!(path = %path.display(), len = content.len(), "Resolved file");

        Ok(Resolution::Found(Resource {
            etag: format!("\"{:x}-{:x}\"", metadata.len(), modified),
            content_type: mime::from_path(&path).to_string(),
            content_encoding: None,
            content,
        }))
    }

    fn encode(&self, resource: Resource, coding: ContentCoding) -> anyhow::Result<Resource> {
        match coding {
            ContentCoding::Identity => Ok(resource),
            ContentCoding::Gzip => {
                let encoded = {
                    let mut encoder = GzEncoder::new(&resource.content[..], Compression::best());
                    let mut encoded = Vec::new();
                    encoder
                        .read_to_end(&mut encoded)
                        .context("gzip encoding failed")?;
                    encoded
                };

                Ok(Resource {
                    content_encoding: coding.header_value().map(str::to_string),
                    content: encoded,
                    ..resource
                })
            }
        }
    }
}

fn classify(err: std::io::Error, path: &Path) -> anyhow::Result<Resolution> {
    match err.kind() {
        ErrorKind::NotFound | ErrorKind::NotADirectory => Ok(Resolution::NotFound),
        ErrorKind::PermissionDenied => Ok(Resolution::Forbidden),
        _ => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}
