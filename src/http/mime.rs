use std::path::Path;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Guesses a MIME type from a file extension (case-insensitive).
///
/// # Example
///
/// ```
/// # use lantern::http::mime::from_path;
/// assert_eq!(from_path("docs/index.HTML".as_ref()), "text/html");
/// assert_eq!(from_path("blob".as_ref()), "application/octet-stream");
/// ```
pub fn from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("js" | "mjs") => "text/javascript",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("xml") => "text/xml",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("wasm") => "application/wasm",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("mp3") => "audio/mpeg",
        Some("mp4") => "video/mp4",
        _ => DEFAULT_MIME_TYPE,
    }
}
