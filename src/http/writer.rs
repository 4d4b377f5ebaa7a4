use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::Headers;
use crate::http::request::Request;
use crate::http::response::Response;

fn write_head(buf: &mut Vec<u8>, start_line: &str, headers: &Headers) {
    buf.extend_from_slice(start_line.as_bytes());
    buf.extend_from_slice(b"\r\n");

    for (k, v) in headers.iter() {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");
}

pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128 + resp.body.len());

    let status_line = format!(
        "{} {} {}",
        resp.version,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    write_head(&mut buf, &status_line, &resp.headers);
    buf.extend_from_slice(&resp.body);

    buf
}

pub fn serialize_request(req: &Request) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128 + req.body.len());

    let request_line = format!("{} {} {}", req.method, req.target, req.version);
    write_head(&mut buf, &request_line, &req.headers);
    buf.extend_from_slice(&req.body);

    buf
}

/// Serialized response plus how much of it has reached the socket.
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            buffer: serialize_response(response),
            written: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.written
    }

    /// Writes until every byte is accepted, tolerating short writes.
    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        stream.flush().await?;
        Ok(())
    }
}
