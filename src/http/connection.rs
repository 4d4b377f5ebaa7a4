use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::http::composer::{Composer, Session};
use crate::http::parser::parse_requests;
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;

const READ_CHUNK: usize = 4096;

/// Largest partial header block kept while waiting for its blank line.
pub const MAX_HEAD_BYTES: usize = 64 * 1024;

pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    buffer: BytesMut,
    state: ConnectionState,
    session: Session,
    composer: Composer,
    idle_timeout: Duration,
}

pub enum ConnectionState {
    /// Waiting for request bytes
    Open,
    /// One final response to flush before closing
    Closing(Response),
    Closed,
}

/// Serves one accepted connection until it is closed.
pub async fn handle_connection<S>(
    stream: S,
    peer: SocketAddr,
    idle_timeout: Duration,
    composer: Composer,
) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    Connection::new(stream, peer, idle_timeout, composer).run().await
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: SocketAddr, idle_timeout: Duration, composer: Composer) -> Self {
        Self {
            stream,
            peer,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            state: ConnectionState::Open,
            session: Session::new(),
            composer,
            idle_timeout,
        }
    }

    pub fn session(&self) -> Session {
        self.session
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Open => {
                    self.state = self.read_and_serve().await?;
                }

                ConnectionState::Closing(notice) => {
                    self.write_response(&notice).await?;
                    self.state = ConnectionState::Closed;
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(peer = %self.peer, error = %e, "Shutdown after close failed");
        }
        tracing::debug!(peer = %self.peer, "Connection closed");

        Ok(())
    }

    /// One read followed by every response it makes possible.
    async fn read_and_serve(&mut self) -> anyhow::Result<ConnectionState> {
        self.buffer.reserve(READ_CHUNK);

        let n = match timeout(self.idle_timeout, self.stream.read_buf(&mut self.buffer)).await {
            Ok(read) => read?,
            Err(_) => {
                tracing::info!(peer = %self.peer, timeout = ?self.idle_timeout, "Connection idle, closing");
                let notice = self
                    .composer
                    .compose_error(StatusCode::RequestTimeout, true, true);
                return Ok(ConnectionState::Closing(notice));
            }
        };

        if n == 0 {
            // Client closed connection
            return Ok(ConnectionState::Closed);
        }

        let batch = parse_requests(&self.buffer);
        self.buffer.advance(batch.consumed);

        for parsed in batch.requests {
            match parsed {
                Ok(request) => {
                    let response = self.compose(request).await;
                    self.write_response(&response).await?;
                }
                Err(e) => {
                    tracing::warn!(peer = %self.peer, error = %e, "Rejected malformed request");
                }
            }
        }

        if !self.session.is_persistent() {
            return Ok(ConnectionState::Closed);
        }

        if self.buffer.len() > MAX_HEAD_BYTES {
            tracing::warn!(
                peer = %self.peer,
                buffered = self.buffer.len(),
                "Request head too large, closing"
            );
            return Ok(ConnectionState::Closed);
        }

        Ok(ConnectionState::Open)
    }

    /// Runs composition on the blocking pool since resolving touches the
    /// filesystem. A panic there is reported as a 500.
    async fn compose(&mut self, request: Request) -> Response {
        let composer = self.composer.clone();
        let mut session = self.session;
        // Used only if the task never hands its session back.
        let mut fallback = self.session;
        fallback.observe(&request);

        let task = tokio::task::spawn_blocking(move || {
            let response = composer.compose(&mut session, &request);
            (response, session)
        });

        match task.await {
            Ok((response, session)) => {
                self.session = session;
                response
            }
            Err(e) => {
                tracing::error!(peer = %self.peer, error = %e, "Composition task failed");
                self.session = fallback;
                let close = !self.session.is_persistent();
                self.composer
                    .compose_error(StatusCode::InternalServerError, true, close)
            }
        }
    }

    async fn write_response(&mut self, response: &Response) -> anyhow::Result<()> {
        let mut writer = ResponseWriter::new(response);
        writer.write_to_stream(&mut self.stream).await
    }
}
