//! Connection state machine driven over an in-memory socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use lantern::http::composer::Composer;
use lantern::http::connection::{Connection, handle_connection};
use lantern::http::headers::Message;
use lantern::http::parser::{ParseError, parse_response};
use lantern::http::response::{Response, StatusCode};
use lantern::resource::FileResolver;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

const IDLE: Duration = Duration::from_millis(300);

fn peer() -> SocketAddr {
    "127.0.0.1:50000".parse().unwrap()
}

fn content_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a"), "twelve bytes").unwrap();
    dir
}

fn start(root: &TempDir, idle: Duration) -> (DuplexStream, JoinHandle<anyhow::Result<()>>) {
    let (client, server) = tokio::io::duplex(16 * 1024);
    let composer = Composer::new(Arc::new(FileResolver::new(root.path())));
    let task = tokio::spawn(handle_connection(server, peer(), idle, composer));
    (client, task)
}

/// Reads until `count` complete responses have arrived.
async fn read_responses(client: &mut DuplexStream, count: usize) -> Vec<Response> {
    let mut buf = Vec::new();
    let mut responses = Vec::new();

    while responses.len() < count {
        match parse_response(&buf) {
            Ok((resp, used)) => {
                responses.push(resp);
                buf.drain(..used);
                continue;
            }
            Err(ParseError::Incomplete) => {}
            Err(e) => panic!("bad response: {}", e),
        }

        let mut chunk = [0u8; 1024];
        let n = client.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed after {} responses", responses.len());
        buf.extend_from_slice(&chunk[..n]);
    }

    assert!(buf.is_empty(), "unexpected trailing bytes");
    responses
}

async fn assert_closed(client: &mut DuplexStream) {
    let mut rest = Vec::new();
    client.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_pipelined_requests_answered_in_order() {
    let root = content_root();
    let (mut client, task) = start(&root, IDLE);

    client
        .write_all(
            b"GET /a HTTP/1.1\r\nConnection: keep-alive\r\n\r\n\
              GET /b HTTP/1.1\r\nConnection: keep-alive\r\n\r\n",
        )
        .await
        .unwrap();

    let responses = read_responses(&mut client, 2).await;
    assert_eq!(responses[0].status, StatusCode::Ok);
    assert_eq!(responses[0].header("Content-Length"), Some("12"));
    assert_eq!(responses[0].body, b"twelve bytes".to_vec());
    assert_eq!(responses[1].status, StatusCode::NotFound);
    assert!(!responses[1].body.is_empty());

    drop(client);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_request_split_across_reads() {
    let root = content_root();
    let (mut client, task) = start(&root, IDLE);

    client.write_all(b"GET /a HTTP/1.1\r\nConn").await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    client
        .write_all(b"ection: keep-alive\r\n\r\n")
        .await
        .unwrap();

    let responses = read_responses(&mut client, 1).await;
    assert_eq!(responses[0].status, StatusCode::Ok);
    assert!(!responses[0].closes_connection());

    drop(client);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_connection_close_ends_after_batch() {
    let root = content_root();
    let (mut client, task) = start(&root, IDLE);

    client
        .write_all(b"GET /a HTTP/1.1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let responses = read_responses(&mut client, 1).await;
    assert!(responses[0].closes_connection());
    assert_closed(&mut client).await;
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_close_is_sticky_within_a_batch() {
    let root = content_root();
    let (mut client, task) = start(&root, IDLE);

    client
        .write_all(
            b"GET /a HTTP/1.1\r\n\r\n\
              GET /a HTTP/1.1\r\nConnection: keep-alive\r\n\r\n",
        )
        .await
        .unwrap();

    let responses = read_responses(&mut client, 2).await;
    assert!(responses.iter().all(|r| r.closes_connection()));
    assert_closed(&mut client).await;
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_idle_timeout_sends_408_and_closes() {
    let root = content_root();
    let (mut client, task) = start(&root, Duration::from_millis(50));

    let responses = read_responses(&mut client, 1).await;
    assert_eq!(responses[0].status, StatusCode::RequestTimeout);
    assert!(responses[0].closes_connection());
    assert_eq!(responses[0].body, b"<b>408</b> Request Timeout".to_vec());

    assert_closed(&mut client).await;
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_timeout_after_keep_alive_exchange() {
    let root = content_root();
    let (mut client, task) = start(&root, Duration::from_millis(100));

    client
        .write_all(b"GET /a HTTP/1.1\r\nConnection: keep-alive\r\n\r\n")
        .await
        .unwrap();

    let responses = read_responses(&mut client, 2).await;
    assert_eq!(responses[0].status, StatusCode::Ok);
    assert_eq!(responses[1].status, StatusCode::RequestTimeout);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_timeout_with_partial_head_buffered() {
    let root = content_root();
    let (mut client, task) = start(&root, Duration::from_millis(100));

    client
        .write_all(b"GET /a HTTP/1.1\r\nHost: localhost\r\n")
        .await
        .unwrap();

    let responses = read_responses(&mut client, 1).await;
    assert_eq!(responses[0].status, StatusCode::RequestTimeout);
    assert!(responses[0].closes_connection());

    assert_closed(&mut client).await;
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_peer_close_sends_nothing() {
    let root = content_root();
    let (mut client, task) = start(&root, IDLE);

    client.shutdown().await.unwrap();

    assert_closed(&mut client).await;
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_malformed_request_is_skipped() {
    let root = content_root();
    let (mut client, task) = start(&root, IDLE);

    client
        .write_all(
            b"NONSENSE\r\n\r\n\
              GET /a HTTP/1.1\r\nConnection: keep-alive\r\n\r\n",
        )
        .await
        .unwrap();

    let responses = read_responses(&mut client, 1).await;
    assert_eq!(responses[0].status, StatusCode::Ok);

    drop(client);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_version_mismatch_keeps_connection() {
    let root = content_root();
    let (mut client, task) = start(&root, IDLE);

    client
        .write_all(b"GET /a HTTP/1.0\r\nConnection: keep-alive\r\n\r\n")
        .await
        .unwrap();
    let first = read_responses(&mut client, 1).await;
    assert_eq!(first[0].status, StatusCode::HttpVersionNotSupported);

    client
        .write_all(b"GET /a HTTP/1.1\r\nConnection: keep-alive\r\n\r\n")
        .await
        .unwrap();
    let second = read_responses(&mut client, 1).await;
    assert_eq!(second[0].status, StatusCode::Ok);

    drop(client);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_oversized_head_closes_connection() {
    let root = content_root();
    let (mut client, task) = start(&root, IDLE);

    let mut junk = b"GET /a HTTP/1.1\r\nX-Filler: ".to_vec();
    junk.resize(70 * 1024, b'x');
    let writer = tokio::spawn(async move {
        // The server may close before everything is written.
        let _ = client.write_all(&junk).await;
        client
    });

    task.await.unwrap().unwrap();
    let mut client = writer.await.unwrap();
    assert_closed(&mut client).await;
}

#[tokio::test]
async fn test_session_survives_keep_alive() {
    let root = content_root();
    let (mut client, server) = tokio::io::duplex(4096);
    let composer = Composer::new(Arc::new(FileResolver::new(root.path())));
    let mut conn = Connection::new(server, peer(), IDLE, composer);

    client
        .write_all(b"GET /a HTTP/1.1\r\nConnection: keep-alive\r\n\r\n")
        .await
        .unwrap();
    client.shutdown().await.unwrap();

    conn.run().await.unwrap();
    assert!(conn.session().is_persistent());
    assert_eq!(read_responses(&mut client, 1).await[0].status, StatusCode::Ok);
}
