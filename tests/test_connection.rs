//! End-to-end tests of the connection loop over an in-memory stream.

use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use vhttpd::http::connection::{Connection, ReadOutcome};
use vhttpd::http::reader::MAX_LINE_LENGTH;
use vhttpd::logging::init_test_logging;
use vhttpd::vhost::VirtualHosts;

const READ_TIMEOUT: Duration = Duration::from_millis(200);
const INDEX: &str = "<h1>home</h1>";
const NOTES: &str = "some notes\n";

struct Site {
    _dir: TempDir,
    vhosts: Arc<VirtualHosts>,
}

fn site() -> Site {
    init_test_logging();

    let dir = TempDir::new().unwrap();
    let root = dir.path().join("www");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("index.html"), INDEX).unwrap();
    fs::write(root.join("notes.txt"), NOTES).unwrap();
    fs::write(dir.path().join("private.txt"), "private").unwrap();

    let vhosts = VirtualHosts::new([("site.test", &root)]).unwrap();
    Site {
        _dir: dir,
        vhosts: Arc::new(vhosts),
    }
}

fn spawn(site: &Site) -> (DuplexStream, JoinHandle<()>) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let vhosts = Arc::clone(&site.vhosts);
    let handle = tokio::spawn(async move {
        Connection::new(server, vhosts)
            .with_read_timeout(READ_TIMEOUT)
            .run()
            .await;
    });
    (client, handle)
}

/// Sends `input`, then collects everything the server writes until it closes.
async fn exchange(site: &Site, input: &[u8]) -> String {
    let (mut client, handle) = spawn(site);
    client.write_all(input).await.unwrap();

    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut out))
        .await
        .expect("server never closed the connection")
        .unwrap();
    handle.await.unwrap();

    String::from_utf8(out).unwrap()
}

fn status_lines(out: &str) -> Vec<&str> {
    out.split("\r\n")
        .filter(|line| line.starts_with("HTTP/1.1 "))
        .collect()
}

fn header<'a>(out: &'a str, name: &str) -> Option<&'a str> {
    let prefix = format!("{name}: ");
    out.split("\r\n")
        .find_map(|line| line.strip_prefix(prefix.as_str()))
}

#[tokio::test]
async fn test_get_existing_file() {
    let site = site();
    let out = exchange(
        &site,
        b"GET /notes.txt HTTP/1.1\r\nHost: site.test\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert_eq!(status_lines(&out), vec!["HTTP/1.1 200 OK"]);
    assert_eq!(header(&out, "Content-Length"), Some("11"));
    assert_eq!(header(&out, "Content-Type"), Some("text/plain; charset=utf-8"));
    assert_eq!(header(&out, "Connection"), Some("close"));
    assert!(header(&out, "Last-Modified").is_some());
    assert!(header(&out, "Date").is_some());
    assert!(out.ends_with(&format!("\r\n\r\n{NOTES}")));
}

#[tokio::test]
async fn test_get_root_serves_index() {
    let site = site();
    let out = exchange(
        &site,
        b"GET / HTTP/1.1\r\nHost: site.test\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert_eq!(status_lines(&out), vec!["HTTP/1.1 200 OK"]);
    assert_eq!(header(&out, "Content-Length"), Some("13"));
    assert!(out.ends_with(INDEX));
}

#[tokio::test]
async fn test_headers_are_sorted_on_the_wire() {
    let site = site();
    let out = exchange(
        &site,
        b"GET /notes.txt HTTP/1.1\r\nHost: site.test\r\nConnection: close\r\n\r\n",
    )
    .await;

    let names: Vec<&str> = out
        .split("\r\n")
        .skip(1)
        .take_while(|line| !line.is_empty())
        .map(|line| line.split_once(": ").unwrap().0)
        .collect();
    let mut sorted = names.clone();
    sorted.sort();

    assert_eq!(names, sorted);
    assert_eq!(names.len(), 5);
}

#[tokio::test]
async fn test_missing_file_is_404_and_keeps_connection_open() {
    let site = site();
    let out = exchange(
        &site,
        b"GET /missing.html HTTP/1.1\r\nHost: site.test\r\n\r\n\
          GET /notes.txt HTTP/1.1\r\nHost: site.test\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert_eq!(
        status_lines(&out),
        vec!["HTTP/1.1 404 Not Found", "HTTP/1.1 200 OK"]
    );
}

#[tokio::test]
async fn test_unknown_host_is_404() {
    let site = site();
    let out = exchange(
        &site,
        b"GET /notes.txt HTTP/1.1\r\nHost: nowhere.test\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert_eq!(status_lines(&out), vec!["HTTP/1.1 404 Not Found"]);
}

#[tokio::test]
async fn test_traversal_is_404() {
    let site = site();
    let out = exchange(
        &site,
        b"GET /../private.txt HTTP/1.1\r\nHost: site.test\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert_eq!(status_lines(&out), vec!["HTTP/1.1 404 Not Found"]);
    assert!(!out.contains("private"));
}

#[tokio::test]
async fn test_pipelined_requests_share_connection() {
    let site = site();
    let out = exchange(
        &site,
        b"GET /notes.txt HTTP/1.1\r\nHost: site.test\r\n\r\n\
          GET / HTTP/1.1\r\nHost: site.test\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert_eq!(status_lines(&out), vec!["HTTP/1.1 200 OK", "HTTP/1.1 200 OK"]);
    assert!(out.contains(NOTES));
    assert!(out.ends_with(INDEX));
}

#[tokio::test]
async fn test_close_stops_before_next_request() {
    let site = site();
    let out = exchange(
        &site,
        b"GET /notes.txt HTTP/1.1\r\nHost: site.test\r\nConnection: close\r\n\r\n\
          GET / HTTP/1.1\r\nHost: site.test\r\n\r\n",
    )
    .await;

    assert_eq!(status_lines(&out), vec!["HTTP/1.1 200 OK"]);
    assert!(!out.contains(INDEX));
}

#[tokio::test]
async fn test_keep_alive_connection_closes_when_idle() {
    let site = site();
    let out = exchange(&site, b"GET /notes.txt HTTP/1.1\r\nHost: site.test\r\n\r\n").await;

    assert_eq!(status_lines(&out), vec!["HTTP/1.1 200 OK"]);
    assert_eq!(header(&out, "Connection"), None);
}

#[tokio::test]
async fn test_bad_requests_get_400_and_close() {
    let site = site();
    let overlong = format!(
        "GET /{} HTTP/1.1\r\nHost: site.test\r\n\r\n",
        "a".repeat(MAX_LINE_LENGTH)
    );
    let cases: Vec<Vec<u8>> = vec![
        b"POST / HTTP/1.1\r\nHost: site.test\r\n\r\n".to_vec(),
        b"GET / HTTP/1.0\r\nHost: site.test\r\n\r\n".to_vec(),
        b"GET notes.txt HTTP/1.1\r\nHost: site.test\r\n\r\n".to_vec(),
        b"GET / HTTP/1.1\r\nUser-Agent: test\r\n\r\n".to_vec(),
        b"GET / HTTP/1.1\r\nHost site.test\r\n\r\n".to_vec(),
        overlong.into_bytes(),
    ];

    for mut input in cases {
        // The follow-up request must never be answered.
        input.extend_from_slice(b"GET / HTTP/1.1\r\nHost: site.test\r\n\r\n");

        let out = exchange(&site, &input).await;
        assert_eq!(status_lines(&out), vec!["HTTP/1.1 400 Bad Request"]);
        assert_eq!(header(&out, "Connection"), Some("close"));
        assert!(out.ends_with("\r\n\r\n"));
    }
}

#[tokio::test]
async fn test_idle_connection_closes_silently() {
    let site = site();
    let start = Instant::now();
    let out = exchange(&site, b"").await;
    let elapsed = start.elapsed();

    assert!(out.is_empty());
    assert!(elapsed >= READ_TIMEOUT, "closed after {elapsed:?}");
    assert!(elapsed < READ_TIMEOUT * 5, "closed after {elapsed:?}");
}

#[tokio::test]
async fn test_peer_close_without_bytes_is_silent() {
    let site = site();
    let (mut client, handle) = spawn(&site);
    client.shutdown().await.unwrap();

    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    handle.await.unwrap();

    assert!(out.is_empty());
}

#[tokio::test]
async fn test_partial_request_then_timeout_is_400() {
    let site = site();
    let out = exchange(&site, b"GET /notes.txt HTTP/1.1\r\nHost: site.test\r\n").await;

    assert_eq!(status_lines(&out), vec!["HTTP/1.1 400 Bad Request"]);
}

#[tokio::test]
async fn test_partial_request_then_peer_close_is_400() {
    let site = site();
    let (mut client, handle) = spawn(&site);
    client.write_all(b"GET /notes.txt HTT").await.unwrap();
    client.shutdown().await.unwrap();

    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    handle.await.unwrap();

    let out = String::from_utf8(out).unwrap();
    assert_eq!(status_lines(&out), vec!["HTTP/1.1 400 Bad Request"]);
}

#[tokio::test]
async fn test_read_request_outcomes() {
    let site = site();

    let (_client, server) = tokio::io::duplex(1024);
    let mut conn = Connection::new(server, Arc::clone(&site.vhosts))
        .with_read_timeout(Duration::from_millis(50));
    assert!(matches!(conn.read_request().await, ReadOutcome::IdleTimeout));

    let (mut client, server) = tokio::io::duplex(1024);
    let mut conn = Connection::new(server, Arc::clone(&site.vhosts))
        .with_read_timeout(Duration::from_millis(50));
    client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
    assert!(matches!(conn.read_request().await, ReadOutcome::PartialTimeout));

    let (mut client, server) = tokio::io::duplex(1024);
    let mut conn = Connection::new(server, Arc::clone(&site.vhosts));
    client.write_all(b"GET / HTTP/1.1\r\nHost: site.test\r\n\r\n").await.unwrap();
    assert!(matches!(
        conn.read_request().await,
        ReadOutcome::Success(req) if req.host == "site.test"
    ));

    let (client, server) = tokio::io::duplex(1024);
    drop(client);
    let mut conn = Connection::new(server, Arc::clone(&site.vhosts));
    assert!(matches!(conn.read_request().await, ReadOutcome::CleanClose));
}
