//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cache_proxy::cache::{CacheStore, MemoryIndex, ObjectStore};
use cache_proxy::config::ListenerConfig;
use cache_proxy::net::Listener;
use cache_proxy::{ProxyServer, Shutdown};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A mock origin that counts requests and closes after every response.
pub struct MockOrigin {
    pub addr: SocketAddr,
    pub calls: Arc<AtomicU32>,
    pub received: Arc<tokio::sync::Mutex<Vec<String>>>,
}

impl MockOrigin {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Start an origin whose response body carries the request sequence number,
/// so a cached reply can be told apart from a fresh one.
pub async fn start_mock_origin() -> MockOrigin {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let received = Arc::new(tokio::sync::Mutex::new(Vec::new()));

    let counter = calls.clone();
    let log = received.clone();
    tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(_) => break,
            };
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let log = log.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let read = socket.read(&mut buf).await.unwrap_or(0);
                log.lock()
                    .await
                    .push(String::from_utf8_lossy(&buf[..read]).into_owned());

                let body = format!("response #{n}");
                // No Content-Length: the end of the response is the close.
                let response = format!("HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\n{body}");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    MockOrigin {
        addr,
        calls,
        received,
    }
}

/// A running proxy backed by an in-memory index and a temp cache directory.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub server: tokio::task::JoinHandle<()>,
    _cache_dir: TempDir,
}

pub async fn start_proxy(ttl: Duration) -> TestProxy {
    let cache_dir = TempDir::new().unwrap();
    let cache = Arc::new(CacheStore::new(
        Arc::new(MemoryIndex::new()),
        ObjectStore::new(cache_dir.path()),
        ttl,
    ));
    cache.probe().await.unwrap();

    let config = ListenerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        ..ListenerConfig::default()
    };
    let listener = Listener::bind(&config).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = ProxyServer::new(cache, Duration::from_secs(5));
    let server = tokio::spawn(async move {
        server.run(listener, server_shutdown).await.unwrap();
    });

    TestProxy {
        addr,
        shutdown,
        server,
        _cache_dir: cache_dir,
    }
}

/// Send raw bytes to the proxy and read until it closes the connection.
pub async fn send_raw(proxy: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("proxy did not close the connection")
        .unwrap();
    response
}

/// A plain GET for `path` on `origin`, in the form browsers send to proxies.
pub fn get_request(origin: SocketAddr, path: &str) -> String {
    format!(
        "GET http://{origin}{path} HTTP/1.1\r\nHost: {origin}\r\nUser-Agent: test\r\nConnection: keep-alive\r\n\r\n"
    )
}
