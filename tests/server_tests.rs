//! Server lifecycle tests over a real TCP socket

use std::time::Duration;

use mcp_authgate::config::Config;
use mcp_authgate::gateway::Gateway;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

async fn raw_request(addr: std::net::SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream.write_all(request.as_bytes()).await.expect("write");
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.expect("read");
    String::from_utf8_lossy(&response).into_owned()
}

fn secured_config() -> Config {
    let mut config = Config::default();
    config.auth.keys = vec!["abc123".to_string()];
    config.server.shutdown_timeout = Duration::from_secs(1);
    config
}

#[tokio::test]
async fn serves_until_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(Gateway::new(secured_config()).serve(listener, async move {
        let _ = stop_rx.await;
    }));

    let ok = raw_request(
        addr,
        "GET /health?key=abc123 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(ok.starts_with("HTTP/1.1 200"), "{ok}");
    assert!(ok.contains("\"healthy\""));
    assert!(ok.to_ascii_lowercase().contains("access-control-allow-origin: *"));

    let denied = raw_request(
        addr,
        "GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(denied.starts_with("HTTP/1.1 401"), "{denied}");
    assert!(denied.contains("\"status\":401"));

    let body = r#"{"tool":"echo","parameters":{"message":"over the wire"}}"#;
    let executed = raw_request(
        addr,
        &format!(
            "POST /execute HTTP/1.1\r\nHost: localhost\r\nAuthorization: Bearer abc123\r\n\
             Content-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ),
    )
    .await;
    assert!(executed.starts_with("HTTP/1.1 200"), "{executed}");
    assert!(executed.contains("over the wire"));

    stop_tx.send(()).expect("server still running");
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server stops")
        .expect("task joins");
    assert!(result.is_ok());
}

#[tokio::test]
async fn declared_oversized_body_is_rejected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let mut config = secured_config();
    config.server.max_body_size = 16;
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(Gateway::new(config).serve(listener, async move {
        let _ = stop_rx.await;
    }));

    let body = r#"{"tool":"echo","parameters":{"message":"too long for sixteen bytes"}}"#;
    let reply = raw_request(
        addr,
        &format!(
            "POST /execute?key=abc123 HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\n\
             Connection: close\r\n\r\n{body}",
            body.len()
        ),
    )
    .await;
    assert!(reply.starts_with("HTTP/1.1 413"), "{reply}");
    assert!(reply.contains("\"status\":413"));

    stop_tx.send(()).expect("server still running");
    let _ = tokio::time::timeout(Duration::from_secs(5), server).await;
}

#[tokio::test]
async fn stalled_body_gets_timeout_envelope() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let mut config = secured_config();
    config.server.request_timeout = Duration::from_millis(100);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(Gateway::new(config).serve(listener, async move {
        let _ = stop_rx.await;
    }));

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream
        .write_all(
            b"POST /execute?key=abc123 HTTP/1.1\r\nHost: localhost\r\n\
              Content-Type: application/json\r\nContent-Length: 50\r\n\
              Connection: close\r\n\r\n{\"tool\"",
        )
        .await
        .expect("write");

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("server answers before the client gives up")
        .expect("read");
    let reply = String::from_utf8_lossy(&response);
    assert!(reply.starts_with("HTTP/1.1 408"), "{reply}");
    assert!(reply.contains("\"status\":408"), "{reply}");
    assert!(reply.contains("\"error\":\"Request timed out\""), "{reply}");

    stop_tx.send(()).expect("server still running");
    let _ = tokio::time::timeout(Duration::from_secs(5), server).await;
}
