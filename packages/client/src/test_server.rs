//! Minimal HTTP server for exercising the client against canned responses.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serves `body` with `status` to every connection until the returned
/// handle is aborted. Returns the base URL.
pub async fn serve(status: &'static str, body: String) -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let body = body.clone();
            tokio::spawn(async move {
                let mut request = [0_u8; 4096];
                let _ = socket.read(&mut request).await;
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{body}"
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{addr}"), handle)
}

/// Serves one connection an event stream that repeats `row` every 10 ms
/// and never sends `done`. The receiver resolves once a write fails because
/// the client has gone away.
pub async fn serve_endless(
    row: String,
) -> (String, oneshot::Receiver<()>, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = oneshot::channel();

    let handle = tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut request = [0_u8; 4096];
        let _ = socket.read(&mut request).await;

        let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n: stream start\n\n";
        if socket.write_all(head.as_bytes()).await.is_ok() {
            let frame = format!("event: row\ndata: {row}\n\n");
            while socket.write_all(frame.as_bytes()).await.is_ok() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
        let _ = closed_tx.send(());
    });

    (format!("http://{addr}"), closed_rx, handle)
}

/// Builds an event-stream body with one `row` frame per JSON payload,
/// optionally terminated by `done`.
pub fn frames(rows: &[String], done: bool) -> String {
    let mut body = String::from(": stream start\n\n");
    for row in rows {
        body.push_str("event: row\ndata: ");
        body.push_str(row);
        body.push_str("\n\n");
    }
    if done {
        body.push_str("event: done\ndata: end\n\n");
    }
    body
}
