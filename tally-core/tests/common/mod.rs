//! Loopback stand-in for the analytics collector shared by the test binaries

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// One request as seen by the stub collector
pub struct CapturedRequest {
    pub head: String,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        let prefix = format!("{}:", name.to_ascii_lowercase());
        self.head
            .lines()
            .find(|line| line.to_ascii_lowercase().starts_with(&prefix))
            .map(|line| line[prefix.len()..].trim().to_string())
    }
}

/// Minimal HTTP/1.1 collector answering every request with `status`
pub struct StubCollector {
    addr: SocketAddr,
    requests: mpsc::Receiver<CapturedRequest>,
}

impl StubCollector {
    pub fn start(status: u16, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind stub collector");
        let addr = listener.local_addr().unwrap();
        let (tx, requests) = mpsc::channel();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let tx = tx.clone();
                thread::spawn(move || handle_connection(stream, status, delay, tx));
            }
        });

        Self { addr, requests }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/collect", self.addr)
    }

    pub fn next_request(&self) -> CapturedRequest {
        self.requests
            .recv_timeout(Duration::from_secs(5))
            .expect("stub collector received no request")
    }

    pub fn assert_idle(&self) {
        assert!(self
            .requests
            .recv_timeout(Duration::from_millis(300))
            .is_err());
    }
}

fn handle_connection(
    mut stream: TcpStream,
    status: u16,
    delay: Duration,
    tx: mpsc::Sender<CapturedRequest>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let lower = line.to_ascii_lowercase();
            lower
                .strip_prefix("content-length:")
                .and_then(|v| v.trim().parse::<usize>().ok())
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let body = String::from_utf8_lossy(&buf[header_end..header_end + content_length]).to_string();

    let _ = tx.send(CapturedRequest { head, body });

    thread::sleep(delay);
    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        status
    );
    let _ = stream.write_all(response.as_bytes());
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
