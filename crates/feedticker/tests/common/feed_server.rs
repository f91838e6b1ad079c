//! Minimal HTTP/1.1 server for feed integration tests.
//!
//! Answers each connection with the next scripted response; once the script
//! runs out the last response is repeated. Request lines are recorded so
//! tests can check which path was asked for.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FeedServer {
    /// Request lines received so far, e.g. `GET /rss.xml HTTP/1.1`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start(script: Vec<Response>) -> FeedServer {
    assert!(!script.is_empty(), "script needs at least one response");

    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let script = Arc::new(Mutex::new(script));
    let requests = Arc::new(Mutex::new(Vec::new()));

    let recorded = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let response = {
                let mut script = script.lock().unwrap();
                if script.len() > 1 {
                    script.remove(0)
                } else {
                    script[0].clone()
                }
            };
            handle(stream, &response, &recorded);
        }
    });

    FeedServer {
        base_url: format!("http://127.0.0.1:{port}/"),
        requests,
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

fn handle(mut stream: TcpStream, response: &Response, requests: &Mutex<Vec<String>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));

    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
        }
    }

    let request = String::from_utf8_lossy(&raw);
    if let Some(line) = request.lines().next() {
        requests.lock().unwrap().push(line.to_string());
    }

    let head = format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/rss+xml\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n",
        response.status,
        reason(response.status),
        response.body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(response.body.as_bytes());
    let _ = stream.flush();
}

/// A small RSS document with `titles.len()` items, in the given order.
pub fn rss_document(titles: &[&str]) -> String {
    let items: String = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            format!(
                "<item><title>{title}</title><pubDate>Mon, 0{day} Jan 2024 09:00:00 GMT</pubDate>\
                 <description><![CDATA[<p>{title} <i>summary</i></p>]]></description></item>",
                day = (i % 9) + 1
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Test feed</title><link>http://example.com/</link>
<description>Integration test feed</description>{items}</channel></rss>"#
    )
}
