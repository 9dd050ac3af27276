//! Minimal HTTP/1.1 server for probe integration tests.
//!
//! Routes:
//! - `/ok` -> 200
//! - `/status/<code>` -> that code
//! - `/slow` -> 200 after 200ms
//! - `/hang` -> sits on the connection for 5s before answering
//! - `/big` -> 200 with a 16 MiB body, written slowly
//! - `/redirect` -> 302 to `/ok`
//! - anything else -> 404

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

pub const SLOW_DELAY: Duration = Duration::from_millis(200);
pub const HANG_DELAY: Duration = Duration::from_secs(5);

/// Starts the server on a background thread and returns its base URL
/// (e.g. "http://127.0.0.1:12345"). The server runs until the process exits.
pub fn start() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            thread::spawn(move || handle(stream));
        }
    });
    format!("http://127.0.0.1:{}", port)
}

/// A base URL on which nothing listens.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

fn handle(mut stream: TcpStream) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 4096];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = String::from_utf8_lossy(&buf[..n]);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    match path.as_str() {
        "/ok" => respond(&mut stream, "200 OK", &[], b"ok"),
        "/slow" => {
            thread::sleep(SLOW_DELAY);
            respond(&mut stream, "200 OK", &[], b"slow");
        }
        "/hang" => {
            thread::sleep(HANG_DELAY);
            respond(&mut stream, "200 OK", &[], b"late");
        }
        "/redirect" => respond(&mut stream, "302 Found", &["Location: /ok"], b""),
        "/big" => big(&mut stream),
        p if p.starts_with("/status/") => {
            let code = &p["/status/".len()..];
            let line = match code {
                "500" => "500 Internal Server Error".to_string(),
                "404" => "404 Not Found".to_string(),
                "503" => "503 Service Unavailable".to_string(),
                other => format!("{} Custom", other),
            };
            respond(&mut stream, &line, &[], b"");
        }
        _ => respond(&mut stream, "404 Not Found", &[], b"not found"),
    }
}

fn respond(stream: &mut TcpStream, status: &str, headers: &[&str], body: &[u8]) {
    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        body.len()
    );
    for h in headers {
        head.push_str(h);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}

fn big(stream: &mut TcpStream) {
    const TOTAL: usize = 16 * 1024 * 1024;
    const CHUNK: usize = 64 * 1024;
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        TOTAL
    );
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }
    let chunk = vec![b'x'; CHUNK];
    for _ in 0..TOTAL / CHUNK {
        if stream.write_all(&chunk).is_err() {
            // Client went away after the headers, which is what the probe does.
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
}
