//! A tiny loopback HTTP server that answers scripted responses per path.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl MockResponse {
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: body.into(),
        }
    }

    pub fn event_stream(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream",
            body: body.into(),
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

type Routes = HashMap<String, Vec<MockResponse>>;

/// Serves each route's responses in order; the last one repeats. Unknown
/// paths get a 404. The accept loop stops when the server is dropped.
pub struct MockServer {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MockServer {
    pub fn start(routes: Vec<(&str, Vec<MockResponse>)>) -> std::io::Result<Self> {
        let routes: Routes = routes
            .into_iter()
            .map(|(path, responses)| (path.to_string(), responses))
            .collect();
        let listener = TcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let requests_thread = Arc::clone(&requests);
        let (tx, rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            let mut served: HashMap<String, usize> = HashMap::new();
            loop {
                if rx.try_recv().is_ok() {
                    break;
                }
                match listener.accept() {
                    Ok((mut stream, _)) => {
                        let _ = stream.set_nonblocking(false);
                        let Ok(request) = consume_http_request(&mut stream) else {
                            continue;
                        };
                        let count = served.entry(request.path.clone()).or_insert(0);
                        let selected = routes.get(&request.path).and_then(|script| {
                            script.get(*count).or_else(|| script.last()).cloned()
                        });
                        *count += 1;
                        if let Ok(mut log) = requests_thread.lock() {
                            log.push(request);
                        }
                        let response = selected
                            .unwrap_or_else(|| MockResponse::text(404, "no such route"));
                        let _ = write_response(&mut stream, &response);
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(2));
                    }
                    Err(_) => break,
                }
            }
        });
        Ok(Self {
            base_url: format!("http://{addr}"),
            requests,
            stop_tx: Some(tx),
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn write_response(stream: &mut TcpStream, response: &MockResponse) -> std::io::Result<()> {
    let status_text = match response.status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Error",
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        status_text,
        response.content_type,
        response.body.len()
    );
    stream.write_all(head.as_bytes())?;
    stream.write_all(response.body.as_bytes())?;
    stream.flush()
}

fn consume_http_request(stream: &mut TcpStream) -> std::io::Result<RecordedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    let mut header_end = None;
    while header_end.is_none() {
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
        header_end = find_subsequence(&buffer, b"\r\n\r\n").map(|idx| idx + 4);
        if buffer.len() > 1_048_576 {
            break;
        }
    }
    let header_len = header_end.unwrap_or(buffer.len());
    let head = String::from_utf8_lossy(&buffer[..header_len]).to_string();
    let content_length = parse_content_length(&head);
    let mut body = buffer[header_len..].to_vec();
    while body.len() < content_length {
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..read]);
    }
    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default();
    let path = target.split('?').next().unwrap_or_default().to_string();
    Ok(RecordedRequest {
        method,
        path,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

fn parse_content_length(head: &str) -> usize {
    for line in head.lines() {
        let mut parts = line.splitn(2, ':');
        let key = parts.next().unwrap_or_default().trim();
        if key.eq_ignore_ascii_case("content-length")
            && let Some(value) = parts.next()
            && let Ok(parsed) = value.trim().parse::<usize>()
        {
            return parsed;
        }
    }
    0
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serves_route_script_and_repeats_last() {
        let server = MockServer::start(vec![(
            "/snapshot",
            vec![MockResponse::json("{\"time\":1}"), MockResponse::json("{\"time\":2}")],
        )])
        .expect("start mock server");
        let client = reqwest::blocking::Client::new();
        let url = format!("{}/snapshot", server.base_url());
        let bodies: Vec<String> = (0..3)
            .map(|_| {
                client
                    .get(&url)
                    .send()
                    .and_then(|r| r.text())
                    .expect("mock reply")
            })
            .collect();
        assert_eq!(bodies, vec!["{\"time\":1}", "{\"time\":2}", "{\"time\":2}"]);
        assert_eq!(server.requests().len(), 3);
    }

    #[test]
    fn unknown_route_is_404_and_records_body() {
        let server = MockServer::start(Vec::new()).expect("start mock server");
        let resp = reqwest::blocking::Client::new()
            .post(format!("{}/missing", server.base_url()))
            .body("payload")
            .send()
            .expect("mock reply");
        assert_eq!(resp.status().as_u16(), 404);
        let requests = server.requests();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/missing");
        assert_eq!(requests[0].body, "payload");
    }

    #[test]
    fn content_length_header_is_case_insensitive() {
        assert_eq!(parse_content_length("POST / HTTP/1.1\r\ncontent-length: 12\r\n"), 12);
        assert_eq!(parse_content_length("GET / HTTP/1.1\r\n"), 0);
    }
}
