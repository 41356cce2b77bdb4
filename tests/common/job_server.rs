//! Minimal HTTP/1.1 server standing in for the astrometry service in tests.
//!
//! Each route maps a request path to a canned response. Bodies can be paced
//! (to trip the speed floor) or stalled (to trip the read timeout). Every
//! request is counted per path.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Route {
    status: u16,
    content_type: Option<String>,
    body: Vec<u8>,
    /// Send the body in pieces of this size with a pause after each.
    pace: Option<(usize, Duration)>,
    /// Send a first piece of the body, then go silent for this long.
    stall: Option<Duration>,
    /// Wait this long before sending anything.
    delay: Option<Duration>,
}

impl Route {
    pub fn fits(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: Some("application/fits".to_string()),
            body,
            pace: None,
            stall: None,
            delay: None,
        }
    }

    pub fn text(body: &str) -> Self {
        Self {
            status: 200,
            content_type: Some("application/json".to_string()),
            body: body.as_bytes().to_vec(),
            pace: None,
            stall: None,
            delay: None,
        }
    }

    pub fn success_status() -> Self {
        Self::text(r#"{"status": "success"}"#)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn paced(mut self, piece: usize, delay: Duration) -> Self {
        self.pace = Some((piece, delay));
        self
    }

    pub fn stalled(mut self, delay: Duration) -> Self {
        self.stall = Some(delay);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

pub struct JobServer {
    base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl JobServer {
    /// Starts a server in a background thread. Unknown paths get a 404 HTML page.
    pub fn start(routes: Vec<(String, Route)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let routes: Arc<HashMap<String, Route>> = Arc::new(routes.into_iter().collect());
        let hits = Arc::new(Mutex::new(HashMap::new()));
        let server_hits = Arc::clone(&hits);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&routes);
                let hits = Arc::clone(&server_hits);
                thread::spawn(move || handle(stream, &routes, &hits));
            }
        });
        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            hits,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

/// Routes for one solved job with both artifacts served as FITS.
pub fn solved_job(job_id: u64, axy: Route, image: Route) -> Vec<(String, Route)> {
    vec![
        (format!("/api/jobs/{}", job_id), Route::success_status()),
        (format!("/axy_file/{}", job_id), axy),
        (format!("/new_fits_file/{}", job_id), image),
    ]
}

/// A base URL on which nothing is listening.
pub fn closed_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, Route>, hits: &Mutex<HashMap<String, usize>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
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

    *hits.lock().unwrap().entry(path.clone()).or_insert(0) += 1;

    let route = routes.get(&path).cloned().unwrap_or_else(|| {
        Route::text("<html>not found</html>")
            .with_status(404)
            .with_content_type("text/html")
    });

    if let Some(delay) = route.delay {
        thread::sleep(delay);
    }

    let content_type = route
        .content_type
        .as_ref()
        .map(|ct| format!("Content-Type: {}\r\n", ct))
        .unwrap_or_default();
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        route.status,
        reason(route.status),
        route.body.len(),
        content_type
    );
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }
    let _ = stream.flush();

    if let Some(delay) = route.stall {
        let split = route.body.len().min(64);
        let _ = stream.write_all(&route.body[..split]);
        let _ = stream.flush();
        thread::sleep(delay);
        let _ = stream.write_all(&route.body[split..]);
        return;
    }

    if let Some((piece, delay)) = route.pace {
        for part in route.body.chunks(piece.max(1)) {
            if stream.write_all(part).is_err() || stream.flush().is_err() {
                return;
            }
            thread::sleep(delay);
        }
        return;
    }

    let _ = stream.write_all(&route.body);
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
