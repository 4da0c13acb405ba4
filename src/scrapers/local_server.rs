//! Canned-response HTTP server on the loopback interface for tier tests.
//!
//! Each route holds a queue of replies: requests pop from the front until a
//! single reply is left, which then answers every further request. Paths
//! without a route fall back to the `*` route, or 404.

use super::TierContext;
use crate::config::RetrievalConfig;
use crate::fetcher::HttpClient;
use crate::scoring::Scorer;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

pub const SITE: &str = "127.0.0.1";

/// Article page whose extracted body is well over every tier's length bar.
pub const ARTICLE_PAGE: &str = r#"<html><body>
    <div class="menu">Trang chủ | Thể thao</div>
    <div class="content">
        <p>Trận bóng đá giữa hai đội tuyển diễn ra sôi nổi trên sân vận động quốc gia.
        Đội tuyển bóng đá Việt Nam giành chiến thắng thuyết phục và vô địch giải đấu.
        Huấn luyện viên cho biết các cầu thủ đã thi đấu đúng chiến thuật và giữ được sự tập trung.
        Người hâm mộ bóng đá cả nước xuống đường ăn mừng đến tận khuya.</p>
    </div>
</body></html>"#;

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
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

type Routes = Arc<Mutex<HashMap<String, VecDeque<Reply>>>>;

pub struct LocalServer {
    /// Root URL with a trailing slash, e.g. `http://127.0.0.1:40123/`.
    pub base_url: String,
    routes: Routes,
    requests: Arc<Mutex<Vec<String>>>,
}

impl LocalServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind((SITE, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let table = Arc::clone(&routes);
        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = Arc::clone(&table);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let mut head = Vec::new();
                    let mut buf = [0u8; 4096];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => head.extend_from_slice(&buf[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&head);
                    let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let path = target.split('?').next().unwrap_or("/").to_string();
                    log.lock().unwrap().push(target);

                    let reply = next_reply(&routes, &path);
                    let response = format!(
                        "HTTP/1.1 {} Canned\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        reply.status,
                        reply.body.len(),
                        reply.body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}/"),
            routes,
            requests,
        }
    }

    /// Answer requests for `path` with `replies`, in order.
    pub fn route(&self, path: &str, replies: Vec<Reply>) {
        self.routes.lock().unwrap().insert(path.to_string(), replies.into());
    }

    /// Absolute URL of `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Number of requests made to `path`, ignoring query strings.
    pub fn hits(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|target| target.split('?').next() == Some(path))
            .count()
    }

    /// Decoded values of query parameter `name` sent to `path`, in order.
    pub fn params(&self, path: &str, name: &str) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|target| target.split('?').next() == Some(path))
            .filter_map(|target| {
                let url = Url::parse(&self.url(target)).ok()?;
                url.query_pairs()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.into_owned())
            })
            .collect()
    }

    /// Tier context aimed at this server, with default thresholds.
    pub fn context(&self) -> TierContext {
        let config = RetrievalConfig {
            site: SITE.to_string(),
            base_url: self.base_url.clone(),
            request_timeout_secs: 5,
            ..RetrievalConfig::default()
        };
        TierContext {
            http: HttpClient::direct(&config).unwrap(),
            scorer: Scorer::default(),
            site: SITE.to_string(),
            base_url: Url::parse(&self.base_url).unwrap(),
        }
    }
}

fn next_reply(routes: &Routes, path: &str) -> Reply {
    let mut routes = routes.lock().unwrap();
    let key = if routes.contains_key(path) { path } else { "*" };
    match routes.get_mut(key) {
        Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| Reply::status(500)),
        Some(queue) => queue.front().cloned().unwrap_or_else(|| Reply::status(404)),
        None => Reply::status(404),
    }
}
