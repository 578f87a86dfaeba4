use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, header::CONTENT_TYPE};
use url::Url;

use super::error::ServiceError;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u16,
    /// Header values keyed by lowercase header name.
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

impl TransportResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header value, several values joined with `", "`.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .filter(|values| !values.is_empty())
            .map(|values| values.join(", "))
    }
}

/// Sends a form-encoded POST and hands back the raw reply.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_form(&self, url: &Url, body: String) -> Result<TransportResponse, ServiceError>;
}

pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .user_agent(format!("spamgate/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self::new(http))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_form(&self, url: &Url, body: String) -> Result<TransportResponse, ServiceError> {
        let response = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers
                    .entry(name.as_str().to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }
        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    async fn serve_once(reply: &'static str) -> (Url, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let read = socket.read(&mut buf).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..read]);
                let text = String::from_utf8_lossy(&request);
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= split + 4 + length {
                        break;
                    }
                }
            }
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });
        let url = Url::parse(&format!("http://{}/1.1/comment-check", addr)).unwrap();
        (url, handle)
    }

    #[tokio::test]
    async fn posts_form_body_and_collects_headers() {
        let (url, server) = serve_once(
            concat!(
                "HTTP/1.1 200 OK\r\n",
                "X-akismet-server: 192.0.2.1\r\n",
                "Content-Length: 4\r\n",
                "Connection: close\r\n\r\n",
                "true",
            ),
        )
        .await;
        let transport = ReqwestTransport::with_timeout(Duration::from_secs(5)).unwrap();

        let response = transport
            .post_form(&url, "key=abc&blog=https%3A%2F%2Fsite".into())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "true");
        assert_eq!(response.header("X-Akismet-Server").as_deref(), Some("192.0.2.1"));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /1.1/comment-check"));
        assert!(request
            .to_ascii_lowercase()
            .contains("content-type: application/x-www-form-urlencoded"));
        assert!(request.ends_with("key=abc&blog=https%3A%2F%2Fsite"));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        let transport = ReqwestTransport::with_timeout(Duration::from_millis(200)).unwrap();
        let url = Url::parse(&format!("http://{}/1.1/verify-key", addr)).unwrap();

        let err = transport.post_form(&url, String::new()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Timeout), "got {err:?}");
    }
}
