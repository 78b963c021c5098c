// ABOUTME: Single-shot HTTP GET against a health endpoint, bounded by a per-request timeout.
// ABOUTME: Plain HTTP/1.1 goes through a hyper client connection; HTTPS through reqwest with rustls.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Empty;
use hyper::Request;
use hyper::header::HOST;
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::types::HealthUrl;

/// Why a probe produced no status code.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("connection to {address} failed: {reason}")]
    Connect { address: String, reason: String },

    #[error("HTTP handshake failed: {0}")]
    Handshake(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// Issues one GET and reports the response status code.
#[async_trait]
pub trait HttpProbe: Send + Sync {
    async fn get(&self, url: &HealthUrl, timeout: Duration) -> Result<u16, ProbeError>;
}

/// Production probe: hyper for `http://`, reqwest for `https://`.
#[derive(Debug, Clone)]
pub struct EndpointProbe {
    tls: reqwest::Client,
}

impl Default for EndpointProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointProbe {
    pub fn new() -> Self {
        // Redirects are reported as their status code, never followed.
        let tls = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("falling back to default HTTPS client: {}", e);
                reqwest::Client::new()
            });
        Self { tls }
    }

    async fn tls_status(&self, url: &HealthUrl) -> Result<u16, ProbeError> {
        let resp = self
            .tls
            .get(url.to_string())
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ProbeError::Connect {
                        address: url.socket_addr(),
                        reason: e.to_string(),
                    }
                } else {
                    ProbeError::Request(e.to_string())
                }
            })?;
        Ok(resp.status().as_u16())
    }
}

#[async_trait]
impl HttpProbe for EndpointProbe {
    async fn get(&self, url: &HealthUrl, timeout: Duration) -> Result<u16, ProbeError> {
        let status = async {
            if url.is_tls() {
                self.tls_status(url).await
            } else {
                plain_status(url).await
            }
        };
        match tokio::time::timeout(timeout, status).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout(timeout)),
        }
    }
}

async fn plain_status(url: &HealthUrl) -> Result<u16, ProbeError> {
    let address = url.socket_addr();
    let stream = TcpStream::connect(&address)
        .await
        .map_err(|e| ProbeError::Connect {
            address: address.clone(),
            reason: e.to_string(),
        })?;

    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| ProbeError::Handshake(e.to_string()))?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::trace!("health probe connection closed: {}", e);
        }
    });

    let req = Request::builder()
        .method("GET")
        .uri(url.path_and_query())
        .header(HOST, url.host_header())
        .body(Empty::<Bytes>::new())
        .map_err(|e| ProbeError::Request(e.to_string()))?;

    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| ProbeError::Request(e.to_string()))?;

    Ok(resp.status().as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(response: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        port
    }

    #[tokio::test]
    async fn reports_ok_status() {
        let port = serve_once("HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\nok").await;
        let url = HealthUrl::parse(&format!("http://127.0.0.1:{}/health", port)).unwrap();

        let status = EndpointProbe::new().get(&url, Duration::from_secs(5)).await.unwrap();
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn reports_non_ok_status_as_a_code() {
        let port =
            serve_once("HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\n\r\n").await;
        let url = HealthUrl::parse(&format!("http://127.0.0.1:{}/health", port)).unwrap();

        let status = EndpointProbe::new().get(&url, Duration::from_secs(5)).await.unwrap();
        assert_eq!(status, 503);
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let url = HealthUrl::parse(&format!("http://127.0.0.1:{}/health", port)).unwrap();

        let err = EndpointProbe::new().get(&url, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, ProbeError::Connect { .. }));
    }

    #[tokio::test]
    async fn https_refused_connection_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let url = HealthUrl::parse(&format!("https://127.0.0.1:{}/health", port)).unwrap();

        let err = EndpointProbe::new()
            .get(&url, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Connect { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn https_to_plain_server_is_not_a_status() {
        let port = serve_once("HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\nok").await;
        let url = HealthUrl::parse(&format!("https://127.0.0.1:{}/health", port)).unwrap();

        assert!(
            EndpointProbe::new()
                .get(&url, Duration::from_secs(5))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        let url = HealthUrl::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();

        let err = EndpointProbe::new()
            .get(&url, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Timeout(_)));
    }
}
