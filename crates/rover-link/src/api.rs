//! Request/response routes of the command endpoint, separate from the
//! streaming channel.

use std::time::Duration;

use rover_proto::{ApiReply, GoToRequest};
use tracing::info;

use crate::LinkError;

#[derive(Debug, Clone)]
pub struct CommandApi {
    client: reqwest::Client,
    base: String,
}

impl CommandApi {
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self, LinkError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base = base.into().trim_end_matches('/').to_string();
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `POST /api/command/goto`. A reply with status "error" is a failure.
    pub async fn go_to(&self, req: &GoToRequest) -> Result<ApiReply, LinkError> {
        let url = format!("{}/api/command/goto", self.base);
        let reply: ApiReply = self
            .client
            .post(&url)
            .json(req)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !reply.is_ok() {
            return Err(LinkError::Rejected(reply.message.unwrap_or(reply.status)));
        }
        info!("go-to accepted: lat={} lon={}", req.lat, req.lon);
        Ok(reply)
    }

    /// `GET /api/health`.
    pub async fn health(&self) -> Result<ApiReply, LinkError> {
        let url = format!("{}/api/health", self.base);
        let reply: ApiReply = self.client.get(&url).send().await?.error_for_status()?.json().await?;
        if !reply.is_ok() {
            return Err(LinkError::Rejected(reply.message.unwrap_or(reply.status)));
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-shot HTTP server: captures the request body, answers with `body`.
    async fn serve_once(status: &'static str, body: &'static str) -> (SocketAddr, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let (head_end, content_len) = loop {
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "client closed early");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                    let len = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .map(|v| v.trim().parse::<usize>().unwrap())
                        .unwrap_or(0);
                    break (pos + 4, len);
                }
            };
            while buf.len() < head_end + content_len {
                let n = stream.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            String::from_utf8_lossy(&buf[head_end..]).to_string()
        });
        (addr, handle)
    }

    fn api(addr: SocketAddr) -> CommandApi {
        CommandApi::new(format!("http://{}/", addr), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn go_to_posts_target() {
        let (addr, server) = serve_once("200 OK", r#"{"status":"success","target":{"lat":35.0,"lon":139.0}}"#).await;
        let reply = api(addr).go_to(&GoToRequest::new(35.0, 139.0, Some(0.5))).await.unwrap();
        assert!(reply.is_ok());

        let sent: Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(sent["lat"], 35.0);
        assert_eq!(sent["speed"], 0.5);
    }

    #[tokio::test]
    async fn error_status_in_body_is_failure() {
        let (addr, _server) = serve_once("200 OK", r#"{"status":"error","message":"No connection"}"#).await;
        let err = api(addr).go_to(&GoToRequest::new(35.0, 139.0, None)).await.unwrap_err();
        assert!(matches!(err, LinkError::Rejected(ref m) if m == "No connection"));
    }

    #[tokio::test]
    async fn http_error_is_failure() {
        let (addr, _server) = serve_once("500 Internal Server Error", r#"{"status":"error"}"#).await;
        assert!(matches!(api(addr).health().await, Err(LinkError::Http(_))));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert!(api(addr).go_to(&GoToRequest::new(1.0, 1.0, None)).await.is_err());
    }

    #[test]
    fn base_trailing_slash_is_trimmed() {
        let a = CommandApi::new("http://rover.local:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(a.base(), "http://rover.local:8000");
    }
}
