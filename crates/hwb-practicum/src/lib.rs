//! Practicum review API adapter.
//!
//! One `GET <endpoint>?from_date=<ts>` per call with `Authorization: OAuth <token>`.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use serde_json::Value;

use hwb_core::{config::Config, errors::Error, ports::HomeworkApi, Result};

#[derive(Clone)]
pub struct PracticumClient {
    endpoint: String,
    token: String,
    http: reqwest::Client,
}

impl PracticumClient {
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            token: token.into(),
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(&cfg.endpoint, &cfg.practicum_token, cfg.request_timeout)
    }
}

impl fmt::Debug for PracticumClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticumClient")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl HomeworkApi for PracticumClient {
    async fn fetch_statuses(&self, from_date: Option<i64>) -> Result<Value> {
        let from_date = from_date.unwrap_or_else(|| chrono::Utc::now().timestamp());

        let resp = self
            .http
            .get(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, format!("OAuth {}", self.token))
            .query(&[("from_date", from_date)])
            .send()
            .await
            .map_err(|e| Error::EndpointUnreachable {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                body = %body.chars().take(200).collect::<String>(),
                "review api returned unexpected status"
            );
            return Err(Error::UnexpectedStatusCode {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| Error::EndpointUnreachable {
            endpoint: self.endpoint.clone(),
            reason: format!("failed to read body: {e}"),
        })?;
        let v: Value = serde_json::from_slice(&bytes)?;

        if let Some((code, message)) = rejection(&v) {
            return Err(Error::ServiceRejection {
                endpoint: self.endpoint.clone(),
                code,
                message,
            });
        }

        tracing::debug!(from_date, "review api answered");
        Ok(v)
    }
}

/// The provider reports auth and parameter problems as a JSON object carrying
/// `code` (and usually `message` or `error`) instead of `homeworks`.
fn rejection(v: &Value) -> Option<(String, String)> {
    let obj = v.as_object()?;
    if !obj.contains_key("code") && !obj.contains_key("error") {
        return None;
    }

    let text = |key: &str| match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };

    let code = text("code").unwrap_or_else(|| "unknown".to_string());
    let message = text("message")
        .or_else(|| text("error"))
        .unwrap_or_default();
    Some((code, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve exactly one canned HTTP response; the task yields the request head.
    async fn serve_once(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = sock.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            sock.write_all(response.as_bytes()).await.unwrap();
            sock.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf).to_string()
        });

        (format!("http://{addr}/api/user_api/homework_statuses/"), handle)
    }

    fn client(endpoint: &str) -> PracticumClient {
        PracticumClient::new(endpoint, "secret", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn sends_oauth_header_and_from_date() {
        let body = r#"{"homeworks":[],"current_date":1000}"#;
        let (endpoint, server) = serve_once("200 OK", body).await;

        let v = client(&endpoint).fetch_statuses(Some(1234)).await.unwrap();
        let head = server.await.unwrap().to_lowercase();

        assert_eq!(v["current_date"], 1000);
        assert!(head.starts_with("get /api/user_api/homework_statuses/?from_date=1234 "));
        assert!(head.contains("authorization: oauth secret"));
    }

    #[tokio::test]
    async fn non_200_is_unexpected_status() {
        let (endpoint, server) = serve_once("404 Not Found", "{}").await;

        let err = client(&endpoint).fetch_statuses(Some(1)).await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, Error::UnexpectedStatusCode { status: 404, .. }));
    }

    #[tokio::test]
    async fn server_error_is_unexpected_status() {
        let (endpoint, server) = serve_once("500 Internal Server Error", "oops").await;

        let err = client(&endpoint).fetch_statuses(Some(1)).await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, Error::UnexpectedStatusCode { status: 500, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{addr}/"))
            .fetch_statuses(Some(1))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EndpointUnreachable { .. }));
    }

    #[tokio::test]
    async fn rejection_body_is_service_rejection() {
        let body = r#"{"code":"not_authenticated","message":"Учетные данные не были предоставлены."}"#;
        let (endpoint, server) = serve_once("200 OK", body).await;

        let err = client(&endpoint).fetch_statuses(Some(1)).await.unwrap_err();
        server.await.unwrap();

        match err {
            Error::ServiceRejection { code, message, .. } => {
                assert_eq!(code, "not_authenticated");
                assert!(message.starts_with("Учетные"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn non_json_body_is_json_error() {
        let (endpoint, server) = serve_once("200 OK", "<html></html>").await;

        let err = client(&endpoint).fetch_statuses(Some(1)).await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn rejection_reads_nested_error() {
        let v = serde_json::json!({"error": {"error": "Wrong from_date format"}, "code": "UnknownError"});
        let (code, message) = rejection(&v).unwrap();
        assert_eq!(code, "UnknownError");
        assert!(message.contains("Wrong from_date format"));
        assert!(rejection(&serde_json::json!({"homeworks": []})).is_none());
    }
}
