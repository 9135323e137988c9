use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::diagnosis::{normalize_bytes, DiagnosisResult};
use crate::error::ServiceError;

/// Transport to a diagnosis inference service.
///
/// `endpoint` is the full URL already resolved for the active language.
#[async_trait]
pub trait DiagnosisService: Send + Sync {
    async fn diagnose(&self, endpoint: &str, text: &str) -> Result<DiagnosisResult, ServiceError>;
}

#[derive(Serialize)]
struct DiagnosisRequest<'a> {
    text: &'a str,
}

/// HTTP client for the prediction service.
#[derive(Clone, Default)]
pub struct DiagnosisClient {
    client: Client,
}

impl DiagnosisClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DiagnosisService for DiagnosisClient {
    async fn diagnose(&self, endpoint: &str, text: &str) -> Result<DiagnosisResult, ServiceError> {
        let response = self
            .client
            .post(endpoint)
            .json(&DiagnosisRequest { text })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        normalize_bytes(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });

        (format!("http://{}", addr), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if name.eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn local_client() -> DiagnosisClient {
        // Stubs listen on loopback; keep any proxy from the environment out of the way
        DiagnosisClient::with_client(Client::builder().no_proxy().build().unwrap())
    }

    const COLD: &str = r#"{"confidence_score":0.82,"disclaimer":"Not a diagnosis","predicted_disease":"Common Cold","recommendation":"Rest and fluids","symptoms_matched":["cough","fatigue"]}"#;

    #[tokio::test]
    async fn test_diagnose_success_posts_json() {
        let (base, server) = serve_once("200 OK", COLD).await;
        let client = local_client();

        let result = client
            .diagnose(&format!("{}/predict", base), "cough and fatigue")
            .await
            .unwrap();
        assert_eq!(result.predicted_disease(), "Common Cold");
        assert!(!result.is_error());

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /predict HTTP/1.1"));
        assert!(request.to_lowercase().contains("content-type: application/json"));
        assert!(request.ends_with(r#"{"text":"cough and fatigue"}"#));
    }

    #[tokio::test]
    async fn test_diagnose_non_success_status() {
        let (base, server) = serve_once(
            "500 Internal Server Error",
            r#"{"error":"Internal server error occurred processing your request."}"#,
        )
        .await;
        let client = local_client();

        let err = client
            .diagnose(&format!("{}/predict", base), "fever")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Status(500)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_diagnose_malformed_body() {
        let (base, server) = serve_once("200 OK", r#"{"predicted_disease":"Flu"}"#).await;
        let client = local_client();

        let err = client
            .diagnose(&format!("{}/predict-hindi", base), "बुखार")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Malformed(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_diagnose_connection_refused() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = local_client();
        let err = client
            .diagnose(&format!("http://{}/predict", addr), "fever")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Transport(_)));
    }
}
