use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{EvasionError, Result};
use crate::http_client::create_probe_client;

/// The parts of an HTTP response the fingerprint engine reads.
#[derive(Debug, Clone, Default)]
pub struct ProbeResponse {
    pub status: u16,
    /// Header names lowercased, in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ProbeResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Sends one GET and returns its summary. Implementations bound each call
/// by their own timeout; the engine never waits on a call forever.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ProbeResponse>;
}

pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = create_probe_client(timeout_secs)?;
        Ok(Self::with_client(client, Duration::from_secs(timeout_secs)))
    }

    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl ProbeTransport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<ProbeResponse> {
        let request = async {
            let response = self.client.get(url).send().await?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(k, v)| {
                    (
                        k.as_str().to_lowercase(),
                        String::from_utf8_lossy(v.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(ProbeResponse { status, headers, body })
        };

        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(e)) => Err(EvasionError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(EvasionError::Request {
                url: url.to_string(),
                reason: format!("timed out after {}ms", self.timeout.as_millis()),
            }),
        }
    }
}
