use crate::http::types::{HttpRequest, HttpResponse, TransportError};
use futures::future::BoxFuture;
use tracing::debug;

/// Minimal HTTP seam used by the auth gateway and the requester
pub trait HttpTransport: Send + Sync {
    /// Execute a GET request and read the full body
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>>;

    /// Get transport name/identifier
    fn transport_name(&self) -> &'static str;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("quotedeck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Other(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        Box::pin(async move {
            let mut builder = self.client.get(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }

            let response = builder.send().await.map_err(map_reqwest_error)?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(map_reqwest_error)?;
            debug!("GET {} -> {} ({} bytes)", request.url, status, body.len());

            Ok(HttpResponse { status, body })
        })
    }

    fn transport_name(&self) -> &'static str {
        "reqwest"
    }
}

fn map_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_connect() || error.is_request() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}
