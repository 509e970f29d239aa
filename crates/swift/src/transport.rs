//! reqwest-backed [`HttpTransport`]

use async_trait::async_trait;
use selstore_core::{
    Account, Error, HttpRequest, HttpResponse, HttpTransport, Result, TimeoutConfig,
    TransportError,
};

const USER_AGENT: &str = concat!("selstore/", env!("CARGO_PKG_VERSION"));

/// HTTP transport over a shared reqwest connection pool
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: &TimeoutConfig, insecure: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout.connect())
            .timeout(timeout.read())
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn for_account(account: &Account) -> Result<Self> {
        Self::new(&account.timeout_config(), account.insecure)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let response = self
            .client
            .request(request.method, request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(map_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(map_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::connect(e.to_string())
    } else {
        TransportError::other(e.to_string())
    }
}
