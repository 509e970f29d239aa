//! Swift v1 (TempAuth-style) authentication
//!
//! `GET {auth_url}` with `X-Auth-User` and `X-Auth-Key`; the service
//! answers with the token, the storage URL and optionally the token
//! lifetime in seconds.

use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderName, Method, StatusCode};
use jiff::{SignedDuration, Timestamp};
use selstore_core::{
    Authenticator, Credentials, Error, HttpRequest, HttpResponse, HttpTransport, Result,
};
use url::Url;

pub const X_AUTH_USER: HeaderName = HeaderName::from_static("x-auth-user");
pub const X_AUTH_KEY: HeaderName = HeaderName::from_static("x-auth-key");
pub const X_AUTH_TOKEN: &str = "x-auth-token";
pub const X_STORAGE_URL: &str = "x-storage-url";
pub const X_EXPIRE_AUTH_TOKEN: &str = "x-expire-auth-token";

/// Authenticates with a user and key against a v1 auth endpoint
pub struct CredentialsAuthenticator {
    transport: Arc<dyn HttpTransport>,
    auth_url: Url,
    user: String,
    key: String,
}

impl CredentialsAuthenticator {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        auth_url: &str,
        user: impl Into<String>,
        key: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            transport,
            auth_url: Url::parse(auth_url)?,
            user: user.into(),
            key: key.into(),
        })
    }

    fn parse(&self, response: &HttpResponse) -> Result<Credentials> {
        let token = response
            .header_str(X_AUTH_TOKEN)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::AuthenticationFailed("response has no X-Auth-Token".into()))?;
        let storage_url = response
            .header_str(X_STORAGE_URL)
            .ok_or_else(|| Error::AuthenticationFailed("response has no X-Storage-Url".into()))?;
        let storage_url = Url::parse(storage_url)
            .map_err(|e| Error::AuthenticationFailed(format!("bad X-Storage-Url: {e}")))?;

        let credentials = Credentials::new(token, storage_url);
        let lifetime = response
            .header_str(X_EXPIRE_AUTH_TOKEN)
            .and_then(|v| v.trim().parse::<i64>().ok());

        match lifetime.and_then(|secs| Timestamp::now().checked_add(SignedDuration::from_secs(secs)).ok()) {
            Some(expires_at) => Ok(credentials.with_expiry(expires_at)),
            None => Ok(credentials),
        }
    }
}

#[async_trait]
impl Authenticator for CredentialsAuthenticator {
    async fn authenticate(&self) -> Result<Credentials> {
        let request = HttpRequest::new(Method::GET, self.auth_url.clone())
            .header(X_AUTH_USER, &self.user)?
            .header(X_AUTH_KEY, &self.key)?;

        tracing::debug!(url = %self.auth_url, user = %self.user, "requesting token");
        let response = self.transport.send(request).await?;

        match response.status {
            StatusCode::OK | StatusCode::NO_CONTENT => self.parse(&response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::AuthenticationFailed(
                format!("credentials rejected for user {}", self.user),
            )),
            status => Err(Error::AuthenticationFailed(format!(
                "auth endpoint answered {status}"
            ))),
        }
    }
}
