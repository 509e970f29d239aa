//! Single-object requests: upload, delete and symlink creation
//!
//! Each call is one request (plus at most one retry after a token refresh).
//! There is no concurrency here; the batch executor composes these.

use std::sync::Arc;

use http::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use http::{HeaderName, Method, StatusCode};

use crate::auth::{Credentials, Session};
use crate::error::{Error, Operation, Result};
use crate::model::{Container, FileDescriptor, SymLink, md5_hex};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

pub const X_AUTH_TOKEN: HeaderName = HeaderName::from_static("x-auth-token");
pub const X_OBJECT_META_LOCATION: HeaderName = HeaderName::from_static("x-object-meta-location");
pub const X_OBJECT_META_DELETE_AT: HeaderName =
    HeaderName::from_static("x-object-meta-delete-at");
pub const X_OBJECT_META_LINK_KEY: HeaderName = HeaderName::from_static("x-object-meta-link-key");
pub const X_OBJECT_META_CONTENT_DISPOSITION: HeaderName =
    HeaderName::from_static("x-object-meta-content-disposition");

/// Performs one request per call against a container
#[derive(Clone)]
pub struct FileOperation {
    transport: Arc<dyn HttpTransport>,
    session: Arc<Session>,
}

impl FileOperation {
    pub fn new(transport: Arc<dyn HttpTransport>, session: Arc<Session>) -> Self {
        Self { transport, session }
    }

    /// Upload a file and verify the checksum the service echoes back
    ///
    /// The descriptor's precomputed checksum is sent as `ETag`, so the
    /// service also verifies the bytes on its side.
    pub async fn upload(&self, container: &Container, file: &FileDescriptor) -> Result<()> {
        let target = target(container, file.server_name());
        let local = file
            .local()
            .ok_or_else(|| Error::MissingLocalContent(target.clone()))?;
        let body = local.source.read().await?;

        let response = self
            .send_authorized(Operation::Upload, &target, |credentials| {
                let url = container.object_url(&credentials.storage_url, file.server_name())?;
                HttpRequest::new(Method::PUT, url)
                    .header(X_AUTH_TOKEN, &credentials.token)?
                    .header(CONTENT_TYPE, &local.content_type)?
                    .header(CONTENT_LENGTH, body.len().to_string())?
                    .header(ETAG, &local.checksum)
                    .map(|r| r.body(body.clone()))
            })
            .await?;

        match response.status {
            StatusCode::CREATED => verify_etag(&target, &local.checksum, &response),
            // The service computed a different checksum than the ETag we sent
            StatusCode::UNPROCESSABLE_ENTITY => Err(Error::IntegrityMismatch {
                target,
                local: local.checksum.clone(),
                remote: None,
            }),
            status => Err(unexpected(Operation::Upload, target, status)),
        }
    }

    /// Delete an object; a missing object is reported as a 404 failure
    pub async fn delete(&self, container: &Container, file: &FileDescriptor) -> Result<()> {
        let target = target(container, file.server_name());

        let response = self
            .send_authorized(Operation::Delete, &target, |credentials| {
                let url = container.object_url(&credentials.storage_url, file.server_name())?;
                HttpRequest::new(Method::DELETE, url).header(X_AUTH_TOKEN, &credentials.token)
            })
            .await?;

        match response.status {
            StatusCode::NO_CONTENT => Ok(()),
            status => Err(unexpected(Operation::Delete, target, status)),
        }
    }

    /// Create a link object pointing at another object of the same container
    pub async fn create_symlink(&self, container: &Container, link: &SymLink) -> Result<()> {
        let target = target(container, link.server_name());
        let location = link.location(container);
        let link_key = link.link_key(container);

        let response = self
            .send_authorized(Operation::Symlink, &target, |credentials| {
                let url = container.object_url(&credentials.storage_url, link.server_name())?;
                let mut request = HttpRequest::new(Method::PUT, url)
                    .header(X_AUTH_TOKEN, &credentials.token)?
                    .header(CONTENT_TYPE, link.content_type())?
                    .header(CONTENT_LENGTH, "0")?
                    .header(X_OBJECT_META_LOCATION, &location)?;
                if let Some(at) = link.delete_at() {
                    request = request.header(X_OBJECT_META_DELETE_AT, at.as_second().to_string())?;
                }
                if let Some(key) = &link_key {
                    request = request.header(X_OBJECT_META_LINK_KEY, key)?;
                }
                if let Some(disposition) = link.content_disposition() {
                    request = request.header(X_OBJECT_META_CONTENT_DISPOSITION, disposition)?;
                }
                Ok(request)
            })
            .await?;

        match response.status {
            StatusCode::CREATED if response.headers.contains_key(ETAG) => {
                verify_etag(&target, &md5_hex(b""), &response)
            }
            StatusCode::CREATED => Ok(()),
            status => Err(unexpected(Operation::Symlink, target, status)),
        }
    }

    /// Send with the session token, refreshing once on 401
    async fn send_authorized<F>(
        &self,
        operation: Operation,
        target: &str,
        build: F,
    ) -> Result<HttpResponse>
    where
        F: Fn(&Credentials) -> Result<HttpRequest>,
    {
        let credentials = self.session.credentials().await?;
        let response = self.send(operation, target, build(&credentials)?).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::warn!(%operation, object = target, "token rejected, re-authenticating");
        let credentials = self.session.refresh_if_current(&credentials.token).await?;
        self.send(operation, target, build(&credentials)?).await
    }

    async fn send(
        &self,
        operation: Operation,
        target: &str,
        request: HttpRequest,
    ) -> Result<HttpResponse> {
        let method = request.method.clone();
        let response = self.transport.send(request).await.map_err(|e| {
            tracing::debug!(%operation, object = target, error = %e, "transport failure");
            Error::Transport(e)
        })?;
        tracing::debug!(
            %operation,
            %method,
            object = target,
            status = response.status.as_u16(),
            "response"
        );
        Ok(response)
    }
}

fn target(container: &Container, server_name: &str) -> String {
    format!("{}/{}", container.name(), server_name.trim_start_matches('/'))
}

fn unexpected(operation: Operation, target: String, status: StatusCode) -> Error {
    Error::UnexpectedHttpStatus {
        operation,
        target,
        status: status.as_u16(),
    }
}

/// Compare the response ETag with the expected checksum
fn verify_etag(target: &str, expected: &str, response: &HttpResponse) -> Result<()> {
    let remote = response
        .header_str(ETAG.as_str())
        .map(|etag| etag.trim_matches('"').to_ascii_lowercase());

    match remote {
        Some(remote) if remote == expected => Ok(()),
        remote => Err(Error::IntegrityMismatch {
            target: target.to_string(),
            local: expected.to_string(),
            remote,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use crate::testing::{FakeTransport, session_with_token};

    async fn upload_op(transport: &Arc<FakeTransport>) -> FileOperation {
        FileOperation::new(transport.clone(), session_with_token("tok").await)
    }

    async fn text_file(name: &str, content: &'static [u8]) -> FileDescriptor {
        FileDescriptor::builder(name)
            .bytes(Bytes::from_static(content))
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_success_sends_checksum_and_token() {
        let transport = FakeTransport::new();
        transport.respond_with_etag(Method::PUT, "c/a.txt", 201, "5eb63bbbe01eeed093cb22bb8f5acdc3");
        let op = upload_op(&transport).await;

        let file = text_file("a.txt", b"hello world").await;
        op.upload(&Container::new("c"), &file).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.url.path(), "/v1/SEL_1/c/a.txt");
        assert_eq!(request.headers["x-auth-token"], "tok");
        assert_eq!(request.headers["etag"], "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert_eq!(request.headers["content-length"], "11");
        assert_eq!(request.headers["content-type"], "text/plain");
        assert_eq!(&request.body[..], b"hello world");
    }

    #[tokio::test]
    async fn test_upload_accepts_quoted_uppercase_etag() {
        let transport = FakeTransport::new();
        transport.respond_with_etag(
            Method::PUT,
            "c/a.txt",
            201,
            "\"5EB63BBBE01EEED093CB22BB8F5ACDC3\"",
        );
        let op = upload_op(&transport).await;

        let file = text_file("a.txt", b"hello world").await;
        assert!(op.upload(&Container::new("c"), &file).await.is_ok());
    }

    #[tokio::test]
    async fn test_upload_with_corrupted_checksum_is_integrity_mismatch() {
        let transport = FakeTransport::new();
        transport.respond_with_etag(Method::PUT, "c/a.txt", 201, "5eb63bbbe01eeed093cb22bb8f5acdc3");
        let op = upload_op(&transport).await;

        let file = FileDescriptor::builder("a.txt")
            .bytes(Bytes::from_static(b"hello world"))
            .checksum("00000000000000000000000000000000")
            .build()
            .await
            .unwrap();
        let err = op.upload(&Container::new("c"), &file).await.unwrap_err();

        match err {
            Error::IntegrityMismatch {
                target,
                local,
                remote,
            } => {
                assert_eq!(target, "c/a.txt");
                assert_eq!(local, "00000000000000000000000000000000");
                assert_eq!(remote.as_deref(), Some("5eb63bbbe01eeed093cb22bb8f5acdc3"));
            }
            other => panic!("expected integrity mismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_without_etag_is_unverified() {
        let transport = FakeTransport::new();
        transport.respond(Method::PUT, "c/a.txt", 201);
        let op = upload_op(&transport).await;

        let file = text_file("a.txt", b"hello world").await;
        let err = op.upload(&Container::new("c"), &file).await.unwrap_err();
        assert!(matches!(err, Error::IntegrityMismatch { remote: None, .. }));
    }

    #[tokio::test]
    async fn test_upload_rejected_checksum_422() {
        let transport = FakeTransport::new();
        transport.respond(Method::PUT, "c/a.txt", 422);
        let op = upload_op(&transport).await;

        let file = text_file("a.txt", b"hello world").await;
        let err = op.upload(&Container::new("c"), &file).await.unwrap_err();
        assert!(matches!(err, Error::IntegrityMismatch { remote: None, .. }));
    }

    #[tokio::test]
    async fn test_upload_unexpected_status() {
        let transport = FakeTransport::new();
        transport.respond(Method::PUT, "c/a.txt", 507);
        let op = upload_op(&transport).await;

        let file = text_file("a.txt", b"hello world").await;
        let err = op.upload(&Container::new("c"), &file).await.unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedHttpStatus {
                operation: Operation::Upload,
                status: 507,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_upload_remote_descriptor_fails_without_request() {
        let transport = FakeTransport::new();
        let op = upload_op(&transport).await;

        let err = op
            .upload(&Container::new("c"), &FileDescriptor::remote("a.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingLocalContent(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_distinguished() {
        let transport = FakeTransport::new();
        transport.fail_connect(Method::DELETE, "c/a.txt");
        let op = upload_op(&transport).await;

        let err = op
            .delete(&Container::new("c"), &FileDescriptor::remote("a.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_delete_success_and_not_found() {
        let transport = FakeTransport::new();
        transport.respond(Method::DELETE, "c/a.txt", 204);
        transport.respond(Method::DELETE, "c/missing.txt", 404);
        let op = upload_op(&transport).await;
        let container = Container::new("c");

        op.delete(&container, &FileDescriptor::remote("a.txt"))
            .await
            .unwrap();

        let err = op
            .delete(&container, &FileDescriptor::remote("missing.txt"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(
            err,
            Error::UnexpectedHttpStatus {
                operation: Operation::Delete,
                status: 404,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_dot_segments_never_reach_the_service() {
        let transport = FakeTransport::new();
        transport.default_status(204);
        let op = upload_op(&transport).await;
        let container = Container::new("c");

        let err = op
            .delete(&container, &FileDescriptor::remote("../../SEL_2/x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));

        let file = text_file("a/../b.txt", b"hello world").await;
        let err = op.upload(&container, &file).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));

        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_refreshes_and_retries_once() {
        let transport = FakeTransport::new();
        transport.respond_for_token(Method::DELETE, "c/a.txt", "tok", 401);
        transport.respond_for_token(Method::DELETE, "c/a.txt", "tok-2", 204);
        let session = crate::testing::session_with_tokens(&["tok", "tok-2"]).await;
        let op = FileOperation::new(transport.clone(), session);

        op.delete(&Container::new("c"), &FileDescriptor::remote("a.txt"))
            .await
            .unwrap();

        let tokens: Vec<_> = transport
            .requests()
            .iter()
            .map(|r| r.headers["x-auth-token"].to_str().unwrap().to_string())
            .collect();
        assert_eq!(tokens, vec!["tok", "tok-2"]);
    }

    #[tokio::test]
    async fn test_symlink_headers() {
        let transport = FakeTransport::new();
        transport.respond(Method::PUT, "c/links/one", 201);
        let op = upload_op(&transport).await;

        let link = SymLink::new("links/one", "test.txt", crate::model::SymLinkType::OneTime)
            .with_delete_at(jiff::Timestamp::from_second(1_700_000_000).unwrap())
            .with_password("pw")
            .with_content_disposition("attachment");
        op.create_symlink(&Container::new("c"), &link).await.unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.headers["content-type"], "x-storage/onetime-symlink+secure");
        assert_eq!(request.headers["content-length"], "0");
        assert_eq!(request.headers["x-object-meta-location"], "/c/test.txt");
        assert_eq!(request.headers["x-object-meta-delete-at"], "1700000000");
        assert_eq!(
            request.headers["x-object-meta-link-key"],
            "fbcfd087542f56b8d7c3c2e8ecad3abb9edea126"
        );
        assert_eq!(
            request.headers["x-object-meta-content-disposition"],
            "attachment"
        );
        assert!(request.body.is_empty());
    }

    #[tokio::test]
    async fn test_symlink_echoed_checksum_is_verified() {
        let transport = FakeTransport::new();
        transport.respond_with_etag(Method::PUT, "c/good", 201, "d41d8cd98f00b204e9800998ecf8427e");
        transport.respond_with_etag(Method::PUT, "c/bad", 201, "ffff");
        let op = upload_op(&transport).await;
        let container = Container::new("c");

        let good = SymLink::new("good", "t", crate::model::SymLinkType::Permanent);
        op.create_symlink(&container, &good).await.unwrap();

        let bad = SymLink::new("bad", "t", crate::model::SymLinkType::Permanent);
        let err = op.create_symlink(&container, &bad).await.unwrap_err();
        assert!(matches!(err, Error::IntegrityMismatch { .. }));
    }
}
