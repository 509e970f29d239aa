//! Public façade over single-object operations and the batch executor

use std::sync::Arc;

use jiff::Timestamp;

use crate::auth::Session;
use crate::batch::{BatchExecutor, BatchMode, BatchProgress, BatchReport};
use crate::error::Result;
use crate::model::{Container, FileDescriptor, SymLink};
use crate::operation::FileOperation;
use crate::signer;
use crate::transport::HttpTransport;

/// Entry point for working with one storage account
#[derive(Clone)]
pub struct StorageService {
    operation: FileOperation,
    executor: BatchExecutor,
    session: Arc<Session>,
}

impl StorageService {
    pub fn new(session: Arc<Session>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            operation: FileOperation::new(transport, Arc::clone(&session)),
            executor: BatchExecutor::default(),
            session,
        }
    }

    /// Cap the number of requests a batch keeps in flight
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        let progress = self.executor.progress();
        self.executor = BatchExecutor::new(concurrency);
        if let Some(progress) = progress {
            self.executor = self.executor.with_progress(progress);
        }
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn BatchProgress>) -> Self {
        self.executor = self.executor.with_progress(progress);
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn concurrency(&self) -> usize {
        self.executor.concurrency()
    }

    pub async fn upload_file(&self, container: &Container, file: &FileDescriptor) -> Result<()> {
        self.operation.upload(container, file).await
    }

    pub async fn upload_files(
        &self,
        container: &Container,
        files: Vec<FileDescriptor>,
        mode: BatchMode,
    ) -> Result<BatchReport> {
        let operation = self.operation.clone();
        let container = container.clone();
        self.executor
            .run(files, mode, move |file| {
                let operation = operation.clone();
                let container = container.clone();
                async move { operation.upload(&container, &file).await }
            })
            .await
    }

    pub async fn delete_file(&self, container: &Container, file: &FileDescriptor) -> Result<()> {
        self.operation.delete(container, file).await
    }

    pub async fn delete_files(
        &self,
        container: &Container,
        files: Vec<FileDescriptor>,
        mode: BatchMode,
    ) -> Result<BatchReport> {
        let operation = self.operation.clone();
        let container = container.clone();
        self.executor
            .run(files, mode, move |file| {
                let operation = operation.clone();
                let container = container.clone();
                async move { operation.delete(&container, &file).await }
            })
            .await
    }

    pub async fn create_symlink(&self, container: &Container, link: &SymLink) -> Result<()> {
        self.operation.create_symlink(container, link).await
    }

    pub async fn create_symlinks(
        &self,
        container: &Container,
        links: Vec<SymLink>,
        mode: BatchMode,
    ) -> Result<BatchReport> {
        let operation = self.operation.clone();
        let container = container.clone();
        self.executor
            .run(links, mode, move |link| {
                let operation = operation.clone();
                let container = container.clone();
                async move { operation.create_symlink(&container, &link).await }
            })
            .await
    }

    /// Signed GET link for `url`; see [`signer::sign_download_link`]
    pub fn sign_file_download_link(
        url: &str,
        expires: Timestamp,
        secret_key: &str,
    ) -> Result<String> {
        signer::sign_download_link(url, expires, secret_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Method;

    use crate::error::Error;
    use crate::testing::{FakeTransport, session_with_token};

    async fn service(transport: &Arc<FakeTransport>) -> StorageService {
        StorageService::new(session_with_token("tok").await, transport.clone())
    }

    async fn local_files(names: &[&str]) -> Vec<FileDescriptor> {
        let mut files = Vec::new();
        for name in names {
            let file = FileDescriptor::builder(*name)
                .bytes(Bytes::from(format!("content of {name}")))
                .build()
                .await
                .unwrap();
            files.push(file);
        }
        files
    }

    #[tokio::test]
    async fn test_empty_batches_never_touch_transport() {
        let transport = FakeTransport::new();
        let service = service(&transport).await;
        let container = Container::new("c");

        assert!(service
            .upload_files(&container, Vec::new(), BatchMode::Strict)
            .await
            .unwrap()
            .is_empty());
        assert!(service
            .delete_files(&container, Vec::new(), BatchMode::Strict)
            .await
            .unwrap()
            .is_empty());
        assert!(service
            .create_symlinks(&container, Vec::new(), BatchMode::Strict)
            .await
            .unwrap()
            .is_empty());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_upload_files_strict_reports_failed_subset() {
        let transport = FakeTransport::new();
        transport.default_echo_md5();
        transport.respond(Method::PUT, "c/b.txt", 500);
        transport.respond_with_etag(Method::PUT, "c/d.txt", 201, "deadbeef");
        let service = service(&transport).await.with_concurrency(2);

        let files = local_files(&["a.txt", "b.txt", "c.txt", "d.txt", "e.txt"]).await;
        let err = service
            .upload_files(&Container::new("c"), files, BatchMode::Strict)
            .await
            .unwrap_err();

        match err {
            Error::Batch(failure) => {
                assert_eq!(failure.total, 5);
                assert_eq!(failure.failed_names(), vec!["b.txt", "d.txt"]);
                assert_eq!(failure.failures[0].error.status(), Some(500));
                assert!(matches!(
                    failure.failures[1].error,
                    Error::IntegrityMismatch { .. }
                ));
            }
            other => panic!("expected batch failure, got {other:?}"),
        }
        // Every item was attempted before the aggregate error was raised
        assert_eq!(transport.requests().len(), 5);
    }

    #[tokio::test]
    async fn test_delete_files_best_effort_keeps_not_found() {
        let transport = FakeTransport::new();
        transport.default_status(204);
        transport.respond(Method::DELETE, "c/gone", 404);
        let service = service(&transport).await;

        let files = vec![FileDescriptor::remote("here"), FileDescriptor::remote("gone")];
        let report = service
            .delete_files(&Container::new("c"), files, BatchMode::BestEffort)
            .await
            .unwrap();

        assert_eq!(report.len(), 2);
        let failed: Vec<_> = report.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].name, "gone");
        assert!(failed[0].result.as_ref().unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_batch_respects_configured_concurrency() {
        let transport = FakeTransport::with_delay(std::time::Duration::from_millis(20));
        transport.default_status(204);
        let service = service(&transport).await.with_concurrency(3);

        let files = (0..10).map(|i| FileDescriptor::remote(format!("f{i}"))).collect();
        service
            .delete_files(&Container::new("c"), files, BatchMode::Strict)
            .await
            .unwrap();

        assert_eq!(transport.requests().len(), 10);
        assert!(transport.max_in_flight() <= 3);
    }

    #[tokio::test]
    async fn test_single_operations_and_symlinks() {
        let transport = FakeTransport::new();
        transport.default_echo_md5();
        transport.respond(Method::DELETE, "c/a.txt", 204);
        let service = service(&transport).await;
        let container = Container::new("c");

        let file = local_files(&["a.txt"]).await.remove(0);
        service.upload_file(&container, &file).await.unwrap();
        service.delete_file(&container, &file).await.unwrap();

        let links = vec![
            SymLink::new("l1", "a.txt", crate::model::SymLinkType::Permanent),
            SymLink::new("l2", "a.txt", crate::model::SymLinkType::OneTime),
        ];
        let report = service
            .create_symlinks(&container, links, BatchMode::Strict)
            .await
            .unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(transport.requests().len(), 4);
    }

    #[test]
    fn test_sign_file_download_link_delegates_to_signer() {
        let expires = Timestamp::from_second(1_700_000_000).unwrap();
        let signed = StorageService::sign_file_download_link(
            "https://1234.selcdn.ru/c/test.txt",
            expires,
            "secret",
        )
        .unwrap();
        assert!(signed.ends_with(
            "temp_url_sig=eb1cc3811fb0f8ab1fedf92abdc7696719c2a23c&temp_url_expires=1700000000"
        ));
    }
}
