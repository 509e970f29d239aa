//! selstore-core: Core library for the selstore object storage client
//!
//! This crate provides:
//! - Immutable file and symlink descriptors
//! - Single-object operations with integrity checks
//! - A bounded parallel batch executor with strict and best-effort modes
//! - Signed temporary download links
//! - Session handling with single-flight token refresh
//! - Configuration and account management
//!
//! All network access goes through the [`HttpTransport`] and
//! [`Authenticator`] traits, so the crate has no HTTP client of its own.

pub mod account;
pub mod auth;
pub mod batch;
pub mod config;
pub mod error;
pub mod model;
pub mod operation;
pub mod path;
pub mod service;
pub mod signer;
pub mod transport;

#[cfg(test)]
mod testing;

pub use account::{Account, AccountManager, TimeoutConfig};
pub use auth::{Authenticator, Credentials, Session, SessionState};
pub use batch::{
    BatchExecutor, BatchItem, BatchMode, BatchProgress, BatchReport, DEFAULT_CONCURRENCY,
    ItemOutcome,
};
pub use config::{Config, ConfigManager, Defaults};
pub use error::{
    BatchFailure, Error, ItemFailure, Operation, Result, TransportError, TransportErrorKind,
};
pub use model::{Container, FileDescriptor, FileDescriptorBuilder, LocalSource, SymLink, SymLinkType};
pub use operation::FileOperation;
pub use path::{RemotePath, parse_remote_path};
pub use service::StorageService;
pub use signer::{SignOptions, SignatureDigest, sign_download_link, sign_download_link_with};
pub use transport::{HttpRequest, HttpResponse, HttpTransport};
