//! Container, file and symlink value objects
//!
//! These are built by the caller and only read by the operations.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use jiff::Timestamp;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::{Digest, Sha1};
use url::Url;

use crate::error::{Error, Result};

/// Characters left unescaped in a path segment (RFC 3986 unreserved)
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Content type used when nothing better is known
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Percent-encode an object path, keeping `/` separators
pub fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Reject `.` and `..` segments
///
/// URL parsing collapses them (escaped or not), which would address a
/// different object than the one named.
fn check_segments(kind: &str, value: &str) -> Result<()> {
    match value.split('/').find(|s| matches!(*s, "." | "..")) {
        Some(segment) => Err(Error::InvalidPath(format!(
            "{kind} '{value}' contains a '{segment}' segment"
        ))),
        None => Ok(()),
    }
}

/// Build `{base}/{container}/{name}` with every segment escaped
pub fn object_url(base: &Url, container: &str, name: &str) -> Result<Url> {
    if container.is_empty() || container.contains('/') {
        return Err(Error::InvalidPath(format!("invalid container name '{container}'")));
    }
    check_segments("container", container)?;
    check_segments("object name", name)?;
    let url = format!(
        "{}/{}/{}",
        base.as_str().trim_end_matches('/'),
        utf8_percent_encode(container, SEGMENT),
        encode_object_path(name.trim_start_matches('/'))
    );
    Ok(Url::parse(&url)?)
}

/// MD5 of `data` as lowercase hex, the checksum the service reports as ETag
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// A named container on the storage service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    name: String,
    public_url: Option<Url>,
}

impl Container {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public_url: None,
        }
    }

    /// Attach the public base URL objects of this container are served from
    pub fn with_public_url(mut self, url: &str) -> Result<Self> {
        self.public_url = Some(Url::parse(url)?);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn public_url(&self) -> Option<&Url> {
        self.public_url.as_ref()
    }

    /// URL of an object under the given storage endpoint
    pub fn object_url(&self, storage_url: &Url, server_name: &str) -> Result<Url> {
        object_url(storage_url, &self.name, server_name)
    }

    /// Public download URL of an object, if a public base URL is set
    ///
    /// The public URL already addresses the container, so only the object
    /// name is appended.
    pub fn public_object_url(&self, server_name: &str) -> Option<Result<Url>> {
        self.public_url.as_ref().map(|base| {
            check_segments("object name", server_name)?;
            let url = format!(
                "{}/{}",
                base.as_str().trim_end_matches('/'),
                encode_object_path(server_name.trim_start_matches('/'))
            );
            Url::parse(&url).map_err(Error::from)
        })
    }
}

/// Where the bytes of a local file come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalSource {
    Path(PathBuf),
    Bytes(Bytes),
}

impl LocalSource {
    /// Read the whole content
    pub async fn read(&self) -> Result<Bytes> {
        match self {
            LocalSource::Path(path) => Ok(Bytes::from(tokio::fs::read(path).await?)),
            LocalSource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Local half of a descriptor: everything an upload needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalContent {
    pub source: LocalSource,
    pub size: u64,
    pub content_type: String,
    /// Lowercase hex MD5 of the content at build time
    pub checksum: String,
}

/// One object to transfer or delete
///
/// Only obtainable through [`FileDescriptor::builder`] (fully populated for
/// upload) or [`FileDescriptor::remote`] (server name only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    server_name: String,
    local: Option<LocalContent>,
}

impl FileDescriptor {
    pub fn builder(server_name: impl Into<String>) -> FileDescriptorBuilder {
        FileDescriptorBuilder {
            server_name: server_name.into(),
            source: None,
            content_type: None,
            checksum: None,
        }
    }

    /// Descriptor for an object that only exists server side
    pub fn remote(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            local: None,
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn local(&self) -> Option<&LocalContent> {
        self.local.as_ref()
    }

    pub fn size(&self) -> Option<u64> {
        self.local.as_ref().map(|l| l.size)
    }

    pub fn checksum(&self) -> Option<&str> {
        self.local.as_ref().map(|l| l.checksum.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.local.as_ref().map(|l| l.content_type.as_str())
    }
}

/// Collects the parts of a [`FileDescriptor`] and validates them once
#[derive(Debug)]
pub struct FileDescriptorBuilder {
    server_name: String,
    source: Option<LocalSource>,
    content_type: Option<String>,
    checksum: Option<String>,
}

impl FileDescriptorBuilder {
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(LocalSource::Path(path.into()));
        self
    }

    pub fn bytes(mut self, bytes: impl Into<Bytes>) -> Self {
        self.source = Some(LocalSource::Bytes(bytes.into()));
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Use a precomputed checksum instead of hashing the content
    pub fn checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into().to_ascii_lowercase());
        self
    }

    /// Read the source and fill size, content type and checksum
    pub async fn build(self) -> Result<FileDescriptor> {
        let source = self
            .source
            .ok_or_else(|| Error::MissingLocalContent(self.server_name.clone()))?;
        let data = source.read().await?;

        let content_type = match self.content_type {
            Some(ct) => ct,
            None => {
                let hint = match &source {
                    LocalSource::Path(path) => path.as_path(),
                    LocalSource::Bytes(_) => Path::new(&self.server_name),
                };
                guess_content_type(hint)
            }
        };
        let checksum = self.checksum.unwrap_or_else(|| md5_hex(&data));

        Ok(FileDescriptor {
            server_name: self.server_name,
            local: Some(LocalContent {
                source,
                size: data.len() as u64,
                content_type,
                checksum,
            }),
        })
    }
}

fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

/// Lifetime of a symlink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymLinkType {
    /// Deleted by the service after the first download
    OneTime,
    Permanent,
}

/// A server-side link to another object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymLink {
    server_name: String,
    target: String,
    link_type: SymLinkType,
    delete_at: Option<Timestamp>,
    password: Option<String>,
    content_disposition: Option<String>,
}

impl SymLink {
    /// Link `server_name` pointing at `target`, both names inside one container
    pub fn new(
        server_name: impl Into<String>,
        target: impl Into<String>,
        link_type: SymLinkType,
    ) -> Self {
        Self {
            server_name: server_name.into(),
            target: target.into(),
            link_type,
            delete_at: None,
            password: None,
            content_disposition: None,
        }
    }

    pub fn with_delete_at(mut self, at: Timestamp) -> Self {
        self.delete_at = Some(at);
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_content_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.content_disposition = Some(disposition.into());
        self
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn link_type(&self) -> SymLinkType {
        self.link_type
    }

    pub fn delete_at(&self) -> Option<Timestamp> {
        self.delete_at
    }

    pub fn content_disposition(&self) -> Option<&str> {
        self.content_disposition.as_deref()
    }

    /// Content type that tells the service this object is a link
    pub fn content_type(&self) -> &'static str {
        match (self.link_type, self.password.is_some()) {
            (SymLinkType::Permanent, false) => "x-storage/symlink",
            (SymLinkType::Permanent, true) => "x-storage/symlink+secure",
            (SymLinkType::OneTime, false) => "x-storage/onetime-symlink",
            (SymLinkType::OneTime, true) => "x-storage/onetime-symlink+secure",
        }
    }

    /// Absolute location of the target: `/{container}/{target}`
    pub fn location(&self, container: &Container) -> String {
        format!(
            "/{}/{}",
            container.name(),
            self.target.trim_start_matches('/')
        )
    }

    /// Key protecting a secure link: hex SHA-1 of password + location
    pub fn link_key(&self, container: &Container) -> Option<String> {
        self.password.as_ref().map(|password| {
            let mut hasher = Sha1::new();
            hasher.update(password.as_bytes());
            hasher.update(self.location(container).as_bytes());
            hex::encode(hasher.finalize())
        })
    }
}
