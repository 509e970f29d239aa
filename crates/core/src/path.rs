//! Remote path parsing
//!
//! Remote paths have the form `account/container[/object]`.

use crate::error::{Error, Result};

/// A parsed remote path pointing into a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    /// Account name
    pub account: String,
    /// Container name
    pub container: String,
    /// Object name (empty for the container root)
    pub object: String,
    /// Whether the path ends with a slash (prefix semantics)
    pub is_dir: bool,
}

impl RemotePath {
    pub fn new(
        account: impl Into<String>,
        container: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        let object = object.into();
        let is_dir = object.ends_with('/') || object.is_empty();
        Self {
            account: account.into(),
            container: container.into(),
            object,
            is_dir,
        }
    }

    /// Get the full path as a string (account/container/object)
    pub fn to_full_path(&self) -> String {
        if self.object.is_empty() {
            format!("{}/{}", self.account, self.container)
        } else {
            format!("{}/{}/{}", self.account, self.container, self.object)
        }
    }

    /// Append a child name below this path
    pub fn join(&self, child: &str) -> Self {
        let base = self.object.trim_end_matches('/');
        let child = child.trim_start_matches('/');
        let object = if base.is_empty() {
            child.to_string()
        } else {
            format!("{base}/{child}")
        };
        let is_dir = child.ends_with('/');
        Self {
            account: self.account.clone(),
            container: self.container.clone(),
            object,
            is_dir,
        }
    }

    /// Fail unless the path names a single object
    pub fn require_object(&self) -> Result<&str> {
        if self.object.is_empty() || self.is_dir {
            return Err(Error::InvalidPath(format!(
                "'{}' does not name an object. Use format: account/container/object",
                self.to_full_path()
            )));
        }
        Ok(&self.object)
    }
}

impl std::fmt::Display for RemotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_full_path())
    }
}

/// Parse `account/container[/object]`
pub fn parse_remote_path(path: &str) -> Result<RemotePath> {
    if path.is_empty() {
        return Err(Error::InvalidPath("Path cannot be empty".into()));
    }

    let mut parts = path.splitn(3, '/');
    let account = parts.next().unwrap_or_default();
    let container = parts.next();
    let object = parts.next().unwrap_or_default();

    if !is_valid_account_name(account) {
        return Err(Error::InvalidPath(format!(
            "Invalid account name in '{path}'. Use letters, digits, '_' or '-'"
        )));
    }

    match container {
        None => Err(Error::InvalidPath(format!(
            "Path '{path}' is incomplete. Use format: account/container[/object]"
        ))),
        Some("") => Err(Error::InvalidPath("Container name cannot be empty".into())),
        Some(container) => Ok(RemotePath::new(account, container, object)),
    }
}

/// Check if a string is a valid account name
pub fn is_valid_account_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
