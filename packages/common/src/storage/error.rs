use std::fmt;
use std::time::Duration;

/// Errors that can occur during blob storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// The requested blob was not found.
    NotFound(String),
    /// An I/O error occurred.
    Io(std::io::Error),
    /// The key is empty or would escape the store's namespace.
    InvalidKey(String),
    /// The remote backend rejected or failed the request.
    Backend(String),
    /// The operation did not finish before its deadline.
    Timeout(Duration),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "blob not found: {key}"),
            Self::Io(err) => write!(f, "storage IO error: {err}"),
            Self::InvalidKey(msg) => write!(f, "invalid blob key: {msg}"),
            Self::Backend(msg) => write!(f, "storage backend error: {msg}"),
            Self::Timeout(limit) => {
                write!(f, "storage operation timed out after {}s", limit.as_secs())
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Reject keys that are empty, contain path separators, or name a parent/current directory.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key is empty".into()));
    }
    if key.len() > 512 {
        return Err(StorageError::InvalidKey("key exceeds 512 bytes".into()));
    }
    if key == "." || key == ".." || key.starts_with(".tmp") {
        return Err(StorageError::InvalidKey(format!("reserved key '{key}'")));
    }
    if key.contains(['/', '\\', '\0']) {
        return Err(StorageError::InvalidKey(format!(
            "key '{key}' contains a path separator or NUL"
        )));
    }
    Ok(())
}
