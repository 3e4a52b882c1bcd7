//! Shared types for the WebDAV backend
//!
//! Folder entries, uploaded media and the error type returned by backends.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A child collection found by a PROPFIND listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    /// Decoded last segment of the collection's href
    pub name: String,
}

impl FolderEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for FolderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Opaque media payload with its MIME type
#[derive(Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl MediaBlob {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for MediaBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaBlob")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// WebDAV backend errors
#[derive(Debug, Error)]
pub enum DavError {
    /// The server answered, but not with a 2xx status
    #[error("Server returned status: {0}")]
    Status(reqwest::StatusCode),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Client error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for DavError {
    fn from(err: reqwest::Error) -> Self {
        DavError::Network(err.to_string())
    }
}

impl From<quick_xml::Error> for DavError {
    fn from(err: quick_xml::Error) -> Self {
        DavError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_blob_debug_hides_bytes() {
        let blob = MediaBlob::new(vec![1, 2, 3], "image/png");
        let debug = format!("{:?}", blob);
        assert!(debug.contains("len: 3"));
        assert!(debug.contains("image/png"));
    }

    #[test]
    fn test_status_error_display() {
        let err = DavError::Status(reqwest::StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Server returned status: 404 Not Found");
    }
}
