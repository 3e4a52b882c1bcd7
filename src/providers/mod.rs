//! WebDAV Backend Module
//!
//! The upload pipeline and the folder browser talk to the server only through
//! the `DavBackend` trait. `WebDavClient` is the real implementation for
//! ownCloud/Nextcloud; tests and embedding hosts can substitute their own.
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐
//! │ Upload       │   │ Folder        │
//! │ Pipeline     │   │ Browser       │
//! └──────┬───────┘   └───────┬───────┘
//!        └─────────┬─────────┘
//!                  ▼
//!        ┌───────────────────┐
//!        │  DavBackend Trait │
//!        └─────────┬─────────┘
//!                  ▼
//!        ┌───────────────────┐
//!        │   WebDavClient    │  PROPFIND / PUT
//!        └───────────────────┘
//! ```

pub mod types;
pub mod webdav;

pub use types::*;
pub use webdav::WebDavClient;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::settings::Credentials;

/// Operations the core needs from a WebDAV server.
#[async_trait]
pub trait DavBackend: Send + Sync {
    /// PROPFIND the WebDAV root; true iff the server answers 2xx.
    /// Never fails: transport errors count as an unsuccessful test.
    async fn test_connection(&self, creds: &Credentials) -> bool;

    /// List the child collections of `path`.
    ///
    /// A non-2xx answer is an error; transport and XML problems yield an empty list.
    async fn list_folders(&self, creds: &Credentials, path: &str) -> Result<Vec<FolderEntry>, DavError>;

    /// PUT `media` as `filename` inside `folder_path` and return the response status.
    /// The caller decides what a non-2xx status means.
    async fn upload(
        &self,
        creds: &Credentials,
        folder_path: &str,
        filename: &str,
        media: MediaBlob,
    ) -> Result<StatusCode, DavError>;
}
