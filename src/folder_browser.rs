//! Folder Browser
//!
//! Navigable view over the server's collections, used to pick the upload
//! destination. The browsing position is local state; it reaches the settings
//! store only through `persist`.

use std::fmt;
use std::sync::Arc;

use crate::providers::{DavBackend, FolderEntry};
use crate::settings::{SettingsError, SettingsStore};

/// One rendered line of the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderRow {
    /// ".. (Go back)"
    Back,
    Folder(String),
    /// "No subfolders found"
    Empty,
}

impl fmt::Display for FolderRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FolderRow::Back => f.write_str(".. (Go back)"),
            FolderRow::Folder(name) => f.write_str(name),
            FolderRow::Empty => f.write_str("No subfolders found"),
        }
    }
}

/// Rendered state after a reload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderView {
    pub current_path: String,
    pub rows: Vec<FolderRow>,
    /// Why the listing is empty, when it failed
    pub error: Option<String>,
}

impl FolderView {
    pub fn header(&self) -> String {
        format!("Current path: {}", self.current_path)
    }

    /// Folder names in display order
    pub fn folders(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().filter_map(|row| match row {
            FolderRow::Folder(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for FolderView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header())?;
        for row in &self.rows {
            writeln!(f, "  {}", row)?;
        }
        if let Some(ref error) = self.error {
            writeln!(f, "  ({})", error)?;
        }
        Ok(())
    }
}

/// Parent of a browse path; "/" for top-level folders and the root itself.
pub fn parent_path(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((parent, _)) if !parent.is_empty() => parent.to_string(),
        _ => "/".to_string(),
    }
}

/// Child of a browse path.
pub fn child_path(path: &str, name: &str) -> String {
    if path == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", path, name)
    }
}

/// "/A/B/" and "A/B" both become "/A/B"; empty becomes "/".
fn normalize_browse_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

pub struct FolderBrowser {
    current_path: String,
    backend: Arc<dyn DavBackend>,
    store: Arc<dyn SettingsStore>,
}

impl FolderBrowser {
    pub fn new(start_path: &str, backend: Arc<dyn DavBackend>, store: Arc<dyn SettingsStore>) -> Self {
        Self {
            current_path: normalize_browse_path(start_path),
            backend,
            store,
        }
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn is_root(&self) -> bool {
        self.current_path == "/"
    }

    /// Jump to an arbitrary path without reloading.
    pub fn set_path(&mut self, path: &str) {
        self.current_path = normalize_browse_path(path);
    }

    pub async fn navigate_into(&mut self, folder_name: &str) -> FolderView {
        self.current_path = child_path(&self.current_path, folder_name);
        tracing::debug!("Navigated into {}", self.current_path);
        self.reload().await
    }

    pub async fn navigate_up(&mut self) -> FolderView {
        self.current_path = parent_path(&self.current_path);
        tracing::debug!("Navigated up to {}", self.current_path);
        self.reload().await
    }

    /// List the current path and render it.
    ///
    /// Credentials are read from the store on every call. Missing credentials
    /// and listing failures render as an empty folder with an error note.
    pub async fn reload(&self) -> FolderView {
        let settings = match self.store.load() {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("Failed to load settings: {}", e);
                return self.render(Err(e.to_string()));
            }
        };
        let Some(creds) = settings.credentials() else {
            return self.render(Err("Server settings are incomplete".to_string()));
        };

        let listing = self
            .backend
            .list_folders(&creds, &self.current_path)
            .await
            .map_err(|e| {
                tracing::error!("Error fetching folders for {}: {}", self.current_path, e);
                e.to_string()
            });
        self.render(listing)
    }

    /// Build the view for a listing result.
    pub fn render(&self, listing: Result<Vec<FolderEntry>, String>) -> FolderView {
        let (folders, error) = match listing {
            Ok(folders) => (folders, None),
            Err(e) => (Vec::new(), Some(e)),
        };

        let mut rows = Vec::new();
        if !self.is_root() {
            rows.push(FolderRow::Back);
        }

        // Servers that echo the queried collection under a different href
        // would otherwise list the current folder inside itself
        let own_name = self.current_path.rsplit('/').next().unwrap_or_default();
        let before = rows.len();
        rows.extend(
            folders
                .into_iter()
                .filter(|f| f.name != own_name)
                .map(|f| FolderRow::Folder(f.name)),
        );
        if rows.len() == before {
            rows.push(FolderRow::Empty);
        }

        FolderView {
            current_path: self.current_path.clone(),
            rows,
            error,
        }
    }

    /// Save the current path as the upload folder.
    pub fn persist(&self) -> Result<(), SettingsError> {
        let path = self.current_path.clone();
        self.store.update(&mut |s| s.upload_folder = path.clone())?;
        tracing::info!("Upload folder set to {}", self.current_path);
        Ok(())
    }
}
