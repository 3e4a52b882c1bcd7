//! Host integration
//!
//! The core never talks to a UI directly. A host (browser add-on shell, desktop
//! CLI, tray app) implements `Host` and feeds context-menu clicks into the
//! upload pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Context-menu id the upload pipeline reacts to
pub const UPLOAD_MENU_ID: &str = "uploadToOwncloud";

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Clipboard init failed: {0}")]
    ClipboardInit(String),
    #[error("Clipboard write failed: {0}")]
    ClipboardWrite(String),
    #[error("Failed to open settings: {0}")]
    OpenSettings(String),
}

/// Kinds of page element the menu entry is offered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaContext {
    Image,
    Video,
    Audio,
}

/// Context-menu entry a host registers at install/startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub id: String,
    pub title: String,
    pub contexts: Vec<MediaContext>,
}

impl MenuEntry {
    pub fn upload() -> Self {
        Self {
            id: UPLOAD_MENU_ID.to_string(),
            title: "Upload to Owncloud".to_string(),
            contexts: vec![MediaContext::Image, MediaContext::Video, MediaContext::Audio],
        }
    }
}

/// A context-menu activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuClick {
    pub menu_item_id: String,
    /// Source URL of the clicked media element, if any
    pub src_url: Option<String>,
}

impl MenuClick {
    pub fn upload(src_url: impl Into<String>) -> Self {
        Self {
            menu_item_id: UPLOAD_MENU_ID.to_string(),
            src_url: Some(src_url.into()),
        }
    }
}

/// Capabilities the core consumes from its host.
pub trait Host: Send + Sync {
    /// Called once at install/startup. Hosts without menus may ignore it.
    fn register_menu(&self, entry: &MenuEntry) {
        tracing::debug!("Menu entry {} not registered: host has no context menus", entry.id);
    }

    fn notify(&self, title: &str, message: &str);

    /// Bring up the settings surface so the user can finish configuration.
    fn open_settings(&self) -> Result<(), HostError>;

    fn write_clipboard(&self, text: &str) -> Result<(), HostError>;
}

// ============ Desktop host ============

/// Host for the command line: terminal notifications, system clipboard and
/// the platform opener for the settings file.
pub struct DesktopHost {
    settings_path: PathBuf,
}

impl DesktopHost {
    pub fn new(settings_path: impl Into<PathBuf>) -> Self {
        Self {
            settings_path: settings_path.into(),
        }
    }
}

impl Host for DesktopHost {
    fn notify(&self, title: &str, message: &str) {
        eprintln!("[{}] {}", title, message);
    }

    fn open_settings(&self) -> Result<(), HostError> {
        eprintln!("Settings file: {}", self.settings_path.display());
        eprintln!("Run `davdrop configure` to set the server and credentials.");

        if !self.settings_path.exists() {
            return Ok(());
        }
        open::that(&self.settings_path).map_err(|e| HostError::OpenSettings(e.to_string()))
    }

    fn write_clipboard(&self, text: &str) -> Result<(), HostError> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| HostError::ClipboardInit(e.to_string()))?;
        #[cfg(target_os = "linux")]
        {
            // X11/Wayland drop the selection when the owner exits; wait until a
            // clipboard manager has taken it.
            use arboard::SetExtLinux;
            clipboard
                .set()
                .wait_until(std::time::Instant::now() + std::time::Duration::from_secs(2))
                .text(text.to_string())
                .map_err(|e| HostError::ClipboardWrite(e.to_string()))?;
        }
        #[cfg(not(target_os = "linux"))]
        {
            clipboard
                .set_text(text.to_string())
                .map_err(|e| HostError::ClipboardWrite(e.to_string()))?;
        }
        Ok(())
    }
}
