// davdrop Settings Store
// Persistent server credentials and upload destination

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

// ============ Error Types ============

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Settings store poisoned")]
    Poisoned,
}

// ============ Settings ============

/// Everything the uploader and the options page share.
///
/// Keys keep the camelCase names used by the synced storage of the browser
/// add-on, so an exported storage object can be dropped in as-is.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Base URL of the ownCloud/Nextcloud instance (e.g. https://cloud.example.com)
    #[serde(rename = "serverURL")]
    pub server_url: String,
    pub username: String,
    /// Stored in cleartext
    pub password: String,
    /// Destination folder, relative to the WebDAV root
    pub upload_folder: String,
    /// Copy the viewer URL after a successful upload
    pub copy_url_to_clipboard: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            username: String::new(),
            password: String::new(),
            upload_folder: "/".to_string(),
            copy_url_to_clipboard: false,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("upload_folder", &self.upload_folder)
            .field("copy_url_to_clipboard", &self.copy_url_to_clipboard)
            .finish()
    }
}

impl Settings {
    /// Credentials for a network call, if all three parts are present.
    pub fn credentials(&self) -> Option<Credentials> {
        if self.server_url.is_empty() || self.username.is_empty() || self.password.is_empty() {
            return None;
        }
        Some(Credentials::new(&self.server_url, &self.username, &self.password))
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }

    /// Upload folder, falling back to the WebDAV root when unset.
    pub fn upload_folder_or_root(&self) -> &str {
        if self.upload_folder.is_empty() {
            "/"
        } else {
            &self.upload_folder
        }
    }
}

/// Server URL plus Basic-Auth pair. Lives only for the duration of one operation.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub server_url: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(server_url: &str, username: &str, password: &str) -> Self {
        Self {
            server_url: server_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Server URL without trailing slashes, ready for path concatenation.
    pub fn base_url(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

// ============ Store ============

/// Key-value settings storage the core reads and writes.
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> Result<Settings, SettingsError>;

    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;

    /// Read-modify-write helper for partial updates.
    fn update(&self, apply: &mut dyn FnMut(&mut Settings)) -> Result<Settings, SettingsError> {
        let mut settings = self.load()?;
        apply(&mut settings);
        self.save(&settings)?;
        Ok(settings)
    }
}

/// Default location of the settings file
pub fn default_settings_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")));
    config_dir.join("davdrop").join("settings.json")
}

/// Settings persisted as a pretty-printed JSON object on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    /// A missing, unreadable or corrupt file yields defaults; the options page overwrites it on save.
    fn load(&self) -> Result<Settings, SettingsError> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to read settings at {:?}: {}", self.path, e);
                return Ok(Settings::default());
            }
        };
        match serde_json::from_str(&content) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                tracing::warn!("Failed to parse settings at {:?}: {}", self.path, e);
                Ok(Settings::default())
            }
        }
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        // Only a directory created here is restricted; --config may point into a shared one
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
                ensure_secure_permissions(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;
        ensure_secure_permissions(&self.path)?;

        tracing::info!("Settings saved to {:?}", self.path);
        Ok(())
    }
}

/// Owner-only access for the settings file (0o600) and its directory (0o700).
/// The password is stored in cleartext.
pub fn ensure_secure_permissions(path: &Path) -> Result<(), SettingsError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = if path.is_dir() { 0o700 } else { 0o600 };
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// In-process store, for embedding hosts that keep their own persistence.
#[derive(Default)]
pub struct MemoryStore {
    settings: RwLock<Settings>,
}

impl MemoryStore {
    pub fn new(settings: Settings) -> Self {
        Self { settings: RwLock::new(settings) }
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        self.settings
            .read()
            .map(|s| s.clone())
            .map_err(|_| SettingsError::Poisoned)
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let mut guard = self.settings.write().map_err(|_| SettingsError::Poisoned)?;
        *guard = settings.clone();
        Ok(())
    }
}
