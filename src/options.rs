//! Options page logic
//!
//! Server settings form, connection test and destination folder picker.
//! Folder navigation goes through an `ActionGate`: a click that arrives while
//! the previous listing is still loading is rejected instead of racing it.

use std::sync::Arc;

use thiserror::Error;

use crate::folder_browser::{FolderBrowser, FolderView};
use crate::gate::{ActionGate, GateError};
use crate::providers::DavBackend;
use crate::settings::{Credentials, SettingsError, SettingsStore};

pub const MSG_SETTINGS_SAVED: &str = "Connection successful! Settings saved.";
pub const MSG_FOLDER_SAVED: &str = "Upload folder saved!";

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("Invalid server URL. Please enter a valid URL.")]
    InvalidUrl,

    #[error("Please enter both username and password.")]
    MissingCredentials,

    #[error("Connection failed. Please check your settings and try again.")]
    ConnectionFailed,

    #[error(transparent)]
    Busy(#[from] GateError),

    #[error("Failed to save settings: {0}")]
    Storage(#[from] SettingsError),
}

/// Values of the settings form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsForm {
    pub server_url: String,
    pub username: String,
    pub password: String,
    pub copy_url_to_clipboard: bool,
}

impl SettingsForm {
    /// Trim what the user typed and check it before any network call.
    /// The password is taken verbatim.
    pub fn validate(&self) -> Result<Credentials, OptionsError> {
        let server_url = self.server_url.trim();
        let username = self.username.trim();

        if url::Url::parse(server_url).is_err() {
            return Err(OptionsError::InvalidUrl);
        }
        if username.is_empty() || self.password.is_empty() {
            return Err(OptionsError::MissingCredentials);
        }
        Ok(Credentials::new(server_url, username, &self.password))
    }
}

pub struct OptionsPage {
    store: Arc<dyn SettingsStore>,
    backend: Arc<dyn DavBackend>,
    browser: ActionGate<FolderBrowser>,
}

impl OptionsPage {
    /// The browser starts at the saved upload folder.
    pub fn new(store: Arc<dyn SettingsStore>, backend: Arc<dyn DavBackend>) -> Result<Self, SettingsError> {
        let settings = store.load()?;
        let browser = FolderBrowser::new(settings.upload_folder_or_root(), backend.clone(), store.clone());
        Ok(Self {
            store,
            backend,
            browser: ActionGate::new("folder navigation", browser),
        })
    }

    /// Form prefilled from the store
    pub fn form(&self) -> Result<SettingsForm, SettingsError> {
        let settings = self.store.load()?;
        Ok(SettingsForm {
            server_url: settings.server_url,
            username: settings.username,
            password: settings.password,
            copy_url_to_clipboard: settings.copy_url_to_clipboard,
        })
    }

    /// Initial folder listing, shown only once the server is configured.
    pub async fn open(&self) -> Result<Option<FolderView>, OptionsError> {
        if !self.store.load()?.is_configured() {
            return Ok(None);
        }
        let browser = self.browser.try_enter()?;
        Ok(Some(browser.reload().await))
    }

    /// Validate, test and persist the server settings.
    ///
    /// Nothing is written unless the connection test passes. On success the
    /// browser restarts at the root.
    pub async fn save_settings(&self, form: &SettingsForm) -> Result<FolderView, OptionsError> {
        let creds = form.validate()?;

        tracing::info!("Testing connection to {}", creds.server_url);
        if !self.backend.test_connection(&creds).await {
            return Err(OptionsError::ConnectionFailed);
        }

        let copy = form.copy_url_to_clipboard;
        self.store.update(&mut |s| {
            s.server_url = creds.server_url.clone();
            s.username = creds.username.clone();
            s.password = creds.password.clone();
            s.copy_url_to_clipboard = copy;
        })?;
        tracing::info!("{}", MSG_SETTINGS_SAVED);

        let mut browser = self.browser.enter().await;
        browser.set_path("/");
        Ok(browser.reload().await)
    }

    pub async fn navigate_into(&self, folder_name: &str) -> Result<FolderView, OptionsError> {
        let mut browser = self.browser.try_enter()?;
        Ok(browser.navigate_into(folder_name).await)
    }

    pub async fn navigate_up(&self) -> Result<FolderView, OptionsError> {
        let mut browser = self.browser.try_enter()?;
        Ok(browser.navigate_up().await)
    }

    pub async fn reload(&self) -> Result<FolderView, OptionsError> {
        let browser = self.browser.try_enter()?;
        Ok(browser.reload().await)
    }

    /// Persist the folder currently shown; returns it.
    pub fn save_folder(&self) -> Result<String, OptionsError> {
        let browser = self.browser.try_enter()?;
        browser.persist()?;
        Ok(browser.current_path().to_string())
    }
}
