//! Upload Pipeline
//!
//! Handles a context-menu activation end to end: settings check, media fetch,
//! unique naming, WebDAV PUT, viewer link, clipboard and notification.
//! Every failure after the settings check ends in the same "Upload Failed"
//! notification; the cause goes to the log.

use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;

use crate::filename;
use crate::gate::ActionGate;
use crate::host::{Host, HostError, MenuClick, UPLOAD_MENU_ID};
use crate::media::{FetchError, MediaFetcher};
use crate::providers::webdav::{upload_url, viewer_url};
use crate::providers::{DavBackend, DavError};
use crate::settings::{Credentials, Settings, SettingsError, SettingsStore};

const MSG_CONFIG_REQUIRED: &str = "Please configure your Owncloud settings in the extension options.";
const MSG_SUCCESS: &str = "The file was uploaded successfully to Owncloud.";
const MSG_COPIED: &str = " The URL has been copied to your clipboard.";
const MSG_FAILED: &str =
    "An error occurred while uploading the file to Owncloud. Please check your settings and try again.";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to load settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to fetch media: {0}")]
    Fetch(#[from] FetchError),

    #[error("Upload request failed: {0}")]
    Transport(#[from] DavError),

    #[error("Upload failed with status: {0}")]
    Status(StatusCode),

    #[error(transparent)]
    Clipboard(#[from] HostError),
}

/// A completed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub success: bool,
    /// Files-app link to the uploaded file (built locally, not returned by the server)
    pub final_url: String,
    /// Name the file was stored under
    pub filename: String,
    /// WebDAV URL the file was PUT to
    pub remote_url: String,
    pub copied_to_clipboard: bool,
}

#[derive(Debug)]
pub enum UploadOutcome {
    /// Not our menu entry, or no source URL
    Ignored,
    /// Credentials missing; the settings surface was opened
    ConfigurationRequired,
    Uploaded(UploadResult),
    Failed(UploadError),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Uploaded(_))
    }
}

pub struct Uploader {
    store: Arc<dyn SettingsStore>,
    backend: Arc<dyn DavBackend>,
    host: Arc<dyn Host>,
    fetcher: MediaFetcher,
    gate: ActionGate<()>,
}

impl Uploader {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        backend: Arc<dyn DavBackend>,
        host: Arc<dyn Host>,
        fetcher: MediaFetcher,
    ) -> Self {
        Self {
            store,
            backend,
            host,
            fetcher,
            gate: ActionGate::new("upload", ()),
        }
    }

    /// Entry point for context-menu activations.
    ///
    /// Activations are processed one at a time in arrival order.
    pub async fn handle_click(&self, click: &MenuClick) -> UploadOutcome {
        if click.menu_item_id != UPLOAD_MENU_ID {
            return UploadOutcome::Ignored;
        }
        let Some(src_url) = click.src_url.as_deref().filter(|u| !u.is_empty()) else {
            return UploadOutcome::Ignored;
        };

        let _turn = self.gate.enter().await;
        self.upload_media(src_url).await
    }

    async fn upload_media(&self, src_url: &str) -> UploadOutcome {
        let settings = match self.store.load() {
            Ok(settings) => settings,
            Err(e) => return self.fail(e.into()),
        };

        let Some(creds) = settings.credentials() else {
            tracing::warn!("Upload requested before server settings were configured");
            self.host.notify("Configuration Required", MSG_CONFIG_REQUIRED);
            if let Err(e) = self.host.open_settings() {
                tracing::warn!("{}", e);
            }
            return UploadOutcome::ConfigurationRequired;
        };

        match self.run_upload(src_url, &settings, &creds).await {
            Ok(result) => UploadOutcome::Uploaded(result),
            Err(e) => self.fail(e),
        }
    }

    async fn run_upload(
        &self,
        src_url: &str,
        settings: &Settings,
        creds: &Credentials,
    ) -> Result<UploadResult, UploadError> {
        let folder = settings.upload_folder_or_root();
        let media = self.fetcher.fetch(src_url).await?;

        let original = filename::filename_from_url(src_url);
        let unique = filename::generate_unique_filename(&original);
        let remote_url = upload_url(creds, folder, &unique);
        tracing::info!("Uploading {} as {}", src_url, remote_url);

        let status = self.backend.upload(creds, folder, &unique, media).await?;
        if !status.is_success() {
            return Err(UploadError::Status(status));
        }

        let final_url = viewer_url(creds, folder, &unique);
        let mut message = MSG_SUCCESS.to_string();
        let copied = settings.copy_url_to_clipboard;
        if copied {
            self.host.write_clipboard(&final_url)?;
            message.push_str(MSG_COPIED);
        }

        self.host.notify("Upload Successful", &message);
        tracing::info!("Upload successful! File URL: {}", final_url);

        Ok(UploadResult {
            success: true,
            final_url,
            filename: unique,
            remote_url,
            copied_to_clipboard: copied,
        })
    }

    fn fail(&self, error: UploadError) -> UploadOutcome {
        tracing::error!("Upload failed: {}", error);
        self.host.notify("Upload Failed", MSG_FAILED);
        UploadOutcome::Failed(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{FolderEntry, MediaBlob};
    use crate::settings::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHost {
        notifications: Mutex<Vec<(String, String)>>,
        clipboard: Mutex<Option<String>>,
        settings_opened: Mutex<u32>,
        clipboard_broken: bool,
    }

    impl Host for RecordingHost {
        fn notify(&self, title: &str, message: &str) {
            self.notifications.lock().unwrap().push((title.to_string(), message.to_string()));
        }

        fn open_settings(&self) -> Result<(), HostError> {
            *self.settings_opened.lock().unwrap() += 1;
            Ok(())
        }

        fn write_clipboard(&self, text: &str) -> Result<(), HostError> {
            if self.clipboard_broken {
                return Err(HostError::ClipboardInit("no display".to_string()));
            }
            *self.clipboard.lock().unwrap() = Some(text.to_string());
            Ok(())
        }
    }

    /// Records PUTs and answers with a fixed status
    struct PutRecorder {
        status: StatusCode,
        puts: Mutex<Vec<(String, String, MediaBlob)>>,
    }

    impl PutRecorder {
        fn new(status: StatusCode) -> Self {
            Self {
                status,
                puts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DavBackend for PutRecorder {
        async fn test_connection(&self, _creds: &Credentials) -> bool {
            true
        }

        async fn list_folders(&self, _creds: &Credentials, _path: &str) -> Result<Vec<FolderEntry>, DavError> {
            Ok(Vec::new())
        }

        async fn upload(
            &self,
            _creds: &Credentials,
            folder_path: &str,
            filename: &str,
            media: MediaBlob,
        ) -> Result<StatusCode, DavError> {
            self.puts
                .lock()
                .unwrap()
                .push((folder_path.to_string(), filename.to_string(), media));
            Ok(self.status)
        }
    }

    const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0K";

    fn settings(password: &str, copy: bool) -> Settings {
        Settings {
            server_url: "https://cloud.example.com".to_string(),
            username: "u".to_string(),
            password: password.to_string(),
            upload_folder: "/Photos".to_string(),
            copy_url_to_clipboard: copy,
        }
    }

    fn uploader(settings: Settings, backend: Arc<PutRecorder>, host: Arc<RecordingHost>) -> Uploader {
        Uploader::new(
            Arc::new(MemoryStore::new(settings)),
            backend,
            host,
            MediaFetcher::default(),
        )
    }

    #[tokio::test]
    async fn test_other_menu_items_are_ignored() {
        let backend = Arc::new(PutRecorder::new(StatusCode::CREATED));
        let host = Arc::new(RecordingHost::default());
        let up = uploader(settings("p", false), backend.clone(), host.clone());

        let click = MenuClick {
            menu_item_id: "somethingElse".to_string(),
            src_url: Some(PNG_DATA_URL.to_string()),
        };
        assert!(matches!(up.handle_click(&click).await, UploadOutcome::Ignored));

        let click = MenuClick {
            menu_item_id: UPLOAD_MENU_ID.to_string(),
            src_url: None,
        };
        assert!(matches!(up.handle_click(&click).await, UploadOutcome::Ignored));
        assert!(backend.puts.lock().unwrap().is_empty());
        assert!(host.notifications.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_password_never_uploads() {
        let backend = Arc::new(PutRecorder::new(StatusCode::CREATED));
        let host = Arc::new(RecordingHost::default());
        let up = uploader(settings("", false), backend.clone(), host.clone());

        let outcome = up.handle_click(&MenuClick::upload(PNG_DATA_URL)).await;
        assert!(matches!(outcome, UploadOutcome::ConfigurationRequired));
        assert!(backend.puts.lock().unwrap().is_empty());
        assert_eq!(*host.settings_opened.lock().unwrap(), 1);
        assert_eq!(
            host.notifications.lock().unwrap()[0],
            ("Configuration Required".to_string(), MSG_CONFIG_REQUIRED.to_string())
        );
    }

    #[tokio::test]
    async fn test_successful_upload_with_clipboard() {
        let backend = Arc::new(PutRecorder::new(StatusCode::CREATED));
        let host = Arc::new(RecordingHost::default());
        let up = uploader(settings("p", true), backend.clone(), host.clone());

        let outcome = up.handle_click(&MenuClick::upload(PNG_DATA_URL)).await;
        let UploadOutcome::Uploaded(result) = outcome else {
            panic!("expected upload, got {:?}", outcome);
        };

        assert!(result.success);
        assert!(result.filename.starts_with("media_"));
        assert!(result.filename.ends_with(".png"));
        assert_eq!(
            result.final_url,
            format!("https://cloud.example.com/index.php/apps/files/?dir=/Photos&openfile={}", result.filename)
        );
        assert_eq!(
            result.remote_url,
            format!("https://cloud.example.com/remote.php/webdav/Photos/{}", result.filename)
        );
        assert_eq!(host.clipboard.lock().unwrap().as_deref(), Some(result.final_url.as_str()));

        let puts = backend.puts.lock().unwrap();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].0, "/Photos");
        assert_eq!(puts[0].2.mime_type, "image/png");

        let notifications = host.notifications.lock().unwrap();
        assert_eq!(notifications[0].0, "Upload Successful");
        assert_eq!(notifications[0].1, format!("{}{}", MSG_SUCCESS, MSG_COPIED));
    }

    #[tokio::test]
    async fn test_error_status_reports_failure() {
        let backend = Arc::new(PutRecorder::new(StatusCode::INSUFFICIENT_STORAGE));
        let host = Arc::new(RecordingHost::default());
        let up = uploader(settings("p", false), backend, host.clone());

        let outcome = up.handle_click(&MenuClick::upload(PNG_DATA_URL)).await;
        assert!(matches!(
            outcome,
            UploadOutcome::Failed(UploadError::Status(s)) if s == StatusCode::INSUFFICIENT_STORAGE
        ));
        assert_eq!(
            host.notifications.lock().unwrap()[0],
            ("Upload Failed".to_string(), MSG_FAILED.to_string())
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_reports_failure() {
        let backend = Arc::new(PutRecorder::new(StatusCode::CREATED));
        let host = Arc::new(RecordingHost::default());
        let up = uploader(settings("p", false), backend.clone(), host.clone());

        let outcome = up.handle_click(&MenuClick::upload("ftp://example.com/a.png")).await;
        assert!(matches!(outcome, UploadOutcome::Failed(UploadError::Fetch(_))));
        assert!(backend.puts.lock().unwrap().is_empty());
        assert_eq!(host.notifications.lock().unwrap()[0].0, "Upload Failed");
    }

    #[tokio::test]
    async fn test_clipboard_failure_collapses_into_upload_failed() {
        let backend = Arc::new(PutRecorder::new(StatusCode::OK));
        let host = Arc::new(RecordingHost {
            clipboard_broken: true,
            ..Default::default()
        });
        let up = uploader(settings("p", true), backend.clone(), host.clone());

        let outcome = up.handle_click(&MenuClick::upload(PNG_DATA_URL)).await;
        assert!(matches!(outcome, UploadOutcome::Failed(UploadError::Clipboard(_))));
        // The file itself did reach the server
        assert_eq!(backend.puts.lock().unwrap().len(), 1);
        let notifications = host.notifications.lock().unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].0, "Upload Failed");
    }
}
