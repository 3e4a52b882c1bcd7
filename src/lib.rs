// davdrop - Send web media to ownCloud/Nextcloud over WebDAV
// Host-agnostic core: settings, WebDAV client, folder browser, upload pipeline

pub mod filename;
pub mod folder_browser;
pub mod gate;
pub mod host;
pub mod media;
pub mod options;
pub mod providers;
pub mod settings;
pub mod upload;

pub use folder_browser::{FolderBrowser, FolderRow, FolderView};
pub use host::{DesktopHost, Host, MenuClick, MenuEntry};
pub use options::{OptionsPage, SettingsForm};
pub use providers::{DavBackend, FolderEntry, WebDavClient};
pub use settings::{Credentials, JsonFileStore, Settings, SettingsStore};
pub use upload::{UploadOutcome, UploadResult, Uploader};

use tracing::Level;

/// Install the stderr log subscriber. `verbosity` counts `-v` flags:
/// 0 = warn, 1 = info, 2 = debug, 3+ = trace.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let result = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if result.is_err() {
        tracing::debug!("Log subscriber already installed");
    }
}
