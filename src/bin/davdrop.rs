//! davdrop CLI: desktop host for the WebDAV uploader
//!
//! Usage:
//!   davdrop configure [--server <url>] [--username <user>] [--password <pass>] [--copy-url|--no-copy-url]
//!   davdrop show                  Print the saved settings
//!   davdrop test                  Test the saved connection
//!   davdrop ls [path]             List folders on the server
//!   davdrop browse                Pick the upload folder interactively
//!   davdrop upload <media-url>    Upload an image, video or audio URL

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use davdrop::folder_browser::{FolderRow, FolderView};
use davdrop::media::MediaFetcher;
use davdrop::options::{MSG_FOLDER_SAVED, MSG_SETTINGS_SAVED};
use davdrop::settings::default_settings_path;
use davdrop::{
    DavBackend, DesktopHost, Host, JsonFileStore, MenuClick, MenuEntry, OptionsPage, SettingsForm,
    SettingsStore, UploadOutcome, Uploader, WebDavClient,
};

#[derive(Parser)]
#[command(
    name = "davdrop",
    about = "davdrop - upload web media to ownCloud/Nextcloud over WebDAV",
    version
)]
struct Cli {
    /// Settings file (default: <config dir>/davdrop/settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test and save server settings; omitted values keep their saved ones
    Configure {
        /// Server URL (e.g., https://cloud.example.com)
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        username: Option<String>,
        /// Prompted for when omitted and none is saved
        #[arg(long)]
        password: Option<String>,
        /// Copy the file link to the clipboard after each upload
        #[arg(long, conflicts_with = "no_copy_url")]
        copy_url: bool,
        #[arg(long)]
        no_copy_url: bool,
    },
    /// Print the saved settings
    Show,
    /// Test the saved connection
    Test,
    /// List folders on the server
    Ls {
        /// Remote path (default: the upload folder)
        path: Option<String>,
    },
    /// Pick the upload folder interactively
    Browse,
    /// Upload an image, video or audio URL
    Upload {
        /// Source URL of the media (http, https or data)
        url: String,
    },
}

struct App {
    store: Arc<JsonFileStore>,
    backend: Arc<WebDavClient>,
    host: Arc<DesktopHost>,
}

impl App {
    fn new(config: Option<PathBuf>) -> Result<Self> {
        let path = config.unwrap_or_else(default_settings_path);
        let backend = WebDavClient::new().context("Failed to create HTTP client")?;
        Ok(Self {
            store: Arc::new(JsonFileStore::new(&path)),
            backend: Arc::new(backend),
            host: Arc::new(DesktopHost::new(path)),
        })
    }

    fn options_page(&self) -> Result<OptionsPage> {
        OptionsPage::new(self.store.clone(), self.backend.clone()).context("Failed to load settings")
    }
}

fn print_view(view: &FolderView) {
    println!("{}", view.header());
    let mut index = 0;
    for row in &view.rows {
        match row {
            FolderRow::Folder(name) => {
                index += 1;
                println!("  [{}] {}", index, name);
            }
            other => println!("      {}", other),
        }
    }
    if let Some(ref error) = view.error {
        println!("      ({})", error);
    }
}

async fn prompt(lines: &mut tokio::io::Lines<BufReader<tokio::io::Stdin>>, label: &str) -> Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    Ok(lines.next_line().await?)
}

struct ConfigureArgs {
    server: Option<String>,
    username: Option<String>,
    password: Option<String>,
    copy_url: Option<bool>,
}

/// Fill the form from the saved settings, then apply what was given on the command line.
fn merge_form(saved: SettingsForm, args: ConfigureArgs) -> SettingsForm {
    SettingsForm {
        server_url: args.server.unwrap_or(saved.server_url),
        username: args.username.unwrap_or(saved.username),
        password: args.password.unwrap_or(saved.password),
        copy_url_to_clipboard: args.copy_url.unwrap_or(saved.copy_url_to_clipboard),
    }
}

async fn configure(app: &App, args: ConfigureArgs) -> Result<ExitCode> {
    let page = app.options_page()?;
    let mut form = merge_form(page.form()?, args);

    if form.password.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        form.password = prompt(&mut lines, "Password: ").await?.unwrap_or_default();
    }

    match page.save_settings(&form).await {
        Ok(view) => {
            println!("{}", MSG_SETTINGS_SAVED);
            print_view(&view);
            println!("Run `davdrop browse` to choose the upload folder.");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn show(app: &App) -> Result<ExitCode> {
    let settings = app.store.load()?;
    println!("Settings file:  {}", app.store.path().display());
    println!("Server URL:     {}", settings.server_url);
    println!("Username:       {}", settings.username);
    println!("Password:       {}", if settings.password.is_empty() { "(not set)" } else { "********" });
    println!("Upload folder:  {}", settings.upload_folder_or_root());
    println!("Copy URL:       {}", settings.copy_url_to_clipboard);
    Ok(ExitCode::SUCCESS)
}

async fn test(app: &App) -> Result<ExitCode> {
    let Some(creds) = app.store.load()?.credentials() else {
        eprintln!("Server settings are incomplete. Run `davdrop configure` first.");
        return Ok(ExitCode::FAILURE);
    };

    if app.backend.test_connection(&creds).await {
        println!("Connection to {} OK", creds.server_url);
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("Connection failed. Please check your settings and try again.");
        Ok(ExitCode::FAILURE)
    }
}

async fn ls(app: &App, path: Option<String>) -> Result<ExitCode> {
    let settings = app.store.load()?;
    let Some(creds) = settings.credentials() else {
        eprintln!("Server settings are incomplete. Run `davdrop configure` first.");
        return Ok(ExitCode::FAILURE);
    };
    let path = path.unwrap_or_else(|| settings.upload_folder_or_root().to_string());

    let folders = app
        .backend
        .list_folders(&creds, &path)
        .await
        .with_context(|| format!("Failed to list {}", path))?;
    for folder in folders {
        println!("{}/", folder.name);
    }
    Ok(ExitCode::SUCCESS)
}

async fn browse(app: &App) -> Result<ExitCode> {
    let page = app.options_page()?;
    let Some(mut view) = page.open().await? else {
        eprintln!("Server settings are incomplete. Run `davdrop configure` first.");
        return Ok(ExitCode::FAILURE);
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_view(&view);
        let Some(input) = prompt(&mut lines, "[number] open, .. up, r reload, s save, q quit > ").await? else {
            break;
        };

        view = match input.trim() {
            "" => continue,
            "q" => break,
            ".." => page.navigate_up().await?,
            "r" => page.reload().await?,
            "s" => {
                let folder = page.save_folder()?;
                println!("{} ({})", MSG_FOLDER_SAVED, folder);
                continue;
            }
            choice => {
                let picked = choice
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| view.folders().nth(i))
                    .map(|name| name.to_string());
                match picked {
                    Some(name) => page.navigate_into(&name).await?,
                    None => {
                        println!("Unknown choice: {}", choice);
                        continue;
                    }
                }
            }
        };
    }
    Ok(ExitCode::SUCCESS)
}

async fn upload(app: &App, url: String) -> Result<ExitCode> {
    app.host.register_menu(&MenuEntry::upload());

    let uploader = Uploader::new(
        app.store.clone(),
        app.backend.clone(),
        app.host.clone(),
        MediaFetcher::default(),
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    spinner.set_message(format!("Uploading {}", url));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = uploader.handle_click(&MenuClick::upload(url)).await;
    spinner.finish_and_clear();

    match outcome {
        UploadOutcome::Uploaded(result) => {
            println!("{}", result.final_url);
            Ok(ExitCode::SUCCESS)
        }
        UploadOutcome::Ignored => Ok(ExitCode::SUCCESS),
        UploadOutcome::ConfigurationRequired | UploadOutcome::Failed(_) => Ok(ExitCode::FAILURE),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    davdrop::init_logging(cli.verbose);

    let app = App::new(cli.config)?;

    match cli.command {
        Commands::Configure {
            server,
            username,
            password,
            copy_url,
            no_copy_url,
        } => {
            let copy_url = match (copy_url, no_copy_url) {
                (true, _) => Some(true),
                (false, true) => Some(false),
                (false, false) => None,
            };
            let args = ConfigureArgs {
                server,
                username,
                password,
                copy_url,
            };
            configure(&app, args).await
        }
        Commands::Show => show(&app),
        Commands::Test => test(&app).await,
        Commands::Ls { path } => ls(&app, path).await,
        Commands::Browse => browse(&app).await,
        Commands::Upload { url } => upload(&app, url).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved() -> SettingsForm {
        SettingsForm {
            server_url: "https://cloud.example.com".to_string(),
            username: "alice".to_string(),
            password: "secret".to_string(),
            copy_url_to_clipboard: true,
        }
    }

    #[test]
    fn test_configure_keeps_saved_values() {
        let args = ConfigureArgs {
            server: None,
            username: None,
            password: None,
            copy_url: None,
        };
        assert_eq!(merge_form(saved(), args), saved());
    }

    #[test]
    fn test_configure_arguments_override_saved_values() {
        let args = ConfigureArgs {
            server: Some("https://other.example".to_string()),
            username: None,
            password: Some("new".to_string()),
            copy_url: Some(false),
        };
        let form = merge_form(saved(), args);
        assert_eq!(form.server_url, "https://other.example");
        assert_eq!(form.username, "alice");
        assert_eq!(form.password, "new");
        assert!(!form.copy_url_to_clipboard);
    }

    #[test]
    fn test_cli_parses_configure_without_server() {
        let cli = Cli::try_parse_from(["davdrop", "configure", "--no-copy-url"]).unwrap();
        match cli.command {
            Commands::Configure {
                server, copy_url, no_copy_url, ..
            } => {
                assert!(server.is_none());
                assert!(!copy_url);
                assert!(no_copy_url);
            }
            _ => panic!("Expected configure"),
        }
    }
}
