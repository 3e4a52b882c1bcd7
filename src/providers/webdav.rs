//! WebDAV Client
//!
//! `DavBackend` implementation for ownCloud and Nextcloud, which expose the
//! user's files under `{server}/remote.php/webdav`.
//!
//! Only two WebDAV verbs are needed: PROPFIND (connection test, folder listing)
//! and PUT (upload). Every request carries HTTP Basic credentials.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};

use super::{DavBackend, DavError, FolderEntry, MediaBlob};
use crate::settings::Credentials;

/// WebDAV root of an ownCloud/Nextcloud instance, relative to the server URL
pub const WEBDAV_ROOT: &str = "/remote.php/webdav";

/// Files app route used for viewer links
pub const FILES_APP: &str = "/index.php/apps/files/";

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
    <d:prop>
        <d:resourcetype/>
    </d:prop>
</d:propfind>"#;

// ============ URL construction ============

/// Strip leading and trailing separators from a folder path ("/A/B/" -> "A/B").
pub fn trim_folder(folder: &str) -> &str {
    folder.trim_matches('/')
}

/// Ensure a browse path is absolute.
fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Join a folder and a filename with exactly one separator.
///
/// ```
/// use davdrop::providers::webdav::join_remote_path;
/// assert_eq!(join_remote_path("/Photos/", "a.png"), "/Photos/a.png");
/// assert_eq!(join_remote_path("/", "a.png"), "/a.png");
/// ```
pub fn join_remote_path(folder: &str, filename: &str) -> String {
    let folder = trim_folder(folder);
    if folder.is_empty() {
        format!("/{}", filename)
    } else {
        format!("/{}/{}", folder, filename)
    }
}

/// Percent-encode each segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// `{server}/remote.php/webdav{path}`
pub fn dav_url(creds: &Credentials, path: &str) -> String {
    format!("{}{}{}", creds.base_url(), WEBDAV_ROOT, encode_path(&normalize_path(path)))
}

/// PUT target for `filename` inside `folder`
pub fn upload_url(creds: &Credentials, folder: &str, filename: &str) -> String {
    dav_url(creds, &join_remote_path(folder, filename))
}

/// Link that opens the uploaded file in the server's Files app.
pub fn viewer_url(creds: &Credentials, folder: &str, filename: &str) -> String {
    format!(
        "{}{}?dir=/{}&openfile={}",
        creds.base_url(),
        FILES_APP,
        urlencoding::encode(trim_folder(folder)),
        urlencoding::encode(filename)
    )
}

/// `Basic base64(username:password)`
pub fn basic_auth_header(creds: &Credentials) -> String {
    let pair = format!("{}:{}", creds.username, creds.password);
    format!("Basic {}", STANDARD.encode(pair))
}

// ============ PROPFIND parsing ============

/// Path component of an href, which servers send either as an absolute path
/// or as a full URL.
fn href_path(href: &str) -> String {
    if href.contains("://") {
        if let Ok(url) = url::Url::parse(href) {
            return url.path().to_string();
        }
    }
    href.to_string()
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// Decoded href path without trailing slashes, used for self-reference checks.
fn normalize_href(href: &str) -> String {
    decode(&href_path(href)).trim_end_matches('/').to_string()
}

fn resolve_entity(name: &[u8]) -> Option<char> {
    match name {
        b"amp" => Some('&'),
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        [b'#', b'x' | b'X', hex @ ..] => std::str::from_utf8(hex)
            .ok()
            .and_then(|h| u32::from_str_radix(h, 16).ok())
            .and_then(char::from_u32),
        [b'#', dec @ ..] => std::str::from_utf8(dec)
            .ok()
            .and_then(|d| d.parse::<u32>().ok())
            .and_then(char::from_u32),
        _ => None,
    }
}

#[derive(Default)]
struct PropfindResponse {
    href: Option<String>,
    is_collection: bool,
}

impl PropfindResponse {
    fn into_folder(self, self_href: &str) -> Option<FolderEntry> {
        if !self.is_collection {
            return None;
        }
        let href = self.href?;
        let href = href.trim();
        if normalize_href(href) == self_href {
            return None;
        }

        let path = href_path(href);
        let name = path.split('/').filter(|s| !s.is_empty()).last()?;
        let name = decode(name);
        if name.is_empty() {
            None
        } else {
            Some(FolderEntry::new(name))
        }
    }
}

/// Extract child collections from a `DAV:multistatus` body.
///
/// `request_path` is the URL path that was queried; the response describing
/// it is skipped. Only the first `DAV:href` of each `DAV:response` counts.
pub fn parse_propfind_folders(xml: &str, request_path: &str) -> Result<Vec<FolderEntry>, DavError> {
    let self_href = normalize_href(request_path);
    let mut reader = NsReader::from_str(xml);
    let mut buf = Vec::new();

    let mut folders = Vec::new();
    let mut current: Option<PropfindResponse> = None;
    let mut in_href = false;
    let mut in_resourcetype = false;

    loop {
        match reader.read_resolved_event_into(&mut buf)? {
            (ResolveResult::Bound(Namespace(b"DAV:")), Event::Start(e)) => {
                match e.local_name().as_ref() {
                    b"response" => current = Some(PropfindResponse::default()),
                    b"href" => {
                        if let Some(response) = current.as_mut() {
                            if response.href.is_none() {
                                response.href = Some(String::new());
                                in_href = true;
                            }
                        }
                    }
                    b"resourcetype" => in_resourcetype = current.is_some(),
                    b"collection" if in_resourcetype => {
                        if let Some(response) = current.as_mut() {
                            response.is_collection = true;
                        }
                    }
                    _ => {}
                }
            }
            (ResolveResult::Bound(Namespace(b"DAV:")), Event::Empty(e)) => {
                if in_resourcetype && e.local_name().as_ref() == b"collection" {
                    if let Some(response) = current.as_mut() {
                        response.is_collection = true;
                    }
                }
            }
            (ResolveResult::Bound(Namespace(b"DAV:")), Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"href" => in_href = false,
                    b"resourcetype" => in_resourcetype = false,
                    b"response" => {
                        in_href = false;
                        in_resourcetype = false;
                        if let Some(folder) = current.take().and_then(|r| r.into_folder(&self_href)) {
                            folders.push(folder);
                        }
                    }
                    _ => {}
                }
            }
            (_, Event::Text(text)) if in_href => {
                if let Some(href) = current.as_mut().and_then(|r| r.href.as_mut()) {
                    href.push_str(&String::from_utf8_lossy(&text));
                }
            }
            (_, Event::GeneralRef(entity)) if in_href => {
                if let Some(href) = current.as_mut().and_then(|r| r.href.as_mut()) {
                    if let Some(c) = resolve_entity(&entity) {
                        href.push(c);
                    }
                }
            }
            (_, Event::Eof) => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(folders)
}

// ============ Client ============

/// ownCloud/Nextcloud WebDAV client
pub struct WebDavClient {
    client: Client,
    propfind: Method,
}

impl WebDavClient {
    /// Create a client with the default HTTP stack settings.
    pub fn new() -> Result<Self, DavError> {
        let client = Client::builder()
            .user_agent(concat!("davdrop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DavError::Client(e.to_string()))?;
        Self::with_client(client)
    }

    /// Wrap an existing reqwest client (shared connection pool, custom TLS, ...).
    pub fn with_client(client: Client) -> Result<Self, DavError> {
        let propfind = Method::from_bytes(b"PROPFIND").map_err(|e| DavError::Client(e.to_string()))?;
        Ok(Self { client, propfind })
    }

    async fn propfind(&self, creds: &Credentials, url: &str) -> Result<Response, DavError> {
        let response = self
            .client
            .request(self.propfind.clone(), url)
            .header(AUTHORIZATION, basic_auth_header(creds))
            .header("Depth", "1")
            .header(CONTENT_TYPE, "application/xml")
            .body(PROPFIND_BODY)
            .send()
            .await?;
        Ok(response)
    }
}

#[async_trait]
impl DavBackend for WebDavClient {
    async fn test_connection(&self, creds: &Credentials) -> bool {
        let url = dav_url(creds, "/");
        tracing::info!("[WebDAV] Testing connection to {}", url);

        match self.propfind(creds, &url).await {
            Ok(response) => {
                let status = response.status();
                tracing::info!("[WebDAV] Connection test status: {}", status);
                status.is_success()
            }
            Err(e) => {
                tracing::error!("[WebDAV] Connection test failed: {}", e);
                false
            }
        }
    }

    async fn list_folders(&self, creds: &Credentials, path: &str) -> Result<Vec<FolderEntry>, DavError> {
        let url = dav_url(creds, path);
        tracing::info!("[WebDAV] Listing folders: {}", url);

        let response = match self.propfind(creds, &url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("[WebDAV] PROPFIND {} failed: {}", path, e);
                return Ok(Vec::new());
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::error!("[WebDAV] Failed to fetch folders for {}. Status: {}", path, status);
            return Err(DavError::Status(status));
        }

        let xml = match response.text().await {
            Ok(xml) => xml,
            Err(e) => {
                tracing::warn!("[WebDAV] Failed to read PROPFIND body: {}", e);
                return Ok(Vec::new());
            }
        };
        tracing::debug!("[WebDAV] PROPFIND response: {} bytes", xml.len());

        let request_path = url::Url::parse(&url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| format!("{}{}", WEBDAV_ROOT, normalize_path(path)));

        match parse_propfind_folders(&xml, &request_path) {
            Ok(folders) => {
                tracing::info!("[WebDAV] Found {} folders in {}", folders.len(), path);
                Ok(folders)
            }
            Err(e) => {
                tracing::warn!("[WebDAV] Unparseable PROPFIND response for {}: {}", path, e);
                Ok(Vec::new())
            }
        }
    }

    async fn upload(
        &self,
        creds: &Credentials,
        folder_path: &str,
        filename: &str,
        media: MediaBlob,
    ) -> Result<StatusCode, DavError> {
        let url = upload_url(creds, folder_path, filename);
        tracing::info!("[WebDAV] PUT {} ({} bytes, {})", url, media.len(), media.mime_type);

        let response = self
            .client
            .put(&url)
            .header(AUTHORIZATION, basic_auth_header(creds))
            .header(CONTENT_TYPE, media.mime_type)
            .body(media.bytes)
            .send()
            .await?;

        let status = response.status();
        tracing::info!("[WebDAV] Upload response status: {}", status);
        Ok(status)
    }
}
