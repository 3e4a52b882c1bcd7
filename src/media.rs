//! Media fetching
//!
//! Loads the bytes behind a context-menu source URL. Remote `http(s)` sources
//! are downloaded; inline `data:` URLs are decoded in place.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use thiserror::Error;

use crate::filename;
use crate::providers::MediaBlob;

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid media URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported media source: {0}")]
    UnsupportedScheme(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Media request returned status: {0}")]
    Status(reqwest::StatusCode),

    #[error("Malformed data URL: {0}")]
    MalformedData(String),
}

/// Downloads or decodes a media source into a `MediaBlob`.
#[derive(Clone)]
pub struct MediaFetcher {
    client: Client,
}

impl MediaFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, src_url: &str) -> Result<MediaBlob, FetchError> {
        let url = url::Url::parse(src_url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", src_url, e)))?;

        match url.scheme() {
            "http" | "https" => self.fetch_remote(url).await,
            "data" => decode_data_url(src_url),
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }

    async fn fetch_remote(&self, url: url::Url) -> Result<MediaBlob, FetchError> {
        tracing::debug!("Fetching media {}", url);
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
            .unwrap_or_else(|| guess_mime(&filename::filename_from_url(url.as_str())));

        let bytes = response.bytes().await?;
        tracing::debug!("Fetched {} bytes ({})", bytes.len(), mime_type);
        Ok(MediaBlob::new(bytes.to_vec(), mime_type))
    }
}

impl Default for MediaFetcher {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

fn guess_mime(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(FALLBACK_MIME)
        .to_string()
}

/// Decode `data:[<mediatype>][;base64],<payload>`.
pub fn decode_data_url(src_url: &str) -> Result<MediaBlob, FetchError> {
    let rest = src_url
        .strip_prefix("data:")
        .ok_or_else(|| FetchError::MalformedData("missing data: prefix".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| FetchError::MalformedData("missing ',' separator".to_string()))?;

    let (media_type, is_base64) = match meta.strip_suffix(";base64") {
        Some(media_type) => (media_type, true),
        None => (meta, false),
    };
    // Parameters such as ;charset stay part of the MIME type
    let mime_type = if media_type.is_empty() || media_type.starts_with(';') {
        format!("text/plain{}", media_type)
    } else {
        media_type.to_string()
    };

    let bytes = if is_base64 {
        let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let cleaned = urlencoding::decode(&cleaned)
            .map(|s| s.into_owned())
            .unwrap_or(cleaned);
        STANDARD
            .decode(cleaned.as_bytes())
            .map_err(|e| FetchError::MalformedData(e.to_string()))?
    } else {
        urlencoding::decode_binary(payload.as_bytes()).into_owned()
    };

    Ok(MediaBlob::new(bytes, mime_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_data_url() {
        let blob = decode_data_url("data:image/png;base64,iVBORw0K").unwrap();
        assert_eq!(blob.mime_type, "image/png");
        assert_eq!(&blob.bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_decode_percent_data_url() {
        let blob = decode_data_url("data:,Hello%2C%20World").unwrap();
        assert_eq!(blob.mime_type, "text/plain");
        assert_eq!(blob.bytes, b"Hello, World");
    }

    #[test]
    fn test_decode_data_url_errors() {
        assert!(matches!(decode_data_url("data:image/png;base64"), Err(FetchError::MalformedData(_))));
        assert!(matches!(decode_data_url("data:image/png;base64,@@@"), Err(FetchError::MalformedData(_))));
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime("a.png"), "image/png");
        assert_eq!(guess_mime("clip.mp4"), "video/mp4");
        assert_eq!(guess_mime("noext"), FALLBACK_MIME);
    }

    #[tokio::test]
    async fn test_fetch_rejects_unsupported_scheme() {
        let fetcher = MediaFetcher::default();
        let err = fetcher.fetch("blob:https://example.com/1234").await.unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme(s) if s == "blob"));

        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }
}
