//! Remote filename rules
//!
//! Names are taken from the media URL, scrubbed of invisible characters and
//! made unique with a millisecond timestamp plus a short random suffix.

use rand::Rng;

const FALLBACK_NAME: &str = "media";
const SUFFIX_LEN: usize = 6;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Zero-width space, non-joiner, joiner, the byte-order mark and control characters.
fn is_invisible(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200D}' | '\u{FEFF}') || c.is_control()
}

/// Remove invisible characters that could hide a real extension or corrupt the stored name.
pub fn sanitize_filename(name: &str) -> String {
    name.chars().filter(|c| !is_invisible(*c)).collect()
}

/// Base filename for a media source URL.
///
/// Last path segment with the query and fragment dropped, percent-decoded and
/// sanitized. `data:` URLs get a generic name with an extension matching their
/// MIME type.
pub fn filename_from_url(src_url: &str) -> String {
    let raw = match url::Url::parse(src_url) {
        Ok(url) if url.scheme() == "data" => return data_url_filename(url.path()),
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        Err(_) => {
            let without_query = src_url.split(['?', '#']).next().unwrap_or_default();
            without_query.rsplit('/').next().unwrap_or_default().to_string()
        }
    };

    let decoded = urlencoding::decode(&raw)
        .map(|s| s.into_owned())
        .unwrap_or(raw);
    // A decoded "%2F" must not turn into a path separator
    let name = sanitize_filename(&decoded).replace(['/', '\\'], "_");

    if name.is_empty() || name == "." || name == ".." {
        FALLBACK_NAME.to_string()
    } else {
        name
    }
}

fn data_url_filename(data_path: &str) -> String {
    let mime = data_path
        .split([';', ','])
        .next()
        .unwrap_or_default();
    match mime_guess::get_mime_extensions_str(mime).and_then(|exts| exts.first()) {
        Some(ext) => format!("{}.{}", FALLBACK_NAME, ext),
        None => FALLBACK_NAME.to_string(),
    }
}

/// Split into stem and extension at the last dot. The stem may be empty (".png").
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

/// Six random base36 characters.
pub fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

/// `{stem}_{timestamp}_{suffix}.{ext}`, or without the extension when there is none.
pub fn unique_filename_with(original: &str, timestamp_ms: i64, suffix: &str) -> String {
    match split_extension(original) {
        (stem, Some(ext)) => format!("{}_{}_{}.{}", stem, timestamp_ms, suffix, ext),
        (stem, None) => format!("{}_{}_{}", stem, timestamp_ms, suffix),
    }
}

/// Unique remote name for `original`. No existence check is made on the server.
pub fn generate_unique_filename(original: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp_millis();
    unique_filename_with(original, timestamp, &random_suffix())
}
