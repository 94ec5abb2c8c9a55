//! File names for downloaded items

use url::Url;

/// Characters rejected by common filesystems
const INVALID_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Name used when nothing usable is left after sanitizing
const FALLBACK_NAME: &str = "index";

/// Makes `name` usable as a single path component
///
/// Invalid and control characters become `_`, trailing dots and spaces are
/// trimmed, and an empty result falls back to `index`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if INVALID_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = cleaned.trim_end_matches(&['.', ' '][..]).trim_start();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Last path segment of `url`, without query or fragment
///
/// Strings that do not parse as URLs are split on `/` as plain paths.
pub fn url_basename(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or_default()
            .to_string(),
        Err(_) => {
            let path = url.split(&['?', '#'][..]).next().unwrap_or_default();
            path.rsplit('/')
                .find(|s| !s.is_empty())
                .unwrap_or_default()
                .to_string()
        }
    }
}
