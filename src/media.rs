//! Media path helpers shared by the soundboard and the sound-pad browser.

use std::borrow::Cow;

/// Percent-decode a URI. Malformed escapes are kept as written; input that
/// does not decode to UTF-8 is returned unchanged.
#[must_use]
pub fn clean_uri(uri: &str) -> String {
    urlencoding::decode(uri).map_or_else(|_| uri.to_string(), Cow::into_owned)
}

/// Strip the extension from the last path segment.
#[must_use]
pub fn base_path(filepath: &str) -> &str {
    let Some(dot) = filepath.rfind('.') else {
        return filepath;
    };
    if filepath[dot + 1..].contains('/') || dot + 1 == filepath.len() {
        return filepath;
    }
    &filepath[..dot]
}

/// Human readable name for a media file: `sfx/dark_forest-night.ogg` → `Dark Forest Night`.
#[must_use]
pub fn pretty_media_name(filepath: &str) -> String {
    let clean = clean_uri(filepath);
    let base = base_path(&clean);
    let file = base.rsplit('/').next().unwrap_or(base);
    let name = file
        .replace(['-', '_'], " ")
        .split(' ')
        .map(capitalize_lower)
        .collect::<Vec<_>>()
        .join(" ");
    if name.trim().is_empty() { clean } else { name }
}

fn capitalize_lower(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Format seconds as `M:SS` or `H:MM:SS`.
#[must_use]
pub fn pretty_duration(seconds: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = if seconds.is_finite() && seconds > 0.0 { seconds.round() as u64 } else { 0 };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours == 0 {
        format!("{minutes}:{secs:02}")
    } else {
        format!("{hours}:{minutes:02}:{secs:02}")
    }
}
