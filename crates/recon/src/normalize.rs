//! Identifier normalization.
//!
//! Callers submit file references as bare names, prefixed titles, wiki page
//! URLs, `Special:FilePath` URLs, or entity URLs (`.../entity/M317966`).
//! Everything is reduced to the canonical title `File:<Name>` that the batch
//! title search expects: recognized prefix rewritten to `File:`, first letter
//! of the name upper-cased, underscores turned into spaces.

use crate::error::ReconcileError;
use crate::gateway::{FetchJson, Gateway};

pub const FILE_PREFIX: &str = "File:";

/// Namespace prefixes the repository accepts for files, lower-cased.
const FILE_PREFIX_ALIASES: &[&str] = &["file", "image"];

const ENTITY_MARKER: &str = "entity/M";
const FILE_PATH_MARKER: &str = "Special:FilePath/";
const WIKI_PATH_MARKER: &str = "wiki/";

/// What a raw query string refers to before any remote lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleRef {
    Title(String),
    PageId(u64),
}

/// Parse a raw reference without touching the network.
pub fn parse_reference(raw: &str) -> Result<TitleRef, ReconcileError> {
    let raw = raw.trim();
    if !is_url(raw) {
        return canonical_title(raw).map(TitleRef::Title);
    }

    if let Some((_, rest)) = raw.split_once(ENTITY_MARKER) {
        if let Ok(page_id) = strip_url_suffix(rest).parse::<u64>() {
            return Ok(TitleRef::PageId(page_id));
        }
    }

    let path = if let Some((_, rest)) = raw.split_once(FILE_PATH_MARKER) {
        rest
    } else if let Some((_, rest)) = raw.split_once(WIKI_PATH_MARKER) {
        rest
    } else {
        return Err(ReconcileError::invalid_input(format!("unrecognized media URL: {raw}")));
    };

    let path = strip_url_suffix(path);
    let decoded = urlencoding::decode(path)
        .map_err(|_| ReconcileError::invalid_input(format!("malformed URL encoding in {raw}")))?;
    canonical_title(&decoded).map(TitleRef::Title)
}

/// `http://` or `https://` scheme, any case. File names may contain "http".
fn is_url(raw: &str) -> bool {
    let lower = raw.get(..8).unwrap_or(raw).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Canonical `File:` title for a bare or prefixed name.
pub fn canonical_title(value: &str) -> Result<String, ReconcileError> {
    let value = value.trim().replace('_', " ");
    let name = match value.split_once(':') {
        Some((prefix, rest)) if FILE_PREFIX_ALIASES.contains(&prefix.trim().to_lowercase().as_str()) => {
            rest.trim_start()
        }
        _ => value.as_str(),
    };

    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(ReconcileError::invalid_input(format!("empty file name in {value:?}")));
    };
    Ok(format!("{FILE_PREFIX}{}{}", first.to_uppercase(), chars.as_str()))
}

/// Resolve a raw reference to its canonical title, looking up entity ids
/// remotely. An id with no title is a `Lookup` error.
pub fn normalize<F: FetchJson>(raw: &str, gateway: &Gateway<F>) -> Result<String, ReconcileError> {
    match parse_reference(raw)? {
        TitleRef::Title(title) => Ok(title),
        TitleRef::PageId(page_id) => {
            let title = gateway
                .title_for_page_id(page_id)?
                .ok_or(ReconcileError::Lookup { page_id })?;
            canonical_title(&title)
        }
    }
}

/// Bare media id (`M74698470`) from an id or entity URL.
pub fn normalize_media_id(raw: &str) -> Result<String, ReconcileError> {
    let raw = raw.trim();
    let id = if is_url(raw) {
        strip_url_suffix(raw.rsplit('/').next().unwrap_or(raw))
    } else {
        raw
    };
    page_id_of(id)?;
    Ok(id.to_string())
}

/// Numeric page id behind `M<digits>`.
pub fn page_id_of(media_id: &str) -> Result<u64, ReconcileError> {
    media_id
        .strip_prefix('M')
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| ReconcileError::invalid_input(format!("invalid media id: {media_id:?}")))
}

fn strip_url_suffix(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}
