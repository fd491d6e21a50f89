//! YouTube video identifier parsing.
//!
//! Supported inputs:
//! - `https://www.youtube.com/watch?v=<id>` (also `m.`, `music.` and bare `youtube.com`;
//!   `v` may appear anywhere in the query string; scheme optional)
//! - `https://youtu.be/<id>`
//! - `https://www.youtube.com/{embed,shorts,live,v}/<id>`
//! - a bare 11-character id

use crate::error::{Result, ShortitError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

static VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("Invalid regex"));

/// Hosts that serve `watch?v=` and `/embed/<id>` style URLs.
const WATCH_HOSTS: &[&str] = &[
    "youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtube-nocookie.com",
];

/// Path prefixes whose next segment is the video id.
const ID_PATH_PREFIXES: &[&str] = &["embed", "shorts", "live", "v"];

/// An 11-character YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Parse a video id from a URL or a bare id.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ShortitError::InvalidUrl("empty video URL".to_string()));
        }

        if VIDEO_ID_RE.is_match(input) {
            return Ok(Self(input.to_string()));
        }

        let candidate = id_from_url(input)
            .ok_or_else(|| ShortitError::InvalidUrl(input.to_string()))?;

        if VIDEO_ID_RE.is_match(&candidate) {
            Ok(Self(candidate))
        } else {
            Err(ShortitError::InvalidUrl(format!(
                "{} (\"{}\" is not a valid video id)",
                input, candidate
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Thumbnail image for the video.
    pub fn thumbnail_url(&self) -> String {
        format!("http://img.youtube.com/vi/{}/0.jpg", self.0)
    }

    /// Canonical watch page URL.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for VideoId {
    type Err = ShortitError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Pull the raw id candidate out of a URL, without validating it.
fn id_from_url(input: &str) -> Option<String> {
    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };

    let url = Url::parse(&with_scheme).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let host = url.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    if host == "youtu.be" {
        return segments.next().map(str::to_string);
    }

    if !WATCH_HOSTS.contains(&host) {
        return None;
    }

    match segments.next()? {
        "watch" => url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned()),
        prefix if ID_PATH_PREFIXES.contains(&prefix) => segments.next().map(str::to_string),
        _ => None,
    }
}
