//! Rewrites image share links into URLs an `<img src>` can load directly.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedLink {
    Direct(String),
    Unsupported,
}

impl NormalizedLink {
    pub fn into_direct(self) -> Option<String> {
        match self {
            NormalizedLink::Direct(url) => Some(url),
            NormalizedLink::Unsupported => None,
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, NormalizedLink::Direct(_))
    }
}

fn imgur_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"imgur\.com/([a-zA-Z0-9]+)").expect("imgur id pattern"))
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.strip_suffix(domain).map_or(false, |rest| rest.ends_with('.'))
}

/// Converts a Dropbox or Imgur share link to a direct media URL.
///
/// Pure string and URL work, no network. Anything that is not a single
/// Dropbox file or a single Imgur image comes back as `Unsupported`.
pub fn normalize(raw_url: &str) -> NormalizedLink {
    let raw_url = raw_url.trim();
    if raw_url.is_empty() {
        return NormalizedLink::Unsupported;
    }

    let parsed = match Url::parse(raw_url) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Could not parse image share URL {:?}: {}", raw_url, e);
            return NormalizedLink::Unsupported;
        }
    };
    let host = parsed.host_str().unwrap_or("").to_ascii_lowercase();

    if host_matches(&host, "dropbox.com") {
        return NormalizedLink::Direct(dropbox_raw(parsed));
    }

    if host_matches(&host, "imgur.com") {
        return imgur_direct(raw_url, &parsed, &host);
    }

    NormalizedLink::Unsupported
}

/// Drops every `dl` parameter and forces `raw=1`, keeping the rest of the query.
fn dropbox_raw(mut url: Url) -> String {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut raw_set = false;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "dl" => continue,
            "raw" if raw_set => continue,
            "raw" => {
                pairs.push(("raw".to_string(), "1".to_string()));
                raw_set = true;
            }
            _ => pairs.push((key.to_string(), value.into_owned())),
        }
    }
    if !raw_set {
        pairs.push(("raw".to_string(), "1".to_string()));
    }

    url.query_pairs_mut().clear().extend_pairs(pairs);
    url.to_string()
}

fn imgur_direct(raw_url: &str, parsed: &Url, host: &str) -> NormalizedLink {
    let path = parsed.path();
    if path.contains("/a/") || path.contains("/gallery/") {
        return NormalizedLink::Unsupported;
    }

    if host == "i.imgur.com" {
        // Kept verbatim, so it must not be able to close the `src` attribute.
        if raw_url.contains(|c: char| matches!(c, '"' | '\'' | '<' | '>') || c.is_whitespace()) {
            return NormalizedLink::Unsupported;
        }
        return NormalizedLink::Direct(raw_url.to_string());
    }

    // Imgur serves the right format for the id; .jpg is only the extension hint.
    let candidate = format!("{}{}", host, path);
    match imgur_id_pattern().captures(&candidate) {
        Some(caps) => NormalizedLink::Direct(format!("https://i.imgur.com/{}.jpg", &caps[1])),
        None => NormalizedLink::Unsupported,
    }
}
