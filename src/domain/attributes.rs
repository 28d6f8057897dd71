//! Visitor attribute detection.
//!
//! Turns the raw `User-Agent` string and geo/locale headers of a request into the
//! canonical, lower-cased values targeting rules are written against:
//!
//! | Attribute  | Values                                                              |
//! |------------|---------------------------------------------------------------------|
//! | `device`   | `tablet`, `mobile`, `desktop`                                       |
//! | `os`       | `ios`, `android`, `windows`, `macos`, `chromeos`, `linux`, `unknown` |
//! | `browser`  | `samsung`, `opera`, `edge`, `firefox`, `chrome`, `safari`, `unknown` |
//! | `country`  | ISO 3166-1 alpha-2, upper-cased, or absent                          |
//! | `language` | primary language subtag, lower-cased, or absent                     |
//!
//! Everything here is pure and performs no I/O.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::domain::entities::TargetType;

pub const DEVICE_VALUES: &[&str] = &["tablet", "mobile", "desktop"];
pub const OS_VALUES: &[&str] = &[
    "ios", "android", "windows", "macos", "chromeos", "linux", "unknown",
];
pub const BROWSER_VALUES: &[&str] = &[
    "samsung", "opera", "edge", "firefox", "chrome", "safari", "unknown",
];

/// Geo headers consulted for the visitor country, highest priority first.
const COUNTRY_HEADERS: &[&str] = &[
    "x-vercel-ip-country",
    "cf-ipcountry",
    "cloudfront-viewer-country",
    "x-geo-country",
];

/// Country placeholders CDNs emit for unknown (`XX`) or Tor (`T1`) origins.
const COUNTRY_PLACEHOLDERS: &[&str] = &["XX", "T1"];

/// Case-insensitive view over request headers.
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders(HashMap<String, String>);

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RequestHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = RequestHeaders::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Canonical visitor attributes for one request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedAttributes {
    pub device: String,
    pub os: String,
    pub browser: String,
    pub country: Option<String>,
    pub language: Option<String>,
}

impl DetectedAttributes {
    /// Returns the attribute value a rule of `target_type` is compared against.
    pub fn value_for(&self, target_type: TargetType) -> Option<&str> {
        match target_type {
            TargetType::Device => Some(self.device.as_str()),
            TargetType::Os => Some(self.os.as_str()),
            TargetType::Browser => Some(self.browser.as_str()),
            TargetType::Country => self.country.as_deref(),
            TargetType::Language => self.language.as_deref(),
        }
    }
}

/// Detects all visitor attributes from a request.
pub fn detect(user_agent: Option<&str>, headers: &RequestHeaders) -> DetectedAttributes {
    DetectedAttributes {
        device: detect_device(user_agent).to_string(),
        os: detect_os(user_agent).to_string(),
        browser: detect_browser(user_agent).to_string(),
        country: detect_country(headers),
        language: detect_language(headers.get("accept-language")),
    }
}

/// Classifies the device. Tablets are checked first because most tablet
/// user agents also carry mobile tokens.
pub fn detect_device(user_agent: Option<&str>) -> &'static str {
    let ua = match user_agent.map(str::trim) {
        Some(ua) if !ua.is_empty() => ua.to_ascii_lowercase(),
        _ => return "desktop",
    };

    let is_tablet = ua.contains("ipad")
        || (ua.contains("android") && !ua.contains("mobile"))
        || ua.contains("kindle")
        || ua.contains("silk")
        || ua.contains("tablet")
        || ua.contains("playbook");
    if is_tablet {
        return "tablet";
    }

    let is_mobile = ua.contains("mobi")
        || ua.contains("iphone")
        || ua.contains("ipod")
        || ua.contains("android")
        || ua.contains("blackberry")
        || ua.contains("windows phone")
        || ua.contains("opera mini")
        || ua.contains("iemobile");
    if is_mobile {
        return "mobile";
    }

    "desktop"
}

/// Detects the operating system family.
///
/// iOS is matched before macOS (iOS agents say "like Mac OS X") and Chrome OS
/// before Linux (CrOS agents also say "Linux").
pub fn detect_os(user_agent: Option<&str>) -> &'static str {
    let Some(ua) = user_agent.map(str::to_ascii_lowercase) else {
        return "unknown";
    };

    if ua.contains("iphone") || ua.contains("ipad") || ua.contains("ipod") {
        "ios"
    } else if ua.contains("android") {
        "android"
    } else if ua.contains("windows") {
        "windows"
    } else if ua.contains("mac os x") || ua.contains("macintosh") {
        "macos"
    } else if ua.contains("cros ") {
        "chromeos"
    } else if ua.contains("linux") {
        "linux"
    } else {
        "unknown"
    }
}

/// Detects the browser family.
///
/// Vendor tokens are checked in an order that avoids cross-matches: Samsung,
/// Opera and Edge agents all contain "Chrome", and Chrome agents contain "Safari".
pub fn detect_browser(user_agent: Option<&str>) -> &'static str {
    let Some(ua) = user_agent.map(str::to_ascii_lowercase) else {
        return "unknown";
    };

    if ua.contains("samsungbrowser") {
        "samsung"
    } else if ua.contains("opr/") || ua.contains("opera") {
        "opera"
    } else if ua.contains("edg/")
        || ua.contains("edge/")
        || ua.contains("edga/")
        || ua.contains("edgios/")
    {
        "edge"
    } else if ua.contains("firefox/") || ua.contains("fxios/") {
        "firefox"
    } else if ua.contains("crios/") {
        "chrome"
    } else if ua.contains("safari/") && !ua.contains("chrome") && !ua.contains("chromium") {
        "safari"
    } else if ua.contains("chrome/") || ua.contains("chromium/") {
        "chrome"
    } else {
        "unknown"
    }
}

/// Reads the visitor country from the first geo header carrying a usable value.
pub fn detect_country(headers: &RequestHeaders) -> Option<String> {
    COUNTRY_HEADERS.iter().find_map(|name| {
        let value = headers.get(name)?.trim().to_ascii_uppercase();
        if value.is_empty() || COUNTRY_PLACEHOLDERS.contains(&value.as_str()) {
            None
        } else {
            Some(value)
        }
    })
}

/// Returns the primary subtag of the highest-weighted `Accept-Language` entry.
///
/// Entries keep their header order when weights tie. `*` and `q=0` entries are
/// ignored; an unparseable weight counts as 1.0.
pub fn detect_language(accept_language: Option<&str>) -> Option<String> {
    let mut entries: Vec<(String, f32)> = accept_language?
        .split(',')
        .filter_map(parse_language_entry)
        .collect();

    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    entries.into_iter().next().map(|(tag, _)| tag)
}

fn parse_language_entry(entry: &str) -> Option<(String, f32)> {
    let mut parts = entry.split(';');
    let tag = parts.next()?.trim();
    if tag.is_empty() || tag == "*" {
        return None;
    }

    let mut weight = 1.0_f32;
    for param in parts {
        if let Some(q) = param.trim().strip_prefix("q=") {
            weight = q
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|w| w.is_finite())
                .unwrap_or(1.0);
        }
    }
    if weight <= 0.0 {
        return None;
    }

    let primary = tag.split(['-', '_']).next()?.trim().to_ascii_lowercase();
    if primary.is_empty() {
        None
    } else {
        Some((primary, weight))
    }
}
