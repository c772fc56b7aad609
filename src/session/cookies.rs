//! Cookie-file loading for authenticated sessions.
//!
//! Cookies are stored as a JSON array exported by a separate login helper;
//! each entry becomes a CDP cookie parameter applied to the page before the
//! first real navigation.

use std::path::Path;

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, TimeSinceEpoch};
use serde::Deserialize;
use tracing::warn;

/// One cookie as stored on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub secure: Option<bool>,
    #[serde(default, rename = "httpOnly")]
    pub http_only: Option<bool>,
    /// Unix expiry in seconds. Absent for session cookies.
    #[serde(default)]
    pub expiry: Option<f64>,
}

/// Parse the JSON cookie file.
pub fn load_cookie_file(path: &Path) -> Result<Vec<StoredCookie>> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read cookie file {}", path.display()))?;
    serde_json::from_str(&body)
        .with_context(|| format!("cookie file {} is not a JSON cookie array", path.display()))
}

/// Convert stored cookies into CDP parameters, dropping entries the protocol
/// rejects rather than failing the whole session.
pub fn to_cookie_params(cookies: Vec<StoredCookie>) -> Vec<CookieParam> {
    let mut params = Vec::with_capacity(cookies.len());
    for cookie in cookies {
        let mut builder = CookieParam::builder()
            .name(cookie.name.clone())
            .value(cookie.value)
            .domain(cookie.domain)
            .path(cookie.path.unwrap_or_else(|| "/".to_string()));
        if let Some(secure) = cookie.secure {
            builder = builder.secure(secure);
        }
        if let Some(http_only) = cookie.http_only {
            builder = builder.http_only(http_only);
        }
        if let Some(expiry) = cookie.expiry {
            builder = builder.expires(TimeSinceEpoch::new(expiry));
        }
        match builder.build() {
            Ok(param) => params.push(param),
            Err(e) => warn!("skipping cookie {}: {e}", cookie.name),
        }
    }
    params
}

/// Load and convert in one step.
pub fn load_cookie_params(path: &Path) -> Result<Vec<CookieParam>> {
    Ok(to_cookie_params(load_cookie_file(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_cookie_array() {
        let body = r#"[
            {"name": "sid", "value": "abc", "domain": ".example.com", "httpOnly": true},
            {"name": "lang", "value": "en", "domain": ".example.com", "path": "/", "expiry": 1999999999.0}
        ]"#;
        let cookies: Vec<StoredCookie> = serde_json::from_str(body).unwrap();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name, "sid");
        assert_eq!(cookies[0].http_only, Some(true));
        assert_eq!(cookies[1].expiry, Some(1_999_999_999.0));

        let params = to_cookie_params(cookies);
        assert_eq!(params.len(), 2);
    }
}
