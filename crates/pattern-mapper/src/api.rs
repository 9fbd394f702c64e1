//! HTTP surface of the pattern backend.
//!
//! The backend serves the current pattern as SVG (for previews) and its
//! data and settings as JSON. Clients only need the table of endpoints and
//! the rule for accepting a preview response; making the requests is left to
//! whatever HTTP client the caller already has.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;

pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A resource served by the pattern backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Rendered preview of the current pattern.
    PatternSvg,
    /// The current [`PatternData`](crate::model::PatternData).
    PatternData,
    /// The current [`PatternSettings`](crate::settings::PatternSettings).
    PatternSettings,
    /// Available patterns, as a list of
    /// [`PatternListEntry`](crate::model::PatternListEntry).
    Catalog,
}

impl Endpoint {
    pub const ALL: [Endpoint; 4] = [
        Endpoint::PatternSvg,
        Endpoint::PatternData,
        Endpoint::PatternSettings,
        Endpoint::Catalog,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::PatternSvg => "/pattern.svg",
            Endpoint::PatternData => "/patterndata.json",
            Endpoint::PatternSettings => "/patternsettings.json",
            Endpoint::Catalog => "/patterns.json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Endpoint::PatternSvg => SVG_CONTENT_TYPE,
            _ => JSON_CONTENT_TYPE,
        }
    }

    /// Resolve a request URI. Query string and fragment are ignored, and
    /// an absolute URL is reduced to its path.
    pub fn from_uri(uri: &str) -> Option<Endpoint> {
        let uri = uri.split(['?', '#']).next().unwrap_or("");
        let path = match uri.split_once("://") {
            Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
            None => uri,
        };
        Self::ALL.into_iter().find(|e| e.path() == path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Base URL of the pattern backend, e.g. `http://localhost:9980`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBase(String);

impl ApiBase {
    /// Accepts `http://` and `https://` URLs; trailing slashes are dropped.
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let trimmed = url.trim().trim_end_matches('/');
        let host = trimmed
            .strip_prefix("http://")
            .or_else(|| trimmed.strip_prefix("https://"));
        match host {
            Some(host) if !host.is_empty() => Ok(ApiBase(trimmed.to_string())),
            _ => Err(ConfigError::InvalidApiUrl(url.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn url_for(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.0, endpoint.path())
    }

    /// Where the preview image is fetched from.
    pub fn preview_url(&self) -> String {
        self.url_for(Endpoint::PatternSvg)
    }
}

impl fmt::Display for ApiBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a preview response was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreviewError {
    #[error("preview request failed with HTTP status {0}")]
    Status(u16),

    #[error("preview response has no content type")]
    MissingContentType,

    #[error("preview response is '{0}', expected image/svg+xml")]
    ContentType(String),
}

/// A preview is usable only as a 200 response carrying SVG.
///
/// Media type parameters (`; charset=utf-8`) and case are ignored.
pub fn check_preview_response(status: u16, content_type: Option<&str>) -> Result<(), PreviewError> {
    if status != 200 {
        return Err(PreviewError::Status(status));
    }
    let content_type = content_type.ok_or(PreviewError::MissingContentType)?;
    let media_type = content_type.split(';').next().unwrap_or("").trim();
    if media_type.eq_ignore_ascii_case(SVG_CONTENT_TYPE) {
        Ok(())
    } else {
        Err(PreviewError::ContentType(content_type.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_table() {
        assert_eq!(Endpoint::PatternSvg.path(), "/pattern.svg");
        assert_eq!(Endpoint::PatternSvg.content_type(), "image/svg+xml");
        assert_eq!(Endpoint::PatternData.path(), "/patterndata.json");
        assert_eq!(Endpoint::PatternSettings.content_type(), "application/json");
        assert_eq!(Endpoint::Catalog.to_string(), "/patterns.json");
    }

    #[test]
    fn resolves_request_uris() {
        assert_eq!(Endpoint::from_uri("/pattern.svg"), Some(Endpoint::PatternSvg));
        assert_eq!(
            Endpoint::from_uri("/patterndata.json?t=123#x"),
            Some(Endpoint::PatternData)
        );
        assert_eq!(
            Endpoint::from_uri("http://localhost:9980/patternsettings.json"),
            Some(Endpoint::PatternSettings)
        );
        assert_eq!(Endpoint::from_uri("/"), None);
        assert_eq!(Endpoint::from_uri("/pattern.svg/extra"), None);
    }

    #[test]
    fn api_base_urls() {
        let base = ApiBase::parse("http://localhost:9980/").unwrap();
        assert_eq!(base.as_str(), "http://localhost:9980");
        assert_eq!(base.preview_url(), "http://localhost:9980/pattern.svg");
        assert_eq!(
            base.url_for(Endpoint::Catalog),
            "http://localhost:9980/patterns.json"
        );
        assert!(ApiBase::parse("https://example.com/api").is_ok());
    }

    #[test]
    fn api_base_rejects_non_http() {
        assert!(ApiBase::parse("ftp://host").is_err());
        assert!(ApiBase::parse("localhost:9980").is_err());
        assert!(ApiBase::parse("http://").is_err());
    }

    #[test]
    fn preview_contract() {
        assert_eq!(check_preview_response(200, Some("image/svg+xml")), Ok(()));
        assert_eq!(
            check_preview_response(200, Some("image/svg+xml; charset=utf-8")),
            Ok(())
        );
        assert_eq!(
            check_preview_response(404, Some("image/svg+xml")),
            Err(PreviewError::Status(404))
        );
        assert_eq!(
            check_preview_response(200, Some("text/html")),
            Err(PreviewError::ContentType("text/html".into()))
        );
        assert_eq!(
            check_preview_response(200, None),
            Err(PreviewError::MissingContentType)
        );
    }
}
