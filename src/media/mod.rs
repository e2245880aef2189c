//! Media-type value type and parsing.
//!
//! A [`MediaType`] is the parsed form of a string like
//! `application/vnd.example.user+json;v=2`:
//!
//! - **primary type** / **subtype** - `application` / `vnd.example.user`
//! - **structure suffix** - the tag after `+` in the subtype (`json`),
//!   used to pick a serializer implementation; absent means "no structure
//!   filter"
//! - **parameters** - ordered `;k=v` pairs; names are case-insensitive and
//!   the first occurrence of a repeated name wins
//!
//! The `v` parameter carries the representation version as a signed
//! integer and drives version pinning during resolution (see
//! [`is_compatible`]).

mod matcher;

pub use matcher::{default_representation, is_compatible, normalize, VersionMatcher};

use indexmap::IndexMap;

use crate::error::{Result, VersionedError};

/// Name of the media-type parameter carrying the representation version.
pub const VERSION_PARAMETER: &str = "v";

/// A parsed media type.
///
/// Immutable value type; created per request and never shared mutably.
///
/// # Examples
///
/// ```
/// use versioned_media::MediaType;
///
/// let mt = MediaType::parse("application/vnd.example.user+json;v=2").unwrap();
/// assert_eq!(mt.primary(), "application");
/// assert_eq!(mt.subtype(), "vnd.example.user");
/// assert_eq!(mt.suffix(), Some("json"));
/// assert_eq!(mt.version(), Some(2));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaType {
    primary: String,
    subtype: String,
    suffix: Option<String>,
    parameters: IndexMap<String, String>,
}

impl MediaType {
    /// Parse a raw media-type string.
    ///
    /// Returns [`VersionedError::MalformedInput`] when the string lacks a
    /// `/` separator or either side of it is empty.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut sections = raw.split(';');
        let full = sections
            .next()
            .map(str::trim)
            .unwrap_or_default();

        let (primary, full_subtype) = full.split_once('/').ok_or_else(|| {
            VersionedError::MalformedInput(format!("media type missing '/': {raw}"))
        })?;
        let primary = primary.trim();
        let full_subtype = full_subtype.trim();
        if primary.is_empty() || full_subtype.is_empty() {
            return Err(VersionedError::MalformedInput(format!(
                "media type has empty component: {raw}"
            )));
        }

        // Structure suffix is everything after the first '+'.
        let (subtype, suffix) = match full_subtype.split_once('+') {
            Some((sub, suf)) => (sub.to_string(), Some(suf.to_string())),
            None => (full_subtype.to_string(), None),
        };

        let mut parameters = IndexMap::new();
        for section in sections {
            let section = section.trim();
            if section.is_empty() {
                continue;
            }
            let (name, value) = match section.split_once('=') {
                Some((n, v)) => (n.trim().to_ascii_lowercase(), unquote(v.trim())),
                None => (section.to_ascii_lowercase(), String::new()),
            };
            // First occurrence of a repeated parameter name wins.
            parameters.entry(name).or_insert(value);
        }

        Ok(Self {
            primary: primary.to_string(),
            subtype,
            suffix,
            parameters,
        })
    }

    /// The primary type, e.g. `application`. May be the wildcard `*`.
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// The subtype with any structure suffix stripped.
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// The structure suffix (the tag after `+`), if any.
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    /// Look up a parameter by case-insensitive name.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The `v` parameter parsed as a signed integer.
    ///
    /// Returns `None` when the parameter is absent *or* not an integer; a
    /// non-integer version can never match a registered version.
    pub fn version(&self) -> Option<i64> {
        self.parameter(VERSION_PARAMETER)?.parse().ok()
    }

    /// Whether a `v` parameter is present at all, integer or not.
    pub fn has_version_parameter(&self) -> bool {
        self.parameters.contains_key(VERSION_PARAMETER)
    }

    /// Returns a copy with the given parameter appended (or replaced).
    pub fn with_parameter(&self, name: &str, value: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.parameters
            .insert(name.to_ascii_lowercase(), value.into());
        copy
    }

    /// The `type/subtype` pair without suffix or parameters.
    ///
    /// This is the "base" form compatibility checks run against.
    pub fn base(&self) -> (&str, &str) {
        (&self.primary, &self.subtype)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.primary, self.subtype)?;
        if let Some(suffix) = &self.suffix {
            write!(f, "+{suffix}")?;
        }
        for (name, value) in &self.parameters {
            write!(f, ";{name}={value}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for MediaType {
    type Err = VersionedError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        let mt = MediaType::parse("application/json").unwrap();
        assert_eq!(mt.primary(), "application");
        assert_eq!(mt.subtype(), "json");
        assert_eq!(mt.suffix(), None);
        assert_eq!(mt.version(), None);
    }

    #[test]
    fn test_parse_suffix_and_version() {
        let mt = MediaType::parse("application/vnd.example.user+json;v=2").unwrap();
        assert_eq!(mt.subtype(), "vnd.example.user");
        assert_eq!(mt.suffix(), Some("json"));
        assert_eq!(mt.version(), Some(2));
    }

    #[test]
    fn test_parse_negative_version() {
        let mt = MediaType::parse("application/vnd.x.user;v=-3").unwrap();
        assert_eq!(mt.version(), Some(-3));
    }

    #[test]
    fn test_parameter_names_case_fold_first_wins() {
        let mt = MediaType::parse("text/plain;Charset=utf-8;charset=latin1").unwrap();
        assert_eq!(mt.parameter("charset"), Some("utf-8"));
        assert_eq!(mt.parameter("CHARSET"), Some("utf-8"));
    }

    #[test]
    fn test_quoted_parameter_value() {
        let mt = MediaType::parse("text/plain;title=\"hello world\"").unwrap();
        assert_eq!(mt.parameter("title"), Some("hello world"));
    }

    #[test]
    fn test_non_integer_version_is_none() {
        let mt = MediaType::parse("application/vnd.x.user;v=latest").unwrap();
        assert!(mt.has_version_parameter());
        assert_eq!(mt.version(), None);
    }

    #[test]
    fn test_display_round_trip() {
        for raw in [
            "application/json",
            "application/vnd.example.user+json;v=2",
            "*/*",
            "application/vnd.x.book+xml;v=1;charset=utf-8",
        ] {
            let mt = MediaType::parse(raw).unwrap();
            assert_eq!(mt.to_string(), raw);
        }
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(MediaType::parse("application").is_err());
        assert!(MediaType::parse("/json").is_err());
        assert!(MediaType::parse("application/").is_err());
    }
}
