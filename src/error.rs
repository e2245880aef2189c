//! Error types for negotiation and codec operations.
//!
//! This module defines all error types that can occur when resolving
//! versioned media types or decoding hierarchical form payloads. The
//! [`Result`] type alias provides a convenient shorthand for operations
//! that may fail.
//!
//! # Error Categories
//!
//! | Category | Variants | Caller expectation |
//! |----------|----------|--------------------|
//! | Negotiation | `UnsupportedMediaType`, `NotAcceptable` | Map to 415 / 406 |
//! | Payload | `MalformedInput`, `InvalidUtf8` | Map to 400 |
//! | Constraint | `Validation` | Map to 422 |
//! | Configuration | `Instantiation`, `DuplicateDescriptor`, `Config` | Registration bug |
//! | Collaborator | `Serializer` | Propagated from the injected serializer |
//!
//! All failures are synchronous and surfaced once to the immediate caller;
//! nothing is retried internally. Queries that can legitimately find
//! nothing (registry resolution, default representations) return `Option`
//! instead of an error.

use thiserror::Error;

/// Result type for negotiation and codec operations.
///
/// Provides a convenient shorthand for `Result<T, VersionedError>`.
pub type Result<T> = std::result::Result<T, VersionedError>;

/// Errors that can occur during media-type negotiation or form decoding.
///
/// Each variant represents a different failure mode. Use pattern matching
/// to translate specific errors into transport-level responses.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum VersionedError {
    /// No registered descriptor resolves the requested media type.
    ///
    /// Raised when resolution itself is the point of the call; a plain
    /// "is this compatible?" query returns `false` instead.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The matched descriptor cannot produce an acceptable representation.
    ///
    /// Raised at write time when the descriptor declares zero content
    /// types, or when no serializer handles the requested wire structure.
    #[error("Not acceptable: {0}")]
    NotAcceptable(String),

    /// A deserialized instance failed a post-read constraint check.
    ///
    /// Carries the offending field path and the violation message.
    #[error("Validation failed at {path}: {message}")]
    Validation {
        /// Path to the offending field, e.g. `author.name`.
        path: String,
        /// Human-readable violation message.
        message: String,
    },

    /// The resolved bound type could not be default-constructed.
    ///
    /// Indicates a registration or configuration bug, not bad input.
    #[error("Unable to instantiate bound type: {0}")]
    Instantiation(String),

    /// The codec encountered an unparseable percent-escape, a malformed
    /// bracket path, or an otherwise ungrammatical media-type string.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Percent-decoded bytes were not valid UTF-8.
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A different bound type already claims this `(content type, version)`
    /// pair, or a bound type was re-registered with divergent metadata.
    ///
    /// Registering an identical descriptor twice is a no-op; this error
    /// only fires for genuine conflicts that would make resolution
    /// ambiguous or silently drop a descriptor.
    #[error("Duplicate descriptor registration: {0}")]
    DuplicateDescriptor(String),

    /// The injected serializer reported a failure.
    #[error("Serializer error: {0}")]
    Serializer(String),

    /// A required collaborator is not wired up.
    ///
    /// For example, a descriptor opted into custom consumption but the
    /// negotiator has no map decoder configured.
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_detail() {
        let err = VersionedError::UnsupportedMediaType("application/vnd.x.user".into());
        assert!(err.to_string().contains("application/vnd.x.user"));

        let err = VersionedError::Validation {
            path: "author.name".into(),
            message: "must not be blank".into(),
        };
        assert!(err.to_string().contains("author.name"));
        assert!(err.to_string().contains("must not be blank"));
    }

    #[test]
    fn test_from_utf8_error_converts() {
        let bad = String::from_utf8(vec![0xC5]).unwrap_err();
        let err = VersionedError::from(bad);
        assert!(matches!(err, VersionedError::InvalidUtf8(_)));
    }
}
