//! Negotiation orchestrator and its capability seams.
//!
//! The [`Negotiator`] composes a [`VersionRegistry`](crate::VersionRegistry)
//! with injected capabilities to answer "can I read/write this media type?"
//! and to perform the read/write:
//!
//! - [`Serializer`] - structural (de)serialization for one wire structure
//!   family (`json`, `xml`, ...), selected by the media type's structure
//!   suffix
//! - [`MapDecoder`] - decodes raw bytes into a generic [`FormNode`] tree
//!   for types with the custom-consume capability
//! - [`Validator`] - optional post-deserialize constraint checking
//!
//! All operations are synchronous; the registry is borrowed, never owned,
//! so one fresh registry per test (or an immutable snapshot swap in a live
//! service) costs nothing.
//!
//! # Read flow
//!
//! ```text
//! media type ──resolve──▶ descriptor ──instantiate──▶ instance
//!                                        │
//!                     consume hook? ─yes─┤ MapDecoder + consume(map)
//!                                   └no──┤ Serializer::read_value
//!                                        ▼
//!                              optional Validator::validate
//! ```
//!
//! # Write flow
//!
//! Empty content-type list fails `NotAcceptable` outright. The response
//! `Content-Type` is the literal requested media type when compatible with
//! the instance's descriptor, otherwise the descriptor's default
//! representation.

use std::sync::Arc;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue};

use crate::descriptor::{BoundType, TypeDescriptor, ValueObject};
use crate::error::{Result, VersionedError};
use crate::form::FormNode;
use crate::media::{default_representation, is_compatible, MediaType};
use crate::registry::VersionRegistry;

/// Structural serializer for one wire structure family.
///
/// One implementation per structure suffix (`json`, `xml`, ...). The
/// negotiator hands implementations the [`BoundType`] of the resolved
/// descriptor so they can dispatch per registered type.
pub trait Serializer: Send + Sync {
    /// The structure suffixes this serializer handles.
    fn structures(&self) -> &[&'static str];

    /// Deserialize a request body into a fresh instance of the bound type.
    fn read_value(&self, body: &[u8], target: &BoundType) -> Result<Box<dyn ValueObject>>;

    /// Serialize an instance for transit.
    fn write_value(&self, value: &dyn ValueObject) -> Result<Bytes>;

    /// Convert an existing instance (e.g. an internal model) into the
    /// bound representation type.
    fn convert_value(
        &self,
        value: &dyn ValueObject,
        target: &BoundType,
    ) -> Result<Box<dyn ValueObject>>;
}

/// Decoder from raw bytes to a generic tree, for custom-consume types.
pub trait MapDecoder: Send + Sync {
    fn decode(&self, body: &[u8]) -> Result<FormNode>;
}

/// A single constraint violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// Path to the offending field, e.g. `author.name`.
    pub path: String,
    /// Human-readable message.
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Post-deserialize constraint checking.
///
/// Returns the first violation, or `None` when the instance is valid.
pub trait Validator: Send + Sync {
    fn validate(&self, value: &dyn ValueObject) -> Option<Violation>;
}

/// Composes registry, matcher, and injected capabilities into the
/// read/write negotiation flow.
pub struct Negotiator<'r> {
    registry: &'r VersionRegistry,
    serializers: Vec<Arc<dyn Serializer>>,
    map_decoder: Option<Arc<dyn MapDecoder>>,
    validator: Option<Arc<dyn Validator>>,
}

impl<'r> Negotiator<'r> {
    pub fn new(registry: &'r VersionRegistry) -> Self {
        Self {
            registry,
            serializers: Vec::new(),
            map_decoder: None,
            validator: None,
        }
    }

    /// Add a serializer. Order matters: a media type without a structure
    /// suffix is served by the first one registered.
    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializers.push(serializer);
        self
    }

    /// Set the generic map decoder used for custom-consume types.
    pub fn with_map_decoder(mut self, decoder: Arc<dyn MapDecoder>) -> Self {
        self.map_decoder = Some(decoder);
        self
    }

    /// Set the validator run when a caller requires validation.
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Whether a request body of `media` can be read.
    ///
    /// With a concrete `requested` descriptor the answer is its
    /// compatibility, plain and simple. Without one (the caller asked for
    /// an abstract type) the registry must resolve the media type, and a
    /// failed resolution is a hard [`VersionedError::UnsupportedMediaType`]
    /// rather than `false`: the query itself cannot be answered.
    pub fn can_read(
        &self,
        requested: Option<&TypeDescriptor>,
        media: &MediaType,
    ) -> Result<bool> {
        if let Some(descriptor) = requested {
            return Ok(is_compatible(media, descriptor));
        }
        match self.registry.resolve(media) {
            Some(_) => Ok(true),
            None => Err(VersionedError::UnsupportedMediaType(media.to_string())),
        }
    }

    /// Read a request body into an instance of the resolved bound type.
    pub fn read(
        &self,
        requested: Option<&TypeDescriptor>,
        media: &MediaType,
        body: &[u8],
        require_valid: bool,
    ) -> Result<Box<dyn ValueObject>> {
        let descriptor = self.resolve_for_read(requested, media)?;
        let bound = descriptor.bound();

        let mut instance = bound
            .instantiate()
            .map_err(|e| VersionedError::Instantiation(format!("{}: {e}", bound.name())))?;

        tracing::debug!(
            media = %media,
            bound = bound.name(),
            version = descriptor.version(),
            custom_consume = bound.supports_custom_consume(),
            "reading request body"
        );

        if bound.supports_custom_consume() {
            let decoder = self.map_decoder.as_ref().ok_or_else(|| {
                VersionedError::Config(format!(
                    "{} requires a map decoder, none configured",
                    bound.name()
                ))
            })?;
            let data = decoder.decode(body)?;
            if let Some(result) = bound.run_consume(instance.as_mut(), &data) {
                result?;
            }
        } else {
            let serializer = self.serializer_for(media).ok_or_else(|| {
                VersionedError::UnsupportedMediaType(format!(
                    "no serializer for structure of {media}"
                ))
            })?;
            instance = serializer.read_value(body, bound)?;
        }

        if require_valid {
            self.validate(instance.as_ref())?;
        }
        Ok(instance)
    }

    /// Whether an instance described by `descriptor` can be written as
    /// `media`. `false` for an undescribed type; never an error.
    pub fn can_write(&self, descriptor: Option<&TypeDescriptor>, media: &MediaType) -> bool {
        descriptor.is_some_and(|d| is_compatible(media, d))
    }

    /// Serialize an instance for transit, fixing up the response
    /// `Content-Type` header.
    ///
    /// The header carries the literal requested media type when it is
    /// compatible with the descriptor, otherwise the descriptor's default
    /// representation.
    pub fn write(
        &self,
        instance: &dyn ValueObject,
        descriptor: &TypeDescriptor,
        media: &MediaType,
        headers: &mut HeaderMap,
        require_valid: bool,
    ) -> Result<Bytes> {
        if descriptor.content_types().is_empty() {
            return Err(VersionedError::NotAcceptable(format!(
                "{} declares no content types",
                descriptor.bound().name()
            )));
        }
        if require_valid {
            self.validate(instance)?;
        }

        let content_type = if is_compatible(media, descriptor) {
            media.to_string()
        } else {
            // Unwrap is safe: the empty-content-type case bailed above.
            default_representation(descriptor).expect("descriptor has content types")
        };
        let header = HeaderValue::from_str(&content_type).map_err(|_| {
            VersionedError::NotAcceptable(format!("unrepresentable content type {content_type}"))
        })?;
        headers.insert(CONTENT_TYPE, header);

        tracing::debug!(
            media = %media,
            content_type = %content_type,
            bound = descriptor.bound().name(),
            "writing response body"
        );

        let serializer = self.serializer_for(media).ok_or_else(|| {
            VersionedError::NotAcceptable(format!("no serializer for structure of {media}"))
        })?;
        serializer.write_value(instance)
    }

    fn resolve_for_read(
        &self,
        requested: Option<&TypeDescriptor>,
        media: &MediaType,
    ) -> Result<TypeDescriptor> {
        if let Some(descriptor) = requested {
            if is_compatible(media, descriptor) {
                return Ok(descriptor.clone());
            }
        }
        self.registry
            .resolve(media)
            .cloned()
            .ok_or_else(|| VersionedError::UnsupportedMediaType(media.to_string()))
    }

    fn serializer_for(&self, media: &MediaType) -> Option<&Arc<dyn Serializer>> {
        match media.suffix() {
            // No structure filter: the first registered serializer serves.
            None => self.serializers.first(),
            Some(suffix) => self
                .serializers
                .iter()
                .find(|s| s.structures().iter().any(|&known| known == suffix)),
        }
    }

    fn validate(&self, instance: &dyn ValueObject) -> Result<()> {
        let Some(validator) = &self.validator else {
            tracing::warn!("validation required but no validator configured");
            return Ok(());
        };
        match validator.validate(instance) {
            Some(violation) => Err(VersionedError::Validation {
                path: violation.path,
                message: violation.message,
            }),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Negotiator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Negotiator")
            .field("descriptors", &self.registry.list().len())
            .field("serializers", &self.serializers.len())
            .field("has_map_decoder", &self.map_decoder.is_some())
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Consume;
    use crate::form::FormUrlDecoder;

    #[derive(Default)]
    struct UserV1 {
        name: String,
    }

    #[derive(Default)]
    struct BookV1 {
        title: String,
    }

    impl Consume for BookV1 {
        fn consume(&mut self, data: &FormNode) -> Result<()> {
            if let Some(title) = data.get("title").and_then(FormNode::as_scalar) {
                self.title = title.to_string();
            }
            Ok(())
        }
    }

    /// Line-oriented toy serializer: `name=<value>` for `UserV1`.
    struct PlainSerializer;

    impl Serializer for PlainSerializer {
        fn structures(&self) -> &[&'static str] {
            &["plain"]
        }

        fn read_value(&self, body: &[u8], target: &BoundType) -> Result<Box<dyn ValueObject>> {
            if !target.binds::<UserV1>() {
                return Err(VersionedError::Serializer(format!(
                    "unknown type {}",
                    target.name()
                )));
            }
            let text = String::from_utf8(body.to_vec())?;
            let name = text.strip_prefix("name=").unwrap_or_default().to_string();
            Ok(Box::new(UserV1 { name }))
        }

        fn write_value(&self, value: &dyn ValueObject) -> Result<Bytes> {
            let user = value
                .downcast_ref::<UserV1>()
                .ok_or_else(|| VersionedError::Serializer("not a UserV1".into()))?;
            Ok(Bytes::from(format!("name={}", user.name)))
        }

        fn convert_value(
            &self,
            _value: &dyn ValueObject,
            target: &BoundType,
        ) -> Result<Box<dyn ValueObject>> {
            target.instantiate()
        }
    }

    struct NameRequired;

    impl Validator for NameRequired {
        fn validate(&self, value: &dyn ValueObject) -> Option<Violation> {
            let user = value.downcast_ref::<UserV1>()?;
            user.name
                .is_empty()
                .then(|| Violation::new("name", "must not be blank"))
        }
    }

    fn mt(raw: &str) -> MediaType {
        MediaType::parse(raw).unwrap()
    }

    fn registry() -> VersionRegistry {
        let mut registry = VersionRegistry::new();
        registry
            .register(TypeDescriptor::new(
                1,
                ["application/vnd.x.user"],
                BoundType::of::<UserV1>(),
            ))
            .unwrap();
        registry
            .register(TypeDescriptor::new(
                1,
                ["application/vnd.x.book"],
                BoundType::consuming::<BookV1>(),
            ))
            .unwrap();
        registry
    }

    fn negotiator(registry: &VersionRegistry) -> Negotiator<'_> {
        Negotiator::new(registry)
            .with_serializer(Arc::new(PlainSerializer))
            .with_map_decoder(Arc::new(FormUrlDecoder::new()))
    }

    #[test]
    fn test_can_read_concrete_descriptor() {
        let registry = registry();
        let n = negotiator(&registry);
        let d = registry.list()[0].clone();

        assert!(n.can_read(Some(&d), &mt("application/vnd.x.user+plain")).unwrap());
        assert!(!n.can_read(Some(&d), &mt("application/vnd.x.other")).unwrap());
    }

    #[test]
    fn test_can_read_abstract_resolution() {
        let registry = registry();
        let n = negotiator(&registry);

        assert!(n.can_read(None, &mt("application/vnd.x.user")).unwrap());
        let err = n.can_read(None, &mt("application/vnd.x.nope")).unwrap_err();
        assert!(matches!(err, VersionedError::UnsupportedMediaType(_)));
    }

    #[test]
    fn test_read_through_serializer() {
        let registry = registry();
        let n = negotiator(&registry);

        let instance = n
            .read(None, &mt("application/vnd.x.user+plain"), b"name=ada", false)
            .unwrap();
        let user = instance.downcast_ref::<UserV1>().unwrap();
        assert_eq!(user.name, "ada");
    }

    #[test]
    fn test_read_through_consume() {
        let registry = registry();
        let n = negotiator(&registry);

        let instance = n
            .read(None, &mt("application/vnd.x.book"), b"title=Dune&extra=x", false)
            .unwrap();
        let book = instance.downcast_ref::<BookV1>().unwrap();
        assert_eq!(book.title, "Dune");
    }

    #[test]
    fn test_read_consume_without_decoder_is_config_error() {
        let registry = registry();
        let n = Negotiator::new(&registry).with_serializer(Arc::new(PlainSerializer));

        let err = n
            .read(None, &mt("application/vnd.x.book"), b"title=Dune", false)
            .unwrap_err();
        assert!(matches!(err, VersionedError::Config(_)));
    }

    #[test]
    fn test_read_unknown_structure() {
        let registry = registry();
        let n = negotiator(&registry);

        let err = n
            .read(None, &mt("application/vnd.x.user+cbor"), b"", false)
            .unwrap_err();
        assert!(matches!(err, VersionedError::UnsupportedMediaType(_)));
    }

    #[test]
    fn test_read_validation() {
        let registry = registry();
        let n = negotiator(&registry).with_validator(Arc::new(NameRequired));

        let err = n
            .read(None, &mt("application/vnd.x.user+plain"), b"", true)
            .unwrap_err();
        match err {
            VersionedError::Validation { path, message } => {
                assert_eq!(path, "name");
                assert_eq!(message, "must not be blank");
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        // Same body without the validation requirement reads fine.
        assert!(n
            .read(None, &mt("application/vnd.x.user+plain"), b"", false)
            .is_ok());
    }

    #[test]
    fn test_read_without_validator_warns_and_proceeds() {
        let registry = registry();
        let n = negotiator(&registry);
        assert!(n
            .read(None, &mt("application/vnd.x.user+plain"), b"", true)
            .is_ok());
    }

    #[test]
    fn test_can_write() {
        let registry = registry();
        let n = negotiator(&registry);
        let d = registry.list()[0].clone();

        assert!(n.can_write(Some(&d), &mt("application/vnd.x.user+plain;v=1")));
        assert!(!n.can_write(Some(&d), &mt("application/vnd.x.user;v=2")));
        assert!(!n.can_write(None, &mt("application/vnd.x.user")));
    }

    #[test]
    fn test_write_sets_literal_content_type_when_compatible() {
        let registry = registry();
        let n = negotiator(&registry);
        let d = registry.list()[0].clone();

        let mut headers = HeaderMap::new();
        let body = n
            .write(
                &UserV1 { name: "ada".into() },
                &d,
                &mt("application/vnd.x.user+plain;v=1"),
                &mut headers,
                false,
            )
            .unwrap();
        assert_eq!(body, Bytes::from_static(b"name=ada"));
        assert_eq!(
            headers.get(CONTENT_TYPE).unwrap(),
            "application/vnd.x.user+plain;v=1"
        );
    }

    #[test]
    fn test_write_rewrites_incompatible_content_type() {
        let registry = registry();
        let n = negotiator(&registry);
        let d = registry.list()[0].clone();

        let mut headers = HeaderMap::new();
        n.write(
            &UserV1 { name: "ada".into() },
            &d,
            // Version 9 does not exist; still serialized, but announced as
            // the descriptor's default representation.
            &mt("application/vnd.x.user+plain;v=9"),
            &mut headers,
            false,
        )
        .unwrap();
        assert_eq!(
            headers.get(CONTENT_TYPE).unwrap(),
            "application/vnd.x.user;v=1"
        );
    }

    #[test]
    fn test_write_empty_content_types_not_acceptable() {
        let registry = registry();
        let n = negotiator(&registry);
        let bare = TypeDescriptor::new(1, Vec::<String>::new(), BoundType::of::<UserV1>());

        let mut headers = HeaderMap::new();
        let err = n
            .write(
                &UserV1 { name: "ada".into() },
                &bare,
                &mt("application/vnd.x.user"),
                &mut headers,
                false,
            )
            .unwrap_err();
        assert!(matches!(err, VersionedError::NotAcceptable(_)));
        assert!(headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_write_validation_runs_before_serialization() {
        let registry = registry();
        let n = negotiator(&registry).with_validator(Arc::new(NameRequired));
        let d = registry.list()[0].clone();

        let mut headers = HeaderMap::new();
        let err = n
            .write(
                &UserV1::default(),
                &d,
                &mt("application/vnd.x.user+plain"),
                &mut headers,
                true,
            )
            .unwrap_err();
        assert!(matches!(err, VersionedError::Validation { .. }));
    }
}
