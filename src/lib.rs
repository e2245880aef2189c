//! versioned_media: versioned media-type negotiation and hierarchical
//! form codec.
//!
//! This crate lets an HTTP-style API expose multiple concurrently
//! supported versions of a resource representation under one logical
//! content-type family, resolving which concrete type to (de)serialize
//! purely from the media type string - and lets request bodies carry
//! deeply nested data as flat `key=value` pairs in classic bracket/dot
//! form encoding.
//!
//! # Overview
//!
//! - **Version-aware resolution**: a request for
//!   `application/vnd.example.user+json;v=2` (or the legacy
//!   `application/vnd.example.user.v2+json` spelling) picks the descriptor
//!   registered for version 2 of the `user` family; a request without a
//!   version pin gets the newest compatible version.
//! - **Hierarchical form codec**: `a=1&b[]=2&b[a]=3&c.a[b]=5` round-trips
//!   to and from a tree of scalars, objects, and lists.
//!
//! # Modules
//!
//! - [`media`] - media-type parsing and version-aware compatibility
//! - [`registry`] - the set of registered [`TypeDescriptor`]s
//! - [`form`] - the hierarchical `x-www-form-urlencoded` codec
//! - [`negotiate`] - the orchestrator tying registry, serializers,
//!   map decoder, and validator together
//! - [`descriptor`] - type descriptors and capability wiring
//! - [`error`] - the error taxonomy
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use versioned_media::form::FormUrlDecoder;
//! use versioned_media::{
//!     BoundType, Consume, FormNode, MediaType, Negotiator, Result, TypeDescriptor,
//!     VersionRegistry,
//! };
//!
//! #[derive(Default)]
//! struct BookV1 {
//!     title: String,
//! }
//!
//! impl Consume for BookV1 {
//!     fn consume(&mut self, data: &FormNode) -> Result<()> {
//!         if let Some(title) = data.get("title").and_then(FormNode::as_scalar) {
//!             self.title = title.to_string();
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = VersionRegistry::new();
//! registry.register(TypeDescriptor::new(
//!     1,
//!     ["application/vnd.example.book"],
//!     BoundType::consuming::<BookV1>(),
//! ))?;
//!
//! let negotiator = Negotiator::new(&registry)
//!     .with_map_decoder(Arc::new(FormUrlDecoder::new()));
//!
//! let media = MediaType::parse("application/vnd.example.book;v=1")?;
//! let instance = negotiator.read(None, &media, b"title=Dune", false)?;
//! let book = instance.downcast_ref::<BookV1>().unwrap();
//! assert_eq!(book.title, "Dune");
//! # Ok::<(), versioned_media::VersionedError>(())
//! ```
//!
//! # Concurrency
//!
//! Everything is synchronous. Register descriptors at startup, then share
//! the registry freely: `resolve` and all matcher/codec functions are pure
//! reads. Runtime re-registration under live traffic needs caller-supplied
//! synchronization (e.g. an immutable-snapshot swap); the registry itself
//! does no locking.

pub mod descriptor;
pub mod error;
pub mod form;
pub mod media;
pub mod negotiate;
pub mod registry;

pub use descriptor::{BoundType, Consume, TypeDescriptor, ValueObject};
pub use error::{Result, VersionedError};
pub use form::FormNode;
pub use media::{
    default_representation, is_compatible, normalize, MediaType, VersionMatcher,
    VERSION_PARAMETER,
};
pub use negotiate::{MapDecoder, Negotiator, Serializer, Validator, Violation};
pub use registry::VersionRegistry;
