//! Version-aware media-type compatibility.
//!
//! Compatibility is checked against the *base* of the requested media type
//! (structure suffix stripped) with `*` wildcards honored on either side
//! of the `/`. Two spellings pin a version on the wire:
//!
//! - the `v` media-type parameter: `application/vnd.x.user+json;v=1`
//! - the legacy `.vN` subtype suffix: `application/vnd.x.user.v1+json`
//!
//! A request carrying neither is compatible with every version of its
//! content-type family; the registry then prefers the newest.

use crate::descriptor::TypeDescriptor;
use crate::media::{MediaType, VERSION_PARAMETER};

/// Whether the requested media type is compatible with a descriptor.
///
/// # Examples
///
/// ```
/// use versioned_media::{is_compatible, BoundType, MediaType, TypeDescriptor};
///
/// #[derive(Default)]
/// struct User;
///
/// let d = TypeDescriptor::new(1, ["application/vnd.x.user"], BoundType::of::<User>());
/// let mt = MediaType::parse("application/vnd.x.user.v1+json").unwrap();
/// assert!(is_compatible(&mt, &d));
/// let mt = MediaType::parse("application/vnd.x.user.v2+json").unwrap();
/// assert!(!is_compatible(&mt, &d));
/// ```
pub fn is_compatible(requested: &MediaType, descriptor: &TypeDescriptor) -> bool {
    // An explicit `v` parameter must name this descriptor's version. A
    // parameter that fails to parse as an integer matches nothing.
    if requested.has_version_parameter() && requested.version() != Some(descriptor.version()) {
        return false;
    }

    let (req_primary, req_subtype) = requested.base();
    descriptor.content_types().iter().any(|allowed| {
        let Some((primary, subtype)) = allowed.split_once('/') else {
            return false;
        };
        if !component_matches(req_primary, primary) {
            return false;
        }
        component_matches(req_subtype, subtype)
            || req_subtype == format!("{subtype}.v{}", descriptor.version())
    })
}

/// The descriptor's default wire representation.
///
/// First declared content type plus the version parameter, or `None` when
/// the descriptor declares no content types at all.
pub fn default_representation(descriptor: &TypeDescriptor) -> Option<String> {
    let first = descriptor.content_types().first()?;
    Some(format!(
        "{first};{VERSION_PARAMETER}={}",
        descriptor.version()
    ))
}

/// Stamp the descriptor's version onto a media type that does not already
/// carry one.
pub fn normalize(media: &MediaType, descriptor: &TypeDescriptor) -> MediaType {
    if media.has_version_parameter() {
        media.clone()
    } else {
        media.with_parameter(VERSION_PARAMETER, descriptor.version().to_string())
    }
}

fn component_matches(requested: &str, allowed: &str) -> bool {
    requested == "*" || allowed == "*" || requested == allowed
}

/// Namespace wrapper over the matcher functions.
///
/// Zero-sized; exists for callers that prefer `VersionMatcher::is_compatible`
/// over importing the free functions.
pub struct VersionMatcher;

impl VersionMatcher {
    pub fn is_compatible(requested: &MediaType, descriptor: &TypeDescriptor) -> bool {
        is_compatible(requested, descriptor)
    }

    pub fn default_representation(descriptor: &TypeDescriptor) -> Option<String> {
        default_representation(descriptor)
    }

    pub fn normalize(media: &MediaType, descriptor: &TypeDescriptor) -> MediaType {
        normalize(media, descriptor)
    }
}
