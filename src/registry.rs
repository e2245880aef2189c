//! Registry of versioned type descriptors.
//!
//! The registry is an owned value, constructed by whoever bootstraps the
//! service and passed by reference into the negotiator. There is no
//! process-wide static: tests get a fresh registry each, and a live
//! service that needs runtime re-registration swaps an immutable snapshot
//! under its own synchronization. `resolve` and `list` take `&self` and
//! are safe for unbounded concurrent readers.

use crate::descriptor::TypeDescriptor;
use crate::error::{Result, VersionedError};
use crate::media::{is_compatible, MediaType};

/// Holds the set of registered type descriptors and resolves requested
/// media types against them.
///
/// # Examples
///
/// ```
/// use versioned_media::{BoundType, MediaType, TypeDescriptor, VersionRegistry};
///
/// #[derive(Default)]
/// struct UserV1;
/// #[derive(Default)]
/// struct UserV2;
///
/// let mut registry = VersionRegistry::new();
/// registry.register(TypeDescriptor::new(
///     1,
///     ["application/vnd.x.user"],
///     BoundType::of::<UserV1>(),
/// ))?;
/// registry.register(TypeDescriptor::new(
///     2,
///     ["application/vnd.x.user"],
///     BoundType::of::<UserV2>(),
/// ))?;
///
/// // No version parameter: the newest compatible descriptor wins.
/// let newest = registry
///     .resolve(&MediaType::parse("application/vnd.x.user+json")?)
///     .unwrap();
/// assert_eq!(newest.version(), 2);
///
/// // Pinned version: exact match.
/// let pinned = registry
///     .resolve(&MediaType::parse("application/vnd.x.user;v=1")?)
///     .unwrap();
/// assert_eq!(pinned.version(), 1);
/// # Ok::<(), versioned_media::VersionedError>(())
/// ```
#[derive(Debug, Default)]
pub struct VersionRegistry {
    descriptors: Vec<TypeDescriptor>,
}

impl VersionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor.
    ///
    /// Idempotent for an identical registration: the same bound type with
    /// the same version and content types is a no-op. Re-registering a
    /// bound type with *different* metadata is rejected with
    /// [`VersionedError::DuplicateDescriptor`] instead of silently
    /// dropping the new descriptor, as is registering a different type
    /// over an already claimed `(content type, version)` pair: two
    /// descriptors that resolve identically would make resolution among
    /// them arbitrary.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<()> {
        if let Some(existing) = self
            .descriptors
            .iter()
            .find(|d| d.bound().id() == descriptor.bound().id())
        {
            if existing.version() == descriptor.version()
                && existing.content_types() == descriptor.content_types()
            {
                return Ok(());
            }
            return Err(VersionedError::DuplicateDescriptor(format!(
                "{} already registered as v{} {:?}, refusing conflicting re-registration",
                existing.bound().name(),
                existing.version(),
                existing.content_types()
            )));
        }
        for existing in &self.descriptors {
            if existing.version() != descriptor.version() {
                continue;
            }
            if let Some(claimed) = existing
                .content_types()
                .iter()
                .find(|ct| descriptor.content_types().contains(*ct))
            {
                return Err(VersionedError::DuplicateDescriptor(format!(
                    "{claimed};v={} already bound to {}",
                    existing.version(),
                    existing.bound().name()
                )));
            }
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Register a collection of descriptors.
    pub fn register_all(
        &mut self,
        descriptors: impl IntoIterator<Item = TypeDescriptor>,
    ) -> Result<()> {
        for descriptor in descriptors {
            self.register(descriptor)?;
        }
        Ok(())
    }

    /// Empty the registry. Administrative/test use.
    pub fn clear(&mut self) {
        self.descriptors.clear();
    }

    /// Immutable view of all registered descriptors, in registration order.
    pub fn list(&self) -> &[TypeDescriptor] {
        &self.descriptors
    }

    /// Resolve a requested media type to the best matching descriptor.
    ///
    /// A request pinning a version (`;v=N`) returns the first descriptor
    /// with exactly that version. Without a pin, the highest-version
    /// compatible descriptor wins. `None` means nothing registered is
    /// compatible; the negotiator turns that into `UnsupportedMediaType`
    /// where absence is fatal.
    pub fn resolve(&self, requested: &MediaType) -> Option<&TypeDescriptor> {
        let target_version = requested.version();
        let mut best: Option<&TypeDescriptor> = None;

        for descriptor in &self.descriptors {
            if !is_compatible(requested, descriptor) {
                continue;
            }
            if target_version == Some(descriptor.version()) {
                return Some(descriptor);
            }
            if best.map_or(true, |b| descriptor.version() > b.version()) {
                best = Some(descriptor);
            }
        }
        best
    }
}
