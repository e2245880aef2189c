//! Type descriptors binding versioned representation types to their
//! content types.
//!
//! A [`TypeDescriptor`] is the registration record for one versioned
//! representation: its version number, the content-type family strings it
//! answers to, and a [`BoundType`] handle through which the negotiator can
//! construct and populate instances without knowing the concrete type.
//!
//! Capabilities are wired statically at registration time:
//!
//! - every bound type implements [`ValueObject`] and `Default`
//! - a type that wants to populate itself from a generic decoded map
//!   instead of structural deserialization additionally implements
//!   [`Consume`] and registers through [`BoundType::consuming`]

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::error::Result;
use crate::form::FormNode;

/// Marker trait for registrable representation types.
///
/// Provides downcast access so injected serializers can recover the
/// concrete type from a `Box<dyn ValueObject>`.
pub trait ValueObject: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any + Send + Sync> ValueObject for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl std::fmt::Debug for dyn ValueObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueObject").finish_non_exhaustive()
    }
}

impl dyn ValueObject {
    /// Downcast to a concrete representation type.
    ///
    /// Prefer this over going through [`ValueObject::as_any`] directly:
    /// calling `as_any` on a `Box<dyn ValueObject>` resolves against the
    /// box itself (boxes satisfy the blanket impl too) and the downcast
    /// then always misses. This method forces the deref first.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutable counterpart of [`downcast_ref`](Self::downcast_ref).
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Opt-in capability for populating a value object from a generic decoded
/// map instead of direct structural deserialization.
///
/// Implementing this and registering through [`BoundType::consuming`]
/// routes request bodies through the negotiator's map decoder and hands
/// the resulting tree to `consume`, bypassing the serializer entirely.
pub trait Consume {
    /// Apply the decoded request data to `self`.
    fn consume(&mut self, data: &FormNode) -> Result<()>;
}

type ConstructFn = dyn Fn() -> Result<Box<dyn ValueObject>> + Send + Sync;
type ConsumeFn = dyn Fn(&mut dyn ValueObject, &FormNode) -> Result<()> + Send + Sync;

/// Opaque handle for a registered representation type.
///
/// Carries everything the negotiator needs to work with the type at
/// runtime: identity for idempotent registration, a default constructor,
/// and the optional consume hook.
#[derive(Clone)]
pub struct BoundType {
    id: TypeId,
    name: &'static str,
    construct: Arc<ConstructFn>,
    consume: Option<Arc<ConsumeFn>>,
}

impl BoundType {
    /// Bind a plain representation type.
    ///
    /// Instances are default-constructed and then populated by the
    /// structure-matched serializer.
    pub fn of<T>() -> Self
    where
        T: ValueObject + Default,
    {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            construct: Arc::new(|| Ok(Box::new(T::default()))),
            consume: None,
        }
    }

    /// Bind a representation type with the custom-consume capability.
    pub fn consuming<T>() -> Self
    where
        T: ValueObject + Default + Consume,
    {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            construct: Arc::new(|| Ok(Box::new(T::default()))),
            consume: Some(Arc::new(|vo, data| {
                // The constructor above guarantees the instance is a T.
                match vo.downcast_mut::<T>() {
                    Some(concrete) => concrete.consume(data),
                    None => Err(crate::error::VersionedError::Instantiation(format!(
                        "consume hook received a foreign instance, expected {}",
                        std::any::type_name::<T>()
                    ))),
                }
            })),
        }
    }

    /// The bound type's `TypeId`, used for idempotent registration.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The bound type's name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Default-construct a fresh instance.
    pub fn instantiate(&self) -> Result<Box<dyn ValueObject>> {
        (self.construct)()
    }

    /// Whether this type registered a consume hook.
    pub fn supports_custom_consume(&self) -> bool {
        self.consume.is_some()
    }

    /// Run the consume hook against an instance, if one is registered.
    pub fn run_consume(&self, instance: &mut dyn ValueObject, data: &FormNode) -> Option<Result<()>> {
        self.consume.as_ref().map(|hook| hook(instance, data))
    }

    /// Whether this handle binds the given concrete type.
    pub fn binds<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl std::fmt::Debug for BoundType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundType")
            .field("name", &self.name)
            .field("supports_custom_consume", &self.consume.is_some())
            .finish()
    }
}

/// Registration record for one versioned representation.
///
/// Content types must *not* include a version suffix or structure suffix;
/// e.g. `application/vnd.example.user`, not
/// `application/vnd.example.user.v1+json`.
#[derive(Clone, Debug)]
pub struct TypeDescriptor {
    version: i64,
    content_types: Vec<String>,
    bound: BoundType,
}

impl TypeDescriptor {
    pub fn new(
        version: i64,
        content_types: impl IntoIterator<Item = impl Into<String>>,
        bound: BoundType,
    ) -> Self {
        Self {
            version,
            content_types: content_types.into_iter().map(Into::into).collect(),
            bound,
        }
    }

    /// The representation version. Signed, compared numerically.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// The content-type family strings, in declaration order.
    pub fn content_types(&self) -> &[String] {
        &self.content_types
    }

    /// The bound type handle.
    pub fn bound(&self) -> &BoundType {
        &self.bound
    }

    /// Whether the bound type opted into custom consumption.
    pub fn supports_custom_consume(&self) -> bool {
        self.bound.supports_custom_consume()
    }
}
