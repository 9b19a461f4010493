//! The data boundary: opaque backing objects and their registered type info.
//!
//! A backing object is any externally-owned domain value the operator wants
//! exposed as a protocol resource. The core never mutates its identity; all
//! reads and writes go through capability handlers, which downcast to the
//! concrete types they registered for.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// An opaque, externally-owned domain value adapted as a resource.
///
/// Cheap to clone; ownership stays with the storage layer that created the
/// inner `Arc`.
#[derive(Clone)]
pub struct BackingObject(Arc<dyn Any + Send + Sync>);

impl BackingObject {
    /// Wrap a domain value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Wrap an already-shared domain value without copying it.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self(value)
    }

    /// The `TypeId` of the concrete value inside.
    pub fn type_id(&self) -> TypeId {
        self.0.as_ref().type_id()
    }

    /// Downcast to the concrete type a handler registered for.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// True iff the inner value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }
}

impl fmt::Debug for BackingObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BackingObject").field(&self.type_id()).finish()
    }
}

/// Per-type registration record: the simple type name plus the explicitly
/// declared protocol type tags.
///
/// Declared tags replace runtime inspection of nested marker types: a
/// backing type that satisfies several protocol sub-roles (say, a folder
/// that is also a calendar) simply declares both tags at registration.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    type_id: TypeId,
    simple_name: &'static str,
    tags: Vec<String>,
}

impl TypeInfo {
    /// Build the record for `T`, deriving the simple (unqualified) name from
    /// the compiler's type name.
    pub fn of<T: Any>(tags: &[&str]) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            simple_name: simple_type_name(std::any::type_name::<T>()),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The unqualified name of the backing type, e.g. `"Folder"`.
    pub fn simple_name(&self) -> &str {
        self.simple_name
    }

    /// The declared protocol type tags.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Case-insensitive membership test against the simple name or any
    /// declared tag.
    pub fn matches_tag(&self, tag: &str) -> bool {
        self.simple_name.eq_ignore_ascii_case(tag)
            || self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Strip the module path (and any generic arguments) from a compiler type
/// name: `"app::domain::Folder"` becomes `"Folder"`.
fn simple_type_name(full: &'static str) -> &'static str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics.rsplit("::").next().unwrap_or(without_generics)
}
