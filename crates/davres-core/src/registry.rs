//! The capability registry: startup-built, immutable dispatch table.
//!
//! At initialization the operator registers backing-object types and
//! capability handlers; [`RegistryBuilder::build`] then resolves the best
//! handler for every `(capability, type)` pair and validates that the
//! required capabilities are covered. After that the registry is strictly
//! read-only, so concurrent lookups need no locking.
//!
//! Resolution picks the most specific match (exact type over tag over
//! catch-all). Ties are broken by registration order, first registered
//! wins: deterministic, but an arbitrary policy — treat the order of
//! `register` calls as part of your configuration.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::auth::Method;
use crate::backing::TypeInfo;
use crate::capability::{
    AclHandler, AuthenticateHandler, CapabilityKind, ChildrenHandler, ContentLengthHandler,
    ContentTypeHandler, CopyHandler, DeleteHandler, DisplayNameHandler, GetHandler, Handler,
    MaxAgeHandler, MoveHandler, NameHandler, PostHandler, TimestampHandler, UniqueIdHandler,
};
use crate::error::{DavError, DavResult};

/// How a handler declares which backing types it serves.
#[derive(Debug, Clone)]
pub enum TypeMatch {
    /// Exactly one concrete type.
    Exact(TypeId),
    /// Every registered type declaring this tag (case-insensitive).
    Tagged(String),
    /// Every registered type; the catch-all fallback.
    Any,
}

impl TypeMatch {
    /// Exact match for `T`.
    pub fn of<T: Any>() -> Self {
        TypeMatch::Exact(TypeId::of::<T>())
    }

    /// Tag match (case-insensitive against declared tags and simple names).
    pub fn tagged(tag: impl Into<String>) -> Self {
        TypeMatch::Tagged(tag.into())
    }

    /// Lower is more specific.
    fn specificity(&self) -> u8 {
        match self {
            TypeMatch::Exact(_) => 0,
            TypeMatch::Tagged(_) => 1,
            TypeMatch::Any => 2,
        }
    }

    fn matches(&self, info: &TypeInfo) -> bool {
        match self {
            TypeMatch::Exact(id) => *id == info.type_id(),
            TypeMatch::Tagged(tag) => info.matches_tag(tag),
            TypeMatch::Any => true,
        }
    }
}

struct Registration {
    matcher: TypeMatch,
    handler: Handler,
}

/// Builder for [`CapabilityRegistry`]. Registration order is significant.
#[derive(Default)]
pub struct RegistryBuilder {
    types: Vec<TypeInfo>,
    registrations: Vec<Registration>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a backing type, its protocol type tags included.
    pub fn register_type<T: Any>(mut self, tags: &[&str]) -> Self {
        self.types.push(TypeInfo::of::<T>(tags));
        self
    }

    /// Register a handler for the backing types `matcher` selects.
    pub fn register(mut self, matcher: TypeMatch, handler: Handler) -> Self {
        self.registrations.push(Registration { matcher, handler });
        self
    }

    /// Resolve the dispatch table and validate required capabilities.
    ///
    /// Every registered type must resolve a Name and a UniqueId handler;
    /// anything less is a wiring mistake surfaced here, at startup, never
    /// at call time.
    pub fn build(self) -> DavResult<CapabilityRegistry> {
        let mut table: HashMap<(CapabilityKind, TypeId), usize> = HashMap::new();

        for info in &self.types {
            let mut best: HashMap<CapabilityKind, (u8, usize)> = HashMap::new();
            for (index, reg) in self.registrations.iter().enumerate() {
                if !reg.matcher.matches(info) {
                    continue;
                }
                let specificity = reg.matcher.specificity();
                let kind = reg.handler.kind();
                // Strict comparison keeps the first registration on ties.
                match best.get(&kind) {
                    Some((current, _)) if *current <= specificity => {}
                    _ => {
                        best.insert(kind, (specificity, index));
                    }
                }
            }
            for (kind, (_, index)) in &best {
                table.insert((*kind, info.type_id()), *index);
            }

            for required in [CapabilityKind::Name, CapabilityKind::UniqueId] {
                if !table.contains_key(&(required, info.type_id())) {
                    return Err(DavError::Config(format!(
                        "backing type {} has no {required:?} handler",
                        info.simple_name()
                    )));
                }
            }
            debug!(
                backing_type = info.simple_name(),
                capabilities = best.len(),
                "resolved capability bindings"
            );
        }

        let types = self
            .types
            .into_iter()
            .map(|info| (info.type_id(), Arc::new(info)))
            .collect();
        let handlers = self.registrations.into_iter().map(|r| r.handler).collect();

        Ok(CapabilityRegistry { types, handlers, table })
    }
}

/// Immutable `(capability, backing type) -> handler` dispatch table.
pub struct CapabilityRegistry {
    types: HashMap<TypeId, Arc<TypeInfo>>,
    handlers: Vec<Handler>,
    table: HashMap<(CapabilityKind, TypeId), usize>,
}

impl CapabilityRegistry {
    /// The handler bound to `(kind, type_id)`, if any.
    pub fn resolve(&self, kind: CapabilityKind, type_id: TypeId) -> Option<&Handler> {
        self.table.get(&(kind, type_id)).map(|index| &self.handlers[*index])
    }

    /// The registration record for a backing type.
    pub fn type_info(&self, type_id: TypeId) -> Option<&Arc<TypeInfo>> {
        self.types.get(&type_id)
    }

    /// Case-insensitive type-membership test against the type's simple
    /// name or declared tags. Unregistered types match nothing.
    pub fn is_type(&self, type_id: TypeId, tag: &str) -> bool {
        self.type_info(type_id).is_some_and(|info| info.matches_tag(tag))
    }

    /// Whether `method` can run against this backing type. Methods that the
    /// capability table does not gate (PROPFIND, OPTIONS, LOCK, PUT, ...)
    /// are always compatible; the full method state machine belongs to the
    /// dispatcher.
    pub fn is_compatible(&self, type_id: TypeId, method: Method) -> bool {
        match Self::method_gate(method) {
            Some(kind) => self.resolve(kind, type_id).is_some(),
            None => true,
        }
    }

    fn method_gate(method: Method) -> Option<CapabilityKind> {
        match method {
            Method::Get | Method::Head => Some(CapabilityKind::Get),
            Method::Post => Some(CapabilityKind::Post),
            Method::Delete => Some(CapabilityKind::Delete),
            Method::Move => Some(CapabilityKind::Move),
            Method::Copy => Some(CapabilityKind::Copy),
            _ => None,
        }
    }

    pub fn name_handler(&self, type_id: TypeId) -> Option<&Arc<dyn NameHandler>> {
        match self.resolve(CapabilityKind::Name, type_id) {
            Some(Handler::Name(h)) => Some(h),
            _ => None,
        }
    }

    pub fn display_name_handler(&self, type_id: TypeId) -> Option<&Arc<dyn DisplayNameHandler>> {
        match self.resolve(CapabilityKind::DisplayName, type_id) {
            Some(Handler::DisplayName(h)) => Some(h),
            _ => None,
        }
    }

    pub fn unique_id_handler(&self, type_id: TypeId) -> Option<&Arc<dyn UniqueIdHandler>> {
        match self.resolve(CapabilityKind::UniqueId, type_id) {
            Some(Handler::UniqueId(h)) => Some(h),
            _ => None,
        }
    }

    pub fn created_date_handler(&self, type_id: TypeId) -> Option<&Arc<dyn TimestampHandler>> {
        match self.resolve(CapabilityKind::CreatedDate, type_id) {
            Some(Handler::CreatedDate(h)) => Some(h),
            _ => None,
        }
    }

    pub fn modified_date_handler(&self, type_id: TypeId) -> Option<&Arc<dyn TimestampHandler>> {
        match self.resolve(CapabilityKind::ModifiedDate, type_id) {
            Some(Handler::ModifiedDate(h)) => Some(h),
            _ => None,
        }
    }

    pub fn content_type_handler(&self, type_id: TypeId) -> Option<&Arc<dyn ContentTypeHandler>> {
        match self.resolve(CapabilityKind::ContentType, type_id) {
            Some(Handler::ContentType(h)) => Some(h),
            _ => None,
        }
    }

    pub fn content_length_handler(
        &self,
        type_id: TypeId,
    ) -> Option<&Arc<dyn ContentLengthHandler>> {
        match self.resolve(CapabilityKind::ContentLength, type_id) {
            Some(Handler::ContentLength(h)) => Some(h),
            _ => None,
        }
    }

    pub fn get_handler(&self, type_id: TypeId) -> Option<&Arc<dyn GetHandler>> {
        match self.resolve(CapabilityKind::Get, type_id) {
            Some(Handler::Get(h)) => Some(h),
            _ => None,
        }
    }

    pub fn post_handler(&self, type_id: TypeId) -> Option<&Arc<dyn PostHandler>> {
        match self.resolve(CapabilityKind::Post, type_id) {
            Some(Handler::Post(h)) => Some(h),
            _ => None,
        }
    }

    pub fn delete_handler(&self, type_id: TypeId) -> Option<&Arc<dyn DeleteHandler>> {
        match self.resolve(CapabilityKind::Delete, type_id) {
            Some(Handler::Delete(h)) => Some(h),
            _ => None,
        }
    }

    pub fn move_handler(&self, type_id: TypeId) -> Option<&Arc<dyn MoveHandler>> {
        match self.resolve(CapabilityKind::Move, type_id) {
            Some(Handler::Move(h)) => Some(h),
            _ => None,
        }
    }

    pub fn copy_handler(&self, type_id: TypeId) -> Option<&Arc<dyn CopyHandler>> {
        match self.resolve(CapabilityKind::Copy, type_id) {
            Some(Handler::Copy(h)) => Some(h),
            _ => None,
        }
    }

    pub fn max_age_handler(&self, type_id: TypeId) -> Option<&Arc<dyn MaxAgeHandler>> {
        match self.resolve(CapabilityKind::MaxAge, type_id) {
            Some(Handler::MaxAge(h)) => Some(h),
            _ => None,
        }
    }

    pub fn authenticate_handler(&self, type_id: TypeId) -> Option<&Arc<dyn AuthenticateHandler>> {
        match self.resolve(CapabilityKind::Authenticate, type_id) {
            Some(Handler::Authenticate(h)) => Some(h),
            _ => None,
        }
    }

    pub fn acl_handler(&self, type_id: TypeId) -> Option<&Arc<dyn AclHandler>> {
        match self.resolve(CapabilityKind::AccessControlList, type_id) {
            Some(Handler::AccessControlList(h)) => Some(h),
            _ => None,
        }
    }

    pub fn children_handler(&self, type_id: TypeId) -> Option<&Arc<dyn ChildrenHandler>> {
        match self.resolve(CapabilityKind::Children, type_id) {
            Some(Handler::Children(h)) => Some(h),
            _ => None,
        }
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("types", &self.types.len())
            .field("handlers", &self.handlers.len())
            .field("bindings", &self.table.len())
            .finish()
    }
}
