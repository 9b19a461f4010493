//! Capability kinds and the narrow handler traits behind them.
//!
//! One capability is one discrete protocol-facing behavior. A handler
//! implements that behavior for one or more backing-object types; which
//! handler serves which type is decided once, at registry build time.
//!
//! The traits are deliberately narrow. A backing type that cannot be
//! deleted simply has no Delete handler; callers get a typed
//! [`DavError::Unsupported`](crate::error::DavError::Unsupported) rather
//! than a stub method.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::SystemTime;

use crate::auth::{AuthContext, DigestResponse, Principal, Request};
use crate::backing::BackingObject;
use crate::error::DavResult;
use crate::privilege::{Privilege, PrivilegeSet};

/// The discrete resource behaviors the registry dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Name,
    DisplayName,
    UniqueId,
    CreatedDate,
    ModifiedDate,
    ContentType,
    ContentLength,
    Get,
    Post,
    Delete,
    Move,
    Copy,
    MaxAge,
    Authenticate,
    AccessControlList,
    Children,
}

/// A byte range requested for partial content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteRange {
    pub start: Option<u64>,
    pub finish: Option<u64>,
}

/// An uploaded file attached to a form submission.
#[derive(Debug, Clone)]
pub struct FileItem {
    pub name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Cache duration a Get handler declares for its backing type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheDirective {
    /// Nothing declared; the generic max-age lookup applies.
    #[default]
    Unspecified,
    /// Explicitly cacheable for this many seconds.
    MaxAge(u64),
    /// Explicitly not cacheable. Distinct from [`Self::Unspecified`]: this
    /// suppresses the generic fallback too.
    NoCache,
}

/// Outcome of form processing.
#[derive(Debug, Clone)]
pub enum PostResult {
    /// Send the client to this location.
    Redirect(String),
    /// Payload to be rendered by the follow-up content request.
    Data(serde_json::Value),
}

/// Extracts the resource name from a backing object.
pub trait NameHandler: Send + Sync {
    fn name(&self, source: &BackingObject) -> String;
}

/// Extracts a human-facing display name. `None` falls back to the name.
pub trait DisplayNameHandler: Send + Sync {
    fn display_name(&self, source: &BackingObject) -> Option<String>;
}

/// Extracts the globally unique id locks and sync logic key on.
pub trait UniqueIdHandler: Send + Sync {
    fn unique_id(&self, source: &BackingObject) -> String;
}

/// Extracts a timestamp (registered separately for created and modified).
pub trait TimestampHandler: Send + Sync {
    fn timestamp(&self, source: &BackingObject) -> Option<SystemTime>;
}

/// Extracts the content type served for a backing object.
pub trait ContentTypeHandler: Send + Sync {
    fn content_type(&self, source: &BackingObject) -> Option<String>;
}

/// Extracts the content length, when one is knowable up front.
pub trait ContentLengthHandler: Send + Sync {
    fn content_length(&self, source: &BackingObject) -> Option<u64>;
}

/// Serves resource content.
pub trait GetHandler: Send + Sync {
    /// Write the (optionally ranged) content to `out`.
    fn send_content(
        &self,
        source: &BackingObject,
        out: &mut dyn Write,
        range: Option<ByteRange>,
        params: &HashMap<String, String>,
        content_type: Option<&str>,
    ) -> DavResult<()>;

    /// Cache duration declared for this backing type.
    fn cache_directive(&self) -> CacheDirective {
        CacheDirective::Unspecified
    }

    /// True when the handler renders a templated view rather than raw
    /// content; templated views are never cacheable.
    fn is_templated(&self) -> bool {
        false
    }
}

/// Processes a form submission against a backing object.
pub trait PostHandler: Send + Sync {
    fn process(
        &self,
        source: &BackingObject,
        request: &Request,
        params: &HashMap<String, String>,
        files: &HashMap<String, FileItem>,
    ) -> DavResult<PostResult>;
}

/// Deletes the backing object from its store.
pub trait DeleteHandler: Send + Sync {
    fn delete(&self, source: &BackingObject) -> DavResult<()>;
}

/// Moves the backing object into a destination container, renaming it.
pub trait MoveHandler: Send + Sync {
    fn move_to(
        &self,
        source: &BackingObject,
        dest: &BackingObject,
        new_name: &str,
    ) -> DavResult<()>;
}

/// Copies the backing object into a destination container under a new name.
pub trait CopyHandler: Send + Sync {
    fn copy_to(
        &self,
        source: &BackingObject,
        dest: &BackingObject,
        new_name: &str,
    ) -> DavResult<()>;
}

/// Generic max-age lookup, consulted when the Get handler declares nothing.
pub trait MaxAgeHandler: Send + Sync {
    fn max_age(&self, source: &BackingObject, auth: Option<&AuthContext>) -> Option<u64>;
}

/// Verifies credentials against a principal backing object.
///
/// `None` means "cannot decide for this object" and falls through to the
/// security manager; `Some(false)` is a final failure.
pub trait AuthenticateHandler: Send + Sync {
    fn check_password(&self, principal: &BackingObject, password: &str) -> Option<bool>;

    fn check_digest(&self, principal: &BackingObject, digest: &DigestResponse) -> Option<bool>;
}

/// Computes privilege sets for access-control decisions.
pub trait AclHandler: Send + Sync {
    /// The privileges available to `principal` on `source`. `None` means
    /// the ACL model intentionally does not apply to this resource, which
    /// routes the decision to the fallback security manager.
    fn available_privileges(
        &self,
        principal: Option<&Principal>,
        source: &BackingObject,
        method: Option<crate::auth::Method>,
        auth: Option<&AuthContext>,
    ) -> Option<PrivilegeSet>;

    /// The privilege required to run `method` against `source`; `None`
    /// means the method needs no privilege on this resource.
    fn required_privilege(
        &self,
        source: &BackingObject,
        method: crate::auth::Method,
        request: &Request,
    ) -> Option<Privilege>;
}

/// Enumerates the child backing objects of a container.
pub trait ChildrenHandler: Send + Sync {
    fn children(&self, source: &BackingObject) -> DavResult<Vec<BackingObject>>;
}

/// A registered handler, tagged by the capability it implements.
#[derive(Clone)]
pub enum Handler {
    Name(Arc<dyn NameHandler>),
    DisplayName(Arc<dyn DisplayNameHandler>),
    UniqueId(Arc<dyn UniqueIdHandler>),
    CreatedDate(Arc<dyn TimestampHandler>),
    ModifiedDate(Arc<dyn TimestampHandler>),
    ContentType(Arc<dyn ContentTypeHandler>),
    ContentLength(Arc<dyn ContentLengthHandler>),
    Get(Arc<dyn GetHandler>),
    Post(Arc<dyn PostHandler>),
    Delete(Arc<dyn DeleteHandler>),
    Move(Arc<dyn MoveHandler>),
    Copy(Arc<dyn CopyHandler>),
    MaxAge(Arc<dyn MaxAgeHandler>),
    Authenticate(Arc<dyn AuthenticateHandler>),
    AccessControlList(Arc<dyn AclHandler>),
    Children(Arc<dyn ChildrenHandler>),
}

impl Handler {
    /// The capability this handler implements.
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Handler::Name(_) => CapabilityKind::Name,
            Handler::DisplayName(_) => CapabilityKind::DisplayName,
            Handler::UniqueId(_) => CapabilityKind::UniqueId,
            Handler::CreatedDate(_) => CapabilityKind::CreatedDate,
            Handler::ModifiedDate(_) => CapabilityKind::ModifiedDate,
            Handler::ContentType(_) => CapabilityKind::ContentType,
            Handler::ContentLength(_) => CapabilityKind::ContentLength,
            Handler::Get(_) => CapabilityKind::Get,
            Handler::Post(_) => CapabilityKind::Post,
            Handler::Delete(_) => CapabilityKind::Delete,
            Handler::Move(_) => CapabilityKind::Move,
            Handler::Copy(_) => CapabilityKind::Copy,
            Handler::MaxAge(_) => CapabilityKind::MaxAge,
            Handler::Authenticate(_) => CapabilityKind::Authenticate,
            Handler::AccessControlList(_) => CapabilityKind::AccessControlList,
            Handler::Children(_) => CapabilityKind::Children,
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Handler").field(&self.kind()).finish()
    }
}
