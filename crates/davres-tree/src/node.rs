//! Resource nodes: the adapters exposing backing objects to the protocol
//! layer.
//!
//! A node wraps one backing object plus a reference to its parent
//! collection and delegates every protocol-facing operation to the
//! capability registry. Nodes are created per request (or per resolution)
//! and never cached across requests; the only request-local mutable state
//! is the name override used during create-then-rename flows and the
//! cached form-processing payload.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::warn;

use davres_core::auth::{AuthContext, DigestResponse, Identity, Method, Request};
use davres_core::backing::{BackingObject, TypeInfo};
use davres_core::capability::{ByteRange, CacheDirective, FileItem, PostResult};
use davres_core::error::{DavError, DavResult};
use davres_core::lock::{LockInfo, LockTimeout, LockToken};
use davres_core::privilege::{Privilege, PrivilegeSet};

use crate::factory::ResourceFactory;

/// Access-control entries, as exchanged through the (unimplemented) ACL
/// pass-through surface.
pub type AclEntries = Vec<(davres_core::auth::Principal, PrivilegeSet)>;

/// Whether a node is a plain resource or a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Item,
    Collection,
}

/// A resolved node: either a plain resource or a collection.
#[derive(Debug, Clone)]
pub enum Node {
    Item(Arc<ResourceNode>),
    Collection(Arc<CollectionNode>),
}

impl Node {
    /// The underlying resource view, collection or not.
    pub fn resource(&self) -> &ResourceNode {
        match self {
            Node::Item(node) => node,
            Node::Collection(collection) => &collection.node,
        }
    }

    pub fn as_collection(&self) -> Option<&Arc<CollectionNode>> {
        match self {
            Node::Item(_) => None,
            Node::Collection(collection) => Some(collection),
        }
    }

    pub fn name(&self) -> String {
        self.resource().name()
    }

    pub fn href(&self) -> String {
        self.resource().href()
    }
}

/// The adapter wrapping one backing object.
///
/// Invariant: the backing object is always present; a node with no parent
/// is the tree root.
pub struct ResourceNode {
    pub(crate) factory: ResourceFactory,
    pub(crate) source: BackingObject,
    pub(crate) type_info: Arc<TypeInfo>,
    pub(crate) parent: Option<Arc<CollectionNode>>,
    pub(crate) kind: NodeKind,
    /// Tags this node satisfies unconditionally, checked before the
    /// registry's declared-tag test (a calendar collection always matches
    /// `"calendar"`).
    pub(crate) intrinsic_tags: Vec<String>,
    /// Set only while the node represents an as-yet-unpersisted resource.
    name_override: Mutex<Option<String>>,
    /// Payload produced by form processing, served by the next content
    /// request instead of the Get handler.
    post_result: Mutex<Option<serde_json::Value>>,
}

impl ResourceNode {
    pub(crate) fn new(
        factory: ResourceFactory,
        source: BackingObject,
        type_info: Arc<TypeInfo>,
        parent: Option<Arc<CollectionNode>>,
        kind: NodeKind,
        intrinsic_tags: Vec<String>,
    ) -> Self {
        Self {
            factory,
            source,
            type_info,
            parent,
            kind,
            intrinsic_tags,
            name_override: Mutex::new(None),
            post_result: Mutex::new(None),
        }
    }

    /// The wrapped backing object.
    pub fn source(&self) -> &BackingObject {
        &self.source
    }

    pub fn type_id(&self) -> std::any::TypeId {
        self.source.type_id()
    }

    /// The registration record for the backing type.
    pub fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    /// Parent collection; `None` iff this node is the tree root.
    pub fn parent(&self) -> Option<&Arc<CollectionNode>> {
        self.parent.as_ref()
    }

    pub fn is_collection(&self) -> bool {
        self.kind == NodeKind::Collection
    }

    /// The resource name: the override while an unpersisted resource is in
    /// flight, the Name handler's value otherwise. Never fails; a missing
    /// Name handler was rejected at registry build.
    pub fn name(&self) -> String {
        if let Some(name) = self.name_override.lock().clone() {
            return name;
        }
        self.factory
            .registry()
            .name_handler(self.type_id())
            .expect("Name handler validated at registry build")
            .name(&self.source)
    }

    /// Set or clear the name override for an in-flight creation.
    pub fn set_name_override(&self, name: Option<String>) {
        *self.name_override.lock() = name;
    }

    pub fn name_override(&self) -> Option<String> {
        self.name_override.lock().clone()
    }

    /// Human-facing display name, falling back to the resource name.
    pub fn display_name(&self) -> String {
        self.factory
            .registry()
            .display_name_handler(self.type_id())
            .and_then(|h| h.display_name(&self.source))
            .unwrap_or_else(|| self.name())
    }

    /// The globally unique id locks key on. Never fails; a missing
    /// UniqueId handler was rejected at registry build.
    pub fn unique_id(&self) -> String {
        self.factory
            .registry()
            .unique_id_handler(self.type_id())
            .expect("UniqueId handler validated at registry build")
            .unique_id(&self.source)
    }

    pub fn created(&self) -> Option<std::time::SystemTime> {
        self.factory
            .registry()
            .created_date_handler(self.type_id())
            .and_then(|h| h.timestamp(&self.source))
    }

    pub fn modified(&self) -> Option<std::time::SystemTime> {
        self.factory
            .registry()
            .modified_date_handler(self.type_id())
            .and_then(|h| h.timestamp(&self.source))
    }

    /// The content type served to a client accepting `accepts`.
    /// Form-processing results are JSON, so a JSON-accepting client gets
    /// `application/json` regardless of the handler's answer.
    pub fn content_type(&self, accepts: Option<&str>) -> Option<String> {
        if accepts.is_some_and(|a| a.contains("application/json")) {
            return Some("application/json".to_string());
        }
        self.factory
            .registry()
            .content_type_handler(self.type_id())
            .and_then(|h| h.content_type(&self.source))
    }

    pub fn content_length(&self) -> Option<u64> {
        self.factory
            .registry()
            .content_length_handler(self.type_id())
            .and_then(|h| h.content_length(&self.source))
    }

    /// Cache lifetime in seconds, `None` meaning "caller applies the
    /// system default".
    ///
    /// Precedence: the Get handler's declared directive wins — a templated
    /// view is never cacheable, an explicit zero means "no caching" and
    /// suppresses the fallback too, an explicit positive duration is used
    /// as-is. Only an unspecified directive consults the generic MaxAge
    /// handler.
    pub fn max_age(&self, auth: Option<&AuthContext>) -> Option<u64> {
        if let Some(get) = self.factory.registry().get_handler(self.type_id()) {
            if get.is_templated() {
                return None;
            }
            match get.cache_directive() {
                CacheDirective::NoCache => return None,
                CacheDirective::MaxAge(secs) => return Some(secs),
                CacheDirective::Unspecified => {}
            }
        }
        self.factory
            .registry()
            .max_age_handler(self.type_id())
            .and_then(|h| h.max_age(&self.source, auth))
    }

    /// Stream resource content. A payload cached by form processing takes
    /// precedence over the Get handler.
    pub fn send_content(
        &self,
        out: &mut dyn Write,
        range: Option<ByteRange>,
        params: &HashMap<String, String>,
        content_type: Option<&str>,
    ) -> DavResult<()> {
        if let Some(payload) = self.post_result.lock().clone() {
            serde_json::to_writer(&mut *out, &payload)
                .map_err(|e| DavError::Io(std::io::Error::other(e)))?;
            return Ok(());
        }
        self.factory
            .registry()
            .get_handler(self.type_id())
            .ok_or(DavError::Unsupported("GET"))?
            .send_content(&self.source, out, range, params, content_type)
    }

    /// Process a form submission. A redirect target is returned; any other
    /// result is cached on the node and served by the next
    /// [`send_content`](Self::send_content).
    pub fn process_form(
        &self,
        request: &Request,
        params: &HashMap<String, String>,
        files: &HashMap<String, FileItem>,
    ) -> DavResult<Option<String>> {
        let handler = self
            .factory
            .registry()
            .post_handler(self.type_id())
            .ok_or(DavError::Unsupported("POST"))?;
        match handler.process(&self.source, request, params, files)? {
            PostResult::Redirect(target) => Ok(Some(target)),
            PostResult::Data(payload) => {
                *self.post_result.lock() = Some(payload);
                Ok(None)
            }
        }
    }

    /// Delete the backing object from its store.
    pub fn delete(&self) -> DavResult<()> {
        self.factory
            .registry()
            .delete_handler(self.type_id())
            .ok_or(DavError::Unsupported("DELETE"))?
            .delete(&self.source)
    }

    /// Move the backing object into `dest` under `new_name`. Any pending
    /// name override is cleared first so an in-flight rename does not leak
    /// into the new location.
    pub fn move_to(&self, dest: &CollectionNode, new_name: &str) -> DavResult<()> {
        self.set_name_override(None);
        self.factory
            .registry()
            .move_handler(self.type_id())
            .ok_or(DavError::Unsupported("MOVE"))?
            .move_to(&self.source, dest.source(), new_name)
    }

    /// Copy the backing object into `dest` under `new_name`.
    pub fn copy_to(&self, dest: &CollectionNode, new_name: &str) -> DavResult<()> {
        self.factory
            .registry()
            .copy_handler(self.type_id())
            .ok_or(DavError::Unsupported("COPY"))?
            .copy_to(&self.source, dest.source(), new_name)
    }

    /// The node's href, computed on every call (name and parent can change
    /// between calls). The root is `"/"`; collections get a trailing `/`.
    pub fn href(&self) -> String {
        match &self.parent {
            None => "/".to_string(),
            Some(parent) => {
                let mut href = format!("{}{}", parent.href(), self.name());
                if self.kind == NodeKind::Collection {
                    href.push('/');
                }
                href
            }
        }
    }

    /// Href of the first ancestor (this node excluded) that is a
    /// principal-capable node, or `None` when no such ancestor exists.
    pub fn principal_url(&self) -> Option<String> {
        let mut current = self.parent.clone();
        while let Some(collection) = current {
            if collection.is("principal") {
                return Some(collection.href());
            }
            current = collection.node.parent.clone();
        }
        None
    }

    /// Case-insensitive type-tag test: intrinsic tags first, then the
    /// backing type's simple name and declared tags.
    pub fn is(&self, tag: &str) -> bool {
        self.intrinsic_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
            || self.type_info.matches_tag(tag)
    }

    /// Whether `method` can run against this resource. PROPFIND is always
    /// compatible.
    pub fn is_compatible(&self, method: Method) -> bool {
        if method == Method::Propfind {
            return true;
        }
        self.factory.registry().is_compatible(self.type_id(), method)
    }

    /// Authenticate a user/password pair: the principal directory and the
    /// Authenticate handler decide first; the security manager is the
    /// fallback for accounts the directory does not know.
    pub fn authenticate(&self, user: &str, password: &str) -> Option<Identity> {
        if let Some(entry) = self.factory.principals().find_principal(user) {
            let handler = self.factory.registry().authenticate_handler(entry.source.type_id());
            if let Some(handler) = handler {
                match handler.check_password(&entry.source, password) {
                    Some(true) => return Some(Identity::Principal(entry.principal)),
                    Some(false) => return None,
                    None => {}
                }
            }
        }
        self.factory.security().authenticate(user, password)
    }

    /// Digest-authentication variant of [`authenticate`](Self::authenticate).
    pub fn authenticate_digest(&self, digest: &DigestResponse) -> Option<Identity> {
        if let Some(entry) = self.factory.principals().find_principal(&digest.user) {
            let handler = self.factory.registry().authenticate_handler(entry.source.type_id());
            if let Some(handler) = handler {
                match handler.check_digest(&entry.source, digest) {
                    Some(true) => return Some(Identity::Principal(entry.principal)),
                    Some(false) => return None,
                    None => {}
                }
            }
        }
        self.factory.security().authenticate_digest(digest)
    }

    /// Whether the acting identity may run `method` here. ACL first,
    /// security manager as fallback; see
    /// [`AuthorizationEngine`](crate::authz::AuthorizationEngine).
    pub fn authorize(&self, request: &Request, method: Method, auth: Option<&AuthContext>) -> bool {
        self.factory.authz().authorize(self, request, method, auth)
    }

    /// The acting identity's available privileges here, never a
    /// null-equivalent.
    pub fn privileges(&self, auth: Option<&AuthContext>) -> Vec<Privilege> {
        self.factory.authz().privileges(self, auth)
    }

    /// Read the resource's access-control list. Unimplemented pass-through
    /// kept for contract compatibility: logs a warning and reports the
    /// list as absent.
    pub fn access_control_list(&self) -> Option<AclEntries> {
        warn!(href = %self.href(), "access_control_list - not implemented");
        None
    }

    /// Write the resource's access-control list. Unimplemented
    /// pass-through; deliberately a no-op.
    pub fn set_access_control_list(&self, _entries: AclEntries) {}

    /// Hrefs of the principal collections, for principal-property
    /// responses.
    pub fn principal_collection_hrefs(&self) -> Vec<String> {
        self.factory.principals().collection_hrefs()
    }

    /// The authentication realm for a host.
    pub fn realm(&self, host: Option<&str>) -> String {
        self.factory.security().realm(host)
    }

    /// Whether digest challenges may be issued.
    pub fn is_digest_allowed(&self) -> bool {
        self.factory.security().is_digest_allowed()
    }

    /// Take a lock on this resource.
    pub fn lock(&self, timeout: LockTimeout, info: LockInfo) -> DavResult<LockToken> {
        self.factory.locks().lock(&self.unique_id(), timeout, info)
    }

    /// Extend this resource's current lock.
    pub fn refresh_lock(&self, token_id: &str) -> DavResult<LockToken> {
        self.factory.locks().refresh(&self.unique_id(), token_id)
    }

    /// Release this resource's current lock.
    pub fn unlock(&self, token_id: &str) -> DavResult<()> {
        self.factory.locks().unlock(&self.unique_id(), token_id)
    }

    /// The live lock on this resource, if any.
    pub fn current_lock(&self) -> Option<LockToken> {
        self.factory.locks().current_lock(&self.unique_id())
    }
}

impl std::fmt::Debug for ResourceNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceNode")
            .field("type", &self.type_info.simple_name())
            .field("kind", &self.kind)
            .field("root", &self.parent.is_none())
            .finish_non_exhaustive()
    }
}

/// A resource node that is also a container of child nodes.
///
/// Children are enumerated on demand through the Children capability and
/// never stored, so the parent chain stays acyclic. The node keeps a weak
/// handle to its own `Arc` so freshly built children can point back at it.
#[derive(Debug)]
pub struct CollectionNode {
    pub(crate) node: ResourceNode,
    self_ref: Weak<CollectionNode>,
}

impl CollectionNode {
    pub(crate) fn new(node: ResourceNode) -> Arc<Self> {
        debug_assert_eq!(node.kind, NodeKind::Collection);
        Arc::new_cyclic(|weak| Self { node, self_ref: weak.clone() })
    }

    fn self_arc(&self) -> Arc<CollectionNode> {
        self.self_ref.upgrade().expect("collection nodes are always built behind an Arc")
    }

    /// Enumerate the child nodes.
    pub fn children(&self) -> DavResult<Vec<Node>> {
        let handler = self
            .node
            .factory
            .registry()
            .children_handler(self.node.type_id())
            .ok_or(DavError::Unsupported("child enumeration"))?;
        let sources = handler.children(&self.node.source)?;
        let me = self.self_arc();
        sources
            .into_iter()
            .map(|source| self.node.factory.node(source, &me))
            .collect()
    }

    /// Find a direct child by name.
    pub fn child(&self, name: &str) -> DavResult<Option<Node>> {
        Ok(self.children()?.into_iter().find(|child| child.name() == name))
    }
}

impl std::ops::Deref for CollectionNode {
    type Target = ResourceNode;

    fn deref(&self) -> &ResourceNode {
        &self.node
    }
}
