//! Shared fixture for the integration suites: a tiny in-memory document
//! store adapted as a resource tree.

#![allow(dead_code)] // Each suite uses a different slice of the fixture.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use davres_core::auth::{AuthContext, DigestResponse, Identity, Method, Principal, Request};
use davres_core::backing::BackingObject;
use davres_core::capability::{
    AclHandler, AuthenticateHandler, ByteRange, CacheDirective, ChildrenHandler,
    ContentLengthHandler, ContentTypeHandler, CopyHandler, DeleteHandler, FileItem, GetHandler,
    Handler, MaxAgeHandler, MoveHandler, NameHandler, PostHandler, PostResult, TimestampHandler,
    UniqueIdHandler,
};
use davres_core::error::{DavError, DavResult};
use davres_core::privilege::{Privilege, PrivilegeSet};
use davres_core::registry::{RegistryBuilder, TypeMatch};
use davres_tree::factory::ResourceFactory;
use davres_tree::lock::{LockConfig, MemLockManager};
use davres_tree::node::{CollectionNode, ResourceNode};
use davres_tree::security::{PrincipalDirectory, PrincipalEntry, SecurityManager};

// ============================================================================
// Backing domain
// ============================================================================

pub struct Folder {
    pub name: String,
    pub children: Vec<BackingObject>,
}

impl Folder {
    pub fn backing(name: &str, children: Vec<BackingObject>) -> BackingObject {
        BackingObject::new(Self { name: name.to_string(), children })
    }
}

/// A per-account home collection; registered with the `"principal"` tag.
pub struct AccountHome {
    pub name: String,
    pub children: Vec<BackingObject>,
}

impl AccountHome {
    pub fn backing(name: &str, children: Vec<BackingObject>) -> BackingObject {
        BackingObject::new(Self { name: name.to_string(), children })
    }
}

pub struct Document {
    pub name: String,
    pub content: Vec<u8>,
    pub media_type: String,
}

impl Document {
    pub fn backing(name: &str, content: &[u8]) -> BackingObject {
        BackingObject::new(Self {
            name: name.to_string(),
            content: content.to_vec(),
            media_type: "text/plain".to_string(),
        })
    }
}

/// A user account; registered with the `"principal"` tag.
pub struct Account {
    pub name: String,
    pub password: String,
}

impl Account {
    pub fn backing(name: &str, password: &str) -> BackingObject {
        BackingObject::new(Self { name: name.to_string(), password: password.to_string() })
    }
}

// ============================================================================
// Capability handlers
// ============================================================================

pub struct EntryName;

impl NameHandler for EntryName {
    fn name(&self, source: &BackingObject) -> String {
        if let Some(f) = source.downcast_ref::<Folder>() {
            f.name.clone()
        } else if let Some(h) = source.downcast_ref::<AccountHome>() {
            h.name.clone()
        } else if let Some(d) = source.downcast_ref::<Document>() {
            d.name.clone()
        } else if let Some(a) = source.downcast_ref::<Account>() {
            a.name.clone()
        } else {
            String::new()
        }
    }
}

pub struct EntryId;

impl UniqueIdHandler for EntryId {
    fn unique_id(&self, source: &BackingObject) -> String {
        if let Some(f) = source.downcast_ref::<Folder>() {
            format!("folder:{}", f.name)
        } else if let Some(h) = source.downcast_ref::<AccountHome>() {
            format!("home:{}", h.name)
        } else if let Some(d) = source.downcast_ref::<Document>() {
            format!("doc:{}", d.name)
        } else if let Some(a) = source.downcast_ref::<Account>() {
            format!("acct:{}", a.name)
        } else {
            String::new()
        }
    }
}

pub struct DirChildren;

impl ChildrenHandler for DirChildren {
    fn children(&self, source: &BackingObject) -> DavResult<Vec<BackingObject>> {
        if let Some(f) = source.downcast_ref::<Folder>() {
            Ok(f.children.clone())
        } else if let Some(h) = source.downcast_ref::<AccountHome>() {
            Ok(h.children.clone())
        } else {
            Err(DavError::Unsupported("child enumeration"))
        }
    }
}

/// Serves document bytes; cache behavior is configurable per test.
pub struct DocumentGet {
    pub directive: CacheDirective,
    pub templated: bool,
}

impl DocumentGet {
    pub fn plain() -> Self {
        Self { directive: CacheDirective::Unspecified, templated: false }
    }
}

impl GetHandler for DocumentGet {
    fn send_content(
        &self,
        source: &BackingObject,
        out: &mut dyn Write,
        _range: Option<ByteRange>,
        _params: &HashMap<String, String>,
        _content_type: Option<&str>,
    ) -> DavResult<()> {
        let doc = source
            .downcast_ref::<Document>()
            .ok_or_else(|| DavError::NotFound("not a document".to_string()))?;
        out.write_all(&doc.content)?;
        Ok(())
    }

    fn cache_directive(&self) -> CacheDirective {
        self.directive
    }

    fn is_templated(&self) -> bool {
        self.templated
    }
}

pub struct DocumentContentType;

impl ContentTypeHandler for DocumentContentType {
    fn content_type(&self, source: &BackingObject) -> Option<String> {
        source.downcast_ref::<Document>().map(|d| d.media_type.clone())
    }
}

pub struct DocumentContentLength;

impl ContentLengthHandler for DocumentContentLength {
    fn content_length(&self, source: &BackingObject) -> Option<u64> {
        source.downcast_ref::<Document>().map(|d| d.content.len() as u64)
    }
}

/// Fixed timestamp for created/modified lookups.
pub struct FixedTimestamp(pub std::time::SystemTime);

impl TimestampHandler for FixedTimestamp {
    fn timestamp(&self, _source: &BackingObject) -> Option<std::time::SystemTime> {
        Some(self.0)
    }
}

/// Generic max-age fallback answering a fixed value.
pub struct FixedMaxAge(pub u64);

impl MaxAgeHandler for FixedMaxAge {
    fn max_age(&self, _source: &BackingObject, _auth: Option<&AuthContext>) -> Option<u64> {
        Some(self.0)
    }
}

/// Delete handler counting invocations.
#[derive(Default)]
pub struct CountingDelete {
    pub calls: AtomicUsize,
}

impl DeleteHandler for CountingDelete {
    fn delete(&self, _source: &BackingObject) -> DavResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Delete handler that always signals a resource-state conflict.
pub struct ConflictingDelete;

impl DeleteHandler for ConflictingDelete {
    fn delete(&self, _source: &BackingObject) -> DavResult<()> {
        Err(DavError::Conflict("resource has children".to_string()))
    }
}

/// Move/copy handler recording the destination names it saw.
#[derive(Default)]
pub struct RecordingTransfer {
    pub moves: parking_lot::Mutex<Vec<String>>,
    pub copies: parking_lot::Mutex<Vec<String>>,
}

impl MoveHandler for RecordingTransfer {
    fn move_to(
        &self,
        _source: &BackingObject,
        _dest: &BackingObject,
        new_name: &str,
    ) -> DavResult<()> {
        self.moves.lock().push(new_name.to_string());
        Ok(())
    }
}

impl CopyHandler for RecordingTransfer {
    fn copy_to(
        &self,
        _source: &BackingObject,
        _dest: &BackingObject,
        new_name: &str,
    ) -> DavResult<()> {
        self.copies.lock().push(new_name.to_string());
        Ok(())
    }
}

/// Post handler returning a redirect for `action=go`, a data payload
/// otherwise.
pub struct FormPost;

impl PostHandler for FormPost {
    fn process(
        &self,
        _source: &BackingObject,
        _request: &Request,
        params: &HashMap<String, String>,
        _files: &HashMap<String, FileItem>,
    ) -> DavResult<PostResult> {
        if params.get("action").map(String::as_str) == Some("go") {
            Ok(PostResult::Redirect("/done".to_string()))
        } else {
            Ok(PostResult::Data(serde_json::json!({ "accepted": true })))
        }
    }
}

/// Password check against the account's stored password. Digest responses
/// are accepted when they equal the stored password (the real digest
/// computation belongs to the transport).
pub struct PasswordCheck;

impl AuthenticateHandler for PasswordCheck {
    fn check_password(&self, principal: &BackingObject, password: &str) -> Option<bool> {
        principal.downcast_ref::<Account>().map(|a| a.password == password)
    }

    fn check_digest(&self, principal: &BackingObject, digest: &DigestResponse) -> Option<bool> {
        principal.downcast_ref::<Account>().map(|a| a.password == digest.response)
    }
}

/// ACL handler with a fixed answer, for precedence tests.
pub struct StaticAcl {
    pub available: Option<PrivilegeSet>,
    pub required: Option<Privilege>,
}

impl AclHandler for StaticAcl {
    fn available_privileges(
        &self,
        _principal: Option<&Principal>,
        _source: &BackingObject,
        _method: Option<Method>,
        _auth: Option<&AuthContext>,
    ) -> Option<PrivilegeSet> {
        self.available.clone()
    }

    fn required_privilege(
        &self,
        _source: &BackingObject,
        _method: Method,
        _request: &Request,
    ) -> Option<Privilege> {
        self.required
    }
}

// ============================================================================
// Collaborators
// ============================================================================

/// Security manager with a fixed verdict; counts authorise consultations
/// so tests can assert the short-circuit rules.
pub struct TestSecurityManager {
    pub allow: bool,
    pub authorise_calls: AtomicUsize,
}

impl TestSecurityManager {
    pub fn new(allow: bool) -> Self {
        Self { allow, authorise_calls: AtomicUsize::new(0) }
    }

    pub fn consultations(&self) -> usize {
        self.authorise_calls.load(Ordering::SeqCst)
    }
}

impl SecurityManager for TestSecurityManager {
    fn authenticate(&self, user: &str, password: &str) -> Option<Identity> {
        (user == "svc-backup" && password == "hunter2")
            .then(|| Identity::External("svc-backup".to_string()))
    }

    fn authenticate_digest(&self, digest: &DigestResponse) -> Option<Identity> {
        (digest.user == "svc-backup" && digest.response == "hunter2")
            .then(|| Identity::External("svc-backup".to_string()))
    }

    fn authorise(
        &self,
        _request: &Request,
        _method: Method,
        _auth: Option<&AuthContext>,
        _node: &ResourceNode,
    ) -> bool {
        self.authorise_calls.fetch_add(1, Ordering::SeqCst);
        self.allow
    }

    fn realm(&self, host: Option<&str>) -> String {
        format!("davres@{}", host.unwrap_or("localhost"))
    }
}

/// Principal directory backed by a fixed account map.
#[derive(Default)]
pub struct StaticPrincipals {
    pub entries: HashMap<String, PrincipalEntry>,
}

impl StaticPrincipals {
    /// Directory knowing a single account `alice` / `wonder`.
    pub fn with_alice() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            "alice".to_string(),
            PrincipalEntry {
                source: Account::backing("alice", "wonder"),
                principal: Principal::new("alice", "/users/alice/"),
            },
        );
        Self { entries }
    }
}

impl PrincipalDirectory for StaticPrincipals {
    fn find_principal(&self, name: &str) -> Option<PrincipalEntry> {
        self.entries.get(name).cloned()
    }

    fn collection_hrefs(&self) -> Vec<String> {
        vec!["/users/".to_string()]
    }
}

// ============================================================================
// Environment assembly
// ============================================================================

/// Registrations every suite starts from: the four backing types, naming,
/// ids, child enumeration and principal password checks.
pub fn base_registry() -> RegistryBuilder {
    RegistryBuilder::new()
        .register_type::<Folder>(&["collection"])
        .register_type::<AccountHome>(&["collection", "principal"])
        .register_type::<Document>(&[])
        .register_type::<Account>(&["principal"])
        .register(TypeMatch::Any, Handler::Name(Arc::new(EntryName)))
        .register(TypeMatch::Any, Handler::UniqueId(Arc::new(EntryId)))
        .register(TypeMatch::of::<Folder>(), Handler::Children(Arc::new(DirChildren)))
        .register(TypeMatch::of::<AccountHome>(), Handler::Children(Arc::new(DirChildren)))
        .register(TypeMatch::of::<Account>(), Handler::Authenticate(Arc::new(PasswordCheck)))
}

pub struct TestEnv {
    pub factory: ResourceFactory,
    pub security: Arc<TestSecurityManager>,
    pub locks: Arc<MemLockManager>,
}

impl TestEnv {
    /// Assemble a factory from a registry builder and a fallback verdict.
    pub fn new(builder: RegistryBuilder, allow: bool) -> Self {
        Self::with_lock_config(builder, allow, LockConfig::default())
    }

    pub fn with_lock_config(builder: RegistryBuilder, allow: bool, config: LockConfig) -> Self {
        let registry = Arc::new(builder.build().expect("fixture registry builds"));
        let security = Arc::new(TestSecurityManager::new(allow));
        let locks = Arc::new(MemLockManager::new(config));
        let factory = ResourceFactory::new(
            registry,
            Arc::clone(&security) as Arc<dyn SecurityManager>,
            Arc::clone(&locks) as Arc<dyn davres_tree::lock::LockManager>,
            Arc::new(StaticPrincipals::with_alice()),
        );
        Self { factory, security, locks }
    }

    /// A root collection over a folder with the given children.
    pub fn root(&self, children: Vec<BackingObject>) -> Arc<CollectionNode> {
        self.factory.root(Folder::backing("", children)).expect("root builds")
    }
}

/// Shorthand for a request whose details are irrelevant to the test.
pub fn request(method: Method) -> Request {
    Request::new(method, "/x")
}
