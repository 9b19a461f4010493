//! The resource factory: explicit wiring for the adaptation layer.
//!
//! The factory holds the capability registry, the security manager, the
//! lock manager and the principal directory as constructor dependencies
//! and instantiates nodes per request. Whether a backing object becomes a
//! plain resource or a collection is decided by the presence of a Children
//! handler for its type.

use std::sync::Arc;

use davres_core::backing::{BackingObject, TypeInfo};
use davres_core::error::{DavError, DavResult};
use davres_core::registry::CapabilityRegistry;

use crate::authz::AuthorizationEngine;
use crate::lock::LockManager;
use crate::node::{CollectionNode, Node, NodeKind, ResourceNode};
use crate::security::{PrincipalDirectory, SecurityManager};

/// Builds resource nodes over a registry and its collaborators.
///
/// Cheap to clone; every node holds one.
#[derive(Clone)]
pub struct ResourceFactory {
    registry: Arc<CapabilityRegistry>,
    security: Arc<dyn SecurityManager>,
    locks: Arc<dyn LockManager>,
    principals: Arc<dyn PrincipalDirectory>,
    authz: AuthorizationEngine,
}

impl ResourceFactory {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        security: Arc<dyn SecurityManager>,
        locks: Arc<dyn LockManager>,
        principals: Arc<dyn PrincipalDirectory>,
    ) -> Self {
        let authz = AuthorizationEngine::new(Arc::clone(&registry), Arc::clone(&security));
        Self { registry, security, locks, principals, authz }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn security(&self) -> &dyn SecurityManager {
        self.security.as_ref()
    }

    pub fn locks(&self) -> &dyn LockManager {
        self.locks.as_ref()
    }

    pub fn principals(&self) -> &dyn PrincipalDirectory {
        self.principals.as_ref()
    }

    pub fn authz(&self) -> &AuthorizationEngine {
        &self.authz
    }

    /// Build the tree root. The root must be a collection.
    pub fn root(&self, source: BackingObject) -> DavResult<Arc<CollectionNode>> {
        self.collection(source, None, Vec::new())
    }

    /// Build a child node under `parent`, deciding item-vs-collection from
    /// the Children capability.
    pub fn node(&self, source: BackingObject, parent: &Arc<CollectionNode>) -> DavResult<Node> {
        let info = self.type_info_for(&source)?;
        if self.registry.children_handler(source.type_id()).is_some() {
            let node = ResourceNode::new(
                self.clone(),
                source,
                info,
                Some(Arc::clone(parent)),
                NodeKind::Collection,
                Vec::new(),
            );
            Ok(Node::Collection(CollectionNode::new(node)))
        } else {
            let node = ResourceNode::new(
                self.clone(),
                source,
                info,
                Some(Arc::clone(parent)),
                NodeKind::Item,
                Vec::new(),
            );
            Ok(Node::Item(Arc::new(node)))
        }
    }

    /// Build a calendar collection: a collection that unconditionally
    /// satisfies the `"calendar"` type tag.
    pub fn calendar(
        &self,
        source: BackingObject,
        parent: &Arc<CollectionNode>,
    ) -> DavResult<Arc<CollectionNode>> {
        self.collection(source, Some(Arc::clone(parent)), vec!["calendar".to_string()])
    }

    /// Build a collection with extra intrinsic type tags.
    pub fn collection_with_tags(
        &self,
        source: BackingObject,
        parent: &Arc<CollectionNode>,
        tags: &[&str],
    ) -> DavResult<Arc<CollectionNode>> {
        self.collection(
            source,
            Some(Arc::clone(parent)),
            tags.iter().map(|t| (*t).to_string()).collect(),
        )
    }

    fn collection(
        &self,
        source: BackingObject,
        parent: Option<Arc<CollectionNode>>,
        intrinsic_tags: Vec<String>,
    ) -> DavResult<Arc<CollectionNode>> {
        let info = self.type_info_for(&source)?;
        if self.registry.children_handler(source.type_id()).is_none() {
            return Err(DavError::Config(format!(
                "backing type {} has no Children handler and cannot be a collection",
                info.simple_name()
            )));
        }
        let node = ResourceNode::new(
            self.clone(),
            source,
            info,
            parent,
            NodeKind::Collection,
            intrinsic_tags,
        );
        Ok(CollectionNode::new(node))
    }

    fn type_info_for(&self, source: &BackingObject) -> DavResult<Arc<TypeInfo>> {
        self.registry.type_info(source.type_id()).cloned().ok_or_else(|| {
            DavError::Config(format!("backing type {:?} is not registered", source.type_id()))
        })
    }
}

impl std::fmt::Debug for ResourceFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceFactory")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
