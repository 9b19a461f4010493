//! The adaptation layer of the davres core: resource nodes, authorization
//! and locking over `davres-core` capability contracts.
//!
//! An inbound protocol request resolves (externally) to a
//! [`ResourceNode`](node::ResourceNode), which consults the capability
//! registry for behavior, the [`AuthorizationEngine`](authz::AuthorizationEngine)
//! for permission and the [`LockManager`](lock::LockManager) for lock
//! state before executing the operation against the backing object.
//!
//! - [`factory`]: explicit wiring — registry, security manager, lock
//!   manager and principal directory are constructor dependencies, and
//!   nodes are instantiated per request.
//! - [`node`]: `ResourceNode` / `CollectionNode`, href and type-tag logic,
//!   delegation of every protocol-facing operation.
//! - [`authz`]: ACL-first authorization with the security-manager
//!   fallback.
//! - [`security`]: the `SecurityManager` and `PrincipalDirectory`
//!   collaborator traits.
//! - [`lock`]: the lock table, one live token per resource identity.

pub mod authz;
pub mod factory;
pub mod lock;
pub mod node;
pub mod security;

pub use authz::AuthorizationEngine;
pub use factory::ResourceFactory;
pub use lock::{LockConfig, LockManager, MemLockManager};
pub use node::{AclEntries, CollectionNode, Node, NodeKind, ResourceNode};
pub use security::{PrincipalDirectory, PrincipalEntry, SecurityManager};
