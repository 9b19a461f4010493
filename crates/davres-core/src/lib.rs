//! Capability contracts and dispatch for adapting domain objects to
//! WebDAV/CalDAV resources.
//!
//! This crate is the data boundary and dispatch half of the resource
//! adaptation core:
//!
//! - [`backing`]: the opaque [`BackingObject`](backing::BackingObject)
//!   wrapper and the per-type registration record with its declared
//!   protocol type tags.
//! - [`capability`]: one narrow handler trait per protocol behavior
//!   (naming, timestamps, content, delete/move/copy, authentication, ACL,
//!   child enumeration, ...).
//! - [`registry`]: the startup-built, immutable table binding each
//!   `(capability, backing type)` pair to its best-matching handler, with
//!   fail-fast validation of required capabilities.
//! - [`privilege`]: the RFC 3744-style privilege lattice used by
//!   authorization.
//! - [`auth`]: the thin request/identity types the transport hands in.
//! - [`lock`]: lock tokens, timeouts and scopes.
//! - [`error`]: the shared error taxonomy.
//!
//! The adaptation layer itself (resource nodes, the authorization engine,
//! the lock manager) lives in `davres-tree`, which builds on these
//! contracts.

pub mod auth;
pub mod backing;
pub mod capability;
pub mod error;
pub mod lock;
pub mod privilege;
pub mod registry;

pub use auth::{AuthContext, DigestResponse, Identity, Method, Principal, Request};
pub use backing::{BackingObject, TypeInfo};
pub use capability::{CacheDirective, CapabilityKind, Handler, PostResult};
pub use error::{DavError, DavResult};
pub use lock::{LockDepth, LockInfo, LockScope, LockTimeout, LockToken};
pub use privilege::{Privilege, PrivilegeSet};
pub use registry::{CapabilityRegistry, RegistryBuilder, TypeMatch};
