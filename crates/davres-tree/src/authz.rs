//! The authorization engine: ACL first, security manager as fallback.
//!
//! The precedence is the core authorization contract and is preserved
//! exactly:
//!
//! 1. An externally-authenticated identity the ACL subsystem does not
//!    understand skips ACL evaluation entirely and goes straight to the
//!    fallback.
//! 2. Otherwise (anonymous, or a recognized principal) the ACL handler
//!    computes the available privilege set. An absent set means the ACL
//!    model opted out for this resource — fall through to the fallback. A
//!    present set (possibly empty) decides: no required privilege allows,
//!    otherwise the required privilege must be contained in or implied by
//!    the set, and the fallback is NOT consulted.
//! 3. The fallback `SecurityManager::authorise` verdict is final.

use std::sync::Arc;

use tracing::{info, trace, warn};

use davres_core::auth::{AuthContext, Identity, Method, Request};
use davres_core::privilege::Privilege;
use davres_core::registry::CapabilityRegistry;

use crate::node::ResourceNode;
use crate::security::SecurityManager;

/// Resolves, per request, whether an identity may perform an operation on
/// a resource. Performs no mutation; safe to share across requests.
#[derive(Clone)]
pub struct AuthorizationEngine {
    registry: Arc<CapabilityRegistry>,
    security: Arc<dyn SecurityManager>,
}

impl AuthorizationEngine {
    pub fn new(registry: Arc<CapabilityRegistry>, security: Arc<dyn SecurityManager>) -> Self {
        Self { registry, security }
    }

    /// Whether the acting identity may run `method` against `node`.
    pub fn authorize(
        &self,
        node: &ResourceNode,
        request: &Request,
        method: Method,
        auth: Option<&AuthContext>,
    ) -> bool {
        let identity = auth.and_then(|a| a.identity.as_ref());

        if let Some(Identity::External(name)) = identity {
            trace!(identity = %name, "externally-authenticated identity, skipping ACL");
            return self.security.authorise(request, method, auth, node);
        }
        let principal = identity.and_then(Identity::principal);

        if let Some(acl) = self.registry.acl_handler(node.type_id()) {
            if let Some(available) =
                acl.available_privileges(principal, node.source(), Some(method), auth)
            {
                let Some(required) = acl.required_privilege(node.source(), method, request)
                else {
                    return true;
                };
                let allowed = available.implies(required);
                if !allowed {
                    info!(
                        principal = principal.map_or("anonymous", |p| p.name.as_str()),
                        required = ?required,
                        available = available.len(),
                        "authorisation declined"
                    );
                }
                return allowed;
            }
            // Absent set: the ACL model opted out for this resource.
        }

        self.security.authorise(request, method, auth, node)
    }

    /// The full available privilege set for the acting identity on `node`,
    /// with no method filter. Never a null-equivalent: absent or empty ACL
    /// results yield an empty list.
    pub fn privileges(&self, node: &ResourceNode, auth: Option<&AuthContext>) -> Vec<Privilege> {
        let principal = auth
            .and_then(|a| a.identity.as_ref())
            .and_then(Identity::principal);

        let set = self
            .registry
            .acl_handler(node.type_id())
            .and_then(|acl| acl.available_privileges(principal, node.source(), None, auth));

        match set {
            Some(set) if !set.is_empty() => set.to_vec(),
            _ => {
                warn!(
                    principal = principal.map_or("anonymous", |p| p.name.as_str()),
                    "empty privilege set"
                );
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationEngine").finish_non_exhaustive()
    }
}
