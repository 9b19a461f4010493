//! Pluggable security collaborators.
//!
//! Both collaborators are passed to the [`ResourceFactory`] explicitly;
//! there are no global singletons, so tests substitute them freely.
//!
//! [`ResourceFactory`]: crate::factory::ResourceFactory

use davres_core::auth::{AuthContext, DigestResponse, Identity, Method, Principal, Request};
use davres_core::backing::BackingObject;

use crate::node::ResourceNode;

/// The fallback security policy consulted when the ACL model does not
/// apply to a resource (or does not recognize the acting identity).
///
/// Its `authorise` verdict is final on that path.
pub trait SecurityManager: Send + Sync {
    /// Authenticate a user/password pair. `None` is a failure.
    fn authenticate(&self, user: &str, password: &str) -> Option<Identity>;

    /// Authenticate a digest challenge response. `None` is a failure.
    fn authenticate_digest(&self, digest: &DigestResponse) -> Option<Identity>;

    /// Generic authorization check for one operation on one resource.
    fn authorise(
        &self,
        request: &Request,
        method: Method,
        auth: Option<&AuthContext>,
        node: &ResourceNode,
    ) -> bool;

    /// The authentication realm presented for a host.
    fn realm(&self, host: Option<&str>) -> String;

    /// Whether digest authentication challenges may be issued.
    fn is_digest_allowed(&self) -> bool {
        true
    }
}

/// A recognized principal together with its backing object, as resolved by
/// the principal directory.
#[derive(Debug, Clone)]
pub struct PrincipalEntry {
    pub source: BackingObject,
    pub principal: Principal,
}

/// The recognized-user-directory collaborator: resolves account names to
/// principal resources and advertises the collections that hold them.
pub trait PrincipalDirectory: Send + Sync {
    /// Resolve an account name to a recognized principal, if the directory
    /// knows it.
    fn find_principal(&self, name: &str) -> Option<PrincipalEntry>;

    /// Hrefs of the principal collections, for principal-property
    /// responses.
    fn collection_hrefs(&self) -> Vec<String>;
}
