//! Boundary types handed in by the transport layer.
//!
//! The HTTP transport owns parsing; the core only sees the distilled
//! request summary, the protocol method, and whatever identity the
//! authentication layer attached to the request.

/// Protocol methods the core distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Options,
    Propfind,
    Proppatch,
    Report,
    Put,
    Post,
    Delete,
    Copy,
    Move,
    Mkcol,
    Lock,
    Unlock,
    Acl,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Propfind => "PROPFIND",
            Method::Proppatch => "PROPPATCH",
            Method::Report => "REPORT",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Copy => "COPY",
            Method::Move => "MOVE",
            Method::Mkcol => "MKCOL",
            Method::Lock => "LOCK",
            Method::Unlock => "UNLOCK",
            Method::Acl => "ACL",
        }
    }

    /// True for methods that only read resource state.
    pub fn is_read(self) -> bool {
        matches!(
            self,
            Method::Get | Method::Head | Method::Options | Method::Propfind | Method::Report
        )
    }
}

/// Distilled view of an inbound request.
///
/// The method is carried here and passed separately through the
/// authorization path; both views refer to the same request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// Host header, when the transport saw one.
    pub host: Option<String>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), host: None }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}

/// A recognized principal: a user (or group) that resolves to a resource in
/// this tree, addressable by href.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    pub href: String,
}

impl Principal {
    pub fn new(name: impl Into<String>, href: impl Into<String>) -> Self {
        Self { name: name.into(), href: href.into() }
    }
}

/// The identity the authentication layer attached to a request.
#[derive(Debug, Clone)]
pub enum Identity {
    /// A principal the ACL subsystem understands.
    Principal(Principal),
    /// An externally-authenticated identity the ACL subsystem does not
    /// understand; ACL evaluation is skipped for these.
    External(String),
}

impl Identity {
    /// The recognized principal, if this identity is one.
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Identity::Principal(p) => Some(p),
            Identity::External(_) => None,
        }
    }

    /// Display name for logging.
    pub fn name(&self) -> &str {
        match self {
            Identity::Principal(p) => &p.name,
            Identity::External(name) => name,
        }
    }
}

/// Authentication state for one request. Absent identity means anonymous.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub identity: Option<Identity>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn principal(principal: Principal) -> Self {
        Self { identity: Some(Identity::Principal(principal)) }
    }

    pub fn external(name: impl Into<String>) -> Self {
        Self { identity: Some(Identity::External(name.into())) }
    }
}

/// Fields of a digest-authentication challenge response.
///
/// The cryptographic verification itself belongs to the authentication
/// collaborators; the core only routes these fields.
#[derive(Debug, Clone)]
pub struct DigestResponse {
    pub user: String,
    pub realm: String,
    pub nonce: String,
    pub uri: String,
    pub response: String,
    pub method: String,
    pub qop: Option<String>,
    pub nonce_count: Option<String>,
    pub cnonce: Option<String>,
}
