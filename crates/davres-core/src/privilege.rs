//! Privileges and privilege sets for access-control decisions.
//!
//! The lattice follows RFC 3744 aggregation: `All` contains every other
//! privilege, `Write` contains the four write sub-privileges. Implication is
//! recursive, so holding `All` satisfies a requirement for `WriteContent`.

use crate::auth::Method;

/// A named permission checked during authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Privilege {
    Read,
    ReadAcl,
    ReadCurrentUserPrivilege,
    Write,
    WriteProperties,
    WriteContent,
    Bind,
    Unbind,
    WriteAcl,
    Unlock,
    All,
}

impl Privilege {
    /// Every privilege, in lattice order.
    pub const VARIANTS: [Privilege; 11] = [
        Privilege::Read,
        Privilege::ReadAcl,
        Privilege::ReadCurrentUserPrivilege,
        Privilege::Write,
        Privilege::WriteProperties,
        Privilege::WriteContent,
        Privilege::Bind,
        Privilege::Unbind,
        Privilege::WriteAcl,
        Privilege::Unlock,
        Privilege::All,
    ];

    /// The privileges directly aggregated by this one.
    pub fn contained(self) -> &'static [Privilege] {
        match self {
            Privilege::All => &[
                Privilege::Read,
                Privilege::Write,
                Privilege::ReadAcl,
                Privilege::WriteAcl,
                Privilege::ReadCurrentUserPrivilege,
                Privilege::Unlock,
            ],
            Privilege::Write => &[
                Privilege::WriteProperties,
                Privilege::WriteContent,
                Privilege::Bind,
                Privilege::Unbind,
            ],
            _ => &[],
        }
    }

    /// True iff holding `self` satisfies a requirement for `required`.
    pub fn implies(self, required: Privilege) -> bool {
        self == required || self.contained().iter().any(|p| p.implies(required))
    }

    /// The privilege a method requires when an ACL handler does not say
    /// otherwise: read methods need `Read`, UNLOCK needs `Unlock`,
    /// everything else needs `Write`.
    pub fn default_required(method: Method) -> Privilege {
        if method.is_read() {
            Privilege::Read
        } else if method == Method::Unlock {
            Privilege::Unlock
        } else {
            Privilege::Write
        }
    }
}

/// A set of privileges granted to one principal on one resource.
///
/// Computed per authorization check and never cached across requests; ACLs
/// may change between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivilegeSet(Vec<Privilege>);

impl PrivilegeSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn of(privileges: &[Privilege]) -> Self {
        privileges.iter().copied().collect()
    }

    /// Insert, keeping the set free of duplicates.
    pub fn insert(&mut self, privilege: Privilege) {
        if !self.0.contains(&privilege) {
            self.0.push(privilege);
        }
    }

    /// True iff any member implies `required`.
    pub fn implies(&self, required: Privilege) -> bool {
        self.0.iter().any(|p| p.implies(required))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Privilege> + '_ {
        self.0.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<Privilege> {
        self.0.clone()
    }
}

impl FromIterator<Privilege> for PrivilegeSet {
    fn from_iter<I: IntoIterator<Item = Privilege>>(iter: I) -> Self {
        let mut set = PrivilegeSet::new();
        for p in iter {
            set.insert(p);
        }
        set
    }
}
