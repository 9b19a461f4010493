//! Lock primitives: tokens, timeouts, and the lock description clients
//! submit with a LOCK request.
//!
//! The state machine that owns these values lives in the tree crate; these
//! types are the shared vocabulary between it and the protocol dispatcher.

use std::time::{Duration, SystemTime};

/// Client-requested lock duration, as parsed from a Timeout header by the
/// transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockTimeout {
    /// No preference; the manager applies its configured default.
    #[default]
    Default,
    /// "Infinite"; clamped to the manager's maximum.
    Infinite,
    /// A specific number of seconds; clamped to the manager's maximum.
    Seconds(u64),
}

/// Lock scope. Only exclusive locks create mutual exclusion; shared scope
/// is carried for protocol reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockScope {
    Exclusive,
    Shared,
}

/// Lock depth, per the protocol's Depth header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockDepth {
    Zero,
    Infinity,
}

/// The lock description submitted with a LOCK request.
#[derive(Debug, Clone)]
pub struct LockInfo {
    pub scope: LockScope,
    pub depth: LockDepth,
    /// Principal name of the requesting owner, when authenticated.
    pub owner: Option<String>,
}

impl LockInfo {
    pub fn exclusive(owner: Option<String>) -> Self {
        Self { scope: LockScope::Exclusive, depth: LockDepth::Zero, owner }
    }

    pub fn shared(owner: Option<String>) -> Self {
        Self { scope: LockScope::Shared, depth: LockDepth::Zero, owner }
    }
}

/// An active lock: the opaque token proving ownership plus its grant state.
#[derive(Debug, Clone)]
pub struct LockToken {
    /// Opaque, globally unique token id.
    pub id: String,
    /// Identity of the locked resource.
    pub resource_id: String,
    /// The lock description as granted.
    pub info: LockInfo,
    /// Granted duration; refresh re-extends by this much.
    pub timeout: Duration,
    /// Absolute expiry.
    pub expires_at: SystemTime,
}

impl LockToken {
    /// True once the grant window has passed. Expired locks are treated as
    /// absent everywhere.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }

    /// True iff `owner` names the same principal that took the lock.
    /// Anonymous owners only match anonymous.
    pub fn same_owner(&self, owner: Option<&str>) -> bool {
        self.info.owner.as_deref() == owner
    }
}
