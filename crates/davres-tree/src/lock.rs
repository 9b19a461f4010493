//! The lock table: LOCK/REFRESH/UNLOCK state per resource identity.
//!
//! Lock state is the only cross-request mutable state in the core. Every
//! transition is a single check-and-set under the table's per-key lock, so
//! a grant is visible to all concurrent requests the instant it happens —
//! two concurrent exclusive LOCKs on one resource admit exactly one winner.
//!
//! Expired locks are treated as absent on every read and transition;
//! [`MemLockManager::purge_expired`] additionally reclaims their entries,
//! but correctness never depends on the sweep running.

use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use davres_core::error::{DavError, DavResult};
use davres_core::lock::{LockInfo, LockTimeout, LockToken};

/// Lock-table tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Granted duration when the client states no preference.
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,
    /// Upper bound on any grant; "infinite" requests are clamped to this.
    #[serde(with = "humantime_serde")]
    pub max_timeout: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(300),
            max_timeout: Duration::from_secs(3600),
        }
    }
}

/// Issues, refreshes and releases locks keyed by resource identity.
pub trait LockManager: Send + Sync {
    /// Take a lock. Fails with `PreConditionFailed` when a live lock held
    /// by a different owner already covers the resource.
    fn lock(
        &self,
        resource_id: &str,
        timeout: LockTimeout,
        info: LockInfo,
    ) -> DavResult<LockToken>;

    /// Extend the current lock. Fails with `NotAuthorized` when the token
    /// does not match the current holder, `PreConditionFailed` when no
    /// live lock exists.
    fn refresh(&self, resource_id: &str, token_id: &str) -> DavResult<LockToken>;

    /// Release the current lock. Same failure mapping as `refresh`.
    fn unlock(&self, resource_id: &str, token_id: &str) -> DavResult<()>;

    /// The live lock on a resource, if any. Pure read.
    fn current_lock(&self, resource_id: &str) -> Option<LockToken>;
}

/// In-memory lock table.
///
/// Tracks one live token per resource identity: a live lock held by
/// another owner refuses any new grant, and a same-owner re-lock replaces
/// the token. Shared scope is carried on the token for protocol reporting
/// but does not create multi-holder state.
#[derive(Debug, Default)]
pub struct MemLockManager {
    config: LockConfig,
    locks: DashMap<String, LockToken>,
}

impl MemLockManager {
    pub fn new(config: LockConfig) -> Self {
        Self { config, locks: DashMap::new() }
    }

    /// Drop every expired entry; returns how many were reclaimed.
    pub fn purge_expired(&self) -> usize {
        let now = SystemTime::now();
        let before = self.locks.len();
        self.locks.retain(|_, token| !token.is_expired(now));
        let purged = before.saturating_sub(self.locks.len());
        if purged > 0 {
            debug!(purged, "reclaimed expired locks");
        }
        purged
    }

    /// Number of table entries, expired ones included.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn granted_duration(&self, requested: LockTimeout) -> Duration {
        match requested {
            LockTimeout::Default => self.config.default_timeout,
            LockTimeout::Infinite => self.config.max_timeout,
            LockTimeout::Seconds(secs) => Duration::from_secs(secs).min(self.config.max_timeout),
        }
    }
}

impl LockManager for MemLockManager {
    fn lock(
        &self,
        resource_id: &str,
        timeout: LockTimeout,
        info: LockInfo,
    ) -> DavResult<LockToken> {
        let now = SystemTime::now();
        let granted = self.granted_duration(timeout);
        let token = LockToken {
            id: Uuid::new_v4().to_string(),
            resource_id: resource_id.to_string(),
            info,
            timeout: granted,
            expires_at: now + granted,
        };

        match self.locks.entry(resource_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get();
                if !existing.is_expired(now) && !existing.same_owner(token.info.owner.as_deref())
                {
                    trace!(
                        resource = resource_id,
                        holder = existing.info.owner.as_deref().unwrap_or("anonymous"),
                        "lock refused, held by another owner"
                    );
                    return Err(DavError::PreConditionFailed(format!(
                        "resource {resource_id} is already locked"
                    )));
                }
                entry.insert(token.clone());
            }
            Entry::Vacant(entry) => {
                entry.insert(token.clone());
            }
        }

        debug!(resource = resource_id, token = %token.id, timeout_secs = granted.as_secs(), "lock granted");
        Ok(token)
    }

    fn refresh(&self, resource_id: &str, token_id: &str) -> DavResult<LockToken> {
        let now = SystemTime::now();
        match self.locks.entry(resource_id.to_string()) {
            Entry::Vacant(_) => Err(DavError::PreConditionFailed(format!(
                "no lock held on {resource_id}"
            ))),
            Entry::Occupied(mut entry) => {
                if entry.get().is_expired(now) {
                    entry.remove();
                    return Err(DavError::PreConditionFailed("lock has expired".to_string()));
                }
                if entry.get().id != token_id {
                    return Err(DavError::NotAuthorized(
                        "token does not match the current lock holder".to_string(),
                    ));
                }
                let token = entry.get_mut();
                token.expires_at = now + token.timeout;
                debug!(resource = resource_id, token = %token.id, "lock refreshed");
                Ok(token.clone())
            }
        }
    }

    fn unlock(&self, resource_id: &str, token_id: &str) -> DavResult<()> {
        let now = SystemTime::now();
        match self.locks.entry(resource_id.to_string()) {
            Entry::Vacant(_) => Err(DavError::PreConditionFailed(format!(
                "no lock held on {resource_id}"
            ))),
            Entry::Occupied(entry) => {
                if entry.get().is_expired(now) {
                    entry.remove();
                    return Err(DavError::PreConditionFailed("lock has expired".to_string()));
                }
                if entry.get().id != token_id {
                    return Err(DavError::NotAuthorized(
                        "token does not match the current lock holder".to_string(),
                    ));
                }
                entry.remove();
                debug!(resource = resource_id, "lock released");
                Ok(())
            }
        }
    }

    fn current_lock(&self, resource_id: &str) -> Option<LockToken> {
        let entry = self.locks.get(resource_id)?;
        if entry.is_expired(SystemTime::now()) {
            None
        } else {
            Some(entry.clone())
        }
    }
}
