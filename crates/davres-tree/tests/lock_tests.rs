//! Lock lifecycle and mutual exclusion, through the lock manager and
//! through nodes.

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{base_registry, Document, TestEnv};
use davres_core::error::DavError;
use davres_core::lock::{LockInfo, LockTimeout};
use davres_tree::lock::{LockConfig, LockManager, MemLockManager};

fn short_config() -> LockConfig {
    LockConfig { default_timeout: Duration::from_millis(30), max_timeout: Duration::from_secs(600) }
}

// ============================================================================
// Lifecycle round-trip
// ============================================================================

#[test]
fn test_lock_refresh_unlock_round_trip() {
    let mgr = MemLockManager::new(LockConfig::default());

    let token = mgr
        .lock("r1", LockTimeout::Seconds(60), LockInfo::exclusive(Some("alice".into())))
        .unwrap();
    assert_eq!(mgr.current_lock("r1").unwrap().id, token.id);

    thread::sleep(Duration::from_millis(15));
    let refreshed = mgr.refresh("r1", &token.id).unwrap();
    assert_eq!(refreshed.id, token.id);
    assert!(
        refreshed.expires_at > token.expires_at,
        "refresh must extend the expiry window"
    );

    mgr.unlock("r1", &token.id).unwrap();
    assert!(mgr.current_lock("r1").is_none());
}

#[test]
fn test_unlock_wrong_token_leaves_lock_intact() {
    let mgr = MemLockManager::new(LockConfig::default());
    let token = mgr
        .lock("r1", LockTimeout::Default, LockInfo::exclusive(Some("alice".into())))
        .unwrap();

    let err = mgr.unlock("r1", "not-the-token").unwrap_err();
    assert!(matches!(err, DavError::NotAuthorized(_)));
    assert_eq!(mgr.current_lock("r1").unwrap().id, token.id);
}

#[test]
fn test_refresh_wrong_token_is_not_authorized() {
    let mgr = MemLockManager::new(LockConfig::default());
    mgr.lock("r1", LockTimeout::Default, LockInfo::exclusive(Some("alice".into()))).unwrap();

    assert!(matches!(mgr.refresh("r1", "bogus").unwrap_err(), DavError::NotAuthorized(_)));
}

#[test]
fn test_refresh_and_unlock_unknown_resource_fail_precondition() {
    let mgr = MemLockManager::new(LockConfig::default());
    assert!(matches!(mgr.refresh("r1", "t").unwrap_err(), DavError::PreConditionFailed(_)));
    assert!(matches!(mgr.unlock("r1", "t").unwrap_err(), DavError::PreConditionFailed(_)));
}

// ============================================================================
// Mutual exclusion
// ============================================================================

#[test]
fn test_different_owner_is_refused() {
    let mgr = MemLockManager::new(LockConfig::default());
    mgr.lock("r1", LockTimeout::Default, LockInfo::exclusive(Some("alice".into()))).unwrap();

    let err = mgr
        .lock("r1", LockTimeout::Default, LockInfo::exclusive(Some("bob".into())))
        .unwrap_err();
    assert!(matches!(err, DavError::PreConditionFailed(_)));
}

#[test]
fn test_concurrent_exclusive_locks_admit_one_winner() {
    let mgr = Arc::new(MemLockManager::new(LockConfig::default()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let mgr = Arc::clone(&mgr);
            thread::spawn(move || {
                mgr.lock(
                    "contended",
                    LockTimeout::Default,
                    LockInfo::exclusive(Some(format!("owner-{i}"))),
                )
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
    assert_eq!(winners.len(), 1, "exactly one concurrent LOCK must win");

    for result in &results {
        if let Err(e) = result {
            assert!(matches!(e, DavError::PreConditionFailed(_)));
        }
    }

    let winning_token = results.into_iter().find_map(Result::ok).unwrap();
    assert_eq!(mgr.current_lock("contended").unwrap().id, winning_token.id);
}

// ============================================================================
// Expiry and clamping
// ============================================================================

#[test]
fn test_expired_lock_does_not_block() {
    let mgr = MemLockManager::new(short_config());
    let stale = mgr
        .lock("r1", LockTimeout::Default, LockInfo::exclusive(Some("alice".into())))
        .unwrap();
    thread::sleep(Duration::from_millis(60));

    assert!(mgr.current_lock("r1").is_none(), "expired locks are invisible");
    assert!(matches!(mgr.refresh("r1", &stale.id).unwrap_err(), DavError::PreConditionFailed(_)));

    // A different owner can now take the lock.
    let token = mgr
        .lock("r1", LockTimeout::Seconds(60), LockInfo::exclusive(Some("bob".into())))
        .unwrap();
    assert_eq!(mgr.current_lock("r1").unwrap().id, token.id);
}

#[test]
fn test_requested_timeout_is_clamped() {
    let mgr = MemLockManager::new(LockConfig {
        default_timeout: Duration::from_secs(120),
        max_timeout: Duration::from_secs(300),
    });

    let token =
        mgr.lock("r1", LockTimeout::Seconds(7200), LockInfo::exclusive(None)).unwrap();
    assert_eq!(token.timeout, Duration::from_secs(300));

    let token = mgr.lock("r2", LockTimeout::Infinite, LockInfo::exclusive(None)).unwrap();
    assert_eq!(token.timeout, Duration::from_secs(300));

    let token = mgr.lock("r3", LockTimeout::Default, LockInfo::exclusive(None)).unwrap();
    assert_eq!(token.timeout, Duration::from_secs(120));
}

// ============================================================================
// Through nodes
// ============================================================================

#[test]
fn test_nodes_lock_by_resource_identity() {
    let env = TestEnv::new(base_registry(), true);
    let root = env.root(vec![Document::backing("a", b"")]);

    // Two per-request nodes over the same backing object share identity.
    let first = root.child("a").unwrap().unwrap();
    let second = root.child("a").unwrap().unwrap();

    let token = first
        .resource()
        .lock(LockTimeout::Seconds(60), LockInfo::exclusive(Some("alice".into())))
        .unwrap();
    assert_eq!(token.resource_id, "doc:a");

    let err = second
        .resource()
        .lock(LockTimeout::Seconds(60), LockInfo::exclusive(Some("bob".into())))
        .unwrap_err();
    assert!(matches!(err, DavError::PreConditionFailed(_)));

    assert_eq!(second.resource().current_lock().unwrap().id, token.id);

    first.resource().unlock(&token.id).unwrap();
    assert!(second.resource().current_lock().is_none());
}
