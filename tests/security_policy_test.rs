//! Integration tests for the access policy engine.
//!
//! These tests exercise the public policy API only; no database is needed.

use db_mcp::security::{AccessPolicy, OperationClass, OperationKind, SecurityMode};
use std::sync::Arc;

// =========================================================================
// Permitted sets
// =========================================================================

#[test]
fn test_permitted_sets_are_nested() {
    let read_only = AccessPolicy::new(SecurityMode::ReadOnly);
    let restricted = AccessPolicy::new(SecurityMode::Restricted);
    let full_access = AccessPolicy::new(SecurityMode::FullAccess);

    for kind in OperationKind::ALL {
        if read_only.is_operation_allowed(kind) {
            assert!(restricted.is_operation_allowed(kind), "{kind} lost in restricted");
            assert!(full_access.is_operation_allowed(kind), "{kind} lost in full_access");
        }
        if restricted.is_operation_allowed(kind) {
            assert!(full_access.is_operation_allowed(kind), "{kind} lost in full_access");
        }
    }
}

#[test]
fn test_read_only_allows_exactly_query_class() {
    let policy = AccessPolicy::new(SecurityMode::ReadOnly);
    for kind in OperationKind::ALL {
        assert_eq!(
            policy.is_operation_allowed(kind),
            kind.class() == OperationClass::Query,
            "{kind}"
        );
    }
}

#[test]
fn test_restricted_adds_insert_update_set_only() {
    let policy = AccessPolicy::new(SecurityMode::Restricted);
    for kind in [OperationKind::Insert, OperationKind::Update, OperationKind::Set] {
        assert!(policy.is_operation_allowed(kind), "{kind}");
    }
    for kind in [
        OperationKind::Delete,
        OperationKind::Drop,
        OperationKind::Truncate,
        OperationKind::Alter,
        OperationKind::Create,
        OperationKind::Execute,
    ] {
        assert!(!policy.is_operation_allowed(kind), "{kind}");
    }
}

#[test]
fn test_full_access_allows_everything() {
    let policy = AccessPolicy::new(SecurityMode::FullAccess);
    assert!(OperationKind::ALL.into_iter().all(|k| policy.is_operation_allowed(k)));
    assert!(policy.is_sql_allowed("TRUNCATE TABLE t"));
    assert!(policy.is_operation_allowed(OperationKind::Drop));
}

// =========================================================================
// Mode changes
// =========================================================================

#[test]
fn test_set_mode_round_trip() {
    let policy = AccessPolicy::default();
    assert_eq!(policy.mode(), SecurityMode::ReadOnly);
    for mode in SecurityMode::ALL {
        policy.set_mode(mode);
        assert_eq!(policy.mode(), mode);
        assert_eq!(policy.mode_description(), mode.description());
    }
}

#[test]
fn test_set_mode_changes_decisions() {
    let policy = AccessPolicy::new(SecurityMode::ReadOnly);
    assert!(!policy.is_operation_allowed(OperationKind::Set));
    assert_eq!(policy.set_mode(SecurityMode::Restricted), SecurityMode::ReadOnly);
    assert!(policy.is_operation_allowed(OperationKind::Set));
    policy.set_mode(SecurityMode::ReadOnly);
    assert!(!policy.is_operation_allowed(OperationKind::Set));
}

#[test]
fn test_mode_strings_are_exact() {
    assert_eq!("restricted".parse::<SecurityMode>().unwrap(), SecurityMode::Restricted);
    for bad in ["READ_ONLY", "readonly", "full-access", " restricted", ""] {
        let err = bad.parse::<SecurityMode>().unwrap_err();
        assert!(err.to_string().contains("read_only, restricted, full_access"));
    }
}

// =========================================================================
// SQL rules
// =========================================================================

#[test]
fn test_read_only_sql() {
    let policy = AccessPolicy::new(SecurityMode::ReadOnly);
    assert!(policy.is_sql_allowed("select * from users"));
    assert!(policy.is_sql_allowed("  SeLeCt 1"));
    assert!(policy.is_sql_allowed("SHOW TABLES"));
    assert!(policy.is_sql_allowed("describe users"));
    assert!(policy.is_sql_allowed("EXPLAIN SELECT 1"));
    assert!(!policy.is_sql_allowed("INSERT INTO t VALUES (1)"));
    assert!(!policy.is_sql_allowed("WITH x AS (SELECT 1) SELECT * FROM x"));
    assert!(!policy.is_sql_allowed(""));
}

#[test]
fn test_restricted_delete_needs_where() {
    let policy = AccessPolicy::new(SecurityMode::Restricted);
    assert!(!policy.is_sql_allowed("DELETE FROM t"));
    assert!(policy.is_sql_allowed("DELETE FROM t WHERE id=1"));
}

#[test]
fn test_restricted_forbidden_keywords_anywhere() {
    let policy = AccessPolicy::new(SecurityMode::Restricted);
    assert!(!policy.is_sql_allowed("SELECT * FROM t; DROP TABLE t"));
    assert!(!policy.is_sql_allowed("truncate table t"));
    assert!(!policy.is_sql_allowed("ALTER TABLE t ADD COLUMN c INT"));
    // Lexical match, so identifiers containing the keyword are blocked too
    assert!(!policy.is_sql_allowed("SELECT dropped_at FROM t"));
    assert!(policy.is_sql_allowed("INSERT INTO t VALUES (1)"));
    assert!(policy.is_sql_allowed("UPDATE t SET a = 1"));
}

#[test]
fn test_restricted_delete_asymmetry() {
    let policy = AccessPolicy::new(SecurityMode::Restricted);
    assert!(!policy.is_operation_allowed(OperationKind::Delete));
    assert!(policy.is_sql_allowed("DELETE FROM t WHERE id = 1"));
}

#[test]
fn test_decisions_are_idempotent() {
    let policy = AccessPolicy::new(SecurityMode::Restricted);
    let first: Vec<bool> = OperationKind::ALL
        .into_iter()
        .map(|k| policy.is_operation_allowed(k))
        .collect();
    let sql_first = policy.is_sql_allowed("DELETE FROM t");
    for _ in 0..10 {
        let again: Vec<bool> = OperationKind::ALL
            .into_iter()
            .map(|k| policy.is_operation_allowed(k))
            .collect();
        assert_eq!(first, again);
        assert_eq!(sql_first, policy.is_sql_allowed("DELETE FROM t"));
    }
}

// =========================================================================
// Concurrency
// =========================================================================

#[test]
fn test_concurrent_readers_see_a_whole_mode() {
    let policy = Arc::new(AccessPolicy::new(SecurityMode::ReadOnly));

    let writer = {
        let policy = policy.clone();
        std::thread::spawn(move || {
            for i in 0..500 {
                policy.set_mode(SecurityMode::ALL[i % 3]);
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let policy = policy.clone();
            std::thread::spawn(move || {
                for _ in 0..500 {
                    let (mode, description) = policy.snapshot();
                    assert_eq!(description, mode.description());
                    // Query-class operations are allowed in every mode
                    assert!(policy.is_operation_allowed(OperationKind::Get));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}
