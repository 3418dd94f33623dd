//! Policy guard for tool handlers.
//!
//! Turns a negative decision of the [`AccessPolicy`] into a
//! `DbError::PermissionDenied` carrying the reason and the current mode's
//! description. Every data tool calls one of these before touching a connector.

use crate::error::{DbError, DbResult};
use crate::security::{AccessPolicy, OperationKind};
use tracing::warn;

/// Fail unless the current mode permits `kind`.
pub fn ensure_operation_allowed(policy: &AccessPolicy, kind: OperationKind) -> DbResult<()> {
    let Some(mode) = policy.operation_denied_by(kind) else {
        return Ok(());
    };

    warn!(mode = %mode, operation = %kind, "Operation denied");
    Err(DbError::permission_denied(
        mode,
        format!(
            "Current security mode ({}) does not allow {} operations.",
            mode,
            kind.as_str().to_uppercase()
        ),
        mode.description(),
    ))
}

/// Fail unless the current mode permits this SQL statement.
pub fn ensure_sql_allowed(policy: &AccessPolicy, sql: &str) -> DbResult<()> {
    let Some(mode) = policy.sql_denied_by(sql) else {
        return Ok(());
    };

    warn!(mode = %mode, operation = "sql", "SQL statement denied");
    Err(DbError::permission_denied(
        mode,
        format!(
            "Current security mode ({}) does not allow this SQL statement.",
            mode
        ),
        mode.description(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::SecurityMode;

    #[test]
    fn test_allowed_operation_passes() {
        let policy = AccessPolicy::new(SecurityMode::ReadOnly);
        assert!(ensure_operation_allowed(&policy, OperationKind::Get).is_ok());
    }

    #[test]
    fn test_denied_operation_message() {
        let policy = AccessPolicy::new(SecurityMode::ReadOnly);
        let err = ensure_operation_allowed(&policy, OperationKind::Set).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Current security mode (read_only) does not allow SET operations. \
             Allowed operations: Read-only mode: only query operations are allowed; \
             all modifications are blocked."
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_denied_sql_carries_mode() {
        let policy = AccessPolicy::new(SecurityMode::Restricted);
        let err = ensure_sql_allowed(&policy, "DROP TABLE users").unwrap_err();
        match err {
            DbError::PermissionDenied { mode, reason, .. } => {
                assert_eq!(mode, SecurityMode::Restricted);
                assert!(reason.contains("(restricted)"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_sql_allowed_in_full_access() {
        let policy = AccessPolicy::new(SecurityMode::FullAccess);
        assert!(ensure_sql_allowed(&policy, "DROP TABLE users").is_ok());
    }
}
