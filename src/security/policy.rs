//! The access policy engine.
//!
//! One [`AccessPolicy`] is built at startup and shared (behind an `Arc`) with
//! every tool handler. It answers two questions, "may this operation kind
//! run?" and "may this SQL text run?", against the active [`SecurityMode`].

use crate::security::mode::{OperationKind, SecurityMode};
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

/// Mode and the permitted set derived from it, always replaced together.
#[derive(Debug)]
struct PolicyState {
    mode: SecurityMode,
    permitted: HashSet<OperationKind>,
}

impl PolicyState {
    fn for_mode(mode: SecurityMode) -> Self {
        Self {
            mode,
            permitted: mode.permitted_operations(),
        }
    }
}

/// Mode-based access control for data store operations.
///
/// All methods take `&self`; the state sits behind a single lock so a query
/// never sees a mode paired with another mode's permitted set.
#[derive(Debug)]
pub struct AccessPolicy {
    state: RwLock<PolicyState>,
}

impl AccessPolicy {
    pub fn new(mode: SecurityMode) -> Self {
        info!(mode = %mode, "Access policy initialized");
        Self {
            state: RwLock::new(PolicyState::for_mode(mode)),
        }
    }

    /// Whether the active mode permits the given operation kind.
    pub fn is_operation_allowed(&self, kind: OperationKind) -> bool {
        self.operation_denied_by(kind).is_none()
    }

    /// Whether the active mode permits the given raw SQL text.
    pub fn is_sql_allowed(&self, sql: &str) -> bool {
        self.sql_denied_by(sql).is_none()
    }

    pub fn mode(&self) -> SecurityMode {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .mode
    }

    /// Replace the active mode and return the one it replaced. Any mode may
    /// follow any other, itself included.
    pub fn set_mode(&self, mode: SecurityMode) -> SecurityMode {
        let next = PolicyState::for_mode(mode);
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *state, next);
        info!(from = %previous.mode, to = %mode, "Security mode changed");
        previous.mode
    }

    /// Policy sentence for the active mode.
    pub fn mode_description(&self) -> &'static str {
        self.mode().description()
    }

    /// The mode that rejects `kind`, or `None` if it is allowed. One lock read
    /// covers both the decision and the reported mode.
    pub fn operation_denied_by(&self, kind: OperationKind) -> Option<SecurityMode> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let allowed = state.permitted.contains(&kind);
        debug!(mode = %state.mode, operation = %kind, allowed, "Operation check");
        (!allowed).then_some(state.mode)
    }

    /// The mode that rejects this SQL text, or `None` if it is allowed.
    pub fn sql_denied_by(&self, sql: &str) -> Option<SecurityMode> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let allowed = state.mode.allows_sql(sql);
        debug!(mode = %state.mode, allowed, "SQL check");
        (!allowed).then_some(state.mode)
    }

    /// Mode and its matching description from a single read.
    pub fn snapshot(&self) -> (SecurityMode, &'static str) {
        let mode = self.mode();
        (mode, mode.description())
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(SecurityMode::default())
    }
}
