//! Security mode tools.
//!
//! `get_security_mode` reports the active mode; `set_security_mode` validates
//! the requested mode string and switches the shared policy.

use crate::error::DbResult;
use crate::security::{AccessPolicy, SecurityMode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SecurityModeOutput {
    pub mode: SecurityMode,
    /// What the mode allows
    pub description: String,
}

/// Input for the set_security_mode tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SetSecurityModeInput {
    /// New mode: read_only, restricted or full_access
    pub mode: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SetSecurityModeOutput {
    pub mode: SecurityMode,
    pub previous_mode: SecurityMode,
    pub description: String,
}

pub struct SecurityToolHandler {
    policy: Arc<AccessPolicy>,
}

impl SecurityToolHandler {
    pub fn new(policy: Arc<AccessPolicy>) -> Self {
        Self { policy }
    }

    pub fn get_mode(&self) -> SecurityModeOutput {
        let (mode, description) = self.policy.snapshot();
        SecurityModeOutput {
            mode,
            description: description.to_string(),
        }
    }

    /// Parse and apply a new mode. An invalid string leaves the policy untouched.
    pub fn set_mode(&self, input: SetSecurityModeInput) -> DbResult<SetSecurityModeOutput> {
        let mode: SecurityMode = input.mode.parse()?;
        let previous_mode = self.policy.set_mode(mode);
        info!(tool = "set_security_mode", mode = %mode, "Tool call");

        Ok(SetSecurityModeOutput {
            mode,
            previous_mode,
            description: mode.description().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;

    #[test]
    fn test_get_mode_reports_description() {
        let handler = SecurityToolHandler::new(Arc::new(AccessPolicy::default()));
        let output = handler.get_mode();
        assert_eq!(output.mode, SecurityMode::ReadOnly);
        assert!(output.description.starts_with("Read-only mode"));
    }

    #[test]
    fn test_set_mode_switches_shared_policy() {
        let policy = Arc::new(AccessPolicy::default());
        let handler = SecurityToolHandler::new(policy.clone());

        let output = handler
            .set_mode(SetSecurityModeInput {
                mode: "full_access".to_string(),
            })
            .unwrap();
        assert_eq!(output.previous_mode, SecurityMode::ReadOnly);
        assert_eq!(output.mode, SecurityMode::FullAccess);
        assert_eq!(policy.mode(), SecurityMode::FullAccess);
    }

    #[test]
    fn test_set_mode_rejects_unknown_value() {
        let policy = Arc::new(AccessPolicy::new(SecurityMode::Restricted));
        let handler = SecurityToolHandler::new(policy.clone());

        let err = handler
            .set_mode(SetSecurityModeInput {
                mode: "Full_Access".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
        assert_eq!(policy.mode(), SecurityMode::Restricted);
    }
}
