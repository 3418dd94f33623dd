//! Security modes and abstract operation kinds.
//!
//! A [`SecurityMode`] determines which [`OperationKind`]s a caller may perform
//! and which raw SQL statements may run. Both lookups are fixed tables keyed by
//! mode; nothing here holds state.

use crate::error::DbError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Access-control level, ordered by increasing permissiveness.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    /// Queries only.
    #[default]
    ReadOnly,
    /// Queries plus non-destructive modifications.
    Restricted,
    /// Everything.
    FullAccess,
}

/// Statement prefixes accepted in read-only mode.
const READ_ONLY_SQL_PREFIXES: &[&str] = &["SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN"];

/// Keywords rejected anywhere in the statement text in restricted mode.
const RESTRICTED_SQL_FORBIDDEN: &[&str] = &["DROP", "TRUNCATE", "ALTER TABLE"];

impl SecurityMode {
    pub const ALL: [SecurityMode; 3] = [Self::ReadOnly, Self::Restricted, Self::FullAccess];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "read_only",
            Self::Restricted => "restricted",
            Self::FullAccess => "full_access",
        }
    }

    /// Human-readable policy sentence, used in denials and status replies.
    pub fn description(&self) -> &'static str {
        match self {
            Self::ReadOnly => {
                "Read-only mode: only query operations are allowed; all modifications are blocked."
            }
            Self::Restricted => {
                "Restricted mode: queries and limited modifications are allowed; dangerous operations (such as DROP or DELETE) are blocked."
            }
            Self::FullAccess => "Full access mode: all operations are allowed.",
        }
    }

    /// The set of operation kinds this mode permits.
    ///
    /// `Restricted` leaves out `Delete` even though
    /// [`SecurityMode::allows_sql`] accepts a `DELETE ... WHERE` statement.
    pub fn permitted_operations(&self) -> HashSet<OperationKind> {
        match self {
            Self::ReadOnly => OperationKind::ALL
                .into_iter()
                .filter(|kind| kind.class() == OperationClass::Query)
                .collect(),
            Self::Restricted => OperationKind::ALL
                .into_iter()
                .filter(|kind| {
                    kind.class() == OperationClass::Query
                        || matches!(
                            kind,
                            OperationKind::Insert | OperationKind::Update | OperationKind::Set
                        )
                })
                .collect(),
            Self::FullAccess => OperationKind::ALL.into_iter().collect(),
        }
    }

    /// Lexical SQL check for this mode.
    ///
    /// The text is trimmed (whitespace and a byte-order mark) and uppercased,
    /// then matched by prefix or substring.
    /// This is not a parser: keywords inside string literals or comments count.
    pub fn allows_sql(&self, sql: &str) -> bool {
        let normalized = sql
            .trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}')
            .to_uppercase();

        match self {
            Self::ReadOnly => READ_ONLY_SQL_PREFIXES
                .iter()
                .any(|prefix| normalized.starts_with(prefix)),
            Self::Restricted => {
                if RESTRICTED_SQL_FORBIDDEN
                    .iter()
                    .any(|keyword| normalized.contains(keyword))
                {
                    return false;
                }
                if normalized.starts_with("DELETE") {
                    return normalized.contains("WHERE");
                }
                true
            }
            Self::FullAccess => true,
        }
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityMode {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                DbError::invalid_input(format!(
                    "Invalid security mode: {}. Valid values: read_only, restricted, full_access",
                    s
                ))
            })
    }
}

/// Broad category an operation kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationClass {
    Query,
    Mutation,
    Destructive,
}

/// Abstract tag a tool declares for the action it is about to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Query,
    Select,
    Get,
    Find,
    Count,
    List,
    Keys,
    Exists,
    Insert,
    Update,
    Delete,
    Set,
    Drop,
    Truncate,
    Alter,
    Create,
    Execute,
}

impl OperationKind {
    pub const ALL: [OperationKind; 17] = [
        Self::Query,
        Self::Select,
        Self::Get,
        Self::Find,
        Self::Count,
        Self::List,
        Self::Keys,
        Self::Exists,
        Self::Insert,
        Self::Update,
        Self::Delete,
        Self::Set,
        Self::Drop,
        Self::Truncate,
        Self::Alter,
        Self::Create,
        Self::Execute,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Select => "select",
            Self::Get => "get",
            Self::Find => "find",
            Self::Count => "count",
            Self::List => "list",
            Self::Keys => "keys",
            Self::Exists => "exists",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Set => "set",
            Self::Drop => "drop",
            Self::Truncate => "truncate",
            Self::Alter => "alter",
            Self::Create => "create",
            Self::Execute => "execute",
        }
    }

    pub fn class(&self) -> OperationClass {
        match self {
            Self::Query
            | Self::Select
            | Self::Get
            | Self::Find
            | Self::Count
            | Self::List
            | Self::Keys
            | Self::Exists => OperationClass::Query,
            Self::Insert | Self::Update | Self::Delete | Self::Set => OperationClass::Mutation,
            Self::Drop | Self::Truncate | Self::Alter | Self::Create | Self::Execute => {
                OperationClass::Destructive
            }
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes_ordered_by_permissiveness() {
        assert!(SecurityMode::ReadOnly < SecurityMode::Restricted);
        assert!(SecurityMode::Restricted < SecurityMode::FullAccess);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!(
            "read_only".parse::<SecurityMode>().unwrap(),
            SecurityMode::ReadOnly
        );
        assert_eq!(
            "restricted".parse::<SecurityMode>().unwrap(),
            SecurityMode::Restricted
        );
        assert_eq!(
            "full_access".parse::<SecurityMode>().unwrap(),
            SecurityMode::FullAccess
        );
    }

    #[test]
    fn test_mode_from_str_is_exact() {
        for bad in ["READ_ONLY", "readonly", " restricted", "admin", ""] {
            let err = bad.parse::<SecurityMode>().unwrap_err();
            assert!(err.to_string().contains("Valid values"), "{}", bad);
        }
    }

    #[test]
    fn test_mode_serde_uses_wire_names() {
        let json = serde_json::to_string(&SecurityMode::FullAccess).unwrap();
        assert_eq!(json, "\"full_access\"");
        let mode: SecurityMode = serde_json::from_str("\"restricted\"").unwrap();
        assert_eq!(mode, SecurityMode::Restricted);
    }

    #[test]
    fn test_read_only_set_is_query_class() {
        let permitted = SecurityMode::ReadOnly.permitted_operations();
        assert_eq!(permitted.len(), 8);
        assert!(permitted.iter().all(|k| k.class() == OperationClass::Query));
    }

    #[test]
    fn test_restricted_set_contents() {
        let permitted = SecurityMode::Restricted.permitted_operations();
        assert_eq!(permitted.len(), 11);
        assert!(permitted.contains(&OperationKind::Insert));
        assert!(permitted.contains(&OperationKind::Update));
        assert!(permitted.contains(&OperationKind::Set));
        assert!(!permitted.contains(&OperationKind::Delete));
        assert!(!permitted.contains(&OperationKind::Create));
    }

    #[test]
    fn test_full_access_set_is_universe() {
        assert_eq!(
            SecurityMode::FullAccess.permitted_operations().len(),
            OperationKind::ALL.len()
        );
    }

    #[test]
    fn test_descriptions_are_distinct() {
        let descriptions: HashSet<_> = SecurityMode::ALL.iter().map(|m| m.description()).collect();
        assert_eq!(descriptions.len(), 3);
    }

    #[test]
    fn test_read_only_accepts_desc_shorthand() {
        assert!(SecurityMode::ReadOnly.allows_sql("desc users"));
        assert!(SecurityMode::ReadOnly.allows_sql("EXPLAIN SELECT 1"));
        assert!(SecurityMode::ReadOnly.allows_sql("show tables"));
    }

    #[test]
    fn test_leading_byte_order_mark_is_trimmed() {
        assert!(SecurityMode::ReadOnly.allows_sql("\u{FEFF}SELECT 1"));
        assert!(SecurityMode::ReadOnly.allows_sql(" \u{FEFF}\n show tables \u{FEFF}"));
        assert!(!SecurityMode::ReadOnly.allows_sql("\u{FEFF}UPDATE t SET a = 1"));
    }

    #[test]
    fn test_read_only_checks_prefix_only() {
        // A trailing write statement is not inspected
        assert!(SecurityMode::ReadOnly.allows_sql("SELECT 1; DELETE FROM t"));
        assert!(!SecurityMode::ReadOnly.allows_sql("WITH x AS (SELECT 1) SELECT * FROM x"));
    }

    #[test]
    fn test_restricted_alter_requires_table_keyword() {
        assert!(!SecurityMode::Restricted.allows_sql("alter table t add column c int"));
        assert!(SecurityMode::Restricted.allows_sql("ALTER USER bob IDENTIFIED BY 'x'"));
    }

    #[test]
    fn test_restricted_matches_inside_literals() {
        // Substring matching sees keywords inside string literals
        assert!(!SecurityMode::Restricted.allows_sql("INSERT INTO notes VALUES ('drop zone')"));
        assert!(SecurityMode::Restricted.allows_sql("DELETE FROM t -- where"));
    }

    #[test]
    fn test_empty_sql() {
        assert!(!SecurityMode::ReadOnly.allows_sql("   "));
        assert!(SecurityMode::Restricted.allows_sql(""));
        assert!(SecurityMode::FullAccess.allows_sql(""));
    }

    #[test]
    fn test_operation_kind_serde() {
        let json = serde_json::to_string(&OperationKind::Truncate).unwrap();
        assert_eq!(json, "\"truncate\"");
        for kind in OperationKind::ALL {
            assert_eq!(
                serde_json::to_string(&kind).unwrap(),
                format!("\"{}\"", kind.as_str())
            );
        }
    }
}
