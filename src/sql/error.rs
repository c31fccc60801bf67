//! Error types for dialect resolution, DDL generation and SQL translation

use thiserror::Error;

use crate::dialect::column_types::SqlType;
use crate::dialect::version::DatabaseVersion;

/// Errors raised while compiling queries or generating DDL for a dialect
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DialectError {
    #[error("No column type mapping for {code:?} (length {length}) on {dialect}")]
    UnsupportedType {
        dialect: String,
        code: SqlType,
        length: u64,
    },

    #[error("{construct} is not supported on {dialect}{}", requires_version(.minimum_version))]
    UnsupportedSqlConstruct {
        dialect: String,
        construct: String,
        minimum_version: Option<DatabaseVersion>,
    },

    #[error("Function '{function}' expects {} but was called with {actual}", arity_range(.min, .max))]
    FunctionArity {
        function: String,
        min: usize,
        max: Option<usize>,
        actual: usize,
    },

    #[error("Function '{function}' is not available on {dialect}")]
    UnknownFunction { dialect: String, function: String },

    #[error("Unknown database product: {0}")]
    UnknownProduct(String),

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Unknown attribute '{attribute}' on entity '{entity}'")]
    UnknownAttribute { entity: String, attribute: String },

    #[error("Invalid database version: {0}")]
    InvalidVersion(String),

    /// An upstream collaborator handed over a tree that breaks an invariant
    #[error("Malformed tree (internal error): {0}")]
    MalformedTree(String),
}

impl DialectError {
    pub(crate) fn unsupported(
        dialect: impl Into<String>,
        construct: impl Into<String>,
        minimum_version: Option<DatabaseVersion>,
    ) -> Self {
        DialectError::UnsupportedSqlConstruct {
            dialect: dialect.into(),
            construct: construct.into(),
            minimum_version,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        DialectError::MalformedTree(message.into())
    }

    /// Programming-error class failures that must not be retried
    pub fn is_internal(&self) -> bool {
        matches!(self, DialectError::MalformedTree(_))
    }
}

fn requires_version(version: &Option<DatabaseVersion>) -> String {
    match version {
        Some(v) => format!(" (requires version {} or later)", v),
        None => String::new(),
    }
}

fn arity_range(min: &usize, max: &Option<usize>) -> String {
    match *max {
        Some(max) if max == *min => format!("exactly {} argument(s)", min),
        Some(max) => format!("between {} and {} arguments", min, max),
        None => format!("at least {} argument(s)", min),
    }
}

/// Warnings that may occur during translation (non-fatal)
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationWarning {
    /// The dialect only locks through cursors; the lock clause rendered empty
    LockClauseOmitted { dialect: String },
    /// NOWAIT / SKIP LOCKED is unsupported; a plain lock was rendered
    LockOptionIgnored { dialect: String, option: String },
    /// An ORDER BY without pagination was dropped from a subquery
    SubqueryOrderByRemoved,
}

impl std::fmt::Display for TranslationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslationWarning::LockClauseOmitted { dialect } => {
                write!(f, "{} restricts FOR UPDATE to cursors; lock clause omitted", dialect)
            }
            TranslationWarning::LockOptionIgnored { dialect, option } => {
                write!(f, "{} does not support {}; rendered a plain lock", dialect, option)
            }
            TranslationWarning::SubqueryOrderByRemoved => {
                write!(f, "ORDER BY removed from a subquery without pagination")
            }
        }
    }
}

/// Result type for dialect operations
pub type DialectResult<T> = Result<T, DialectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_construct_message() {
        let err = DialectError::unsupported("Ingres 9.2", "union all", Some(DatabaseVersion::new(9, 3)));
        assert_eq!(
            err.to_string(),
            "union all is not supported on Ingres 9.2 (requires version 9.3 or later)"
        );
        let err = DialectError::unsupported("Ingres 9.2", "union in subquery", None);
        assert_eq!(err.to_string(), "union in subquery is not supported on Ingres 9.2");
    }

    #[test]
    fn test_arity_message() {
        let err = DialectError::FunctionArity {
            function: "locate".to_string(),
            min: 2,
            max: Some(3),
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            "Function 'locate' expects between 2 and 3 arguments but was called with 4"
        );
    }

    #[test]
    fn test_internal_classification() {
        assert!(DialectError::malformed("empty select list").is_internal());
        assert!(!DialectError::UnknownProduct("x".to_string()).is_internal());
    }
}
