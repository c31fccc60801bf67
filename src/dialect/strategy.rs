//! Strategy variants chosen once per dialect at construction

use serde::{Deserialize, Serialize};

use super::version::DatabaseVersion;

/// Row limiting / pagination syntax
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitStrategy {
    /// No row limiting at all
    Unsupported,
    /// `select first N ...`: top-N only, N must be a literal
    First {
        /// Version that introduced offset support, named in errors
        offset_since: Option<DatabaseVersion>,
    },
    /// `select top (N) ...`: top-N only
    Top { offset_since: Option<DatabaseVersion> },
    /// `limit N offset M`
    LimitOffset {
        /// Stand-in row count when only an offset is given
        max_rows: Option<String>,
    },
    /// `offset M rows fetch next N rows only`
    OffsetFetch {
        /// Emit `rows` after the offset value
        offset_rows_keyword: bool,
        /// The dialect rejects offset/fetch without an order by
        requires_order_by: bool,
    },
}

impl LimitStrategy {
    pub fn supports_limit(&self) -> bool {
        !matches!(self, LimitStrategy::Unsupported)
    }

    pub fn supports_offset(&self) -> bool {
        matches!(
            self,
            LimitStrategy::LimitOffset { .. } | LimitStrategy::OffsetFetch { .. }
        )
    }

    /// Parameters are accepted for the row count
    pub fn supports_variable_limit(&self) -> bool {
        !matches!(self, LimitStrategy::Unsupported | LimitStrategy::First { .. })
    }

    /// The limit is rendered right after `select`
    pub fn is_prefix(&self) -> bool {
        matches!(self, LimitStrategy::First { .. } | LimitStrategy::Top { .. })
    }

    /// Version to name when an offset is rejected
    pub fn offset_since(&self) -> Option<DatabaseVersion> {
        match self {
            LimitStrategy::First { offset_since } | LimitStrategy::Top { offset_since } => {
                *offset_since
            }
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LimitStrategy::Unsupported => "unsupported",
            LimitStrategy::First { .. } => "first",
            LimitStrategy::Top { .. } => "top",
            LimitStrategy::LimitOffset { .. } => "limit_offset",
            LimitStrategy::OffsetFetch { .. } => "offset_fetch",
        }
    }
}

/// Identity (auto-increment) column support
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityStrategy {
    Unsupported,
    /// `<type> <clause>`, e.g. `bigint generated by default as identity`
    Generated {
        clause: String,
        select: Option<String>,
    },
    /// The column type itself is replaced (`serial`, `bigserial`)
    SerialType { select: Option<String> },
    /// `integer primary key autoincrement`, the primary key is declared inline
    RowId,
}

impl IdentityStrategy {
    pub fn is_supported(&self) -> bool {
        !matches!(self, IdentityStrategy::Unsupported)
    }

    /// Full column type for an identity column of the given base type
    pub fn column_definition(&self, type_name: &str, big: bool) -> Option<String> {
        match self {
            IdentityStrategy::Unsupported => None,
            IdentityStrategy::Generated { clause, .. } => Some(format!("{} {}", type_name, clause)),
            IdentityStrategy::SerialType { .. } => {
                Some(if big { "bigserial" } else { "serial" }.to_string())
            }
            IdentityStrategy::RowId => Some("integer primary key autoincrement".to_string()),
        }
    }

    /// Statement returning the identity value generated by the last insert
    pub fn identity_select(&self) -> Option<&str> {
        match self {
            IdentityStrategy::Generated { select, .. } | IdentityStrategy::SerialType { select } => {
                select.as_deref()
            }
            IdentityStrategy::RowId => Some("select last_insert_rowid()"),
            IdentityStrategy::Unsupported => None,
        }
    }

    /// The column definition already declares the primary key
    pub fn includes_primary_key(&self) -> bool {
        matches!(self, IdentityStrategy::RowId)
    }
}

/// How the next value of a sequence is referenced in SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextValueSyntax {
    /// `next value for seq`
    NextValueFor,
    /// `nextval('seq')`
    NextVal,
}

/// Sequence support
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStrategy {
    Unsupported,
    Supported {
        syntax: NextValueSyntax,
        pooled: bool,
    },
}

impl SequenceStrategy {
    pub fn is_supported(&self) -> bool {
        matches!(self, SequenceStrategy::Supported { .. })
    }

    pub fn supports_pooled(&self) -> bool {
        matches!(self, SequenceStrategy::Supported { pooled: true, .. })
    }

    pub fn create_sequence(&self, name: &str, start: i64, increment: i64) -> Option<String> {
        match self {
            SequenceStrategy::Unsupported => None,
            SequenceStrategy::Supported { .. } => Some(format!(
                "create sequence {} start with {} increment by {}",
                name, start, increment
            )),
        }
    }

    pub fn drop_sequence(&self, name: &str) -> Option<String> {
        match self {
            SequenceStrategy::Unsupported => None,
            SequenceStrategy::Supported { .. } => Some(format!("drop sequence {}", name)),
        }
    }

    /// Expression yielding the next value, for use inside other statements
    pub fn next_value(&self, name: &str) -> Option<String> {
        match self {
            SequenceStrategy::Unsupported => None,
            SequenceStrategy::Supported {
                syntax: NextValueSyntax::NextValueFor,
                ..
            } => Some(format!("next value for {}", name)),
            SequenceStrategy::Supported {
                syntax: NextValueSyntax::NextVal,
                ..
            } => Some(format!("nextval('{}')", name)),
        }
    }

    pub fn select_next_value(&self, name: &str) -> Option<String> {
        self.next_value(name).map(|expr| format!("select {}", expr))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporaryTableKind {
    /// Visible to the creating connection only
    Local,
    /// Declared once, rows private to each session
    Global,
    /// A regular table used as scratch space
    Persistent,
}

pub const ID_TABLE_PREFIX: &str = "HT_";
pub const ENTITY_TABLE_PREFIX: &str = "HTE_";

/// Scratch tables for multi-table mutations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporaryTableStrategy {
    pub kind: TemporaryTableKind,
    pub create_command: String,
    pub create_options: Option<String>,
    /// Prepended to every temporary table name (`session.`, `#`)
    pub name_prefix: String,
    pub drop_after_use: bool,
}

impl TemporaryTableStrategy {
    pub fn local(create_command: &str, name_prefix: &str) -> Self {
        Self {
            kind: TemporaryTableKind::Local,
            create_command: create_command.to_string(),
            create_options: None,
            name_prefix: name_prefix.to_string(),
            drop_after_use: true,
        }
    }

    pub fn global(create_command: &str, create_options: Option<&str>, name_prefix: &str) -> Self {
        Self {
            kind: TemporaryTableKind::Global,
            create_command: create_command.to_string(),
            create_options: create_options.map(str::to_string),
            name_prefix: name_prefix.to_string(),
            drop_after_use: false,
        }
    }

    pub fn id_table_name(&self, table: &str) -> String {
        format!("{}{}{}", self.name_prefix, ID_TABLE_PREFIX, table)
    }

    pub fn entity_table_name(&self, table: &str) -> String {
        format!("{}{}{}", self.name_prefix, ENTITY_TABLE_PREFIX, table)
    }

    /// `<command> <name> (<columns>) [<options>]`
    pub fn create_ddl(&self, name: &str, columns: &[String]) -> String {
        let mut ddl = format!("{} {} ({})", self.create_command, name, columns.join(", "));
        if let Some(ref options) = self.create_options {
            ddl.push(' ');
            ddl.push_str(options);
        }
        ddl
    }

    pub fn drop_ddl(&self, name: &str) -> String {
        format!("drop table {}", name)
    }
}

/// How pessimistic locks reach the SQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockRendering {
    /// Trailing `for update` / `for share` clause
    Clause,
    /// A hint after the locked table; `update` and `share` hold the hint
    /// list rendered inside `with (..)`
    TableHint { update: String, share: String },
    /// Locking only happens through updatable cursors; nothing is rendered
    Omitted,
}

/// Bind placeholder syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
    /// `?`
    #[default]
    Jdbc,
    /// `?1`, `?2`, ...
    Numbered,
    /// `$1`, `$2`, ...
    Dollar,
}

impl PlaceholderStyle {
    /// Placeholder for the 1-based parameter `index`
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            PlaceholderStyle::Jdbc => "?".to_string(),
            PlaceholderStyle::Numbered => format!("?{}", index),
            PlaceholderStyle::Dollar => format!("${}", index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_capabilities() {
        let first = LimitStrategy::First {
            offset_since: Some(DatabaseVersion::new(9, 3)),
        };
        assert!(first.supports_limit());
        assert!(!first.supports_offset());
        assert!(!first.supports_variable_limit());
        assert!(first.is_prefix());
        assert_eq!(first.offset_since(), Some(DatabaseVersion::new(9, 3)));

        let fetch = LimitStrategy::OffsetFetch {
            offset_rows_keyword: true,
            requires_order_by: true,
        };
        assert!(fetch.supports_offset());
        assert!(!fetch.is_prefix());
        assert!(!LimitStrategy::Unsupported.supports_limit());
    }

    #[test]
    fn test_identity_definitions() {
        let generated = IdentityStrategy::Generated {
            clause: "generated by default as identity".to_string(),
            select: Some("select last_identity()".to_string()),
        };
        assert_eq!(
            generated.column_definition("bigint", true).as_deref(),
            Some("bigint generated by default as identity")
        );
        assert_eq!(generated.identity_select(), Some("select last_identity()"));

        let serial = IdentityStrategy::SerialType { select: None };
        assert_eq!(serial.column_definition("bigint", true).as_deref(), Some("bigserial"));
        assert!(IdentityStrategy::RowId.includes_primary_key());
        assert_eq!(IdentityStrategy::Unsupported.column_definition("int", false), None);
    }

    #[test]
    fn test_sequence_syntax() {
        let ansi = SequenceStrategy::Supported {
            syntax: NextValueSyntax::NextValueFor,
            pooled: true,
        };
        assert_eq!(
            ansi.create_sequence("seq_person", 10, 1).as_deref(),
            Some("create sequence seq_person start with 10 increment by 1")
        );
        assert_eq!(
            ansi.select_next_value("seq_person").as_deref(),
            Some("select next value for seq_person")
        );
        let pg = SequenceStrategy::Supported {
            syntax: NextValueSyntax::NextVal,
            pooled: true,
        };
        assert_eq!(pg.next_value("s").as_deref(), Some("nextval('s')"));
        assert_eq!(SequenceStrategy::Unsupported.drop_sequence("s"), None);
    }

    #[test]
    fn test_global_temporary_table() {
        let strategy = TemporaryTableStrategy::global(
            "declare global temporary table",
            Some("on commit preserve rows with norecovery"),
            "session.",
        );
        let name = strategy.id_table_name("person");
        assert_eq!(name, "session.HT_person");
        assert_eq!(
            strategy.create_ddl(&name, &["id bigint not null".to_string()]),
            "declare global temporary table session.HT_person (id bigint not null) \
             on commit preserve rows with norecovery"
        );
        assert_eq!(strategy.entity_table_name("person"), "session.HTE_person");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(PlaceholderStyle::Jdbc.placeholder(3), "?");
        assert_eq!(PlaceholderStyle::Numbered.placeholder(3), "?3");
        assert_eq!(PlaceholderStyle::Dollar.placeholder(3), "$3");
    }
}
