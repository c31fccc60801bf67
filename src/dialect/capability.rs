//! Version-gated capability flags

use std::collections::BTreeMap;

use super::version::DatabaseVersion;

/// A boolean SQL feature a dialect may or may not support
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// `union all` between query specs
    UnionAll,
    /// Set operations inside a subquery
    UnionInSubquery,
    /// Scalar subqueries in the select list
    SubqueryInSelect,
    /// `order by` inside a subquery
    OrderByInSubquery,
    /// Subquery or tuple as the left operand of `in`
    SubselectAsInPredicateLhs,
    /// `count(distinct (a, b))`
    TupleDistinctCounts,
    /// `(a, b) = (x, y)` comparisons
    RowValueConstructorSyntax,
    /// `nulls first` / `nulls last` in sort specifications
    NullsOrdering,
    /// A boolean column type with `true`/`false` literals
    NativeBoolean,
    /// ANSI `offset .. fetch ..` or an equivalent full pagination clause
    FetchClause,
    /// `for update nowait`
    LockNoWait,
    /// `for update skip locked`
    LockSkipLocked,
    /// `select current_timestamp` without a table
    CurrentTimestampSelection,
    /// `create sequence` / `next value for`
    Sequences,
    /// Pooled (hi/lo style) sequence optimizers
    PooledSequences,
    /// Identity (auto-increment) columns
    IdentityColumns,
    /// `drop table if exists x`
    IfExistsBeforeTableName,
    /// `drop table x if exists`
    IfExistsAfterTableName,
    /// Foreign-key constraints emitted in DDL
    ForeignKeyConstraints,
    /// Native `ilike`
    CaseInsensitiveLike,
    /// Streaming LOB access through locators
    ExpectedLobUsagePattern,
    ReadCommittedCausesWritersToBlockReaders,
    RepeatableReadCausesReadersToBlockWriters,
}

impl Capability {
    pub const ALL: [Capability; 23] = [
        Capability::UnionAll,
        Capability::UnionInSubquery,
        Capability::SubqueryInSelect,
        Capability::OrderByInSubquery,
        Capability::SubselectAsInPredicateLhs,
        Capability::TupleDistinctCounts,
        Capability::RowValueConstructorSyntax,
        Capability::NullsOrdering,
        Capability::NativeBoolean,
        Capability::FetchClause,
        Capability::LockNoWait,
        Capability::LockSkipLocked,
        Capability::CurrentTimestampSelection,
        Capability::Sequences,
        Capability::PooledSequences,
        Capability::IdentityColumns,
        Capability::IfExistsBeforeTableName,
        Capability::IfExistsAfterTableName,
        Capability::ForeignKeyConstraints,
        Capability::CaseInsensitiveLike,
        Capability::ExpectedLobUsagePattern,
        Capability::ReadCommittedCausesWritersToBlockReaders,
        Capability::RepeatableReadCausesReadersToBlockWriters,
    ];

    /// Stable property name, used in settings files and diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Capability::UnionAll => "supports_union_all",
            Capability::UnionInSubquery => "supports_union_in_subquery",
            Capability::SubqueryInSelect => "supports_subquery_in_select",
            Capability::OrderByInSubquery => "supports_order_by_in_subquery",
            Capability::SubselectAsInPredicateLhs => "supports_subselect_as_in_predicate_lhs",
            Capability::TupleDistinctCounts => "supports_tuple_distinct_counts",
            Capability::RowValueConstructorSyntax => "supports_row_value_constructor_syntax",
            Capability::NullsOrdering => "supports_nulls_ordering",
            Capability::NativeBoolean => "supports_native_boolean",
            Capability::FetchClause => "supports_fetch_clause",
            Capability::LockNoWait => "supports_lock_nowait",
            Capability::LockSkipLocked => "supports_lock_skip_locked",
            Capability::CurrentTimestampSelection => "supports_current_timestamp_selection",
            Capability::Sequences => "supports_sequences",
            Capability::PooledSequences => "supports_pooled_sequences",
            Capability::IdentityColumns => "supports_identity_columns",
            Capability::IfExistsBeforeTableName => "supports_if_exists_before_table_name",
            Capability::IfExistsAfterTableName => "supports_if_exists_after_table_name",
            Capability::ForeignKeyConstraints => "supports_foreign_key_constraints",
            Capability::CaseInsensitiveLike => "supports_case_insensitive_like",
            Capability::ExpectedLobUsagePattern => "supports_expected_lob_usage_pattern",
            Capability::ReadCommittedCausesWritersToBlockReaders => {
                "read_committed_causes_writers_to_block_readers"
            }
            Capability::RepeatableReadCausesReadersToBlockWriters => {
                "repeatable_read_causes_readers_to_block_writers"
            }
        }
    }

    pub fn from_name(name: &str) -> Option<Capability> {
        Capability::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// When a capability applies, as a function of the product version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Always,
    Never,
    Since(DatabaseVersion),
    Before(DatabaseVersion),
}

impl Gate {
    pub fn since(version: impl Into<DatabaseVersion>) -> Self {
        Gate::Since(version.into())
    }

    pub fn before(version: impl Into<DatabaseVersion>) -> Self {
        Gate::Before(version.into())
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            Gate::Always
        } else {
            Gate::Never
        }
    }

    pub fn admits(&self, version: DatabaseVersion) -> bool {
        match self {
            Gate::Always => true,
            Gate::Never => false,
            Gate::Since(v) => version.is_since(*v),
            Gate::Before(v) => version.is_before(*v),
        }
    }
}

/// How a dialect handles time zones in temporal values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeZoneSupport {
    /// Offsets are not stored
    None,
    /// `timestamp with time zone` is stored as-is
    Native,
    /// Values are normalized to UTC before storage
    Normalize,
}

/// Capability flags of one dialect, resolved against one version
#[derive(Debug, Clone)]
pub struct CapabilityProfile {
    version: DatabaseVersion,
    gates: BTreeMap<Capability, Gate>,
}

impl CapabilityProfile {
    pub fn new(version: DatabaseVersion) -> Self {
        Self {
            version,
            gates: BTreeMap::new(),
        }
    }

    pub fn version(&self) -> DatabaseVersion {
        self.version
    }

    /// Set (or override) the gate of a capability
    pub fn set(&mut self, capability: Capability, gate: Gate) {
        self.gates.insert(capability, gate);
    }

    pub fn gate(&self, capability: Capability) -> Gate {
        self.gates.get(&capability).copied().unwrap_or(Gate::Never)
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.gate(capability).admits(self.version)
    }

    /// The first version supporting a capability, if it is gated by version
    pub fn minimum_version(&self, capability: Capability) -> Option<DatabaseVersion> {
        match self.gate(capability) {
            Gate::Since(v) => Some(v),
            _ => None,
        }
    }

    /// All capabilities with their resolved value, in declaration order
    pub fn resolved(&self) -> impl Iterator<Item = (Capability, bool)> + '_ {
        Capability::ALL
            .into_iter()
            .map(move |c| (c, self.supports(c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_resolution() {
        let mut profile = CapabilityProfile::new(DatabaseVersion::new(9, 2));
        profile.set(Capability::UnionAll, Gate::since((9, 3)));
        profile.set(Capability::NativeBoolean, Gate::since(10));
        profile.set(Capability::OrderByInSubquery, Gate::Never);
        profile.set(Capability::NullsOrdering, Gate::Always);

        assert!(!profile.supports(Capability::UnionAll));
        assert!(!profile.supports(Capability::NativeBoolean));
        assert!(!profile.supports(Capability::OrderByInSubquery));
        assert!(profile.supports(Capability::NullsOrdering));
        assert_eq!(
            profile.minimum_version(Capability::UnionAll),
            Some(DatabaseVersion::new(9, 3))
        );
        assert_eq!(profile.minimum_version(Capability::OrderByInSubquery), None);
    }

    #[test]
    fn test_unset_capability_is_unsupported() {
        let profile = CapabilityProfile::new(DatabaseVersion::new(1, 0));
        assert!(!profile.supports(Capability::Sequences));
    }

    #[test]
    fn test_since_and_before_partition_versions() {
        let threshold = DatabaseVersion::new(9, 3);
        for (major, minor) in [(8, 9), (9, 2), (9, 3), (9, 4), (10, 0)] {
            let v = DatabaseVersion::new(major, minor);
            let since = Gate::Since(threshold).admits(v);
            let before = Gate::Before(threshold).admits(v);
            assert!(since ^ before);
        }
    }

    #[test]
    fn test_names_round_trip() {
        for c in Capability::ALL {
            assert_eq!(Capability::from_name(c.name()), Some(c));
        }
    }
}
