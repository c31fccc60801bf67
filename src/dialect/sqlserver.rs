//! Microsoft SQL Server 2005 and later (version 9+)

use super::capability::{Capability, Gate, TimeZoneSupport};
use super::column_types::SqlType;
use super::strategy::{
    IdentityStrategy, LimitStrategy, LockRendering, NextValueSyntax, SequenceStrategy,
    TemporaryTableStrategy,
};
use super::temporal::{TemporalUnit, TimestampArithmetic};
use super::version::DatabaseVersion;
use super::DialectBuilder;

const MAX_VARCHAR_LENGTH: u64 = 8_000;
const MAX_NVARCHAR_LENGTH: u64 = 4_000;

pub(crate) fn configure(builder: &mut DialectBuilder) {
    let version = builder.version();
    // 2012
    let v11 = DatabaseVersion::new(11, 0);

    builder
        .capability(Capability::NativeBoolean, Gate::Never)
        .capability(Capability::RowValueConstructorSyntax, Gate::Never)
        .capability(Capability::NullsOrdering, Gate::Never)
        .capability(Capability::TupleDistinctCounts, Gate::Never)
        .capability(Capability::FetchClause, Gate::Since(v11))
        .capability(Capability::LockNoWait, Gate::Always)
        .capability(Capability::LockSkipLocked, Gate::Always)
        .capability(Capability::CurrentTimestampSelection, Gate::Always)
        .capability(Capability::Sequences, Gate::Since(v11))
        .capability(Capability::PooledSequences, Gate::Since(v11))
        .capability(Capability::IdentityColumns, Gate::Always)
        .capability(Capability::IfExistsBeforeTableName, Gate::since(13))
        .capability(Capability::ReadCommittedCausesWritersToBlockReaders, Gate::Always)
        .capability(Capability::RepeatableReadCausesReadersToBlockWriters, Gate::Always);

    builder
        .column_type(SqlType::Boolean, None, "bit")
        .column_type(SqlType::TinyInt, None, "smallint")
        .column_type(SqlType::Double, None, "float")
        .column_type(SqlType::Varchar, Some(MAX_VARCHAR_LENGTH), "varchar($l)")
        .column_type(SqlType::Varchar, None, "varchar(max)")
        .column_type(SqlType::NVarchar, Some(MAX_NVARCHAR_LENGTH), "nvarchar($l)")
        .column_type(SqlType::NVarchar, None, "nvarchar(max)")
        .column_type(SqlType::Varbinary, Some(MAX_VARCHAR_LENGTH), "varbinary($l)")
        .column_type(SqlType::Varbinary, None, "varbinary(max)")
        .column_type(SqlType::LongVarchar, None, "varchar(max)")
        .column_type(SqlType::LongNVarchar, None, "nvarchar(max)")
        .column_type(SqlType::LongVarbinary, None, "varbinary(max)")
        .column_type(SqlType::Blob, None, "varbinary(max)")
        .column_type(SqlType::Clob, None, "varchar(max)")
        .column_type(SqlType::NClob, None, "nvarchar(max)")
        .column_type(SqlType::Uuid, None, "uniqueidentifier");

    if version.is_since(10) {
        builder
            .column_type(SqlType::Timestamp, None, "datetime2($p)")
            .column_type(SqlType::TimestampWithTimeZone, None, "datetimeoffset($p)");
    } else {
        builder
            .column_type(SqlType::Date, None, "datetime")
            .column_type(SqlType::Time, None, "datetime")
            .column_type(SqlType::Timestamp, None, "datetime")
            .column_type(SqlType::TimestampWithTimeZone, None, "datetime");
    }

    let functions = builder.functions();
    if version.is_since(v11) {
        functions.register_named("concat", 2, None, Some(SqlType::Varchar));
    } else {
        functions.register_infix("concat", "+", 1, Some(SqlType::Varchar));
    }
    functions.register_alias("length", "len", 1, Some(1), Some(SqlType::Integer));
    functions.register_named("substring", 3, Some(3), Some(SqlType::Varchar));
    functions.register_named("ascii", 1, Some(1), Some(SqlType::Integer));
    functions.register_named("char", 1, Some(1), Some(SqlType::Char));
    functions.register_named("soundex", 1, Some(1), Some(SqlType::Varchar));
    functions.register_named("rand", 0, Some(1), Some(SqlType::Double));
    functions.register_named("replicate", 2, Some(2), Some(SqlType::Varchar));
    functions.register_alias("repeat", "replicate", 2, Some(2), Some(SqlType::Varchar));
    functions.register_pattern("mod", "(?1%?2)", Some(SqlType::Integer));
    functions.register_pattern("position", "charindex(?1,?2)", Some(SqlType::Integer));
    functions.register_binary_ternary_pattern(
        "locate",
        Some(SqlType::Integer),
        "charindex(?1,?2)",
        "charindex(?1,?2,?3)",
    );
    functions.register_pattern("extract", "datepart(?1,?2)", Some(SqlType::Integer));
    functions.register_pattern("current_date", "convert(date, getdate())", Some(SqlType::Date));
    functions.register_pattern("format", "format(?1,?2)", Some(SqlType::Varchar));
    functions.register_pattern("bitand", "(?1&?2)", Some(SqlType::Integer));
    functions.register_pattern("bitor", "(?1|?2)", Some(SqlType::Integer));
    functions.register_pattern("bitxor", "(?1^?2)", Some(SqlType::Integer));
    functions.register_pattern("bitnot", "(~?1)", Some(SqlType::Integer));

    builder.limit_strategy(if version.is_since(v11) {
        LimitStrategy::OffsetFetch {
            offset_rows_keyword: true,
            requires_order_by: true,
        }
    } else {
        LimitStrategy::Top {
            offset_since: Some(v11),
        }
    });
    builder.identity_strategy(IdentityStrategy::Generated {
        clause: "identity not null".to_string(),
        select: Some("select scope_identity()".to_string()),
    });
    builder.sequence_strategy(if version.is_since(v11) {
        SequenceStrategy::Supported {
            syntax: NextValueSyntax::NextValueFor,
            pooled: true,
        }
    } else {
        SequenceStrategy::Unsupported
    });
    builder.temporary_table_strategy(TemporaryTableStrategy::local("create table", "#"));

    let rules = builder.rules();
    rules.open_quote = '[';
    rules.close_quote = ']';
    rules.lock_rendering = LockRendering::TableHint {
        update: "updlock, rowlock".to_string(),
        share: "holdlock, rowlock".to_string(),
    };
    rules.nowait = ", nowait".to_string();
    rules.skip_locked = ", readpast".to_string();
    rules.select_guid = Some("select newid()".to_string());
    rules.current_timestamp_select = Some("select current_timestamp".to_string());
    if version.is_since(v11) {
        rules.query_sequences = Some("select name from sys.sequences".to_string());
    }
    rules.preferred_boolean_type = SqlType::Bit;
    rules.time_zone_support = if version.is_since(10) {
        TimeZoneSupport::Native
    } else {
        TimeZoneSupport::None
    };
    rules.timestamp_arithmetic = TimestampArithmetic::Patterns {
        add: "dateadd(?1,?2,?3)".to_string(),
        diff: "datediff(?1,?2,?3)".to_string(),
    };
    for (unit, field) in [
        (TemporalUnit::DayOfWeek, "weekday"),
        (TemporalUnit::DayOfYear, "dayofyear"),
        (TemporalUnit::Nanosecond, "nanosecond"),
    ] {
        rules.extract_fields.insert(unit, field.to_string());
    }
}

#[cfg(test)]
mod tests {
    use crate::dialect::column_types::SqlType;
    use crate::dialect::strategy::LimitStrategy;
    use crate::dialect::Dialect;

    #[test]
    fn test_limit_strategy_by_version() {
        let v10 = Dialect::resolve("sqlserver", (10, 50)).unwrap();
        assert!(matches!(v10.limit_strategy(), LimitStrategy::Top { .. }));
        let v11 = Dialect::resolve("sqlserver", 11).unwrap();
        assert!(matches!(
            v11.limit_strategy(),
            LimitStrategy::OffsetFetch {
                requires_order_by: true,
                ..
            }
        ));
    }

    #[test]
    fn test_concat_by_version() {
        let v10 = Dialect::resolve("mssql", 10).unwrap();
        assert_eq!(
            v10.function_template_for("concat").unwrap().render(&["a", "b"]).unwrap(),
            "(a+b)"
        );
        let v11 = Dialect::resolve("mssql", 11).unwrap();
        assert_eq!(
            v11.function_template_for("concat").unwrap().render(&["a", "b"]).unwrap(),
            "concat(a, b)"
        );
    }

    #[test]
    fn test_max_types() {
        let dialect = Dialect::resolve("sqlserver", 16).unwrap();
        assert_eq!(
            dialect.column_type_for(SqlType::NVarchar, Some(4_001), None, None).unwrap(),
            "nvarchar(max)"
        );
        assert_eq!(
            dialect.column_type_for(SqlType::Timestamp, None, Some(3), None).unwrap(),
            "datetime2(3)"
        );
    }
}
