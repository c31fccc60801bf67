//! SQLite 3

use super::capability::{Capability, Gate};
use super::column_types::SqlType;
use super::strategy::{
    IdentityStrategy, LimitStrategy, LockRendering, PlaceholderStyle, SequenceStrategy,
    TemporaryTableStrategy,
};
use super::temporal::{DatetimeFormatStyle, TemporalUnit, TimestampArithmetic};
use super::DialectBuilder;

pub(crate) fn configure(builder: &mut DialectBuilder) {
    builder
        .capability(Capability::NativeBoolean, Gate::since((3, 23)))
        .capability(Capability::RowValueConstructorSyntax, Gate::since((3, 15)))
        .capability(Capability::NullsOrdering, Gate::since((3, 30)))
        .capability(Capability::TupleDistinctCounts, Gate::Never)
        .capability(Capability::CurrentTimestampSelection, Gate::Always)
        .capability(Capability::IdentityColumns, Gate::Always)
        .capability(Capability::IfExistsBeforeTableName, Gate::Always)
        .capability(Capability::ExpectedLobUsagePattern, Gate::Never)
        // no `alter table ... add constraint`
        .capability(Capability::ForeignKeyConstraints, Gate::Never);

    builder
        .column_type(SqlType::Double, None, "double")
        .column_type(SqlType::Float, None, "float")
        .column_type(SqlType::LongVarchar, None, "text")
        .column_type(SqlType::LongNVarchar, None, "text")
        .column_type(SqlType::Binary, None, "blob")
        .column_type(SqlType::Varbinary, None, "blob")
        .column_type(SqlType::LongVarbinary, None, "blob")
        .column_type(SqlType::Clob, None, "text")
        .column_type(SqlType::NClob, None, "text")
        .column_type(SqlType::Timestamp, None, "timestamp")
        .column_type(SqlType::TimestampWithTimeZone, None, "timestamp");

    let mut common = builder.common_functions();
    common.trim2();
    common.substr();
    common.concat_pipe_operator();

    let functions = builder.functions();
    functions.register_named("random", 0, Some(0), Some(SqlType::BigInt));
    functions.register_named("char", 1, None, Some(SqlType::Varchar));
    functions.register_named("round", 1, Some(2), None);
    functions.register_pattern("mod", "(?1%?2)", Some(SqlType::Integer));
    functions.register_pattern("position", "instr(?2,?1)", Some(SqlType::Integer));
    functions.register_binary_ternary_pattern(
        "locate",
        Some(SqlType::Integer),
        "instr(?2,?1)",
        "(case instr(substr(?2,?3),?1) when 0 then 0 else instr(substr(?2,?3),?1)+(?3)-1 end)",
    );
    functions.register_pattern("format", "strftime(?2,?1)", Some(SqlType::Varchar));
    functions.register_pattern("bitand", "(?1&?2)", Some(SqlType::Integer));
    functions.register_pattern("bitor", "(?1|?2)", Some(SqlType::Integer));
    functions.register_pattern("bitnot", "(~?1)", Some(SqlType::Integer));

    builder.limit_strategy(LimitStrategy::LimitOffset {
        max_rows: Some("-1".to_string()),
    });
    builder.identity_strategy(IdentityStrategy::RowId);
    builder.sequence_strategy(SequenceStrategy::Unsupported);
    builder.temporary_table_strategy(TemporaryTableStrategy::local("create temporary table", ""));
    builder.placeholder_style(PlaceholderStyle::Numbered);

    let rules = builder.rules();
    // Writers lock the whole database file; there is no row lock syntax
    rules.lock_rendering = LockRendering::Omitted;
    rules.for_update = String::new();
    rules.select_guid = Some("select lower(hex(randomblob(16)))".to_string());
    rules.current_timestamp_select = Some("select current_timestamp".to_string());
    rules.datetime_format = DatetimeFormatStyle::Sqlite;
    rules.timestamp_arithmetic = TimestampArithmetic::JulianDay;
    for (unit, specifier) in [
        (TemporalUnit::Year, "%Y"),
        (TemporalUnit::Month, "%m"),
        (TemporalUnit::Day, "%d"),
        (TemporalUnit::DayOfMonth, "%d"),
        (TemporalUnit::DayOfYear, "%j"),
        (TemporalUnit::Week, "%W"),
        (TemporalUnit::Hour, "%H"),
        (TemporalUnit::Minute, "%M"),
        (TemporalUnit::Second, "%S"),
        (TemporalUnit::Epoch, "%s"),
    ] {
        rules.extract_patterns.insert(
            unit,
            format!("cast(strftime('{}',?2) as integer)", specifier),
        );
    }
    rules.extract_patterns.insert(
        TemporalUnit::DayOfWeek,
        "(cast(strftime('%w',?2) as integer)+1)".to_string(),
    );
    rules.extract_patterns.insert(
        TemporalUnit::Quarter,
        "((cast(strftime('%m',?2) as integer)+2)/3)".to_string(),
    );
}

#[cfg(test)]
mod tests {
    use crate::dialect::capability::Capability;
    use crate::dialect::Dialect;

    #[test]
    fn test_boolean_literals_by_version() {
        let old = Dialect::resolve("sqlite", (3, 22)).unwrap();
        assert_eq!(old.boolean_literal(true), "1");
        let new = Dialect::resolve("sqlite", (3, 23)).unwrap();
        assert_eq!(new.boolean_literal(true), "true");
    }

    #[test]
    fn test_row_values_by_version() {
        let old = Dialect::resolve("sqlite3", (3, 14)).unwrap();
        assert!(!old.supports(Capability::RowValueConstructorSyntax));
        let new = Dialect::resolve("sqlite3", (3, 15)).unwrap();
        assert!(new.supports(Capability::RowValueConstructorSyntax));
    }

    #[test]
    fn test_locate_patterns() {
        let dialect = Dialect::resolve("sqlite", (3, 45)).unwrap();
        let locate = dialect.function_template_for("locate").unwrap();
        assert_eq!(locate.render(&["'b'", "'abc'"]).unwrap(), "instr('abc','b')");
    }
}
