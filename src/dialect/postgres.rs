//! PostgreSQL

use super::capability::{Capability, Gate, TimeZoneSupport};
use super::column_types::SqlType;
use super::strategy::{
    IdentityStrategy, LimitStrategy, NextValueSyntax, PlaceholderStyle, SequenceStrategy,
    TemporaryTableStrategy,
};
use super::temporal::{DatetimeFormatStyle, TemporalUnit, TimestampArithmetic};
use super::DialectBuilder;

pub(crate) fn configure(builder: &mut DialectBuilder) {
    let version = builder.version();

    builder
        .capability(Capability::LockNoWait, Gate::since((8, 1)))
        .capability(Capability::LockSkipLocked, Gate::since((9, 5)))
        .capability(Capability::CurrentTimestampSelection, Gate::Always)
        .capability(Capability::Sequences, Gate::Always)
        .capability(Capability::PooledSequences, Gate::Always)
        .capability(Capability::IdentityColumns, Gate::Always)
        .capability(Capability::IfExistsBeforeTableName, Gate::Always)
        .capability(Capability::CaseInsensitiveLike, Gate::Always);

    builder
        .column_type(SqlType::Bit, None, "boolean")
        .column_type(SqlType::TinyInt, None, "smallint")
        .column_type(SqlType::Float, None, "float($p)")
        .column_type(SqlType::Double, None, "float8")
        .column_type(SqlType::NChar, None, "char($l)")
        .column_type(SqlType::NVarchar, None, "varchar($l)")
        .column_type(SqlType::LongVarchar, None, "text")
        .column_type(SqlType::LongNVarchar, None, "text")
        .column_type(SqlType::Binary, None, "bytea")
        .column_type(SqlType::Varbinary, None, "bytea")
        .column_type(SqlType::LongVarbinary, None, "bytea")
        .column_type(SqlType::Blob, None, "bytea")
        .column_type(SqlType::Clob, None, "text")
        .column_type(SqlType::NClob, None, "text")
        .column_type(SqlType::Uuid, None, "uuid");

    let mut common = builder.common_functions();
    common.log();
    common.repeat();
    common.trim2();
    common.trunc();
    common.initcap();
    common.concat_pipe_operator();
    common.substr();
    common.ascii();
    common.char_chr();
    common.position();
    common.date_trunc();
    common.octet_length();

    let functions = builder.functions();
    functions.register_named("random", 0, Some(0), Some(SqlType::Double));
    functions.register_named("bit_length", 1, Some(1), Some(SqlType::Integer));
    functions.register_binary_ternary_pattern(
        "locate",
        Some(SqlType::Integer),
        "position(?1 in ?2)",
        "(position(?1 in substring(?2 from ?3))+(?3)-1)",
    );
    functions.register_pattern("format", "to_char(?1,?2)", Some(SqlType::Varchar));
    functions.register_pattern("bitand", "(?1&?2)", Some(SqlType::Integer));
    functions.register_pattern("bitor", "(?1|?2)", Some(SqlType::Integer));
    functions.register_pattern("bitxor", "(?1#?2)", Some(SqlType::Integer));
    functions.register_pattern("bitnot", "(~?1)", Some(SqlType::Integer));

    builder.limit_strategy(LimitStrategy::LimitOffset { max_rows: None });

    builder.identity_strategy(if version.is_since(10) {
        IdentityStrategy::Generated {
            clause: "generated by default as identity".to_string(),
            select: Some("select lastval()".to_string()),
        }
    } else {
        IdentityStrategy::SerialType {
            select: Some("select lastval()".to_string()),
        }
    });

    builder.sequence_strategy(SequenceStrategy::Supported {
        syntax: NextValueSyntax::NextVal,
        pooled: true,
    });

    let mut temporary = TemporaryTableStrategy::local("create temporary table", "");
    temporary.create_options = Some("on commit drop".to_string());
    builder.temporary_table_strategy(temporary);

    builder.placeholder_style(PlaceholderStyle::Dollar);

    let rules = builder.rules();
    rules.select_guid = Some("select gen_random_uuid()".to_string());
    rules.current_timestamp_select = Some("select now()".to_string());
    rules.query_sequences =
        Some("select relname from pg_catalog.pg_class where relkind = 'S'".to_string());
    rules.datetime_format = DatetimeFormatStyle::Postgres;
    rules.time_zone_support = TimeZoneSupport::Normalize;
    rules.timestamp_arithmetic = TimestampArithmetic::Interval;
    rules
        .extract_fields
        .insert(TemporalUnit::DayOfYear, "doy".to_string());
    // `dow` counts from 0 on Sunday
    rules
        .extract_patterns
        .insert(TemporalUnit::DayOfWeek, "(extract(dow from ?2)+1)".to_string());
}
