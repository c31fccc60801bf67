//! Ingres 9.2 through 10.x

use super::capability::{Capability, Gate, TimeZoneSupport};
use super::column_types::SqlType;
use super::strategy::{
    IdentityStrategy, LimitStrategy, LockRendering, NextValueSyntax, SequenceStrategy,
    TemporaryTableStrategy,
};
use super::temporal::{DatetimeFormatStyle, TemporalUnit, TimestampArithmetic};
use super::version::DatabaseVersion;
use super::DialectBuilder;

const MAX_INLINE_LENGTH: u64 = 32_000;

pub(crate) fn configure(builder: &mut DialectBuilder) {
    let version = builder.version();

    capabilities(builder);
    column_types(builder, version);
    functions(builder);

    builder.limit_strategy(if version.is_before((9, 3)) {
        LimitStrategy::First {
            offset_since: Some(DatabaseVersion::new(9, 3)),
        }
    } else {
        LimitStrategy::OffsetFetch {
            offset_rows_keyword: false,
            requires_order_by: false,
        }
    });

    builder.identity_strategy(if version.is_since(10) {
        IdentityStrategy::Generated {
            clause: "generated by default as identity".to_string(),
            select: Some("select last_identity()".to_string()),
        }
    } else if version.is_since((9, 3)) {
        IdentityStrategy::Generated {
            clause: "not null generated by default as identity".to_string(),
            select: Some("select last_identity()".to_string()),
        }
    } else {
        IdentityStrategy::Unsupported
    });

    builder.sequence_strategy(SequenceStrategy::Supported {
        syntax: NextValueSyntax::NextValueFor,
        pooled: version.is_since((9, 3)),
    });

    builder.temporary_table_strategy(TemporaryTableStrategy::global(
        "declare global temporary table",
        Some("on commit preserve rows with norecovery"),
        "session.",
    ));

    if version.is_before(10) {
        builder.default_property("query.substitutions", "true=1,false=0");
    }
    builder.default_property("use_get_generated_keys", "false");

    let rules = builder.rules();
    rules.lock_rendering = LockRendering::Omitted;
    rules.for_update = String::new();
    rules.null_column_string = " with null".to_string();
    rules.lowercase_function = "lowercase".to_string();
    rules.select_guid = Some("select uuid_to_char(uuid_create())".to_string());
    rules.current_timestamp_select = Some("select current_timestamp".to_string());
    rules.query_sequences = Some(
        if version.is_before((9, 3)) {
            "select seq_name from iisequence"
        } else {
            "select seq_name from iisequences"
        }
        .to_string(),
    );
    rules.datetime_format = DatetimeFormatStyle::MySql;
    rules.time_zone_support = TimeZoneSupport::Native;
    rules.drop_constraints = false;
    rules.default_precision = 39;
    rules.preferred_boolean_type = if version.is_before(10) {
        SqlType::TinyInt
    } else {
        SqlType::Boolean
    };
    rules.timestamp_arithmetic = TimestampArithmetic::Patterns {
        add: "timestampadd(?1,?2,?3)".to_string(),
        diff: "timestampdiff(?1,?2,?3)".to_string(),
    };
    for (unit, field) in [
        (TemporalUnit::DayOfMonth, "day"),
        (TemporalUnit::DayOfYear, "doy"),
        (TemporalUnit::DayOfWeek, "dow"),
        (TemporalUnit::Week, "iso_week"),
    ] {
        rules.extract_fields.insert(unit, field.to_string());
    }
}

fn capabilities(builder: &mut DialectBuilder) {
    builder
        .capability(Capability::NativeBoolean, Gate::since(10))
        .capability(Capability::UnionAll, Gate::since((9, 3)))
        .capability(Capability::UnionInSubquery, Gate::Never)
        .capability(Capability::SubqueryInSelect, Gate::since(10))
        .capability(Capability::OrderByInSubquery, Gate::Never)
        .capability(Capability::SubselectAsInPredicateLhs, Gate::Never)
        .capability(Capability::TupleDistinctCounts, Gate::Never)
        .capability(Capability::RowValueConstructorSyntax, Gate::Never)
        .capability(Capability::NullsOrdering, Gate::Never)
        .capability(Capability::ExpectedLobUsagePattern, Gate::Never)
        .capability(Capability::FetchClause, Gate::since((9, 3)))
        .capability(Capability::CurrentTimestampSelection, Gate::since((9, 3)))
        .capability(Capability::Sequences, Gate::Always)
        .capability(Capability::PooledSequences, Gate::since((9, 3)))
        .capability(Capability::IdentityColumns, Gate::since((9, 3)))
        .capability(
            Capability::ReadCommittedCausesWritersToBlockReaders,
            Gate::since((9, 3)),
        )
        .capability(
            Capability::RepeatableReadCausesReadersToBlockWriters,
            Gate::since((9, 3)),
        );
}

fn column_types(builder: &mut DialectBuilder, version: DatabaseVersion) {
    let boolean = if version.is_before(10) { "tinyint" } else { "boolean" };
    builder
        .column_type(SqlType::Bit, None, "tinyint")
        .column_type(SqlType::Boolean, None, boolean)
        .column_type(SqlType::Real, None, "real")
        .column_type(SqlType::Float, None, "float")
        .column_type(SqlType::Double, None, "float")
        .column_type(SqlType::Numeric, None, "decimal($p, $s)")
        .column_type(SqlType::Decimal, None, "decimal($p, $s)")
        .column_type(SqlType::Varbinary, Some(MAX_INLINE_LENGTH), "varbyte($l)")
        .column_type(SqlType::Varbinary, None, "long byte($l)")
        .column_type(SqlType::LongVarbinary, None, "long byte")
        .column_type(SqlType::Varchar, Some(MAX_INLINE_LENGTH), "varchar($l)")
        .column_type(SqlType::Varchar, None, "long varchar($l)")
        .column_type(SqlType::LongVarchar, None, "long varchar")
        .column_type(SqlType::NVarchar, Some(MAX_INLINE_LENGTH), "nvarchar($l)")
        .column_type(SqlType::NVarchar, None, "long nvarchar($l)")
        .column_type(SqlType::LongNVarchar, None, "long nvarchar")
        .column_type(SqlType::Timestamp, None, "timestamp($p)")
        .column_type(SqlType::TimestampWithTimeZone, None, "timestamp($p) with time zone");

    // `date` is the legacy Ingres date before 9.3
    if version.is_since((9, 3)) {
        builder.column_type(SqlType::Date, None, "ansidate");
    }

    // Fixed-length columns have no long fallback
    for (code, template) in [
        (SqlType::Binary, "byte($l)"),
        (SqlType::Char, "char($l)"),
        (SqlType::NChar, "nchar($l)"),
    ] {
        builder.column_types.unregister(code);
        builder.column_type(code, Some(MAX_INLINE_LENGTH), template);
    }
}

fn functions(builder: &mut DialectBuilder) {
    let mut common = builder.common_functions();
    common.log();
    common.rand();
    common.soundex();
    common.octet_length();
    common.bit_length_pattern("octet_length(hex(?1))*4");
    common.repeat();
    common.trim2();
    common.trunc();
    common.truncate();
    common.initcap();
    common.year_month_day();
    common.hour_minute_second();
    common.dayofweek_month_year();
    common.week_quarter();
    common.last_day();
    common.concat_pipe_operator();
    common.substr();
    common.months_between();
    common.substring_substr();
    common.ascii();
    common.char_chr();
    common.sysdate();
    common.position();
    common.format_date_format();
    common.date_trunc();
    common.bitand_or_xor_not();

    let functions = builder.functions();
    functions.register_binary_ternary_pattern(
        "locate",
        Some(SqlType::Integer),
        "position(?1 in ?2)",
        "(position(?1 in substring(?2 from ?3))+(?3)-1)",
    );
    functions.register_pattern("extract", "date_part('?1',?2)", Some(SqlType::Integer));
    functions.register_named("squeeze", 1, Some(1), Some(SqlType::Varchar));
}
