//! MySQL and MariaDB

use super::capability::{Capability, Gate, TimeZoneSupport};
use super::column_types::SqlType;
use super::strategy::{IdentityStrategy, LimitStrategy, SequenceStrategy, TemporaryTableStrategy};
use super::temporal::{DatetimeFormatStyle, TemporalUnit, TimestampArithmetic};
use super::DialectBuilder;

const MAX_VARCHAR_LENGTH: u64 = 65_535;

pub(crate) fn configure(builder: &mut DialectBuilder) {
    let version = builder.version();

    builder
        .capability(Capability::NullsOrdering, Gate::Never)
        .capability(Capability::LockNoWait, Gate::since(8))
        .capability(Capability::LockSkipLocked, Gate::since(8))
        .capability(Capability::CurrentTimestampSelection, Gate::Always)
        .capability(Capability::IdentityColumns, Gate::Always)
        .capability(Capability::IfExistsBeforeTableName, Gate::Always);

    builder
        .column_type(SqlType::Boolean, None, "bit")
        .column_type(SqlType::Double, None, "double precision")
        .column_type(SqlType::Timestamp, None, "datetime($p)")
        .column_type(SqlType::TimestampWithTimeZone, None, "timestamp($p)")
        .column_type(SqlType::NChar, None, "char($l)")
        .column_type(SqlType::Varchar, Some(MAX_VARCHAR_LENGTH), "varchar($l)")
        .column_type(SqlType::Varchar, None, "longtext")
        .column_type(SqlType::NVarchar, Some(MAX_VARCHAR_LENGTH), "varchar($l)")
        .column_type(SqlType::NVarchar, None, "longtext")
        .column_type(SqlType::Varbinary, Some(MAX_VARCHAR_LENGTH), "varbinary($l)")
        .column_type(SqlType::Varbinary, None, "longblob")
        .column_type(SqlType::LongVarchar, None, "longtext")
        .column_type(SqlType::LongNVarchar, None, "longtext")
        .column_type(SqlType::LongVarbinary, None, "longblob")
        .column_type(SqlType::Blob, None, "longblob")
        .column_type(SqlType::Clob, None, "longtext")
        .column_type(SqlType::NClob, None, "longtext")
        .column_type(SqlType::Uuid, None, "binary(16)");

    let mut common = builder.common_functions();
    common.log();
    common.rand();
    common.soundex();
    common.octet_length();
    common.repeat();
    common.trim2();
    common.truncate();
    common.year_month_day();
    common.hour_minute_second();
    common.dayofweek_month_year();
    common.week_quarter();
    common.last_day();
    common.substr();
    common.ascii();
    common.position();
    common.format_date_format();

    let functions = builder.functions();
    functions.register_named("concat", 1, None, Some(SqlType::Varchar));
    functions.register_named("locate", 2, Some(3), Some(SqlType::Integer));
    functions.register_named("bit_length", 1, Some(1), Some(SqlType::Integer));
    functions.register_named("char", 1, None, Some(SqlType::Char));
    functions.register_pattern("bitand", "(?1&?2)", Some(SqlType::Integer));
    functions.register_pattern("bitor", "(?1|?2)", Some(SqlType::Integer));
    functions.register_pattern("bitxor", "(?1^?2)", Some(SqlType::Integer));
    functions.register_pattern("bitnot", "(~?1)", Some(SqlType::Integer));

    builder.limit_strategy(LimitStrategy::LimitOffset {
        max_rows: Some("18446744073709551615".to_string()),
    });
    builder.identity_strategy(IdentityStrategy::Generated {
        clause: "not null auto_increment".to_string(),
        select: Some("select last_insert_id()".to_string()),
    });
    builder.sequence_strategy(SequenceStrategy::Unsupported);
    builder.temporary_table_strategy(TemporaryTableStrategy::local(
        "create temporary table if not exists",
        "",
    ));

    let rules = builder.rules();
    rules.open_quote = '`';
    rules.close_quote = '`';
    if version.is_before(8) {
        rules.for_share = " lock in share mode".to_string();
    }
    rules.select_guid = Some("select uuid()".to_string());
    rules.current_timestamp_select = Some("select now()".to_string());
    rules.datetime_format = DatetimeFormatStyle::MySql;
    rules.time_zone_support = TimeZoneSupport::Normalize;
    rules.preferred_boolean_type = SqlType::Bit;
    rules.timestamp_arithmetic = TimestampArithmetic::Patterns {
        add: "timestampadd(?1, ?2, ?3)".to_string(),
        diff: "timestampdiff(?1, ?2, ?3)".to_string(),
    };
    for (unit, pattern) in [
        (TemporalUnit::DayOfWeek, "dayofweek(?2)"),
        (TemporalUnit::DayOfMonth, "dayofmonth(?2)"),
        (TemporalUnit::DayOfYear, "dayofyear(?2)"),
        (TemporalUnit::Week, "weekofyear(?2)"),
        (TemporalUnit::Epoch, "unix_timestamp(?2)"),
    ] {
        rules.extract_patterns.insert(unit, pattern.to_string());
    }
}

#[cfg(test)]
mod tests {
    use crate::dialect::column_types::SqlType;
    use crate::dialect::Dialect;

    #[test]
    fn test_varchar_falls_back_to_longtext() {
        let dialect = Dialect::resolve("mysql", 8).unwrap();
        assert_eq!(
            dialect.column_type_for(SqlType::Varchar, Some(65_535), None, None).unwrap(),
            "varchar(65535)"
        );
        assert_eq!(
            dialect.column_type_for(SqlType::Varchar, Some(70_000), None, None).unwrap(),
            "longtext"
        );
    }

    #[test]
    fn test_no_sequences() {
        let dialect = Dialect::resolve("mariadb", (10, 4)).unwrap();
        assert!(!dialect.supports_sequences());
        assert!(!dialect.sequence_strategy().is_supported());
        assert_eq!(dialect.rules().for_share, " for share");
        let legacy = Dialect::resolve("mysql", (5, 7)).unwrap();
        assert_eq!(legacy.rules().for_share, " lock in share mode");
    }
}
