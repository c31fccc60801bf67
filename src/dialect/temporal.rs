//! Temporal units and datetime format translation

/// A unit of a date/time value, used by `extract` and timestamp arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TemporalUnit {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    DayOfMonth,
    DayOfWeek,
    DayOfYear,
    Hour,
    Minute,
    Second,
    Nanosecond,
    Epoch,
}

impl TemporalUnit {
    /// Field name understood by `extract(<field> from ..)` on most databases
    pub fn generic_extract_field(&self) -> &'static str {
        match self {
            TemporalUnit::Year => "year",
            TemporalUnit::Quarter => "quarter",
            TemporalUnit::Month => "month",
            TemporalUnit::Week => "week",
            TemporalUnit::Day | TemporalUnit::DayOfMonth => "day",
            TemporalUnit::DayOfWeek => "day_of_week",
            TemporalUnit::DayOfYear => "day_of_year",
            TemporalUnit::Hour => "hour",
            TemporalUnit::Minute => "minute",
            TemporalUnit::Second => "second",
            TemporalUnit::Nanosecond => "nanosecond",
            TemporalUnit::Epoch => "epoch",
        }
    }

    /// Unit keyword for timestamp arithmetic (`timestampadd(day, ..)`)
    pub fn duration_field(&self) -> &'static str {
        match self {
            TemporalUnit::Year => "year",
            TemporalUnit::Quarter => "quarter",
            TemporalUnit::Month => "month",
            TemporalUnit::Week => "week",
            TemporalUnit::Day
            | TemporalUnit::DayOfMonth
            | TemporalUnit::DayOfWeek
            | TemporalUnit::DayOfYear => "day",
            TemporalUnit::Hour => "hour",
            TemporalUnit::Minute => "minute",
            TemporalUnit::Second | TemporalUnit::Epoch => "second",
            TemporalUnit::Nanosecond => "nanosecond",
        }
    }
}

/// Timestamp arithmetic syntax.
///
/// Patterns take `?1` as the unit keyword, `?2` as the magnitude (or the
/// start of a difference) and `?3` as the timestamp (or the end).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampArithmetic {
    /// `timestampadd(?1,?2,?3)` style functions
    Patterns { add: String, diff: String },
    /// `?3 + (?2) * interval '1 ?1'`
    Interval,
    /// `datetime(..)` modifiers and `julianday(..)` differences
    JulianDay,
}

impl TimestampArithmetic {
    pub fn add_pattern(&self, unit: TemporalUnit) -> Option<String> {
        match self {
            TimestampArithmetic::Patterns { add, .. } => Some(add.clone()),
            TimestampArithmetic::Interval => match unit {
                TemporalUnit::Nanosecond => None,
                TemporalUnit::Quarter => Some("(?3 + (?2) * interval '3 month')".to_string()),
                _ => Some("(?3 + (?2) * interval '1 ?1')".to_string()),
            },
            TimestampArithmetic::JulianDay => match unit {
                TemporalUnit::Week => Some("datetime(?3, ((?2) * 7) || ' day')".to_string()),
                TemporalUnit::Quarter => Some("datetime(?3, ((?2) * 3) || ' month')".to_string()),
                TemporalUnit::Nanosecond | TemporalUnit::Epoch => None,
                _ => Some("datetime(?3, (?2) || ' ?1')".to_string()),
            },
        }
    }

    pub fn diff_pattern(&self, unit: TemporalUnit) -> Option<String> {
        let seconds = |divisor: u32| {
            if divisor == 1 {
                "trunc(extract(epoch from (?3 - ?2)))".to_string()
            } else {
                format!("trunc(extract(epoch from (?3 - ?2)) / {})", divisor)
            }
        };
        let days = |factor: &str| format!("cast((julianday(?3) - julianday(?2)){} as integer)", factor);
        match self {
            TimestampArithmetic::Patterns { diff, .. } => Some(diff.clone()),
            TimestampArithmetic::Interval => match unit {
                TemporalUnit::Year => Some("extract(year from age(?3, ?2))".to_string()),
                TemporalUnit::Month => Some(
                    "(extract(year from age(?3, ?2)) * 12 + extract(month from age(?3, ?2)))"
                        .to_string(),
                ),
                TemporalUnit::Week => Some(seconds(604_800)),
                TemporalUnit::Day
                | TemporalUnit::DayOfMonth
                | TemporalUnit::DayOfWeek
                | TemporalUnit::DayOfYear => Some(seconds(86_400)),
                TemporalUnit::Hour => Some(seconds(3_600)),
                TemporalUnit::Minute => Some(seconds(60)),
                TemporalUnit::Second | TemporalUnit::Epoch => Some(seconds(1)),
                TemporalUnit::Quarter | TemporalUnit::Nanosecond => None,
            },
            TimestampArithmetic::JulianDay => match unit {
                TemporalUnit::Week => Some(days(" / 7")),
                TemporalUnit::Day
                | TemporalUnit::DayOfMonth
                | TemporalUnit::DayOfWeek
                | TemporalUnit::DayOfYear => Some(days("")),
                TemporalUnit::Hour => Some(days(" * 24")),
                TemporalUnit::Minute => Some(days(" * 1440")),
                TemporalUnit::Second | TemporalUnit::Epoch => Some(days(" * 86400")),
                _ => None,
            },
        }
    }
}

/// Target syntax for datetime format patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatetimeFormatStyle {
    /// `date_format()` specifiers (`%Y-%m-%d`)
    MySql,
    /// `to_char()` template patterns (`YYYY-MM-DD`)
    Postgres,
    /// `strftime()` specifiers
    Sqlite,
    /// .NET-style patterns, close enough to pass through
    PassThrough,
}

/// Translate a portable (`yyyy-MM-dd HH:mm:ss`) pattern into the dialect syntax
pub fn translate_datetime_format(pattern: &str, style: DatetimeFormatStyle) -> String {
    if style == DatetimeFormatStyle::PassThrough {
        return pattern.to_string();
    }

    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            // Quoted literal text
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut out, chars[i], style);
                i += 1;
            }
            i += 1;
            continue;
        }
        if c.is_ascii_alphabetic() {
            let start = i;
            while i < chars.len() && chars[i] == c {
                i += 1;
            }
            let run: String = chars[start..i].iter().collect();
            match field_specifier(&run, style) {
                Some(spec) => out.push_str(spec),
                None => {
                    for ch in run.chars() {
                        push_literal(&mut out, ch, style);
                    }
                }
            }
            continue;
        }
        push_literal(&mut out, c, style);
        i += 1;
    }
    out
}

fn push_literal(out: &mut String, c: char, style: DatetimeFormatStyle) {
    match style {
        DatetimeFormatStyle::MySql | DatetimeFormatStyle::Sqlite if c == '%' => out.push_str("%%"),
        DatetimeFormatStyle::Postgres if c.is_ascii_alphabetic() => {
            out.push('"');
            out.push(c);
            out.push('"');
        }
        _ => out.push(c),
    }
}

fn field_specifier(run: &str, style: DatetimeFormatStyle) -> Option<&'static str> {
    match style {
        DatetimeFormatStyle::MySql => match run {
            "yyyy" | "YYYY" => Some("%Y"),
            "yy" | "YY" => Some("%y"),
            "MMMM" => Some("%M"),
            "MMM" => Some("%b"),
            "MM" => Some("%m"),
            "M" => Some("%c"),
            "dd" => Some("%d"),
            "d" => Some("%e"),
            "DDD" => Some("%j"),
            "HH" => Some("%H"),
            "H" => Some("%k"),
            "hh" => Some("%h"),
            "h" => Some("%l"),
            "mm" => Some("%i"),
            "ss" => Some("%s"),
            "SSS" | "SSSSSS" => Some("%f"),
            "a" => Some("%p"),
            "EEEE" => Some("%W"),
            "EEE" | "EE" | "E" => Some("%a"),
            _ => None,
        },
        DatetimeFormatStyle::Postgres => match run {
            "yyyy" | "YYYY" => Some("YYYY"),
            "yy" | "YY" => Some("YY"),
            "MMMM" => Some("FMMonth"),
            "MMM" => Some("Mon"),
            "MM" => Some("MM"),
            "M" => Some("FMMM"),
            "dd" => Some("DD"),
            "d" => Some("FMDD"),
            "DDD" => Some("DDD"),
            "HH" => Some("HH24"),
            "hh" => Some("HH12"),
            "mm" => Some("MI"),
            "ss" => Some("SS"),
            "SSS" => Some("MS"),
            "SSSSSS" => Some("US"),
            "a" => Some("AM"),
            "EEEE" => Some("FMDay"),
            "EEE" | "EE" | "E" => Some("Dy"),
            _ => None,
        },
        DatetimeFormatStyle::Sqlite => match run {
            "yyyy" | "YYYY" => Some("%Y"),
            "MM" => Some("%m"),
            "dd" => Some("%d"),
            "DDD" => Some("%j"),
            "HH" => Some("%H"),
            "mm" => Some("%M"),
            "ss" => Some("%S"),
            "SSS" => Some("%f"),
            _ => None,
        },
        DatetimeFormatStyle::PassThrough => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_format() {
        assert_eq!(
            translate_datetime_format("yyyy-MM-dd HH:mm:ss", DatetimeFormatStyle::MySql),
            "%Y-%m-%d %H:%i:%s"
        );
    }

    #[test]
    fn test_postgres_format_quotes_literal_letters() {
        assert_eq!(
            translate_datetime_format("yyyy'T'HH", DatetimeFormatStyle::Postgres),
            "YYYY\"T\"HH24"
        );
    }

    #[test]
    fn test_sqlite_escapes_percent() {
        assert_eq!(
            translate_datetime_format("dd%MM", DatetimeFormatStyle::Sqlite),
            "%d%%%m"
        );
    }

    #[test]
    fn test_interval_arithmetic() {
        let arithmetic = TimestampArithmetic::Interval;
        assert_eq!(
            arithmetic.add_pattern(TemporalUnit::Day).as_deref(),
            Some("(?3 + (?2) * interval '1 ?1')")
        );
        assert_eq!(
            arithmetic.diff_pattern(TemporalUnit::Hour).as_deref(),
            Some("trunc(extract(epoch from (?3 - ?2)) / 3600)")
        );
        assert_eq!(arithmetic.diff_pattern(TemporalUnit::Quarter), None);
    }

    #[test]
    fn test_julian_day_arithmetic() {
        let arithmetic = TimestampArithmetic::JulianDay;
        assert_eq!(
            arithmetic.diff_pattern(TemporalUnit::Day).as_deref(),
            Some("cast((julianday(?3) - julianday(?2)) as integer)")
        );
        assert_eq!(arithmetic.diff_pattern(TemporalUnit::Month), None);
    }

    #[test]
    fn test_generic_extract_names() {
        assert_eq!(TemporalUnit::DayOfWeek.generic_extract_field(), "day_of_week");
        assert_eq!(TemporalUnit::DayOfMonth.generic_extract_field(), "day");
    }
}
