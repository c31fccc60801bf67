//! Column type registry: abstract type codes to vendor DDL type names

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::lexer::{tokenize, Token, TokenKind};

/// Abstract SQL type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    Bit,
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Float,
    Double,
    Numeric,
    Decimal,
    Char,
    Varchar,
    LongVarchar,
    NChar,
    NVarchar,
    LongNVarchar,
    Binary,
    Varbinary,
    LongVarbinary,
    Date,
    Time,
    Timestamp,
    TimestampWithTimeZone,
    Blob,
    Clob,
    NClob,
    Uuid,
}

impl SqlType {
    /// Character and binary types whose DDL takes a length
    pub fn is_sized(&self) -> bool {
        matches!(
            self,
            SqlType::Char
                | SqlType::Varchar
                | SqlType::LongVarchar
                | SqlType::NChar
                | SqlType::NVarchar
                | SqlType::LongNVarchar
                | SqlType::Binary
                | SqlType::Varbinary
                | SqlType::LongVarbinary
        )
    }

    pub fn is_character(&self) -> bool {
        matches!(
            self,
            SqlType::Char
                | SqlType::Varchar
                | SqlType::LongVarchar
                | SqlType::NChar
                | SqlType::NVarchar
                | SqlType::LongNVarchar
                | SqlType::Clob
                | SqlType::NClob
        )
    }
}

/// Concrete size values substituted into a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSize {
    pub length: u64,
    pub precision: u32,
    pub scale: u32,
}

impl ColumnSize {
    pub fn new(length: u64, precision: u32, scale: u32) -> Self {
        Self {
            length,
            precision,
            scale,
        }
    }

    pub fn length(length: u64) -> Self {
        Self::new(length, 0, 0)
    }
}

/// A parsed DDL template such as `decimal($p, $s)`
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnTemplate {
    source: String,
    tokens: Vec<Token>,
}

impl ColumnTemplate {
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let tokens = tokenize(&source);
        Self { source, tokens }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn render(&self, size: &ColumnSize) -> String {
        let mut out = String::with_capacity(self.source.len() + 8);
        for token in &self.tokens {
            match token.kind {
                TokenKind::Length => out.push_str(&size.length.to_string()),
                TokenKind::Precision => out.push_str(&size.precision.to_string()),
                TokenKind::Scale => out.push_str(&size.scale.to_string()),
                // `?N` has no meaning in a column type
                _ => out.push_str(token.text(&self.source)),
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
struct TypeEntries {
    /// Keyed by maximum length, smallest first
    sized: BTreeMap<u64, ColumnTemplate>,
    unrestricted: Option<ColumnTemplate>,
}

/// Maps (type code, length) to a DDL template
#[derive(Debug, Clone, Default)]
pub struct ColumnTypeRegistry {
    entries: BTreeMap<SqlType, TypeEntries>,
}

impl ColumnTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template for a type code.
    ///
    /// With `max_length` the entry applies to lengths up to that value;
    /// without it the entry is the fallback for any length. Registering the
    /// same (code, bucket) again replaces the earlier template.
    pub fn register(&mut self, code: SqlType, max_length: Option<u64>, template: &str) {
        let entries = self.entries.entry(code).or_default();
        let template = ColumnTemplate::parse(template);
        match max_length {
            Some(max) => {
                entries.sized.insert(max, template);
            }
            None => entries.unrestricted = Some(template),
        }
    }

    /// Remove every registration for a type code
    pub fn unregister(&mut self, code: SqlType) {
        self.entries.remove(&code);
    }

    /// Find the most specific template accepting `length`
    pub fn lookup(&self, code: SqlType, length: u64) -> Option<&ColumnTemplate> {
        let entries = self.entries.get(&code)?;
        entries
            .sized
            .range(length..)
            .next()
            .map(|(_, t)| t)
            .or(entries.unrestricted.as_ref())
    }

    /// Render the DDL type for `code`, or `None` if nothing is registered
    pub fn get(&self, code: SqlType, size: &ColumnSize) -> Option<String> {
        self.lookup(code, size.length).map(|t| t.render(size))
    }

    pub fn contains(&self, code: SqlType) -> bool {
        self.entries.contains_key(&code)
    }

    /// All registrations as (code, max length, template source), in order
    pub fn entries(&self) -> Vec<(SqlType, Option<u64>, &str)> {
        let mut out = Vec::new();
        for (code, entries) in &self.entries {
            for (max, template) in &entries.sized {
                out.push((*code, Some(*max), template.source()));
            }
            if let Some(ref template) = entries.unrestricted {
                out.push((*code, None, template.source()));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_thresholds() {
        let mut registry = ColumnTypeRegistry::new();
        registry.register(SqlType::Varchar, Some(32_000), "varchar($l)");
        registry.register(SqlType::Varchar, None, "long varchar($l)");

        assert_eq!(
            registry.get(SqlType::Varchar, &ColumnSize::length(100)).as_deref(),
            Some("varchar(100)")
        );
        assert_eq!(
            registry.get(SqlType::Varchar, &ColumnSize::length(32_000)).as_deref(),
            Some("varchar(32000)")
        );
        assert_eq!(
            registry.get(SqlType::Varchar, &ColumnSize::length(50_000)).as_deref(),
            Some("long varchar(50000)")
        );
    }

    #[test]
    fn test_smallest_threshold_wins() {
        let mut registry = ColumnTypeRegistry::new();
        registry.register(SqlType::Varbinary, Some(8_000), "varbinary($l)");
        registry.register(SqlType::Varbinary, Some(255), "tinyblob");
        registry.register(SqlType::Varbinary, None, "longblob");

        let render = |len| registry.get(SqlType::Varbinary, &ColumnSize::length(len)).unwrap();
        assert_eq!(render(1), "tinyblob");
        assert_eq!(render(255), "tinyblob");
        assert_eq!(render(256), "varbinary(256)");
        assert_eq!(render(8_001), "longblob");
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = ColumnTypeRegistry::new();
        registry.register(SqlType::Boolean, None, "boolean");
        registry.register(SqlType::Boolean, None, "tinyint");
        assert_eq!(
            registry.get(SqlType::Boolean, &ColumnSize::length(0)).as_deref(),
            Some("tinyint")
        );
    }

    #[test]
    fn test_no_fallback_past_last_threshold() {
        let mut registry = ColumnTypeRegistry::new();
        registry.register(SqlType::Char, Some(32_000), "char($l)");
        assert!(registry.get(SqlType::Char, &ColumnSize::length(40_000)).is_none());
        assert!(registry.get(SqlType::Uuid, &ColumnSize::length(0)).is_none());
    }

    #[test]
    fn test_precision_and_scale() {
        let mut registry = ColumnTypeRegistry::new();
        registry.register(SqlType::Numeric, None, "decimal($p, $s)");
        assert_eq!(
            registry.get(SqlType::Numeric, &ColumnSize::new(255, 19, 2)).as_deref(),
            Some("decimal(19, 2)")
        );
    }
}
