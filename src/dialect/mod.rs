//! Database dialects: one immutable bundle of capabilities, type and function
//! registries, strategies and rendering rules per (product, version).
//!
//! A vendor dialect is the standard base table plus the vendor's override
//! layer, applied once by [`DialectBuilder`]. Overrides from configuration
//! are applied last.

pub mod capability;
pub mod column_types;
pub mod functions;
pub mod strategy;
pub mod temporal;
pub mod version;

mod ingres;
mod mysql;
mod postgres;
mod sqlite;
mod sqlserver;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sql::error::{DialectError, DialectResult};
use crate::sql::mapping::MappingModel;
use crate::sql::translator::{SqlAstTranslator, TranslationConfig};
use crate::sqm::converter::SqmToSqlAstConverter;

use capability::{Capability, CapabilityProfile, Gate, TimeZoneSupport};
use column_types::{ColumnSize, ColumnTypeRegistry, SqlType};
use functions::{CommonFunctions, FunctionRegistry, FunctionTemplate};
use strategy::{
    IdentityStrategy, LimitStrategy, LockRendering, PlaceholderStyle, SequenceStrategy,
    TemporaryTableStrategy,
};
use temporal::{DatetimeFormatStyle, TemporalUnit, TimestampArithmetic};
use version::DatabaseVersion;

/// Supported database products
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    Ingres,
    PostgreSql,
    MySql,
    Sqlite,
    SqlServer,
}

impl Product {
    pub const ALL: [Product; 5] = [
        Product::Ingres,
        Product::PostgreSql,
        Product::MySql,
        Product::Sqlite,
        Product::SqlServer,
    ];

    /// Match a product name as reported by connection metadata
    pub fn from_name(name: &str) -> DialectResult<Product> {
        let normalized = name.trim().to_lowercase();
        let product = match normalized.as_str() {
            "ingres" | "actian ingres" | "actian x" | "vector" => Product::Ingres,
            "postgresql" | "postgres" | "pg" | "pgsql" => Product::PostgreSql,
            "mysql" | "mariadb" => Product::MySql,
            "sqlite" | "sqlite3" => Product::Sqlite,
            "sqlserver" | "sql server" | "microsoft sql server" | "mssql" | "sql_server" => {
                Product::SqlServer
            }
            _ => return Err(DialectError::UnknownProduct(name.to_string())),
        };
        Ok(product)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Product::Ingres => "Ingres",
            Product::PostgreSql => "PostgreSQL",
            Product::MySql => "MySQL",
            Product::Sqlite => "SQLite",
            Product::SqlServer => "SQL Server",
        }
    }

    /// Version assumed when none is configured
    pub fn default_version(&self) -> DatabaseVersion {
        match self {
            Product::Ingres => DatabaseVersion::new(10, 2),
            Product::PostgreSql => DatabaseVersion::new(15, 0),
            Product::MySql => DatabaseVersion::new(8, 0),
            Product::Sqlite => DatabaseVersion::new(3, 45),
            Product::SqlServer => DatabaseVersion::new(16, 0),
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Product {
    type Err = DialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Product::from_name(s)
    }
}

/// Connection metadata used to pick a dialect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectResolutionInfo {
    pub product_name: String,
    pub major: u16,
    pub minor: u16,
}

impl DialectResolutionInfo {
    pub fn new(product_name: impl Into<String>, major: u16, minor: u16) -> Self {
        Self {
            product_name: product_name.into(),
            major,
            minor,
        }
    }

    pub fn version(&self) -> DatabaseVersion {
        DatabaseVersion::new(self.major, self.minor)
    }
}

/// Vendor rendering details that are not capabilities or strategies
#[derive(Debug, Clone)]
pub struct RenderingRules {
    pub open_quote: char,
    pub close_quote: char,
    pub placeholder_style: PlaceholderStyle,
    pub lock_rendering: LockRendering,
    pub for_update: String,
    pub for_share: String,
    pub nowait: String,
    pub skip_locked: String,
    /// Appended to nullable column definitions
    pub null_column_string: String,
    pub lowercase_function: String,
    pub select_guid: Option<String>,
    pub current_timestamp_select: Option<String>,
    pub query_sequences: Option<String>,
    /// `extract` field names that differ from the generic ones
    pub extract_fields: BTreeMap<TemporalUnit, String>,
    /// Whole-expression patterns for single units (`?1` field, `?2` value)
    pub extract_patterns: BTreeMap<TemporalUnit, String>,
    pub timestamp_arithmetic: TimestampArithmetic,
    pub datetime_format: DatetimeFormatStyle,
    pub time_zone_support: TimeZoneSupport,
    pub drop_constraints: bool,
    pub preferred_boolean_type: SqlType,
    pub default_length: u64,
    pub default_precision: u32,
    pub default_scale: u32,
    pub default_timestamp_precision: u32,
    pub default_properties: BTreeMap<String, String>,
}

impl Default for RenderingRules {
    fn default() -> Self {
        Self {
            open_quote: '"',
            close_quote: '"',
            placeholder_style: PlaceholderStyle::Jdbc,
            lock_rendering: LockRendering::Clause,
            for_update: " for update".to_string(),
            for_share: " for share".to_string(),
            nowait: " nowait".to_string(),
            skip_locked: " skip locked".to_string(),
            null_column_string: String::new(),
            lowercase_function: "lower".to_string(),
            select_guid: None,
            current_timestamp_select: None,
            query_sequences: None,
            extract_fields: BTreeMap::new(),
            extract_patterns: BTreeMap::new(),
            timestamp_arithmetic: TimestampArithmetic::Patterns {
                add: "timestampadd(?1, ?2, ?3)".to_string(),
                diff: "timestampdiff(?1, ?2, ?3)".to_string(),
            },
            datetime_format: DatetimeFormatStyle::PassThrough,
            time_zone_support: TimeZoneSupport::None,
            drop_constraints: true,
            preferred_boolean_type: SqlType::Boolean,
            default_length: 255,
            default_precision: 38,
            default_scale: 2,
            default_timestamp_precision: 6,
            default_properties: BTreeMap::new(),
        }
    }
}

/// Assembles a [`Dialect`]: standard base, vendor layer, then overrides
#[derive(Debug, Clone)]
pub struct DialectBuilder {
    pub(crate) product: Product,
    pub(crate) profile: CapabilityProfile,
    pub(crate) column_types: ColumnTypeRegistry,
    pub(crate) functions: FunctionRegistry,
    pub(crate) limit: LimitStrategy,
    pub(crate) identity: IdentityStrategy,
    pub(crate) sequence: SequenceStrategy,
    pub(crate) temporary_tables: TemporaryTableStrategy,
    pub(crate) rules: RenderingRules,
}

impl DialectBuilder {
    /// ANSI defaults shared by every product
    pub fn standard(product: Product, version: DatabaseVersion) -> Self {
        let mut profile = CapabilityProfile::new(version);
        for capability in [
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
            Capability::ForeignKeyConstraints,
            Capability::ExpectedLobUsagePattern,
        ] {
            profile.set(capability, Gate::Always);
        }

        let mut column_types = ColumnTypeRegistry::new();
        for (code, template) in [
            (SqlType::Bit, "bit"),
            (SqlType::Boolean, "boolean"),
            (SqlType::TinyInt, "tinyint"),
            (SqlType::SmallInt, "smallint"),
            (SqlType::Integer, "integer"),
            (SqlType::BigInt, "bigint"),
            (SqlType::Real, "real"),
            (SqlType::Float, "float($p)"),
            (SqlType::Double, "double precision"),
            (SqlType::Numeric, "numeric($p,$s)"),
            (SqlType::Decimal, "decimal($p,$s)"),
            (SqlType::Char, "char($l)"),
            (SqlType::Varchar, "varchar($l)"),
            (SqlType::LongVarchar, "varchar($l)"),
            (SqlType::NChar, "nchar($l)"),
            (SqlType::NVarchar, "nvarchar($l)"),
            (SqlType::LongNVarchar, "nvarchar($l)"),
            (SqlType::Binary, "binary($l)"),
            (SqlType::Varbinary, "varbinary($l)"),
            (SqlType::LongVarbinary, "varbinary($l)"),
            (SqlType::Date, "date"),
            (SqlType::Time, "time"),
            (SqlType::Timestamp, "timestamp($p)"),
            (SqlType::TimestampWithTimeZone, "timestamp($p) with time zone"),
            (SqlType::Blob, "blob"),
            (SqlType::Clob, "clob"),
            (SqlType::NClob, "nclob"),
            (SqlType::Uuid, "char(36)"),
        ] {
            column_types.register(code, None, template);
        }

        let mut functions = FunctionRegistry::new();
        CommonFunctions::new(&mut functions).standard();

        Self {
            product,
            profile,
            column_types,
            functions,
            limit: LimitStrategy::OffsetFetch {
                offset_rows_keyword: true,
                requires_order_by: false,
            },
            identity: IdentityStrategy::Unsupported,
            sequence: SequenceStrategy::Unsupported,
            temporary_tables: TemporaryTableStrategy::local("create local temporary table", ""),
            rules: RenderingRules::default(),
        }
    }

    /// Standard base with the product's override layer applied
    pub fn for_product(product: Product, version: DatabaseVersion) -> Self {
        let mut builder = Self::standard(product, version);
        match product {
            Product::Ingres => ingres::configure(&mut builder),
            Product::PostgreSql => postgres::configure(&mut builder),
            Product::MySql => mysql::configure(&mut builder),
            Product::Sqlite => sqlite::configure(&mut builder),
            Product::SqlServer => sqlserver::configure(&mut builder),
        }
        builder
    }

    pub fn version(&self) -> DatabaseVersion {
        self.profile.version()
    }

    pub fn capability(&mut self, capability: Capability, gate: Gate) -> &mut Self {
        self.profile.set(capability, gate);
        self
    }

    pub fn column_type(&mut self, code: SqlType, max_length: Option<u64>, template: &str) -> &mut Self {
        self.column_types.register(code, max_length, template);
        self
    }

    pub fn function(&mut self, template: FunctionTemplate) -> &mut Self {
        self.functions.register_template(template);
        self
    }

    pub fn functions(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    pub fn common_functions(&mut self) -> CommonFunctions<'_> {
        CommonFunctions::new(&mut self.functions)
    }

    pub fn rules(&mut self) -> &mut RenderingRules {
        &mut self.rules
    }

    pub fn limit_strategy(&mut self, strategy: LimitStrategy) -> &mut Self {
        self.limit = strategy;
        self
    }

    pub fn identity_strategy(&mut self, strategy: IdentityStrategy) -> &mut Self {
        self.identity = strategy;
        self
    }

    pub fn sequence_strategy(&mut self, strategy: SequenceStrategy) -> &mut Self {
        self.sequence = strategy;
        self
    }

    pub fn temporary_table_strategy(&mut self, strategy: TemporaryTableStrategy) -> &mut Self {
        self.temporary_tables = strategy;
        self
    }

    pub fn placeholder_style(&mut self, style: PlaceholderStyle) -> &mut Self {
        self.rules.placeholder_style = style;
        self
    }

    pub fn default_property(&mut self, key: &str, value: &str) -> &mut Self {
        self.rules
            .default_properties
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> Dialect {
        let name = format!("{} {}", self.product.display_name(), self.profile.version());
        Dialect {
            name,
            product: self.product,
            profile: self.profile,
            column_types: self.column_types,
            functions: self.functions,
            limit: self.limit,
            identity: self.identity,
            sequence: self.sequence,
            temporary_tables: self.temporary_tables,
            rules: self.rules,
        }
    }
}

/// An immutable dialect for one product version
#[derive(Debug, Clone)]
pub struct Dialect {
    name: String,
    product: Product,
    profile: CapabilityProfile,
    column_types: ColumnTypeRegistry,
    functions: FunctionRegistry,
    limit: LimitStrategy,
    identity: IdentityStrategy,
    sequence: SequenceStrategy,
    temporary_tables: TemporaryTableStrategy,
    rules: RenderingRules,
}

impl Dialect {
    /// Resolve the dialect for a product name and version
    pub fn resolve(product_name: &str, version: impl Into<DatabaseVersion>) -> DialectResult<Dialect> {
        let product = Product::from_name(product_name)?;
        let dialect = DialectBuilder::for_product(product, version.into()).build();
        debug!(
            dialect = %dialect.name,
            limit = dialect.limit.name(),
            "resolved dialect"
        );
        Ok(dialect)
    }

    pub fn from_resolution_info(info: &DialectResolutionInfo) -> DialectResult<Dialect> {
        Dialect::resolve(&info.product_name, info.version())
    }

    pub fn builder(product: Product, version: impl Into<DatabaseVersion>) -> DialectBuilder {
        DialectBuilder::for_product(product, version.into())
    }

    /// Product and version, e.g. `Ingres 9.2`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn product(&self) -> Product {
        self.product
    }

    pub fn version(&self) -> DatabaseVersion {
        self.profile.version()
    }

    pub fn capabilities(&self) -> &CapabilityProfile {
        &self.profile
    }

    pub fn column_types(&self) -> &ColumnTypeRegistry {
        &self.column_types
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn rules(&self) -> &RenderingRules {
        &self.rules
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.profile.supports(capability)
    }

    pub fn minimum_version(&self, capability: Capability) -> Option<DatabaseVersion> {
        self.profile.minimum_version(capability)
    }

    /// Fail with `UnsupportedSqlConstruct` unless `capability` holds
    pub fn require(&self, capability: Capability, construct: &str) -> DialectResult<()> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(DialectError::unsupported(
                self.name.clone(),
                construct,
                self.minimum_version(capability),
            ))
        }
    }

    pub fn supports_union_all(&self) -> bool {
        self.supports(Capability::UnionAll)
    }

    pub fn supports_union_in_subquery(&self) -> bool {
        self.supports(Capability::UnionInSubquery)
    }

    pub fn supports_subquery_in_select(&self) -> bool {
        self.supports(Capability::SubqueryInSelect)
    }

    pub fn supports_order_by_in_subquery(&self) -> bool {
        self.supports(Capability::OrderByInSubquery)
    }

    pub fn supports_fetch_clause(&self) -> bool {
        self.supports(Capability::FetchClause)
    }

    pub fn supports_native_boolean(&self) -> bool {
        self.supports(Capability::NativeBoolean)
    }

    pub fn supports_sequences(&self) -> bool {
        self.supports(Capability::Sequences)
    }

    pub fn supports_identity_columns(&self) -> bool {
        self.supports(Capability::IdentityColumns)
    }

    /// DDL type for an abstract type; missing sizes use the dialect defaults
    pub fn column_type_for(
        &self,
        code: SqlType,
        length: Option<u64>,
        precision: Option<u32>,
        scale: Option<u32>,
    ) -> DialectResult<String> {
        let default_precision = match code {
            SqlType::Timestamp | SqlType::TimestampWithTimeZone | SqlType::Time => {
                self.rules.default_timestamp_precision
            }
            _ => self.rules.default_precision,
        };
        let size = ColumnSize::new(
            length.unwrap_or(self.rules.default_length),
            precision.unwrap_or(default_precision),
            scale.unwrap_or(self.rules.default_scale),
        );
        self.column_types
            .get(code, &size)
            .ok_or_else(|| DialectError::UnsupportedType {
                dialect: self.name.clone(),
                code,
                length: size.length,
            })
    }

    pub fn function_template_for(&self, name: &str) -> Option<&FunctionTemplate> {
        self.functions.get(name)
    }

    pub fn limit_strategy(&self) -> &LimitStrategy {
        &self.limit
    }

    pub fn identity_strategy(&self) -> &IdentityStrategy {
        &self.identity
    }

    pub fn sequence_strategy(&self) -> &SequenceStrategy {
        &self.sequence
    }

    pub fn temporary_table_strategy(&self) -> &TemporaryTableStrategy {
        &self.temporary_tables
    }

    pub fn placeholder_style(&self) -> PlaceholderStyle {
        self.rules.placeholder_style
    }

    pub fn quote_identifier(&self, name: &str) -> String {
        let close = self.rules.close_quote;
        let mut doubled = String::with_capacity(2);
        doubled.push(close);
        doubled.push(close);
        format!(
            "{}{}{}",
            self.rules.open_quote,
            name.replace(close, &doubled),
            close
        )
    }

    pub fn boolean_literal(&self, value: bool) -> &'static str {
        match (self.supports_native_boolean(), value) {
            (true, true) => "true",
            (true, false) => "false",
            (false, true) => "1",
            (false, false) => "0",
        }
    }

    /// Empty when locks are only taken through cursors
    pub fn for_update_string(&self) -> &str {
        match self.rules.lock_rendering {
            LockRendering::Clause => &self.rules.for_update,
            _ => "",
        }
    }

    pub fn null_column_string(&self) -> &str {
        &self.rules.null_column_string
    }

    pub fn lowercase_function(&self) -> &str {
        &self.rules.lowercase_function
    }

    pub fn select_guid_string(&self) -> Option<&str> {
        self.rules.select_guid.as_deref()
    }

    pub fn current_timestamp_select_string(&self) -> DialectResult<&str> {
        self.require(Capability::CurrentTimestampSelection, "current timestamp selection")?;
        self.rules
            .current_timestamp_select
            .as_deref()
            .ok_or_else(|| DialectError::unsupported(self.name.clone(), "current timestamp selection", None))
    }

    pub fn query_sequences_string(&self) -> Option<&str> {
        self.rules.query_sequences.as_deref()
    }

    pub fn default_decimal_precision(&self) -> u32 {
        self.rules.default_precision
    }

    pub fn drop_constraints(&self) -> bool {
        self.rules.drop_constraints
    }

    pub fn time_zone_support(&self) -> TimeZoneSupport {
        self.rules.time_zone_support
    }

    pub fn preferred_boolean_type(&self) -> SqlType {
        self.rules.preferred_boolean_type
    }

    pub fn default_properties(&self) -> &BTreeMap<String, String> {
        &self.rules.default_properties
    }

    pub fn datetime_format_style(&self) -> DatetimeFormatStyle {
        self.rules.datetime_format
    }

    /// Vendor field name for `extract`, falling back to the generic one
    pub fn translate_extract_field(&self, unit: TemporalUnit) -> &str {
        self.rules
            .extract_fields
            .get(&unit)
            .map(String::as_str)
            .unwrap_or_else(|| unit.generic_extract_field())
    }

    pub fn timestampadd_pattern(&self, unit: TemporalUnit) -> DialectResult<String> {
        self.rules
            .timestamp_arithmetic
            .add_pattern(unit)
            .ok_or_else(|| {
                DialectError::unsupported(
                    self.name.clone(),
                    format!("timestampadd({})", unit.duration_field()),
                    None,
                )
            })
    }

    pub fn timestampdiff_pattern(&self, unit: TemporalUnit) -> DialectResult<String> {
        self.rules
            .timestamp_arithmetic
            .diff_pattern(unit)
            .ok_or_else(|| {
                DialectError::unsupported(
                    self.name.clone(),
                    format!("timestampdiff({})", unit.duration_field()),
                    None,
                )
            })
    }

    /// Translator with the default configuration for this dialect
    pub fn sql_ast_translator(&self) -> SqlAstTranslator<'_> {
        SqlAstTranslator::new(self, TranslationConfig::for_dialect(self))
    }

    pub fn sqm_converter<'a>(&'a self, mapping: &'a MappingModel) -> SqmToSqlAstConverter<'a> {
        SqmToSqlAstConverter::new(self, mapping)
    }
}

/// Process-wide dialect slot, resolved at most once
#[derive(Debug, Default)]
pub struct DialectCell {
    cell: OnceLock<Arc<Dialect>>,
    init: Mutex<()>,
}

impl DialectCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    pub fn get(&self) -> Option<Arc<Dialect>> {
        self.cell.get().cloned()
    }

    /// Resolve on first use; later calls return the stored dialect
    pub fn get_or_resolve(&self, info: &DialectResolutionInfo) -> DialectResult<Arc<Dialect>> {
        self.get_or_init_with(|| Dialect::from_resolution_info(info))
    }

    pub fn get_or_init_with<F>(&self, init: F) -> DialectResult<Arc<Dialect>>
    where
        F: FnOnce() -> DialectResult<Dialect>,
    {
        if let Some(dialect) = self.cell.get() {
            return Ok(Arc::clone(dialect));
        }
        let _guard = self.init.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(dialect) = self.cell.get() {
            return Ok(Arc::clone(dialect));
        }
        let dialect = Arc::new(init()?);
        let stored = self.cell.get_or_init(|| dialect);
        Ok(Arc::clone(stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_product_aliases() {
        assert_eq!(Product::from_name("PostgreSQL").unwrap(), Product::PostgreSql);
        assert_eq!(Product::from_name(" pg ").unwrap(), Product::PostgreSql);
        assert_eq!(Product::from_name("Microsoft SQL Server").unwrap(), Product::SqlServer);
        assert_eq!(Product::from_name("MariaDB").unwrap(), Product::MySql);
        assert!(matches!(
            Product::from_name("oracle"),
            Err(DialectError::UnknownProduct(_))
        ));
    }

    #[test]
    fn test_dialect_name() {
        let dialect = Dialect::resolve("ingres", (9, 2)).unwrap();
        assert_eq!(dialect.name(), "Ingres 9.2");
        assert_eq!(dialect.product(), Product::Ingres);
    }

    #[test]
    fn test_column_type_defaults() {
        let dialect = Dialect::resolve("postgresql", 15).unwrap();
        assert_eq!(
            dialect.column_type_for(SqlType::Varchar, None, None, None).unwrap(),
            "varchar(255)"
        );
        assert_eq!(
            dialect.column_type_for(SqlType::Timestamp, None, None, None).unwrap(),
            "timestamp(6)"
        );
    }

    #[test]
    fn test_quote_identifier() {
        let pg = Dialect::resolve("postgresql", 15).unwrap();
        assert_eq!(pg.quote_identifier("order"), "\"order\"");
        assert_eq!(pg.quote_identifier("a\"b"), "\"a\"\"b\"");
        let mysql = Dialect::resolve("mysql", 8).unwrap();
        assert_eq!(mysql.quote_identifier("order"), "`order`");
        let mssql = Dialect::resolve("sqlserver", 16).unwrap();
        assert_eq!(mssql.quote_identifier("a]b"), "[a]]b]");
    }

    #[test]
    fn test_dialect_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Dialect>();
        assert_send_sync::<DialectCell>();
    }

    #[test]
    fn test_cell_resolves_once() {
        let cell = Arc::new(DialectCell::new());
        let info = DialectResolutionInfo::new("sqlite", 3, 45);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let info = info.clone();
                thread::spawn(move || cell.get_or_resolve(&info).unwrap())
            })
            .collect();
        let dialects: Vec<Arc<Dialect>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for d in &dialects {
            assert!(Arc::ptr_eq(d, &dialects[0]));
        }
        assert!(Arc::ptr_eq(&cell.get().unwrap(), &dialects[0]));
    }

    #[test]
    fn test_cell_failure_leaves_cell_empty() {
        let cell = DialectCell::new();
        let info = DialectResolutionInfo::new("db2", 11, 5);
        assert!(cell.get_or_resolve(&info).is_err());
        assert!(cell.get().is_none());
    }
}
