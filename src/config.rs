//! Dialect settings loaded from JSON, a settings file or the environment

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::dialect::capability::{Capability, Gate};
use crate::dialect::column_types::SqlType;
use crate::dialect::functions::FunctionTemplate;
use crate::dialect::strategy::PlaceholderStyle;
use crate::dialect::version::DatabaseVersion;
use crate::dialect::{Dialect, DialectBuilder, Product};
use crate::sql::error::DialectError;
use crate::sql::translator::{BindVariableMode, TranslationConfig};

/// Prefix of environment overrides, e.g. `ORMDIALECT__PRODUCT=ingres`
pub const ENV_PREFIX: &str = "ORMDIALECT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load settings: {0}")]
    Source(#[from] ::config::ConfigError),

    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Dialect(#[from] DialectError),

    #[error("Invalid value for '{key}': {message}")]
    Invalid { key: String, message: String },
}

/// Column type registered on top of the vendor layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTypeOverride {
    pub code: SqlType,
    #[serde(default)]
    pub max_length: Option<u64>,
    pub template: String,
}

/// `?N` pattern function registered on top of the vendor layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionOverride {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub result_type: Option<SqlType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialectSettings {
    pub product: String,
    /// `"9.3"`; the product default when absent
    pub version: Option<String>,
    pub placeholder_style: Option<PlaceholderStyle>,
    pub bind_mode: BindVariableMode,
    pub quote_identifiers: bool,
    pub column_types: Vec<ColumnTypeOverride>,
    pub functions: Vec<FunctionOverride>,
    /// Capability name (`supports_union_all`) to forced value
    pub capabilities: BTreeMap<String, bool>,
}

impl Default for DialectSettings {
    fn default() -> Self {
        Self {
            product: "postgresql".to_string(),
            version: None,
            placeholder_style: None,
            bind_mode: BindVariableMode::default(),
            quote_identifiers: false,
            column_types: Vec::new(),
            functions: Vec::new(),
            capabilities: BTreeMap::new(),
        }
    }
}

impl DialectSettings {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults, then the settings file (format from its extension), then
    /// `ORMDIALECT__*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = DialectSettings::default();
        let mut builder = ::config::Config::builder()
            .set_default("product", defaults.product)?
            .set_default("bind_mode", "parameterized")?
            .set_default("quote_identifiers", defaults.quote_identifiers)?;

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        builder = builder.add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"));

        let settings: DialectSettings = builder.build()?.try_deserialize()?;
        debug!(
            product = %settings.product,
            version = settings.version.as_deref().unwrap_or("default"),
            "loaded dialect settings"
        );
        Ok(settings)
    }

    pub fn product(&self) -> Result<Product, ConfigError> {
        Ok(Product::from_name(&self.product)?)
    }

    pub fn database_version(&self) -> Result<DatabaseVersion, ConfigError> {
        match &self.version {
            Some(version) => Ok(version.parse()?),
            None => Ok(self.product()?.default_version()),
        }
    }

    /// Build the dialect; the overrides here are applied after the vendor layer
    pub fn resolve_dialect(&self) -> Result<Dialect, ConfigError> {
        let product = self.product()?;
        let mut builder = DialectBuilder::for_product(product, self.database_version()?);

        if let Some(style) = self.placeholder_style {
            builder.placeholder_style(style);
        }
        for column in &self.column_types {
            builder.column_type(column.code, column.max_length, &column.template);
        }
        for function in &self.functions {
            if function.name.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key: "functions.name".to_string(),
                    message: "function name must not be empty".to_string(),
                });
            }
            builder.function(FunctionTemplate::pattern(
                &function.name,
                &function.pattern,
                function.result_type,
            ));
        }
        for (name, &enabled) in &self.capabilities {
            let capability = Capability::from_name(name).ok_or_else(|| ConfigError::Invalid {
                key: format!("capabilities.{}", name),
                message: "unknown capability".to_string(),
            })?;
            builder.capability(capability, Gate::from_bool(enabled));
        }

        let dialect = builder.build();
        debug!(
            dialect = dialect.name(),
            overrides = self.column_types.len() + self.functions.len() + self.capabilities.len(),
            "resolved dialect from settings"
        );
        Ok(dialect)
    }

    pub fn translation_config(&self, dialect: &Dialect) -> TranslationConfig {
        TranslationConfig {
            bind_mode: self.bind_mode,
            quote_identifiers: self.quote_identifiers,
            ..TranslationConfig::for_dialect(dialect)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let settings = DialectSettings::from_json("{}").unwrap();
        assert_eq!(settings, DialectSettings::default());
        let dialect = settings.resolve_dialect().unwrap();
        assert_eq!(dialect.name(), "PostgreSQL 15.0");
    }

    #[test]
    fn test_overrides_applied_last() {
        let settings = DialectSettings::from_json(
            r#"{
                "product": "ingres",
                "version": "9.2",
                "placeholder_style": "numbered",
                "column_types": [{ "code": "varchar", "template": "text" }],
                "functions": [{ "name": "soundex", "pattern": "soundex(?1)" }],
                "capabilities": { "supports_union_all": true }
            }"#,
        )
        .unwrap();
        let dialect = settings.resolve_dialect().unwrap();
        assert!(dialect.supports(Capability::UnionAll));
        assert!(dialect.function_template_for("soundex").is_some());
        assert_eq!(dialect.placeholder_style(), PlaceholderStyle::Numbered);
        assert_eq!(
            dialect.column_type_for(SqlType::Varchar, Some(100_000), None, None).unwrap(),
            "text"
        );
    }

    #[test]
    fn test_unknown_capability() {
        let settings = DialectSettings::from_json(r#"{ "capabilities": { "supports_time_travel": true } }"#).unwrap();
        assert!(matches!(
            settings.resolve_dialect(),
            Err(ConfigError::Invalid { key, .. }) if key == "capabilities.supports_time_travel"
        ));
    }

    #[test]
    fn test_invalid_json_and_version() {
        assert!(matches!(DialectSettings::from_json("{"), Err(ConfigError::Json(_))));
        let settings = DialectSettings::from_json(r#"{ "version": "nine" }"#).unwrap();
        assert!(matches!(
            settings.resolve_dialect(),
            Err(ConfigError::Dialect(DialectError::InvalidVersion(_)))
        ));
    }
}
