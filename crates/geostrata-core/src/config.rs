//! Configuration for the planner and its store bindings.
//!
//! Supports YAML/TOML files, `GEOSTRATA`-prefixed environment overrides, and
//! reasonable defaults. Table names are configuration: the planner itself is
//! stateless and persists nothing.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure for GeoStrata.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PlannerConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub query: QueryConfig,
}

impl PlannerConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest priority)
    /// 2. Config file specified by `GEOSTRATA_CONFIG`
    /// 3. ./config/geostrata.yaml
    /// 4. /etc/geostrata/geostrata.yaml
    /// 5. Hardcoded defaults (lowest priority)
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("catalog.table_prefix", "geostrata")?
            .set_default("query.feature_encoding", "avro")?
            .set_default("query.max_filter_depth", 32)?;

        if let Ok(config_path) = std::env::var("GEOSTRATA_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder
            .add_source(File::with_name("./config/geostrata").required(false))
            .add_source(File::with_name("/etc/geostrata/geostrata").required(false));

        // Example override: GEOSTRATA_CATALOG__TABLE_PREFIX=prod
        builder = builder.add_source(
            Environment::with_prefix("GEOSTRATA")
                .separator("__")
                .try_parsing(true),
        );

        let config: PlannerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: PlannerConfig = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.table_prefix.is_empty() {
            return Err(ConfigError::Message(
                "catalog.table_prefix must not be empty".to_string(),
            ));
        }
        if self.query.max_filter_depth == 0 {
            return Err(ConfigError::Message(
                "query.max_filter_depth must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Naming of the three store tables the planner targets.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Prefix shared by the per-feature-type tables.
    pub table_prefix: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            table_prefix: "geostrata".to_string(),
        }
    }
}

impl CatalogConfig {
    /// Derives the concrete table names for one feature type.
    #[must_use]
    pub fn catalog_for(&self, type_name: &str) -> TableCatalog {
        TableCatalog {
            spatio_temporal: format!("{}_{}_st_idx", self.table_prefix, type_name),
            attribute_index: format!("{}_{}_attr_idx", self.table_prefix, type_name),
            records: format!("{}_{}_records", self.table_prefix, type_name),
        }
    }
}

/// The resolved table names a plan executes against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCatalog {
    /// Spatio-temporal index table.
    pub spatio_temporal: String,
    /// Inverted attribute index table.
    pub attribute_index: String,
    /// Record table keyed by feature id.
    pub records: String,
}

/// Query compilation limits and defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Feature encoding name passed to the fine-filter iterator.
    pub feature_encoding: String,

    /// Maximum filter nesting depth accepted by the normalizer.
    pub max_filter_depth: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            feature_encoding: "avro".to_string(),
            max_filter_depth: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration() {
        let config = PlannerConfig::default();
        assert_eq!(config.catalog.table_prefix, "geostrata");
        assert_eq!(config.query.feature_encoding, "avro");
        assert_eq!(config.query.max_filter_depth, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_catalog_naming() {
        let catalog = CatalogConfig::default().catalog_for("points");
        assert_eq!(catalog.spatio_temporal, "geostrata_points_st_idx");
        assert_eq!(catalog.attribute_index, "geostrata_points_attr_idx");
        assert_eq!(catalog.records, "geostrata_points_records");
    }

    #[test]
    fn test_validation_errors() {
        let mut config = PlannerConfig::default();
        config.catalog.table_prefix.clear();
        assert!(config.validate().is_err());

        let mut config = PlannerConfig::default();
        config.query.max_filter_depth = 0;
        assert!(config.validate().is_err());
    }
}
