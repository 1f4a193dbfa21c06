//! Engine configuration and the per-compilation calendar context.
//!
//! Configuration can come from a `reckon.toml` file, from environment
//! variables or from the builder:
//!
//! ```toml
//! dialect = "postgresql"
//! base_table = "entries"
//! utc_offset = "+02:00"
//! week_start = "monday"
//! default_operator = "="
//! ```
//!
//! ```rust
//! use reckon_query::config::EngineConfig;
//! use reckon_query::sql::DatabaseType;
//!
//! let config = EngineConfig::builder()
//!     .dialect(DatabaseType::SQLite)
//!     .base_table("entries")
//!     .utc_offset("+01:00")
//!     .build()
//!     .unwrap();
//! assert_eq!(config.offset().unwrap().local_minus_utc(), 3600);
//! ```

use chrono::{DateTime, FixedOffset, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::info;

use crate::error::{ReportError, ReportResult};
use crate::sql::DatabaseType;

/// Engine-wide settings, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// SQL dialect of the compiled query.
    #[serde(default)]
    pub dialect: DatabaseType,

    /// Base table every report selects from.
    #[serde(default = "default_base_table")]
    pub base_table: String,

    /// Calendar offset for date operators, as `+HH:MM` / `-HH:MM`.
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,

    /// First day of the week for `w`.
    #[serde(default = "default_week_start")]
    pub week_start: String,

    /// Operator used when neither the filter nor its type picks one.
    #[serde(default = "default_operator")]
    pub default_operator: String,
}

fn default_base_table() -> String {
    "entries".to_string()
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

fn default_week_start() -> String {
    "monday".to_string()
}

fn default_operator() -> String {
    "=".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dialect: DatabaseType::default(),
            base_table: default_base_table(),
            utc_offset: default_utc_offset(),
            week_start: default_week_start(),
            default_operator: default_operator(),
        }
    }
}

impl EngineConfig {
    /// Start a builder from the defaults.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ReportResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReportError::configuration(format!("cannot read {}", path.display())).with_source(e)
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string, expanding `${VAR}` references.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> ReportResult<Self> {
        let expanded = expand_env_vars(content);
        let config: Self = toml::from_str(&expanded)
            .map_err(|e| ReportError::configuration(e.message().to_string()).with_source(e))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `RECKON_DIALECT`, `RECKON_BASE_TABLE`,
    /// `RECKON_UTC_OFFSET` and `RECKON_WEEK_START`.
    pub fn from_env() -> ReportResult<Self> {
        let mut builder = Self::builder();
        if let Ok(dialect) = env::var("RECKON_DIALECT") {
            builder = builder.dialect(parse_dialect(&dialect)?);
        }
        if let Ok(table) = env::var("RECKON_BASE_TABLE") {
            builder = builder.base_table(table);
        }
        if let Ok(offset) = env::var("RECKON_UTC_OFFSET") {
            builder = builder.utc_offset(offset);
        }
        if let Ok(week_start) = env::var("RECKON_WEEK_START") {
            builder = builder.week_start(week_start);
        }
        builder.build()
    }

    /// Check every field that is stored as text.
    pub fn validate(&self) -> ReportResult<()> {
        if self.base_table.trim().is_empty() {
            return Err(ReportError::configuration("base_table must not be empty"));
        }
        if self.default_operator.trim().is_empty() {
            return Err(ReportError::configuration("default_operator must not be empty"));
        }
        self.offset()?;
        self.week_start()?;
        Ok(())
    }

    /// Parsed calendar offset.
    pub fn offset(&self) -> ReportResult<FixedOffset> {
        self.utc_offset.parse::<FixedOffset>().map_err(|e| {
            ReportError::configuration(format!("utc_offset `{}` is not +HH:MM", self.utc_offset))
                .with_source(e)
        })
    }

    /// Parsed week start.
    pub fn week_start(&self) -> ReportResult<Weekday> {
        self.week_start.parse::<Weekday>().map_err(|_| {
            ReportError::configuration(format!("week_start `{}` is not a weekday", self.week_start))
        })
    }

    /// Calendar context for a compilation happening at `now`.
    pub fn context_at<Tz: chrono::TimeZone>(&self, now: DateTime<Tz>) -> ReportResult<CompileContext> {
        let offset = self.offset()?;
        Ok(CompileContext::new(now.with_timezone(&offset), self.week_start()?))
    }

    /// Calendar context for a compilation happening now.
    pub fn context_now(&self) -> ReportResult<CompileContext> {
        self.context_at(Utc::now())
    }
}

fn parse_dialect(name: &str) -> ReportResult<DatabaseType> {
    match name.to_lowercase().as_str() {
        "postgres" | "postgresql" => Ok(DatabaseType::PostgreSQL),
        "mysql" => Ok(DatabaseType::MySQL),
        "sqlite" => Ok(DatabaseType::SQLite),
        other => Err(ReportError::configuration(format!("unknown dialect `{}`", other))),
    }
}

fn expand_env_vars(content: &str) -> String {
    let re = match regex_lite::Regex::new(r"\$\{([^}]+)\}") {
        Ok(re) => re,
        Err(_) => return content.to_string(),
    };
    let mut result = content.to_string();
    for cap in re.captures_iter(content) {
        if let Ok(value) = env::var(&cap[1]) {
            result = result.replace(&cap[0], &value);
        }
    }
    result
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Start from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dialect.
    pub fn dialect(mut self, dialect: DatabaseType) -> Self {
        self.config.dialect = dialect;
        self
    }

    /// Set the base table.
    pub fn base_table(mut self, table: impl Into<String>) -> Self {
        self.config.base_table = table.into();
        self
    }

    /// Set the calendar offset (`+HH:MM`).
    pub fn utc_offset(mut self, offset: impl Into<String>) -> Self {
        self.config.utc_offset = offset.into();
        self
    }

    /// Set the first day of the week.
    pub fn week_start(mut self, day: impl Into<String>) -> Self {
        self.config.week_start = day.into();
        self
    }

    /// Set the global default operator token.
    pub fn default_operator(mut self, token: impl Into<String>) -> Self {
        self.config.default_operator = token.into();
        self
    }

    /// Validate and build.
    pub fn build(self) -> ReportResult<EngineConfig> {
        self.config.validate()?;
        info!(
            dialect = %self.config.dialect,
            base_table = %self.config.base_table,
            utc_offset = %self.config.utc_offset,
            "Engine configured"
        );
        Ok(self.config)
    }
}

/// "Now" and calendar settings captured once per compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileContext {
    /// Compilation instant, already in the calendar offset.
    pub now: DateTime<FixedOffset>,
    /// First day of the week.
    pub week_start: Weekday,
}

impl CompileContext {
    /// Create a context.
    pub fn new(now: DateTime<FixedOffset>, week_start: Weekday) -> Self {
        Self { now, week_start }
    }

    /// Calendar offset.
    pub fn offset(&self) -> FixedOffset {
        *self.now.offset()
    }

    /// Calendar day of `now`.
    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.dialect, DatabaseType::PostgreSQL);
        assert_eq!(config.base_table, "entries");
        assert_eq!(config.week_start().unwrap(), Weekday::Mon);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = EngineConfig::from_str(r#"dialect = "mysql""#).unwrap();
        assert_eq!(config.dialect, DatabaseType::MySQL);
        assert_eq!(config.utc_offset, "+00:00");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = EngineConfig::from_str(r#"timezone = "Europe/Berlin""#).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidConfiguration);
    }

    #[test]
    fn test_bad_offset_is_rejected() {
        let err = EngineConfig::builder().utc_offset("CET").build().unwrap_err();
        assert!(err.message.contains("utc_offset"));
    }

    #[test]
    fn test_bad_week_start_is_rejected() {
        assert!(EngineConfig::builder().week_start("someday").build().is_err());
        assert!(EngineConfig::builder().week_start("sunday").build().is_ok());
    }

    #[test]
    fn test_env_var_expansion() {
        // SAFETY: the variable name is unique to this test.
        unsafe {
            env::set_var("RECKON_TEST_BASE_TABLE", "time_entries");
        }
        let config = EngineConfig::from_str(r#"base_table = "${RECKON_TEST_BASE_TABLE}""#).unwrap();
        assert_eq!(config.base_table, "time_entries");
    }

    #[test]
    fn test_context_moves_now_into_offset() {
        let config = EngineConfig::builder().utc_offset("+03:00").build().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 22, 30, 0).unwrap();
        let ctx = config.context_at(now).unwrap();
        assert_eq!(ctx.today(), NaiveDate::from_ymd_opt(2024, 5, 16).unwrap());
        assert_eq!(ctx.offset().local_minus_utc(), 3 * 3600);
    }
}
