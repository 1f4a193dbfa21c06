//! Report definitions: a catalog, an engine configuration and a chain.
//!
//! ```rust
//! use reckon_query::config::EngineConfig;
//! use reckon_query::cost_query::{self, ASSIGNED_TO_ID};
//! use reckon_query::report::ReportQuery;
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(cost_query::catalog().unwrap());
//! let mut report = ReportQuery::new(catalog, EngineConfig::default());
//! report.filter(ASSIGNED_TO_ID, Some("="), [7i64]).unwrap();
//!
//! let compiled = report.compile().unwrap();
//! assert!(compiled.sql.ends_with("WHERE issues.assigned_to_id IN ($1)"));
//! ```

use chrono::{DateTime, TimeZone};
use tracing::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::{FilterCatalog, FilterType};
use crate::chain::{Chain, NodeId};
use crate::config::EngineConfig;
use crate::error::{ReportError, ReportResult};
use crate::filter::{Filter, FilterSpec};
use crate::sql::CompiledQuery;
use crate::value::FilterValue;

/// A selectable value for a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableValue {
    /// Label shown to the user.
    pub label: String,
    /// Value stored in the filter.
    pub value: FilterValue,
}

impl AvailableValue {
    /// Create a labelled value.
    pub fn new(label: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Enumerates selectable values for filter types.
///
/// Implemented by the embedding application. Compilation never calls it;
/// check [`FilterType::is_heavy`] before listing everything.
pub trait ValueSource {
    /// Values a user can pick for `filter_type`.
    fn available_values(&self, filter_type: &FilterType) -> ReportResult<Vec<AvailableValue>>;
}

/// Persistable report definition: filters from top to bottom.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainSpec {
    /// Filters, top first.
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
}

impl ChainSpec {
    /// Parse a definition stored as JSON.
    pub fn from_json(json: &str) -> ReportResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            ReportError::configuration(format!("malformed report definition: {}", e)).with_source(e)
        })
    }

    /// Render as JSON.
    pub fn to_json(&self) -> ReportResult<String> {
        serde_json::to_string(self).map_err(|e| {
            ReportError::configuration(format!("cannot store report definition: {}", e)).with_source(e)
        })
    }
}

/// A report being assembled.
#[derive(Debug, Clone)]
pub struct ReportQuery {
    catalog: Arc<FilterCatalog>,
    config: EngineConfig,
    chain: Chain,
}

impl ReportQuery {
    /// An unfiltered report.
    ///
    /// Filters added without an operator use `config.default_operator` when
    /// their type has no default of its own and offers that operator.
    pub fn new(catalog: Arc<FilterCatalog>, config: EngineConfig) -> Self {
        let token = config.default_operator.trim();
        if !catalog.knows_operator(token) {
            warn!(operator = %token, "Configured default operator is unknown to the catalog");
        }
        Self {
            catalog,
            config,
            chain: Chain::new(),
        }
    }

    /// Rebuild a report from its persisted definition.
    pub fn from_spec(
        catalog: Arc<FilterCatalog>,
        config: EngineConfig,
        spec: &ChainSpec,
    ) -> ReportResult<Self> {
        let mut report = Self::new(catalog, config);
        for filter in spec.filters.iter().rev() {
            report.filter(
                &filter.name,
                filter.operator.as_deref(),
                filter.values.iter().cloned(),
            )?;
        }
        Ok(report)
    }

    /// Persistable definition of this report.
    pub fn to_spec(&self) -> ChainSpec {
        ChainSpec {
            filters: self.chain.filters().iter().map(|f| f.to_spec()).collect(),
        }
    }

    /// Put a new filter on top of the chain.
    pub fn filter<I, V>(&mut self, name: &str, operator: Option<&str>, values: I) -> ReportResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        let fallback = self.config.default_operator.trim();
        let filter = self
            .catalog
            .build_filter(name, fallback, operator, values)?;
        crate::reckon_debug!(filter = %filter, "Adding filter");
        self.chain = self.chain.prepend(filter);
        Ok(self)
    }

    /// Edit the filter at `id`. Chains cloned from this report earlier keep the old filter.
    ///
    /// Returns `false` when `id` is not a filter of the chain.
    pub fn update_filter(&mut self, id: NodeId, f: impl FnOnce(&mut Filter)) -> bool {
        match self.chain.update_filter(id, f) {
            Some(chain) => {
                self.chain = chain;
                true
            }
            None => false,
        }
    }

    /// The chain built so far.
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// The catalog filters come from.
    pub fn catalog(&self) -> &FilterCatalog {
        &self.catalog
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether every filter accepts its values.
    pub fn is_valid(&self) -> bool {
        self.chain.is_valid()
    }

    /// Validation messages of every filter.
    pub fn errors(&self) -> Vec<String> {
        self.chain.errors()
    }

    /// Selectable values of a filter type, from `source`.
    pub fn available_values(&self, name: &str, source: &dyn ValueSource) -> ReportResult<Vec<AvailableValue>> {
        let filter_type = self.catalog.filter_type(name)?;
        if filter_type.is_abstract() {
            return Err(ReportError::abstract_construction(name));
        }
        source.available_values(filter_type)
    }

    /// Compile with the current time.
    pub fn compile(&self) -> ReportResult<CompiledQuery> {
        let ctx = self.config.context_now()?;
        self.chain
            .compile(&self.config.base_table, self.config.dialect, &ctx)
    }

    /// Compile as if it were `now`.
    pub fn compile_at<Tz: TimeZone>(&self, now: DateTime<Tz>) -> ReportResult<CompiledQuery> {
        let ctx = self.config.context_at(now)?;
        self.chain
            .compile(&self.config.base_table, self.config.dialect, &ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost_query::{self, ASSIGNED_TO_ID, Assignees, COST_FILTER};
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;

    fn report() -> ReportQuery {
        ReportQuery::new(
            Arc::new(cost_query::catalog().unwrap()),
            EngineConfig::default(),
        )
    }

    #[test]
    fn test_unfiltered_report() {
        let compiled = report().compile().unwrap();
        assert_eq!(compiled.sql, "SELECT * FROM entries");
    }

    #[test]
    fn test_filter_errors_are_prefixed() {
        let mut report = report();
        report
            .filter(ASSIGNED_TO_ID, Some("!"), Vec::<FilterValue>::new())
            .unwrap();
        assert!(!report.is_valid());
        assert_eq!(
            report.errors(),
            vec!["assigned_to_id: `!` expects at least 1 value(s), got 0".to_string()]
        );
        assert_eq!(
            report.compile().unwrap_err().code,
            ErrorCode::InvalidFilterState
        );
    }

    #[test]
    fn test_unknown_filter_type() {
        let err = report()
            .filter("no_such_filter", None, [1i64])
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownFilterType);
    }

    #[test]
    fn test_spec_round_trip() {
        let mut original = report();
        original
            .filter(ASSIGNED_TO_ID, Some("="), [1i64, 2])
            .unwrap()
            .filter(ASSIGNED_TO_ID, Some("!*"), Vec::<FilterValue>::new())
            .unwrap();

        let spec = original.to_spec();
        assert_eq!(spec.filters.len(), 2);
        assert_eq!(spec.filters[0].operator.as_deref(), Some("!*"));

        let json = spec.to_json().unwrap();
        let parsed = ChainSpec::from_json(&json).unwrap();
        let restored =
            ReportQuery::from_spec(Arc::clone(&original.catalog), EngineConfig::default(), &parsed)
                .unwrap();

        assert_eq!(restored.to_spec(), spec);
        assert_eq!(
            restored.compile().unwrap(),
            original.compile().unwrap()
        );
    }

    #[test]
    fn test_malformed_definition() {
        let err = ChainSpec::from_json(r#"{"filters": [{"operator": "="}]}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);

        let spec = ChainSpec::from_json(r#"{"filters": [{"name": "assigned_to_id", "values": [3]}]}"#)
            .unwrap();
        assert_eq!(spec.filters[0].operator, None);
        assert_eq!(spec.filters[0].values, vec![FilterValue::Int(3)]);
    }

    #[test]
    fn test_available_values() {
        let report = report();
        let source = Assignees::new([("Ada", 1i64)]);
        let values = report.available_values(ASSIGNED_TO_ID, &source).unwrap();
        assert_eq!(values, vec![AvailableValue::new("Ada", 1i64)]);

        let err = report.available_values(COST_FILTER, &source).unwrap_err();
        assert_eq!(err.code, ErrorCode::AbstractConstruction);
    }

    #[test]
    fn test_configured_default_operator_is_used() {
        let config = EngineConfig::builder().default_operator("!*").build().unwrap();
        let mut report = ReportQuery::new(Arc::new(cost_query::catalog().unwrap()), config);
        report
            .filter(ASSIGNED_TO_ID, None, Vec::<FilterValue>::new())
            .unwrap();

        assert!(report.compile().unwrap().sql.ends_with("WHERE issues.assigned_to_id IS NULL"));
        assert_eq!(report.to_spec().filters[0].operator, None);
    }

    #[test]
    fn test_update_filter_keeps_earlier_snapshots() {
        let mut report = report();
        report.filter(ASSIGNED_TO_ID, Some("="), [1i64]).unwrap();
        let snapshot = report.clone();
        let top = report.chain().top();

        assert!(report.update_filter(top, |f| {
            f.set_values([2i64, 3]);
        }));
        assert!(!report.update_filter(crate::chain::Chain::SENTINEL, |_| {}));

        assert_eq!(report.compile().unwrap().params.len(), 2);
        assert_eq!(snapshot.compile().unwrap().params, vec![FilterValue::Int(1)]);
    }
}
