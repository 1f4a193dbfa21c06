//! A filter: one predicate unit bound to a column.
//!
//! Filters are created through [`FilterCatalog::new_filter`](crate::catalog::FilterCatalog::new_filter)
//! and carry an operator and an ordered list of values. Validation is lazy:
//! values that do not satisfy the operator are accepted by the setters and
//! reported by [`Filter::is_valid`] / [`Filter::errors`].

use smol_str::SmolStr;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use crate::catalog::FilterType;
use crate::config::CompileContext;
use crate::error::{ReportError, ReportResult};
use crate::operator::Operator;
use crate::sql::SqlStatement;
use crate::value::{FilterValue, ValueList};

/// A filter instance.
#[derive(Debug, Clone)]
pub struct Filter {
    filter_type: Arc<FilterType>,
    default: Operator,
    operator: Option<Operator>,
    values: ValueList,
}

impl Filter {
    /// `default` must be one of the type's available operators.
    pub(crate) fn new(filter_type: Arc<FilterType>, default: Operator) -> Self {
        Self {
            filter_type,
            default,
            operator: None,
            values: ValueList::new(),
        }
    }

    /// Type name.
    pub fn name(&self) -> &str {
        self.filter_type.name()
    }

    /// The filter's type.
    pub fn filter_type(&self) -> &FilterType {
        &self.filter_type
    }

    /// Bound column; empty when unbound.
    pub fn column(&self) -> &str {
        self.filter_type.column()
    }

    /// Current values.
    pub fn values(&self) -> &[FilterValue] {
        &self.values
    }

    /// Replace the values.
    pub fn set_values<I, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the values with a single one.
    pub fn set_value(&mut self, value: impl Into<FilterValue>) -> &mut Self {
        self.set_values([value.into()])
    }

    /// Effective operator: explicit, else the default picked at creation.
    ///
    /// Either way it is one of the type's available operators.
    pub fn operator(&self) -> &Operator {
        self.operator.as_ref().unwrap_or(&self.default)
    }

    /// Whether an operator was assigned explicitly.
    pub fn has_explicit_operator(&self) -> bool {
        self.operator.is_some()
    }

    /// Assign an operator from the type's available operators.
    pub fn set_operator(&mut self, token: &str) -> ReportResult<&mut Self> {
        let operator = self
            .filter_type
            .operator(token)
            .cloned()
            .ok_or_else(|| ReportError::operator_not_supported(self.name(), token))?;
        trace!(filter = %self.name(), operator = %token, "Operator assigned");
        self.operator = Some(operator);
        Ok(self)
    }

    /// Whether the operator accepts the current values.
    pub fn is_valid(&self) -> bool {
        self.operator().validate(&self.values)
    }

    /// Validation messages of the operator against the current values.
    pub fn errors(&self) -> Vec<String> {
        self.operator().errors(&self.values)
    }

    /// Add joins and this filter's predicate to `stmt`.
    ///
    /// Unbound filters add nothing.
    pub fn contribute(&self, stmt: &mut SqlStatement, ctx: &CompileContext) -> ReportResult<()> {
        if self.column().is_empty() {
            trace!(filter = %self.name(), "Unbound filter skipped");
            return Ok(());
        }
        for join in self.filter_type.table_joins() {
            stmt.join(join.clone());
        }
        self.operator()
            .contribute(stmt, self.column(), &self.values, ctx)
            .map_err(|e| e.with_filter(self.name()))
    }

    /// Persistable form of this filter.
    pub fn to_spec(&self) -> FilterSpec {
        FilterSpec {
            name: SmolStr::new(self.name()),
            operator: self.operator.as_ref().map(|op| SmolStr::new(op.token())),
            values: self.values.to_vec(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.operator())?;
        for (i, value) in self.values.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{:?}", sep, value)?;
        }
        Ok(())
    }
}

/// A filter as stored in a report definition.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FilterSpec {
    /// Filter type name.
    pub name: SmolStr,
    /// Explicit operator token, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<SmolStr>,
    /// Values.
    #[serde(default)]
    pub values: Vec<FilterValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FilterCatalog, FilterTypeDecl};
    use crate::error::ErrorCode;
    use crate::operator::OperatorGroup;
    use crate::sql::{DatabaseType, JoinSpec};
    use chrono::{FixedOffset, TimeZone, Weekday};
    use pretty_assertions::assert_eq;

    fn catalog() -> FilterCatalog {
        FilterCatalog::builder()
            .register(
                FilterTypeDecl::new("activity_id")
                    .column("entries.activity_id")
                    .use_group(OperatorGroup::Null),
            )
            .unwrap()
            .register(
                FilterTypeDecl::new("created_on")
                    .column("entries.created_on")
                    .use_group(OperatorGroup::Time)
                    .default_operator("t"),
            )
            .unwrap()
            .register(
                FilterTypeDecl::new("tracker_id")
                    .column("issues.tracker_id")
                    .join(JoinSpec::belongs_to("issues", "entries", "issue_id")),
            )
            .unwrap()
            .register(FilterTypeDecl::new("unbound"))
            .unwrap()
            .build()
            .unwrap()
    }

    fn ctx() -> CompileContext {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 15, 9, 0, 0)
            .unwrap();
        CompileContext::new(now, Weekday::Mon)
    }

    #[test]
    fn test_operator_resolution_order() {
        let catalog = catalog();

        let activity = catalog.new_filter("activity_id").unwrap();
        assert_eq!(activity.operator().token(), "=");

        let mut created = catalog.new_filter("created_on").unwrap();
        assert_eq!(created.operator().token(), "t");
        created.set_operator("w").unwrap();
        assert_eq!(created.operator().token(), "w");
        assert!(created.has_explicit_operator());
    }

    #[test]
    fn test_default_respects_the_requested_fallback() {
        let catalog = catalog();

        let activity = catalog.new_filter_defaulting("activity_id", "!*").unwrap();
        assert_eq!(activity.operator().token(), "!*");
        assert!(!activity.has_explicit_operator());

        let created = catalog.new_filter_defaulting("created_on", "!*").unwrap();
        assert_eq!(created.operator().token(), "t");

        let tracker = catalog.new_filter_defaulting("tracker_id", "!*").unwrap();
        assert_eq!(tracker.operator().token(), "=");
    }

    #[test]
    fn test_unsupported_operator_is_rejected() {
        let catalog = catalog();
        let mut activity = catalog.new_filter("activity_id").unwrap();
        let err = activity.set_operator("t+").unwrap_err();
        assert_eq!(err.code, ErrorCode::OperatorNotSupported);
        assert_eq!(activity.operator().token(), "=");
    }

    #[test]
    fn test_validation_is_lazy() {
        let catalog = catalog();
        let mut activity = catalog.new_filter("activity_id").unwrap();
        assert!(!activity.is_valid());
        assert_eq!(activity.errors().len(), 1);

        activity.set_value(3i64);
        assert!(activity.is_valid());
        assert!(activity.errors().is_empty());
    }

    #[test]
    fn test_contribute_adds_join_and_predicate() {
        let catalog = catalog();
        let mut tracker = catalog.new_filter("tracker_id").unwrap();
        tracker.set_values([1i64, 2]);

        let mut stmt = SqlStatement::new("entries", DatabaseType::PostgreSQL);
        tracker.contribute(&mut stmt, &ctx()).unwrap();
        tracker.contribute(&mut stmt, &ctx()).unwrap();

        assert_eq!(
            stmt.sql(),
            "SELECT * FROM entries \
             LEFT OUTER JOIN issues ON issues.id = entries.issue_id \
             WHERE issues.tracker_id IN ($1, $2) AND issues.tracker_id IN ($3, $4)"
        );
    }

    #[test]
    fn test_unbound_filter_contributes_nothing() {
        let catalog = catalog();
        let mut unbound = catalog.new_filter("unbound").unwrap();
        unbound.set_value(1i64);

        let mut stmt = SqlStatement::new("entries", DatabaseType::PostgreSQL);
        unbound.contribute(&mut stmt, &ctx()).unwrap();
        assert_eq!(stmt.sql(), "SELECT * FROM entries");
    }

    #[test]
    fn test_contribute_error_names_filter() {
        let catalog = catalog();
        let tracker = catalog.new_filter("tracker_id").unwrap();
        let mut stmt = SqlStatement::new("entries", DatabaseType::PostgreSQL);
        let err = tracker.contribute(&mut stmt, &ctx()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ArityMismatch);
        assert_eq!(err.context.filter.as_deref(), Some("tracker_id"));
    }

    #[test]
    fn test_display() {
        let catalog = catalog();
        let mut activity = catalog.new_filter("activity_id").unwrap();
        activity.set_values([1i64, 2]);
        assert_eq!(activity.to_string(), "activity_id = Int(1), Int(2)");
    }

    #[test]
    fn test_spec_keeps_only_explicit_operator() {
        let catalog = catalog();
        let mut created = catalog.new_filter("created_on").unwrap();
        assert_eq!(created.to_spec().operator, None);
        created.set_operator("t+").unwrap().set_value(2i64);
        let spec = created.to_spec();
        assert_eq!(spec.operator.as_deref(), Some("t+"));
        assert_eq!(spec.values, vec![FilterValue::Int(2)]);
    }
}
