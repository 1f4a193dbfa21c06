//! Filter types of cost and time reports.
//!
//! Cost reports select from the `entries` table (cost and time entries
//! side by side). [`COST_FILTER`] is the abstract parent of every cost
//! report filter; its direct children are offered in the UI.

use smol_str::SmolStr;

use crate::catalog::{FilterCatalog, FilterCatalogBuilder, FilterType, FilterTypeDecl};
use crate::error::{ReportError, ReportResult};
use crate::operator::OperatorGroup;
use crate::report::{AvailableValue, ValueSource};
use crate::sql::JoinSpec;

/// Base table of cost reports.
pub const ENTRIES_TABLE: &str = "entries";

/// Abstract parent of every cost report filter.
pub const COST_FILTER: &str = "cost_filter";

/// Filter on the assignee of the entry's issue.
pub const ASSIGNED_TO_ID: &str = "assigned_to_id";

/// Join from entries to their issue.
pub fn issue_join() -> JoinSpec {
    JoinSpec::belongs_to("issues", ENTRIES_TABLE, "issue_id")
}

/// Declaration of the abstract cost filter.
pub fn cost_filter() -> FilterTypeDecl {
    FilterTypeDecl::abstract_type(COST_FILTER)
}

/// Declaration of `assigned_to_id`.
pub fn assigned_to_id() -> FilterTypeDecl {
    FilterTypeDecl::new(ASSIGNED_TO_ID)
        .parent(COST_FILTER)
        .column("issues.assigned_to_id")
        .join(issue_join())
        .use_group(OperatorGroup::Null)
}

/// Add the cost report filter types to `builder`.
pub fn register(builder: FilterCatalogBuilder) -> ReportResult<FilterCatalogBuilder> {
    builder.register(cost_filter())?.register(assigned_to_id())
}

/// Catalog with only the cost report filter types.
pub fn catalog() -> ReportResult<FilterCatalog> {
    register(FilterCatalog::builder())?.build()
}

/// Users that can be picked for `assigned_to_id`.
#[derive(Debug, Clone, Default)]
pub struct Assignees {
    users: Vec<(SmolStr, i64)>,
}

impl Assignees {
    /// Create from `(name, id)` pairs.
    pub fn new<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<SmolStr>,
    {
        Self {
            users: users.into_iter().map(|(name, id)| (name.into(), id)).collect(),
        }
    }
}

impl ValueSource for Assignees {
    fn available_values(&self, filter_type: &FilterType) -> ReportResult<Vec<AvailableValue>> {
        if filter_type.name() != ASSIGNED_TO_ID {
            return Err(ReportError::unknown_filter_type(filter_type.name())
                .with_help("Assignees only lists values for assigned_to_id"));
        }
        Ok(self
            .users
            .iter()
            .map(|(name, id)| AvailableValue::new(name.as_str(), *id))
            .collect())
    }
}
