//! Filter type declarations and the frozen catalog built from them.
//!
//! Every filter type descends from the abstract [`BASE_FILTER`]. A type
//! declares the column it filters, the joins needed to reach that column
//! from the report's base table, and the operators it offers. Operators
//! are added with `use`: a whole [`OperatorGroup`] or single tokens. Using
//! the time group, `y` or `n` stops the type from inheriting its parent's
//! operators.
//!
//! ```rust
//! use reckon_query::catalog::{FilterCatalog, FilterTypeDecl};
//! use reckon_query::operator::OperatorGroup;
//! use reckon_query::sql::JoinSpec;
//!
//! let catalog = FilterCatalog::builder()
//!     .register(
//!         FilterTypeDecl::new("project_id")
//!             .column("entries.project_id")
//!             .use_group(OperatorGroup::Null),
//!     )
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let project = catalog.filter_type("project_id").unwrap();
//! assert!(project.supports("!*"));
//! assert!(!project.supports("t"));
//! ```

use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;
use std::sync::Arc;
use tracing::debug;

use crate::attribute::{AttributeOptions, AttributeValue, FrozenHierarchy, TypeHierarchy};
use crate::config::EngineConfig;
use crate::error::{ReportError, ReportResult};
use crate::filter::Filter;
use crate::operator::{BuiltinOperator, Operator, OperatorGroup, OperatorRegistry};
use crate::sql::JoinSpec;
use crate::value::FilterValue;

/// Name of the abstract root filter type.
pub const BASE_FILTER: &str = "filter";

/// Attribute names used by the catalog.
pub mod attrs {
    /// Table-qualified column a type filters.
    pub const COLUMN: &str = "column";
    /// Operators a type offers.
    pub const AVAILABLE_OPERATORS: &str = "available_operators";
    /// Operator used when none is assigned.
    pub const DEFAULT_OPERATOR: &str = "default_operator";
    /// Joins reaching the column.
    pub const TABLE_JOINS: &str = "table_joins";
    /// Whether available values are too many to list.
    pub const HEAVY: &str = "heavy";
    /// Whether the type is offered in selection widgets.
    pub const DISPLAY: &str = "display";
}

/// One entry of a `use` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorUse {
    /// A named group.
    Group(OperatorGroup),
    /// A single token.
    Token(SmolStr),
}

impl OperatorUse {
    /// Whether using this entry cuts inheritance of `available_operators`.
    pub fn skips_inherited(&self) -> bool {
        match self {
            Self::Group(group) => *group == OperatorGroup::Time,
            Self::Token(token) => matches!(token.as_str(), "y" | "n"),
        }
    }

    fn tokens(&self) -> Vec<SmolStr> {
        match self {
            Self::Group(group) => group
                .operators()
                .iter()
                .map(|op| SmolStr::new_static(op.token()))
                .collect(),
            Self::Token(token) => vec![token.clone()],
        }
    }
}

/// Declaration of one filter type.
#[derive(Debug, Clone)]
pub struct FilterTypeDecl {
    name: SmolStr,
    parent: SmolStr,
    column: SmolStr,
    joins: Vec<JoinSpec>,
    uses: Vec<OperatorUse>,
    default_operator: Option<SmolStr>,
    heavy: Option<bool>,
    is_abstract: bool,
}

impl FilterTypeDecl {
    /// Declare a concrete type below [`BASE_FILTER`].
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            parent: SmolStr::new_static(BASE_FILTER),
            column: SmolStr::default(),
            joins: Vec::new(),
            uses: Vec::new(),
            default_operator: None,
            heavy: None,
            is_abstract: false,
        }
    }

    /// Declare an abstract type. Abstract types can be inherited from but never placed in a chain.
    pub fn abstract_type(name: impl Into<SmolStr>) -> Self {
        Self {
            is_abstract: true,
            ..Self::new(name)
        }
    }

    /// Set the parent type.
    pub fn parent(mut self, parent: impl Into<SmolStr>) -> Self {
        self.parent = parent.into();
        self
    }

    /// Bind the type to a (table-qualified) column. Subtypes inherit the binding.
    pub fn column(mut self, column: impl Into<SmolStr>) -> Self {
        self.column = column.into();
        self
    }

    /// Add a join needed to reach the column.
    pub fn join(mut self, join: JoinSpec) -> Self {
        self.joins.push(join);
        self
    }

    /// Offer every operator of a group.
    pub fn use_group(mut self, group: OperatorGroup) -> Self {
        self.uses.push(OperatorUse::Group(group));
        self
    }

    /// Offer a single operator.
    pub fn use_operator(mut self, token: impl Into<SmolStr>) -> Self {
        self.uses.push(OperatorUse::Token(token.into()));
        self
    }

    /// Operator used when a filter of this type has none assigned.
    pub fn default_operator(mut self, token: impl Into<SmolStr>) -> Self {
        self.default_operator = Some(token.into());
        self
    }

    /// Mark the value domain as too large to enumerate.
    pub fn heavy(mut self, heavy: bool) -> Self {
        self.heavy = Some(heavy);
        self
    }
}

/// Collects declarations and freezes them into a [`FilterCatalog`].
#[derive(Debug)]
pub struct FilterCatalogBuilder {
    hierarchy: TypeHierarchy,
    decls: IndexMap<SmolStr, FilterTypeDecl>,
    default_operator: SmolStr,
}

impl Default for FilterCatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterCatalogBuilder {
    /// A builder holding only the abstract root type.
    pub fn new() -> Self {
        let mut decls = IndexMap::new();
        decls.insert(
            SmolStr::new_static(BASE_FILTER),
            FilterTypeDecl::abstract_type(BASE_FILTER).use_group(OperatorGroup::Default),
        );
        Self {
            hierarchy: root_hierarchy(),
            decls,
            default_operator: SmolStr::new_static(BuiltinOperator::Equal.token()),
        }
    }

    /// Global fallback operator.
    pub fn global_default_operator(mut self, token: impl Into<SmolStr>) -> Self {
        self.default_operator = token.into();
        self
    }

    /// Take the global fallback operator from engine configuration.
    pub fn with_config(self, config: &EngineConfig) -> Self {
        self.global_default_operator(config.default_operator.trim())
    }

    /// Add a filter type. The parent must already be registered.
    pub fn register(mut self, decl: FilterTypeDecl) -> ReportResult<Self> {
        let name = decl.name.clone();
        self.hierarchy.add_type(name.clone(), Some(decl.parent.as_str()))?;

        for using in &decl.uses {
            if using.skips_inherited() {
                crate::reckon_trace!(filter = %name, "Operators not inherited");
                self.hierarchy
                    .stop_inheritance(&name, attrs::AVAILABLE_OPERATORS)?;
            }
        }
        if !decl.column.is_empty() {
            self.hierarchy
                .set(&name, attrs::COLUMN, [decl.column.clone()])?;
        }
        let tokens: Vec<SmolStr> = decl.uses.iter().flat_map(OperatorUse::tokens).collect();
        if !tokens.is_empty() {
            self.hierarchy.set(&name, attrs::AVAILABLE_OPERATORS, tokens)?;
        }
        if let Some(token) = &decl.default_operator {
            self.hierarchy
                .set(&name, attrs::DEFAULT_OPERATOR, [token.clone()])?;
        }
        if !decl.joins.is_empty() {
            self.hierarchy
                .set(&name, attrs::TABLE_JOINS, decl.joins.iter().cloned())?;
        }
        if let Some(heavy) = decl.heavy {
            self.hierarchy.set(&name, attrs::HEAVY, [heavy])?;
        }

        let parent_is_abstract = self
            .decls
            .get(&decl.parent)
            .is_some_and(|parent| parent.is_abstract);
        if decl.is_abstract {
            self.hierarchy.set(&name, attrs::DISPLAY, [false])?;
        } else if parent_is_abstract {
            self.hierarchy.set(&name, attrs::DISPLAY, [true])?;
        }

        debug!(filter = %name, parent = %decl.parent, "Registered filter type");
        self.decls.insert(name, decl);
        Ok(self)
    }

    /// Shorthand for a concrete type below the root.
    pub fn register_filter_type(
        self,
        name: impl Into<SmolStr>,
        column: impl Into<SmolStr>,
        join: Option<JoinSpec>,
        operators: &[&str],
        default_operator: Option<&str>,
    ) -> ReportResult<Self> {
        let mut decl = FilterTypeDecl::new(name).column(column);
        if let Some(join) = join {
            decl = decl.join(join);
        }
        for token in operators {
            decl = decl.use_operator(*token);
        }
        if let Some(token) = default_operator {
            decl = decl.default_operator(token);
        }
        self.register(decl)
    }

    /// Freeze against the global operator registry.
    pub fn build(self) -> ReportResult<FilterCatalog> {
        self.build_with(OperatorRegistry::global())
    }

    /// Freeze, resolving every operator token through `registry`.
    pub fn build_with(self, registry: &OperatorRegistry) -> ReportResult<FilterCatalog> {
        let frozen = self.hierarchy.freeze();
        let fallback = registry.lookup(&self.default_operator)?;

        let mut types = IndexMap::with_capacity(self.decls.len());
        for (name, decl) in &self.decls {
            let resolved = frozen
                .get(name)
                .ok_or_else(|| ReportError::unknown_filter_type(name.as_str()))?;

            let available_operators = resolved
                .list(attrs::AVAILABLE_OPERATORS)
                .iter()
                .filter_map(AttributeValue::as_text)
                .map(|token| {
                    registry
                        .lookup(token)
                        .map_err(|e| e.with_filter(name.as_str()))
                })
                .collect::<ReportResult<Vec<Operator>>>()?;

            let default_operator = resolved
                .scalar(attrs::DEFAULT_OPERATOR)
                .and_then(AttributeValue::as_text)
                .map(|token| registry.lookup(token).map_err(|e| e.with_filter(name.as_str())))
                .transpose()?;
            if let Some(op) = &default_operator {
                if !available_operators.contains(op) {
                    return Err(ReportError::operator_not_supported(name.as_str(), op.token())
                        .with_help("A type's default operator must be one of its available operators"));
                }
            }
            if !decl.is_abstract && available_operators.is_empty() {
                return Err(ReportError::configuration(format!(
                    "filter type `{}` offers no operators",
                    name
                ))
                .with_filter(name.as_str()));
            }

            let column = resolved
                .scalar(attrs::COLUMN)
                .and_then(AttributeValue::as_text)
                .map(SmolStr::new)
                .unwrap_or_default();

            let table_joins = resolved
                .list(attrs::TABLE_JOINS)
                .iter()
                .filter_map(AttributeValue::as_join)
                .cloned()
                .collect();

            types.insert(
                name.clone(),
                Arc::new(FilterType {
                    name: name.clone(),
                    parent: resolved.parent().map(SmolStr::new),
                    column,
                    table_joins,
                    available_operators,
                    default_operator,
                    heavy: resolved.flag(attrs::HEAVY),
                    display: resolved.flag(attrs::DISPLAY),
                    is_abstract: decl.is_abstract,
                }),
            );
        }

        debug!(types = types.len(), "Filter catalog frozen");
        Ok(FilterCatalog {
            types,
            hierarchy: frozen,
            fallback,
            known_operators: registry.tokens().into_iter().collect(),
        })
    }
}

fn root_hierarchy() -> TypeHierarchy {
    let default_operators: Vec<AttributeValue> = OperatorGroup::Default
        .operators()
        .iter()
        .map(|op| AttributeValue::Text(SmolStr::new_static(op.token())))
        .collect();

    TypeHierarchy::with_root(
        BASE_FILTER,
        [
            (attrs::COLUMN, AttributeOptions::scalar()),
            (
                attrs::AVAILABLE_OPERATORS,
                AttributeOptions::list().uniq().map(canonical_token),
            ),
            (
                attrs::DEFAULT_OPERATOR,
                AttributeOptions::scalar().map(canonical_token),
            ),
            (attrs::TABLE_JOINS, AttributeOptions::list().uniq()),
            (attrs::HEAVY, AttributeOptions::scalar().default_value(false)),
            (attrs::DISPLAY, AttributeOptions::scalar().default_value(true)),
        ],
        [
            (attrs::AVAILABLE_OPERATORS, default_operators),
            (attrs::DISPLAY, vec![AttributeValue::Bool(false)]),
        ],
    )
}

fn canonical_token(value: AttributeValue) -> AttributeValue {
    match value {
        AttributeValue::Text(token) => AttributeValue::Text(SmolStr::new(token.trim())),
        other => other,
    }
}

/// A frozen filter type.
#[derive(Debug, Clone)]
pub struct FilterType {
    name: SmolStr,
    parent: Option<SmolStr>,
    column: SmolStr,
    table_joins: Vec<JoinSpec>,
    available_operators: Vec<Operator>,
    default_operator: Option<Operator>,
    heavy: bool,
    display: bool,
    is_abstract: bool,
}

impl FilterType {
    /// Type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent type name.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Bound column; empty when unbound.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Joins reaching the column, in declaration order.
    pub fn table_joins(&self) -> &[JoinSpec] {
        &self.table_joins
    }

    /// Resolved operator set.
    pub fn available_operators(&self) -> &[Operator] {
        &self.available_operators
    }

    /// The type's own default operator, declared on it or an ancestor.
    pub fn default_operator(&self) -> Option<&Operator> {
        self.default_operator.as_ref()
    }

    /// Operator of a filter with none assigned.
    ///
    /// The type's own default, else `fallback` when the type offers it, else
    /// the first available operator.
    pub fn effective_default(&self, fallback: &str) -> Option<&Operator> {
        self.default_operator
            .as_ref()
            .or_else(|| self.operator(fallback))
            .or_else(|| self.available_operators.first())
    }

    /// The available operator answering to `token`.
    pub fn operator(&self, token: &str) -> Option<&Operator> {
        self.available_operators.iter().find(|op| op.token() == token)
    }

    /// Whether `token` is in the resolved operator set.
    pub fn supports(&self, token: &str) -> bool {
        self.operator(token).is_some()
    }

    /// Whether the value domain is too large to enumerate.
    pub fn is_heavy(&self) -> bool {
        self.heavy
    }

    /// Whether the type is offered in selection widgets.
    pub fn is_displayed(&self) -> bool {
        self.display
    }

    /// Whether the type can only be inherited from.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }
}

/// Immutable registry of filter types.
#[derive(Debug, Clone)]
pub struct FilterCatalog {
    types: IndexMap<SmolStr, Arc<FilterType>>,
    hierarchy: FrozenHierarchy,
    fallback: Operator,
    known_operators: IndexSet<SmolStr>,
}

impl FilterCatalog {
    /// Start declaring filter types.
    pub fn builder() -> FilterCatalogBuilder {
        FilterCatalogBuilder::new()
    }

    /// Look up a type, abstract ones included.
    pub fn filter_type(&self, name: &str) -> ReportResult<&Arc<FilterType>> {
        self.types
            .get(name)
            .ok_or_else(|| ReportError::unknown_filter_type(name))
    }

    /// Whether a type is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// All types in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &Arc<FilterType>> {
        self.types.values()
    }

    /// Types offered in selection widgets.
    pub fn displayed(&self) -> impl Iterator<Item = &Arc<FilterType>> {
        self.types.values().filter(|t| t.is_displayed() && !t.is_abstract())
    }

    /// Whether `name` is `ancestor` or descends from it.
    pub fn is_a(&self, name: &str, ancestor: &str) -> bool {
        self.hierarchy.is_a(name, ancestor)
    }

    /// Global fallback operator.
    pub fn fallback_operator(&self) -> &Operator {
        &self.fallback
    }

    /// Create an empty filter of a concrete type.
    pub fn new_filter(&self, name: &str) -> ReportResult<Filter> {
        self.new_filter_defaulting(name, self.fallback.token())
    }

    /// Create an empty filter whose unassigned operator prefers `fallback` over the catalog's.
    pub fn new_filter_defaulting(&self, name: &str, fallback: &str) -> ReportResult<Filter> {
        let filter_type = self.filter_type(name)?;
        if filter_type.is_abstract() {
            return Err(ReportError::abstract_construction(name));
        }
        let default = filter_type
            .effective_default(fallback)
            .cloned()
            .ok_or_else(|| ReportError::operator_not_supported(name, fallback))?;
        Ok(Filter::new(Arc::clone(filter_type), default))
    }

    /// Whether the registry the catalog was built with knows `token`.
    pub fn knows_operator(&self, token: &str) -> bool {
        self.known_operators.contains(token)
    }

    /// Create a filter with an optional explicit operator and its values.
    pub fn new_filter_with<I, V>(&self, name: &str, operator: Option<&str>, values: I) -> ReportResult<Filter>
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        self.build_filter(name, self.fallback.token(), operator, values)
    }

    pub(crate) fn build_filter<I, V>(
        &self,
        name: &str,
        fallback: &str,
        operator: Option<&str>,
        values: I,
    ) -> ReportResult<Filter>
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        let mut filter = self.new_filter_defaulting(name, fallback)?;
        if let Some(token) = operator {
            if !self.knows_operator(token) {
                return Err(ReportError::unknown_operator(token).with_filter(name));
            }
            filter.set_operator(token)?;
        }
        filter.set_values(values);
        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;

    fn tokens(filter_type: &FilterType) -> Vec<&str> {
        filter_type.available_operators().iter().map(Operator::token).collect()
    }

    fn catalog() -> FilterCatalog {
        FilterCatalog::builder()
            .register(FilterTypeDecl::abstract_type("entry_filter"))
            .unwrap()
            .register(
                FilterTypeDecl::new("project_id")
                    .parent("entry_filter")
                    .column("entries.project_id")
                    .use_group(OperatorGroup::Null),
            )
            .unwrap()
            .register(
                FilterTypeDecl::new("spent_on")
                    .parent("entry_filter")
                    .column("entries.spent_on")
                    .use_group(OperatorGroup::Time)
                    .default_operator("w"),
            )
            .unwrap()
            .register(
                FilterTypeDecl::new("overridden_costs")
                    .column("entries.overridden_costs")
                    .use_operator("y")
                    .use_operator("n"),
            )
            .unwrap()
            .register(
                FilterTypeDecl::new("subject")
                    .column("issues.subject")
                    .join(JoinSpec::belongs_to("issues", "entries", "issue_id"))
                    .use_group(OperatorGroup::String)
                    .heavy(true),
            )
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_base_offers_default_operators() {
        let catalog = catalog();
        let base = catalog.filter_type(BASE_FILTER).unwrap();
        assert_eq!(tokens(base), vec!["=", "!"]);
        assert!(base.is_abstract());
        assert!(!base.is_displayed());
    }

    #[test]
    fn test_groups_merge_with_inherited_operators() {
        let catalog = catalog();
        let project = catalog.filter_type("project_id").unwrap();
        assert_eq!(tokens(project), vec!["=", "!", "!*", "*"]);
    }

    #[test]
    fn test_time_group_skips_inherited_operators() {
        let catalog = catalog();
        let spent_on = catalog.filter_type("spent_on").unwrap();
        assert!(!spent_on.supports("="));
        assert!(spent_on.supports("t"));
        assert_eq!(spent_on.default_operator().map(Operator::token), Some("w"));
    }

    #[test]
    fn test_y_and_n_skip_inherited_operators() {
        let catalog = catalog();
        let costs = catalog.filter_type("overridden_costs").unwrap();
        assert_eq!(tokens(costs), vec!["y", "n"]);
    }

    #[test]
    fn test_heavy_and_joins() {
        let catalog = catalog();
        let subject = catalog.filter_type("subject").unwrap();
        assert!(subject.is_heavy());
        assert!(!catalog.filter_type("project_id").unwrap().is_heavy());
        assert_eq!(subject.table_joins().len(), 1);
    }

    #[test]
    fn test_display_flags() {
        let catalog = catalog();
        let displayed: Vec<&str> = catalog.displayed().map(|t| t.name()).collect();
        assert_eq!(
            displayed,
            vec!["project_id", "spent_on", "overridden_costs", "subject"]
        );
        assert!(!catalog.filter_type("entry_filter").unwrap().is_displayed());
    }

    #[test]
    fn test_abstract_types_cannot_be_instantiated() {
        let catalog = catalog();
        let err = catalog.new_filter(BASE_FILTER).unwrap_err();
        assert_eq!(err.code, ErrorCode::AbstractConstruction);
        let err = catalog.new_filter("entry_filter").unwrap_err();
        assert_eq!(err.code, ErrorCode::AbstractConstruction);
        assert!(catalog.new_filter("project_id").is_ok());
    }

    #[test]
    fn test_unknown_type() {
        let err = catalog().new_filter("nope").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownFilterType);
    }

    #[test]
    fn test_unknown_operator_fails_build() {
        let err = FilterCatalog::builder()
            .register(FilterTypeDecl::new("odd").use_operator("=~"))
            .unwrap()
            .build_with(&OperatorRegistry::new())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownOperator);
        assert_eq!(err.context.filter.as_deref(), Some("odd"));
    }

    #[test]
    fn test_new_filter_with_operator() {
        let catalog = catalog();
        let filter = catalog
            .new_filter_with("spent_on", Some("t-"), [3i64])
            .unwrap();
        assert_eq!(filter.operator().token(), "t-");
        assert!(filter.is_valid());

        let err = catalog
            .new_filter_with("project_id", Some("t-"), [3i64])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OperatorNotSupported);

        let err = catalog
            .new_filter_with("project_id", Some("=~"), [3i64])
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownOperator);
    }

    #[test]
    fn test_unknown_parent() {
        let err = FilterCatalog::builder()
            .register(FilterTypeDecl::new("orphan").parent("missing"))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownParentType);
    }

    #[test]
    fn test_register_filter_type_shorthand() {
        let catalog = FilterCatalog::builder()
            .register_filter_type(
                "tracker_id",
                "issues.tracker_id",
                Some(JoinSpec::belongs_to("issues", "entries", "issue_id")),
                &["!*", " * "],
                Some("!"),
            )
            .unwrap()
            .build()
            .unwrap();
        let tracker = catalog.filter_type("tracker_id").unwrap();
        assert_eq!(tokens(tracker), vec!["=", "!", "!*", "*"]);
        assert_eq!(tracker.default_operator().map(Operator::token), Some("!"));
        assert!(catalog.is_a("tracker_id", BASE_FILTER));
    }

    #[test]
    fn test_fresh_builder_holds_the_root() {
        let catalog = FilterCatalogBuilder::new().build().unwrap();
        let base = catalog.filter_type(BASE_FILTER).unwrap();
        assert_eq!(tokens(base), vec!["=", "!"]);
        assert_eq!(base.column(), "");
        assert!(base.is_abstract());
        assert_eq!(catalog.types().count(), 1);
    }

    #[test]
    fn test_subtypes_inherit_the_column() {
        let catalog = FilterCatalog::builder()
            .register(
                FilterTypeDecl::new("project_id")
                    .column("entries.project_id")
                    .use_group(OperatorGroup::Null),
            )
            .unwrap()
            .register(FilterTypeDecl::new("sub_project_id").parent("project_id"))
            .unwrap()
            .register(
                FilterTypeDecl::new("parent_project_id")
                    .parent("project_id")
                    .column("projects.parent_id")
                    .join(JoinSpec::belongs_to("projects", "entries", "project_id")),
            )
            .unwrap()
            .build()
            .unwrap();

        let sub = catalog.filter_type("sub_project_id").unwrap();
        assert_eq!(sub.column(), "entries.project_id");
        assert_eq!(tokens(sub), vec!["=", "!", "!*", "*"]);
        let parent = catalog.filter_type("parent_project_id").unwrap();
        assert_eq!(parent.column(), "projects.parent_id");
        assert_eq!(catalog.filter_type("project_id").unwrap().column(), "entries.project_id");
    }

    #[test]
    fn test_default_outside_available_operators_fails_build() {
        let err = FilterCatalog::builder()
            .register(
                FilterTypeDecl::new("spent_on")
                    .column("entries.spent_on")
                    .use_group(OperatorGroup::Time)
                    .default_operator("="),
            )
            .unwrap()
            .build()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OperatorNotSupported);
        assert_eq!(err.context.filter.as_deref(), Some("spent_on"));
    }

    #[test]
    fn test_unassigned_operator_stays_within_the_type() {
        let catalog = FilterCatalog::builder()
            .register(
                FilterTypeDecl::new("logged_on")
                    .column("entries.logged_on")
                    .use_group(OperatorGroup::Time),
            )
            .unwrap()
            .register(
                FilterTypeDecl::new("overridden_costs")
                    .column("entries.overridden_costs")
                    .use_operator("y")
                    .use_operator("n"),
            )
            .unwrap()
            .build()
            .unwrap();

        let logged_on = catalog.new_filter("logged_on").unwrap();
        assert_eq!(logged_on.operator().token(), "t");
        assert!(logged_on.filter_type().supports(logged_on.operator().token()));
        assert!(logged_on.is_valid());

        let costs = catalog.new_filter("overridden_costs").unwrap();
        assert_eq!(costs.operator().token(), "y");

        let logged_on = catalog.filter_type("logged_on").unwrap();
        assert_eq!(logged_on.effective_default("w").map(Operator::token), Some("w"));
        assert_eq!(logged_on.effective_default("=").map(Operator::token), Some("t"));
    }
}
