//! Filter chains.
//!
//! A chain is a persistent list of immutable nodes ending in the sentinel:
//! a node that filters nothing, is always the chain's bottom and keeps even
//! an empty chain non-empty. Prepending a filter allocates one node on top
//! of the existing ones and returns a new chain; the chain it was prepended
//! to keeps its own nodes and top. Chains branching from a common base share
//! the base's nodes, and nodes no chain refers to any more are freed.
//!
//! Nodes are never changed in place. [`Chain::update_filter`] copies the
//! edited node and the nodes above it into a new chain.
//!
//! The top node is responsible for compilation. It seeds a fresh
//! [`SqlStatement`] with the base table, then every node is visited from
//! bottom to top and adds its joins and predicate.
//!
//! ```rust
//! use reckon_query::catalog::{FilterCatalog, FilterTypeDecl};
//! use reckon_query::chain::Chain;
//!
//! let catalog = FilterCatalog::builder()
//!     .register(FilterTypeDecl::new("user_id").column("entries.user_id"))
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let empty = Chain::new();
//! let mut user = catalog.new_filter("user_id").unwrap();
//! user.set_value(3i64);
//! let chain = empty.prepend(user);
//!
//! assert_eq!(chain.bottom(), Chain::SENTINEL);
//! assert_ne!(chain.top(), Chain::SENTINEL);
//! assert_eq!(empty.top(), Chain::SENTINEL);
//! ```

use std::fmt;
use std::iter;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

use crate::config::CompileContext;
use crate::error::{ReportError, ReportResult};
use crate::filter::Filter;
use crate::sql::{CompiledQuery, DatabaseType, SqlStatement};

/// Identity of a chain node.
///
/// Ids are unique per process; the sentinel of every chain is `#0`. A node
/// rewritten by [`Chain::update_filter`] keeps its id in the new chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    fn next() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of a chain.
#[derive(Debug, Clone)]
pub enum ChainNode {
    /// The terminal no-op node.
    Sentinel,
    /// A real filter.
    Filter(Filter),
}

impl ChainNode {
    /// Whether this is the sentinel.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Sentinel)
    }

    /// The filter, unless this is the sentinel.
    pub fn as_filter(&self) -> Option<&Filter> {
        match self {
            Self::Filter(filter) => Some(filter),
            Self::Sentinel => None,
        }
    }

    /// Whether the node accepts its values. The sentinel always does.
    pub fn is_valid(&self) -> bool {
        self.as_filter().is_none_or(Filter::is_valid)
    }

    fn contribute(&self, stmt: &mut SqlStatement, ctx: &CompileContext) -> ReportResult<()> {
        match self {
            Self::Sentinel => Ok(()),
            Self::Filter(filter) => filter.contribute(stmt, ctx),
        }
    }
}

#[derive(Debug)]
struct Link {
    id: NodeId,
    node: ChainNode,
    below: Option<Arc<Link>>,
}

impl Drop for Link {
    // Unlink iteratively so long chains do not recurse once per node.
    fn drop(&mut self) {
        let mut below = self.below.take();
        while let Some(link) = below {
            match Arc::try_unwrap(link) {
                Ok(mut link) => below = link.below.take(),
                Err(_) => break,
            }
        }
    }
}

/// An immutable chain of filters, read from its top.
#[derive(Clone)]
pub struct Chain {
    top: Arc<Link>,
    len: usize,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    /// Id of the sentinel in every chain.
    pub const SENTINEL: NodeId = NodeId(0);

    /// A chain holding only the sentinel.
    pub fn new() -> Self {
        Self {
            top: Arc::new(Link {
                id: Self::SENTINEL,
                node: ChainNode::Sentinel,
                below: None,
            }),
            len: 0,
        }
    }

    /// A new chain with `filter` on top of this one.
    pub fn prepend(&self, filter: Filter) -> Chain {
        let id = NodeId::next();
        debug!(node = %id, depth = self.len + 1, "Filter prepended");
        Chain {
            top: Arc::new(Link {
                id,
                node: ChainNode::Filter(filter),
                below: Some(Arc::clone(&self.top)),
            }),
            len: self.len + 1,
        }
    }

    /// Links from top to bottom.
    fn links(&self) -> impl Iterator<Item = &Link> {
        iter::successors(Some(&*self.top), |link| link.below.as_deref())
    }

    /// Nodes from bottom to top.
    fn nodes(&self) -> Vec<&ChainNode> {
        let mut nodes: Vec<&ChainNode> = self.links().map(|link| &link.node).collect();
        nodes.reverse();
        nodes
    }

    /// Newest node; the sentinel when no filter was added.
    pub fn top(&self) -> NodeId {
        self.top.id
    }

    /// Always the sentinel.
    pub fn bottom(&self) -> NodeId {
        self.links().last().map_or(Self::SENTINEL, |link| link.id)
    }

    /// Whether `id` is this chain's top.
    pub fn is_top(&self, id: NodeId) -> bool {
        self.top() == id
    }

    /// Node that seeds the statement during compilation.
    pub fn responsible(&self) -> NodeId {
        self.top()
    }

    /// Depth of `id` counted from the bottom (the sentinel is 0).
    pub fn position_of(&self, id: NodeId) -> Option<usize> {
        self.links()
            .position(|link| link.id == id)
            .map(|from_top| self.len - from_top)
    }

    /// Number of real filters.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the chain holds only the sentinel.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Node ids from bottom to top.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.links().map(|link| link.id).collect();
        ids.reverse();
        ids
    }

    /// Run `f` on the filter at `id`, if it belongs to this chain.
    pub fn with_filter<R>(&self, id: NodeId, f: impl FnOnce(&Filter) -> R) -> Option<R> {
        self.links()
            .find(|link| link.id == id)
            .and_then(|link| link.node.as_filter())
            .map(f)
    }

    /// A new chain in which the filter at `id` is replaced by an edited copy.
    ///
    /// Nodes below `id` stay shared; `id` and the nodes above it are copied
    /// and keep their ids. This chain, and every other chain sharing the
    /// node, is unchanged. Returns `None` when `id` is not a filter of this
    /// chain.
    pub fn update_filter(&self, id: NodeId, f: impl FnOnce(&mut Filter)) -> Option<Chain> {
        let mut above = Vec::new();
        let mut current = Some(&self.top);
        let target = loop {
            let link = current?;
            if link.id == id {
                break link;
            }
            above.push(link);
            current = link.below.as_ref();
        };

        let mut filter = target.node.as_filter()?.clone();
        f(&mut filter);
        let copied = above.len() + 1;
        let mut top = Arc::new(Link {
            id,
            node: ChainNode::Filter(filter),
            below: target.below.clone(),
        });
        for link in above.into_iter().rev() {
            top = Arc::new(Link {
                id: link.id,
                node: link.node.clone(),
                below: Some(top),
            });
        }

        trace!(node = %id, copied, "Filter updated");
        Some(Chain { top, len: self.len })
    }

    /// Copies of the real filters, top first.
    pub fn filters(&self) -> Vec<Filter> {
        self.links()
            .filter_map(|link| link.node.as_filter())
            .cloned()
            .collect()
    }

    /// Whether every node accepts its values.
    pub fn is_valid(&self) -> bool {
        self.links().all(|link| link.node.is_valid())
    }

    /// Validation messages, prefixed with the filter name, bottom to top.
    pub fn errors(&self) -> Vec<String> {
        self.nodes()
            .into_iter()
            .filter_map(ChainNode::as_filter)
            .flat_map(|filter| {
                filter
                    .errors()
                    .into_iter()
                    .map(move |message| format!("{}: {}", filter.name(), message))
            })
            .collect()
    }

    /// Compile into query text and parameters.
    ///
    /// Fails with `InvalidFilterState` before touching any statement if a
    /// filter rejects its values.
    pub fn compile(
        &self,
        base_table: &str,
        dialect: DatabaseType,
        ctx: &CompileContext,
    ) -> ReportResult<CompiledQuery> {
        let nodes = self.nodes();

        for filter in nodes.iter().filter_map(|node| node.as_filter()) {
            if !filter.is_valid() {
                return Err(ReportError::invalid_filter_state(
                    filter.name(),
                    &filter.errors(),
                ));
            }
        }

        debug!(responsible = %self.responsible(), table = %base_table, "Seeding statement");
        let mut stmt = SqlStatement::new(base_table, dialect);
        for node in &nodes {
            node.contribute(&mut stmt, ctx)?;
        }

        let compiled = stmt.build();
        debug!(
            filters = self.len(),
            params = compiled.params.len(),
            sql = %compiled.sql,
            "Chain compiled"
        );
        Ok(compiled)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for link in self.links() {
            match &link.node {
                ChainNode::Filter(filter) => list.entry(&format_args!("{}", filter)),
                ChainNode::Sentinel => list.entry(&format_args!("<no filter>")),
            };
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FilterCatalog, FilterTypeDecl};
    use crate::error::ErrorCode;
    use crate::operator::OperatorGroup;
    use crate::sql::JoinSpec;
    use crate::value::FilterValue;
    use chrono::{FixedOffset, TimeZone, Weekday};
    use pretty_assertions::assert_eq;

    fn catalog() -> FilterCatalog {
        FilterCatalog::builder()
            .register(
                FilterTypeDecl::new("project_id")
                    .column("entries.project_id")
                    .use_group(OperatorGroup::Null),
            )
            .unwrap()
            .register(
                FilterTypeDecl::new("status_id")
                    .column("issues.status_id")
                    .join(JoinSpec::belongs_to("issues", "entries", "issue_id"))
                    .use_group(OperatorGroup::Status),
            )
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

    fn filter(catalog: &FilterCatalog, name: &str, values: &[i64]) -> Filter {
        let mut filter = catalog.new_filter(name).unwrap();
        filter.set_values(values.iter().copied());
        filter
    }

    #[test]
    fn test_empty_chain_is_sentinel() {
        let chain = Chain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.top(), Chain::SENTINEL);
        assert_eq!(chain.bottom(), Chain::SENTINEL);
        assert!(chain.is_top(Chain::SENTINEL));
        assert!(chain.is_valid());
    }

    #[test]
    fn test_prepend_moves_top_and_keeps_sentinel_at_bottom() {
        let catalog = catalog();
        let mut chain = Chain::new();
        for i in 0..10 {
            let old_top = chain.top();
            chain = chain.prepend(filter(&catalog, "project_id", &[i]));
            assert_ne!(chain.top(), old_top);
            assert_ne!(chain.top(), Chain::SENTINEL);
            assert_eq!(chain.bottom(), Chain::SENTINEL);
            assert_eq!(chain.position_of(chain.top()), Some(chain.len()));
        }
        assert_eq!(chain.len(), 10);
        assert_eq!(chain.position_of(Chain::SENTINEL), Some(0));
    }

    #[test]
    fn test_old_chain_keeps_its_top() {
        let catalog = catalog();
        let base = Chain::new().prepend(filter(&catalog, "project_id", &[1]));
        let base_top = base.top();
        let extended = base.prepend(filter(&catalog, "project_id", &[2]));

        assert!(base.is_top(base_top));
        assert!(!extended.is_top(base_top));
        assert_eq!(extended.position_of(base_top), Some(1));
        assert_eq!(base.position_of(extended.top()), None);
    }

    #[test]
    fn test_empty_chain_compiles_to_base_table() {
        let compiled = Chain::new()
            .compile("entries", DatabaseType::PostgreSQL, &ctx())
            .unwrap();
        assert_eq!(compiled.sql, "SELECT * FROM entries");
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn test_compile_walks_bottom_to_top() {
        let catalog = catalog();
        let mut status = catalog.new_filter("status_id").unwrap();
        status.set_operator("c").unwrap();
        let chain = Chain::new()
            .prepend(filter(&catalog, "project_id", &[1]))
            .prepend(status);

        let compiled = chain
            .compile("entries", DatabaseType::PostgreSQL, &ctx())
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT * FROM entries \
             LEFT OUTER JOIN issues ON issues.id = entries.issue_id \
             WHERE entries.project_id IN ($1) \
             AND issues.status_id IN (SELECT id FROM issue_statuses WHERE is_closed = $2)"
        );
        assert_eq!(
            compiled.params,
            vec![FilterValue::Int(1), FilterValue::Bool(true)]
        );
    }

    #[test]
    fn test_invalid_filter_fails_compile() {
        let catalog = catalog();
        let chain = Chain::new()
            .prepend(filter(&catalog, "project_id", &[1]))
            .prepend(filter(&catalog, "project_id", &[]));

        assert!(!chain.is_valid());
        assert_eq!(
            chain.errors(),
            vec!["project_id: `=` expects at least 1 value(s), got 0".to_string()]
        );
        let err = chain
            .compile("entries", DatabaseType::PostgreSQL, &ctx())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFilterState);
    }

    #[test]
    fn test_updating_a_filter_returns_a_new_chain() {
        let catalog = catalog();
        let chain = Chain::new().prepend(filter(&catalog, "project_id", &[]));
        let top = chain.top();
        assert!(!chain.is_valid());

        let fixed = chain
            .update_filter(top, |f| {
                f.set_value(5i64);
            })
            .unwrap();
        assert!(fixed.is_valid());
        assert!(!chain.is_valid());
        assert_eq!(fixed.top(), top);
        assert_eq!(
            fixed.with_filter(top, |f| f.values().to_vec()),
            Some(vec![FilterValue::Int(5)])
        );
        assert!(chain.update_filter(Chain::SENTINEL, |_| {}).is_none());
        assert_eq!(chain.with_filter(Chain::SENTINEL, |f| f.name().to_string()), None);
    }

    #[test]
    fn test_update_through_a_branch_leaves_the_base_alone() {
        let catalog = catalog();
        let base = Chain::new().prepend(filter(&catalog, "project_id", &[1]));
        let shared = base.top();
        let branch = base.prepend(filter(&catalog, "project_id", &[2]));

        let edited = branch
            .update_filter(shared, |f| {
                f.set_value(99i64);
            })
            .unwrap();

        let params = |chain: &Chain| {
            chain
                .compile("entries", DatabaseType::PostgreSQL, &ctx())
                .unwrap()
                .params
        };
        assert_eq!(params(&base), vec![FilterValue::Int(1)]);
        assert_eq!(params(&branch), vec![FilterValue::Int(1), FilterValue::Int(2)]);
        assert_eq!(params(&edited), vec![FilterValue::Int(99), FilterValue::Int(2)]);
        assert_eq!(edited.node_ids(), branch.node_ids());
    }

    #[test]
    fn test_discarded_branches_are_freed() {
        let catalog = catalog();
        let base = Chain::new().prepend(filter(&catalog, "project_id", &[1]));
        for i in 0..1000 {
            let branch = base.prepend(filter(&catalog, "project_id", &[i]));
            assert_eq!(Arc::strong_count(&base.top), 2);
            drop(branch);
        }
        assert_eq!(Arc::strong_count(&base.top), 1);
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn test_long_chain_drops_without_recursing() {
        let catalog = catalog();
        let mut chain = Chain::new();
        for i in 0..100_000 {
            chain = chain.prepend(filter(&catalog, "project_id", &[i]));
        }
        assert_eq!(chain.len(), 100_000);
        drop(chain);
    }

    #[test]
    fn test_filters_are_listed_top_first() {
        let catalog = catalog();
        let chain = Chain::new()
            .prepend(filter(&catalog, "project_id", &[1]))
            .prepend(filter(&catalog, "project_id", &[2]));
        let values: Vec<FilterValue> = chain
            .filters()
            .iter()
            .map(|f| f.values()[0].clone())
            .collect();
        assert_eq!(values, vec![FilterValue::Int(2), FilterValue::Int(1)]);
    }
}
