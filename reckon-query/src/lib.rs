//! # reckon-query
//!
//! Filter chains compiled into SQL predicates for cost and time reports.
//!
//! This crate provides:
//! - Filter types declared once, with operators, joins and flags inherited
//!   along a type hierarchy
//! - A catalogue of symbolic operators, including calendar-aware relative dates
//! - Chains of filters compiled into one parameterized query
//! - Serializable report definitions
//!
//! ## Declaring Filter Types
//!
//! ```rust
//! use reckon_query::{FilterCatalog, FilterTypeDecl, JoinSpec, OperatorGroup};
//!
//! let catalog = FilterCatalog::builder()
//!     .register(
//!         FilterTypeDecl::new("created_on")
//!             .column("issues.created_on")
//!             .join(JoinSpec::belongs_to("issues", "entries", "issue_id"))
//!             .use_group(OperatorGroup::Time)
//!             .default_operator("w"),
//!     )
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let created_on = catalog.filter_type("created_on").unwrap();
//! assert!(created_on.supports("t+"));
//! assert!(!created_on.supports("="));
//! ```
//!
//! ## Compiling a Report
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use reckon_query::{EngineConfig, FilterValue, ReportQuery, cost_query};
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(cost_query::catalog().unwrap());
//! let mut report = ReportQuery::new(catalog, EngineConfig::default());
//! report.filter("assigned_to_id", Some("="), [7i64, 8]).unwrap();
//!
//! let now = Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap();
//! let compiled = report.compile_at(now).unwrap();
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT * FROM entries \
//!      LEFT OUTER JOIN issues ON issues.id = entries.issue_id \
//!      WHERE issues.assigned_to_id IN ($1, $2)"
//! );
//! assert_eq!(compiled.params, vec![FilterValue::Int(7), FilterValue::Int(8)]);
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use reckon_query::{EngineConfig, ErrorCode, ReportQuery, cost_query};
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(cost_query::catalog().unwrap());
//! let mut report = ReportQuery::new(catalog, EngineConfig::default());
//! let err = report
//!     .filter("assigned_to_id", Some("t+"), [1i64])
//!     .map(|_| ())
//!     .unwrap_err();
//! assert_eq!(err.code, ErrorCode::OperatorNotSupported);
//! ```

pub mod attribute;
pub mod catalog;
pub mod chain;
pub mod config;
pub mod cost_query;
pub mod error;
pub mod filter;
pub mod logging;
pub mod operator;
pub mod report;
pub mod sql;
pub mod value;

pub use attribute::{AttributeOptions, AttributeValue, FrozenHierarchy, Resolved, TypeHierarchy};
pub use catalog::{BASE_FILTER, FilterCatalog, FilterCatalogBuilder, FilterType, FilterTypeDecl};
pub use chain::{Chain, ChainNode, NodeId};
pub use config::{CompileContext, EngineConfig, EngineConfigBuilder};
pub use error::{ErrorCode, ErrorContext, ReportError, ReportResult};
pub use filter::{Filter, FilterSpec};
pub use operator::{
    Arity, BuiltinOperator, CustomOperator, Operator, OperatorGroup, OperatorRegistry,
};
pub use report::{AvailableValue, ChainSpec, ReportQuery, ValueSource};
pub use sql::{CompiledQuery, DatabaseType, JoinSpec, SqlStatement};
pub use value::{FilterValue, ValueList};

// Re-export logging utilities
pub use logging::{get_log_format, get_log_level, init as init_logging, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::catalog::{FilterCatalog, FilterTypeDecl};
    pub use crate::chain::Chain;
    pub use crate::config::EngineConfig;
    pub use crate::error::{ReportError, ReportResult};
    pub use crate::filter::Filter;
    pub use crate::operator::{Arity, CustomOperator, OperatorGroup, OperatorRegistry};
    pub use crate::report::{ChainSpec, ReportQuery, ValueSource};
    pub use crate::sql::{DatabaseType, JoinSpec};
    pub use crate::value::FilterValue;
}
