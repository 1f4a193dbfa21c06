//! # Reckon
//!
//! Composable filter chains compiled into SQL for cost and time reports.
//!
//! Reckon provides:
//! - Filter types with inherited operators, joins and display flags
//! - Relative and absolute date operators evaluated in a fixed calendar offset
//! - PostgreSQL, MySQL and SQLite placeholder styles
//! - Report definitions that round-trip through serde
//!
//! ## Quick Start
//!
//! ```rust
//! use reckon::prelude::*;
//! use reckon::cost_query;
//! use std::sync::Arc;
//!
//! let config = EngineConfig::builder()
//!     .dialect(DatabaseType::SQLite)
//!     .build()
//!     .unwrap();
//! let catalog = Arc::new(cost_query::catalog().unwrap());
//!
//! let mut report = ReportQuery::new(catalog, config);
//! report.filter("assigned_to_id", Some("!*"), Vec::<FilterValue>::new()).unwrap();
//!
//! let compiled = report.compile().unwrap();
//! assert!(compiled.sql.ends_with("WHERE issues.assigned_to_id IS NULL"));
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use reckon_query::*;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use reckon_query::prelude::*;
}
