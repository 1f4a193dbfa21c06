//! SQL statement accumulation and serialization.
//!
//! A [`SqlStatement`] is created fresh for every compilation. Filters add
//! joins and WHERE fragments to it; [`SqlStatement::build`] turns it into
//! the final text and its positional parameters.
//!
//! ```rust
//! use reckon_query::sql::{DatabaseType, JoinSpec, SqlStatement};
//!
//! let mut stmt = SqlStatement::new("entries", DatabaseType::PostgreSQL);
//! stmt.join(JoinSpec::belongs_to("issues", "entries", "issue_id"));
//! stmt.add_predicate("issues.assigned_to_id IN (?)", [7i64.into()]).unwrap();
//!
//! let compiled = stmt.build();
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT * FROM entries \
//!      LEFT OUTER JOIN issues ON issues.id = entries.issue_id \
//!      WHERE issues.assigned_to_id IN ($1)"
//! );
//! ```

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use tracing::trace;

use crate::error::{ErrorCode, ReportError, ReportResult};
use crate::value::FilterValue;

/// Check if an identifier needs quoting.
pub fn needs_quoting(name: &str) -> bool {
    let reserved = [
        "user", "order", "group", "select", "from", "where", "table", "index",
        "key", "primary", "foreign", "check", "default", "null", "not", "and",
        "or", "in", "is", "like", "between", "case", "when", "then", "else",
        "end", "as", "on", "join", "left", "right", "inner", "outer", "cross",
        "natural", "using", "limit", "offset", "union", "intersect", "except",
        "all", "distinct", "having", "values", "set",
    ];

    if reserved.contains(&name.to_lowercase().as_str()) {
        return true;
    }

    name.is_empty()
        || name.starts_with(|c: char| c.is_ascii_digit())
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Target SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// PostgreSQL uses $1, $2, etc.
    #[default]
    #[serde(alias = "postgres")]
    PostgreSQL,
    /// MySQL uses ?, ?, etc.
    MySQL,
    /// SQLite uses ?, ?, etc.
    SQLite,
}

impl DatabaseType {
    /// Get the parameter placeholder for this database type.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::PostgreSQL => format!("${}", index),
            Self::MySQL | Self::SQLite => "?".to_string(),
        }
    }

    fn quote_char(&self) -> char {
        match self {
            Self::MySQL => '`',
            Self::PostgreSQL | Self::SQLite => '"',
        }
    }

    /// Quote a single identifier if needed, doubling embedded quotes.
    pub fn quote_identifier(&self, name: &str) -> String {
        if !needs_quoting(name) {
            return name.to_string();
        }
        let q = self.quote_char();
        let escaped = name.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    /// Quote a possibly table-qualified column (`table.column`).
    pub fn quote_qualified(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PostgreSQL => "postgresql",
            Self::MySQL => "mysql",
            Self::SQLite => "sqlite",
        })
    }
}

/// A LEFT OUTER JOIN reaching `table` from `from_table`.
///
/// Two specs are the same join when table and path match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinSpec {
    /// Joined table.
    pub table: SmolStr,
    /// Column of the joined table used in the ON clause.
    pub column: SmolStr,
    /// Table the join starts from.
    pub from_table: SmolStr,
    /// Column of `from_table` used in the ON clause.
    pub from_column: SmolStr,
}

impl JoinSpec {
    /// `LEFT OUTER JOIN table ON table.column = from_table.from_column`.
    pub fn new(
        table: impl Into<SmolStr>,
        column: impl Into<SmolStr>,
        from_table: impl Into<SmolStr>,
        from_column: impl Into<SmolStr>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            from_table: from_table.into(),
            from_column: from_column.into(),
        }
    }

    /// Many-to-one: `from_table.foreign_key` references `table.id`.
    pub fn belongs_to(
        table: impl Into<SmolStr>,
        from_table: impl Into<SmolStr>,
        foreign_key: impl Into<SmolStr>,
    ) -> Self {
        Self::new(table, "id", from_table, foreign_key)
    }

    /// One-to-many: `table.foreign_key` references `from_table.id`.
    pub fn has_many(
        table: impl Into<SmolStr>,
        foreign_key: impl Into<SmolStr>,
        from_table: impl Into<SmolStr>,
    ) -> Self {
        Self::new(table, foreign_key, from_table, "id")
    }

    fn to_sql(&self, dialect: DatabaseType) -> String {
        let table = dialect.quote_identifier(&self.table);
        format!(
            "LEFT OUTER JOIN {table} ON {table}.{} = {}.{}",
            dialect.quote_identifier(&self.column),
            dialect.quote_identifier(&self.from_table),
            dialect.quote_identifier(&self.from_column),
        )
    }
}

/// Final query text with its positional parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    /// Query text.
    pub sql: String,
    /// Parameters in placeholder order.
    pub params: Vec<FilterValue>,
}

/// Mutable accumulator for one compiled query.
#[derive(Debug, Clone)]
pub struct SqlStatement {
    dialect: DatabaseType,
    table: SmolStr,
    select: Vec<SmolStr>,
    joins: IndexSet<JoinSpec>,
    predicates: Vec<String>,
    params: Vec<FilterValue>,
}

impl SqlStatement {
    /// Create a statement selecting from `table`.
    pub fn new(table: impl Into<SmolStr>, dialect: DatabaseType) -> Self {
        Self {
            dialect,
            table: table.into(),
            select: Vec::new(),
            joins: IndexSet::new(),
            predicates: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Base table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Dialect used for placeholders and quoting.
    pub fn dialect(&self) -> DatabaseType {
        self.dialect
    }

    /// Add a selected column. Without any, `*` is selected.
    pub fn select(&mut self, column: impl Into<SmolStr>) -> &mut Self {
        self.select.push(column.into());
        self
    }

    /// Record a join. Returns `false` when the same join is already present.
    pub fn join(&mut self, spec: JoinSpec) -> bool {
        if spec.table == self.table {
            trace!(table = %spec.table, "Join to base table skipped");
            return false;
        }
        let inserted = self.joins.insert(spec);
        if !inserted {
            trace!("Join already present");
        }
        inserted
    }

    /// Joins in first-seen order.
    pub fn joins(&self) -> impl Iterator<Item = &JoinSpec> {
        self.joins.iter()
    }

    /// Append a WHERE fragment.
    ///
    /// Every `?` outside quotes is a positional marker; markers are renumbered
    /// for the dialect and must match `params` one to one.
    pub fn add_predicate(
        &mut self,
        fragment: &str,
        params: impl IntoIterator<Item = FilterValue>,
    ) -> ReportResult<()> {
        let params: Vec<FilterValue> = params.into_iter().collect();
        let mut next = self.params.len() + 1;
        let mut markers = 0usize;
        let mut out = String::with_capacity(fragment.len() + 8);
        let mut quote: Option<char> = None;

        for c in fragment.chars() {
            match (quote, c) {
                (Some(q), c) if c == q => {
                    quote = None;
                    out.push(c);
                }
                (Some(_), c) => out.push(c),
                (None, '"' | '\'' | '`') => {
                    quote = Some(c);
                    out.push(c);
                }
                (None, '?') => {
                    out.push_str(&self.dialect.placeholder(next));
                    next += 1;
                    markers += 1;
                }
                (None, c) => out.push(c),
            }
        }

        if markers != params.len() {
            return Err(ReportError::new(
                ErrorCode::InvalidValue,
                format!(
                    "Predicate has {} placeholder(s) but {} parameter(s)",
                    markers,
                    params.len()
                ),
            )
            .with_sql(fragment));
        }

        self.predicates.push(out);
        self.params.extend(params);
        Ok(())
    }

    /// WHERE fragments in append order, placeholders already numbered.
    pub fn predicates(&self) -> &[String] {
        &self.predicates
    }

    /// Bound parameters in append order.
    pub fn params(&self) -> &[FilterValue] {
        &self.params
    }

    /// Current SQL text (without consuming).
    pub fn sql(&self) -> String {
        let d = self.dialect;
        let select = if self.select.is_empty() {
            "*".to_string()
        } else {
            self.select
                .iter()
                .map(|c| d.quote_qualified(c))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", select, d.quote_identifier(&self.table));
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.to_sql(d));
        }
        if !self.predicates.is_empty() {
            let grouped = self.predicates.len() > 1;
            sql.push_str(" WHERE ");
            for (i, predicate) in self.predicates.iter().enumerate() {
                if i > 0 {
                    sql.push_str(" AND ");
                }
                if grouped && has_top_level_or(predicate) {
                    sql.push('(');
                    sql.push_str(predicate);
                    sql.push(')');
                } else {
                    sql.push_str(predicate);
                }
            }
        }
        sql
    }

    /// Serialize into query text and parameters.
    pub fn build(self) -> CompiledQuery {
        CompiledQuery {
            sql: self.sql(),
            params: self.params,
        }
    }
}

/// Whether `fragment` has an `OR` outside parentheses and quotes.
///
/// Such a fragment binds looser than the `AND` joining predicates and has to
/// be grouped before it is combined with others.
fn has_top_level_or(fragment: &str) -> bool {
    let bytes = fragment.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;

    for (i, &b) in bytes.iter().enumerate() {
        match (quote, b) {
            (Some(q), b) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'' | b'`') => quote = Some(b),
            (None, b'(') => depth += 1,
            (None, b')') => depth = depth.saturating_sub(1),
            (None, b'O' | b'o') if depth == 0 => {
                let word_start = i == 0 || !is_word_byte(bytes[i - 1]);
                let is_or = bytes
                    .get(i + 1)
                    .is_some_and(|next| next.eq_ignore_ascii_case(&b'r'));
                let word_end = bytes.get(i + 2).is_none_or(|next| !is_word_byte(*next));
                if word_start && is_or && word_end {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql())
    }
}
