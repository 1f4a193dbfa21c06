//! Comparison operators and the registry that maps tokens to them.
//!
//! Operators are addressed by short symbolic tokens (`"="`, `"!*"`, `"t+"`,
//! `"<>d"`, ...). The compiled-in set is the [`BuiltinOperator`] enum; the
//! embedding application can add more through [`OperatorRegistry::register`].
//! Custom registrations are consulted before built-ins, so registering a
//! built-in token replaces it.
//!
//! Every operator has an [`Arity`]. Before validation and contribution the
//! supplied values go through one shared policy ([`Operator::prepare_values`]):
//! nulls are dropped and, for a fixed arity, the list is cut to `arity`
//! entries. A fixed-arity operator is satisfied when enough values remain.
//!
//! ```rust
//! use reckon_query::operator::{Arity, OperatorRegistry};
//!
//! let registry = OperatorRegistry::new();
//! let op = registry.lookup("<>d").unwrap();
//! assert_eq!(op.arity(), Arity::Fixed(2));
//! assert!(!op.validate(&["2024-01-01".into()]));
//! assert!(op.validate(&["2024-01-01".into(), "2024-02-01".into()]));
//! ```

use chrono::{Datelike, NaiveDate, Offset, TimeDelta, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use smallvec::SmallVec;
use smol_str::SmolStr;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::config::CompileContext;
use crate::error::{ReportError, ReportResult};
use crate::sql::SqlStatement;
use crate::value::{FilterValue, ValueList, start_of_day};

/// Number of values an operator consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// Exactly this many values (`0` means no value at all).
    Fixed(usize),
    /// One or more values.
    Variadic,
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{}", n),
            Self::Variadic => f.write_str("at least 1"),
        }
    }
}

/// The compiled-in operator set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinOperator {
    /// `=`: equal to any of the values.
    Equal,
    /// `!`: equal to none of the values (nulls included).
    NotEqual,
    /// `<=`
    LessOrEqual,
    /// `>=`
    GreaterOrEqual,
    /// `!*`: no value / no related row.
    Empty,
    /// `*`: any value.
    Any,
    /// `y`: value is set.
    Present,
    /// `n`: value is not set.
    Absent,
    /// `~`: contains the text.
    Contains,
    /// `!~`: does not contain the text.
    NotContains,
    /// `=n`: numeric equality.
    NumericEqual,
    /// `0`: exactly zero.
    Zero,
    /// `o`: status is open.
    Open,
    /// `c`: status is closed.
    Closed,
    /// `t`: today.
    Today,
    /// `w`: this calendar week.
    ThisWeek,
    /// `t+`: exactly N days ahead.
    DaysAhead,
    /// `t-`: exactly N days ago.
    DaysAgo,
    /// `<t+`: before the day N days ahead.
    BeforeDaysAhead,
    /// `>t+`: after the day N days ahead.
    AfterDaysAhead,
    /// `<t-`: before the day N days ago.
    BeforeDaysAgo,
    /// `>t-`: after the day N days ago.
    AfterDaysAgo,
    /// `=d`: on the given day.
    OnDate,
    /// `<d`: before the given instant.
    BeforeDate,
    /// `>d`: after the given instant.
    AfterDate,
    /// `<>d`: strictly between two instants.
    BetweenDates,
}

impl BuiltinOperator {
    /// Every built-in operator.
    pub const ALL: [Self; 26] = [
        Self::Equal,
        Self::NotEqual,
        Self::LessOrEqual,
        Self::GreaterOrEqual,
        Self::Empty,
        Self::Any,
        Self::Present,
        Self::Absent,
        Self::Contains,
        Self::NotContains,
        Self::NumericEqual,
        Self::Zero,
        Self::Open,
        Self::Closed,
        Self::Today,
        Self::ThisWeek,
        Self::DaysAhead,
        Self::DaysAgo,
        Self::BeforeDaysAhead,
        Self::AfterDaysAhead,
        Self::BeforeDaysAgo,
        Self::AfterDaysAgo,
        Self::OnDate,
        Self::BeforeDate,
        Self::AfterDate,
        Self::BetweenDates,
    ];

    /// Symbolic token.
    pub const fn token(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!",
            Self::LessOrEqual => "<=",
            Self::GreaterOrEqual => ">=",
            Self::Empty => "!*",
            Self::Any => "*",
            Self::Present => "y",
            Self::Absent => "n",
            Self::Contains => "~",
            Self::NotContains => "!~",
            Self::NumericEqual => "=n",
            Self::Zero => "0",
            Self::Open => "o",
            Self::Closed => "c",
            Self::Today => "t",
            Self::ThisWeek => "w",
            Self::DaysAhead => "t+",
            Self::DaysAgo => "t-",
            Self::BeforeDaysAhead => "<t+",
            Self::AfterDaysAhead => ">t+",
            Self::BeforeDaysAgo => "<t-",
            Self::AfterDaysAgo => ">t-",
            Self::OnDate => "=d",
            Self::BeforeDate => "<d",
            Self::AfterDate => ">d",
            Self::BetweenDates => "<>d",
        }
    }

    /// Find the built-in operator for a token.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.token() == token)
    }

    /// Label for selection widgets.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Equal => "is",
            Self::NotEqual => "is not",
            Self::LessOrEqual => "<=",
            Self::GreaterOrEqual => ">=",
            Self::Empty => "none",
            Self::Any => "all",
            Self::Present => "set",
            Self::Absent => "not set",
            Self::Contains => "contains",
            Self::NotContains => "doesn't contain",
            Self::NumericEqual => "equals",
            Self::Zero => "is zero",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Today => "today",
            Self::ThisWeek => "this week",
            Self::DaysAhead => "in",
            Self::DaysAgo => "days ago",
            Self::BeforeDaysAhead => "in less than",
            Self::AfterDaysAhead => "in more than",
            Self::BeforeDaysAgo => "more than days ago",
            Self::AfterDaysAgo => "less than days ago",
            Self::OnDate => "on",
            Self::BeforeDate => "before",
            Self::AfterDate => "after",
            Self::BetweenDates => "between",
        }
    }

    /// Number of values consumed.
    pub const fn arity(&self) -> Arity {
        match self {
            Self::Equal | Self::NotEqual => Arity::Variadic,
            Self::Empty
            | Self::Any
            | Self::Present
            | Self::Absent
            | Self::Zero
            | Self::Open
            | Self::Closed
            | Self::Today
            | Self::ThisWeek => Arity::Fixed(0),
            Self::BetweenDates => Arity::Fixed(2),
            _ => Arity::Fixed(1),
        }
    }

    /// Shape problems with already prepared values.
    fn value_errors(&self, values: &[FilterValue]) -> Vec<String> {
        let token = self.token();
        let check = |ok: fn(&FilterValue) -> bool, what: &str| -> Vec<String> {
            values
                .iter()
                .filter(|v| !ok(v))
                .map(|v| format!("`{}` expects {}, got {:?}", token, what, v))
                .collect()
        };

        match self {
            Self::DaysAhead
            | Self::DaysAgo
            | Self::BeforeDaysAhead
            | Self::AfterDaysAhead
            | Self::BeforeDaysAgo
            | Self::AfterDaysAgo => check(
                |v| v.as_i64().is_some_and(|n| (0..=DAY_OFFSET_LIMIT).contains(&n)),
                "a whole number of days",
            ),
            Self::OnDate | Self::BeforeDate | Self::AfterDate | Self::BetweenDates => {
                check(|v| v.as_datetime(utc()).is_some(), "a date")
            }
            Self::NumericEqual => check(|v| v.as_f64().is_some(), "a number"),
            Self::Contains | Self::NotContains => check(|v| v.as_text().is_some(), "text"),
            _ => Vec::new(),
        }
    }

    /// Add this operator's WHERE fragment for `column`.
    fn modify(
        &self,
        stmt: &mut SqlStatement,
        column: &str,
        values: &[FilterValue],
        ctx: &CompileContext,
    ) -> ReportResult<()> {
        let col = stmt.dialect().quote_qualified(column);
        let offset = ctx.offset();
        let today = ctx.today();

        match self {
            Self::Equal => {
                let marks = placeholders(values.len());
                stmt.add_predicate(&format!("{col} IN ({marks})"), values.iter().cloned())
            }
            Self::NotEqual => {
                let marks = placeholders(values.len());
                stmt.add_predicate(
                    &format!("({col} IS NULL OR {col} NOT IN ({marks}))"),
                    values.iter().cloned(),
                )
            }
            Self::LessOrEqual => stmt.add_predicate(&format!("{col} <= ?"), values.iter().cloned()),
            Self::GreaterOrEqual => {
                stmt.add_predicate(&format!("{col} >= ?"), values.iter().cloned())
            }
            Self::Empty | Self::Absent => stmt.add_predicate(&format!("{col} IS NULL"), []),
            Self::Any | Self::Present => stmt.add_predicate(&format!("{col} IS NOT NULL"), []),
            Self::Contains | Self::NotContains => {
                let text = values[0].as_text().unwrap_or_default();
                let like = if *self == Self::Contains { "LIKE" } else { "NOT LIKE" };
                stmt.add_predicate(
                    &format!("{col} {like} ? ESCAPE '{LIKE_ESCAPE}'"),
                    [FilterValue::String(format!("%{}%", escape_like(&text)))],
                )
            }
            Self::NumericEqual => {
                let number = values[0]
                    .as_f64()
                    .ok_or_else(|| self.bad_value(&values[0]))?;
                stmt.add_predicate(&format!("{col} = ?"), [FilterValue::Float(number)])
            }
            Self::Zero => stmt.add_predicate(&format!("{col} = ?"), [FilterValue::Int(0)]),
            Self::Open | Self::Closed => stmt.add_predicate(
                &format!("{col} IN (SELECT id FROM issue_statuses WHERE is_closed = ?)"),
                [FilterValue::Bool(*self == Self::Closed)],
            ),
            Self::Today => self.day_range(stmt, &col, today, 0, 1, ctx),
            Self::ThisWeek => {
                let since_start = (today.weekday().num_days_from_monday() + 7
                    - ctx.week_start.num_days_from_monday())
                    % 7;
                let since_start = i64::from(since_start);
                self.day_range(stmt, &col, today, -since_start, 7 - since_start, ctx)
            }
            Self::DaysAhead => {
                let n = self.days(&values[0])?;
                self.day_range(stmt, &col, today, n, n + 1, ctx)
            }
            Self::DaysAgo => {
                let n = self.days(&values[0])?;
                self.day_range(stmt, &col, today, -n, -n + 1, ctx)
            }
            Self::BeforeDaysAhead => {
                let n = self.days(&values[0])?;
                let bound = self.boundary(today, n, ctx)?;
                stmt.add_predicate(&format!("{col} < ?"), [bound])
            }
            Self::AfterDaysAhead => {
                let n = self.days(&values[0])?;
                let bound = self.boundary(today, n + 1, ctx)?;
                stmt.add_predicate(&format!("{col} >= ?"), [bound])
            }
            Self::BeforeDaysAgo => {
                let n = self.days(&values[0])?;
                let bound = self.boundary(today, -n, ctx)?;
                stmt.add_predicate(&format!("{col} < ?"), [bound])
            }
            Self::AfterDaysAgo => {
                let n = self.days(&values[0])?;
                let bound = self.boundary(today, -n + 1, ctx)?;
                stmt.add_predicate(&format!("{col} >= ?"), [bound])
            }
            Self::OnDate => {
                let day = values[0]
                    .as_date(offset)
                    .ok_or_else(|| self.bad_value(&values[0]))?;
                self.day_range(stmt, &col, day, 0, 1, ctx)
            }
            Self::BeforeDate => {
                let at = self.instant(&values[0], ctx)?;
                stmt.add_predicate(&format!("{col} < ?"), [at])
            }
            Self::AfterDate => {
                let at = self.instant(&values[0], ctx)?;
                stmt.add_predicate(&format!("{col} > ?"), [at])
            }
            Self::BetweenDates => {
                let from = self.instant(&values[0], ctx)?;
                let to = self.instant(&values[1], ctx)?;
                stmt.add_predicate(&format!("{col} > ? AND {col} < ?"), [from, to])
            }
        }
    }

    fn bad_value(&self, value: &FilterValue) -> ReportError {
        ReportError::invalid_value(self.token(), format!("cannot use {:?}", value))
    }

    fn days(&self, value: &FilterValue) -> ReportResult<i64> {
        value
            .as_i64()
            .filter(|n| (0..=DAY_OFFSET_LIMIT).contains(n))
            .ok_or_else(|| self.bad_value(value))
    }

    fn instant(&self, value: &FilterValue, ctx: &CompileContext) -> ReportResult<FilterValue> {
        value
            .as_datetime(ctx.offset())
            .map(FilterValue::DateTime)
            .ok_or_else(|| self.bad_value(value))
    }

    /// Midnight starting `day + shift` in the compile offset.
    fn boundary(&self, day: NaiveDate, shift: i64, ctx: &CompileContext) -> ReportResult<FilterValue> {
        TimeDelta::try_days(shift)
            .and_then(|delta| day.checked_add_signed(delta))
            .and_then(|d| start_of_day(d, ctx.offset()))
            .map(FilterValue::DateTime)
            .ok_or_else(|| {
                ReportError::invalid_value(self.token(), format!("{} days is out of range", shift))
            })
    }

    /// `col >= D(from) AND col < D(to)` relative to `day`.
    fn day_range(
        &self,
        stmt: &mut SqlStatement,
        col: &str,
        day: NaiveDate,
        from: i64,
        to: i64,
        ctx: &CompileContext,
    ) -> ReportResult<()> {
        let start = self.boundary(day, from, ctx)?;
        let end = self.boundary(day, to, ctx)?;
        stmt.add_predicate(&format!("{col} >= ? AND {col} < ?"), [start, end])
    }
}

/// Largest accepted day offset for relative date operators.
const DAY_OFFSET_LIMIT: i64 = 100_000;

fn utc() -> chrono::FixedOffset {
    Utc.fix()
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Escape character of `LIKE` patterns. Plain in every supported dialect's string literals.
const LIKE_ESCAPE: char = '!';

/// Make `text` match literally inside a `LIKE` pattern.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Validation rule of a custom operator, applied to prepared values.
pub type Validator = Arc<dyn Fn(&[FilterValue]) -> bool + Send + Sync>;

/// Predicate contribution of a custom operator: `(statement, column, values, context)`.
pub type Contributor =
    Arc<dyn Fn(&mut SqlStatement, &str, &[FilterValue], &CompileContext) -> ReportResult<()> + Send + Sync>;

/// An operator supplied by the embedding application.
#[derive(Clone)]
pub struct CustomOperator {
    token: SmolStr,
    label: SmolStr,
    arity: Arity,
    validator: Option<Validator>,
    contributor: Contributor,
}

impl CustomOperator {
    /// Create a custom operator. Without a validator only the arity is checked.
    pub fn new<F>(token: impl Into<SmolStr>, arity: Arity, contributor: F) -> Self
    where
        F: Fn(&mut SqlStatement, &str, &[FilterValue], &CompileContext) -> ReportResult<()>
            + Send
            + Sync
            + 'static,
    {
        let token = token.into();
        Self {
            label: token.clone(),
            token,
            arity,
            validator: None,
            contributor: Arc::new(contributor),
        }
    }

    /// Add a validation rule.
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&[FilterValue]) -> bool + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = label.into();
        self
    }
}

impl fmt::Debug for CustomOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomOperator")
            .field("token", &self.token)
            .field("arity", &self.arity)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// A resolved operator, built-in or custom.
#[derive(Debug, Clone)]
pub enum Operator {
    /// Compiled-in operator.
    Builtin(BuiltinOperator),
    /// Operator registered at runtime.
    Custom(Arc<CustomOperator>),
}

impl Operator {
    /// Symbolic token.
    pub fn token(&self) -> &str {
        match self {
            Self::Builtin(op) => op.token(),
            Self::Custom(op) => &op.token,
        }
    }

    /// Label for selection widgets.
    pub fn label(&self) -> &str {
        match self {
            Self::Builtin(op) => op.label(),
            Self::Custom(op) => &op.label,
        }
    }

    /// Number of values consumed.
    pub fn arity(&self) -> Arity {
        match self {
            Self::Builtin(op) => op.arity(),
            Self::Custom(op) => op.arity,
        }
    }

    /// Drop nulls and cut a fixed-arity list down to `arity` entries.
    pub fn prepare_values(&self, values: &[FilterValue]) -> ValueList {
        let compact = values.iter().filter(|v| !v.is_null()).cloned();
        match self.arity() {
            Arity::Fixed(n) => compact.take(n).collect(),
            Arity::Variadic => compact.collect(),
        }
    }

    /// Validation messages for `values`; empty when they are acceptable.
    pub fn errors(&self, values: &[FilterValue]) -> Vec<String> {
        let prepared = self.prepare_values(values);
        if let Some(message) = self.arity_error(prepared.len()) {
            return vec![message];
        }
        match self {
            Self::Builtin(op) => op.value_errors(&prepared),
            Self::Custom(op) => match &op.validator {
                Some(validator) if !validator(&prepared) => {
                    vec![format!("`{}` does not accept {:?}", op.token, prepared.as_slice())]
                }
                _ => Vec::new(),
            },
        }
    }

    /// Whether `values` satisfy this operator.
    pub fn validate(&self, values: &[FilterValue]) -> bool {
        self.errors(values).is_empty()
    }

    fn arity_error(&self, prepared: usize) -> Option<String> {
        let satisfied = match self.arity() {
            Arity::Fixed(n) => prepared == n,
            Arity::Variadic => prepared > 0,
        };
        (!satisfied).then(|| {
            format!(
                "`{}` expects {} value(s), got {}",
                self.token(),
                self.arity(),
                prepared
            )
        })
    }

    /// Add this operator's WHERE fragment for `column` to `stmt`.
    ///
    /// A no-op when `column` is empty. Values go through
    /// [`prepare_values`](Self::prepare_values) first; if too few remain the
    /// statement is left untouched and an arity error is returned.
    pub fn contribute(
        &self,
        stmt: &mut SqlStatement,
        column: &str,
        values: &[FilterValue],
        ctx: &CompileContext,
    ) -> ReportResult<()> {
        if column.is_empty() {
            return Ok(());
        }
        let prepared = self.prepare_values(values);
        if self.arity_error(prepared.len()).is_some() {
            return Err(ReportError::arity_mismatch(
                self.token(),
                self.arity(),
                prepared.len(),
            ));
        }

        debug!(operator = %self.token(), column = %column, values = prepared.len(), "Contributing predicate");
        match self {
            Self::Builtin(op) => op.modify(stmt, column, &prepared, ctx),
            Self::Custom(op) => (op.contributor)(stmt, column, &prepared, ctx),
        }
    }
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        self.token() == other.token()
    }
}

impl Eq for Operator {}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl From<BuiltinOperator> for Operator {
    fn from(op: BuiltinOperator) -> Self {
        Self::Builtin(op)
    }
}

/// Named operator sets a filter type can `use`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorGroup {
    /// `=`, `!`
    Default,
    /// Equality plus presence.
    Null,
    /// Equality, ordering and presence.
    Integer,
    /// Equality, substring and presence.
    String,
    /// Relative and absolute dates.
    Time,
    /// Numeric equality, zero, ordering and overridden-value presence.
    Money,
    /// Open / closed status plus equality.
    Status,
}

impl OperatorGroup {
    /// Operators in the group.
    pub fn operators(&self) -> &'static [BuiltinOperator] {
        use BuiltinOperator as B;
        match self {
            Self::Default => &[B::Equal, B::NotEqual],
            Self::Null => &[B::Equal, B::NotEqual, B::Empty, B::Any],
            Self::Integer => &[
                B::Equal,
                B::NotEqual,
                B::LessOrEqual,
                B::GreaterOrEqual,
                B::Empty,
                B::Any,
            ],
            Self::String => &[B::Equal, B::NotEqual, B::Contains, B::NotContains, B::Empty, B::Any],
            Self::Time => &[
                B::Today,
                B::ThisWeek,
                B::DaysAhead,
                B::DaysAgo,
                B::BeforeDaysAhead,
                B::AfterDaysAhead,
                B::BeforeDaysAgo,
                B::AfterDaysAgo,
                B::OnDate,
                B::BeforeDate,
                B::AfterDate,
                B::BetweenDates,
            ],
            Self::Money => &[
                B::NumericEqual,
                B::Zero,
                B::LessOrEqual,
                B::GreaterOrEqual,
                B::Present,
                B::Absent,
            ],
            Self::Status => &[B::Open, B::Closed, B::Equal, B::NotEqual, B::Any],
        }
    }

    /// Name used in configuration and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "default_operators",
            Self::Null => "null_operators",
            Self::Integer => "integer_operators",
            Self::String => "string_operators",
            Self::Time => "time_operators",
            Self::Money => "money_operators",
            Self::Status => "status_operators",
        }
    }
}

/// Token-addressed operator catalogue.
///
/// Built-ins are always present; custom operators live in a separate table
/// that shadows them.
#[derive(Default)]
pub struct OperatorRegistry {
    custom: RwLock<IndexMap<SmolStr, Arc<CustomOperator>>>,
}

static GLOBAL_REGISTRY: OnceLock<OperatorRegistry> = OnceLock::new();

impl OperatorRegistry {
    /// Registry with only the built-in operators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    pub fn global() -> &'static OperatorRegistry {
        GLOBAL_REGISTRY.get_or_init(OperatorRegistry::new)
    }

    /// Add or replace an operator. Returns the operator previously answering to the token.
    pub fn register(&self, operator: CustomOperator) -> Option<Operator> {
        let token = operator.token.clone();
        let previous = self.lookup(&token).ok();
        self.custom.write().insert(token.clone(), Arc::new(operator));
        debug!(operator = %token, replaced = previous.is_some(), "Registered operator");
        previous
    }

    /// Resolve a token.
    pub fn lookup(&self, token: &str) -> ReportResult<Operator> {
        if let Some(custom) = self.custom.read().get(token) {
            return Ok(Operator::Custom(Arc::clone(custom)));
        }
        BuiltinOperator::from_token(token)
            .map(Operator::Builtin)
            .ok_or_else(|| ReportError::unknown_operator(token))
    }

    /// Whether a token resolves.
    pub fn contains(&self, token: &str) -> bool {
        self.custom.read().contains_key(token) || BuiltinOperator::from_token(token).is_some()
    }

    /// All resolvable tokens, built-ins first.
    pub fn tokens(&self) -> Vec<SmolStr> {
        let mut tokens: Vec<SmolStr> = BuiltinOperator::ALL
            .iter()
            .map(|op| SmolStr::new_static(op.token()))
            .collect();
        for token in self.custom.read().keys() {
            if !tokens.contains(token) {
                tokens.push(token.clone());
            }
        }
        tokens
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("custom", &self.custom.read().keys().collect::<SmallVec<[&SmolStr; 8]>>())
            .finish()
    }
}
