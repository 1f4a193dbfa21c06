//! Inheritable, mergeable metadata for filter types.
//!
//! Filter types form a single-inheritance hierarchy. Each type may declare
//! named attributes; values set on a type are visible to its descendants.
//! List attributes concatenate ancestor values before the type's own ones,
//! scalar attributes take the nearest value. A type can cut inheritance for
//! one attribute with [`TypeHierarchy::stop_inheritance`].
//!
//! The hierarchy is mutable only while it is being declared. [`TypeHierarchy::freeze`]
//! resolves every attribute of every type once, in declaration order, into a
//! [`FrozenHierarchy`] of plain data.
//!
//! ```rust
//! use reckon_query::attribute::{AttributeOptions, AttributeValue, TypeHierarchy};
//!
//! let mut types = TypeHierarchy::new();
//! types.add_type("base", None).unwrap();
//! types.add_type("child", Some("base")).unwrap();
//! types.declare("base", "tags", AttributeOptions::list().uniq()).unwrap();
//! types.set("base", "tags", ["a", "b"]).unwrap();
//! types.set("child", "tags", ["b", "c"]).unwrap();
//!
//! let frozen = types.freeze();
//! let tags = frozen.get("child").unwrap().list("tags");
//! assert_eq!(tags, ["a", "b", "c"].map(AttributeValue::from));
//! ```

use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use crate::error::{ReportError, ReportResult};
use crate::sql::JoinSpec;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Token or name.
    Text(SmolStr),
    /// Table join.
    Join(JoinSpec),
}

impl AttributeValue {
    /// Try to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get the value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get the value as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the value as a join.
    pub fn as_join(&self) -> Option<&JoinSpec> {
        match self {
            Self::Join(j) => Some(j),
            _ => None,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Text(v.into())
    }
}

impl From<SmolStr> for AttributeValue {
    fn from(v: SmolStr) -> Self {
        Self::Text(v)
    }
}

impl From<JoinSpec> for AttributeValue {
    fn from(v: JoinSpec) -> Self {
        Self::Join(v)
    }
}

/// Transform applied to every value before it is stored.
pub type MapFn = Arc<dyn Fn(AttributeValue) -> AttributeValue + Send + Sync>;

/// How an attribute merges across the hierarchy.
#[derive(Clone, Default)]
pub struct AttributeOptions {
    default: Option<AttributeValue>,
    list: bool,
    uniq: bool,
    map: Option<MapFn>,
}

impl AttributeOptions {
    /// A scalar attribute: nearest value wins.
    pub fn scalar() -> Self {
        Self::default()
    }

    /// A list attribute: ancestor values first, then the type's own.
    pub fn list() -> Self {
        Self {
            list: true,
            ..Self::default()
        }
    }

    /// De-duplicate the merged list, keeping first occurrences.
    pub fn uniq(mut self) -> Self {
        self.uniq = true;
        self
    }

    /// Value returned when nothing is set. For lists, the single entry of an otherwise empty list.
    pub fn default_value(mut self, value: impl Into<AttributeValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Transform values on `set`.
    pub fn map<F>(mut self, f: F) -> Self
    where
        F: Fn(AttributeValue) -> AttributeValue + Send + Sync + 'static,
    {
        self.map = Some(Arc::new(f));
        self
    }

    /// Whether this is a list attribute.
    pub fn is_list(&self) -> bool {
        self.list
    }
}

impl fmt::Debug for AttributeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeOptions")
            .field("default", &self.default)
            .field("list", &self.list)
            .field("uniq", &self.uniq)
            .field("map", &self.map.is_some())
            .finish()
    }
}

/// A resolved attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Scalar value, `None` when unset and without default.
    Scalar(Option<AttributeValue>),
    /// Merged list.
    List(Vec<AttributeValue>),
}

#[derive(Debug, Default)]
struct TypeNode {
    parent: Option<SmolStr>,
    declarations: IndexMap<SmolStr, AttributeOptions>,
    values: IndexMap<SmolStr, Vec<AttributeValue>>,
    stops: IndexSet<SmolStr>,
}

/// The mutable hierarchy used while filter types are declared.
///
/// Types must be added after their parent, so declaration order is a
/// topological order.
#[derive(Debug, Default)]
pub struct TypeHierarchy {
    types: IndexMap<SmolStr, TypeNode>,
}

impl TypeHierarchy {
    /// Create an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// A hierarchy holding one root type with its declarations and values.
    ///
    /// Values pass through the declared `map`, as with [`set`](Self::set).
    pub fn with_root<D, V>(name: impl Into<SmolStr>, declarations: D, values: V) -> Self
    where
        D: IntoIterator<Item = (&'static str, AttributeOptions)>,
        V: IntoIterator<Item = (&'static str, Vec<AttributeValue>)>,
    {
        let mut root = TypeNode::default();
        for (attribute, options) in declarations {
            root.declarations.insert(SmolStr::new_static(attribute), options);
        }
        for (attribute, list) in values {
            let map = root.declarations.get(attribute).and_then(|o| o.map.clone());
            let list = match map {
                Some(map) => list.into_iter().map(|v| map(v)).collect(),
                None => list,
            };
            root.values.insert(SmolStr::new_static(attribute), list);
        }

        let mut types = IndexMap::new();
        types.insert(name.into(), root);
        Self { types }
    }

    /// Add a type below `parent`.
    pub fn add_type(&mut self, name: impl Into<SmolStr>, parent: Option<&str>) -> ReportResult<()> {
        let name = name.into();
        if self.types.contains_key(&name) {
            return Err(ReportError::duplicate_filter_type(name.as_str()));
        }
        if let Some(parent) = parent {
            if !self.types.contains_key(parent) {
                return Err(ReportError::unknown_parent_type(name.as_str(), parent));
            }
        }
        self.types.insert(
            name,
            TypeNode {
                parent: parent.map(SmolStr::new),
                ..TypeNode::default()
            },
        );
        Ok(())
    }

    /// Whether a type is known.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Parent of a type.
    pub fn parent(&self, name: &str) -> Option<&str> {
        self.types.get(name)?.parent.as_deref()
    }

    /// Type names in declaration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(SmolStr::as_str)
    }

    /// Declare an attribute on a type. Re-declaring on the same type replaces it.
    pub fn declare(
        &mut self,
        type_name: &str,
        attribute: impl Into<SmolStr>,
        options: AttributeOptions,
    ) -> ReportResult<()> {
        let node = self.node_mut(type_name)?;
        node.declarations.insert(attribute.into(), options);
        Ok(())
    }

    /// Store values at `type_name`.
    ///
    /// List attributes append to what the type already holds; scalar
    /// attributes take exactly one value and replace the previous one.
    pub fn set<I, V>(&mut self, type_name: &str, attribute: &str, values: I) -> ReportResult<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<AttributeValue>,
    {
        let options = self.declaration(type_name, attribute)?.clone();
        let mapped: Vec<AttributeValue> = values
            .into_iter()
            .map(|v: V| -> AttributeValue { v.into() })
            .map(|v| match &options.map {
                Some(map) => map(v),
                None => v,
            })
            .collect();

        if !options.list && mapped.len() != 1 {
            return Err(ReportError::configuration(format!(
                "scalar attribute `{}` on `{}` takes one value, got {}",
                attribute,
                type_name,
                mapped.len()
            )));
        }

        trace!(type_name, attribute, count = mapped.len(), "Setting attribute");
        let node = self.node_mut(type_name)?;
        let slot = node.values.entry(SmolStr::new(attribute)).or_default();
        if options.list {
            slot.extend(mapped);
        } else {
            *slot = mapped;
        }
        Ok(())
    }

    /// Make `type_name` an inheritance boundary for `attribute`.
    pub fn stop_inheritance(&mut self, type_name: &str, attribute: impl Into<SmolStr>) -> ReportResult<()> {
        self.node_mut(type_name)?.stops.insert(attribute.into());
        Ok(())
    }

    /// Resolve one attribute by walking the ancestors of `type_name`.
    pub fn get(&self, type_name: &str, attribute: &str) -> ReportResult<Resolved> {
        let options = self.declaration(type_name, attribute)?;
        let mut chain = Vec::new();
        let mut current = Some(type_name);
        while let Some(name) = current {
            let node = self.node(name)?;
            chain.push(node);
            if node.stops.contains(attribute) {
                break;
            }
            current = node.parent.as_deref();
        }

        if options.list {
            let raw: Vec<AttributeValue> = chain
                .iter()
                .rev()
                .filter_map(|node| node.values.get(attribute))
                .flatten()
                .cloned()
                .collect();
            Ok(finish_list(options, raw))
        } else {
            let own = chain
                .iter()
                .find_map(|node| node.values.get(attribute).and_then(|v| v.first()))
                .cloned();
            Ok(Resolved::Scalar(own.or_else(|| options.default.clone())))
        }
    }

    /// Resolve every attribute of every type.
    pub fn freeze(&self) -> FrozenHierarchy {
        // Raw, not yet de-duplicated or defaulted, values per type.
        let mut raw: IndexMap<&str, IndexMap<&str, Resolved>> = IndexMap::with_capacity(self.types.len());
        let mut visible: IndexMap<&str, IndexMap<&str, &AttributeOptions>> =
            IndexMap::with_capacity(self.types.len());

        for (name, node) in &self.types {
            let parent = node.parent.as_deref();
            let mut declared: IndexMap<&str, &AttributeOptions> = parent
                .and_then(|p| visible.get(p))
                .cloned()
                .unwrap_or_default();
            for (attr, options) in &node.declarations {
                declared.insert(attr.as_str(), options);
            }

            let mut resolved: IndexMap<&str, Resolved> = IndexMap::with_capacity(declared.len());
            for (attr, options) in &declared {
                let inherited = if node.stops.contains(*attr) {
                    None
                } else {
                    parent.and_then(|p| raw.get(p)).and_then(|r| r.get(*attr))
                };
                let own = node.values.get(*attr);

                let value = if options.list {
                    let mut list = match inherited {
                        Some(Resolved::List(list)) => list.clone(),
                        _ => Vec::new(),
                    };
                    list.extend(own.into_iter().flatten().cloned());
                    Resolved::List(list)
                } else {
                    let own = own.and_then(|v| v.first()).cloned();
                    let inherited = match inherited {
                        Some(Resolved::Scalar(v)) => v.clone(),
                        _ => None,
                    };
                    Resolved::Scalar(own.or(inherited))
                };
                resolved.insert(*attr, value);
            }

            raw.insert(name.as_str(), resolved);
            visible.insert(name.as_str(), declared);
        }

        let types = raw
            .into_iter()
            .map(|(name, attrs)| {
                let declared = &visible[name];
                let attrs = attrs
                    .into_iter()
                    .map(|(attr, value)| {
                        let options = declared[attr];
                        let value = match value {
                            Resolved::List(list) => finish_list(options, list),
                            Resolved::Scalar(v) => Resolved::Scalar(v.or_else(|| options.default.clone())),
                        };
                        (SmolStr::new(attr), value)
                    })
                    .collect();
                (
                    SmolStr::new(name),
                    ResolvedAttributes {
                        parent: self.types[name].parent.clone(),
                        attrs,
                    },
                )
            })
            .collect();

        FrozenHierarchy { types }
    }

    fn node(&self, name: &str) -> ReportResult<&TypeNode> {
        self.types
            .get(name)
            .ok_or_else(|| ReportError::unknown_filter_type(name))
    }

    fn node_mut(&mut self, name: &str) -> ReportResult<&mut TypeNode> {
        self.types
            .get_mut(name)
            .ok_or_else(|| ReportError::unknown_filter_type(name))
    }

    /// Nearest declaration of `attribute`, starting at `type_name`.
    fn declaration(&self, type_name: &str, attribute: &str) -> ReportResult<&AttributeOptions> {
        let mut current = Some(type_name);
        while let Some(name) = current {
            let node = self.node(name)?;
            if let Some(options) = node.declarations.get(attribute) {
                return Ok(options);
            }
            current = node.parent.as_deref();
        }
        Err(ReportError::unknown_attribute(type_name, attribute))
    }
}

fn finish_list(options: &AttributeOptions, mut list: Vec<AttributeValue>) -> Resolved {
    if options.uniq {
        let unique: IndexSet<AttributeValue> = list.into_iter().collect();
        list = unique.into_iter().collect();
    }
    if list.is_empty() {
        list.extend(options.default.clone());
    }
    Resolved::List(list)
}

/// Resolved attributes of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttributes {
    parent: Option<SmolStr>,
    attrs: IndexMap<SmolStr, Resolved>,
}

impl ResolvedAttributes {
    /// Parent type.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// A resolved attribute, `None` when it is not declared for this type.
    pub fn get(&self, attribute: &str) -> Option<&Resolved> {
        self.attrs.get(attribute)
    }

    /// A list attribute; empty when undeclared or scalar.
    pub fn list(&self, attribute: &str) -> &[AttributeValue] {
        match self.attrs.get(attribute) {
            Some(Resolved::List(list)) => list,
            _ => &[],
        }
    }

    /// A scalar attribute.
    pub fn scalar(&self, attribute: &str) -> Option<&AttributeValue> {
        match self.attrs.get(attribute) {
            Some(Resolved::Scalar(v)) => v.as_ref(),
            _ => None,
        }
    }

    /// A boolean scalar, `false` when unset.
    pub fn flag(&self, attribute: &str) -> bool {
        self.scalar(attribute)
            .and_then(AttributeValue::as_bool)
            .unwrap_or(false)
    }
}

/// Immutable attribute data for every declared type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrozenHierarchy {
    types: IndexMap<SmolStr, ResolvedAttributes>,
}

impl FrozenHierarchy {
    /// Attributes of a type.
    pub fn get(&self, type_name: &str) -> Option<&ResolvedAttributes> {
        self.types.get(type_name)
    }

    /// Whether `type_name` is `ancestor` or one of its descendants.
    pub fn is_a(&self, type_name: &str, ancestor: &str) -> bool {
        let mut current = Some(type_name);
        while let Some(name) = current {
            if name == ancestor {
                return true;
            }
            current = self.types.get(name).and_then(ResolvedAttributes::parent);
        }
        false
    }

    /// Type names in declaration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(SmolStr::as_str)
    }
}
