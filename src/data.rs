//! Typed tabular data: scalar values, attribute schema, datasets and
//! quasi-identifier sets.
//!
//! Records are not loose maps: a dataset carries a fixed, ordered schema of
//! typed attributes, validated once when the dataset is built. Everything
//! downstream references attributes by name against that schema, so a typo
//! in a QI set fails as a configuration error before any work happens.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{ConfigurationError, Result};

/// Declared kind of a dataset attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Text,
    Int,
    Float,
}

/// One scalar cell value.
///
/// `Missing` is a first-class value, not a wildcard: two records missing the
/// same attribute are equal on it and fall into the same equivalence class.
/// Floats compare and hash by bit pattern so value tuples can serve as
/// grouping keys.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Whether this value is admissible under the declared kind. `Missing`
    /// is admissible everywhere.
    pub fn matches_kind(&self, kind: AttrKind) -> bool {
        match (self, kind) {
            (Value::Missing, _) => true,
            (Value::Text(_), AttrKind::Text) => true,
            (Value::Int(_), AttrKind::Int) => true,
            (Value::Float(_), AttrKind::Float) => true,
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Missing, Value::Missing) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Text(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            Value::Int(i) => {
                1u8.hash(state);
                i.hash(state);
            }
            Value::Float(f) => {
                2u8.hash(state);
                f.to_bits().hash(state);
            }
            Value::Missing => 3u8.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Missing => write!(f, "<missing>"),
        }
    }
}

/// One attribute declaration: a name and its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttrKind,
}

impl Attribute {
    pub fn new(name: impl Into<String>, kind: AttrKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Fixed, ordered list of attribute declarations with name lookup.
#[derive(Debug, Clone)]
pub struct Schema {
    attrs: Vec<Attribute>,
    by_name: HashMap<String, usize>,
}

impl Schema {
    /// Build a schema, rejecting duplicate attribute names.
    pub fn new(attrs: Vec<Attribute>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(attrs.len());
        for (i, attr) in attrs.iter().enumerate() {
            if by_name.insert(attr.name.clone(), i).is_some() {
                return Err(ConfigurationError::DuplicateAttribute(attr.name.clone()).into());
            }
        }
        Ok(Self { attrs, by_name })
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Column index for `name`, or a configuration error if the schema does
    /// not declare it.
    pub fn resolve(&self, name: &str) -> Result<usize> {
        self.index_of(name)
            .ok_or_else(|| ConfigurationError::UnknownAttribute(name.to_string()).into())
    }
}

/// An immutable table: a schema plus row-major values.
///
/// Rows are validated against the schema once, at construction; the engine
/// never mutates them afterwards.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Schema,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset, checking every row for width and value kind.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != schema.len() {
                return Err(ConfigurationError::RowWidth {
                    row: i,
                    expected: schema.len(),
                    found: row.len(),
                }
                .into());
            }
            for (attr, value) in schema.attrs().iter().zip(row.iter()) {
                if !value.matches_kind(attr.kind) {
                    return Err(ConfigurationError::ValueKind {
                        row: i,
                        attribute: attr.name.clone(),
                        expected: attr.kind,
                    }
                    .into());
                }
            }
        }
        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn value(&self, row: usize, col: usize) -> &Value {
        &self.rows[row][col]
    }

    /// Values of one column, in row order.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| &row[col])
    }
}

/// An ordered, non-empty set of attribute names treated as one
/// quasi-identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QiSet {
    attributes: Vec<String>,
}

impl QiSet {
    /// Build a QI set, rejecting empty or duplicated attribute lists. Names
    /// are checked against a schema later, at assessment time.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attributes: Vec<String> = names.into_iter().map(Into::into).collect();
        if attributes.is_empty() {
            return Err(ConfigurationError::EmptyQiSet.into());
        }
        let mut seen = HashMap::with_capacity(attributes.len());
        for name in &attributes {
            if seen.insert(name.as_str(), ()).is_some() {
                return Err(ConfigurationError::DuplicateQiAttribute(name.clone()).into());
            }
        }
        Ok(Self { attributes })
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Attribute names joined with `+`, used to identify the set in reports.
    pub fn label(&self) -> String {
        self.attributes.join("+")
    }

    /// Column indices of this set's attributes, in set order.
    pub fn resolve(&self, schema: &Schema) -> Result<Vec<usize>> {
        self.attributes
            .iter()
            .map(|name| schema.resolve(name))
            .collect()
    }
}

impl fmt::Display for QiSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
