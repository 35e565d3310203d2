//! Sheet, row and value types and their serde conversions.

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::StoreError;

/// The named sheets of the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sheet {
    /// One row per order line.
    #[serde(rename = "Order")]
    Order,
    /// One row per catalog item holding its current quantity.
    #[serde(rename = "Stock")]
    Stock,
    /// Catalog items with cost components.
    #[serde(rename = "Master Item")]
    MasterItem,
    /// Purchased supplies.
    #[serde(rename = "Shopping List")]
    ShoppingList,
}

impl Sheet {
    /// All sheets, in display order.
    pub const ALL: [Sheet; 4] = [
        Sheet::Order,
        Sheet::Stock,
        Sheet::MasterItem,
        Sheet::ShoppingList,
    ];

    /// The sheet's display name.
    pub fn name(&self) -> &'static str {
        match self {
            Sheet::Order => "Order",
            Sheet::Stock => "Stock",
            Sheet::MasterItem => "Master Item",
            Sheet::ShoppingList => "Shopping List",
        }
    }

    /// Parse a display name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stable surrogate key assigned by the store when a row is appended.
///
/// Unlike a row's position, the key survives deletes of earlier rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowKey(pub u64);

impl RowKey {
    /// Get the raw key.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for RowKey {
    fn from(v: u64) -> Self {
        RowKey(v)
    }
}

/// A cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Empty cell.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// Real/float value.
    Real(f64),
    /// Text value.
    Text(String),
}

impl Value {
    /// Try to get the value as an i64.
    ///
    /// Text cells holding an integer are accepted, as a spreadsheet
    /// frequently hands numbers back as strings.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Real(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to get the value as a string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Check if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::Number((*i).into()),
            Value::Real(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Real(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::Text(s),
            // Cells are flat; nested values are kept as their JSON text.
            other => Value::Text(other.to_string()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// The cells of one row, in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing an existing value with the same name.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter().position(|c| *c == column) {
            Some(i) => self.values[i] = value,
            None => {
                self.columns.push(column);
                self.values.push(value);
            }
        }
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Get a value by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Iterate over `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Get the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Build a record from any value that serializes to a flat object.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, StoreError> {
        match serde_json::to_value(value)? {
            serde_json::Value::Object(map) => {
                let mut record = Record::new();
                for (k, v) in map {
                    record.set(k, Value::from_json(v));
                }
                Ok(record)
            }
            other => Err(StoreError::Schema(format!(
                "expected an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Deserialize the record into a typed value.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let map: serde_json::Map<String, serde_json::Value> = self
            .columns
            .iter()
            .zip(self.values.iter())
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Ok(serde_json::from_value(serde_json::Value::Object(map))?)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// A row read back from a sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Stable key of the row.
    pub key: RowKey,
    /// Current 0-based position in the sheet. Unstable across deletes.
    pub position: usize,
    /// The row's cells.
    pub record: Record,
}

impl Row {
    /// Get a value by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.record.get(column)
    }

    /// Deserialize the row into a typed value.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        self.record.deserialize()
    }
}

/// Serde helpers for cells whose type drifted in the backing sheet.
pub mod lenient {
    use serde::{de, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Int(i64),
        Float(f64),
        Text(String),
        Null(()),
    }

    fn coerce<E: de::Error>(loose: Loose) -> Result<i64, E> {
        match loose {
            Loose::Int(i) => Ok(i),
            Loose::Float(f) if f.fract() == 0.0 => Ok(f as i64),
            Loose::Float(f) => Err(E::custom(format!("expected an integer, got {f}"))),
            Loose::Text(s) if s.trim().is_empty() => Ok(0),
            Loose::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("expected an integer, got {s:?}"))),
            Loose::Null(()) => Ok(0),
        }
    }

    /// Deserialize an integer that may arrive as a number, a numeric
    /// string, or an empty cell (read as zero).
    pub fn int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        coerce(Loose::deserialize(deserializer)?)
    }
}
