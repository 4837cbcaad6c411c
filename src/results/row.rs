use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::HostValue;

/// One cursor row with every column already coerced to a host value.
///
/// Columns keep the order the result metadata reported them in. When two columns share a
/// name, the later write replaces the earlier value in the earlier position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    column_names: Vec<String>,
    values: Vec<HostValue>,
    // column name -> position, to avoid repeated string comparisons
    column_index: HashMap<String, usize>,
}

impl RawRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            column_names: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            column_index: HashMap::with_capacity(capacity),
        }
    }

    /// Set a column's value, returning the value it replaced.
    pub fn insert(&mut self, column: impl Into<String>, value: HostValue) -> Option<HostValue> {
        let column = column.into();
        if let Some(&idx) = self.column_index.get(&column) {
            return Some(std::mem::replace(&mut self.values[idx], value));
        }
        self.column_index.insert(column.clone(), self.values.len());
        self.column_names.push(column);
        self.values.push(value);
        None
    }

    /// Get a value by column name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&HostValue> {
        self.column_index
            .get(column)
            .and_then(|&idx| self.values.get(idx))
    }

    /// Get a value by column position.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&HostValue> {
        self.values.get(index)
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HostValue)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl IntoIterator for RawRow {
    type Item = (String, HostValue);
    type IntoIter = std::iter::Zip<std::vec::IntoIter<String>, std::vec::IntoIter<HostValue>>;

    fn into_iter(self) -> Self::IntoIter {
        self.column_names.into_iter().zip(self.values)
    }
}

impl<K: Into<String>> FromIterator<(K, HostValue)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, HostValue)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}
