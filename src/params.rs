use std::collections::HashMap;

use crate::coercion::host_to_driver;
use crate::types::{DriverValue, HostParams, HostValue};

/// Driver-side parameter set, keyed by parameter name.
///
/// Built from host parameters by `DriverParams::bind`; names are not checked against any
/// statement here, that is left to the engine resolving the statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverParams(HashMap<String, DriverValue>);

impl DriverParams {
    /// Bind every host value through the host-to-driver coercion.
    #[must_use]
    pub fn bind(params: &HostParams) -> Self {
        let mut bound = HashMap::with_capacity(params.len());
        for (name, value) in params {
            bound.insert(name.clone(), host_to_driver(value));
        }
        DriverParams(bound)
    }

    /// Bind an optional parameter set; `None` yields an empty set.
    #[must_use]
    pub fn bind_optional(params: Option<&HostParams>) -> Self {
        params.map(Self::bind).unwrap_or_default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DriverValue> {
        self.0.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DriverValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Add or replace a single already-coerced value.
    pub fn insert(&mut self, name: impl Into<String>, value: DriverValue) {
        self.0.insert(name.into(), value);
    }
}

impl FromIterator<(String, HostValue)> for DriverParams {
    fn from_iter<I: IntoIterator<Item = (String, HostValue)>>(iter: I) -> Self {
        DriverParams(
            iter.into_iter()
                .map(|(name, value)| {
                    let bound = host_to_driver(&value);
                    (name, bound)
                })
                .collect(),
        )
    }
}
