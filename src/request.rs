use serde::{Deserialize, Deserializer};

use crate::types::{HostParams, HostValue, Mapping, ResourceId};

/// A request against a catalogued statement addressed by `(group_id, sql_id)`.
///
/// Built fluently in Rust, or deserialized from the JSON object a scripting host sends:
/// ```rust
/// use sql_script_bridge::prelude::*;
///
/// let req = TemplateRequest::new("USER", "BY_ID").param("id", "42");
/// let same: TemplateRequest = serde_json::from_str(
///     r#"{"jdbcResourceName": "", "groupId": "USER", "sqlId": "BY_ID", "params": {"id": "42"}}"#,
/// )?;
/// assert_eq!(req, same);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRequest {
    /// Resource to run on; `None` is the registry default.
    #[serde(
        default,
        rename = "jdbcResourceName",
        alias = "resourceId",
        deserialize_with = "deserialize_resource"
    )]
    pub resource: Option<ResourceId>,
    pub group_id: String,
    pub sql_id: String,
    #[serde(default, alias = "parameters", deserialize_with = "deserialize_params")]
    pub params: HostParams,
    #[serde(default)]
    pub mapping: Option<Mapping>,
}

impl TemplateRequest {
    #[must_use]
    pub fn new(group_id: impl Into<String>, sql_id: impl Into<String>) -> Self {
        Self {
            resource: None,
            group_id: group_id.into(),
            sql_id: sql_id.into(),
            params: HostParams::new(),
            mapping: None,
        }
    }

    /// Run on a named resource instead of the default one.
    #[must_use]
    pub fn on(mut self, resource: impl Into<ResourceId>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<HostValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn params(mut self, params: HostParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn mapping(mut self, mapping: Mapping) -> Self {
        self.mapping = Some(mapping);
        self
    }
}

/// A request carrying raw SQL text instead of a catalogued statement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SqlRequest {
    /// Resource to run on; `None` is the registry default.
    #[serde(
        default,
        rename = "jdbcResourceName",
        alias = "resourceId",
        deserialize_with = "deserialize_resource"
    )]
    pub resource: Option<ResourceId>,
    pub sql: String,
    #[serde(default)]
    pub mapping: Option<Mapping>,
}

impl SqlRequest {
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            resource: None,
            sql: sql.into(),
            mapping: None,
        }
    }

    /// Run on a named resource instead of the default one.
    #[must_use]
    pub fn on(mut self, resource: impl Into<ResourceId>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    #[must_use]
    pub fn mapping(mut self, mapping: Mapping) -> Self {
        self.mapping = Some(mapping);
        self
    }
}

fn deserialize_resource<'de, D>(deserializer: D) -> Result<Option<ResourceId>, D::Error>
where
    D: Deserializer<'de>,
{
    let name = Option::<String>::deserialize(deserializer)?;
    Ok(ResourceId::from_host(name.as_deref()))
}

fn deserialize_params<'de, D>(deserializer: D) -> Result<HostParams, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HostParams>::deserialize(deserializer)?.unwrap_or_default())
}
