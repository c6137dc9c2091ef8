//! UTCP manifest types (JSON wire format).

use crate::ordered::OrderedMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

const TEMPLATE_TYPE_KEY: &str = "call_template_type";
const HTTP_TEMPLATE: &str = "http";

/// Manifest published by a tool provider at its discovery URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_manual_version")]
    pub manual_version: String,
    #[serde(default = "default_utcp_version")]
    pub utcp_version: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tools: Vec<Tool>,
    /// Credentials applied to every tool in this manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
}

/// A callable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub inputs: InputSchema,
    /// Descriptive only; responses are never validated against it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_response_size: Option<u64>,
    pub tool_call_template: CallTemplate,
}

/// Declared input parameters of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type", default = "default_object_type")]
    pub kind: String,
    #[serde(default, deserialize_with = "nullable")]
    pub properties: OrderedMap<PropertySchema>,
    #[serde(default, deserialize_with = "nullable")]
    pub required: Vec<String>,
}

impl Default for InputSchema {
    fn default() -> Self {
        Self {
            kind: default_object_type(),
            properties: OrderedMap::new(),
            required: Vec::new(),
        }
    }
}

/// Schema of a single input property.
///
/// Constraints are advisory: they are surfaced to the model, not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type", default = "default_property_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,
}

impl PropertySchema {
    /// Whether numeric bounds are meaningful for this property.
    pub fn is_numeric(&self) -> bool {
        matches!(self.kind.as_str(), "integer" | "number")
    }
}

/// Declared output of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    #[serde(rename = "type", default = "default_object_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// How a tool is invoked, tagged by `call_template_type`.
///
/// Only HTTP is executable. Any other kind is kept verbatim so the manifest
/// still loads and the failure surfaces when that tool is called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum CallTemplate {
    Http(HttpCallTemplate),
    Unsupported { kind: String, raw: Value },
}

impl CallTemplate {
    /// The `call_template_type` tag.
    pub fn kind(&self) -> &str {
        match self {
            Self::Http(_) => HTTP_TEMPLATE,
            Self::Unsupported { kind, .. } => kind,
        }
    }
}

impl TryFrom<Value> for CallTemplate {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        // Manifests that omit the tag are HTTP.
        let kind = value
            .get(TEMPLATE_TYPE_KEY)
            .and_then(Value::as_str)
            .unwrap_or(HTTP_TEMPLATE)
            .to_string();

        if kind == HTTP_TEMPLATE {
            serde_json::from_value(value)
                .map(Self::Http)
                .map_err(|e| format!("invalid http call template: {e}"))
        } else {
            Ok(Self::Unsupported { kind, raw: value })
        }
    }
}

impl From<CallTemplate> for Value {
    fn from(template: CallTemplate) -> Self {
        match template {
            CallTemplate::Http(http) => {
                let mut value = serde_json::to_value(http).unwrap_or(Value::Null);
                if let Value::Object(map) = &mut value {
                    map.insert(TEMPLATE_TYPE_KEY.to_string(), HTTP_TEMPLATE.into());
                }
                value
            }
            CallTemplate::Unsupported { raw, .. } => raw,
        }
    }
}

/// HTTP call template. URL, header values, query values and the
/// serialized body are all `${name}` substitution targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpCallTemplate {
    pub url: String,
    #[serde(default = "default_http_method")]
    pub http_method: String,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "OrderedMap::is_empty")]
    pub headers: OrderedMap<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "OrderedMap::is_empty")]
    pub query_params: OrderedMap<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl HttpCallTemplate {
    /// Create a GET template for the given URL.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http_method: default_http_method(),
            headers: OrderedMap::new(),
            query_params: OrderedMap::new(),
            body: None,
        }
    }
}

/// Manifest-level authentication.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default, deserialize_with = "nullable")]
    pub auth_type: AuthKind,
    /// Credential, usually a `${VAR}` reference resolved from the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Header or query parameter name that carries the credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ApiKeyLocation>,
}

impl AuthConfig {
    /// API key carried in a header.
    pub fn api_key_header(name: impl Into<String>, credential: impl Into<String>) -> Self {
        Self::api_key(name, credential, ApiKeyLocation::Header)
    }

    /// API key carried in the query string.
    pub fn api_key_query(name: impl Into<String>, credential: impl Into<String>) -> Self {
        Self::api_key(name, credential, ApiKeyLocation::Query)
    }

    fn api_key(
        name: impl Into<String>,
        credential: impl Into<String>,
        location: ApiKeyLocation,
    ) -> Self {
        Self {
            auth_type: AuthKind::ApiKey,
            api_key: Some(credential.into()),
            var_name: Some(name.into()),
            location: Some(location),
        }
    }
}

/// Authentication scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    #[default]
    None,
    ApiKey,
    /// Reserved for schemes added later; ignored when applied.
    #[serde(other)]
    Unsupported,
}

/// Where an API key is placed on the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyLocation {
    Header,
    Query,
    #[serde(other)]
    Unsupported,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_manual_version() -> String {
    "1.0.0".to_string()
}

fn default_utcp_version() -> String {
    "1.1.0".to_string()
}

fn default_object_type() -> String {
    "object".to_string()
}

fn default_property_type() -> String {
    "string".to_string()
}

fn default_http_method() -> String {
    "GET".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_manifest() -> Value {
        json!({
            "manual_version": "1.0.0",
            "utcp_version": "1.1.0",
            "name": "Weather API",
            "description": "Weather information and forecasts",
            "tools": [{
                "name": "get_current_weather",
                "description": "Current weather for a location",
                "tags": ["weather", "current"],
                "inputs": {
                    "type": "object",
                    "properties": {
                        "location": {"type": "string", "description": "City name", "enum": null, "minimum": null, "maximum": null},
                        "units": {"type": "string", "enum": ["celsius", "fahrenheit"]}
                    },
                    "required": ["location"]
                },
                "output": {"type": "object", "description": "Current conditions"},
                "average_response_size": 512,
                "tool_call_template": {
                    "call_template_type": "http",
                    "url": "https://localhost:7247/api/v1/current",
                    "http_method": "GET",
                    "headers": null,
                    "query_params": {"location": "${location}", "units": "${units}"},
                    "body": null
                }
            }],
            "auth": null
        })
    }

    #[test]
    fn deserialize_manifest_with_nulls() {
        let manifest: Manifest = serde_json::from_value(weather_manifest()).unwrap();
        assert_eq!(manifest.name, "Weather API");
        assert!(manifest.auth.is_none());

        let tool = &manifest.tools[0];
        assert_eq!(tool.tags, vec!["weather", "current"]);
        assert_eq!(tool.inputs.required, vec!["location"]);
        assert_eq!(
            tool.inputs.properties["units"].allowed.as_deref(),
            Some(&["celsius".to_string(), "fahrenheit".to_string()][..])
        );

        let CallTemplate::Http(http) = &tool.tool_call_template else {
            panic!("expected http template");
        };
        assert!(http.headers.is_empty());
        assert_eq!(http.query_params["location"], "${location}");
        assert!(http.body.is_none());
    }

    #[test]
    fn missing_tool_name_is_rejected() {
        let mut value = weather_manifest();
        value["tools"][0].as_object_mut().unwrap().remove("name");
        assert!(serde_json::from_value::<Manifest>(value).is_err());
    }

    #[test]
    fn unknown_template_kind_is_preserved() {
        let template: CallTemplate = serde_json::from_value(json!({
            "call_template_type": "mqtt",
            "topic": "weather/${city}"
        }))
        .unwrap();
        assert_eq!(template.kind(), "mqtt");
        assert!(matches!(template, CallTemplate::Unsupported { .. }));
    }

    #[test]
    fn untagged_template_defaults_to_http() {
        let template: CallTemplate =
            serde_json::from_value(json!({"url": "https://host/weather"})).unwrap();
        let CallTemplate::Http(http) = template else {
            panic!("expected http template");
        };
        assert_eq!(http.http_method, "GET");
    }

    #[test]
    fn http_template_serializes_its_tag() {
        let value = serde_json::to_value(CallTemplate::Http(HttpCallTemplate::get("https://host"))).unwrap();
        assert_eq!(value["call_template_type"], "http");
        assert_eq!(value["url"], "https://host");
        assert!(value.get("headers").is_none());
    }

    #[test]
    fn auth_kinds() {
        let auth: AuthConfig = serde_json::from_value(json!({
            "auth_type": "api_key",
            "api_key": "${WEATHER_KEY}",
            "var_name": "X-Api-Key",
            "location": "header"
        }))
        .unwrap();
        assert_eq!(auth.auth_type, AuthKind::ApiKey);
        assert_eq!(auth.location, Some(ApiKeyLocation::Header));

        let oauth: AuthConfig =
            serde_json::from_value(json!({"auth_type": "oauth2", "location": "cookie"})).unwrap();
        assert_eq!(oauth.auth_type, AuthKind::Unsupported);
        assert_eq!(oauth.location, Some(ApiKeyLocation::Unsupported));

        let missing: AuthConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.auth_type, AuthKind::None);
    }
}
