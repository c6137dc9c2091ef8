//! Tool host backed by UTCP manifests.

use crate::bridge;
use crate::model::{ToolCall, ToolSpec};
use crate::tools::{ToolError, ToolHost};
use serde_json::{Value, json};
use tracing::{debug, info};
use utcp::{ManifestClient, ToolCallResult};

/// Serves the tools of UTCP manifests fetched from `manual_urls`.
///
/// Each refresh discovers every URL in order. A later manifest replaces an
/// earlier one, so with several URLs only the last manifest's tools are
/// offered.
pub struct UtcpToolHost {
    client: ManifestClient,
    manual_urls: Vec<String>,
}

impl UtcpToolHost {
    pub fn new(client: ManifestClient, manual_urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            client,
            manual_urls: manual_urls.into_iter().map(Into::into).collect(),
        }
    }

    pub fn client(&self) -> &ManifestClient {
        &self.client
    }

    pub fn manual_urls(&self) -> &[String] {
        &self.manual_urls
    }
}

impl ToolHost for UtcpToolHost {
    async fn refresh(&self) -> Result<(), ToolError> {
        if self.manual_urls.len() > 1 {
            debug!(
                manuals = self.manual_urls.len(),
                "each manual replaces the previous one; only the last is served"
            );
        }
        for url in &self.manual_urls {
            let manifest = self.client.discover(url).await?;
            info!(url = %url, manual = %manifest.name, tools = manifest.tools.len(), "discovered manual");
        }
        Ok(())
    }

    async fn specs(&self) -> Result<Vec<ToolSpec>, ToolError> {
        let tools = self.client.list_tools().await?;
        Ok(bridge::to_function_schemas(&tools))
    }

    async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
        let result = self
            .client
            .call_tool_with(&call.name, |tool| bridge::to_parameter_mapping(tool, &call.input))
            .await
            .map_err(|e| match e {
                utcp::Error::UnknownTool(name) => ToolError::NotFound(name),
                other => ToolError::Utcp(other),
            })?;
        debug!(tool = %call.name, status = result.status_code, success = result.success, "tool finished");

        Ok(result_payload(&call.name, &result))
    }
}

/// The payload handed back to the model for a completed call.
///
/// A successful body is returned as parsed JSON when it is JSON, otherwise
/// as a string. A failed call becomes an error object carrying the status
/// and raw body.
pub fn result_payload(tool_name: &str, result: &ToolCallResult) -> Value {
    if result.success {
        return result
            .json()
            .unwrap_or_else(|| Value::String(result.body.clone()));
    }

    json!({
        "error": true,
        "status_code": result.status_code,
        "message": format!("Tool '{tool_name}' failed with status {}", result.status_code),
        "details": result.body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn result(success: bool, status_code: u16, body: &str) -> ToolCallResult {
        ToolCallResult {
            success,
            status_code,
            body: body.into(),
            duration_ms: 3,
            headers: BTreeMap::new(),
        }
    }

    fn manifest(server: &MockServer, name: &str) -> Value {
        json!({
            "name": "weather",
            "tools": [{
                "name": name,
                "description": "Current weather",
                "inputs": {
                    "properties": {"location": {"type": "string"}},
                    "required": ["location"],
                },
                "tool_call_template": {
                    "call_template_type": "http",
                    "url": format!("{}/weather", server.uri()),
                    "http_method": "GET",
                    "query_params": {"location": "${location}"},
                },
            }],
        })
    }

    async fn mount_manifest(server: &MockServer, route: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn host(urls: Vec<String>) -> UtcpToolHost {
        UtcpToolHost::new(ManifestClient::builder().build().unwrap(), urls)
    }

    #[test]
    fn success_payload_prefers_json() {
        assert_eq!(
            result_payload("w", &result(true, 200, r#"{"temp":21}"#)),
            json!({"temp": 21})
        );
        assert_eq!(
            result_payload("w", &result(true, 200, "sunny")),
            json!("sunny")
        );
    }

    #[test]
    fn failure_payload_describes_status() {
        assert_eq!(
            result_payload("get_current_weather", &result(false, 404, "no such city")),
            json!({
                "error": true,
                "status_code": 404,
                "message": "Tool 'get_current_weather' failed with status 404",
                "details": "no such city",
            })
        );
    }

    #[tokio::test]
    async fn refresh_specs_and_execute() {
        let server = MockServer::start().await;
        mount_manifest(&server, "/utcp", manifest(&server, "get_current_weather")).await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("location", "Paris"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"temp": 21})))
            .expect(1)
            .mount(&server)
            .await;

        let host = host(vec![format!("{}/utcp", server.uri())]);
        host.refresh().await.unwrap();

        let specs = host.specs().await.unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "get_current_weather");

        let output = host
            .execute(&ToolCall::new(
                "call_1",
                "get_current_weather",
                json!({"location": "Paris"}),
            ))
            .await
            .unwrap();
        assert_eq!(output, json!({"temp": 21}));
    }

    #[tokio::test]
    async fn last_manual_wins() {
        let server = MockServer::start().await;
        mount_manifest(&server, "/first", manifest(&server, "first_tool")).await;
        mount_manifest(&server, "/second", manifest(&server, "second_tool")).await;

        let host = host(vec![
            format!("{}/first", server.uri()),
            format!("{}/second", server.uri()),
        ]);
        host.refresh().await.unwrap();

        let names: Vec<_> = host.specs().await.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["second_tool"]);
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let server = MockServer::start().await;
        mount_manifest(&server, "/utcp", manifest(&server, "get_current_weather")).await;

        let host = host(vec![format!("{}/utcp", server.uri())]);
        host.refresh().await.unwrap();

        let err = host
            .execute(&ToolCall::new("call_1", "launch_rockets", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "launch_rockets"));
    }

    #[tokio::test]
    async fn specs_before_refresh_fail() {
        let err = host(Vec::new()).specs().await.unwrap_err();
        assert!(matches!(err, ToolError::Utcp(utcp::Error::NotDiscovered)));
    }
}
