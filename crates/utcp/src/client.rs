//! Manifest discovery and tool dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::invoker::{ToolCallResult, ToolInvoker};
use crate::protocol::{CallTemplate, Manifest, Tool};
use crate::template::Variables;
use crate::value::Parameters;

/// Default timeout for discovery and tool requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable view of one discovered manifest.
#[derive(Debug)]
struct Snapshot {
    manifest: Arc<Manifest>,
    index: HashMap<String, usize>,
}

impl Snapshot {
    fn new(manifest: Manifest) -> Self {
        // Later tools shadow earlier ones with the same name.
        let index = manifest
            .tools
            .iter()
            .enumerate()
            .map(|(i, tool)| (tool.name.clone(), i))
            .collect();
        Self {
            manifest: Arc::new(manifest),
            index,
        }
    }

    fn tool(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&i| &self.manifest.tools[i])
    }
}

/// Builder for [`ManifestClient`].
#[derive(Debug, Clone)]
pub struct ManifestClientBuilder {
    variables: Variables,
    timeout: Duration,
    omit_unresolved_query_params: bool,
}

impl Default for ManifestClientBuilder {
    fn default() -> Self {
        Self {
            variables: Variables::new(),
            timeout: DEFAULT_TIMEOUT,
            omit_unresolved_query_params: false,
        }
    }
}

impl ManifestClientBuilder {
    /// Environment values for `${name}` substitution and credentials.
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    /// Per-request timeout for discovery and tool calls.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// See [`ToolInvoker::omit_unresolved_query_params`].
    pub fn omit_unresolved_query_params(mut self, omit: bool) -> Self {
        self.omit_unresolved_query_params = omit;
        self
    }

    pub fn build(self) -> Result<ManifestClient> {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build http client: {e}")))?;

        let invoker = ToolInvoker::new(http.clone(), self.variables)
            .omit_unresolved_query_params(self.omit_unresolved_query_params);

        Ok(ManifestClient {
            http,
            invoker,
            current: RwLock::new(None),
        })
    }
}

/// Client for a UTCP provider.
///
/// Holds the most recently discovered manifest. Discovery swaps in a whole
/// new snapshot, so concurrent readers see either the old tool list or the
/// new one, never a mix.
#[derive(Debug)]
pub struct ManifestClient {
    http: reqwest::Client,
    invoker: ToolInvoker,
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl ManifestClient {
    pub fn builder() -> ManifestClientBuilder {
        ManifestClientBuilder::default()
    }

    /// Fetch and load the manifest at `url`, replacing any previous one.
    pub async fn discover(&self, url: &str) -> Result<Arc<Manifest>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::discovery(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::discovery(url, format!("HTTP {status}")));
        }

        let body = response.text().await.map_err(|e| Error::discovery(url, e))?;
        let manifest: Manifest = serde_json::from_str(&body)
            .map_err(|e| Error::discovery(url, format!("invalid manifest: {e}")))?;

        info!(
            provider = %manifest.name,
            tools = manifest.tools.len(),
            "discovered tools"
        );
        for tool in &manifest.tools {
            debug!(tool = %tool.name, description = %tool.description, "tool");
        }

        let snapshot = Arc::new(Snapshot::new(manifest));
        let manifest = Arc::clone(&snapshot.manifest);
        *self.current.write().await = Some(snapshot);

        Ok(manifest)
    }

    /// The currently loaded manifest.
    pub async fn manifest(&self) -> Result<Arc<Manifest>> {
        Ok(Arc::clone(&self.snapshot().await?.manifest))
    }

    /// All tools of the current manifest, in manifest order.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        Ok(self.snapshot().await?.manifest.tools.clone())
    }

    /// Look up a tool by name. `Ok(None)` if the manifest has no such tool.
    pub async fn get_tool(&self, name: &str) -> Result<Option<Tool>> {
        Ok(self.snapshot().await?.tool(name).cloned())
    }

    /// Call a tool of the current manifest.
    pub async fn call_tool(&self, name: &str, parameters: &Parameters) -> Result<ToolCallResult> {
        self.call_tool_with(name, |_| parameters.clone()).await
    }

    /// Call a tool, deriving its parameters from the tool definition.
    ///
    /// Lookup, parameter mapping and invocation all use the same manifest,
    /// even if a discovery completes in between.
    pub async fn call_tool_with<F>(&self, name: &str, parameters: F) -> Result<ToolCallResult>
    where
        F: FnOnce(&Tool) -> Parameters,
    {
        let snapshot = self.snapshot().await?;
        let tool = snapshot
            .tool(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;
        let parameters = parameters(tool);
        let parameters = &parameters;

        info!(tool = %name, "calling tool");
        debug!(tool = %name, ?parameters, "tool parameters");

        match &tool.tool_call_template {
            CallTemplate::Http(http) => {
                self.invoker
                    .invoke(http, parameters, snapshot.manifest.auth.as_ref())
                    .await
            }
            CallTemplate::Unsupported { kind, .. } => Err(Error::UnsupportedTemplate(kind.clone())),
        }
    }

    async fn snapshot(&self) -> Result<Arc<Snapshot>> {
        self.current.read().await.clone().ok_or(Error::NotDiscovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ParamValue;
    use serde_json::{Value, json};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool(name: &str, url: &str, query: Value) -> Value {
        json!({
            "name": name,
            "description": format!("{name} tool"),
            "tags": ["weather"],
            "inputs": {
                "type": "object",
                "properties": {"location": {"type": "string"}},
                "required": ["location"]
            },
            "tool_call_template": {
                "call_template_type": "http",
                "url": url,
                "http_method": "GET",
                "query_params": query
            }
        })
    }

    async fn serve_manifest(server: &MockServer, route: &str, manifest: Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(manifest))
            .mount(server)
            .await;
    }

    fn client() -> ManifestClient {
        ManifestClient::builder().build().unwrap()
    }

    #[tokio::test]
    async fn discovers_tools_in_manifest_order() {
        let server = MockServer::start().await;
        serve_manifest(
            &server,
            "/utcp",
            json!({
                "name": "Weather API",
                "tools": [
                    tool("get_current_weather", "https://host/current", json!({})),
                    tool("get_forecast", "https://host/forecast", json!({}))
                ]
            }),
        )
        .await;

        let client = client();
        let manifest = client.discover(&format!("{}/utcp", server.uri())).await.unwrap();
        assert_eq!(manifest.utcp_version, "1.1.0");

        let names: Vec<_> = client
            .list_tools()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, ["get_current_weather", "get_forecast"]);
        assert!(client.get_tool("missing").await.unwrap().is_none());
        assert!(client.get_tool("get_forecast").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn queries_before_discovery_fail() {
        let client = client();
        assert!(matches!(client.list_tools().await, Err(Error::NotDiscovered)));
        assert!(matches!(client.get_tool("x").await, Err(Error::NotDiscovered)));
        assert!(matches!(
            client.call_tool("x", &Parameters::new()).await,
            Err(Error::NotDiscovered)
        ));
    }

    #[tokio::test]
    async fn unavailable_manifest_is_a_discovery_error() {
        let server = MockServer::start().await;
        Mock::given(path("/utcp"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client()
            .discover(&format!("{}/utcp", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Discovery { .. }));
    }

    #[tokio::test]
    async fn malformed_manifest_is_a_discovery_error() {
        let server = MockServer::start().await;
        Mock::given(path("/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;
        serve_manifest(&server, "/nameless", json!({"tools": []})).await;

        let client = client();
        for route in ["/broken", "/nameless"] {
            let err = client
                .discover(&format!("{}{route}", server.uri()))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Discovery { .. }), "{route}: {err}");
        }
    }

    #[tokio::test]
    async fn rediscovery_replaces_previous_manifest() {
        let server = MockServer::start().await;
        serve_manifest(
            &server,
            "/a",
            json!({"name": "A", "tools": [tool("alpha", "https://host/a", json!({}))]}),
        )
        .await;
        serve_manifest(
            &server,
            "/b",
            json!({"name": "B", "tools": [tool("beta", "https://host/b", json!({}))]}),
        )
        .await;

        let client = client();
        client.discover(&format!("{}/a", server.uri())).await.unwrap();
        client.discover(&format!("{}/b", server.uri())).await.unwrap();

        assert_eq!(client.manifest().await.unwrap().name, "B");
        assert!(client.get_tool("alpha").await.unwrap().is_none());
        assert!(client.get_tool("beta").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn duplicate_names_resolve_to_last_definition() {
        let server = MockServer::start().await;
        serve_manifest(
            &server,
            "/utcp",
            json!({"name": "Dup", "tools": [
                tool("lookup", "https://first/", json!({})),
                tool("lookup", "https://second/", json!({}))
            ]}),
        )
        .await;

        let client = client();
        client.discover(&format!("{}/utcp", server.uri())).await.unwrap();
        let tool = client.get_tool("lookup").await.unwrap().unwrap();
        let CallTemplate::Http(http) = tool.tool_call_template else {
            panic!("expected http template");
        };
        assert_eq!(http.url, "https://second/");
    }

    #[tokio::test]
    async fn calls_tool_with_manifest_auth() {
        let server = MockServer::start().await;
        let weather_url = format!("{}/current", server.uri());
        serve_manifest(
            &server,
            "/utcp",
            json!({
                "name": "Weather API",
                "tools": [tool("get_current_weather", &weather_url, json!({"location": "${location}"}))],
                "auth": {
                    "auth_type": "api_key",
                    "api_key": "${WEATHER_KEY}",
                    "var_name": "X-Api-Key",
                    "location": "header"
                }
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/current"))
            .and(query_param("location", "Berlin"))
            .and(header("x-api-key", "k-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"temp": 18})))
            .mount(&server)
            .await;

        let client = ManifestClient::builder()
            .variables(Variables::from([("WEATHER_KEY".to_string(), "k-42".to_string())]))
            .build()
            .unwrap();
        client.discover(&format!("{}/utcp", server.uri())).await.unwrap();

        let parameters = Parameters::from([("location".to_string(), ParamValue::from("Berlin"))]);
        let result = client.call_tool("get_current_weather", &parameters).await.unwrap();
        assert!(result.success);
        assert_eq!(result.json(), Some(json!({"temp": 18})));
    }

    #[tokio::test]
    async fn unknown_tool_and_unsupported_template() {
        let server = MockServer::start().await;
        serve_manifest(
            &server,
            "/utcp",
            json!({"name": "Mixed", "tools": [{
                "name": "publish",
                "tool_call_template": {"call_template_type": "mqtt", "topic": "t"}
            }]}),
        )
        .await;

        let client = client();
        client.discover(&format!("{}/utcp", server.uri())).await.unwrap();

        let err = client.call_tool("missing", &Parameters::new()).await.unwrap_err();
        assert!(matches!(err, Error::UnknownTool(name) if name == "missing"));

        let err = client.call_tool("publish", &Parameters::new()).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedTemplate(kind) if kind == "mqtt"));
    }

    #[tokio::test]
    async fn call_tool_with_maps_parameters_from_resolved_tool() {
        let server = MockServer::start().await;
        let weather_url = format!("{}/current", server.uri());
        serve_manifest(
            &server,
            "/utcp",
            json!({
                "name": "Weather API",
                "tools": [tool("get_current_weather", &weather_url, json!({"location": "${location}"}))],
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/current"))
            .and(query_param("location", "Oslo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"temp": 4})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client();
        client.discover(&format!("{}/utcp", server.uri())).await.unwrap();

        let result = client
            .call_tool_with("get_current_weather", |tool| {
                assert_eq!(tool.inputs.required, ["location"]);
                Parameters::from([("location".to_string(), ParamValue::from("Oslo"))])
            })
            .await
            .unwrap();
        assert_eq!(result.json(), Some(json!({"temp": 4})));

        let err = client
            .call_tool_with("missing", |_| panic!("no tool to map parameters for"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownTool(name) if name == "missing"));
    }
}
