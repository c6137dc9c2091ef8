//! HTTP tool invocation.

use crate::auth;
use crate::error::{Error, Result};
use crate::protocol::{AuthConfig, HttpCallTemplate};
use crate::template::{Variables, has_unresolved, substitute};
use crate::value::Parameters;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Body, Method, Request, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};

/// Outcome of a completed tool call.
///
/// A non-2xx response is still a result: `success` is false and the raw
/// body is preserved for the caller to inspect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub success: bool,
    pub status_code: u16,
    pub body: String,
    pub duration_ms: u64,
    pub headers: BTreeMap<String, String>,
}

impl ToolCallResult {
    /// Parse the body as JSON, if it is JSON.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Builds and executes HTTP requests from call templates.
#[derive(Debug, Clone)]
pub struct ToolInvoker {
    http: reqwest::Client,
    environment: Variables,
    omit_unresolved_query_params: bool,
}

impl ToolInvoker {
    /// Create an invoker that resolves templates against `environment`.
    pub fn new(http: reqwest::Client, environment: Variables) -> Self {
        Self {
            http,
            environment,
            omit_unresolved_query_params: false,
        }
    }

    /// Drop query parameters whose value still holds an unresolved placeholder.
    ///
    /// Off by default: such values are sent as the literal `${name}` text.
    pub fn omit_unresolved_query_params(mut self, omit: bool) -> Self {
        self.omit_unresolved_query_params = omit;
        self
    }

    /// Build the request for a call without sending it.
    pub fn build_request(
        &self,
        template: &HttpCallTemplate,
        parameters: &Parameters,
        auth: Option<&AuthConfig>,
    ) -> Result<Request> {
        let url = self.build_url(template, parameters);
        let url = Url::parse(&url).map_err(|e| Error::InvalidRequest(format!("url {url:?}: {e}")))?;

        let method = Method::from_bytes(template.http_method.to_ascii_uppercase().as_bytes())
            .map_err(|e| {
                Error::InvalidRequest(format!("http method {:?}: {e}", template.http_method))
            })?;

        let mut request = Request::new(method.clone(), url);

        for (name, value) in template.headers.iter() {
            let value = substitute(value, &self.environment, parameters);
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidRequest(format!("header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|e| Error::InvalidRequest(format!("header {name}: {e}")))?;
            request.headers_mut().insert(header, value);
        }

        if let Some(auth) = auth {
            auth::apply(&mut request, auth, &self.environment)?;
        }

        if matches!(method, Method::POST | Method::PUT | Method::PATCH) {
            if let Some(body) = &template.body {
                let json = serde_json::to_string(body)
                    .map_err(|e| Error::InvalidRequest(format!("body: {e}")))?;
                let json = substitute(&json, &self.environment, parameters);
                request
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                *request.body_mut() = Some(Body::from(json));
            }
        }

        Ok(request)
    }

    /// Execute a call.
    ///
    /// Returns `Err(Error::Transport)` only when the call did not complete;
    /// any HTTP status, including 4xx/5xx, yields `Ok`.
    pub async fn invoke(
        &self,
        template: &HttpCallTemplate,
        parameters: &Parameters,
        auth: Option<&AuthConfig>,
    ) -> Result<ToolCallResult> {
        let request = self.build_request(template, parameters, auth)?;
        let method = request.method().clone();
        let target = format!(
            "{}{}",
            request.url().host_str().unwrap_or_default(),
            request.url().path()
        );
        debug!(%method, %target, "calling tool endpoint");

        let started = Instant::now();
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        let headers = collect_headers(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(%method, %target, status = status.as_u16(), duration_ms, "tool call completed");

        Ok(ToolCallResult {
            success: status.is_success(),
            status_code: status.as_u16(),
            body,
            duration_ms,
            headers,
        })
    }

    fn build_url(&self, template: &HttpCallTemplate, parameters: &Parameters) -> String {
        let mut url = substitute(&template.url, &self.environment, parameters);

        let query: Vec<String> = template
            .query_params
            .iter()
            .filter(|(_, value)| {
                !(self.omit_unresolved_query_params
                    && has_unresolved(value, &self.environment, parameters))
            })
            .map(|(key, value)| {
                let value = substitute(value, &self.environment, parameters);
                format!("{key}={}", urlencoding::encode(&value))
            })
            .collect();

        if !query.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&query.join("&"));
        }
        url
    }
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .keys()
        .map(|name| {
            let values = headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
                .join(", ");
            (name.as_str().to_string(), values)
        })
        .collect()
}
