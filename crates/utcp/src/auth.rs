//! Credential injection for outgoing tool requests.

use crate::error::{Error, Result};
use crate::protocol::{ApiKeyLocation, AuthConfig, AuthKind};
use crate::template::{Variables, substitute};
use crate::value::Parameters;
use reqwest::Request;
use reqwest::header::{HeaderName, HeaderValue};
use tracing::debug;

/// Apply `auth` to `request`.
///
/// The credential is resolved against the environment only; call
/// parameters never reach it. Schemes other than `api_key`, and API keys
/// without a credential, name or known location, leave the request untouched.
pub fn apply(request: &mut Request, auth: &AuthConfig, environment: &Variables) -> Result<()> {
    if auth.auth_type != AuthKind::ApiKey {
        return Ok(());
    }
    let (Some(credential), Some(name)) = (&auth.api_key, &auth.var_name) else {
        return Ok(());
    };

    let credential = substitute(credential, environment, &Parameters::new());

    match auth.location {
        Some(ApiKeyLocation::Header) => {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidRequest(format!("auth header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(&credential)
                .map_err(|e| Error::InvalidRequest(format!("auth header {name}: {e}")))?;
            request.headers_mut().insert(header, value);
            debug!(header = %name, "applied api key header");
        }
        Some(ApiKeyLocation::Query) => {
            let query = set_query_param(request.url().query(), name, &credential);
            request.url_mut().set_query(Some(&query));
            debug!(param = %name, "applied api key query parameter");
        }
        Some(ApiKeyLocation::Unsupported) | None => {}
    }

    Ok(())
}

/// Set `name=value` in a raw query string, leaving other pairs byte-for-byte intact.
fn set_query_param(query: Option<&str>, name: &str, value: &str) -> String {
    let entry = format!("{}={}", urlencoding::encode(name), urlencoding::encode(value));
    let mut replaced = false;
    let mut pairs = Vec::new();

    for pair in query.unwrap_or_default().split('&').filter(|p| !p.is_empty()) {
        let key = pair.split_once('=').map_or(pair, |(k, _)| k);
        let key = urlencoding::decode(key).map(|k| k.into_owned()).unwrap_or_else(|_| key.to_string());
        if key != name {
            pairs.push(pair.to_string());
        } else if !replaced {
            pairs.push(entry.clone());
            replaced = true;
        }
    }

    if !replaced {
        pairs.push(entry);
    }
    pairs.join("&")
}
