//! UTCP (Universal Tool Calling Protocol) client library.
//!
//! A provider publishes a manifest describing its tools and how to call
//! them over HTTP. This crate discovers that manifest and executes tool
//! calls against the real endpoints, with `${name}` substitution and
//! API-key authentication.
//!
//! # Example
//!
//! ```no_run
//! use utcp::{ManifestClient, ParamValue, Parameters, Variables};
//!
//! # async fn example() -> utcp::Result<()> {
//! let client = ManifestClient::builder()
//!     .variables(Variables::from([("WEATHER_KEY".into(), "secret".into())]))
//!     .build()?;
//!
//! let manifest = client.discover("https://localhost:7247/api/v1/utcp").await?;
//! for tool in &manifest.tools {
//!     println!("Tool: {}", tool.name);
//! }
//!
//! let parameters = Parameters::from([("location".into(), ParamValue::from("Paris"))]);
//! let result = client.call_tool("get_current_weather", &parameters).await?;
//! println!("{} in {}ms: {}", result.status_code, result.duration_ms, result.body);
//! # Ok(())
//! # }
//! ```

pub mod auth;
mod client;
mod error;
mod invoker;
mod ordered;
mod protocol;
pub mod template;
mod value;

pub use client::{DEFAULT_TIMEOUT, ManifestClient, ManifestClientBuilder};
pub use error::{Error, Result};
pub use invoker::{ToolCallResult, ToolInvoker};
pub use ordered::OrderedMap;
pub use protocol::{
    ApiKeyLocation, AuthConfig, AuthKind, CallTemplate, HttpCallTemplate, InputSchema, Manifest,
    OutputSchema, PropertySchema, Tool,
};
pub use template::{Variables, substitute};
pub use value::{ParamValue, Parameters};
