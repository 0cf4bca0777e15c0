//! Local execution of [`DataMap`] tools.
//!
//! Builds the outbound request exactly as declared (so it can be inspected in
//! a dry run), performs it with `reqwest`, and renders the foreach and output
//! templates against the JSON response. Failures fall back to the declared
//! fallback output when there is one.

use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Map, Value};
use thiserror::Error;

use super::datamap::DataMap;
use super::result::FunctionResult;
use super::template::{render, render_with, stringify, Placeholder, TemplateContext};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("{0}: webhook is not configured")]
    MissingWebhook(String),

    #[error("Invalid webhook URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),

    #[error("Response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Response has no items under `{0}`")]
    NoItems(String),

    #[error("{0}: no output template declared")]
    NoOutput(String),
}

/// A fully rendered outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub method: String,
    /// Final URL including the query string
    pub url: String,
    /// Query pairs in declaration order (empty values dropped)
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// JSON body for methods other than GET/DELETE
    pub body: Option<Value>,
}

impl std::fmt::Display for PreparedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)?;
        for (k, v) in &self.headers {
            write!(f, "\n{}: {}", k, v)?;
        }
        if let Some(body) = &self.body {
            write!(f, "\n\n{}", body)?;
        }
        Ok(())
    }
}

fn sends_query(method: &str) -> bool {
    matches!(method, "GET" | "DELETE" | "HEAD")
}

/// Render a DataMap's request template for the given arguments.
pub fn build_request(map: &DataMap, args: &Value) -> Result<PreparedRequest, ExecutorError> {
    let webhook = map
        .webhook
        .as_ref()
        .ok_or_else(|| ExecutorError::MissingWebhook(map.name.clone()))?;
    let ctx = TemplateContext::with_args(args.clone());

    let url_text = render_with(&webhook.url, &ctx, |s| urlencoding::encode(&s).into_owned());

    let rendered: Vec<(String, String)> = webhook
        .params
        .iter()
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => render(s, &ctx),
                other => stringify(other),
            };
            (k.clone(), value)
        })
        .filter(|(_, v)| !v.is_empty())
        .collect();

    let headers = webhook
        .headers
        .iter()
        .map(|(k, v)| (k.clone(), render(v, &ctx)))
        .collect();

    let mut url = url::Url::parse(&url_text).map_err(|source| ExecutorError::InvalidUrl {
        url: url_text.clone(),
        source,
    })?;

    let (query, body) = if sends_query(&webhook.method) {
        if !rendered.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &rendered {
                pairs.append_pair(k, v);
            }
        }
        (rendered, None)
    } else {
        let body: Map<String, Value> = rendered
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        (Vec::new(), Some(Value::Object(body)))
    };

    Ok(PreparedRequest {
        method: webhook.method.clone(),
        url: url.to_string(),
        query,
        headers,
        body,
    })
}

/// Executes DataMaps against their live endpoints.
#[derive(Debug, Clone)]
pub struct DataMapExecutor {
    client: reqwest::Client,
}

impl DataMapExecutor {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("recipe-agent/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Run the tool, substituting the fallback output on any failure.
    pub async fn execute(&self, map: &DataMap, args: &Value) -> Result<FunctionResult, ExecutorError> {
        match self.call(map, args).await {
            Ok(response) => Ok(FunctionResult::new(response)),
            Err(e) => match &map.fallback_output {
                Some(fallback) => {
                    tracing::warn!(tool = %map.name, error = %e, "DataMap call failed, using fallback output");
                    let ctx = TemplateContext::with_args(args.clone());
                    Ok(FunctionResult::new(render(fallback, &ctx)))
                }
                None => Err(e),
            },
        }
    }

    async fn call(&self, map: &DataMap, args: &Value) -> Result<String, ExecutorError> {
        let request = build_request(map, args)?;
        // build_request guarantees the webhook exists
        let webhook = map
            .webhook
            .as_ref()
            .ok_or_else(|| ExecutorError::MissingWebhook(map.name.clone()))?;

        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| ExecutorError::InvalidMethod(request.method.clone()))?;

        tracing::debug!(tool = %map.name, method = %request.method, url = %redact(&request.url), "Calling DataMap webhook");

        let mut builder = self.client.request(method, &request.url);
        for (k, v) in &request.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExecutorError::Status(status));
        }

        let text = response.text().await?;
        let body: Value =
            serde_json::from_str(&text).map_err(|e| ExecutorError::InvalidJson(e.to_string()))?;

        let mut ctx = TemplateContext {
            args: args.clone(),
            response: body,
            ..Default::default()
        };

        if let Some(foreach) = &webhook.foreach {
            let items = Placeholder::parse(&format!("response.{}", foreach.input_key))
                .ok()
                .and_then(|p| ctx.lookup(&p))
                .and_then(|v| v.as_array().cloned())
                .filter(|items| !items.is_empty())
                .ok_or_else(|| ExecutorError::NoItems(foreach.input_key.clone()))?;

            let mut text = String::new();
            for item in items.into_iter().take(foreach.max) {
                let item_ctx = TemplateContext {
                    this: item,
                    ..ctx.clone()
                };
                text.push_str(&render(&foreach.append, &item_ctx));
            }
            ctx.foreach = json!({ foreach.output_key.clone(): text });
        }

        let output = webhook
            .output
            .as_ref()
            .ok_or_else(|| ExecutorError::NoOutput(map.name.clone()))?;
        Ok(render(output, &ctx))
    }
}

/// Hide API keys when logging request URLs.
fn redact(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            let pairs: Vec<(String, String)> = parsed
                .query_pairs()
                .map(|(k, v)| {
                    let hidden = k.to_lowercase().contains("key");
                    (k.into_owned(), if hidden { "***".to_string() } else { v.into_owned() })
                })
                .collect();
            if !pairs.is_empty() {
                parsed.query_pairs_mut().clear().extend_pairs(pairs);
            }
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}
