//! SWML document rendering.
//!
//! The document answers the call, starts recording and hands the call to the
//! AI agent:
//!
//! ```text
//! { "version": "1.0.0", "sections": { "main": [ answer, record_call, ai ] } }
//! ```
//!
//! Webhook URLs carry the basic-auth credentials so the platform can call
//! back into `/swaig` and `/post_prompt`.

use serde_json::{json, Map, Value};
use url::Url;

use crate::agent::AgentDefinition;
use crate::config::Config;

pub const SWML_VERSION: &str = "1.0.0";

/// Public base URL of this server, without trailing slash.
///
/// `SWML_PROXY_URL_BASE` wins; otherwise the request `Host` header is used,
/// then the TLS domain, then the bind address.
pub fn base_url(config: &Config, host_header: Option<&str>) -> String {
    if let Some(base) = &config.proxy_url_base {
        return base.trim_end_matches('/').to_string();
    }
    let host = host_header
        .map(str::to_string)
        .or_else(|| {
            config
                .tls
                .domain
                .as_ref()
                .map(|d| format!("{}:{}", d, config.port))
        })
        .unwrap_or_else(|| format!("{}:{}", config.host, config.port));
    format!("{}://{}", config.scheme(), host)
}

/// `{base}{path}` with the basic-auth credentials embedded.
///
/// Falls back to the bare URL when the base cannot be parsed.
pub fn authed_url(config: &Config, base: &str, path: &str) -> String {
    let raw = format!("{}{}", base, path);
    let Ok(mut url) = Url::parse(&raw) else {
        tracing::warn!("Cannot embed credentials in unparseable URL {}", raw);
        return raw;
    };
    if url.set_username(&config.auth.username).is_err()
        || url.set_password(Some(&config.auth.password)).is_err()
    {
        return raw;
    }
    url.to_string()
}

/// Render the full SWML document for `agent`.
pub fn render(agent: &AgentDefinition, config: &Config, base: &str) -> Value {
    let mut main = Vec::new();
    if agent.auto_answer {
        main.push(json!({ "answer": {} }));
    }
    if let Some(recording) = &agent.record_call {
        main.push(json!({
            "record_call": {
                "format": recording.format,
                "stereo": recording.stereo,
            }
        }));
    }
    main.push(json!({ "ai": render_ai(agent, config, base) }));

    json!({
        "version": SWML_VERSION,
        "sections": { "main": main },
    })
}

fn render_ai(agent: &AgentDefinition, config: &Config, base: &str) -> Value {
    let mut prompt = Map::new();
    prompt.insert("pom".into(), agent.prompt.to_pom());
    if !agent.contexts.is_empty() {
        prompt.insert("contexts".into(), agent.contexts.to_json());
    }

    let mut ai = Map::new();
    ai.insert("prompt".into(), Value::Object(prompt));

    if let Some(post_prompt) = &agent.post_prompt {
        ai.insert("post_prompt".into(), json!({ "text": post_prompt }));
        let url = agent
            .post_prompt_url
            .clone()
            .unwrap_or_else(|| authed_url(config, base, "/post_prompt"));
        ai.insert("post_prompt_url".into(), json!(url));
    }

    if !agent.params.is_null() {
        ai.insert("params".into(), agent.params.clone());
    }

    let languages: Vec<Value> = agent.speech.languages.iter().map(|l| l.to_json()).collect();
    if !languages.is_empty() {
        ai.insert("languages".into(), json!(languages));
    }
    let hints = agent.speech.hints_json();
    if !hints.is_empty() {
        ai.insert("hints".into(), json!(hints));
    }
    let pronounce = agent.speech.pronounce_json();
    if !pronounce.is_empty() {
        ai.insert("pronounce".into(), json!(pronounce));
    }

    if !agent.global_data.is_null() {
        ai.insert("global_data".into(), agent.global_data.clone());
    }

    ai.insert(
        "SWAIG".into(),
        json!({
            "defaults": { "web_hook_url": authed_url(config, base, "/swaig") },
            "functions": agent.tools.swaig_functions(),
        }),
    );

    Value::Object(ai)
}
