//! Webhook request and response types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// SWAIG function call posted by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct SwaigRequest {
    /// Name of the function to run
    pub function: String,

    /// Arguments extracted by the AI
    #[serde(default)]
    pub argument: Option<SwaigArgument>,

    /// Call identifier
    #[serde(default)]
    pub call_id: Option<String>,

    /// Conversation-wide data set by earlier actions
    #[serde(default)]
    pub global_data: Option<Value>,
}

/// Function arguments, both parsed and as the raw JSON string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SwaigArgument {
    #[serde(default)]
    pub parsed: Vec<Value>,

    #[serde(default)]
    pub raw: Option<String>,
}

impl SwaigRequest {
    /// Arguments object: the first parsed entry, else the raw string decoded,
    /// else an empty object.
    pub fn args(&self) -> Value {
        let Some(argument) = &self.argument else {
            return json!({});
        };
        if let Some(first) = argument.parsed.first() {
            return first.clone();
        }
        argument
            .raw
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
            .filter(Value::is_object)
            .unwrap_or_else(|| json!({}))
    }
}

/// End-of-conversation summary posted by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct PostPromptRequest {
    #[serde(default)]
    pub post_prompt_data: Option<PostPromptData>,

    #[serde(default)]
    pub call_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostPromptData {
    /// Summary text as produced by the AI
    #[serde(default)]
    pub raw: Option<String>,

    /// Summary decoded as JSON, when the AI produced JSON
    #[serde(default)]
    pub parsed: Option<Value>,
}

impl PostPromptRequest {
    /// The summary, preferring the parsed form.
    pub fn summary(&self) -> Option<Value> {
        let data = self.post_prompt_data.as_ref()?;
        match (&data.parsed, &data.raw) {
            (Some(parsed), _) if !parsed.is_null() => Some(parsed.clone()),
            (_, Some(raw)) if !raw.trim().is_empty() => Some(json!(raw)),
            _ => None,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,

    /// Agent name
    pub agent: String,

    /// Number of registered tools
    pub tools: usize,
}

/// Error body returned by the webhook endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
