//! SWAIG function results: spoken response plus ordered platform actions.

use serde::Serialize;
use serde_json::{json, Value};

/// What a tool hands back to the conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FunctionResult {
    /// Text the agent speaks or reasons over
    pub response: String,

    /// Actions applied by the platform, in order
    #[serde(rename = "action", skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Value>,
}

impl FunctionResult {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            actions: Vec::new(),
        }
    }

    /// Merge keys into the conversation's global data.
    pub fn update_global_data(self, data: Value) -> Self {
        self.add_action("set_global_data", data)
    }

    /// Attach metadata scoped to this function.
    pub fn set_metadata(self, data: Value) -> Self {
        self.add_action("set_meta_data", data)
    }

    pub fn add_action(mut self, name: &str, data: Value) -> Self {
        self.actions.push(json!({ name: data }));
        self
    }

    /// Look up the payload of the first action with this name.
    pub fn action(&self, name: &str) -> Option<&Value> {
        self.actions.iter().find_map(|a| a.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_actions_in_order() {
        let result = FunctionResult::new("Timer set")
            .add_action("wait_seconds", json!(300))
            .update_global_data(json!({"active_timer": {"name": "pasta"}}))
            .set_metadata(json!({"saved": true}));

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "response": "Timer set",
                "action": [
                    {"wait_seconds": 300},
                    {"set_global_data": {"active_timer": {"name": "pasta"}}},
                    {"set_meta_data": {"saved": true}}
                ]
            })
        );
        assert_eq!(result.action("wait_seconds"), Some(&json!(300)));
    }

    #[test]
    fn omits_empty_actions() {
        let value = serde_json::to_value(FunctionResult::new("hi")).unwrap();
        assert_eq!(value, json!({"response": "hi"}));
    }
}
