//! SWAIG tools available to the agent.
//!
//! Two kinds of tools live in one registry:
//! - native tools implementing [`Tool`], answered by this process,
//! - [`DataMap`] tools, declarative webhooks executed by the platform (and by
//!   [`DataMapExecutor`] when run locally).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

pub mod datamap;
pub mod executor;
mod kitchen;
mod recipes;
pub mod result;
pub mod template;

pub use datamap::{DataMap, DataMapError, Foreach, ToolParameter};
pub use executor::{build_request, DataMapExecutor, ExecutorError, PreparedRequest};
pub use kitchen::{CookingEncouragement, CookingTimer, SaveUserPreferences};
pub use recipes::{recipe_details_tool, recipe_search_tool, recipe_tools, substitution_tool};
pub use result::FunctionResult;

/// Per-call information supplied by the platform.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub call_id: Option<String>,
    pub global_data: Value,
}

/// A tool answered by this process.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique function name exposed to the agent
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments
    fn parameters_schema(&self) -> Value;

    async fn execute(&self, args: Value, call: &CallContext) -> anyhow::Result<FunctionResult>;
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Tool `{0}` is already registered")]
    Duplicate(String),

    #[error("Invalid DataMap: {0}")]
    InvalidDataMap(#[from] DataMapError),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool `{tool}` failed: {message}")]
    Execution { tool: String, message: String },
}

enum ToolKind {
    Native(Arc<dyn Tool>),
    DataMap(DataMap),
}

/// Name and description of a registered tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub declarative: bool,
}

/// Ordered registry of every tool the agent exposes.
pub struct ToolRegistry {
    tools: Vec<(String, ToolKind)>,
    index: HashMap<String, usize>,
    executor: DataMapExecutor,
}

impl ToolRegistry {
    pub fn new(executor: DataMapExecutor) -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
            executor,
        }
    }

    fn insert(&mut self, name: String, kind: ToolKind) -> Result<(), RegistryError> {
        if self.index.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.index.insert(name.clone(), self.tools.len());
        self.tools.push((name, kind));
        Ok(())
    }

    /// Register a native tool.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        tracing::debug!("Registering tool {}", name);
        self.insert(name, ToolKind::Native(tool))
    }

    /// Validate and register a declarative webhook tool.
    pub fn register_data_map(&mut self, map: DataMap) -> Result<(), RegistryError> {
        map.validate()?;
        tracing::debug!("Registering DataMap tool {}", map.name);
        self.insert(map.name.clone(), ToolKind::DataMap(map))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// List all registered tools in registration order.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|(name, kind)| match kind {
                ToolKind::Native(t) => ToolInfo {
                    name: name.clone(),
                    description: t.description().to_string(),
                    declarative: false,
                },
                ToolKind::DataMap(m) => ToolInfo {
                    name: name.clone(),
                    description: m.purpose.clone(),
                    declarative: true,
                },
            })
            .collect()
    }

    /// SWAIG function declarations for the SWML document.
    pub fn swaig_functions(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|(name, kind)| match kind {
                ToolKind::Native(t) => json!({
                    "function": name,
                    "description": t.description(),
                    "parameters": t.parameters_schema(),
                }),
                ToolKind::DataMap(m) => m.to_swaig_function(),
            })
            .collect()
    }

    pub fn data_map(&self, name: &str) -> Option<&DataMap> {
        match self.index.get(name).map(|&i| &self.tools[i].1) {
            Some(ToolKind::DataMap(m)) => Some(m),
            _ => None,
        }
    }

    /// Execute a tool by name.
    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        call: &CallContext,
    ) -> Result<FunctionResult, RegistryError> {
        let kind = self
            .index
            .get(name)
            .map(|&i| &self.tools[i].1)
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))?;

        let args = if args.is_null() { json!({}) } else { args };

        let result = match kind {
            ToolKind::Native(tool) => tool.execute(args, call).await.map_err(|e| format!("{:#}", e)),
            ToolKind::DataMap(map) => self
                .executor
                .execute(map, &args)
                .await
                .map_err(|e| e.to_string()),
        };

        result.map_err(|message| RegistryError::Execution {
            tool: name.to_string(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Repeat the input"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }

        async fn execute(&self, args: Value, _call: &CallContext) -> anyhow::Result<FunctionResult> {
            let text = args["text"]
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("Missing 'text' argument"))?;
            Ok(FunctionResult::new(text))
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(DataMapExecutor::new().unwrap())
    }

    #[test]
    fn rejects_duplicate_names_across_kinds() {
        let mut tools = registry();
        tools.register(Arc::new(Echo)).unwrap();
        let clash = DataMap::new("echo")
            .webhook("GET", "https://example.com", &[])
            .output("x");
        assert!(matches!(
            tools.register_data_map(clash).unwrap_err(),
            RegistryError::Duplicate(ref n) if n == "echo"
        ));
        assert_eq!(tools.len(), 1);
    }

    #[test]
    fn invalid_data_map_is_not_registered() {
        let mut tools = registry();
        let bad = DataMap::new("bad")
            .webhook("GET", "https://example.com/${args.missing}", &[])
            .output("x");
        assert!(matches!(
            tools.register_data_map(bad).unwrap_err(),
            RegistryError::InvalidDataMap(_)
        ));
        assert!(!tools.contains("bad"));
    }

    #[test]
    fn declarations_keep_registration_order() {
        let mut tools = registry();
        tools
            .register_data_map(
                DataMap::new("first")
                    .purpose("First tool")
                    .webhook("GET", "https://example.com", &[])
                    .output("x"),
            )
            .unwrap();
        tools.register(Arc::new(Echo)).unwrap();

        let names: Vec<_> = tools.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["first", "echo"]);

        let decls = tools.swaig_functions();
        assert!(decls[0].get("data_map").is_some());
        assert_eq!(decls[1]["function"], "echo");
        assert_eq!(decls[1]["description"], "Repeat the input");
        assert!(tools.data_map("first").is_some());
        assert!(tools.data_map("echo").is_none());
    }

    #[tokio::test]
    async fn executes_native_tools_and_reports_failures() {
        let mut tools = registry();
        tools.register(Arc::new(Echo)).unwrap();
        let call = CallContext::default();

        let ok = tools.execute("echo", json!({"text": "hi"}), &call).await.unwrap();
        assert_eq!(ok.response, "hi");

        let err = tools.execute("echo", Value::Null, &call).await.unwrap_err();
        assert!(matches!(err, RegistryError::Execution { ref message, .. } if message.contains("text")));

        let err = tools.execute("nope", json!({}), &call).await.unwrap_err();
        assert!(matches!(err, RegistryError::UnknownTool(_)));
    }
}
