//! Declarative HTTP-backed tools.
//!
//! A [`DataMap`] describes a single webhook call (method, URL, headers and
//! query parameters with `${args.*}` placeholders) and how its JSON response is
//! turned into the spoken result. The platform executes these in production;
//! [`super::executor`] runs the same description locally.

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use super::template::{placeholders, Placeholder, Scope, TemplateError};

#[derive(Debug, Error)]
pub enum DataMapError {
    #[error("{tool}: webhook is not configured")]
    MissingWebhook { tool: String },

    #[error("{tool}: parameter `{name}` declared more than once")]
    DuplicateParameter { tool: String, name: String },

    #[error("{tool}: `${{{placeholder}}}` in {location} references undeclared parameter `{name}`")]
    UndeclaredArgument {
        tool: String,
        location: &'static str,
        placeholder: String,
        name: String,
    },

    #[error("{tool}: `${{{placeholder}}}` is not available in {location}")]
    ScopeNotAllowed {
        tool: String,
        location: &'static str,
        placeholder: String,
    },

    #[error("{tool}: `${{{placeholder}}}` does not match foreach output key")]
    UnknownForeachKey { tool: String, placeholder: String },

    #[error("{tool}: {location}: {source}")]
    Template {
        tool: String,
        location: &'static str,
        #[source]
        source: TemplateError,
    },
}

/// A typed tool parameter.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    #[serde(skip)]
    pub required: bool,
}

/// Build a JSON-schema object from an ordered parameter list.
pub fn parameters_schema(params: &[ToolParameter]) -> Value {
    let mut properties = Map::new();
    for p in params {
        properties.insert(
            p.name.clone(),
            json!({ "type": p.param_type, "description": p.description }),
        );
    }
    let required: Vec<&str> = params
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name.as_str())
        .collect();

    let mut schema = json!({ "type": "object", "properties": properties });
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

/// Iterate over an array in the response, appending one rendered line per item.
#[derive(Debug, Clone, Serialize)]
pub struct Foreach {
    pub input_key: String,
    pub output_key: String,
    pub max: usize,
    pub append: String,
}

/// The HTTP request template of a DataMap.
#[derive(Debug, Clone)]
pub struct Webhook {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, Value)>,
    pub foreach: Option<Foreach>,
    pub output: Option<String>,
}

impl Webhook {
    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("url".into(), json!(self.url));
        obj.insert("method".into(), json!(self.method));
        if !self.headers.is_empty() {
            let headers: Map<String, Value> = self
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), json!(v)))
                .collect();
            obj.insert("headers".into(), Value::Object(headers));
        }
        if !self.params.is_empty() {
            let params: Map<String, Value> = self.params.iter().cloned().collect();
            obj.insert("params".into(), Value::Object(params));
        }
        if let Some(foreach) = &self.foreach {
            obj.insert("foreach".into(), json!(foreach));
        }
        if let Some(output) = &self.output {
            obj.insert("output".into(), json!({ "response": output }));
        }
        Value::Object(obj)
    }
}

/// A declarative webhook-backed SWAIG function.
#[derive(Debug, Clone)]
pub struct DataMap {
    pub name: String,
    pub purpose: String,
    pub parameters: Vec<ToolParameter>,
    pub webhook: Option<Webhook>,
    /// Spoken when the webhook fails
    pub fallback_output: Option<String>,
}

impl DataMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            purpose: String::new(),
            parameters: Vec::new(),
            webhook: None,
            fallback_output: None,
        }
    }

    pub fn purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = purpose.into();
        self
    }

    pub fn parameter(
        mut self,
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.parameters.push(ToolParameter {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required,
        });
        self
    }

    pub fn webhook(mut self, method: &str, url: impl Into<String>, headers: &[(&str, &str)]) -> Self {
        self.webhook = Some(Webhook {
            method: method.to_uppercase(),
            url: url.into(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            params: Vec::new(),
            foreach: None,
            output: None,
        });
        self
    }

    /// Query parameters of the webhook, in the order they are sent.
    pub fn params<I, K>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        if let Some(webhook) = self.webhook.as_mut() {
            webhook
                .params
                .extend(params.into_iter().map(|(k, v)| (k.into(), v)));
        }
        self
    }

    pub fn foreach(mut self, foreach: Foreach) -> Self {
        if let Some(webhook) = self.webhook.as_mut() {
            webhook.foreach = Some(foreach);
        }
        self
    }

    pub fn output(mut self, response: impl Into<String>) -> Self {
        if let Some(webhook) = self.webhook.as_mut() {
            webhook.output = Some(response.into());
        }
        self
    }

    pub fn fallback_output(mut self, response: impl Into<String>) -> Self {
        self.fallback_output = Some(response.into());
        self
    }

    pub fn parameters_schema(&self) -> Value {
        parameters_schema(&self.parameters)
    }

    /// The SWAIG function declaration, including the `data_map` block.
    pub fn to_swaig_function(&self) -> Value {
        let mut data_map = Map::new();
        if let Some(webhook) = &self.webhook {
            data_map.insert("webhooks".into(), json!([webhook.to_json()]));
        }
        if let Some(fallback) = &self.fallback_output {
            data_map.insert("output".into(), json!({ "response": fallback }));
        }
        json!({
            "function": self.name,
            "description": self.purpose,
            "parameters": self.parameters_schema(),
            "data_map": data_map,
        })
    }

    /// Check that every placeholder is resolvable where it is used.
    pub fn validate(&self) -> Result<(), DataMapError> {
        let mut seen = std::collections::HashSet::new();
        for p in &self.parameters {
            if !seen.insert(p.name.as_str()) {
                return Err(DataMapError::DuplicateParameter {
                    tool: self.name.clone(),
                    name: p.name.clone(),
                });
            }
        }

        let webhook = self.webhook.as_ref().ok_or_else(|| DataMapError::MissingWebhook {
            tool: self.name.clone(),
        })?;

        let request_scopes = [Scope::Args, Scope::GlobalData];
        self.check("webhook url", &webhook.url, &request_scopes, None)?;
        for (_, value) in &webhook.headers {
            self.check("webhook headers", value, &request_scopes, None)?;
        }
        for (_, value) in &webhook.params {
            if let Value::String(s) = value {
                self.check("webhook params", s, &request_scopes, None)?;
            }
        }

        let foreach_key = webhook.foreach.as_ref().map(|f| f.output_key.as_str());
        if let Some(foreach) = &webhook.foreach {
            self.check(
                "foreach append",
                &foreach.append,
                &[Scope::Args, Scope::This, Scope::GlobalData],
                None,
            )?;
        }
        if let Some(output) = &webhook.output {
            self.check(
                "output",
                output,
                &[Scope::Args, Scope::Response, Scope::Foreach, Scope::GlobalData],
                foreach_key,
            )?;
        }
        if let Some(fallback) = &self.fallback_output {
            self.check("fallback output", fallback, &request_scopes, None)?;
        }
        Ok(())
    }

    fn check(
        &self,
        location: &'static str,
        template: &str,
        allowed: &[Scope],
        foreach_key: Option<&str>,
    ) -> Result<(), DataMapError> {
        let found = placeholders(template).map_err(|source| DataMapError::Template {
            tool: self.name.clone(),
            location,
            source,
        })?;
        for p in found {
            self.check_placeholder(location, &p, allowed, foreach_key)?;
        }
        Ok(())
    }

    fn check_placeholder(
        &self,
        location: &'static str,
        p: &Placeholder,
        allowed: &[Scope],
        foreach_key: Option<&str>,
    ) -> Result<(), DataMapError> {
        if !allowed.contains(&p.scope) {
            return Err(DataMapError::ScopeNotAllowed {
                tool: self.name.clone(),
                location,
                placeholder: p.raw.clone(),
            });
        }
        match p.scope {
            Scope::Args => {
                let declared = p
                    .root_key()
                    .is_some_and(|name| self.parameters.iter().any(|param| param.name == name));
                if !declared {
                    return Err(DataMapError::UndeclaredArgument {
                        tool: self.name.clone(),
                        location,
                        placeholder: p.raw.clone(),
                        name: p.root_key().unwrap_or_default().to_string(),
                    });
                }
            }
            Scope::Foreach => {
                if p.root_key().is_none() || p.root_key() != foreach_key {
                    return Err(DataMapError::UnknownForeachKey {
                        tool: self.name.clone(),
                        placeholder: p.raw.clone(),
                    });
                }
            }
            Scope::Response | Scope::This | Scope::GlobalData => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_tool() -> DataMap {
        DataMap::new("lookup")
            .purpose("Look something up")
            .parameter("term", "string", "What to look up", true)
            .parameter("limit", "number", "How many", false)
            .webhook("get", "https://api.example.com/items", &[("Accept", "application/json")])
            .params([
                ("q", json!("${args.term}")),
                ("limit", json!("${args.limit}")),
                ("number", json!(3)),
            ])
    }

    #[test]
    fn valid_map_passes() {
        let map = lookup_tool()
            .foreach(Foreach {
                input_key: "items".into(),
                output_key: "lines".into(),
                max: 2,
                append: "${this.name} ".into(),
            })
            .output("${foreach.lines} for ${args.term}")
            .fallback_output("Nothing for ${args.term}");
        map.validate().unwrap();
    }

    #[test]
    fn undeclared_argument_is_rejected() {
        let map = lookup_tool().output("${args.colour}");
        let err = map.validate().unwrap_err();
        assert!(matches!(
            err,
            DataMapError::UndeclaredArgument { ref name, location: "output", .. } if name == "colour"
        ));
    }

    #[test]
    fn response_in_request_is_rejected() {
        let map = lookup_tool().params([("page", json!("${response.next}"))]);
        assert!(matches!(
            map.validate().unwrap_err(),
            DataMapError::ScopeNotAllowed { location: "webhook params", .. }
        ));
    }

    #[test]
    fn this_outside_foreach_is_rejected() {
        let map = lookup_tool().output("${this.title}");
        assert!(matches!(
            map.validate().unwrap_err(),
            DataMapError::ScopeNotAllowed { location: "output", .. }
        ));
    }

    #[test]
    fn foreach_key_must_match() {
        let map = lookup_tool()
            .foreach(Foreach {
                input_key: "items".into(),
                output_key: "lines".into(),
                max: 2,
                append: "${this.name}".into(),
            })
            .output("${foreach.other}");
        assert!(matches!(
            map.validate().unwrap_err(),
            DataMapError::UnknownForeachKey { .. }
        ));
    }

    #[test]
    fn missing_webhook_and_duplicates() {
        let map = DataMap::new("empty");
        assert!(matches!(map.validate().unwrap_err(), DataMapError::MissingWebhook { .. }));

        let map = lookup_tool().parameter("term", "string", "again", false);
        assert!(matches!(
            map.validate().unwrap_err(),
            DataMapError::DuplicateParameter { .. }
        ));
    }

    #[test]
    fn serializes_swaig_declaration() {
        let map = lookup_tool().output("Found ${response.count}").fallback_output("Sorry");
        let decl = map.to_swaig_function();
        assert_eq!(decl["function"], "lookup");
        assert_eq!(decl["description"], "Look something up");
        assert_eq!(decl["parameters"]["required"], json!(["term"]));
        assert_eq!(decl["parameters"]["properties"]["limit"]["type"], "number");
        let webhook = &decl["data_map"]["webhooks"][0];
        assert_eq!(webhook["method"], "GET");
        assert_eq!(webhook["params"]["q"], "${args.term}");
        assert_eq!(webhook["params"]["number"], 3);
        assert_eq!(webhook["headers"]["Accept"], "application/json");
        assert_eq!(webhook["output"]["response"], "Found ${response.count}");
        assert_eq!(decl["data_map"]["output"]["response"], "Sorry");
    }
}
