//! Structured conversation workflow: named contexts made of ordered steps.
//!
//! Each step carries its own instructions, the criteria for completing it,
//! the functions the agent may call while in it, and where it may move next.

use std::collections::HashSet;

use serde_json::{json, Map, Value};
use thiserror::Error;

use super::prompt::PromptSection;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("Context name `{0}` is used more than once")]
    DuplicateContext(String),

    #[error("Context `{0}` has no steps")]
    EmptyContext(String),

    #[error("Step `{step}` appears more than once in context `{context}`")]
    DuplicateStep { context: String, step: String },

    #[error("Step `{context}.{step}` has no instructions")]
    MissingText { context: String, step: String },

    #[error("Step `{context}.{step}` sets both text and sections")]
    TextAndSections { context: String, step: String },

    #[error("Step `{context}.{step}` allows unregistered function `{function}`")]
    UnknownFunction {
        context: String,
        step: String,
        function: String,
    },

    #[error("Step `{context}.{step}` points to unknown step `{target}`")]
    UnknownStep {
        context: String,
        step: String,
        target: String,
    },

    #[error("Step `{context}.{step}` points to unknown context `{target}`")]
    UnknownContext {
        context: String,
        step: String,
        target: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Step {
    pub name: String,
    pub text: Option<String>,
    pub sections: Vec<PromptSection>,
    pub step_criteria: Option<String>,
    pub functions: Vec<String>,
    pub valid_steps: Vec<String>,
    pub valid_contexts: Vec<String>,
}

fn strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl Step {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn section(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        self.sections.push(PromptSection::new(title).body(body));
        self
    }

    pub fn bullets<I, S>(mut self, title: impl Into<String>, bullets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sections.push(PromptSection::new(title).bullets(bullets));
        self
    }

    pub fn criteria(mut self, criteria: impl Into<String>) -> Self {
        self.step_criteria = Some(criteria.into());
        self
    }

    pub fn functions<I, S>(mut self, functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.functions = strings(functions);
        self
    }

    pub fn valid_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_steps = strings(steps);
        self
    }

    pub fn valid_contexts<I, S>(mut self, contexts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_contexts = strings(contexts);
        self
    }

    /// Instructions as spoken to the model: raw text, or the sections as markdown.
    pub fn rendered_text(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => self
                .sections
                .iter()
                .map(PromptSection::to_markdown)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".into(), json!(self.name));
        obj.insert("text".into(), json!(self.rendered_text()));
        if let Some(criteria) = &self.step_criteria {
            obj.insert("step_criteria".into(), json!(criteria));
        }
        if !self.functions.is_empty() {
            obj.insert("functions".into(), json!(self.functions));
        }
        if !self.valid_steps.is_empty() {
            obj.insert("valid_steps".into(), json!(self.valid_steps));
        }
        if !self.valid_contexts.is_empty() {
            obj.insert("valid_contexts".into(), json!(self.valid_contexts));
        }
        Value::Object(obj)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }
}

/// All contexts of the agent, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contexts {
    contexts: Vec<Context>,
}

impl Contexts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, context: Context) -> Self {
        self.contexts.push(context);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Context> {
        self.contexts.iter()
    }

    /// Check names, transitions and that every allowed function is registered.
    pub fn validate<F>(&self, is_function: F) -> Result<(), ContextError>
    where
        F: Fn(&str) -> bool,
    {
        let mut context_names = HashSet::new();
        for ctx in &self.contexts {
            if !context_names.insert(ctx.name.as_str()) {
                return Err(ContextError::DuplicateContext(ctx.name.clone()));
            }
        }

        for ctx in &self.contexts {
            if ctx.steps.is_empty() {
                return Err(ContextError::EmptyContext(ctx.name.clone()));
            }
            let mut step_names = HashSet::new();
            for step in &ctx.steps {
                if !step_names.insert(step.name.as_str()) {
                    return Err(ContextError::DuplicateStep {
                        context: ctx.name.clone(),
                        step: step.name.clone(),
                    });
                }
            }

            for step in &ctx.steps {
                let (context, name) = (ctx.name.clone(), step.name.clone());
                match (&step.text, step.sections.is_empty()) {
                    (None, true) => return Err(ContextError::MissingText { context, step: name }),
                    (Some(_), false) => {
                        return Err(ContextError::TextAndSections { context, step: name })
                    }
                    _ => {}
                }
                if let Some(function) = step.functions.iter().find(|f| !is_function(f)) {
                    return Err(ContextError::UnknownFunction {
                        context,
                        step: name,
                        function: function.clone(),
                    });
                }
                if let Some(target) = step.valid_steps.iter().find(|s| !step_names.contains(s.as_str())) {
                    return Err(ContextError::UnknownStep {
                        context,
                        step: name,
                        target: target.clone(),
                    });
                }
                if let Some(target) = step
                    .valid_contexts
                    .iter()
                    .find(|c| !context_names.contains(c.as_str()))
                {
                    return Err(ContextError::UnknownContext {
                        context,
                        step: name,
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// JSON embedded under `prompt.contexts` in SWML.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .contexts
            .iter()
            .map(|ctx| {
                let steps: Vec<Value> = ctx.steps.iter().map(Step::to_json).collect();
                (ctx.name.clone(), json!({ "steps": steps }))
            })
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(name: &str) -> bool {
        matches!(name, "lookup" | "save")
    }

    fn sample() -> Contexts {
        Contexts::new()
            .add(
                Context::new("intro")
                    .step(
                        Step::new("hello")
                            .text("Say hello")
                            .criteria("Greeted")
                            .functions(["lookup"])
                            .valid_steps(["details"]),
                    )
                    .step(
                        Step::new("details")
                            .section("Current Task", "Collect details")
                            .bullets("Ask For", ["Allergies", "Time"])
                            .functions(["save"])
                            .valid_contexts(["outro"]),
                    ),
            )
            .add(Context::new("outro").step(Step::new("bye").text("Say goodbye")))
    }

    #[test]
    fn valid_workflow_passes() {
        sample().validate(known).unwrap();
    }

    #[test]
    fn unknown_function_is_reported() {
        let contexts = Contexts::new().add(
            Context::new("intro").step(Step::new("hello").text("Hi").functions(["gather_preferences"])),
        );
        assert_eq!(
            contexts.validate(known).unwrap_err(),
            ContextError::UnknownFunction {
                context: "intro".into(),
                step: "hello".into(),
                function: "gather_preferences".into(),
            }
        );
    }

    #[test]
    fn transitions_must_exist() {
        let contexts = Contexts::new()
            .add(Context::new("intro").step(Step::new("hello").text("Hi").valid_steps(["nowhere"])));
        assert!(matches!(
            contexts.validate(known).unwrap_err(),
            ContextError::UnknownStep { ref target, .. } if target == "nowhere"
        ));

        let contexts = Contexts::new()
            .add(Context::new("intro").step(Step::new("hello").text("Hi").valid_contexts(["cooking"])));
        assert!(matches!(
            contexts.validate(known).unwrap_err(),
            ContextError::UnknownContext { ref target, .. } if target == "cooking"
        ));
    }

    #[test]
    fn steps_need_exactly_one_kind_of_instructions() {
        let contexts = Contexts::new().add(Context::new("intro").step(Step::new("hello")));
        assert!(matches!(
            contexts.validate(known).unwrap_err(),
            ContextError::MissingText { .. }
        ));

        let contexts = Contexts::new()
            .add(Context::new("intro").step(Step::new("hello").text("Hi").section("A", "b")));
        assert!(matches!(
            contexts.validate(known).unwrap_err(),
            ContextError::TextAndSections { .. }
        ));
    }

    #[test]
    fn duplicates_and_empty_contexts() {
        let contexts = Contexts::new().add(Context::new("a"));
        assert_eq!(contexts.validate(known).unwrap_err(), ContextError::EmptyContext("a".into()));

        let contexts = Contexts::new()
            .add(Context::new("a").step(Step::new("s").text("x")))
            .add(Context::new("a").step(Step::new("s").text("x")));
        assert_eq!(
            contexts.validate(known).unwrap_err(),
            ContextError::DuplicateContext("a".into())
        );
    }

    #[test]
    fn serializes_sections_as_markdown_text() {
        let json = sample().to_json();
        let details = &json["intro"]["steps"][1];
        assert_eq!(details["name"], "details");
        assert_eq!(
            details["text"],
            "## Current Task\n\nCollect details\n\n## Ask For\n\n- Allergies\n- Time\n"
        );
        assert_eq!(details["valid_contexts"], json!(["outro"]));
        assert!(details.get("valid_steps").is_none());
        assert_eq!(json["intro"]["steps"][0]["step_criteria"], "Greeted");
    }
}
