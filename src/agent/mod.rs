//! Agent definition: persona, workflow, speech settings and tools.
//!
//! An [`AgentDefinition`] is built once at startup, validated, and then
//! rendered into SWML for every request. It never changes afterwards.

mod contexts;
mod prompt;
mod recipe;
mod speech;

use serde_json::Value;
use thiserror::Error;

use crate::skills::{Skill, SkillError};
use crate::tools::{RegistryError, ToolRegistry};

pub use contexts::{Context, ContextError, Contexts, Step};
pub use prompt::{build_persona_prompt, Prompt, PromptSection};
pub use recipe::{build_recipe_agent, AGENT_NAME};
pub use speech::{Language, PatternHint, Pronunciation, SpeechConfig};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Invalid conversation contexts: {0}")]
    Context(#[from] ContextError),

    #[error(transparent)]
    Skill(#[from] SkillError),

    #[error("Invalid speech pattern hint: {0}")]
    PatternHint(#[from] regex::Error),
}

/// Call recording settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub format: String,
    pub stereo: bool,
}

/// Everything the platform needs to run the agent.
pub struct AgentDefinition {
    pub name: String,
    pub auto_answer: bool,
    pub record_call: Option<Recording>,
    pub prompt: Prompt,
    /// Instructions for the end-of-call summary
    pub post_prompt: Option<String>,
    /// Explicit summary webhook; defaults to this server's `/post_prompt`
    pub post_prompt_url: Option<String>,
    pub contexts: Contexts,
    pub speech: SpeechConfig,
    /// AI engine parameters (model, timeouts, temperature, ...)
    pub params: Value,
    pub global_data: Value,
    pub skills: Vec<Skill>,
    pub tools: ToolRegistry,
}

impl AgentDefinition {
    /// Register a skill's tools and append its prompt section.
    ///
    /// Nothing is registered when any of the skill's tool names is taken.
    pub fn add_skill(&mut self, skill: Skill) -> Result<(), AgentError> {
        let tools = skill.tools();
        if let Some(taken) = tools.iter().find(|t| self.tools.contains(t.name())) {
            return Err(RegistryError::Duplicate(taken.name().to_string()).into());
        }
        for tool in tools {
            self.tools.register(tool)?;
        }
        self.prompt.add_section(skill.prompt_section());
        tracing::debug!("Added skill {}", skill.name());
        self.skills.push(skill);
        Ok(())
    }

    /// Check cross references between the workflow and the registered tools.
    pub fn validate(&self) -> Result<(), AgentError> {
        self.contexts.validate(|name| self.tools.contains(name))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::skills::CurrentDate;
    use crate::tools::DataMapExecutor;

    fn bare_agent() -> AgentDefinition {
        AgentDefinition {
            name: "test".to_string(),
            auto_answer: false,
            record_call: None,
            prompt: Prompt::new(),
            post_prompt: None,
            post_prompt_url: None,
            contexts: Contexts::new(),
            speech: SpeechConfig::default(),
            params: Value::Null,
            global_data: Value::Null,
            skills: Vec::new(),
            tools: ToolRegistry::new(DataMapExecutor::new().unwrap()),
        }
    }

    #[test]
    fn conflicting_skill_registers_nothing() {
        let mut agent = bare_agent();
        agent
            .tools
            .register(Arc::new(CurrentDate {
                timezone: chrono_tz::UTC,
            }))
            .unwrap();

        let skill = Skill::DateTime {
            timezone: chrono_tz::UTC,
            format: "%H:%M".to_string(),
        };
        let err = agent.add_skill(skill).unwrap_err();
        assert!(matches!(
            err,
            AgentError::Registry(RegistryError::Duplicate(ref name)) if name == "get_current_date"
        ));
        assert!(!agent.tools.contains("get_current_time"));
        assert_eq!(agent.tools.len(), 1);
        assert!(agent.skills.is_empty());
        assert!(agent.prompt.is_empty());
    }

    #[test]
    fn skill_adds_tools_and_prompt_section() {
        let mut agent = bare_agent();
        agent.add_skill(Skill::Math { precision: 2 }).unwrap();
        assert!(agent.tools.contains("calculate"));
        assert_eq!(agent.prompt.sections()[0].title, "Mathematical Calculations");
        assert_eq!(agent.skills.len(), 1);
    }
}
