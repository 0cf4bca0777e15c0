//! Chef Auguste: the recipe agent assembled from its parts.

use std::sync::Arc;

use serde_json::json;

use super::contexts::{Context, Contexts, Step};
use super::prompt::build_persona_prompt;
use super::speech::{Language, SpeechConfig};
use super::{AgentDefinition, AgentError, Recording};
use crate::config::Config;
use crate::skills::Skill;
use crate::tools::{
    recipe_tools, CookingEncouragement, CookingTimer, DataMapExecutor, SaveUserPreferences,
    ToolRegistry,
};

pub const AGENT_NAME: &str = "advanced-recipe-agent";

const POST_PROMPT: &str = "Summarize the conversation as JSON with the keys \
    \"recipes_discussed\" (list of recipe names), \"dietary_restrictions\" (string), \
    \"skill_level\" (string) and \"outcome\" (one sentence).";

/// Build and validate the recipe agent.
pub fn build_recipe_agent(
    config: &Config,
    executor: DataMapExecutor,
) -> Result<AgentDefinition, AgentError> {
    let mut tools = ToolRegistry::new(executor);
    for map in recipe_tools(config) {
        tools.register_data_map(map)?;
    }
    tools.register(Arc::new(SaveUserPreferences))?;
    tools.register(Arc::new(CookingTimer))?;
    tools.register(Arc::new(CookingEncouragement))?;

    let mut agent = AgentDefinition {
        name: AGENT_NAME.to_string(),
        auto_answer: true,
        record_call: Some(Recording {
            format: "mp3".to_string(),
            stereo: true,
        }),
        prompt: build_persona_prompt(),
        post_prompt: Some(POST_PROMPT.to_string()),
        post_prompt_url: config.post_prompt_url.clone(),
        contexts: conversation_contexts(),
        speech: speech_config()?,
        params: json!({
            "ai_model": "gpt-4.1-nano",
            "end_of_speech_timeout": 1200,
            "attention_timeout": 45000,
            "temperature": 0.8,
            "max_tokens": 200
        }),
        global_data: json!({
            "agent_version": "2.0.0",
            "cuisine_specialties": ["Italian", "French", "Asian", "Mediterranean", "American"],
            "dietary_options": ["vegetarian", "vegan", "gluten-free", "dairy-free", "keto", "paleo"],
            "skill_levels": ["beginner", "intermediate", "advanced"],
            "default_servings": 4,
            "support_contact": "For additional help, say 'transfer to support'"
        }),
        skills: Vec::new(),
        tools,
    };

    agent.add_skill(Skill::from_config(
        "datetime",
        &json!({ "timezone": "America/New_York", "format": "%I:%M %p" }),
    )?)?;
    agent.add_skill(Skill::from_config("math", &json!({ "precision": 2 }))?)?;

    agent.validate()?;
    tracing::info!("Built agent {} with {} tools", agent.name, agent.tools.len());
    Ok(agent)
}

/// Greeting → recipe discovery → cooking guidance.
fn conversation_contexts() -> Contexts {
    let greeting = Context::new("greeting")
        .step(
            Step::new("welcome")
                .text(
                    "Hello! I'm Chef Auguste, your personal culinary assistant. \
                     I'm here to help you discover delicious recipes and guide you \
                     through cooking. What brings you to the kitchen today?",
                )
                .criteria("User has indicated what type of cooking help they need")
                .functions(["save_user_preferences", "search_recipes_by_criteria"])
                .valid_steps(["preferences"]),
        )
        .step(
            Step::new("preferences")
                .section("Current Task", "Gather dietary preferences and restrictions")
                .bullets(
                    "Key Information",
                    [
                        "Food allergies or restrictions",
                        "Cuisine preferences",
                        "Cooking skill level",
                        "Available cooking time",
                    ],
                )
                .functions(["save_user_preferences", "search_recipes_by_criteria"])
                .criteria("Preferences gathered and recipe search initiated")
                .valid_contexts(["recipe_discovery"]),
        );

    let discovery = Context::new("recipe_discovery")
        .step(
            Step::new("search")
                .text("Let me search for recipes that match your preferences.")
                .functions([
                    "search_recipes_by_criteria",
                    "get_recipe_details",
                    "substitute_ingredient",
                ])
                .criteria("Recipe options presented to user")
                .valid_steps(["selection"]),
        )
        .step(
            Step::new("selection")
                .section("Current Task", "Help user choose the perfect recipe")
                .bullets(
                    "Considerations",
                    [
                        "Cooking time available",
                        "Ingredient availability",
                        "Skill level match",
                        "Dietary compatibility",
                    ],
                )
                .functions(["get_recipe_details", "substitute_ingredient", "calculate"])
                .criteria("User has selected a recipe to cook")
                .valid_contexts(["cooking_guidance"]),
        );

    let cooking = Context::new("cooking_guidance")
        .step(
            Step::new("preparation")
                .text("Perfect choice! Let's start by preparing everything you'll need.")
                .functions([
                    "get_recipe_details",
                    "substitute_ingredient",
                    "calculate",
                    "provide_cooking_encouragement",
                ])
                .criteria("User has gathered ingredients and tools")
                .valid_steps(["cooking"]),
        )
        .step(
            Step::new("cooking")
                .section("Guidance Mode", "Provide step-by-step cooking instructions")
                .bullets(
                    "Coaching Style",
                    [
                        "Break complex steps into simple actions",
                        "Provide timing cues and checkpoints",
                        "Encourage and reassure throughout process",
                        "Offer troubleshooting for common issues",
                    ],
                )
                .functions([
                    "get_cooking_timer",
                    "provide_cooking_encouragement",
                    "substitute_ingredient",
                    "get_current_time",
                ])
                .criteria("Cooking process completed successfully"),
        );

    Contexts::new().add(greeting).add(discovery).add(cooking)
}

/// Voice, culinary vocabulary and pronunciation.
fn speech_config() -> Result<SpeechConfig, regex::Error> {
    let mut speech = SpeechConfig::default();
    speech.add_language(Language {
        name: "British English".to_string(),
        code: "en-GB".to_string(),
        voice: "spore".to_string(),
        engine: Some("rime".to_string()),
        model: Some("multilingual".to_string()),
        speech_fillers: vec![
            "Let me find that recipe for you...".to_string(),
            "Searching our culinary database...".to_string(),
            "One moment while I check the ingredients...".to_string(),
            "Looking up cooking techniques...".to_string(),
        ],
        function_fillers: vec![
            "Checking our recipe collection...".to_string(),
            "Finding ingredient substitutions...".to_string(),
            "Calculating cooking times...".to_string(),
        ],
    });

    speech.add_hints([
        "sauté",
        "julienne",
        "brunoise",
        "mise en place",
        "al dente",
        "roux",
        "emulsion",
        "caramelize",
        "braise",
        "poach",
        "tablespoon",
        "teaspoon",
        "cup",
        "ounce",
        "pound",
        "Fahrenheit",
        "Celsius",
        "degrees",
        "minutes",
        "hours",
        "gluten-free",
        "dairy-free",
        "vegan",
        "vegetarian",
        "keto",
        "Italian",
        "French",
        "Asian",
        "Mexican",
        "Mediterranean",
    ]);

    speech.add_pattern_hint(
        "measurement",
        r"(\d+)\s*(cup|cups|tablespoon|tablespoons|teaspoon|teaspoons)",
        r"\1 \2",
    )?;

    speech
        .add_pronunciation("quinoa", "KEEN-wah")
        .add_pronunciation("acai", "ah-sah-EE")
        .add_pronunciation("gyoza", "gee-OH-zah");

    Ok(speech)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> AgentDefinition {
        let config = Config::new("test-key".into(), "https://api.spoonacular.com".into());
        build_recipe_agent(&config, DataMapExecutor::new().unwrap()).unwrap()
    }

    #[test]
    fn registers_every_tool_once() {
        let names: Vec<String> = agent().tools.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "search_recipes_by_criteria",
                "get_recipe_details",
                "substitute_ingredient",
                "save_user_preferences",
                "get_cooking_timer",
                "provide_cooking_encouragement",
                "get_current_time",
                "get_current_date",
                "calculate",
            ]
        );
    }

    #[test]
    fn workflow_references_registered_tools() {
        let agent = agent();
        agent.validate().unwrap();
        for ctx in agent.contexts.iter() {
            for step in &ctx.steps {
                for f in &step.functions {
                    assert!(agent.tools.contains(f), "{}.{} -> {}", ctx.name, step.name, f);
                }
            }
        }
    }

    #[test]
    fn skills_extend_the_prompt() {
        let agent = agent();
        assert_eq!(agent.skills.len(), 2);
        assert!(agent.prompt.section("Role").is_some());
        assert!(agent.prompt.section("Date and Time Information").is_some());
        assert!(agent.prompt.section("Mathematical Calculations").is_some());
    }

    #[test]
    fn speech_settings_are_complete() {
        let speech = speech_config().unwrap();
        assert_eq!(speech.languages[0].voice_id(), "rime.spore:multilingual");
        assert_eq!(speech.hints.len(), 30);
        assert_eq!(speech.pattern_hints.len(), 1);
        assert_eq!(speech.pronunciations[0].with, "KEEN-wah");
    }

    #[test]
    fn duplicate_skill_is_rejected() {
        let mut agent = agent();
        let err = agent.add_skill(Skill::Math { precision: 1 }).unwrap_err();
        assert!(matches!(err, AgentError::Registry(_)));
    }
}
