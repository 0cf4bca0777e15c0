//! Native kitchen helpers: preferences, timers and encouragement.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde_json::{json, Value};

use super::{CallContext, FunctionResult, Tool};

/// Save dietary preferences and cooking style into global data.
pub struct SaveUserPreferences;

#[async_trait]
impl Tool for SaveUserPreferences {
    fn name(&self) -> &str {
        "save_user_preferences"
    }

    fn description(&self) -> &str {
        "Save user's dietary preferences and cooking style for future reference"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "dietary_restrictions": {
                    "type": "string",
                    "description": "Dietary restrictions or allergies"
                },
                "cuisine_preferences": {
                    "type": "string",
                    "description": "Preferred cuisine types"
                },
                "skill_level": {
                    "type": "string",
                    "description": "Cooking skill level (beginner, intermediate, advanced)"
                },
                "cooking_time_preference": {
                    "type": "string",
                    "description": "Preferred cooking time (quick, moderate, leisurely)"
                }
            }
        })
    }

    async fn execute(&self, args: Value, call: &CallContext) -> anyhow::Result<FunctionResult> {
        let field = |key: &str, default: &str| {
            args[key].as_str().unwrap_or(default).trim().to_string()
        };
        let dietary = field("dietary_restrictions", "");
        let cuisine = field("cuisine_preferences", "");
        let skill = field("skill_level", "intermediate");
        let time = field("cooking_time_preference", "moderate");

        let preferences = json!({
            "dietary_restrictions": dietary,
            "cuisine_preferences": cuisine,
            "skill_level": skill,
            "cooking_time_preference": time,
            "saved_at": chrono::Utc::now().to_rfc3339(),
        });

        tracing::info!(call_id = ?call.call_id, "Saved user preferences");

        let mut response = format!(
            "Perfect! I've noted that you prefer {} cuisine and consider yourself a {} cook. ",
            cuisine, skill
        );
        if !dietary.is_empty() {
            response.push_str(&format!(
                "I'll make sure to consider your {} needs. ",
                dietary
            ));
        }
        response.push_str("Now I can give you more personalized recipe suggestions!");

        Ok(FunctionResult::new(response)
            .update_global_data(json!({ "user_preferences": preferences }))
            .set_metadata(json!({ "preferences_saved": true })))
    }
}

/// Voice-friendly cooking timer.
pub struct CookingTimer;

/// Render minutes without a trailing `.0` for whole numbers.
fn format_minutes(minutes: f64) -> String {
    if minutes.fract() == 0.0 {
        format!("{}", minutes as i64)
    } else {
        format!("{}", minutes)
    }
}

#[async_trait]
impl Tool for CookingTimer {
    fn name(&self) -> &str {
        "get_cooking_timer"
    }

    fn description(&self) -> &str {
        "Set up cooking timers with voice-friendly alerts"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "duration_minutes": {
                    "type": "number",
                    "description": "Timer duration in minutes"
                },
                "timer_name": {
                    "type": "string",
                    "description": "What this timer is for (e.g., 'pasta cooking', 'oven preheating')"
                }
            },
            "required": ["duration_minutes"]
        })
    }

    async fn execute(&self, args: Value, _call: &CallContext) -> anyhow::Result<FunctionResult> {
        let duration = match &args["duration_minutes"] {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| anyhow::anyhow!("Missing 'duration_minutes' argument"))?;
        if !duration.is_finite() || duration < 0.0 {
            anyhow::bail!("Invalid 'duration_minutes': {}", duration);
        }
        let name = args["timer_name"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("cooking");

        let seconds = (duration * 60.0) as u64;
        let minutes = format_minutes(duration);

        let mut response = format!("Setting a {} minute timer for {}. ", minutes, name);
        if duration <= 5.0 {
            response.push_str("I'll check back with you soon!");
        } else if duration <= 15.0 {
            response.push_str(
                "I'll let you know when it's ready. Feel free to ask me other cooking questions while you wait!",
            );
        } else {
            response.push_str(
                "That gives us plenty of time. Would you like help with another part of the recipe?",
            );
        }

        Ok(FunctionResult::new(response)
            .add_action("wait_seconds", json!(seconds))
            .update_global_data(json!({
                "active_timer": {
                    "name": name,
                    "duration": duration,
                    "started_at": chrono::Utc::now().to_rfc3339(),
                }
            })))
    }
}

/// Encouragement lines per cooking stage.
const PREP_LINES: &[&str] = &[
    "Great job getting organized! Good prep work makes everything else easier.",
    "You're doing wonderfully. Taking time to prep properly is the mark of a great cook!",
];
const COOKING_LINES: &[&str] = &[
    "You're doing fantastic! Trust the process and your instincts.",
    "Looking good! Remember, cooking is about enjoying the journey as much as the destination.",
];
const FINISHING_LINES: &[&str] = &[
    "You're almost there! The final touches make all the difference.",
    "Excellent work! These last steps will make your dish truly special.",
];

fn encouragement_lines(stage: &str) -> &'static [&'static str] {
    match stage {
        "prep" => PREP_LINES,
        "finishing" => FINISHING_LINES,
        _ => COOKING_LINES,
    }
}

/// Contextual cooking encouragement.
pub struct CookingEncouragement;

#[async_trait]
impl Tool for CookingEncouragement {
    fn name(&self) -> &str {
        "provide_cooking_encouragement"
    }

    fn description(&self) -> &str {
        "Give encouraging cooking tips and motivation"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "cooking_stage": {
                    "type": "string",
                    "description": "Current stage of cooking (prep, cooking, finishing, etc.)"
                },
                "difficulty_level": {
                    "type": "string",
                    "description": "How challenging this step is"
                }
            }
        })
    }

    async fn execute(&self, args: Value, _call: &CallContext) -> anyhow::Result<FunctionResult> {
        let stage = args["cooking_stage"].as_str().unwrap_or("cooking");
        let difficulty = args["difficulty_level"].as_str().unwrap_or("moderate");

        let mut line = encouragement_lines(stage)
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(COOKING_LINES[0])
            .to_string();
        if difficulty == "challenging" {
            line.push_str(" Don't worry if it's not perfect - every chef learns by doing!");
        }
        Ok(FunctionResult::new(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn preferences_are_acknowledged_and_stored() {
        let result = SaveUserPreferences
            .execute(
                json!({"dietary_restrictions": "nut allergy", "cuisine_preferences": "Italian"}),
                &CallContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(
            result.response,
            "Perfect! I've noted that you prefer Italian cuisine and consider yourself a intermediate cook. \
             I'll make sure to consider your nut allergy needs. Now I can give you more personalized recipe suggestions!"
        );
        let prefs = &result.action("set_global_data").unwrap()["user_preferences"];
        assert_eq!(prefs["skill_level"], "intermediate");
        assert_eq!(prefs["cooking_time_preference"], "moderate");
        assert_eq!(result.action("set_meta_data"), Some(&json!({"preferences_saved": true})));
    }

    #[tokio::test]
    async fn preferences_without_restrictions_skip_the_safety_line() {
        let result = SaveUserPreferences
            .execute(json!({"skill_level": "beginner"}), &CallContext::default())
            .await
            .unwrap();
        assert!(!result.response.contains("make sure to consider"));
        assert!(result.response.contains("a beginner cook"));
    }

    #[tokio::test]
    async fn timer_message_depends_on_duration() {
        let call = CallContext::default();
        let short = CookingTimer
            .execute(json!({"duration_minutes": 3, "timer_name": "eggs"}), &call)
            .await
            .unwrap();
        assert_eq!(
            short.response,
            "Setting a 3 minute timer for eggs. I'll check back with you soon!"
        );
        assert_eq!(short.action("wait_seconds"), Some(&json!(180)));

        let medium = CookingTimer
            .execute(json!({"duration_minutes": 12.5}), &call)
            .await
            .unwrap();
        assert!(medium.response.starts_with("Setting a 12.5 minute timer for cooking. I'll let you know"));
        assert_eq!(medium.action("wait_seconds"), Some(&json!(750)));

        let long = CookingTimer
            .execute(json!({"duration_minutes": "40", "timer_name": "roast"}), &call)
            .await
            .unwrap();
        assert!(long.response.ends_with("Would you like help with another part of the recipe?"));
        assert_eq!(
            long.action("set_global_data").unwrap()["active_timer"]["name"],
            "roast"
        );
    }

    #[tokio::test]
    async fn timer_requires_duration() {
        let err = CookingTimer
            .execute(json!({"timer_name": "rice"}), &CallContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("duration_minutes"));
    }

    #[tokio::test]
    async fn encouragement_matches_stage() {
        let call = CallContext::default();
        let prep = CookingEncouragement
            .execute(json!({"cooking_stage": "prep"}), &call)
            .await
            .unwrap();
        assert!(PREP_LINES.contains(&prep.response.as_str()));

        let unknown = CookingEncouragement
            .execute(json!({"cooking_stage": "plating"}), &call)
            .await
            .unwrap();
        assert!(COOKING_LINES.contains(&unknown.response.as_str()));

        let hard = CookingEncouragement
            .execute(
                json!({"cooking_stage": "finishing", "difficulty_level": "challenging"}),
                &call,
            )
            .await
            .unwrap();
        assert!(hard.response.ends_with("every chef learns by doing!"));
        assert!(FINISHING_LINES.iter().any(|l| hard.response.starts_with(l)));
    }
}
