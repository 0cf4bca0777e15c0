//! Reusable skills: bundles of tools plus the prompt section describing them.

use std::sync::Arc;

use chrono_tz::Tz;
use serde_json::Value;
use thiserror::Error;

use crate::agent::PromptSection;
use crate::tools::Tool;

pub mod datetime;
pub mod math;

pub use datetime::{CurrentDate, CurrentTime};
pub use math::Calculate;

#[derive(Debug, Error)]
pub enum SkillError {
    #[error("Unknown skill: {0}")]
    Unknown(String),

    #[error("Invalid parameter `{param}` for skill {skill}: {reason}")]
    InvalidParam {
        skill: &'static str,
        param: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Skill {
    DateTime { timezone: Tz, format: String },
    Math { precision: usize },
}

impl Skill {
    /// Build a skill from its name and JSON parameters.
    ///
    /// `datetime` accepts `timezone` (IANA name, default `UTC`) and `format`
    /// (strftime, default `%I:%M %p`); `math` accepts `precision` (default 2).
    pub fn from_config(name: &str, params: &Value) -> Result<Self, SkillError> {
        match name {
            "datetime" => {
                let timezone = match params["timezone"].as_str() {
                    Some(tz) => tz.parse::<Tz>().map_err(|e| SkillError::InvalidParam {
                        skill: "datetime",
                        param: "timezone",
                        reason: e.to_string(),
                    })?,
                    None => chrono_tz::UTC,
                };
                let format = params["format"].as_str().unwrap_or("%I:%M %p").to_string();
                Ok(Self::DateTime { timezone, format })
            }
            "math" => {
                let precision = match &params["precision"] {
                    Value::Null => 2,
                    v => v.as_u64().filter(|p| *p <= 10).ok_or_else(|| SkillError::InvalidParam {
                        skill: "math",
                        param: "precision",
                        reason: format!("expected an integer between 0 and 10, got {}", v),
                    })? as usize,
                };
                Ok(Self::Math { precision })
            }
            other => Err(SkillError::Unknown(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DateTime { .. } => "datetime",
            Self::Math { .. } => "math",
        }
    }

    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        match self {
            Self::DateTime { timezone, format } => vec![
                Arc::new(CurrentTime {
                    timezone: *timezone,
                    format: format.clone(),
                }) as Arc<dyn Tool>,
                Arc::new(CurrentDate {
                    timezone: *timezone,
                }),
            ],
            Self::Math { precision } => vec![Arc::new(Calculate {
                precision: *precision,
            }) as Arc<dyn Tool>],
        }
    }

    /// Prompt section telling the agent how to use the skill.
    pub fn prompt_section(&self) -> PromptSection {
        match self {
            Self::DateTime { timezone, .. } => PromptSection::new("Date and Time Information")
                .body("You can look up the current date and time when planning cooking.")
                .bullets([
                    format!("Use get_current_time for the time (default timezone {})", timezone.name()),
                    "Use get_current_date for today's date".to_string(),
                ]),
            Self::Math { .. } => PromptSection::new("Mathematical Calculations")
                .body("Use the calculate function to scale recipes and convert measurements.")
                .bullets(["Never do arithmetic in your head when calculate is available"]),
        }
    }
}
