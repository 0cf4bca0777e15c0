//! Persona prompt for the agent, structured as titled sections (POM).

use serde::Serialize;
use serde_json::Value;

/// One titled block of the prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PromptSection {
    pub title: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub body: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bullets: Vec<String>,
}

impl PromptSection {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn bullets<I, S>(mut self, bullets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bullets.extend(bullets.into_iter().map(Into::into));
        self
    }

    /// Markdown rendering: `## Title`, body paragraph, `- bullet` lines.
    pub fn to_markdown(&self) -> String {
        let mut out = format!("## {}\n", self.title);
        if !self.body.is_empty() {
            out.push('\n');
            out.push_str(&self.body);
            out.push('\n');
        }
        if !self.bullets.is_empty() {
            out.push('\n');
            for bullet in &self.bullets {
                out.push_str("- ");
                out.push_str(bullet);
                out.push('\n');
            }
        }
        out
    }
}

/// An ordered list of prompt sections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prompt {
    sections: Vec<PromptSection>,
}

impl Prompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_section(&mut self, section: PromptSection) -> &mut Self {
        self.sections.push(section);
        self
    }

    pub fn sections(&self) -> &[PromptSection] {
        &self.sections
    }

    pub fn section(&self, title: &str) -> Option<&PromptSection> {
        self.sections.iter().find(|s| s.title == title)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// POM representation embedded in SWML.
    pub fn to_pom(&self) -> Value {
        serde_json::to_value(&self.sections).unwrap_or(Value::Null)
    }

    pub fn to_markdown(&self) -> String {
        self.sections
            .iter()
            .map(PromptSection::to_markdown)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Build Chef Auguste's persona.
pub fn build_persona_prompt() -> Prompt {
    let mut prompt = Prompt::new();
    prompt
        .add_section(PromptSection::new("Role").body(
            "You are Chef Auguste, an experienced culinary assistant with expertise in \
             international cuisines, dietary accommodations, and cooking techniques. \
             You speak with warmth and enthusiasm about food while being practical and helpful.",
        ))
        .add_section(PromptSection::new("Context").body(
            "Users call seeking cooking help - from finding recipes to step-by-step \
             cooking guidance. You can access recipe databases, suggest substitutions, \
             and provide personalized recommendations based on dietary needs.",
        ))
        .add_section(PromptSection::new("Communication Style").bullets([
            "Use encouraging, friendly language that builds cooking confidence",
            "Break complex recipes into manageable voice-friendly steps",
            "Always ask about dietary restrictions and allergies for safety",
            "Provide timing estimates that work well for voice-guided cooking",
            "Suggest modifications for different skill levels",
        ]))
        .add_section(
            PromptSection::new("Safety Guidelines")
                .body("Always prioritize food safety and allergen awareness")
                .bullets([
                    "Ask about food allergies before suggesting recipes",
                    "Mention food safety temperatures when relevant",
                    "Warn about common allergens in ingredients",
                    "Suggest safe ingredient substitutions when needed",
                ]),
        );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn persona_mentions_allergies_and_food_safety() {
        let prompt = build_persona_prompt();
        assert!(!prompt.is_empty());
        let text = prompt.to_markdown().to_lowercase();
        assert!(text.contains("chef auguste"));
        assert!(text.contains("allergies"));
        assert!(text.contains("allergen"));
        assert!(text.contains("food safety"));

        let safety = prompt.section("Safety Guidelines").unwrap();
        assert_eq!(safety.bullets.len(), 4);
        assert!(safety.bullets[0].contains("food allergies"));
    }

    #[test]
    fn pom_omits_empty_fields() {
        let mut prompt = Prompt::new();
        prompt
            .add_section(PromptSection::new("Only Body").body("text"))
            .add_section(PromptSection::new("Only Bullets").bullets(["a", "b"]));
        assert_eq!(
            prompt.to_pom(),
            json!([
                {"title": "Only Body", "body": "text"},
                {"title": "Only Bullets", "bullets": ["a", "b"]}
            ])
        );
    }

    #[test]
    fn markdown_layout() {
        let section = PromptSection::new("Safety")
            .body("Be careful")
            .bullets(["Wash hands"]);
        assert_eq!(section.to_markdown(), "## Safety\n\nBe careful\n\n- Wash hands\n");
    }
}
