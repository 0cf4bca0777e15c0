//! Voice, recognition hints and pronunciation rules.

use serde::Serialize;
use serde_json::{json, Value};

/// A spoken language with its TTS voice and filler phrases.
#[derive(Debug, Clone, PartialEq)]
pub struct Language {
    pub name: String,
    pub code: String,
    pub voice: String,
    pub engine: Option<String>,
    pub model: Option<String>,
    pub speech_fillers: Vec<String>,
    pub function_fillers: Vec<String>,
}

impl Language {
    /// Voice identifier in `engine.voice:model` form.
    pub fn voice_id(&self) -> String {
        let mut id = match &self.engine {
            Some(engine) => format!("{}.{}", engine, self.voice),
            None => self.voice.clone(),
        };
        if let Some(model) = &self.model {
            id.push(':');
            id.push_str(model);
        }
        id
    }

    pub fn to_json(&self) -> Value {
        let mut obj = json!({
            "name": self.name,
            "code": self.code,
            "voice": self.voice_id(),
        });
        if !self.speech_fillers.is_empty() {
            obj["speech_fillers"] = json!(self.speech_fillers);
        }
        if !self.function_fillers.is_empty() {
            obj["function_fillers"] = json!(self.function_fillers);
        }
        obj
    }
}

/// Regex-based recognition hint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternHint {
    pub hint: String,
    pub pattern: String,
    pub replace: String,
    pub ignore_case: bool,
}

/// Pronunciation override for the TTS engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pronunciation {
    pub replace: String,
    pub with: String,
    pub ignore_case: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeechConfig {
    pub languages: Vec<Language>,
    pub hints: Vec<String>,
    pub pattern_hints: Vec<PatternHint>,
    pub pronunciations: Vec<Pronunciation>,
}

impl SpeechConfig {
    pub fn add_language(&mut self, language: Language) -> &mut Self {
        self.languages.push(language);
        self
    }

    pub fn add_hints<I, S>(&mut self, hints: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints.extend(hints.into_iter().map(Into::into));
        self
    }

    /// Add a pattern hint. The pattern must be a valid regular expression.
    pub fn add_pattern_hint(
        &mut self,
        hint: &str,
        pattern: &str,
        replace: &str,
    ) -> Result<&mut Self, regex::Error> {
        regex::Regex::new(pattern)?;
        self.pattern_hints.push(PatternHint {
            hint: hint.to_string(),
            pattern: pattern.to_string(),
            replace: replace.to_string(),
            ignore_case: false,
        });
        Ok(self)
    }

    pub fn add_pronunciation(&mut self, replace: &str, with: &str) -> &mut Self {
        self.pronunciations.push(Pronunciation {
            replace: replace.to_string(),
            with: with.to_string(),
            ignore_case: false,
        });
        self
    }

    /// Word hints followed by pattern hints, as SWML expects them.
    pub fn hints_json(&self) -> Vec<Value> {
        self.hints
            .iter()
            .map(|h| json!(h))
            .chain(self.pattern_hints.iter().map(|p| json!(p)))
            .collect()
    }

    pub fn pronounce_json(&self) -> Vec<Value> {
        self.pronunciations.iter().map(|p| json!(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn british() -> Language {
        Language {
            name: "British English".into(),
            code: "en-GB".into(),
            voice: "spore".into(),
            engine: Some("rime".into()),
            model: Some("multilingual".into()),
            speech_fillers: vec!["One moment...".into()],
            function_fillers: vec![],
        }
    }

    #[test]
    fn voice_id_combines_engine_and_model() {
        assert_eq!(british().voice_id(), "rime.spore:multilingual");
        let plain = Language {
            engine: None,
            model: None,
            ..british()
        };
        assert_eq!(plain.voice_id(), "spore");
    }

    #[test]
    fn language_json_skips_empty_fillers() {
        let value = british().to_json();
        assert_eq!(value["speech_fillers"], json!(["One moment..."]));
        assert!(value.get("function_fillers").is_none());
    }

    #[test]
    fn pattern_hints_must_compile() {
        let mut speech = SpeechConfig::default();
        assert!(speech.add_pattern_hint("bad", "(unclosed", "").is_err());
        speech
            .add_pattern_hint("measurement", r"(\d+)\s*(cup|cups)", r"\1 \2")
            .unwrap();
        speech.add_hints(["roux"]);
        let hints = speech.hints_json();
        assert_eq!(hints[0], json!("roux"));
        assert_eq!(hints[1]["hint"], "measurement");
        assert_eq!(hints[1]["replace"], r"\1 \2");
    }
}
