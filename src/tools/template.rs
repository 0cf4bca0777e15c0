//! `${scope.path}` placeholder parsing and rendering for DataMap templates.
//!
//! Paths are dot separated keys with optional `[n]` indices. A `[*]` wildcard
//! maps the rest of the path over every element of an array; the results are
//! joined with `, ` when rendered.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Malformed placeholder `${{{0}}}`")]
    Malformed(String),

    #[error("Unknown placeholder scope `{0}`")]
    UnknownScope(String),
}

/// Root object a placeholder resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Arguments supplied by the conversation
    Args,
    /// Parsed JSON body of the webhook response
    Response,
    /// Current element inside a foreach append template
    This,
    /// Strings accumulated by foreach blocks, keyed by output key
    Foreach,
    /// Agent global data
    GlobalData,
}

impl Scope {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "args" => Some(Self::Args),
            "response" => Some(Self::Response),
            "this" => Some(Self::This),
            "foreach" => Some(Self::Foreach),
            "global_data" => Some(Self::GlobalData),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
    Wildcard,
}

/// A parsed `${...}` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub scope: Scope,
    pub segments: Vec<Segment>,
    /// Text between the braces
    pub raw: String,
}

impl Placeholder {
    /// First key after the scope, e.g. `query` for `${args.query}`.
    pub fn root_key(&self) -> Option<&str> {
        match self.segments.first() {
            Some(Segment::Key(k)) => Some(k),
            _ => None,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let malformed = || TemplateError::Malformed(raw.to_string());
        let mut parts = raw.split('.');
        let scope_name = parts.next().ok_or_else(malformed)?;
        let scope =
            Scope::parse(scope_name).ok_or_else(|| TemplateError::UnknownScope(scope_name.to_string()))?;

        let mut segments = Vec::new();
        for part in parts {
            let (name, mut rest) = match part.find('[') {
                Some(i) => (&part[..i], &part[i..]),
                None => (part, ""),
            };
            if name.is_empty() && rest.is_empty() {
                return Err(malformed());
            }
            if !name.is_empty() {
                segments.push(Segment::Key(name.to_string()));
            }
            while !rest.is_empty() {
                let close = rest.find(']').ok_or_else(malformed)?;
                if !rest.starts_with('[') {
                    return Err(malformed());
                }
                let inner = &rest[1..close];
                if inner == "*" {
                    segments.push(Segment::Wildcard);
                } else {
                    segments.push(Segment::Index(inner.parse().map_err(|_| malformed())?));
                }
                rest = &rest[close + 1..];
            }
        }

        Ok(Self {
            scope,
            segments,
            raw: raw.to_string(),
        })
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]*)\}").expect("placeholder regex"))
}

/// All placeholders referenced by a template, in order of appearance.
pub fn placeholders(template: &str) -> Result<Vec<Placeholder>, TemplateError> {
    placeholder_regex()
        .captures_iter(template)
        .map(|c| Placeholder::parse(&c[1]))
        .collect()
}

/// Values placeholders resolve against. Absent scopes behave as `null`.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    pub args: Value,
    pub response: Value,
    pub this: Value,
    pub foreach: Value,
    pub global_data: Value,
}

impl TemplateContext {
    pub fn with_args(args: Value) -> Self {
        Self {
            args,
            ..Default::default()
        }
    }

    fn root(&self, scope: Scope) -> &Value {
        match scope {
            Scope::Args => &self.args,
            Scope::Response => &self.response,
            Scope::This => &self.this,
            Scope::Foreach => &self.foreach,
            Scope::GlobalData => &self.global_data,
        }
    }

    /// Resolve a placeholder to a JSON value, `None` when the path is missing.
    pub fn lookup(&self, placeholder: &Placeholder) -> Option<Value> {
        resolve(self.root(placeholder.scope), &placeholder.segments)
    }
}

fn resolve(value: &Value, segments: &[Segment]) -> Option<Value> {
    let Some((first, rest)) = segments.split_first() else {
        return Some(value.clone());
    };
    match first {
        Segment::Key(k) => resolve(value.get(k.as_str())?, rest),
        Segment::Index(i) => resolve(value.get(*i)?, rest),
        Segment::Wildcard => {
            let items = value.as_array()?;
            Some(Value::Array(
                items.iter().filter_map(|item| resolve(item, rest)).collect(),
            ))
        }
    }
}

/// Convert a resolved value into the text spliced into a template.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(stringify)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Substitute every placeholder in `template`.
///
/// Missing values render as the empty string; malformed placeholders are left
/// untouched (templates are validated when tools are registered).
pub fn render(template: &str, ctx: &TemplateContext) -> String {
    render_with(template, ctx, |s| s)
}

/// Like [`render`], passing each substituted value through `transform`
/// (used to URL-encode path segments).
pub fn render_with<F>(template: &str, ctx: &TemplateContext, transform: F) -> String
where
    F: Fn(String) -> String,
{
    placeholder_regex()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            match Placeholder::parse(&caps[1]) {
                Ok(p) => transform(ctx.lookup(&p).map(|v| stringify(&v)).unwrap_or_default()),
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}
