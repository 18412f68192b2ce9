//! Instruction templates interpolated with session state.
//!
//! `{key}` is replaced by the state value under `key` and fails if the key is
//! absent; `{key?}` renders as empty text instead. Strings are inserted
//! verbatim, other values as compact JSON. Braces that do not wrap an
//! identifier (such as JSON examples) are left untouched.

use crate::error::{RecallError, Result};
use crate::session::State;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)(\?)?\}").expect("placeholder pattern is valid")
    })
}

/// An agent instruction with state placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionTemplate {
    template: String,
}

impl InstructionTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Names of all placeholders, in order of appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        placeholder_pattern()
            .captures_iter(&self.template)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect()
    }

    /// Resolve placeholders against the current session state.
    pub fn render(&self, state: &State) -> Result<String> {
        let mut missing: Vec<String> = Vec::new();

        let rendered = placeholder_pattern().replace_all(&self.template, |caps: &Captures<'_>| {
            let key = &caps[1];
            let optional = caps.get(2).is_some();
            match state.get(key) {
                Some(value) => value_to_text(value),
                None if optional => String::new(),
                None => {
                    missing.push(key.to_string());
                    String::new()
                }
            }
        });

        if !missing.is_empty() {
            return Err(RecallError::Template(format!(
                "Missing state for placeholder(s): {}",
                missing.join(", ")
            )));
        }

        Ok(rendered.trim().to_string())
    }
}

impl From<&str> for InstructionTemplate {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for InstructionTemplate {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> State {
        let mut state = State::new();
        state.insert("user_name", "Afzal");
        state.insert("reminders", json!(["buy milk"]));
        state
    }

    #[test]
    fn test_render_template() {
        let template = InstructionTemplate::new("Name: {user_name}\nReminders: {reminders}");
        let rendered = template.render(&state()).unwrap();
        assert_eq!(rendered, "Name: Afzal\nReminders: [\"buy milk\"]");
    }

    #[test]
    fn test_missing_required_placeholder_fails() {
        let template = InstructionTemplate::new("Prefs: {user_preferences}");
        let err = template.render(&state()).unwrap_err();
        assert!(matches!(err, RecallError::Template(msg) if msg.contains("user_preferences")));
    }

    #[test]
    fn test_optional_placeholder_renders_empty() {
        let template = InstructionTemplate::new("Hi {user_name}.{nickname?}");
        assert_eq!(template.render(&state()).unwrap(), "Hi Afzal.");
    }

    #[test]
    fn test_json_braces_are_untouched() {
        let template = InstructionTemplate::new(r#"Reply as { "subject": "..." } for {user_name}"#);
        assert_eq!(
            template.render(&state()).unwrap(),
            r#"Reply as { "subject": "..." } for Afzal"#
        );
    }

    #[test]
    fn test_placeholders() {
        let template = InstructionTemplate::new("{user_name} {reminders} {extra?}");
        assert_eq!(template.placeholders(), vec!["user_name", "reminders", "extra"]);
    }
}
