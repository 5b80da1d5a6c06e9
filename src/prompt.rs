//! Prompt templates.
//!
//! A [`Prompt`] is a template with `{name}` placeholders plus a role. Values
//! are substituted in a single pass, so braces inside a value are never
//! expanded again. Placeholders without a value are left as written.

use std::collections::HashMap;

use crate::llm::{ChatMessage, MessageRole};

/// A role-tagged template with named variables.
#[derive(Debug, Clone)]
pub struct Prompt {
    template: String,
    role: MessageRole,
    variables: HashMap<String, String>,
}

impl Prompt {
    /// Create a prompt from a template and the role it is sent as.
    #[must_use]
    pub fn new(template: impl Into<String>, role: MessageRole) -> Self {
        Self {
            template: template.into(),
            role,
            variables: HashMap::new(),
        }
    }

    /// Bind `name` to `value`.
    #[must_use]
    pub fn add_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Template with all bound variables substituted.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let bound = after
                .find('}')
                .and_then(|close| self.variables.get(&after[..close]).map(|v| (v, close)));

            if let Some((value, close)) = bound {
                out.push_str(value);
                rest = &after[close + 1..];
            } else {
                out.push('{');
                rest = after;
            }
        }
        out.push_str(rest);
        out
    }

    /// Render into a chat message.
    #[must_use]
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.render(),
        }
    }
}
