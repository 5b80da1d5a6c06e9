//! Chat message records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::render::sanitize::strip_tags;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    /// The person typing into the input.
    You,
    /// The chatbot reply.
    Bot,
}

impl Sender {
    /// Label shown in front of the entry.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::You => "You",
            Self::Bot => "Bot",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Message body, tagged with how the renderer may treat it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "text", rename_all = "snake_case")]
pub enum Content {
    /// Literal text, always escaped on output.
    PlainText(String),
    /// HTML that is run through the allowlist sanitizer before output.
    SanitizedMarkup(String),
}

impl Content {
    /// The raw text as received.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::PlainText(text) | Self::SanitizedMarkup(text) => text,
        }
    }

    /// The text a reader sees once the entry is rendered.
    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            Self::PlainText(text) => text.clone(),
            Self::SanitizedMarkup(markup) => strip_tags(markup),
        }
    }

    /// Whether the body is interpreted as markup.
    #[must_use]
    pub fn is_markup(&self) -> bool {
        matches!(self, Self::SanitizedMarkup(_))
    }
}

/// A single transcript entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the entry.
    pub sender: Sender,
    /// Body of the entry.
    pub content: Content,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A user entry. User text is never interpreted as markup.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::You,
            content: Content::PlainText(text.into()),
            created_at: Utc::now(),
        }
    }

    /// A bot entry with the given content.
    #[must_use]
    pub fn bot(content: Content) -> Self {
        Self {
            sender: Sender::Bot,
            content,
            created_at: Utc::now(),
        }
    }

    /// `"{sender}: {text}"`, as the entry reads on screen.
    #[must_use]
    pub fn display_line(&self) -> String {
        format!("{}: {}", self.sender, self.content.display_text())
    }
}
