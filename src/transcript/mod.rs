//! Append-only chat transcript.
//!
//! The transcript is the only data store of the chat layer; the HTML history
//! view is a projection of it. Entries are appended in turn order and are
//! never reordered or removed.
//!
//! # Example
//!
//! ```rust
//! use rug_sage::transcript::{Message, Transcript};
//!
//! let transcript = Transcript::new();
//! transcript.append(Message::user("Hello"));
//!
//! assert_eq!(transcript.len(), 1);
//! assert_eq!(transcript.display_text(), "You: Hello");
//! ```

mod message;

pub use message::{Content, Message, Sender};

use std::sync::{Arc, PoisonError, RwLock};

/// Shared handle to the ordered message list.
///
/// Clones share the same underlying list.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    inner: Arc<RwLock<Vec<Message>>>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its index.
    pub fn append(&self, message: Message) -> usize {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.push(message);
        guard.len() - 1
    }

    /// Snapshot of all messages in order.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Message at `index`, if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Message> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no entry has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenated displayed text of every entry, one line per entry.
    #[must_use]
    pub fn display_text(&self) -> String {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(Message::display_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_append_order() {
        let transcript = Transcript::new();
        assert!(transcript.is_empty());

        assert_eq!(transcript.append(Message::user("Hello")), 0);
        assert_eq!(
            transcript.append(Message::bot(Content::PlainText("Hi there".into()))),
            1
        );

        let messages = transcript.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::You);
        assert_eq!(messages[1].sender, Sender::Bot);
        assert_eq!(transcript.display_text(), "You: Hello\nBot: Hi there");
    }

    #[test]
    fn test_clones_share_entries() {
        let transcript = Transcript::new();
        let other = transcript.clone();

        other.append(Message::user("shared"));
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.get(0).unwrap().content.raw(), "shared");
        assert!(transcript.get(1).is_none());
    }

    #[test]
    fn test_empty_display_text() {
        assert_eq!(Transcript::new().display_text(), "");
    }
}
