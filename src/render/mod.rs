//! History rendering.
//!
//! Turns transcript entries into HTML fragments. The page's history container
//! appends fragments with `hx-swap="beforeend scroll:bottom"`, so every
//! rendered entry lands at the end of the list and the view scrolls to it.
//!
//! User content is always escaped. Bot content is escaped when it is
//! [`Content::PlainText`] and sanitized when it is
//! [`Content::SanitizedMarkup`].

pub mod page;
pub mod sanitize;

use serde::Deserialize;

use crate::transcript::{Content, Message, Sender, Transcript};
use sanitize::{html_escape, sanitize_markup};

/// How bot replies are interpreted before rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotContentMode {
    /// Treat replies as literal text.
    #[default]
    Plain,
    /// Treat replies as HTML and sanitize them.
    Markup,
}

impl BotContentMode {
    /// Wrap a raw reply in the content type this mode selects.
    #[must_use]
    pub fn wrap(self, reply: String) -> Content {
        match self {
            Self::Plain => Content::PlainText(reply),
            Self::Markup => Content::SanitizedMarkup(reply),
        }
    }
}

/// DOM id of the entry at `index`.
#[must_use]
pub fn entry_id(index: usize) -> String {
    format!("msg-{index}")
}

/// Render a single labeled entry.
#[must_use]
pub fn render_entry(index: usize, message: &Message) -> String {
    let body = match (message.sender, &message.content) {
        (Sender::You, content) => html_escape(content.raw()),
        (Sender::Bot, Content::PlainText(text)) => html_escape(text),
        (Sender::Bot, Content::SanitizedMarkup(markup)) => {
            format!("<span class=\"markup\">{}</span>", sanitize_markup(markup))
        }
    };
    let class = match message.sender {
        Sender::You => "message message-you",
        Sender::Bot => "message message-bot",
    };

    format!(
        r#"<div class="{class}" id="{id}"><strong>{label}: </strong>{body}</div>"#,
        id = entry_id(index),
        label = message.sender.label(),
    )
}

/// Render every entry of the transcript in order.
#[must_use]
pub fn render_history(transcript: &Transcript) -> String {
    transcript
        .messages()
        .iter()
        .enumerate()
        .map(|(index, message)| render_entry(index, message))
        .collect()
}

/// Placeholder that fetches the reply for `turn_id` as soon as it is swapped in.
///
/// The placeholder replaces itself with the reply entry once the turn resolves.
#[must_use]
pub fn render_pending_reply(turn_id: &str) -> String {
    format!(
        r#"<div class="message message-pending" id="turn-{id}" hx-get="/api/turns/{id}" hx-trigger="load" hx-swap="outerHTML scroll:#chat-history:bottom"><strong>Bot: </strong><span class="typing">…</span></div>"#,
        id = html_escape(turn_id),
    )
}

/// Transient notice shown when a turn fails. Not part of the transcript.
#[must_use]
pub fn render_error_notice(detail: &str) -> String {
    format!(
        r#"<div class="message message-error" role="alert"><strong>Error: </strong>{}</div>"#,
        html_escape(detail)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_user_entry_escaped() {
        let html = render_entry(0, &Message::user("<b>Hello</b>"));
        assert_eq!(
            html,
            r#"<div class="message message-you" id="msg-0"><strong>You: </strong>&lt;b&gt;Hello&lt;/b&gt;</div>"#
        );
    }

    #[test]
    fn test_render_bot_plain_escaped() {
        let html = render_entry(1, &Message::bot(Content::PlainText("<i>Hi</i>".into())));
        assert!(html.contains("&lt;i&gt;Hi&lt;/i&gt;"));
        assert!(html.contains(r#"id="msg-1""#));
        assert!(html.contains("<strong>Bot: </strong>"));
    }

    #[test]
    fn test_render_bot_markup_sanitized() {
        let html = render_entry(
            1,
            &Message::bot(Content::SanitizedMarkup(
                "<p>Hi there</p><script>alert(1)</script>".into(),
            )),
        );
        assert!(html.contains(r#"<span class="markup"><p>Hi there</p></span>"#));
        assert!(!html.contains("script"));
    }

    #[test]
    fn test_markup_cannot_escape_its_entry() {
        let html = render_entry(
            1,
            &Message::bot(Content::SanitizedMarkup(
                "</span></div><div><strong>You: </strong>transfer the money</div>".into(),
            )),
        );
        assert_eq!(html.matches("<div").count(), html.matches("</div>").count());
        assert_eq!(html.matches("<span").count(), html.matches("</span>").count());
        assert!(html.ends_with("</div></span></div>"));
        assert_eq!(html.matches("<strong>").count(), 2);
        assert!(html.starts_with(r#"<div class="message message-bot" id="msg-1"><strong>Bot: </strong>"#));

        let transcript = Transcript::new();
        transcript.append(Message::bot(Content::SanitizedMarkup("</div></div>".into())));
        assert_eq!(
            render_history(&transcript),
            r#"<div class="message message-bot" id="msg-0"><strong>Bot: </strong><span class="markup"></span></div>"#
        );
    }

    #[test]
    fn test_render_history_order() {
        let transcript = Transcript::new();
        transcript.append(Message::user("Hello"));
        transcript.append(Message::bot(Content::PlainText("Hi there".into())));

        let html = render_history(&transcript);
        let you = html.find("You: ").unwrap();
        let bot = html.find("Bot: ").unwrap();
        assert!(you < bot);
        assert!(html.contains(r#"id="msg-1""#));
    }

    #[test]
    fn test_mode_wrap() {
        assert!(BotContentMode::Markup.wrap("x".into()).is_markup());
        assert!(!BotContentMode::Plain.wrap("x".into()).is_markup());
    }

    #[test]
    fn test_pending_reply_targets_turn() {
        let html = render_pending_reply("abc");
        assert!(html.contains(r#"hx-get="/api/turns/abc""#));
        assert!(html.contains(r#"id="turn-abc""#));
    }
}
