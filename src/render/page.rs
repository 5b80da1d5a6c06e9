//! Chat page shell.

use super::render_history;
use crate::transcript::Transcript;

/// Generate the HTML page: one text input, one send button and the
/// scrollable history container, pre-filled with the current transcript.
///
/// The form posts to `/api/messages`; pressing Enter in the input submits the
/// form exactly like clicking the button. The send button is disabled while a
/// post is in flight, and the input is only cleared when the server accepted
/// a message.
#[must_use]
pub fn chat_page(title: &str, transcript: &Transcript) -> String {
    let title = super::sanitize::html_escape(title);
    let history = render_history(transcript);

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>

    <!-- Tauri-friendly: local scripts only (no CDN) -->
    <script src="/static/vendor/htmx-2.0.8.min.js"></script>
    <style>
        body {{ font-family: system-ui, sans-serif; margin: 0; display: flex; flex-direction: column; height: 100vh; }}
        #chat-history {{ flex: 1; overflow-y: auto; padding: 1rem; }}
        .message {{ margin: 0.5rem 0; line-height: 1.4; }}
        .message-error {{ color: #b00020; }}
        .message-pending .typing {{ opacity: 0.6; }}
        #chat-form {{ display: flex; gap: 0.5rem; padding: 1rem; border-top: 1px solid #ddd; }}
        #user-input {{ flex: 1; padding: 0.5rem; }}
    </style>
</head>
<body>
    <div id="chat-history" aria-live="polite" aria-label="Chat messages">{history}</div>
    <form
        id="chat-form"
        hx-post="/api/messages"
        hx-target="#chat-history"
        hx-swap="beforeend scroll:bottom"
        hx-disabled-elt="#send-button"
        hx-on::after-request="if (event.detail.xhr.status === 200) {{ this.reset(); }}"
    >
        <input id="user-input" name="message" type="text" autocomplete="off" placeholder="Ask about rugs..." autofocus>
        <button id="send-button" type="submit">Send</button>
    </form>
</body>
</html>"##
    )
}
