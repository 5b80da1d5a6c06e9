//! Input handling and the send flow.
//!
//! A send trigger (button click or Enter) reads the trimmed input. Empty input
//! is ignored without touching the field. Otherwise the input is cleared and
//! the turn is queued.
//!
//! Turns run one at a time, in submission order, on a single worker task.
//! When a turn starts its user entry is appended; the optional summary call
//! then completes before the reply call starts, and both complete before the
//! bot entry is appended. With no turn in flight the user entry appears at
//! once. A send issued while a turn is in flight waits in the queue and its
//! user entry follows the previous bot reply, so the transcript always reads
//! as alternating turns.

mod worker;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use uuid::Uuid;

use crate::backend::ChatBackend;
use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::render::BotContentMode;
use crate::transcript::{Message, Transcript};

use worker::TurnJob;

/// A user interaction on the input area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// The send button was clicked.
    Click,
    /// A key was pressed in the text input.
    KeyDown {
        /// Key name as reported by the UI (e.g. `"Enter"`).
        key: String,
    },
}

impl InputEvent {
    /// Whether this event sends the current input. Enter is a synonym for the
    /// send button; every other key is ignored.
    #[must_use]
    pub fn is_send_trigger(&self) -> bool {
        match self {
            Self::Click => true,
            Self::KeyDown { key } => key == "Enter",
        }
    }
}

/// Behavior switches for the send flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatOptions {
    /// Summarize the transcript before asking for a reply.
    pub summarize: bool,
    /// How bot replies are tagged for rendering.
    pub bot_content: BotContentMode,
    /// Limit for each backend call.
    pub backend_timeout: Option<Duration>,
}

impl From<&ChatConfig> for ChatOptions {
    fn from(config: &ChatConfig) -> Self {
        Self {
            summarize: config.summarize,
            bot_content: config.bot_content,
            backend_timeout: config.backend_timeout(),
        }
    }
}

/// A transcript entry together with its position.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Transcript index.
    pub index: usize,
    /// The appended message.
    pub message: Message,
}

/// A queued turn.
#[derive(Debug)]
pub struct PendingTurn {
    /// Turn identifier.
    pub id: Uuid,
    /// The trimmed question.
    pub question: String,
    echo: oneshot::Receiver<Entry>,
    reply: oneshot::Receiver<Result<Entry>>,
}

impl PendingTurn {
    /// Wait until the turn starts and its user entry is in the transcript.
    pub async fn echoed(&mut self) -> Result<Entry> {
        (&mut self.echo)
            .await
            .map_err(|_closed| ChatError::QueueClosed)
    }

    /// Wait for the turn to resolve into its bot entry.
    pub async fn reply(self) -> Result<Entry> {
        self.reply.await.unwrap_or(Err(ChatError::QueueClosed))
    }
}

/// Owns the transcript and the single-flight turn queue.
#[derive(Debug, Clone)]
pub struct ChatController {
    transcript: Transcript,
    options: ChatOptions,
    queue: mpsc::UnboundedSender<TurnJob>,
}

impl ChatController {
    /// Create a controller with an empty transcript and start its worker.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(backend: Arc<dyn ChatBackend>, options: ChatOptions) -> Self {
        Self::with_transcript(backend, options, Transcript::new())
    }

    /// Create a controller around an existing transcript.
    #[must_use]
    pub fn with_transcript(
        backend: Arc<dyn ChatBackend>,
        options: ChatOptions,
        transcript: Transcript,
    ) -> Self {
        let (queue, jobs) = mpsc::unbounded_channel();
        tokio::spawn(worker::run(jobs, transcript.clone(), backend, options));

        Self {
            transcript,
            options,
            queue,
        }
    }

    /// The transcript this controller appends to.
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Active options.
    #[must_use]
    pub fn options(&self) -> ChatOptions {
        self.options
    }

    /// Queue a turn for `raw`.
    ///
    /// Returns `Ok(None)` without side effects when the trimmed input is empty.
    /// The user entry is appended when the turn reaches the front of the queue;
    /// see [`PendingTurn::echoed`].
    pub fn submit(&self, raw: &str) -> Result<Option<PendingTurn>> {
        let question = raw.trim();
        if question.is_empty() {
            return Ok(None);
        }

        let id = Uuid::new_v4();
        let (echoed, echo) = oneshot::channel();
        let (done, reply) = oneshot::channel();
        self.queue
            .send(TurnJob {
                id,
                question: question.to_string(),
                echoed,
                done,
            })
            .map_err(|_closed| ChatError::QueueClosed)?;

        debug!(name: "chat.turn.queued", turn_id = %id, "Turn queued");

        Ok(Some(PendingTurn {
            id,
            question: question.to_string(),
            echo,
            reply,
        }))
    }

    /// React to an input event against the text field contents.
    ///
    /// On a send trigger with non-empty text the field is cleared and the
    /// queued turn is returned. Anything else leaves `input` untouched.
    pub fn handle_event(&self, event: &InputEvent, input: &mut String) -> Result<Option<PendingTurn>> {
        if !event.is_send_trigger() {
            return Ok(None);
        }
        let turn = self.submit(input)?;
        if turn.is_some() {
            input.clear();
        }
        Ok(turn)
    }

    /// Submit and wait for the reply.
    pub async fn send(&self, raw: &str) -> Result<Option<Entry>> {
        match self.submit(raw)? {
            Some(turn) => turn.reply().await.map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests;
