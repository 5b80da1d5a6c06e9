//! Single-flight turn worker.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{ChatOptions, Entry};
use crate::backend::ChatBackend;
use crate::error::{ChatError, Result};
use crate::transcript::{Message, Transcript};

/// A queued turn.
#[derive(Debug)]
pub(super) struct TurnJob {
    pub id: Uuid,
    pub question: String,
    pub echoed: oneshot::Sender<Entry>,
    pub done: oneshot::Sender<Result<Entry>>,
}

/// Resolve queued turns one at a time until every sender is dropped.
pub(super) async fn run(
    mut jobs: mpsc::UnboundedReceiver<TurnJob>,
    transcript: Transcript,
    backend: Arc<dyn ChatBackend>,
    options: ChatOptions,
) {
    while let Some(job) = jobs.recv().await {
        let message = Message::user(job.question.as_str());
        let index = transcript.append(message.clone());
        debug!(
            name: "chat.turn.started",
            turn_id = %job.id,
            user_index = index,
            "Turn started"
        );
        // Nobody may be waiting for the echo; the entry is appended regardless.
        let _ = job.echoed.send(Entry { index, message });

        let result = resolve(&transcript, backend.as_ref(), options, &job.question).await;

        match &result {
            Ok(reply) => info!(
                name: "chat.turn.completed",
                turn_id = %job.id,
                bot_index = reply.index,
                "Turn completed"
            ),
            Err(e) => error!(
                name: "chat.turn.failed",
                turn_id = %job.id,
                error = %e,
                "Turn failed"
            ),
        }

        // The requester may have gone away; the transcript is already updated.
        let _ = job.done.send(result);
    }
}

async fn resolve(
    transcript: &Transcript,
    backend: &dyn ChatBackend,
    options: ChatOptions,
    question: &str,
) -> Result<Entry> {
    let history = transcript.display_text();
    let history = if options.summarize {
        limit(options.backend_timeout, backend.summarize(&history)).await?
    } else {
        history
    };

    let reply = limit(
        options.backend_timeout,
        backend.generate_response(question, &history),
    )
    .await?;

    let message = Message::bot(options.bot_content.wrap(reply));
    let index = transcript.append(message.clone());
    Ok(Entry { index, message })
}

async fn limit<T>(timeout: Option<Duration>, call: impl Future<Output = Result<T>>) -> Result<T> {
    match timeout {
        Some(d) => tokio::time::timeout(d, call)
            .await
            .unwrap_or(Err(ChatError::Timeout(d))),
        None => call.await,
    }
}
