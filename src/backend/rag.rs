//! Retrieval-augmented answer chain.

use tracing::{debug, info};

use super::ChatBackend;
use crate::error::Result;
use crate::llm::{ChatCompletionsClient, EmbeddingsClient, LlmSettings, MessageRole};
use crate::prompt::Prompt;
use crate::retrieval::Retriever;

/// System prompt for answers.
pub const SYSTEM_PROMPT: &str = "You are an AI critical thinker research assistant specializing in rugs, \
particularly oriental rugs, and all that is relevant to them. Your sole purpose is to answer questions \
based on the given text. Your answers are always in HTML which can be readily rendered. \
Do not wrap your answers in ```html fences.";

/// System prompt for transcript summaries.
pub const SUMMARY_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant that summarizes text in less than 50 words";

const ANSWER_TEMPLATE: &str = "question: {question} \n {info}, {chat_history}";
const SUMMARY_TEMPLATE: &str = "summarize this text:\n {text}";

const ANSWER_TEMPERATURE: f32 = 0.5;
const SUMMARY_TEMPERATURE: f32 = 0.2;

/// Embed the question, fetch matching rug documents, then ask the model.
#[derive(Debug, Clone)]
pub struct RagBackend {
    completions: ChatCompletionsClient,
    embeddings: EmbeddingsClient,
    retriever: Retriever,
}

impl RagBackend {
    /// Create a backend sharing one HTTP client across all calls.
    #[must_use]
    pub fn new(http: &reqwest::Client, settings: &LlmSettings, retriever: Retriever) -> Self {
        Self {
            completions: ChatCompletionsClient::with_http(http.clone(), settings.clone()),
            embeddings: EmbeddingsClient::with_http(http.clone(), settings.clone()),
            retriever,
        }
    }
}

/// Messages for the answer call.
fn answer_prompts(question: &str, info: &str, chat_history: &str) -> [Prompt; 2] {
    [
        Prompt::new(SYSTEM_PROMPT, MessageRole::System),
        Prompt::new(ANSWER_TEMPLATE, MessageRole::User)
            .add_variable("question", question)
            .add_variable("info", info)
            .add_variable("chat_history", chat_history),
    ]
}

/// Messages for the summary call.
fn summary_prompts(text: &str) -> [Prompt; 2] {
    [
        Prompt::new(SUMMARY_SYSTEM_PROMPT, MessageRole::System),
        Prompt::new(SUMMARY_TEMPLATE, MessageRole::User).add_variable("text", text),
    ]
}

#[async_trait::async_trait]
impl ChatBackend for RagBackend {
    async fn generate_response(&self, question: &str, chat_history: &str) -> Result<String> {
        let embedding = self.embeddings.embed(question).await?;
        debug!(
            name: "rag.question.embedded",
            dimensions = embedding.len(),
            "Question embedded"
        );

        let info = self.retriever.retrieve(embedding).await?;
        let messages = answer_prompts(question, &info, chat_history).map(|p| p.to_message());

        let answer = self
            .completions
            .complete(&messages, ANSWER_TEMPERATURE)
            .await?;
        info!(
            name: "rag.answer.generated",
            context_chars = info.len(),
            answer_chars = answer.len(),
            "Answer generated"
        );
        Ok(answer)
    }

    async fn summarize(&self, chat_history: &str) -> Result<String> {
        let messages = summary_prompts(chat_history).map(|p| p.to_message());
        self.completions
            .complete(&messages, SUMMARY_TEMPERATURE)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_prompt_includes_context() {
        let [system, user] = answer_prompts(
            "What is the symbolism of Boteh?",
            "Boteh is a paisley-like motif.",
            "You: hi",
        )
        .map(|p| p.to_message());

        assert_eq!(system.role, MessageRole::System);
        assert!(system.content.contains("oriental rugs"));
        assert_eq!(
            user.content,
            "question: What is the symbolism of Boteh? \n Boteh is a paisley-like motif., You: hi"
        );
    }

    #[test]
    fn test_summary_prompt() {
        let [system, user] = summary_prompts("You: Hello\nBot: Hi there").map(|p| p.to_message());
        assert!(system.content.contains("less than 50 words"));
        assert_eq!(user.content, "summarize this text:\n You: Hello\nBot: Hi there");
    }
}
