use crate::error::ChatError;
use crate::llm::{LlmSettings, Provider, provider::DEFAULT_AZURE_API_VERSION};
use crate::render::BotContentMode;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long, env = "BIND_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Summarize the transcript before generating each reply
    #[arg(long, env = "CHAT_SUMMARIZE")]
    pub summarize: Option<bool>,

    /// How bot replies are rendered: "plain" or "markup"
    #[arg(long, env = "CHAT_BOT_CONTENT")]
    pub bot_content: Option<String>,

    /// Embedding model used for retrieval queries
    #[arg(long, env = "LLM_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Give up on a backend call after this many seconds
    #[arg(long, env = "CHAT_BACKEND_TIMEOUT_SECS")]
    pub backend_timeout_secs: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub chat: ChatConfig,
    pub retrieval: RetrievalConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Directory served under `/static` (vendored htmx lives here).
    pub static_dir: String,
    /// Page title.
    pub title: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// Run the summarizer over the transcript before each reply.
    pub summarize: bool,
    /// Rendering mode for bot replies.
    pub bot_content: BotContentMode,
    /// Per-call backend limit; absent means wait indefinitely.
    #[serde(default)]
    pub backend_timeout_secs: Option<u64>,
}

impl ChatConfig {
    #[must_use]
    pub fn backend_timeout(&self) -> Option<Duration> {
        self.backend_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    pub qdrant_url: String,
    pub collection: String,
    /// Named vector the chunks were embedded into.
    pub vector_name: String,
    /// Model that embeds queries; must match the one that filled the collection.
    pub embedding_model: String,
    pub limit: u32,
    /// Minimum similarity score for a chunk to be used.
    pub threshold: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.static_dir", "static")?
            .set_default("server.title", "Rug Sage")?
            .set_default("chat.summarize", true)?
            .set_default("chat.bot_content", "markup")?
            .set_default("retrieval.qdrant_url", "http://localhost:6333")?
            .set_default("retrieval.collection", "Rug_sage")?
            .set_default("retrieval.vector_name", "text_embedding")?
            .set_default("retrieval.embedding_model", "text-embedding-3-large")?
            .set_default("retrieval.limit", 2)?
            .set_default("retrieval.threshold", 0.8)?
            .set_default("logging.json", false)?;

        // Explicit file must exist; ./config.{yaml,toml,json} is optional.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // E.g. SAGE_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("SAGE")
                .separator("__")
                .try_parsing(true),
        );

        // Priority: CLI flag > CLI env var > SAGE_ env > config file > defaults.
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(summarize) = cli.summarize {
            builder = builder.set_override("chat.summarize", summarize)?;
        }
        if let Some(mode) = cli.bot_content {
            builder = builder.set_override("chat.bot_content", mode.to_lowercase())?;
        }
        if let Some(model) = cli.embedding_model {
            builder = builder.set_override("retrieval.embedding_model", model)?;
        }
        if let Some(secs) = cli.backend_timeout_secs {
            builder = builder.set_override(
                "chat.backend_timeout_secs",
                i64::try_from(secs).unwrap_or(i64::MAX),
            )?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("logging.json", json)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}

/// Read LLM connection settings from the environment.
///
/// `LLM_API_KEY` takes precedence over `OPENAI_API_KEY`. The embedding model
/// comes from `retrieval.embedding_model`.
pub fn load_llm_settings(config: &AppConfig) -> Result<LlmSettings, ChatError> {
    let base_url = non_empty_var("LLM_BASE_URL").unwrap_or_else(|| "https://api.openai.com".into());
    let model = non_empty_var("LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".into());
    let embedding_model = config.retrieval.embedding_model.clone();

    let api_key = non_empty_var("LLM_API_KEY").or_else(|| non_empty_var("OPENAI_API_KEY"));

    let mut provider = Provider::detect_from_url(&base_url);
    if let Provider::AzureOpenAI { .. } = &provider {
        let deployment_name = non_empty_var("AZURE_DEPLOYMENT_NAME").ok_or_else(|| {
            ChatError::Config("AZURE_DEPLOYMENT_NAME is required for Azure OpenAI".into())
        })?;
        provider = Provider::AzureOpenAI {
            deployment_name,
            api_version: non_empty_var("AZURE_API_VERSION")
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
        };
    }

    if api_key.is_none() && provider != Provider::Generic {
        return Err(ChatError::Config(
            "Missing API key: set LLM_API_KEY or OPENAI_API_KEY".into(),
        ));
    }

    Ok(LlmSettings {
        base_url,
        api_key,
        model,
        embedding_model,
        provider,
    })
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}
