//! Provider-specific configuration and detection.
//!
//! This module handles differences between LLM API providers, mainly the URL
//! layout of the chat completions and embeddings endpoints.

/// Supported LLM providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// `OpenAI` (api.openai.com)
    OpenAI,
    /// Azure `OpenAI` Service
    AzureOpenAI {
        /// Deployment name (required for Azure)
        deployment_name: String,
        /// API version (e.g., "2024-08-01-preview")
        api_version: String,
    },
    /// `OpenRouter` (openrouter.ai)
    OpenRouter,
    /// Together AI (together.ai, together.xyz)
    TogetherAI,
    /// Groq (groq.com)
    Groq,
    /// Generic OpenAI-compatible provider
    Generic,
}

/// API version used for Azure when none is configured.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-08-01-preview";

impl Provider {
    /// Detect provider from base URL.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rug_sage::llm::Provider;
    ///
    /// let provider = Provider::detect_from_url("https://api.openai.com");
    /// assert_eq!(provider, Provider::OpenAI);
    /// ```
    #[must_use]
    pub fn detect_from_url(base_url: &str) -> Self {
        let lower = base_url.to_lowercase();

        if lower.contains("azure.com") {
            Self::AzureOpenAI {
                deployment_name: String::new(),
                api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            }
        } else if lower.contains("openrouter.ai") {
            Self::OpenRouter
        } else if lower.contains("together.ai") || lower.contains("together.xyz") {
            Self::TogetherAI
        } else if lower.contains("groq.com") {
            Self::Groq
        } else if lower.contains("openai.com") {
            Self::OpenAI
        } else {
            Self::Generic
        }
    }

    /// Build the chat completions URL for this provider.
    ///
    /// Azure routes by deployment name instead of model.
    #[must_use]
    pub fn build_chat_url(&self, base_url: &str) -> String {
        self.build_url(base_url, "chat/completions")
    }

    /// Build the embeddings URL for this provider.
    #[must_use]
    pub fn build_embeddings_url(&self, base_url: &str) -> String {
        self.build_url(base_url, "embeddings")
    }

    fn build_url(&self, base_url: &str, endpoint: &str) -> String {
        let base = base_url.trim_end_matches('/');

        match self {
            Self::AzureOpenAI {
                deployment_name,
                api_version,
            } => {
                format!(
                    "{base}/openai/deployments/{deployment_name}/{endpoint}?api-version={api_version}"
                )
            }
            Self::OpenRouter if !base.ends_with("/api/v1") => format!("{base}/api/v1/{endpoint}"),
            _ if base.ends_with("/v1") || base.ends_with("/api/v1") => format!("{base}/{endpoint}"),
            _ => format!("{base}/v1/{endpoint}"),
        }
    }

    /// Whether the API key travels in an `api-key` header instead of bearer auth.
    #[must_use]
    pub fn uses_api_key_header(&self) -> bool {
        matches!(self, Self::AzureOpenAI { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_openai() {
        let provider = Provider::detect_from_url("https://api.openai.com");
        assert_eq!(provider, Provider::OpenAI);
    }

    #[test]
    fn test_detect_azure() {
        let provider = Provider::detect_from_url("https://my-resource.openai.azure.com");
        assert!(matches!(provider, Provider::AzureOpenAI { .. }));
        assert!(provider.uses_api_key_header());
    }

    #[test]
    fn test_detect_groq() {
        let provider = Provider::detect_from_url("https://api.groq.com/openai");
        assert_eq!(provider, Provider::Groq);
    }

    #[test]
    fn test_build_url_openai() {
        let provider = Provider::OpenAI;
        assert_eq!(
            provider.build_chat_url("https://api.openai.com/"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            provider.build_embeddings_url("https://api.openai.com/v1"),
            "https://api.openai.com/v1/embeddings"
        );
    }

    #[test]
    fn test_build_url_openrouter() {
        let provider = Provider::OpenRouter;
        assert_eq!(
            provider.build_chat_url("https://openrouter.ai"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn test_build_url_azure() {
        let provider = Provider::AzureOpenAI {
            deployment_name: "gpt-4".to_string(),
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
        };
        assert_eq!(
            provider.build_chat_url("https://my-resource.openai.azure.com"),
            "https://my-resource.openai.azure.com/openai/deployments/gpt-4/chat/completions?api-version=2024-08-01-preview"
        );
    }
}
