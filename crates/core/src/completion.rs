use crate::traits::CompletionProvider;
use crate::{CompletionError, CompletionRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1/";
pub const DEFAULT_COMPLETION_MODEL: &str = "llama-3.1-8b-instant";

/// Groq's OpenAI-compatible chat completions API.
pub struct GroqProvider {
    client: Client,
    api_key: String,
    endpoint: Url,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl GroqProvider {
    pub fn new(api_key: impl Into<String>, base_url: &str) -> Result<Self, CompletionError> {
        let base = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };

        Ok(Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: base.join("chat/completions")?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionProvider for GroqProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "requesting completion"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status, body });
        }

        let parsed: CompletionResponse = response.json().await?;
        first_choice_text(parsed)
    }
}

fn first_choice_text(response: CompletionResponse) -> Result<String, CompletionError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| CompletionError::Parse("missing choices[0].message.content".to_string()))
}
