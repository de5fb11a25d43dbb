//! LLM Client — the single point of entry for all chat completion calls.
//!
//! ARCHITECTURAL RULE: No other module may call the OpenAI API directly.
//! All LLM interactions MUST go through this module.
//!
//! Model: gpt-4 at temperature 0.7 (hardcoded — do not make configurable to prevent drift)
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::session::credential::Credential;

/// The model used for every completion call.
pub const MODEL: &str = "gpt-4";
pub const TEMPERATURE: f64 = 0.7;
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Prefix of every rendered provider failure. Callers display the rendered text
/// in place of the artifact it was meant to produce.
pub const PROVIDER_ERROR_PREFIX: &str = "Error calling the completion provider";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned no choice content")]
    EmptyChoices,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f64,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

impl<'a> ChatRequest<'a> {
    /// Single-turn request: one user message, fixed model and temperature.
    pub fn single_turn(prompt: &'a str) -> Self {
        Self {
            model: MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    /// Consumes the response and returns the first choice's text.
    fn into_first_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

/// The "create chat completion" operation of the model provider.
///
/// Carried in `AppState` as `Arc<dyn CompletionProvider>` so tests can swap in
/// a recording fake without touching handlers or the orchestrator.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn create_chat_completion(
        &self,
        api_key: &str,
        request: &ChatRequest<'_>,
    ) -> Result<String, LlmError>;
}

/// Wraps the OpenAI chat completions endpoint. One blocking round trip per call, no retry.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_url: String,
}

impl LlmClient {
    pub fn new(api_url: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            api_url,
        })
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    async fn create_chat_completion(
        &self,
        api_key: &str,
        request: &ChatRequest<'_>,
    ) -> Result<String, LlmError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Completion provider returned {}", status);
            // Prefer the provider's own message over the raw body
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        let text = parsed.into_first_text().ok_or(LlmError::EmptyChoices)?;

        debug!("Completion call succeeded: {} chars", text.len());
        Ok(text)
    }
}

/// Sends `prompt` as a single user message with the session's credential.
pub async fn complete(
    provider: &dyn CompletionProvider,
    credential: &Credential,
    prompt: &str,
) -> Result<String, LlmError> {
    let request = ChatRequest::single_turn(prompt);
    provider
        .create_chat_completion(credential.expose(), &request)
        .await
}

/// Presentation boundary: a provider failure becomes displayable text, never an error.
pub fn render_completion(result: Result<String, LlmError>) -> String {
    match result {
        Ok(text) => text,
        Err(e) => format!("{PROVIDER_ERROR_PREFIX}: {e}"),
    }
}

#[cfg(test)]
pub mod testing {
    //! Fake providers shared by the orchestrator and route tests.

    use std::sync::Mutex;

    use super::*;

    /// Records every prompt and answers from a fixed script, in order.
    /// Once the script runs out the last answer repeats.
    pub struct ScriptedProvider {
        answers: Vec<String>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        pub fn new(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|a| a.to_string()).collect(),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn create_chat_completion(
            &self,
            _api_key: &str,
            request: &ChatRequest<'_>,
        ) -> Result<String, LlmError> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(request.messages[0].content.to_string());
            let idx = (prompts.len() - 1).min(self.answers.len().saturating_sub(1));
            Ok(self.answers.get(idx).cloned().unwrap_or_default())
        }
    }

    /// Panics inside the call, taking the run task down with it.
    pub struct PanickingProvider;

    #[async_trait]
    impl CompletionProvider for PanickingProvider {
        async fn create_chat_completion(
            &self,
            _api_key: &str,
            _request: &ChatRequest<'_>,
        ) -> Result<String, LlmError> {
            panic!("provider crashed");
        }
    }

    /// Fails every call with a 401, as an invalid key would.
    #[derive(Default)]
    pub struct FailingProvider {
        pub prompts: Mutex<Vec<String>>,
    }

    impl FailingProvider {
        pub fn calls(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for FailingProvider {
        async fn create_chat_completion(
            &self,
            _api_key: &str,
            request: &ChatRequest<'_>,
        ) -> Result<String, LlmError> {
            self.prompts
                .lock()
                .unwrap()
                .push(request.messages[0].content.to_string());
            Err(LlmError::Api {
                status: 401,
                message: "Incorrect API key provided".to_string(),
            })
        }
    }
}
