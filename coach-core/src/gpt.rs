//! Chat-completions client that answers as a named assistant.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::assistants::AssistantStore;
use crate::config::CoachConfig;
use crate::error::{CoachError, CoachResult};

const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Something that turns a template plus a user message into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Templates this generator can answer with.
    fn assistants(&self) -> &AssistantStore;

    /// Generate text with `template` as the assistant prompt.
    /// Unknown templates fail before any request is made.
    async fn generate(&self, template: &str, user_text: &str) -> CoachResult<String>;

    fn has_template(&self, name: &str) -> bool {
        self.assistants().contains(name)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct GptClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
    assistants: AssistantStore,
}

impl GptClient {
    pub fn new(api_key: impl Into<String>, config: &CoachConfig, assistants: AssistantStore) -> Self {
        GptClient {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: config.model.clone(),
            api_url: config.openai_api_url.clone(),
            assistants,
        }
    }

    /// Read the API key from `OPENAI_API_KEY` and load the configured templates.
    pub fn from_config(config: &CoachConfig) -> CoachResult<Self> {
        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                CoachError::Config(format!("{API_KEY_VAR} must be set in the environment or .env"))
            })?;

        let assistants = AssistantStore::load(&config.assistants_path())?;
        Ok(GptClient::new(api_key, config, assistants))
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    async fn error_for_status(assistant: &str, response: reqwest::Response) -> CoachError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = match status {
            401 | 403 => format!("authentication failed ({status})"),
            429 => "rate limit exceeded (429)".to_string(),
            _ => format!("API error (status {status}): {body}"),
        };
        error!(assistant, status, "Chat completion request failed");
        CoachError::generation(assistant, message)
    }
}

#[async_trait]
impl TextGenerator for GptClient {
    fn assistants(&self) -> &AssistantStore {
        &self.assistants
    }

    async fn generate(&self, template: &str, user_text: &str) -> CoachResult<String> {
        let base_prompt = self.assistants.get(template)?;

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: format!("{base_prompt}\n\n{user_text}"),
            }],
        };

        info!(assistant = template, model = %self.model, "Querying model");

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CoachError::generation(template, format!("network error: {e}")))?;

        debug!(assistant = template, status = response.status().as_u16(), "Received response");

        if !response.status().is_success() {
            return Err(Self::error_for_status(template, response).await);
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CoachError::generation(template, format!("invalid response: {e}")))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CoachError::generation(template, "invalid response: no choices"))?;

        Ok(choice
            .message
            .content
            .map(|c| c.trim().to_string())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> GptClient {
        let assistants = AssistantStore::from_templates([("deporte", "Eres un entrenador.")]);
        GptClient::new("test-key", &CoachConfig::default(), assistants)
            .with_api_url(format!("{}/v1/chat/completions", server.uri()))
    }

    fn completion(content: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
    }

    #[tokio::test]
    async fn sends_template_and_user_text_as_one_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "messages": [{ "role": "user", "content": "Eres un entrenador.\n\n¿Qué hago?" }]
            })))
            .respond_with(completion(json!("  Corre 30 minutos.\n")))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server).generate("deporte", "¿Qué hago?").await.unwrap();
        assert_eq!(text, "Corre 30 minutos.");
    }

    #[tokio::test]
    async fn unknown_template_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion(json!("unused")))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server).generate("nutri", "hola").await.unwrap_err();
        assert!(matches!(err, CoachError::TemplateNotFound(name) if name == "nutri"));
    }

    #[tokio::test]
    async fn maps_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&server)
            .await;

        let err = client(&server).generate("deporte", "hola").await.unwrap_err();
        match err {
            CoachError::Generation { assistant, message } => {
                assert_eq!(assistant, "deporte");
                assert!(message.contains("authentication"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn maps_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = client(&server).generate("deporte", "hola").await.unwrap_err();
        assert!(err.to_string().contains("rate limit"));
    }

    #[tokio::test]
    async fn empty_choices_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = client(&server).generate("deporte", "hola").await.unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[tokio::test]
    async fn null_content_is_empty_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion(serde_json::Value::Null))
            .mount(&server)
            .await;

        let text = client(&server).generate("deporte", "hola").await.unwrap();
        assert_eq!(text, "");
    }
}
