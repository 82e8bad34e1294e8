use serde::{Deserialize, Serialize};
use shopsight_core::{Error, FaqModel, Result};

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

const MODEL_TIMEOUT_MS: u64 = 30_000;

/// Chat-completions client for any OpenAI-compatible endpoint. Backs
/// the model-assisted FAQ strategy.
#[derive(Debug, Clone)]
pub struct OpenAiCompatModel {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatModel {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        model: String,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }

    /// Configuration from `SHOPSIGHT_MODEL_BASE_URL`,
    /// `SHOPSIGHT_MODEL_API_KEY` (optional), `SHOPSIGHT_MODEL_NAME`.
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let base_url = env("SHOPSIGHT_MODEL_BASE_URL")
            .ok_or_else(|| Error::NotConfigured("missing SHOPSIGHT_MODEL_BASE_URL".to_string()))?;
        let model = env("SHOPSIGHT_MODEL_NAME")
            .ok_or_else(|| Error::NotConfigured("missing SHOPSIGHT_MODEL_NAME".to_string()))?;
        Ok(Self::new(client, base_url, env("SHOPSIGHT_MODEL_API_KEY"), model))
    }

    fn endpoint_chat_completions(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl FaqModel for OpenAiCompatModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let req = ChatCompletionsRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: Some(0.0),
            stream: Some(false),
        };

        let mut rb = self
            .client
            .post(self.endpoint_chat_completions())
            .timeout(std::time::Duration::from_millis(MODEL_TIMEOUT_MS))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(k) = &self.api_key {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {k}"));
        }

        let resp = rb
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Model(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Model(format!("chat.completions HTTP {status}")));
        }

        let parsed: ChatCompletionsResponse =
            resp.json().await.map_err(|e| Error::Model(e.to_string()))?;
        Ok(parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    content: String,
}
