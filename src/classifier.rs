use crate::models::RoomVerdict;
use crate::scrapers::traits::RoomClassifier;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Yes/no question sent with every image
const ROOM_PROMPT: &str = "Does this photo show the inside of an empty room in a home \
(no people, little or no furniture)? Answer with only yes or no.";

/// Settings for the vision endpoint
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub api_key: String,
    /// Root of an OpenAI-compatible API, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub model: String,
    /// Token cap for the reply; a one-word answer needs very few
    pub max_tokens: u32,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Room classifier backed by a chat-completions vision model
pub struct OpenAiRoomClassifier {
    client: Client,
    config: ClassifierConfig,
}

impl OpenAiRoomClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create classifier HTTP client")?;

        Ok(Self { client, config })
    }

    /// Raw reply text for one image
    async fn ask(&self, image_url: &str) -> Result<String> {
        let endpoint = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": ROOM_PROMPT },
                    { "type": "image_url", "image_url": { "url": image_url } }
                ]
            }]
        });

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to reach classifier")?;

        if !response.status().is_success() {
            anyhow::bail!("Classifier returned status: {}", response.status());
        }

        let reply: ChatResponse = response
            .json()
            .await
            .context("Failed to decode classifier response")?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .context("Classifier response had no content")
    }
}

#[async_trait]
impl RoomClassifier for OpenAiRoomClassifier {
    async fn classify(&self, image_url: &str) -> RoomVerdict {
        match self.ask(image_url).await {
            Ok(reply) => {
                debug!("Classifier replied {:?} for {}", reply, image_url);
                RoomVerdict::from_reply(&reply)
            }
            Err(e) => {
                warn!("Classifier failed for {}: {:#}", image_url, e);
                RoomVerdict::Unknown
            }
        }
    }
}
