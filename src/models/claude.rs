//! Anthropic messages-API client for Claude vision calls.
//!
//! Same capability surface as the `OpenAI` client: one prompt, one optional
//! page image (base64 content block), one textual response. Claude has no
//! JSON mode, so structured answers may come back fenced; the shared
//! response parsing tolerates that.

use crate::error::InferenceError;
use crate::models::ImageAttachment;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Image { source: ImageSource },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    r#type: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

/// HTTP client for the Anthropic API.
#[derive(Debug, Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    /// Create a client for the default Claude model.
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_owned(),
        }
    }

    /// Override the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Send one prompt (and optional image) and return the raw response
    /// content.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, non-success status codes, and empty
    /// response content.
    pub async fn complete(
        &self,
        prompt: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<String, InferenceError> {
        let start = Instant::now();

        // Anthropic recommends image blocks before the text prompt.
        let mut content = Vec::new();
        if let Some(attachment) = image {
            content.push(ContentBlock::Image {
                source: ImageSource {
                    r#type: "base64".to_owned(),
                    media_type: attachment.media_type.to_owned(),
                    data: attachment.to_base64(),
                },
            });
        }
        content.push(ContentBlock::Text {
            text: prompt.to_owned(),
        });

        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user".to_owned(),
                content,
            }],
        };

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let messages_response: MessagesResponse = response.json().await?;

        let content = messages_response
            .content
            .into_iter()
            .find_map(|block| block.text)
            .filter(|text| !text.is_empty())
            .ok_or(InferenceError::EmptyContent)?;

        debug!(
            "claude {} responded in {}ms",
            self.model,
            start.elapsed().as_millis()
        );

        Ok(content)
    }
}
