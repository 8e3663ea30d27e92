//! `OpenAI` chat-completions client for GPT-4o vision calls.
//!
//! One request per call: the prompt text plus an optional page image inlined
//! as a base64 data URL. JSON mode (`response_format: json_object`) is
//! requested so structured answers come back without markdown wrapping.

use crate::error::InferenceError;
use crate::models::ImageAttachment;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

const API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o";
const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f64,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: Vec<Content>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Content {
    Text { r#type: String, text: String },
    Image { r#type: String, image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
    detail: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
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

/// HTTP client for the `OpenAI` API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    /// Create a client for the default GPT-4o model.
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

        let mut content = vec![Content::Text {
            r#type: "text".to_owned(),
            text: prompt.to_owned(),
        }];
        if let Some(attachment) = image {
            content.push(Content::Image {
                r#type: "image_url".to_owned(),
                image_url: ImageUrl {
                    url: format!(
                        "data:{};base64,{}",
                        attachment.media_type,
                        attachment.to_base64()
                    ),
                    detail: "high".to_owned(),
                },
            });
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_owned(),
                content,
            }],
            max_tokens: MAX_TOKENS,
            temperature: 0.0,
            response_format: ResponseFormat {
                r#type: "json_object".to_owned(),
            },
        };

        let response = self
            .client
            .post(API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
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

        let chat_response: ChatResponse = response.json().await?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or(InferenceError::EmptyContent)?;

        debug!(
            "openai {} responded in {}ms",
            self.model,
            start.elapsed().as_millis()
        );

        Ok(content)
    }
}
