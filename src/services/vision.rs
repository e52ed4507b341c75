use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// Fixed prompt sent with every image analysis job.
const ANALYSIS_PROMPT: &str = "what's in this image?";

/// Seam between the analysis worker and the hosted model, so tests can
/// substitute a stub for the real API.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Describe the image behind `image_url`. Must never return an empty
    /// string — a model reply with no output text is an error.
    async fn analyze_image(&self, image_url: &str) -> Result<String, VisionError>;
}

/// Client for the OpenAI REST API (responses + chat completions).
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    base_url: String,
    vision_model: String,
    chat_model: String,
}

#[derive(Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentItem>,
}

#[derive(Deserialize)]
struct ContentItem {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: &str, vision_model: &str, chat_model: &str) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            vision_model: vision_model.to_string(),
            chat_model: chat_model.to_string(),
        }
    }

    /// Relay a plain text prompt through the chat completions API.
    pub async fn complete(&self, prompt: &str) -> Result<String, VisionError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request_body = serde_json::json!({
            "model": self.chat_model,
            "messages": [{ "role": "user", "content": prompt }]
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(VisionError::Http)?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let reply: ChatReply = response.json().await.map_err(VisionError::Http)?;
        extract_chat_text(reply)
    }

    async fn api_error(response: reqwest::Response) -> VisionError {
        let status = response.status().as_u16();
        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| "An error occurred while processing your request.".to_string()),
            Err(_) => "An error occurred while processing your request.".to_string(),
        };
        VisionError::Api { status, message }
    }
}

#[async_trait]
impl VisionModel for OpenAiClient {
    async fn analyze_image(&self, image_url: &str) -> Result<String, VisionError> {
        let url = format!("{}/responses", self.base_url);

        let request_body = serde_json::json!({
            "model": self.vision_model,
            "input": [{
                "role": "user",
                "content": [
                    { "type": "input_text", "text": ANALYSIS_PROMPT },
                    { "type": "input_image", "image_url": image_url }
                ]
            }]
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(VisionError::Http)?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let reply: ResponsesReply = response.json().await.map_err(VisionError::Http)?;
        extract_output_text(reply)
    }
}

/// Concatenate the output_text fragments of a responses API reply.
fn extract_output_text(reply: ResponsesReply) -> Result<String, VisionError> {
    let text: String = reply
        .output
        .iter()
        .flat_map(|item| item.content.iter())
        .filter(|c| c.kind == "output_text")
        .filter_map(|c| c.text.as_deref())
        .collect();

    if text.trim().is_empty() {
        return Err(VisionError::EmptyResponse);
    }
    Ok(text)
}

fn extract_chat_text(reply: ChatReply) -> Result<String, VisionError> {
    let text = reply
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(VisionError::EmptyResponse);
    }
    Ok(text)
}

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid or empty response received from the model")]
    EmptyResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_output_text_from_responses_reply() {
        let reply: ResponsesReply = serde_json::from_str(
            r#"{
                "output": [{
                    "type": "message",
                    "content": [
                        { "type": "output_text", "text": "blue walls, " },
                        { "type": "output_text", "text": "add a rug" }
                    ]
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(extract_output_text(reply).unwrap(), "blue walls, add a rug");
    }

    #[test]
    fn empty_responses_reply_is_an_error() {
        let reply: ResponsesReply = serde_json::from_str(r#"{"output": []}"#).unwrap();
        assert!(matches!(
            extract_output_text(reply),
            Err(VisionError::EmptyResponse)
        ));
    }

    #[test]
    fn whitespace_only_output_is_an_error() {
        let reply: ResponsesReply = serde_json::from_str(
            r#"{"output": [{"content": [{"type": "output_text", "text": "   "}]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            extract_output_text(reply),
            Err(VisionError::EmptyResponse)
        ));
    }

    #[test]
    fn extracts_chat_completion_text() {
        let reply: ChatReply = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "hello"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_chat_text(reply).unwrap(), "hello");
    }

    #[test]
    fn chat_reply_without_content_is_an_error() {
        let reply: ChatReply = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            extract_chat_text(reply),
            Err(VisionError::EmptyResponse)
        ));
    }
}
