use garde::Validate;
use serde::{Deserialize, Serialize};

/// Request to submit an image analysis job.
///
/// Field names follow the JSON contract of the original browser client
/// (camelCase). All three fields are required and non-empty. The upper
/// bounds (2048-char URL, 200-char ids) tighten that contract: anything
/// larger is rejected with a 400 rather than stored verbatim as a primary
/// key or handed to the model.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[garde(length(min = 1, max = 2048))]
    pub image_url: String,

    #[garde(length(min = 1, max = 200))]
    pub user_id: String,

    #[garde(length(min = 1, max = 200))]
    pub job_id: String,
}

/// 202 acknowledgment returned by the intake endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedResponse {
    pub message: String,
    pub job_id: String,
}

/// Response for querying job status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: String,
    pub result: Option<String>,
    pub error: Option<String>,
}

/// Request to the prompt relay endpoint.
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[garde(length(min = 1, max = 32768))]
    pub prompt: String,
}

/// Response from the prompt relay endpoint.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub output_text: String,
}

/// Response after uploading an image to object storage.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub key: String,
    pub public_url: String,
}
