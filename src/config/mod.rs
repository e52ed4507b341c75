use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// OpenAI API key
    pub openai_api_key: String,

    /// OpenAI API base URL
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    /// Model used for image analysis jobs
    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    /// Model used by the prompt relay
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Object storage bucket name
    pub storage_bucket: String,

    /// Object storage endpoint URL (S3-compatible)
    pub storage_endpoint: String,

    /// Object storage access key ID
    pub storage_access_key: String,

    /// Object storage secret access key
    pub storage_secret_key: String,

    /// Base URL under which uploaded objects are publicly reachable
    pub storage_public_url: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_vision_model() -> String {
    "gpt-4o".to_string()
}

fn default_chat_model() -> String {
    "gpt-4.1".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
