pub mod client;

pub use client::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Inference service is not reachable at {0}")]
    NotReachable(String),

    #[error("Inference request timed out after {0}s")]
    Timeout(u64),

    #[error("Inference service returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response decoding error: {0}")]
    ResponseDecode(String),
}

/// Seam to the hosted vision-language models.
///
/// One request per call: a text instruction plus one inlined image, answered
/// with free-form text. No schema compliance is guaranteed — downstream code
/// owns sanitization and parsing.
pub trait VisionClient: Send + Sync {
    /// Send a single chat request with one base64-encoded image attached.
    fn chat_with_image(
        &self,
        model: &str,
        prompt: &str,
        image_base64: &str,
    ) -> Result<String, InferenceError>;

    /// List model identifiers the service currently offers.
    fn list_models(&self) -> Result<Vec<String>, InferenceError>;
}
