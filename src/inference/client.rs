use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{InferenceError, VisionClient};

/// HTTP client for an Ollama-compatible vision inference endpoint.
pub struct HttpVisionClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpVisionClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> InferenceError {
        if e.is_connect() {
            InferenceError::NotReachable(self.base_url.clone())
        } else if e.is_timeout() {
            InferenceError::Timeout(self.timeout_secs)
        } else {
            InferenceError::HttpClient(e.to_string())
        }
    }
}

/// Request body for /api/chat (vision models take base64 images per message).
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    images: Vec<&'a str>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<TaggedModel>,
}

#[derive(Deserialize)]
struct TaggedModel {
    name: String,
}

impl VisionClient for HttpVisionClient {
    fn chat_with_image(
        &self,
        model: &str,
        prompt: &str,
        image_base64: &str,
    ) -> Result<String, InferenceError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
                images: vec![image_base64],
            }],
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(InferenceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| InferenceError::ResponseDecode(e.to_string()))?;

        Ok(parsed.message.content)
    }

    fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(InferenceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TagsResponse = response
            .json()
            .map_err(|e| InferenceError::ResponseDecode(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}

/// Mock vision client for testing.
///
/// Responses are scripted per model identifier; unscripted models fall back
/// to the default response. Every call is recorded so tests can assert which
/// models were tried, and in what order.
pub struct MockVisionClient {
    default_response: Result<String, String>,
    per_model: HashMap<String, Result<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl MockVisionClient {
    pub fn new(response: &str) -> Self {
        Self {
            default_response: Ok(response.to_string()),
            per_model: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A client whose every call fails with the given message.
    pub fn failing(message: &str) -> Self {
        Self {
            default_response: Err(message.to_string()),
            per_model: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_model_response(mut self, model: &str, response: &str) -> Self {
        self.per_model
            .insert(model.to_string(), Ok(response.to_string()));
        self
    }

    pub fn with_model_failure(mut self, model: &str, message: &str) -> Self {
        self.per_model
            .insert(model.to_string(), Err(message.to_string()));
        self
    }

    /// Model identifiers this client has been called with, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl VisionClient for MockVisionClient {
    fn chat_with_image(
        &self,
        model: &str,
        _prompt: &str,
        _image_base64: &str,
    ) -> Result<String, InferenceError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(model.to_string());
        }
        let scripted = self.per_model.get(model).unwrap_or(&self.default_response);
        match scripted {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(InferenceError::Api {
                status: 500,
                body: message.clone(),
            }),
        }
    }

    fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        Ok(self.per_model.keys().cloned().collect())
    }
}
