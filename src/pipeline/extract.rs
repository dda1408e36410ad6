//! Field extraction through an ordered fallback chain of vision models.
//!
//! The chain is a fallback, not a race: attempts are strictly sequential and
//! the first model whose response survives sanitization and schema parsing
//! wins. Per-model failures are non-fatal, the next model is substituted,
//! and every diagnostic is kept so operators can tell "all models down" from
//! "all models returned garbage" without re-running.

use std::sync::Arc;

use base64::Engine as _;

use super::sanitize::extract_json_candidate;
use crate::inference::VisionClient;
use crate::models::ExtractedFields;

/// Fixed extraction instruction sent to every model in the chain.
const EXTRACTION_PROMPT: &str = "\
You are reading a photographed sugar-cane delivery receipt. Extract the \
following fields and respond with ONLY a JSON object, no commentary:\n\
{\n\
  \"supplier_name\": string or null,\n\
  \"transaction_date\": string (YYYY-MM-DD) or null,\n\
  \"total_amount\": number or null,\n\
  \"cane_type\": string or null,\n\
  \"weight_kg\": number or null,\n\
  \"price_per_kg\": number or null\n\
}\n\
Use null for anything you cannot read with certainty.";

/// Result of running the fallback chain.
///
/// Exactly one of `data` / `error` is set. `raw` carries the unmodified
/// parsed model output for the audit trail, alongside the typed fields.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub data: Option<ExtractedFields>,
    pub raw: Option<serde_json::Value>,
    pub model_used: Option<String>,
    pub error: Option<String>,
}

/// Drives OCR extraction across the configured model fallback chain.
pub struct FieldExtractor {
    client: Arc<dyn VisionClient>,
    models: Vec<String>,
}

impl FieldExtractor {
    pub fn new(client: Arc<dyn VisionClient>, models: Vec<String>) -> Self {
        Self { client, models }
    }

    /// Extract receipt fields from an image. Never fails through a `Result`;
    /// total failure is reported in the outcome's `error` field.
    pub fn extract(&self, image_bytes: &[u8], mime_type: &str) -> ExtractionOutcome {
        let _span = tracing::info_span!(
            "field_extraction",
            models = self.models.len(),
            mime = %mime_type,
            image_size = image_bytes.len(),
        )
        .entered();

        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let mut diagnostics: Vec<String> = Vec::with_capacity(self.models.len());

        for model in &self.models {
            let start = std::time::Instant::now();

            let content = match self.client.chat_with_image(model, EXTRACTION_PROMPT, &image_base64)
            {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(model = %model, error = %e, "Model attempt failed, substituting next");
                    diagnostics.push(format!("{model}: {e}"));
                    continue;
                }
            };

            if content.trim().is_empty() {
                diagnostics.push(format!("{model}: empty response"));
                continue;
            }

            let candidate = match extract_json_candidate(&content) {
                Some(candidate) => candidate,
                None => {
                    diagnostics.push(format!("{model}: no JSON object in response"));
                    continue;
                }
            };

            let raw: serde_json::Value = match serde_json::from_str(&candidate) {
                Ok(raw) => raw,
                Err(e) => {
                    diagnostics.push(format!("{model}: invalid JSON: {e}"));
                    continue;
                }
            };

            match serde_json::from_value::<ExtractedFields>(raw.clone()) {
                Ok(fields) => {
                    // First successful model wins; the rest of the chain is
                    // never tried.
                    tracing::info!(
                        model = %model,
                        elapsed_ms = %start.elapsed().as_millis(),
                        "Field extraction succeeded"
                    );
                    return ExtractionOutcome {
                        data: Some(fields),
                        raw: Some(raw),
                        model_used: Some(model.clone()),
                        error: None,
                    };
                }
                Err(e) => {
                    diagnostics.push(format!("{model}: schema parse failed: {e}"));
                    continue;
                }
            }
        }

        let error = if diagnostics.is_empty() {
            "no models configured".to_string()
        } else {
            diagnostics.join("; ")
        };
        tracing::warn!(error = %error, "All models in the fallback chain failed");

        ExtractionOutcome {
            data: None,
            raw: None,
            model_used: None,
            error: Some(error),
        }
    }
}
