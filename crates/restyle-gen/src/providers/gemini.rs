//! Gemini image generation provider
//!
//! Sends the source image inline with an instruction and extracts the first
//! inline image from the nested candidate structure of the response. Handles
//! the two accepted spellings of the generation-parameters field: the primary
//! camelCase name first, falling back once to the snake_case alternate when
//! the service rejects the field name.

use crate::provider::{GeneratedImage, GenerationRequest, ImageProvider};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use restyle_core::{RestyleConfig, RestyleError, Result};
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT_SECS: u64 = 120;
/// Responses carry base64 images, so the read limit is generous
const MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;

const PRIMARY_CONFIG_FIELD: &str = "generationConfig";
const ALTERNATE_CONFIG_FIELD: &str = "generation_config";

/// Gemini provider for image-to-image generation
pub struct GeminiProvider {
    api_key: String,
    api_url: String,
    model: String,
    max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl GeminiProvider {
    /// Create a new GeminiProvider from config
    pub fn from_config(config: &RestyleConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let api_url = config
            .service
            .api_url
            .as_deref()
            .unwrap_or(DEFAULT_API_URL)
            .to_string();
        Ok(Self {
            api_key,
            api_url,
            model: config.service.model.clone(),
            max_attempts: config.generation.max_attempts.max(1),
            retry_base_delay_ms: config.generation.retry_base_delay_ms,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.api_url, self.model)
    }

    fn build_payload(
        &self,
        request: &GenerationRequest,
        config_field: &str,
    ) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": request.prompt },
                    {
                        "inlineData": {
                            "mimeType": request.mime,
                            "data": BASE64.encode(&request.image)
                        }
                    }
                ]
            }]
        });
        payload[config_field] = serde_json::json!({
            "responseModalities": ["IMAGE"],
            "imageConfig": {
                "aspectRatio": request.aspect_ratio,
                "imageSize": request.size_class
            }
        });
        payload
    }

    fn post(&self, payload: &serde_json::Value) -> std::result::Result<(u16, String), ureq::Error> {
        let agent = build_agent();
        let mut response = agent
            .post(&self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .send_json(payload)?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_string()?;
        Ok((status, body))
    }
}

fn build_agent() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .http_status_as_error(false)
        .build();
    config.into()
}

/// Transport-level failures worth retrying with backoff. Non-success HTTP
/// statuses are not in this class; they come back as regular responses.
fn is_transient(e: &ureq::Error) -> bool {
    matches!(
        e,
        ureq::Error::Timeout(_)
            | ureq::Error::Io(_)
            | ureq::Error::ConnectionFailed
            | ureq::Error::HostNotFound
    )
}

/// Structured error message from a response body, or the raw body
pub fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Whether a service error means the payload field name was not recognized
pub fn is_unknown_field(message: &str, field: &str) -> bool {
    message.contains("Unknown name") && message.contains(field)
}

/// First inline image payload found anywhere in the nested response
pub fn find_inline_image(value: &serde_json::Value) -> Option<GeneratedImage> {
    match value {
        serde_json::Value::Object(obj) => {
            for key in ["inlineData", "inline_data"] {
                if let Some(inline) = obj.get(key) {
                    if let Some(data) = inline.get("data").and_then(|d| d.as_str()) {
                        if let Ok(bytes) = BASE64.decode(data) {
                            let mime = inline
                                .get("mimeType")
                                .or_else(|| inline.get("mime_type"))
                                .and_then(|m| m.as_str())
                                .unwrap_or("image/png")
                                .to_string();
                            return Some(GeneratedImage { bytes, mime });
                        }
                    }
                }
            }
            obj.values().find_map(find_inline_image)
        }
        serde_json::Value::Array(arr) => arr.iter().find_map(find_inline_image),
        _ => None,
    }
}

impl ImageProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let mut config_field = PRIMARY_CONFIG_FIELD;
        let mut schema_retried = false;
        let mut attempt = 0usize;

        loop {
            let payload = self.build_payload(request, config_field);
            match self.post(&payload) {
                Ok((status, body)) => {
                    if (200..300).contains(&status) {
                        let value: serde_json::Value =
                            serde_json::from_str(&body).map_err(|e| {
                                RestyleError::MalformedResponse(format!(
                                    "Response is not JSON: {}",
                                    e
                                ))
                            })?;
                        return find_inline_image(&value).ok_or_else(|| {
                            RestyleError::MalformedResponse(
                                "No inline image in response".to_string(),
                            )
                        });
                    }

                    let message = extract_error_message(&body);
                    if !schema_retried && is_unknown_field(&message, config_field) {
                        // One immediate retry with the alternate field spelling
                        schema_retried = true;
                        config_field = ALTERNATE_CONFIG_FIELD;
                        continue;
                    }
                    return Err(RestyleError::Service(format!(
                        "HTTP {}: {}",
                        status, message
                    )));
                }
                Err(e) if is_transient(&e) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err(RestyleError::Network(format!(
                            "Request failed after {} attempts: {}",
                            attempt, e
                        )));
                    }
                    let delay = self.retry_base_delay_ms.saturating_mul(attempt as u64);
                    tracing::warn!(attempt, delay_ms = delay, error = %e, "transient network failure, retrying");
                    std::thread::sleep(Duration::from_millis(delay));
                }
                Err(e) => {
                    return Err(RestyleError::Network(format!("Request failed: {}", e)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> GenerationRequest {
        GenerationRequest {
            image: vec![1, 2, 3],
            mime: "image/jpeg".to_string(),
            prompt: "make it watercolor".to_string(),
            size_class: "1K".to_string(),
            aspect_ratio: "4:3".to_string(),
        }
    }

    fn provider() -> GeminiProvider {
        GeminiProvider {
            api_key: "k".to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            model: "gemini-2.5-flash-image".to_string(),
            max_attempts: 3,
            retry_base_delay_ms: 1,
        }
    }

    #[test]
    fn test_payload_primary_and_alternate_fields() {
        let p = provider();
        let primary = p.build_payload(&sample_request(), PRIMARY_CONFIG_FIELD);
        assert!(primary.get("generationConfig").is_some());
        assert!(primary.get("generation_config").is_none());
        assert_eq!(
            primary["generationConfig"]["imageConfig"]["aspectRatio"],
            "4:3"
        );

        let alternate = p.build_payload(&sample_request(), ALTERNATE_CONFIG_FIELD);
        assert!(alternate.get("generation_config").is_some());
        assert!(alternate.get("generationConfig").is_none());
    }

    #[test]
    fn test_payload_carries_inline_source() {
        let p = provider();
        let payload = p.build_payload(&sample_request(), PRIMARY_CONFIG_FIELD);
        let inline = &payload["contents"][0]["parts"][1]["inlineData"];
        assert_eq!(inline["mimeType"], "image/jpeg");
        assert_eq!(inline["data"], BASE64.encode([1u8, 2, 3]));
    }

    #[test]
    fn test_find_inline_image_in_candidates() {
        let data = BASE64.encode(b"fakeimagebytes");
        let response = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "here you go" },
                        { "inlineData": { "mimeType": "image/png", "data": data } }
                    ]
                }
            }]
        });
        let image = find_inline_image(&response).unwrap();
        assert_eq!(image.bytes, b"fakeimagebytes");
        assert_eq!(image.mime, "image/png");
    }

    #[test]
    fn test_find_inline_image_snake_case() {
        let data = BASE64.encode(b"x");
        let response = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{ "inline_data": { "mime_type": "image/jpeg", "data": data } }]
                }
            }]
        });
        let image = find_inline_image(&response).unwrap();
        assert_eq!(image.mime, "image/jpeg");
    }

    #[test]
    fn test_find_inline_image_absent() {
        let response = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "no image, sorry" }] } }]
        });
        assert!(find_inline_image(&response).is_none());
    }

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(extract_error_message(body), "Quota exceeded");
        assert_eq!(extract_error_message("plain text failure"), "plain text failure");
    }

    #[test]
    fn test_unknown_field_detection() {
        let msg = r#"Invalid JSON payload received. Unknown name "generationConfig": Cannot find field."#;
        assert!(is_unknown_field(msg, "generationConfig"));
        assert!(!is_unknown_field(msg, "generation_config"));
        assert!(!is_unknown_field("Quota exceeded", "generationConfig"));
    }
}
