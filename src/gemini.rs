use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::data_uri::DataUri;
use crate::types::AspectRatio;

static WRAPPING_QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^["']|["']$"#).expect("quote pattern is valid"));
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```(?:json|text)?|```$").expect("fence pattern is valid"));

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    image_config: ImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: AspectRatio,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    fn text(&self) -> String {
        self.first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }

    /// First inline image as a data URI. Safety blocks without an image are errors.
    fn image(&self) -> Result<Option<String>> {
        let found = self.first_parts().iter().find_map(|p| {
            p.inline_data
                .as_ref()
                .filter(|d| !d.data.is_empty())
                .map(|d| DataUri::new(Some(d.mime_type.as_str()), d.data.clone()).to_uri())
        });
        if found.is_some() {
            return Ok(found);
        }

        if let Some(reason) = self.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref()) {
            return Err(anyhow::anyhow!("Request blocked by Gemini: {}", reason));
        }
        if let Some(reason) = self.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
            if reason.contains("SAFETY") {
                return Err(anyhow::anyhow!("Generation stopped by Gemini: {}", reason));
            }
        }

        tracing::warn!("no image data found in response");
        Ok(None)
    }
}

fn image_request(prompt: &str, aspect_ratio: AspectRatio, reference: Option<&str>) -> GenerateContentRequest {
    let mut parts = Vec::new();

    if let Some(reference) = reference {
        match DataUri::parse(reference) {
            Some(uri) => parts.push(Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: uri.mime_type,
                    data: uri.payload,
                }),
            }),
            None => tracing::warn!("failed to parse reference image, proceeding with text only"),
        }
    }

    parts.push(Part {
        text: Some(prompt.to_string()),
        inline_data: None,
    });

    GenerateContentRequest {
        contents: vec![Content { role: None, parts }],
        generation_config: Some(GenerationConfig {
            image_config: ImageConfig { aspect_ratio },
        }),
    }
}

pub fn enhancement_instructions(original_prompt: &str) -> String {
    format!(
        "You are an expert AI art prompt assistant.
Your task is to take the following user idea and expand it into a highly detailed, professional image generation prompt.

User Input: \"{}\"

Guidelines:
1. Add specific details about lighting (e.g., cinematic, golden hour, neon).
2. Describe the style (e.g., photorealistic, oil painting, 3D render, anime).
3. Mention textures, background, and camera angles.
4. IMPORTANT: Output the result in the SAME LANGUAGE as the User Input (Arabic if Arabic, English if English).
5. Output ONLY the enhanced prompt text, no explanations.
6. Keep it concise but rich (max 50-60 words).
7. Do NOT surround the output with quotes.",
        original_prompt
    )
}

/// Strips wrapping quotes and code fences the model sometimes adds anyway.
pub fn clean_enhancement(raw: &str) -> Option<String> {
    let unquoted = WRAPPING_QUOTES.replace_all(raw.trim(), "");
    let unfenced = CODE_FENCE.replace_all(&unquoted, "");
    let cleaned = unfenced.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// The remote operations the coordinator depends on.
#[async_trait]
pub trait ImageService: Send + Sync {
    async fn request_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        reference: Option<&str>,
    ) -> Result<Option<String>>;

    async fn request_enhancement(&self, prompt: &str) -> Result<Option<String>>;
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    image_model: String,
    text_model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn with_config(config: &GeminiConfig) -> Self {
        GeminiClient {
            base_url: config.host.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            image_model: config.image_model.clone(),
            text_model: config.text_model.clone(),
            client: reqwest::Client::new(),
        }
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    async fn generate_content(&self, model: &str, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        tracing::debug!(%url, "sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Gemini API error ({}): {}", status, body));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ImageService for GeminiClient {
    async fn request_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        reference: Option<&str>,
    ) -> Result<Option<String>> {
        let request = image_request(prompt, aspect_ratio, reference);
        let response = self.generate_content(&self.image_model, &request).await?;
        response.image()
    }

    async fn request_enhancement(&self, prompt: &str) -> Result<Option<String>> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: vec![Part {
                    text: Some(enhancement_instructions(prompt)),
                    inline_data: None,
                }],
            }],
            generation_config: None,
        };
        let response = self.generate_content(&self.text_model, &request).await?;
        Ok(clean_enhancement(&response.text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::with_config(&GeminiConfig {
            host: server.uri(),
            api_key: "test-key".to_string(),
            ..GeminiConfig::default()
        })
    }

    #[test]
    fn test_image_request_with_reference() {
        let request = image_request("a cat", AspectRatio::Wide, Some("data:image/jpeg;base64,QUJD"));
        let value = serde_json::to_value(&request).unwrap();

        let parts = &value["contents"][0]["parts"];
        assert_eq!(parts.as_array().unwrap().len(), 2);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "QUJD");
        assert_eq!(parts[1]["text"], "a cat");
        assert_eq!(value["generationConfig"]["imageConfig"]["aspectRatio"], "16:9");
    }

    #[test]
    fn test_malformed_reference_is_dropped() {
        let request = image_request("a cat", AspectRatio::Square, Some("not a data uri"));
        let value = serde_json::to_value(&request).unwrap();

        let parts = value["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0], json!({ "text": "a cat" }));
    }

    #[test]
    fn test_response_image_defaults_mime() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "Here you go" },
                    { "inlineData": { "data": "AAAA" } },
                    { "inlineData": { "mimeType": "image/jpeg", "data": "BBBB" } }
                ]}
            }]
        }))
        .unwrap();

        assert_eq!(response.image().unwrap().as_deref(), Some("data:image/png;base64,AAAA"));
    }

    #[test]
    fn test_response_without_image() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "I can't draw that" }] }, "finishReason": "STOP" }]
        }))
        .unwrap();
        assert_eq!(response.image().unwrap(), None);

        let empty = GenerateContentResponse::default();
        assert_eq!(empty.image().unwrap(), None);
    }

    #[test]
    fn test_response_safety_block_is_error() {
        let blocked: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        assert!(blocked.image().unwrap_err().to_string().contains("SAFETY"));

        let stopped: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "IMAGE_SAFETY" }]
        }))
        .unwrap();
        assert!(stopped.image().unwrap_err().to_string().contains("SAFETY"));
    }

    #[test]
    fn test_clean_enhancement() {
        assert_eq!(clean_enhancement("\"a cat\"").as_deref(), Some("a cat"));
        assert_eq!(clean_enhancement("  'a dog'  ").as_deref(), Some("a dog"));
        assert_eq!(clean_enhancement("```text\nA red fox\n```").as_deref(), Some("A red fox"));
        assert_eq!(clean_enhancement("```\nA red fox\n```").as_deref(), Some("A red fox"));
        assert_eq!(clean_enhancement("plain words").as_deref(), Some("plain words"));
        assert_eq!(clean_enhancement("  \"\" "), None);
    }

    #[test]
    fn test_enhancement_instructions_embed_prompt() {
        let text = enhancement_instructions("قطة");
        assert!(text.contains("User Input: \"قطة\""));
        assert!(text.contains("SAME LANGUAGE"));
        assert!(text.contains("50-60 words"));
    }

    #[tokio::test]
    async fn test_request_image_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash-image:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgo=" } }
                ]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client
            .request_image("a lighthouse", AspectRatio::Portrait, None)
            .await
            .unwrap();
        assert_eq!(url.as_deref(), Some("data:image/png;base64,iVBORw0KGgo="));
    }

    #[tokio::test]
    async fn test_request_image_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("You exceeded your current quota"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .request_image("a lighthouse", AspectRatio::Square, None)
            .await
            .unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("429"));
        assert!(message.contains("quota"));
    }

    #[tokio::test]
    async fn test_request_enhancement() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "role": "model", "parts": [
                    { "text": "\"A lighthouse at golden hour, oil painting\"" }
                ]}}]
            })))
            .mount(&server)
            .await;

        let enhanced = client_for(&server).request_enhancement("lighthouse").await.unwrap();
        assert_eq!(enhanced.as_deref(), Some("A lighthouse at golden hour, oil painting"));
    }
}
