//! Google Vision API (REST) によるOCR

use crate::config::{OcrConfig, VISION_KEY_ENV};
use crate::error::{LeaderboardError, Result};
use crate::ocr::OcrEngine;
use base64::Engine as _;
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;

const VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

pub struct VisionEngine {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl VisionEngine {
    pub fn from_config(config: &OcrConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        let api_key = config.get_vision_api_key();
        if api_key.is_none() {
            log::warn!(
                "Vision APIキーが未設定です（{} または ocr.vision_api_key）",
                VISION_KEY_ENV
            );
        }

        Ok(Self {
            client,
            api_key,
            endpoint: VISION_ENDPOINT.to_string(),
        })
    }
}

/// `images:annotate` のリクエスト本文
pub fn build_request(image: &[u8]) -> Value {
    let content = base64::engine::general_purpose::STANDARD.encode(image);
    json!({
        "requests": [{
            "image": { "content": content },
            "features": [{ "type": "TEXT_DETECTION" }]
        }]
    })
}

/// レスポンスから全文を取り出す（文字が無ければ空文字列）
pub fn extract_text(response: &Value) -> Result<String> {
    let first = &response["responses"][0];

    if let Some(message) = first["error"]["message"].as_str() {
        return Err(LeaderboardError::ocr("vision", message));
    }
    if let Some(message) = response["error"]["message"].as_str() {
        return Err(LeaderboardError::ocr("vision", message));
    }

    Ok(first["fullTextAnnotation"]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string())
}

impl OcrEngine for VisionEngine {
    fn name(&self) -> &str {
        "vision"
    }

    fn extract(&self, image: &[u8]) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| LeaderboardError::OcrUnavailable("Vision APIキーが未設定です".into()))?;

        let response = self
            .client
            .post(format!("{}?key={}", self.endpoint, api_key))
            .json(&build_request(image))
            .send()?;

        let status = response.status();
        let body: Value = response.json()?;
        if !status.is_success() {
            let detail = extract_text(&body)
                .err()
                .map(|e| e.to_string())
                .unwrap_or_else(|| status.to_string());
            return Err(LeaderboardError::ocr(self.name(), detail));
        }

        extract_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request() {
        let request = build_request(b"abc");
        assert_eq!(request["requests"][0]["image"]["content"], "YWJj");
        assert_eq!(
            request["requests"][0]["features"][0]["type"],
            "TEXT_DETECTION"
        );
    }

    #[test]
    fn test_extract_text() {
        let response = json!({
            "responses": [{ "fullTextAnnotation": { "text": "PEiPEi\nDamage Points: 1,000" } }]
        });
        assert_eq!(
            extract_text(&response).unwrap(),
            "PEiPEi\nDamage Points: 1,000"
        );
    }

    #[test]
    fn test_extract_text_without_annotation_is_empty() {
        assert_eq!(extract_text(&json!({ "responses": [{}] })).unwrap(), "");
        assert_eq!(extract_text(&json!({})).unwrap(), "");
    }

    #[test]
    fn test_extract_text_error() {
        let response = json!({ "responses": [{ "error": { "code": 3, "message": "Bad image data." } }] });
        let err = extract_text(&response).unwrap_err();
        assert!(err.to_string().contains("Bad image data."));
    }

    #[test]
    fn test_missing_key_is_unavailable() {
        let engine = VisionEngine {
            client: Client::new(),
            api_key: None,
            endpoint: VISION_ENDPOINT.to_string(),
        };
        assert!(matches!(
            engine.extract(b"img"),
            Err(LeaderboardError::OcrUnavailable(_))
        ));
    }
}
