// src/lookup.rs - Generative-AI product identification
//
// Given a barcode (with search grounding) or a product photo, the model
// returns a structured {name, brand, category} suggestion used to pre-fill
// the entry form. The model answers with JSON text that may arrive wrapped
// in markdown code fences.
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::LookupConfig;
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductSuggestion {
    pub name: String,
    pub brand: Option<String>,
    pub category: String,
    pub search_source_urls: Option<Vec<String>>,
}

#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn identify_by_barcode(&self, barcode: &str) -> Result<ProductSuggestion, ApiError>;
    async fn identify_by_image(&self, jpeg_base64: &str) -> Result<ProductSuggestion, ApiError>;
}

fn lookup_err(e: impl std::fmt::Display) -> ApiError {
    ApiError::LookupError(e.to_string())
}

pub struct GeminiLookup {
    http: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl GeminiLookup {
    /// `None` when no API key is configured; the lookup surface then reports
    /// itself as unavailable instead of failing mid-request.
    pub fn from_config(config: &LookupConfig) -> Option<Self> {
        if config.api_key.trim().is_empty() {
            return None;
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .ok()?;
        Some(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn generate(&self, body: serde_json::Value) -> Result<serde_json::Value, ApiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(lookup_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::LookupError(format!(
                "Model endpoint answered {}",
                status
            )));
        }
        response.json().await.map_err(lookup_err)
    }

    fn suggestion_schema() -> serde_json::Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "name": {"type": "STRING", "description": "Commercial name of the product"},
                "brand": {"type": "STRING", "description": "Brand or manufacturer"},
                "category": {"type": "STRING", "description": "General category"}
            },
            "required": ["name", "category"]
        })
    }
}

#[async_trait]
impl ProductLookup for GeminiLookup {
    async fn identify_by_barcode(&self, barcode: &str) -> Result<ProductSuggestion, ApiError> {
        let prompt = format!(
            "Identify the product with barcode \"{}\". Return the product's \
             common name, its brand (manufacturer) and its general category \
             (e.g. Dairy, Beverages, Hygiene).",
            barcode
        );
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "tools": [{"googleSearch": {}}],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": Self::suggestion_schema(),
            }
        });

        let response = self.generate(body).await?;
        let text = response_text(&response)
            .ok_or_else(|| ApiError::LookupError("Empty model response".to_string()))?;
        let mut suggestion = parse_suggestion(&text)?;
        let urls = grounding_urls(&response);
        if !urls.is_empty() {
            suggestion.search_source_urls = Some(urls);
        }
        Ok(suggestion)
    }

    async fn identify_by_image(&self, jpeg_base64: &str) -> Result<ProductSuggestion, ApiError> {
        let body = json!({
            "contents": [{"parts": [
                {"inlineData": {"mimeType": "image/jpeg", "data": jpeg_base64}},
                {"text": "Identify this product. If a barcode is visible, read it. \
                          Return the product name, brand and category as JSON with \
                          the keys: name, brand, category."}
            ]}],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": Self::suggestion_schema(),
            }
        });

        let response = self.generate(body).await?;
        let text = response_text(&response)
            .ok_or_else(|| ApiError::LookupError("Empty model response".to_string()))?;

        // Vision answers are less reliable; fall back to the raw text as a
        // name instead of rejecting the scan outright.
        Ok(parse_suggestion(&text).unwrap_or_else(|_| ProductSuggestion {
            name: text.chars().take(100).collect(),
            brand: None,
            category: "Detected from image".to_string(),
            search_source_urls: None,
        }))
    }
}

// ==================== RESPONSE PARSING ====================

/// Concatenated text parts of the first candidate.
fn response_text(response: &serde_json::Value) -> Option<String> {
    let parts = response
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Website URLs from the first candidate's grounding chunks.
fn grounding_urls(response: &serde_json::Value) -> Vec<String> {
    response
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("groundingMetadata"))
        .and_then(|m| m.get("groundingChunks"))
        .and_then(|chunks| chunks.as_array())
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|chunk| chunk.get("web")?.get("uri")?.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// The model occasionally wraps its JSON answer in ```json fences.
fn strip_code_fences(text: &str) -> String {
    let mut cleaned = text.to_string();
    for fence in ["```json", "```JSON", "```"] {
        cleaned = cleaned.replace(fence, "");
    }
    cleaned.trim().to_string()
}

fn parse_suggestion(text: &str) -> Result<ProductSuggestion, ApiError> {
    let cleaned = strip_code_fences(text);

    #[derive(Deserialize)]
    struct RawSuggestion {
        name: String,
        #[serde(default)]
        brand: Option<String>,
        category: String,
    }

    let raw: RawSuggestion = serde_json::from_str(&cleaned)
        .map_err(|e| ApiError::LookupError(format!("Unparseable model answer: {}", e)))?;
    Ok(ProductSuggestion {
        name: raw.name,
        brand: raw.brand,
        category: raw.category,
        search_source_urls: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(
            strip_code_fences("```json\n{\"a\":1}\n```"),
            "{\"a\":1}"
        );
    }

    #[test]
    fn test_parse_suggestion() {
        let suggestion =
            parse_suggestion("```json\n{\"name\": \"Milk\", \"category\": \"Dairy\"}\n```")
                .unwrap();
        assert_eq!(suggestion.name, "Milk");
        assert_eq!(suggestion.brand, None);
        assert_eq!(suggestion.category, "Dairy");

        assert!(parse_suggestion("the product is probably milk").is_err());
    }

    #[test]
    fn test_response_text_and_grounding_urls() {
        let response = serde_json::json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "{\"name\": \"Milk\","},
                    {"text": " \"category\": \"Dairy\"}"}
                ]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://example.com/milk"}},
                    {"retrievedContext": {}}
                ]}
            }]
        });

        let text = response_text(&response).unwrap();
        assert_eq!(parse_suggestion(&text).unwrap().name, "Milk");
        assert_eq!(grounding_urls(&response), vec!["https://example.com/milk"]);

        assert_eq!(response_text(&serde_json::json!({"candidates": []})), None);
    }
}
