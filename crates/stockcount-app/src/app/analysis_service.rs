//! Analysis Service - Core Use Case for Count-Sheet Digitization
//!
//! This service orchestrates the complete analysis workflow:
//! 1. Recognize text in the page photo (with GPU→CPU fallback)
//! 2. Stop early when the page has no text at all
//! 3. Structure the text into inventory rows via the completion service
//! 4. Return rows plus the raw text so callers can fall back to it

use crate::config::Config;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use stockcount_types::{InventorySheet, ParseOutcome, Result};
use stockcount_vision::{
    ChatCompletionClient, ChatCompletionConfig, HttpOcrBackendFactory, StructuredExtractor,
    TextRecognizer,
};
use tracing::info;

/// Message returned when OCR finds no text on the page
pub const NO_TEXT_MESSAGE: &str = "未识别到任何文字";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Success,
    /// Nothing recognizable on the page
    Failed,
}

/// Result of analyzing one page photo
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub status: AnalysisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<InventorySheet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    /// Why `data` is absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub elapsed_ms: u64,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisReport {
    pub fn is_success(&self) -> bool {
        self.status == AnalysisStatus::Success
    }
}

fn ocr_factory(config: &Config) -> HttpOcrBackendFactory {
    HttpOcrBackendFactory::new(&config.ocr_url, config.request_timeout())
        .with_lang(&config.ocr_lang)
}

/// Build the OCR side from configuration
pub fn build_recognizer(config: &Config) -> Result<TextRecognizer> {
    let factory = ocr_factory(config);
    Ok(TextRecognizer::new(Box::new(factory), config.device)?.with_max_side(config.max_side))
}

/// Build the structuring side from configuration; needs an API key.
pub fn build_extractor(config: &Config) -> Result<StructuredExtractor> {
    let client = ChatCompletionClient::new(ChatCompletionConfig {
        api_key: config.require_api_key()?.to_string(),
        base_url: config.base_url.clone(),
        model: config.model.clone(),
        timeout: config.request_timeout(),
    })?;
    Ok(StructuredExtractor::new(Box::new(client))
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens))
}

/// Page photo → structured rows
pub struct DocumentAnalyzer {
    recognizer: TextRecognizer,
    extractor: StructuredExtractor,
}

impl DocumentAnalyzer {
    pub fn new(recognizer: TextRecognizer, extractor: StructuredExtractor) -> Self {
        Self {
            recognizer,
            extractor,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(build_recognizer(config)?, build_extractor(config)?))
    }

    pub fn recognizer(&self) -> &TextRecognizer {
        &self.recognizer
    }

    /// Run OCR and structuring on one image.
    ///
    /// Decode and recognition failures are errors. A page without text and
    /// an extraction failure are both reported inside the `AnalysisReport`.
    pub fn analyze_document(&self, image_bytes: &[u8], filename: &str) -> Result<AnalysisReport> {
        let started = Instant::now();
        info!(filename, bytes = image_bytes.len(), "analyzing document");

        let raw_text = self.recognizer.extract_text(image_bytes)?;

        if raw_text.trim().is_empty() {
            info!(filename, "no text recognized");
            return Ok(AnalysisReport {
                status: AnalysisStatus::Failed,
                filename: None,
                data: None,
                raw_text: None,
                message: Some(NO_TEXT_MESSAGE.to_string()),
                elapsed_ms: started.elapsed().as_millis() as u64,
                analyzed_at: Utc::now(),
            });
        }

        let ParseOutcome { data, message, .. } = self.extractor.parse_content(&raw_text);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            filename,
            rows = data.as_ref().map_or(0, |sheet| sheet.items.len()),
            elapsed_ms,
            "analysis finished"
        );

        Ok(AnalysisReport {
            status: AnalysisStatus::Success,
            filename: Some(filename.to_string()),
            data,
            raw_text: Some(raw_text),
            message,
            elapsed_ms,
            analyzed_at: Utc::now(),
        })
    }
}
