//! OCR backend that talks to a PaddleOCR-style HTTP service
//!
//! Endpoints:
//! - `GET  /health` → `{"gpu_available": bool}`
//! - `POST /init`   → loads the model for `{use_gpu, use_angle_cls, lang}`
//! - `POST /ocr`    → `{"lines": [{"text", "score", "box"}] | null}`

use base64::{engine::general_purpose, Engine as _};
use image::{ImageFormat, RgbImage};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::time::Duration;
use stockcount_types::{Error, HardwareMode, OcrLine, Result};
use tracing::debug;

use super::{OcrBackend, OcrBackendFactory};

/// Chinese model, which also covers the Latin digits and codes on count sheets
pub const DEFAULT_LANG: &str = "ch";

#[derive(Serialize)]
struct InitRequest<'a> {
    use_gpu: bool,
    use_angle_cls: bool,
    lang: &'a str,
}

#[derive(Serialize)]
struct OcrRequest<'a> {
    image_base64: String,
    use_gpu: bool,
    use_angle_cls: bool,
    lang: &'a str,
}

#[derive(Deserialize)]
struct HealthResponse {
    #[serde(default)]
    gpu_available: bool,
}

/// Single recognized line with its bounding quadrilateral
#[derive(Deserialize)]
struct TextLine {
    text: String,
    #[serde(default)]
    score: Option<f32>,
    #[serde(rename = "box", default)]
    bbox: Option<Vec<[f32; 2]>>,
}

#[derive(Deserialize)]
struct OcrResponse {
    #[serde(default)]
    lines: Option<Vec<TextLine>>,
}

/// Creates `HttpOcrBackend`s against one OCR service
#[derive(Debug, Clone)]
pub struct HttpOcrBackendFactory {
    base_url: String,
    timeout: Duration,
    lang: String,
}

impl HttpOcrBackendFactory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            lang: DEFAULT_LANG.to_string(),
        }
    }

    /// Recognition language passed to `/init` and `/ocr`; blank keeps the default
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        let lang = lang.into();
        if !lang.trim().is_empty() {
            self.lang = lang.trim().to_string();
        }
        self
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    fn client(&self, mode: HardwareMode) -> Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Recognition {
                mode,
                message: format!("Failed to create HTTP client: {}", e),
            })
    }
}

impl OcrBackendFactory for HttpOcrBackendFactory {
    fn accelerator_available(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        let probe = self
            .client(HardwareMode::Cpu)
            .ok()
            .and_then(|client| client.get(&url).send().ok())
            .filter(|response| response.status().is_success())
            .and_then(|response| response.json::<HealthResponse>().ok());

        match probe {
            Some(health) => health.gpu_available,
            None => {
                debug!(url = %url, "health probe failed; assuming no accelerator");
                false
            }
        }
    }

    fn create(&self, mode: HardwareMode) -> Result<Box<dyn OcrBackend>> {
        let client = self.client(mode)?;
        let url = format!("{}/init", self.base_url);
        let request = InitRequest {
            use_gpu: mode == HardwareMode::Gpu,
            use_angle_cls: true,
            lang: &self.lang,
        };

        let response = client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| Error::Recognition {
                mode,
                message: format!("Model init request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Recognition {
                mode,
                message: format!("Model init rejected ({}): {}", status, body),
            });
        }

        Ok(Box::new(HttpOcrBackend {
            client,
            base_url: self.base_url.clone(),
            lang: self.lang.clone(),
            mode,
        }))
    }
}

/// OCR backend bound to one execution mode of the remote service
pub struct HttpOcrBackend {
    client: Client,
    base_url: String,
    lang: String,
    mode: HardwareMode,
}

impl HttpOcrBackend {
    fn encode_image(&self, image: &RgbImage) -> Result<String> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| Error::Encode(e.to_string()))?;
        Ok(general_purpose::STANDARD.encode(&buffer))
    }

    fn failure(&self, message: String) -> Error {
        Error::Recognition {
            mode: self.mode,
            message,
        }
    }
}

impl OcrBackend for HttpOcrBackend {
    fn mode(&self) -> HardwareMode {
        self.mode
    }

    fn recognize(&self, image: &RgbImage) -> Result<Option<Vec<OcrLine>>> {
        let request = OcrRequest {
            image_base64: self.encode_image(image)?,
            use_gpu: self.mode == HardwareMode::Gpu,
            use_angle_cls: true,
            lang: &self.lang,
        };
        let url = format!("{}/ocr", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| self.failure(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let body = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(self.failure(format!("OCR server error: {}", body)));
        }

        let data: OcrResponse = response
            .json()
            .map_err(|e| self.failure(format!("Failed to parse response: {}", e)))?;

        Ok(data.lines.map(into_ocr_lines))
    }
}

fn into_ocr_lines(lines: Vec<TextLine>) -> Vec<OcrLine> {
    lines
        .into_iter()
        .map(|line| OcrLine {
            text: line.text,
            confidence: line.score,
            bbox: line.bbox,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_with_lines() {
        let json = r#"{"lines": [
            {"text": "三合店", "score": 0.99, "box": [[0,0],[10,0],[10,5],[0,5]]},
            {"text": "纸巾", "score": 0.87}
        ]}"#;
        let data: OcrResponse = serde_json::from_str(json).unwrap();
        let lines = into_ocr_lines(data.lines.unwrap());

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "三合店");
        assert_eq!(lines[0].bbox.as_ref().map(Vec::len), Some(4));
        assert_eq!(lines[1].confidence, Some(0.87));
        assert!(lines[1].bbox.is_none());
    }

    #[test]
    fn test_null_lines_stay_null() {
        let data: OcrResponse = serde_json::from_str(r#"{"lines": null}"#).unwrap();
        assert!(data.lines.is_none());

        let data: OcrResponse = serde_json::from_str("{}").unwrap();
        assert!(data.lines.is_none());
    }

    #[test]
    fn test_factory_trims_trailing_slash() {
        let factory = HttpOcrBackendFactory::new("http://localhost:8866/", Duration::from_secs(1));
        assert_eq!(factory.base_url, "http://localhost:8866");
    }

    #[test]
    fn test_lang_defaults_to_chinese() {
        let factory = HttpOcrBackendFactory::new("http://localhost:8866", Duration::from_secs(1));
        assert_eq!(factory.lang(), DEFAULT_LANG);

        let factory = factory.with_lang(" en ");
        assert_eq!(factory.lang(), "en");

        let factory = factory.with_lang("");
        assert_eq!(factory.lang(), "en");
    }

    #[test]
    fn test_init_request_carries_lang() {
        let request = InitRequest {
            use_gpu: false,
            use_angle_cls: true,
            lang: "japan",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["lang"], "japan");
        assert_eq!(json["use_gpu"], false);
    }

    #[test]
    fn test_unreachable_service_reports_no_accelerator() {
        // Port 9 (discard) is not expected to host an OCR service
        let factory = HttpOcrBackendFactory::new("http://127.0.0.1:9", Duration::from_millis(200));
        assert!(!factory.accelerator_available());
    }
}
