//! Vision module - seal segmentation, OCR and AI structuring of count sheets

pub mod ai;
pub mod ocr;
pub mod seal;

// Re-export main types for convenience
pub use ai::completion::{
    ChatCompletionClient, ChatCompletionConfig, CompletionRequest, CompletionService,
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
pub use ai::extraction::{extract_json_from_response, parse_model_output, StructuredExtractor};
pub use ai::prompts::{build_extraction_prompt, SYSTEM_PROMPT};
pub use ocr::{
    lines_to_text, HttpOcrBackendFactory, OcrBackend, OcrBackendFactory, TextRecognizer,
    DEFAULT_LANG, DEFAULT_MAX_SIDE,
};
pub use seal::extract_seal;
