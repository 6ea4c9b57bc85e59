//! AI structuring of OCR text

pub mod completion;
pub mod extraction;
pub mod prompts;
