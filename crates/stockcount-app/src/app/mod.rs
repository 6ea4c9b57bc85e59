//! Use cases

pub mod analysis_service;

pub use analysis_service::{
    build_extractor, build_recognizer, AnalysisReport, AnalysisStatus, DocumentAnalyzer,
    NO_TEXT_MESSAGE,
};
