//! Application service layer - use cases, config, export

pub mod app;
pub mod config;
pub mod export;

pub use app::{AnalysisReport, AnalysisStatus, DocumentAnalyzer};
pub use config::Config;
pub use export::{
    build_reconciliation_table, content_disposition, export_request, ExportArtifact, ExportSheet,
    ReconciliationRow,
};
