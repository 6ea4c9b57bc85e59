//! End-to-end tests: page photo → rows → reconciliation workbook

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::PathBuf;
use stockcount_app::{export_request, Config, DocumentAnalyzer};
use stockcount_types::{Classification, DevicePreference, HardwareMode, OcrLine, Result};
use stockcount_vision::{
    CompletionRequest, CompletionService, OcrBackend, OcrBackendFactory, StructuredExtractor,
    TextRecognizer,
};

/// GPU backend that silently returns nothing, CPU backend that reads the page
struct FlakyGpuFactory;

struct PageBackend {
    mode: HardwareMode,
}

impl OcrBackend for PageBackend {
    fn mode(&self) -> HardwareMode {
        self.mode
    }

    fn recognize(&self, _image: &RgbImage) -> Result<Option<Vec<OcrLine>>> {
        match self.mode {
            HardwareMode::Gpu => Ok(None),
            HardwareMode::Cpu => Ok(Some(
                ["仁厚店", "纸巾 盒 6 √", "矿泉水 20 18+6", "洗洁精 5 未盘"]
                    .into_iter()
                    .map(OcrLine::new)
                    .collect(),
            )),
        }
    }
}

impl OcrBackendFactory for FlakyGpuFactory {
    fn accelerator_available(&self) -> bool {
        true
    }

    fn create(&self, mode: HardwareMode) -> Result<Box<dyn OcrBackend>> {
        Ok(Box::new(PageBackend { mode }))
    }
}

/// Model that echoes raw cell text instead of resolving it
struct EchoingModel;

impl CompletionService for EchoingModel {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        assert!(request.prompt.contains("矿泉水 20 18+6"));
        Ok(r#"Here is the table:
```json
{"status": "success", "data": {"store_name": "仁厚店", "items": [
  {"code": "DEFAULT", "name": "纸巾", "system_stock": "盒 6", "actual_count": "√"},
  {"code": "A02", "name": "矿泉水", "system_stock": 20, "actual_count": "18+6"},
  {"code": null, "name": "洗洁精", "system_stock": 5, "actual_count": "未盘"},
  {"code": "A04", "name": "", "system_stock": 1, "actual_count": 1}
]}}
```"#
            .to_string())
    }
}

fn page_photo() -> Vec<u8> {
    let mut buffer = Vec::new();
    RgbImage::from_pixel(64, 48, Rgb([250, 250, 250]))
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

fn analyzer() -> DocumentAnalyzer {
    let recognizer =
        TextRecognizer::new(Box::new(FlakyGpuFactory), DevicePreference::Auto).unwrap();
    let extractor = StructuredExtractor::new(Box::new(EchoingModel));
    DocumentAnalyzer::new(recognizer, extractor)
}

#[test]
fn test_photo_to_reconciliation_workbook() {
    let analyzer = analyzer();
    assert_eq!(analyzer.recognizer().current_mode(), HardwareMode::Gpu);

    let report = analyzer.analyze_document(&page_photo(), "renhou.jpg").unwrap();
    assert!(report.is_success());
    assert_eq!(analyzer.recognizer().current_mode(), HardwareMode::Cpu);

    let sheet = report.data.clone().unwrap();
    assert_eq!(sheet.store_name, "仁厚店");
    assert_eq!(sheet.items.len(), 3);

    let tissue = &sheet.items[0];
    assert_eq!(tissue.unit.as_deref(), Some("盒"));
    assert_eq!(tissue.system_stock, Some(6.0));
    assert_eq!(tissue.actual_count, Some(6.0));
    assert_eq!(sheet.items[1].actual_count, Some(24.0));
    assert_eq!(sheet.items[2].actual_count, None);
    assert!(sheet.items[2].has_default_code());

    // The export step accepts the analyze response body verbatim
    let body = serde_json::to_value(&report).unwrap();
    let artifact = export_request(&body).unwrap();

    let classes: Vec<Classification> = artifact.rows.iter().map(|r| r.classification).collect();
    assert_eq!(
        classes,
        vec![
            Classification::Matched,
            Classification::Mismatched,
            Classification::Missing
        ]
    );
    assert_eq!(artifact.filename, "仁厚店_导出.xlsx");
    assert!(artifact.bytes.starts_with(b"PK\x03\x04"));
    assert!(artifact
        .content_disposition()
        .starts_with("attachment; filename*=utf-8''%E4%BB%81"));
}

#[test]
fn test_workbook_written_to_disk() {
    let report = analyzer().analyze_document(&page_photo(), "renhou.jpg").unwrap();
    let artifact = export_request(&serde_json::to_value(&report).unwrap()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(&artifact.filename);
    std::fs::write(&path, &artifact.bytes).unwrap();

    let written = std::fs::read(&path).unwrap();
    assert_eq!(written.len(), artifact.bytes.len());
}

fn test_image_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("count_sheet.jpg")
}

/// Against live OCR and completion services configured locally
#[test]
#[ignore] // Run with: cargo test -- --ignored
fn test_live_services() {
    let image_path = test_image_path();
    assert!(image_path.exists(), "Test image not found: {:?}", image_path);

    let config = Config::load_with_env().unwrap();
    let analyzer = DocumentAnalyzer::from_config(&config).unwrap();
    let bytes = std::fs::read(&image_path).unwrap();

    let report = analyzer.analyze_document(&bytes, "count_sheet.jpg").unwrap();
    println!("{}", serde_json::to_string_pretty(&report).unwrap());
    assert!(report.is_success(), "Analysis failed: {:?}", report.message);
}
