//! Text recognition with GPU→CPU fallback
//!
//! Accelerator inference can silently return nothing under some driver and
//! runtime conditions. The only observable symptom is an unexpectedly empty
//! result, so a `TextRecognizer` in GPU mode that gets an empty result
//! switches its backend to CPU and retries that call once. The switch is
//! permanent for the recognizer instance.

pub mod http_backend;
pub mod preprocess;

pub use http_backend::{HttpOcrBackend, HttpOcrBackendFactory, DEFAULT_LANG};
pub use preprocess::{fit_within, DEFAULT_MAX_SIDE};

use image::RgbImage;
use parking_lot::Mutex;
use stockcount_types::{DevicePreference, Error, HardwareMode, OcrLine, Result};
use tracing::{debug, info, warn};

/// A loaded OCR model bound to one execution mode.
pub trait OcrBackend: Send {
    /// Mode the model actually runs in, which may differ from the one requested
    fn mode(&self) -> HardwareMode;

    /// Recognize text lines in reading order.
    ///
    /// `Ok(None)` is a structurally null result, which is distinct from an
    /// error raised by the backend.
    fn recognize(&self, image: &RgbImage) -> Result<Option<Vec<OcrLine>>>;
}

/// Builds backends; one factory lives as long as its recognizer.
pub trait OcrBackendFactory: Send + Sync {
    /// Whether accelerator hardware is usable (consulted once, at startup)
    fn accelerator_available(&self) -> bool;

    fn create(&self, mode: HardwareMode) -> Result<Box<dyn OcrBackend>>;
}

/// Recognizes text in page photos.
///
/// The active backend is shared mutable state: the lock is held across
/// "read mode, maybe reinitialize, invoke" so concurrent callers never load
/// the CPU model twice.
pub struct TextRecognizer {
    factory: Box<dyn OcrBackendFactory>,
    backend: Mutex<Box<dyn OcrBackend>>,
    max_side: u32,
}

impl TextRecognizer {
    pub fn new(factory: Box<dyn OcrBackendFactory>, device: DevicePreference) -> Result<Self> {
        let requested = match device {
            DevicePreference::Gpu => HardwareMode::Gpu,
            DevicePreference::Cpu => HardwareMode::Cpu,
            DevicePreference::Auto => {
                if factory.accelerator_available() {
                    HardwareMode::Gpu
                } else {
                    HardwareMode::Cpu
                }
            }
        };

        let backend = init_backend(factory.as_ref(), requested)?;
        info!(mode = %backend.mode(), "OCR backend ready");

        Ok(Self {
            factory,
            backend: Mutex::new(backend),
            max_side: DEFAULT_MAX_SIDE,
        })
    }

    pub fn with_max_side(mut self, max_side: u32) -> Self {
        self.max_side = max_side;
        self
    }

    /// Mode of the backend currently in use
    pub fn current_mode(&self) -> HardwareMode {
        self.backend.lock().mode()
    }

    /// Decode `image_bytes` and return recognized lines joined by newlines.
    ///
    /// An empty string means no text was found; undecodable input is an error.
    pub fn extract_text(&self, image_bytes: &[u8]) -> Result<String> {
        let image = image::load_from_memory(image_bytes)
            .map_err(|e| Error::Decode(e.to_string()))?
            .to_rgb8();
        debug!(width = image.width(), height = image.height(), "image decoded");

        let image = fit_within(image, self.max_side);
        let lines = self.recognize(&image)?;
        info!(lines = lines.len(), "text recognized");

        Ok(lines_to_text(&lines))
    }

    /// Run recognition, falling back from GPU to CPU once on an empty result.
    pub fn recognize(&self, image: &RgbImage) -> Result<Vec<OcrLine>> {
        let mut backend = self.backend.lock();
        let result = backend.recognize(image)?;

        if is_empty_result(&result) && backend.mode() == HardwareMode::Gpu {
            warn!("GPU mode returned an empty result; switching to CPU and retrying once");
            *backend = self.factory.create(HardwareMode::Cpu)?;

            let retry = backend.recognize(image)?;
            info!(
                lines = retry.as_ref().map_or(0, Vec::len),
                "CPU retry finished"
            );
            return Ok(retry.unwrap_or_default());
        }

        Ok(result.unwrap_or_default())
    }
}

fn init_backend(
    factory: &dyn OcrBackendFactory,
    mode: HardwareMode,
) -> Result<Box<dyn OcrBackend>> {
    match factory.create(mode) {
        Ok(backend) => Ok(backend),
        Err(e) if mode == HardwareMode::Gpu => {
            warn!(error = %e, "GPU backend failed to load; falling back to CPU");
            factory.create(HardwareMode::Cpu)
        }
        Err(e) => Err(e),
    }
}

fn is_empty_result(result: &Option<Vec<OcrLine>>) -> bool {
    result.as_ref().map_or(true, Vec::is_empty)
}

/// Flatten recognized lines into the raw text blob handed to extraction.
pub fn lines_to_text(lines: &[OcrLine]) -> String {
    lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
