//! Image preparation before recognition

use image::imageops::{self, FilterType};
use image::RgbImage;

/// Longest side handed to the OCR backend, in pixels
pub const DEFAULT_MAX_SIDE: u32 = 2500;

/// Downscale so the longer side is at most `max_side`, keeping aspect ratio.
///
/// Handwriting recognition benefits from resolution, so smaller images are
/// never upscaled. Uses linear interpolation.
pub fn fit_within(image: RgbImage, max_side: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    if max_side == 0 || longest <= max_side {
        return image;
    }

    let scale = max_side as f64 / longest as f64;
    let new_width = ((width as f64 * scale) as u32).max(1);
    let new_height = ((height as f64 * scale) as u32).max(1);

    imageops::resize(&image, new_width, new_height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_large_landscape_is_downscaled() {
        let image = RgbImage::from_pixel(500, 300, Rgb([255, 255, 255]));
        let resized = fit_within(image, 250);
        assert_eq!(resized.dimensions(), (250, 150));
    }

    #[test]
    fn test_large_portrait_is_downscaled() {
        let image = RgbImage::from_pixel(120, 400, Rgb([255, 255, 255]));
        let resized = fit_within(image, 250);
        assert_eq!(resized.dimensions(), (75, 250));
    }

    #[test]
    fn test_small_image_is_untouched() {
        let image = RgbImage::from_pixel(80, 60, Rgb([10, 20, 30]));
        let resized = fit_within(image, DEFAULT_MAX_SIDE);
        assert_eq!(resized.dimensions(), (80, 60));
    }
}
