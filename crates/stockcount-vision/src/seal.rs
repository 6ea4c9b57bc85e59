//! Red seal extraction
//!
//! Isolates red ink (stamps, chops) from a photographed page and composites
//! it onto a transparent background. Red is selected in HSV space because
//! hue is stable under the uneven lighting of phone photos, where raw RGB
//! thresholds are not. Hue uses the 0-180 scale common to 8-bit HSV.

use image::{GrayImage, ImageFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use std::io::Cursor;
use stockcount_types::{Error, Result};
use tracing::debug;

/// Inclusive HSV band; hue on the 0-180 scale, saturation/value on 0-255
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HueBand {
    pub hue_min: u8,
    pub hue_max: u8,
    pub min_saturation: u8,
    pub min_value: u8,
}

impl HueBand {
    pub fn contains(&self, (h, s, v): (u8, u8, u8)) -> bool {
        h >= self.hue_min && h <= self.hue_max && s >= self.min_saturation && v >= self.min_value
    }
}

/// Red wraps around the hue circle, so it takes two bands.
pub const RED_BANDS: [HueBand; 2] = [
    HueBand {
        hue_min: 0,
        hue_max: 10,
        min_saturation: 43,
        min_value: 46,
    },
    HueBand {
        hue_min: 156,
        hue_max: 180,
        min_saturation: 43,
        min_value: 46,
    },
];

/// Decode `image_bytes`, keep only red regions and return a transparent PNG.
pub fn extract_seal(image_bytes: &[u8]) -> Result<Vec<u8>> {
    let image = image::load_from_memory(image_bytes)
        .map_err(|e| Error::Decode(e.to_string()))?
        .to_rgb8();

    let mask = denoise(&color_mask(&image, &RED_BANDS));
    let opaque = mask.pixels().filter(|p| p[0] == 255).count();
    debug!(
        width = image.width(),
        height = image.height(),
        opaque_pixels = opaque,
        "seal mask built"
    );

    encode_png(&composite(&image, &mask))
}

/// Binary mask (255 inside any band, 0 elsewhere) with the source's dimensions.
pub fn color_mask(image: &RgbImage, bands: &[HueBand]) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgb([r, g, b]) = *image.get_pixel(x, y);
        let hsv = rgb_to_hsv(r, g, b);
        if bands.iter().any(|band| band.contains(hsv)) {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Morphological opening with a 3x3 square, one iteration.
///
/// Removes isolated compression speckles; more passes start eating thin strokes.
pub fn denoise(mask: &GrayImage) -> GrayImage {
    morphology::open(mask, Norm::LInf, 1)
}

/// Recombine the color channels with `mask` as alpha.
pub fn composite(image: &RgbImage, mask: &GrayImage) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgb([r, g, b]) = *image.get_pixel(x, y);
        Rgba([r, g, b, mask.get_pixel(x, y)[0]])
    })
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| Error::Encode(e.to_string()))?;
    Ok(buffer)
}

/// Convert 8-bit RGB to 8-bit HSV (H in 0-180, S and V in 0-255).
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max == 0.0 { 0.0 } else { 255.0 * delta / max };

    let mut h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    ((h / 2.0).round() as u8, s.round() as u8, max as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEAL_RED: Rgb<u8> = Rgb([200, 30, 40]);
    const PAPER: Rgb<u8> = Rgb([245, 245, 240]);

    fn encode_rgb(image: &RgbImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn decode_rgba(bytes: &[u8]) -> RgbaImage {
        image::load_from_memory(bytes).unwrap().to_rgba8()
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(rgb_to_hsv(255, 0, 0), (0, 255, 255));
        assert_eq!(rgb_to_hsv(0, 255, 0), (60, 255, 255));
        assert_eq!(rgb_to_hsv(0, 0, 255), (120, 255, 255));
        assert_eq!(rgb_to_hsv(255, 255, 255), (0, 0, 255));
        assert_eq!(rgb_to_hsv(0, 0, 0), (0, 0, 0));
    }

    #[test]
    fn test_magenta_red_falls_in_high_band() {
        let hsv = rgb_to_hsv(220, 20, 60);
        assert!(hsv.0 >= 156, "hue {} should wrap into the high band", hsv.0);
        assert!(RED_BANDS[1].contains(hsv));
    }

    #[test]
    fn test_band_excludes_pale_and_dark_pixels() {
        // Washed-out pink: red hue but saturation below threshold
        assert!(!RED_BANDS.iter().any(|b| b.contains(rgb_to_hsv(250, 235, 235))));
        // Near-black with a red cast
        assert!(!RED_BANDS.iter().any(|b| b.contains(rgb_to_hsv(30, 5, 5))));
    }

    #[test]
    fn test_no_red_yields_fully_transparent_image() {
        let page = RgbImage::from_fn(40, 30, |x, _| {
            if x < 20 {
                PAPER
            } else {
                Rgb([20, 40, 180])
            }
        });

        let png = extract_seal(&encode_rgb(&page)).unwrap();
        let out = decode_rgba(&png);

        assert_eq!(out.dimensions(), (40, 30));
        assert!(out.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_red_rectangle_is_kept_opaque() {
        let inside = |x: u32, y: u32| (10..30).contains(&x) && (8..20).contains(&y);
        let page = RgbImage::from_fn(50, 30, |x, y| if inside(x, y) { SEAL_RED } else { PAPER });

        let png = extract_seal(&encode_rgb(&page)).unwrap();
        let out = decode_rgba(&png);

        for (x, y, pixel) in out.enumerate_pixels() {
            if inside(x, y) {
                assert_eq!(pixel[3], 255, "({}, {}) should be opaque", x, y);
                assert_eq!([pixel[0], pixel[1], pixel[2]], SEAL_RED.0);
            } else {
                assert_eq!(pixel[3], 0, "({}, {}) should be transparent", x, y);
            }
        }
    }

    #[test]
    fn test_isolated_red_pixel_is_removed() {
        let mut page = RgbImage::from_pixel(20, 20, PAPER);
        page.put_pixel(10, 10, SEAL_RED);

        let mask = denoise(&color_mask(&page, &RED_BANDS));
        assert!(mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_undecodable_bytes_are_rejected() {
        let err = extract_seal(b"definitely not an image").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
