//! Aspect-ratio gate and the pad-to-canvas transform.
//!
//! Accepted images are scaled so the larger relative dimension fills the
//! canvas, centered, and composited over a solid white background. Nothing is
//! cropped. The result is always a baseline JPEG at quality 100.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage, RgbImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::PipelineError;
use crate::types::{RejectReason, TransformParams};

/// Quality used for every output JPEG.
pub const JPEG_QUALITY: u8 = 100;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Absorbs rounding in `1 ± tolerance` so boundary ratios are accepted.
const BOUNDARY_EPSILON: f64 = 1e-9;

/// Inclusive window of accepted width/height ratios around 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectWindow {
    min: f64,
    max: f64,
}

impl AspectWindow {
    pub fn new(tolerance: f64) -> Self {
        Self {
            min: 1.0 - tolerance,
            max: 1.0 + tolerance,
        }
    }

    /// Accept iff `1 - tolerance <= ratio <= 1 + tolerance`.
    pub fn check(&self, width: u32, height: u32) -> Result<f64, RejectReason> {
        let ratio = width as f64 / height as f64;
        if ratio >= self.min - BOUNDARY_EPSILON && ratio <= self.max + BOUNDARY_EPSILON {
            Ok(ratio)
        } else {
            Err(RejectReason::AspectRatio { ratio })
        }
    }
}

/// Pads images onto a fixed white canvas.
#[derive(Debug, Clone)]
pub struct PadTransform {
    width: u32,
    height: u32,
    window: AspectWindow,
}

impl PadTransform {
    pub fn new(params: &TransformParams) -> Self {
        Self {
            width: params.width,
            height: params.height,
            window: AspectWindow::new(params.tolerance),
        }
    }

    pub fn window(&self) -> AspectWindow {
        self.window
    }

    /// Fit `image` inside the canvas without cropping and center it on white.
    ///
    /// Transparent pixels are flattened onto the background.
    pub fn pad(&self, image: &DynamicImage) -> RgbImage {
        let (fit_w, fit_h) = fit_within(image.width(), image.height(), self.width, self.height);
        let scaled = image.resize_exact(fit_w, fit_h, FilterType::CatmullRom);

        let mut canvas = RgbaImage::from_pixel(self.width, self.height, WHITE);
        let x = ((self.width - fit_w) / 2) as i64;
        let y = ((self.height - fit_h) / 2) as i64;
        imageops::overlay(&mut canvas, &scaled.to_rgba8(), x, y);

        DynamicImage::ImageRgba8(canvas).to_rgb8()
    }

    /// Encode a padded canvas as JPEG and write it to `output`.
    pub fn write_jpeg(&self, canvas: &RgbImage, output: &Path) -> Result<(), PipelineError> {
        let file = File::create(output).map_err(|e| PipelineError::Write {
            path: output.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
            .encode_image(canvas)
            .map_err(|e| PipelineError::Encode {
                path: output.to_path_buf(),
                message: e.to_string(),
            })?;
        writer.flush().map_err(|e| PipelineError::Write {
            path: output.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Largest size with the source's aspect ratio that fits in the target box.
///
/// The dimension that constrains the fit matches the target exactly; the
/// other is rounded and clamped to `[1, target]`.
pub fn fit_within(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> (u32, u32) {
    let src_ratio = src_w as f64 / src_h as f64;
    let target_ratio = target_w as f64 / target_h as f64;

    if src_ratio > target_ratio {
        let h = (target_w as f64 / src_ratio).round() as u32;
        (target_w, h.clamp(1, target_h))
    } else {
        let w = (target_h as f64 * src_ratio).round() as u32;
        (w.clamp(1, target_w), target_h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb};

    fn transform(width: u32, height: u32) -> PadTransform {
        PadTransform::new(&TransformParams::new(width, height, 0.15))
    }

    #[test]
    fn test_window_inclusive_bounds() {
        let window = AspectWindow::new(0.15);
        assert!(window.check(100, 100).is_ok());
        assert!(window.check(85, 100).is_ok());
        assert!(window.check(115, 100).is_ok());
        assert!(window.check(98, 100).is_ok());
        assert!(window.check(84, 100).is_err());
        assert!(window.check(116, 100).is_err());
        assert_eq!(
            window.check(140, 100),
            Err(RejectReason::AspectRatio { ratio: 1.4 })
        );
    }

    #[test]
    fn test_zero_tolerance_accepts_only_square() {
        let window = AspectWindow::new(0.0);
        assert!(window.check(300, 300).is_ok());
        assert!(window.check(301, 300).is_err());
    }

    #[test]
    fn test_fit_square_into_portrait() {
        assert_eq!(fit_within(100, 100, 900, 1200), (900, 900));
    }

    #[test]
    fn test_fit_wide_and_tall() {
        assert_eq!(fit_within(200, 100, 900, 1200), (900, 450));
        assert_eq!(fit_within(100, 400, 900, 1200), (300, 1200));
    }

    #[test]
    fn test_fit_never_exceeds_canvas() {
        for (w, h) in [(1, 1000), (1000, 1), (17, 13), (900, 1200), (3000, 3000)] {
            let (fw, fh) = fit_within(w, h, 900, 1200);
            assert!(fw >= 1 && fw <= 900, "{w}x{h} -> {fw}x{fh}");
            assert!(fh >= 1 && fh <= 1200, "{w}x{h} -> {fw}x{fh}");
        }
    }

    #[test]
    fn test_pad_output_matches_canvas() {
        let t = transform(900, 1200);
        for (w, h) in [(100, 100), (98, 100), (115, 100), (2000, 1900)] {
            let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([200, 0, 0])));
            let padded = t.pad(&img);
            assert_eq!(padded.dimensions(), (900, 1200));
        }
    }

    #[test]
    fn test_pad_letterboxes_with_white() {
        let t = transform(900, 1200);
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 100, Rgb([0, 0, 0])));
        let padded = t.pad(&img);

        // Square source fills 900x900 in the middle; bands above and below stay white.
        assert_eq!(padded.get_pixel(450, 10), &Rgb([255, 255, 255]));
        assert_eq!(padded.get_pixel(450, 1190), &Rgb([255, 255, 255]));
        assert_eq!(padded.get_pixel(450, 600), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_transparency_flattened_to_white() {
        let t = transform(64, 64);
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 0])));
        let padded = t.pad(&img);
        assert_eq!(padded.get_pixel(32, 32), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_write_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.jpg");
        let t = transform(90, 120);
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 50, Rgb([20, 120, 220])));
        t.write_jpeg(&t.pad(&img), &output).unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);
        assert_eq!(image::image_dimensions(&output).unwrap(), (90, 120));
    }

    #[test]
    fn test_write_jpeg_reports_unwritable_path() {
        let t = transform(10, 10);
        let canvas = RgbImage::new(10, 10);
        let err = t
            .write_jpeg(&canvas, Path::new("/nonexistent/dir/out.jpg"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Write { .. }));
    }
}
