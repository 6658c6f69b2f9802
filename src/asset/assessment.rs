//! Misurazione delle proprietà di un'immagine rispetto ai limiti configurati.

use crate::config::Limits;
use crate::error::Result;
use image::DynamicImage;
use std::path::Path;

/// Orientation of an image, informational only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectClass {
    Square,
    Landscape,
    Portrait,
}

impl AspectClass {
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        match width.cmp(&height) {
            std::cmp::Ordering::Equal => AspectClass::Square,
            std::cmp::Ordering::Greater => AspectClass::Landscape,
            std::cmp::Ordering::Less => AspectClass::Portrait,
        }
    }
}

/// Measured properties that drive the optimization planner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageAssessment {
    pub width: u32,
    pub height: u32,
    pub aspect: AspectClass,
    pub oversize_width: bool,
    pub oversize_height: bool,
    /// Both dimensions exceed their limits
    pub oversize_both: bool,
    pub has_transparency: bool,
}

impl ImageAssessment {
    /// Compares measured dimensions against the given limits.
    ///
    /// A limit of 0 falls back to the matching default in `limits`.
    pub fn measure(
        width: u32,
        height: u32,
        has_transparency: bool,
        width_limit: u32,
        height_limit: u32,
        limits: &Limits,
    ) -> Self {
        let max_width = if width_limit > 0 { width_limit } else { limits.width };
        let max_height = if height_limit > 0 { height_limit } else { limits.height };

        let oversize_width = width > max_width;
        let oversize_height = height > max_height;

        Self {
            width,
            height,
            aspect: AspectClass::from_dimensions(width, height),
            oversize_width,
            oversize_height,
            oversize_both: oversize_width && oversize_height,
            has_transparency,
        }
    }

    pub fn from_image(image: &DynamicImage, width_limit: u32, height_limit: u32, limits: &Limits) -> Self {
        Self::measure(
            image.width(),
            image.height(),
            has_transparency(image),
            width_limit,
            height_limit,
            limits,
        )
    }

    /// Decodes the file at `path` and assesses it
    pub fn load(path: &Path, width_limit: u32, height_limit: u32, limits: &Limits) -> Result<Self> {
        let image = image::open(path)?;
        Ok(Self::from_image(&image, width_limit, height_limit, limits))
    }
}

/// Whether any pixel is less than fully opaque.
///
/// Palette images with a transparency entry decode to RGBA, so an unused
/// transparent index yields only opaque pixels. Images without an alpha
/// channel are never transparent.
pub fn has_transparency(image: &DynamicImage) -> bool {
    if !image.color().has_alpha() {
        return false;
    }

    match image {
        DynamicImage::ImageRgba16(buffer) => buffer.pixels().any(|p| p[3] < u16::MAX),
        DynamicImage::ImageLumaA16(buffer) => buffer.pixels().any(|p| p[1] < u16::MAX),
        DynamicImage::ImageRgba32F(buffer) => buffer.pixels().any(|p| p[3] < 1.0),
        other => other.to_rgba8().pixels().any(|p| p[3] < u8::MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn opaque_rgba() -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]))
    }

    #[test]
    fn test_opaque_alpha_image_is_not_transparent() {
        let image = DynamicImage::ImageRgba8(opaque_rgba());
        assert!(!has_transparency(&image));
    }

    #[test]
    fn test_one_translucent_pixel_is_transparent() {
        let mut buffer = opaque_rgba();
        buffer.put_pixel(2, 3, Rgba([10, 20, 30, 254]));
        assert!(has_transparency(&DynamicImage::ImageRgba8(buffer)));
    }

    #[test]
    fn test_rgb_image_is_not_transparent() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([0, 0, 0])));
        assert!(!has_transparency(&image));
    }

    #[test]
    fn test_sixteen_bit_alpha() {
        let mut image = DynamicImage::new_rgba16(2, 2);
        if let DynamicImage::ImageRgba16(buffer) = &mut image {
            for pixel in buffer.pixels_mut() {
                *pixel = Rgba([1, 1, 1, u16::MAX]);
            }
        }
        assert!(!has_transparency(&image));

        if let DynamicImage::ImageRgba16(buffer) = &mut image {
            buffer.put_pixel(0, 0, Rgba([1, 1, 1, 100]));
        }
        assert!(has_transparency(&image));
    }

    #[test]
    fn test_opaque_gif_round_trip_is_not_transparent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("flat.gif");
        DynamicImage::ImageRgba8(opaque_rgba())
            .save_with_format(&path, ImageFormat::Gif)
            .unwrap();

        let assessment = ImageAssessment::load(&path, 0, 0, &Limits::default()).unwrap();
        assert!(!assessment.has_transparency);
        assert_eq!((assessment.width, assessment.height), (4, 4));
    }

    /// 1x1 GIF89a, palette [white, black], pixel at index 0, with a graphic
    /// control extension declaring `transparent_index`
    fn palette_gif(transparent_index: u8) -> Vec<u8> {
        let mut bytes = b"GIF89a".to_vec();
        bytes.extend_from_slice(&[0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00]);
        bytes.extend_from_slice(&[0xff, 0xff, 0xff, 0x00, 0x00, 0x00]);
        bytes.extend_from_slice(&[0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, transparent_index, 0x00]);
        bytes.extend_from_slice(&[0x2c, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
        // LZW: min code size 2, codes clear(4) 0 end(5)
        bytes.extend_from_slice(&[0x02, 0x02, 0x44, 0x01, 0x00, 0x3b]);
        bytes
    }

    #[test]
    fn test_palette_gif_with_unused_transparent_index() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("keyed.gif");
        std::fs::write(&path, palette_gif(1)).unwrap();

        let assessment = ImageAssessment::load(&path, 0, 0, &Limits::default()).unwrap();
        assert!(!assessment.has_transparency);
        assert_eq!((assessment.width, assessment.height), (1, 1));
    }

    #[test]
    fn test_palette_gif_using_transparent_index() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hole.gif");
        std::fs::write(&path, palette_gif(0)).unwrap();

        let assessment = ImageAssessment::load(&path, 0, 0, &Limits::default()).unwrap();
        assert!(assessment.has_transparency);
    }

    #[test]
    fn test_oversize_both_iff_both_dimensions() {
        let limits = Limits::default();
        for &(w, h) in &[(3000, 2000), (3000, 500), (500, 2000), (500, 500), (1920, 1080), (1921, 1081)] {
            for &(wl, hl) in &[(0, 0), (1920, 1080), (800, 600), (2500, 0)] {
                let a = ImageAssessment::measure(w, h, false, wl, hl, &limits);
                assert_eq!(a.oversize_both, a.oversize_width && a.oversize_height, "{}x{} @ {}x{}", w, h, wl, hl);
            }
        }
    }

    #[test]
    fn test_zero_height_limit_uses_default_height() {
        let limits = Limits::default();
        // taller than 1080 but narrower than 1920
        let a = ImageAssessment::measure(1000, 1500, false, 0, 0, &limits);
        assert!(!a.oversize_width);
        assert!(a.oversize_height);

        let b = ImageAssessment::measure(1000, 1500, false, 0, 1600, &limits);
        assert!(!b.oversize_height);
    }

    #[test]
    fn test_aspect_class() {
        assert_eq!(AspectClass::from_dimensions(10, 10), AspectClass::Square);
        assert_eq!(AspectClass::from_dimensions(30, 20), AspectClass::Landscape);
        assert_eq!(AspectClass::from_dimensions(20, 30), AspectClass::Portrait);
    }
}
