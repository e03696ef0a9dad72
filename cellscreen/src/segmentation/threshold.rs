//! Global Otsu binarization of the cell mask.

use image_lib::{GrayImage, Luma};
use imageproc::contrast::otsu_level;

/// Binarized mask with foreground pixels set to 1 and background to 0,
/// plus the Otsu level that separated them.
#[derive(Debug, Clone)]
pub struct Binarized {
    pub image: GrayImage,
    pub level: u8,
}

/// Pixels strictly above the between-class-variance maximizing level become 1.
///
/// A uniform image (e.g. all black) produces an all-zero result.
pub fn binarize_otsu(mask: &GrayImage) -> Binarized {
    let level = otsu_level(mask);
    let image = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([u8::from(mask.get_pixel(x, y)[0] > level)])
    });
    Binarized { image, level }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_black_stays_zero() {
        let mask = GrayImage::new(16, 8);
        let bin = binarize_otsu(&mask);
        assert!(bin.image.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_bimodal_split() {
        // Left half dim background (10), right half bright cells (220).
        let mask = GrayImage::from_fn(20, 4, |x, _| Luma([if x < 10 { 10 } else { 220 }]));
        let bin = binarize_otsu(&mask);
        assert!(bin.level >= 10 && bin.level < 220, "level {}", bin.level);
        for (x, _, p) in bin.image.enumerate_pixels() {
            assert_eq!(p[0], u8::from(x >= 10));
        }
    }

    #[test]
    fn test_output_is_zero_one() {
        let mask = GrayImage::from_fn(8, 8, |x, y| Luma([((x * 31 + y * 17) % 256) as u8]));
        let bin = binarize_otsu(&mask);
        assert!(bin.image.pixels().all(|p| p[0] <= 1));
    }
}
