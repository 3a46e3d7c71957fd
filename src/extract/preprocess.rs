// Image preprocessing ahead of recognition
use image::{DynamicImage, GrayImage};

/// Fixed binarization threshold: pixels brighter than this become
/// white, everything else black. Raises text/background contrast on
/// typical scans.
pub const BINARIZE_THRESHOLD: u8 = 200;

/// Convert to single-channel intensity and apply the fixed threshold.
pub fn binarize(image: &DynamicImage) -> GrayImage {
    let mut gray = image.to_luma8();
    for pixel in gray.pixels_mut() {
        pixel[0] = if pixel[0] > BINARIZE_THRESHOLD { 255 } else { 0 };
    }
    gray
}
