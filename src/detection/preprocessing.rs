use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::filter::gaussian_blur_f32;

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Apply Gaussian blur to reduce noise
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return img.clone();
    }
    gaussian_blur_f32(img, sigma)
}

/// Split into bright (255) and dark (0) phases at the Otsu level.
/// Returns the binary image and the level used.
pub fn binarize(img: &GrayImage) -> (GrayImage, u8) {
    let level = otsu_level(img);
    let binary = GrayImage::from_fn(img.width(), img.height(), |x, y| {
        if img.get_pixel(x, y)[0] > level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });
    (binary, level)
}

/// Swap the two phases of a binary image
pub fn invert(binary: &GrayImage) -> GrayImage {
    GrayImage::from_fn(binary.width(), binary.height(), |x, y| {
        Luma([255 - binary.get_pixel(x, y)[0]])
    })
}
