use image::{DynamicImage, Rgb, RgbImage};

use crate::error::RenderError;
use crate::models::{Mask, RegionBox};

/// Fill value for pixels outside the mask, on every channel
pub const BACKGROUND_GRAY: u8 = 188;

/// Render a background-neutralized crop of one region.
///
/// Pixels inside `mask` keep their original color, everything else becomes
/// [`BACKGROUND_GRAY`], and the result is cropped to the half-open `bbox`.
/// A zero-area box yields a 0x0 image.
pub fn render_masked_crop(
    image: &DynamicImage,
    mask: &Mask,
    bbox: &RegionBox,
) -> Result<DynamicImage, RenderError> {
    let (width, height) = (image.width(), image.height());

    if mask.dimensions() != (width, height) {
        return Err(RenderError::MaskMismatch {
            mask_width: mask.width(),
            mask_height: mask.height(),
            image_width: width,
            image_height: height,
        });
    }

    if bbox.is_empty() {
        return Ok(DynamicImage::ImageRgb8(RgbImage::new(0, 0)));
    }

    if bbox.x2 > width || bbox.y2 > height || bbox.x1 > bbox.x2 || bbox.y1 > bbox.y2 {
        return Err(RenderError::BoxOutOfBounds {
            x1: bbox.x1,
            y1: bbox.y1,
            x2: bbox.x2,
            y2: bbox.y2,
            width,
            height,
        });
    }

    let rgb = image.to_rgb8();

    // Only the box is ever visible, so the canvas is built at crop size
    let crop = RgbImage::from_fn(bbox.width(), bbox.height(), |x, y| {
        let (sx, sy) = (bbox.x1 + x, bbox.y1 + y);
        if mask.get(sx, sy) {
            *rgb.get_pixel(sx, sy)
        } else {
            Rgb([BACKGROUND_GRAY; 3])
        }
    });

    Ok(DynamicImage::ImageRgb8(crop))
}
