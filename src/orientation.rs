use image::{imageops, RgbImage};

/// Rotates portrait images 90° counter-clockwise so every frame satisfies `width >= height`.
pub fn normalize_orientation(image: &RgbImage) -> RgbImage {
    if image.height() > image.width() {
        // 270° clockwise
        imageops::rotate270(image)
    } else {
        image.clone()
    }
}
