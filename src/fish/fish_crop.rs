use image::{Rgb, RgbImage};
use ndarray::s;

use crate::Mask;

pub const DEFAULT_MIN_AREA: usize = 10_000;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Why a mask did not yield a crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropRejection {
    ShapeMismatch,
    EmptyMask,
    BelowMinArea { area: usize },
}

/// Isolates one masked instance on a white background, tightly bounded.
pub fn extract_crop(image: &RgbImage, mask: &Mask, min_area: usize) -> Option<RgbImage> {
    try_extract_crop(image, mask, min_area).ok()
}

pub fn try_extract_crop(
    image: &RgbImage,
    mask: &Mask,
    min_area: usize,
) -> Result<RgbImage, CropRejection> {
    if !mask.matches(image.width(), image.height()) {
        return Err(CropRejection::ShapeMismatch);
    }

    let bounds = mask.bounding_box().ok_or(CropRejection::EmptyMask)?;

    // masked pixels, not box area
    let area = mask.area();
    if area < min_area {
        return Err(CropRejection::BelowMinArea { area });
    }

    let mut crop = RgbImage::from_pixel(bounds.width(), bounds.height(), BACKGROUND);
    let window = mask.as_array().slice(s![
        bounds.y1 as usize..=bounds.y2 as usize,
        bounds.x1 as usize..=bounds.x2 as usize
    ]);

    for ((y, x), &member) in window.indexed_iter() {
        if member {
            let source = image.get_pixel(bounds.x1 + x as u32, bounds.y1 + y as u32);
            crop.put_pixel(x as u32, y as u32, *source);
        }
    }

    Ok(crop)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::Region;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 0]))
    }

    #[test]
    fn crop_is_tight_and_background_is_white() {
        let image = gradient(5, 5);
        let mask = Mask::new(array![
            [false, false, false, false, false],
            [false, true, false, false, false],
            [false, true, true, true, false],
            [false, false, false, true, false],
            [false, false, false, false, false],
        ]);

        let crop = extract_crop(&image, &mask, 1).unwrap();

        assert_eq!(crop.dimensions(), (3, 3));
        assert_eq!(crop.get_pixel(0, 0), &Rgb([1, 1, 0]));
        assert_eq!(crop.get_pixel(1, 0), &BACKGROUND);
        assert_eq!(crop.get_pixel(2, 1), &Rgb([3, 2, 0]));
        assert_eq!(crop.get_pixel(0, 2), &BACKGROUND);
    }

    #[test]
    fn area_gate_boundary() {
        let image = gradient(200, 200);
        // 100 x 100 = 10,000 masked pixels
        let mask = Mask::from_region(&Region::new(50, 50, 149, 149), 200, 200);

        assert!(extract_crop(&image, &mask, DEFAULT_MIN_AREA).is_some());
        assert!(extract_crop(&image, &mask, DEFAULT_MIN_AREA + 1).is_none());

        let one_short = Mask::from_shape_fn(200, 200, |(y, x)| {
            (50..150).contains(&y) && (50..150).contains(&x) && !(y == 50 && x == 50)
        });
        assert_eq!(one_short.area(), DEFAULT_MIN_AREA - 1);
        assert_eq!(
            try_extract_crop(&image, &one_short, DEFAULT_MIN_AREA),
            Err(CropRejection::BelowMinArea { area: DEFAULT_MIN_AREA - 1 })
        );
    }

    #[test]
    fn sparse_mask_in_large_box_is_rejected() {
        let image = gradient(200, 200);
        // a hollow frame spanning the whole image
        let mask = Mask::from_shape_fn(200, 200, |(y, x)| x == 0 || y == 0 || x == 199 || y == 199);

        assert_eq!(mask.bounding_box().unwrap().area(), 40_000);
        assert!(extract_crop(&image, &mask, DEFAULT_MIN_AREA).is_none());
    }

    #[test]
    fn empty_mask_never_yields_a_crop() {
        let image = gradient(10, 10);
        let mask = Mask::from_shape_fn(10, 10, |_| false);

        assert_eq!(try_extract_crop(&image, &mask, 0), Err(CropRejection::EmptyMask));
    }

    #[test]
    fn mismatched_mask_is_rejected() {
        let image = gradient(10, 10);
        let mask = Mask::from_shape_fn(10, 12, |_| true);

        assert_eq!(try_extract_crop(&image, &mask, 0), Err(CropRejection::ShapeMismatch));
    }

    #[test]
    fn source_image_is_untouched() {
        let image = gradient(20, 10);
        let before = image.clone();
        let mask = Mask::from_region(&Region::new(2, 2, 8, 6), 20, 10);

        let _ = extract_crop(&image, &mask, 0);

        assert_eq!(image, before);
    }
}
