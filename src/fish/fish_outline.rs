use image::{Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use tracing::warn;

use crate::fish::FishClass;
use crate::Mask;

pub const STROKE_WIDTH: u32 = 3;

/// Outline colors in RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub kilu: Rgb<u8>,
    pub raim: Rgb<u8>,
    pub fallback: Rgb<u8>,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            kilu: Rgb([0, 200, 0]),
            raim: Rgb([255, 0, 0]),
            fallback: Rgb([200, 200, 200]),
        }
    }
}

impl Palette {
    pub fn color_for(&self, label: Option<FishClass>) -> Rgb<u8> {
        match label {
            Some(FishClass::Kilu) => self.kilu,
            Some(FishClass::Raim) => self.raim,
            None => self.fallback,
        }
    }
}

/// Draws the outer boundary of every mask onto a copy of `image`.
pub fn render_outlines(
    image: &RgbImage,
    masks_with_labels: &[(&Mask, Option<FishClass>)],
    palette: &Palette,
) -> RgbImage {
    let mut canvas = image.clone();

    for (mask, label) in masks_with_labels {
        if !mask.matches(canvas.width(), canvas.height()) {
            warn!(
                mask_width = mask.width(),
                mask_height = mask.height(),
                "skipping outline for mask computed against another frame"
            );
            continue;
        }

        let color = palette.color_for(*label);
        for contour in external_contours(mask) {
            for point in &contour.points {
                stamp(&mut canvas, point.x, point.y, color);
            }
        }
    }

    canvas
}

fn external_contours(mask: &Mask) -> Vec<Contour<i32>> {
    find_contours::<i32>(&mask.to_luma())
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
        .collect()
}

fn stamp(canvas: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    let reach = (STROKE_WIDTH / 2) as i32;
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let x_pos = x + dx;
            let y_pos = y + dy;
            if x_pos >= 0 && y_pos >= 0 && x_pos < canvas.width() as i32 && y_pos < canvas.height() as i32 {
                canvas.put_pixel(x_pos as u32, y_pos as u32, color);
            }
        }
    }
}
