use image::{GrayImage, Luma};
use ndarray::Array2;

use crate::Region;

/// Per-instance membership map, indexed `[[y, x]]`, sized like the frame it was computed against.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    data: Array2<bool>,
}

impl Mask {
    pub fn new(data: Array2<bool>) -> Mask {
        Mask { data }
    }

    pub fn from_shape_fn<F>(height: usize, width: usize, f: F) -> Mask
    where
        F: FnMut((usize, usize)) -> bool,
    {
        Mask::new(Array2::from_shape_fn((height, width), f))
    }

    /// A mask covering exactly `region` inside a `width` x `height` frame.
    pub fn from_region(region: &Region, width: usize, height: usize) -> Mask {
        Mask::from_shape_fn(height, width, |(y, x)| {
            x >= region.x1 as usize
                && x <= region.x2 as usize
                && y >= region.y1 as usize
                && y <= region.y2 as usize
        })
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width() == width as usize && self.height() == height as usize
    }

    pub fn as_array(&self) -> &Array2<bool> {
        &self.data
    }

    /// Number of masked pixels.
    pub fn area(&self) -> usize {
        self.data.iter().filter(|&&member| member).count()
    }

    /// Tight bounding box of the masked pixels, `None` when nothing is masked.
    pub fn bounding_box(&self) -> Option<Region> {
        self.data
            .indexed_iter()
            .filter_map(|((y, x), &member)| if member { Some((x as u32, y as u32)) } else { None })
            .fold(None, |bounds: Option<Region>, (x, y)| match bounds {
                None => Some(Region { x1: x, y1: y, x2: x, y2: y }),
                Some(b) => Some(Region {
                    x1: b.x1.min(x),
                    y1: b.y1.min(y),
                    x2: b.x2.max(x),
                    y2: b.y2.max(y),
                }),
            })
    }

    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width() as u32, self.height() as u32, |x, y| {
            if self.data[[y as usize, x as usize]] {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        })
    }
}
