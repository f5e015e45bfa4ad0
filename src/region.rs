use serde::Serialize;

/// Axis-aligned candidate box with inclusive pixel bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Region {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

fn clip(value: f32, extent: u32) -> u32 {
    // `as` truncates toward zero and saturates, NaN becomes 0
    (value as i64).clamp(0, extent as i64 - 1) as u32
}

impl Region {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Region {
        Region {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    /// Builds a region from a raw detector box, clipped to a `width` x `height` frame.
    /// The frame must be non-empty.
    pub fn clipped(x1: f32, y1: f32, x2: f32, y2: f32, width: u32, height: u32) -> Region {
        Region::new(
            clip(x1, width),
            clip(y1, height),
            clip(x2, width),
            clip(y2, height),
        )
    }

    pub fn center(&self) -> (u32, u32) {
        ((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1 + 1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1 + 1
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clipped_truncates_then_clamps() {
        let region = Region::clipped(-12.7, 3.9, 640.2, 479.99, 640, 480);

        assert_eq!(region, Region { x1: 0, y1: 3, x2: 639, y2: 479 });
    }

    #[test]
    fn clipped_reorders_reversed_corners() {
        let region = Region::clipped(50.0, 80.0, 10.0, 20.0, 100, 100);

        assert_eq!(region, Region { x1: 10, y1: 20, x2: 50, y2: 80 });
    }

    #[test]
    fn nan_coordinates_land_on_the_origin() {
        let region = Region::clipped(f32::NAN, f32::NAN, 5.0, 5.0, 10, 10);

        assert_eq!(region, Region { x1: 0, y1: 0, x2: 5, y2: 5 });
    }

    #[test]
    fn center_uses_integer_division() {
        let region = Region::new(3, 4, 8, 9);

        assert_eq!(region.center(), (5, 6));
        assert_eq!(region.width(), 6);
        assert_eq!(region.height(), 6);
        assert_eq!(region.area(), 36);
    }
}
