//! Container-to-pixel geometry.

/// Size of the container hosting the drawing surface, in logical units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerSize {
    pub width: f32,
    pub height: f32,
}

impl ContainerSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Backing resolution of the drawing surface.
///
/// The height is always even so a bar mirrored around the horizontal axis
/// never straddles half a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub device_pixel_ratio: f32,
}

impl Geometry {
    pub fn from_container(container: ContainerSize, device_pixel_ratio: f32) -> Self {
        let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        Self {
            pixel_width: round_pixels(container.width * dpr),
            pixel_height: round_pixels(container.height * dpr / 2.0) * 2,
            device_pixel_ratio: dpr,
        }
    }

    /// False for a collapsed container; drawing then degrades to a no-op.
    pub fn is_drawable(&self) -> bool {
        self.pixel_width > 0 && self.pixel_height > 0
    }
}

fn round_pixels(value: f32) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round() as u32
    } else {
        0
    }
}
