//! Pixel drawing surface for the waveform renderers.
//!
//! Renderers only talk to the [`Surface`] trait so they stay independent of
//! where the pixels end up. [`PixelSurface`] rasterizes into an in-memory
//! tiny-skia pixmap which the terminal front end blits onto the screen.

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};

use super::bars::Bar;

/// Half-height given to silent bars so the axis stays visible.
const MIN_HALF_HEIGHT: f32 = 1.0;

/// Straight-alpha RGBA color, parsed from CSS-like hex strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }
}

impl FromStr for Rgba {
    type Err = anyhow::Error;

    /// Accepts `transparent`, `#rgb`, `#rrggbb` and `#rrggbbaa`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("transparent") {
            return Ok(Rgba::TRANSPARENT);
        }

        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| anyhow!("Invalid color '{s}': expected '#' followed by hex digits"))?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow!("Invalid color '{s}': non-hex digit"));
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
        let color = match hex.len() {
            3 => {
                let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17);
                Rgba::rgb(nibble(0)?, nibble(1)?, nibble(2)?)
            }
            6 => Rgba::rgb(channel(0)?, channel(2)?, channel(4)?),
            8 => Rgba::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?),
            n => return Err(anyhow!("Invalid color '{s}': expected 3, 6 or 8 hex digits, got {n}")),
        };
        Ok(color)
    }
}

impl TryFrom<String> for Rgba {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgba> for String {
    fn from(color: Rgba) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.a {
            0 => write!(f, "transparent"),
            255 => write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b),
            a => write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, a),
        }
    }
}

/// Axis-aligned rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Anything the renderers can paint onto.
pub trait Surface {
    /// Backing size in device pixels.
    fn size(&self) -> (u32, u32);

    /// Replaces every pixel with `color`.
    fn clear(&mut self, color: Rgba);

    /// Fills a bar, rounding its corners by `radius` (clamped to half the
    /// bar's shorter side).
    fn fill_bar(&mut self, rect: BarRect, radius: f32, color: Rgba);
}

/// tiny-skia backed surface. A zero-sized surface is valid; drawing on it
/// does nothing.
pub struct PixelSurface {
    pixmap: Option<Pixmap>,
    width: u32,
    height: u32,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixmap: Pixmap::new(width, height),
            width,
            height,
        }
    }

    /// Reallocates the backing pixmap when the size changed. Pixel contents
    /// are not preserved.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        tracing::debug!(
            "Surface resized: {}x{} -> {}x{}",
            self.width,
            self.height,
            width,
            height
        );
        self.pixmap = Pixmap::new(width, height);
        self.width = width;
        self.height = height;
    }

    /// Reads back one pixel as straight-alpha color.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        let pixel = self.pixmap.as_ref()?.pixel(x, y)?.demultiply();
        Some(Rgba::new(pixel.red(), pixel.green(), pixel.blue(), pixel.alpha()))
    }

    fn paint(&self, color: Rgba) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        // Bars land exactly on the pixel grid.
        paint.anti_alias = false;
        paint
    }
}

impl Surface for PixelSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Rgba) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a));
        }
    }

    fn fill_bar(&mut self, rect: BarRect, radius: f32, color: Rgba) {
        if rect.width <= 0.0 || rect.height <= 0.0 || color.is_transparent() {
            return;
        }
        let paint = self.paint(color);
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };

        let radius = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
        if radius < 0.5 {
            if let Some(r) = Rect::from_xywh(rect.x, rect.y, rect.width, rect.height) {
                pixmap.fill_rect(r, &paint, Transform::identity(), None);
            }
            return;
        }

        if let Some(path) = rounded_rect(rect, radius) {
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }
}

/// Paints `bar` as a column centered on the surface's horizontal axis.
///
/// Both halves share one rounded shape so the caps above and below the axis
/// look the same.
pub fn paint_bar<S: Surface + ?Sized>(
    surface: &mut S,
    x: f32,
    width: f32,
    bar: Bar,
    radius: f32,
    color: Rgba,
) {
    let (_, height) = surface.size();
    let axis = height as f32 / 2.0;
    if height == 0 {
        return;
    }
    let above = bar.above.max(MIN_HALF_HEIGHT).min(axis);
    let below = bar.below.max(MIN_HALF_HEIGHT).min(axis);
    surface.fill_bar(
        BarRect {
            x,
            y: axis - above,
            width,
            height: above + below,
        },
        radius,
        color,
    );
}

fn rounded_rect(rect: BarRect, r: f32) -> Option<tiny_skia::Path> {
    let BarRect { x, y, width: w, height: h } = rect;
    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(x + w - r, y);
    pb.quad_to(x + w, y, x + w, y + r);
    pb.line_to(x + w, y + h - r);
    pb.quad_to(x + w, y + h, x + w - r, y + h);
    pb.line_to(x + r, y + h);
    pb.quad_to(x, y + h, x, y + h - r);
    pb.line_to(x, y + r);
    pb.quad_to(x, y, x + r, y);
    pb.close();
    pb.finish()
}
