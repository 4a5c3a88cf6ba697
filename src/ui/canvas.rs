//! Half-block blitting of a pixel surface into a ratatui buffer.
//!
//! Each terminal cell shows two vertically stacked pixels: the upper one as
//! the foreground of `▀`, the lower one as the background. A pane of
//! `cols x rows` cells therefore backs a `cols x rows*2` surface.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::widgets::Widget;

use crate::waveform::{ContainerSize, PixelSurface, Rgba, Surface};

const UPPER_HALF: &str = "▀";

/// Logical size of the surface that fills `area`.
pub fn container_for(area: Rect) -> ContainerSize {
    ContainerSize::new(area.width as f32, area.height as f32 * 2.0)
}

/// Maps a terminal column inside `area` to a surface x coordinate.
pub fn surface_x(area: Rect, column: u16) -> Option<f32> {
    if column < area.x || column >= area.x + area.width {
        return None;
    }
    Some((column - area.x) as f32 + 0.5)
}

/// Renders a [`PixelSurface`] into the widget area.
pub struct CanvasView<'a> {
    surface: &'a PixelSurface,
}

impl<'a> CanvasView<'a> {
    pub fn new(surface: &'a PixelSurface) -> Self {
        Self { surface }
    }
}

impl Widget for CanvasView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (width, height) = self.surface.size();
        for row in 0..area.height {
            for col in 0..area.width {
                let x = col as u32;
                let y = row as u32 * 2;
                let top = pixel_color(self.surface, x, y, width, height);
                let bottom = pixel_color(self.surface, x, y + 1, width, height);
                if let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) {
                    cell.set_symbol(UPPER_HALF).set_fg(top).set_bg(bottom);
                }
            }
        }
    }
}

fn pixel_color(surface: &PixelSurface, x: u32, y: u32, width: u32, height: u32) -> Color {
    if x >= width || y >= height {
        return Color::Reset;
    }
    surface.pixel(x, y).map_or(Color::Reset, to_color)
}

/// Terminal color for a pixel; fully transparent shows the terminal background.
fn to_color(pixel: Rgba) -> Color {
    if pixel.is_transparent() {
        Color::Reset
    } else {
        Color::Rgb(pixel.r, pixel.g, pixel.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::surface::BarRect;

    #[test]
    fn test_container_uses_two_pixels_per_row() {
        let size = container_for(Rect::new(0, 0, 80, 12));
        assert_eq!(size, ContainerSize::new(80.0, 24.0));
    }

    #[test]
    fn test_surface_x_inside_area_only() {
        let area = Rect::new(4, 0, 10, 5);
        assert_eq!(surface_x(area, 4), Some(0.5));
        assert_eq!(surface_x(area, 13), Some(9.5));
        assert_eq!(surface_x(area, 3), None);
        assert_eq!(surface_x(area, 14), None);
    }

    #[test]
    fn test_blit_half_blocks() {
        let mut surface = PixelSurface::new(2, 4);
        surface.clear(Rgba::TRANSPARENT);
        surface.fill_bar(
            BarRect {
                x: 0.0,
                y: 1.0,
                width: 1.0,
                height: 2.0,
            },
            0.0,
            Rgba::rgb(255, 0, 0),
        );

        let area = Rect::new(0, 0, 2, 2);
        let mut buf = Buffer::empty(area);
        CanvasView::new(&surface).render(area, &mut buf);

        let top = &buf[(0, 0)];
        assert_eq!(top.symbol(), UPPER_HALF);
        assert_eq!(top.fg, Color::Reset);
        assert_eq!(top.bg, Color::Rgb(255, 0, 0));

        let bottom = &buf[(0, 1)];
        assert_eq!(bottom.fg, Color::Rgb(255, 0, 0));
        assert_eq!(bottom.bg, Color::Reset);

        assert_eq!(buf[(1, 0)].fg, Color::Reset);
    }

    #[test]
    fn test_blit_beyond_surface_is_reset() {
        let surface = PixelSurface::new(1, 2);
        let area = Rect::new(0, 0, 3, 3);
        let mut buf = Buffer::empty(area);
        CanvasView::new(&surface).render(area, &mut buf);
        assert_eq!(buf[(2, 2)].fg, Color::Reset);
        assert_eq!(buf[(2, 2)].bg, Color::Reset);
    }
}
