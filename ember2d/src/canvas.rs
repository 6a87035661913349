//! Software rasterizer behind the windowed host.
//!
//! Draws into an sRGB `RgbaImage` with source-over blending. Shapes are
//! sampled at pixel centres without anti-aliasing; images use nearest
//! neighbour; text is rasterized with `ab_glyph` when a font is set.

use std::f32::consts::TAU;

use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};
use anyhow::{anyhow, Result};
use image::{Rgba, RgbaImage};

use crate::assets::{to_rgba8, ImageHandle};
use crate::collision::Bounds;
use crate::surface::{Color, Surface, TransformStack};

pub struct Canvas {
    pixels: RgbaImage,
    clear_color: Color,
    transform: TransformStack,
    font: Option<FontArc>,
    warned_missing_font: bool,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width.max(1), height.max(1)),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            transform: TransformStack::default(),
            font: None,
            warned_missing_font: false,
        }
    }

    #[must_use]
    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn set_font(&mut self, font: FontArc) {
        self.font = Some(font);
    }

    /// Parse a TTF/OTF font for `fill_text`.
    pub fn load_font(&mut self, bytes: Vec<u8>) -> Result<()> {
        let font = FontArc::try_from_vec(bytes).map_err(|e| anyhow!("Invalid font: {e}"))?;
        self.font = Some(font);
        Ok(())
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.pixels.get_pixel(x, y)
    }

    /// Pixel bounds `[x0, x1) x [y0, y1)` covered by `rect`, clipped to the canvas.
    fn pixel_span(&self, rect: Bounds) -> Option<(u32, u32, u32, u32)> {
        let (w, h) = (self.pixels.width() as f32, self.pixels.height() as f32);
        let x0 = rect.x.round().clamp(0.0, w);
        let y0 = rect.y.round().clamp(0.0, h);
        let x1 = rect.right().round().clamp(0.0, w);
        let y1 = rect.bottom().round().clamp(0.0, h);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    fn blend(&mut self, x: u32, y: u32, src: Rgba<u8>, coverage: f32) {
        let alpha = f32::from(src[3]) / 255.0 * coverage.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let dst = self.pixels.get_pixel_mut(x, y);
        let dst_alpha = f32::from(dst[3]) / 255.0;
        for c in 0..3 {
            let value = f32::from(src[c]) * alpha + f32::from(dst[c]) * (1.0 - alpha);
            dst[c] = value.round() as u8;
        }
        dst[3] = ((alpha + dst_alpha * (1.0 - alpha)) * 255.0).round() as u8;
    }
}

impl Surface for Canvas {
    fn size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    fn clear(&mut self) {
        let color = to_rgba8(self.clear_color);
        for pixel in self.pixels.pixels_mut() {
            *pixel = color;
        }
    }

    fn fill_rect(&mut self, rect: Bounds, color: Color) {
        let rect = self.transform.map_rect(rect);
        let Some((x0, y0, x1, y1)) = self.pixel_span(rect) else {
            return;
        };
        let src = to_rgba8(color);
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend(x, y, src, 1.0);
            }
        }
    }

    fn fill_arc(&mut self, cx: f32, cy: f32, radius: f32, start: f32, end: f32, color: Color) {
        let center = self.transform.map_point(cx, cy);
        let radius = radius * self.transform.uniform_scale();
        if radius <= 0.0 {
            return;
        }
        let sweep = end - start;
        let full = sweep.abs() >= TAU;
        let span = Bounds::new(center.x - radius, center.y - radius, radius * 2.0, radius * 2.0);
        let Some((x0, y0, x1, y1)) = self.pixel_span(span) else {
            return;
        };
        let src = to_rgba8(color);
        let r2 = radius * radius;

        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - center.x;
                let dy = y as f32 + 0.5 - center.y;
                if dx * dx + dy * dy > r2 {
                    continue;
                }
                if !full {
                    let angle = dy.atan2(dx);
                    if (angle - start).rem_euclid(TAU) > sweep.rem_euclid(TAU) {
                        continue;
                    }
                }
                self.blend(x, y, src, 1.0);
            }
        }
    }

    fn draw_image(&mut self, image: &ImageHandle, src: Bounds, dest: Bounds) {
        let dest = self.transform.map_rect(dest);
        if dest.width <= 0.0 || dest.height <= 0.0 {
            return;
        }
        let Some((x0, y0, x1, y1)) = self.pixel_span(dest) else {
            return;
        };
        let source = image.pixels();
        let (sw, sh) = source.dimensions();
        if sw == 0 || sh == 0 {
            return;
        }

        for y in y0..y1 {
            let v = src.y + (y as f32 + 0.5 - dest.y) / dest.height * src.height;
            let sy = (v.floor().max(0.0) as u32).min(sh - 1);
            for x in x0..x1 {
                let u = src.x + (x as f32 + 0.5 - dest.x) / dest.width * src.width;
                let sx = (u.floor().max(0.0) as u32).min(sw - 1);
                let texel = *source.get_pixel(sx, sy);
                self.blend(x, y, texel, 1.0);
            }
        }
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, size: f32, color: Color) {
        let Some(font) = self.font.clone() else {
            if !self.warned_missing_font {
                log::warn!("fill_text called without a font; text is not drawn");
                self.warned_missing_font = true;
            }
            return;
        };

        let origin = self.transform.map_point(x, y);
        let scale = PxScale::from(size * self.transform.uniform_scale());
        let scaled = font.as_scaled(scale);
        let src = to_rgba8(color);
        let (w, h) = self.pixels.dimensions();

        let mut caret = origin.x;
        let mut previous = None;
        for ch in text.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(scale, point(caret, origin.y));
            caret += scaled.h_advance(id);
            previous = Some(id);

            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            let mut coverage = Vec::new();
            outlined.draw(|gx, gy, c| coverage.push((gx, gy, c)));
            for (gx, gy, c) in coverage {
                let px = bounds.min.x as i64 + i64::from(gx);
                let py = bounds.min.y as i64 + i64::from(gy);
                if px < 0 || py < 0 || px >= i64::from(w) || py >= i64::from(h) {
                    continue;
                }
                self.blend(px as u32, py as u32, src, c);
            }
        }
    }

    fn save(&mut self) {
        self.transform.save();
    }

    fn restore(&mut self) {
        self.transform.restore();
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.transform.translate(dx, dy);
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.transform.scale(sx, sy);
    }
}
