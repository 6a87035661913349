//! The drawing contract the frame loop renders through.
//!
//! The runtime only ever issues draw and transform calls; it never reads
//! pixels back. [`HeadlessSurface`] records those calls, [`crate::canvas::Canvas`]
//! rasterizes them.

use glam::{Affine2, Vec2 as GlamVec2};

use crate::assets::ImageHandle;
use crate::collision::Bounds;

/// RGBA color with components in `0.0..=1.0`.
pub type Color = [f32; 4];

/// Build an opaque color from a `0xRRGGBB` literal.
pub fn rgb(hex: u32) -> Color {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
        1.0,
    ]
}

/// Immediate-mode 2D drawing target with a save/restore transform stack.
pub trait Surface {
    /// Surface size in pixels.
    fn size(&self) -> (u32, u32);

    /// Reset every pixel to the clear color. Ignores the current transform.
    fn clear(&mut self);

    fn fill_rect(&mut self, rect: Bounds, color: Color);

    /// Fill the pie slice between two angles (radians, clockwise from +x).
    fn fill_arc(&mut self, cx: f32, cy: f32, radius: f32, start: f32, end: f32, color: Color);

    /// Copy the `src` region of `image` into `dest`, scaling as needed.
    fn draw_image(&mut self, image: &ImageHandle, src: Bounds, dest: Bounds);

    /// Draw text with its baseline starting at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: f32, y: f32, size: f32, color: Color);

    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, dx: f32, dy: f32);
    fn scale(&mut self, sx: f32, sy: f32);

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color) {
        self.fill_arc(cx, cy, radius, 0.0, std::f32::consts::TAU, color);
    }
}

/// Transform stack shared by the built-in surfaces.
#[derive(Clone, Debug)]
pub(crate) struct TransformStack {
    current: Affine2,
    saved: Vec<Affine2>,
}

impl Default for TransformStack {
    fn default() -> Self {
        Self {
            current: Affine2::IDENTITY,
            saved: Vec::new(),
        }
    }
}

impl TransformStack {
    pub(crate) fn current(&self) -> Affine2 {
        self.current
    }

    pub(crate) fn depth(&self) -> usize {
        self.saved.len()
    }

    pub(crate) fn save(&mut self) {
        self.saved.push(self.current);
    }

    pub(crate) fn restore(&mut self) {
        match self.saved.pop() {
            Some(t) => self.current = t,
            None => log::warn!("restore() without a matching save()"),
        }
    }

    pub(crate) fn translate(&mut self, dx: f32, dy: f32) {
        self.current = self.current * Affine2::from_translation(GlamVec2::new(dx, dy));
    }

    pub(crate) fn scale(&mut self, sx: f32, sy: f32) {
        self.current = self.current * Affine2::from_scale(GlamVec2::new(sx, sy));
    }

    /// Map a rectangle through the current transform. Only translate and
    /// scale are ever applied, so the result stays axis-aligned.
    pub(crate) fn map_rect(&self, rect: Bounds) -> Bounds {
        let a = self.current.transform_point2(GlamVec2::new(rect.x, rect.y));
        let b = self
            .current
            .transform_point2(GlamVec2::new(rect.right(), rect.bottom()));
        let min = a.min(b);
        let max = a.max(b);
        Bounds::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    pub(crate) fn map_point(&self, x: f32, y: f32) -> GlamVec2 {
        self.current.transform_point2(GlamVec2::new(x, y))
    }

    /// Average axis scale, used for radii and font sizes.
    pub(crate) fn uniform_scale(&self) -> f32 {
        let m = self.current.matrix2;
        (m.x_axis.length() + m.y_axis.length()) * 0.5
    }
}

/// One recorded surface call. Draw commands carry the rectangle already
/// mapped into surface pixels.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear,
    Rect {
        rect: Bounds,
        color: Color,
    },
    Arc {
        center: (f32, f32),
        radius: f32,
        start: f32,
        end: f32,
        color: Color,
    },
    Image {
        size: (u32, u32),
        src: Bounds,
        dest: Bounds,
    },
    Text {
        text: String,
        position: (f32, f32),
        size: f32,
        color: Color,
    },
    Save,
    Restore,
    Translate(f32, f32),
    Scale(f32, f32),
}

/// A surface that draws nothing and remembers every call.
///
/// Used for tests and for running the frame loop without a window.
#[derive(Clone, Debug)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    transform: TransformStack,
    commands: Vec<DrawCommand>,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            transform: TransformStack::default(),
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Hand back everything recorded so far and start a fresh log.
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn transform(&self) -> Affine2 {
        self.transform.current()
    }

    /// Number of unmatched `save` calls.
    pub fn save_depth(&self) -> usize {
        self.transform.depth()
    }

    /// Only the filled rectangles, in draw order.
    pub fn rects(&self) -> Vec<(Bounds, Color)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Rect { rect, color } => Some((*rect, *color)),
                _ => None,
            })
            .collect()
    }
}

impl Surface for HeadlessSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn fill_rect(&mut self, rect: Bounds, color: Color) {
        let rect = self.transform.map_rect(rect);
        self.commands.push(DrawCommand::Rect { rect, color });
    }

    fn fill_arc(&mut self, cx: f32, cy: f32, radius: f32, start: f32, end: f32, color: Color) {
        let center = self.transform.map_point(cx, cy);
        self.commands.push(DrawCommand::Arc {
            center: (center.x, center.y),
            radius: radius * self.transform.uniform_scale(),
            start,
            end,
            color,
        });
    }

    fn draw_image(&mut self, image: &ImageHandle, src: Bounds, dest: Bounds) {
        let dest = self.transform.map_rect(dest);
        self.commands.push(DrawCommand::Image {
            size: (image.width(), image.height()),
            src,
            dest,
        });
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, size: f32, color: Color) {
        let p = self.transform.map_point(x, y);
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            position: (p.x, p.y),
            size: size * self.transform.uniform_scale(),
            color,
        });
    }

    fn save(&mut self) {
        self.transform.save();
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.transform.restore();
        self.commands.push(DrawCommand::Restore);
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.transform.translate(dx, dy);
        self.commands.push(DrawCommand::Translate(dx, dy));
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.transform.scale(sx, sy);
        self.commands.push(DrawCommand::Scale(sx, sy));
    }
}
