use crate::animation::AnimationFrame;
use crate::assets::ImageHandle;
use crate::collision::Bounds;
use crate::surface::Surface;

/// A spritesheet cut into equally sized frames.
#[derive(Clone, Debug)]
pub struct Sprite {
    image: ImageHandle,
    frame_width: u32,
    frame_height: u32,
}

impl Sprite {
    /// Treat the whole image as a single frame.
    pub fn new(image: ImageHandle) -> Self {
        let (w, h) = (image.width(), image.height());
        Self::sheet(image, w, h)
    }

    pub fn sheet(image: ImageHandle, frame_width: u32, frame_height: u32) -> Self {
        Self {
            image,
            frame_width: frame_width.max(1),
            frame_height: frame_height.max(1),
        }
    }

    pub fn image(&self) -> &ImageHandle {
        &self.image
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    pub fn columns(&self) -> u32 {
        self.image.width() / self.frame_width
    }

    pub fn rows(&self) -> u32 {
        self.image.height() / self.frame_height
    }

    /// Source rectangle of a cell in image pixels.
    pub fn cell(&self, frame: AnimationFrame) -> Bounds {
        Bounds::new(
            (frame.col * self.frame_width) as f32,
            (frame.row * self.frame_height) as f32,
            self.frame_width as f32,
            self.frame_height as f32,
        )
    }

    /// Draw one cell at its native size with the top-left snapped to whole pixels.
    pub fn draw(&self, surface: &mut dyn Surface, x: f32, y: f32, frame: AnimationFrame) {
        self.draw_sized(
            surface,
            x,
            y,
            frame,
            self.frame_width as f32,
            self.frame_height as f32,
        );
    }

    pub fn draw_sized(
        &self,
        surface: &mut dyn Surface,
        x: f32,
        y: f32,
        frame: AnimationFrame,
        width: f32,
        height: f32,
    ) {
        let dest = Bounds::new(x.round(), y.round(), width, height);
        surface.draw_image(&self.image, self.cell(frame), dest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawCommand, HeadlessSurface};

    #[test]
    fn test_draws_requested_cell_at_rounded_position() {
        let sheet = ImageHandle::solid(64, 32, [1.0, 1.0, 1.0, 1.0]);
        let sprite = Sprite::sheet(sheet, 16, 16);
        assert_eq!((sprite.columns(), sprite.rows()), (4, 2));

        let mut surface = HeadlessSurface::new(100, 100);
        sprite.draw(&mut surface, 10.4, 20.6, AnimationFrame::new(2, 1));
        assert_eq!(
            surface.commands(),
            &[DrawCommand::Image {
                size: (64, 32),
                src: Bounds::new(32.0, 16.0, 16.0, 16.0),
                dest: Bounds::new(10.0, 21.0, 16.0, 16.0),
            }]
        );
    }

    #[test]
    fn test_whole_image_sprite() {
        let sprite = Sprite::new(ImageHandle::solid(8, 4, [0.0, 0.0, 0.0, 1.0]));
        assert_eq!(sprite.frame_size(), (8, 4));
        assert_eq!(
            sprite.cell(AnimationFrame::default()),
            Bounds::new(0.0, 0.0, 8.0, 4.0)
        );
    }
}
