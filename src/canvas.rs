use eframe::egui;
use image::{DynamicImage, RgbaImage};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rectangle {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    #[serde(skip)]
    pub handle: u64,
}

impl Rectangle {
    pub fn to_egui(&self) -> egui::Rect {
        egui::Rect::from_two_pos(egui::pos2(self.x0, self.y0), egui::pos2(self.x1, self.y1))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawState {
    Idle,
    Drawing(Rectangle),
}

/// What the canvas shows: the current image, rectangles drawn over it, and
/// the drag in progress. Positions are canvas coordinates, which coincide
/// with image pixels since the image is anchored at the top-left corner.
pub struct CanvasState {
    source: Option<DynamicImage>,
    shown: Option<RgbaImage>,
    revision: u64,
    rectangles: Vec<Rectangle>,
    draw: DrawState,
    next_handle: u64,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            source: None,
            shown: None,
            revision: 0,
            rectangles: Vec::new(),
            draw: DrawState::Idle,
            next_handle: 1,
        }
    }
}

impl CanvasState {
    /// Replace the displayed image, dropping every rectangle and the drag.
    pub fn show_image(&mut self, image: DynamicImage) {
        self.reset();
        self.shown = Some(image.to_rgba8());
        self.source = Some(image);
        self.revision += 1;
    }

    /// Display a derived picture (e.g. a composite) over the same source.
    /// Rectangles are kept.
    pub fn show_overlay(&mut self, overlay: RgbaImage) {
        self.draw = DrawState::Idle;
        self.shown = Some(overlay);
        self.revision += 1;
    }

    pub fn reset(&mut self) {
        self.source = None;
        self.shown = None;
        self.rectangles.clear();
        self.draw = DrawState::Idle;
        self.revision += 1;
    }

    pub fn source(&self) -> Option<&DynamicImage> {
        self.source.as_ref()
    }

    pub fn shown(&self) -> Option<&RgbaImage> {
        self.shown.as_ref()
    }

    /// Bumped whenever `shown` changes, so textures know to reload.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn rectangles(&self) -> &[Rectangle] {
        &self.rectangles
    }

    pub fn draw_state(&self) -> &DrawState {
        &self.draw
    }

    pub fn press(&mut self, pos: egui::Pos2) {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.draw = DrawState::Drawing(Rectangle {
            x0: pos.x,
            y0: pos.y,
            x1: pos.x,
            y1: pos.y,
            handle,
        });
    }

    pub fn drag_to(&mut self, pos: egui::Pos2) {
        if let DrawState::Drawing(rect) = &mut self.draw {
            rect.x1 = pos.x;
            rect.y1 = pos.y;
        }
    }

    pub fn release(&mut self, pos: egui::Pos2) {
        self.drag_to(pos);
        if let DrawState::Drawing(rect) = std::mem::replace(&mut self.draw, DrawState::Idle) {
            self.rectangles.push(rect);
        }
    }

    pub fn clear_rectangles(&mut self) {
        self.rectangles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::new(w, h))
    }

    #[test]
    fn press_drag_release_commits_one_rectangle() {
        let mut canvas = CanvasState::default();
        canvas.press(egui::pos2(10.0, 20.0));
        canvas.drag_to(egui::pos2(30.0, 25.0));
        canvas.drag_to(egui::pos2(40.0, 50.0));
        assert!(canvas.rectangles().is_empty());
        canvas.release(egui::pos2(42.0, 51.0));

        assert_eq!(canvas.draw_state(), &DrawState::Idle);
        let rect = &canvas.rectangles()[0];
        assert_eq!((rect.x0, rect.y0, rect.x1, rect.y1), (10.0, 20.0, 42.0, 51.0));
    }

    #[test]
    fn idle_ignores_moves_and_releases() {
        let mut canvas = CanvasState::default();
        canvas.drag_to(egui::pos2(5.0, 5.0));
        canvas.release(egui::pos2(6.0, 6.0));
        assert_eq!(canvas.draw_state(), &DrawState::Idle);
        assert!(canvas.rectangles().is_empty());
    }

    #[test]
    fn handles_are_distinct() {
        let mut canvas = CanvasState::default();
        for i in 0..3 {
            let p = egui::pos2(i as f32, i as f32);
            canvas.press(p);
            canvas.release(p + egui::vec2(4.0, 4.0));
        }
        let mut handles: Vec<u64> = canvas.rectangles().iter().map(|r| r.handle).collect();
        handles.dedup();
        assert_eq!(handles.len(), 3);
        canvas.clear_rectangles();
        assert!(canvas.rectangles().is_empty());
    }

    #[test]
    fn new_image_drops_rectangles_and_bumps_revision() {
        let mut canvas = CanvasState::default();
        canvas.show_image(blank(4, 4));
        canvas.press(egui::pos2(1.0, 1.0));
        canvas.release(egui::pos2(2.0, 2.0));
        canvas.press(egui::pos2(0.0, 0.0));
        let before = canvas.revision();

        canvas.show_image(blank(8, 8));
        assert!(canvas.rectangles().is_empty());
        assert_eq!(canvas.draw_state(), &DrawState::Idle);
        assert!(canvas.revision() > before);
        assert_eq!(canvas.shown().map(|s| s.dimensions()), Some((8, 8)));
    }
}
