//! egui backend for the display painting interface.

use egui::{Align2, Color32, FontId, Pos2, Rounding};
use glam::Vec2;
use vantage_displays::paint::{Painter, Stroke, TextAnchor};
use vantage_msgs::ColorRgba;

/// Paints display output into one egui rect. Display coordinates are local
/// to the rect with the origin at its top-left corner.
pub struct EguiPainter<'a> {
    painter: &'a egui::Painter,
    rect: egui::Rect,
}

impl<'a> EguiPainter<'a> {
    pub fn new(painter: &'a egui::Painter, rect: egui::Rect) -> Self {
        Self { painter, rect }
    }

    fn pos(&self, p: Vec2) -> Pos2 {
        Pos2::new(self.rect.min.x + p.x, self.rect.min.y + p.y)
    }
}

fn color32(color: ColorRgba) -> Color32 {
    Color32::from_rgba_unmultiplied(
        (color.r.clamp(0.0, 1.0) * 255.0) as u8,
        (color.g.clamp(0.0, 1.0) * 255.0) as u8,
        (color.b.clamp(0.0, 1.0) * 255.0) as u8,
        (color.a.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

fn stroke32(stroke: Stroke) -> egui::Stroke {
    egui::Stroke::new(stroke.width, color32(stroke.color))
}

fn align2(anchor: TextAnchor) -> Align2 {
    match anchor {
        TextAnchor::Center => Align2::CENTER_CENTER,
        TextAnchor::LeftCenter => Align2::LEFT_CENTER,
        TextAnchor::RightCenter => Align2::RIGHT_CENTER,
        TextAnchor::CenterTop => Align2::CENTER_TOP,
        TextAnchor::CenterBottom => Align2::CENTER_BOTTOM,
    }
}

impl Painter for EguiPainter<'_> {
    fn extent(&self) -> Vec2 {
        Vec2::new(self.rect.width(), self.rect.height())
    }

    fn fill_rect(&mut self, min: Vec2, max: Vec2, color: ColorRgba) {
        self.painter.rect_filled(
            egui::Rect::from_min_max(self.pos(min), self.pos(max)),
            Rounding::ZERO,
            color32(color),
        );
    }

    fn stroke_rect(&mut self, min: Vec2, max: Vec2, stroke: Stroke) {
        self.painter.rect_stroke(
            egui::Rect::from_min_max(self.pos(min), self.pos(max)),
            Rounding::ZERO,
            stroke32(stroke),
        );
    }

    fn line(&mut self, from: Vec2, to: Vec2, stroke: Stroke) {
        self.painter
            .line_segment([self.pos(from), self.pos(to)], stroke32(stroke));
    }

    fn polyline(&mut self, points: &[Vec2], stroke: Stroke) {
        let points: Vec<Pos2> = points.iter().map(|&p| self.pos(p)).collect();
        self.painter.add(egui::Shape::line(points, stroke32(stroke)));
    }

    fn text(&mut self, pos: Vec2, anchor: TextAnchor, text: &str, size: f32, color: ColorRgba) {
        self.painter.text(
            self.pos(pos),
            align2(anchor),
            text,
            FontId::proportional(size),
            color32(color),
        );
    }
}
