// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas for the display image and its regions.
//!
//! The display copy is painted at its own size, so canvas pixels are display
//! space pixels. Boxes are drawn by dragging and clamped to the image before
//! they are handed to the session.

use crate::models::region::{Region, RegionStatus};
use crate::models::region_store::RegionStore;
use crate::util::geometry::DisplayRect;

/// Smallest box edge accepted from a drag, in display pixels.
const MIN_BOX_EDGE: f64 = 2.0;

/// Result of canvas interaction.
pub enum CanvasAction {
    None,
    DrawRegion(DisplayRect),
    SelectRegion(usize),
    Deselect,
}

/// Display the canvas and handle mouse interactions.
pub fn show(
    ui: &mut egui::Ui,
    texture: Option<&egui::TextureHandle>,
    regions: Option<&RegionStore>,
    selected: Option<usize>,
    drawing_enabled: bool,
    drag_start: &mut Option<egui::Pos2>,
) -> CanvasAction {
    let mut action = CanvasAction::None;
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);

    let Some(texture) = texture else {
        show_welcome(ui);
        return action;
    };

    egui::ScrollArea::both().show(ui, |ui| {
        let size = texture.size_vec2();
        let (image_rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
        let painter = ui.painter_at(image_rect);

        painter.image(
            texture.id(),
            image_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        if let Some(store) = regions {
            for (index, region) in store.iter().enumerate() {
                draw_region(&painter, image_rect, index, region, selected == Some(index));
            }
        }

        let to_display = |pos: egui::Pos2| {
            let rel = pos - image_rect.min;
            (rel.x as f64, rel.y as f64)
        };

        if drawing_enabled {
            if response.drag_started() {
                *drag_start = response.interact_pointer_pos();
            }

            if let (Some(start), Some(current)) = (*drag_start, response.interact_pointer_pos()) {
                if response.dragged() {
                    painter.rect_stroke(
                        egui::Rect::from_two_pos(start, current),
                        0.0,
                        egui::Stroke::new(1.5, egui::Color32::LIGHT_BLUE),
                    );
                }
            }

            if response.drag_stopped() {
                if let (Some(start), Some(end)) = (drag_start.take(), response.interact_pointer_pos()) {
                    let rect = DisplayRect::from_corners(to_display(start), to_display(end))
                        .clamp_to(size.x as f64, size.y as f64);
                    if rect.width >= MIN_BOX_EDGE && rect.height >= MIN_BOX_EDGE {
                        action = CanvasAction::DrawRegion(rect);
                    }
                }
            }
        }

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let (x, y) = to_display(pos);
                let hit = regions.and_then(|store| {
                    store.iter().enumerate().rev().find_map(|(index, r)| {
                        let d = &r.display;
                        let inside = x >= d.left
                            && x <= d.left + d.width
                            && y >= d.top
                            && y <= d.top + d.height;
                        inside.then_some(index)
                    })
                });
                action = match hit {
                    Some(index) => CanvasAction::SelectRegion(index),
                    None => CanvasAction::Deselect,
                };
            }
        }
    });

    action
}

fn region_color(region: &Region) -> egui::Color32 {
    match region.status {
        RegionStatus::Saved => egui::Color32::GREEN,
        RegionStatus::Finalized => egui::Color32::LIGHT_BLUE,
        RegionStatus::Pending => match region.label.as_ref() {
            Some(label) if label.is_corrected() => egui::Color32::from_rgb(255, 165, 0),
            Some(_) => egui::Color32::YELLOW,
            None => egui::Color32::RED,
        },
    }
}

/// Draw one region box with its index and label.
fn draw_region(
    painter: &egui::Painter,
    image_rect: egui::Rect,
    index: usize,
    region: &Region,
    is_selected: bool,
) {
    let d = &region.display;
    let rect = egui::Rect::from_min_size(
        image_rect.min + egui::vec2(d.left as f32, d.top as f32),
        egui::vec2(d.width as f32, d.height as f32),
    );
    let color = region_color(region);
    let width = if is_selected { 3.0 } else { 1.5 };
    painter.rect_stroke(rect, 0.0, egui::Stroke::new(width, color));

    let text = match region.label.as_ref() {
        Some(label) => format!("{} {}", index + 1, label.glyph.summary()),
        None => format!("{}", index + 1),
    };
    painter.text(
        rect.left_top() - egui::vec2(0.0, 2.0),
        egui::Align2::LEFT_BOTTOM,
        text,
        egui::FontId::proportional(13.0),
        color,
    );
}

fn show_welcome(ui: &mut egui::Ui) {
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            ui.heading(
                egui::RichText::new("Glyph Annotator")
                    .size(32.0)
                    .color(egui::Color32::from_gray(200)),
            );
            ui.label(
                egui::RichText::new("Cuneiform glyph labeling")
                    .size(14.0)
                    .color(egui::Color32::from_gray(150)),
            );
            ui.add_space(20.0);
            ui.label(
                egui::RichText::new("Open a tablet image to begin annotating")
                    .color(egui::Color32::from_gray(180)),
            );
            ui.add_space(10.0);
            ui.label(
                egui::RichText::new("File → Open Image...")
                    .weak()
                    .color(egui::Color32::from_gray(130)),
            );
        });
    });
}
