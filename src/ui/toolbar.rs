// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar with the workflow actions.
//!
//! Each button maps to one session transition and is only enabled in the
//! phases where that transition is allowed.

use crate::models::session::Phase;

/// Action requested from the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    None,
    Classify,
    StartLabeling,
    ResumeDrawing,
    ClearRegions,
    Save,
    Reset,
}

/// Display the toolbar and return the clicked action.
pub fn show(ui: &mut egui::Ui, phase: Phase, has_classifier: bool, pending: usize) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        let drawing = phase == Phase::Drawing;
        let reviewing = matches!(phase, Phase::Reviewing | Phase::Correcting);

        let classify = ui
            .add_enabled(
                has_classifier && (drawing || phase == Phase::Reviewing) && pending > 0,
                egui::Button::new("🔍 Classify"),
            )
            .on_disabled_hover_text(if has_classifier {
                "Draw at least one box first"
            } else {
                "No classifier configured (templates_dir)"
            });
        if classify.clicked() {
            action = ToolbarAction::Classify;
        }

        if ui
            .add_enabled(drawing && pending > 0, egui::Button::new("🏷 Label manually"))
            .clicked()
        {
            action = ToolbarAction::StartLabeling;
        }

        if ui
            .add_enabled(reviewing, egui::Button::new("✏ Back to drawing"))
            .clicked()
        {
            action = ToolbarAction::ResumeDrawing;
        }

        if ui
            .add_enabled(
                (drawing || reviewing) && pending > 0,
                egui::Button::new("🗑 Clear boxes"),
            )
            .clicked()
        {
            action = ToolbarAction::ClearRegions;
        }

        ui.separator();

        let save_label = if phase == Phase::Saved {
            "💾 Retry save"
        } else {
            "💾 Save"
        };
        if ui
            .add_enabled(reviewing || phase == Phase::Saved, egui::Button::new(save_label))
            .clicked()
        {
            action = ToolbarAction::Save;
        }

        if ui
            .add_enabled(phase != Phase::Empty, egui::Button::new("⟲ Reset"))
            .clicked()
        {
            action = ToolbarAction::Reset;
        }

        ui.separator();

        let hint = match phase {
            Phase::Empty => "Open an image to begin",
            Phase::Drawing => "Drag on the image to draw a box around each glyph",
            Phase::Reviewing => "Check the labels and pick the right sign where needed",
            Phase::Correcting => "Corrections are kept separately from predictions",
            Phase::Saved => "Saved. Failed regions can be retried",
        };
        ui.label(egui::RichText::new(hint).italics().weak());
    });

    action
}
