// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Region list panel.
//!
//! Lists every region with its crop preview and current label. Pending
//! regions can be relabeled from the catalog or deleted; finalized and saved
//! ones are read-only.

use crate::models::region::{MzlNumber, RegionStatus};
use crate::models::region_store::RegionStore;

/// Action requested from the properties panel.
pub enum PropertiesAction {
    None,
    Select(usize),
    Delete(usize),
    SetLabel(usize, MzlNumber),
}

/// Display the region list.
///
/// `previews` is indexed like the region store; `choices` are the catalog
/// entries offered by the label selector.
pub fn show(
    ui: &mut egui::Ui,
    regions: Option<&RegionStore>,
    previews: &[Option<egui::TextureHandle>],
    choices: &[(MzlNumber, String)],
    selected: Option<usize>,
    labeling_enabled: bool,
) -> PropertiesAction {
    let mut action = PropertiesAction::None;

    ui.heading("Regions");
    ui.separator();

    let Some(store) = regions.filter(|s| !s.is_empty()) else {
        ui.label(egui::RichText::new("No regions yet").weak());
        return action;
    };

    ui.label(format!(
        "{} pending, {} finalized",
        store.pending_count(),
        store.finalized_count()
    ));
    ui.add_space(4.0);

    egui::ScrollArea::vertical().show(ui, |ui| {
        for (index, region) in store.iter().enumerate() {
            let is_selected = selected == Some(index);

            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.horizontal(|ui| {
                    if ui
                        .selectable_label(is_selected, format!("Region {}", index + 1))
                        .clicked()
                    {
                        action = PropertiesAction::Select(index);
                    }

                    let status = match region.status {
                        RegionStatus::Pending => "pending",
                        RegionStatus::Finalized => "finalized",
                        RegionStatus::Saved => "saved",
                    };
                    ui.label(egui::RichText::new(status).small().weak());

                    if region.is_pending() {
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.small_button("🗑").on_hover_text("Delete region").clicked() {
                                action = PropertiesAction::Delete(index);
                            }
                        });
                    }
                });

                ui.horizontal(|ui| {
                    if let Some(Some(texture)) = previews.get(index) {
                        ui.image((texture.id(), egui::vec2(64.0, 64.0)));
                    }

                    ui.vertical(|ui| {
                        match region.label.as_ref() {
                            Some(label) => {
                                ui.label(egui::RichText::new(label.glyph.summary()).strong());
                                ui.label(egui::RichText::new(label.annotation()).small());
                            }
                            None => {
                                ui.label(egui::RichText::new("unlabeled").italics().weak());
                            }
                        }
                        ui.label(
                            egui::RichText::new(format!("bbox {}", region.native))
                                .small()
                                .weak(),
                        );
                    });
                });

                if region.is_pending() && labeling_enabled {
                    let current = region.label.as_ref().map(|l| l.glyph.mzl_number);
                    let selected_text = current
                        .and_then(|mzl| choices.iter().find(|(n, _)| *n == mzl))
                        .map(|(_, text)| text.clone())
                        .unwrap_or_else(|| "Select glyph...".to_string());

                    egui::ComboBox::from_id_source(("glyph_label", index))
                        .width(ui.available_width())
                        .selected_text(selected_text)
                        .show_ui(ui, |ui| {
                            for (mzl, text) in choices {
                                if ui.selectable_label(current == Some(*mzl), text.as_str()).clicked()
                                    && current != Some(*mzl)
                                {
                                    action = PropertiesAction::SetLabel(index, *mzl);
                                }
                            }
                        });
                }
            });
            ui.add_space(2.0);
        }
    });

    action
}
