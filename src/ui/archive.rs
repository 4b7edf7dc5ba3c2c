// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Archive browser window.

use crate::io::archive::{ArchiveRecord, JsonArchive};
use std::collections::HashMap;

/// Show the archived records, with a thumbnail per archived image.
pub fn show(
    ctx: &egui::Context,
    open: &mut bool,
    archive: Option<&JsonArchive>,
    thumbnails: &HashMap<u32, egui::TextureHandle>,
) {
    egui::Window::new("Archive")
        .open(open)
        .default_width(480.0)
        .show(ctx, |ui| {
            let Some(archive) = archive else {
                ui.label("No archive is open");
                return;
            };
            ui.label(
                egui::RichText::new(archive.path().display().to_string())
                    .small()
                    .weak(),
            );

            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.collapsing(
                    format!("Annotations ({})", archive.annotations().len()),
                    |ui| records_grid(ui, "archive_annotations", archive.annotations(), thumbnails),
                );
                ui.collapsing(
                    format!("Classifications ({})", archive.classifications().len()),
                    |ui| {
                        records_grid(
                            ui,
                            "archive_classifications",
                            archive.classifications(),
                            thumbnails,
                        )
                    },
                );
            });
        });
}

fn records_grid(
    ui: &mut egui::Ui,
    id: &str,
    records: &[ArchiveRecord],
    thumbnails: &HashMap<u32, egui::TextureHandle>,
) {
    if records.is_empty() {
        ui.label(egui::RichText::new("empty").weak());
        return;
    }

    egui::Grid::new(id)
        .striped(true)
        .num_columns(5)
        .show(ui, |ui| {
            ui.strong("");
            ui.strong("Image");
            ui.strong("MZL");
            ui.strong("BBox");
            ui.strong("Confidence");
            ui.end_row();

            for record in records {
                match thumbnails.get(&record.image_id) {
                    Some(texture) => {
                        ui.image((texture.id(), egui::vec2(32.0, 32.0)));
                    }
                    None => {
                        ui.label("");
                    }
                }
                ui.label(record.img_name.as_str());
                ui.label(record.mzl_number.to_string());
                ui.label(format!("{:?}", record.bbox));
                ui.label(
                    record
                        .confidence
                        .map(|c| format!("{:.2}%", c))
                        .unwrap_or_else(|| "-".to_string()),
                );
                ui.end_row();
            }
        });
}
