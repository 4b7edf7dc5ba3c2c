// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! This module owns the annotation session and its collaborators (catalog,
//! classifier, archive) and turns UI actions into session transitions.

use crate::config::AppConfig;
use crate::io::archive::JsonArchive;
use crate::io::{media, serialization};
use crate::models::image_manager::ImageManager;
use crate::models::region::{GlyphLabel, MzlNumber};
use crate::models::session::{AnnotationSession, Phase, RegionWarning};
use crate::models::snapshot::RegionSnapshot;
use crate::services::catalog::GlyphCatalog;
use crate::services::classifier::{ModelClassifier, TemplateModel};
use crate::services::{Classifier, GlyphLookup, PersistenceService, SavePayload, SaveResponse};
use crate::ui::{archive, canvas, properties, toolbar};
use image::DynamicImage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};

/// Number of status lines kept in the bottom bar.
const STATUS_LINES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl StatusLevel {
    fn color(self) -> egui::Color32 {
        match self {
            StatusLevel::Info => egui::Color32::from_gray(200),
            StatusLevel::Success => egui::Color32::LIGHT_GREEN,
            StatusLevel::Warning => egui::Color32::YELLOW,
            StatusLevel::Error => egui::Color32::LIGHT_RED,
        }
    }
}

/// Result of background image loading operation.
struct LoadedImageData {
    name: String,
    path: PathBuf,
    manager: ImageManager,
    snapshot: Option<RegionSnapshot>,
}

/// Stand-in collaborator used when the archive could not be opened.
struct OfflineArchive;

impl PersistenceService for OfflineArchive {
    fn save_annotation(&mut self, _payload: &SavePayload) -> anyhow::Result<SaveResponse> {
        anyhow::bail!("archive is not open")
    }

    fn save_classification(&mut self, _payload: &SavePayload) -> anyhow::Result<SaveResponse> {
        anyhow::bail!("archive is not open")
    }
}

/// Main application state.
pub struct GlyphAnnotatorApp {
    config: AppConfig,

    session: AnnotationSession,

    catalog: GlyphCatalog,

    /// Label selector entries, in MZL order
    choices: Vec<(MzlNumber, String)>,

    classifier: Option<Box<dyn Classifier>>,

    archive: Option<JsonArchive>,

    /// Path of the image the session is working on
    image_path: Option<PathBuf>,

    /// Display copy of the current image
    display_texture: Option<egui::TextureHandle>,

    /// Crop previews, indexed like the region store
    previews: Vec<Option<egui::TextureHandle>>,

    previews_dirty: bool,

    /// Archived image thumbnails by archive image id
    archive_thumbnails: HashMap<u32, egui::TextureHandle>,

    show_archive: bool,

    selected_region: Option<usize>,

    /// Canvas position where the current drag began
    drag_start: Option<egui::Pos2>,

    /// Receiver for background image loading
    image_loader: Option<Receiver<Result<LoadedImageData, String>>>,

    /// Loading state message
    loading_message: Option<String>,

    status: Vec<(StatusLevel, String)>,
}

impl GlyphAnnotatorApp {
    /// Create the application and its collaborators from the configuration.
    pub fn new(config: AppConfig) -> Self {
        let mut status = Vec::new();

        let catalog = match config.catalog_path.as_deref() {
            Some(path) => match GlyphCatalog::load(path) {
                Ok(catalog) if !catalog.is_empty() => catalog,
                Ok(_) => {
                    log::warn!("Glyph catalog {} is empty", path.display());
                    GlyphCatalog::placeholder()
                }
                Err(e) => {
                    log::error!("Failed to load glyph catalog: {:#}", e);
                    status.push((StatusLevel::Error, format!("Glyph catalog not loaded: {e:#}")));
                    GlyphCatalog::placeholder()
                }
            },
            None => GlyphCatalog::placeholder(),
        };
        log::info!("Glyph catalog with {} entries", catalog.len());
        let choices = catalog.choices();

        let classifier = config.templates_dir.as_deref().and_then(|dir| {
            match TemplateModel::load(dir) {
                Ok(model) => Some(Box::new(ModelClassifier::new(model, catalog.clone()))
                    as Box<dyn Classifier>),
                Err(e) => {
                    log::error!("Failed to load classifier templates: {:#}", e);
                    status.push((StatusLevel::Error, format!("Classifier not available: {e:#}")));
                    None
                }
            }
        });

        let archive = if config.demo_mode {
            status.push((
                StatusLevel::Warning,
                "Demo mode: nothing will be saved".to_string(),
            ));
            None
        } else {
            match JsonArchive::open(&config.archive_path) {
                Ok(archive) => Some(archive),
                Err(e) => {
                    log::error!("Failed to open archive: {:#}", e);
                    status.push((StatusLevel::Error, format!("Archive not available: {e:#}")));
                    None
                }
            }
        };

        let session = AnnotationSession::new(config.display).with_demo_mode(config.demo_mode);

        Self {
            config,
            session,
            catalog,
            choices,
            classifier,
            archive,
            image_path: None,
            display_texture: None,
            previews: Vec::new(),
            previews_dirty: false,
            archive_thumbnails: HashMap::new(),
            show_archive: false,
            selected_region: None,
            drag_start: None,
            image_loader: None,
            loading_message: None,
            status,
        }
    }

    fn push_status(&mut self, level: StatusLevel, message: impl Into<String>) {
        self.status.push((level, message.into()));
        if self.status.len() > STATUS_LINES {
            let excess = self.status.len() - STATUS_LINES;
            self.status.drain(..excess);
        }
    }

    fn report_warnings(&mut self, warnings: Vec<RegionWarning>) {
        for warning in warnings {
            self.push_status(
                StatusLevel::Warning,
                format!("Region {}: {}", warning.index + 1, warning.message),
            );
        }
    }

    /// Load an image file (and optionally the regions to restore on it) in
    /// the background.
    fn load_image_file(&mut self, path: PathBuf, snapshot: Option<RegionSnapshot>) {
        let (sender, receiver) = channel();
        self.image_loader = Some(receiver);
        self.loading_message = Some(format!("Loading {}...", path.display()));

        std::thread::spawn(move || {
            let result = (|| -> Result<LoadedImageData, String> {
                let upload = media::read_upload(&path).map_err(|e| format!("{e:#}"))?;
                let manager = ImageManager::decode(&upload.bytes)
                    .map_err(|e| format!("Failed to load {}: {}", upload.name, e))?;
                Ok(LoadedImageData {
                    name: upload.name,
                    path,
                    manager,
                    snapshot,
                })
            })();

            let _ = sender.send(result);
        });
    }

    /// Import a region snapshot and reload the image it refers to.
    fn import_regions(&mut self, path: PathBuf) {
        match serialization::import(&path) {
            Ok(snapshot) => {
                log::info!(
                    "Imported {} regions from {}",
                    snapshot.regions.len(),
                    path.display()
                );
                let image_path = PathBuf::from(&snapshot.image_path);
                if !image_path.exists() {
                    self.push_status(
                        StatusLevel::Error,
                        format!("Referenced image not found: {}", image_path.display()),
                    );
                    return;
                }
                self.load_image_file(image_path, Some(snapshot));
            }
            Err(e) => {
                log::error!("Failed to import regions: {:#}", e);
                self.push_status(StatusLevel::Error, format!("Import failed: {e:#}"));
            }
        }
    }

    fn export_regions(&mut self, path: PathBuf) {
        let image_path = self
            .image_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        let Some(snapshot) = RegionSnapshot::capture(&self.session, image_path) else {
            return;
        };
        match serialization::export(&snapshot, &path) {
            Ok(()) => {
                log::info!("Exported regions to {}", path.display());
                self.push_status(
                    StatusLevel::Info,
                    format!("Exported {} regions to {}", snapshot.regions.len(), path.display()),
                );
            }
            Err(e) => {
                log::error!("Failed to export regions: {:#}", e);
                self.push_status(StatusLevel::Error, format!("Export failed: {e:#}"));
            }
        }
    }

    /// Put a freshly opened image on the canvas.
    fn show_image(&mut self, ctx: &egui::Context, display: &DynamicImage) {
        self.display_texture = Some(load_texture(ctx, "display_image", display));
        self.selected_region = None;
        self.drag_start = None;
        self.previews_dirty = true;
    }

    fn finish_loading(&mut self, ctx: &egui::Context, loaded: LoadedImageData) {
        let display = self.session.open(&loaded.name, loaded.manager);
        self.image_path = Some(loaded.path);
        self.show_image(ctx, &display);
        self.push_status(StatusLevel::Info, format!("Opened {}", loaded.name));

        if let Some(snapshot) = loaded.snapshot {
            let dimensions = self.session.manager().map(|m| m.dimensions()).unwrap_or_default();
            if !snapshot.matches_dimensions(dimensions) {
                self.push_status(
                    StatusLevel::Warning,
                    format!(
                        "Snapshot was taken on a {}x{} image, this one is {}x{}",
                        snapshot.image_width, snapshot.image_height, dimensions.0, dimensions.1
                    ),
                );
            }
            match self.session.restore_regions(snapshot.regions) {
                Ok(warnings) => self.report_warnings(warnings),
                Err(e) => self.push_status(StatusLevel::Error, e.to_string()),
            }
        }
    }

    /// Decode a dropped file on the UI thread.
    fn open_dropped(&mut self, ctx: &egui::Context, file: egui::DroppedFile) {
        let name = file
            .path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.name.clone());
        let bytes = match (file.bytes, file.path.as_ref()) {
            (Some(bytes), _) => bytes.to_vec(),
            (None, Some(path)) => match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    self.push_status(StatusLevel::Error, format!("Cannot read {name}: {e}"));
                    return;
                }
            },
            (None, None) => return,
        };

        match self.session.upload(&name, &bytes) {
            Ok(display) => {
                self.image_path = file.path;
                self.show_image(ctx, &display);
                self.push_status(StatusLevel::Info, format!("Opened {name}"));
            }
            Err(e) => self.push_status(StatusLevel::Error, format!("{name}: {e}")),
        }
    }

    /// Rebuild the crop previews from the current regions.
    fn refresh_previews(&mut self, ctx: &egui::Context) {
        self.previews_dirty = false;
        let Some(manager) = self.session.manager() else {
            self.previews.clear();
            return;
        };
        let edge = self.config.preview_size;
        let mut previews = vec![None; manager.regions().len()];
        let settled = manager
            .regions()
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.is_pending())
            .map(|(index, _)| manager.crop_region(index));

        for crop in manager.preview_all().chain(settled) {
            match crop {
                Ok(crop) => {
                    log::debug!("Preview for region {} {}", crop.index, crop.label);
                    let thumbnail = media::thumbnail(&crop.image, edge);
                    previews[crop.index] = Some(load_texture(
                        ctx,
                        &format!("preview_{}", crop.index),
                        &thumbnail,
                    ));
                }
                Err(e) => log::warn!("No preview: {}", e),
            }
        }
        self.previews = previews;
    }

    /// Decode thumbnails for archived images not seen yet.
    fn refresh_archive_thumbnails(&mut self, ctx: &egui::Context) {
        let Some(archive) = self.archive.as_ref() else {
            return;
        };
        let edge = self.config.thumbnail_size;
        let mut ids: Vec<u32> = archive
            .annotations()
            .iter()
            .chain(archive.classifications())
            .map(|r| r.image_id)
            .filter(|id| !self.archive_thumbnails.contains_key(id))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        for id in ids {
            let Some(archived) = archive.image(id) else {
                continue;
            };
            match media::decode_base64(&archived.img) {
                Ok(image) => {
                    let thumbnail = media::thumbnail(&image, edge);
                    let texture = load_texture(ctx, &format!("archive_{id}"), &thumbnail);
                    self.archive_thumbnails.insert(id, texture);
                }
                Err(e) => log::warn!("No thumbnail for {}: {:#}", archived.img_name, e),
            }
        }
    }

    fn set_label(&mut self, index: usize, mzl_number: MzlNumber) {
        let glyph = self
            .catalog
            .lookup(mzl_number)
            .unwrap_or_else(|| GlyphLabel::bare(mzl_number));
        match self.session.set_label(index, glyph) {
            Ok(region) => {
                let message = format!(
                    "Region {} labeled {} {}",
                    index + 1,
                    region.label_text(),
                    region.label.as_ref().map(|l| l.annotation()).unwrap_or_default()
                );
                self.push_status(StatusLevel::Info, message);
            }
            Err(e) => self.push_status(StatusLevel::Error, e.to_string()),
        }
    }

    fn remove_region(&mut self, index: usize) {
        match self.session.remove_region(index) {
            Ok(_) => {
                self.selected_region = None;
                self.previews_dirty = true;
            }
            Err(e) => self.push_status(StatusLevel::Error, e.to_string()),
        }
    }

    fn save(&mut self, ctx: &egui::Context) {
        let result = match self.archive.as_mut() {
            Some(archive) => self.session.save(archive),
            None => self.session.save(&mut OfflineArchive),
        };
        match result {
            Ok(outcomes) if outcomes.is_empty() => {
                self.push_status(StatusLevel::Warning, "No labeled regions to save");
            }
            Ok(outcomes) => {
                for outcome in outcomes {
                    let level = if outcome.success {
                        StatusLevel::Success
                    } else {
                        StatusLevel::Error
                    };
                    self.push_status(
                        level,
                        format!("Region {}: {}", outcome.index + 1, outcome.message),
                    );
                }
            }
            Err(e) => self.push_status(StatusLevel::Error, e.to_string()),
        }
        self.previews_dirty = true;
        self.refresh_archive_thumbnails(ctx);
    }

    fn handle_toolbar(&mut self, ctx: &egui::Context, action: toolbar::ToolbarAction) {
        let result = match action {
            toolbar::ToolbarAction::Classify => {
                let Some(classifier) = self.classifier.as_deref() else {
                    return;
                };
                match self.session.classify(classifier) {
                    Ok(warnings) => {
                        self.report_warnings(warnings);
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            toolbar::ToolbarAction::StartLabeling => self.session.start_labeling(),
            toolbar::ToolbarAction::ResumeDrawing => self.session.resume_drawing(),
            toolbar::ToolbarAction::ClearRegions => {
                self.selected_region = None;
                self.previews_dirty = true;
                self.session.clear_regions()
            }
            toolbar::ToolbarAction::Save => {
                self.save(ctx);
                Ok(())
            }
            toolbar::ToolbarAction::Reset => {
                self.session.reset();
                self.image_path = None;
                self.display_texture = None;
                self.selected_region = None;
                self.previews_dirty = true;
                Ok(())
            }
            toolbar::ToolbarAction::None => Ok(()),
        };

        if let Err(e) = result {
            log::warn!("{}", e);
            self.push_status(StatusLevel::Error, e.to_string());
        }
    }
}

fn load_texture(ctx: &egui::Context, name: &str, image: &DynamicImage) -> egui::TextureHandle {
    let (size, pixels) = media::rgba_pixels(image);
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &pixels);
    ctx.load_texture(name, color_image, egui::TextureOptions::LINEAR)
}

impl eframe::App for GlyphAnnotatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for completed image loading
        if let Some(ref receiver) = self.image_loader {
            if let Ok(result) = receiver.try_recv() {
                self.image_loader = None;
                self.loading_message = None;

                match result {
                    Ok(loaded) => self.finish_loading(ctx, loaded),
                    Err(e) => {
                        log::error!("{}", e);
                        self.push_status(StatusLevel::Error, e);
                    }
                }
            }
        }

        // Request repaint if still loading (to update spinner)
        if self.loading_message.is_some() {
            ctx.request_repaint();
        }

        let dropped = ctx.input(|i| i.raw.dropped_files.first().cloned());
        if let Some(file) = dropped {
            if self.loading_message.is_none() {
                self.open_dropped(ctx, file);
            }
        }

        if self.previews_dirty {
            self.refresh_previews(ctx);
        }

        let phase = self.session.phase();
        let has_image = self.session.manager().is_some();

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Image...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Images", media::SUPPORTED_EXTENSIONS)
                            .pick_file()
                        {
                            self.load_image_file(path, None);
                        }
                        ui.close_menu();
                    }
                    if ui.button("Import Regions...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Regions", &["yaml", "yml", "json"])
                            .pick_file()
                        {
                            self.import_regions(path);
                        }
                        ui.close_menu();
                    }
                    ui.add_enabled_ui(has_image, |ui| {
                        ui.menu_button("Export Regions", |ui| {
                            if ui.button("Export as YAML...").clicked() {
                                if let Some(path) = rfd::FileDialog::new()
                                    .add_filter("YAML", &["yaml", "yml"])
                                    .set_file_name("regions.yaml")
                                    .save_file()
                                {
                                    self.export_regions(path);
                                }
                                ui.close_menu();
                            }
                            if ui.button("Export as JSON...").clicked() {
                                if let Some(path) = rfd::FileDialog::new()
                                    .add_filter("JSON", &["json"])
                                    .set_file_name("regions.json")
                                    .save_file()
                                {
                                    self.export_regions(path);
                                }
                                ui.close_menu();
                            }
                        });
                    });
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("View", |ui| {
                    if ui.button("Archive...").clicked() {
                        self.show_archive = true;
                        self.refresh_archive_thumbnails(ctx);
                        ui.close_menu();
                    }
                });
            });
        });

        // Toolbar
        let pending = self
            .session
            .regions()
            .map(|r| r.pending_count())
            .unwrap_or(0);
        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| {
                toolbar::show(ui, phase, self.classifier.is_some(), pending)
            })
            .inner;
        self.handle_toolbar(ctx, toolbar_action);

        // Status bar
        egui::TopBottomPanel::bottom("status_bar")
            .resizable(true)
            .show(ctx, |ui| {
                if let (Some(name), Some(manager)) = (self.session.image_name(), self.session.manager()) {
                    let (width, height) = manager.dimensions();
                    let (display_width, display_height) = manager.display_size();
                    let ratio = manager.ratio();
                    let mut summary = format!(
                        "{name}  {width}x{height} shown at {display_width}x{display_height} (ratio {:.3} x {:.3})",
                        ratio.w, ratio.h
                    );
                    let outcomes = self.session.outcomes();
                    if !outcomes.is_empty() {
                        let saved = outcomes.iter().filter(|o| o.success).count();
                        summary.push_str(&format!("  |  last save: {saved} of {} regions", outcomes.len()));
                    }
                    ui.label(egui::RichText::new(summary).small().weak());
                    ui.separator();
                }
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for (level, message) in &self.status {
                            ui.label(egui::RichText::new(message).color(level.color()));
                        }
                    });
            });

        // Region list (right side)
        let labeling_enabled = matches!(self.session.phase(), Phase::Reviewing | Phase::Correcting);
        let properties_action = egui::SidePanel::right("properties")
            .default_width(280.0)
            .show(ctx, |ui| {
                properties::show(
                    ui,
                    self.session.regions(),
                    &self.previews,
                    &self.choices,
                    self.selected_region,
                    labeling_enabled,
                )
            })
            .inner;

        match properties_action {
            properties::PropertiesAction::Select(index) => self.selected_region = Some(index),
            properties::PropertiesAction::Delete(index) => self.remove_region(index),
            properties::PropertiesAction::SetLabel(index, mzl_number) => {
                self.set_label(index, mzl_number)
            }
            properties::PropertiesAction::None => {}
        }

        // Keyboard shortcuts, unless a text field has focus
        if !ctx.wants_keyboard_input() {
            if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
                self.selected_region = None;
                self.drag_start = None;
            }
            if ctx.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace))
            {
                if let Some(index) = self.selected_region {
                    self.remove_region(index);
                }
            }
        }

        // Main canvas (center)
        let drawing_enabled = self.session.phase() == Phase::Drawing;
        let canvas_action = egui::CentralPanel::default()
            .show(ctx, |ui| {
                if let Some(ref message) = self.loading_message {
                    ui.centered_and_justified(|ui| {
                        ui.vertical_centered(|ui| {
                            ui.add_space(20.0);
                            ui.spinner();
                            ui.add_space(10.0);
                            ui.label(
                                egui::RichText::new(message)
                                    .size(16.0)
                                    .color(egui::Color32::from_gray(200)),
                            );
                        });
                    });
                    canvas::CanvasAction::None
                } else {
                    canvas::show(
                        ui,
                        self.display_texture.as_ref(),
                        self.session.regions(),
                        self.selected_region,
                        drawing_enabled,
                        &mut self.drag_start,
                    )
                }
            })
            .inner;

        match canvas_action {
            canvas::CanvasAction::DrawRegion(rect) => match self.session.draw(rect) {
                Ok(index) => {
                    self.selected_region = Some(index);
                    self.previews_dirty = true;
                }
                Err(e) => self.push_status(StatusLevel::Warning, e.to_string()),
            },
            canvas::CanvasAction::SelectRegion(index) => self.selected_region = Some(index),
            canvas::CanvasAction::Deselect => self.selected_region = None,
            canvas::CanvasAction::None => {}
        }

        archive::show(
            ctx,
            &mut self.show_archive,
            self.archive.as_ref(),
            &self.archive_thumbnails,
        );
    }
}
