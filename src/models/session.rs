// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation workflow state machine.
//!
//! One session covers one uploaded image: boxes are drawn, a classification or
//! manual labeling pass attaches labels, the user corrects them, and the
//! labeled regions are handed to the persistence collaborator one by one.
//!
//! ```text
//! Empty --upload--> Drawing --classify / start_labeling--> Reviewing
//! Reviewing --set_label (edit)--> Correcting
//! Reviewing | Correcting --save--> Saved --save (retry)--> Saved
//! any --reset / upload--> Empty / Drawing
//! ```

use super::image_manager::ImageManager;
use super::region::{GlyphLabel, Label, Region, RegionStatus};
use super::region_store::{RegionStore, RegionUpdate};
use crate::config::DisplayBounds;
use crate::error::{EngineError, Result};
use crate::io::media;
use crate::services::{Classifier, PersistenceService, SaveOutcome, SavePayload};
use crate::util::geometry::DisplayRect;
use image::DynamicImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No image loaded
    Empty,
    /// Image loaded, boxes being drawn
    Drawing,
    /// A classification or labeling pass ran
    Reviewing,
    /// The user edited at least one reviewed label
    Correcting,
    /// Finalized regions were handed to persistence
    Saved,
}

/// A region that a pass had to skip, with the reason shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionWarning {
    pub index: usize,
    pub message: String,
}

pub struct AnnotationSession {
    phase: Phase,
    bounds: DisplayBounds,
    demo_mode: bool,
    image_name: Option<String>,
    manager: Option<ImageManager>,
    outcomes: Vec<SaveOutcome>,
}

impl AnnotationSession {
    pub fn new(bounds: DisplayBounds) -> Self {
        Self {
            phase: Phase::Empty,
            bounds,
            demo_mode: false,
            image_name: None,
            manager: None,
            outcomes: Vec::new(),
        }
    }

    /// In demo mode nothing reaches the persistence collaborator.
    pub fn with_demo_mode(mut self, demo_mode: bool) -> Self {
        self.demo_mode = demo_mode;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn image_name(&self) -> Option<&str> {
        self.image_name.as_deref()
    }

    pub fn manager(&self) -> Option<&ImageManager> {
        self.manager.as_ref()
    }

    pub fn regions(&self) -> Option<&RegionStore> {
        self.manager.as_ref().map(ImageManager::regions)
    }

    /// Outcomes of the last save.
    pub fn outcomes(&self) -> &[SaveOutcome] {
        &self.outcomes
    }

    fn require(&self, allowed: &[Phase], action: &'static str) -> Result<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(EngineError::InvalidTransition {
                phase: self.phase,
                action,
            })
        }
    }

    fn manager_mut(&mut self, action: &'static str) -> Result<&mut ImageManager> {
        let phase = self.phase;
        self.manager
            .as_mut()
            .ok_or(EngineError::InvalidTransition { phase, action })
    }

    /// Decode an upload and start a new session on it.
    ///
    /// A file that fails to decode leaves the session untouched.
    pub fn upload(&mut self, name: &str, bytes: &[u8]) -> Result<DynamicImage> {
        let manager = ImageManager::decode(bytes).map_err(|e| {
            log::warn!("Rejected upload {}: {}", name, e);
            e
        })?;
        Ok(self.open(name, manager))
    }

    /// Start a new session on an already decoded image and return the
    /// display copy.
    pub fn open(&mut self, name: &str, mut manager: ImageManager) -> DynamicImage {
        let display = manager.resize_for_display(self.bounds.max_height, self.bounds.max_width);
        let (width, height) = manager.dimensions();
        log::info!(
            "Opened {} ({}x{}, display {}x{})",
            name,
            width,
            height,
            display.width(),
            display.height()
        );
        self.manager = Some(manager);
        self.image_name = Some(name.to_string());
        self.outcomes.clear();
        self.phase = Phase::Drawing;
        display
    }

    /// Forget the image and every region.
    pub fn reset(&mut self) {
        self.manager = None;
        self.image_name = None;
        self.outcomes.clear();
        self.phase = Phase::Empty;
        log::info!("Session reset");
    }

    /// Add a box drawn on the display copy.
    pub fn draw(&mut self, rect: DisplayRect) -> Result<usize> {
        self.require(&[Phase::Drawing], "draw a region")?;
        let index = self.manager_mut("draw a region")?.add_display_region(rect)?;
        log::info!("Added region {}", index);
        Ok(index)
    }

    /// Re-add regions from an exported snapshot. Regions that do not fit the
    /// image are skipped and reported.
    pub fn restore_regions(&mut self, regions: Vec<Region>) -> Result<Vec<RegionWarning>> {
        self.require(&[Phase::Drawing], "restore regions")?;
        let manager = self.manager_mut("restore regions")?;
        let mut warnings = Vec::new();
        for (position, region) in regions.into_iter().enumerate() {
            match manager.add_native_region(region.native) {
                Ok(index) => {
                    if let Some(label) = region.label {
                        manager
                            .regions_mut()
                            .update(index, RegionUpdate::Attach(label))?;
                    }
                }
                Err(e) => {
                    log::warn!("Skipping imported region {}: {}", position, e);
                    warnings.push(RegionWarning {
                        index: position,
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(warnings)
    }

    pub fn remove_region(&mut self, index: usize) -> Result<Region> {
        self.require(
            &[Phase::Drawing, Phase::Reviewing, Phase::Correcting],
            "remove a region",
        )?;
        let region = self.manager_mut("remove a region")?.regions_mut().remove(index)?;
        log::info!("Removed region {}", index);
        Ok(region)
    }

    /// Delete every pending region.
    pub fn clear_regions(&mut self) -> Result<()> {
        self.require(
            &[Phase::Drawing, Phase::Reviewing, Phase::Correcting],
            "clear regions",
        )?;
        self.manager_mut("clear regions")?.regions_mut().clear();
        Ok(())
    }

    /// Classify every pending region without a human label and move to review.
    ///
    /// Manual and corrected labels are left as they are. A region whose crop
    /// or classification fails keeps its previous label and is reported as a
    /// warning; the other regions are still classified.
    pub fn classify(&mut self, classifier: &dyn Classifier) -> Result<Vec<RegionWarning>> {
        self.require(&[Phase::Drawing, Phase::Reviewing], "classify")?;
        let manager = self.manager_mut("classify")?;
        let indices: Vec<usize> = manager
            .regions()
            .pending()
            .filter(|(_, r)| !r.label.as_ref().is_some_and(Label::is_human))
            .map(|(i, _)| i)
            .collect();

        let mut warnings = Vec::new();
        for index in indices {
            let prediction = manager
                .crop_region(index)
                .and_then(|crop| {
                    classifier
                        .classify(&crop.image)
                        .map_err(|e| EngineError::Classification(e.to_string()))
                });
            match prediction {
                Ok(prediction) => {
                    log::info!(
                        "Region {} classified as {} ({:.2}%)",
                        index,
                        prediction.glyph.mzl_number,
                        prediction.confidence
                    );
                    manager.regions_mut().update(
                        index,
                        RegionUpdate::Attach(Label::predicted(prediction.glyph, prediction.confidence)),
                    )?;
                }
                Err(e) => {
                    log::warn!("Skipping region {}: {}", index, e);
                    warnings.push(RegionWarning {
                        index,
                        message: e.to_string(),
                    });
                }
            }
        }

        self.phase = Phase::Reviewing;
        Ok(warnings)
    }

    /// Begin a manual labeling pass without classification.
    pub fn start_labeling(&mut self) -> Result<()> {
        self.require(&[Phase::Drawing], "start labeling")?;
        self.phase = Phase::Reviewing;
        Ok(())
    }

    /// Choose the label of a reviewed region.
    ///
    /// Labeling an unlabeled region keeps the phase; replacing an existing
    /// label is a correction and moves the session to `Correcting`.
    pub fn set_label(&mut self, index: usize, glyph: GlyphLabel) -> Result<&Region> {
        self.require(&[Phase::Reviewing, Phase::Correcting], "set a label")?;
        let store = self.manager_mut("set a label")?.regions_mut();
        let previous = store.get(index)?.label.as_ref().map(|l| l.glyph.mzl_number);
        let is_edit = matches!(previous, Some(mzl) if mzl != glyph.mzl_number);
        store.update(index, RegionUpdate::Correct(glyph))?;
        if is_edit {
            log::info!("Corrected region {}", index);
            self.phase = Phase::Correcting;
        }
        self.manager_mut("set a label")?.regions().get(index)
    }

    /// Go back to drawing more boxes, keeping the labels already attached.
    pub fn resume_drawing(&mut self) -> Result<()> {
        self.require(&[Phase::Reviewing, Phase::Correcting], "resume drawing")?;
        self.phase = Phase::Drawing;
        Ok(())
    }

    /// Finalize every labeled region and hand each unsaved one to `service`.
    ///
    /// Saving is per region: a failure is recorded in its outcome, leaves the
    /// region finalized for a later retry, and does not stop the others.
    /// Accepted regions are marked saved only once the service commits the
    /// batch.
    pub fn save(&mut self, service: &mut dyn PersistenceService) -> Result<Vec<SaveOutcome>> {
        self.require(
            &[Phase::Reviewing, Phase::Correcting, Phase::Saved],
            "save",
        )?;
        let demo_mode = self.demo_mode;
        let img_name = media::image_stem(self.image_name.as_deref().unwrap_or_default()).to_string();
        let manager = self.manager_mut("save")?;

        let labeled: Vec<usize> = manager
            .regions()
            .pending()
            .filter(|(_, r)| r.label.is_some())
            .map(|(i, _)| i)
            .collect();
        for index in labeled {
            manager.regions_mut().finalize(index)?;
        }

        let to_save: Vec<(usize, Region)> = manager
            .regions()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.status == RegionStatus::Finalized)
            .map(|(i, r)| (i, r.clone()))
            .collect();

        let mut outcomes = Vec::with_capacity(to_save.len());
        if demo_mode {
            for (index, region) in &to_save {
                outcomes.push(outcome(*index, region, false, "demo mode: data is not saved"));
            }
        } else if !to_save.is_empty() {
            let bbox_img = manager.bbox_img();
            match media::encode_jpeg_base64(manager.image()) {
                Ok(img) => {
                    for (index, region) in &to_save {
                        let Some(label) = region.label.as_ref() else {
                            continue;
                        };
                        let payload = SavePayload {
                            img_name: img_name.clone(),
                            img: img.clone(),
                            bbox_img,
                            bbox: region.native.to_bbox(),
                            mzl_number: label.glyph.mzl_number.0,
                            confidence: label.confidence(),
                        };
                        let response = if label.is_human() {
                            service.save_annotation(&payload)
                        } else {
                            service.save_classification(&payload)
                        };
                        let result = match response {
                            Ok(response) => outcome(*index, region, response.result, response.message),
                            Err(e) => outcome(
                                *index,
                                region,
                                false,
                                format!("persistence service unavailable: {e:#}"),
                            ),
                        };
                        if !result.success {
                            log::warn!("Region {} not saved: {}", index, result.message);
                        }
                        outcomes.push(result);
                    }

                    if outcomes.iter().any(|o| o.success) {
                        match service.commit() {
                            Ok(()) => {
                                for accepted in outcomes.iter().filter(|o| o.success) {
                                    manager.regions_mut().mark_saved(accepted.index)?;
                                }
                            }
                            Err(e) => {
                                log::error!("Save batch for {} not kept: {:#}", img_name, e);
                                for accepted in outcomes.iter_mut().filter(|o| o.success) {
                                    accepted.success = false;
                                    accepted.message = format!("persistence service unavailable: {e:#}");
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    log::error!("Cannot encode {}: {:#}", img_name, e);
                    for (index, region) in &to_save {
                        outcomes.push(outcome(*index, region, false, format!("{e:#}")));
                    }
                }
            }
        }

        let saved = outcomes.iter().filter(|o| o.success).count();
        log::info!("Saved {}/{} regions of {}", saved, outcomes.len(), img_name);
        self.outcomes = outcomes.clone();
        self.phase = Phase::Saved;
        Ok(outcomes)
    }
}

fn outcome(index: usize, region: &Region, success: bool, message: impl Into<String>) -> SaveOutcome {
    SaveOutcome {
        index,
        mzl_number: region
            .label
            .as_ref()
            .map(|l| l.glyph.mzl_number)
            .unwrap_or_default(),
        success,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::region::{LabelSource, MzlNumber, RegionStatus};
    use crate::services::{Prediction, SaveResponse};
    use crate::util::geometry::NativeRect;
    use anyhow::anyhow;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Jpeg).unwrap();
        buffer.into_inner()
    }

    fn session() -> AnnotationSession {
        AnnotationSession::new(DisplayBounds {
            max_width: 800,
            max_height: 600,
        })
    }

    fn glyph(n: u32) -> GlyphLabel {
        GlyphLabel::bare(MzlNumber(n))
    }

    struct FixedClassifier(u32, f32);

    impl Classifier for FixedClassifier {
        fn classify(&self, _glyph: &DynamicImage) -> anyhow::Result<Prediction> {
            Ok(Prediction {
                glyph: glyph(self.0),
                confidence: self.1,
            })
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn classify(&self, _glyph: &DynamicImage) -> anyhow::Result<Prediction> {
            Err(anyhow!("model offline"))
        }
    }

    /// Records payloads; fails the calls whose position is listed.
    #[derive(Default)]
    struct RecordingService {
        fail_calls: Vec<usize>,
        unavailable: bool,
        fail_commit: bool,
        annotations: Vec<SavePayload>,
        classifications: Vec<SavePayload>,
        calls: usize,
        commits: usize,
    }

    impl RecordingService {
        fn respond(&mut self) -> anyhow::Result<SaveResponse> {
            let call = self.calls;
            self.calls += 1;
            if self.unavailable {
                return Err(anyhow!("connection refused"));
            }
            if self.fail_calls.contains(&call) {
                Ok(SaveResponse::failed("already exists"))
            } else {
                Ok(SaveResponse::ok("saved"))
            }
        }
    }

    impl PersistenceService for RecordingService {
        fn save_annotation(&mut self, payload: &SavePayload) -> anyhow::Result<SaveResponse> {
            self.annotations.push(payload.clone());
            self.respond()
        }

        fn save_classification(&mut self, payload: &SavePayload) -> anyhow::Result<SaveResponse> {
            self.classifications.push(payload.clone());
            self.respond()
        }

        fn commit(&mut self) -> anyhow::Result<()> {
            self.commits += 1;
            if self.fail_commit {
                Err(anyhow!("disk full"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_end_to_end_manual_label() {
        let mut session = session();
        let display = session.upload("tablet.jpg", &jpeg_bytes(1600, 1200)).unwrap();
        assert_eq!((display.width(), display.height()), (800, 600));
        assert_eq!(session.phase(), Phase::Drawing);

        let index = session
            .draw(DisplayRect::new(50.0, 50.0, 100.0, 100.0))
            .unwrap();
        let manager = session.manager().unwrap();
        assert_eq!(
            manager.regions().get(index).unwrap().native,
            NativeRect::new(100, 100, 200, 200)
        );
        let crop = manager.crop_region(index).unwrap();
        assert_eq!((crop.image.width(), crop.image.height()), (200, 200));

        session.start_labeling().unwrap();
        session.set_label(index, glyph(13)).unwrap();
        assert_eq!(session.phase(), Phase::Reviewing);

        let mut service = RecordingService::default();
        let outcomes = session.save(&mut service).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].success);
        assert_eq!(outcomes[0].mzl_number, MzlNumber(13));
        assert_eq!(session.phase(), Phase::Saved);

        let payload = &service.annotations[0];
        assert_eq!(payload.img_name, "tablet");
        assert_eq!(payload.bbox_img, [0, 0, 1600, 1200]);
        assert_eq!(payload.bbox, [100, 100, 300, 300]);
        assert_eq!(payload.mzl_number, 13);
        assert_eq!(payload.confidence, None);
        assert!(!payload.img.is_empty());
        assert_eq!(
            session.regions().unwrap().get(index).unwrap().status,
            RegionStatus::Saved
        );
    }

    #[test]
    fn test_undecodable_upload_keeps_session_empty() {
        let mut session = session();
        let result = session.upload("notes.jpg", b"definitely not a jpeg");
        assert!(matches!(result, Err(EngineError::Decode(_))));
        assert_eq!(session.phase(), Phase::Empty);
        assert!(session.manager().is_none());
    }

    #[test]
    fn test_actions_outside_their_phase_are_rejected() {
        let mut session = session();
        assert!(matches!(
            session.draw(DisplayRect::new(0.0, 0.0, 5.0, 5.0)),
            Err(EngineError::InvalidTransition { phase: Phase::Empty, .. })
        ));

        session.upload("a.jpg", &jpeg_bytes(100, 100)).unwrap();
        let mut service = RecordingService::default();
        assert!(matches!(
            session.save(&mut service),
            Err(EngineError::InvalidTransition { phase: Phase::Drawing, .. })
        ));
        assert!(session.set_label(0, glyph(1)).is_err());
    }

    #[test]
    fn test_classify_with_no_regions_reviews_nothing() {
        let mut session = session();
        session.upload("a.jpg", &jpeg_bytes(100, 100)).unwrap();
        let warnings = session.classify(&FixedClassifier(1, 50.0)).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(session.phase(), Phase::Reviewing);
        assert!(session.regions().unwrap().is_empty());
    }

    #[test]
    fn test_classify_then_correct() {
        let mut session = session();
        session.upload("a.jpg", &jpeg_bytes(200, 100)).unwrap();
        session.draw(DisplayRect::new(0.0, 0.0, 20.0, 20.0)).unwrap();
        session.draw(DisplayRect::new(30.0, 30.0, 20.0, 20.0)).unwrap();

        session.classify(&FixedClassifier(110, 91.5)).unwrap();
        assert_eq!(session.phase(), Phase::Reviewing);
        let label = session.regions().unwrap().get(0).unwrap().label.clone().unwrap();
        assert_eq!(label.source, LabelSource::Predicted { confidence: 91.5 });

        // Confirming the predicted label is not an edit
        session.set_label(0, glyph(110)).unwrap();
        assert_eq!(session.phase(), Phase::Reviewing);

        let region = session.set_label(1, glyph(839)).unwrap();
        assert!(region.label.as_ref().unwrap().is_corrected());
        assert_eq!(session.phase(), Phase::Correcting);

        let mut service = RecordingService::default();
        let outcomes = session.save(&mut service).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(service.classifications.len(), 1);
        assert_eq!(service.classifications[0].confidence, Some(91.5));
        assert_eq!(service.annotations.len(), 1);
        assert_eq!(service.annotations[0].mzl_number, 839);
    }

    #[test]
    fn test_failed_classification_is_a_warning() {
        let mut session = session();
        session.upload("a.jpg", &jpeg_bytes(100, 100)).unwrap();
        session.draw(DisplayRect::new(0.0, 0.0, 20.0, 20.0)).unwrap();

        let warnings = session.classify(&FailingClassifier).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].index, 0);
        assert!(session.regions().unwrap().get(0).unwrap().label.is_none());
        assert_eq!(session.phase(), Phase::Reviewing);
    }

    #[test]
    fn test_save_is_best_effort_and_retryable() {
        let mut session = session();
        session.upload("a.jpg", &jpeg_bytes(300, 100)).unwrap();
        for i in 0..3 {
            session
                .draw(DisplayRect::new(i as f64 * 50.0, 10.0, 40.0, 40.0))
                .unwrap();
        }
        session.start_labeling().unwrap();
        for i in 0..3 {
            session.set_label(i, glyph(1)).unwrap();
        }

        let mut service = RecordingService {
            fail_calls: vec![1],
            ..Default::default()
        };
        let outcomes = session.save(&mut service).unwrap();
        let flags: Vec<bool> = outcomes.iter().map(|o| o.success).collect();
        assert_eq!(flags, vec![true, false, true]);
        assert_eq!(service.commits, 1);

        let store = session.regions().unwrap();
        assert_eq!(store.get(0).unwrap().status, RegionStatus::Saved);
        assert_eq!(store.get(1).unwrap().status, RegionStatus::Finalized);
        assert_eq!(store.get(2).unwrap().status, RegionStatus::Saved);

        // Retry submits only the region that failed
        let mut retry = RecordingService::default();
        let outcomes = session.save(&mut retry).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].index, 1);
        assert!(outcomes[0].success);
        assert_eq!(retry.annotations.len(), 1);
    }

    #[test]
    fn test_unavailable_service_reports_every_region() {
        let mut session = session();
        session.upload("a.jpg", &jpeg_bytes(100, 100)).unwrap();
        session.draw(DisplayRect::new(0.0, 0.0, 20.0, 20.0)).unwrap();
        session.draw(DisplayRect::new(40.0, 40.0, 20.0, 20.0)).unwrap();
        session.classify(&FixedClassifier(24, 60.0)).unwrap();

        let mut service = RecordingService {
            unavailable: true,
            ..Default::default()
        };
        let outcomes = session.save(&mut service).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.success));
        assert!(outcomes[0].message.contains("unavailable"));
        assert_eq!(service.calls, 2);
    }

    #[test]
    fn test_failed_commit_keeps_regions_for_retry() {
        let mut session = session();
        session.upload("a.jpg", &jpeg_bytes(100, 100)).unwrap();
        session.draw(DisplayRect::new(0.0, 0.0, 20.0, 20.0)).unwrap();
        session.draw(DisplayRect::new(40.0, 40.0, 20.0, 20.0)).unwrap();
        session.classify(&FixedClassifier(24, 60.0)).unwrap();

        let mut service = RecordingService {
            fail_commit: true,
            ..Default::default()
        };
        let outcomes = session.save(&mut service).unwrap();
        assert_eq!(service.commits, 1);
        assert!(outcomes.iter().all(|o| !o.success));
        assert!(outcomes[0].message.contains("disk full"));
        let store = session.regions().unwrap();
        assert!(store.iter().all(|r| r.status == RegionStatus::Finalized));

        let mut retry = RecordingService::default();
        let outcomes = session.save(&mut retry).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.success));
    }

    #[test]
    fn test_nothing_accepted_skips_commit() {
        let mut session = session();
        session.upload("a.jpg", &jpeg_bytes(100, 100)).unwrap();
        session.draw(DisplayRect::new(0.0, 0.0, 20.0, 20.0)).unwrap();
        session.classify(&FixedClassifier(24, 60.0)).unwrap();

        let mut service = RecordingService {
            unavailable: true,
            ..Default::default()
        };
        session.save(&mut service).unwrap();
        assert_eq!(service.commits, 0);
    }

    #[test]
    fn test_classify_keeps_manual_labels() {
        let mut session = session();
        session.upload("a.jpg", &jpeg_bytes(100, 100)).unwrap();
        session.draw(DisplayRect::new(0.0, 0.0, 20.0, 20.0)).unwrap();
        session.draw(DisplayRect::new(40.0, 40.0, 20.0, 20.0)).unwrap();
        session.start_labeling().unwrap();
        session.set_label(0, glyph(839)).unwrap();
        assert_eq!(session.phase(), Phase::Reviewing);

        session.classify(&FixedClassifier(1, 40.0)).unwrap();
        let store = session.regions().unwrap();
        let manual = store.get(0).unwrap().label.clone().unwrap();
        assert_eq!(manual.glyph.mzl_number, MzlNumber(839));
        assert_eq!(manual.source, LabelSource::Manual);
        let predicted = store.get(1).unwrap().label.clone().unwrap();
        assert_eq!(predicted.source, LabelSource::Predicted { confidence: 40.0 });
    }

    #[test]
    fn test_classify_after_resume_keeps_corrections() {
        let mut session = session();
        session.upload("a.jpg", &jpeg_bytes(100, 100)).unwrap();
        session.draw(DisplayRect::new(0.0, 0.0, 20.0, 20.0)).unwrap();
        session.classify(&FixedClassifier(1, 40.0)).unwrap();
        session.set_label(0, glyph(839)).unwrap();
        assert_eq!(session.phase(), Phase::Correcting);

        session.resume_drawing().unwrap();
        session.draw(DisplayRect::new(40.0, 40.0, 20.0, 20.0)).unwrap();
        session.classify(&FixedClassifier(24, 75.0)).unwrap();

        let store = session.regions().unwrap();
        let corrected = store.get(0).unwrap().label.clone().unwrap();
        assert!(corrected.is_corrected());
        assert_eq!(corrected.glyph.mzl_number, MzlNumber(839));
        let fresh = store.get(1).unwrap().label.clone().unwrap();
        assert_eq!(fresh.glyph.mzl_number, MzlNumber(24));
        assert_eq!(fresh.source, LabelSource::Predicted { confidence: 75.0 });
    }

    #[test]
    fn test_reclassify_replaces_predictions() {
        let mut session = session();
        session.upload("a.jpg", &jpeg_bytes(100, 100)).unwrap();
        session.draw(DisplayRect::new(0.0, 0.0, 20.0, 20.0)).unwrap();
        session.classify(&FixedClassifier(1, 40.0)).unwrap();
        session.classify(&FixedClassifier(24, 75.0)).unwrap();

        let label = session.regions().unwrap().get(0).unwrap().label.clone().unwrap();
        assert_eq!(label.glyph.mzl_number, MzlNumber(24));
    }

    #[test]
    fn test_unlabeled_regions_are_not_saved() {
        let mut session = session();
        session.upload("a.jpg", &jpeg_bytes(100, 100)).unwrap();
        session.draw(DisplayRect::new(0.0, 0.0, 20.0, 20.0)).unwrap();
        session.draw(DisplayRect::new(40.0, 40.0, 20.0, 20.0)).unwrap();
        session.start_labeling().unwrap();
        session.set_label(1, glyph(89)).unwrap();

        let mut service = RecordingService::default();
        let outcomes = session.save(&mut service).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].index, 1);
        assert!(session.regions().unwrap().get(0).unwrap().is_pending());
    }

    #[test]
    fn test_demo_mode_persists_nothing() {
        let mut session = session().with_demo_mode(true);
        session.upload("a.jpg", &jpeg_bytes(100, 100)).unwrap();
        session.draw(DisplayRect::new(0.0, 0.0, 20.0, 20.0)).unwrap();
        session.classify(&FixedClassifier(1, 99.0)).unwrap();

        let mut service = RecordingService::default();
        let outcomes = session.save(&mut service).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].success);
        assert_eq!(service.calls, 0);
    }

    #[test]
    fn test_new_upload_and_reset_discard_regions() {
        let mut session = session();
        session.upload("a.jpg", &jpeg_bytes(100, 100)).unwrap();
        session.draw(DisplayRect::new(0.0, 0.0, 20.0, 20.0)).unwrap();

        session.upload("b.jpg", &jpeg_bytes(100, 100)).unwrap();
        assert_eq!(session.image_name(), Some("b.jpg"));
        assert!(session.regions().unwrap().is_empty());

        session.reset();
        assert_eq!(session.phase(), Phase::Empty);
        assert!(session.regions().is_none());
    }

    #[test]
    fn test_remove_and_resume_drawing() {
        let mut session = session();
        session.upload("a.jpg", &jpeg_bytes(100, 100)).unwrap();
        session.draw(DisplayRect::new(0.0, 0.0, 20.0, 20.0)).unwrap();
        session.draw(DisplayRect::new(40.0, 40.0, 20.0, 20.0)).unwrap();
        session.classify(&FixedClassifier(1, 70.0)).unwrap();

        let removed = session.remove_region(0).unwrap();
        assert_eq!(removed.native, NativeRect::new(0, 0, 20, 20));
        assert_eq!(session.regions().unwrap().len(), 1);

        session.resume_drawing().unwrap();
        session.draw(DisplayRect::new(70.0, 0.0, 20.0, 20.0)).unwrap();
        let store = session.regions().unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get(0).unwrap().label.is_some());
        assert!(store.get(1).unwrap().label.is_none());
    }

    #[test]
    fn test_restore_skips_regions_outside_image() {
        let mut session = session();
        session.upload("a.jpg", &jpeg_bytes(100, 100)).unwrap();

        let mut inside = Region::new(
            DisplayRect::new(0.0, 0.0, 0.0, 0.0),
            NativeRect::new(10, 10, 30, 30),
        );
        inside.label = Some(Label::manual(glyph(10)));
        let outside = Region::new(
            DisplayRect::new(0.0, 0.0, 0.0, 0.0),
            NativeRect::new(90, 90, 30, 30),
        );

        let warnings = session.restore_regions(vec![inside, outside]).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].index, 1);

        let store = session.regions().unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().display, DisplayRect::new(10.0, 10.0, 30.0, 30.0));
        assert_eq!(store.get(0).unwrap().label_text(), "MZL-10");
    }
}
