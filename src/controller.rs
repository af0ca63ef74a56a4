// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Editor controller.
//!
//! The controller owns the composition and the renderer and is the only
//! place either is mutated. Image loads run on worker threads and report
//! back over a channel; each load is stamped with a generation number and
//! only the most recently issued load may change the background.
//!
//! ```text
//!   Empty ──upload/template──► Loading ──decoded──► Ready
//!     ▲                          │  ▲                 │
//!     └────────decode failed─────┘  └──upload/template┘
//! ```

use crate::error::EditorError;
use crate::io::media::{decode_image, TemplateFetcher};
use crate::models::composition::{
    Composition, ImageOrigin, LayerId, RasterSource, TextDefaults, TextLayer, TextLayerPatch,
};
use crate::render::{Renderer, EXPORT_SCALE};
use crate::util::geometry::{DisplaySize, MAX_DISPLAY_EXTENT};
use egui::Rect;
use image::RgbaImage;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

/// Callback receiving the PNG bytes of every successful export.
pub type SaveCallback = Box<dyn FnMut(&[u8])>;

/// Main editor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    /// No background.
    Empty,
    /// A load is in flight; only its generation may be applied.
    Loading { generation: u64 },
    /// Background present; captions may be edited.
    Ready,
}

impl EditorState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Loading { .. } => "loading an image",
            Self::Ready => "ready",
        }
    }
}

/// Result of a worker's decode, tagged with the load that produced it.
#[derive(Debug)]
pub struct LoadOutcome {
    pub generation: u64,
    pub result: Result<RasterSource, EditorError>,
}

/// What happened when a finished load was resolved.
#[derive(Debug)]
pub enum LoadResolution {
    /// The background was replaced.
    Applied { generation: u64, display: DisplaySize },
    /// The load failed; the composition is unchanged.
    Failed { generation: u64, error: EditorError },
    /// A newer load superseded this one; its result was dropped.
    Discarded { generation: u64 },
}

/// An uncommitted gesture shown in the live view.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerPreview {
    pub id: LayerId,
    pub patch: TextLayerPatch,
}

/// Tunables of the editor core.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSettings {
    pub max_display_extent: f32,
    pub export_scale: f32,
    pub text_defaults: TextDefaults,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            max_display_extent: MAX_DISPLAY_EXTENT,
            export_scale: EXPORT_SCALE,
            text_defaults: TextDefaults::default(),
        }
    }
}

pub struct EditorController {
    composition: Composition,
    state: EditorState,
    generation: u64,
    sender: Sender<LoadOutcome>,
    receiver: Receiver<LoadOutcome>,
    renderer: Renderer,
    fetcher: Arc<dyn TemplateFetcher>,
    export_scale: f32,
    on_save: SaveCallback,
}

impl EditorController {
    pub fn new(
        settings: EditorSettings,
        renderer: Renderer,
        fetcher: Arc<dyn TemplateFetcher>,
        on_save: SaveCallback,
    ) -> Self {
        let (sender, receiver) = channel();
        Self {
            composition: Composition::new(settings.max_display_extent, settings.text_defaults),
            state: EditorState::Empty,
            generation: 0,
            sender,
            receiver,
            renderer,
            fetcher,
            export_scale: settings.export_scale,
            on_save,
        }
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, EditorState::Loading { .. })
    }

    pub fn selected_layer(&self) -> Option<&TextLayer> {
        self.composition.selected_layer()
    }

    /// Decode uploaded bytes on a worker thread.
    ///
    /// Returns the generation of the new load.
    pub fn upload_image(&mut self, bytes: Vec<u8>, name: Option<String>) -> u64 {
        let generation = self.begin_load();
        let sender = self.sender.clone();

        std::thread::spawn(move || {
            let result = decode_image(&bytes, ImageOrigin::Upload { name });
            // The bytes are released here whether or not the result is still wanted.
            drop(bytes);
            let _ = sender.send(LoadOutcome { generation, result });
        });

        generation
    }

    /// Fetch and decode a catalog template on a worker thread.
    pub fn select_template(&mut self, url: &str) -> u64 {
        let generation = self.begin_load();
        let sender = self.sender.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let url = url.to_string();

        std::thread::spawn(move || {
            let result = fetcher
                .fetch(&url)
                .and_then(|fetched| decode_image(&fetched.bytes, fetched.origin));
            let _ = sender.send(LoadOutcome { generation, result });
        });

        generation
    }

    fn begin_load(&mut self) -> u64 {
        self.generation += 1;
        self.state = EditorState::Loading {
            generation: self.generation,
        };
        self.generation
    }

    /// Resolve every load that has finished, without blocking.
    pub fn poll(&mut self) -> Vec<LoadResolution> {
        let mut resolved = Vec::new();
        while let Ok(outcome) = self.receiver.try_recv() {
            resolved.push(self.resolve(outcome));
        }
        resolved
    }

    /// Block until the next load finishes or `timeout` elapses.
    pub fn wait_for_load(&mut self, timeout: Duration) -> Option<LoadResolution> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Some(self.resolve(outcome)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Apply a finished load if it is the current one.
    pub fn resolve(&mut self, outcome: LoadOutcome) -> LoadResolution {
        let LoadOutcome { generation, result } = outcome;
        if self.state != (EditorState::Loading { generation }) {
            return LoadResolution::Discarded { generation };
        }

        match result {
            Ok(source) => {
                let display = self.composition.set_background(Arc::new(source));
                self.state = EditorState::Ready;
                LoadResolution::Applied { generation, display }
            }
            Err(error) => {
                self.state = self.settled_state();
                LoadResolution::Failed { generation, error }
            }
        }
    }

    fn settled_state(&self) -> EditorState {
        if self.composition.background().is_some() {
            EditorState::Ready
        } else {
            EditorState::Empty
        }
    }

    pub fn can_add_text(&self) -> bool {
        self.state == EditorState::Ready
    }

    pub fn can_remove_text(&self) -> bool {
        self.composition.selected().is_some()
    }

    pub fn can_generate(&self) -> bool {
        self.state == EditorState::Ready
            && self
                .composition
                .background()
                .is_some_and(|bg| !bg.source.is_tainted())
    }

    fn precondition(&self, operation: &'static str) -> EditorError {
        EditorError::PreconditionViolation {
            operation,
            state: self.state.name(),
        }
    }

    /// Add a caption at the image center and select it.
    pub fn add_text(&mut self) -> Result<LayerId, EditorError> {
        if !self.can_add_text() {
            return Err(self.precondition("add text"));
        }
        self.composition
            .add_text_layer()
            .ok_or_else(|| self.precondition("add text"))
    }

    /// Remove the selected caption. Without a selection nothing happens.
    pub fn remove_selected_text(&mut self) -> Option<TextLayer> {
        let id = self.composition.selected()?;
        self.composition.remove_text_layer(id)
    }

    /// Apply `patch` to the selected caption. Returns false without a selection.
    pub fn update_selected_text(&mut self, patch: &TextLayerPatch) -> bool {
        match self.composition.selected() {
            Some(id) => self.composition.update_text_layer(id, patch),
            None => false,
        }
    }

    /// Commit the final position of a drag.
    pub fn on_layer_drag_end(&mut self, id: LayerId, x: f32, y: f32) -> bool {
        self.composition
            .update_text_layer(id, &TextLayerPatch::position(egui::pos2(x, y)))
    }

    /// Commit the final size of a resize gesture.
    pub fn on_layer_resize_end(&mut self, id: LayerId, width: f32, font_size_px: u32) -> bool {
        self.composition
            .update_text_layer(id, &TextLayerPatch::size(width, font_size_px))
    }

    pub fn select_layer(&mut self, id: LayerId) -> bool {
        self.composition.select(id)
    }

    pub fn clear_selection(&mut self) {
        self.composition.clear_selection();
    }

    /// Flatten the composition to PNG and hand it to the save callback.
    ///
    /// Selection is cleared first so selection chrome is never part of the
    /// export.
    pub fn generate(&mut self) -> Result<Vec<u8>, EditorError> {
        if self.state != EditorState::Ready {
            return Err(self.precondition("generate a meme"));
        }
        if !self.can_generate() {
            return Err(EditorError::ExportTaintedSurface);
        }

        self.composition.clear_selection();
        let bytes = self.renderer.flatten(&self.composition, self.export_scale)?;
        (self.on_save)(&bytes);
        Ok(bytes)
    }

    /// Paint the live view at `scale`, with an optional uncommitted gesture
    /// applied to one layer.
    pub fn surface(&mut self, scale: f32, preview: Option<&LayerPreview>) -> Option<&RgbaImage> {
        match preview {
            Some(preview) => {
                let mut staged = self.composition.clone();
                staged.update_text_layer(preview.id, &preview.patch);
                self.renderer.paint(&staged, scale)
            }
            None => self.renderer.paint(&self.composition, scale),
        }
    }

    /// Box of a caption in display coordinates, for hit testing.
    pub fn text_bounds(&self, id: LayerId) -> Option<Rect> {
        self.composition
            .layer(id)
            .map(|layer| self.renderer.text_bounds(layer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::media::tests::png_bytes;
    use crate::io::media::FetchedImage;
    use crate::render::text::default_font;
    use egui::{Color32, Pos2};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::sync::Mutex;

    const WAIT: Duration = Duration::from_secs(10);

    /// Serves templates from memory; URLs listed in `gates` block until
    /// their gate sender is used or dropped.
    struct MemoryFetcher {
        images: HashMap<String, FetchedImage>,
        gates: Mutex<HashMap<String, Receiver<()>>>,
    }

    impl MemoryFetcher {
        fn new() -> Self {
            Self {
                images: HashMap::new(),
                gates: Mutex::new(HashMap::new()),
            }
        }

        fn with_image(mut self, url: &str, width: u32, height: u32, granted: bool) -> Self {
            self.images.insert(
                url.to_string(),
                FetchedImage {
                    bytes: png_bytes(width, height, [200, 10, 10, 255]),
                    origin: ImageOrigin::Template {
                        url: url.to_string(),
                        cross_origin_granted: granted,
                    },
                },
            );
            self
        }

        fn gate(&self, url: &str) -> Sender<()> {
            let (tx, rx) = channel();
            self.gates.lock().unwrap().insert(url.to_string(), rx);
            tx
        }
    }

    impl TemplateFetcher for MemoryFetcher {
        fn fetch(&self, url: &str) -> Result<FetchedImage, EditorError> {
            let gate = self.gates.lock().unwrap().remove(url);
            if let Some(gate) = gate {
                let _ = gate.recv();
            }
            self.images
                .get(url)
                .cloned()
                .ok_or_else(|| EditorError::DecodeFailure(format!("{url}: not found")))
        }
    }

    fn controller_with(fetcher: MemoryFetcher) -> (EditorController, Rc<RefCell<Vec<Vec<u8>>>>) {
        let saved = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&saved);
        let controller = EditorController::new(
            EditorSettings::default(),
            Renderer::new(default_font().unwrap()),
            Arc::new(fetcher),
            Box::new(move |bytes| sink.borrow_mut().push(bytes.to_vec())),
        );
        (controller, saved)
    }

    fn controller() -> (EditorController, Rc<RefCell<Vec<Vec<u8>>>>) {
        controller_with(MemoryFetcher::new())
    }

    fn ready_controller(width: u32, height: u32) -> (EditorController, Rc<RefCell<Vec<Vec<u8>>>>) {
        let (mut controller, saved) = controller();
        controller.upload_image(png_bytes(width, height, [0, 0, 0, 255]), None);
        let resolution = controller.wait_for_load(WAIT).unwrap();
        assert!(matches!(resolution, LoadResolution::Applied { .. }));
        (controller, saved)
    }

    #[test]
    fn test_upload_transitions_to_ready() {
        let (mut controller, _) = controller();
        assert_eq!(controller.state(), EditorState::Empty);

        let generation = controller.upload_image(png_bytes(1200, 600, [0, 0, 0, 255]), Some("cat.png".into()));
        assert_eq!(controller.state(), EditorState::Loading { generation });

        match controller.wait_for_load(WAIT).unwrap() {
            LoadResolution::Applied { display, .. } => assert_eq!(display, DisplaySize::new(600.0, 300.0)),
            other => panic!("unexpected resolution {other:?}"),
        }
        assert_eq!(controller.state(), EditorState::Ready);
    }

    #[test]
    fn test_decode_failure_reverts_to_previous_state() {
        let (mut controller, _) = controller();
        controller.upload_image(b"not an image".to_vec(), None);
        let resolution = controller.wait_for_load(WAIT).unwrap();
        assert!(matches!(
            resolution,
            LoadResolution::Failed { error: EditorError::DecodeFailure(_), .. }
        ));
        assert_eq!(controller.state(), EditorState::Empty);

        let (mut controller, _) = ready_controller(100, 100);
        controller.add_text().unwrap();
        let revision = controller.composition().revision();

        controller.upload_image(b"still not an image".to_vec(), None);
        controller.wait_for_load(WAIT).unwrap();
        assert_eq!(controller.state(), EditorState::Ready);
        assert_eq!(controller.composition().text_layers().len(), 1);
        assert_eq!(controller.composition().revision(), revision);
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let fetcher = MemoryFetcher::new()
            .with_image("a", 300, 300, true)
            .with_image("b", 200, 100, true);
        let release_a = fetcher.gate("a");
        let (mut controller, _) = controller_with(fetcher);

        let a = controller.select_template("a");
        let b = controller.select_template("b");

        match controller.wait_for_load(WAIT).unwrap() {
            LoadResolution::Applied { generation, display } => {
                assert_eq!(generation, b);
                assert_eq!(display, DisplaySize::new(200.0, 100.0));
            }
            other => panic!("unexpected resolution {other:?}"),
        }

        release_a.send(()).unwrap();
        match controller.wait_for_load(WAIT).unwrap() {
            LoadResolution::Discarded { generation } => assert_eq!(generation, a),
            other => panic!("unexpected resolution {other:?}"),
        }

        let background = controller.composition().background().unwrap();
        assert_eq!(background.display, DisplaySize::new(200.0, 100.0));
        assert_eq!(
            background.source.origin(),
            &ImageOrigin::Template { url: "b".into(), cross_origin_granted: true }
        );
        assert_eq!(controller.state(), EditorState::Ready);
    }

    #[test]
    fn test_resolve_ignores_out_of_order_outcomes() {
        let (mut controller, _) = controller();
        let a = controller.begin_load();
        let b = controller.begin_load();

        let b_source = decode_image(&png_bytes(50, 25, [0, 0, 0, 255]), ImageOrigin::Upload { name: None }).unwrap();
        let a_source = decode_image(&png_bytes(10, 10, [0, 0, 0, 255]), ImageOrigin::Upload { name: None }).unwrap();

        assert!(matches!(
            controller.resolve(LoadOutcome { generation: b, result: Ok(b_source) }),
            LoadResolution::Applied { .. }
        ));
        assert!(matches!(
            controller.resolve(LoadOutcome { generation: a, result: Ok(a_source) }),
            LoadResolution::Discarded { .. }
        ));
        assert_eq!(controller.composition().display_size(), Some(DisplaySize::new(50.0, 25.0)));
    }

    #[test]
    fn test_preconditions_are_noops() {
        let (mut controller, saved) = controller();

        assert!(matches!(
            controller.add_text(),
            Err(EditorError::PreconditionViolation { .. })
        ));
        assert!(matches!(
            controller.generate(),
            Err(EditorError::PreconditionViolation { .. })
        ));
        assert!(controller.remove_selected_text().is_none());
        assert!(!controller.update_selected_text(&TextLayerPatch::default()));
        assert!(controller.composition().text_layers().is_empty());
        assert!(saved.borrow().is_empty());

        controller.upload_image(png_bytes(10, 10, [0, 0, 0, 255]), None);
        assert!(!controller.can_add_text());
        assert!(controller.add_text().is_err());
        controller.wait_for_load(WAIT).unwrap();
        assert!(controller.can_add_text());
    }

    #[test]
    fn test_remove_selected_without_selection() {
        let (mut controller, _) = ready_controller(100, 100);
        controller.add_text().unwrap();
        controller.clear_selection();

        assert!(!controller.can_remove_text());
        assert!(controller.remove_selected_text().is_none());
        assert_eq!(controller.composition().text_layers().len(), 1);
    }

    #[test]
    fn test_update_selected_text() {
        let (mut controller, _) = ready_controller(100, 100);
        let id = controller.add_text().unwrap();

        let patch = TextLayerPatch {
            fill: Some(Color32::from_rgb(255, 255, 0)),
            font_size_px: Some(48),
            ..Default::default()
        };
        assert!(controller.update_selected_text(&patch));
        let layer = controller.composition().layer(id).unwrap();
        assert_eq!(layer.fill, Color32::from_rgb(255, 255, 0));
        assert_eq!(layer.font_size_px, 48);
    }

    #[test]
    fn test_drag_end_is_idempotent_and_isolated() {
        let (mut controller, _) = ready_controller(400, 400);
        let first = controller.add_text().unwrap();
        let second = controller.add_text().unwrap();
        let untouched = controller.composition().layer(second).unwrap().clone();

        assert!(controller.on_layer_drag_end(first, 10.0, 20.0));
        let once = controller.composition().layer(first).unwrap().clone();
        assert!(controller.on_layer_drag_end(first, 10.0, 20.0));
        assert_eq!(controller.composition().layer(first).unwrap(), &once);
        assert_eq!(once.position, Pos2::new(10.0, 20.0));
        assert_eq!(controller.composition().layer(second).unwrap(), &untouched);
    }

    #[test]
    fn test_resize_end_commits_size() {
        let (mut controller, _) = ready_controller(400, 400);
        let id = controller.add_text().unwrap();
        assert!(controller.on_layer_resize_end(id, 180.0, 54));
        let layer = controller.composition().layer(id).unwrap();
        assert_eq!(layer.box_width, 180.0);
        assert_eq!(layer.font_size_px, 54);
    }

    #[test]
    fn test_new_background_discards_captions() {
        let (mut controller, _) = ready_controller(400, 400);
        controller.add_text().unwrap();
        controller.upload_image(png_bytes(20, 20, [0, 0, 0, 255]), None);
        controller.wait_for_load(WAIT).unwrap();

        assert!(controller.composition().text_layers().is_empty());
        assert_eq!(controller.composition().selected(), None);
    }

    #[test]
    fn test_generate_clears_selection_and_saves_once() {
        let (mut controller, saved) = ready_controller(300, 200);
        controller.add_text().unwrap();
        assert!(controller.can_generate());

        let bytes = controller.generate().unwrap();
        assert_eq!(controller.composition().selected(), None);
        assert_eq!(saved.borrow().len(), 1);
        assert_eq!(saved.borrow()[0], bytes);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (600, 400));
    }

    #[test]
    fn test_tainted_template_cannot_generate() {
        let fetcher = MemoryFetcher::new().with_image("nocors", 64, 64, false);
        let (mut controller, saved) = controller_with(fetcher);
        controller.select_template("nocors");
        controller.wait_for_load(WAIT).unwrap();

        assert_eq!(controller.state(), EditorState::Ready);
        let id = controller.add_text().unwrap();
        assert!(!controller.can_generate());
        assert!(matches!(controller.generate(), Err(EditorError::ExportTaintedSurface)));
        assert!(saved.borrow().is_empty());
        // A rejected export leaves the selection alone.
        assert_eq!(controller.selected_layer().map(|l| l.id), Some(id));
    }

    #[test]
    fn test_missing_template_fails() {
        let (mut controller, _) = controller();
        controller.select_template("https://example.invalid/missing.png");
        let resolution = controller.wait_for_load(WAIT).unwrap();
        assert!(matches!(resolution, LoadResolution::Failed { .. }));
        assert_eq!(controller.state(), EditorState::Empty);
    }

    #[test]
    fn test_preview_does_not_commit() {
        let (mut controller, _) = ready_controller(200, 200);
        let id = controller.add_text().unwrap();
        let revision = controller.composition().revision();

        let preview = LayerPreview {
            id,
            patch: TextLayerPatch::position(Pos2::new(0.0, 0.0)),
        };
        let surface = controller.surface(1.0, Some(&preview)).unwrap();
        assert_eq!(surface.dimensions(), (200, 200));

        assert_eq!(controller.composition().revision(), revision);
        assert_eq!(controller.composition().layer(id).unwrap().position, Pos2::new(100.0, 100.0));
        assert!(controller.text_bounds(id).is_some());
    }
}
