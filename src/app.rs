// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! `MemeApp` hosts the editor controller, routes panel actions to it, logs
//! every outcome and turns failures into notifications. Exported images
//! flow from the controller's save callback into the meme details form and
//! from there to the backend. The community window reads the feed back and
//! reloads it whenever a backend subscription reports a change.

use crate::config::Config;
use crate::controller::{EditorController, LayerPreview, LoadResolution};
use crate::io::backend::{
    add_comment, create_meme, delete_comment, fetch_comments, fetch_memes, now_millis,
    toggle_like, update_profile, upload_avatar, Backend, ChangeKind, LocalBackend,
};
use crate::io::media::{is_image_path, read_file, HttpFetcher, IMAGE_EXTENSIONS};
use crate::models::meme::{MemeDraft, MEMES_TABLE};
use crate::models::social::{Comment, FeedEntry, ProfileUpdate, COMMENTS_TABLE, LIKES_TABLE};
use crate::render::Renderer;
use crate::state::{AppState, NOTIFICATION_TTL};
use crate::ui::canvas::{self, CanvasAction, Gesture, LayerBox};
use crate::ui::feed::{FeedAction, FeedPanel};
use crate::ui::properties::{PropertiesAction, PropertiesPanel};
use crate::ui::submit::{self, SubmitAction};
use crate::ui::toolbar::{self, ToolbarAction, ToolbarState};
use crate::ui::notifications;
use ab_glyph::FontArc;
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What the canvas texture was last painted from.
#[derive(Debug, Clone, PartialEq)]
struct PaintKey {
    revision: u64,
    scale: f32,
    preview: Option<LayerPreview>,
}

/// Main application state.
pub struct MemeApp {
    config: Config,
    controller: EditorController,

    /// PNG bytes handed over by the controller's save callback
    exports: Receiver<Vec<u8>>,

    backend: LocalBackend,
    state: AppState,
    draft: MemeDraft,
    username_input: String,

    /// Rendered composition shown on the canvas
    canvas_texture: Option<egui::TextureHandle>,
    painted: Option<PaintKey>,

    /// Thumbnail of the last generated meme
    preview_texture: Option<egui::TextureHandle>,

    gesture: Option<Gesture>,
    properties: PropertiesPanel,

    feed: FeedPanel,
    feed_entries: Vec<FeedEntry>,
    /// Comments of the meme expanded in the feed
    comments: Vec<Comment>,
    /// Set by backend subscriptions; the feed reloads when it is open
    feed_stale: Rc<Cell<bool>>,
}

impl MemeApp {
    /// Create a new application instance.
    pub fn new(config: Config, font: FontArc, mut backend: LocalBackend) -> Self {
        let (sender, exports) = channel();
        let fetcher = HttpFetcher::new(
            &config.network.request_origin,
            config.network.fetch_timeout_secs,
        );
        let controller = EditorController::new(
            config.editor_settings(),
            Renderer::new(font),
            Arc::new(fetcher),
            Box::new(move |bytes: &[u8]| {
                let _ = sender.send(bytes.to_vec());
            }),
        );

        let feed_stale = Rc::new(Cell::new(true));

        let stale = Rc::clone(&feed_stale);
        backend.on_auth_change(Box::new(move |user| {
            match user {
                Some(user) => log::info!("Signed in as {}", user.username),
                None => log::info!("Signed out"),
            }
            stale.set(true);
        }));
        let stale = Rc::clone(&feed_stale);
        backend.subscribe(
            MEMES_TABLE,
            None,
            Box::new(move |change| {
                if change.kind == ChangeKind::Insert {
                    log::info!("New meme stored: {}", change.row["id"]);
                }
                stale.set(true);
            }),
        );
        for table in [LIKES_TABLE, COMMENTS_TABLE] {
            let stale = Rc::clone(&feed_stale);
            backend.subscribe(table, None, Box::new(move |_| stale.set(true)));
        }

        let mut state = AppState::new();
        if let Some(username) = config.backend.username.clone() {
            if let Err(e) = backend.sign_in(&username) {
                log::error!("Failed to sign in as {}: {:#}", username, e);
                state.error(format!("Could not sign in as {username}"));
            }
        }

        Self {
            config,
            controller,
            exports,
            backend,
            state,
            draft: MemeDraft::default(),
            username_input: String::new(),
            canvas_texture: None,
            painted: None,
            preview_texture: None,
            gesture: None,
            properties: PropertiesPanel::default(),
            feed: FeedPanel::default(),
            feed_entries: Vec::new(),
            comments: Vec::new(),
            feed_stale,
        }
    }

    /// Pick an image file and start decoding it.
    fn upload_from_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
        {
            self.upload_file(path);
        }
    }

    fn upload_file(&mut self, path: PathBuf) {
        match read_file(&path) {
            Ok(bytes) => {
                let name = path.file_name().map(|n| n.to_string_lossy().to_string());
                let generation = self.controller.upload_image(bytes, name);
                self.gesture = None;
                log::info!("Loading {} (load {})", path.display(), generation);
            }
            Err(e) => {
                log::error!("{}", e);
                self.state.error("Failed to load image");
            }
        }
    }

    fn select_template(&mut self, url: &str) {
        let generation = self.controller.select_template(url);
        self.gesture = None;
        log::info!("Loading template {} (load {})", url, generation);
    }

    /// Upload every image dropped on the window. The last one wins.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            if let Some(bytes) = file.bytes {
                let name = (!file.name.is_empty()).then(|| file.name.clone());
                self.controller.upload_image(bytes.to_vec(), name);
            } else if let Some(path) = file.path {
                if is_image_path(&path) {
                    self.upload_file(path);
                } else {
                    log::warn!("Dropped file is not a supported image: {}", path.display());
                }
            }
        }
    }

    /// Apply finished loads.
    fn poll_loads(&mut self) {
        for resolution in self.controller.poll() {
            match resolution {
                LoadResolution::Applied { generation, display } => {
                    log::info!(
                        "Background applied (load {}), display {}x{}",
                        generation,
                        display.width,
                        display.height
                    );
                    if !self.controller.can_generate() {
                        self.state
                            .info("This template does not allow export; upload your own copy to share it");
                    }
                }
                LoadResolution::Failed { generation, error } => {
                    log::error!("Load {} failed: {}", generation, error);
                    self.state.error("Failed to load image");
                }
                LoadResolution::Discarded { generation } => {
                    log::debug!("Discarded stale load {}", generation);
                }
            }
        }
    }

    /// Move exported images into the details form.
    fn receive_exports(&mut self, ctx: &egui::Context) {
        while let Ok(bytes) = self.exports.try_recv() {
            match image::load_from_memory(&bytes) {
                Ok(decoded) => {
                    let rgba = decoded.to_rgba8();
                    let size = [rgba.width() as usize, rgba.height() as usize];
                    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
                    self.preview_texture =
                        Some(ctx.load_texture("meme_preview", color_image, egui::TextureOptions::LINEAR));
                }
                Err(e) => log::warn!("Could not preview exported meme: {}", e),
            }
            self.draft.set_image(bytes);
        }
    }

    /// Repaint the canvas texture if the composition or gesture changed.
    fn refresh_canvas(&mut self, ctx: &egui::Context) {
        let key = PaintKey {
            revision: self.controller.composition().revision(),
            scale: ctx.pixels_per_point(),
            preview: self.gesture.as_ref().map(Gesture::preview),
        };
        if self.painted.as_ref() == Some(&key) {
            return;
        }

        match self.controller.surface(key.scale, key.preview.as_ref()) {
            Some(surface) => {
                let size = [surface.width() as usize, surface.height() as usize];
                let color_image = egui::ColorImage::from_rgba_unmultiplied(size, surface.as_raw());
                match &mut self.canvas_texture {
                    Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
                    None => {
                        self.canvas_texture =
                            Some(ctx.load_texture("meme_canvas", color_image, egui::TextureOptions::LINEAR));
                    }
                }
            }
            None => self.canvas_texture = None,
        }
        self.painted = Some(key);
    }

    fn layer_boxes(&self) -> Vec<LayerBox> {
        self.controller
            .composition()
            .text_layers()
            .iter()
            .filter_map(|layer| {
                self.controller.text_bounds(layer.id).map(|bounds| LayerBox {
                    id: layer.id,
                    bounds,
                    font_size_px: layer.font_size_px,
                })
            })
            .collect()
    }

    fn add_text(&mut self) {
        match self.controller.add_text() {
            Ok(id) => log::info!("Added caption {}", id),
            Err(e) => log::warn!("{}", e),
        }
    }

    fn remove_text(&mut self) {
        if let Some(layer) = self.controller.remove_selected_text() {
            self.gesture = None;
            log::info!(
                "Removed caption {}, {} remaining",
                layer.id,
                self.controller.composition().text_layers().len()
            );
        }
    }

    fn generate(&mut self) {
        self.gesture = None;
        match self.controller.generate() {
            Ok(bytes) => {
                log::info!("Generated meme ({} bytes)", bytes.len());
                self.state.success("Meme generated! Add a title and tags to share it.");
            }
            Err(e) => {
                log::error!("Failed to generate meme: {}", e);
                self.state.error(e.to_string());
            }
        }
    }

    /// Save the last generated meme to a file.
    fn save_png(&mut self) {
        let Some(bytes) = self.draft.image() else {
            return;
        };
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name("meme.png")
            .save_file()
        {
            match std::fs::write(&path, bytes) {
                Ok(()) => log::info!("Saved meme to {}", path.display()),
                Err(e) => {
                    log::error!("Failed to save {}: {}", path.display(), e);
                    self.state.error("Failed to save image");
                }
            }
        }
    }

    fn create_meme(&mut self) {
        let valid = match self.draft.validate() {
            Ok(valid) => valid,
            Err(e) => {
                self.state.error(e.to_string());
                return;
            }
        };
        let Some(user) = self.backend.current_user() else {
            self.state.error("Please sign in to create a meme");
            return;
        };

        match create_meme(&mut self.backend, &valid, &user, now_millis()) {
            Ok(record) => {
                log::info!("Created meme {} with tags {:?}", record.id, record.tags);
                self.state.success("Meme created successfully!");
                self.state.celebrate();
                self.draft.clear();
                self.preview_texture = None;
            }
            Err(e) => {
                log::error!("Failed to create meme: {:#}", e);
                self.state.error("Failed to create meme");
            }
        }
    }

    fn rename(&mut self, username: &str) {
        let Some(user) = self.backend.current_user() else {
            return;
        };
        let update = ProfileUpdate {
            username: Some(username.to_string()),
        };
        // Signing in again refreshes the cached user under the new name.
        let result = update_profile(&mut self.backend, &user, &update)
            .and_then(|profile| self.backend.sign_in(&profile.username));
        match result {
            Ok(user) => {
                log::info!("Renamed profile {} to {}", user.id, user.username);
                self.username_input.clear();
                self.state.success("Profile updated");
            }
            Err(e) => {
                log::error!("Failed to update profile: {:#}", e);
                self.state.error(e.to_string());
            }
        }
    }

    fn upload_avatar_from_dialog(&mut self) {
        let Some(user) = self.backend.current_user() else {
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
        else {
            return;
        };
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_default();

        let result = read_file(&path).map_err(anyhow::Error::from).and_then(|bytes| {
            upload_avatar(&mut self.backend, &user, &bytes, &extension, now_millis())
        });
        match result {
            Ok(url) => {
                log::info!("Avatar for {} stored at {}", user.username, url);
                self.state.success("Avatar updated");
            }
            Err(e) => {
                log::error!("Failed to upload avatar: {:#}", e);
                self.state.error("Failed to upload avatar");
            }
        }
    }

    /// Reload the feed and any open comment thread.
    fn refresh_feed(&mut self) {
        self.feed_stale.set(false);
        let user = self.backend.current_user();
        match fetch_memes(&self.backend, &self.feed.filter(user.as_ref()), user.as_ref()) {
            Ok(entries) => {
                log::debug!("Feed reloaded with {} memes", entries.len());
                self.feed_entries = entries;
            }
            Err(e) => {
                log::error!("Failed to fetch memes: {:#}", e);
                self.state.error("Failed to load memes");
            }
        }
        if let Some(meme_id) = self.feed.expanded().map(str::to_string) {
            self.load_comments(&meme_id);
        }
    }

    fn load_comments(&mut self, meme_id: &str) {
        match fetch_comments(&self.backend, meme_id) {
            Ok(comments) => self.comments = comments,
            Err(e) => {
                log::error!("Failed to fetch comments for {}: {:#}", meme_id, e);
                self.comments.clear();
            }
        }
    }

    fn handle_feed(&mut self, action: FeedAction) {
        if action == FeedAction::None {
            return;
        }
        let user = self.backend.current_user();
        match action {
            FeedAction::Refresh => self.feed_stale.set(true),
            FeedAction::OpenComments(meme_id) => self.load_comments(&meme_id),
            FeedAction::ToggleLike(meme_id) => {
                let Some(user) = user else {
                    self.state.error("You must be logged in to like memes");
                    return;
                };
                match toggle_like(&mut self.backend, &meme_id, &user) {
                    Ok(true) => {
                        log::info!("{} liked {}", user.username, meme_id);
                        self.state.celebrate();
                    }
                    Ok(false) => log::info!("{} unliked {}", user.username, meme_id),
                    Err(e) => {
                        log::error!("Failed to toggle like on {}: {:#}", meme_id, e);
                        self.state.error("Failed to update like");
                    }
                }
            }
            FeedAction::AddComment { meme_id, content } => {
                let Some(user) = user else {
                    self.state.error("You must be logged in to comment");
                    return;
                };
                match add_comment(&mut self.backend, &meme_id, &user, &content) {
                    Ok(comment) => log::info!("Comment {} added to {}", comment.id, meme_id),
                    Err(e) => {
                        log::error!("Failed to add comment: {:#}", e);
                        self.state.error("Failed to add comment");
                    }
                }
            }
            FeedAction::DeleteComment(comment_id) => {
                let Some(user) = user else {
                    return;
                };
                match delete_comment(&mut self.backend, &comment_id, &user) {
                    Ok(()) => log::info!("Comment {} deleted", comment_id),
                    Err(e) => {
                        log::error!("Failed to delete comment {}: {:#}", comment_id, e);
                        self.state.error(e.to_string());
                    }
                }
            }
            FeedAction::None => {}
        }
    }

    fn handle_submit(&mut self, action: SubmitAction) {
        match action {
            SubmitAction::SignIn(username) => {
                if let Err(e) = self.backend.sign_in(&username) {
                    log::error!("Sign in failed: {:#}", e);
                    self.state.error(e.to_string());
                } else {
                    self.username_input.clear();
                }
            }
            SubmitAction::SignOut => {
                if let Err(e) = self.backend.sign_out() {
                    log::error!("Sign out failed: {:#}", e);
                }
            }
            SubmitAction::Rename(username) => self.rename(&username),
            SubmitAction::UploadAvatar => self.upload_avatar_from_dialog(),
            SubmitAction::Create => self.create_meme(),
            SubmitAction::None => {}
        }
    }
}

impl eframe::App for MemeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);
        self.poll_loads();
        self.receive_exports(ctx);

        let now = Instant::now();
        self.state.expire(now, NOTIFICATION_TTL);
        let celebrating = self.state.update_celebration(now);

        if self.controller.is_loading() {
            ctx.request_repaint();
        } else if celebrating || !self.state.notifications().is_empty() {
            ctx.request_repaint_after(Duration::from_millis(250));
        }

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Upload Image...").clicked() {
                        ui.close_menu();
                        self.upload_from_dialog();
                    }
                    ui.menu_button("Templates", |ui| {
                        let mut chosen = None;
                        for template in &self.config.templates {
                            if ui.button(&template.name).clicked() {
                                chosen = Some(template.url.clone());
                            }
                        }
                        if let Some(url) = chosen {
                            ui.close_menu();
                            self.select_template(&url);
                        }
                    });
                    ui.separator();
                    if ui
                        .add_enabled(self.draft.has_image(), egui::Button::new("Save Meme As..."))
                        .clicked()
                    {
                        ui.close_menu();
                        self.save_png();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.menu_button("View", |ui| {
                    if ui.checkbox(&mut self.feed.open, "Community").changed() {
                        ui.close_menu();
                    }
                });
            });
        });

        // Toolbar
        let toolbar_state = ToolbarState {
            loading: self.controller.is_loading(),
            can_add_text: self.controller.can_add_text(),
            can_remove_text: self.controller.can_remove_text(),
            can_generate: self.controller.can_generate(),
        };
        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| toolbar::show(ui, toolbar_state, &self.config.templates))
            .inner;

        match toolbar_action {
            ToolbarAction::UploadImage => self.upload_from_dialog(),
            ToolbarAction::SelectTemplate(url) => self.select_template(&url),
            ToolbarAction::AddText => self.add_text(),
            ToolbarAction::RemoveText => self.remove_text(),
            ToolbarAction::Generate => self.generate(),
            ToolbarAction::None => {}
        }

        // Details form (right side)
        let user = self.backend.current_user();
        let submit_action = egui::SidePanel::right("details")
            .default_width(260.0)
            .show(ctx, |ui| {
                submit::show(
                    ui,
                    &mut self.draft,
                    user.as_ref(),
                    &mut self.username_input,
                    self.preview_texture.as_ref(),
                )
            })
            .inner;
        self.handle_submit(submit_action);

        // Text properties (left side)
        let properties_action = egui::SidePanel::left("properties")
            .default_width(220.0)
            .show(ctx, |ui| {
                self.properties.show(ui, self.controller.selected_layer())
            })
            .inner;

        if let PropertiesAction::Update(patch) = properties_action {
            self.controller.update_selected_text(&patch);
        }

        // Keyboard shortcuts, unless a text field has focus
        if !ctx.wants_keyboard_input() {
            if ctx.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)) {
                self.remove_text();
            }
            if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
                self.gesture = None;
                self.controller.clear_selection();
            }
        }

        // Main canvas (center)
        self.refresh_canvas(ctx);
        let layers = self.layer_boxes();
        let display = self.controller.composition().display_size();
        let selected = self.controller.composition().selected();

        let canvas_action = egui::CentralPanel::default()
            .show(ctx, |ui| {
                canvas::show(
                    ui,
                    self.canvas_texture.as_ref(),
                    display,
                    &layers,
                    selected,
                    &mut self.gesture,
                )
            })
            .inner;

        match canvas_action {
            CanvasAction::Select(id) => {
                self.controller.select_layer(id);
            }
            CanvasAction::ClearSelection => self.controller.clear_selection(),
            CanvasAction::MoveFinished { id, position } => {
                self.controller.on_layer_drag_end(id, position.x, position.y);
                log::info!("Moved caption {} to ({:.0}, {:.0})", id, position.x, position.y);
            }
            CanvasAction::ResizeFinished { id, width, font_size_px } => {
                self.controller.on_layer_resize_end(id, width, font_size_px);
                log::info!("Resized caption {} to width {:.0}, {}px", id, width, font_size_px);
            }
            CanvasAction::None => {}
        }

        // Community feed (floating window)
        if self.feed.open {
            let user = self.backend.current_user();
            let feed_action = self.feed.show(ctx, &self.feed_entries, &self.comments, user.as_ref());
            self.handle_feed(feed_action);
            if self.feed_stale.get() {
                self.refresh_feed();
            }
        }

        if let Some(id) = notifications::show(ctx, self.state.notifications()) {
            self.state.dismiss(id);
        }
        if celebrating {
            notifications::show_celebration(ctx);
        }
    }
}
