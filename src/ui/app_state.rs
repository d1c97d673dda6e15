//! # Application State Management
//!
//! This module implements the central `AppState` struct which owns all UI state and
//! coordinates the rendering of all UI components. It implements the `eframe::App`
//! trait to integrate with the egui application framework.
//!
//! ## Responsibilities
//!
//! - Owns the `AnalysisController` (selected file, in-flight flag, results)
//! - Processes worker messages from `ui_refresh_rx` (analysis outcomes, map tiles)
//! - Sends analysis requests to the analysis worker via `ui_command_tx`
//! - Keeps the map viewport, tile cache and marker selection
//! - Persists user settings (last directory, map viewport) across sessions

use eframe::egui;
use egui::Color32;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::controller::{AnalysisController, SubmitError};
use super::UIRefreshState;
use crate::analysis::{SampleStatus, SelectedFile};
use crate::common::config::MapConfig;
use crate::common::geo::{GeoPoint, MapViewport};
use crate::tiles::TileCache;

/// Marker radius in points, shared by the scatter plot and the map.
pub const MARKER_RADIUS: f32 = 5.0;
/// Fill opacity of markers.
pub const MARKER_FILL_OPACITY: f32 = 0.7;

/// Tiles kept before off-screen ones are dropped.
const TILE_CACHE_CAPACITY: usize = 512;
/// Repaint interval while waiting on a worker.
const PENDING_REPAINT_INTERVAL: Duration = Duration::from_millis(50);

/// Central application state.
pub struct AppState {
    /// Optional alert message to display in a modal dialog.
    pub alert: Option<String>,
    /// Receiver for messages from the background workers.
    pub ui_refresh_rx: crate::UIRefreshQueueReceiver,
    /// Sender for analysis requests.
    pub ui_command_tx: crate::UICommandQueueSender,
    /// Sender for tile downloads.
    pub tile_command_tx: crate::TileCommandQueueSender,

    pub controller: AnalysisController,

    // Map state
    pub map_config: MapConfig,
    pub viewport: MapViewport,
    pub tiles: TileCache<egui::TextureHandle>,
    /// Index into the current results of the marker whose popup is open.
    pub selected: Option<usize>,
    /// Results generation `selected` refers to.
    pub selected_generation: u64,
    /// Offline world image drawn when tiles are disabled.
    pub background_image_texture: Option<egui::TextureHandle>,

    /// Last directory used in the file picker.
    pub last_open_dir: Option<String>,
    /// Width of the results panel in pixels.
    pub right_panel_width: f32,
}

/// Settings persisted across application sessions.
#[derive(Default, Serialize, Deserialize)]
struct PersistedSettings {
    last_open_dir: Option<String>,
    viewport: Option<MapViewport>,
    right_panel_width: Option<f32>,
}

impl AppState {
    /// Create a new AppState, loading persisted settings if available.
    ///
    /// # Parameters
    ///
    /// * `rx` - Receiver for worker messages
    /// * `tx` - Sender for analysis requests
    /// * `tile_tx` - Sender for tile downloads
    /// * `map_config` - Map settings from the configuration file
    /// * `ctx` - egui context, used to upload the optional background image
    /// * `storage` - Optional persistent storage for loading saved settings
    pub fn new(
        rx: crate::UIRefreshQueueReceiver,
        tx: crate::UICommandQueueSender,
        tile_tx: crate::TileCommandQueueSender,
        map_config: MapConfig,
        ctx: &egui::Context,
        storage: Option<&dyn eframe::Storage>,
    ) -> Self {
        let persisted: PersistedSettings = storage.and_then(|s| eframe::get_value(s, "app_settings")).unwrap_or_default();

        let viewport = persisted
            .viewport
            .map(|v| MapViewport::new(v.center, v.zoom))
            .unwrap_or_else(|| MapViewport::new(GeoPoint::new(map_config.center[0], map_config.center[1]), map_config.zoom));

        let background_image_texture = map_config.background_image.as_deref().and_then(|path| Self::load_background_image(ctx, path));

        Self {
            alert: None,
            ui_refresh_rx: rx,
            ui_command_tx: tx,
            tile_command_tx: tile_tx,
            controller: AnalysisController::new(),
            map_config,
            viewport,
            tiles: TileCache::new(TILE_CACHE_CAPACITY),
            selected: None,
            selected_generation: 0,
            background_image_texture,
            last_open_dir: persisted.last_open_dir,
            right_panel_width: persisted.right_panel_width.unwrap_or(520.0),
        }
    }

    /// Load a background image from a file path and create an egui texture.
    ///
    /// # Returns
    ///
    /// `Some(TextureHandle)` if loading succeeds, `None` if it fails.
    fn load_background_image(ctx: &egui::Context, path: &str) -> Option<egui::TextureHandle> {
        match std::fs::read(path) {
            Ok(bytes) => match image::load_from_memory(&bytes) {
                Ok(img) => {
                    let rgba = img.to_rgba8();
                    let size = [rgba.width() as usize, rgba.height() as usize];
                    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_flat_samples().as_slice());
                    log::info!("Loaded map background image from: {}", path);
                    Some(ctx.load_texture("map_background", color_image, egui::TextureOptions::LINEAR))
                }
                Err(e) => {
                    log::error!("Failed to decode background image from {}: {}", path, e);
                    None
                }
            },
            Err(e) => {
                log::error!("Failed to read background image file {}: {}", path, e);
                None
            }
        }
    }

    /// Open a native file picker for the sample file.
    ///
    /// The CSV filter is only a hint; whatever the user picks is accepted. Cancelling
    /// keeps the previous selection.
    pub fn open_file_picker(&mut self) {
        let mut dialog = rfd::FileDialog::new().add_filter("CSV files", &["csv"]).add_filter("All files", &["*"]);
        if let Some(dir) = &self.last_open_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(file) = dialog.pick_file() else {
            return;
        };

        if let Some(parent) = file.parent() {
            self.last_open_dir = Some(parent.to_string_lossy().to_string());
        }
        self.controller.select_file(SelectedFile::from_path(&file));
    }

    /// Ask the analysis worker to process the selected file.
    pub fn submit_analysis(&mut self) {
        let result = self.controller.submit_analysis(&mut self.ui_command_tx);
        if let Some(notice) = notice_for(result) {
            self.alert = Some(notice);
        }
    }

    /// Drain the refresh queue.
    fn process_refresh_messages(&mut self, ctx: &egui::Context) {
        while let Ok(msg) = self.ui_refresh_rx.try_receive() {
            match msg {
                UIRefreshState::AnalysisFinished(outcome) => {
                    if let Some(notice) = self.controller.finish_analysis(outcome) {
                        self.alert = Some(notice.to_string());
                    }
                }
                UIRefreshState::TileLoaded(id, result) => {
                    let texture = result
                        .ok()
                        .map(|image| ctx.load_texture(format!("tile-{}-{}-{}", id.z, id.x, id.y), image, egui::TextureOptions::LINEAR));
                    self.tiles.complete(id, texture);
                }
            }
        }

        // Selection indexes into the result list; drop it when the list is replaced.
        if self.selected_generation != self.controller.results_generation() {
            self.selected = None;
            self.selected_generation = self.controller.results_generation();
        }
    }
}

/// Colour of a sample in every view.
///
/// # Parameters
///
/// * `status` - The sample's classification
/// * `alpha` - Opacity multiplier (0.0 = transparent, 1.0 = fully opaque)
///
/// # Returns
///
/// Red (`#ef4444`) for new organisms, blue (`#3b82f6`) for everything else.
pub fn status_color(status: &SampleStatus, alpha: f32) -> Color32 {
    let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    if status.is_anomaly() {
        Color32::from_rgba_unmultiplied(0xef, 0x44, 0x44, a)
    } else {
        Color32::from_rgba_unmultiplied(0x3b, 0x82, 0xf6, a)
    }
}

impl eframe::App for AppState {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedSettings {
            last_open_dir: self.last_open_dir.clone(),
            viewport: Some(self.viewport),
            right_panel_width: Some(self.right_panel_width),
        };
        eframe::set_value(storage, "app_settings", &settings);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_refresh_messages(ctx);

        // Keep polling the queue while a worker owes us an answer
        if self.controller.is_submitting() || self.tiles.pending_count() > 0 {
            ctx.request_repaint_after(PENDING_REPAINT_INTERVAL);
        }

        if let Some(message) = self.alert.clone() {
            egui::Window::new("Alert")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
                .show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(20.0);
                        ui.label(message);
                        ui.add_space(20.0);

                        if ui.button("OK").clicked() {
                            self.alert = None;
                        }
                        ui.add_space(10.0);
                    });
                });
        }

        // Panels layout: top (fixed), right results table, scatter and map share the center
        super::top_panel::render(ctx, self);

        let has_results = !self.controller.results().is_empty();
        if has_results {
            super::right_panel::render(ctx, self);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if !has_results {
                ui.centered_and_justified(|ui| {
                    ui.label(egui::RichText::new("Choose an eDNA sample file and press \"Analyze Sample\" to see the results.").weak());
                });
                return;
            }

            ui.columns(2, |cols| {
                super::scatter::render(&mut cols[0], self);
                super::map::render(&mut cols[1], self);
            });
        });
    }
}

/// Alert text for a submission attempt; `None` when the user need not be told.
fn notice_for(result: Result<(), SubmitError>) -> Option<String> {
    let e = result.err()?;
    log::debug!("Analysis not started: {}", e);
    e.notice().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisRequest;
    use crate::ui::controller::{AnalysisDispatch, BACKEND_FAILURE_NOTICE, NO_FILE_NOTICE};

    struct ClosedQueue;

    impl AnalysisDispatch for ClosedQueue {
        fn dispatch(&mut self, _request: AnalysisRequest) -> bool {
            false
        }
    }

    struct OpenQueue;

    impl AnalysisDispatch for OpenQueue {
        fn dispatch(&mut self, _request: AnalysisRequest) -> bool {
            true
        }
    }

    #[test]
    fn submit_errors_become_alert_text() {
        assert_eq!(notice_for(Err(SubmitError::NoFileSelected)).as_deref(), Some("Please select a file first!"));
        assert_eq!(notice_for(Err(SubmitError::DispatchFailed)).as_deref(), Some("Failed to connect to backend."));
        assert_eq!(notice_for(Err(SubmitError::AlreadySubmitting)), None);
        assert_eq!(notice_for(Ok(())), None);
    }

    #[test]
    fn submitting_without_a_file_prompts_for_one() {
        let mut controller = AnalysisController::new();
        let alert = notice_for(controller.submit_analysis(&mut OpenQueue));
        assert_eq!(alert.as_deref(), Some(NO_FILE_NOTICE));
        assert!(!controller.is_submitting());
    }

    #[test]
    fn rejected_dispatch_reports_backend_failure_and_repeat_click_is_silent() {
        let mut controller = AnalysisController::new();
        controller.select_file(SelectedFile::from_path("/tmp/edna_data.csv"));

        let alert = notice_for(controller.submit_analysis(&mut ClosedQueue));
        assert_eq!(alert.as_deref(), Some(BACKEND_FAILURE_NOTICE));

        assert_eq!(notice_for(controller.submit_analysis(&mut OpenQueue)), None);
        assert!(controller.is_submitting());
        assert_eq!(notice_for(controller.submit_analysis(&mut OpenQueue)), None);
    }

    #[test]
    fn status_colors_follow_classification() {
        let red = status_color(&SampleStatus::NewOrganism, 1.0);
        assert_eq!((red.r(), red.g(), red.b(), red.a()), (0xef, 0x44, 0x44, 0xff));

        let blue = status_color(&SampleStatus::Known("Known Species".to_string()), 1.0);
        assert_eq!((blue.r(), blue.g(), blue.b()), (0x3b, 0x82, 0xf6));

        let fill = status_color(&SampleStatus::NewOrganism, MARKER_FILL_OPACITY).a();
        assert!((178..=179).contains(&fill));
        assert_eq!(status_color(&SampleStatus::NewOrganism, 3.0).a(), 255);
    }
}
