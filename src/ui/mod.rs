// UI module for the EcoScan dashboard
//
// This module organizes the UI into separate components:
// - `controller`: Upload/analyze state machine owning the current results
// - `top_panel`: Header, upload controls and metric cards
// - `right_panel`: Results table
// - `scatter`: PCA scatter plot
// - `map`: Geographic map with sample markers
// - `app_state`: Application state management and main update loop

pub mod app_state;
pub mod controller;
pub mod map;
pub mod right_panel;
pub mod scatter;
pub mod top_panel;

use eframe::egui;

use crate::analysis::{AnalysisOutcome, AnalysisRequest};
use crate::common::TileId;

pub use app_state::{AppState, status_color};

/// Messages from the background workers to the UI thread.
pub enum UIRefreshState {
    AnalysisFinished(AnalysisOutcome),
    TileLoaded(TileId, Result<egui::ColorImage, String>),
}

/// Commands from the UI thread to the analysis worker.
#[derive(Debug)]
pub enum UICommand {
    Analyze(AnalysisRequest),
}
