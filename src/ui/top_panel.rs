//! # Top Panel - Upload Controls and Metrics
//!
//! Renders the header, the file selection / analyze controls and, once results are
//! available, the two metric cards (processed samples, new organisms detected).

use crate::ui::AppState;
use eframe::egui;
use egui::Color32;

/// Render the top panel.
///
/// # Parameters
///
/// * `ctx` - egui context
/// * `state` - Mutable application state; buttons here open the picker and submit analyses
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
        ui.add_space(8.0);
        ui.heading(egui::RichText::new("JalDrishti: Marine Anomaly Detection").strong().color(Color32::from_rgb(0x0f, 0x17, 0x2a)));
        ui.label(
            egui::RichText::new("Upload eDNA sequencing data to detect unknown marine organisms using Unsupervised ML.")
                .color(Color32::from_rgb(0x64, 0x74, 0x8b)),
        );
        ui.separator();

        render_upload_controls(ui, state);

        if !state.controller.results().is_empty() {
            ui.add_space(8.0);
            render_metrics(ui, state);
        }
        ui.add_space(8.0);
    });
}

fn render_upload_controls(ui: &mut egui::Ui, state: &mut AppState) {
    let submitting = state.controller.is_submitting();

    ui.horizontal(|ui| {
        if ui.button("Choose file…").clicked() {
            state.open_file_picker();
        }

        match state.controller.selected_file() {
            Some(file) => {
                ui.label(egui::RichText::new(&file.name).strong()).on_hover_text(file.path.display().to_string());
            }
            None => {
                ui.label(egui::RichText::new("No file chosen").weak());
            }
        }

        ui.add_space(16.0);

        let label = if submitting { "Processing DNA..." } else { "Analyze Sample" };
        let fill = if submitting {
            Color32::from_rgb(0x94, 0xa3, 0xb8)
        } else {
            Color32::from_rgb(0x25, 0x63, 0xeb)
        };
        let button = egui::Button::new(egui::RichText::new(label).color(Color32::WHITE)).fill(fill);
        if ui.add_enabled(!submitting, button).clicked() {
            state.submit_analysis();
        }

        if submitting {
            ui.spinner();
        }
    });
}

fn render_metrics(ui: &mut egui::Ui, state: &AppState) {
    let processed = state.controller.results().len();
    let anomalies = state.controller.anomaly_count();
    let last_run = state
        .controller
        .last_completed_at()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "--".to_string());

    ui.columns(3, |cols| {
        metric_card(
            &mut cols[0],
            "Processed Samples",
            processed.to_string(),
            Color32::from_rgb(0xec, 0xfd, 0xf5),
            Color32::from_rgb(0x6e, 0xe7, 0xb7),
            Color32::from_rgb(0x04, 0x78, 0x57),
        );
        metric_card(
            &mut cols[1],
            "New Organisms Detected",
            anomalies.to_string(),
            Color32::from_rgb(0xfe, 0xf2, 0xf2),
            Color32::from_rgb(0xfc, 0xa5, 0xa5),
            Color32::from_rgb(0xb9, 0x1c, 0x1c),
        );
        cols[2].vertical(|ui| {
            ui.label("Last analysis:");
            ui.label(egui::RichText::new(last_run).monospace().strong());
        });
    });
}

/// One coloured card with a title and a large number.
fn metric_card(ui: &mut egui::Ui, title: &str, value: String, background: Color32, border: Color32, title_color: Color32) {
    egui::Frame::new()
        .fill(background)
        .stroke(egui::Stroke::new(1.0, border))
        .corner_radius(egui::CornerRadius::same(8))
        .inner_margin(egui::Margin::same(12))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(egui::RichText::new(title).strong().color(title_color));
            ui.label(egui::RichText::new(value).size(32.0).strong().color(Color32::BLACK));
        });
}
