//! # Right Panel - Results Table
//!
//! Lists every record of the current analysis in a virtualized
//! `egui_extras::TableBuilder` table, in the order the service returned them.
//! The status column is coloured like the markers; the row whose marker is selected
//! on the map is highlighted.

use crate::ui::{AppState, status_color};
use eframe::egui;

/// Render the results panel.
///
/// # Parameters
///
/// * `ctx` - egui context
/// * `state` - Mutable application state (panel width, selection)
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    let panel = egui::SidePanel::right("results_right")
        .resizable(true)
        .default_width(state.right_panel_width)
        .min_width(320.0)
        .show(ctx, |ui| {
            ui.heading("Samples");
            ui.separator();
            render_results_table(ui, state);
        });
    state.right_panel_width = panel.response.rect.width();
}

/// Render the virtualized results table.
///
/// Clicking a row selects the matching marker on the map.
fn render_results_table(ui: &mut egui::Ui, state: &mut AppState) {
    use egui_extras::{Column, TableBuilder};

    let row_height = ui.text_style_height(&egui::TextStyle::Body) * 1.3;
    let mut clicked_row: Option<usize> = None;

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .vscroll(true)
        .sense(egui::Sense::click())
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .column(Column::initial(36.0).at_least(28.0)) // #
        .column(Column::initial(110.0).at_least(80.0)) // Status
        .column(Column::initial(140.0).at_least(80.0)) // Location
        .column(Column::initial(70.0).at_least(50.0)) // Latitude
        .column(Column::initial(70.0).at_least(50.0)) // Longitude
        .column(Column::initial(60.0).at_least(40.0)) // PCA X
        .column(Column::initial(60.0).at_least(40.0)) // PCA Y
        .column(Column::remainder()) // Sequence
        .header(row_height, |mut header| {
            for title in ["#", "Status", "Location", "Lat", "Lon", "PCA X", "PCA Y", "Sequence"] {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|body| {
            let records = state.controller.results();
            body.rows(row_height, records.len(), |mut row| {
                let index = row.index();
                let record = &records[index];
                row.set_selected(state.selected == Some(index));

                row.col(|ui| {
                    ui.label(format!("{}", index + 1));
                });
                row.col(|ui| {
                    ui.label(egui::RichText::new(record.status.label()).strong().color(status_color(&record.status, 1.0)));
                });
                row.col(|ui| {
                    ui.label(&record.location);
                });
                row.col(|ui| {
                    ui.label(format!("{:.4}", record.latitude));
                });
                row.col(|ui| {
                    ui.label(format!("{:.4}", record.longitude));
                });
                row.col(|ui| {
                    ui.label(format!("{:.3}", record.pca_x));
                });
                row.col(|ui| {
                    ui.label(format!("{:.3}", record.pca_y));
                });
                row.col(|ui| {
                    ui.label(egui::RichText::new(record.sequence.as_deref().unwrap_or("-")).monospace());
                });

                if row.response().clicked() {
                    clicked_row = Some(index);
                }
            });
        });

    if let Some(index) = clicked_row {
        state.selected = if state.selected == Some(index) { None } else { Some(index) };
    }
}
