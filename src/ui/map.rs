//! # Geographic Map
//!
//! Renders the sample map:
//! - Web-Mercator basemap tiles (fetched in the background, see `crate::tiles`)
//! - A 30° graticule, so the map stays readable without tiles
//! - One circle marker per sample, coloured by status
//! - A popup with status and location for the clicked marker
//!
//! ## Interaction
//!
//! Dragging pans, scrolling zooms around the pointer, clicking selects the nearest
//! marker within a small pick radius. Clicking the selected marker again, or empty
//! map, closes the popup.

use crate::analysis::SampleRecord;
use crate::common::geo::{GeoPoint, MAX_LATITUDE, MapViewport, TileId};
use crate::ui::AppState;
use crate::ui::app_state::{MARKER_FILL_OPACITY, MARKER_RADIUS, status_color};
use eframe::egui;
use egui::Color32;
use std::collections::HashSet;

/// Spacing of graticule lines in degrees.
const GRATICULE_STEP: f64 = 30.0;
/// Extra pixels around a marker that still count as a hit.
const PICK_SLACK: f64 = 4.0;
/// Scroll distance (points) that zooms by one level.
const SCROLL_PER_ZOOM_LEVEL: f32 = 120.0;

/// Render the map into `ui`, filling the available space.
///
/// # Parameters
///
/// * `ui` - Column the map lives in
/// * `state` - Mutable application state (viewport, tiles, selection)
pub fn render(ui: &mut egui::Ui, state: &mut AppState) {
    ui.heading("Global Anomaly Map");
    ui.separator();

    let rect = ui.available_rect_before_wrap();
    let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
    let painter = ui.painter_at(rect);

    painter.rect_filled(rect, 4.0, Color32::from_rgb(0xe5, 0xe9, 0xf0));

    if state.map_config.tiles_enabled {
        draw_tiles(&painter, rect, state);
    } else if let Some(texture) = &state.background_image_texture {
        draw_background_image(&painter, rect, &state.viewport, texture);
    }

    draw_graticule(&painter, rect, &state.viewport);
    draw_markers(&painter, rect, &state.viewport, state.controller.results());
    draw_attribution(&painter, rect, state);

    handle_pan_and_zoom(ui, &response, rect, &mut state.viewport);
    handle_marker_selection(&response, rect, state);

    if let Some(index) = state.selected {
        if let Some(record) = state.controller.results().get(index) {
            draw_popup(ui, rect, &state.viewport, record);
        }
    }
}

/// Screen position of a geographic point.
fn to_screen(rect: egui::Rect, viewport: &MapViewport, point: GeoPoint) -> egui::Pos2 {
    let offset = viewport.to_screen_offset(point);
    rect.center() + egui::vec2(offset[0] as f32, offset[1] as f32)
}

/// Paint every visible tile that is loaded; missing tiles are requested.
fn draw_tiles(painter: &egui::Painter, rect: egui::Rect, state: &mut AppState) {
    let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
    let tiles = state.viewport.visible_tiles(rect.width() as f64, rect.height() as f64);
    let visible: HashSet<TileId> = tiles.iter().map(|tile| tile.id).collect();

    for tile in tiles {
        let min = rect.center() + egui::vec2(tile.offset[0] as f32, tile.offset[1] as f32);
        let tile_rect = egui::Rect::from_min_size(min, egui::vec2(tile.size as f32, tile.size as f32));
        if let Some(texture) = state.tiles.get_or_request(tile.id, &mut state.tile_command_tx) {
            painter.image(texture.id(), tile_rect, uv, Color32::WHITE);
        } else if state.tiles.is_failed(tile.id) {
            painter.rect_filled(tile_rect, 0.0, Color32::from_rgb(0xd4, 0xd9, 0xe1));
        }
    }

    state.tiles.evict_invisible(&visible);
}

/// Stretch the offline world image over the Mercator square.
fn draw_background_image(painter: &egui::Painter, rect: egui::Rect, viewport: &MapViewport, texture: &egui::TextureHandle) {
    let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
    let top_left = to_screen(rect, viewport, GeoPoint::new(MAX_LATITUDE, -180.0));
    let bottom_right = to_screen(rect, viewport, GeoPoint::new(-MAX_LATITUDE, 180.0));
    painter.image(texture.id(), egui::Rect::from_min_max(top_left, bottom_right), uv, Color32::WHITE);
}

fn draw_graticule(painter: &egui::Painter, rect: egui::Rect, viewport: &MapViewport) {
    let stroke = egui::Stroke::new(1.0, Color32::from_rgba_unmultiplied(100, 116, 139, 90));

    let mut lon = -180.0;
    while lon <= 180.0 {
        let x = to_screen(rect, viewport, GeoPoint::new(0.0, lon)).x;
        painter.line_segment([egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())], stroke);
        lon += GRATICULE_STEP;
    }

    let mut lat = -60.0;
    while lat <= 60.0 {
        let y = to_screen(rect, viewport, GeoPoint::new(lat, viewport.center.lon)).y;
        painter.line_segment([egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)], stroke);
        lat += GRATICULE_STEP;
    }
}

fn draw_markers(painter: &egui::Painter, rect: egui::Rect, viewport: &MapViewport, records: &[SampleRecord]) {
    for record in records {
        let pos = to_screen(rect, viewport, GeoPoint::new(record.latitude, record.longitude));
        painter.circle_filled(pos, MARKER_RADIUS, status_color(&record.status, MARKER_FILL_OPACITY));
        painter.circle_stroke(pos, MARKER_RADIUS, egui::Stroke::new(1.5, status_color(&record.status, 1.0)));
    }
}

fn draw_attribution(painter: &egui::Painter, rect: egui::Rect, state: &AppState) {
    if !state.map_config.tiles_enabled || state.map_config.tile_attribution.is_empty() {
        return;
    }
    let text_color = Color32::from_rgb(0x33, 0x41, 0x55);
    let galley = painter.layout_no_wrap(state.map_config.tile_attribution.clone(), egui::FontId::proportional(10.0), text_color);
    let pos = rect.right_bottom() - galley.size() - egui::vec2(4.0, 4.0);
    painter.rect_filled(egui::Rect::from_min_size(pos, galley.size()).expand(2.0), 2.0, Color32::from_white_alpha(200));
    painter.galley(pos, galley, text_color);
}

fn handle_pan_and_zoom(ui: &egui::Ui, response: &egui::Response, rect: egui::Rect, viewport: &mut MapViewport) {
    if response.dragged() {
        let delta = response.drag_delta();
        viewport.pan_by_pixels([delta.x as f64, delta.y as f64]);
    }

    if response.hovered() {
        let (scroll, pinch) = ui.input(|i| (i.smooth_scroll_delta.y, i.zoom_delta()));
        let mut zoom_change = (scroll / SCROLL_PER_ZOOM_LEVEL) as f64;
        if pinch != 1.0 {
            zoom_change += (pinch as f64).log2();
        }
        if zoom_change != 0.0 {
            let anchor = response.hover_pos().map(|p| p - rect.center()).unwrap_or_default();
            viewport.zoom_around(zoom_change, [anchor.x as f64, anchor.y as f64]);
        }
    }
}

/// Index of the marker under `click_offset` (relative to the view center), if any.
///
/// The nearest marker wins; nothing is picked farther than `pick_radius` pixels away.
pub fn pick_marker(viewport: &MapViewport, records: &[SampleRecord], click_offset: [f64; 2], pick_radius: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, record) in records.iter().enumerate() {
        let offset = viewport.to_screen_offset(GeoPoint::new(record.latitude, record.longitude));
        let dx = offset[0] - click_offset[0];
        let dy = offset[1] - click_offset[1];
        let d2 = dx * dx + dy * dy;
        if d2 <= pick_radius * pick_radius && best.is_none_or(|(_, bd)| d2 < bd) {
            best = Some((i, d2));
        }
    }
    best.map(|(i, _)| i)
}

fn handle_marker_selection(response: &egui::Response, rect: egui::Rect, state: &mut AppState) {
    if !response.clicked() {
        return;
    }
    let Some(click_pos) = response.interact_pointer_pos() else {
        return;
    };

    let offset = click_pos - rect.center();
    let picked = pick_marker(
        &state.viewport,
        state.controller.results(),
        [offset.x as f64, offset.y as f64],
        MARKER_RADIUS as f64 + PICK_SLACK,
    );
    state.selected = if picked == state.selected { None } else { picked };
}

fn draw_popup(ui: &egui::Ui, rect: egui::Rect, viewport: &MapViewport, record: &SampleRecord) {
    let pos = to_screen(rect, viewport, GeoPoint::new(record.latitude, record.longitude));
    if !rect.contains(pos) {
        return;
    }

    egui::Area::new(egui::Id::new("map_marker_popup"))
        .order(egui::Order::Foreground)
        .fixed_pos(pos + egui::vec2(MARKER_RADIUS + 4.0, -MARKER_RADIUS - 4.0))
        .interactable(false)
        .show(ui.ctx(), |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.label(egui::RichText::new(record.status.label()).strong().color(status_color(&record.status, 1.0)));
                ui.label(format!("Location: {}", record.location));
            });
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SampleStatus;

    fn record(lat: f64, lon: f64) -> SampleRecord {
        SampleRecord {
            status: SampleStatus::Known("Known".to_string()),
            pca_x: 0.0,
            pca_y: 0.0,
            latitude: lat,
            longitude: lon,
            location: format!("{},{}", lat, lon),
            sequence: None,
        }
    }

    #[test]
    fn pick_selects_nearest_marker_within_radius() {
        let viewport = MapViewport::new(GeoPoint::new(20.0, 140.0), 4.0);
        let records = vec![record(20.0, 140.0), record(20.0, 140.2), record(-10.0, 100.0)];

        let first = viewport.to_screen_offset(GeoPoint::new(20.0, 140.0));
        let second = viewport.to_screen_offset(GeoPoint::new(20.0, 140.2));
        let between_closer_to_second = [first[0] * 0.2 + second[0] * 0.8, first[1]];

        assert_eq!(pick_marker(&viewport, &records, first, 9.0), Some(0));
        assert_eq!(pick_marker(&viewport, &records, between_closer_to_second, 9.0), Some(1));
    }

    #[test]
    fn pick_misses_when_click_is_far() {
        let viewport = MapViewport::new(GeoPoint::new(20.0, 140.0), 2.0);
        let records = vec![record(10.0, 140.0)];
        assert_eq!(pick_marker(&viewport, &records, [300.0, 300.0], 9.0), None);
        assert_eq!(pick_marker(&viewport, &[], [0.0, 0.0], 9.0), None);
    }
}
