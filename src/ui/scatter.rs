//! PCA scatter plot: one point per sample at `(pca_x, pca_y)`, coloured by status.

use crate::analysis::{SampleRecord, SampleStatus};
use crate::ui::AppState;
use crate::ui::app_state::{MARKER_FILL_OPACITY, MARKER_RADIUS, status_color};
use eframe::egui;
use egui_plot::{Legend, MarkerShape, Plot, Points};

/// Points of one status label.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterSeries {
    pub status: SampleStatus,
    pub points: Vec<[f64; 2]>,
}

/// Group records into one series per status label, in order of first appearance.
///
/// Every record lands in exactly one series, so the plot shows as many points as
/// there are results.
pub fn scatter_series(records: &[SampleRecord]) -> Vec<ScatterSeries> {
    let mut series: Vec<ScatterSeries> = Vec::new();
    for record in records {
        let point = [record.pca_x, record.pca_y];
        match series.iter_mut().find(|s| s.status == record.status) {
            Some(existing) => existing.points.push(point),
            None => series.push(ScatterSeries {
                status: record.status.clone(),
                points: vec![point],
            }),
        }
    }
    series
}

pub fn render(ui: &mut egui::Ui, state: &AppState) {
    ui.heading("Genetic Clusters (PCA)");
    ui.separator();

    let series = scatter_series(state.controller.results());

    Plot::new("pca_scatter")
        .legend(Legend::default())
        .x_axis_label("PCA X")
        .y_axis_label("PCA Y")
        .label_formatter(|name, value| {
            if name.is_empty() {
                format!("PCA X: {:.3}\nPCA Y: {:.3}", value.x, value.y)
            } else {
                format!("{}\nPCA X: {:.3}\nPCA Y: {:.3}", name, value.x, value.y)
            }
        })
        .show(ui, |plot_ui| {
            for s in series {
                let color = status_color(&s.status, MARKER_FILL_OPACITY);
                plot_ui.points(
                    Points::new(s.status.label().to_string(), s.points)
                        .shape(MarkerShape::Circle)
                        .radius(MARKER_RADIUS)
                        .filled(true)
                        .color(color),
                );
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: &str, x: f64, y: f64) -> SampleRecord {
        SampleRecord {
            status: SampleStatus::from(status.to_string()),
            pca_x: x,
            pca_y: y,
            latitude: 0.0,
            longitude: 0.0,
            location: String::new(),
            sequence: None,
        }
    }

    #[test]
    fn one_point_per_record_grouped_by_status() {
        let records = vec![
            record("New Organism", 1.2, -0.3),
            record("Known", 0.1, 0.2),
            record("New Organism", 3.0, 0.7),
            record("Known Species", -1.0, 0.0),
        ];

        let series = scatter_series(&records);

        assert_eq!(series.len(), 3);
        assert_eq!(series[0].status, SampleStatus::NewOrganism);
        assert_eq!(series[0].points, vec![[1.2, -0.3], [3.0, 0.7]]);
        assert_eq!(series[1].points, vec![[0.1, 0.2]]);
        assert_eq!(series[2].status.label(), "Known Species");
        assert_eq!(series.iter().map(|s| s.points.len()).sum::<usize>(), records.len());
    }

    #[test]
    fn no_records_no_series() {
        assert!(scatter_series(&[]).is_empty());
    }
}
