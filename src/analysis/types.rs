//! Wire types for the remote analysis service.
//!
//! The service answers `POST /analyze` with a JSON envelope holding one record per
//! analyzed sample. Field names follow the service's DataFrame columns, so several
//! of them are capitalized (`Latitude`, `Longitude`, `Location`, `Sequence`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Status label the service assigns to samples its model could not place.
pub const NEW_ORGANISM_LABEL: &str = "New Organism";

/// Classification tag of a sample.
///
/// The service only distinguishes anomalies from everything else, but the label it
/// uses for known samples is kept verbatim so results are shown exactly as returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SampleStatus {
    NewOrganism,
    Known(String),
}

impl SampleStatus {
    pub fn is_anomaly(&self) -> bool {
        matches!(self, SampleStatus::NewOrganism)
    }

    pub fn label(&self) -> &str {
        match self {
            SampleStatus::NewOrganism => NEW_ORGANISM_LABEL,
            SampleStatus::Known(label) => label,
        }
    }
}

impl From<String> for SampleStatus {
    fn from(label: String) -> Self {
        if label == NEW_ORGANISM_LABEL {
            SampleStatus::NewOrganism
        } else {
            SampleStatus::Known(label)
        }
    }
}

impl From<SampleStatus> for String {
    fn from(status: SampleStatus) -> Self {
        match status {
            SampleStatus::NewOrganism => NEW_ORGANISM_LABEL.to_string(),
            SampleStatus::Known(label) => label,
        }
    }
}

impl std::fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One analyzed organism/reading as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub status: SampleStatus,
    /// First PCA component, used only for plotting.
    pub pca_x: f64,
    /// Second PCA component, used only for plotting.
    pub pca_y: f64,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Location")]
    pub location: String,
    /// Raw sequence column echoed back by the service, when present.
    #[serde(rename = "Sequence", default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,
}

/// Response body of `POST /analyze`.
///
/// A successful run carries `results`. When the model fails the service still
/// answers with HTTP 200 but sends `{"status": "error", "message": ...}` instead.
#[derive(Debug, Deserialize)]
pub struct AnalysisEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<SampleRecord>>,
}

impl AnalysisEnvelope {
    /// Extract the record list, or the service's explanation of why there is none.
    pub fn into_results(self) -> Result<Vec<SampleRecord>, String> {
        match self.results {
            Some(results) => Ok(results),
            None => Err(self
                .message
                .unwrap_or_else(|| format!("response without results (status: {})", self.status.as_deref().unwrap_or("missing")))),
        }
    }
}

/// A file chosen in the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    /// File name sent as the multipart part's filename.
    pub name: String,
}

impl SelectedFile {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload.csv".to_string());
        Self { path, name }
    }
}

/// Everything the worker needs to perform one analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub file: SelectedFile,
}

/// Count the samples flagged as new organisms.
pub fn count_anomalies(records: &[SampleRecord]) -> usize {
    records.iter().filter(|r| r.status.is_anomaly()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_RECORDS: &str = r#"{"results":[{"status":"New Organism","pca_x":1.2,"pca_y":-0.3,"Latitude":10,"Longitude":140,"Location":"Pacific"},{"status":"Known","pca_x":0.1,"pca_y":0.2,"Latitude":5,"Longitude":100,"Location":"Indian Ocean"}]}"#;

    #[test]
    fn envelope_with_results_decodes_in_order() {
        let envelope: AnalysisEnvelope = serde_json::from_str(TWO_RECORDS).unwrap();
        let records = envelope.into_results().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, SampleStatus::NewOrganism);
        assert_eq!(records[0].latitude, 10.0);
        assert_eq!(records[0].longitude, 140.0);
        assert_eq!(records[0].location, "Pacific");
        assert_eq!(records[1].status, SampleStatus::Known("Known".to_string()));
        assert_eq!(records[1].pca_y, 0.2);
        assert_eq!(count_anomalies(&records), 1);
    }

    #[test]
    fn backend_columns_are_accepted() {
        // Shape produced by the service: every CSV column plus status and PCA.
        let body = r#"{"status":"success","results":[{"Sequence":"ATCGGCTA","Location":"Uncharted Zone X","Latitude":0.5121,"Longitude":161.2,"status":"New Organism","pca_x":3.1,"pca_y":0.7,"extra":1}]}"#;
        let envelope: AnalysisEnvelope = serde_json::from_str(body).unwrap();
        let records = envelope.into_results().unwrap();

        assert_eq!(records[0].sequence.as_deref(), Some("ATCGGCTA"));
        assert!(records[0].status.is_anomaly());
    }

    #[test]
    fn error_envelope_reports_service_message() {
        let body = r#"{"status":"error","message":"'Sequence'"}"#;
        let envelope: AnalysisEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.into_results().unwrap_err(), "'Sequence'");

        let envelope: AnalysisEnvelope = serde_json::from_str("{}").unwrap();
        assert!(envelope.into_results().unwrap_err().contains("missing"));
    }

    #[test]
    fn non_numeric_coordinates_are_rejected() {
        let body = r#"{"results":[{"status":"Known","pca_x":"a","pca_y":0,"Latitude":0,"Longitude":0,"Location":""}]}"#;
        assert!(serde_json::from_str::<AnalysisEnvelope>(body).is_err());
    }

    #[test]
    fn status_label_is_preserved() {
        let status: SampleStatus = "Known Species".to_string().into();
        assert_eq!(status.label(), "Known Species");
        assert!(!status.is_anomaly());
        assert_eq!(String::from(SampleStatus::NewOrganism), NEW_ORGANISM_LABEL);
    }

    #[test]
    fn selected_file_uses_file_name() {
        let file = SelectedFile::from_path("/tmp/samples/edna_data.csv");
        assert_eq!(file.name, "edna_data.csv");
        assert_eq!(count_anomalies(&[]), 0);
    }
}
