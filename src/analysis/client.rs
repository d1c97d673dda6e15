//! HTTP client for the remote analysis service.

use super::types::{AnalysisEnvelope, AnalysisRequest, SampleRecord};
use reqwest::blocking::{Client, multipart};
use std::time::Duration;

/// Something that can turn an uploaded file into analyzed sample records.
///
/// The dashboard talks to the real service through [`AnalysisClient`]; tests
/// substitute their own implementation.
pub trait AnalysisBackend {
    fn analyze(&self, request: &AnalysisRequest) -> Result<Vec<SampleRecord>, AnalysisError>;
}

/// Reasons an analysis round-trip did not produce results.
///
/// The user only ever sees one generic notice for all of these; the variants exist
/// so the log tells what actually went wrong.
#[derive(Debug)]
pub enum AnalysisError {
    /// The selected file could not be read from disk.
    ReadFile(std::io::Error),
    /// Connection, TLS, timeout or body transfer failure.
    Network(reqwest::Error),
    /// The service answered with a non-success status code.
    Status(u16, String),
    /// The body was not the expected JSON document.
    Malformed(serde_json::Error),
    /// The service reported a failure inside an otherwise valid envelope.
    Backend(String),
    /// The worker panicked before producing an outcome.
    Interrupted,
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::ReadFile(e) => write!(f, "Failed to read upload file: {}", e),
            AnalysisError::Network(e) => write!(f, "Network error: {}", e),
            AnalysisError::Status(code, body) => write!(f, "Server responded with status {}: {}", code, body),
            AnalysisError::Malformed(e) => write!(f, "Malformed response body: {}", e),
            AnalysisError::Backend(msg) => write!(f, "Analysis service reported an error: {}", msg),
            AnalysisError::Interrupted => write!(f, "Analysis worker was interrupted"),
        }
    }
}

impl std::error::Error for AnalysisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalysisError::ReadFile(e) => Some(e),
            AnalysisError::Network(e) => Some(e),
            AnalysisError::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

/// Blocking client for `POST /analyze`.
pub struct AnalysisClient {
    client: Client,
    endpoint: String,
}

impl AnalysisClient {
    /// Create a client for the service at `backend_url`.
    ///
    /// `timeout` of `None` keeps the transport's default.
    pub fn new(backend_url: &str, timeout: Option<Duration>) -> Result<Self, String> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self::with_client(client, backend_url))
    }

    /// Wrap an already configured reqwest client.
    pub fn with_client(client: Client, backend_url: &str) -> Self {
        Self {
            client,
            endpoint: analyze_url(backend_url),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl AnalysisBackend for AnalysisClient {
    /// Upload the request's file as the multipart field `file` and decode the answer.
    ///
    /// # Returns
    /// * `Ok(records)` for a 2xx response carrying a `results` array
    /// * `Err(AnalysisError)` for every other outcome
    fn analyze(&self, request: &AnalysisRequest) -> Result<Vec<SampleRecord>, AnalysisError> {
        let bytes = std::fs::read(&request.file.path).map_err(AnalysisError::ReadFile)?;

        log::info!("Uploading {} ({} bytes) to {}", request.file.name, bytes.len(), self.endpoint);

        let part = multipart::Part::bytes(bytes)
            .file_name(request.file.name.clone())
            .mime_str("text/csv")
            .map_err(AnalysisError::Network)?;
        let form = multipart::Form::new().part("file", part);

        let response = self.client.post(&self.endpoint).multipart(form).send().map_err(AnalysisError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AnalysisError::Status(status.as_u16(), body));
        }

        let body = response.text().map_err(AnalysisError::Network)?;
        let envelope: AnalysisEnvelope = serde_json::from_str(&body).map_err(AnalysisError::Malformed)?;
        let records = envelope.into_results().map_err(AnalysisError::Backend)?;

        log::debug!("Service returned {} records", records.len());
        Ok(records)
    }
}

fn analyze_url(backend_url: &str) -> String {
    format!("{}/analyze", backend_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{SampleStatus, SelectedFile};
    use mockito::Matcher;
    use std::net::TcpListener;
    use std::path::{Path, PathBuf};

    fn temp_csv(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ecoscan-client-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("edna_data.csv");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn local_client(base: &str) -> AnalysisClient {
        let client = Client::builder().no_proxy().build().unwrap();
        AnalysisClient::with_client(client, base)
    }

    fn request_for(path: &Path) -> AnalysisRequest {
        AnalysisRequest {
            file: SelectedFile::from_path(path),
        }
    }

    #[test]
    fn endpoint_is_joined_without_double_slash() {
        assert_eq!(analyze_url("http://127.0.0.1:8000"), "http://127.0.0.1:8000/analyze");
        assert_eq!(analyze_url("http://127.0.0.1:8000/"), "http://127.0.0.1:8000/analyze");
    }

    #[test]
    fn uploads_file_as_multipart_field() {
        let body = r#"{"status":"success","results":[{"status":"Known Species","pca_x":0.1,"pca_y":0.2,"Latitude":35.1,"Longitude":139.4,"Location":"Pacific Ocean Zone A"}]}"#;
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/analyze")
            .match_header("content-type", Matcher::Regex("^multipart/form-data; boundary=".to_string()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="file""#.to_string()),
                Matcher::Regex(r#"filename="edna_data\.csv""#.to_string()),
                Matcher::Regex("ATCG,Pacific Ocean Zone A,35\\.1,139\\.4".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create();
        let path = temp_csv("multipart", "Sequence,Location,Latitude,Longitude\nATCG,Pacific Ocean Zone A,35.1,139.4\n");

        let records = local_client(&server.url()).analyze(&request_for(&path)).unwrap();

        mock.assert();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, SampleStatus::Known("Known Species".to_string()));
    }

    #[test]
    fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new();
        let mock = server.mock("POST", "/analyze").with_status(500).with_body(r#"{"detail":"boom"}"#).create();
        let path = temp_csv("status", "Sequence\nATCG\n");

        let result = local_client(&server.url()).analyze(&request_for(&path));

        mock.assert();
        match result {
            Err(AnalysisError::Status(code, body)) => {
                assert_eq!(code, 500);
                assert!(body.contains("boom"));
            }
            other => panic!("Expected status error, got {:?}", other),
        }
    }

    #[test]
    fn error_envelope_is_an_error() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/analyze")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"error","message":"'Sequence'"}"#)
            .create();
        let path = temp_csv("envelope", "Location\nX\n");

        let result = local_client(&server.url()).analyze(&request_for(&path));

        mock.assert();
        assert!(matches!(result, Err(AnalysisError::Backend(msg)) if msg == "'Sequence'"));
    }

    #[test]
    fn unparsable_body_is_an_error() {
        let mut server = mockito::Server::new();
        let mock = server.mock("POST", "/analyze").with_status(200).with_body("<html>not json</html>").create();
        let path = temp_csv("malformed", "Sequence\nATCG\n");

        let result = local_client(&server.url()).analyze(&request_for(&path));

        mock.assert();
        assert!(matches!(result, Err(AnalysisError::Malformed(_))));
    }

    #[test]
    fn missing_file_fails_before_any_request() {
        let mut server = mockito::Server::new();
        let mock = server.mock("POST", "/analyze").expect(0).create();
        let request = AnalysisRequest {
            file: SelectedFile::from_path("/nonexistent/ecoscan/edna_data.csv"),
        };

        let result = local_client(&server.url()).analyze(&request);

        mock.assert();
        assert!(matches!(result, Err(AnalysisError::ReadFile(_))));
    }

    #[test]
    fn unreachable_service_is_a_network_error() {
        // Bind then drop to get a port with no listener.
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let path = temp_csv("unreachable", "Sequence\nATCG\n");

        let result = local_client(&format!("http://127.0.0.1:{}", port)).analyze(&request_for(&path));
        assert!(matches!(result, Err(AnalysisError::Network(_))));
    }
}
