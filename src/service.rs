use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;

use crate::error::{remote_error, validation_error, IoContext, Result};
use crate::progress::percent;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Status of a remote analysis job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[serde(alias = "downloading", alias = "processing")]
    Pending,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }
}

/// Snapshot of a submitted video as reported by the service
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub frames_complete: u64,
    #[serde(default, rename = "framesCount")]
    pub frames_total: u64,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub error: Option<String>,
    #[serde(default, rename = "millisecondsComplete")]
    pub total_duration_ms: Option<i64>,
}

impl AnalysisJob {
    /// Completion percentage in `[0, 100]`; zero while the frame total is unknown
    pub fn progress_percent(&self) -> u64 {
        percent(self.frames_complete, self.frames_total)
    }
}

/// One detected objectionable interval, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ObjectionableInstance {
    #[serde(rename = "start_ms", alias = "startMs")]
    pub start_ms: i64,
    #[serde(rename = "end_ms", alias = "endMs")]
    pub end_ms: i64,
}

impl ObjectionableInstance {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }
}

/// Analysis output the rest of the pipeline consumes
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResults {
    pub instances: Vec<ObjectionableInstance>,
    pub total_duration_ms: i64,
}

/// Options sent with a submission
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOptions {
    /// Detection sensitivity in `[0, 1]`; lower is stricter
    pub threshold: f64,
    pub skip_frames: Option<u32>,
    pub skip_seconds: Option<u32>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            threshold: 0.4,
            skip_frames: None,
            skip_seconds: None,
        }
    }
}

impl CheckOptions {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(validation_error(
                "threshold",
                format!("Threshold must be between 0 and 1, got {}", self.threshold),
            ));
        }
        Ok(())
    }

    fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("nudebox_threshold", self.threshold.to_string())];
        if let Some(frames) = self.skip_frames {
            fields.push(("skipframes", frames.to_string()));
        }
        if let Some(seconds) = self.skip_seconds {
            fields.push(("skipseconds", seconds.to_string()));
        }
        fields
    }
}

/// Remote content-analysis service
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Upload a video and start analysis, returning the new job id
    async fn submit(&self, video: &Path, options: &CheckOptions) -> Result<String>;

    /// Current state of a job
    async fn status(&self, job_id: &str) -> Result<AnalysisJob>;

    /// Detected instances of a completed job, in service order
    async fn results(&self, job_id: &str) -> Result<Vec<ObjectionableInstance>>;

    /// Drop the job and its results from the service
    async fn delete(&self, job_id: &str) -> Result<()>;
}

/// HTTP client for a Videobox-compatible service
pub struct VideoboxClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultsResponse {
    #[serde(default)]
    nudebox: Option<NudeboxResults>,
}

#[derive(Debug, Deserialize)]
struct NudeboxResults {
    #[serde(default)]
    nudity: Vec<NudityItem>,
}

#[derive(Debug, Deserialize)]
struct NudityItem {
    #[serde(default)]
    instances: Vec<ObjectionableInstance>,
}

impl VideoboxClient {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/videobox{}", self.base_url, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.client.get(self.url(path)).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(remote_error(format!("GET {} returned {}: {}", path, status, body)));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| remote_error(format!("Invalid response from GET {}: {}", path, e)))
    }
}

#[async_trait]
impl AnalysisService for VideoboxClient {
    async fn submit(&self, video: &Path, options: &CheckOptions) -> Result<String> {
        let file = tokio::fs::File::open(video).await.with_path(video)?;
        let length = file.metadata().await.with_path(video)?.len();
        let file_name = video
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());

        debug!("Uploading {} bytes from {:?}", length, video);

        let body = Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, length).file_name(file_name);
        let mut form = Form::new().part("file", part);
        for (name, value) in options.form_fields() {
            form = form.text(name, value);
        }

        let response = self
            .client
            .post(self.url("/check"))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body: Option<CheckResponse> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let reason = body.and_then(|b| b.error).unwrap_or(text);
            return Err(remote_error(format!("Submission rejected ({}): {}", status, reason)));
        }
        let body = body.ok_or_else(|| {
            remote_error(format!("Invalid check response ({}): {}", status, text))
        })?;
        if body.success == Some(false) {
            return Err(remote_error(format!(
                "Submission rejected ({}): {}",
                status,
                body.error.unwrap_or_else(|| "no reason given".to_string())
            )));
        }

        body.id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| remote_error("Submission response did not include a job id"))
    }

    async fn status(&self, job_id: &str) -> Result<AnalysisJob> {
        self.get_json(&format!("/status/{}", job_id)).await
    }

    async fn results(&self, job_id: &str) -> Result<Vec<ObjectionableInstance>> {
        let results: ResultsResponse = self.get_json(&format!("/results/{}", job_id)).await?;
        Ok(results
            .nudebox
            .map(|n| n.nudity.into_iter().flat_map(|item| item.instances).collect())
            .unwrap_or_default())
    }

    async fn delete(&self, job_id: &str) -> Result<()> {
        let path = format!("/results/{}", job_id);
        let response = self.client.delete(self.url(&path)).send().await?;
        if !response.status().is_success() {
            return Err(remote_error(format!(
                "DELETE {} returned {}",
                path,
                response.status()
            )));
        }
        Ok(())
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        let json = r#"{
            "id": "5a50b7b8",
            "status": "processing",
            "framesCount": 200,
            "framesComplete": 50,
            "millisecondsComplete": 4000,
            "error": ""
        }"#;
        let job: AnalysisJob = serde_json::from_str(json).unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.frames_total, 200);
        assert_eq!(job.error, None);
        assert_eq!(job.total_duration_ms, Some(4000));
        assert_eq!(job.progress_percent(), 25);
    }

    #[test]
    fn test_failed_status_keeps_message() {
        let json = r#"{"id": "x", "status": "failed", "error": "unsupported codec"}"#;
        let job: AnalysisJob = serde_json::from_str(json).unwrap();

        assert!(job.status.is_terminal());
        assert_eq!(job.error.as_deref(), Some("unsupported codec"));
    }

    #[test]
    fn test_progress_percent_guards() {
        let mut job = AnalysisJob {
            id: "x".to_string(),
            status: JobStatus::Pending,
            frames_complete: 10,
            frames_total: 0,
            error: None,
            total_duration_ms: None,
        };
        assert_eq!(job.progress_percent(), 0);

        job.frames_total = 5;
        assert_eq!(job.progress_percent(), 100);
    }

    #[test]
    fn test_check_options_validation() {
        assert!(CheckOptions::default().validate().is_ok());
        let bad = CheckOptions {
            threshold: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let negative = CheckOptions {
            threshold: -0.1,
            ..Default::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_form_fields_skip_unset_options() {
        let opts = CheckOptions {
            threshold: 0.3,
            skip_frames: None,
            skip_seconds: Some(2),
        };
        let fields = opts.form_fields();
        assert_eq!(
            fields,
            vec![
                ("nudebox_threshold", "0.3".to_string()),
                ("skipseconds", "2".to_string())
            ]
        );
    }

    #[test]
    fn test_client_url() {
        let client = VideoboxClient::new("http://localhost:8080/");
        assert_eq!(client.url("/check"), "http://localhost:8080/videobox/check");
    }

    mod http {
        use super::*;
        use serde_json::json;
        use std::path::PathBuf;
        use tempfile::TempDir;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn video_file() -> (TempDir, PathBuf) {
            let dir = tempfile::tempdir().unwrap();
            let video = dir.path().join("movie.mp4");
            std::fs::write(&video, b"not really a video").unwrap();
            (dir, video)
        }

        async fn respond(verb: &str, route: &str, template: ResponseTemplate) -> MockServer {
            let server = MockServer::start().await;
            Mock::given(method(verb))
                .and(path(route))
                .respond_with(template)
                .mount(&server)
                .await;
            server
        }

        #[tokio::test]
        async fn test_submit_returns_job_id() {
            let (_dir, video) = video_file();
            let server = respond(
                "POST",
                "/videobox/check",
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "id": "5a50b7b8"})),
            )
            .await;
            let client = VideoboxClient::new(&server.uri());

            let id = client.submit(&video, &CheckOptions::default()).await.unwrap();
            assert_eq!(id, "5a50b7b8");

            let received = server.received_requests().await.unwrap();
            let upload = String::from_utf8_lossy(&received[0].body);
            assert!(upload.contains("not really a video"));
            assert!(upload.contains("nudebox_threshold"));
        }

        #[tokio::test]
        async fn test_submit_bad_request_is_rejected() {
            let (_dir, video) = video_file();
            let server = respond(
                "POST",
                "/videobox/check",
                ResponseTemplate::new(400).set_body_string("file too large"),
            )
            .await;
            let client = VideoboxClient::new(&server.uri());

            let err = client.submit(&video, &CheckOptions::default()).await.unwrap_err();
            match err {
                crate::RedactError::RemoteService { message } => {
                    assert!(message.contains("file too large"), "{}", message)
                }
                other => panic!("unexpected error: {}", other),
            }
        }

        #[tokio::test]
        async fn test_submit_unsuccessful_body_is_rejected() {
            let (_dir, video) = video_file();
            let server = respond(
                "POST",
                "/videobox/check",
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "error": "unsupported format"})),
            )
            .await;
            let client = VideoboxClient::new(&server.uri());

            let err = client.submit(&video, &CheckOptions::default()).await.unwrap_err();
            assert!(matches!(err, crate::RedactError::RemoteService { .. }));
            assert!(err.to_string().contains("unsupported format"));
        }

        #[tokio::test]
        async fn test_submit_without_id_is_rejected() {
            let (_dir, video) = video_file();
            let server = respond(
                "POST",
                "/videobox/check",
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "id": ""})),
            )
            .await;
            let client = VideoboxClient::new(&server.uri());

            let err = client.submit(&video, &CheckOptions::default()).await.unwrap_err();
            assert!(matches!(err, crate::RedactError::RemoteService { .. }));
        }

        #[tokio::test]
        async fn test_status_server_error() {
            let server = respond(
                "GET",
                "/videobox/status/job-1",
                ResponseTemplate::new(500).set_body_string("boom"),
            )
            .await;
            let client = VideoboxClient::new(&server.uri());

            let err = client.status("job-1").await.unwrap_err();
            assert!(matches!(err, crate::RedactError::RemoteService { .. }));
        }

        #[tokio::test]
        async fn test_status_parsed_from_server() {
            let server = respond(
                "GET",
                "/videobox/status/job-1",
                ResponseTemplate::new(200).set_body_json(json!({
                    "id": "job-1",
                    "status": "complete",
                    "framesCount": 40,
                    "framesComplete": 40,
                    "millisecondsComplete": 10000
                })),
            )
            .await;
            let client = VideoboxClient::new(&server.uri());

            let job = client.status("job-1").await.unwrap();
            assert_eq!(job.status, JobStatus::Complete);
            assert_eq!(job.total_duration_ms, Some(10_000));
        }

        #[tokio::test]
        async fn test_results_flatten_all_categories() {
            let server = respond(
                "GET",
                "/videobox/results/job-1",
                ResponseTemplate::new(200).set_body_json(json!({
                    "ready": true,
                    "nudebox": {
                        "nudity": [
                            {"key": "nudity", "instances": [
                                {"start": 2, "end": 3, "start_ms": 2000, "end_ms": 3000, "confidence": 0.8}
                            ]},
                            {"key": "nudity", "instances": [
                                {"start": 7, "end": 8, "start_ms": 7000, "end_ms": 8000, "confidence": 0.6},
                                {"start": 9, "end": 9, "start_ms": 9000, "end_ms": 9400, "confidence": 0.5}
                            ]}
                        ]
                    }
                })),
            )
            .await;
            let client = VideoboxClient::new(&server.uri());

            let instances = client.results("job-1").await.unwrap();
            assert_eq!(
                instances,
                vec![
                    ObjectionableInstance::new(2000, 3000),
                    ObjectionableInstance::new(7000, 8000),
                    ObjectionableInstance::new(9000, 9400),
                ]
            );
        }

        #[tokio::test]
        async fn test_results_without_nudebox_are_empty() {
            let server = respond(
                "GET",
                "/videobox/results/job-1",
                ResponseTemplate::new(200).set_body_json(json!({"ready": true})),
            )
            .await;
            let client = VideoboxClient::new(&server.uri());

            assert!(client.results("job-1").await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_delete_outcomes() {
            let ok = respond("DELETE", "/videobox/results/job-1", ResponseTemplate::new(200)).await;
            assert!(VideoboxClient::new(&ok.uri()).delete("job-1").await.is_ok());

            let failing = respond("DELETE", "/videobox/results/job-1", ResponseTemplate::new(500)).await;
            let err = VideoboxClient::new(&failing.uri()).delete("job-1").await.unwrap_err();
            assert!(matches!(err, crate::RedactError::RemoteService { .. }));
        }
    }
}
