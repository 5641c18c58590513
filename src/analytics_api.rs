use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, multipart};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::{ApiError, ErrorKind, error_message_from_body};
use crate::model::{
    AnalysisResult, AnalysisStatus, LiveFrame, MatchPrediction, PerformanceMode,
    SentimentResponse, StartReceipt, StopReceipt, TeamFeedbackResponse, UploadReceipt,
};

pub const DEFAULT_API_BASE: &str = "http://localhost:5000/api";

// Uploads are whole match videos; the shared client timeout is sized for polling.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// One method per backend capability. Implementations keep no session state
/// and never retry; callers decide.
pub trait AnalyticsApi: Send + Sync {
    fn upload_video(&self, path: &Path) -> Result<UploadReceipt, ApiError>;
    fn start_analysis(&self, mode: PerformanceMode) -> Result<StartReceipt, ApiError>;
    fn stop_analysis(&self) -> Result<StopReceipt, ApiError>;
    fn results(&self) -> Result<AnalysisResult, ApiError>;
    fn status(&self) -> Result<AnalysisStatus, ApiError>;
    fn current_frame(&self) -> Result<LiveFrame, ApiError>;
    fn analyze_sentiment(
        &self,
        team_name: &str,
        match_data: &Value,
    ) -> Result<SentimentResponse, ApiError>;
    fn team_feedback(&self, team_name: &str) -> Result<TeamFeedbackResponse, ApiError>;
    fn predict_outcome(
        &self,
        analysis: Option<&AnalysisResult>,
    ) -> Result<MatchPrediction, ApiError>;
    fn health(&self) -> Result<Value, ApiError>;
}

#[derive(Debug, Serialize)]
struct StartAnalysisRequest {
    performance_mode: PerformanceMode,
}

#[derive(Debug, Serialize)]
struct SentimentRequest<'a> {
    team_name: &'a str,
    match_data: &'a Value,
}

pub struct HttpAnalyticsClient {
    client: Client,
    base_url: String,
}

impl HttpAnalyticsClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: normalize_base_url(base_url),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn team_feedback_url(&self, team_name: &str) -> Result<Url, ApiError> {
        const FALLBACK: &str = "Failed to get team feedback";
        let mut url = Url::parse(&self.endpoint("team_feedback"))
            .map_err(|err| ApiError::transport(ErrorKind::FetchFailed, FALLBACK, err))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::new(ErrorKind::FetchFailed, FALLBACK))?
            .push(team_name);
        Ok(url)
    }
}

impl AnalyticsApi for HttpAnalyticsClient {
    fn upload_video(&self, path: &Path) -> Result<UploadReceipt, ApiError> {
        const FALLBACK: &str = "Upload failed";
        let form = multipart::Form::new()
            .file("video", path)
            .map_err(|err| ApiError::transport(ErrorKind::UploadFailed, FALLBACK, err))?;
        let req = self
            .client
            .post(self.endpoint("upload"))
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form);
        send_json(req, ErrorKind::UploadFailed, FALLBACK)
    }

    fn start_analysis(&self, mode: PerformanceMode) -> Result<StartReceipt, ApiError> {
        let req = self
            .client
            .post(self.endpoint("start_analysis"))
            .json(&StartAnalysisRequest {
                performance_mode: mode,
            });
        send_json(req, ErrorKind::StartFailed, "Failed to start analysis")
    }

    fn stop_analysis(&self) -> Result<StopReceipt, ApiError> {
        let req = self
            .client
            .post(self.endpoint("stop_analysis"))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        send_json(req, ErrorKind::StopFailed, "Failed to stop analysis")
    }

    fn results(&self) -> Result<AnalysisResult, ApiError> {
        let req = self.client.get(self.endpoint("results"));
        send_json(req, ErrorKind::FetchFailed, "Failed to get results")
    }

    fn status(&self) -> Result<AnalysisStatus, ApiError> {
        let req = self.client.get(self.endpoint("status"));
        send_json(req, ErrorKind::FetchFailed, "Failed to get status")
    }

    fn current_frame(&self) -> Result<LiveFrame, ApiError> {
        let req = self.client.get(self.endpoint("current_frame"));
        send_json(req, ErrorKind::FetchFailed, "No frame data available")
    }

    fn analyze_sentiment(
        &self,
        team_name: &str,
        match_data: &Value,
    ) -> Result<SentimentResponse, ApiError> {
        let req = self
            .client
            .post(self.endpoint("sentiment_analysis"))
            .json(&SentimentRequest {
                team_name,
                match_data,
            });
        send_json(req, ErrorKind::FetchFailed, "Sentiment analysis failed")
    }

    fn team_feedback(&self, team_name: &str) -> Result<TeamFeedbackResponse, ApiError> {
        let url = self.team_feedback_url(team_name)?;
        let req = self.client.get(url);
        send_json(req, ErrorKind::FetchFailed, "Failed to get team feedback")
    }

    fn predict_outcome(
        &self,
        analysis: Option<&AnalysisResult>,
    ) -> Result<MatchPrediction, ApiError> {
        const FALLBACK: &str = "Failed to get match prediction";
        let body = match analysis {
            Some(result) => serde_json::to_value(result)
                .map_err(|err| ApiError::transport(ErrorKind::FetchFailed, FALLBACK, err))?,
            None => json!({}),
        };
        let resp = self
            .client
            .post(self.endpoint("predict_outcome"))
            .json(&body)
            .send()
            .map_err(|err| ApiError::transport(ErrorKind::FetchFailed, FALLBACK, err))?;
        let status = resp.status();
        let text = resp
            .text()
            .map_err(|err| ApiError::transport(ErrorKind::FetchFailed, FALLBACK, err))?;
        if status.is_success() {
            return decode_prediction(&text, FALLBACK);
        }
        if let Some(fallback) = fallback_prediction_from_body(&text) {
            return Ok(fallback);
        }
        Err(ApiError::from_body(ErrorKind::FetchFailed, &text, FALLBACK))
    }

    fn health(&self) -> Result<Value, ApiError> {
        let req = self.client.get(self.endpoint("health"));
        send_json(req, ErrorKind::FetchFailed, "Health check failed")
    }
}

fn send_json<T: DeserializeOwned>(
    req: RequestBuilder,
    kind: ErrorKind,
    fallback: &str,
) -> Result<T, ApiError> {
    let resp = req
        .send()
        .map_err(|err| ApiError::transport(kind, fallback, err))?;
    let status = resp.status();
    let body = resp
        .text()
        .map_err(|err| ApiError::transport(kind, fallback, err))?;
    if !status.is_success() {
        return Err(ApiError::from_body(kind, &body, fallback));
    }
    decode_body(&body, kind, fallback)
}

/// Decodes a 2xx body. A body carrying a non-empty `error` is a failure of the
/// call even when the payload type would accept it with defaults.
fn decode_body<T: DeserializeOwned>(
    body: &str,
    kind: ErrorKind,
    fallback: &str,
) -> Result<T, ApiError> {
    if let Some(message) = error_message_from_body(body) {
        return Err(ApiError::new(kind, message));
    }
    serde_json::from_str(body.trim()).map_err(|err| ApiError::transport(kind, fallback, err))
}

/// Predictions may carry `error` next to a usable outcome (baseline model), or
/// only a `fallback_prediction`.
fn decode_prediction(body: &str, fallback: &str) -> Result<MatchPrediction, ApiError> {
    if let Some(prediction) = fallback_prediction_from_body(body) {
        return Ok(prediction);
    }
    let has_outcome = serde_json::from_str::<Value>(body.trim())
        .ok()
        .and_then(|value| value.get("predicted_outcome").cloned())
        .is_some_and(|outcome| outcome.as_str().is_some_and(|s| !s.trim().is_empty()));
    if has_outcome {
        return serde_json::from_str(body.trim())
            .map_err(|err| ApiError::transport(ErrorKind::FetchFailed, fallback, err));
    }
    decode_body(body, ErrorKind::FetchFailed, fallback)
}

pub fn fallback_prediction_from_body(body: &str) -> Option<MatchPrediction> {
    let value: Value = serde_json::from_str(body.trim()).ok()?;
    let fallback = value.get("fallback_prediction")?;
    if fallback.is_null() {
        return None;
    }
    serde_json::from_value(fallback.clone()).ok()
}

pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return DEFAULT_API_BASE.to_string();
    }
    trimmed.to_string()
}
