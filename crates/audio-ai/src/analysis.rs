//! Transcript analysis.
//!
//! A language model is asked for the narratively significant instants of a
//! transcript. Segments are sent in fixed-size slices. Replies are expected
//! as JSON:
//!
//! ```json
//! {"AllTimestampSeconds": [12, 95],
//!  "TimestampMetadata": [{"StartSeconds": 12, "Reason": "ambush"}]}
//! ```
//!
//! Markdown code fences are stripped. Malformed replies go back to the model
//! for repair a bounded number of times before the batch fails.

use std::time::Duration;

use reelsmith_common::{ReelError, ReelResult, ServiceConfig};
use reelsmith_timeline_model::{NotableTimestamp, SubtitleSegment};
use serde::{Deserialize, Serialize};

/// Marker a model reply carries when the model refused the content.
pub const SAFETY_MARKER: &str = "EDITOR_FORBIDDEN";

const ANALYSIS_INSTRUCTION: &str = "\
You are a film editor. You receive transcript lines formatted as \
[start-end] text, with times in seconds. Return the moments where music \
should swell: turning points, reveals, and the peak of any action. \
Respond only with JSON of the form \
{\"AllTimestampSeconds\": [int], \"TimestampMetadata\": [{\"StartSeconds\": int, \"Reason\": string}]}.";

const REPAIR_INSTRUCTION: &str = "\
The following input is invalid JSON. Transform it into valid JSON and \
return only the syntactically correct JSON.";

/// A completion service.
pub trait AnalysisModel {
    fn complete(&self, system: &str, prompt: &str) -> ReelResult<String>;

    /// Ask the model to turn malformed JSON into valid JSON.
    fn repair(&self, malformed: &str) -> ReelResult<String> {
        self.complete(REPAIR_INSTRUCTION, malformed)
    }
}

/// Batching and repair policy.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub batch_size: usize,
    pub max_repairs: u32,
    pub repair_delay: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_repairs: 3,
            repair_delay: Duration::from_secs(15),
        }
    }
}

impl From<&ServiceConfig> for AnalysisConfig {
    fn from(services: &ServiceConfig) -> Self {
        Self {
            batch_size: services.analysis_batch_size,
            max_repairs: services.analysis_max_retries,
            repair_delay: Duration::from_secs(services.analysis_retry_delay_secs),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AnalysisReply {
    #[serde(default)]
    all_timestamp_seconds: Vec<i64>,
    #[serde(default)]
    timestamp_metadata: Vec<TimestampMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TimestampMetadata {
    start_seconds: i64,
    #[serde(default)]
    reason: String,
}

impl AnalysisReply {
    /// Described timestamps, plus bare ones with no description.
    fn into_notable(self) -> Vec<NotableTimestamp> {
        let mut notable: Vec<NotableTimestamp> = self
            .timestamp_metadata
            .into_iter()
            .filter(|m| m.start_seconds >= 0)
            .map(|m| NotableTimestamp::new(m.start_seconds as f64, m.reason))
            .collect();
        for secs in self.all_timestamp_seconds {
            let secs = secs as f64;
            if secs >= 0.0 && !notable.iter().any(|n| n.seconds == secs) {
                notable.push(NotableTimestamp::new(secs, ""));
            }
        }
        notable
    }
}

/// Remove markdown code fences around a JSON reply.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// One analysis request line per segment.
fn render_batch(segments: &[SubtitleSegment]) -> String {
    segments
        .iter()
        .map(|s| format!("[{:.2}-{:.2}] {}", s.start_secs, s.end_secs, s.text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Picks notable timestamps out of a transcript.
pub struct TranscriptAnalyzer<M> {
    model: M,
    config: AnalysisConfig,
}

impl<M: AnalysisModel> TranscriptAnalyzer<M> {
    pub fn new(model: M, config: AnalysisConfig) -> Self {
        Self { model, config }
    }

    /// Notable timestamps across all batches, ascending.
    pub fn analyze(&self, segments: &[SubtitleSegment]) -> ReelResult<Vec<NotableTimestamp>> {
        let mut notable = vec![];
        let batch_size = self.config.batch_size.max(1);

        for (index, batch) in segments.chunks(batch_size).enumerate() {
            let raw = self.model.complete(ANALYSIS_INSTRUCTION, &render_batch(batch))?;
            let reply = self.parse_with_repair(&raw)?;
            let found = reply.into_notable();
            tracing::debug!(batch = index, segments = batch.len(), found = found.len(), "Analyzed batch");
            notable.extend(found);
        }

        notable.sort_by(|a, b| a.seconds.total_cmp(&b.seconds));
        tracing::info!(segments = segments.len(), notable = notable.len(), "Transcript analysis complete");
        Ok(notable)
    }

    fn parse_with_repair(&self, raw: &str) -> ReelResult<AnalysisReply> {
        if raw.contains(SAFETY_MARKER) {
            return Err(ReelError::analysis("model refused the transcript content"));
        }

        let mut text = strip_code_fences(raw);
        let mut attempt = 0;
        loop {
            let err = match serde_json::from_str::<AnalysisReply>(&text) {
                Ok(reply) => return Ok(reply),
                Err(e) => e,
            };
            if attempt >= self.config.max_repairs {
                return Err(ReelError::analysis(format!(
                    "reply still malformed after {attempt} repairs: {err}"
                )));
            }
            if attempt > 0 && !self.config.repair_delay.is_zero() {
                std::thread::sleep(self.config.repair_delay);
            }
            attempt += 1;
            tracing::warn!(attempt, error = %err, "Malformed analysis reply, requesting repair");
            text = strip_code_fences(&self.model.repair(&text)?);
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    system: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    text: String,
    #[serde(default)]
    flagged: bool,
}

/// Completion service reached over HTTP.
///
/// Posts `{"system", "prompt"}` and expects `{"text", "flagged"}`.
pub struct HttpAnalysisModel {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAnalysisModel {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> ReelResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("reelsmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReelError::analysis(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    /// Build from service settings. `None` when no endpoint is configured.
    pub fn from_services(services: &ServiceConfig) -> ReelResult<Option<Self>> {
        let Some(endpoint) = services.analysis_endpoint.as_deref() else {
            return Ok(None);
        };
        let api_key = std::env::var(&services.analysis_api_key_env).ok();
        Self::new(endpoint, api_key).map(Some)
    }
}

impl AnalysisModel for HttpAnalysisModel {
    fn complete(&self, system: &str, prompt: &str) -> ReelResult<String> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&CompletionRequest { system, prompt });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|e| ReelError::analysis(format!("analysis request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(ReelError::analysis(format!(
                "analysis service returned status {}",
                response.status()
            )));
        }

        let body: CompletionResponse = response
            .json()
            .map_err(|e| ReelError::analysis(format!("unreadable analysis response: {e}")))?;
        if body.flagged {
            tracing::info!("Analysis service flagged the content");
            return Ok(format!("[{SAFETY_MARKER}] content flagged"));
        }
        Ok(body.text)
    }
}
