//! Generative code-snippet collaborator for Code Review Race.
//!
//! A source is asked for a snippet at a level (1-5) in a language and must
//! answer with strict JSON:
//!
//! ```json
//! { "original_code": "...", "flawed_code": "...",
//!   "bug_locations": [{ "line": 3, "type": "logic" }] }
//! ```
//!
//! Anything else is a hard failure of that round's load; nothing retries.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use itertools::Itertools;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::difficulty::Difficulty;
use crate::resolver::{Points, ScoringRule};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Content load errors.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The provided API key was invalid.
    #[error("invalid API key: {reason}")]
    InvalidApiKey { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error: {message}")]
    Api { message: String },
    /// Reply was not a usable snippet.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unknown difficulty level {0}")]
    UnknownLevel(u8),
    /// The load was dropped before it finished.
    #[error("content load cancelled")]
    Cancelled,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BugType {
    Syntax,
    Logic,
    Security,
    Performance,
}

impl BugType {
    pub const ALL: [BugType; 4] = [
        BugType::Syntax,
        BugType::Logic,
        BugType::Security,
        BugType::Performance,
    ];
}

impl ScoringRule for BugType {
    fn points(&self) -> Points {
        match self {
            BugType::Syntax => Points::new(5, 2),
            BugType::Logic => Points::new(10, 5),
            BugType::Security => Points::new(20, 10),
            BugType::Performance => Points::new(15, 7),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugLocation {
    pub line: u32,
    #[serde(rename = "type")]
    pub bug_type: BugType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSnippet {
    pub id: String,
    pub language: String,
    pub original_code: String,
    pub flawed_code: String,
    pub bug_locations: Vec<BugLocation>,
    pub level: u8,
}

/// One rung of the reviewer ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub value: u8,
    pub label: &'static str,
    pub prompt: &'static str,
    pub languages: &'static [&'static str],
    pub bugs: &'static [BugType],
}

pub const LEVELS: [Level; 5] = [
    Level {
        value: 1,
        label: "Junior (Basic Syntax)",
        prompt: "Generate a simple 10-20 line code snippet with basic syntax errors (missing semicolons, wrong indentation). Include the correct version and list the bug locations with their types.",
        languages: &["python", "javascript"],
        bugs: &[BugType::Syntax],
    },
    Level {
        value: 2,
        label: "Mid-Level (Logic Flaws)",
        prompt: "Generate a 30-50 line code snippet with basic logic flaws (off-by-one errors, unused variables). Include the correct version and list the bug locations with their types.",
        languages: &["python", "javascript", "typescript"],
        bugs: &[BugType::Logic, BugType::Syntax],
    },
    Level {
        value: 3,
        label: "Senior (Security Issues)",
        prompt: "Generate a 50-80 line code snippet with security issues (SQL injection, hardcoded secrets). Include the correct version and list the bug locations with their types.",
        languages: &["python", "javascript", "typescript", "java"],
        bugs: &[BugType::Security, BugType::Logic],
    },
    Level {
        value: 4,
        label: "Staff (Concurrency)",
        prompt: "Generate a 100+ line code snippet with concurrency issues (race conditions, deadlocks). Include the correct version and list the bug locations with their types.",
        languages: &["python", "javascript", "typescript", "java", "go"],
        bugs: &[BugType::Performance, BugType::Security],
    },
    Level {
        value: 5,
        label: "Principal (Architecture)",
        prompt: "Generate a 200+ line mini-project with architectural issues (circular dependencies, interface violations). Include the correct version and list the bug locations with their types.",
        languages: &["python", "javascript", "typescript", "java", "go"],
        bugs: &[BugType::Performance, BugType::Security, BugType::Logic],
    },
];

pub fn find_level(value: u8) -> Option<&'static Level> {
    LEVELS.iter().find(|l| l.value == value)
}

/// Level used for a game difficulty
pub fn level_for(difficulty: Difficulty) -> u8 {
    difficulty.select(1, 3, 5)
}

pub fn languages_for(value: u8) -> &'static [&'static str] {
    find_level(value).map_or(&["python"], |l| l.languages)
}

pub fn build_prompt(value: u8, language: &str) -> Result<String, ContentError> {
    let template = find_level(value).ok_or(ContentError::UnknownLevel(value))?;
    let mut lines = Vec::new();
    lines.push(format!(
        "Generate a code snippet in {language} with intentional bugs based on this difficulty level:"
    ));
    lines.push(template.prompt.to_string());
    lines.push(String::new());
    lines.push("IMPORTANT: Your response must be valid JSON in exactly this format:".to_string());
    let bug_types = BugType::ALL.iter().map(|b| format!("\"{b}\"")).join(" | ");
    lines.push(format!(
        r#"{{"original_code": "code without bugs", "flawed_code": "code with intentional bugs", "bug_locations": [{{"line": number, "type": {bug_types}}}]}}"#
    ));
    lines.push("Make sure to:".to_string());
    lines.push("1. Escape all special characters in the code strings".to_string());
    lines.push("2. Use double quotes for JSON properties".to_string());
    lines.push("3. Format the response as a single, valid JSON object".to_string());
    lines.push("4. Include line numbers starting from 1".to_string());
    lines.push("5. Only use the bug types listed above".to_string());
    Ok(lines.join("\n"))
}

/// Strip a Markdown code fence the model may wrap its JSON in
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Parse and validate a model reply into a snippet
pub fn parse_snippet(text: &str, value: u8, language: &str) -> Result<CodeSnippet, ContentError> {
    #[derive(Deserialize)]
    struct Payload {
        original_code: String,
        flawed_code: String,
        bug_locations: Vec<BugLocation>,
    }

    let payload: Payload = serde_json::from_str(strip_fences(text))
        .map_err(|err| ContentError::InvalidResponse(err.to_string()))?;

    if payload.original_code.trim().is_empty() || payload.flawed_code.trim().is_empty() {
        return Err(ContentError::InvalidResponse(
            "missing code in response".to_string(),
        ));
    }
    if payload.bug_locations.is_empty() {
        return Err(ContentError::InvalidResponse(
            "no bug locations in response".to_string(),
        ));
    }
    let line_count = payload.flawed_code.lines().count() as u32;
    if let Some(bad) = payload
        .bug_locations
        .iter()
        .find(|b| b.line == 0 || b.line > line_count)
    {
        return Err(ContentError::InvalidResponse(format!(
            "bug line {} outside 1..={line_count}",
            bad.line
        )));
    }

    // one bug per line; the first listed wins
    let reported = payload.bug_locations.len();
    let bug_locations: Vec<_> = payload
        .bug_locations
        .into_iter()
        .unique_by(|b| b.line)
        .collect();
    if bug_locations.len() < reported {
        tracing::debug!(
            reported,
            kept = bug_locations.len(),
            "dropped bugs sharing a line"
        );
    }

    Ok(CodeSnippet {
        id: snippet_id(),
        language: language.to_string(),
        original_code: payload.original_code,
        flawed_code: payload.flawed_code,
        bug_locations,
        level: value,
    })
}

fn snippet_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// Anything that can produce a snippet for a level and language
pub trait SnippetSource {
    fn generate(
        &self,
        level: u8,
        language: &str,
    ) -> impl Future<Output = Result<CodeSnippet, ContentError>> + Send;
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a new client with the given API key and model.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or whitespace-only, or if
    /// the HTTP client fails to build.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ContentError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ContentError::InvalidApiKey {
                reason: "API key cannot be empty",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(ContentError::ClientBuild)?;

        Ok(Self {
            http,
            api_key,
            model: model.into(),
        })
    }

    /// Client configured from [`crate::config::Config`]
    pub fn from_config(config: &crate::config::Config) -> Result<Self, ContentError> {
        let key = config.api_key().ok_or(ContentError::InvalidApiKey {
            reason: "API key environment variable is not set",
        })?;
        Self::new(key, config.content_model.clone())
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

fn extract_text(response: GenerateResponse) -> Result<String, ContentError> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .map(|c| {
            c.content
                .parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ContentError::InvalidResponse(
            "missing text content".to_string(),
        ));
    }
    Ok(text)
}

fn parse_api_error(body: &str) -> Option<ContentError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| ContentError::Api {
            message: payload.error.message,
        })
}

impl SnippetSource for GeminiClient {
    async fn generate(&self, level: u8, language: &str) -> Result<CodeSnippet, ContentError> {
        let prompt = build_prompt(level, language)?;
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(format!("{GEMINI_API_BASE}/{}:generateContent", self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_api_error(&body).unwrap_or_else(|| ContentError::Api {
                message: format!("status {status}: {body}"),
            }));
        }

        let payload: GenerateResponse = serde_json::from_str(&body)
            .map_err(|err| ContentError::InvalidResponse(err.to_string()))?;
        let text = extract_text(payload)?;
        parse_snippet(&text, level, language).map_err(|err| {
            tracing::warn!(%err, level, language, "unusable snippet reply");
            err
        })
    }
}

/// Source that answers every request with the same canned reply
#[derive(Debug, Clone)]
pub struct FixedSnippetSource {
    reply: String,
}

impl FixedSnippetSource {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl SnippetSource for FixedSnippetSource {
    async fn generate(&self, level: u8, language: &str) -> Result<CodeSnippet, ContentError> {
        if find_level(level).is_none() {
            return Err(ContentError::UnknownLevel(level));
        }
        parse_snippet(&self.reply, level, language)
    }
}

/// In-flight snippet request. Dropping it aborts the request, so a load
/// never outlives the screen that asked for it.
#[derive(Debug)]
pub struct PendingSnippet {
    handle: Option<JoinHandle<Result<CodeSnippet, ContentError>>>,
}

impl PendingSnippet {
    pub fn spawn<S>(source: Arc<S>, level: u8, language: impl Into<String>) -> Self
    where
        S: SnippetSource + Send + Sync + 'static,
    {
        let language = language.into();
        let handle = tokio::spawn(async move { source.generate(level, &language).await });
        Self {
            handle: Some(handle),
        }
    }

    pub async fn wait(mut self) -> Result<CodeSnippet, ContentError> {
        let Some(handle) = self.handle.take() else {
            return Err(ContentError::Cancelled);
        };
        match handle.await {
            Ok(result) => result,
            Err(err) => {
                tracing::debug!(%err, "snippet task did not complete");
                Err(ContentError::Cancelled)
            }
        }
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for PendingSnippet {
    fn drop(&mut self) {
        self.cancel();
    }
}
