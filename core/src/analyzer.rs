//! Issue analyzer: prompt construction, the chat-completion call, and extraction

use tracing::{debug, info, warn};

use crate::analysis::ParsedAnalysis;
use crate::error::AnalyzeError;
use crate::extractor::extract_json;
use crate::openai::OpenAiClient;

/// Log text beyond this many characters is dropped before sending
pub const DEFAULT_MAX_LOG_CHARS: usize = 5000;

pub const SYSTEM_PROMPT: &str = r#"You are a Senior Blockchain Support Engineer.
Analyze the technical issue and logs provided by the user.

Output a STRICT JSON object with this schema:
{
    "analysis_summary": "Technical root cause explanation.",
    "suggested_steps": ["Step 1", "Step 2", "Step 3"],
    "script_required": boolean,
    "python_script": "Full Python script code if needed, else null.",
    "bug_report": {
        "title": "Concise Bug Title",
        "description": "Formal description for the ticket.",
        "severity": "Integer 1-5 (1=Critical, 5=Minor)",
        "category": "Category String (e.g., API Error, Latency)"
    }
}"#;

/// First `max_chars` characters of `text`, never splitting a character
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// User message: description and (truncated) logs in labelled sections
pub fn build_user_content(description: &str, logs: &str, max_log_chars: usize) -> String {
    let logs = truncate_chars(logs, max_log_chars);
    format!("[ISSUE DESCRIPTION]\n{description}\n\n[LOGS]\n{logs}\n")
}

/// Sends an issue to the model and returns the parsed analysis
pub struct IssueAnalyzer {
    client: OpenAiClient,
    max_log_chars: usize,
}

impl IssueAnalyzer {
    pub fn new(client: OpenAiClient) -> Self {
        Self {
            client,
            max_log_chars: DEFAULT_MAX_LOG_CHARS,
        }
    }

    pub fn with_max_log_chars(mut self, max_log_chars: usize) -> Self {
        self.max_log_chars = max_log_chars;
        self
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    pub async fn analyze(
        &self,
        description: &str,
        logs: &str,
    ) -> Result<ParsedAnalysis, AnalyzeError> {
        if !self.client.is_available() {
            return Err(AnalyzeError::MissingApiKey);
        }
        if description.is_empty() && logs.is_empty() {
            return Err(AnalyzeError::EmptyInput);
        }

        let log_chars = logs.chars().count();
        if log_chars > self.max_log_chars {
            debug!(
                "Truncating logs from {log_chars} to {} characters",
                self.max_log_chars
            );
        }
        let user_content = build_user_content(description, logs, self.max_log_chars);

        info!(
            "Analysing issue: {} description chars, {} log chars, model={}",
            description.chars().count(),
            log_chars.min(self.max_log_chars),
            self.client.model_name()
        );

        let completion = self
            .client
            .complete(SYSTEM_PROMPT, &user_content)
            .await
            .map_err(|e| {
                warn!("Chat completion failed: {e}");
                e
            })?;

        let value = extract_json(&completion.text).map_err(|e| {
            warn!("Model output not parseable: {}", e.reason);
            e
        })?;
        let analysis = ParsedAnalysis::from_value(value)?;

        info!(
            "Analysis complete in {}ms: {} steps, script={}",
            completion.latency_ms,
            analysis.suggested_steps.len(),
            analysis.script_required
        );
        Ok(analysis)
    }
}
