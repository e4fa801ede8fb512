//! Error types for issue analysis

use thiserror::Error;

/// Model output that could not be turned into structured data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("the response could not be parsed as structured data")]
pub struct ParseFailure {
    /// What went wrong, for logs only
    pub reason: String,
}

impl ParseFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Chat-completion call failed. The message is the upstream error text, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UpstreamError {
    pub message: String,
}

impl UpstreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Everything that stops an analysis request
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("OpenAI API key is missing")]
    MissingApiKey,

    #[error("please provide an issue description or a log file")]
    EmptyInput,

    #[error(transparent)]
    Parse(#[from] ParseFailure),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl AnalyzeError {
    /// Stable identifier used by the HTTP layer
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "configuration",
            Self::EmptyInput => "empty_input",
            Self::Parse(_) => "parse_failure",
            Self::Upstream(_) => "upstream",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failure_message_hides_reason() {
        let err = ParseFailure::new("expected value at line 1 column 1");
        assert_eq!(
            err.to_string(),
            "the response could not be parsed as structured data"
        );
    }

    #[test]
    fn test_upstream_error_is_verbatim() {
        let err = AnalyzeError::from(UpstreamError::new("OpenAI API error 401: invalid key"));
        assert_eq!(err.to_string(), "OpenAI API error 401: invalid key");
        assert_eq!(err.kind(), "upstream");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(AnalyzeError::MissingApiKey.kind(), "configuration");
        assert_eq!(AnalyzeError::EmptyInput.kind(), "empty_input");
        assert_eq!(
            AnalyzeError::from(ParseFailure::new("x")).kind(),
            "parse_failure"
        );
    }
}
