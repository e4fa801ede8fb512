//! NodeGuard core
//!
//! The pieces behind the support dashboard:
//! - [`extractor`]: JSON extraction from model output, with a fenced-block fallback
//! - [`probe`]: JSON-RPC endpoint liveness and latency
//! - [`analyzer`]: prompt + chat-completion call + extraction
//! - [`analysis`]: the parsed result and the view rendered from it

pub mod analysis;
pub mod analyzer;
pub mod error;
pub mod extractor;
pub mod openai;
pub mod probe;

pub use analysis::{AnalysisView, BugReport, BugReportCard, ParsedAnalysis, ScriptArtifact, Severity};
pub use analyzer::IssueAnalyzer;
pub use error::{AnalyzeError, ParseFailure, UpstreamError};
pub use extractor::extract_json;
pub use openai::OpenAiClient;
pub use probe::{EndpointProbe, ProbeResult, RpcTransport};
