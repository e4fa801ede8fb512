//! Structured analysis returned by the model, and the view rendered from it
//!
//! Every field the model is asked for is optional on the way in. Defaults are
//! applied once, when building [`AnalysisView`].

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ParseFailure;

pub const SCRIPT_FILENAME: &str = "fix.py";

/// Bug severity, 1 (most severe) to 5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical = 1,
    High = 2,
    Medium = 3,
    Low = 4,
    Info = 5,
}

impl Severity {
    /// Map a level to a severity. Missing or out-of-range levels are Medium.
    pub fn from_level(level: Option<i64>) -> Self {
        match level {
            Some(1) => Self::Critical,
            Some(2) => Self::High,
            Some(4) => Self::Low,
            Some(5) => Self::Info,
            _ => Self::Medium,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Info => "Info",
        }
    }
}

/// Bug report fields as returned by the model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BugReport {
    pub title: Option<String>,
    pub description: Option<String>,
    pub severity: Option<i64>,
    pub category: Option<String>,
}

/// Model output with every recognised key optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedAnalysis {
    pub analysis_summary: Option<String>,
    pub suggested_steps: Vec<String>,
    pub script_required: bool,
    pub python_script: Option<String>,
    /// `None` when the model sent no report or an empty object
    pub bug_report: Option<BugReport>,
}

impl ParsedAnalysis {
    /// Read the recognised keys from an extracted value.
    ///
    /// Non-object values are rejected; wrongly-typed fields are treated as absent.
    pub fn from_value(value: Value) -> Result<Self, ParseFailure> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(ParseFailure::new(format!(
                    "expected a JSON object, got {}",
                    json_type(&other)
                )))
            }
        };

        let suggested_steps = match map.get("suggested_steps") {
            Some(Value::Array(items)) => items.iter().map(step_text).collect(),
            _ => Vec::new(),
        };

        let bug_report = match map.get("bug_report") {
            Some(Value::Object(report)) if !report.is_empty() => Some(BugReport {
                title: string_field(report, "title"),
                description: string_field(report, "description"),
                severity: report.get("severity").and_then(severity_level),
                category: string_field(report, "category"),
            }),
            _ => None,
        };

        Ok(Self {
            analysis_summary: string_field(&map, "analysis_summary"),
            suggested_steps,
            script_required: map
                .get("script_required")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            python_script: string_field(&map, "python_script"),
            bug_report,
        })
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn step_text(step: &Value) -> String {
    match step {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Models sometimes send the level as `2`, `2.0` or `"2"`.
fn severity_level(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Bug report card with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BugReportCard {
    pub title: String,
    pub category: String,
    pub description: String,
    pub severity: Severity,
    pub severity_level: u8,
    pub severity_label: &'static str,
}

/// Downloadable fix script
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptArtifact {
    pub filename: &'static str,
    pub content: String,
}

/// What the dashboard renders for one analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisView {
    pub summary: String,
    pub steps: Vec<String>,
    pub bug_report: Option<BugReportCard>,
    pub script: Option<ScriptArtifact>,
}

impl From<&ParsedAnalysis> for AnalysisView {
    fn from(analysis: &ParsedAnalysis) -> Self {
        let bug_report = analysis.bug_report.as_ref().map(|report| {
            let severity = Severity::from_level(report.severity);
            BugReportCard {
                title: report.title.clone().unwrap_or_else(|| "Untitled".into()),
                category: report.category.clone().unwrap_or_else(|| "General".into()),
                description: report
                    .description
                    .clone()
                    .unwrap_or_else(|| "No description.".into()),
                severity,
                severity_level: severity.level(),
                severity_label: severity.label(),
            }
        });

        let script = match &analysis.python_script {
            Some(content) if analysis.script_required && !content.is_empty() => {
                Some(ScriptArtifact {
                    filename: SCRIPT_FILENAME,
                    content: content.clone(),
                })
            }
            _ => None,
        };

        Self {
            summary: analysis
                .analysis_summary
                .clone()
                .unwrap_or_else(|| "No summary returned.".into()),
            steps: analysis.suggested_steps.clone(),
            bug_report,
            script,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_severity_mapping() {
        assert_eq!(Severity::from_level(Some(1)).label(), "Critical");
        assert_eq!(Severity::from_level(Some(2)).label(), "High");
        assert_eq!(Severity::from_level(Some(3)).label(), "Medium");
        assert_eq!(Severity::from_level(Some(4)).label(), "Low");
        assert_eq!(Severity::from_level(Some(5)).label(), "Info");
    }

    #[test]
    fn test_severity_defaults_to_medium() {
        assert_eq!(Severity::from_level(None), Severity::Medium);
        assert_eq!(Severity::from_level(Some(0)), Severity::Medium);
        assert_eq!(Severity::from_level(Some(9)), Severity::Medium);
        assert_eq!(Severity::from_level(Some(-1)).level(), 3);
    }

    #[test]
    fn test_full_analysis() {
        let value = json!({
            "analysis_summary": "estimateGas reverts because the contract is paused",
            "suggested_steps": ["Check paused()", "Unpause from the owner account"],
            "script_required": true,
            "python_script": "print('unpause')",
            "bug_report": {
                "title": "estimateGas -32000 on paused contract",
                "description": "Calls revert while paused.",
                "severity": 2,
                "category": "API Error"
            }
        });
        let analysis = ParsedAnalysis::from_value(value).unwrap();
        let view = AnalysisView::from(&analysis);

        assert_eq!(
            view.summary,
            "estimateGas reverts because the contract is paused"
        );
        assert_eq!(view.steps.len(), 2);
        let card = view.bug_report.unwrap();
        assert_eq!(card.severity, Severity::High);
        assert_eq!(card.severity_label, "High");
        assert_eq!(card.category, "API Error");
        let script = view.script.unwrap();
        assert_eq!(script.filename, "fix.py");
        assert_eq!(script.content, "print('unpause')");
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let analysis = ParsedAnalysis::from_value(json!({})).unwrap();
        let view = AnalysisView::from(&analysis);
        assert_eq!(view.summary, "No summary returned.");
        assert!(view.steps.is_empty());
        assert!(view.bug_report.is_none());
        assert!(view.script.is_none());
    }

    #[test]
    fn test_bug_report_defaults() {
        let analysis = ParsedAnalysis::from_value(json!({
            "bug_report": {"severity": "Integer 1-5 (1=Critical, 5=Minor)"}
        }))
        .unwrap();
        let card = AnalysisView::from(&analysis).bug_report.unwrap();
        assert_eq!(card.title, "Untitled");
        assert_eq!(card.category, "General");
        assert_eq!(card.description, "No description.");
        assert_eq!(card.severity, Severity::Medium);
    }

    #[test]
    fn test_empty_bug_report_is_hidden() {
        let analysis = ParsedAnalysis::from_value(json!({"bug_report": {}})).unwrap();
        assert!(analysis.bug_report.is_none());
    }

    #[test]
    fn test_lenient_severity() {
        for (raw, expected) in [
            (json!(1), Severity::Critical),
            (json!(4.0), Severity::Low),
            (json!(" 5 "), Severity::Info),
            (json!(2.5), Severity::Medium),
            (json!(null), Severity::Medium),
        ] {
            let analysis =
                ParsedAnalysis::from_value(json!({"bug_report": {"severity": raw}})).unwrap();
            let card = AnalysisView::from(&analysis).bug_report.unwrap();
            assert_eq!(card.severity, expected);
        }
    }

    #[test]
    fn test_script_needs_flag_and_content() {
        let flag_only =
            ParsedAnalysis::from_value(json!({"script_required": true, "python_script": null}))
                .unwrap();
        assert!(AnalysisView::from(&flag_only).script.is_none());

        let empty_script =
            ParsedAnalysis::from_value(json!({"script_required": true, "python_script": ""}))
                .unwrap();
        assert!(AnalysisView::from(&empty_script).script.is_none());

        let not_required = ParsedAnalysis::from_value(
            json!({"script_required": false, "python_script": "print(1)"}),
        )
        .unwrap();
        assert!(AnalysisView::from(&not_required).script.is_none());
    }

    #[test]
    fn test_wrongly_typed_fields_are_absent() {
        let analysis = ParsedAnalysis::from_value(json!({
            "analysis_summary": 7,
            "suggested_steps": "restart the node",
            "script_required": "yes",
            "bug_report": ["not", "an", "object"]
        }))
        .unwrap();
        assert_eq!(analysis, ParsedAnalysis::default());
    }

    #[test]
    fn test_non_string_steps_kept_as_json_text() {
        let analysis =
            ParsedAnalysis::from_value(json!({"suggested_steps": ["Restart", 2, {"cmd": "ls"}]}))
                .unwrap();
        assert_eq!(
            analysis.suggested_steps,
            vec!["Restart".to_string(), "2".to_string(), r#"{"cmd":"ls"}"#.to_string()]
        );
    }

    #[test]
    fn test_non_object_rejected() {
        let err = ParsedAnalysis::from_value(json!([1, 2])).unwrap_err();
        assert!(err.reason.contains("an array"));
    }
}
