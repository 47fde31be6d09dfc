use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Which report contract a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Introspection,
    Interview,
}

/// A tool-backed ability reported by an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    /// Capability name
    pub name: String,
    /// Detailed capability description
    pub description: String,
}

/// Capability as judged by an interviewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCapability {
    #[serde(flatten)]
    pub capability: Capability,
    /// Interviewer belief in the claim (0.0 to 1.0), not ground truth
    pub confidence: f64,
}

/// One interview exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Position of the exchange, unique within a report
    pub id: i64,
    /// Question asked by the interviewer
    pub question: String,
    /// Answer provided by the candidate
    pub answer: String,
}

/// A named yardstick defined once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetric {
    pub name: String,
    pub description: String,
}

/// Outcome of a probe, either free text or whatever structure the tool returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutionResult {
    Text(String),
    Structured(Map<String, Value>),
}

/// One probe executed against the candidate's tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationTask {
    pub id: i64,
    pub description: String,
    pub execution_result: ExecutionResult,
    /// Wall-clock seconds, never negative
    pub execution_time: f64,
}

/// Report produced when an agent evaluates its own tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrospectionReport {
    pub capability_overview: String,
    pub capability_list: Vec<Capability>,
    pub evaluation_metrics: Vec<EvaluationMetric>,
    pub evaluation_tasks: Vec<EvaluationTask>,
    /// Metric name to score (0.0 to 1.0)
    pub final_metric_scores: BTreeMap<String, f64>,
}

/// Report produced when an interviewer evaluates a candidate agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewReport {
    pub candidate_overview: String,
    pub declared_capabilities: Vec<ScoredCapability>,
    pub verified_capabilities: Vec<ScoredCapability>,
    pub questions_and_answers: Vec<Question>,
    pub overall_assessment: String,
    /// Capability name to score (0.0 to 1.0)
    pub capability_scores: BTreeMap<String, f64>,
}

/// A validated report of either variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Report {
    Introspection(IntrospectionReport),
    Interview(InterviewReport),
}

impl Report {
    pub fn kind(&self) -> ReportKind {
        match self {
            Report::Introspection(_) => ReportKind::Introspection,
            Report::Interview(_) => ReportKind::Interview,
        }
    }

    /// The final score mapping of the report
    pub fn scores(&self) -> &BTreeMap<String, f64> {
        match self {
            Report::Introspection(report) => &report.final_metric_scores,
            Report::Interview(report) => &report.capability_scores,
        }
    }

    /// Names the score keys are expected to refer to
    pub fn scored_names(&self) -> Vec<&str> {
        match self {
            Report::Introspection(report) => report
                .evaluation_metrics
                .iter()
                .map(|metric| metric.name.as_str())
                .collect(),
            Report::Interview(report) => report
                .declared_capabilities
                .iter()
                .chain(report.verified_capabilities.iter())
                .map(|scored| scored.capability.name.as_str())
                .collect(),
        }
    }

    /// Score keys that match no declared metric or capability name
    pub fn unmatched_score_keys(&self) -> Vec<&str> {
        let names = self.scored_names();
        self.scores()
            .keys()
            .map(String::as_str)
            .filter(|key| !names.contains(key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_interview_report() -> InterviewReport {
        let time_capability = ScoredCapability {
            capability: Capability {
                name: "get_current_time".to_string(),
                description: "Returns the current time in a timezone".to_string(),
            },
            confidence: 0.9,
        };

        let mut capability_scores = BTreeMap::new();
        capability_scores.insert("get_current_time".to_string(), 0.85);
        capability_scores.insert("weather_lookup".to_string(), 0.1);

        InterviewReport {
            candidate_overview: "A time-zone specialist".to_string(),
            declared_capabilities: vec![time_capability.clone()],
            verified_capabilities: vec![time_capability],
            questions_and_answers: vec![Question {
                id: 1,
                question: "What can you do?".to_string(),
                answer: "I can tell the time.".to_string(),
            }],
            overall_assessment: "Reliable".to_string(),
            capability_scores,
        }
    }

    #[test]
    fn test_scored_capability_serializes_flat() {
        let report = create_interview_report();
        let value = serde_json::to_value(&report.declared_capabilities[0]).unwrap();

        assert_eq!(
            value,
            json!({
                "name": "get_current_time",
                "description": "Returns the current time in a timezone",
                "confidence": 0.9
            })
        );
    }

    #[test]
    fn test_report_field_order_follows_declaration() {
        let report = Report::Interview(create_interview_report());
        let json = serde_json::to_string(&report).unwrap();

        let overview = json.find("candidate_overview").unwrap();
        let declared = json.find("declared_capabilities").unwrap();
        let scores = json.find("capability_scores").unwrap();
        assert!(overview < declared);
        assert!(declared < scores);
    }

    #[test]
    fn test_execution_result_accepts_text_or_mapping() {
        let text: ExecutionResult = serde_json::from_value(json!("14:02 UTC")).unwrap();
        assert_eq!(text, ExecutionResult::Text("14:02 UTC".to_string()));

        let structured: ExecutionResult =
            serde_json::from_value(json!({"timezone": "UTC", "is_dst": false})).unwrap();
        match structured {
            ExecutionResult::Structured(map) => assert_eq!(map["timezone"], "UTC"),
            other => panic!("expected structured result, got {:?}", other),
        }
    }

    #[test]
    fn test_unmatched_score_keys() {
        let report = Report::Interview(create_interview_report());
        assert_eq!(report.kind(), ReportKind::Interview);
        assert_eq!(report.unmatched_score_keys(), vec!["weather_lookup"]);
    }

    #[test]
    fn test_introspection_scores_match_metrics() {
        let mut final_metric_scores = BTreeMap::new();
        final_metric_scores.insert("accuracy".to_string(), 0.8);

        let report = Report::Introspection(IntrospectionReport {
            capability_overview: "Time tools".to_string(),
            capability_list: vec![],
            evaluation_metrics: vec![EvaluationMetric {
                name: "accuracy".to_string(),
                description: "Correct answers".to_string(),
            }],
            evaluation_tasks: vec![],
            final_metric_scores,
        });

        assert_eq!(report.scores().len(), 1);
        assert!(report.unmatched_score_keys().is_empty());
    }
}
