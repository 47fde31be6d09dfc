//! Instruction text handed to the acting agent of each mode.

use crate::models::ReportKind;
use crate::schema::ReportSchema;

/// Marker replaced by the rendered JSON Schema
pub const SCHEMA_PLACEHOLDER: &str = "{schema}";

pub const INTROSPECTION_TEMPLATE: &str = r#"Create a detailed list describing the capabilities of your tools, leaving out the final_answer tool.
Then identify 6 evaluation metrics for yourself and define each one. The metrics should reflect how well you can perform the capabilities you have declared.

Next, design a set of specific, executable tasks that together cover those capabilities. Choose how many based on the number of tools. Each task must exercise a declared capability so that its execution result lets you derive a quantified value for your metrics.

Work through these sections:

## Capability Overview
Give an overview of the capabilities of your tools.

## Capability List
List each capability of your tools in detail, excluding final_answer.

## Evaluation Metrics
Define 6 evaluation metrics with a definition for each. Every metric is normalized to a value between 0 and 1.

## Evaluation Tasks
Design the tasks, with concrete inputs and expected outputs matching each tool's parameters. Execute them one by one and record the result and the time taken (seconds) for each.

## Final Metric Scores
From the task results, give a score between 0 and 1 for each evaluation metric, keyed by metric name.

When every step is done, call the final_answer tool with the complete report as a JSON object (no Markdown code fences). The object must follow this JSON Schema:

{schema}
"#;

pub const INTERVIEW_TEMPLATE: &str = r#"You are a technical interviewer evaluating an AI agent candidate for a role that needs specific capabilities.
Interview the candidate thoroughly, then evaluate it based on its performance.

Follow this process:

1. Ask the candidate to introduce itself and describe its capabilities.
2. For each capability it claims, ask specific questions to verify it.
3. Give it practical tasks that would demonstrate those capabilities.
4. Evaluate its performance on each capability.

Work through these sections:

## Candidate Overview
Summarise the candidate from its self-description and your assessment.

## Declared Capabilities
List the capabilities the candidate claims, with descriptions and your confidence in each claim (0-1).

## Verified Capabilities
List the capabilities you verified by testing, with descriptions and your confidence after testing (0-1).

## Questions and Answers
Record every question you asked and the candidate's answer, numbered in order starting at 1.

## Overall Assessment
Give your overall assessment, including strengths, weaknesses and suitability.

## Capability Scores
For each capability, give a proficiency score between 0 and 1, keyed by capability name.

When every step is done, call the final_answer tool with the complete evaluation as a JSON object (no Markdown code fences). The object must follow this JSON Schema:

{schema}
"#;

/// Narrative template for a report kind
pub fn template_for(kind: ReportKind) -> &'static str {
    match kind {
        ReportKind::Introspection => INTROSPECTION_TEMPLATE,
        ReportKind::Interview => INTERVIEW_TEMPLATE,
    }
}

/// Embed the schema into the template.
///
/// A template without [`SCHEMA_PLACEHOLDER`] gets the schema appended so the
/// output format is always stated.
pub fn synthesize(template: &str, schema: &ReportSchema) -> String {
    let schema_text = format!("{:#}", schema.to_json_schema());

    if template.contains(SCHEMA_PLACEHOLDER) {
        template.replace(SCHEMA_PLACEHOLDER, &schema_text)
    } else {
        format!("{}\n\n{}\n", template.trim_end(), schema_text)
    }
}

/// Full instruction for a report kind
pub fn instruction_for(kind: ReportKind) -> String {
    synthesize(template_for(kind), &ReportSchema::for_kind(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesize_is_deterministic() {
        let first = instruction_for(ReportKind::Interview);
        let second = instruction_for(ReportKind::Interview);
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_schema_is_embedded_verbatim() {
        let schema = ReportSchema::for_kind(ReportKind::Introspection);
        let prompt = synthesize(INTROSPECTION_TEMPLATE, &schema);

        assert!(!prompt.contains(SCHEMA_PLACEHOLDER));
        assert!(prompt.contains(&format!("{:#}", schema.to_json_schema())));
        assert!(prompt.contains("\"final_metric_scores\""));
        assert!(prompt.contains("6 evaluation metrics"));
    }

    #[test]
    fn test_interview_prompt_mentions_scores() {
        let prompt = instruction_for(ReportKind::Interview);
        assert!(prompt.starts_with("You are a technical interviewer"));
        assert!(prompt.contains("\"capability_scores\""));
        assert!(prompt.contains("\"questions_and_answers\""));
    }

    #[test]
    fn test_template_without_placeholder_gets_schema_appended() {
        let schema = ReportSchema::for_kind(ReportKind::Interview);
        let prompt = synthesize("Evaluate the candidate.\n\n", &schema);

        assert!(prompt.starts_with("Evaluate the candidate.\n\n{"));
        assert!(prompt.ends_with("}\n"));
    }
}
