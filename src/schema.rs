//! Data-shape descriptions of the two report contracts.
//!
//! A [`ReportSchema`] is plain data: the prompt synthesizer renders it as a
//! JSON Schema for the agent, and the validator walks it to check raw output.

use crate::models::ReportKind;
use serde_json::{Map, Value, json};

/// Inclusive numeric bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bounds {
    pub const NON_NEGATIVE: Bounds = Bounds {
        min: Some(0.0),
        max: None,
    };
    pub const UNIT: Bounds = Bounds {
        min: Some(0.0),
        max: Some(1.0),
    };

    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }

    /// Human-readable constraint, e.g. `number in [0, 1]`
    pub fn describe(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("number in [{}, {}]", min, max),
            (Some(min), None) => format!("number >= {}", min),
            (None, Some(max)) => format!("number <= {}", max),
            (None, None) => "number".to_string(),
        }
    }

    fn write_json_schema(&self, target: &mut Map<String, Value>) {
        if let Some(min) = self.min {
            target.insert("minimum".to_string(), json!(min));
        }
        if let Some(max) = self.max {
            target.insert("maximum".to_string(), json!(max));
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    String,
    Integer,
    Number(Bounds),
    /// Free text or a JSON object of arbitrary content
    StringOrObject,
    List {
        item: Box<Shape>,
        /// Field whose value must be unique across list items
        unique_by: Option<&'static str>,
    },
    Record {
        title: &'static str,
        fields: Vec<Field>,
    },
    /// Mapping of arbitrary names to bounded numbers
    ScoreMap(Bounds),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub description: &'static str,
    pub shape: Shape,
}

impl Field {
    fn new(name: &'static str, description: &'static str, shape: Shape) -> Self {
        Self {
            name,
            description,
            shape,
        }
    }
}

impl Shape {
    fn list(item: Shape) -> Self {
        Shape::List {
            item: Box::new(item),
            unique_by: None,
        }
    }

    /// Short name of the expected JSON type, used in violation messages
    pub fn expected(&self) -> String {
        match self {
            Shape::String => "string".to_string(),
            Shape::Integer => "integer".to_string(),
            Shape::Number(bounds) => bounds.describe(),
            Shape::StringOrObject => "string or object".to_string(),
            Shape::List { .. } => "array".to_string(),
            Shape::Record { title, .. } => format!("{} object", title),
            Shape::ScoreMap(_) => "object of numbers".to_string(),
        }
    }

    /// Render as a JSON Schema fragment
    pub fn to_json_schema(&self) -> Value {
        match self {
            Shape::String => json!({"type": "string"}),
            Shape::Integer => json!({"type": "integer"}),
            Shape::Number(bounds) => {
                let mut schema = Map::new();
                schema.insert("type".to_string(), json!("number"));
                bounds.write_json_schema(&mut schema);
                Value::Object(schema)
            }
            Shape::StringOrObject => json!({
                "anyOf": [{"type": "string"}, {"type": "object"}]
            }),
            Shape::List { item, .. } => json!({
                "type": "array",
                "items": item.to_json_schema()
            }),
            Shape::Record { title, fields } => {
                let mut properties = Map::new();
                for field in fields {
                    let mut property = match field.shape.to_json_schema() {
                        Value::Object(map) => map,
                        _ => Map::new(),
                    };
                    property.insert("description".to_string(), json!(field.description));
                    properties.insert(field.name.to_string(), Value::Object(property));
                }
                let required: Vec<&str> = fields.iter().map(|field| field.name).collect();

                json!({
                    "title": title,
                    "type": "object",
                    "properties": properties,
                    "required": required
                })
            }
            Shape::ScoreMap(bounds) => {
                let mut values = Map::new();
                values.insert("type".to_string(), json!("number"));
                bounds.write_json_schema(&mut values);
                json!({
                    "type": "object",
                    "additionalProperties": values
                })
            }
        }
    }
}

/// Shape description of one report variant
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSchema {
    pub kind: ReportKind,
    pub root: Shape,
}

impl ReportSchema {
    pub fn for_kind(kind: ReportKind) -> Self {
        let root = match kind {
            ReportKind::Introspection => introspection_shape(),
            ReportKind::Interview => interview_shape(),
        };
        Self { kind, root }
    }

    pub fn to_json_schema(&self) -> Value {
        self.root.to_json_schema()
    }

    /// Name of the score mapping field
    pub fn score_field(&self) -> &'static str {
        match self.kind {
            ReportKind::Introspection => "final_metric_scores",
            ReportKind::Interview => "capability_scores",
        }
    }
}

fn capability_shape() -> Shape {
    Shape::Record {
        title: "Capability",
        fields: vec![
            Field::new("name", "Capability name", Shape::String),
            Field::new(
                "description",
                "Detailed capability description",
                Shape::String,
            ),
        ],
    }
}

fn scored_capability_shape() -> Shape {
    let mut fields = match capability_shape() {
        Shape::Record { fields, .. } => fields,
        _ => Vec::new(),
    };
    fields.push(Field::new(
        "confidence",
        "Confidence score (0-1)",
        Shape::Number(Bounds::UNIT),
    ));
    Shape::Record {
        title: "InterviewCapability",
        fields,
    }
}

fn introspection_shape() -> Shape {
    let metric = Shape::Record {
        title: "EvaluationMetric",
        fields: vec![
            Field::new("name", "Evaluation metric name", Shape::String),
            Field::new(
                "description",
                "Detailed evaluation metric description",
                Shape::String,
            ),
        ],
    };
    let task = Shape::Record {
        title: "EvaluationTask",
        fields: vec![
            Field::new("id", "Task ID", Shape::Integer),
            Field::new("description", "Task description", Shape::String),
            Field::new(
                "execution_result",
                "Execution result",
                Shape::StringOrObject,
            ),
            Field::new(
                "execution_time",
                "Execution time (seconds)",
                Shape::Number(Bounds::NON_NEGATIVE),
            ),
        ],
    };

    Shape::Record {
        title: "IntrospectionReport",
        fields: vec![
            Field::new("capability_overview", "Capability overview", Shape::String),
            Field::new(
                "capability_list",
                "Capability list",
                Shape::list(capability_shape()),
            ),
            Field::new(
                "evaluation_metrics",
                "Evaluation metrics list",
                Shape::list(metric),
            ),
            Field::new(
                "evaluation_tasks",
                "Evaluation tasks list",
                Shape::list(task),
            ),
            Field::new(
                "final_metric_scores",
                "Final metric scores, keys are metric names, values are corresponding scores (0-1)",
                Shape::ScoreMap(Bounds::UNIT),
            ),
        ],
    }
}

fn interview_shape() -> Shape {
    let question = Shape::Record {
        title: "Question",
        fields: vec![
            Field::new("id", "Question ID", Shape::Integer),
            Field::new(
                "question",
                "Question asked by the interviewer",
                Shape::String,
            ),
            Field::new("answer", "Answer provided by the candidate", Shape::String),
        ],
    };

    Shape::Record {
        title: "InterviewReport",
        fields: vec![
            Field::new(
                "candidate_overview",
                "Overview of the candidate's capabilities",
                Shape::String,
            ),
            Field::new(
                "declared_capabilities",
                "Capabilities the candidate claims to have",
                Shape::list(scored_capability_shape()),
            ),
            Field::new(
                "verified_capabilities",
                "Capabilities verified through testing",
                Shape::list(scored_capability_shape()),
            ),
            Field::new(
                "questions_and_answers",
                "Interview questions and answers",
                Shape::List {
                    item: Box::new(question),
                    unique_by: Some("id"),
                },
            ),
            Field::new(
                "overall_assessment",
                "Overall assessment of the candidate",
                Shape::String,
            ),
            Field::new(
                "capability_scores",
                "Capability scores, keys are capability names, values are scores between 0 and 1",
                Shape::ScoreMap(Bounds::UNIT),
            ),
        ],
    }
}
