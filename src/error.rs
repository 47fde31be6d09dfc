use std::fmt;

/// Problems detected before any agent or network activity
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    MissingCredential(String),

    #[error("no command specified for stdio server")]
    EmptyCommand,

    #[error("no URL specified for SSE server")]
    EmptyUrl,

    #[error("--server-params is required when --server-type is '{0}'")]
    MissingServerParams(String),
}

/// Tool server could not be reached or initialised
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("failed to spawn tool server '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to tool server at {url}: {reason}")]
    Endpoint { url: String, reason: String },

    #[error("tool server handshake failed: {0}")]
    Handshake(String),

    #[error("failed to list tools: {0}")]
    ListTools(String),
}

/// Failures raised by a reasoning agent or its collaborators
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("model request failed: {0}")]
    Model(String),

    #[error("tool '{name}' failed: {reason}")]
    Tool { name: String, reason: String },

    #[error("agent '{agent}' reached {max_steps} steps without a final answer")]
    StepLimit { agent: String, max_steps: usize },
}

/// A single field-level constraint violation
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    /// Dotted path to the offending value, e.g. `capability_scores.list_timezones`
    pub path: String,
    /// Constraint the value had to satisfy
    pub expected: String,
    /// Compact rendering of the value found, or `missing`
    pub actual: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, got {}", self.path, self.expected, self.actual)
    }
}

/// Every violation found while checking a report against its schema
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "report failed schema validation with {} violation(s){}",
    .violations.len(),
    list_violations(.violations)
)]
pub struct SchemaValidationError {
    pub violations: Vec<FieldViolation>,
}

#[cfg(test)]
impl SchemaValidationError {
    pub fn violation_at(&self, path: &str) -> Option<&FieldViolation> {
        self.violations.iter().find(|violation| violation.path == path)
    }
}

fn list_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|violation| format!("\n  - {}", violation))
        .collect()
}

/// Why a raw agent result could not become a report
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Output is not a JSON document at all; retrying the agent may help
    #[error("agent output is not a JSON report: {0}")]
    Format(String),

    /// Output is JSON but breaks the report contract
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),
}
