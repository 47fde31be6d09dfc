use crate::error::ConfigError;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Tool server launched when no server is given on the command line
pub const DEMO_SERVER_COMMAND: &str = "uvx mcp-server-time --local-timezone=Asia/Shanghai";

/// Settings for a single evaluation run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// OpenAI-compatible API endpoint
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,
    /// Environment variable name containing the API key
    #[serde(default = "default_env_var_api_key")]
    pub env_var_api_key: String,
    /// Model driving every agent in the run
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum model round-trips per agent before giving up
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Directory that receives report artifacts
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Directory holding `template_{mode}.html`
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,
    /// Environment passed to stdio tool servers
    #[serde(default = "default_stdio_env")]
    pub stdio_env: BTreeMap<String, String>,
}

fn default_api_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_env_var_api_key() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_steps() -> usize {
    20
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_stdio_env() -> BTreeMap<String, String> {
    BTreeMap::from([("UV_PYTHON".to_string(), "3.12".to_string())])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_endpoint: default_api_endpoint(),
            env_var_api_key: default_env_var_api_key(),
            model: default_model(),
            temperature: default_temperature(),
            max_steps: default_max_steps(),
            output_dir: default_output_dir(),
            template_dir: default_template_dir(),
            stdio_env: default_stdio_env(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }

    /// Read the API key, failing before any network activity when it is absent
    pub fn api_key(&self) -> Result<String, ConfigError> {
        match std::env::var(&self.env_var_api_key) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingCredential(self.env_var_api_key.clone())),
        }
    }
}

/// Transport used to reach the tool server
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServerType {
    Stdio,
    Sse,
}

impl ServerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerType::Stdio => "stdio",
            ServerType::Sse => "sse",
        }
    }
}

/// How to reach the tool server
#[derive(Debug, Clone, PartialEq)]
pub enum ServerParameters {
    /// Local subprocess speaking over standard I/O
    Stdio {
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
    },
    /// Remote server-sent-events endpoint
    Sse { url: String },
}

impl ServerParameters {
    /// Resolve command-line server options into connection parameters.
    ///
    /// With neither option the demo time server is used.
    pub fn resolve(
        server_type: Option<ServerType>,
        server_params: Option<&str>,
        stdio_env: &BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let (server_type, server_params) = match (server_type, server_params) {
            (None, None) => {
                warn!(
                    command = DEMO_SERVER_COMMAND,
                    "No server type specified. Using the time server (stdio) for demo."
                );
                (ServerType::Stdio, DEMO_SERVER_COMMAND)
            }
            (None, Some(params)) => (ServerType::Stdio, params),
            (Some(kind), None) => {
                return Err(ConfigError::MissingServerParams(kind.as_str().to_string()));
            }
            (Some(kind), Some(params)) => (kind, params),
        };

        match server_type {
            ServerType::Stdio => {
                let mut parts = server_params.split_whitespace().map(str::to_string);
                let command = parts.next().ok_or(ConfigError::EmptyCommand)?;
                Ok(ServerParameters::Stdio {
                    command,
                    args: parts.collect(),
                    env: stdio_env.clone(),
                })
            }
            ServerType::Sse => {
                let url = server_params.trim();
                if url.is_empty() {
                    return Err(ConfigError::EmptyUrl);
                }
                Ok(ServerParameters::Sse {
                    url: url.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_parsing() {
        let toml_content = r#"
api_endpoint = "https://example.test/v1"
env_var_api_key = "EVAL_API_KEY"
model = "gpt-4.1"
temperature = 0.5
max_steps = 8
output_dir = "reports"
template_dir = "/srv/templates"

[stdio_env]
UV_PYTHON = "3.11"
TZ = "UTC"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();
        assert_eq!(config.api_endpoint, "https://example.test/v1");
        assert_eq!(config.env_var_api_key, "EVAL_API_KEY");
        assert_eq!(config.model, "gpt-4.1");
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.max_steps, 8);
        assert_eq!(config.output_dir, PathBuf::from("reports"));
        assert_eq!(config.template_dir, PathBuf::from("/srv/templates"));
        assert_eq!(config.stdio_env.len(), 2);
        assert_eq!(config.stdio_env["TZ"], "UTC");
    }

    #[test]
    fn test_config_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "model = \"gpt-4o-mini\"").unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.api_endpoint, "https://api.openai.com/v1");
        assert_eq!(config.env_var_api_key, "OPENAI_API_KEY");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_steps, 20);
        assert_eq!(config.template_dir, PathBuf::from("templates"));
        assert_eq!(config.stdio_env["UV_PYTHON"], "3.12");
    }

    #[test]
    fn test_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "max_steps = \"many\"").unwrap();

        let error = Config::from_file(temp_file.path()).unwrap_err();
        assert!(error.to_string().contains("Failed to parse TOML config"));
    }

    #[test]
    fn test_config_missing_file() {
        let error = Config::from_file(Path::new("/nonexistent/eval.toml")).unwrap_err();
        assert!(error.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_missing_api_key() {
        let config = Config {
            env_var_api_key: "AGENT_EVAL_TEST_UNSET_KEY".to_string(),
            ..Config::default()
        };
        unsafe {
            std::env::remove_var(&config.env_var_api_key);
        }

        let error = config.api_key().unwrap_err();
        assert!(matches!(error, ConfigError::MissingCredential(ref name) if name == "AGENT_EVAL_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_present_api_key() {
        let config = Config {
            env_var_api_key: "AGENT_EVAL_TEST_SET_KEY".to_string(),
            ..Config::default()
        };
        unsafe {
            std::env::set_var(&config.env_var_api_key, "sk-test");
        }

        assert_eq!(config.api_key().unwrap(), "sk-test");
    }

    #[test]
    fn test_resolve_stdio() {
        let params = ServerParameters::resolve(
            Some(ServerType::Stdio),
            Some("uvx mcp-server-time --local-timezone=UTC"),
            &default_stdio_env(),
        )
        .unwrap();

        assert_eq!(
            params,
            ServerParameters::Stdio {
                command: "uvx".to_string(),
                args: vec![
                    "mcp-server-time".to_string(),
                    "--local-timezone=UTC".to_string()
                ],
                env: default_stdio_env(),
            }
        );
    }

    #[test]
    fn test_resolve_sse() {
        let params =
            ServerParameters::resolve(Some(ServerType::Sse), Some(" http://localhost:8000/sse "), &BTreeMap::new())
                .unwrap();
        assert_eq!(
            params,
            ServerParameters::Sse {
                url: "http://localhost:8000/sse".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_demo_default() {
        let params = ServerParameters::resolve(None, None, &default_stdio_env()).unwrap();
        match params {
            ServerParameters::Stdio { command, args, .. } => {
                assert_eq!(command, "uvx");
                assert_eq!(args[0], "mcp-server-time");
            }
            other => panic!("expected stdio demo server, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_rejects_missing_or_empty_params() {
        let missing = ServerParameters::resolve(Some(ServerType::Sse), None, &BTreeMap::new());
        assert!(matches!(missing, Err(ConfigError::MissingServerParams(ref kind)) if kind == "sse"));

        let empty_command = ServerParameters::resolve(Some(ServerType::Stdio), Some("   "), &BTreeMap::new());
        assert!(matches!(empty_command, Err(ConfigError::EmptyCommand)));

        let empty_url = ServerParameters::resolve(Some(ServerType::Sse), Some(""), &BTreeMap::new());
        assert!(matches!(empty_url, Err(ConfigError::EmptyUrl)));
    }
}
