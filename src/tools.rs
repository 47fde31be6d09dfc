use crate::agent::{ToolSet, ToolSpec};
use crate::config::ServerParameters;
use crate::error::{AgentError, ConnectionError};
use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, Tool};
use rmcp::service::RunningService;
use rmcp::transport::{SseClientTransport, TokioChildProcess};
use rmcp::{RoleClient, ServiceExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Tools served by an MCP server, held open for the duration of a run
pub struct McpToolCollection {
    service: RunningService<RoleClient, ()>,
    specs: Vec<ToolSpec>,
}

impl McpToolCollection {
    /// Start or reach the tool server and discover its tools
    pub async fn connect(params: &ServerParameters) -> Result<Self, ConnectionError> {
        let service = match params {
            ServerParameters::Stdio { command, args, env } => {
                info!(%command, ?args, "starting stdio tool server");
                let mut cmd = Command::new(command);
                cmd.args(args).envs(env);
                let transport = TokioChildProcess::new(cmd).map_err(|source| ConnectionError::Spawn {
                    command: command.clone(),
                    source,
                })?;
                ().serve(transport)
                    .await
                    .map_err(|e| ConnectionError::Handshake(e.to_string()))?
            }
            ServerParameters::Sse { url } => {
                info!(%url, "connecting to SSE tool server");
                let transport = SseClientTransport::start(url.clone())
                    .await
                    .map_err(|e| ConnectionError::Endpoint {
                        url: url.clone(),
                        reason: e.to_string(),
                    })?;
                ().serve(transport)
                    .await
                    .map_err(|e| ConnectionError::Handshake(e.to_string()))?
            }
        };

        let tools = service
            .list_all_tools()
            .await
            .map_err(|e| ConnectionError::ListTools(e.to_string()))?;
        let specs: Vec<ToolSpec> = tools.iter().map(to_spec).collect();
        info!(
            tools = ?specs.iter().map(|spec| spec.name.as_str()).collect::<Vec<_>>(),
            "discovered tools"
        );

        Ok(Self { service, specs })
    }

    /// Shut the session down once no agent holds the collection any more
    pub async fn release(collection: Arc<Self>) {
        match Arc::try_unwrap(collection) {
            Ok(collection) => collection.close().await,
            Err(_) => warn!("tool collection still shared at release; the session ends when the last handle drops"),
        }
    }

    pub async fn close(self) {
        match self.service.cancel().await {
            Ok(reason) => debug!(?reason, "tool server session closed"),
            Err(e) => warn!(error = %e, "tool server session did not shut down cleanly"),
        }
    }
}

#[async_trait]
impl ToolSet for McpToolCollection {
    fn specs(&self) -> Vec<ToolSpec> {
        self.specs.clone()
    }

    async fn call(&self, name: &str, arguments: Value) -> Result<String, AgentError> {
        let arguments = match arguments {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(AgentError::Tool {
                    name: name.to_string(),
                    reason: format!("arguments must be a JSON object, got {}", other),
                });
            }
        };

        let result = self
            .service
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments,
            })
            .await
            .map_err(|e| AgentError::Tool {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        let result = serde_json::to_value(&result).map_err(|e| AgentError::Tool {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        let output = render_tool_output(&result);

        if result.get("isError").and_then(Value::as_bool).unwrap_or(false) {
            return Err(AgentError::Tool {
                name: name.to_string(),
                reason: output,
            });
        }
        Ok(output)
    }
}

fn to_spec(tool: &Tool) -> ToolSpec {
    ToolSpec {
        name: tool.name.to_string(),
        description: tool.description.as_deref().unwrap_or_default().to_string(),
        parameters: Value::Object(tool.input_schema.as_ref().clone()),
    }
}

/// Flatten an MCP tool result into text: text blocks verbatim, other blocks as JSON
fn render_tool_output(result: &Value) -> String {
    let blocks: Vec<String> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|content| {
            content
                .iter()
                .map(|block| match block.get("text").and_then(Value::as_str) {
                    Some(text) => text.to_string(),
                    None => block.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    if !blocks.is_empty() {
        return blocks.join("\n");
    }
    match result.get("structuredContent") {
        Some(structured) if !structured.is_null() => structured.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_text_blocks() {
        let result = json!({
            "content": [
                {"type": "text", "text": "{\"timezone\": \"UTC\"}"},
                {"type": "text", "text": "second"}
            ],
            "isError": false
        });
        assert_eq!(render_tool_output(&result), "{\"timezone\": \"UTC\"}\nsecond");
    }

    #[test]
    fn test_render_non_text_blocks_as_json() {
        let result = json!({
            "content": [{"type": "image", "data": "AAAA", "mimeType": "image/png"}]
        });
        let output = render_tool_output(&result);
        assert!(output.contains("\"mimeType\":\"image/png\""));
    }

    #[test]
    fn test_render_structured_content_fallback() {
        let result = json!({"content": [], "structuredContent": {"time": "12:00"}});
        assert_eq!(render_tool_output(&result), "{\"time\":\"12:00\"}");

        assert_eq!(render_tool_output(&json!({})), "");
    }

    #[tokio::test]
    async fn test_connect_reports_spawn_failure() {
        let params = ServerParameters::Stdio {
            command: "agent-eval-no-such-binary".to_string(),
            args: vec![],
            env: Default::default(),
        };

        match McpToolCollection::connect(&params).await {
            Err(ConnectionError::Spawn { command, .. }) => {
                assert_eq!(command, "agent-eval-no-such-binary")
            }
            Err(other) => panic!("expected spawn failure, got {}", other),
            Ok(_) => panic!("expected spawn failure"),
        }
    }
}
