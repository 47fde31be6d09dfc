use crate::agent::{ChatModel, Message, ModelTurn, ToolCall, ToolSpec};
use crate::config::Config;
use crate::error::AgentError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    FunctionCall, FunctionObjectArgs,
};
use async_openai::{Client, config::OpenAIConfig, error::OpenAIError};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Chat model served by an OpenAI-compatible endpoint
pub struct OpenAiModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f64,
}

impl OpenAiModel {
    /// Create the client for the configured endpoint
    pub fn new(config: &Config, api_key: String) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&config.api_endpoint);

        Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    /// Build the chat completion request
    fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<CreateChatCompletionRequest, OpenAIError> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>, _>>()?;
        let tools = tools
            .iter()
            .map(to_request_tool)
            .collect::<Result<Vec<_>, _>>()?;

        let mut request = CreateChatCompletionRequestArgs::default();
        request
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature as f32);
        if !tools.is_empty() {
            request.tools(tools);
        }
        request.build()
    }

    /// Extract text and tool calls from the first choice
    fn extract_turn(&self, response: CreateChatCompletionResponse) -> Result<ModelTurn, AgentError> {
        let Some(choice) = response.choices.into_iter().next() else {
            return Err(AgentError::Model("response contained no choices".to_string()));
        };

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: parse_arguments(&call.function.arguments),
            })
            .collect();

        Ok(ModelTurn {
            content: choice.message.content,
            tool_calls,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiModel {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<ModelTurn, AgentError> {
        let request = self
            .build_request(messages, tools)
            .map_err(|e| AgentError::Model(format!("failed to build chat completion request: {}", e)))?;

        debug!(model = %self.model, messages = messages.len(), tools = tools.len(), "sending chat completion");
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AgentError::Model(e.to_string()))?;

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion received"
            );
        }

        self.extract_turn(response)
    }
}

fn to_request_message(message: &Message) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let request_message = match message {
        Message::System(content) => ChatCompletionRequestSystemMessageArgs::default()
            .content(content.clone())
            .build()?
            .into(),
        Message::User(content) => ChatCompletionRequestUserMessageArgs::default()
            .content(content.clone())
            .build()?
            .into(),
        Message::Assistant {
            content,
            tool_calls,
        } => {
            let mut assistant = ChatCompletionRequestAssistantMessageArgs::default();
            if let Some(content) = content {
                assistant.content(content.clone());
            }
            if !tool_calls.is_empty() {
                assistant.tool_calls(tool_calls.iter().map(to_message_tool_call).collect::<Vec<_>>());
            }
            assistant.build()?.into()
        }
        Message::Tool { call_id, content } => ChatCompletionRequestToolMessageArgs::default()
            .content(content.clone())
            .tool_call_id(call_id.clone())
            .build()?
            .into(),
    };
    Ok(request_message)
}

fn to_message_tool_call(call: &ToolCall) -> ChatCompletionMessageToolCall {
    ChatCompletionMessageToolCall {
        id: call.id.clone(),
        r#type: ChatCompletionToolType::Function,
        function: FunctionCall {
            name: call.name.clone(),
            arguments: call.arguments.to_string(),
        },
    }
}

fn to_request_tool(spec: &ToolSpec) -> Result<ChatCompletionTool, OpenAIError> {
    let function = FunctionObjectArgs::default()
        .name(spec.name.clone())
        .description(spec.description.clone())
        .parameters(spec.parameters.clone())
        .build()?;

    ChatCompletionToolArgs::default()
        .r#type(ChatCompletionToolType::Function)
        .function(function)
        .build()
}

/// Tool arguments arrive as a JSON string; keep unparseable text as a string value
fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_config(api_endpoint: &str) -> Config {
        Config {
            api_endpoint: api_endpoint.to_string(),
            model: "gpt-4o".to_string(),
            ..Config::default()
        }
    }

    fn completion_body(message: Value) -> String {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": message,
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19}
        })
        .to_string()
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(parse_arguments(r#"{"timezone": "UTC"}"#), json!({"timezone": "UTC"}));
        assert_eq!(parse_arguments(""), json!({}));
        assert_eq!(parse_arguments("not json"), json!("not json"));
    }

    #[test]
    fn test_build_request_with_tools_and_history() {
        let model = OpenAiModel::new(&create_test_config("http://localhost"), "test-key".to_string());
        let messages = vec![
            Message::System("system".to_string()),
            Message::User("What time is it?".to_string()),
            Message::Assistant {
                content: None,
                tool_calls: vec![ToolCall {
                    id: "call_1".to_string(),
                    name: "get_current_time".to_string(),
                    arguments: json!({"timezone": "UTC"}),
                }],
            },
            Message::Tool {
                call_id: "call_1".to_string(),
                content: "12:00".to_string(),
            },
        ];
        let tools = vec![ToolSpec {
            name: "get_current_time".to_string(),
            description: "Current time".to_string(),
            parameters: json!({"type": "object"}),
        }];

        let request = model.build_request(&messages, &tools).unwrap();
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.tools.as_ref().map(Vec::len), Some(1));

        let without_tools = model.build_request(&messages[..2], &[]).unwrap();
        assert!(without_tools.tools.is_none());
    }

    #[tokio::test]
    async fn test_complete_parses_tool_calls() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body(json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "final_answer", "arguments": "{\"answer\": \"done\"}"}
                }]
            })))
            .create_async()
            .await;

        let model = OpenAiModel::new(&create_test_config(&server.url()), "test-key".to_string());
        let turn = model
            .complete(&[Message::User("hi".to_string())], &[])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(turn.content, None);
        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(turn.tool_calls[0].name, "final_answer");
        assert_eq!(turn.tool_calls[0].arguments, json!({"answer": "done"}));
    }

    #[tokio::test]
    async fn test_complete_rejects_empty_choices() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": "chatcmpl-2",
                    "object": "chat.completion",
                    "created": 1700000000,
                    "model": "gpt-4o",
                    "choices": []
                })
                .to_string(),
            )
            .create_async()
            .await;

        let model = OpenAiModel::new(&create_test_config(&server.url()), "test-key".to_string());
        let result = model.complete(&[Message::User("hi".to_string())], &[]).await;

        match result {
            Err(AgentError::Model(reason)) => assert_eq!(reason, "response contained no choices"),
            other => panic!("expected model error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_complete_surfaces_http_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": {"message": "bad request", "type": "invalid_request_error", "param": null, "code": null}}"#)
            .create_async()
            .await;

        let model = OpenAiModel::new(&create_test_config(&server.url()), "test-key".to_string());
        let result = model.complete(&[Message::User("hi".to_string())], &[]).await;

        assert!(matches!(result, Err(AgentError::Model(_))));
    }
}
