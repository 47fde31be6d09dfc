use crate::error::AgentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the synthetic tool an agent calls to finish
pub const FINAL_ANSWER: &str = "final_answer";

const FINAL_ANSWER_REMINDER: &str =
    "Continue the task with your tools. When you are done, call final_answer with the result.";

/// A callable tool as advertised to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object
    pub parameters: Value,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    System(String),
    User(String),
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        call_id: String,
        content: String,
    },
}

/// One reply from the model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

/// Language model that can answer with text or tool calls
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[Message], tools: &[ToolSpec])
    -> Result<ModelTurn, AgentError>;
}

/// Collection of external tools an agent may call
#[async_trait]
pub trait ToolSet: Send + Sync {
    fn specs(&self) -> Vec<ToolSpec>;

    async fn call(&self, name: &str, arguments: Value) -> Result<String, AgentError>;
}

pub type AgentFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, AgentError>> + Send + 'a>>;

/// Tool-calling agent that loops until `final_answer` is called
pub struct ReasoningAgent {
    name: String,
    description: String,
    model: Arc<dyn ChatModel>,
    tools: Option<Arc<dyn ToolSet>>,
    managed_agents: Vec<ReasoningAgent>,
    max_steps: usize,
}

impl ReasoningAgent {
    pub fn new(name: impl Into<String>, model: Arc<dyn ChatModel>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            model,
            tools: None,
            managed_agents: Vec::new(),
            max_steps: 20,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tools(mut self, tools: Arc<dyn ToolSet>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Expose another agent as a tool taking a `task` argument
    pub fn with_managed_agent(mut self, agent: ReasoningAgent) -> Self {
        self.managed_agents.push(agent);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tools advertised to the model: external tools, managed agents, then `final_answer`
    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self
            .tools
            .iter()
            .flat_map(|tools| tools.specs())
            .filter(|spec| spec.name != FINAL_ANSWER)
            .collect();
        specs.extend(self.managed_agents.iter().map(ReasoningAgent::as_tool_spec));
        specs.push(final_answer_spec());
        specs
    }

    fn as_tool_spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "task": {
                        "type": "string",
                        "description": "The request to send to this agent, with all the context it needs"
                    }
                },
                "required": ["task"]
            }),
        }
    }

    fn system_prompt(&self) -> String {
        let mut prompt = format!("You are {}, an agent that solves tasks by calling tools.", self.name);
        if !self.description.is_empty() {
            prompt.push(' ');
            prompt.push_str(&self.description);
        }
        prompt.push_str(
            " Call one or more tools at every step. When the task is complete, call final_answer with the answer.",
        );
        prompt
    }

    /// Run the agent on a task and return the `answer` passed to `final_answer`
    pub fn run<'a>(&'a self, task: &'a str) -> AgentFuture<'a> {
        Box::pin(async move {
            let specs = self.tool_specs();
            let mut messages = vec![
                Message::System(self.system_prompt()),
                Message::User(task.to_string()),
            ];

            for step in 1..=self.max_steps {
                debug!(agent = %self.name, step, "requesting next action");
                let turn = self.model.complete(&messages, &specs).await?;

                if turn.tool_calls.is_empty() {
                    messages.push(Message::Assistant {
                        content: turn.content,
                        tool_calls: Vec::new(),
                    });
                    messages.push(Message::User(FINAL_ANSWER_REMINDER.to_string()));
                    continue;
                }

                messages.push(Message::Assistant {
                    content: turn.content.clone(),
                    tool_calls: turn.tool_calls.clone(),
                });

                for call in &turn.tool_calls {
                    if call.name == FINAL_ANSWER {
                        match call.arguments.get("answer") {
                            Some(answer) => {
                                info!(agent = %self.name, step, "final answer received");
                                return Ok(answer.clone());
                            }
                            None => {
                                messages.push(Message::Tool {
                                    call_id: call.id.clone(),
                                    content: "Error: final_answer requires an 'answer' argument"
                                        .to_string(),
                                });
                                continue;
                            }
                        }
                    }

                    let output = self.dispatch(call).await?;
                    messages.push(Message::Tool {
                        call_id: call.id.clone(),
                        content: output,
                    });
                }
            }

            Err(AgentError::StepLimit {
                agent: self.name.clone(),
                max_steps: self.max_steps,
            })
        })
    }

    /// Execute a non-final tool call; tool failures become text for the model
    async fn dispatch(&self, call: &ToolCall) -> Result<String, AgentError> {
        if let Some(agent) = self.managed_agents.iter().find(|a| a.name == call.name) {
            let Some(task) = call.arguments.get("task").and_then(Value::as_str) else {
                return Ok(format!("Error: {} requires a 'task' argument", agent.name));
            };
            info!(agent = %self.name, managed = %agent.name, "delegating to managed agent");
            let answer = agent.run(task).await?;
            return Ok(answer_text(&answer));
        }

        debug!(agent = %self.name, tool = %call.name, "calling tool");
        match &self.tools {
            Some(tools) => match tools.call(&call.name, call.arguments.clone()).await {
                Ok(output) => Ok(output),
                Err(e) => {
                    warn!(agent = %self.name, tool = %call.name, error = %e, "tool call failed");
                    Ok(format!("Error: {}", e))
                }
            },
            None => Ok(format!("Error: unknown tool '{}'", call.name)),
        }
    }
}

fn final_answer_spec() -> ToolSpec {
    ToolSpec {
        name: FINAL_ANSWER.to_string(),
        description: "Provides the final answer to the task and ends the run".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "answer": {
                    "description": "The final answer, as text or a JSON object",
                    "anyOf": [{"type": "string"}, {"type": "object"}]
                }
            },
            "required": ["answer"]
        }),
    }
}

fn answer_text(answer: &Value) -> String {
    match answer {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
