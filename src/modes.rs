use crate::agent::{ChatModel, ReasoningAgent, ToolSet};
use crate::error::AgentError;
use crate::models::ReportKind;
use crate::prompt;
use crate::validator::RawResult;
use clap::ValueEnum;
use std::sync::Arc;
use tracing::info;

const CANDIDATE_DESCRIPTION: &str = "The agent under evaluation. Send it a task or question in the `task` argument. \
It answers only about abilities backed by its own tools, never general knowledge, and never uses reporting tools.";

/// How the agent under evaluation is examined
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EvaluationMode {
    /// The agent reports on its own tools
    #[value(name = "introspect")]
    Introspection,
    /// An interviewer agent questions a candidate agent
    Interview,
}

impl EvaluationMode {
    pub fn name(&self) -> &'static str {
        match self {
            EvaluationMode::Introspection => "introspect",
            EvaluationMode::Interview => "interview",
        }
    }

    pub fn report_kind(&self) -> ReportKind {
        match self {
            EvaluationMode::Introspection => ReportKind::Introspection,
            EvaluationMode::Interview => ReportKind::Interview,
        }
    }

    /// Prefix shared by every artifact of this mode
    pub fn report_prefix(&self) -> String {
        format!("{}_report", self.name())
    }

    pub fn prompt(&self) -> String {
        prompt::instruction_for(self.report_kind())
    }

    /// Drive the agent(s) of this mode to a final answer.
    ///
    /// Agent failures propagate unchanged; there is no retry here.
    pub async fn run(
        &self,
        model: Arc<dyn ChatModel>,
        tools: Arc<dyn ToolSet>,
        max_steps: usize,
    ) -> Result<RawResult, AgentError> {
        let task = self.prompt();
        let agent = self.build_agent(model, tools, max_steps);

        info!(mode = self.name(), agent = agent.name(), "starting evaluation");
        let answer = agent.run(&task).await?;
        Ok(RawResult::from(answer))
    }

    fn build_agent(
        &self,
        model: Arc<dyn ChatModel>,
        tools: Arc<dyn ToolSet>,
        max_steps: usize,
    ) -> ReasoningAgent {
        match self {
            EvaluationMode::Introspection => ReasoningAgent::new("introspector", model)
                .with_tools(tools)
                .with_max_steps(max_steps),
            EvaluationMode::Interview => {
                let candidate = ReasoningAgent::new("candidate", model.clone())
                    .with_description(CANDIDATE_DESCRIPTION)
                    .with_tools(tools)
                    .with_max_steps(max_steps);
                ReasoningAgent::new("interviewer", model)
                    .with_description("Technical interviewer assessing the candidate agent.")
                    .with_managed_agent(candidate)
                    .with_max_steps(max_steps)
            }
        }
    }
}
