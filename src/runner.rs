use crate::agent::{ChatModel, ToolSet};
use crate::config::{Config, ServerParameters};
use crate::llm::OpenAiModel;
use crate::modes::EvaluationMode;
use crate::output::{self, OutputFormat, RenderContext, RenderOutcome};
use crate::tools::McpToolCollection;
use crate::validator::{self, RawResult};
use anyhow::{Context, Result};
use chrono::Local;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Main runner that orchestrates a single evaluation run
pub struct Runner {
    config: Config,
}

impl Runner {
    /// Create a new runner with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Connect to the tool server, run the mode, then validate and render its report
    pub async fn run(
        &self,
        mode: EvaluationMode,
        server: &ServerParameters,
        format: OutputFormat,
    ) -> Result<RenderOutcome> {
        let api_key = self.config.api_key()?;
        let model: Arc<dyn ChatModel> = Arc::new(OpenAiModel::new(&self.config, api_key));

        let tools = McpToolCollection::connect(server)
            .await
            .context("Failed to connect to tool server")?;
        self.run_with(mode, model, Arc::new(tools), McpToolCollection::release, format)
            .await
    }

    /// Run the mode against already-acquired tools.
    ///
    /// `release` is called exactly once after the mode finishes, whether or not it succeeded,
    /// and before the report is validated.
    pub async fn run_with<T, R, F>(
        &self,
        mode: EvaluationMode,
        model: Arc<dyn ChatModel>,
        tools: Arc<T>,
        release: R,
        format: OutputFormat,
    ) -> Result<RenderOutcome>
    where
        T: ToolSet + 'static,
        R: FnOnce(Arc<T>) -> F,
        F: Future<Output = ()>,
    {
        let raw = self.evaluate(mode, model, tools.clone()).await;
        release(tools).await;

        self.finish(mode, raw?, format)
    }

    /// Drive the mode's agents against the given collaborators
    pub async fn evaluate(
        &self,
        mode: EvaluationMode,
        model: Arc<dyn ChatModel>,
        tools: Arc<dyn ToolSet>,
    ) -> Result<RawResult> {
        mode.run(model, tools, self.config.max_steps)
            .await
            .with_context(|| format!("{} evaluation did not produce a final answer", mode.name()))
    }

    /// Validate the raw result and render it; nothing is written for a rejected report
    pub fn finish(
        &self,
        mode: EvaluationMode,
        raw: RawResult,
        format: OutputFormat,
    ) -> Result<RenderOutcome> {
        let report = validator::validate(raw, mode.report_kind())
            .with_context(|| format!("{} report was rejected", mode.name()))?;
        info!(kind = ?report.kind(), scores = report.scores().len(), "report validated");

        let ctx = self.render_context(mode);
        output::render(&report, format, &ctx)
    }

    fn render_context(&self, mode: EvaluationMode) -> RenderContext {
        RenderContext {
            report_prefix: mode.report_prefix(),
            timestamp: Local::now().format("%Y%m%d_%H%M%S").to_string(),
            output_dir: self.config.output_dir.clone(),
            template_path: self
                .config
                .template_dir
                .join(format!("template_{}.html", mode.name())),
        }
    }
}
