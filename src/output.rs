use crate::models::Report;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Console,
    Json,
    Yaml,
    Html,
}

/// Where and under which name a run's artifacts go
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Mode-specific prefix, e.g. `introspect_report`
    pub report_prefix: String,
    /// Sortable run identifier, `YYYYMMDD_HHMMSS`
    pub timestamp: String,
    pub output_dir: PathBuf,
    /// HTML template for the mode
    pub template_path: PathBuf,
}

impl RenderContext {
    /// `{output_dir}/{report_prefix}_{timestamp}.{ext}`
    pub fn artifact_path(&self, ext: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.{}", self.report_prefix, self.timestamp, ext))
    }
}

/// Files written by a render and whether the requested format had to be downgraded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOutcome {
    pub artifacts: Vec<PathBuf>,
    pub degraded: bool,
}

const SCRIPT_HEAD: &str = "<script>\nconst reportData = JSON.parse(";
const SCRIPT_TAIL: &str = r#");
document.addEventListener("DOMContentLoaded", function () {
  if (typeof renderReport === "function") {
    renderReport(reportData);
  } else {
    const pre = document.createElement("pre");
    pre.textContent = JSON.stringify(reportData, null, 2);
    document.body.appendChild(pre);
  }
});
</script>
"#;

/// Render a validated report in the requested format
pub fn render(report: &Report, format: OutputFormat, ctx: &RenderContext) -> Result<RenderOutcome> {
    match format {
        OutputFormat::Console => {
            let stdout = std::io::stdout();
            write_console(report, &mut stdout.lock())?;
            Ok(RenderOutcome::default())
        }
        OutputFormat::Json => Ok(RenderOutcome {
            artifacts: vec![save_json(report, ctx)?],
            degraded: false,
        }),
        OutputFormat::Yaml => Ok(RenderOutcome {
            artifacts: vec![save_yaml(report, ctx)?],
            degraded: false,
        }),
        OutputFormat::Html => render_html(report, ctx),
    }
}

/// Pretty-print the report, leaving non-ASCII text unescaped
fn write_console(report: &Report, out: &mut impl Write) -> Result<()> {
    let json = serialize_json(report)?;
    writeln!(out, "{}", json).context("Failed to write report to stdout")
}

fn serialize_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")
}

fn save_json(report: &Report, ctx: &RenderContext) -> Result<PathBuf> {
    let path = ctx.artifact_path("json");
    write_artifact(&path, &serialize_json(report)?)?;
    Ok(path)
}

fn save_yaml(report: &Report, ctx: &RenderContext) -> Result<PathBuf> {
    let yaml = serde_yaml::to_string(report).context("Failed to serialize report to YAML")?;
    let path = ctx.artifact_path("yaml");
    write_artifact(&path, &yaml)?;
    Ok(path)
}

/// HTML view plus a sibling JSON file; a missing template degrades to JSON only
fn render_html(report: &Report, ctx: &RenderContext) -> Result<RenderOutcome> {
    let template = match std::fs::read_to_string(&ctx.template_path) {
        Ok(template) => template,
        Err(e) => {
            warn!(
                template = %ctx.template_path.display(),
                error = %e,
                "HTML template not found, falling back to JSON output"
            );
            return Ok(RenderOutcome {
                artifacts: vec![save_json(report, ctx)?],
                degraded: true,
            });
        }
    };

    let json = serialize_json(report)?;
    let script = format!("{}{}{}", SCRIPT_HEAD, script_literal(&json)?, SCRIPT_TAIL);
    let html = inject(&template, &script);

    let json_path = ctx.artifact_path("json");
    write_artifact(&json_path, &json)?;
    let html_path = ctx.artifact_path("html");
    write_artifact(&html_path, &html)?;

    Ok(RenderOutcome {
        artifacts: vec![html_path, json_path],
        degraded: false,
    })
}

/// Encode text as a JavaScript string literal that is inert inside `<script>`
fn script_literal(text: &str) -> Result<String> {
    let quoted = serde_json::to_string(text).context("Failed to encode report as a string literal")?;

    let mut literal = String::with_capacity(quoted.len());
    for c in quoted.chars() {
        match c {
            '<' => literal.push_str("\\u003c"),
            '>' => literal.push_str("\\u003e"),
            '&' => literal.push_str("\\u0026"),
            '\u{2028}' => literal.push_str("\\u2028"),
            '\u{2029}' => literal.push_str("\\u2029"),
            c => literal.push(c),
        }
    }
    Ok(literal)
}

/// Insert the script before the last `</body>`, else `</html>`, else at the end
fn inject(template: &str, script: &str) -> String {
    let at = match find_injection_point(template) {
        Some(at) => at,
        None => {
            warn!("template has no </body> or </html>; appending report script at end of file");
            template.len()
        }
    };

    let mut html = String::with_capacity(template.len() + script.len());
    html.push_str(&template[..at]);
    html.push_str(script);
    html.push_str(&template[at..]);
    html
}

fn find_injection_point(template: &str) -> Option<usize> {
    let lowered = template.to_ascii_lowercase();
    lowered.rfind("</body>").or_else(|| lowered.rfind("</html>"))
}

/// Ensure the directory for an artifact exists
fn ensure_directory_exists(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

fn write_artifact(path: &Path, content: &str) -> Result<()> {
    ensure_directory_exists(path)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to: {}", path.display()))?;
    info!(path = %path.display(), "report written");
    Ok(())
}
