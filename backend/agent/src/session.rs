//! Per-run wiring from configuration.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use navigator_config::NavigatorConfig;
use navigator_llm::ProviderRegistry;
use navigator_tools::build_registry;

use crate::agent_loop::{AgentRunner, AgentSettings, RunContext};

/// Builds a fresh runner: its own providers, tools and output directory.
pub fn prepare_run(
    config: &NavigatorConfig,
    output_dir: &Path,
    cancel: CancellationToken,
) -> Result<AgentRunner> {
    let providers = ProviderRegistry::from_config(&config.llms)?;
    let llm_name = &config.workflow.llm_name;
    let llm = providers
        .get(llm_name)
        .with_context(|| format!("Workflow LLM '{llm_name}' is not defined under llms"))?;
    let registry = build_registry(config, &providers, output_dir)?;

    let ctx = RunContext::new(
        Arc::new(registry),
        llm,
        AgentSettings::from_workflow(&config.workflow),
    )
    .with_cancel(cancel);
    info!(
        session_id = %ctx.session_id,
        output_dir = %output_dir.display(),
        "Run prepared"
    );
    Ok(AgentRunner::new(ctx))
}
