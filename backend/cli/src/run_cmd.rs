//! `navigator run`: one agent run from the command line.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use navigator_agent::prepare_run;
use navigator_config::{config_file_path, load_and_prepare};

use crate::terminal_output::note_success;

pub async fn run(
    config: Option<&Path>,
    output_dir: Option<PathBuf>,
    task: &str,
    json: bool,
) -> Result<ExitCode> {
    let config = load_and_prepare(&config_file_path(config)).await?;
    crate::init_logging(&config);

    let output_dir = crate::output_dir(&config, output_dir);
    tokio::fs::create_dir_all(&output_dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let runner = prepare_run(&config, &output_dir, cancel)?;
    let outcome = runner.run(task).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome.final_answer);
    }
    note_success(&format!(
        "Finished in {} iterations; artifacts in {}",
        outcome.iterations,
        output_dir.display()
    ));
    Ok(ExitCode::SUCCESS)
}

/// First Ctrl-C cancels the run; the loop stops at its next checkpoint.
pub fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            cancel.cancel();
        }
    });
}
