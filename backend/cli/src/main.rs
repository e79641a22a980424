mod eval_cmd;
mod run_cmd;
mod scoring;
mod terminal_output;
mod validate_cmd;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use navigator_config::defaults::DEFAULT_LOG_LEVEL;
use navigator_config::NavigatorConfig;
use navigator_core::{ErrorKind, ErrorReport, NavigatorError};

use scoring::ScorerKind;

#[derive(Parser)]
#[command(name = "navigator")]
#[command(about = "Explores a web application and writes test plans and automation scripts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent on one task
    Run {
        /// Config file (defaults to $NAVIGATOR_CONFIG, then configs/config.yml)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Where generated scripts and plans are written
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Print the whole run (steps included) as JSON
        #[arg(long)]
        json: bool,
        /// Task text, e.g. "Test the login page at https://example.com/login"
        #[arg(required = true, num_args = 1..)]
        task: Vec<String>,
    },
    /// Check a config file and print it with credentials masked
    Validate {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run every question of a dataset and score the final answers
    Eval {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// JSON array of {"question", "answer"} items
        #[arg(short, long)]
        dataset: PathBuf,
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
        #[arg(long, value_enum, default_value_t = ScorerKind::Contains)]
        scorer: ScorerKind,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, output_dir, json, task } => {
            run_cmd::run(config.as_deref(), output_dir, &task.join(" "), json).await
        }
        Commands::Validate { config } => validate_cmd::run(config.as_deref()).await,
        Commands::Eval { config, dataset, concurrency, scorer, output_dir } => {
            eval_cmd::run(config.as_deref(), &dataset, concurrency, scorer, output_dir).await
        }
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            let report = error_report(&err);
            match serde_json::to_string(&report) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("{report}"),
            }
            ExitCode::FAILURE
        }
    }
}

/// Domain errors keep their kind; everything else is a setup problem.
fn error_report(err: &anyhow::Error) -> ErrorReport {
    match err.downcast_ref::<NavigatorError>() {
        Some(e) => e.report(),
        None => ErrorReport { kind: ErrorKind::Config, message: format!("{err:#}") },
    }
}

fn init_logging(config: &NavigatorConfig) {
    let level = config.general.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL);
    let log_dir = config.general.log_dir.as_deref().map(Path::new);
    navigator_logging::init_logger(log_dir, level);
}

fn output_dir(config: &NavigatorConfig, explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| PathBuf::from(config.output.dir()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_keep_their_kind() {
        let err = anyhow::Error::new(NavigatorError::IterationLimitExceeded(3));
        assert_eq!(error_report(&err).kind, ErrorKind::IterationLimitExceeded);

        let err = anyhow::anyhow!("Failed to read config file: missing.yml");
        let report = error_report(&err);
        assert_eq!(report.kind, ErrorKind::Config);
        assert!(report.message.contains("missing.yml"));
    }

    #[test]
    fn task_words_are_collected() {
        let cli = Cli::try_parse_from([
            "navigator", "run", "--config", "c.yml", "Test", "https://example.com/",
        ])
        .unwrap();
        let Commands::Run { task, config, .. } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(task.join(" "), "Test https://example.com/");
        assert_eq!(config, Some(PathBuf::from("c.yml")));
    }
}
