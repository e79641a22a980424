//! `navigator eval`: batch runs over a question/answer dataset.
//!
//! Every item is an independent run with its own providers, tools and output
//! subdirectory; a semaphore bounds how many run at once.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use navigator_agent::prepare_run;
use navigator_config::{config_file_path, load_and_prepare, NavigatorConfig};
use navigator_core::ErrorReport;

use crate::scoring::{Scorer, ScorerKind};
use crate::terminal_output::{note_info, render_table, Column};

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetItem {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub index: usize,
    pub question: String,
    pub expected: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
    pub iterations: usize,
    pub score: f64,
}

pub async fn run(
    config: Option<&Path>,
    dataset: &Path,
    concurrency: usize,
    scorer: ScorerKind,
    output_dir: Option<PathBuf>,
) -> Result<ExitCode> {
    let config = load_and_prepare(&config_file_path(config)).await?;
    crate::init_logging(&config);

    let items = load_dataset(dataset).await?;
    let output_dir = crate::output_dir(&config, output_dir);
    let cancel = CancellationToken::new();
    crate::run_cmd::cancel_on_ctrl_c(cancel.clone());

    note_info(&format!(
        "Evaluating {} items from {} ({} at a time)",
        items.len(),
        dataset.display(),
        concurrency.max(1)
    ));
    let mut results = evaluate(Arc::new(config), items, &output_dir, concurrency, cancel).await?;
    let mean = score_all(&mut results, scorer.scorer().as_ref());

    let columns = [
        Column::right("#"),
        Column::left("Question").max_width(48),
        Column::left("Answer").max_width(48),
        Column::right("Score"),
    ];
    let rows: Vec<Vec<String>> = results
        .iter()
        .map(|r| {
            let answer = match (&r.answer, &r.error) {
                (Some(answer), _) => answer.clone(),
                (None, Some(error)) => format!("[{}] {}", error.kind, error.message),
                (None, None) => String::new(),
            };
            vec![r.index.to_string(), r.question.clone(), answer, format!("{:.2}", r.score)]
        })
        .collect();
    print!("{}", render_table(&columns, &rows));
    println!("mean {} score: {mean:.3} over {} items", scorer.scorer().name(), results.len());
    Ok(ExitCode::SUCCESS)
}

pub async fn load_dataset(path: &Path) -> Result<Vec<DatasetItem>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Dataset {} is not a JSON array of {{question, answer}}", path.display()))
}

/// Runs all items; per-item failures are recorded, not propagated.
pub async fn evaluate(
    config: Arc<NavigatorConfig>,
    items: Vec<DatasetItem>,
    output_dir: &Path,
    concurrency: usize,
    cancel: CancellationToken,
) -> Result<Vec<ItemResult>> {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let config = Arc::clone(&config);
        let permits = Arc::clone(&permits);
        let dir = output_dir.join(format!("item_{index:03}"));
        let cancel = cancel.child_token();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            evaluate_one(&config, index, item, &dir, cancel).await
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        results.push(joined.context("Evaluation task panicked")?);
    }
    results.sort_by_key(|r| r.index);
    Ok(results)
}

async fn evaluate_one(
    config: &NavigatorConfig,
    index: usize,
    item: DatasetItem,
    dir: &Path,
    cancel: CancellationToken,
) -> ItemResult {
    let mut result = ItemResult {
        index,
        question: item.question,
        expected: item.answer,
        answer: None,
        error: None,
        iterations: 0,
        score: 0.0,
    };

    let outcome = async {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let runner = prepare_run(config, dir, cancel)?;
        anyhow::Ok(runner.run(&result.question).await?)
    }
    .await;

    match outcome {
        Ok(outcome) => {
            info!(index, iterations = outcome.iterations, "Item finished");
            result.iterations = outcome.iterations;
            result.answer = Some(outcome.final_answer);
        }
        Err(err) => {
            warn!(index, error = %err, "Item failed");
            result.error = Some(crate::error_report(&err));
        }
    }
    result
}

/// Fills in each item's score and returns the mean (0 for an empty set).
pub fn score_all(results: &mut [ItemResult], scorer: &dyn Scorer) -> f64 {
    for r in results.iter_mut() {
        r.score = match &r.answer {
            Some(answer) => scorer.score(answer, &r.expected),
            None => 0.0,
        };
    }
    if results.is_empty() {
        0.0
    } else {
        results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ContainsScorer;
    use navigator_core::ErrorKind;
    use std::collections::HashMap;

    const CONFIG: &str = r#"
llms:
  planner:
    _type: mock
    model_name: scripted
    responses:
      - "Thought: nothing to browse\nFinal Answer: Example Domain needs 2 tests"
functions:
  generate_test_plan_markdown:
    _type: generate_test_plan_markdown
workflow:
  _type: react_agent
  llm_name: planner
"#;

    fn item(question: &str, answer: &str) -> DatasetItem {
        DatasetItem { question: question.into(), answer: answer.into() }
    }

    #[tokio::test]
    async fn items_run_independently_and_are_scored() {
        let config = navigator_config::prepare_from_str(CONFIG, &HashMap::new()).unwrap();
        let out = tempfile::tempdir().unwrap();
        let items = vec![
            item("Plan tests for https://example.com/", "example domain"),
            item("Plan tests for https://example.com/login", "login form"),
            item("Plan tests for https://example.org/", "2 tests"),
        ];

        let mut results =
            evaluate(Arc::new(config), items, out.path(), 2, CancellationToken::new())
                .await
                .unwrap();
        let mean = score_all(&mut results, &ContainsScorer);

        assert_eq!(results.iter().map(|r| r.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(results.iter().all(|r| r.answer.as_deref() == Some("Example Domain needs 2 tests")));
        assert_eq!(results[1].score, 0.0);
        assert!((mean - 2.0 / 3.0).abs() < 1e-9);
        assert!(out.path().join("item_002").is_dir());
    }

    #[tokio::test]
    async fn cancelled_items_record_the_error() {
        let config = navigator_config::prepare_from_str(CONFIG, &HashMap::new()).unwrap();
        let out = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut results = evaluate(
            Arc::new(config),
            vec![item("Plan tests for https://example.com/", "anything")],
            out.path(),
            1,
            cancel,
        )
        .await
        .unwrap();
        assert_eq!(score_all(&mut results, &ContainsScorer), 0.0);
        let error = results[0].error.as_ref().unwrap();
        assert_eq!(error.kind, ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn dataset_must_be_question_answer_array() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        std::fs::write(&good, r#"[{"question": "q", "answer": "a"}]"#).unwrap();
        assert_eq!(load_dataset(&good).await.unwrap().len(), 1);

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"question": "q"}"#).unwrap();
        assert!(load_dataset(&bad).await.is_err());
    }
}
