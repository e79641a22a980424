//! Test case synthesis from an analyzed page.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use navigator_core::{NavigatorError, PageAnalysis, Result, TestCase, ToolKind};
use navigator_llm::LlmClient;

/// HTML characters included in the synthesis prompt.
pub const SYNTHESIS_HTML_CHARS: usize = 15_000;

const SYSTEM_PROMPT: &str = "You are a senior QA engineer who writes concise, \
functional test case descriptions for web pages.";

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*•+]|\d+[.)]|\(\d+\)|(?i:TC-?\d+)\s*[:.)-]?)\s*").unwrap()
});

pub struct TestCaseSynthesizer {
    llm: LlmClient,
    max_test_cases: usize,
}

impl TestCaseSynthesizer {
    pub fn new(llm: LlmClient, max_test_cases: usize) -> Self {
        Self { llm, max_test_cases }
    }

    /// Asks the model for candidate test cases covering the page.
    pub async fn synthesize(&self, page: &PageAnalysis) -> Result<Vec<TestCase>> {
        let prompt = build_prompt(page);
        let reply = self.llm.prompt(SYSTEM_PROMPT, &prompt).await.map_err(|e| {
            NavigatorError::ToolInvocationFailed {
                tool: ToolKind::WebNavigator.as_str().to_string(),
                message: format!("test synthesis failed: {e}"),
            }
        })?;

        let cases = parse_test_cases(&reply, &page.url, &page.extracted_text, self.max_test_cases);
        if cases.is_empty() {
            warn!(url = %page.url, "Model returned no test cases");
            return Err(NavigatorError::GenerationFailed(format!(
                "no test cases were produced for {}",
                page.url
            )));
        }
        debug!(url = %page.url, count = cases.len(), "Synthesized test cases");
        Ok(cases)
    }
}

fn build_prompt(page: &PageAnalysis) -> String {
    let html: String = page.raw_html.chars().take(SYNTHESIS_HTML_CHARS).collect();
    format!(
        "Analyze the page at {url} and list functional test cases for it.\n\n\
         Page summary:\n{summary}\n\n\
         HTML content:\n{html}\n\n\
         Cover critical user flows, form submission and validation, navigation \
         links and interactive elements (buttons, inputs, dynamic content).\n\
         Only describe elements and behaviour actually present in the HTML.\n\
         Respond with one short test case description per line and nothing else.",
        url = page.url,
        summary = page.extracted_text,
    )
}

/// One case per non-blank line, list markers stripped, numbered `TC-001…`.
pub fn parse_test_cases(text: &str, url: &str, snippet: &str, max: usize) -> Vec<TestCase> {
    text.lines()
        .map(|line| LIST_MARKER.replace(line, "").trim().trim_matches('*').trim().to_string())
        .filter(|line| !line.is_empty() && !line.starts_with("```") && !line.ends_with(':'))
        .take(max)
        .enumerate()
        .map(|(i, description)| TestCase {
            id: format!("TC-{:03}", i + 1),
            description,
            start_page_url: url.to_string(),
            relevant_html_snippet: snippet.to_string(),
        })
        .collect()
}
