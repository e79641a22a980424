//! Test automation code generation.
//!
//! One model call per test case; the source is written to the output
//! directory under a name derived from the test case.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use navigator_core::{
    CodeGenInput, GeneratedCode, NavigatorError, Result, Tool, ToolInput, ToolKind, ToolOutput,
};
use navigator_llm::LlmClient;
use navigator_markdown::CodeBlockAnalyzer;

use crate::artifact::{artifact_name, atomic_write};
use crate::mismatched_input;

/// Slug characters kept in a generated file name.
const FILE_STEM_CHARS: usize = 40;

#[derive(Debug, Clone)]
pub struct CodeGenOptions {
    pub framework: String,
    pub extension: String,
    pub output_dir: PathBuf,
    pub max_generations: usize,
}

pub struct CodeGeneratorTool {
    llm: LlmClient,
    options: CodeGenOptions,
    generated: AtomicUsize,
    /// File name → test case it was written for.
    files: Mutex<HashMap<String, String>>,
}

impl CodeGeneratorTool {
    pub fn new(llm: LlmClient, options: CodeGenOptions) -> Self {
        Self {
            llm,
            options,
            generated: AtomicUsize::new(0),
            files: Mutex::new(HashMap::new()),
        }
    }

    /// Files written so far by this instance.
    pub fn generated(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }

    pub async fn generate(&self, input: &CodeGenInput) -> Result<GeneratedCode> {
        for (field, value) in [
            ("test_case", &input.test_case),
            ("start_page_url", &input.start_page_url),
            ("relevant_html", &input.relevant_html),
        ] {
            if value.trim().is_empty() {
                return Err(NavigatorError::MissingField(field.to_string()));
            }
        }
        if self.generated() >= self.options.max_generations {
            return Err(NavigatorError::LimitReached(format!(
                "at most {} test scripts may be generated per run",
                self.options.max_generations
            )));
        }

        let reply = self
            .llm
            .prompt(&self.system_prompt(), &self.user_prompt(input))
            .await
            .map_err(|e| NavigatorError::ToolInvocationFailed {
                tool: ToolKind::GenerateTestAutomationCode.as_str().to_string(),
                message: e.to_string(),
            })?;

        let source = CodeBlockAnalyzer::unwrap_code(&reply);
        if source.is_empty() {
            return Err(NavigatorError::GenerationFailed(
                "model returned an empty script".into(),
            ));
        }
        if !looks_like_code(&source) {
            warn!(test_case = %input.test_case, "Model reply does not look like code");
            return Err(NavigatorError::GenerationFailed(
                "model reply does not contain source code".into(),
            ));
        }

        let file_name = self.claim_file_name(&input.test_case).await;
        let path = atomic_write(&self.options.output_dir.join(file_name), &source).await?;
        self.generated.fetch_add(1, Ordering::SeqCst);
        info!(path = %path.display(), "Test script written");

        Ok(GeneratedCode {
            test_case: input.test_case.clone(),
            source,
            test_file_path: path.display().to_string(),
        })
    }

    /// `<slug><ext>`, or `<slug>_<n><ext>` when another test case of this run
    /// already owns that name. The same test case keeps its file.
    async fn claim_file_name(&self, test_case: &str) -> String {
        let stem = artifact_name(test_case, FILE_STEM_CHARS, "test_case", "");
        let ext = &self.options.extension;
        let mut files = self.files.lock().await;
        let mut n = 1;
        loop {
            let name = if n == 1 { format!("{stem}{ext}") } else { format!("{stem}_{n}{ext}") };
            match files.get(&name) {
                Some(owner) if owner != test_case => n += 1,
                Some(_) => return name,
                None => {
                    files.insert(name.clone(), test_case.to_string());
                    return name;
                }
            }
        }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are an expert QA automation engineer who writes {} test scripts.",
            self.options.framework
        )
    }

    fn user_prompt(&self, input: &CodeGenInput) -> String {
        format!(
            "Write a {framework} test script for the following test case, starting from the given URL.\n\n\
             Start Page URL: {url}\n\
             Test Case Description: {case}\n\n\
             Requirements:\n\
             - Follow {framework} best practices.\n\
             - Add a short comment before each step.\n\
             - Output only the source code, with no markdown and no explanations.\n\n\
             Relevant HTML content:\n{html}",
            framework = self.options.framework,
            url = input.start_page_url,
            case = input.test_case,
            html = input.relevant_html,
        )
    }
}

/// Rejects prose replies such as refusals, which carry no code punctuation.
fn looks_like_code(text: &str) -> bool {
    text.contains(['(', '{', ';', '='])
}

#[async_trait]
impl Tool for CodeGeneratorTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GenerateTestAutomationCode
    }

    async fn invoke(&self, input: ToolInput) -> Result<ToolOutput> {
        match input {
            ToolInput::GenerateTestAutomationCode(input) => {
                Ok(ToolOutput::Code(self.generate(&input).await?))
            }
            other => Err(mismatched_input(self.kind(), &other)),
        }
    }
}
