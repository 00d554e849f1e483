//! Analysis orchestrator.
//!
//! Builds one textual prompt from an injected `PromptConfig`, invokes the
//! generation capability exactly once, and deterministically parses the
//! response into a typed `AnalysisResult`. The orchestrator never sees raw
//! sensitive content: callers redact before invoking it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::llm::Generator;
use crate::rules::Severity;

/// Prompt building blocks, loaded once at startup and injected. The base
/// block always applies; category blocks are selected by declared language
/// and simply absent for unknown categories.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_base_prompt")]
    pub base: String,
    #[serde(default = "default_category_prompts")]
    pub categories: HashMap<String, String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            base: default_base_prompt(),
            categories: default_category_prompts(),
        }
    }
}

fn default_base_prompt() -> String {
    "You are an experienced code reviewer. Review the following change for \
     bugs, security issues, performance problems and style. Be specific and \
     constructive; reference line numbers from the diff where possible."
        .to_string()
}

fn default_category_prompts() -> HashMap<String, String> {
    let mut categories = HashMap::new();
    categories.insert(
        "go".to_string(),
        "Pay attention to error handling, goroutine leaks and context propagation.".to_string(),
    );
    categories.insert(
        "python".to_string(),
        "Pay attention to type hints, mutable default arguments and exception handling."
            .to_string(),
    );
    categories.insert(
        "javascript".to_string(),
        "Pay attention to async/await misuse, equality semantics and prototype pitfalls."
            .to_string(),
    );
    categories.insert(
        "rust".to_string(),
        "Pay attention to unwrap usage, unnecessary clones and unsafe blocks.".to_string(),
    );
    categories
}

/// An immutable analysis request: the (already redacted) text payload, its
/// source identifier and an optional declared category.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    pub content: String,
    pub file_path: String,
    #[serde(default)]
    pub language: Option<String>,
}

/// One model suggestion about the reviewed content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(default)]
    pub line: Option<u64>,
    pub message: String,
    pub severity: Severity,
    pub category: String,
    #[serde(default)]
    pub explanation: String,
}

/// The typed verdict for one request. Produced exactly once per accepted
/// request; carries the category the request was processed with even though
/// the model saw redacted text.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub suggestions: Vec<Suggestion>,
    pub severity: Severity,
    pub language: String,
    pub file_path: String,
    pub processing_time_ms: u64,
}

/// What the model is instructed to return; metadata is stamped on
/// afterwards.
#[derive(Debug, Deserialize)]
struct ModelOutput {
    summary: String,
    #[serde(default)]
    suggestions: Vec<Suggestion>,
    severity: Severity,
}

const OUTPUT_DIRECTIVE: &str = r#"Provide your review in JSON format with the following structure:
{
  "suggestions": [
    {
      "line": <line_number>,
      "message": "<suggestion_text>",
      "severity": "low|medium|high",
      "category": "bug|performance|style|security|best-practice",
      "explanation": "<why_this_matters>"
    }
  ],
  "summary": "<brief_overall_assessment>",
  "severity": "low|medium|high"
}

Return ONLY valid JSON without markdown code blocks."#;

pub struct Analyzer {
    prompts: PromptConfig,
    generator: Arc<dyn Generator>,
}

impl Analyzer {
    pub fn new(prompts: PromptConfig, generator: Arc<dyn Generator>) -> Self {
        Self { prompts, generator }
    }

    /// Run one analysis: build the prompt, call the model once, parse the
    /// structured response. A parse failure is terminal and carries the raw
    /// response text.
    pub async fn analyze(&self, req: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let start = Instant::now();
        let language = req
            .language
            .clone()
            .unwrap_or_else(|| detect_language(&req.file_path).to_string());

        let prompt = self.build_prompt(req, &language);
        let text = self.generator.generate(&prompt).await?;
        let clean = strip_code_fences(&text);

        let output: ModelOutput =
            serde_json::from_str(clean).map_err(|source| AnalysisError::MalformedOutput {
                source,
                raw: text.clone(),
            })?;

        Ok(AnalysisResult {
            summary: output.summary,
            suggestions: output.suggestions,
            severity: output.severity,
            language,
            file_path: req.file_path.clone(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn build_prompt(&self, req: &AnalysisRequest, language: &str) -> String {
        let mut prompt = String::new();
        prompt.push_str(&self.prompts.base);
        prompt.push_str("\n\n");
        if let Some(block) = self.prompts.categories.get(language) {
            prompt.push_str(block);
            prompt.push_str("\n\n");
        }
        prompt.push_str(&format!(
            "File: {}\nLanguage: {}\n\nCode Diff:\n{}\n\n{}",
            req.file_path, language, req.content, OUTPUT_DIRECTIVE
        ));
        prompt
    }
}

/// Strip a wrapping markdown code fence (optionally tagged `json`) from a
/// model response before parsing.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest.strip_suffix("```").unwrap_or(rest)
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest.strip_suffix("```").unwrap_or(rest)
    } else {
        trimmed
    };
    inner.trim()
}

/// Map a file extension to its language category; "unknown" selects no
/// category block.
pub fn detect_language(file_path: &str) -> &'static str {
    let ext = file_path.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
    match ext {
        "go" => "go",
        "py" => "python",
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "java" => "java",
        "rb" => "ruby",
        "rs" => "rust",
        "c" => "c",
        "cpp" | "cc" | "cxx" => "cpp",
        "cs" => "csharp",
        "php" => "php",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "sh" => "bash",
        _ => "unknown",
    }
}
