//! Result publishing.
//!
//! Renders a verdict (or a security warning) into markdown and posts it as a
//! pull-request comment. Rendering is pure and separately testable; only the
//! `CommentSink` trait does I/O.

use async_trait::async_trait;

use crate::analyzer::AnalysisResult;
use crate::config::SourceConfig;
use crate::error::PublishError;
use crate::rules::{Finding, Severity};

/// Where rendered comments go. The shipped implementation posts to the
/// source-control API; tests substitute an in-memory sink.
#[async_trait]
pub trait CommentSink: Send + Sync {
    async fn post_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), PublishError>;
}

/// Sink backed by the GitHub-style REST API (`issues/{n}/comments`).
pub struct HttpCommentSink {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl HttpCommentSink {
    pub fn new(cfg: &SourceConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("vetgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build reqwest client");
        Self {
            client,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
        }
    }
}

#[async_trait]
impl CommentSink for HttpCommentSink {
    async fn post_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), PublishError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_base, owner, repo, number
        );
        let mut req = self
            .client
            .post(&url)
            .header("accept", "application/vnd.github+json")
            .json(&serde_json::json!({ "body": body }));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PublishError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Threshold at which a verdict stops being an approval.
const BLOCKING_SEVERITY: Severity = Severity::High;
const MAX_APPROVED_SUGGESTIONS: usize = 5;

/// An analysis passes when its overall severity stays below the blocking
/// threshold and the suggestion count stays small.
pub fn is_approved(result: &AnalysisResult) -> bool {
    result.severity < BLOCKING_SEVERITY && result.suggestions.len() < MAX_APPROVED_SUGGESTIONS
}

fn severity_marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "[LOW]",
        Severity::Medium => "[MEDIUM]",
        Severity::High => "[HIGH]",
        Severity::Critical => "[CRITICAL]",
    }
}

/// Render the review verdict as a markdown comment.
pub fn build_review_comment(result: &AnalysisResult) -> String {
    let mut body = String::from("## Automated Code Review\n\n");
    if is_approved(result) {
        body.push_str("**Verdict: Approved**\n\n");
    } else {
        body.push_str("**Verdict: Changes Requested**\n\n");
    }
    body.push_str(&format!(
        "{} Overall severity: {}\n\n{}\n",
        severity_marker(result.severity),
        result.severity,
        result.summary
    ));

    if !result.suggestions.is_empty() {
        body.push_str("\n### Suggestions\n\n");
        for suggestion in &result.suggestions {
            let location = match suggestion.line {
                Some(line) => format!("line {line}"),
                None => "general".to_string(),
            };
            body.push_str(&format!(
                "- {} **{}** ({}): {}\n",
                severity_marker(suggestion.severity),
                suggestion.category,
                location,
                suggestion.message
            ));
            if !suggestion.explanation.is_empty() {
                body.push_str(&format!("  - {}\n", suggestion.explanation));
            }
        }
    }

    body.push_str(&format!(
        "\n---\n*Automated review; took {} ms. Sensitive values were redacted before analysis.*\n",
        result.processing_time_ms
    ));
    body
}

/// Render detected secrets/PII as a warning comment. Findings reference line
/// numbers and categories only; the matched text itself is never echoed.
pub fn build_security_comment(findings: &[Finding]) -> String {
    let mut body = String::from("## Security Warning\n\n");
    body.push_str(&format!(
        "This pull request appears to contain {} sensitive value(s). \
         Please remove them and rotate any exposed credentials.\n\n",
        findings.len()
    ));
    for finding in findings {
        body.push_str(&format!(
            "- {} **{}** (line {}): {}\n",
            severity_marker(finding.severity),
            finding.category,
            finding.line,
            finding.message
        ));
    }
    body.push_str(
        "\n---\n*Matched values were redacted before any further processing.*\n",
    );
    body
}
