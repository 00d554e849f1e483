//! Secret detection rules for source code and diffs.
//!
//! Passwords and private keys sit a severity tier above keys and tokens:
//! a leaked credential is immediately exploitable, a leaked key is usually
//! scoped.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Rule, Severity};

pub static SECRET_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule {
            category: "api_key",
            pattern: Regex::new(
                r#"(?i)(api[_-]?key|apikey|api[_-]?secret)\s*[=:]\s*["']?([a-zA-Z0-9_\-]{20,})["']?"#,
            )
            .unwrap(),
            message: "Potential API key detected",
            severity: Severity::Medium,
        },
        Rule {
            category: "api_key",
            // OpenAI
            pattern: Regex::new(r"sk-[a-zA-Z0-9]{20,}").unwrap(),
            message: "OpenAI API key detected",
            severity: Severity::Medium,
        },
        Rule {
            category: "api_key",
            // AWS
            pattern: Regex::new(r"AKIA[0-9A-Z]{16}").unwrap(),
            message: "AWS access key detected",
            severity: Severity::Medium,
        },
        Rule {
            category: "token",
            pattern: Regex::new(
                r#"(?i)(token|bearer)\s*[=:]\s*["']?([a-zA-Z0-9_\-.]{20,})["']?"#,
            )
            .unwrap(),
            message: "Potential authentication token detected",
            severity: Severity::Medium,
        },
        Rule {
            category: "token",
            // GitHub
            pattern: Regex::new(r"ghp_[a-zA-Z0-9]{36}").unwrap(),
            message: "GitHub personal access token detected",
            severity: Severity::Medium,
        },
        Rule {
            category: "password",
            pattern: Regex::new(r#"(?i)(password|passwd|pwd)\s*[=:]\s*["']([^"'\s]{8,})["']"#)
                .unwrap(),
            message: "Hardcoded password detected",
            severity: Severity::High,
        },
        Rule {
            category: "private_key",
            pattern: Regex::new(r"-----BEGIN\s+(RSA\s+)?PRIVATE\s+KEY-----").unwrap(),
            message: "Private key detected",
            severity: Severity::Critical,
        },
        Rule {
            category: "connection_string",
            pattern: Regex::new(r"(?i)(postgres|mysql|mongodb)://[^\s]*:[^\s]*@").unwrap(),
            message: "Database connection string with credentials detected",
            severity: Severity::High,
        },
    ]
});
