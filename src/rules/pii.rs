//! PII detection rules for free-form user content.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Rule, Severity};

pub static PII_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule {
            category: "email",
            pattern: Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap(),
            message: "Email address detected",
            severity: Severity::Medium,
        },
        Rule {
            category: "phone",
            pattern: Regex::new(r"(\+?1[-.]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap(),
            message: "Phone number detected",
            severity: Severity::Medium,
        },
        Rule {
            category: "ssn",
            pattern: Regex::new(r"\d{3}-\d{2}-\d{4}").unwrap(),
            message: "Social Security Number detected",
            severity: Severity::High,
        },
        Rule {
            category: "credit_card",
            pattern: Regex::new(r"\b(?:\d{4}[-\s]?){3}\d{4}\b").unwrap(),
            message: "Credit card number detected",
            severity: Severity::High,
        },
        Rule {
            category: "zipcode",
            pattern: Regex::new(r"\b\d{5}(?:-\d{4})?\b").unwrap(),
            message: "ZIP code detected",
            severity: Severity::Low,
        },
        Rule {
            category: "ip_address",
            pattern: Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap(),
            message: "IP address detected",
            severity: Severity::Low,
        },
    ]
});
