// Shared harness; not every test binary uses every helper.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;

use vetgate::analyzer::PromptConfig;
use vetgate::error::{FetchError, GenerationError, PublishError};
use vetgate::fetch::DiffFetcher;
use vetgate::llm::Generator;
use vetgate::publish::CommentSink;
use vetgate::{app, AppConfig, AppState, LlmConfig, SourceConfig};

pub const TEST_SECRET: &str = "integration-test-secret";

/// Config for tests, bypassing the environment entirely.
pub fn test_config(webhook_secret: Option<&str>) -> AppConfig {
    AppConfig {
        webhook_secret: webhook_secret.map(|s| s.to_string()),
        llm: LlmConfig {
            api_key: "test-key".to_string(),
            api_base: "http://127.0.0.1:1".to_string(),
            model: "test-model".to_string(),
            timeout_ms: None,
        },
        source: SourceConfig {
            api_base: "http://127.0.0.1:1".to_string(),
            token: None,
        },
        prompts: PromptConfig::default(),
        max_request_bytes: None,
    }
}

/// Fetcher double returning a fixed diff.
pub struct MockFetcher {
    pub diff: String,
}

#[async_trait]
impl DiffFetcher for MockFetcher {
    async fn fetch_diff(&self, _: &str, _: &str, _: u64) -> Result<String, FetchError> {
        Ok(self.diff.clone())
    }
}

/// Generator double: records every prompt, optionally sleeps to simulate a
/// slow model, then replays a canned response.
pub struct MockGenerator {
    pub response: String,
    pub delay: Option<Duration>,
    pub prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn slow(response: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(response)
        }
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.response.clone())
    }
}

/// Sink double collecting every posted comment body.
#[derive(Default)]
pub struct RecordingSink {
    pub comments: Mutex<Vec<String>>,
}

#[async_trait]
impl CommentSink for RecordingSink {
    async fn post_comment(&self, _: &str, _: &str, _: u64, body: &str) -> Result<(), PublishError> {
        self.comments.lock().unwrap().push(body.to_string());
        Ok(())
    }
}

impl RecordingSink {
    /// Wait until `count` comments arrived (the pipeline runs detached, so
    /// tests have to poll).
    pub async fn wait_for_comments(&self, count: usize, timeout: Duration) -> Vec<String> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            {
                let comments = self.comments.lock().unwrap();
                if comments.len() >= count {
                    return comments.clone();
                }
            }
            if tokio::time::Instant::now() >= deadline {
                let comments = self.comments.lock().unwrap();
                panic!(
                    "expected {} comments within {:?}, got {}",
                    count,
                    timeout,
                    comments.len()
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// A minimal model response every test can share.
pub const CLEAN_VERDICT: &str = r#"{"summary":"No issues found.","suggestions":[],"severity":"low"}"#;

/// Bind the app on an ephemeral port and serve it in the background.
pub async fn spawn_app(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(state);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Convenience wiring: app backed entirely by in-memory doubles.
pub struct TestHarness {
    pub addr: SocketAddr,
    pub generator: Arc<MockGenerator>,
    pub sink: Arc<RecordingSink>,
}

pub async fn spawn_with_doubles(
    webhook_secret: Option<&str>,
    diff: &str,
    generator: MockGenerator,
) -> TestHarness {
    let generator = Arc::new(generator);
    let sink = Arc::new(RecordingSink::default());
    let state = AppState::new(
        &test_config(webhook_secret),
        Arc::new(MockFetcher {
            diff: diff.to_string(),
        }),
        generator.clone(),
        sink.clone(),
    );
    let addr = spawn_app(state).await;
    TestHarness {
        addr,
        generator,
        sink,
    }
}

/// A well-formed pull_request payload.
pub fn pr_payload(action: &str, number: u64) -> Vec<u8> {
    serde_json::json!({
        "action": action,
        "pull_request": {
            "number": number,
            "title": "Add feature",
            "user": {"login": "octocat"},
            "head": {"ref": "feature"}
        },
        "repository": {
            "name": "widgets",
            "full_name": "acme/widgets",
            "owner": {"login": "acme"}
        }
    })
    .to_string()
    .into_bytes()
}
