//! Webhook event classification.
//!
//! A pure decision function over the event type header and the already
//! received payload bytes: no I/O happens here. Only the fields needed for
//! processing are captured; unknown payload fields are ignored.

use serde::{Deserialize, Serialize};

/// One-time liveness event sent by the webhook sender on registration.
pub const HANDSHAKE_EVENT: &str = "ping";

const PULL_REQUEST_EVENT: &str = "pull_request";

/// Actions that trigger processing. Everything else is acknowledged and
/// ignored.
const PROCESS_ACTIONS: [&str; 2] = ["opened", "synchronize"];

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Account {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Repository {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub owner: Account,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Branch {
    #[serde(default, rename = "ref")]
    pub ref_name: String,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Account,
    #[serde(default)]
    pub head: Branch,
}

/// The typed domain event for an inbound pull request delivery. Its lifetime
/// ends once handed to the detached pipeline; nothing is persisted.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PullRequestEvent {
    #[serde(default)]
    pub action: String,
    pub pull_request: PullRequest,
    pub repository: Repository,
}

/// Outcome of classifying an inbound delivery.
#[derive(Debug)]
pub enum Decision {
    /// Liveness event; acknowledge with a fixed response, no processing.
    Handshake,
    /// Acknowledged but not processed, with the reason (foreign event type
    /// or out-of-allow-list action).
    Ignore(String),
    /// Authenticated, correctly typed and allow-listed; hand off to the
    /// async dispatcher.
    Process(PullRequestEvent),
}

/// Classify a delivery from its type tag and payload. A handshake always
/// wins regardless of payload contents; foreign event types are ignored;
/// a structurally invalid pull-request payload is a parse error (the
/// handler maps it to 400).
pub fn classify(event_type: &str, payload: &[u8]) -> Result<Decision, serde_json::Error> {
    if event_type == HANDSHAKE_EVENT {
        return Ok(Decision::Handshake);
    }
    if event_type != PULL_REQUEST_EVENT {
        return Ok(Decision::Ignore(format!("{event_type} event")));
    }

    let event: PullRequestEvent = serde_json::from_slice(payload)?;
    if !PROCESS_ACTIONS.contains(&event.action.as_str()) {
        return Ok(Decision::Ignore(event.action));
    }
    Ok(Decision::Process(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pr_payload(action: &str) -> Vec<u8> {
        json!({
            "action": action,
            "pull_request": {
                "number": 42,
                "title": "Add feature",
                "body": "Description",
                "user": {"login": "octocat"},
                "head": {"ref": "feature-branch"}
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

    #[test]
    fn ping_is_always_handshake() {
        assert!(matches!(
            classify("ping", b"{}").unwrap(),
            Decision::Handshake
        ));
        // Payload contents are irrelevant, even garbage.
        assert!(matches!(
            classify("ping", b"not json at all").unwrap(),
            Decision::Handshake
        ));
    }

    #[test]
    fn foreign_event_type_is_ignored() {
        match classify("push", &pr_payload("opened")).unwrap() {
            Decision::Ignore(reason) => assert_eq!(reason, "push event"),
            other => panic!("expected ignore, got {other:?}"),
        }
    }

    #[test]
    fn closed_action_is_ignored_with_action_as_reason() {
        match classify("pull_request", &pr_payload("closed")).unwrap() {
            Decision::Ignore(reason) => assert_eq!(reason, "closed"),
            other => panic!("expected ignore, got {other:?}"),
        }
    }

    #[test]
    fn opened_and_synchronize_are_processed() {
        for action in ["opened", "synchronize"] {
            match classify("pull_request", &pr_payload(action)).unwrap() {
                Decision::Process(event) => {
                    assert_eq!(event.action, action);
                    assert_eq!(event.pull_request.number, 42);
                    assert_eq!(event.repository.full_name, "acme/widgets");
                }
                other => panic!("expected process, got {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_pull_request_payload_is_an_error() {
        assert!(classify("pull_request", b"{not json").is_err());
        // Structurally wrong: missing pull_request object entirely.
        assert!(classify("pull_request", br#"{"action":"opened"}"#).is_err());
    }
}
