//! Inbound push event decoding

use serde_json::Value;

/// A registry push notification, reduced to the fields policy looks at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushEvent {
    pub repository: Option<String>,
    pub pusher: Option<String>,
    pub tag: Option<String>,
}

impl PushEvent {
    pub fn new(repository: Option<&str>, pusher: Option<&str>, tag: Option<&str>) -> Self {
        Self {
            repository: repository.map(String::from),
            pusher: pusher.map(String::from),
            tag: tag.map(String::from),
        }
    }

    /// Extract the event from a Docker Hub style payload.
    ///
    /// Missing, null and non-string fields all decode as absent.
    pub fn from_payload(payload: &Value) -> Self {
        let field = |section: &str, key: &str| {
            payload
                .get(section)
                .and_then(|v| v.get(key))
                .and_then(|v| v.as_str())
                .map(String::from)
        };

        Self {
            repository: field("repository", "repo_name"),
            pusher: field("push_data", "pusher"),
            tag: field("push_data", "tag"),
        }
    }

    /// Decode a raw request body; anything that isn't JSON yields an empty event
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(payload) => Self::from_payload(&payload),
            Err(e) => {
                log::debug!("Undecodable push payload: {}", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_docker_hub_payload() {
        let payload = json!({
            "callback_url": "https://registry.hub.docker.com/u/acme/web/hook/abc/",
            "push_data": {"pushed_at": 1417566161, "pusher": "ci", "tag": "latest"},
            "repository": {"repo_name": "acme/web", "namespace": "acme", "name": "web"}
        });

        let event = PushEvent::from_payload(&payload);
        assert_eq!(event, PushEvent::new(Some("acme/web"), Some("ci"), Some("latest")));
    }

    #[test]
    fn test_missing_sections_are_absent() {
        let event = PushEvent::from_payload(&json!({"push_data": {"tag": "v1"}}));
        assert_eq!(event.repository, None);
        assert_eq!(event.pusher, None);
        assert_eq!(event.tag.as_deref(), Some("v1"));
    }

    #[test]
    fn test_null_and_non_string_fields_are_absent() {
        let payload = json!({
            "repository": {"repo_name": null},
            "push_data": {"pusher": 42, "tag": ["latest"]}
        });
        assert_eq!(PushEvent::from_payload(&payload), PushEvent::default());
    }

    #[test]
    fn test_garbage_body_is_empty_event() {
        assert_eq!(PushEvent::from_body(b"not json"), PushEvent::default());
        assert_eq!(PushEvent::from_body(b""), PushEvent::default());
        assert_eq!(PushEvent::from_body(b"[1, 2]"), PushEvent::default());
    }
}
