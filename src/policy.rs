//! Per-repository push policy
//!
//! A policy file maps repository names to optional pusher and tag allow-lists:
//!
//! ```yaml
//! acme/web:
//!   pushers: [ci]
//!   tags: [latest, stable]
//! acme/worker: {}
//! ```
//!
//! The same mapping may also be nested under a top-level `repositories:` key.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::event::PushEvent;

/// Allow-lists for a single repository
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RepositoryPolicy {
    /// Pushers allowed to trigger hooks; any pusher when absent
    #[serde(default)]
    pub pushers: Option<Vec<String>>,
    /// Tags that trigger hooks; the default tag list when absent
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NestedPolicyFile {
    repositories: HashMap<String, Option<RepositoryPolicy>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PolicyFile {
    Nested(NestedPolicyFile),
    Flat(HashMap<String, Option<RepositoryPolicy>>),
}

/// Why an event was not allowed to dispatch
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("repository {} is not configured", or_absent(.0))]
    UnknownRepository(Option<String>),

    #[error("pusher {} is not allowed for {repository}", or_absent(.pusher))]
    PusherNotAllowed { repository: String, pusher: Option<String> },

    #[error("tag {} is not allowed for {repository}", or_absent(.tag))]
    TagNotAllowed { repository: String, tag: Option<String> },
}

/// All configured repository policies
#[derive(Debug, Clone)]
pub struct PolicySet {
    repositories: HashMap<String, RepositoryPolicy>,
    default_tags: Vec<String>,
}

impl PolicySet {
    pub fn new(repositories: HashMap<String, RepositoryPolicy>, default_tags: Vec<String>) -> Self {
        Self {
            repositories,
            default_tags,
        }
    }

    /// Load the policy file; unreadable or malformed files are an error
    pub fn load(path: &Path, default_tags: Vec<String>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read policy file {}", path.display()))?;

        let policies = Self::from_yaml(&content, default_tags)
            .wrap_err_with(|| format!("Failed to parse policy file {}", path.display()))?;

        log::info!(
            "Loaded {} repository policies from {}",
            policies.len(),
            path.display()
        );
        Ok(policies)
    }

    pub fn from_yaml(content: &str, default_tags: Vec<String>) -> Result<Self> {
        if content.trim().is_empty() {
            log::warn!("Policy file is empty; every event will be rejected");
            return Ok(Self::new(HashMap::new(), default_tags));
        }

        let file: PolicyFile = serde_yaml::from_str(content).context("Invalid repository policy")?;
        let entries = match file {
            PolicyFile::Nested(NestedPolicyFile { repositories }) => repositories,
            PolicyFile::Flat(repositories) => repositories,
        };

        // `repo:` with no body means "all defaults"
        let repositories = entries
            .into_iter()
            .map(|(name, policy)| (name, policy.unwrap_or_default()))
            .collect();

        Ok(Self::new(repositories, default_tags))
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    /// Decide whether `event` may dispatch, returning the tag to dispatch with.
    ///
    /// Checks run in order: repository, pusher, tag. The first failure wins.
    pub fn authorize(&self, event: &PushEvent) -> Result<String, Rejection> {
        let Some((repository, policy)) = event
            .repository
            .as_deref()
            .and_then(|name| self.repositories.get_key_value(name))
        else {
            return Err(Rejection::UnknownRepository(event.repository.clone()));
        };

        if let Some(pushers) = &policy.pushers {
            if !contains(pushers, event.pusher.as_deref()) {
                return Err(Rejection::PusherNotAllowed {
                    repository: repository.clone(),
                    pusher: event.pusher.clone(),
                });
            }
        }

        let tags = policy.tags.as_deref().unwrap_or(&self.default_tags);
        match event.tag.as_deref() {
            Some(tag) if contains(tags, Some(tag)) => Ok(tag.to_string()),
            _ => Err(Rejection::TagNotAllowed {
                repository: repository.clone(),
                tag: event.tag.clone(),
            }),
        }
    }
}

fn or_absent(value: &Option<String>) -> String {
    match value {
        Some(v) => format!("'{}'", v),
        None => "<absent>".to_string(),
    }
}

fn contains(list: &[String], value: Option<&str>) -> bool {
    value.is_some_and(|v| list.iter().any(|item| item == v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latest() -> Vec<String> {
        vec!["latest".to_string()]
    }

    fn policies(yaml: &str) -> PolicySet {
        PolicySet::from_yaml(yaml, latest()).unwrap()
    }

    #[test]
    fn test_unknown_repository_rejected_regardless_of_fields() {
        let set = policies("myrepo: {}\n");
        for event in [
            PushEvent::new(Some("other"), Some("ci"), Some("latest")),
            PushEvent::new(None, Some("ci"), Some("latest")),
            PushEvent::new(None, None, None),
        ] {
            assert!(matches!(set.authorize(&event), Err(Rejection::UnknownRepository(_))));
        }
    }

    #[test]
    fn test_no_pusher_list_allows_any_pusher() {
        let set = policies("myrepo:\n  tags: [latest]\n");
        for pusher in [Some("anyone"), Some(""), None] {
            let event = PushEvent::new(Some("myrepo"), pusher, Some("latest"));
            assert_eq!(set.authorize(&event), Ok("latest".to_string()));
        }
    }

    #[test]
    fn test_pusher_allow_list() {
        let set = policies("myrepo:\n  pushers: [alice]\n");

        let bob = PushEvent::new(Some("myrepo"), Some("bob"), Some("latest"));
        assert!(matches!(set.authorize(&bob), Err(Rejection::PusherNotAllowed { .. })));

        let nobody = PushEvent::new(Some("myrepo"), None, Some("latest"));
        assert!(matches!(set.authorize(&nobody), Err(Rejection::PusherNotAllowed { .. })));

        // alice passes the pusher check and is then judged on the tag
        let alice_bad_tag = PushEvent::new(Some("myrepo"), Some("alice"), Some("v2"));
        assert!(matches!(set.authorize(&alice_bad_tag), Err(Rejection::TagNotAllowed { .. })));

        let alice = PushEvent::new(Some("myrepo"), Some("alice"), Some("latest"));
        assert_eq!(set.authorize(&alice), Ok("latest".to_string()));
    }

    #[test]
    fn test_default_tag_list_is_latest() {
        let set = policies("myrepo: {}\n");
        assert!(set.authorize(&PushEvent::new(Some("myrepo"), None, Some("latest"))).is_ok());
        assert!(matches!(
            set.authorize(&PushEvent::new(Some("myrepo"), None, Some("v2"))),
            Err(Rejection::TagNotAllowed { .. })
        ));
        assert!(matches!(
            set.authorize(&PushEvent::new(Some("myrepo"), None, None)),
            Err(Rejection::TagNotAllowed { .. })
        ));
    }

    #[test]
    fn test_configured_default_tags() {
        let set = PolicySet::from_yaml("myrepo:\n", vec!["main".to_string(), "stable".to_string()]).unwrap();
        assert!(set.authorize(&PushEvent::new(Some("myrepo"), None, Some("stable"))).is_ok());
        assert!(set.authorize(&PushEvent::new(Some("myrepo"), None, Some("latest"))).is_err());
    }

    #[test]
    fn test_declared_tags_replace_default() {
        let set = policies("myrepo:\n  tags: [v2]\n");
        assert_eq!(
            set.authorize(&PushEvent::new(Some("myrepo"), None, Some("v2"))),
            Ok("v2".to_string())
        );
        assert!(set.authorize(&PushEvent::new(Some("myrepo"), None, Some("latest"))).is_err());
    }

    #[test]
    fn test_check_order_repository_then_pusher_then_tag() {
        let set = policies("myrepo:\n  pushers: [ci]\n  tags: [latest]\n");
        let event = PushEvent::new(Some("myrepo"), Some("bob"), Some("staging"));
        assert!(matches!(set.authorize(&event), Err(Rejection::PusherNotAllowed { .. })));
    }

    #[test]
    fn test_no_partial_matches() {
        let set = policies("acme/web:\n  pushers: [ci]\n  tags: [latest]\n");
        assert!(set.authorize(&PushEvent::new(Some("acme/we"), Some("ci"), Some("latest"))).is_err());
        assert!(set.authorize(&PushEvent::new(Some("acme/web"), Some("CI"), Some("latest"))).is_err());
        assert!(set.authorize(&PushEvent::new(Some("acme/web"), Some("ci"), Some("latest "))).is_err());
    }

    #[test]
    fn test_authorize_is_repeatable() {
        let set = policies("myrepo:\n  pushers: [ci]\n");
        let event = PushEvent::new(Some("myrepo"), Some("ci"), Some("staging"));
        let first = set.authorize(&event);
        for _ in 0..3 {
            assert_eq!(set.authorize(&event), first);
        }
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            Rejection::UnknownRepository(None).to_string(),
            "repository <absent> is not configured"
        );
        let rejection = Rejection::TagNotAllowed {
            repository: "myrepo".to_string(),
            tag: Some("v2".to_string()),
        };
        assert_eq!(rejection.to_string(), "tag 'v2' is not allowed for myrepo");
    }

    #[test]
    fn test_nested_repositories_key() {
        let set = policies("repositories:\n  myrepo:\n    pushers: [ci]\n");
        assert_eq!(set.len(), 1);
        assert!(set.authorize(&PushEvent::new(Some("myrepo"), Some("ci"), Some("latest"))).is_ok());
    }

    #[test]
    fn test_repositories_key_mixed_with_flat_entries_is_error() {
        let yaml = "repositories:\n  myrepo: {}\nother:\n  tags: [latest]\n";
        assert!(PolicySet::from_yaml(yaml, latest()).is_err());
    }

    #[test]
    fn test_empty_policy_rejects_everything() {
        let set = policies("");
        assert!(set.is_empty());
        assert!(set.authorize(&PushEvent::new(Some("myrepo"), None, Some("latest"))).is_err());
    }

    #[test]
    fn test_malformed_policy_is_error() {
        assert!(PolicySet::from_yaml("myrepo:\n  pushers: ci\n", latest()).is_err());
        assert!(PolicySet::from_yaml("- just\n- a list\n", latest()).is_err());
        assert!(PolicySet::from_yaml("myrepo:\n  branches: [main]\n", latest()).is_err());
    }
}
