//! Dry-run a push event against the repository policy

use colored::*;
use eyre::Result;

use crate::config::Config;
use crate::event::PushEvent;
use crate::policy::PolicySet;

pub fn run(repository: Option<&str>, pusher: Option<&str>, tag: Option<&str>, config: &Config) -> Result<()> {
    let policies = PolicySet::load(&config.policy.file, config.policy.default_tags.clone())?;
    let event = PushEvent::new(repository, pusher, tag);

    match policies.authorize(&event) {
        Ok(tag) => {
            println!("{} would dispatch hooks with tag {}", "✓".green(), tag.cyan());
            Ok(())
        }
        Err(rejection) => {
            println!("{} rejected: {}", "✗".red(), rejection);
            eyre::bail!("Push would be rejected")
        }
    }
}
