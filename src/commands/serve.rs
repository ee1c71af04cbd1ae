//! Start the webhook listener

use eyre::{Context, Result};

use crate::config::Config;
use crate::handler::RequestHandler;
use crate::hook::HookRegistry;
use crate::hook::dispatch::Dispatcher;
use crate::policy::PolicySet;
use crate::secret;
use crate::server::{self, AppState};

/// Everything the listener needs, resolved before any socket is bound
pub fn prepare(config: &Config) -> Result<AppState> {
    let hooks = HookRegistry::discover(&config.hooks.dir)?;

    let secret = secret::get_secret(&config.secret.secrets_dir, &config.secret.name)
        .ok_or_else(|| eyre::eyre!("Must define {}", config.secret.name.to_uppercase()))?;

    if !config.secret.require {
        log::warn!("Webhook secret is loaded but not enforced; set secret.require to check it");
    }

    if std::env::var_os("WEBHOOK_BRANCH_LIST").is_some() {
        log::info!("WEBHOOK_BRANCH_LIST is ignored; untagged repositories allow policy.default_tags");
    }

    let policies = PolicySet::load(&config.policy.file, config.policy.default_tags.clone())?;
    if policies.is_empty() {
        log::warn!("No repositories configured; every push will be rejected");
    }

    let dispatcher = Dispatcher::new(config.hooks.timeout());
    let handler = RequestHandler::new(hooks, policies, dispatcher);

    Ok(AppState::new(handler, config.secret.require.then_some(secret)))
}

pub fn run(config: &Config) -> Result<()> {
    let state = prepare(config).inspect_err(|e| log::error!("{:#}", e))?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    log::info!("All systems operational, beginning application loop");
    runtime.block_on(server::serve(&config.server.bind, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::test_support::write_hook;
    use tempfile::tempdir;

    fn config_in(root: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.hooks.dir = root.join("hooks");
        config.secret.secrets_dir = root.join("secrets");
        config.secret.name = "dockhook_test_secret".to_string();
        config.policy.file = root.join("config.yml");
        std::fs::create_dir_all(&config.hooks.dir).unwrap();
        std::fs::create_dir_all(&config.secret.secrets_dir).unwrap();
        config
    }

    #[test]
    fn test_prepare_requires_hooks() {
        let temp = tempdir().unwrap();
        let config = config_in(temp.path());
        std::fs::write(config.secret.secrets_dir.join("dockhook_test_secret"), "s").unwrap();
        std::fs::write(&config.policy.file, "myrepo: {}\n").unwrap();

        let err = prepare(&config).err().unwrap();
        assert!(err.to_string().contains("No executable hook scripts"));
    }

    #[test]
    fn test_prepare_requires_secret() {
        let temp = tempdir().unwrap();
        let config = config_in(temp.path());
        write_hook(&config.hooks.dir, "a.sh", "true");
        std::fs::write(&config.policy.file, "myrepo: {}\n").unwrap();

        let err = prepare(&config).err().unwrap();
        assert!(err.to_string().contains("DOCKHOOK_TEST_SECRET"));
    }

    #[test]
    fn test_prepare_rejects_malformed_policy() {
        let temp = tempdir().unwrap();
        let config = config_in(temp.path());
        write_hook(&config.hooks.dir, "a.sh", "true");
        std::fs::write(config.secret.secrets_dir.join("dockhook_test_secret"), "s").unwrap();
        std::fs::write(&config.policy.file, "myrepo:\n  pushers: ci\n").unwrap();

        assert!(prepare(&config).is_err());
    }

    #[test]
    fn test_prepare_succeeds() {
        let temp = tempdir().unwrap();
        let config = config_in(temp.path());
        write_hook(&config.hooks.dir, "a.sh", "true");
        std::fs::write(config.secret.secrets_dir.join("dockhook_test_secret"), "s").unwrap();
        std::fs::write(&config.policy.file, "myrepo: {}\n").unwrap();

        assert!(prepare(&config).is_ok());
    }
}
