//! Shared secret lookup
//!
//! Secrets come from a Docker secret file first, then from the environment
//! variable named after the secret in upper case.

use std::path::Path;

/// Read the named secret from `secrets_dir` or the environment
pub fn get_secret(secrets_dir: &Path, name: &str) -> Option<String> {
    lookup_secret(secrets_dir, name, |key| std::env::var(key).ok())
}

fn lookup_secret<F>(secrets_dir: &Path, name: &str, env: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let secret_path = secrets_dir.join(name);

    match std::fs::read_to_string(&secret_path) {
        // Editors like to leave a trailing newline
        Ok(content) => Some(content.trim().to_string()),
        Err(e) => {
            let variable = name.to_uppercase();
            log::debug!(
                "Can't read secret {} from {} ({}), falling back to ${}",
                name,
                secret_path.display(),
                e,
                variable
            );
            env(&variable)
        }
    }
}
