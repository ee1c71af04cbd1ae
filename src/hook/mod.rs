//! Hook script discovery
//!
//! Hooks are executables living in a single directory. They are collected once
//! at startup, in file name order, and never reloaded.

use eyre::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub mod dispatch;

/// An executable hook script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookScript {
    pub name: String,
    pub path: PathBuf,
}

impl HookScript {
    /// Key used for this hook in dispatch logs
    pub fn key(&self) -> String {
        self.path.display().to_string()
    }
}

/// The ordered, immutable set of hooks found at startup
#[derive(Debug, Clone)]
pub struct HookRegistry {
    dir: PathBuf,
    hooks: Vec<HookScript>,
}

impl HookRegistry {
    /// Collect the executable files in `dir`, sorted by file name.
    ///
    /// Fails when the directory can't be read or holds no executable hooks.
    pub fn discover<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let hooks = scan(dir)?;

        if hooks.is_empty() {
            eyre::bail!(
                "No executable hook scripts found in {}; did you forget to mount them or chmod +x them?",
                dir.display()
            );
        }

        for hook in &hooks {
            log::info!("Registered hook: {}", hook.path.display());
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            hooks,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn hooks(&self) -> &[HookScript] {
        &self.hooks
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }
}

fn scan(dir: &Path) -> Result<Vec<HookScript>> {
    // Join onto an absolute base so log keys are stable across cwd changes
    let base = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());

    let mut names = Vec::new();
    for entry in fs::read_dir(&base).with_context(|| format!("Failed to read hooks directory {}", base.display()))? {
        let entry = entry?;
        names.push(entry.file_name());
    }
    names.sort();

    let mut hooks = Vec::new();
    for name in names {
        let path = base.join(&name);

        if !path.is_file() {
            continue;
        }

        if !is_executable(&path) {
            log::debug!("Skipping non-executable file: {}", path.display());
            continue;
        }

        hooks.push(HookScript {
            name: name.to_string_lossy().to_string(),
            path,
        });
    }

    Ok(hooks)
}

/// Executable by this process under its effective uid/gid
fn is_executable(path: &Path) -> bool {
    use rustix::fs::{Access, AtFlags, CWD, accessat};

    accessat(CWD, path, Access::EXEC_OK, AtFlags::EACCESS).is_ok()
}
