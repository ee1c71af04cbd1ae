//! Sequential hook execution

use indexmap::IndexMap;
use serde::Serialize;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

use super::HookScript;

const SPAWN_RETRIES: u32 = 5;

/// Captured result of running one hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookResult {
    pub stdout: String,
    pub stderr: String,
    /// `None` when killed by a signal, timed out or never spawned
    #[serde(skip)]
    pub exit_code: Option<i32>,
}

impl HookResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    fn not_run(message: String) -> Self {
        Self {
            stdout: String::new(),
            stderr: message,
            exit_code: None,
        }
    }
}

/// Results of the latest dispatch, keyed by hook path in run order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DispatchLog(IndexMap<String, HookResult>);

impl DispatchLog {
    pub fn insert(&mut self, key: String, result: HookResult) {
        self.0.insert(key, result);
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&HookResult> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HookResult)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Runs hooks one after another with the dispatch tag as the only argument
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Run every hook in order. A failing hook never stops the ones after it.
    pub async fn run(&self, hooks: &[HookScript], tag: &str) -> DispatchLog {
        let mut log = DispatchLog::default();

        for hook in hooks {
            log::info!("Running hook {} {}", hook.path.display(), tag);
            let result = self.run_one(hook, tag).await;

            if !result.success() {
                let status = result
                    .exit_code
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "none".to_string());
                log::error!("[{}]: {}\n{}", hook.path.display(), status, result.stderr);
            }

            log.insert(hook.key(), result);
        }

        log
    }

    async fn run_one(&self, hook: &HookScript, tag: &str) -> HookResult {
        let mut command = Command::new(&hook.path);
        command
            .arg(tag)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .process_group(0);

        let child = match spawn(&mut command).await {
            Ok(child) => child,
            Err(e) => return HookResult::not_run(format!("Failed to spawn hook: {}", e)),
        };
        let group = child.id();

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output,
                Err(_) => {
                    kill_group(group);
                    return HookResult::not_run(format!("Hook timed out after {}s", limit.as_secs_f64()));
                }
            },
            None => child.wait_with_output().await,
        };

        match output {
            Ok(output) => HookResult {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code(),
            },
            Err(e) => HookResult::not_run(format!("Failed to wait for hook: {}", e)),
        }
    }
}

/// SIGKILL the hook's process group so forked children die with it
fn kill_group(group: Option<u32>) {
    use rustix::process::{Pid, Signal, kill_process_group};

    let Some(id) = group else {
        return;
    };
    let Some(pid) = Pid::from_raw(id as i32) else {
        return;
    };
    if let Err(e) = kill_process_group(pid, Signal::KILL) {
        log::warn!("Failed to kill process group {}: {}", id, e);
    }
}

/// Spawn, retrying briefly while the script is still open for writing elsewhere
async fn spawn(command: &mut Command) -> std::io::Result<Child> {
    let mut attempt = 0;
    loop {
        match command.spawn() {
            Err(e) if e.kind() == ErrorKind::ExecutableFileBusy && attempt < SPAWN_RETRIES => {
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            result => return result,
        }
    }
}
