use crate::data::SnippetRunner;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const IMPLEMENTATION_STEM: &str = "temp_function";
const TEST_STEM: &str = "temp_test";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Variables passed through to generated code. Everything else, credentials
/// included, is stripped from the child environment.
const FORWARDED_ENV: [&str; 3] = ["PATH", "HOME", "LANG"];

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to spawn {interpreter}: {source}")]
    Spawn {
        interpreter: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to wait for {interpreter}: {source}")]
    Wait {
        interpreter: String,
        #[source]
        source: io::Error,
    },
    #[error("{file} exited with {status}")]
    Failed { file: String, status: ExitStatus },
    #[error("{file} did not finish within {}s and was killed", .after.as_secs_f64())]
    TimedOut { file: String, after: Duration },
}

/// Which transient file a snippet is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetRole {
    Implementation,
    Test,
}

/// Runs snippets with an external interpreter through two reused transient files.
///
/// The files live in `work_dir` and are overwritten on every call; nothing cleans
/// them up afterwards. Each child runs with a scrubbed environment, null stdin and
/// a wall-clock timeout, and is killed if it is still running when we stop waiting.
#[derive(Debug, Clone)]
pub struct CodeExecutor {
    interpreter: String,
    extension: String,
    work_dir: PathBuf,
    timeout: Duration,
}

impl CodeExecutor {
    /// Creates a new CodeExecutor
    ///
    /// # Arguments
    /// * `interpreter` - Program invoked with the snippet file as its only argument
    /// * `extension` - Extension of the transient files, without the dot
    /// * `work_dir` - Optional directory for the transient files (defaults to ".")
    /// * `timeout` - Wall-clock limit for each interpreter run
    pub fn new(
        interpreter: impl Into<String>,
        extension: impl Into<String>,
        work_dir: Option<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            extension: extension.into(),
            work_dir: work_dir.unwrap_or_else(|| PathBuf::from(".")),
            timeout,
        }
    }

    pub fn file_name(&self, role: SnippetRole) -> String {
        let stem = match role {
            SnippetRole::Implementation => IMPLEMENTATION_STEM,
            SnippetRole::Test => TEST_STEM,
        };
        format!("{}.{}", stem, self.extension)
    }

    pub fn path_for(&self, role: SnippetRole) -> PathBuf {
        self.work_dir.join(self.file_name(role))
    }

    /// Writes `source` to the role's transient file and runs the interpreter on it
    pub fn run(&self, role: SnippetRole, source: &str) -> Result<(), ExecutionError> {
        let file = self.file_name(role);
        let path = self.work_dir.join(&file);

        fs::write(&path, source).map_err(|source| ExecutionError::Write {
            path: path.clone(),
            source,
        })?;

        let mut command = Command::new(&self.interpreter);
        command
            .arg(&file)
            .current_dir(&self.work_dir)
            .env_clear()
            .stdin(Stdio::null());
        command.envs(forwarded_env(|key| env::var_os(key)));

        tracing::debug!("Running {} {} in {}", self.interpreter, file, self.work_dir.display());

        let child = command.spawn().map_err(|source| ExecutionError::Spawn {
            interpreter: self.interpreter.clone(),
            source,
        })?;
        let mut child = ScopedChild(child);

        // A timeout too large to represent as an instant means no deadline
        let deadline = Instant::now().checked_add(self.timeout);
        loop {
            match child.0.try_wait() {
                Ok(Some(status)) if status.success() => return Ok(()),
                Ok(Some(status)) => return Err(ExecutionError::Failed { file, status }),
                Ok(None) if deadline.is_some_and(|deadline| Instant::now() >= deadline) => {
                    return Err(ExecutionError::TimedOut {
                        file,
                        after: self.timeout,
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    return Err(ExecutionError::Wait {
                        interpreter: self.interpreter.clone(),
                        source,
                    });
                }
            }
        }
    }
}

impl SnippetRunner for CodeExecutor {
    fn execute(&self, implementation: &str, test: &str) -> bool {
        let result = self
            .run(SnippetRole::Implementation, implementation)
            .inspect(|_| tracing::info!("Code executed successfully."))
            .and_then(|_| self.run(SnippetRole::Test, test))
            .inspect(|_| tracing::info!("Code passed test case."));

        match result {
            Ok(()) => false,
            Err(e) => {
                tracing::warn!("Code or test failed: {}", e);
                tracing::warn!("Setting retry to true");
                true
            }
        }
    }
}

/// The subset of the parent environment handed to generated code
fn forwarded_env<F>(lookup: F) -> Vec<(&'static str, OsString)>
where
    F: Fn(&str) -> Option<OsString>,
{
    FORWARDED_ENV
        .into_iter()
        .filter_map(|key| lookup(key).map(|value| (key, value)))
        .collect()
}

/// Kills and reaps the child if it is still running when dropped
struct ScopedChild(Child);

impl Drop for ScopedChild {
    fn drop(&mut self) {
        if let Ok(None) = self.0.try_wait() {
            let _ = self.0.kill();
            let _ = self.0.wait();
        }
    }
}
