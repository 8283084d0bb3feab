use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;

/// A fully specified external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; generators resolve their own config relative to it.
    pub cwd: PathBuf,
}

impl CommandSpec {
    /// Build a spec from a command prefix (`["uv", "run", "pydantic2ts"]`)
    /// followed by `args`. Returns `None` for an empty prefix.
    pub fn from_prefix(prefix: &[String], args: Vec<String>, cwd: PathBuf) -> Option<Self> {
        let (program, leading) = prefix.split_first()?;
        let mut all = leading.to_vec();
        all.extend(args);
        Some(Self {
            program: program.clone(),
            args: all,
            cwd,
        })
    }

    /// Shell-like rendering for log lines.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external commands to completion.
///
/// The production implementation spawns real processes; tests substitute a
/// recorder so generator invocations can be counted without the external tools.
pub trait CommandRunner {
    fn run(&self, spec: &CommandSpec) -> impl Future<Output = std::io::Result<ProcessOutput>>;
}

/// Spawns commands with `tokio::process`, capturing stdout and stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRunner;

impl CommandRunner for TokioRunner {
    async fn run(&self, spec: &CommandSpec) -> std::io::Result<ProcessOutput> {
        tracing::debug!(cwd = %spec.cwd.display(), "running {}", spec.display());
        let output = tokio::process::Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(Stdio::null())
            .output()
            .await?;

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_prefix_splits_program() {
        let prefix = vec!["uv".to_string(), "run".to_string(), "pydantic2ts".to_string()];
        let spec =
            CommandSpec::from_prefix(&prefix, vec!["--module".into(), "a.py".into()], ".".into())
                .unwrap();
        assert_eq!(spec.program, "uv");
        assert_eq!(spec.args, vec!["run", "pydantic2ts", "--module", "a.py"]);
        assert_eq!(spec.display(), "uv run pydantic2ts --module a.py");
    }

    #[test]
    fn test_from_prefix_empty_is_none() {
        assert!(CommandSpec::from_prefix(&[], vec![], ".".into()).is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tokio_runner_captures_exit_code_and_stderr() {
        let spec = CommandSpec {
            program: "sh".into(),
            args: vec!["-c".into(), "echo oops >&2; exit 3".into()],
            cwd: std::env::temp_dir(),
        };
        let out = TokioRunner.run(&spec).await.unwrap();
        assert_eq!(out.code, Some(3));
        assert!(!out.success());
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_tokio_runner_missing_program_is_io_error() {
        let spec = CommandSpec {
            program: "model2ts-definitely-not-installed".into(),
            args: vec![],
            cwd: std::env::temp_dir(),
        };
        assert!(TokioRunner.run(&spec).await.is_err());
    }
}
