//! External commands used as pipeline stages.

use crate::config::ToolCommand;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use thiserror::Error;

/// Error running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The program could not be started
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// Piping input or collecting output failed
    #[error("I/O error talking to '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The program exited unsuccessfully
    #[error("'{program}' exited with {status}: {stderr}")]
    Failed { program: String, status: String, stderr: String },
    /// The program wrote something other than UTF-8
    #[error("'{program}' produced non-UTF-8 output")]
    InvalidOutput { program: String },
}

/// Run `command` in `cwd`, feeding `input` on stdin; returns its stdout.
pub fn run_tool(command: &ToolCommand, input: &str, cwd: &Path) -> Result<String, ToolError> {
    let program = command.program.clone();
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ToolError::Spawn { program: program.clone(), source })?;

    // Feed stdin from its own thread so a chatty tool cannot fill its stdout
    // pipe while we are still writing.
    let stdin = child.stdin.take();
    let write_result = std::thread::scope(|s| {
        let writer = s.spawn(move || match stdin {
            Some(mut stdin) => stdin.write_all(input.as_bytes()),
            None => Ok(()),
        });
        let output = child.wait_with_output();
        let written = writer.join().unwrap_or(Ok(()));
        (output, written)
    });

    let output = write_result.0.map_err(|source| ToolError::Io { program: program.clone(), source })?;
    if !output.status.success() {
        return Err(ToolError::Failed {
            program,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    if let Err(source) = write_result.1 {
        if source.kind() != std::io::ErrorKind::BrokenPipe {
            return Err(ToolError::Io { program, source });
        }
    }

    String::from_utf8(output.stdout).map_err(|_| ToolError::InvalidOutput { program })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn tool(program: &str, args: &[&str]) -> ToolCommand {
        ToolCommand {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_run_tool_pipes_stdin_to_stdout() {
        let out = run_tool(&tool("cat", &[]), "for (const x of xs) {}\n", Path::new(".")).unwrap();
        assert_eq!(out, "for (const x of xs) {}\n");
    }

    #[test]
    fn test_run_tool_large_input() {
        let input = "x".repeat(1 << 20);
        let out = run_tool(&tool("cat", &[]), &input, Path::new(".")).unwrap();
        assert_eq!(out.len(), input.len());
    }

    #[test]
    fn test_run_tool_failure_status() {
        let err = run_tool(&tool("sh", &["-c", "echo bad >&2; exit 3"]), "", Path::new("."))
            .unwrap_err();
        match err {
            ToolError::Failed { stderr, .. } => assert_eq!(stderr, "bad"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_run_tool_missing_program() {
        let err = run_tool(&tool("crxpack-no-such-tool", &[]), "", Path::new(".")).unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }
}
