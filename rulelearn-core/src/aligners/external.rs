use super::TreeAligner;
use crate::error::{AlignerError, AlignmentError};
use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use tracing::info;

/// Pipes the corpus through a tree-aligner executable, one line per sentence.
pub struct ExternalTreeAligner {
    binary: PathBuf,
    args: Vec<String>,
}

impl ExternalTreeAligner {
    pub fn new(binary: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            args,
        }
    }

    fn program(&self) -> String {
        self.binary.display().to_string()
    }
}

impl TreeAligner for ExternalTreeAligner {
    fn align(&self, lines: &[String]) -> Result<Vec<String>> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }
        info!(program = %self.program(), sentences = lines.len(), "running tree aligner");

        let mut child = Command::new(&self.binary)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| AlignerError::Spawn {
                program: self.program(),
                source,
            })?;

        let mut input = lines.join("\n");
        input.push('\n');
        let stdin = child.stdin.take();
        // feed stdin from another thread so a full stdout pipe cannot stall us
        let writer = thread::spawn(move || -> std::io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(input.as_bytes())?;
            }
            Ok(())
        });

        let output = child.wait_with_output().map_err(|e| AlignerError::Unreadable {
            program: self.program(),
            reason: e.to_string(),
        })?;
        let write_result = writer.join();

        if !output.status.success() {
            return Err(AlignerError::ExitStatus {
                program: self.program(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        match write_result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(AlignerError::Unreadable {
                    program: self.program(),
                    reason: format!("writing input: {e}"),
                }
                .into())
            }
            Err(_) => {
                return Err(AlignerError::Unreadable {
                    program: self.program(),
                    reason: "input writer panicked".to_string(),
                }
                .into())
            }
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| AlignerError::Unreadable {
            program: self.program(),
            reason: e.to_string(),
        })?;
        let result: Vec<String> = stdout.lines().map(str::to_string).collect();
        if result.len() != lines.len() {
            return Err(AlignmentError::SentenceCountMismatch {
                expected: lines.len(),
                got: result.len(),
            }
            .into());
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "external"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn passes_lines_through_the_process() {
        let aligner = ExternalTreeAligner::new("cat", vec![]);
        let lines = vec!["2 L0 [ ] ( ) R1 [ ] ( )".to_string(), "0".to_string()];
        assert_eq!(aligner.align(&lines).unwrap(), lines);
    }

    #[test]
    fn line_count_mismatch_is_fatal() {
        let aligner = ExternalTreeAligner::new("head", vec!["-n".into(), "1".into()]);
        let lines = vec!["a".to_string(), "b".to_string()];
        let err = aligner.align(&lines).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AlignmentError>(),
            Some(&AlignmentError::SentenceCountMismatch { expected: 2, got: 1 })
        );
    }

    #[test]
    fn non_zero_exit_is_fatal() {
        let aligner = ExternalTreeAligner::new("false", vec![]);
        let err = aligner.align(&["x".to_string()]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AlignerError>(),
            Some(AlignerError::ExitStatus { .. })
        ));
    }
}
