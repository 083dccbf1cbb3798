//! Captured output of a query tool

use std::time::Duration;

/// Exit status and output of a finished program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit status code, -1 when killed by a signal
    pub status: i32,
    /// Standard output, decoded lossily as UTF-8
    pub stdout: String,
    /// Standard error, decoded lossily as UTF-8
    pub stderr: String,
    /// Wall-clock run time
    pub elapsed: Duration,
}

impl CommandResult {
    /// Successful result carrying only `stdout`
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Check if command succeeded (exit code 0)
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Non-blank stdout lines, trimmed
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().map(str::trim).filter(|line| !line.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_skip_blanks() {
        let result = CommandResult::ok("gimp:x86_64\n\n  gimp-libs:x86_64  \n");
        assert!(result.success());
        assert_eq!(
            result.lines().collect::<Vec<_>>(),
            vec!["gimp:x86_64", "gimp-libs:x86_64"]
        );
    }
}
