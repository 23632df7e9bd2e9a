use crate::config::PhpConfig;
use crate::errors::{FileError, FileErrorKind};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// `<?php ... ?>` and `<?= ... ?>` blocks, including one left open at EOF.
fn php_block_pattern() -> &'static Regex {
    static PHP_BLOCK: OnceLock<Regex> = OnceLock::new();
    PHP_BLOCK.get_or_init(|| {
        Regex::new(r"(?s)<\?(?:php|=)?.*?(?:\?>|\z)").expect("valid regex")
    })
}

/// String literals passed to `echo`; these often carry markup worth scanning.
fn echo_pattern() -> &'static Regex {
    static ECHO: OnceLock<Regex> = OnceLock::new();
    ECHO.get_or_init(|| {
        Regex::new(r#"(?s)echo\s+(?:"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')\s*;"#)
            .expect("valid regex")
    })
}

/// Static HTML extraction from PHP source: remove code blocks so the
/// surrounding markup survives, and additionally harvest markup from echoed
/// string literals inside those blocks.
pub fn strip_php_blocks(content: &str) -> String {
    let mut echoed = String::new();
    for caps in echo_pattern().captures_iter(content) {
        let literal = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or("");
        if !literal.is_empty() {
            echoed.push(' ');
            echoed.push_str(literal);
        }
    }

    let mut combined = php_block_pattern().replace_all(content, " ").into_owned();
    combined.push_str(&echoed);
    combined
}

/// Runs PHP files through the configured interpreter and captures their
/// stdout. Each invocation is bounded by a timeout; a hung script is killed
/// rather than stalling the run.
#[derive(Debug, Clone)]
pub struct PhpExecutor {
    path: String,
    timeout: Duration,
}

impl PhpExecutor {
    pub fn new(config: &PhpConfig) -> Self {
        Self {
            path: config.path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Probe the interpreter once up front. Returns the version line, or an
    /// error message when the binary is missing or broken.
    pub async fn check_installation(&self) -> std::result::Result<String, String> {
        let probe = Command::new(&self.path)
            .arg("--version")
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(Duration::from_secs(5), probe).await {
            Ok(Ok(output)) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .next()
                    .unwrap_or("")
                    .to_string();
                debug!(version = %version, "PHP interpreter found");
                Ok(version)
            }
            Ok(Ok(output)) => Err(format!(
                "'{} --version' exited with {}",
                self.path, output.status
            )),
            Ok(Err(e)) => Err(format!("PHP executable '{}' not found: {}", self.path, e)),
            Err(_) => Err(format!("'{} --version' timed out", self.path)),
        }
    }

    /// Execute one PHP file and return its rendered HTML stdout.
    pub async fn render(&self, file: &Path) -> std::result::Result<String, FileError> {
        let fail = |message: String| {
            FileError::new(file, FileErrorKind::DynamicExecutionFailure, message)
        };

        let script_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let document_root = file
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string());

        // Minimal CGI-ish environment so scripts reading request globals
        // render something instead of dying.
        let output = Command::new(&self.path)
            .arg(file)
            .env("REQUEST_URI", "/")
            .env("SCRIPT_NAME", script_name)
            .env("DOCUMENT_ROOT", document_root)
            .env("SERVER_NAME", "localhost")
            .env("HTTP_HOST", "localhost")
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, output).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(fail(format!("failed to invoke PHP: {}", e))),
            Err(_) => {
                warn!(file = %file.display(), "PHP execution timed out, killing");
                return Err(fail(format!(
                    "execution timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(fail(format!(
                "PHP exited with {}: {}",
                output.status,
                stderr.trim()
            )))
        }
    }
}
