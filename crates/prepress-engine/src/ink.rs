// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ink-coverage probing.
//
// `InkCoverageProbe` is the capability the color decision depends on. The
// production implementation shells out to Ghostscript's `inkcov` device; the
// null implementation reports the tool as unavailable so callers fall back
// to the structural verdict.

use std::future::Future;
use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use prepress_core::PageInkCoverage;
use prepress_core::error::{PreflightError, Result};
use tokio::process::Command;
use tokio::sync::{OnceCell, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

/// How long the one-off `--version` check may take.
const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Keep at most this much of a failing tool's stderr in the error.
const STDERR_TAIL: usize = 200;

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Measures per-page process ink usage of a PDF.
pub trait InkCoverageProbe: Send + Sync {
    /// Short tool name for logs and notes.
    fn name(&self) -> &str;

    /// Whether the tool can be invoked at all.
    fn is_available(&self) -> impl Future<Output = bool> + Send;

    /// Coverage of the first `max_pages` pages, in page order.
    ///
    /// Callers bound this with a timeout; dropping the future must release
    /// every resource it holds.
    fn measure(
        &self,
        data: &[u8],
        max_pages: u32,
    ) -> impl Future<Output = Result<Vec<PageInkCoverage>>> + Send;
}

/// Probe for hosts without an ink-coverage tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProbe;

impl InkCoverageProbe for NullProbe {
    fn name(&self) -> &str {
        "none"
    }

    async fn is_available(&self) -> bool {
        false
    }

    async fn measure(&self, _data: &[u8], _max_pages: u32) -> Result<Vec<PageInkCoverage>> {
        Err(PreflightError::ToolUnavailable(
            "no ink coverage tool configured".into(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Concurrency limit
// ---------------------------------------------------------------------------

/// Caps concurrent external-tool invocations across all validate calls.
///
/// Owned by the host and shared by cloning.
#[derive(Debug, Clone)]
pub struct ToolLimiter {
    permits: Arc<Semaphore>,
}

impl ToolLimiter {
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Wait for a free slot. The slot is released when the permit drops.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PreflightError::ToolUnavailable("tool limiter closed".into()))
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

// ---------------------------------------------------------------------------
// Ghostscript
// ---------------------------------------------------------------------------

/// Runs `gs -sDEVICE=inkcov` on a temporary copy of the file.
#[derive(Debug)]
pub struct GhostscriptProbe {
    binary: String,
    /// Result of the `--version` check, computed on first use.
    available: OnceCell<bool>,
}

impl GhostscriptProbe {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            available: OnceCell::new(),
        }
    }

    async fn check_version(&self) -> bool {
        let status = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(VERSION_CHECK_TIMEOUT, status).await {
            Ok(Ok(status)) if status.success() => {
                info!(binary = %self.binary, "ghostscript available");
                true
            }
            Ok(Ok(status)) => {
                warn!(binary = %self.binary, %status, "ghostscript version check failed");
                false
            }
            Ok(Err(err)) => {
                warn!(binary = %self.binary, %err, "ghostscript not found");
                false
            }
            Err(_) => {
                warn!(binary = %self.binary, "ghostscript version check timed out");
                false
            }
        }
    }
}

impl InkCoverageProbe for GhostscriptProbe {
    fn name(&self) -> &str {
        "ghostscript"
    }

    async fn is_available(&self) -> bool {
        *self.available.get_or_init(|| self.check_version()).await
    }

    async fn measure(&self, data: &[u8], max_pages: u32) -> Result<Vec<PageInkCoverage>> {
        // Removed when dropped, including on cancellation.
        let staged = tempfile::Builder::new()
            .prefix("preflight-")
            .suffix(".pdf")
            .tempfile()?;
        tokio::fs::write(staged.path(), data).await?;

        debug!(binary = %self.binary, max_pages, "running inkcov");
        let output = Command::new(&self.binary)
            .args([
                "-q",
                "-dNOPAUSE",
                "-dBATCH",
                "-dSAFER",
                "-sDEVICE=inkcov",
                "-sOutputFile=%stdout",
                "-dFirstPage=1",
            ])
            .arg(format!("-dLastPage={max_pages}"))
            .arg(staged.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => {
                    PreflightError::ToolUnavailable(format!("{}: {err}", self.binary))
                }
                _ => PreflightError::ToolFailed(format!("failed to spawn {}: {err}", self.binary)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr
                .chars()
                .rev()
                .take(STDERR_TAIL)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            return Err(PreflightError::ToolFailed(format!(
                "inkcov exited with {}: {}",
                output.status,
                tail.trim()
            )));
        }

        parse_inkcov(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse `inkcov` output.
///
/// Each rendered page prints one line of four fractions followed by
/// `CMYK`, e.g. ` 0.01234  0.00000  0.20000  0.05000 CMYK OK`. Other lines
/// (warnings, banners) are ignored. Values are converted to percent.
pub fn parse_inkcov(stdout: &str) -> Result<Vec<PageInkCoverage>> {
    let mut pages = Vec::new();

    for line in stdout.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 || fields[4] != "CMYK" {
            continue;
        }
        let parsed: Option<Vec<f64>> = fields[..4].iter().map(|f| f.parse().ok()).collect();
        let Some(values) = parsed else {
            continue;
        };

        pages.push(PageInkCoverage {
            page: pages.len() as u32 + 1,
            cyan: values[0] * 100.0,
            magenta: values[1] * 100.0,
            yellow: values[2] * 100.0,
            black: values[3] * 100.0,
        });
    }

    if pages.is_empty() {
        return Err(PreflightError::ToolOutput(
            "no CMYK coverage lines in inkcov output".into(),
        ));
    }
    Ok(pages)
}
