// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the preflight engine.
//
// These are internal failures. The orchestrator never lets them escape
// `validate()`: parse failures become error codes in the result, detector
// failures become low-confidence verdicts plus an analysis note.

use thiserror::Error;

/// Top-level error type for all preflight operations.
#[derive(Debug, Error)]
pub enum PreflightError {
    // -- Input errors --
    #[error("not a PDF document: {0}")]
    UnsupportedFormat(String),

    #[error("PDF could not be parsed: {0}")]
    Corrupted(String),

    #[error("PDF inspection failed: {0}")]
    Inspection(String),

    // -- External tool errors --
    #[error("external tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("{tool} timed out after {millis}ms")]
    ToolTimeout { tool: String, millis: u128 },

    #[error("external tool failed: {0}")]
    ToolFailed(String),

    #[error("external tool output could not be parsed: {0}")]
    ToolOutput(String),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PreflightError>;
