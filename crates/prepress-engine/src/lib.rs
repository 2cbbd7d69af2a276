// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// prepress-engine — rule validation, spread detection, color-mode decision,
// and the preflight pipeline. This crate turns the facts gathered by
// `prepress-document` into the findings defined in `prepress-core`.

pub mod auxiliary;
pub mod color;
pub mod ink;
pub mod orchestrator;
pub mod report;
pub mod rules;
pub mod spread;

pub use color::ColorVerdict;
pub use ink::{GhostscriptProbe, InkCoverageProbe, NullProbe, ToolLimiter};
pub use orchestrator::Preflight;
pub use report::StageReport;
pub use spread::SpreadSignals;
