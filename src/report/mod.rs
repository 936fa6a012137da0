// SPDX-License-Identifier: PMPL-1.0-or-later

//! Report output module

pub mod diff;
pub mod formatter;
pub mod output;

use crate::types::*;
use anyhow::Result;
use std::path::Path;

pub use formatter::ReportFormatter;
pub use output::ReportOutputFormat;

/// Save an analysis result, format chosen by extension
pub fn save_report<P: AsRef<Path>>(result: &AnalysisResult, path: P) -> Result<()> {
    let formatter = ReportFormatter::new();
    let format = ReportOutputFormat::for_path(path.as_ref());
    formatter.save(result, path, format)
}

/// Print an analysis result to the console
pub fn print_report(result: &AnalysisResult, quiet: bool) {
    let formatter = if quiet {
        ReportFormatter::quiet()
    } else {
        ReportFormatter::new()
    };
    formatter.print(result);
}

/// Print a fix run to the console
pub fn print_apply(result: &ApplyResult) {
    ReportFormatter::new().print_apply(result);
}
