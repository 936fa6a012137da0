// SPDX-License-Identifier: PMPL-1.0-or-later

//! Serialization helpers for exported reports

use crate::types::AnalysisResult;
use anyhow::Result;
use clap::ValueEnum;
use serde_json;
use serde_yaml;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportOutputFormat {
    Json,
    Yaml,
}

impl ReportOutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Some(ReportOutputFormat::Json),
            "yaml" | "yml" => Some(ReportOutputFormat::Yaml),
            _ => None,
        }
    }

    /// Format implied by a file's extension, JSON when unknown.
    pub fn for_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::parse)
            .unwrap_or(ReportOutputFormat::Json)
    }

    pub fn serialize(&self, result: &AnalysisResult) -> Result<String> {
        match self {
            ReportOutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
            ReportOutputFormat::Yaml => Ok(serde_yaml::to_string(result)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(ReportOutputFormat::for_path(Path::new("r.yml")), ReportOutputFormat::Yaml);
        assert_eq!(ReportOutputFormat::for_path(Path::new("r.JSON")), ReportOutputFormat::Json);
        assert_eq!(ReportOutputFormat::for_path(Path::new("r")), ReportOutputFormat::Json);
        assert_eq!(ReportOutputFormat::parse("ncl"), None);
    }
}
