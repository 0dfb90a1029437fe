//! Engine configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::data::AverageExpression;
use crate::io::{LoadReport, load_average_expression};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffExprConfig {
    /// Cluster × gene average expression table used in single-cell mode.
    pub average_expression_path: Option<PathBuf>,
    /// Decimal places of the rounded difference score.
    pub decimals: u32,
    /// Smallest number of dimensions handled by one parallel task.
    pub min_dimensions_per_task: usize,
    /// Min-max normalize means and medians.
    pub normalize: bool,
}

impl Default for DiffExprConfig {
    fn default() -> Self {
        DiffExprConfig {
            average_expression_path: None,
            decimals: 3,
            min_dimensions_per_task: 256,
            normalize: false,
        }
    }
}

impl DiffExprConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: DiffExprConfig =
            serde_json::from_str(json).context("Failed to parse differential expression config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Load the table named by `average_expression_path`, `None` when no path is configured.
    pub fn load_average_expression(
        &self,
    ) -> crate::error::Result<Option<(AverageExpression, LoadReport)>> {
        self.average_expression_path
            .as_ref()
            .map(load_average_expression)
            .transpose()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.decimals > 15 {
            return Err(anyhow::anyhow!(
                "decimals must be at most 15, got {}",
                self.decimals
            ));
        }
        Ok(())
    }
}
