// src/config.rs

use crate::types::Config;
use anyhow::{bail, Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
        Self::from_yaml_str(&contents).with_context(|| format!("parsing config {}", path))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scheduler.num_lanes == 0 {
            bail!("scheduler.num_lanes must be at least 1");
        }
        if !(self.scheduler.full_cycle_secs > 0.0) {
            bail!("scheduler.full_cycle_secs must be positive");
        }
        if self.scheduler.yellow_secs < 0.0 {
            bail!("scheduler.yellow_secs must not be negative");
        }
        if !(self.analyzer.road_capacity > 0.0) {
            bail!("analyzer.road_capacity must be positive");
        }
        if self.analyzer.morph_kernel_size == 0 {
            bail!("analyzer.morph_kernel_size must be at least 1");
        }
        if self.timing.min_green_secs > self.timing.max_green_secs {
            bail!(
                "timing.min_green_secs ({}) exceeds timing.max_green_secs ({})",
                self.timing.min_green_secs,
                self.timing.max_green_secs
            );
        }
        if self.runner.smoother_window_size == 0 {
            bail!("runner.smoother_window_size must be at least 1");
        }
        Ok(())
    }
}
