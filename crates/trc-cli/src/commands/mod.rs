//! Command handler modules for trc-cli.

pub mod run;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read config layers from disk in merge order.
pub fn read_layers(paths: &[impl AsRef<Path>]) -> Result<Vec<String>> {
    paths
        .iter()
        .map(|p| {
            let p = p.as_ref();
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {}", p.display()))
        })
        .collect()
}
