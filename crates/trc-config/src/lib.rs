//! trc-config
//!
//! Layered YAML configuration for reconciliation runs.
//!
//! Layers are merged in order (later documents override earlier ones, maps
//! merge recursively), converted to JSON, serialized canonically and hashed
//! with SHA-256. The hash is recorded with every run so an export can be
//! traced back to the exact effective configuration.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

pub const DEFAULT_EXPORTS_ROOT: &str = "exports";

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed view of the effective configuration. Unknown keys are rejected.
    pub fn recon(&self) -> Result<ReconConfig> {
        serde_json::from_value(self.config_json.clone())
            .context("config does not match the reconciliation schema")
    }
}

/// Typed reconciliation configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default)]
    pub inputs: InputsConfig,
    /// Only records on this date take part in the run.
    #[serde(default)]
    pub trade_date: Option<NaiveDate>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputsConfig {
    #[serde(default)]
    pub orders: Vec<PathBuf>,
    #[serde(default)]
    pub trades: Vec<PathBuf>,
    /// Files classified by name/header sniffing.
    #[serde(default)]
    pub auto_detect: Vec<PathBuf>,
    /// `.eml` messages carrying order/trade files as attachments.
    #[serde(default)]
    pub emails: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_exports_root")]
    pub exports_root: PathBuf,
    /// SQLite database file. Absent means results are not persisted to a DB.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            exports_root: default_exports_root(),
            db_path: None,
        }
    }
}

fn default_exports_root() -> PathBuf {
    PathBuf::from(DEFAULT_EXPORTS_ROOT)
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        // An empty document parses as null; it contributes nothing.
        if v_json.is_null() {
            continue;
        }
        merged = deep_merge(merged, v_json);
    }

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    serde_json::to_string(&sort_keys(v)).context("canonical json serialize failed")
}

/// Rebuild maps in key order so the output does not depend on whether
/// serde_json preserves insertion order.
fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for k in keys {
                out.insert(k.clone(), sort_keys(&map[k.as_str()]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layers_override_and_maps_merge() {
        let base = "output:\n  exports_root: out\n  db_path: a.db\ninputs:\n  orders: [o1.csv]\n";
        let over = "output:\n  db_path: b.db\n";
        let loaded = load_layered_yaml_from_strings(&[base, over]).unwrap();
        assert_eq!(loaded.config_json["output"]["exports_root"], "out");
        assert_eq!(loaded.config_json["output"]["db_path"], "b.db");
        assert_eq!(loaded.config_json["inputs"]["orders"][0], "o1.csv");
    }

    #[test]
    fn arrays_are_replaced_not_concatenated() {
        let base = "inputs:\n  trades: [a.csv, b.csv]\n";
        let over = "inputs:\n  trades: [c.csv]\n";
        let cfg = load_layered_yaml_from_strings(&[base, over])
            .unwrap()
            .recon()
            .unwrap();
        assert_eq!(cfg.inputs.trades, vec![PathBuf::from("c.csv")]);
    }

    #[test]
    fn typed_view_defaults() {
        let cfg = load_layered_yaml_from_strings(&["{}"]).unwrap().recon().unwrap();
        assert_eq!(cfg, ReconConfig::default());
        assert_eq!(cfg.output.exports_root, PathBuf::from("exports"));
        assert!(cfg.output.db_path.is_none());
    }

    #[test]
    fn email_inputs_parse() {
        let cfg = load_layered_yaml_from_strings(&[
            "inputs:\n  emails: [\"Trade File BROKER 1 - 31_01_2025.eml\"]\n",
        ])
        .unwrap()
        .recon()
        .unwrap();
        assert_eq!(
            cfg.inputs.emails,
            vec![PathBuf::from("Trade File BROKER 1 - 31_01_2025.eml")]
        );
        assert!(cfg.inputs.orders.is_empty());
    }

    #[test]
    fn trade_date_parses() {
        let cfg = load_layered_yaml_from_strings(&["trade_date: 2025-01-31\n"])
            .unwrap()
            .recon()
            .unwrap();
        assert_eq!(cfg.trade_date, NaiveDate::from_ymd_opt(2025, 1, 31));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let loaded = load_layered_yaml_from_strings(&["output:\n  exprots_root: x\n"]).unwrap();
        assert!(loaded.recon().is_err());
    }

    #[test]
    fn empty_document_is_ignored() {
        let a = load_layered_yaml_from_strings(&["", "trade_date: 2025-01-31\n"]).unwrap();
        let b = load_layered_yaml_from_strings(&["trade_date: 2025-01-31\n"]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
    }
}
