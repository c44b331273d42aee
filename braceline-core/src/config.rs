//! Configuration file support for braceline
//!
//! Settings come from JSON found next to the scanned source. An explicit
//! `--config` path wins; otherwise each directory from the source's own up
//! to the repository root (the first one holding `.git`) is checked for, in
//! order, `.bracelinerc.json`, `braceline.config.json`, then a `"braceline"`
//! key in `package.json`. The nearest directory with any of them wins.
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::extract::ModuleSpec;
use crate::lexer::{EscapeRule, ScanOptions};
use crate::locate::{BlockOptions, DEFAULT_MAX_LINES, DEFAULT_SEARCH_WINDOW};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Label used in extracted module headers when none is configured
const DEFAULT_SOURCE_LABEL: &str = "source";

/// Standalone config file names, most specific first
const CONFIG_FILE_NAMES: [&str; 2] = [".bracelinerc.json", "braceline.config.json"];

/// Key holding braceline settings inside `package.json`
const PACKAGE_JSON_KEY: &str = "braceline";

/// braceline configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BracelineConfig {
    /// Lines searched on each side of an approximate declaration line (default: 10)
    ///
    /// Zero restricts the search to the approximate line itself.
    #[serde(default)]
    pub search_window: Option<usize>,

    /// Maximum lines a block scan may examine (default: 200)
    #[serde(default)]
    pub max_lines: Option<usize>,

    /// Depth considered outside the block (default: 0)
    #[serde(default)]
    pub baseline_depth: Option<i64>,

    /// Escape handling before quotes and backticks (default: single-lookback)
    #[serde(default)]
    pub escapes: Option<EscapeRule>,

    /// Name of the scanned file used in extracted module headers
    #[serde(default)]
    pub source_label: Option<String>,

    /// Extraction manifest
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
}

/// Resolved configuration with defaults applied
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub search_window: usize,
    pub block: BlockOptions,
    pub source_label: Option<String>,
    pub modules: Vec<ModuleSpec>,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl BracelineConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if self.max_lines == Some(0) {
            anyhow::bail!("max_lines must be at least 1");
        }
        if let Some(baseline) = self.baseline_depth {
            if baseline < 0 {
                anyhow::bail!("baseline_depth must be non-negative (got {})", baseline);
            }
        }

        // Module files must be unique and non-empty
        let mut seen = HashSet::new();
        for module in &self.modules {
            if module.file.trim().is_empty() {
                anyhow::bail!("modules[].file must not be empty");
            }
            if !seen.insert(module.file.as_str()) {
                anyhow::bail!("module file listed twice: {}", module.file);
            }
            if module.functions.iter().any(|f| f.trim().is_empty()) {
                anyhow::bail!("module {} lists an empty function name", module.file);
            }
        }

        Ok(())
    }

    /// Resolve config into a form ready for use
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        Ok(ResolvedConfig {
            search_window: self.search_window.unwrap_or(DEFAULT_SEARCH_WINDOW),
            block: BlockOptions {
                baseline_depth: self.baseline_depth.unwrap_or(0),
                max_lines: self.max_lines.unwrap_or(DEFAULT_MAX_LINES),
                scan: ScanOptions {
                    escapes: self.escapes.unwrap_or_default(),
                },
            },
            source_label: self.source_label.clone(),
            modules: self.modules.clone(),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        BracelineConfig::default().resolve()
    }

    /// Label for extracted module headers, falling back to the scanned file name
    pub fn source_label_for(&self, source: &Path) -> String {
        if let Some(label) = &self.source_label {
            return label.clone();
        }
        source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_SOURCE_LABEL)
            .to_string()
    }
}

/// Find the nearest config for a source file living in `source_dir`
///
/// Walks from `source_dir` toward the filesystem root and stops after the
/// first directory containing `.git`. Returns `None` if nothing is found.
pub fn discover_config(source_dir: &Path) -> Result<Option<(BracelineConfig, PathBuf)>> {
    for dir in source_dir.ancestors() {
        if let Some(found) = config_in_dir(dir)? {
            debug!(path = %found.1.display(), "discovered config");
            return Ok(Some(found));
        }
        if dir.join(".git").exists() {
            debug!(root = %dir.display(), "no config below repository root");
            break;
        }
    }
    Ok(None)
}

fn config_in_dir(dir: &Path) -> Result<Option<(BracelineConfig, PathBuf)>> {
    for name in CONFIG_FILE_NAMES {
        let path = dir.join(name);
        if path.is_file() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }

    let manifest = dir.join("package.json");
    if manifest.is_file() {
        if let Some(config) = load_from_package_json(&manifest)? {
            return Ok(Some((config, manifest)));
        }
    }

    Ok(None)
}

/// Read and validate one JSON config file
pub fn load_config_file(path: &Path) -> Result<BracelineConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config: BracelineConfig = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;
    Ok(config)
}

/// Settings under the `"braceline"` key, or `None` for a package without one
fn load_from_package_json(path: &Path) -> Result<Option<BracelineConfig>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut manifest: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let Some(section) = manifest.get_mut(PACKAGE_JSON_KEY).map(serde_json::Value::take) else {
        return Ok(None);
    };
    let config: BracelineConfig = serde_json::from_value(section)
        .with_context(|| format!("invalid {} section in {}", PACKAGE_JSON_KEY, path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid {} section in {}", PACKAGE_JSON_KEY, path.display()))?;
    Ok(Some(config))
}

/// Resolve settings for a source file in `source_dir`
///
/// An explicit `config_path` is loaded as-is; otherwise the nearest config
/// is discovered. Defaults apply when there is none.
pub fn load_and_resolve(source_dir: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let found = match config_path {
        Some(path) => Some((load_config_file(path)?, path.to_path_buf())),
        None => discover_config(source_dir)?,
    };

    let Some((config, path)) = found else {
        return ResolvedConfig::defaults();
    };
    let mut resolved = config.resolve()?;
    resolved.config_path = Some(path);
    Ok(resolved)
}
