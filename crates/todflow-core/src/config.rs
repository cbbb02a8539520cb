// crates/todflow-core/src/config.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::pipeline::{FailurePolicy, RunSettings};

/// On-disk pipeline description.
///
/// ```toml
/// base_dir = "/data/tods"
/// failure_policy = "skip-unit"
///
/// [units]
/// glob = "*.tod"
///
/// [[routines]]
/// kind = "tod_loader"
/// output_key = "tod_data"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory unit identifiers resolve against (unless a routine was
    /// configured with `abspath`).
    pub base_dir: PathBuf,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    pub units: UnitSource,
    #[serde(default)]
    pub routines: Vec<RoutineSpec>,
}

impl PipelineConfig {
    /// Reads and parses a TOML pipeline config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn settings(&self) -> RunSettings {
        RunSettings {
            base_dir: self.base_dir.clone(),
            failure_policy: self.failure_policy,
        }
    }

    /// Resolves the unit catalog: source expansion, then the optional
    /// `start`/`end` pointers.
    pub fn resolve_units(&self) -> Result<Vec<String>, ConfigError> {
        self.units.resolve(&self.base_dir)
    }
}

/// Where the unit catalog comes from.
///
/// Exactly one of `list`, `file`, `glob` must be set. `start` and `end` are
/// half-open pointers into the resolved catalog, for running a slice of an
/// externally maintained list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitSource {
    /// Inline unit names, in run order.
    #[serde(default)]
    pub list: Option<Vec<String>>,
    /// Catalog file with one unit name per line; blank lines and
    /// `#`-comments are ignored.
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Glob pattern, relative to `base_dir`.
    #[serde(default)]
    pub glob: Option<String>,
    #[serde(default)]
    pub start: Option<usize>,
    #[serde(default)]
    pub end: Option<usize>,
}

impl UnitSource {
    pub fn resolve(&self, base_dir: &Path) -> Result<Vec<String>, ConfigError> {
        let provided = [
            self.list.is_some(),
            self.file.is_some(),
            self.glob.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if provided == 0 {
            return Err(ConfigError::NoUnitSource);
        }
        if provided > 1 {
            return Err(ConfigError::AmbiguousUnitSource);
        }

        let catalog = if let Some(list) = &self.list {
            list.clone()
        } else if let Some(file) = &self.file {
            read_unit_file(file)?
        } else if let Some(pattern) = &self.glob {
            expand_unit_glob(base_dir, pattern)?
        } else {
            Vec::new()
        };

        let start = self.start.unwrap_or(0);
        let end = self.end.unwrap_or(catalog.len());
        if start > end || end > catalog.len() {
            return Err(ConfigError::UnitRange {
                start,
                end,
                len: catalog.len(),
            });
        }
        Ok(catalog[start..end].to_vec())
    }
}

fn read_unit_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::UnitFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn expand_unit_glob(base_dir: &Path, pattern: &str) -> Result<Vec<String>, ConfigError> {
    let full_pattern = base_dir.join(pattern).to_string_lossy().into_owned();
    let paths = glob::glob(&full_pattern).map_err(|source| ConfigError::GlobPattern {
        pattern: full_pattern.clone(),
        source,
    })?;

    let mut names = Vec::new();
    for entry in paths {
        let path = entry.map_err(|source| ConfigError::GlobWalk {
            pattern: full_pattern.clone(),
            source,
        })?;
        // Catalog entries stay relative to base_dir so unit contexts can
        // resolve them back to the same file.
        let name = path
            .strip_prefix(base_dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();
        names.push(name);
    }
    names.sort();
    Ok(names)
}

/// One routine entry: a registered kind plus whatever options that kind
/// understands. Options are forwarded opaquely; the routine factory owns
/// their schema.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutineSpec {
    pub kind: String,
    #[serde(flatten)]
    pub options: serde_json::Value,
}
