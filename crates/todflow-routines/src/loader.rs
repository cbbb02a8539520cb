use anyhow::Context;
use serde::Deserialize;
use todflow_core::{DataStore, Outcome, Routine, UnitContext};
use todflow_parser::{read_tod, LoadOptions};
use tracing::info;

/// Key most pipelines use for the in-memory TOD.
pub const DEFAULT_TOD_KEY: &str = "tod_data";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TodLoaderConfig {
    /// Store key the loaded TOD is saved under.
    pub output_key: String,
    /// Treat unit identifiers as absolute paths instead of names under the
    /// run's base directory.
    pub abspath: bool,
    pub load: LoadOptions,
}

impl Default for TodLoaderConfig {
    fn default() -> Self {
        Self {
            output_key: DEFAULT_TOD_KEY.to_string(),
            abspath: false,
            load: LoadOptions::default(),
        }
    }
}

/// Reads the current unit's TOD from disk and stores it for the routines
/// downstream.
#[derive(Debug)]
pub struct TodLoader {
    config: TodLoaderConfig,
}

impl TodLoader {
    pub fn new(config: TodLoaderConfig) -> Self {
        Self { config }
    }
}

impl Routine for TodLoader {
    fn name(&self) -> &'static str {
        "tod_loader"
    }

    fn execute(
        &mut self,
        ctx: &UnitContext<'_>,
        store: &mut DataStore,
    ) -> anyhow::Result<Outcome> {
        let path = ctx.filename(self.config.abspath);
        info!(unit = ctx.name(), path = %path.display(), "loading TOD");

        let tod = read_tod(&path, &self.config.load)
            .with_context(|| format!("loading TOD for unit '{}'", ctx.name()))?;

        info!(
            unit = ctx.name(),
            detectors = tod.n_detectors(),
            samples = tod.n_samples(),
            "TOD loaded"
        );
        store.set(self.config.output_key.as_str(), tod);
        Ok(Outcome::Continue)
    }
}
