use serde::Deserialize;
use todflow_core::{DataStore, Outcome, Routine, UnitContext};
use todflow_parser::{iv_calibration, TodData};
use tracing::warn;

use crate::loader::DEFAULT_TOD_KEY;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalibrateTodConfig {
    pub input_key: String,
    pub output_key: String,
}

impl Default for CalibrateTodConfig {
    fn default() -> Self {
        Self {
            input_key: DEFAULT_TOD_KEY.to_string(),
            output_key: DEFAULT_TOD_KEY.to_string(),
        }
    }
}

/// Converts detector samples from DAQ units to W using the IV
/// responsivities stored with the data.
///
/// Detectors the IV analysis had no solution for are left in DAQ units and
/// counted in a warning; downstream cuts decide what to do with them.
#[derive(Debug)]
pub struct CalibrateTod {
    config: CalibrateTodConfig,
}

impl CalibrateTod {
    pub fn new(config: CalibrateTodConfig) -> Self {
        Self { config }
    }
}

impl Routine for CalibrateTod {
    fn name(&self) -> &'static str {
        "calibrate_tod"
    }

    fn execute(
        &mut self,
        ctx: &UnitContext<'_>,
        store: &mut DataStore,
    ) -> anyhow::Result<Outcome> {
        let mut tod = store.take::<TodData>(&self.config.input_key)?;
        let cal = iv_calibration(&tod);

        let mut uncalibrated = 0usize;
        for (idx, mut row) in tod.data.outer_iter_mut().enumerate() {
            if cal.mask[idx] {
                row *= cal.values[idx];
            } else {
                uncalibrated += 1;
            }
        }
        if uncalibrated > 0 {
            warn!(
                unit = ctx.name(),
                detectors = uncalibrated,
                "detectors left in DAQ units (no IV solution)"
            );
        }

        store.set(self.config.output_key.as_str(), tod);
        Ok(Outcome::Continue)
    }
}
