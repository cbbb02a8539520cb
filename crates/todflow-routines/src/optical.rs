use serde::Deserialize;
use todflow_core::{DataStore, Outcome, Routine, UnitContext};
use todflow_parser::TodData;

use crate::loader::DEFAULT_TOD_KEY;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FixOpticalSignConfig {
    pub input_key: String,
    pub output_key: String,
}

impl Default for FixOpticalSignConfig {
    fn default() -> Self {
        Self {
            input_key: DEFAULT_TOD_KEY.to_string(),
            output_key: DEFAULT_TOD_KEY.to_string(),
        }
    }
}

/// Multiplies every detector row by its optical sign so the whole array
/// shares one sky-brightness sign convention.
#[derive(Debug)]
pub struct FixOpticalSign {
    config: FixOpticalSignConfig,
}

impl FixOpticalSign {
    pub fn new(config: FixOpticalSignConfig) -> Self {
        Self { config }
    }
}

impl Routine for FixOpticalSign {
    fn name(&self) -> &'static str {
        "fix_optical_sign"
    }

    fn execute(
        &mut self,
        _ctx: &UnitContext<'_>,
        store: &mut DataStore,
    ) -> anyhow::Result<Outcome> {
        let mut tod = store.take::<TodData>(&self.config.input_key)?;

        for (mut row, det) in tod.data.outer_iter_mut().zip(tod.detectors.iter()) {
            row *= det.optical_sign;
        }

        store.set(self.config.output_key.as_str(), tod);
        Ok(Outcome::Continue)
    }
}
