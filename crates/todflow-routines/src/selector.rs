use std::collections::HashSet;

use serde::Deserialize;
use todflow_core::{DataStore, Outcome, Routine, UnitContext};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TodSelectorConfig {
    /// Unit names allowed through; everything else is vetoed.
    pub keep: Vec<String>,
}

/// Restricts a run to an allow-list of unit names.
///
/// A vetoed unit skips the remaining routines and the run carries on with
/// the next unit; skipping is the expected case here, not a failure.
#[derive(Debug)]
pub struct TodSelector {
    keep: HashSet<String>,
}

impl TodSelector {
    pub fn new(config: TodSelectorConfig) -> Self {
        Self {
            keep: config.keep.into_iter().collect(),
        }
    }
}

impl Routine for TodSelector {
    fn name(&self) -> &'static str {
        "tod_selector"
    }

    fn execute(
        &mut self,
        ctx: &UnitContext<'_>,
        _store: &mut DataStore,
    ) -> anyhow::Result<Outcome> {
        if self.keep.contains(ctx.name()) {
            Ok(Outcome::Continue)
        } else {
            Ok(Outcome::Veto)
        }
    }
}
