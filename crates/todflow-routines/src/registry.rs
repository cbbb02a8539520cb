use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value;
use todflow_core::{Pipeline, PipelineConfig, Routine};

use crate::calibrate::{CalibrateTod, CalibrateTodConfig};
use crate::loader::{TodLoader, TodLoaderConfig};
use crate::optical::{FixOpticalSign, FixOpticalSignConfig};
use crate::selector::{TodSelector, TodSelectorConfig};

/// Registry entry describing one routine kind.
#[derive(Debug, Clone)]
pub struct RoutineDescriptor {
    pub kind: &'static str,
    pub description: &'static str,
}

static ROUTINES: Lazy<Vec<RoutineDescriptor>> = Lazy::new(|| {
    vec![
        RoutineDescriptor {
            kind: "tod_loader",
            description: "Load the unit's TOD from disk into the store",
        },
        RoutineDescriptor {
            kind: "tod_selector",
            description: "Veto units outside an allow-list",
        },
        RoutineDescriptor {
            kind: "fix_optical_sign",
            description: "Align detector rows with the sky-brightness sign convention",
        },
        RoutineDescriptor {
            kind: "calibrate_tod",
            description: "Convert detector samples from DAQ units to W",
        },
    ]
});

pub fn all_routine_descriptors() -> &'static [RoutineDescriptor] {
    ROUTINES.as_slice()
}

/// Builds one routine from its registered kind and raw options.
pub fn build_routine(kind: &str, options: &Value) -> Result<Box<dyn Routine>> {
    match kind {
        "tod_loader" => {
            let config: TodLoaderConfig = parse_options(kind, options)?;
            Ok(Box::new(TodLoader::new(config)))
        }
        "tod_selector" => {
            let config: TodSelectorConfig = parse_options(kind, options)?;
            Ok(Box::new(TodSelector::new(config)))
        }
        "fix_optical_sign" => {
            let config: FixOpticalSignConfig = parse_options(kind, options)?;
            Ok(Box::new(FixOpticalSign::new(config)))
        }
        "calibrate_tod" => {
            let config: CalibrateTodConfig = parse_options(kind, options)?;
            Ok(Box::new(CalibrateTod::new(config)))
        }
        other => Err(anyhow!("unknown routine kind '{other}'")),
    }
}

fn parse_options<C: DeserializeOwned>(kind: &str, options: &Value) -> Result<C> {
    serde_json::from_value(options.clone())
        .with_context(|| format!("invalid options for routine '{kind}'"))
}

/// Builds a ready-to-run pipeline from a parsed configuration: resolves the
/// unit catalog and constructs every configured routine, in order.
pub fn build_pipeline(config: &PipelineConfig) -> Result<Pipeline> {
    let mut pipeline = Pipeline::new(config.settings());
    pipeline.add_units(config.resolve_units()?);
    for spec in &config.routines {
        pipeline.add_routine(build_routine(&spec.kind, &spec.options)?);
    }
    Ok(pipeline)
}
