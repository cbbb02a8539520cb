pub mod config;
pub mod error;
pub mod pipeline;
pub mod routine;
pub mod store;

pub use config::{PipelineConfig, RoutineSpec, UnitSource};
pub use error::{ConfigError, CoreError, StoreError};
pub use pipeline::{
    FailurePolicy, Pipeline, RunSettings, RunSummary, UnitReport, UnitStatus,
};
pub use routine::{Outcome, Routine, UnitContext};
pub use store::{Artifact, DataStore};
