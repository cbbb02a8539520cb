pub mod calibrate;
pub mod loader;
pub mod optical;
pub mod registry;
pub mod selector;

pub use calibrate::{CalibrateTod, CalibrateTodConfig};
pub use loader::{TodLoader, TodLoaderConfig, DEFAULT_TOD_KEY};
pub use optical::{FixOpticalSign, FixOpticalSignConfig};
pub use registry::{
    all_routine_descriptors, build_pipeline, build_routine, RoutineDescriptor,
};
pub use selector::{TodSelector, TodSelectorConfig};
