use std::path::{Path, PathBuf};

use crate::store::DataStore;

/// Control-flow result of one [`Routine::execute`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Hand the unit to the next routine in the sequence.
    Continue,
    /// Skip the remaining routines for this unit. Not a failure: the driver
    /// moves on to the next unit without reporting anything.
    Veto,
}

/// Per-unit view handed to a routine by the driver.
///
/// Rebound before every `execute` call; the borrows never outlive the call,
/// so per-unit context cannot leak between units.
#[derive(Debug, Clone, Copy)]
pub struct UnitContext<'a> {
    unit: &'a str,
    index: usize,
    catalog_len: usize,
    base_dir: &'a Path,
}

impl<'a> UnitContext<'a> {
    pub fn new(unit: &'a str, index: usize, catalog_len: usize, base_dir: &'a Path) -> Self {
        Self {
            unit,
            index,
            catalog_len,
            base_dir,
        }
    }

    /// Identifier of the unit currently being processed.
    pub fn name(&self) -> &str {
        self.unit
    }

    /// Zero-based position of this unit in the run's catalog.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of units in the catalog for this run.
    pub fn catalog_len(&self) -> usize {
        self.catalog_len
    }

    /// Directory unit identifiers resolve against.
    pub fn base_dir(&self) -> &Path {
        self.base_dir
    }

    /// Resolves the unit identifier to a filesystem path.
    ///
    /// With `abspath` the identifier is taken as a path verbatim; otherwise
    /// it is joined onto the run's base directory.
    pub fn filename(&self, abspath: bool) -> PathBuf {
        if abspath {
            PathBuf::from(self.unit)
        } else {
            self.base_dir.join(self.unit)
        }
    }
}

/// One stage of a pipeline.
///
/// Configuration is captured at construction and stays immutable afterward;
/// anything per-unit arrives through the [`UnitContext`]. Lifecycle per run:
/// `initialize` once before the unit loop, `execute` once per unit until a
/// veto or failure cuts that unit short, `finalize` once after the loop
/// regardless of vetoes or failures.
pub trait Routine: Send {
    /// Stable name used in logs and failure reports.
    fn name(&self) -> &'static str;

    /// One-time setup before the unit loop. An error aborts the run.
    fn initialize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Processes one unit, exchanging intermediate artifacts through the
    /// store. Routines with no store dependency just ignore the parameter.
    /// The store reference must not be retained beyond the call.
    fn execute(&mut self, ctx: &UnitContext<'_>, store: &mut DataStore)
        -> anyhow::Result<Outcome>;

    /// One-time teardown after the unit loop. An error fails the run.
    fn finalize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}
