use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::error::CoreError;
use crate::routine::{Outcome, Routine, UnitContext};
use crate::store::DataStore;

/// What the driver does when a routine's `execute` fails.
///
/// One setting for the whole run. The default skips the failing unit and
/// carries on; `AbortRun` stops at the first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    #[default]
    SkipUnit,
    AbortRun,
}

/// Run-level knobs shared by every routine.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Directory unit identifiers resolve against.
    pub base_dir: PathBuf,
    pub failure_policy: FailurePolicy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Terminal status of one unit's pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Completed,
    Vetoed,
    Failed,
}

#[derive(Debug)]
pub struct UnitReport {
    pub unit: String,
    pub status: UnitStatus,
    /// Failing routine and error text, present only for `Failed`.
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<UnitReport>,
}

impl RunSummary {
    pub fn completed(&self) -> usize {
        self.count(UnitStatus::Completed)
    }

    pub fn vetoed(&self) -> usize {
        self.count(UnitStatus::Vetoed)
    }

    pub fn failed(&self) -> usize {
        self.count(UnitStatus::Failed)
    }

    fn count(&self, status: UnitStatus) -> usize {
        self.reports.iter().filter(|r| r.status == status).count()
    }
}

/// The loop driver: an ordered routine sequence run over an ordered unit
/// catalog, one fresh [`DataStore`] per unit.
///
/// Execution is strictly sequential. Routines run in insertion order for
/// every unit, so a later routine may assume everything before it has
/// already run for the current unit — or the unit was vetoed, in which case
/// the later routine never sees it.
pub struct Pipeline {
    routines: Vec<Box<dyn Routine>>,
    units: Vec<String>,
    settings: RunSettings,
}

impl Pipeline {
    pub fn new(settings: RunSettings) -> Self {
        Self {
            routines: Vec::new(),
            units: Vec::new(),
            settings,
        }
    }

    /// Appends a routine; execution order is insertion order.
    pub fn add_routine(&mut self, routine: Box<dyn Routine>) -> &mut Self {
        self.routines.push(routine);
        self
    }

    /// Appends unit identifiers to the catalog.
    pub fn add_units<I, S>(&mut self, units: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.units.extend(units.into_iter().map(Into::into));
        self
    }

    pub fn routine_count(&self) -> usize {
        self.routines.len()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn units(&self) -> &[String] {
        &self.units
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Drives the full run: initialize every routine, process every unit,
    /// finalize every routine.
    ///
    /// A veto ends the current unit's pass silently. An `execute` error ends
    /// the unit (default policy) or the run (`AbortRun`); either way it is
    /// logged with the unit and routine that caused it. Finalizers run even
    /// when the run aborts, and a finalize failure never masks the execute
    /// error that aborted the run.
    pub fn run(&mut self) -> Result<RunSummary, CoreError> {
        self.initialize_all()?;

        let mut summary = RunSummary::default();
        let mut abort: Option<CoreError> = None;
        let catalog_len = self.units.len();

        'units: for (index, unit) in self.units.iter().enumerate() {
            debug!(unit = %unit, index, "processing unit");
            let mut store = DataStore::new();
            let mut status = UnitStatus::Completed;
            let mut failure: Option<String> = None;

            for routine in self.routines.iter_mut() {
                let ctx = UnitContext::new(unit, index, catalog_len, &self.settings.base_dir);
                match routine.execute(&ctx, &mut store) {
                    Ok(Outcome::Continue) => {}
                    Ok(Outcome::Veto) => {
                        debug!(unit = %unit, routine = routine.name(), "unit vetoed");
                        status = UnitStatus::Vetoed;
                        break;
                    }
                    Err(cause) => {
                        status = UnitStatus::Failed;
                        failure = Some(format!("{}: {:#}", routine.name(), cause));
                        match self.settings.failure_policy {
                            FailurePolicy::SkipUnit => {
                                error!(
                                    unit = %unit,
                                    routine = routine.name(),
                                    error = %cause,
                                    "routine failed; skipping unit"
                                );
                                break;
                            }
                            FailurePolicy::AbortRun => {
                                error!(
                                    unit = %unit,
                                    routine = routine.name(),
                                    error = %cause,
                                    "routine failed; aborting run"
                                );
                                abort = Some(CoreError::Execute {
                                    routine: routine.name().to_string(),
                                    unit: unit.clone(),
                                    cause,
                                });
                                summary.reports.push(UnitReport {
                                    unit: unit.clone(),
                                    status,
                                    error: failure,
                                });
                                break 'units;
                            }
                        }
                    }
                }
            }

            summary.reports.push(UnitReport {
                unit: unit.clone(),
                status,
                error: failure,
            });
        }

        // Teardown runs even when an execute failure aborts the run.
        let finalized = self.finalize_all();

        if let Some(err) = abort {
            if let Err(fin_err) = finalized {
                warn!(error = %fin_err, "finalize failed while aborting run");
            }
            return Err(err);
        }
        finalized?;

        info!(
            units = summary.reports.len(),
            completed = summary.completed(),
            vetoed = summary.vetoed(),
            failed = summary.failed(),
            "pipeline run finished"
        );
        Ok(summary)
    }

    fn initialize_all(&mut self) -> Result<(), CoreError> {
        for idx in 0..self.routines.len() {
            let result = self.routines[idx].initialize();
            if let Err(cause) = result {
                let routine = self.routines[idx].name().to_string();
                // Release whatever the earlier routines managed to open.
                for prior in self.routines[..idx].iter_mut() {
                    if let Err(fin_err) = prior.finalize() {
                        warn!(
                            routine = prior.name(),
                            error = %fin_err,
                            "finalize failed while aborting initialization"
                        );
                    }
                }
                return Err(CoreError::Initialize { routine, cause });
            }
        }
        Ok(())
    }

    /// Runs every finalizer, surfacing the first error after all have run.
    fn finalize_all(&mut self) -> Result<(), CoreError> {
        let mut first_err: Option<CoreError> = None;
        for routine in self.routines.iter_mut() {
            if let Err(cause) = routine.finalize() {
                error!(routine = routine.name(), error = %cause, "finalize failed");
                if first_err.is_none() {
                    first_err = Some(CoreError::Finalize {
                        routine: routine.name().to_string(),
                        cause,
                    });
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
