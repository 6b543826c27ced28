// Check runner module
//
// This module provides the CheckRunner which owns the registered check units,
// keeps each unit's last result set and status, and emits events for front ends.

pub mod status;

use crate::checks::{CheckError, CheckRegistry, CheckUnit};
use crate::metrics::Metrics;
use crate::models::{CheckConfig, CheckResult, Locator, Settings};
use crate::scene::{NodeKind, SceneError, SceneProvider};
use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::broadcast;

pub use status::{CheckStatus, ConvergenceReport, RunSummary, RunnerEvent};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunnerError {
    #[error("No check named '{0}' is registered")]
    UnknownCheck(String),

    #[error("Check '{name}' could not run: {source}")]
    CheckFailed {
        name: String,
        #[source]
        source: CheckError,
    },

    #[error("Fix for '{name}' failed: {source}")]
    FixFailed {
        name: String,
        #[source]
        source: CheckError,
    },
}

/// Runner-owned state of one unit
struct UnitSlot {
    unit: Box<dyn CheckUnit>,
    enabled: bool,
    status: CheckStatus,
    /// Written only by a check pass
    last_results: Vec<CheckResult>,
    /// Inputs of the last check pass, reused for the re-check after a fix
    last_objects: Vec<Locator>,
    last_config: CheckConfig,
    last_error: Option<String>,
}

impl UnitSlot {
    fn new(unit: Box<dyn CheckUnit>) -> Self {
        let enabled = unit.descriptor().is_enabled;
        Self {
            unit,
            enabled,
            status: CheckStatus::Unevaluated,
            last_results: Vec::new(),
            last_objects: Vec::new(),
            last_config: CheckConfig::new(),
            last_error: None,
        }
    }

    fn name(&self) -> &str {
        self.unit.name()
    }

    fn is_fixable(&self) -> bool {
        self.unit.descriptor().is_fixable
    }
}

/// Drives check units over an object set and tracks their status.
///
/// Units run strictly one at a time in registry order. Each unit's results
/// live here rather than in the unit, and are handed to the unit's `fix`
/// explicitly. Every transition is driven by an explicit `run_*`/`fix_*`
/// call; the state machine per unit is
/// `Unevaluated -> {Good, Warning, Bad, Failed} -> ...` and never terminates.
///
/// # Usage
///
/// - [`expand`](Self::expand) / [`expand_selection`](Self::expand_selection)
///   to build the object list
/// - [`run_all`](Self::run_all) / [`run_one`](Self::run_one) to check
/// - [`fix_all`](Self::fix_all) / [`fix_one`](Self::fix_one) to repair and
///   re-check, or [`fix_until_converged`](Self::fix_until_converged)
/// - [`subscribe`](Self::subscribe) for progress events
pub struct CheckRunner {
    slots: Vec<UnitSlot>,

    /// Broadcast channel for runner events; sending with no subscribers is fine
    events_tx: broadcast::Sender<RunnerEvent>,

    metrics: Arc<Metrics>,
}

impl CheckRunner {
    /// Create a runner over the units of `registry`, keeping registry order.
    ///
    /// The event channel buffers 100 events per subscriber.
    pub fn new(registry: CheckRegistry) -> Self {
        let (events_tx, _) = broadcast::channel(100);
        Self {
            slots: registry.into_units().into_iter().map(UnitSlot::new).collect(),
            events_tx,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Record into a shared metrics instance instead of a private one
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Subscribe to runner events
    ///
    /// Returns a receiver that will get notified of all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<RunnerEvent> {
        self.events_tx.subscribe()
    }

    fn emit(&self, event: RunnerEvent) {
        // Ignore send errors - it's OK if no one is listening
        let _ = self.events_tx.send(event);
    }

    fn slot_index(&self, name: &str) -> Result<usize, RunnerError> {
        self.slots
            .iter()
            .position(|slot| slot.name() == name)
            .ok_or_else(|| RunnerError::UnknownCheck(name.to_string()))
    }

    /// Unit names in registry order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(UnitSlot::name)
    }

    pub fn unit(&self, name: &str) -> Result<&dyn CheckUnit, RunnerError> {
        let index = self.slot_index(name)?;
        Ok(self.slots[index].unit.as_ref())
    }

    pub fn status(&self, name: &str) -> Result<CheckStatus, RunnerError> {
        Ok(self.slots[self.slot_index(name)?].status)
    }

    pub fn last_results(&self, name: &str) -> Result<&[CheckResult], RunnerError> {
        Ok(&self.slots[self.slot_index(name)?].last_results)
    }

    /// Message of the configuration error that left the unit `Failed`
    pub fn last_error(&self, name: &str) -> Result<Option<&str>, RunnerError> {
        Ok(self.slots[self.slot_index(name)?].last_error.as_deref())
    }

    pub fn is_enabled(&self, name: &str) -> Result<bool, RunnerError> {
        Ok(self.slots[self.slot_index(name)?].enabled)
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), RunnerError> {
        let index = self.slot_index(name)?;
        self.slots[index].enabled = enabled;
        tracing::debug!("Check '{}' {}", name, if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Disable every unit named in the settings' disabled list
    pub fn apply_settings(&mut self, settings: &Settings) {
        for slot in &mut self.slots {
            if settings.is_disabled(slot.unit.name()) {
                slot.enabled = false;
                tracing::info!("Check '{}' disabled by settings", slot.unit.name());
            }
        }
    }

    /// Current status of every unit, in registry order
    pub fn statuses(&self) -> Vec<(&str, CheckStatus)> {
        self.slots.iter().map(|slot| (slot.name(), slot.status)).collect()
    }

    /// Tally of the current unit statuses; never-run units count as skipped
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for slot in &self.slots {
            match &slot.last_error {
                Some(error) if slot.status == CheckStatus::Failed => {
                    summary.record_failure(format!("{}: {}", slot.name(), error))
                }
                _ => summary.record(slot.status),
            }
        }
        summary
    }

    /// Descendants of `root` (any DAG kind) followed by `root` itself
    pub fn expand(scene: &dyn SceneProvider, root: &Locator) -> Result<Vec<Locator>, SceneError> {
        let mut objects = scene.list_descendants(root, NodeKind::Dag)?;
        objects.push(root.clone());
        Ok(objects)
    }

    /// Expand every root of the active selection, de-duplicated in first-seen order.
    ///
    /// Roots the host cannot expand are logged and skipped.
    pub fn expand_selection(scene: &dyn SceneProvider) -> Vec<Locator> {
        Self::expand_roots(scene, &scene.get_active_selection())
    }

    /// Expand `roots`, de-duplicated in first-seen order
    pub fn expand_roots(scene: &dyn SceneProvider, roots: &[Locator]) -> Vec<Locator> {
        let mut objects = IndexSet::new();

        for root in roots {
            match Self::expand(scene, &root.node()) {
                Ok(expanded) => objects.extend(expanded),
                Err(e) => tracing::warn!("Cannot expand {}: {}", root, e),
            }
        }

        objects.into_iter().collect()
    }

    /// Run one check pass on the slot at `index` and re-derive its status
    fn run_slot(
        &mut self,
        index: usize,
        scene: &dyn SceneProvider,
        objects: &[Locator],
        config: &CheckConfig,
    ) -> Result<CheckStatus, RunnerError> {
        let name = self.slots[index].name().to_string();
        self.emit(RunnerEvent::CheckStarted {
            name: name.clone(),
            objects: objects.len(),
        });

        let started = Instant::now();
        let outcome = self.slots[index].unit.check(scene, objects, config);

        let slot = &mut self.slots[index];
        slot.last_objects = objects.to_vec();
        slot.last_config = config.clone();

        match outcome {
            Ok(results) => {
                self.metrics.record_check(results.len(), started.elapsed());
                slot.status = CheckStatus::derive(&results, slot.unit.descriptor().is_warning);
                slot.last_results = results;
                slot.last_error = None;

                let status = slot.status;
                let defects = slot.last_results.len();
                tracing::debug!("{}: {} ({} defective objects)", name, status, defects);
                self.emit(RunnerEvent::StatusChanged {
                    name,
                    status,
                    defects,
                });
                Ok(status)
            }
            Err(error) => {
                self.metrics.record_check_failure();
                tracing::error!("{}: check could not run: {}", name, error);
                // results of an earlier pass no longer describe the inputs
                slot.last_results.clear();
                slot.status = CheckStatus::Failed;
                slot.last_error = Some(error.to_string());

                self.emit(RunnerEvent::CheckFailed {
                    name: name.clone(),
                    error: error.to_string(),
                });
                Err(RunnerError::CheckFailed { name, source: error })
            }
        }
    }

    /// Check `objects` with one unit.
    ///
    /// A disabled unit is not run and keeps its status. A configuration
    /// failure marks the unit `Failed` and is returned; it does not touch any
    /// other unit.
    pub fn run_one(
        &mut self,
        scene: &dyn SceneProvider,
        name: &str,
        objects: &[Locator],
        config: &CheckConfig,
    ) -> Result<CheckStatus, RunnerError> {
        let index = self.slot_index(name)?;
        if !self.slots[index].enabled {
            tracing::debug!("{}: disabled, not running", name);
            return Ok(self.slots[index].status);
        }
        self.run_slot(index, scene, objects, config)
    }

    /// Check `objects` with every enabled unit, in registry order
    pub fn run_all(
        &mut self,
        scene: &dyn SceneProvider,
        objects: &[Locator],
        config: &CheckConfig,
    ) -> RunSummary {
        let mut summary = RunSummary::default();

        for index in 0..self.slots.len() {
            if !self.slots[index].enabled {
                summary.skipped += 1;
                continue;
            }
            match self.run_slot(index, scene, objects, config) {
                Ok(status) => summary.record(status),
                Err(e) => summary.record_failure(e.to_string()),
            }
        }

        tracing::info!("Checked {} objects: {}", objects.len(), summary);
        summary
    }

    /// Fix the slot at `index` from its stored results, then re-check it.
    ///
    /// The fix itself is skipped for non-fixable units and empty results, but
    /// any enabled unit that has been checked before is re-checked so its
    /// status follows the current scene.
    fn fix_slot(
        &mut self,
        index: usize,
        scene: &mut dyn SceneProvider,
    ) -> Result<CheckStatus, RunnerError> {
        let slot = &self.slots[index];
        let name = slot.name().to_string();

        if !slot.enabled || slot.status == CheckStatus::Unevaluated {
            tracing::debug!("{}: disabled or never checked, nothing to do", name);
            return Ok(slot.status);
        }

        let fixed = if !slot.is_fixable() {
            tracing::debug!("{}: not fixable, re-checking only", name);
            Ok(())
        } else if slot.last_results.is_empty() {
            tracing::debug!("{}: no stored results, re-checking only", name);
            Ok(())
        } else {
            let targets = slot.last_results.len();
            tracing::info!("{}: fixing {} objects", name, targets);
            let fixed = slot.unit.fix(scene, &slot.last_results);

            match &fixed {
                Ok(()) => {
                    self.metrics.record_fix();
                    self.emit(RunnerEvent::FixApplied {
                        name: name.clone(),
                        targets,
                    });
                }
                Err(e) => {
                    self.metrics.record_fix_failure();
                    tracing::warn!("{}: fix failed: {}", name, e);
                    self.emit(RunnerEvent::FixFailed {
                        name: name.clone(),
                        error: e.to_string(),
                    });
                }
            }
            fixed
        };

        // re-check even after a failed fix, part of it may have been applied
        let objects = std::mem::take(&mut self.slots[index].last_objects);
        let config = std::mem::take(&mut self.slots[index].last_config);
        let rechecked = self.run_slot(index, &*scene, &objects, &config);

        match fixed {
            Ok(()) => rechecked,
            Err(source) => Err(RunnerError::FixFailed { name, source }),
        }
    }

    /// Fix one unit from its last results, then re-check it on the same objects.
    ///
    /// The fix is a no-op when the unit is not fixable or has no stored
    /// results; the re-check still runs. A disabled or never-checked unit is
    /// left alone and its current status returned.
    pub fn fix_one(&mut self, scene: &mut dyn SceneProvider, name: &str) -> Result<CheckStatus, RunnerError> {
        let index = self.slot_index(name)?;
        self.fix_slot(index, scene)
    }

    fn takes_fix(slot: &UnitSlot) -> bool {
        slot.enabled && slot.is_fixable() && slot.status != CheckStatus::Unevaluated
    }

    /// Fix and re-check every enabled, fixable, evaluated unit, in registry order.
    ///
    /// A failing unit is recorded and the remaining units still run.
    pub fn fix_all(&mut self, scene: &mut dyn SceneProvider) -> RunSummary {
        let mut summary = RunSummary::default();

        for index in 0..self.slots.len() {
            if !Self::takes_fix(&self.slots[index]) {
                summary.skipped += 1;
                continue;
            }
            match self.fix_slot(index, scene) {
                Ok(status) => summary.record(status),
                Err(e) => summary.record_failure(e.to_string()),
            }
        }

        tracing::info!("Fix pass: {}", summary);
        summary
    }

    /// Re-check every enabled unit that has been checked before, on its last inputs
    fn recheck_all(&mut self, scene: &dyn SceneProvider) {
        for index in 0..self.slots.len() {
            let slot = &self.slots[index];
            if !slot.enabled || slot.status == CheckStatus::Unevaluated {
                continue;
            }
            let objects = slot.last_objects.clone();
            let config = slot.last_config.clone();
            // failures are already logged and reflected in the unit status
            let _ = self.run_slot(index, scene, &objects, &config);
        }
    }

    /// Outstanding component count per (unit, target) of enabled fixable units
    fn outstanding(&self) -> HashMap<(String, Locator), usize> {
        self.slots
            .iter()
            .filter(|slot| slot.enabled && slot.is_fixable())
            .flat_map(|slot| {
                slot.last_results.iter().map(move |result| {
                    (
                        (slot.name().to_string(), result.target().clone()),
                        result.components().len(),
                    )
                })
            })
            .collect()
    }

    /// Repeat fix passes until no fixable unit reports defects.
    ///
    /// A fix may surface defects only another unit detects (deleting an
    /// intermediate shape can leave history behind), and a fix may only
    /// reduce a defect rather than clear it, so after every pass all evaluated
    /// units are re-checked. Stops after `max_rounds` passes, or early when a
    /// pass made no progress: every remaining (unit, target) was already
    /// fixed once and none of them reports fewer components than before.
    pub fn fix_until_converged(
        &mut self,
        scene: &mut dyn SceneProvider,
        max_rounds: usize,
    ) -> ConvergenceReport {
        let mut report = ConvergenceReport::default();
        // fewest components seen for each pair handed to a fix
        let mut attempted: HashMap<(String, Locator), usize> = HashMap::new();
        let mut pending = self.outstanding();

        while !pending.is_empty() && report.rounds < max_rounds {
            report.rounds += 1;
            tracing::info!("Fix round {}: {} defective objects", report.rounds, pending.len());
            for (pair, count) in pending {
                attempted
                    .entry(pair)
                    .and_modify(|best| *best = (*best).min(count))
                    .or_insert(count);
            }

            let summary = self.fix_all(scene);
            report.failures.extend(summary.failures);
            self.recheck_all(&*scene);

            pending = self.outstanding();
            let progressed = pending
                .iter()
                .any(|(pair, count)| attempted.get(pair).is_none_or(|best| count < best));
            if !pending.is_empty() && !progressed {
                tracing::warn!(
                    "Fix round {} made no progress ({} remaining)",
                    report.rounds,
                    pending.len()
                );
                report.stalled = true;
                break;
            }
        }

        report.remaining = pending.len();
        report.converged = pending.is_empty();
        if report.converged {
            tracing::info!("Fixes converged after {} rounds", report.rounds);
        } else if !report.stalled {
            tracing::warn!(
                "{} defective objects remain after {} fix rounds",
                report.remaining,
                report.rounds
            );
        }
        report
    }

    /// Select the components of `name`'s result for `target` in the host.
    ///
    /// A result with no components selects its target. Returns how many
    /// locators were selected (0 when the unit has no result for `target`).
    pub fn select_result(
        &self,
        scene: &mut dyn SceneProvider,
        name: &str,
        target: &Locator,
    ) -> Result<usize, RunnerError> {
        let index = self.slot_index(name)?;
        let Some(result) = self.slots[index]
            .last_results
            .iter()
            .find(|result| result.target() == target)
        else {
            return Ok(0);
        };

        if result.is_clean() {
            scene.select_active(std::slice::from_ref(result.target()));
            Ok(1)
        } else {
            scene.select_active(result.components());
            Ok(result.components().len())
        }
    }
}

impl std::fmt::Debug for CheckRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.statuses()).finish()
    }
}
