//! Tick Scheduler: drives one step per elevator per cycle.
//!
//! [`run_scheduler`] is the top-level loop. Each cycle:
//!
//! 1. Load every elevator with its building, ordered by elevator id.
//! 2. Step each elevator in turn ([`step_elevator`]).
//! 3. Notify after each committed step.
//! 4. Sleep for the configured interval, waking early on stop.
//!
//! Cycles never overlap. A failed elevator is logged and skipped for that
//! cycle only; a failed load skips the whole cycle. Neither stops the
//! loop.

use std::collections::BTreeSet;
use std::sync::Arc;

use liftsim_db::EntityStore;
use liftsim_types::ElevatorId;
use tracing::{debug, info, warn};

use crate::config::DoorTiming;
use crate::control::SchedulerControl;
use crate::notifier::Notifier;
use crate::runtime::{ElevatorRuntime, RuntimeArena};
use crate::step::step_elevator;

/// Result of one scheduler cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Cycle number.
    pub tick: u64,
    /// Elevators whose step was committed.
    pub stepped: u64,
    /// Elevators whose step failed and was discarded.
    pub failures: u64,
    /// Whether the elevator list itself could not be loaded.
    pub load_failed: bool,
}

/// Totals returned when [`run_scheduler`] exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    /// Cycles executed.
    pub cycles: u64,
    /// Elevator steps that failed across all cycles.
    pub elevator_failures: u64,
}

/// The scheduler component: store and notifier handles plus the runtime
/// arena it exclusively owns.
pub struct Scheduler<S, N> {
    store: Arc<S>,
    notifier: N,
    timing: DoorTiming,
    arena: RuntimeArena,
}

impl<S: EntityStore, N: Notifier> Scheduler<S, N> {
    /// Build a scheduler with an empty arena.
    pub const fn new(store: Arc<S>, notifier: N, timing: DoorTiming) -> Self {
        Self {
            store,
            notifier,
            timing,
            arena: RuntimeArena::new(),
        }
    }

    /// Runtime state of an elevator, for inspection.
    pub fn runtime(&self, id: ElevatorId) -> Option<&ElevatorRuntime> {
        self.arena.get(id)
    }

    /// The store this scheduler drives.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Run one cycle over every elevator.
    pub async fn run_cycle(&mut self, tick: u64) -> CycleSummary {
        let mut summary = CycleSummary {
            tick,
            ..CycleSummary::default()
        };

        let elevators = match self.store.elevators_with_buildings().await {
            Ok(elevators) => elevators,
            Err(e) => {
                warn!(tick, error = %e, "Failed to load elevators, skipping cycle");
                summary.load_failed = true;
                return summary;
            }
        };

        let live: BTreeSet<ElevatorId> = elevators.iter().map(|(e, _)| e.id).collect();
        self.arena.retain_elevators(&live);

        for (elevator, building) in elevators {
            let elevator_id = elevator.id;
            match step_elevator(
                self.store.as_ref(),
                &mut self.arena,
                elevator,
                &building,
                self.timing,
                tick,
            )
            .await
            {
                Ok(outcome) => {
                    summary.stepped = summary.stepped.saturating_add(1);
                    if outcome.handled_calls > 0 || outcome.assignments > 0 {
                        debug!(
                            tick,
                            %elevator_id,
                            floor = outcome.snapshot.current_floor,
                            handled = outcome.handled_calls,
                            assigned = outcome.assignments,
                            "Elevator step"
                        );
                    }
                    if let Err(e) = self.notifier.notify(&outcome.snapshot).await {
                        warn!(tick, %elevator_id, error = %e, "Failed to notify subscribers");
                    }
                }
                Err(e) => {
                    summary.failures = summary.failures.saturating_add(1);
                    warn!(tick, %elevator_id, error = %e, "Elevator step discarded");
                }
            }
        }

        summary
    }
}

/// Run cycles until `control` requests a stop.
///
/// Pause is honoured between cycles. A stop requested mid-cycle lets that
/// cycle finish; a stop during the inter-cycle sleep ends it immediately.
pub async fn run_scheduler<S: EntityStore, N: Notifier>(
    scheduler: &mut Scheduler<S, N>,
    control: &SchedulerControl,
) -> SchedulerReport {
    let mut report = SchedulerReport::default();
    info!(
        tick_interval_ms = control.tick_interval_ms(),
        open_ticks = scheduler.timing.open_ticks,
        close_ticks = scheduler.timing.close_ticks,
        "Scheduler starting"
    );

    loop {
        if control.is_paused() && !control.is_stop_requested() {
            info!("Scheduler paused, waiting for resume...");
            control.wait_while_paused().await;
            info!("Scheduler resumed");
        }
        if control.is_stop_requested() {
            break;
        }

        let tick = control.advance_tick();
        let summary = scheduler.run_cycle(tick).await;
        report.cycles = report.cycles.saturating_add(1);
        report.elevator_failures = report.elevator_failures.saturating_add(summary.failures);

        tokio::select! {
            () = tokio::time::sleep(control.tick_interval()) => {}
            () = control.stopped() => {}
        }
    }

    info!(
        cycles = report.cycles,
        elevator_failures = report.elevator_failures,
        "Scheduler stopped"
    );
    report
}
