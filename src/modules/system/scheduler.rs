use rand::Rng;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{info, warn};

use crate::models::ScheduleConfig;
use crate::modules::rotation::{CycleOutcome, Rotator};

fn cycle_jitter_bounds(schedule: &ScheduleConfig) -> (u64, u64) {
    let (min, max) = (schedule.jitter_min_secs, schedule.jitter_max_secs);
    if min <= max {
        (min, max)
    } else {
        (max, min)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerObservabilitySnapshot {
    pub cycles_last_hour: usize,
    pub failures_last_hour: usize,
    pub messages_sent_last_hour: usize,
    pub last_outcome: Option<CycleOutcome>,
}

#[derive(Default)]
struct SchedulerObservabilityState {
    runs: VecDeque<(Instant, usize, bool)>,
    last_outcome: Option<CycleOutcome>,
}

fn scheduler_observability_state() -> &'static Mutex<SchedulerObservabilityState> {
    static STATE: OnceLock<Mutex<SchedulerObservabilityState>> = OnceLock::new();
    STATE.get_or_init(|| Mutex::new(SchedulerObservabilityState::default()))
}

fn cleanup_observability_locked(state: &mut SchedulerObservabilityState, now: Instant) {
    let window_start = now.checked_sub(Duration::from_secs(3600)).unwrap_or(now);
    while let Some((ts, _, _)) = state.runs.front() {
        if *ts < window_start {
            state.runs.pop_front();
        } else {
            break;
        }
    }
}

fn record_cycle(outcome: Option<&CycleOutcome>, failed: bool) {
    if let Ok(mut state) = scheduler_observability_state().lock() {
        let now = Instant::now();
        cleanup_observability_locked(&mut state, now);

        let sent = match outcome {
            Some(CycleOutcome::Dispatched { sent, .. }) => *sent,
            _ => 0,
        };
        state.runs.push_back((now, sent, failed));
        if let Some(outcome) = outcome {
            state.last_outcome = Some(outcome.clone());
        }
    }
}

pub fn scheduler_observability_snapshot() -> SchedulerObservabilitySnapshot {
    if let Ok(mut state) = scheduler_observability_state().lock() {
        cleanup_observability_locked(&mut state, Instant::now());

        let mut cycles = 0usize;
        let mut failures = 0usize;
        let mut sent_total = 0usize;
        for (_, sent, failed) in &state.runs {
            cycles += 1;
            sent_total += *sent;
            if *failed {
                failures += 1;
            }
        }

        return SchedulerObservabilitySnapshot {
            cycles_last_hour: cycles,
            failures_last_hour: failures,
            messages_sent_last_hour: sent_total,
            last_outcome: state.last_outcome.clone(),
        };
    }

    SchedulerObservabilitySnapshot {
        cycles_last_hour: 0,
        failures_last_hour: 0,
        messages_sent_last_hour: 0,
        last_outcome: None,
    }
}

#[cfg(test)]
fn clear_scheduler_observability_for_tests() {
    if let Ok(mut state) = scheduler_observability_state().lock() {
        *state = SchedulerObservabilityState::default();
    }
}

/// Start the recurring cycle driver. One spawned task owns the whole loop:
/// each cycle is awaited to completion before the next tick is taken, so two
/// cycles can never interleave over the same cursor, and a cycle that
/// overruns its interval simply delays the next one.
pub fn start_scheduler(rotator: Arc<Rotator>, schedule: ScheduleConfig) {
    tokio::spawn(async move {
        info!(
            "Rotation scheduler started (interval: {}s, run_on_start: {})",
            schedule.interval_secs, schedule.run_on_start
        );
        let mut interval = time::interval(Duration::from_secs(schedule.interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if !schedule.run_on_start {
            // The first tick of a tokio interval fires immediately; swallow
            // it when the operator asked to wait a full period.
            interval.tick().await;
        }

        let (jitter_min, jitter_max) = cycle_jitter_bounds(&schedule);

        loop {
            interval.tick().await;

            let jitter_secs = if jitter_max == 0 {
                0
            } else {
                rand::thread_rng().gen_range(jitter_min..=jitter_max)
            };
            if jitter_secs > 0 {
                info!("[Scheduler] Applying jitter before cycle: {}s", jitter_secs);
                time::sleep(Duration::from_secs(jitter_secs)).await;
            }

            match rotator.run_cycle().await {
                Ok(outcome) => {
                    record_cycle(Some(&outcome), false);
                    info!("[Scheduler] Cycle completed: {:?}", outcome);
                }
                Err(e) => {
                    // One bad cycle must never take the timer down with it.
                    record_cycle(None, true);
                    warn!("[Scheduler] Cycle failed: {}", e);
                }
            }
        }
    });
}
