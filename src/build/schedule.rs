//! Debounce-with-reschedule as an explicit state machine.
//!
//! ```text
//! state                change                     deadline   build finished
//! Idle                 Scheduled(now+W)           -          -
//! Scheduled(d)         Scheduled(now+W)           Running    -
//! Running              RunningWithPending(now)    -          Idle
//! RunningWithPending   RunningWithPending(now)    -          Scheduled(max(last, now)+W)
//! ```
//!
//! The machine never looks at a clock itself. Every transition takes the
//! current instant, so tests drive it with synthetic time.

use std::time::{Duration, Instant};

/// Where the orchestrator currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    /// Nothing pending.
    Idle,
    /// A build starts at `deadline` unless another change pushes it back.
    Scheduled { deadline: Instant },
    /// A build is executing; nothing pending.
    Running,
    /// A build is executing and at least one change arrived meanwhile.
    /// Exactly one follow-up build is owed.
    RunningWithPending { last_change: Instant },
}

/// Trailing-edge debounce that never overlaps builds.
#[derive(Debug, Clone)]
pub struct BuildSchedule {
    window: Duration,
    state: ScheduleState,
}

impl BuildSchedule {
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            state: ScheduleState::Idle,
        }
    }

    pub const fn state(&self) -> ScheduleState {
        self.state
    }

    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Change W. Applies from the next change on; a pending deadline keeps
    /// its current value.
    pub fn set_window(&mut self, window: Duration) {
        self.window = window;
    }

    pub const fn is_running(&self) -> bool {
        matches!(
            self.state,
            ScheduleState::Running | ScheduleState::RunningWithPending { .. }
        )
    }

    /// Instant at which [`Self::poll`] will start a build, if one is scheduled.
    pub const fn deadline(&self) -> Option<Instant> {
        match self.state {
            ScheduleState::Scheduled { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// A module source changed at `now`.
    pub fn on_source_changed(&mut self, now: Instant) {
        self.state = match self.state {
            ScheduleState::Idle | ScheduleState::Scheduled { .. } => ScheduleState::Scheduled {
                deadline: now + self.window,
            },
            ScheduleState::Running | ScheduleState::RunningWithPending { .. } => {
                ScheduleState::RunningWithPending { last_change: now }
            }
        };
    }

    /// Start the scheduled build if its deadline has passed.
    ///
    /// Returns `true` when the caller must run a build now.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            ScheduleState::Scheduled { deadline } if now >= deadline => {
                self.state = ScheduleState::Running;
                true
            }
            _ => false,
        }
    }

    /// Build immediately, skipping the quiet window.
    ///
    /// Returns `false` when a build is already running; the request then
    /// becomes that build's single follow-up.
    pub fn start_now(&mut self, now: Instant) -> bool {
        if self.is_running() {
            self.state = ScheduleState::RunningWithPending { last_change: now };
            false
        } else {
            self.state = ScheduleState::Running;
            true
        }
    }

    /// The running build finished (success or failure) at `now`.
    pub fn on_build_finished(&mut self, now: Instant) {
        self.state = match self.state {
            ScheduleState::RunningWithPending { last_change } => ScheduleState::Scheduled {
                deadline: last_change.max(now) + self.window,
            },
            _ => ScheduleState::Idle,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: Duration = Duration::from_millis(500);

    fn ms(base: Instant, n: u64) -> Instant {
        base + Duration::from_millis(n)
    }

    #[test]
    fn test_burst_coalesces_into_one_build() {
        let t0 = Instant::now();
        let mut schedule = BuildSchedule::new(W);

        schedule.on_source_changed(t0);
        schedule.on_source_changed(ms(t0, 100));

        assert!(!schedule.poll(ms(t0, 500)));
        assert!(schedule.poll(ms(t0, 600)));
        assert_eq!(schedule.state(), ScheduleState::Running);
        assert!(!schedule.poll(ms(t0, 700)));

        schedule.on_build_finished(ms(t0, 900));
        assert_eq!(schedule.state(), ScheduleState::Idle);
        assert!(!schedule.poll(ms(t0, 5000)));
    }

    #[test]
    fn test_change_resets_deadline() {
        let t0 = Instant::now();
        let mut schedule = BuildSchedule::new(W);

        schedule.on_source_changed(t0);
        assert_eq!(schedule.deadline(), Some(ms(t0, 500)));
        schedule.on_source_changed(ms(t0, 400));
        assert_eq!(schedule.deadline(), Some(ms(t0, 900)));
    }

    #[test]
    fn test_changes_during_build_owe_exactly_one_followup() {
        let t0 = Instant::now();
        let mut schedule = BuildSchedule::new(W);

        schedule.on_source_changed(t0);
        assert!(schedule.poll(ms(t0, 500)));

        for n in [600, 700, 800, 900] {
            schedule.on_source_changed(ms(t0, n));
            assert!(schedule.deadline().is_none(), "never scheduled while running");
        }
        assert_eq!(
            schedule.state(),
            ScheduleState::RunningWithPending {
                last_change: ms(t0, 900)
            }
        );

        schedule.on_build_finished(ms(t0, 1000));
        assert_eq!(schedule.deadline(), Some(ms(t0, 1500)));
        assert!(schedule.poll(ms(t0, 1500)));

        schedule.on_build_finished(ms(t0, 1800));
        assert_eq!(schedule.state(), ScheduleState::Idle);
    }

    #[test]
    fn test_followup_waits_window_after_completion() {
        let t0 = Instant::now();
        let mut schedule = BuildSchedule::new(W);

        assert!(schedule.start_now(t0));
        schedule.on_source_changed(ms(t0, 10));
        schedule.on_build_finished(ms(t0, 3000));

        assert!(!schedule.poll(ms(t0, 3100)));
        assert!(schedule.poll(ms(t0, 3500)));
    }

    #[test]
    fn test_start_now_while_running_defers() {
        let t0 = Instant::now();
        let mut schedule = BuildSchedule::new(W);

        assert!(schedule.start_now(t0));
        assert!(!schedule.start_now(ms(t0, 50)));
        assert!(matches!(
            schedule.state(),
            ScheduleState::RunningWithPending { .. }
        ));
    }

    #[test]
    fn test_start_now_cancels_pending_deadline() {
        let t0 = Instant::now();
        let mut schedule = BuildSchedule::new(W);

        schedule.on_source_changed(t0);
        assert!(schedule.start_now(ms(t0, 10)));
        schedule.on_build_finished(ms(t0, 200));
        assert_eq!(schedule.state(), ScheduleState::Idle);
    }
}
