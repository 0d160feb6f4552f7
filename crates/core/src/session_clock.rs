use std::time::Duration;

/// One-shot signal that the countdown reached zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "an expired clock must be turned into a submission"]
pub struct ClockExpired;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockState {
    Idle,
    Running,
    Expired,
    Stopped,
}

/// Tick-driven countdown for a single attempt.
///
/// The caller delivers one `tick()` per second from whatever timer it owns.
/// `ClockExpired` is produced at most once per instance: after expiry or
/// `stop()` every further tick is a no-op and `remaining` never changes again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClock {
    remaining_secs: u64,
    state: ClockState,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            remaining_secs: 0,
            state: ClockState::Idle,
        }
    }

    /// Begin counting down from `duration_secs`.
    ///
    /// A zero or negative duration expires immediately without ticking. Only an
    /// idle clock can be started; later calls return `None` and change nothing.
    pub fn start(&mut self, duration_secs: i64) -> Option<ClockExpired> {
        if self.state != ClockState::Idle {
            return None;
        }
        match u64::try_from(duration_secs) {
            Ok(secs) if secs > 0 => {
                self.remaining_secs = secs;
                self.state = ClockState::Running;
                None
            }
            _ => {
                self.remaining_secs = 0;
                self.state = ClockState::Expired;
                Some(ClockExpired)
            }
        }
    }

    /// Advance one second. Emits `ClockExpired` on the transition to zero.
    pub fn tick(&mut self) -> Option<ClockExpired> {
        if self.state != ClockState::Running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.state = ClockState::Expired;
            return Some(ClockExpired);
        }
        None
    }

    /// Halt without expiring. Idempotent; a stopped clock can never expire.
    pub fn stop(&mut self) {
        if matches!(self.state, ClockState::Idle | ClockState::Running) {
            self.state = ClockState::Stopped;
        }
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        Duration::from_secs(self.remaining_secs)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    #[must_use]
    pub fn has_expired(&self) -> bool {
        self.state == ClockState::Expired
    }
}
