use crate::ring_buffer::RingBuffer;
use crate::step_info::StepInput;
use crate::telemetry::{InvariantChecker, InvariantViolation};
use crate::{Config, PlayerHandle, PlayerKind, RampartError, Step};

/// Per-participant record: input history, confirmation signalling and ping.
///
/// Inputs live in a ring sized to the rollback window, so the slot for step
/// `s` is also the slot for step `s - window`. `last_confirmed_step` is the
/// misprediction signal: for Remote players it moves off the sentinel when an
/// authoritative input contradicts the prediction the session simulated with,
/// and back to the sentinel when the session consumes the signal during a
/// rollback. Local and Spectator players stay at the sentinel permanently.
#[derive(Debug, Clone)]
pub(crate) struct Player<T>
where
    T: Config,
{
    handle: PlayerHandle,
    kind: PlayerKind,
    /// Cyclic input history, one slot per step in the rollback window.
    inputs: RingBuffer<StepInput<T::Input>>,
    /// Highest step for which an input was recorded.
    last_added_step: Step,
    /// Earliest step at which a pending misprediction was observed.
    last_confirmed_step: Step,
    /// Most recent round-trip estimate in milliseconds. Remote only.
    ping_ms: u32,
}

impl<T: Config> Player<T> {
    pub(crate) fn new(handle: PlayerHandle, kind: PlayerKind, rollback_window: usize) -> Self {
        Self {
            handle,
            kind,
            inputs: RingBuffer::new(rollback_window, StepInput::blank(Step::NULL)),
            last_added_step: Step::NULL,
            last_confirmed_step: Step::NULL,
            ping_ms: 0,
        }
    }

    pub(crate) fn kind(&self) -> PlayerKind {
        self.kind
    }

    pub(crate) fn ping_ms(&self) -> u32 {
        self.ping_ms
    }

    pub(crate) fn set_ping_ms(&mut self, ping_ms: u32) {
        self.ping_ms = ping_ms;
    }

    pub(crate) fn last_added_step(&self) -> Step {
        self.last_added_step
    }

    pub(crate) fn last_confirmed_step(&self) -> Step {
        self.last_confirmed_step
    }

    /// Consumes the pending misprediction signal.
    pub(crate) fn clear_confirmed_step(&mut self) {
        self.last_confirmed_step = Step::NULL;
    }

    /// Appends an input for `step`.
    ///
    /// Returns `Ok(false)` for duplicate or stale steps without mutating
    /// anything. Steps must otherwise arrive strictly sequentially; a gap is
    /// a contract violation.
    ///
    /// For Remote players without a pending signal, the freshly arrived input
    /// is compared against the slot for `step - 1`. The session predicts by
    /// repeating a player's most recent known input, so that slot holds
    /// exactly the value any earlier simulation of `step` consumed; a
    /// difference marks `step` as the earliest misprediction. For the first
    /// input this compares against the blank slot, matching the default
    /// prediction used before any input arrived.
    pub(crate) fn add_input(&mut self, step: Step, input: T::Input) -> Result<bool, RampartError> {
        if step <= self.last_added_step {
            return Ok(false);
        }
        if step != self.last_added_step + 1 {
            return Err(RampartError::NonSequentialInput {
                handle: self.handle,
                step,
                last_added_step: self.last_added_step,
            });
        }

        self.last_added_step = step;
        self.inputs
            .set(i64::from(step.as_i32()), StepInput::new(step, input));

        if self.kind == PlayerKind::Remote && self.last_confirmed_step.is_null() {
            let prediction = self.inputs.get(i64::from(step.as_i32()) - 1);
            if prediction.input != input {
                self.last_confirmed_step = step;
            }
        }
        Ok(true)
    }

    /// Returns the input to simulate `step` with.
    ///
    /// The requested step is clamped into `[0, last_added_step]`, so steps
    /// beyond the history repeat the most recent known input (the prediction)
    /// and a player with no inputs yields the default. A slot whose recorded
    /// step differs from the clamped step has aged out of the ring.
    pub(crate) fn get_input(&self, step: Step) -> Result<T::Input, RampartError> {
        if self.last_added_step.is_null() {
            return Ok(self.inputs.get(0).input);
        }
        let clamped = step.clamp(Step::new(0), self.last_added_step);
        let slot = self.inputs.get(i64::from(clamped.as_i32()));
        if slot.step != clamped {
            return Err(RampartError::StaleInputSlot {
                handle: self.handle,
                step: clamped,
                recorded_step: slot.step,
            });
        }
        Ok(slot.input)
    }

    /// Estimates the step the remote endpoint has itself reached locally:
    /// the latest input we hold plus the steps in flight during one round
    /// trip.
    pub(crate) fn estimated_local_step(&self, update_interval_ms: f64) -> Step {
        let in_flight = (f64::from(self.ping_ms) / update_interval_ms).floor() as i32;
        self.last_added_step + in_flight
    }
}

impl<T: Config> InvariantChecker for Player<T> {
    /// Checks the invariants of the player record.
    ///
    /// # Invariants
    ///
    /// 1. `last_added_step` is the sentinel or non-negative
    /// 2. `last_confirmed_step` is the sentinel or in `[0, last_added_step]`
    /// 3. Only Remote players carry a confirmation signal
    /// 4. Only Remote players carry a ping
    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if !self.last_added_step.is_null() && !self.last_added_step.is_valid() {
            return Err(
                InvariantViolation::new("Player", "last_added_step is negative")
                    .with_details(format!("last_added_step={}", self.last_added_step)),
            );
        }

        if !self.last_confirmed_step.is_null() {
            if !self.last_confirmed_step.is_valid()
                || self.last_confirmed_step > self.last_added_step
            {
                return Err(InvariantViolation::new(
                    "Player",
                    "last_confirmed_step outside [0, last_added_step]",
                )
                .with_details(format!(
                    "last_confirmed_step={}, last_added_step={}",
                    self.last_confirmed_step, self.last_added_step
                )));
            }
            if self.kind != PlayerKind::Remote {
                return Err(InvariantViolation::new(
                    "Player",
                    "non-Remote player carries a confirmation signal",
                )
                .with_details(format!("kind={}", self.kind)));
            }
        }

        if self.kind != PlayerKind::Remote && self.ping_ms != 0 {
            return Err(
                InvariantViolation::new("Player", "non-Remote player carries a ping")
                    .with_details(format!("kind={}, ping_ms={}", self.kind, self.ping_ms)),
            );
        }

        Ok(())
    }
}

// #########
// # TESTS #
// #########
