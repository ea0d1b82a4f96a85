//! The rollback session: step advancement, snapshot scheduling, rollback and
//! the catch-up throttle.
//!
//! # Threading
//!
//! A session assumes two concurrent contexts. The *game thread* owns the
//! session value and calls [`RollbackSession::update`],
//! [`RollbackSession::add_local_input`], [`RollbackSession::add_player`],
//! [`RollbackSession::set_ping`] and [`RollbackSession::get_ping`]. The
//! *network thread* feeds [`RollbackSession::add_remote_input`] through a
//! cloneable [`RemoteInputSink`] as packets arrive.
//!
//! Exactly one mutex — the rollback lock around the player set — is shared
//! between the two. `update` holds it from sync determination through the end
//! of resimulation, so inbound remote input cannot move confirmation signals
//! or ring contents in between; remote ingestion holds it for the duration of
//! one `add_input`. The snapshot ring, step counter and accumulator belong to
//! the game thread alone, and the throttle/advance phases take only short
//! read locks, so the host's `save_state`/`advance_step` on the common path
//! are never serialized against packet arrival.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::host::SessionHost;
use crate::player::Player;
use crate::report_violation_to;
use crate::ring_buffer::RingBuffer;
use crate::step_info::Snapshot;
use crate::telemetry::{
    InvariantChecker, InvariantViolation, TracingObserver, ViolationKind, ViolationObserver,
    ViolationSeverity,
};
use crate::{
    Config, InputVec, PlayerHandle, PlayerKind, RampartError, RampartResult, SessionConfig, Step,
};

/// The players of a session, in insertion order. Guarded by the rollback
/// lock; handles index into it by id.
pub(crate) struct PlayerSet<T>
where
    T: Config,
{
    players: Vec<Player<T>>,
    rollback_window: usize,
    /// The contract-violation sink every real violation is reported through.
    observer: Arc<dyn ViolationObserver>,
}

impl<T: Config> PlayerSet<T> {
    fn new(rollback_window: usize) -> Self {
        Self {
            players: Vec::new(),
            rollback_window,
            observer: Arc::new(TracingObserver),
        }
    }

    fn set_observer(&mut self, observer: Arc<dyn ViolationObserver>) {
        self.observer = observer;
    }

    fn add(&mut self, kind: PlayerKind) -> PlayerHandle {
        let handle = PlayerHandle::new(self.players.len(), kind);
        self.players
            .push(Player::new(handle, kind, self.rollback_window));
        handle
    }

    fn len(&self) -> usize {
        self.players.len()
    }

    fn resolve(&self, handle: PlayerHandle) -> RampartResult<&Player<T>> {
        self.players
            .get(handle.id())
            .ok_or(RampartError::InvalidPlayerHandle {
                handle,
                num_players: self.players.len(),
            })
    }

    /// Determines the latest synchronized step: starting from
    /// `current_step`, every pending confirmation signal that improves on it
    /// lowers it and is consumed in the process.
    fn earliest_synchronized_step(&mut self, current_step: Step) -> Step {
        let mut sync = current_step;
        for player in &mut self.players {
            let confirmed = player.last_confirmed_step();
            if !confirmed.is_null() && confirmed < sync {
                sync = confirmed;
                player.clear_confirmed_step();
            }
        }
        sync
    }

    /// Fills `scratch` with every player's input for `step`, in insertion
    /// order.
    fn gather_inputs(&self, step: Step, scratch: &mut InputVec<T::Input>) -> RampartResult<()> {
        scratch.clear();
        for player in &self.players {
            match player.get_input(step) {
                Ok(input) => scratch.push(input),
                Err(err) => {
                    report_violation_to!(
                        &*self.observer,
                        ViolationSeverity::Critical,
                        ViolationKind::InputSequence,
                        "{}",
                        err
                    );
                    return Err(err);
                },
            }
        }
        Ok(())
    }

    /// The largest number of steps any remote peer trails the local
    /// simulation by. Local players and Spectators never contribute: the
    /// throttle exists to let trailing *remote* peers catch up, and an
    /// input-less participant would otherwise stall the session for good.
    fn max_remote_advantage(&self, current_step: Step, update_interval_ms: f64) -> i32 {
        let mut advantage = 0;
        for player in &self.players {
            if player.kind() != PlayerKind::Remote {
                continue;
            }
            let estimated = player.estimated_local_step(update_interval_ms);
            advantage = advantage.max((current_step - estimated).max(0));
        }
        advantage
    }

    /// Shared ingestion path for remote inputs, called with the rollback
    /// lock held.
    fn ingest_remote(
        &mut self,
        handle: PlayerHandle,
        step: Step,
        input: T::Input,
    ) -> RampartResult<bool> {
        self.ingest(handle, PlayerKind::Remote, step, input)
    }

    /// Ingestion path for local inputs; same shape, opposite kind check.
    fn ingest_local(
        &mut self,
        handle: PlayerHandle,
        step: Step,
        input: T::Input,
    ) -> RampartResult<bool> {
        self.ingest(handle, PlayerKind::Local, step, input)
    }

    fn ingest(
        &mut self,
        handle: PlayerHandle,
        expected: PlayerKind,
        step: Step,
        input: T::Input,
    ) -> RampartResult<bool> {
        let actual = self.resolve(handle)?.kind();
        if actual != expected {
            let err = RampartError::WrongPlayerKind {
                handle,
                expected,
                actual,
            };
            report_violation_to!(
                &*self.observer,
                ViolationSeverity::Error,
                ViolationKind::InputSequence,
                "{}",
                err
            );
            return Err(err);
        }
        let result = self.players[handle.id()].add_input(step, input);
        if let Err(err) = &result {
            report_violation_to!(
                &*self.observer,
                ViolationSeverity::Error,
                ViolationKind::InputSequence,
                "{}",
                err
            );
        }
        result
    }

    /// Stores a remote player's ping, rejecting other kinds.
    fn set_ping(&mut self, handle: PlayerHandle, ping_ms: u32) -> RampartResult<()> {
        let actual = self.resolve(handle)?.kind();
        if actual != PlayerKind::Remote {
            return Err(RampartError::WrongPlayerKind {
                handle,
                expected: PlayerKind::Remote,
                actual,
            });
        }
        self.players[handle.id()].set_ping_ms(ping_ms);
        Ok(())
    }
}

/// What a single [`RollbackSession::update`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpdateReport {
    /// The step a rollback restored, if one was required.
    pub rolled_back_to: Option<Step>,
    /// How many steps were re-simulated by the rollback.
    pub resimulated_steps: u32,
    /// The throttle delay subtracted from the accumulator, in milliseconds.
    pub throttle_delay_ms: f64,
    /// Whether the session advanced one new step.
    pub advanced: bool,
}

/// A cloneable handle for feeding remote inputs from a network thread.
///
/// Obtained from [`RollbackSession::remote_input_sink`]; every clone shares
/// the session's rollback lock, so ingestion is serialized against the
/// rollback-critical section of `update` exactly as if
/// [`RollbackSession::add_remote_input`] had been called on the game thread.
pub struct RemoteInputSink<T>
where
    T: Config,
{
    players: Arc<Mutex<PlayerSet<T>>>,
}

impl<T: Config> RemoteInputSink<T> {
    /// Adds an input a remote player produced for `step`.
    ///
    /// Returns `Ok(false)` for duplicate or stale inputs (silently dropped).
    ///
    /// # Errors
    ///
    /// Fails for unknown handles, non-Remote handles and non-sequential
    /// steps.
    pub fn add_remote_input(
        &self,
        handle: PlayerHandle,
        step: Step,
        input: T::Input,
    ) -> RampartResult<bool> {
        self.players.lock().ingest_remote(handle, step, input)
    }
}

impl<T: Config> Clone for RemoteInputSink<T> {
    fn clone(&self) -> Self {
        Self {
            players: self.players.clone(),
        }
    }
}

impl<T: Config> std::fmt::Debug for RemoteInputSink<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteInputSink")
            .field("num_players", &self.players.lock().len())
            .finish()
    }
}

/// A rollback netcode session.
///
/// Owns the step counter, the snapshot ring, the player set and the update
/// accumulator, and orchestrates rollback, step advancement and the catch-up
/// throttle against the host's [`SessionHost`] callbacks. See the
/// [module documentation](self) for the threading contract.
///
/// The step counter only ever increases; a rollback re-executes the
/// simulation until it reaches the same counter value again.
pub struct RollbackSession<T>
where
    T: Config,
{
    config: SessionConfig,
    rollback_window: usize,
    current_step: Step,
    /// Accumulated unsimulated time in milliseconds.
    update_timer_ms: f64,
    snapshots: RingBuffer<Snapshot<T::State>>,
    /// Scratch sequence reused to present inputs to the host.
    scratch_inputs: InputVec<T::Input>,
    players: Arc<Mutex<PlayerSet<T>>>,
}

impl<T: Config> RollbackSession<T> {
    /// Creates a session after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RampartError::InvalidConfig`] for a non-positive update
    /// interval or ping cap.
    pub fn new(config: SessionConfig) -> RampartResult<Self> {
        config.validate()?;
        Ok(Self::with_validated_config(config))
    }

    pub(crate) fn with_validated_config(config: SessionConfig) -> Self {
        let rollback_window = config.rollback_window();
        Self {
            config,
            rollback_window,
            current_step: Step::new(0),
            update_timer_ms: 0.0,
            snapshots: RingBuffer::new(rollback_window, Snapshot::default()),
            scratch_inputs: InputVec::new(),
            players: Arc::new(Mutex::new(PlayerSet::new(rollback_window))),
        }
    }

    /// The session's configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The number of past steps both rings retain.
    #[must_use]
    pub fn rollback_window(&self) -> usize {
        self.rollback_window
    }

    /// The next step the session will simulate.
    #[must_use]
    pub fn current_step(&self) -> Step {
        self.current_step
    }

    /// The number of registered participants.
    #[must_use]
    pub fn num_players(&self) -> usize {
        self.players.lock().len()
    }

    /// Registers a new participant and returns its handle.
    ///
    /// Handles are stable for the session's lifetime and never reissued. The
    /// scratch input sequence grows to match the player count.
    pub fn add_player(&mut self, kind: PlayerKind) -> PlayerHandle {
        let handle = self.players.lock().add(kind);
        self.scratch_inputs.resize(handle.id() + 1, T::Input::default());
        handle
    }

    /// Returns a cloneable sink for feeding remote inputs from another
    /// thread.
    #[must_use]
    pub fn remote_input_sink(&self) -> RemoteInputSink<T> {
        RemoteInputSink {
            players: self.players.clone(),
        }
    }

    /// Replaces the contract-violation sink.
    ///
    /// Every contract violation the session rejects — non-sequential inputs,
    /// kind mismatches, pings over the cap, rollbacks to discarded state —
    /// is reported through this observer in addition to being returned as a
    /// [`RampartError`]. Defaults to
    /// [`TracingObserver`](crate::telemetry::TracingObserver); use a
    /// [`CollectingObserver`](crate::telemetry::CollectingObserver) in tests
    /// or a [`CompositeObserver`](crate::telemetry::CompositeObserver) to
    /// fan out to several sinks.
    pub fn set_violation_observer(&mut self, observer: Arc<dyn ViolationObserver>) {
        self.players.lock().set_observer(observer);
    }

    /// Records an input the local player produced for the current step and,
    /// if it was accepted, broadcasts it through the host.
    ///
    /// Returns `Ok(false)` if the input was a duplicate for the current step;
    /// no broadcast happens in that case.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles and non-Local handles.
    pub fn add_local_input<H>(
        &mut self,
        handle: PlayerHandle,
        input: T::Input,
        host: &mut H,
    ) -> RampartResult<bool>
    where
        H: SessionHost<T>,
    {
        let step = self.current_step;
        let accepted = self.players.lock().ingest_local(handle, step, input)?;
        if accepted {
            host.broadcast_input(handle, step, input);
        }
        Ok(accepted)
    }

    /// Records an input a remote player produced for `step`.
    ///
    /// Runs under the rollback lock. Returns `Ok(false)` for duplicate or
    /// stale inputs (silently dropped).
    ///
    /// # Errors
    ///
    /// Fails for unknown handles, non-Remote handles and non-sequential
    /// steps.
    pub fn add_remote_input(
        &self,
        handle: PlayerHandle,
        step: Step,
        input: T::Input,
    ) -> RampartResult<bool> {
        self.players.lock().ingest_remote(handle, step, input)
    }

    /// Stores a remote player's most recent round-trip estimate.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles, non-Remote handles and pings above the
    /// configured [`SessionConfig::max_remote_ping_ms`] — the rollback window
    /// was sized from that cap at construction and cannot absorb more.
    pub fn set_ping(&mut self, handle: PlayerHandle, ping_ms: u32) -> RampartResult<()> {
        let mut players = self.players.lock();
        if ping_ms > self.config.max_remote_ping_ms {
            let err = RampartError::PingAboveCap {
                handle,
                ping_ms,
                max_remote_ping_ms: self.config.max_remote_ping_ms,
            };
            report_violation_to!(
                &*players.observer,
                ViolationSeverity::Error,
                ViolationKind::Configuration,
                "{}",
                err
            );
            return Err(err);
        }
        players.set_ping(handle, ping_ms)
    }

    /// Returns a player's stored round-trip estimate (0 for Local players
    /// and Spectators).
    ///
    /// # Errors
    ///
    /// Fails for unknown handles.
    pub fn get_ping(&self, handle: PlayerHandle) -> RampartResult<u32> {
        Ok(self.players.lock().resolve(handle)?.ping_ms())
    }

    /// Drives the session by `delta_ms` milliseconds of wall time.
    ///
    /// Under the rollback lock, determines the latest synchronized step and,
    /// if any remote correction is pending, restores that step's snapshot and
    /// re-simulates forward. Then, lock released, applies the catch-up
    /// throttle to the accumulator and advances **at most one** new step.
    ///
    /// One step per call is deliberate: the throttle is computed before
    /// advancement, and spending the entire accumulated delta in one call
    /// would let a single tick deliver many steps and defeat the delay. A
    /// host whose frames are longer than the update interval therefore
    /// advances at most one simulation step per rendered frame.
    ///
    /// # Errors
    ///
    /// Fails if a pending correction targets a step whose snapshot has been
    /// overwritten ([`RampartError::SnapshotEvicted`]) or an input slot aged
    /// out of a player's ring ([`RampartError::StaleInputSlot`]); both mean
    /// the host let a peer fall outside the configured rollback window.
    pub fn update<H>(&mut self, delta_ms: f64, host: &mut H) -> RampartResult<UpdateReport>
    where
        H: SessionHost<T>,
    {
        let mut report = UpdateReport::default();

        // Phases 1-2 under the rollback lock: while we compute the
        // synchronized step and resimulate, no remote input may move the
        // signals or ring contents underneath us.
        let players_arc = Arc::clone(&self.players);
        {
            let mut players = players_arc.lock();
            let sync = players.earliest_synchronized_step(self.current_step);
            if sync != self.current_step {
                self.resimulate_from(sync, &players, host)?;
                report.rolled_back_to = Some(sync);
                report.resimulated_steps = (self.current_step - sync) as u32;
            }
        }

        // Throttle: trail the accumulator by the advantage over the slowest
        // remote peer.
        let advantage = self
            .players
            .lock()
            .max_remote_advantage(self.current_step, self.config.update_interval_ms);
        let delay_ms = f64::from(advantage) * self.config.delay_factor_ms();
        self.update_timer_ms = (self.update_timer_ms + delta_ms - delay_ms).max(0.0);
        report.throttle_delay_ms = delay_ms;
        if advantage > 0 {
            tracing::trace!(
                advantage,
                delay_ms,
                step = self.current_step.as_i32(),
                "throttling for trailing remote peers"
            );
        }

        // Advance at most one step.
        if self.update_timer_ms < self.config.update_interval_ms {
            return Ok(report);
        }
        self.update_timer_ms -= self.config.update_interval_ms;

        self.snapshots.set(
            i64::from(self.current_step.as_i32()),
            Snapshot::new(self.current_step, host.save_state()),
        );
        {
            let players = self.players.lock();
            players.gather_inputs(self.current_step, &mut self.scratch_inputs)?;
        }
        host.advance_step(&self.scratch_inputs);
        self.current_step += 1;
        report.advanced = true;
        tracing::trace!(step = self.current_step.as_i32(), "advanced one step");

        Ok(report)
    }

    /// Restores the snapshot stored for `sync` and re-simulates every step up
    /// to (excluding) the current one. Steps after the first re-save their
    /// snapshot first, because resimulation itself produces the states a
    /// future rollback may target.
    fn resimulate_from<H>(
        &mut self,
        sync: Step,
        players: &PlayerSet<T>,
        host: &mut H,
    ) -> RampartResult<()>
    where
        H: SessionHost<T>,
    {
        let slot = self.snapshots.get(i64::from(sync.as_i32()));
        let state = match slot.data.clone() {
            Some(state) if slot.step == sync => state,
            _ => {
                let err = RampartError::SnapshotEvicted {
                    step: sync,
                    current_step: self.current_step,
                    rollback_window: self.rollback_window,
                };
                report_violation_to!(
                    &*players.observer,
                    ViolationSeverity::Critical,
                    ViolationKind::StateManagement,
                    "{}",
                    err
                );
                return Err(err);
            },
        };
        host.load_state(state);

        let steps_to_resimulate = self.current_step - sync;
        tracing::debug!(
            from = sync.as_i32(),
            to = self.current_step.as_i32(),
            steps_to_resimulate,
            "rolling back"
        );

        for i in 0..steps_to_resimulate {
            let step = sync + i;
            if step != sync {
                self.snapshots.set(
                    i64::from(step.as_i32()),
                    Snapshot::new(step, host.save_state()),
                );
            }
            players.gather_inputs(step, &mut self.scratch_inputs)?;
            host.advance_step(&self.scratch_inputs);
        }
        Ok(())
    }
}

impl<T: Config> std::fmt::Debug for RollbackSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollbackSession")
            .field("current_step", &self.current_step)
            .field("update_timer_ms", &self.update_timer_ms)
            .field("rollback_window", &self.rollback_window)
            .field("num_players", &self.players.lock().len())
            .finish_non_exhaustive()
    }
}

impl<T: Config> InvariantChecker for RollbackSession<T> {
    /// Checks the invariants of the session.
    ///
    /// # Invariants
    ///
    /// 1. `current_step` is non-negative
    /// 2. The accumulator is non-negative and finite
    /// 3. The rollback window is at least 3 and matches the snapshot ring
    /// 4. The scratch sequence covers every player
    /// 5. All player records pass their own invariant checks
    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if !self.current_step.is_valid() {
            return Err(
                InvariantViolation::new("RollbackSession", "current_step is negative")
                    .with_details(format!("current_step={}", self.current_step)),
            );
        }

        if !self.update_timer_ms.is_finite() || self.update_timer_ms < 0.0 {
            return Err(
                InvariantViolation::new("RollbackSession", "update timer out of range")
                    .with_details(format!("update_timer_ms={}", self.update_timer_ms)),
            );
        }

        if self.rollback_window < 3 || self.snapshots.capacity() != self.rollback_window {
            return Err(InvariantViolation::new(
                "RollbackSession",
                "snapshot ring does not match the rollback window",
            )
            .with_details(format!(
                "rollback_window={}, capacity={}",
                self.rollback_window,
                self.snapshots.capacity()
            )));
        }

        let players = self.players.lock();
        if self.scratch_inputs.len() < players.len() {
            return Err(InvariantViolation::new(
                "RollbackSession",
                "scratch sequence smaller than player count",
            )
            .with_details(format!(
                "scratch={}, players={}",
                self.scratch_inputs.len(),
                players.len()
            )));
        }

        for player in &players.players {
            player.check_invariants()?;
        }

        Ok(())
    }
}

// #########
// # TESTS #
// #########

#[cfg(test)]
mod session_tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Copy, Clone, PartialEq, Default, Debug, Serialize, Deserialize)]
    struct TestInput {
        inp: u8,
    }

    struct TestConfig;

    impl Config for TestConfig {
        type Input = TestInput;
        type State = u64;
    }

    /// Minimal host that counts one `u64` per simulated step.
    #[derive(Default)]
    struct CountingHost {
        state: u64,
        saves: u32,
        loads: u32,
        simulations: u32,
        broadcasts: Vec<(PlayerHandle, Step, TestInput)>,
    }

    impl SessionHost<TestConfig> for CountingHost {
        fn save_state(&mut self) -> u64 {
            self.saves += 1;
            self.state
        }

        fn load_state(&mut self, state: u64) {
            self.loads += 1;
            self.state = state;
        }

        fn advance_step(&mut self, inputs: &[TestInput]) {
            self.simulations += 1;
            for input in inputs {
                self.state = self.state.wrapping_mul(31).wrapping_add(u64::from(input.inp));
            }
            self.state = self.state.wrapping_add(1);
        }

        fn broadcast_input(&mut self, handle: PlayerHandle, step: Step, input: TestInput) {
            self.broadcasts.push((handle, step, input));
        }
    }

    fn session() -> RollbackSession<TestConfig> {
        RollbackSession::new(SessionConfig {
            update_interval_ms: 16.0,
            max_remote_ping_ms: 100,
        })
        .unwrap()
    }

    #[test]
    fn new_session_starts_at_step_zero() {
        let session = session();
        assert_eq!(session.current_step(), Step::new(0));
        assert_eq!(session.rollback_window(), 9);
        assert_eq!(session.num_players(), 0);
        assert!(session.check_invariants().is_ok());
    }

    #[test]
    fn add_player_issues_sequential_handles() {
        let mut session = session();
        let a = session.add_player(PlayerKind::Local);
        let b = session.add_player(PlayerKind::Remote);
        assert_eq!(a.id(), 0);
        assert_eq!(b.id(), 1);
        assert_eq!(b.kind(), PlayerKind::Remote);
        assert_eq!(session.num_players(), 2);
        assert!(session.check_invariants().is_ok());
    }

    #[test]
    fn unknown_handle_is_rejected() {
        let session = session();
        let bogus = PlayerHandle::new(3, PlayerKind::Remote);
        let err = session
            .add_remote_input(bogus, Step::new(0), TestInput::default())
            .unwrap_err();
        assert!(matches!(err, RampartError::InvalidPlayerHandle { .. }));
    }

    #[test]
    fn local_input_to_remote_handle_is_rejected() {
        let mut session = session();
        let remote = session.add_player(PlayerKind::Remote);
        let mut host = CountingHost::default();
        let err = session
            .add_local_input(remote, TestInput { inp: 1 }, &mut host)
            .unwrap_err();
        assert!(matches!(
            err,
            RampartError::WrongPlayerKind {
                expected: PlayerKind::Local,
                ..
            }
        ));
        assert!(host.broadcasts.is_empty());
    }

    #[test]
    fn remote_input_to_local_handle_is_rejected() {
        let mut session = session();
        let local = session.add_player(PlayerKind::Local);
        let err = session
            .add_remote_input(local, Step::new(0), TestInput::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RampartError::WrongPlayerKind {
                expected: PlayerKind::Remote,
                ..
            }
        ));
    }

    #[test]
    fn spectators_accept_no_input() {
        let mut session = session();
        let spectator = session.add_player(PlayerKind::Spectator);
        let mut host = CountingHost::default();
        assert!(session
            .add_local_input(spectator, TestInput { inp: 1 }, &mut host)
            .is_err());
        assert!(session
            .add_remote_input(spectator, Step::new(0), TestInput { inp: 1 })
            .is_err());
    }

    #[test]
    fn ping_above_cap_is_rejected() {
        let mut session = session();
        let remote = session.add_player(PlayerKind::Remote);
        assert!(session.set_ping(remote, 100).is_ok());
        let err = session.set_ping(remote, 101).unwrap_err();
        assert!(matches!(err, RampartError::PingAboveCap { .. }));
        // the stored value is unchanged
        assert_eq!(session.get_ping(remote).unwrap(), 100);
    }

    #[test]
    fn ping_on_local_player_is_rejected() {
        let mut session = session();
        let local = session.add_player(PlayerKind::Local);
        assert!(session.set_ping(local, 10).is_err());
        assert_eq!(session.get_ping(local).unwrap(), 0);
    }

    #[test]
    fn update_accumulates_partial_deltas() {
        let mut session = session();
        session.add_player(PlayerKind::Local);
        let mut host = CountingHost::default();

        let report = session.update(10.0, &mut host).unwrap();
        assert!(!report.advanced);
        assert_eq!(session.current_step(), Step::new(0));

        let report = session.update(10.0, &mut host).unwrap();
        assert!(report.advanced);
        assert_eq!(session.current_step(), Step::new(1));
        assert_eq!(host.saves, 1);
        assert_eq!(host.simulations, 1);
        assert_eq!(host.loads, 0);
    }

    #[test]
    fn update_advances_at_most_one_step_per_call() {
        let mut session = session();
        session.add_player(PlayerKind::Local);
        let mut host = CountingHost::default();

        // a huge delta still yields a single step
        let report = session.update(160.0, &mut host).unwrap();
        assert!(report.advanced);
        assert_eq!(session.current_step(), Step::new(1));
        assert_eq!(host.simulations, 1);
    }

    #[test]
    fn remote_sink_shares_the_player_set() {
        let mut session = session();
        let remote = session.add_player(PlayerKind::Remote);
        let sink = session.remote_input_sink();
        assert!(sink
            .add_remote_input(remote, Step::new(0), TestInput { inp: 2 })
            .unwrap());
        // the session sees the same record: a duplicate is now stale
        assert!(!session
            .add_remote_input(remote, Step::new(0), TestInput { inp: 2 })
            .unwrap());
    }
}
