//! The seam between the session and the host's simulation.
//!
//! The session never looks inside the host's state: it schedules snapshots,
//! replays, and step advances by calling back into the host through
//! [`SessionHost`]. All callbacks are synchronous and are invoked from
//! whichever thread drives [`RollbackSession::update`](crate::RollbackSession::update).

use crate::{Config, PlayerHandle, Step};

/// Callbacks a host provides to a session.
///
/// `save_state`/`load_state`/`advance_step` are the deterministic simulation
/// contract; `broadcast_input` is the outbound half of the host's transport
/// and may be left as the default no-op (e.g. in replays or tests).
///
/// Callbacks must not call back into the session while `update` is running —
/// the session may be holding its rollback lock, and reentrant acquisition is
/// undefined.
pub trait SessionHost<T>
where
    T: Config,
{
    /// Returns a deep, independent snapshot of the host's simulation state.
    fn save_state(&mut self) -> T::State;

    /// Replaces the host's simulation state with the given snapshot.
    /// Subsequent [`advance_step`](Self::advance_step) calls must be
    /// deterministic from this point.
    fn load_state(&mut self, state: T::State);

    /// Advances the simulation by exactly one step using `inputs`, one entry
    /// per player in insertion order. Must be deterministic.
    fn advance_step(&mut self, inputs: &[T::Input]);

    /// Delivers a locally-produced input to remote peers.
    ///
    /// Invoked exactly once for every accepted local input, with the step it
    /// was recorded at. The default implementation does nothing.
    fn broadcast_input(&mut self, handle: PlayerHandle, step: Step, input: T::Input) {
        let _ = (handle, step, input);
    }
}
