//! # Rampart Rollback
//!
//! Rampart Rollback is a rollback netcode session core for deterministic,
//! lockstep-style multiplayer simulations (fighting games, fast-paced action
//! games, real-time strategy micro-loops). The host owns the simulation,
//! transport, and rendering; Rampart owns the rollback state machine: step
//! advancement, snapshot scheduling against a bounded ring of saved states,
//! misprediction detection, resimulation, and a catch-up throttle that slows
//! the local simulation while remote peers trail.
//!
//! The host plugs in through the [`SessionHost`] trait (save / load /
//! advance / broadcast) and drives the session by calling
//! [`RollbackSession::update`] once per rendered frame, feeding local inputs
//! via [`RollbackSession::add_local_input`] and remote inputs via
//! [`RollbackSession::add_remote_input`] or a cloneable [`RemoteInputSink`]
//! from a network thread.
//!
//! ```
//! use rampart_rollback::prelude::*;
//!
//! #[derive(Copy, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
//! struct Buttons(u8);
//!
//! #[derive(Clone, Default)]
//! struct World {
//!     step: i32,
//! }
//!
//! struct Game {
//!     world: World,
//! }
//!
//! struct GameConfig;
//! impl Config for GameConfig {
//!     type Input = Buttons;
//!     type State = World;
//! }
//!
//! impl SessionHost<GameConfig> for Game {
//!     fn save_state(&mut self) -> World {
//!         self.world.clone()
//!     }
//!     fn load_state(&mut self, state: World) {
//!         self.world = state;
//!     }
//!     fn advance_step(&mut self, inputs: &[Buttons]) {
//!         let _ = inputs;
//!         self.world.step += 1;
//!     }
//! }
//!
//! # fn main() -> RampartResult<()> {
//! let mut game = Game { world: World::default() };
//! let mut session = SessionBuilder::<GameConfig>::new()
//!     .with_update_interval(16.0)?
//!     .with_max_remote_ping(100)?
//!     .build();
//! let local = session.add_player(PlayerKind::Local);
//! session.add_local_input(local, Buttons(1), &mut game)?;
//! session.update(16.0, &mut game)?;
//! assert_eq!(session.current_step(), Step::new(1));
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(rustdoc::bare_urls)]

use serde::{de::DeserializeOwned, Serialize};

pub use config::{SessionBuilder, SessionConfig};
pub use error::{InvalidConfigKind, RampartError};
pub use host::SessionHost;
pub use ring_buffer::RingBuffer;
pub use session::{RemoteInputSink, RollbackSession, UpdateReport};
// Re-export smallvec for users who need to work with SmallVec-backed types directly
pub use smallvec::SmallVec;

/// A specialized `Result` type for Rampart Rollback operations.
///
/// Named `RampartResult` rather than `Result` so that glob imports of the
/// [`prelude`] never shadow `std::result::Result`. The second type parameter
/// can override the error type if needed.
pub type RampartResult<T, E = RampartError> = std::result::Result<T, E>;

pub mod config;
#[doc(hidden)]
pub mod error;
pub mod host;
#[doc(hidden)]
pub mod player;
pub mod ring_buffer;
pub mod session;
#[doc(hidden)]
pub mod step_info;
pub mod telemetry;

/// Convenient re-exports for common usage.
pub mod prelude;

/// Shared test configuration for property-based testing.
#[cfg(test)]
pub(crate) mod test_config;

// #############
// # CONSTANTS #
// #############

/// Internally, -1 represents no step / uninitialized.
///
/// `last_added_step` and `last_confirmed_step` of a fresh player record both
/// hold this sentinel, as does every slot of a fresh snapshot ring.
pub const NULL_STEP: i32 = -1;

/// A step is a single tick of the deterministic simulation.
///
/// Steps start at 0 and increment sequentially; the session's step counter
/// never decreases (a rollback re-executes the simulation to reach the same
/// counter value). The special value [`NULL_STEP`] (-1) represents "no step".
///
/// `Step` is a newtype wrapper around `i32` so that step numbers cannot be
/// accidentally mixed with other integers.
///
/// # Examples
///
/// ```
/// use rampart_rollback::{Step, NULL_STEP};
///
/// let step = Step::new(0);
/// assert!(step.is_valid());
/// assert!(Step::NULL.is_null());
///
/// let next = step + 1;
/// assert_eq!(next.as_i32(), 1);
/// assert!(next > step);
/// ```
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Step(i32);

impl Step {
    /// The null step constant, equivalent to [`NULL_STEP`] (-1).
    pub const NULL: Self = Self(NULL_STEP);

    /// Creates a new `Step` from an `i32` value.
    ///
    /// This does not validate the step number; use [`Step::is_valid`] to
    /// check for non-negativity.
    #[inline]
    #[must_use]
    pub const fn new(step: i32) -> Self {
        Self(step)
    }

    /// Returns the underlying `i32` value.
    #[inline]
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Returns `true` if this step is the null sentinel.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == NULL_STEP
    }

    /// Returns `true` if this step is valid (non-negative).
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// Clamps this step into `[lo, hi]`.
    #[inline]
    #[must_use]
    pub fn clamp(self, lo: Self, hi: Self) -> Self {
        Self(self.0.clamp(lo.0, hi.0))
    }

    /// Adds a value to this step, saturating at the numeric bounds.
    #[inline]
    #[must_use]
    pub const fn saturating_add(self, rhs: i32) -> Self {
        Self(self.0.saturating_add(rhs))
    }

    /// Subtracts a value from this step, saturating at the numeric bounds.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: i32) -> Self {
        Self(self.0.saturating_sub(rhs))
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "NULL_STEP")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl std::ops::Add<i32> for Step {
    type Output = Self;

    #[inline]
    fn add(self, rhs: i32) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl std::ops::AddAssign<i32> for Step {
    #[inline]
    fn add_assign(&mut self, rhs: i32) {
        self.0 += rhs;
    }
}

impl std::ops::Sub<i32> for Step {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: i32) -> Self::Output {
        Self(self.0 - rhs)
    }
}

impl std::ops::Sub<Self> for Step {
    type Output = i32;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        self.0 - rhs.0
    }
}

impl From<i32> for Step {
    #[inline]
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<Step> for i32 {
    #[inline]
    fn from(step: Step) -> Self {
        step.0
    }
}

impl PartialEq<i32> for Step {
    #[inline]
    fn eq(&self, other: &i32) -> bool {
        self.0 == *other
    }
}

impl PartialOrd<i32> for Step {
    #[inline]
    fn partial_cmp(&self, other: &i32) -> Option<std::cmp::Ordering> {
        self.0.partial_cmp(other)
    }
}

// #############
// #   ENUMS   #
// #############

/// The three kinds of participants a session tracks:
/// - local players, who play on the local device,
/// - remote players, whose inputs arrive over the host's transport and
/// - spectators, who observe but never contribute input.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum PlayerKind {
    /// This player plays on the local device.
    #[default]
    Local,
    /// This player plays on a remote device; inputs arrive through
    /// [`RollbackSession::add_remote_input`] or a [`RemoteInputSink`].
    Remote,
    /// This participant observes and contributes no input.
    Spectator,
}

impl std::fmt::Display for PlayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "Local"),
            Self::Remote => write!(f, "Remote"),
            Self::Spectator => write!(f, "Spectator"),
        }
    }
}

/// A unique identifier for a participant in a session.
///
/// Handles are issued by [`RollbackSession::add_player`], are stable for the
/// lifetime of the session, and are never reissued. A handle carries the
/// participant's [`PlayerKind`] for convenience, but **equality, ordering and
/// hashing use the id only** — external code must re-resolve through the
/// session for anything else.
///
/// # Examples
///
/// ```
/// use rampart_rollback::{PlayerHandle, PlayerKind};
///
/// let a = PlayerHandle::new(0, PlayerKind::Local);
/// let b = PlayerHandle::new(0, PlayerKind::Remote);
/// assert_eq!(a, b); // same id
/// assert_eq!(a.id(), 0);
/// assert_eq!(a.kind(), PlayerKind::Local);
/// ```
#[derive(Debug, Copy, Clone, serde::Serialize, serde::Deserialize)]
pub struct PlayerHandle {
    id: usize,
    kind: PlayerKind,
}

impl PlayerHandle {
    /// Creates a new `PlayerHandle` from a raw id and kind.
    ///
    /// This does not validate the handle against a session; handles obtained
    /// from [`RollbackSession::add_player`] are always valid for that session.
    #[inline]
    #[must_use]
    pub const fn new(id: usize, kind: PlayerKind) -> Self {
        Self { id, kind }
    }

    /// Returns the underlying id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> usize {
        self.id
    }

    /// Returns the participant kind recorded at creation.
    #[inline]
    #[must_use]
    pub const fn kind(self) -> PlayerKind {
        self.kind
    }
}

impl PartialEq for PlayerHandle {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PlayerHandle {}

impl PartialOrd for PlayerHandle {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PlayerHandle {
    #[inline]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl std::hash::Hash for PlayerHandle {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PlayerHandle({}, {})", self.id, self.kind)
    }
}

/// Stack-allocated vector type for per-player inputs.
///
/// Uses [`SmallVec`] so the common case of 2-4 players never touches the
/// heap; larger sessions spill automatically. This is the scratch sequence
/// the session reuses to present inputs to [`SessionHost::advance_step`].
pub type InputVec<I> = SmallVec<[I; 4]>;

/// Compile time parameterization for sessions.
pub trait Config: 'static + Send + Sync {
    /// The input type for a session. This is the only game-related data the
    /// host ships over its transport, so it must serialize.
    ///
    /// The [`Default`] implementation represents "no input" and doubles as
    /// the prediction for a player that has not produced any input yet.
    /// Value equality is what misprediction detection compares.
    type Input: Copy + Clone + PartialEq + Default + Serialize + DeserializeOwned + Send + Sync;

    /// The snapshot type saved and restored through [`SessionHost`]. Must be
    /// a deep, independent copy of the host's simulation state.
    type State: Clone + Send + Sync;
}

// ###############
// # UNIT TESTS  #
// ###############

#[cfg(test)]
mod step_tests {
    use super::*;

    #[test]
    fn null_step_is_sentinel() {
        assert!(Step::NULL.is_null());
        assert!(!Step::NULL.is_valid());
        assert_eq!(Step::NULL.as_i32(), NULL_STEP);
    }

    #[test]
    fn step_arithmetic() {
        let s = Step::new(5);
        assert_eq!(s + 1, Step::new(6));
        assert_eq!(s - 2, Step::new(3));
        assert_eq!(Step::new(7) - Step::new(3), 4);
        let mut t = Step::new(0);
        t += 3;
        assert_eq!(t, 3);
    }

    #[test]
    fn step_clamp() {
        assert_eq!(
            Step::new(10).clamp(Step::new(0), Step::new(4)),
            Step::new(4)
        );
        assert_eq!(
            Step::new(-3).clamp(Step::new(0), Step::new(4)),
            Step::new(0)
        );
    }

    #[test]
    fn step_display() {
        assert_eq!(Step::NULL.to_string(), "NULL_STEP");
        assert_eq!(Step::new(42).to_string(), "42");
    }

    #[test]
    fn handle_equality_ignores_kind() {
        let a = PlayerHandle::new(1, PlayerKind::Local);
        let b = PlayerHandle::new(1, PlayerKind::Spectator);
        let c = PlayerHandle::new(2, PlayerKind::Local);
        assert_eq!(a, b);
        assert_ne!(a, c);

        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }
}
