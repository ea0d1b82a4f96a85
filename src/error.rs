use std::error::Error;
use std::fmt;
use std::fmt::Display;

use crate::{PlayerHandle, PlayerKind, Step};

/// Why a session configuration was rejected.
///
/// Structured so that configuration errors carry the offending value without
/// allocating; the message is formatted lazily in the `Display` impl.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum InvalidConfigKind {
    /// The update interval must be a positive, finite number of milliseconds.
    NonPositiveUpdateInterval {
        /// The rejected interval in milliseconds.
        value_ms: f64,
    },
    /// The maximum remote ping must be positive.
    ZeroMaxRemotePing,
}

impl Display for InvalidConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveUpdateInterval { value_ms } => {
                write!(
                    f,
                    "update interval must be positive and finite (got {} ms)",
                    value_ms
                )
            },
            Self::ZeroMaxRemotePing => {
                write!(f, "max remote ping must be positive")
            },
        }
    }
}

/// This enum contains all error messages this library can return. Most API
/// functions generally return a [`RampartResult`].
///
/// Every variant is a contract violation in the sense of the session's API
/// contract: the call was malformed or targeted state the session no longer
/// holds. Duplicate or stale inputs are **not** errors — those are silently
/// dropped and reported as `Ok(false)`.
///
/// # Forward Compatibility
///
/// This enum is marked `#[non_exhaustive]` because new error variants may be
/// added in future versions. Always include a wildcard arm when matching.
///
/// [`RampartResult`]: crate::RampartResult
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum RampartError {
    /// The handle does not resolve to a player in this session.
    InvalidPlayerHandle {
        /// The handle that failed to resolve.
        handle: PlayerHandle,
        /// The number of players currently registered.
        num_players: usize,
    },
    /// The operation requires a player of a different kind, e.g. feeding a
    /// remote input to a Local handle.
    WrongPlayerKind {
        /// The handle the operation targeted.
        handle: PlayerHandle,
        /// The kind the operation requires.
        expected: PlayerKind,
        /// The kind the resolved player actually has.
        actual: PlayerKind,
    },
    /// An input skipped ahead: inputs must be appended strictly sequentially,
    /// so adding step `s` requires `s == last_added_step + 1`.
    NonSequentialInput {
        /// The handle whose input sequence was broken.
        handle: PlayerHandle,
        /// The step the caller tried to add.
        step: Step,
        /// The highest step recorded so far ([`Step::NULL`] if none).
        last_added_step: Step,
    },
    /// A ping above the configured maximum was supplied; the rollback window
    /// is sized from `max_remote_ping` at construction and cannot absorb it.
    PingAboveCap {
        /// The handle whose ping was being set.
        handle: PlayerHandle,
        /// The rejected round-trip estimate in milliseconds.
        ping_ms: u32,
        /// The configured cap in milliseconds.
        max_remote_ping_ms: u32,
    },
    /// A rollback targeted a step whose snapshot has been overwritten: only
    /// steps in `[current_step - rollback_window, current_step]` are retained.
    SnapshotEvicted {
        /// The step the rollback tried to load.
        step: Step,
        /// The session's current step.
        current_step: Step,
        /// The configured rollback window.
        rollback_window: usize,
    },
    /// An input slot aged out of a player's ring: the slot addressed by the
    /// requested step was last written for a different step.
    StaleInputSlot {
        /// The player whose input was requested.
        handle: PlayerHandle,
        /// The step that was requested (after clamping).
        step: Step,
        /// The step the slot actually holds.
        recorded_step: Step,
    },
    /// The session configuration was rejected at construction.
    InvalidConfig {
        /// Why the configuration was rejected.
        kind: InvalidConfigKind,
    },
}

impl Display for RampartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPlayerHandle {
                handle,
                num_players,
            } => {
                write!(
                    f,
                    "{} does not resolve to a player (session has {} players)",
                    handle, num_players
                )
            },
            Self::WrongPlayerKind {
                handle,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "{} is a {} player, operation requires {}",
                    handle, actual, expected
                )
            },
            Self::NonSequentialInput {
                handle,
                step,
                last_added_step,
            } => {
                write!(
                    f,
                    "non-sequential input for {}: step {} does not follow {}",
                    handle, step, last_added_step
                )
            },
            Self::PingAboveCap {
                handle,
                ping_ms,
                max_remote_ping_ms,
            } => {
                write!(
                    f,
                    "ping {} ms for {} exceeds configured maximum of {} ms",
                    ping_ms, handle, max_remote_ping_ms
                )
            },
            Self::SnapshotEvicted {
                step,
                current_step,
                rollback_window,
            } => {
                write!(
                    f,
                    "cannot roll back to discarded state at step {} (current step {}, window {})",
                    step, current_step, rollback_window
                )
            },
            Self::StaleInputSlot {
                handle,
                step,
                recorded_step,
            } => {
                write!(
                    f,
                    "input for {} at step {} has aged out of the ring (slot holds step {})",
                    handle, step, recorded_step
                )
            },
            Self::InvalidConfig { kind } => write!(f, "invalid session configuration: {}", kind),
        }
    }
}

impl Error for RampartError {}

// #########
// # TESTS #
// #########
