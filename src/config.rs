//! Session configuration and construction.
//!
//! A session is parameterized by two numbers fixed at construction: the
//! simulation's update interval and the largest remote round-trip it must
//! absorb. Everything else — most importantly the rollback window sizing
//! both rings — is derived from them.
//!
//! # Example
//!
//! ```
//! use rampart_rollback::{Config, SessionBuilder, SessionConfig};
//!
//! # struct MyConfig;
//! # impl Config for MyConfig {
//! #     type Input = u32;
//! #     type State = ();
//! # }
//! // Use a preset for common scenarios
//! let session = SessionBuilder::<MyConfig>::new()
//!     .with_config(SessionConfig::lan())
//!     .unwrap()
//!     .build();
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::InvalidConfigKind;
use crate::session::RollbackSession;
use crate::telemetry::ViolationObserver;
use crate::{Config, RampartError, RampartResult};

/// Tuning parameters for a [`RollbackSession`].
///
/// # Forward Compatibility
///
/// New fields may be added to this struct in future versions. Always use the
/// `..SessionConfig::default()` pattern when constructing instances.
#[derive(Debug, Clone, Copy, PartialEq)]
#[must_use = "SessionConfig has no effect unless passed to a SessionBuilder"]
pub struct SessionConfig {
    /// Duration of one simulation step in milliseconds.
    ///
    /// Default: 16.0 (roughly 60 steps per second)
    pub update_interval_ms: f64,

    /// The largest remote round-trip time the session is sized for, in
    /// milliseconds. Setting a player ping above this value is rejected,
    /// because the rollback window derived from it could no longer reach the
    /// states such a correction would target.
    ///
    /// Default: 100
    pub max_remote_ping_ms: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 16.0,
            max_remote_ping_ms: 100,
        }
    }
}

impl SessionConfig {
    /// Creates a new `SessionConfig` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration preset for an exact 60 Hz simulation.
    pub fn fps60() -> Self {
        Self {
            update_interval_ms: 1000.0 / 60.0,
            max_remote_ping_ms: 100,
        }
    }

    /// Configuration preset for local network / LAN play.
    ///
    /// A small ping cap keeps the rollback window (and with it snapshot
    /// memory and worst-case resimulation) tight.
    pub fn lan() -> Self {
        Self {
            update_interval_ms: 16.0,
            max_remote_ping_ms: 50,
        }
    }

    /// Configuration preset for high-latency networks (100-200ms RTT).
    ///
    /// A generous ping cap widens the rollback window so late corrections
    /// still land inside retained history.
    pub fn high_latency() -> Self {
        Self {
            update_interval_ms: 16.0,
            max_remote_ping_ms: 200,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RampartError::InvalidConfig`] if the update interval is not
    /// positive and finite, or the ping cap is zero.
    pub fn validate(&self) -> RampartResult<()> {
        if !self.update_interval_ms.is_finite() || self.update_interval_ms <= 0.0 {
            return Err(RampartError::InvalidConfig {
                kind: InvalidConfigKind::NonPositiveUpdateInterval {
                    value_ms: self.update_interval_ms,
                },
            });
        }
        if self.max_remote_ping_ms == 0 {
            return Err(RampartError::InvalidConfig {
                kind: InvalidConfigKind::ZeroMaxRemotePing,
            });
        }
        Ok(())
    }

    /// The number of past steps both rings retain:
    /// `ceil(max_remote_ping / update_interval) + 2`.
    ///
    /// One extra slot covers the step currently being simulated and one the
    /// snapshot a resimulation re-saves, so the furthest correction a
    /// max-ping peer can send still lands inside retained history.
    #[must_use]
    pub fn rollback_window(&self) -> usize {
        (f64::from(self.max_remote_ping_ms) / self.update_interval_ms).ceil() as usize + 2
    }

    /// Milliseconds of throttle delay applied per step of advantage:
    /// `update_interval² / 1000`.
    #[must_use]
    pub fn delay_factor_ms(&self) -> f64 {
        self.update_interval_ms * self.update_interval_ms / 1000.0
    }
}

/// Builder for a [`RollbackSession`], validating parameters eagerly.
///
/// # Example
///
/// ```
/// use rampart_rollback::{Config, RampartResult, SessionBuilder};
///
/// # struct MyConfig;
/// # impl Config for MyConfig {
/// #     type Input = u8;
/// #     type State = u8;
/// # }
/// # fn main() -> RampartResult<()> {
/// let session = SessionBuilder::<MyConfig>::new()
///     .with_update_interval(16.0)?
///     .with_max_remote_ping(120)?
///     .build();
/// assert_eq!(session.rollback_window(), 10);
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder<T>
where
    T: Config,
{
    config: SessionConfig,
    observer: Option<Arc<dyn ViolationObserver>>,
    _marker: PhantomData<T>,
}

impl<T: Config> Default for SessionBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Config> std::fmt::Debug for SessionBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("config", &self.config)
            .field("has_observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: Config> SessionBuilder<T> {
    /// Creates a builder with the default [`SessionConfig`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            observer: None,
            _marker: PhantomData,
        }
    }

    /// Sets the update interval in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`RampartError::InvalidConfig`] if the interval is not
    /// positive and finite.
    pub fn with_update_interval(mut self, update_interval_ms: f64) -> RampartResult<Self> {
        if !update_interval_ms.is_finite() || update_interval_ms <= 0.0 {
            return Err(RampartError::InvalidConfig {
                kind: InvalidConfigKind::NonPositiveUpdateInterval {
                    value_ms: update_interval_ms,
                },
            });
        }
        self.config.update_interval_ms = update_interval_ms;
        Ok(self)
    }

    /// Sets the maximum remote round-trip time in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`RampartError::InvalidConfig`] if the cap is zero.
    pub fn with_max_remote_ping(mut self, max_remote_ping_ms: u32) -> RampartResult<Self> {
        if max_remote_ping_ms == 0 {
            return Err(RampartError::InvalidConfig {
                kind: InvalidConfigKind::ZeroMaxRemotePing,
            });
        }
        self.config.max_remote_ping_ms = max_remote_ping_ms;
        Ok(self)
    }

    /// Replaces the whole configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RampartError::InvalidConfig`] if `config` fails
    /// [`SessionConfig::validate`].
    pub fn with_config(mut self, config: SessionConfig) -> RampartResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Sets the contract-violation sink the session reports through.
    ///
    /// Defaults to [`TracingObserver`](crate::telemetry::TracingObserver);
    /// see [`RollbackSession::set_violation_observer`].
    #[must_use]
    pub fn with_violation_observer(mut self, observer: Arc<dyn ViolationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Constructs the session.
    ///
    /// Infallible: every path into the builder has already validated the
    /// configuration.
    #[must_use]
    pub fn build(self) -> RollbackSession<T> {
        let mut session = RollbackSession::with_validated_config(self.config);
        if let Some(observer) = self.observer {
            session.set_violation_observer(observer);
        }
        session
    }
}

// #########
// # TESTS #
// #########
