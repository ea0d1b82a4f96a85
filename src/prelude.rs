//! Convenient re-exports for common usage.
//!
//! ```rust
//! use rampart_rollback::prelude::*;
//! ```
//!
//! The prelude includes the session and builder types, the [`Config`] and
//! [`SessionHost`] traits, the fundamental identifiers ([`Step`],
//! [`PlayerHandle`], [`PlayerKind`], [`NULL_STEP`]) and the error types.
//!
//! # Example
//!
//! ```rust
//! use rampart_rollback::prelude::*;
//!
//! // Define your input type
//! #[derive(Copy, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
//! struct MyInput {
//!     buttons: u8,
//! }
//!
//! // Define your game state
//! #[derive(Clone, Default)]
//! struct MyGameState {
//!     step: i32,
//!     positions: [(i32, i32); 2],
//! }
//!
//! // Create the config marker struct
//! struct MyConfig;
//!
//! impl Config for MyConfig {
//!     type Input = MyInput;
//!     type State = MyGameState;
//! }
//! ```

pub use crate::config::{SessionBuilder, SessionConfig};
pub use crate::error::{InvalidConfigKind, RampartError};
pub use crate::host::SessionHost;
pub use crate::session::{RemoteInputSink, RollbackSession, UpdateReport};
pub use crate::{Config, InputVec, PlayerHandle, PlayerKind, RampartResult, Step, NULL_STEP};
