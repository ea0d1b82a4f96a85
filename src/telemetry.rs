//! Structured pipeline for contract violations.
//!
//! The session treats API misuse (non-sequential inputs, rollback to a
//! discarded snapshot, pings above the configured cap) as contract
//! violations. Besides the [`RampartError`](crate::RampartError) returned to
//! the caller, each violation is reported as structured data that can be:
//!
//! - Logged via tracing (default behavior)
//! - Collected programmatically for testing
//! - Sent to custom observers (metrics, alerting, etc.)
//!
//! # Example
//!
//! ```
//! use rampart_rollback::telemetry::{CollectingObserver, ViolationKind};
//! use std::sync::Arc;
//!
//! // Create a collecting observer for tests
//! let observer = Arc::new(CollectingObserver::new());
//!
//! // Check violations after some operations
//! assert!(observer.violations().is_empty(), "unexpected violations");
//! ```

use crate::Step;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Custom serializer for `Option<Step>` that outputs clean integers or null.
///
/// - `None` → `null`
/// - `Some(Step::NULL)` → `null`
/// - `Some(Step(n))` where n >= 0 → `n`
mod step_serializer {
    use crate::Step;
    use serde::Serializer;

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(step: &Option<Step>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match step {
            None => serializer.serialize_none(),
            Some(s) if s.is_null() => serializer.serialize_none(),
            Some(s) => serializer.serialize_i32(s.as_i32()),
        }
    }
}

/// Severity of a contract violation.
///
/// Severities are ordered from least to most severe, allowing filtering
/// and comparison operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    /// Unexpected but recoverable - operation continued with fallback.
    Warning,
    /// Serious issue - the offending call was rejected.
    Error,
    /// Critical invariant broken - session state may no longer be trustworthy.
    Critical,
}

impl ViolationSeverity {
    /// Returns a string representation suitable for logging/metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categories of contract violations.
///
/// Each category corresponds to a major subsystem of the session, making it
/// easy to filter and route violations.
///
/// # Forward Compatibility
///
/// This enum is marked `#[non_exhaustive]` because new violation categories
/// may be added in future versions. Always include a wildcard arm when
/// matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ViolationKind {
    /// A player's input sequence contract was broken.
    ///
    /// Examples: a gap in the step sequence, an input slot that aged out of
    /// the ring before it was consumed.
    InputSequence,
    /// Step synchronization went wrong.
    ///
    /// Examples: a rollback targeting a step outside the retained window.
    StepSync,
    /// Snapshot save/load bookkeeping went wrong.
    StateManagement,
    /// A configuration constraint was violated.
    Configuration,
    /// Internal logic error (should never happen).
    InternalError,
    /// Runtime invariant check failed.
    Invariant,
}

impl ViolationKind {
    /// Returns a string representation suitable for logging/metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InputSequence => "input_sequence",
            Self::StepSync => "step_sync",
            Self::StateManagement => "state_management",
            Self::Configuration => "configuration",
            Self::InternalError => "internal_error",
            Self::Invariant => "invariant",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded contract violation.
///
/// Contains all relevant context for diagnosing and responding to a violation
/// of the session's API contract or internal invariants.
///
/// # Serialization
///
/// This type implements `serde::Serialize` for structured JSON output. The
/// step field is serialized as `null` for [`Step::NULL`], or as an integer
/// for valid steps.
///
/// # Example
///
/// ```
/// use rampart_rollback::telemetry::{ContractViolation, ViolationSeverity, ViolationKind};
/// use rampart_rollback::Step;
///
/// let violation = ContractViolation::new(
///     ViolationSeverity::Error,
///     ViolationKind::InputSequence,
///     "input gap",
///     "player.rs:42",
/// ).with_step(Step::new(100))
///  .with_context("expected", "50")
///  .with_context("actual", "100");
///
/// let json = violation.to_json().unwrap();
/// assert!(json.contains(r#""severity":"error""#));
/// assert!(json.contains(r#""kind":"input_sequence""#));
/// assert!(json.contains(r#""step":100"#));
/// ```
#[derive(Debug, Clone, serde::Serialize)]
pub struct ContractViolation {
    /// The severity level of this violation.
    pub severity: ViolationSeverity,
    /// The category/subsystem where the violation occurred.
    pub kind: ViolationKind,
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Source location where the violation was detected (file:line).
    pub location: &'static str,
    /// The simulation step at which the violation occurred, if applicable.
    ///
    /// Serialized as an integer for valid steps, or `null` for
    /// `None`/[`Step::NULL`].
    #[serde(serialize_with = "step_serializer::serialize")]
    pub step: Option<Step>,
    /// Additional structured context as key-value pairs.
    pub context: BTreeMap<String, String>,
}

impl ContractViolation {
    /// Creates a new contract violation.
    #[must_use]
    pub fn new(
        severity: ViolationSeverity,
        kind: ViolationKind,
        message: impl Into<String>,
        location: &'static str,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            location,
            step: None,
            context: BTreeMap::new(),
        }
    }

    /// Sets the step at which this violation occurred.
    #[must_use]
    pub fn with_step(mut self, step: Step) -> Self {
        self.step = Some(step);
        self
    }

    /// Adds a context key-value pair.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Serializes this violation to a JSON string.
    ///
    /// Returns `None` if serialization fails (which should not happen for
    /// well-formed violations).
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

impl std::fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{}] {} (at {}",
            self.severity, self.kind, self.message, self.location
        )?;
        if let Some(step) = self.step {
            write!(f, ", step={step}")?;
        }
        if !self.context.is_empty() {
            write!(f, ", context={:?}", self.context)?;
        }
        write!(f, ")")
    }
}

/// Trait for observing contract violations.
///
/// Implement this trait to create custom observers that can react to
/// violations in various ways (logging, metrics, alerting, etc.).
///
/// # Example
///
/// ```
/// use rampart_rollback::telemetry::{ViolationObserver, ContractViolation};
///
/// struct MetricsObserver;
///
/// impl ViolationObserver for MetricsObserver {
///     fn on_violation(&self, violation: &ContractViolation) {
///         // Increment a counter, send to monitoring system, etc.
///         println!("Violation: {}", violation);
///     }
/// }
/// ```
pub trait ViolationObserver: Send + Sync {
    /// Called when a contract violation is detected.
    ///
    /// This method should be relatively quick to execute, as it may be
    /// called during time-critical operations.
    fn on_violation(&self, violation: &ContractViolation);
}

/// Built-in observer that logs violations via the `tracing` crate.
///
/// # Log Levels
///
/// - `Warning` severity → `tracing::warn!`
/// - `Error` and `Critical` severities → `tracing::error!`
///
/// All fields are output as structured tracing fields (`severity`, `kind`,
/// `location`, `step`, `context`), compatible with JSON logging formatters
/// and log aggregation systems.
#[derive(Debug, Default, Clone)]
pub struct TracingObserver;

impl TracingObserver {
    /// Creates a new tracing observer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Formats the step as a displayable value.
    /// Returns the step number for valid steps, or "null" for None/NULL steps.
    fn format_step(step: Option<Step>) -> String {
        match step {
            None => "null".to_string(),
            Some(s) if s.is_null() => "null".to_string(),
            Some(s) => s.as_i32().to_string(),
        }
    }
}

impl ViolationObserver for TracingObserver {
    fn on_violation(&self, violation: &ContractViolation) {
        let severity = violation.severity.as_str();
        let kind = violation.kind.as_str();
        let location = violation.location;
        let step_str = Self::format_step(violation.step);

        // Format context as a compact key=value string for compatibility
        // with systems that don't support dynamic field expansion
        let context_str = if violation.context.is_empty() {
            "{}".to_string()
        } else {
            let pairs: Vec<String> = violation
                .context
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            format!("{{{}}}", pairs.join(", "))
        };

        match violation.severity {
            ViolationSeverity::Warning => {
                tracing::warn!(
                    severity,
                    kind,
                    location,
                    step = %step_str,
                    context = %context_str,
                    "{}",
                    violation.message
                );
            },
            ViolationSeverity::Error | ViolationSeverity::Critical => {
                tracing::error!(
                    severity,
                    kind,
                    location,
                    step = %step_str,
                    context = %context_str,
                    "{}",
                    violation.message
                );
            },
        }
    }
}

/// Built-in observer that collects violations for testing.
///
/// Stores all violations in a thread-safe vector, allowing tests to assert
/// on the violations that occurred during an operation.
///
/// # Example
///
/// ```
/// use rampart_rollback::telemetry::{
///     CollectingObserver, ContractViolation, ViolationKind, ViolationObserver, ViolationSeverity,
/// };
///
/// let observer = CollectingObserver::new();
///
/// observer.on_violation(&ContractViolation::new(
///     ViolationSeverity::Error,
///     ViolationKind::InputSequence,
///     "test violation",
///     "test.rs:1",
/// ));
///
/// assert_eq!(observer.violations().len(), 1);
/// assert!(observer.has_violation(ViolationKind::InputSequence));
/// ```
#[derive(Debug, Default)]
pub struct CollectingObserver {
    violations: Mutex<Vec<ContractViolation>>,
}

impl CollectingObserver {
    /// Creates a new collecting observer with an empty violation list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            violations: Mutex::new(Vec::new()),
        }
    }

    /// Returns a copy of all collected violations.
    #[must_use]
    pub fn violations(&self) -> Vec<ContractViolation> {
        self.violations.lock().clone()
    }

    /// Returns the number of collected violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.lock().len()
    }

    /// Returns true if no violations have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.lock().is_empty()
    }

    /// Checks if any violation of the specified kind has been collected.
    #[must_use]
    pub fn has_violation(&self, kind: ViolationKind) -> bool {
        self.violations.lock().iter().any(|v| v.kind == kind)
    }

    /// Checks if any violation with the specified severity has been collected.
    #[must_use]
    pub fn has_severity(&self, severity: ViolationSeverity) -> bool {
        self.violations
            .lock()
            .iter()
            .any(|v| v.severity == severity)
    }

    /// Returns all violations matching the specified kind.
    #[must_use]
    pub fn violations_of_kind(&self, kind: ViolationKind) -> Vec<ContractViolation> {
        self.violations
            .lock()
            .iter()
            .filter(|v| v.kind == kind)
            .cloned()
            .collect()
    }

    /// Clears all collected violations.
    pub fn clear(&self) {
        self.violations.lock().clear();
    }
}

impl ViolationObserver for CollectingObserver {
    fn on_violation(&self, violation: &ContractViolation) {
        self.violations.lock().push(violation.clone());
    }
}

/// A composite observer that forwards violations to multiple observers.
///
/// Useful when you want to both log violations and collect them for testing,
/// or when you have multiple monitoring systems.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ViolationObserver>>,
}

impl CompositeObserver {
    /// Creates a new composite observer with no child observers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Adds an observer to the composite.
    pub fn add(&mut self, observer: Arc<dyn ViolationObserver>) {
        self.observers.push(observer);
    }

    /// Creates a composite observer from a list of observers.
    #[must_use]
    pub fn from_observers(observers: Vec<Arc<dyn ViolationObserver>>) -> Self {
        Self { observers }
    }
}

impl ViolationObserver for CompositeObserver {
    fn on_violation(&self, violation: &ContractViolation) {
        for observer in &self.observers {
            observer.on_violation(violation);
        }
    }
}

impl std::fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("num_observers", &self.observers.len())
            .finish()
    }
}

/// A structural invariant failure detected by [`InvariantChecker`].
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// The component whose invariant failed.
    pub component: &'static str,
    /// What went wrong.
    pub message: String,
    /// Optional extra detail (offending values, etc.).
    pub details: Option<String>,
}

impl InvariantViolation {
    /// Creates a new invariant violation for `component`.
    #[must_use]
    pub fn new(component: &'static str, message: impl Into<String>) -> Self {
        Self {
            component,
            message: message.into(),
            details: None,
        }
    }

    /// Attaches detail text (offending values, counts).
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.component, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

/// Trait for types that can verify their own structural invariants.
///
/// Used by tests (and debug assertions) to check that a component's internal
/// state is consistent after a sequence of operations.
pub trait InvariantChecker {
    /// Checks the invariants of this component.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    fn check_invariants(&self) -> Result<(), InvariantViolation>;
}

/// Macro for reporting contract violations to an observer, with location
/// tracking.
///
/// This macro creates a [`ContractViolation`] with the current file and line,
/// and hands it to the given [`ViolationObserver`]. The session reports every
/// real violation through its configured observer this way, which defaults to
/// [`TracingObserver`].
///
/// # Syntax
///
/// ```text
/// report_violation_to!(observer, severity, kind, "message");
/// report_violation_to!(observer, severity, kind, "message with {}", format_args);
/// ```
///
/// # Example
///
/// ```
/// use rampart_rollback::{report_violation_to, telemetry::{CollectingObserver, ViolationKind, ViolationSeverity}};
///
/// let observer = CollectingObserver::new();
/// report_violation_to!(&observer, ViolationSeverity::Warning, ViolationKind::StepSync,
///     "step mismatch: expected={}, actual={}", 10, 15);
/// assert!(observer.has_violation(ViolationKind::StepSync));
/// ```
#[macro_export]
macro_rules! report_violation_to {
    // Basic: observer, severity, kind, message (no format args)
    ($observer:expr, $severity:expr, $kind:expr, $msg:literal) => {{
        use $crate::telemetry::ViolationObserver as _;
        let violation = $crate::telemetry::ContractViolation::new(
            $severity,
            $kind,
            $msg,
            concat!(file!(), ":", line!()),
        );
        ($observer).on_violation(&violation);
    }};

    // With format args: observer, severity, kind, format, args...
    ($observer:expr, $severity:expr, $kind:expr, $fmt:literal, $($arg:tt)+) => {{
        use $crate::telemetry::ViolationObserver as _;
        let violation = $crate::telemetry::ContractViolation::new(
            $severity,
            $kind,
            format!($fmt, $($arg)+),
            concat!(file!(), ":", line!()),
        );
        ($observer).on_violation(&violation);
    }};
}

/// Asserts that no violations have been collected.
///
/// # Panics
///
/// Panics if the observer contains any violations, printing them for
/// debugging.
///
/// # Example
///
/// ```
/// use rampart_rollback::{assert_no_violations, telemetry::CollectingObserver};
///
/// let observer = CollectingObserver::new();
/// // ... run some operations ...
/// assert_no_violations!(observer);
/// ```
#[macro_export]
macro_rules! assert_no_violations {
    ($observer:expr) => {{
        let violations = $observer.violations();
        assert!(
            violations.is_empty(),
            "Expected no violations, but found {}:\n{:#?}",
            violations.len(),
            violations
        );
    }};

    ($observer:expr, $msg:expr) => {{
        let violations = $observer.violations();
        assert!(
            violations.is_empty(),
            "{}\nExpected no violations, but found {}:\n{:#?}",
            $msg,
            violations.len(),
            violations
        );
    }};
}

// #########
// # TESTS #
// #########
