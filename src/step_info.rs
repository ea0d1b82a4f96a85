use crate::Step;

/// A snapshot of the host's simulation state at the start of a single step.
///
/// `step` records which step the snapshot belongs to; a fresh slot holds
/// [`Step::NULL`] and no data. Because snapshot slots live in a ring sized to
/// the rollback window, the recorded step is also the staleness check: a slot
/// whose step no longer matches the requested one has been overwritten.
#[derive(Debug, Clone)]
pub struct Snapshot<S> {
    /// The step this snapshot was taken at.
    pub step: Step,
    /// The host-provided state, absent until the slot is first written.
    pub data: Option<S>,
}

impl<S> Default for Snapshot<S> {
    fn default() -> Self {
        Self {
            step: Step::NULL,
            data: None,
        }
    }
}

impl<S> Snapshot<S> {
    /// Creates a snapshot for `step` holding `data`.
    pub fn new(step: Step, data: S) -> Self {
        Self {
            step,
            data: Some(data),
        }
    }
}

/// An input for a single player at a single step.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StepInput<I>
where
    I: Copy + Clone + PartialEq,
{
    /// The step this input belongs to. [`Step::NULL`] marks an unwritten slot.
    pub step: Step,
    /// The input value given by the host.
    pub input: I,
}

impl<I: Copy + Clone + PartialEq + Default> StepInput<I> {
    /// Creates a new `StepInput` with the given step and input.
    pub fn new(step: Step, input: I) -> Self {
        Self { step, input }
    }

    /// Creates a blank input with the default value for the input type.
    ///
    /// The default input is also the prediction for a player that has not
    /// produced any input yet.
    #[must_use]
    pub fn blank(step: Step) -> Self {
        Self {
            step,
            input: I::default(),
        }
    }
}

// #########
// # TESTS #
// #########
