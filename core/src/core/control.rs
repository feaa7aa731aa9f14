// cartflow/src/core/control.rs

//! Signals a handler returns, and the outcome of a whole run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
  /// Run the remaining handlers of this step and the following steps.
  Continue,
  /// Halt the flow now. Nothing after this handler runs.
  Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
  /// Every non-skipped step ran.
  Completed,
  /// A handler returned `FlowControl::Halt`.
  Halted,
}
