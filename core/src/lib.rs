// cartflow/src/lib.rs

//! Cartflow: a small asynchronous step-flow engine.
//!
//! A flow is an ordered list of named steps. Every step can carry `before`,
//! `on` and `after` handlers which receive a shared [`FlowData<T>`] handle and
//! decide whether the flow continues or halts. Handler failures abort the flow
//! and are returned to the caller unchanged.
//!
//! The shop server expresses checkout, signup and signin as flows and keeps
//! them in a [`FlowRegistry`] keyed by the flow's data type.

pub mod core;
pub mod error;
pub mod flow;
pub mod registry;

pub use crate::core::control::{FlowControl, FlowOutcome};
pub use crate::core::flow_data::FlowData;
pub use crate::core::handler::Handler;
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::flow::definition::Flow;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::FlowRegistry;

/*
    Typical usage:
    1. Define a data struct `CheckoutCtxData` holding everything the steps share.
    2. Build `Flow::<CheckoutCtxData, AppError>::new(&[("validate", false, None), ...])`.
    3. Attach handlers with `on_step` / `before_step` / `after_step`.
    4. Register it: `registry.register_flow(flow)`.
    5. Per request: `registry.run(FlowData::new(ctx)).await` and read results
       back out of the same `FlowData` handle.
*/
