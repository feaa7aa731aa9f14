// cartflow/src/core/handler.rs

use crate::core::control::FlowControl;
use crate::core::flow_data::FlowData;
use std::future::Future;
use std::pin::Pin;

/// A boxed asynchronous step handler.
///
/// Handlers take their own clone of the flow's `FlowData<TData>`, lock it only
/// briefly to copy inputs or store outputs, and must release every guard before
/// awaiting.
pub type Handler<TData, Err> = Box<
  dyn Fn(FlowData<TData>) -> Pin<Box<dyn Future<Output = Result<FlowControl, Err>> + Send>> + Send + Sync,
>;
