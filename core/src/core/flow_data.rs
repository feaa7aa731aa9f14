// cartflow/src/core/flow_data.rs
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Shared, lockable handle to the data a flow operates on.
///
/// Every handler receives a clone of the same handle, so writes made by one
/// step are visible to the next one and to the caller once the flow returns.
///
/// IMPORTANT: guards returned here are blocking locks and MUST be dropped
/// before any `.await` point. Copy what you need out of the guard first.
#[derive(Debug)]
pub struct FlowData<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> FlowData<T> {
  pub fn new(data: T) -> Self {
    FlowData(Arc::new(RwLock::new(data)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }
}

impl<T: Send + Sync + 'static> Clone for FlowData<T> {
  fn clone(&self) -> Self {
    FlowData(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + 'static + Default> Default for FlowData<T> {
  fn default() -> Self {
    Self::new(Default::default())
  }
}
