// cartflow/src/registry.rs

//! `FlowRegistry<E>`: flows keyed by the type of data they run over.
//!
//! A service registers each flow once at startup and later runs it with
//! `registry.run(FlowData::new(ctx))`, without having to hold on to the flow
//! itself. Errors come back as the application error type `E`.

use crate::core::control::FlowOutcome;
use crate::core::flow_data::FlowData;
use crate::error::FlowError;
use crate::flow::definition::Flow;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[async_trait]
trait ErasedFlow<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  /// `data` must be a boxed `FlowData<TData>` for the wrapped flow's `TData`.
  async fn run_erased(&self, data: Box<dyn Any + Send>) -> Result<FlowOutcome, AppErr>;
}

struct FlowRunner<TData, HandlerErr, AppErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flow: Arc<Flow<TData, HandlerErr>>,
  _app_err: PhantomData<fn() -> AppErr>,
}

#[async_trait]
impl<TData, HandlerErr, AppErr> ErasedFlow<AppErr> for FlowRunner<TData, HandlerErr, AppErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<HandlerErr> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, data: Box<dyn Any + Send>) -> Result<FlowOutcome, AppErr> {
    let typed = match data.downcast::<FlowData<TData>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected = std::any::type_name::<FlowData<TData>>();
        event!(Level::ERROR, expected_type = expected, "Flow data type mismatch.");
        return Err(AppErr::from(FlowError::TypeMismatch {
          step_name: "registry_dispatch".to_string(),
          expected_type: expected.to_string(),
        }));
      }
    };
    self.flow.run(typed).await.map_err(AppErr::from)
  }
}

/// Registry of flows; `AppErr` is what `run` returns.
pub struct FlowRegistry<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flows: RwLock<HashMap<TypeId, Arc<dyn ErasedFlow<AppErr>>>>,
}

impl<AppErr> Default for FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<AppErr> FlowRegistry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      flows: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `flow` for its data type, replacing any earlier flow for that type.
  pub fn register_flow<TData, HandlerErr>(&self, flow: Flow<TData, HandlerErr>)
  where
    TData: 'static + Send + Sync,
    HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<HandlerErr>,
  {
    event!(Level::DEBUG, flow_data_type = %std::any::type_name::<TData>(), steps = ?flow.step_names(), "Registering flow.");
    let runner = FlowRunner::<TData, HandlerErr, AppErr> {
      flow: Arc::new(flow),
      _app_err: PhantomData,
    };
    self.flows.write().insert(TypeId::of::<TData>(), Arc::new(runner));
  }

  pub fn is_registered<TData: 'static + Send + Sync>(&self) -> bool {
    self.flows.read().contains_key(&TypeId::of::<TData>())
  }

  /// Runs the flow registered for `TData`. The caller keeps its own clone of
  /// `data` to read results afterwards.
  #[instrument(name = "FlowRegistry::run", skip_all, fields(flow_data_type = %std::any::type_name::<TData>()))]
  pub async fn run<TData>(&self, data: FlowData<TData>) -> Result<FlowOutcome, AppErr>
  where
    TData: 'static + Send + Sync,
  {
    let runner = self.flows.read().get(&TypeId::of::<TData>()).cloned();
    let Some(runner) = runner else {
      let type_name = std::any::type_name::<TData>();
      event!(Level::ERROR, "No flow registered for data type {}.", type_name);
      return Err(AppErr::from(FlowError::ConfigurationError {
        step_name: "FlowRegistry::run".to_string(),
        message: format!("No flow registered for data type {}", type_name),
      }));
    };
    runner.run_erased(Box::new(data)).await
  }
}
