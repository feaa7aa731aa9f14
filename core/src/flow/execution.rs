// cartflow/src/flow/execution.rs

//! `Flow::run`: walks the steps in order and drives each step's handlers.

use crate::core::control::{FlowControl, FlowOutcome};
use crate::core::flow_data::FlowData;
use crate::core::handler::Handler;
use crate::error::FlowError;
use crate::flow::definition::Flow;
use tracing::{event, instrument, span, Instrument, Level};

#[derive(Debug, Clone, Copy)]
enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  fn label(self) -> &'static str {
    match self {
      Phase::Before => "before",
      Phase::On => "on",
      Phase::After => "after",
    }
  }
}

impl<TData, Err> Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step against `data`.
  ///
  /// Returns `Completed` when all steps ran, `Halted` when a handler asked to
  /// halt, or the first handler error. A non-optional step with no handlers at
  /// all fails with `FlowError::HandlerMissing` converted into `Err`.
  #[instrument(
    name = "Flow::run",
    skip_all,
    fields(
      flow_data_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, data: FlowData<TData>) -> Result<FlowOutcome, Err> {
    event!(Level::DEBUG, "Flow execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(data.clone()) {
          event!(Level::INFO, step = step_name, "Step skipped due to 'skip_if' condition.");
          continue;
        }
      }

      let has_handlers = [&self.before, &self.on, &self.after]
        .iter()
        .any(|phase| phase.get(step_name).is_some_and(|v| !v.is_empty()));

      if !has_handlers {
        if step_def.optional {
          event!(Level::DEBUG, step = step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(Level::ERROR, step = step_name, "Non-optional step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let step_span = span!(
        Level::INFO,
        "flow_step",
        step_name = step_name,
        step_index = step_idx,
        optional = step_def.optional
      );

      let phases = [(Phase::Before, &self.before), (Phase::On, &self.on), (Phase::After, &self.after)];
      let step_result: Result<FlowControl, Err> = async {
        for (phase, table) in phases {
          let Some(handlers) = table.get(step_name) else {
            continue;
          };
          match run_phase(phase, handlers, &data).await {
            Ok(FlowControl::Continue) => {}
            halted_or_failed => return halted_or_failed,
          }
        }
        Ok(FlowControl::Continue)
      }
      .instrument(step_span)
      .await;

      let control = step_result?;
      if control == FlowControl::Halt {
        return Ok(FlowOutcome::Halted);
      }
      event!(Level::DEBUG, step = step_name, "Step finished.");
    }

    event!(Level::DEBUG, "Flow execution completed.");
    Ok(FlowOutcome::Completed)
  }
}

async fn run_phase<TData, Err>(
  phase: Phase,
  handlers: &[Handler<TData, Err>],
  data: &FlowData<TData>,
) -> Result<FlowControl, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  for (handler_idx, handler_fn) in handlers.iter().enumerate() {
    match handler_fn(data.clone()).await {
      Ok(FlowControl::Continue) => {}
      Ok(FlowControl::Halt) => {
        event!(Level::INFO, phase = phase.label(), handler_index = handler_idx, "Flow halted by handler.");
        return Ok(FlowControl::Halt);
      }
      Err(e) => {
        event!(Level::WARN, phase = phase.label(), handler_index = handler_idx, error = %e, "Handler failed.");
        return Err(e);
      }
    }
  }
  Ok(FlowControl::Continue)
}
