// shop_server/src/pipelines/mod.rs

//! Every multi-step workflow of the service, expressed as a `cartflow` flow
//! and registered once at startup.

use crate::errors::AppError;
use cartflow::FlowRegistry;

pub mod cart_rules;
pub mod contexts;

pub mod checkout_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

pub fn register_all_pipelines(flows: &FlowRegistry<AppError>) {
  tracing::info!("Registering application flows...");

  signup_pipeline::register_signup_pipeline(flows);
  signin_pipeline::register_signin_pipeline(flows);
  checkout_pipeline::register_checkout_pipeline(flows);

  tracing::info!("All application flows registered.");
}
