// shop_server/src/pipelines/checkout_pipeline.rs

//! Cart → order. Every read and write after `open_unit_of_work` goes through
//! one `CheckoutUnit`. The flow runs under the checkout deadline; the commit
//! that follows it does not. If the flow fails, halts, runs past the deadline
//! or the commit fails, `run_checkout` rolls that unit back.

use crate::errors::AppError;
use crate::models::cart::CartCheckoutPayload;
use crate::models::order::{NewOrder, OrderStatus};
use crate::models::order_item::NewOrderItem;
use crate::pipelines::cart_rules;
use crate::pipelines::contexts::CheckoutCtxData;
use crate::state::AppState;
use crate::store::CheckoutUnit;
use cartflow::{Flow, FlowControl, FlowData, FlowOutcome, FlowRegistry};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, event, info, instrument, warn, Level};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutReceipt {
  pub order_id: i64,
  #[serde(with = "rust_decimal::serde::float")]
  pub total_price: Decimal,
}

fn current_unit(ctx: &FlowData<CheckoutCtxData>) -> Result<Arc<dyn CheckoutUnit>, AppError> {
  ctx
    .read()
    .unit
    .clone()
    .ok_or_else(|| AppError::Internal("checkout unit of work is not open".to_string()))
}

pub fn register_checkout_pipeline(flows: &FlowRegistry<AppError>) {
  let mut p = Flow::<CheckoutCtxData, AppError>::new(&[
    ("validate_cart", false, None),
    ("resolve_product_ids", false, None),
    ("open_unit_of_work", false, None),
    ("fetch_products", false, None),
    ("check_stock", false, None),
    ("price_cart", false, None),
    ("persist_order", false, None),
  ]);

  // No I/O may happen before this step passes.
  p.on_step("validate_cart", |ctx: FlowData<CheckoutCtxData>| {
    Box::pin(async move {
      let (user_id, verdict) = {
        let guard = ctx.read();
        (guard.user_id, cart_rules::validate_cart(&guard.items))
      };
      if let Err(e) = verdict {
        warn!(user_id = user_id, error = %e, "Checkout rejected during cart validation.");
        return Err(e);
      }
      Ok::<_, AppError>(FlowControl::Continue)
    })
  });

  p.on_step("resolve_product_ids", |ctx: FlowData<CheckoutCtxData>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.product_ids = cart_rules::distinct_product_ids(&guard.items);
      event!(Level::DEBUG, product_ids = ?guard.product_ids, "Resolved cart product ids.");
      Ok::<_, AppError>(FlowControl::Continue)
    })
  });

  p.on_step("open_unit_of_work", |ctx: FlowData<CheckoutCtxData>| {
    Box::pin(async move {
      let store = ctx.read().store.clone();
      let unit = store.begin_checkout().await?;
      ctx.write().unit = Some(unit);
      Ok::<_, AppError>(FlowControl::Continue)
    })
  });

  p.on_step("fetch_products", |ctx: FlowData<CheckoutCtxData>| {
    Box::pin(async move {
      let unit = current_unit(&ctx)?;
      let (ids, items) = {
        let guard = ctx.read();
        (guard.product_ids.clone(), guard.items.clone())
      };

      let products = unit.fetch_by_ids(&ids).await?;
      let index = cart_rules::index_products(&items, products)?;
      event!(Level::DEBUG, locked = index.len(), "Product rows locked for checkout.");
      ctx.write().products = index;
      Ok::<_, AppError>(FlowControl::Continue)
    })
  });

  p.on_step("check_stock", |ctx: FlowData<CheckoutCtxData>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      let demand = cart_rules::check_stock(&guard.items, &guard.products)?;
      guard.demand = demand;
      Ok::<_, AppError>(FlowControl::Continue)
    })
  });

  p.on_step("price_cart", |ctx: FlowData<CheckoutCtxData>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      let (total, lines) = cart_rules::price_cart(&guard.items, &guard.products)?;
      guard.total = total;
      guard.lines = lines;
      Ok::<_, AppError>(FlowControl::Continue)
    })
  });

  p.on_step("persist_order", |ctx: FlowData<CheckoutCtxData>| {
    Box::pin(async move {
      let unit = current_unit(&ctx)?;
      let (restocked, header, lines) = {
        let guard = ctx.read();
        let restocked = cart_rules::decremented(&guard.products, &guard.demand)?;
        let header = NewOrder {
          user_id: guard.user_id,
          total: guard.total,
          status: OrderStatus::Pending,
          address: guard.address.clone(),
        };
        (restocked, header, guard.lines.clone())
      };

      for product in &restocked {
        unit.replace(product).await?;
      }
      let order_id = unit.create_order(&header).await?;
      for line in &lines {
        unit
          .create_order_item(&NewOrderItem {
            order_id,
            product_id: line.product_id,
            quantity: line.quantity,
            price: line.unit_price,
          })
          .await?;
      }

      ctx.write().order_id = Some(order_id);
      info!(
        order_id = order_id,
        user_id = header.user_id,
        lines = lines.len(),
        total = %header.total,
        "Order written; awaiting commit."
      );
      Ok::<_, AppError>(FlowControl::Continue)
    })
  });

  flows.register_flow(p);
  info!("Checkout flow registered.");
}

/// Runs outside the deadline. Once COMMIT is in flight the order may already
/// be durable, so it must never be reported as timed out.
async fn commit_unit_of_work(ctx: &FlowData<CheckoutCtxData>) -> Result<(), AppError> {
  let unit = current_unit(ctx)?;
  unit.commit().await?;
  ctx.write().unit = None;
  Ok(())
}

/// Rolls back whatever unit the flow left open.
async fn abandon(ctx: &FlowData<CheckoutCtxData>) {
  let unit = ctx.write().unit.take();
  if let Some(unit) = unit {
    if let Err(e) = unit.rollback().await {
      error!(error = %e, "Rollback of checkout unit failed; relying on drop.");
    }
  }
}

/// Runs the checkout flow for `user_id` under the configured deadline.
/// Not idempotent: every successful call creates a new order.
#[instrument(name = "checkout::run", skip(state, cart), fields(user_id = user_id, items = cart.items.len()))]
pub async fn run_checkout(
  state: &AppState,
  user_id: i64,
  cart: CartCheckoutPayload,
) -> Result<CheckoutReceipt, AppError> {
  let ctx = FlowData::new(CheckoutCtxData::new(state.store.clone(), user_id, cart.items, cart.address));

  let ran = match tokio::time::timeout(state.config.checkout_deadline(), state.flows.run(ctx.clone())).await {
    Ok(result) => result,
    Err(_elapsed) => {
      warn!(deadline_ms = state.config.checkout_deadline_ms, "Checkout deadline exceeded.");
      Err(AppError::DeadlineExceeded(state.config.checkout_deadline_ms))
    }
  };

  let settled = match ran {
    Ok(FlowOutcome::Completed) => commit_unit_of_work(&ctx).await,
    Ok(FlowOutcome::Halted) => Err(AppError::Internal("checkout halted before completion".to_string())),
    Err(err) => Err(err),
  };
  if let Err(err) = settled {
    abandon(&ctx).await;
    return Err(err);
  }

  let (order_id, total_price) = {
    let guard = ctx.read();
    (guard.order_id, guard.total)
  };
  let order_id = order_id.ok_or_else(|| AppError::Internal("checkout completed without an order id".to_string()))?;
  info!(order_id = order_id, total = %total_price, "Checkout committed.");
  Ok(CheckoutReceipt { order_id, total_price })
}
